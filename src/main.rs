use std::sync::Arc;

use pixgen::{
    config::{Config, GeminiConfig},
    gemini::GeminiImageClient,
    imaging,
    logger::{self, LoggerConfig},
    server::{self, AppState},
};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let dotenv_loaded = dotenv::dotenv().is_ok();

    let config = Config::from_env().with_gemini(GeminiConfig::from_env());

    let logger_config = if config.production {
        LoggerConfig::production()
    } else {
        LoggerConfig::development()
    };
    if let Err(e) = logger::init_with_config(logger_config) {
        eprintln!("Failed to initialize logger: {}", e);
    }

    if dotenv_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    let port = config.port.unwrap_or(5001);
    logger::log_startup_info("pixgen", env!("CARGO_PKG_VERSION"), port);
    logger::log_config_info(&config);

    let gemini_config = config.gemini.clone().unwrap_or_default();
    if gemini_config.api_key.is_none() {
        log::error!(
            "❌ GOOGLE_API_KEY is not set; image generation requests will fail until it is configured"
        );
    }

    let generator = match GeminiImageClient::new(gemini_config) {
        Ok(client) => {
            log::info!("✅ Gemini client initialized (model: {})", client.model_id());
            client
        }
        Err(e) => {
            log::error!("❌ Failed to initialize the Gemini client: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
        }
    };

    let state = AppState {
        generator: Arc::new(generator),
        max_image_dimension: config
            .max_image_dimension
            .unwrap_or(imaging::DEFAULT_MAX_DIMENSION),
    };

    server::run(state, port).await
}
