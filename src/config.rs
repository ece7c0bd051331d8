use std::env;

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model_id: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            api_key: None,
            model_id: None,
            timeout_secs: None,
        }
    }
}

impl GeminiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `GOOGLE_API_KEY` (or `GEMINI_API_KEY` as a fallback),
    /// `GEMINI_MODEL` and `GEMINI_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let api_key = env::var("GOOGLE_API_KEY")
            .ok()
            .or_else(|| env::var("GEMINI_API_KEY").ok());
        let model_id = env::var("GEMINI_MODEL").ok();
        let timeout_secs = env::var("GEMINI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok());

        GeminiConfig {
            api_key,
            model_id,
            timeout_secs,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: Option<u16>,
    pub max_image_dimension: Option<u32>,
    pub production: bool,
    pub gemini: Option<GeminiConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: None,
            max_image_dimension: None,
            production: false,
            gemini: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let port = env::var("PORT").ok().and_then(|port| port.parse().ok());
        let max_image_dimension = env::var("MAX_IMAGE_DIMENSION")
            .ok()
            .and_then(|s| s.parse().ok());
        let production = env::var("APP_ENV").map_or(false, |val| val == "production");

        Config {
            port,
            max_image_dimension,
            production,
            gemini: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_max_image_dimension(mut self, max_image_dimension: u32) -> Self {
        self.max_image_dimension = Some(max_image_dimension);
        self
    }

    pub fn with_gemini(mut self, config: GeminiConfig) -> Self {
        self.gemini = Some(config);
        self
    }
}
