pub mod handlers;

use std::sync::Arc;

use actix_files::Files;
use actix_web::{web, App, HttpServer};

use crate::gemini::ImageGenerator;

/// Read-only state shared by all request handlers. The generator is the
/// injected gateway; nothing here is mutated after startup.
pub struct AppState {
    pub generator: Arc<dyn ImageGenerator>,
    pub max_image_dimension: u32,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::index))
        .route("/health", web::get().to(handlers::health))
        .route("/api/process-image", web::post().to(handlers::process_image))
        .route("/api/text-to-image", web::post().to(handlers::text_to_image))
        .service(Files::new("/static", "./static"));
}

pub async fn run(state: AppState, port: u16) -> std::io::Result<()> {
    let data = web::Data::new(state);

    log::info!("HTTP server listening on http://0.0.0.0:{}", port);

    HttpServer::new(move || App::new().app_data(data.clone()).configure(configure))
        .bind(("0.0.0.0", port))?
        .run()
        .await
}
