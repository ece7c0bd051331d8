pub mod image_client;

use crate::{error::Result, models::ImageGenerationRequest};
use async_trait::async_trait;

pub use image_client::{GeminiImageClient, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};

/// Outbound gateway to the image model. Request handlers depend on this
/// trait rather than the concrete client, so tests can substitute a stub.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Submit a prompt plus zero or more images and return the raw bytes of
    /// the generated image.
    async fn generate(&self, request: ImageGenerationRequest) -> Result<Vec<u8>>;

    /// Whether a credential is present. The server keeps running without
    /// one; generate calls then fail with a configuration error.
    fn is_configured(&self) -> bool;
}
