pub mod config;
pub mod encoding;
pub mod error;
pub mod gemini;
pub mod imaging;
pub mod logger;
pub mod models;
pub mod server;

pub use config::{Config, GeminiConfig};
pub use error::{GeminiError, Result};
pub use gemini::{GeminiImageClient, ImageGenerator};
pub use models::{ImageAttachment, ImageGenerationRequest, ResponsePart};
