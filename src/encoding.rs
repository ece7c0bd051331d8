use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::{GeminiError, Result};

/// Base64-encodes raw image bytes for transport in a JSON body.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn decode(text: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(text)
        .map_err(|e| GeminiError::DecodeError(format!("Invalid base64 payload: {}", e)))
}
