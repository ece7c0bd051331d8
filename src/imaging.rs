use std::io::Cursor;

use image::{imageops::FilterType, DynamicImage, ImageFormat};

use crate::error::{GeminiError, Result};

pub const DEFAULT_MAX_DIMENSION: u32 = 1024;

/// Decodes an uploaded image and normalizes it for submission to the model:
/// alpha channels are flattened to RGB (transparency is dropped), and images
/// larger than `max_dimension` on either side are downsampled with Lanczos3,
/// preserving aspect ratio. Images already within bounds pass through with
/// their dimensions untouched.
pub fn prepare_upload(bytes: &[u8], max_dimension: u32) -> Result<DynamicImage> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| GeminiError::DecodeError(format!("Could not decode uploaded image: {}", e)))?;

    let flattened = if decoded.color().has_alpha() {
        DynamicImage::ImageRgb8(decoded.to_rgb8())
    } else {
        decoded
    };

    let (width, height) = (flattened.width(), flattened.height());
    if width > max_dimension || height > max_dimension {
        log::debug!(
            "Downsampling upload from {}x{} to fit {}px",
            width,
            height,
            max_dimension
        );
        Ok(flattened.resize(max_dimension, max_dimension, FilterType::Lanczos3))
    } else {
        Ok(flattened)
    }
}

/// Re-encodes a prepared bitmap as PNG, the attachment format sent to the
/// model.
pub fn to_png_bytes(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| GeminiError::SerializationError(format!("Failed to encode image as PNG: {}", e)))?;

    Ok(buffer.into_inner())
}
