use base64::{engine::general_purpose, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::ImageFormat;
use std::error::Error;
use std::fmt;

/// Uploads smaller than this on either edge carry too little detail to
/// describe reliably.
pub const MIN_DIMENSION: u32 = 100;
/// Longest edge after downscaling; larger payloads only slow the model down.
pub const MAX_DIMENSION: u32 = 1024;
const JPEG_QUALITY: u8 = 85;

/// A preprocessed image ready to attach to a model call: recompressed JPEG,
/// base64-encoded.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub mime_type: &'static str,
    pub data: String,
}

#[derive(Debug)]
pub enum ImageInputError {
    Undecodable(String),
    UnsupportedFormat(String),
    TooSmall { width: u32, height: u32 },
    EncodeFailed(String),
}

impl fmt::Display for ImageInputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageInputError::Undecodable(detail) => {
                write!(f, "Image could not be decoded: {}", detail)
            }
            ImageInputError::UnsupportedFormat(format) => {
                write!(f, "Unsupported image format: {}", format)
            }
            ImageInputError::TooSmall { width, height } => {
                write!(
                    f,
                    "Image too small for analysis: {}x{} (minimum {}x{})",
                    width, height, MIN_DIMENSION, MIN_DIMENSION
                )
            }
            ImageInputError::EncodeFailed(detail) => {
                write!(f, "Failed to re-encode image: {}", detail)
            }
        }
    }
}

impl Error for ImageInputError {}

/// Validates an uploaded image against the accepted-format and
/// minimum-dimension policy, then normalizes it for the model: downscale so
/// the longest edge fits `MAX_DIMENSION`, flatten to RGB, re-encode as JPEG.
/// Everything happens on owned buffers, so nothing is left behind on any
/// exit path.
pub fn validate_and_prepare(bytes: &[u8]) -> Result<PreparedImage, ImageInputError> {
    let format = image::guess_format(bytes)
        .map_err(|e| ImageInputError::Undecodable(e.to_string()))?;
    match format {
        ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP => {}
        other => {
            return Err(ImageInputError::UnsupportedFormat(format!("{:?}", other)));
        }
    }

    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ImageInputError::Undecodable(e.to_string()))?;

    let (width, height) = (decoded.width(), decoded.height());
    if width < MIN_DIMENSION || height < MIN_DIMENSION {
        return Err(ImageInputError::TooSmall { width, height });
    }

    let resized = if width > MAX_DIMENSION || height > MAX_DIMENSION {
        decoded.resize(MAX_DIMENSION, MAX_DIMENSION, FilterType::Lanczos3)
    } else {
        decoded
    };

    // JPEG has no alpha channel.
    let rgb = resized.to_rgb8();
    let mut jpeg_bytes: Vec<u8> = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut jpeg_bytes, JPEG_QUALITY);
    rgb.write_with_encoder(encoder)
        .map_err(|e| ImageInputError::EncodeFailed(e.to_string()))?;

    Ok(PreparedImage {
        mime_type: "image/jpeg",
        data: general_purpose::STANDARD.encode(&jpeg_bytes),
    })
}
