//! Card artifact embedding
//!
//! The distributable artifact is a PNG carrying one textual metadata chunk
//! keyed `chara`, whose value is the base64 encoding of the pretty-printed
//! card JSON. The synthesis result additionally wraps that PNG in a JSON
//! envelope `{"json": <card JSON>, "image": <base64 PNG>}` - downstream
//! tools expect this double encoding exactly.

use std::io::Cursor;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::imageops::FilterType;
use image::{Rgb, RgbImage};
use serde::Serialize;
use thiserror::Error;

/// Canonical card visual size (width, height)
pub const CARD_SIZE: (u32, u32) = (512, 768);

/// PNG tEXt keyword holding the embedded card
pub const METADATA_KEY: &str = "chara";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("PNG encode error: {0}")]
    PngEncode(String),

    #[error("PNG decode error: {0}")]
    PngDecode(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Load an uploaded image and resize it exactly to the canonical card size.
pub fn load_card_visual(path: &Path) -> Result<RgbImage, ArtifactError> {
    let (w, h) = CARD_SIZE;
    let img = image::open(path)?;
    Ok(img.resize_exact(w, h, FilterType::Lanczos3).to_rgb8())
}

/// White canvas of the canonical card size, used when the submission
/// carried no image reference.
pub fn blank_card_visual() -> RgbImage {
    let (w, h) = CARD_SIZE;
    RgbImage::from_pixel(w, h, Rgb([255, 255, 255]))
}

/// Serialize a JSON value with 4-space indentation, non-ASCII preserved.
pub fn pretty_json(value: &serde_json::Value) -> Result<String, ArtifactError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    // serde_json output is always valid UTF-8
    Ok(String::from_utf8(buf).expect("serde_json produced invalid UTF-8"))
}

/// Encode the visual as a PNG with the card JSON embedded as base64 text
/// under the `chara` metadata key.
pub fn encode_card_png(visual: &RgbImage, card_json: &str) -> Result<Vec<u8>, ArtifactError> {
    let mut buf = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buf, visual.width(), visual.height());
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        encoder
            .add_text_chunk(METADATA_KEY.to_string(), STANDARD.encode(card_json))
            .map_err(|e| ArtifactError::PngEncode(e.to_string()))?;
        let mut writer = encoder
            .write_header()
            .map_err(|e| ArtifactError::PngEncode(e.to_string()))?;
        writer
            .write_image_data(visual.as_raw())
            .map_err(|e| ArtifactError::PngEncode(e.to_string()))?;
    }
    Ok(buf)
}

/// Read the embedded card JSON back out of a PNG artifact.
pub fn decode_card_metadata(png_bytes: &[u8]) -> Result<String, ArtifactError> {
    let decoder = png::Decoder::new(Cursor::new(png_bytes));
    let reader = decoder
        .read_info()
        .map_err(|e| ArtifactError::PngDecode(e.to_string()))?;
    let chunk = reader
        .info()
        .uncompressed_latin1_text
        .iter()
        .find(|c| c.keyword == METADATA_KEY)
        .ok_or_else(|| ArtifactError::Metadata(format!("no `{}` text chunk", METADATA_KEY)))?;
    let raw = STANDARD
        .decode(chunk.text.as_bytes())
        .map_err(|e| ArtifactError::Metadata(format!("invalid base64: {}", e)))?;
    String::from_utf8(raw).map_err(|e| ArtifactError::Metadata(format!("invalid UTF-8: {}", e)))
}

/// Build the synthesis result envelope: the pretty card JSON next to the
/// artifact PNG re-encoded as base64.
pub fn build_envelope(card_json: &str, png_bytes: &[u8]) -> Result<String, ArtifactError> {
    pretty_json(&serde_json::json!({
        "json": card_json,
        "image": STANDARD.encode(png_bytes),
    }))
}
