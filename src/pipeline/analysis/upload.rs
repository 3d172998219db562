//! Upload acceptance policy for hosts that front the analyzer.
//!
//! `analyze` itself accepts any decodable bytes; this check only runs on
//! the `analyze_upload` path.

use serde::Serialize;

use super::AnalysisError;
use crate::config::{MAX_UPLOAD_BYTES, MIN_IMAGE_BYTES};

/// What an upload form should advertise.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedTypes {
    pub types: Vec<&'static str>,
    pub extensions: Vec<&'static str>,
    pub max_size: &'static str,
    pub recommendations: Vec<&'static str>,
}

pub fn supported_types() -> SupportedTypes {
    SupportedTypes {
        types: vec!["image/jpeg", "image/jpg", "image/png", "image/webp"],
        extensions: vec![".jpg", ".jpeg", ".png", ".webp"],
        max_size: "10MB",
        recommendations: vec![
            "Use a frontal (PA or AP) chest X-ray",
            "Make sure the whole chest is in frame",
            "Avoid photos taken at an angle or with glare",
            "Higher resolution images give more stable results",
        ],
    }
}

/// Detect the image MIME type from magic bytes. Extensions are never consulted.
pub fn detect_image_mime(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        // JPEG: starts with FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        // PNG: starts with 89 50 4E 47
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        // WEBP: "RIFF" <size> "WEBP"
        _ if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" => {
            Some("image/webp")
        }
        _ => None,
    }
}

/// Enforce size bounds and the JPEG / PNG / WEBP allow-list.
/// Returns the detected MIME type.
pub fn check_upload(bytes: &[u8]) -> Result<&'static str, AnalysisError> {
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(AnalysisError::InvalidInput(format!(
            "file is {} bytes, limit is {MAX_UPLOAD_BYTES}",
            bytes.len()
        )));
    }
    if bytes.len() < MIN_IMAGE_BYTES {
        return Err(AnalysisError::InvalidInput(format!(
            "file is {} bytes, too small to be an image",
            bytes.len()
        )));
    }
    detect_image_mime(bytes)
        .ok_or_else(|| AnalysisError::InvalidInput("unsupported file type".into()))
}
