//! Encoded image payloads
//!
//! An [`EncodedImage`] is the transport form of every picture in the workflow:
//! base64 text plus a media-type tag. Uploads, the generation request and the
//! generated result all share it.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ReziError;

/// Media types the upload control advertises. Advisory only.
pub const ACCEPTED_MEDIA_TYPES: [&str; 3] = ["image/png", "image/jpeg", "image/webp"];

/// Extension used when a media type carries no usable subtype.
pub const DEFAULT_EXTENSION: &str = "png";

const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// Image bytes encoded as base64 text with their media type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedImage {
    payload: String,
    media_type: String,
}

impl EncodedImage {
    /// Wrap an already-encoded payload.
    pub fn new(payload: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            media_type: media_type.into(),
        }
    }

    /// Encode raw bytes.
    pub fn from_bytes(bytes: &[u8], media_type: impl Into<String>) -> Self {
        Self::new(STANDARD.encode(bytes), media_type)
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Decode the payload back into raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>, ReziError> {
        STANDARD
            .decode(self.payload.as_bytes())
            .map_err(|e| ReziError::Storage(format!("Invalid base64 image payload: {}", e)))
    }

    /// `data:<mediaType>;base64,<payload>`
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.payload)
    }

    /// File extension derived from the media subtype, `png` when there is none.
    pub fn extension(&self) -> &str {
        extension_for(&self.media_type)
    }

    pub fn is_accepted_type(&self) -> bool {
        ACCEPTED_MEDIA_TYPES.contains(&self.media_type.as_str())
    }
}

/// Subtype of `type/subtype`, or [`DEFAULT_EXTENSION`] when it is missing or empty.
pub fn extension_for(media_type: &str) -> &str {
    match media_type.split('/').nth(1).map(str::trim) {
        Some(subtype) if !subtype.is_empty() => subtype,
        _ => DEFAULT_EXTENSION,
    }
}

/// Media type inferred from a file name.
pub fn media_type_for_path(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(FALLBACK_MEDIA_TYPE)
        .to_string()
}
