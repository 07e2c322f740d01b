//! Image assets and data URLs.

use crate::error::{GenEditError, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Image formats accepted as inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format.
    WebP,
    /// GIF format (first frame is what the model sees).
    Gif,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
            Self::Gif => "gif",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Maps a MIME type back to a format.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            "image/gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some(Self::Gif);
        }

        None
    }
}

/// Splits a `data:<mime>;base64,<payload>` URL into its MIME type and payload.
///
/// The payload is returned as-is, still base64 encoded.
pub fn split_data_url(url: &str) -> Result<(&str, &str)> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| GenEditError::InvalidDataUrl("missing 'data:' scheme".into()))?;
    let (mime, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| GenEditError::InvalidDataUrl("missing ';base64,' marker".into()))?;
    if mime.is_empty() {
        return Err(GenEditError::InvalidDataUrl("empty MIME type".into()));
    }
    Ok((mime, payload))
}

/// Formats a MIME type and base64 payload as a data URL.
pub fn to_data_url(mime_type: &str, base64_payload: &str) -> String {
    format!("data:{mime_type};base64,{base64_payload}")
}

/// An input image: raw bytes, their data URL, and the declared MIME type.
///
/// Assets are never mutated; a new selection replaces the old asset wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    data: Vec<u8>,
    data_url: String,
    mime_type: String,
}

impl ImageAsset {
    /// Creates an asset from raw bytes and their MIME type.
    pub fn from_bytes(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        let mime_type = mime_type.into();
        let payload = base64::engine::general_purpose::STANDARD.encode(&data);
        Self {
            data_url: to_data_url(&mime_type, &payload),
            data,
            mime_type,
        }
    }

    /// Creates an asset from a base64 data URL.
    pub fn from_data_url(url: impl Into<String>) -> Result<Self> {
        let data_url = url.into();
        let (mime, payload) = split_data_url(&data_url)?;
        let data = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| GenEditError::Decode(e.to_string()))?;
        let mime_type = mime.to_string();
        Ok(Self {
            data,
            data_url,
            mime_type,
        })
    }

    /// Reads an image file, taking the MIME type from its content or extension.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let format = ImageFormat::from_magic_bytes(&data)
            .or_else(|| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .and_then(ImageFormat::from_extension)
            })
            .ok_or_else(|| {
                GenEditError::InvalidRequest(format!(
                    "{} is not a PNG, JPEG, WebP, or GIF image",
                    path.display()
                ))
            })?;
        tracing::debug!(path = %path.display(), mime = format.mime_type(), "loaded image");
        Ok(Self::from_bytes(data, format.mime_type()))
    }

    /// Raw image bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The `data:<mime>;base64,...` URL.
    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    /// Declared MIME type.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// The data URL with its `data:<mime>;base64,` prefix stripped.
    pub fn base64_payload(&self) -> &str {
        // Constructors guarantee the prefix is well formed.
        let prefix_len = "data:".len() + self.mime_type.len() + ";base64,".len();
        &self.data_url[prefix_len..]
    }
}
