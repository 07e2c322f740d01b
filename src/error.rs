//! Error types for image editing.

use std::time::Duration;

/// Maximum length of an API error body carried into an error message.
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Errors that can occur while assembling, sending, or reconciling an edit.
#[derive(Debug, thiserror::Error)]
pub enum GenEditError {
    /// API key missing or invalid.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to decode base64 or credential data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// A `data:` URL that is not `data:<mime>;base64,<payload>`.
    #[error("invalid data URL: {0}")]
    InvalidDataUrl(String),

    /// Failed to encode the sketch raster.
    #[error("failed to encode image: {0}")]
    Encode(#[from] ::image::ImageError),

    /// The API answered with a shape we do not understand.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// A spawned generation task panicked or was cancelled.
    #[error("generation task failed: {0}")]
    TaskFailed(String),

    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error (e.g., loading an input image).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A variant was withheld by the safety filters.
    #[error(
        "external API error: image {index} failed due to safety settings. Please adjust your prompt or images."
    )]
    SafetyBlocked { index: usize },

    /// A variant call succeeded but returned no image.
    #[error("external API error: image {index} could not be generated. The API did not return an image.")]
    EmptyResponse { index: usize },

    /// A variant call failed in transport or at the API.
    #[error("external API error: {source}")]
    External {
        index: usize,
        #[source]
        source: Box<GenEditError>,
    },
}

impl GenEditError {
    /// Returns the 1-based variant index for fan-out failures.
    pub fn variant_index(&self) -> Option<usize> {
        match self {
            Self::SafetyBlocked { index }
            | Self::EmptyResponse { index }
            | Self::External { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Returns true if the failure came from the safety filters.
    pub fn is_safety(&self) -> bool {
        matches!(self, Self::SafetyBlocked { .. })
    }
}

/// Result type alias for editing operations.
pub type Result<T> = std::result::Result<T, GenEditError>;

/// Reads a `Retry-After` header given in whole seconds.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Trims an API error body down to something fit for a user-facing message.
///
/// Keys passed as `key=` query parameters are redacted and the text is capped.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let mut out = String::with_capacity(text.len().min(MAX_ERROR_MESSAGE_LEN));
    let mut rest = text.trim();

    while let Some(pos) = rest.find("key=") {
        out.push_str(&rest[..pos + 4]);
        out.push_str("[REDACTED]");
        rest = &rest[pos + 4..];
        let end = rest
            .find(|c: char| c == '&' || c == '"' || c.is_whitespace())
            .unwrap_or(rest.len());
        rest = &rest[end..];
    }
    out.push_str(rest);

    if out.chars().count() > MAX_ERROR_MESSAGE_LEN {
        let truncated: String = out.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
        return format!("{truncated}...");
    }
    out
}
