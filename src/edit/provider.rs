//! Generation backend trait and the validated response model.

use crate::edit::parts::{ContentPart, InlineImage};
use crate::error::Result;
use async_trait::async_trait;

/// Finish reasons that mean the safety filters withheld the output.
const SAFETY_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "IMAGE_SAFETY",
    "PROHIBITED_CONTENT",
    "IMAGE_PROHIBITED_CONTENT",
    "BLOCKLIST",
    "SPII",
];

/// Why a candidate stopped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FinishReason {
    /// Natural end of output.
    Stop,
    /// Token limit reached.
    MaxTokens,
    /// Withheld by safety filters (the raw reason is kept).
    Safety(String),
    /// Any other reason reported by the API.
    Other(String),
    /// No reason given.
    #[default]
    Unspecified,
}

impl FinishReason {
    /// Classifies a raw API finish reason.
    pub fn from_api(reason: Option<&str>) -> Self {
        match reason {
            None | Some("") | Some("FINISH_REASON_UNSPECIFIED") => Self::Unspecified,
            Some("STOP") => Self::Stop,
            Some("MAX_TOKENS") => Self::MaxTokens,
            Some(r) if SAFETY_FINISH_REASONS.contains(&r) => Self::Safety(r.to_string()),
            Some(r) => Self::Other(r.to_string()),
        }
    }

    /// True if the safety filters stopped this candidate.
    pub fn is_safety(&self) -> bool {
        matches!(self, Self::Safety(_))
    }
}

/// One returned content part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePart {
    /// Text output.
    Text(String),
    /// Image output.
    InlineImage(InlineImage),
}

/// One candidate completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidate {
    /// Why the candidate stopped.
    pub finish_reason: FinishReason,
    /// Returned parts, in order.
    pub parts: Vec<ResponsePart>,
}

impl Candidate {
    /// First inline image, if any.
    pub fn first_image(&self) -> Option<&InlineImage> {
        self.parts.iter().find_map(|p| match p {
            ResponsePart::InlineImage(image) => Some(image),
            ResponsePart::Text(_) => None,
        })
    }

    /// First text part, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.parts.iter().find_map(|p| match p {
            ResponsePart::Text(text) => Some(text.as_str()),
            ResponsePart::InlineImage(_) => None,
        })
    }
}

/// A validated generation response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationResponse {
    /// Candidate completions.
    pub candidates: Vec<Candidate>,
    /// Set when the whole prompt was blocked before generation.
    pub block_reason: Option<String>,
}

/// A service that turns content parts into generated content.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Requests image (and text) output for the given parts.
    async fn generate(&self, parts: &[ContentPart]) -> Result<GenerationResponse>;

    /// Runs a text-only prompt and returns the text output.
    async fn generate_text(&self, prompt: &str) -> Result<String>;

    /// Returns the name of this backend for display.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_reason_classification() {
        assert_eq!(FinishReason::from_api(Some("STOP")), FinishReason::Stop);
        assert_eq!(FinishReason::from_api(None), FinishReason::Unspecified);
        assert!(FinishReason::from_api(Some("SAFETY")).is_safety());
        assert!(FinishReason::from_api(Some("IMAGE_SAFETY")).is_safety());
        assert_eq!(
            FinishReason::from_api(Some("NO_IMAGE")),
            FinishReason::Other("NO_IMAGE".into())
        );
        assert!(!FinishReason::from_api(Some("MAX_TOKENS")).is_safety());
    }

    #[test]
    fn test_candidate_first_parts() {
        let candidate = Candidate {
            finish_reason: FinishReason::Stop,
            parts: vec![
                ResponsePart::Text("here you go".into()),
                ResponsePart::InlineImage(InlineImage {
                    mime_type: "image/png".into(),
                    data: "AAAA".into(),
                }),
                ResponsePart::InlineImage(InlineImage {
                    mime_type: "image/jpeg".into(),
                    data: "BBBB".into(),
                }),
            ],
        };
        assert_eq!(candidate.first_image().unwrap().data, "AAAA");
        assert_eq!(candidate.first_text(), Some("here you go"));
    }
}
