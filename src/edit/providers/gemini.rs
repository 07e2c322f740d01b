//! Gemini (Google) image editing backend.

use crate::edit::parts::{ContentPart, InlineImage};
use crate::edit::provider::{
    Candidate, FinishReason, GenerationBackend, GenerationResponse, ResponsePart,
};
use crate::error::{parse_retry_after, sanitize_error_message, GenEditError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";

/// Gemini image model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeminiImageModel {
    /// Gemini 2.5 Flash Image preview.
    #[default]
    FlashImagePreview,
    /// Nano Banana - Gemini 2.5 Flash Image (fast, economical).
    NanoBanana,
    /// Nano Banana Pro - Gemini 3 Pro Image (highest quality).
    NanoBananaPro,
}

impl GeminiImageModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FlashImagePreview => "gemini-2.5-flash-image-preview",
            Self::NanoBanana => "gemini-2.5-flash-image",
            Self::NanoBananaPro => "nano-banana-pro-preview",
        }
    }

    /// Parses a model name as accepted on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "flash-image-preview" | "gemini-2.5-flash-image-preview" => {
                Some(Self::FlashImagePreview)
            }
            "nano-banana" | "gemini-2.5-flash-image" => Some(Self::NanoBanana),
            "nano-banana-pro" | "nano-banana-pro-preview" => Some(Self::NanoBananaPro),
            _ => None,
        }
    }
}

/// Builder for GeminiProvider.
#[derive(Debug, Clone, Default)]
pub struct GeminiProviderBuilder {
    api_key: Option<String>,
    model: GeminiImageModel,
    text_model: Option<String>,
    base_url: Option<String>,
}

impl GeminiProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `GEMINI_API_KEY`, then `GOOGLE_API_KEY`.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the image model variant.
    pub fn model(mut self, model: GeminiImageModel) -> Self {
        self.model = model;
        self
    }

    /// Sets the model used for text-only calls (translation).
    pub fn text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = Some(model.into());
        self
    }

    /// Overrides the API base URL (e.g., for a proxy).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Builds the provider, resolving the API key.
    pub fn build(self) -> Result<GeminiProvider> {
        let api_key = resolve_api_key(self.api_key, |name| std::env::var(name).ok())
            .ok_or_else(|| {
                GenEditError::Auth(
                    "GEMINI_API_KEY or GOOGLE_API_KEY not set and no API key provided".into(),
                )
            })?;

        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(GeminiProvider {
            client: reqwest::Client::new(),
            api_key,
            model: self.model,
            text_model: self
                .text_model
                .unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string()),
            base_url,
        })
    }
}

/// Picks the first non-blank key: explicit, then `GEMINI_API_KEY`, then `GOOGLE_API_KEY`.
fn resolve_api_key(
    explicit: Option<String>,
    env: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    let non_blank = |k: &String| !k.trim().is_empty();
    explicit
        .filter(non_blank)
        .or_else(|| env("GEMINI_API_KEY").filter(non_blank))
        .or_else(|| env("GOOGLE_API_KEY").filter(non_blank))
}

/// Gemini generation backend.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: GeminiImageModel,
    text_model: String,
    base_url: String,
}

impl GeminiProvider {
    /// Creates a new `GeminiProviderBuilder`.
    pub fn builder() -> GeminiProviderBuilder {
        GeminiProviderBuilder::new()
    }

    /// The image model in use.
    pub fn model(&self) -> GeminiImageModel {
        self.model
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    async fn post(&self, model: &str, body: &GeminiRequest<'_>) -> Result<GenerationResponse> {
        let start = Instant::now();

        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), &text, &headers));
        }

        let wire: GeminiResponse = response.json().await?;
        tracing::debug!(
            model,
            duration_ms = start.elapsed().as_millis() as u64,
            candidates = wire.candidates.len(),
            "Gemini call complete"
        );
        wire.validate()
    }

    /// Checks that the model is reachable with the configured key.
    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/models/{}", self.base_url, self.model.as_str());

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;

        match response.status().as_u16() {
            401 | 403 => Err(GenEditError::Auth("Invalid API key".into())),
            404 => Err(GenEditError::InvalidRequest(
                "Model not found. Verify the model name is correct.".into(),
            )),
            s if !(200..300).contains(&s) => Err(GenEditError::Api {
                status: s,
                message: "Health check failed".into(),
            }),
            _ => Ok(()),
        }
    }
}

fn parse_error(status: u16, text: &str, headers: &reqwest::header::HeaderMap) -> GenEditError {
    let text = sanitize_error_message(text);
    match status {
        401 | 403 => GenEditError::Auth(text),
        404 => GenEditError::InvalidRequest(
            "Model not found. Verify the model name is correct.".into(),
        ),
        429 => GenEditError::RateLimited {
            retry_after: parse_retry_after(headers).map(std::time::Duration::from_secs),
        },
        _ => GenEditError::Api {
            status,
            message: text,
        },
    }
}

#[async_trait]
impl GenerationBackend for GeminiProvider {
    async fn generate(&self, parts: &[ContentPart]) -> Result<GenerationResponse> {
        let body = GeminiRequest::image_edit(parts);
        self.post(self.model.as_str(), &body).await
    }

    async fn generate_text(&self, prompt: &str) -> Result<String> {
        let body = GeminiRequest::text_only(prompt);
        let response = self.post(&self.text_model, &body).await?;
        let text: String = response
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| match p {
                        ResponsePart::Text(t) => Some(t),
                        ResponsePart::InlineImage(_) => None,
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(text)
    }

    fn name(&self) -> &str {
        "Gemini (Google)"
    }
}

// Request/Response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: GeminiConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    parts: std::borrow::Cow<'a, [ContentPart]>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    response_modalities: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

impl<'a> GeminiRequest<'a> {
    fn image_edit(parts: &'a [ContentPart]) -> Self {
        Self {
            contents: vec![GeminiContent {
                parts: std::borrow::Cow::Borrowed(parts),
            }],
            generation_config: GeminiConfig {
                response_modalities: vec!["IMAGE", "TEXT"],
                thinking_config: None,
            },
        }
    }

    fn text_only(prompt: &str) -> Self {
        Self {
            contents: vec![GeminiContent {
                parts: std::borrow::Cow::Owned(vec![ContentPart::text(prompt)]),
            }],
            generation_config: GeminiConfig {
                response_modalities: Vec::new(),
                thinking_config: Some(ThinkingConfig { thinking_budget: 0 }),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<InlineData>,
    #[serde(default)]
    thought: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

impl GeminiResponse {
    /// Turns the loosely-typed wire response into a [`GenerationResponse`].
    fn validate(self) -> Result<GenerationResponse> {
        let block_reason = self.prompt_feedback.and_then(|f| f.block_reason);

        let candidates = self
            .candidates
            .into_iter()
            .map(GeminiCandidate::validate)
            .collect::<Result<Vec<_>>>()?;

        Ok(GenerationResponse {
            candidates,
            block_reason,
        })
    }
}

impl GeminiCandidate {
    fn validate(self) -> Result<Candidate> {
        let finish_reason = FinishReason::from_api(self.finish_reason.as_deref());
        let mut parts = Vec::new();

        for part in self.content.map(|c| c.parts).unwrap_or_default() {
            match part {
                GeminiPartResponse {
                    inline_data: Some(inline),
                    ..
                } => {
                    if inline.data.is_empty() || inline.mime_type.is_empty() {
                        return Err(GenEditError::UnexpectedResponse(
                            "inline image with empty payload or MIME type".into(),
                        ));
                    }
                    parts.push(ResponsePart::InlineImage(InlineImage {
                        mime_type: inline.mime_type,
                        data: inline.data,
                    }));
                }
                GeminiPartResponse {
                    text: Some(text),
                    thought: None | Some(false),
                    ..
                } => parts.push(ResponsePart::Text(text)),
                other => tracing::debug!(?other, "dropping unsupported response part"),
            }
        }

        Ok(Candidate {
            finish_reason,
            parts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> Result<GenerationResponse> {
        let wire: GeminiResponse = serde_json::from_str(json)?;
        wire.validate()
    }

    #[test]
    fn test_blank_keys_fall_through() {
        let env = |name: &str| match name {
            "GEMINI_API_KEY" => Some("   ".to_string()),
            "GOOGLE_API_KEY" => Some("google-key".to_string()),
            _ => None,
        };
        assert_eq!(
            resolve_api_key(Some(String::new()), env).as_deref(),
            Some("google-key")
        );
        assert_eq!(
            resolve_api_key(Some("explicit".into()), env).as_deref(),
            Some("explicit")
        );
        assert_eq!(resolve_api_key(None, |_| Some(" ".into())), None);
    }

    #[test]
    fn test_gemini_model_as_str() {
        assert_eq!(
            GeminiImageModel::FlashImagePreview.as_str(),
            "gemini-2.5-flash-image-preview"
        );
        assert_eq!(GeminiImageModel::NanoBanana.as_str(), "gemini-2.5-flash-image");
        assert_eq!(
            GeminiImageModel::from_name("nano-banana-pro"),
            Some(GeminiImageModel::NanoBananaPro)
        );
        assert_eq!(GeminiImageModel::from_name("dall-e"), None);
    }

    #[test]
    fn test_gemini_model_default() {
        assert_eq!(
            GeminiImageModel::default(),
            GeminiImageModel::FlashImagePreview
        );
    }

    #[test]
    fn test_builder_with_explicit_key() {
        let provider = GeminiProviderBuilder::new()
            .api_key("test-key")
            .model(GeminiImageModel::NanoBanana)
            .base_url("http://localhost:8080/v1beta/")
            .build()
            .unwrap();
        assert_eq!(provider.model(), GeminiImageModel::NanoBanana);
        assert_eq!(
            provider.endpoint(provider.model().as_str()),
            "http://localhost:8080/v1beta/models/gemini-2.5-flash-image:generateContent"
        );
    }

    #[test]
    fn test_image_edit_request_shape() {
        let parts = vec![
            ContentPart::text("Edit this"),
            ContentPart::InlineImage {
                inline_data: InlineImage {
                    mime_type: "image/png".into(),
                    data: "iVBORw0KGgo=".into(),
                },
            },
        ];
        let json = serde_json::to_value(GeminiRequest::image_edit(&parts)).unwrap();

        assert_eq!(
            json["generationConfig"]["responseModalities"],
            serde_json::json!(["IMAGE", "TEXT"])
        );
        assert!(json["generationConfig"].get("thinkingConfig").is_none());
        let sent = &json["contents"][0]["parts"];
        assert_eq!(sent[0]["text"], "Edit this");
        assert_eq!(sent[1]["inlineData"]["mimeType"], "image/png");
        assert!(json.get("generation_config").is_none());
    }

    #[test]
    fn test_text_request_disables_thinking() {
        let json = serde_json::to_value(GeminiRequest::text_only("hola")).unwrap();
        assert_eq!(
            json["generationConfig"]["thinkingConfig"]["thinkingBudget"],
            0
        );
        assert!(json["generationConfig"].get("responseModalities").is_none());
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hola");
    }

    #[test]
    fn test_response_with_image() {
        let resp = decode(
            r#"{
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "Here is the edit."},
                        {"inlineData": {"mimeType": "image/png", "data": "iVBORw0KGgo="}}
                    ]
                },
                "finishReason": "STOP"
            }]
        }"#,
        )
        .unwrap();
        let candidate = &resp.candidates[0];
        assert_eq!(candidate.finish_reason, FinishReason::Stop);
        assert_eq!(candidate.parts.len(), 2);
        assert_eq!(candidate.first_image().unwrap().mime_type, "image/png");
        assert!(resp.block_reason.is_none());
    }

    #[test]
    fn test_response_safety_finish_reason() {
        let resp = decode(r#"{"candidates": [{"finishReason": "IMAGE_SAFETY"}]}"#).unwrap();
        assert!(resp.candidates[0].finish_reason.is_safety());
        assert!(resp.candidates[0].parts.is_empty());
    }

    #[test]
    fn test_response_with_prompt_feedback_block() {
        let resp = decode(
            r#"{
            "candidates": [],
            "promptFeedback": {"blockReason": "SAFETY", "blockReasonMessage": "blocked"}
        }"#,
        )
        .unwrap();
        assert!(resp.candidates.is_empty());
        assert_eq!(resp.block_reason.as_deref(), Some("SAFETY"));
    }

    #[test]
    fn test_response_drops_unknown_and_thought_parts() {
        let resp = decode(
            r#"{
            "candidates": [{
                "content": {"parts": [
                    {},
                    {"text": "thinking...", "thought": true},
                    {"functionCall": {"name": "x"}},
                    {"text": "done"}
                ]}
            }]
        }"#,
        )
        .unwrap();
        assert_eq!(
            resp.candidates[0].parts,
            vec![ResponsePart::Text("done".into())]
        );
    }

    #[test]
    fn test_response_rejects_empty_inline_payload() {
        let err = decode(
            r#"{"candidates": [{"content": {"parts": [
                {"inlineData": {"mimeType": "image/png", "data": ""}}
            ]}}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, GenEditError::UnexpectedResponse(_)));
    }

    #[test]
    fn test_response_rejects_malformed_inline_data() {
        let err = decode(r#"{"candidates": [{"content": {"parts": [{"inlineData": {}}]}}]}"#)
            .unwrap_err();
        assert!(matches!(err, GenEditError::Json(_)));
    }

    #[test]
    fn test_parse_error_mapping() {
        let headers = reqwest::header::HeaderMap::new();
        assert!(matches!(
            parse_error(401, "denied", &headers),
            GenEditError::Auth(_)
        ));
        assert!(matches!(
            parse_error(404, "", &headers),
            GenEditError::InvalidRequest(_)
        ));
        assert!(matches!(
            parse_error(429, "", &headers),
            GenEditError::RateLimited { retry_after: None }
        ));
        match parse_error(500, "boom", &headers) {
            GenEditError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
