//! Fan-out client: one assembled request, several independent variants.

use crate::edit::parts::{assemble, ContentPart};
use crate::edit::provider::{GenerationBackend, GenerationResponse};
use crate::edit::request::EditRequest;
use crate::edit::translate::translate_to_english;
use crate::error::{GenEditError, Result};
use crate::image::to_data_url;
use std::sync::Arc;
use std::time::Instant;

/// Number of variants requested per generate action.
pub const FANOUT_WIDTH: usize = 4;

/// Why a single variant call produced no image.
#[derive(Debug)]
pub enum VariantFailure {
    /// The safety filters withheld the image.
    Safety,
    /// The call succeeded but returned no image part.
    Empty {
        /// Text the model returned instead, if any.
        text: Option<String>,
    },
    /// The call itself failed.
    Transport(GenEditError),
}

impl VariantFailure {
    /// Converts the failure of variant `index` (1-based) into a user-facing error.
    pub fn into_error(self, index: usize) -> GenEditError {
        match self {
            Self::Safety => GenEditError::SafetyBlocked { index },
            Self::Empty { .. } => GenEditError::EmptyResponse { index },
            Self::Transport(source) => GenEditError::External {
                index,
                source: Box::new(source),
            },
        }
    }
}

/// The result of one variant call: a `data:` URL or the reason there is none.
pub type GenerationOutcome = std::result::Result<String, VariantFailure>;

/// Reads the first image out of a response for variant `index` (1-based).
pub fn extract_outcome(index: usize, response: &GenerationResponse) -> GenerationOutcome {
    let candidate = response.candidates.first();

    if let Some(image) = candidate.and_then(|c| c.first_image()) {
        return Ok(to_data_url(&image.mime_type, &image.data));
    }

    let text = candidate.and_then(|c| c.first_text()).map(str::to_string);
    if let Some(ref text) = text {
        tracing::warn!(index, "variant returned text instead of an image: {text}");
    }

    let safety = response.block_reason.is_some()
        || candidate.is_some_and(|c| c.finish_reason.is_safety());
    if safety {
        Err(VariantFailure::Safety)
    } else {
        Err(VariantFailure::Empty { text })
    }
}

/// Merges variant outcomes, in call order, into one result.
///
/// All variants must succeed; otherwise the lowest-indexed failure is reported.
pub fn reconcile(outcomes: Vec<GenerationOutcome>) -> Result<Vec<String>> {
    let mut urls = Vec::with_capacity(outcomes.len());
    for (i, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(url) => urls.push(url),
            Err(failure) => return Err(failure.into_error(i + 1)),
        }
    }
    Ok(urls)
}

/// Issues edit requests against a generation backend.
pub struct EditClient<B> {
    backend: Arc<B>,
}

impl<B> Clone for EditClient<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: GenerationBackend + 'static> EditClient<B> {
    /// Creates a client over `backend`.
    pub fn new(backend: B) -> Self {
        Self::from_arc(Arc::new(backend))
    }

    /// Creates a client over a shared backend.
    pub fn from_arc(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// The underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Generates [`FANOUT_WIDTH`] variants of the edit.
    ///
    /// Returns the variants as `data:` URLs in call order, or the first failure.
    pub async fn edit(&self, request: &EditRequest) -> Result<Vec<String>> {
        let parts: Arc<[ContentPart]> = assemble(request).into();
        let start = Instant::now();
        tracing::debug!(
            backend = self.backend.name(),
            parts = parts.len(),
            width = FANOUT_WIDTH,
            "starting edit fan-out"
        );

        let outcomes = self.fan_out(parts).await;
        let result = reconcile(outcomes);

        match &result {
            Ok(urls) => tracing::debug!(
                variants = urls.len(),
                duration_ms = start.elapsed().as_millis() as u64,
                "edit fan-out complete"
            ),
            Err(e) => tracing::warn!("edit fan-out failed: {e}"),
        }
        result
    }

    /// Runs the calls concurrently and waits for every one of them to settle.
    async fn fan_out(&self, parts: Arc<[ContentPart]>) -> Vec<GenerationOutcome> {
        let mut handles = Vec::with_capacity(FANOUT_WIDTH);

        for i in 0..FANOUT_WIDTH {
            let backend = Arc::clone(&self.backend);
            let parts = Arc::clone(&parts);
            let handle = tokio::spawn(async move {
                match backend.generate(&parts).await {
                    Ok(response) => extract_outcome(i + 1, &response),
                    Err(e) => Err(VariantFailure::Transport(e)),
                }
            });
            handles.push(handle);
        }

        let mut outcomes = Vec::with_capacity(FANOUT_WIDTH);
        for (i, handle) in handles.into_iter().enumerate() {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => Err(VariantFailure::Transport(GenEditError::TaskFailed(
                    e.to_string(),
                ))),
            };
            if let Err(ref failure) = outcome {
                tracing::debug!(index = i + 1, ?failure, "variant failed");
            }
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Translates `text` to English, returning it unchanged on any failure.
    pub async fn translate(&self, text: &str) -> String {
        translate_to_english(self.backend.as_ref(), text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::parts::InlineImage;
    use crate::edit::provider::{Candidate, FinishReason, ResponsePart};
    use crate::image::ImageAsset;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn image_response(data: &str) -> GenerationResponse {
        GenerationResponse {
            candidates: vec![Candidate {
                finish_reason: FinishReason::Stop,
                parts: vec![ResponsePart::InlineImage(InlineImage {
                    mime_type: "image/png".into(),
                    data: data.into(),
                })],
            }],
            block_reason: None,
        }
    }

    fn safety_response() -> GenerationResponse {
        GenerationResponse {
            candidates: vec![Candidate {
                finish_reason: FinishReason::Safety("SAFETY".into()),
                parts: vec![],
            }],
            block_reason: None,
        }
    }

    /// Answers the n-th call (0-based, in arrival order) with `respond(n)`.
    struct ScriptedBackend {
        calls: AtomicUsize,
        seen: Mutex<Vec<usize>>,
        respond: fn(usize) -> Result<GenerationResponse>,
    }

    impl ScriptedBackend {
        fn new(respond: fn(usize) -> Result<GenerationResponse>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
                respond,
            }
        }
    }

    #[async_trait]
    impl GenerationBackend for ScriptedBackend {
        async fn generate(&self, parts: &[ContentPart]) -> Result<GenerationResponse> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(parts.len());
            tokio::task::yield_now().await;
            (self.respond)(n)
        }

        async fn generate_text(&self, _prompt: &str) -> Result<String> {
            Err(GenEditError::InvalidRequest("no text".into()))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn request() -> EditRequest {
        EditRequest::new(ImageAsset::from_bytes(vec![1, 2, 3], "image/png"))
            .with_prompt("add a hat")
            .with_style_image(ImageAsset::from_bytes(vec![4], "image/jpeg"))
    }

    #[test]
    fn test_extract_image_as_data_url() {
        let outcome = extract_outcome(1, &image_response("iVBOR"));
        assert_eq!(outcome.unwrap(), "data:image/png;base64,iVBOR");
    }

    #[test]
    fn test_extract_skips_leading_text() {
        let mut response = image_response("QUJD");
        response.candidates[0]
            .parts
            .insert(0, ResponsePart::Text("Here is your image".into()));
        assert_eq!(
            extract_outcome(2, &response).unwrap(),
            "data:image/png;base64,QUJD"
        );
    }

    #[test]
    fn test_extract_safety() {
        assert!(matches!(
            extract_outcome(1, &safety_response()),
            Err(VariantFailure::Safety)
        ));

        let blocked = GenerationResponse {
            candidates: vec![],
            block_reason: Some("SAFETY".into()),
        };
        assert!(matches!(
            extract_outcome(1, &blocked),
            Err(VariantFailure::Safety)
        ));
    }

    #[test]
    fn test_extract_empty_keeps_text() {
        let response = GenerationResponse {
            candidates: vec![Candidate {
                finish_reason: FinishReason::Stop,
                parts: vec![ResponsePart::Text("I can't do that".into())],
            }],
            block_reason: None,
        };
        match extract_outcome(3, &response) {
            Err(VariantFailure::Empty { text }) => {
                assert_eq!(text.as_deref(), Some("I can't do that"))
            }
            other => panic!("expected empty failure, got {other:?}"),
        }

        assert!(matches!(
            extract_outcome(1, &GenerationResponse::default()),
            Err(VariantFailure::Empty { text: None })
        ));
    }

    #[test]
    fn test_reconcile_all_success_keeps_order() {
        let outcomes = (0..4).map(|i| Ok(format!("data:image/png;base64,{i}"))).collect();
        let urls = reconcile(outcomes).unwrap();
        assert_eq!(
            urls,
            [
                "data:image/png;base64,0",
                "data:image/png;base64,1",
                "data:image/png;base64,2",
                "data:image/png;base64,3",
            ]
        );
    }

    #[test]
    fn test_reconcile_safety_on_fourth_call() {
        let outcomes: Vec<GenerationOutcome> = (0..4)
            .map(|i| {
                if i == 3 {
                    extract_outcome(i + 1, &safety_response())
                } else {
                    extract_outcome(i + 1, &image_response("AAAA"))
                }
            })
            .collect();
        let err = reconcile(outcomes).unwrap_err();
        assert!(err.is_safety());
        assert_eq!(err.variant_index(), Some(4));
        assert!(err.to_string().contains("image 4"));
    }

    #[test]
    fn test_reconcile_first_failure_wins() {
        let outcomes = vec![
            Ok("data:image/png;base64,A".to_string()),
            Err(VariantFailure::Empty { text: None }),
            Err(VariantFailure::Safety),
            Err(VariantFailure::Transport(GenEditError::Auth("x".into()))),
        ];
        let err = reconcile(outcomes).unwrap_err();
        assert!(matches!(err, GenEditError::EmptyResponse { index: 2 }));
    }

    #[test]
    fn test_reconcile_transport_is_prefixed() {
        let outcomes = vec![Err(VariantFailure::Transport(GenEditError::Api {
            status: 500,
            message: "internal".into(),
        }))];
        let err = reconcile(outcomes).unwrap_err();
        assert_eq!(
            err.to_string(),
            "external API error: API error: 500 - internal"
        );
    }

    #[tokio::test]
    async fn test_edit_returns_four_variants() {
        let client = EditClient::new(ScriptedBackend::new(|n| {
            Ok(image_response(&format!("IMG{n}")))
        }));
        let urls = client.edit(&request()).await.unwrap();

        assert_eq!(urls.len(), FANOUT_WIDTH);
        let mut sorted = urls.clone();
        sorted.sort();
        assert_eq!(
            sorted,
            [
                "data:image/png;base64,IMG0",
                "data:image/png;base64,IMG1",
                "data:image/png;base64,IMG2",
                "data:image/png;base64,IMG3",
            ]
        );
    }

    /// Earlier calls take longer, so completion order is the reverse of issue order.
    struct StaggeredBackend {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GenerationBackend for StaggeredBackend {
        async fn generate(&self, _parts: &[ContentPart]) -> Result<GenerationResponse> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let delay = (FANOUT_WIDTH - n) as u64 * 20;
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            Ok(image_response(&format!("IMG{n}")))
        }

        async fn generate_text(&self, _prompt: &str) -> Result<String> {
            Err(GenEditError::InvalidRequest("no text".into()))
        }

        fn name(&self) -> &str {
            "staggered"
        }
    }

    #[tokio::test]
    async fn test_edit_keeps_issue_order_not_completion_order() {
        let client = EditClient::new(StaggeredBackend {
            calls: AtomicUsize::new(0),
        });
        let urls = client.edit(&request()).await.unwrap();
        assert_eq!(
            urls,
            [
                "data:image/png;base64,IMG0",
                "data:image/png;base64,IMG1",
                "data:image/png;base64,IMG2",
                "data:image/png;base64,IMG3",
            ]
        );
    }

    #[tokio::test]
    async fn test_edit_sends_identical_parts_to_every_call() {
        let client = EditClient::new(ScriptedBackend::new(|_| Ok(image_response("A"))));
        client.edit(&request()).await.unwrap();

        let seen = client.backend().seen.lock().unwrap().clone();
        // preamble, base, style label, style image
        assert_eq!(seen, vec![4; FANOUT_WIDTH]);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_cancel_the_others() {
        let client = EditClient::new(ScriptedBackend::new(|n| {
            if n == 1 {
                Ok(safety_response())
            } else {
                Ok(image_response("A"))
            }
        }));
        let err = client.edit(&request()).await.unwrap_err();

        assert!(err.is_safety());
        assert_eq!(client.backend().calls.load(Ordering::SeqCst), FANOUT_WIDTH);
    }

    #[tokio::test]
    async fn test_transport_error_is_wrapped() {
        let client = EditClient::new(ScriptedBackend::new(|_| {
            Err(GenEditError::RateLimited { retry_after: None })
        }));
        let err = client.edit(&request()).await.unwrap_err();
        assert!(matches!(err, GenEditError::External { index: 1, .. }));
        assert!(err.to_string().starts_with("external API error: rate limited"));
    }
}
