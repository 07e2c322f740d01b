//! Prompt translation.

use crate::edit::provider::GenerationBackend;

/// Asks the backend to translate `text` to English.
///
/// Fails open: on any error, or an empty answer, the original text comes back.
/// Whitespace-only input returns an empty string without calling the backend.
pub async fn translate_to_english<B: GenerationBackend + ?Sized>(backend: &B, text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let prompt = format!(
        "Translate the following text to English. If it is already in English, simply return the original text without any modification or extra phrases. Text: \"{text}\""
    );

    match backend.generate_text(&prompt).await {
        Ok(translated) => {
            let translated = translated.trim();
            if translated.is_empty() {
                tracing::warn!("translation returned no text, keeping original");
                text.to_string()
            } else {
                translated.to_string()
            }
        }
        Err(e) => {
            tracing::warn!("translation failed, keeping original: {e}");
            text.to_string()
        }
    }
}
