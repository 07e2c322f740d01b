//! Application configuration.

use crate::error::{GenEditError, Result};

/// Credentials needed to run the editor.
#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Gemini API key.
    pub api_key: String,
    /// OAuth client id for the sign-in provider.
    pub google_client_id: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &"[REDACTED]")
            .field("google_client_id", &self.google_client_id)
            .finish()
    }
}

impl AppConfig {
    /// Creates a config; both fields must be non-blank.
    pub fn new(api_key: impl Into<String>, google_client_id: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into().trim().to_string();
        let google_client_id = google_client_id.into().trim().to_string();
        if api_key.is_empty() || google_client_id.is_empty() {
            return Err(GenEditError::Config("Both fields are required.".into()));
        }
        Ok(Self {
            api_key,
            google_client_id,
        })
    }

    /// Reads `GEMINI_API_KEY` (or `GOOGLE_API_KEY`) and `GOOGLE_CLIENT_ID`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("GOOGLE_API_KEY"))
            .unwrap_or_default();
        let client_id = std::env::var("GOOGLE_CLIENT_ID").unwrap_or_default();
        Self::new(api_key, client_id)
    }
}
