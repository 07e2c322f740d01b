//! Generation backends.

mod gemini;

pub use gemini::{GeminiImageModel, GeminiProvider, GeminiProviderBuilder};
