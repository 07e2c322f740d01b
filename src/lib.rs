#![warn(missing_docs)]
//! GenEdit - multi-reference AI image editing.
//!
//! Combine a base image with a prompt, style references, a sketched or
//! uploaded pose, and a camera angle, then get four edited variants back
//! from Gemini.
//!
//! # Quick Start
//!
//! ```no_run
//! use genedit::{AngleDirective, EditClient, EditRequest, GeminiProvider, ImageAsset};
//!
//! #[tokio::main]
//! async fn main() -> genedit::Result<()> {
//!     let client = EditClient::new(GeminiProvider::builder().build()?);
//!     let request = EditRequest::new(ImageAsset::load("portrait.jpg").await?)
//!         .with_prompt("Make the character a cyberpunk warrior")
//!         .with_style_image(ImageAsset::load("neon.png").await?)
//!         .with_angle(AngleDirective::LowAngle);
//!
//!     let variants = client.edit(&request).await?;
//!     for (i, url) in variants.iter().enumerate() {
//!         println!("variant {}: {} bytes", i + 1, url.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Sketching a pose
//!
//! [`sketch::StrokeSurface`] rasterizes pointer strokes and exports them as a
//! PNG asset that can be attached with [`EditRequest::with_pose_drawing`].
//!
//! # Modules
//!
//! - [`edit`]: request assembly, the fan-out client, editor state, translation
//! - [`sketch`]: freehand pose drawing
//! - [`image`]: image assets and data URLs
//! - [`identity`]: credential decoding and the sign-in session
//! - [`config`]: API key and client id

pub mod config;
pub mod edit;
mod error;
pub mod identity;
pub mod image;
pub mod sketch;

// Re-export error types at crate root
pub use error::{GenEditError, Result};

pub use config::AppConfig;
pub use edit::providers::{GeminiImageModel, GeminiProvider, GeminiProviderBuilder};
pub use edit::{
    AngleDirective, AngleSelection, ContentPart, EditClient, EditRequest, EditorState,
    GenerationBackend, GenerationResponse, FANOUT_WIDTH,
};
pub use image::{ImageAsset, ImageFormat};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::edit::{
        AngleDirective, EditClient, EditRequest, EditorState, GenerationBackend,
    };
    pub use crate::error::{GenEditError, Result};
    pub use crate::image::ImageAsset;
    pub use crate::sketch::{DrawingChange, StrokeSurface};
    pub use crate::GeminiProvider;
}
