//! Request assembly: turns an [`EditRequest`] into ordered content parts.
//!
//! Order is part of the instruction the model receives: the instruction text
//! comes first, then the base image, then each labelled group of references.

use crate::edit::request::EditRequest;
use crate::image::ImageAsset;
use serde::Serialize;

/// Opening of every instruction.
pub const PREAMBLE: &str = "You are an expert AI image editor. Edit the base image according to the following instructions.";
/// Label preceding style references.
pub const STYLE_LABEL: &str = "Use the following images as style references:";
/// Label preceding the pose sketch.
pub const POSE_DRAWING_LABEL: &str = "Use this sketch as a pose reference:";
/// Label preceding pose references.
pub const POSE_IMAGES_LABEL: &str = "Use the following images as pose references:";

/// One atomic unit of a generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ContentPart {
    /// Natural-language text.
    Text {
        /// The text.
        text: String,
    },
    /// An inline image.
    InlineImage {
        /// MIME type and payload.
        #[serde(rename = "inlineData")]
        inline_data: InlineImage,
    },
}

/// Inline image payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineImage {
    /// MIME type.
    pub mime_type: String,
    /// Base64 payload without a data URL prefix.
    pub data: String,
}

impl ContentPart {
    /// Creates a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Creates an inline image part from an asset, keeping its MIME type.
    pub fn image(asset: &ImageAsset) -> Self {
        Self::image_as(asset, asset.mime_type())
    }

    /// Creates an inline image part from an asset with an explicit MIME type.
    pub fn image_as(asset: &ImageAsset, mime_type: &str) -> Self {
        Self::InlineImage {
            inline_data: InlineImage {
                mime_type: mime_type.to_string(),
                data: asset.base64_payload().to_string(),
            },
        }
    }

    /// Returns the text, if this is a text part.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::InlineImage { .. } => None,
        }
    }

    /// Returns the inline image, if this is an image part.
    pub fn as_image(&self) -> Option<&InlineImage> {
        match self {
            Self::InlineImage { inline_data } => Some(inline_data),
            Self::Text { .. } => None,
        }
    }
}

/// Builds the instruction text: preamble, prompt, and angle sentence.
pub fn instruction_text(request: &EditRequest) -> String {
    let mut text = String::from(PREAMBLE);
    let prompt = request.prompt.trim();
    if !prompt.is_empty() {
        text.push_str(&format!(" Main instruction: \"{prompt}\"."));
    }
    if let Some(angle) = request.angle {
        text.push_str(" Camera angle instruction: ");
        text.push_str(angle.instruction());
    }
    text
}

/// Assembles the ordered part list for a request.
pub fn assemble(request: &EditRequest) -> Vec<ContentPart> {
    let mut parts = vec![
        ContentPart::text(instruction_text(request)),
        ContentPart::image(&request.base_image),
    ];

    if !request.style_images.is_empty() {
        parts.push(ContentPart::text(STYLE_LABEL));
        parts.extend(request.style_images.iter().map(ContentPart::image));
    }

    if let Some(ref drawing) = request.pose_drawing {
        parts.push(ContentPart::text(POSE_DRAWING_LABEL));
        parts.push(ContentPart::image_as(drawing, "image/png"));
    }

    if !request.pose_images.is_empty() {
        parts.push(ContentPart::text(POSE_IMAGES_LABEL));
        parts.extend(request.pose_images.iter().map(ContentPart::image));
    }

    parts
}
