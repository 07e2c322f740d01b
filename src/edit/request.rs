//! Edit requests.

use crate::edit::angle::AngleDirective;
use crate::image::ImageAsset;

/// Everything the model needs for one generate action.
///
/// Built fresh from the current inputs each time; never persisted.
#[derive(Debug, Clone)]
pub struct EditRequest {
    /// The image being edited.
    pub base_image: ImageAsset,
    /// Freeform instruction.
    pub prompt: String,
    /// Style references, in upload order.
    pub style_images: Vec<ImageAsset>,
    /// Sketched pose, always PNG.
    pub pose_drawing: Option<ImageAsset>,
    /// Pose references, in upload order.
    pub pose_images: Vec<ImageAsset>,
    /// Camera angle directive.
    pub angle: Option<AngleDirective>,
}

impl EditRequest {
    /// Creates a request with only a base image.
    pub fn new(base_image: ImageAsset) -> Self {
        Self {
            base_image,
            prompt: String::new(),
            style_images: Vec::new(),
            pose_drawing: None,
            pose_images: Vec::new(),
            angle: None,
        }
    }

    /// Sets the prompt text.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Appends a style reference.
    pub fn with_style_image(mut self, image: ImageAsset) -> Self {
        self.style_images.push(image);
        self
    }

    /// Sets the pose sketch.
    pub fn with_pose_drawing(mut self, drawing: ImageAsset) -> Self {
        self.pose_drawing = Some(drawing);
        self
    }

    /// Appends a pose reference.
    pub fn with_pose_image(mut self, image: ImageAsset) -> Self {
        self.pose_images.push(image);
        self
    }

    /// Sets the camera angle.
    pub fn with_angle(mut self, angle: AngleDirective) -> Self {
        self.angle = Some(angle);
        self
    }

    /// True if the trimmed prompt is non-empty.
    pub fn has_prompt(&self) -> bool {
        !self.prompt.trim().is_empty()
    }

    /// True if at least one input besides the base image is present.
    pub fn has_instruction(&self) -> bool {
        has_secondary_input(
            &self.prompt,
            self.style_images.len(),
            self.pose_drawing.is_some(),
            self.pose_images.len(),
            self.angle,
        )
    }
}

/// Generate gating: the base image alone is never enough.
pub(crate) fn has_secondary_input(
    prompt: &str,
    style_count: usize,
    has_drawing: bool,
    pose_count: usize,
    angle: Option<AngleDirective>,
) -> bool {
    !prompt.trim().is_empty() || style_count > 0 || has_drawing || pose_count > 0 || angle.is_some()
}
