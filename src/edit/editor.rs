//! Editor state: the current inputs, generate gating, and results.
//!
//! Each generate action takes a [`GenerationTicket`]. Results are applied only
//! if their ticket is still the latest one, so a slow request that was
//! superseded (or outlived a [`EditorState::reset`]) cannot overwrite newer state.

use crate::edit::angle::{AngleDirective, AngleSelection};
use crate::edit::request::{has_secondary_input, EditRequest};
use crate::error::Result;
use crate::image::ImageAsset;
use crate::sketch::DrawingChange;

/// Shown when no base image is selected.
pub const HINT_BASE_IMAGE_REQUIRED: &str = "A base image is required to generate.";
/// Shown when only the base image is present.
pub const HINT_INPUT_REQUIRED: &str =
    "Please provide at least one input (prompt, style, pose, or angle).";

/// Identifies one generate action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationTicket(u64);

/// Form inputs plus the output of the last generate action.
#[derive(Debug, Default)]
pub struct EditorState {
    /// Image being edited.
    pub base_image: Option<ImageAsset>,
    /// Freeform instruction.
    pub prompt: String,
    /// Style references.
    pub style_images: Vec<ImageAsset>,
    /// Pose sketch from the drawing surface.
    pub pose_drawing: Option<ImageAsset>,
    /// Pose references.
    pub pose_images: Vec<ImageAsset>,
    angle: AngleSelection,
    outputs: Vec<String>,
    error: Option<String>,
    loading: bool,
    generation: u64,
}

impl EditorState {
    /// Creates an empty editor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the base image with the first of the selected files.
    pub fn set_base_images(&mut self, images: Vec<ImageAsset>) {
        self.base_image = images.into_iter().next();
    }

    /// Toggles a camera angle directive.
    pub fn toggle_angle(&mut self, directive: AngleDirective) {
        self.angle.toggle(directive);
    }

    /// The active camera angle.
    pub fn angle(&self) -> Option<AngleDirective> {
        self.angle.active()
    }

    /// Applies a change reported by the drawing surface.
    pub fn apply_drawing(&mut self, change: DrawingChange) {
        self.pose_drawing = change.into_drawing();
    }

    /// True if anything besides the base image would instruct the model.
    pub fn has_instruction(&self) -> bool {
        has_secondary_input(
            &self.prompt,
            self.style_images.len(),
            self.pose_drawing.is_some(),
            self.pose_images.len(),
            self.angle.active(),
        )
    }

    /// True if a generate action may start now.
    pub fn can_generate(&self) -> bool {
        self.base_image.is_some() && self.has_instruction() && !self.loading
    }

    /// Explains why generation is blocked by missing input.
    pub fn hint(&self) -> Option<&'static str> {
        if self.base_image.is_none() {
            Some(HINT_BASE_IMAGE_REQUIRED)
        } else if !self.has_instruction() {
            Some(HINT_INPUT_REQUIRED)
        } else {
            None
        }
    }

    /// True while a generate action is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Images from the last successful generate action.
    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    /// Error from the last failed generate action.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Starts a generate action if the inputs allow it.
    ///
    /// Clears previous outputs and errors and snapshots the inputs.
    pub fn begin_generation(&mut self) -> Option<(GenerationTicket, EditRequest)> {
        if !self.can_generate() {
            return None;
        }
        let base_image = self.base_image.clone()?;

        self.loading = true;
        self.error = None;
        self.outputs.clear();
        self.generation += 1;

        let request = EditRequest {
            base_image,
            prompt: self.prompt.clone(),
            style_images: self.style_images.clone(),
            pose_drawing: self.pose_drawing.clone(),
            pose_images: self.pose_images.clone(),
            angle: self.angle.active(),
        };
        tracing::debug!(generation = self.generation, "generation started");
        Some((GenerationTicket(self.generation), request))
    }

    /// Stores the result of a generate action.
    ///
    /// Returns false, leaving the state untouched, if the ticket is stale.
    pub fn finish_generation(
        &mut self,
        ticket: GenerationTicket,
        result: Result<Vec<String>>,
    ) -> bool {
        if ticket.0 != self.generation {
            tracing::debug!(
                stale = ticket.0,
                current = self.generation,
                "discarding superseded generation result"
            );
            return false;
        }

        self.loading = false;
        match result {
            Ok(urls) => self.outputs = urls,
            Err(e) => self.error = Some(format!("Generation failed. {e}")),
        }
        true
    }

    /// Clears every input and output and invalidates any in-flight action.
    pub fn reset(&mut self) {
        let generation = self.generation + 1;
        *self = Self {
            generation,
            ..Self::default()
        };
    }
}

/// File name offered when downloading variant `index` (0-based).
pub fn download_name(index: usize) -> String {
    format!("generated-image-{}.png", index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenEditError;

    fn png() -> ImageAsset {
        ImageAsset::from_bytes(vec![0x89, b'P'], "image/png")
    }

    fn ready_editor() -> EditorState {
        let mut editor = EditorState::new();
        editor.set_base_images(vec![png()]);
        editor.prompt = "make it night".into();
        editor
    }

    #[test]
    fn test_gating_needs_base_image() {
        let mut editor = EditorState::new();
        editor.prompt = "something".into();
        assert!(!editor.can_generate());
        assert_eq!(editor.hint(), Some(HINT_BASE_IMAGE_REQUIRED));
    }

    #[test]
    fn test_gating_base_image_alone_is_disabled() {
        let mut editor = EditorState::new();
        editor.set_base_images(vec![png()]);
        editor.prompt = "  ".into();
        assert!(!editor.can_generate());
        assert_eq!(editor.hint(), Some(HINT_INPUT_REQUIRED));

        editor.style_images.push(png());
        assert!(editor.can_generate());
        assert_eq!(editor.hint(), None);
    }

    #[test]
    fn test_gating_angle_and_drawing_count() {
        let mut editor = EditorState::new();
        editor.set_base_images(vec![png()]);

        editor.toggle_angle(AngleDirective::HighAngle);
        assert!(editor.can_generate());
        editor.toggle_angle(AngleDirective::HighAngle);
        assert!(!editor.can_generate());

        editor.apply_drawing(DrawingChange::Drawn(png()));
        assert!(editor.can_generate());
        editor.apply_drawing(DrawingChange::Cleared);
        assert!(!editor.can_generate());
    }

    #[test]
    fn test_base_image_takes_first_selection() {
        let mut editor = EditorState::new();
        let second = ImageAsset::from_bytes(vec![9], "image/jpeg");
        editor.set_base_images(vec![png(), second]);
        assert_eq!(editor.base_image.as_ref().unwrap().mime_type(), "image/png");

        editor.set_base_images(Vec::new());
        assert!(editor.base_image.is_none());
    }

    #[test]
    fn test_begin_snapshots_inputs() {
        let mut editor = ready_editor();
        editor.toggle_angle(AngleDirective::ZoomIn);
        let (_, request) = editor.begin_generation().unwrap();

        assert_eq!(request.prompt, "make it night");
        assert_eq!(request.angle, Some(AngleDirective::ZoomIn));
        assert!(editor.is_loading());
        assert!(!editor.can_generate());
        assert!(editor.begin_generation().is_none());
    }

    #[test]
    fn test_finish_success_and_failure() {
        let mut editor = ready_editor();
        let (ticket, _) = editor.begin_generation().unwrap();
        assert!(editor.finish_generation(ticket, Ok(vec!["data:image/png;base64,A".into()])));
        assert_eq!(editor.outputs().len(), 1);
        assert!(!editor.is_loading());

        let (ticket, _) = editor.begin_generation().unwrap();
        assert!(editor.outputs().is_empty());
        editor.finish_generation(ticket, Err(GenEditError::SafetyBlocked { index: 4 }));
        assert!(editor.outputs().is_empty());
        let error = editor.error().unwrap();
        assert!(error.starts_with("Generation failed. external API error: image 4"));

        let (ticket, _) = editor.begin_generation().unwrap();
        assert!(editor.error().is_none());
        editor.finish_generation(ticket, Ok(vec![]));
    }

    #[test]
    fn test_stale_result_is_discarded() {
        let mut editor = ready_editor();
        let (stale, _) = editor.begin_generation().unwrap();
        editor.reset();
        editor.set_base_images(vec![png()]);
        editor.prompt = "again".into();
        let (current, _) = editor.begin_generation().unwrap();

        assert!(!editor.finish_generation(stale, Ok(vec!["old".into()])));
        assert!(editor.is_loading());
        assert!(editor.outputs().is_empty());

        assert!(editor.finish_generation(current, Ok(vec!["new".into()])));
        assert_eq!(editor.outputs(), ["new"]);
    }

    #[test]
    fn test_reset_clears_inputs() {
        let mut editor = ready_editor();
        editor.toggle_angle(AngleDirective::TurnAround);
        editor.reset();
        assert!(editor.base_image.is_none());
        assert!(editor.prompt.is_empty());
        assert_eq!(editor.angle(), None);
        assert!(!editor.is_loading());
    }

    #[test]
    fn test_download_name() {
        assert_eq!(download_name(0), "generated-image-1.png");
        assert_eq!(download_name(3), "generated-image-4.png");
    }
}
