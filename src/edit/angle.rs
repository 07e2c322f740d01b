//! Camera angle directives.

use serde::{Deserialize, Serialize};

/// A discrete camera-framing instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AngleDirective {
    /// Tight close-up on the main subject.
    ZoomIn,
    /// Outpaint around the original scene.
    ZoomOut,
    /// Look up at the subject.
    LowAngle,
    /// Look down on the subject.
    HighAngle,
    /// Show the subject from behind.
    TurnAround,
}

impl AngleDirective {
    /// Every directive, in display order.
    pub const ALL: [AngleDirective; 5] = [
        Self::ZoomIn,
        Self::ZoomOut,
        Self::LowAngle,
        Self::HighAngle,
        Self::TurnAround,
    ];

    /// Returns the identifier (e.g., "zoom-in").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ZoomIn => "zoom-in",
            Self::ZoomOut => "zoom-out",
            Self::LowAngle => "low-angle",
            Self::HighAngle => "high-angle",
            Self::TurnAround => "turn-around",
        }
    }

    /// Returns a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ZoomIn => "Zoom In",
            Self::ZoomOut => "Zoom Out",
            Self::LowAngle => "Low Angle",
            Self::HighAngle => "High Angle",
            Self::TurnAround => "Turn Around",
        }
    }

    /// Returns the sentence sent to the model for this directive.
    pub fn instruction(&self) -> &'static str {
        match self {
            Self::ZoomIn => ZOOM_IN_INSTRUCTION,
            Self::ZoomOut => ZOOM_OUT_INSTRUCTION,
            Self::LowAngle => LOW_ANGLE_INSTRUCTION,
            Self::HighAngle => HIGH_ANGLE_INSTRUCTION,
            Self::TurnAround => TURN_AROUND_INSTRUCTION,
        }
    }

    /// Parses an identifier such as "low-angle".
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == id)
    }
}

impl std::fmt::Display for AngleDirective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

const ZOOM_IN_INSTRUCTION: &str = "Perform a tight zoom-in on the main subject. The result should look like a close-up shot, significantly magnifying the central focus of the original image while maintaining detail.";
const ZOOM_OUT_INSTRUCTION: &str = "Your primary task is to outpaint the provided image. The original image content must be perfectly preserved in the center. Expand the scene around it, generating new, contextually appropriate details to fill a larger canvas. The final image should be a seamless, wider view of the original scene.";
const LOW_ANGLE_INSTRUCTION: &str =
    "Recreate the scene from a dramatic low angle, looking up at the subject.";
const HIGH_ANGLE_INSTRUCTION: &str =
    "Recreate the scene from a high angle, looking down upon the subject.";
const TURN_AROUND_INSTRUCTION: &str =
    "Show the subject from the opposite side, as if they have turned around 180 degrees.";

/// The active angle, with toggle semantics: at most one directive is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AngleSelection(Option<AngleDirective>);

impl AngleSelection {
    /// Creates an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects `directive`, or clears the selection if it is already active.
    pub fn toggle(&mut self, directive: AngleDirective) {
        self.0 = if self.0 == Some(directive) {
            None
        } else {
            Some(directive)
        };
    }

    /// Clears the selection.
    pub fn clear(&mut self) {
        self.0 = None;
    }

    /// The active directive, if any.
    pub fn active(&self) -> Option<AngleDirective> {
        self.0
    }

    /// True if `directive` is the active one.
    pub fn is_active(&self, directive: AngleDirective) -> bool {
        self.0 == Some(directive)
    }
}

impl From<Option<AngleDirective>> for AngleSelection {
    fn from(angle: Option<AngleDirective>) -> Self {
        Self(angle)
    }
}
