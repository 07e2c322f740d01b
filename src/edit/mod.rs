//! Edit requests: assembly, fan-out, and the editor state around them.

pub mod angle;
pub mod editor;
pub mod fanout;
pub mod parts;
mod provider;
pub mod providers;
mod request;
pub mod translate;

pub use angle::{AngleDirective, AngleSelection};
pub use editor::{EditorState, GenerationTicket};
pub use fanout::{EditClient, GenerationOutcome, VariantFailure, FANOUT_WIDTH};
pub use parts::{assemble, ContentPart, InlineImage};
pub use provider::{Candidate, FinishReason, GenerationBackend, GenerationResponse, ResponsePart};
pub use request::EditRequest;
