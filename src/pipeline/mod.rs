//! Transcript-to-action pipeline
//!
//! Transcript -> TranscriptGate -> CommandPipeline -> ActionExecutor

pub mod gate;
pub mod session;

pub use gate::{GateDecision, TranscriptGate};
pub use session::{CommandPipeline, CommandReport, VoiceSession};
