//! Vox - voice command pipeline for a code editor
//!
//! Spoken transcripts are classified into an intent, turned into a typed
//! action by a completion service, and executed against the editor's buffer,
//! file explorer and terminal.

pub mod command;
pub mod core;
pub mod host;
pub mod llm;
pub mod pipeline;
