//! Completion-service integration
//!
//! Transcript -> classifier -> intent -> generator -> raw text -> parser -> Action

pub mod classifier;
pub mod client;
pub mod context;
pub mod generators;
pub mod parser;
pub mod prompts;
pub mod resilience;
pub mod scripted;

pub use classifier::{classify, Intent, IntentKind};
pub use client::LlmClient;
pub use context::EditorContext;
pub use generators::generate_action;
pub use parser::parse_action;
pub use resilience::{CompletionService, ResilientCompletion, RetryPolicy};
pub use scripted::ScriptedService;
