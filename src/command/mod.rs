//! Action model and execution
//!
//! Completion JSON -> Action -> ActionExecutor -> host side effects

pub mod action;
pub mod executor;
pub mod search;

pub use action::{Action, CursorDirection, NewLinePosition};
pub use executor::{ActionExecutor, ExecutionResult, Outcome};
pub use search::{SearchNavigator, SearchOutcome, SearchState};
