//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

/// A 1-based line/column position in a text buffer
///
/// Columns count characters, so the position after the last character of a
/// line is `chars + 1` (the line's max column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// Start of a line
    pub fn line_start(line: u32) -> Self {
        Self { line, column: 1 }
    }
}

/// A half-open range between two positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextRange {
    pub start: Position,
    pub end: Position,
}

impl TextRange {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Empty range at a position, used for pure insertions
    pub fn caret(at: Position) -> Self {
        Self { start: at, end: at }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// One range replacement; a batch of these is applied atomically by the buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub range: TextRange,
    pub text: String,
}

impl TextEdit {
    pub fn replace(range: TextRange, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
        }
    }

    pub fn insert(at: Position, text: impl Into<String>) -> Self {
        Self::replace(TextRange::caret(at), text)
    }

    pub fn delete(range: TextRange) -> Self {
        Self::replace(range, String::new())
    }
}

/// Opaque handle to a highlight decoration owned by the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecorationId(pub Uuid);

impl DecorationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DecorationId {
    fn default() -> Self {
        Self::new()
    }
}

/// Highlight request passed to the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoration {
    pub range: TextRange,
    /// The match the cursor is on gets a distinct highlight
    pub current: bool,
}

/// One utterance from speech recognition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub text: String,
    pub received_at: Instant,
}

impl Transcript {
    pub fn new(text: impl Into<String>, received_at: Instant) -> Self {
        Self {
            text: text.into(),
            received_at,
        }
    }
}
