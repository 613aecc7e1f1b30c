//! Gather editor context for completion prompts
//!
//! A fresh [`EditorContext`] is captured for every command from whatever the
//! buffer looks like at that moment. It is never cached or updated in place;
//! the next command takes a new snapshot.

use crate::core::config::PipelineConfig;
use crate::core::types::{Position, TextRange};
use crate::host::EditorBuffer;

/// Immutable snapshot of the open document
#[derive(Debug, Clone, PartialEq)]
pub struct EditorContext {
    pub file_name: String,
    pub language: String,
    pub cursor_line: u32,
    pub cursor_column: u32,
    pub total_lines: u32,
    /// Start of the buffer, cut at the configured length
    pub buffer_excerpt: String,
    /// Lines around the cursor
    pub surrounding_excerpt: String,
    pub selected_text: String,
    pub has_buffer: bool,
}

impl EditorContext {
    /// Snapshot for when no file is open
    pub fn empty() -> Self {
        Self {
            file_name: "untitled".into(),
            language: "javascript".into(),
            cursor_line: 1,
            cursor_column: 1,
            total_lines: 0,
            buffer_excerpt: String::new(),
            surrounding_excerpt: String::new(),
            selected_text: String::new(),
            has_buffer: false,
        }
    }

    /// Capture the current state of `buffer`
    pub fn capture(buffer: Option<&dyn EditorBuffer>, config: &PipelineConfig) -> Self {
        let Some(buffer) = buffer else {
            return Self::empty();
        };

        let file_name = buffer.file_name().unwrap_or_else(|| "untitled".into());
        let language = language_for_file(&file_name).to_string();
        let cursor = buffer.cursor();
        let total_lines = buffer.line_count();

        let text = buffer.text();
        let buffer_excerpt = truncate_chars(&text, config.context_excerpt_chars);

        let first = cursor.line.saturating_sub(config.surrounding_lines).max(1);
        let last = (cursor.line + config.surrounding_lines).min(total_lines.max(1));
        let surrounding_excerpt = buffer.text_in_range(TextRange::new(
            Position::line_start(first),
            Position::new(last, buffer.line_max_column(last)),
        ));

        let selected_text = buffer
            .selection()
            .map(|range| buffer.text_in_range(range))
            .unwrap_or_default();

        Self {
            file_name,
            language,
            cursor_line: cursor.line,
            cursor_column: cursor.column,
            total_lines,
            buffer_excerpt,
            surrounding_excerpt,
            selected_text,
            has_buffer: true,
        }
    }

    pub fn has_selection(&self) -> bool {
        !self.selected_text.is_empty()
    }

    /// Generate a text summary of the context for prompts
    ///
    /// `excerpt_chars` bounds how much of the buffer goes into the prompt.
    pub fn summary(&self, excerpt_chars: usize) -> String {
        let mut s = String::new();

        s.push_str(&format!("- File: {}\n", self.file_name));
        s.push_str(&format!("- Language: {}\n", self.language));
        s.push_str(&format!(
            "- Cursor: line {}, column {}\n",
            self.cursor_line, self.cursor_column
        ));
        s.push_str(&format!("- Total lines: {}\n", self.total_lines));

        if self.has_buffer {
            s.push_str(&format!(
                "- Current content:\n{}\n",
                truncate_chars(&self.buffer_excerpt, excerpt_chars)
            ));
            if !self.surrounding_excerpt.is_empty() {
                s.push_str(&format!(
                    "- Around the cursor:\n{}\n",
                    self.surrounding_excerpt
                ));
            }
        } else {
            s.push_str("- Current content: N/A (no file open)\n");
        }

        if self.has_selection() {
            s.push_str(&format!("- Selected text: {}\n", self.selected_text));
        } else {
            s.push_str("- Selected text: None\n");
        }

        s
    }
}

/// Cut `text` to at most `max` characters, marking the cut with "..."
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Editor language id for a file name, by extension
pub fn language_for_file(file_name: &str) -> &'static str {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let lower = base.to_lowercase();
    if lower == "dockerfile" {
        return "dockerfile";
    }
    let extension = lower.rsplit('.').next().unwrap_or("");
    match extension {
        "js" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "py" => "python",
        "rs" => "rust",
        "go" => "go",
        "java" => "java",
        "cpp" => "cpp",
        "c" => "c",
        "cs" => "csharp",
        "php" => "php",
        "rb" => "ruby",
        "swift" => "swift",
        "kt" => "kotlin",
        "scala" => "scala",
        "sh" | "bash" | "zsh" | "fish" => "shell",
        "ps1" => "powershell",
        "html" | "htm" => "html",
        "css" => "css",
        "scss" => "scss",
        "sass" => "sass",
        "less" => "less",
        "json" => "json",
        "xml" => "xml",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "ini" | "cfg" | "conf" => "ini",
        "md" | "markdown" => "markdown",
        "sql" => "sql",
        _ => "plaintext",
    }
}
