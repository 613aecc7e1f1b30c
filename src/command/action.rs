//! Typed actions produced from completion output
//!
//! The completion service answers with loosely shaped JSON. [`Action::from_value`]
//! maps that JSON onto one variant per action kind. Kinds it does not know
//! become [`Action::Unknown`] instead of a parse failure, and line numbers are
//! kept exactly as given; clamping happens when the action is executed.

use serde_json::{Map, Value};

/// Cursor movement direction for `moveCursor`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorDirection {
    Up,
    Down,
    Left,
    Right,
    LineStart,
    LineEnd,
}

impl CursorDirection {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().replace(['_', '-', ' '], "").as_str() {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "linestart" | "start" | "home" => Some(Self::LineStart),
            "lineend" | "end" => Some(Self::LineEnd),
            _ => None,
        }
    }
}

/// Where `addNewLine` puts the blank line relative to its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NewLinePosition {
    Before,
    #[default]
    After,
}

/// Most indentation levels a single indent or outdent applies
pub const MAX_INDENT_LEVELS: u32 = 16;

/// One executable instruction
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // === CONTENT ===
    /// Insert code at the start of `line` (cursor line when None)
    InsertCode {
        code: String,
        line: Option<i64>,
        description: Option<String>,
    },
    /// Insert an empty function stub
    CreateFunction {
        name: String,
        params: Vec<String>,
        line: Option<i64>,
    },

    // === EDIT ===
    DeleteLines {
        start_line: i64,
        end_line: i64,
    },
    ReplaceCode {
        start_line: i64,
        end_line: i64,
        new_code: String,
        description: Option<String>,
    },
    InsertAt {
        line: i64,
        code: String,
    },
    /// Move a block so that it starts at `target_line`
    MoveLines {
        start_line: i64,
        end_line: i64,
        target_line: i64,
    },
    Undo,
    Redo,

    // === NAVIGATION ===
    GoToLine {
        line: i64,
    },
    GoToTop,
    GoToBottom,
    MoveCursor {
        direction: CursorDirection,
        count: u32,
    },
    FindText {
        search_text: String,
    },
    NextSearchResult,
    PreviousSearchResult,
    FirstSearchResult,
    LastSearchResult,
    ClearSearch,
    OpenFolder,
    OpenFile {
        name: String,
    },
    ExpandFolder {
        name: String,
    },
    RefreshExplorer,
    OpenTerminal,
    CloseTerminal,
    ToggleTerminal,
    RunCommand {
        command: String,
    },

    // === FORMAT ===
    Indent {
        levels: u32,
        start_line: Option<i64>,
        end_line: Option<i64>,
    },
    Outdent {
        levels: u32,
        start_line: Option<i64>,
        end_line: Option<i64>,
    },
    FormatCode,
    AddNewLine {
        line: Option<i64>,
        position: NewLinePosition,
    },

    // === VOICE ONLY ===
    VoiceResponse {
        response: String,
        should_speak: bool,
    },
    Error {
        message: String,
    },
    /// A kind this build does not know about
    Unknown {
        kind: String,
    },
}

impl Action {
    /// The wire name of this action
    pub fn kind(&self) -> &str {
        match self {
            Action::InsertCode { .. } => "insertCode",
            Action::CreateFunction { .. } => "createFunction",
            Action::DeleteLines { .. } => "deleteLines",
            Action::ReplaceCode { .. } => "replaceCode",
            Action::InsertAt { .. } => "insertAt",
            Action::MoveLines { .. } => "moveLines",
            Action::Undo => "undo",
            Action::Redo => "redo",
            Action::GoToLine { .. } => "goToLine",
            Action::GoToTop => "goToTop",
            Action::GoToBottom => "goToBottom",
            Action::MoveCursor { .. } => "moveCursor",
            Action::FindText { .. } => "findText",
            Action::NextSearchResult => "nextSearchResult",
            Action::PreviousSearchResult => "previousSearchResult",
            Action::FirstSearchResult => "firstSearchResult",
            Action::LastSearchResult => "lastSearchResult",
            Action::ClearSearch => "clearSearch",
            Action::OpenFolder => "openFolder",
            Action::OpenFile { .. } => "openFile",
            Action::ExpandFolder { .. } => "expandFolder",
            Action::RefreshExplorer => "refreshExplorer",
            Action::OpenTerminal => "openTerminal",
            Action::CloseTerminal => "closeTerminal",
            Action::ToggleTerminal => "toggleTerminal",
            Action::RunCommand { .. } => "runCommand",
            Action::Indent { .. } => "indent",
            Action::Outdent { .. } => "outdent",
            Action::FormatCode => "formatCode",
            Action::AddNewLine { .. } => "addNewLine",
            Action::VoiceResponse { .. } => "voiceResponse",
            Action::Error { .. } => "error",
            Action::Unknown { kind } => kind,
        }
    }

    /// Actions that only talk back and never touch the host
    pub fn is_voice_only(&self) -> bool {
        matches!(self, Action::VoiceResponse { .. } | Action::Error { .. })
    }

    /// Actions that need an open buffer
    pub fn needs_buffer(&self) -> bool {
        !matches!(
            self,
            Action::OpenFolder
                | Action::OpenFile { .. }
                | Action::ExpandFolder { .. }
                | Action::RefreshExplorer
                | Action::OpenTerminal
                | Action::CloseTerminal
                | Action::ToggleTerminal
                | Action::RunCommand { .. }
                | Action::VoiceResponse { .. }
                | Action::Error { .. }
                | Action::Unknown { .. }
        )
    }

    pub fn error(message: impl Into<String>) -> Self {
        Action::Error {
            message: message.into(),
        }
    }

    /// Build an action from a decoded JSON object
    ///
    /// Returns None when there is no `action` field at all. A known kind with
    /// missing required fields becomes [`Action::Error`] describing the gap.
    pub fn from_value(value: &Value) -> Option<Self> {
        let fields = value.as_object()?;
        let kind = fields.get("action")?.as_str()?.trim();
        if kind.is_empty() {
            return None;
        }
        let f = Fields(fields);

        let action = match kind {
            "insertCode" | "createClass" | "createComponent" => match f.text_any(&["code", "newCode"]) {
                Some(code) => Action::InsertCode {
                    code,
                    line: f.line("line"),
                    description: f.text("description"),
                },
                None => Action::error(format!("{} did not include any code", kind)),
            },
            "createFunction" => match f.text("name") {
                Some(name) => Action::CreateFunction {
                    name,
                    params: f.list("params"),
                    line: f.line("line"),
                },
                // A model that wrote the whole function still gets it inserted
                None => match f.text("code") {
                    Some(code) => Action::InsertCode {
                        code,
                        line: f.line("line"),
                        description: f.text("description"),
                    },
                    None => Action::error("createFunction needs a function name"),
                },
            },
            "deleteLines" => match f.line_any(&["startLine", "line"]) {
                Some(start_line) => Action::DeleteLines {
                    start_line,
                    end_line: f.line("endLine").unwrap_or(start_line),
                },
                None => Action::error("deleteLines needs a startLine"),
            },
            "replaceCode" | "refactor" => {
                match (f.line_any(&["startLine", "line"]), f.text_any(&["newCode", "code"])) {
                    (Some(start_line), Some(new_code)) => Action::ReplaceCode {
                        start_line,
                        end_line: f.line("endLine").unwrap_or(start_line),
                        new_code,
                        description: f.text("description"),
                    },
                    (None, _) => Action::error(format!("{} needs a startLine", kind)),
                    // Replacing with nothing would delete the range
                    (Some(_), None) => Action::error(format!("{} needs newCode", kind)),
                }
            }
            "insertAt" => match (f.line_any(&["line", "startLine"]), f.text_any(&["newCode", "code"])) {
                (Some(line), Some(code)) => Action::InsertAt { line, code },
                _ => Action::error("insertAt needs a line and code"),
            },
            "moveLines" => match (f.line("startLine"), f.line_any(&["targetLine", "line"])) {
                (Some(start_line), Some(target_line)) => Action::MoveLines {
                    start_line,
                    end_line: f.line("endLine").unwrap_or(start_line),
                    target_line,
                },
                _ => Action::error("moveLines needs startLine and targetLine"),
            },
            "undo" => Action::Undo,
            "redo" => Action::Redo,
            "goToLine" => match f.line("line") {
                Some(line) => Action::GoToLine { line },
                None => Action::error("goToLine needs a line number"),
            },
            "goToTop" => Action::GoToTop,
            "goToBottom" => Action::GoToBottom,
            "moveCursor" => match f.text("direction").as_deref().and_then(CursorDirection::parse) {
                Some(direction) => Action::MoveCursor {
                    direction,
                    count: f.count("count").unwrap_or(1),
                },
                None => Action::error("moveCursor needs a direction"),
            },
            "findText" | "search" => match f.text_any(&["searchText", "query", "text"]) {
                Some(search_text) => Action::FindText { search_text },
                None => Action::error("findText needs searchText"),
            },
            "nextSearchResult" => Action::NextSearchResult,
            "previousSearchResult" => Action::PreviousSearchResult,
            "firstSearchResult" => Action::FirstSearchResult,
            "lastSearchResult" => Action::LastSearchResult,
            "clearSearch" => Action::ClearSearch,
            "openFolder" => Action::OpenFolder,
            "openFile" => match f.text_any(&["fileName", "name", "file"]) {
                Some(name) => Action::OpenFile { name },
                None => Action::error("openFile needs a fileName"),
            },
            "expandFolder" => match f.text_any(&["folderName", "name", "folder"]) {
                Some(name) => Action::ExpandFolder { name },
                None => Action::error("expandFolder needs a folderName"),
            },
            "refreshExplorer" => Action::RefreshExplorer,
            "openTerminal" => Action::OpenTerminal,
            "closeTerminal" => Action::CloseTerminal,
            "toggleTerminal" => Action::ToggleTerminal,
            "runCommand" => match f.text("command") {
                Some(command) => Action::RunCommand { command },
                None => Action::error("runCommand needs a command"),
            },
            "indent" => Action::Indent {
                levels: f.count("levels").unwrap_or(1).min(MAX_INDENT_LEVELS),
                start_line: f.line_any(&["startLine", "line"]),
                end_line: f.line("endLine"),
            },
            "outdent" => Action::Outdent {
                levels: f.count("levels").unwrap_or(1).min(MAX_INDENT_LEVELS),
                start_line: f.line_any(&["startLine", "line"]),
                end_line: f.line("endLine"),
            },
            "formatCode" => Action::FormatCode,
            "addNewLine" => Action::AddNewLine {
                line: f.line("line"),
                position: match f.text("position").as_deref() {
                    Some(p) if p.eq_ignore_ascii_case("before") || p.eq_ignore_ascii_case("above") => {
                        NewLinePosition::Before
                    }
                    _ => NewLinePosition::After,
                },
            },
            "voiceResponse" => Action::VoiceResponse {
                response: f
                    .text_any(&["response", "text"])
                    .unwrap_or_else(|| "I'm not sure what to say to that.".into()),
                should_speak: f.flag("shouldSpeak").unwrap_or(true),
            },
            "error" => Action::Error {
                message: f
                    .text("message")
                    .unwrap_or_else(|| "Something went wrong".into()),
            },
            other => Action::Unknown {
                kind: other.to_string(),
            },
        };

        Some(action)
    }
}

/// Lenient typed reads over a JSON object
struct Fields<'a>(&'a Map<String, Value>);

impl Fields<'_> {
    fn text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn text_any(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|k| self.text(k))
    }

    /// Line numbers arrive as numbers, numeric strings, or null
    fn line(&self, key: &str) -> Option<i64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn line_any(&self, keys: &[&str]) -> Option<i64> {
        keys.iter().find_map(|k| self.line(k))
    }

    fn count(&self, key: &str) -> Option<u32> {
        self.line(key).map(|n| n.clamp(1, u32::MAX as i64) as u32)
    }

    fn flag(&self, key: &str) -> Option<bool> {
        match self.0.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn list(&self, key: &str) -> Vec<String> {
        match self.0.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(Value::String(s)) => s
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_delete_lines() {
        let action = Action::from_value(&json!({"action": "deleteLines", "startLine": 4, "endLine": 6}));
        assert_eq!(
            action,
            Some(Action::DeleteLines {
                start_line: 4,
                end_line: 6
            })
        );
    }

    #[test]
    fn test_line_numbers_are_not_clamped() {
        let action = Action::from_value(&json!({"action": "goToLine", "line": -3})).unwrap();
        assert_eq!(action, Action::GoToLine { line: -3 });

        let action = Action::from_value(&json!({"action": "goToLine", "line": "900"})).unwrap();
        assert_eq!(action, Action::GoToLine { line: 900 });
    }

    #[test]
    fn test_insert_code_with_null_line() {
        let action = Action::from_value(&json!({
            "action": "insertCode",
            "code": "let x = 1;",
            "line": null,
            "description": "add x"
        }))
        .unwrap();
        assert_eq!(
            action,
            Action::InsertCode {
                code: "let x = 1;".into(),
                line: None,
                description: Some("add x".into())
            }
        );
    }

    #[test]
    fn test_create_class_maps_to_insert_code() {
        let action = Action::from_value(&json!({"action": "createClass", "code": "class A {}"})).unwrap();
        assert_eq!(action.kind(), "insertCode");
    }

    #[test]
    fn test_unknown_kind_is_kept() {
        let action = Action::from_value(&json!({"action": "teleport"})).unwrap();
        assert_eq!(
            action,
            Action::Unknown {
                kind: "teleport".into()
            }
        );
        assert_eq!(action.kind(), "teleport");
    }

    #[test]
    fn test_missing_action_field() {
        assert!(Action::from_value(&json!({"line": 3})).is_none());
        assert!(Action::from_value(&json!("goToLine")).is_none());
    }

    #[test]
    fn test_missing_required_field_is_error() {
        let action = Action::from_value(&json!({"action": "goToLine"})).unwrap();
        assert!(matches!(action, Action::Error { .. }));
    }

    #[test]
    fn test_move_cursor_direction_aliases() {
        let action = Action::from_value(&json!({"action": "moveCursor", "direction": "line_end"})).unwrap();
        assert_eq!(
            action,
            Action::MoveCursor {
                direction: CursorDirection::LineEnd,
                count: 1
            }
        );
    }

    #[test]
    fn test_voice_response_defaults_to_speaking() {
        let action = Action::from_value(&json!({"action": "voiceResponse", "response": "Hi"})).unwrap();
        assert_eq!(
            action,
            Action::VoiceResponse {
                response: "Hi".into(),
                should_speak: true
            }
        );
    }

    #[test]
    fn test_buffer_requirements() {
        assert!(Action::GoToTop.needs_buffer());
        assert!(Action::Undo.needs_buffer());
        assert!(!Action::ToggleTerminal.needs_buffer());
        assert!(!Action::error("x").needs_buffer());
        assert!(Action::VoiceResponse {
            response: String::new(),
            should_speak: false
        }
        .is_voice_only());
    }

    #[test]
    fn test_replace_without_new_code_is_error() {
        let action = Action::from_value(&json!({"action": "replaceCode", "startLine": 2, "endLine": 5}));
        assert_eq!(action, Some(Action::error("replaceCode needs newCode")));

        let action = Action::from_value(&json!({"action": "refactor", "line": 2, "code": ""}));
        assert!(matches!(action, Some(Action::ReplaceCode { .. })));
    }

    #[test]
    fn test_indent_levels_are_capped() {
        let action = Action::from_value(&json!({"action": "indent", "levels": 4294967295u64, "startLine": 1}));
        assert_eq!(
            action,
            Some(Action::Indent {
                levels: MAX_INDENT_LEVELS,
                start_line: Some(1),
                end_line: None
            })
        );
    }
}
