//! Turn raw completion text into an [`Action`]
//!
//! Completion output is not a reliable source of structured data. Answers come
//! back as clean JSON, as JSON wrapped in prose or code fences, or cut off
//! mid-string when the output limit is hit. [`parse_action`] tries a fixed list
//! of strategies in order and always ends with an action, falling back to a
//! spoken request to rephrase.

use crate::command::action::Action;
use crate::core::error::VoxError;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// A single parsing attempt
type Strategy = fn(&str) -> Option<Action>;

/// Strategies tried in order; the first that yields an action wins
const STRATEGIES: &[(&str, Strategy)] = &[
    ("direct", parse_direct),
    ("repaired", parse_repaired),
    ("fields", extract_fields),
    ("code_fragment", recover_code_fragment),
];

const REPHRASE: &str = "I'm sorry, I didn't catch that. Could you rephrase your request?";

/// Parse completion text into an action. Never fails.
pub fn parse_action(raw: &str) -> Action {
    for (name, strategy) in STRATEGIES {
        if let Some(action) = strategy(raw) {
            if *name != "direct" {
                tracing::debug!(strategy = name, kind = action.kind(), "Recovered action from malformed output");
            }
            return action;
        }
    }
    let error = VoxError::MalformedOutput(format!("{} chars, no action found", raw.chars().count()));
    tracing::warn!(%error, "Degrading to a spoken response");
    degraded_response()
}

/// The terminal branch: ask the user to say it again
pub fn degraded_response() -> Action {
    Action::VoiceResponse {
        response: REPHRASE.into(),
        should_speak: true,
    }
}

/// Decode the JSON object in `raw`, repairing common defects if needed
pub fn extract_value(raw: &str) -> Option<Value> {
    let body = strip_fences(raw);
    extract_json(body)
        .and_then(|json| serde_json::from_str::<Value>(json).ok())
        .or_else(|| serde_json::from_str::<Value>(&repair_json(body)?).ok())
        .filter(Value::is_object)
}

/// Strategy 1: the outermost `{...}` span parses as-is
pub fn parse_direct(raw: &str) -> Option<Action> {
    let json = extract_json(strip_fences(raw))?;
    let value: Value = serde_json::from_str(json).ok()?;
    Action::from_value(&value)
}

/// Strategy 2: drop trailing commas and close whatever was left open
pub fn parse_repaired(raw: &str) -> Option<Action> {
    let repaired = repair_json(strip_fences(raw))?;
    let value: Value = serde_json::from_str(&repaired).ok()?;
    Action::from_value(&value)
}

/// Strategy 3: pull individual fields out with patterns
///
/// Works on output too broken to decode, for example a `code` string cut off
/// by the output limit. Needs at least the `action` field.
pub fn extract_fields(raw: &str) -> Option<Action> {
    let action = string_field(raw, "action")?;
    let mut fields = Map::new();
    fields.insert("action".into(), Value::String(action));

    for key in [
        "description",
        "code",
        "newCode",
        "name",
        "searchText",
        "fileName",
        "folderName",
        "command",
        "direction",
        "position",
        "response",
        "message",
    ] {
        if let Some(text) = string_field(raw, key) {
            fields.insert(key.into(), Value::String(text));
        }
    }
    for key in ["line", "startLine", "endLine", "targetLine", "count", "levels"] {
        if let Some(n) = number_field(raw, key) {
            fields.insert(key.into(), Value::from(n));
        }
    }
    if let Some(flag) = bool_field(raw, "shouldSpeak") {
        fields.insert("shouldSpeak".into(), Value::Bool(flag));
    }

    Action::from_value(&Value::Object(fields))
}

/// Strategy 4: no action anywhere, but the text looks like code
pub fn recover_code_fragment(raw: &str) -> Option<Action> {
    let body = strip_fences(raw).trim();
    if body.is_empty() || body.starts_with('{') || !looks_like_code(body) {
        return None;
    }
    Some(Action::InsertCode {
        code: body.to_string(),
        line: None,
        description: Some("Recovered code".into()),
    })
}

/// Extract JSON object from a response (handles surrounding text)
fn extract_json(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (end > start).then(|| &response[start..=end])
}

/// Content of the first ``` fenced block, or the input when there is none
fn strip_fences(raw: &str) -> &str {
    let Some(open) = raw.find("```") else {
        return raw;
    };
    let after = &raw[open + 3..];
    // Skip a language tag such as ```json
    let body = match after.find('\n') {
        Some(nl) if !after[..nl].contains('{') => &after[nl + 1..],
        _ => after,
    };
    match body.find("```") {
        Some(close) => &body[..close],
        None => body,
    }
}

/// Make a best effort at turning broken JSON into decodable JSON
///
/// Starts at the first `{` and runs to the end of the text so truncated
/// output is kept. Returns None when there is no object at all.
fn repair_json(raw: &str) -> Option<String> {
    let start = raw.find('{')?;
    let text = strip_trailing_commas(&raw[start..]);

    let mut repaired = String::with_capacity(text.len() + 8);
    let mut closers: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            } else if c == '\n' {
                // Raw newlines are invalid inside JSON strings
                repaired.push_str("\\n");
                continue;
            }
            repaired.push(c);
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => closers.push('}'),
            '[' => closers.push(']'),
            '}' | ']' => {
                if closers.last() == Some(&c) {
                    closers.pop();
                } else {
                    continue;
                }
            }
            _ => {}
        }
        repaired.push(c);
        if closers.is_empty() {
            break;
        }
    }

    if in_string {
        if escaped {
            repaired.pop();
        }
        repaired.push('"');
    }
    // A dangling key or separator would still break decoding
    let trimmed = repaired.trim_end().trim_end_matches([',', ':']).len();
    repaired.truncate(trimmed);
    while let Some(closer) = closers.pop() {
        repaired.push(closer);
    }
    Some(strip_trailing_commas(&repaired))
}

fn strip_trailing_commas(text: &str) -> String {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    match PATTERN.get_or_init(|| Regex::new(r",\s*([}\]])").ok()) {
        Some(pattern) => pattern.replace_all(text, "$1").into_owned(),
        None => text.to_string(),
    }
}

/// Value of `"key": "..."`, tolerating a missing closing quote
fn string_field(raw: &str, key: &str) -> Option<String> {
    let pattern = Regex::new(&format!(
        r#""{}"\s*:\s*"((?:[^"\\]|\\.)*)("|\\?$)"#,
        regex::escape(key)
    ))
    .ok()?;
    let captured = pattern.captures(raw)?.get(1)?.as_str();
    let text = unescape(captured);
    (!text.trim().is_empty()).then_some(text)
}

fn number_field(raw: &str, key: &str) -> Option<i64> {
    let pattern = Regex::new(&format!(r#""{}"\s*:\s*"?(-?\d+)"#, regex::escape(key))).ok()?;
    pattern.captures(raw)?.get(1)?.as_str().parse().ok()
}

fn bool_field(raw: &str, key: &str) -> Option<bool> {
    let pattern = Regex::new(&format!(r#""{}"\s*:\s*(true|false)"#, regex::escape(key))).ok()?;
    Some(pattern.captures(raw)?.get(1)?.as_str() == "true")
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => {}
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => {}
        }
    }
    out
}

/// Heuristic for "this prose is actually source code"
fn looks_like_code(text: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(
            r"(?m)^\s*(function\s+\w+|def\s+\w+\s*\(|fn\s+\w+|class\s+\w+|const\s+\w+\s*=|let\s+\w+|var\s+\w+|import\s+|export\s+|return\b|public\s+|#include|if\s*\(.*\)\s*\{|for\s*\(.*\)\s*\{)|=>|;\s*$|\{\s*$",
        )
        .ok()
    });
    pattern.as_ref().is_some_and(|p| p.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_extract_json_with_surrounding_text() {
        let response = r#"Here is the action:
{"action": "goToLine", "line": 12}
Let me know if you need anything else."#;
        let json = extract_json(response).unwrap();
        assert!(json.starts_with('{'));
        assert!(json.ends_with('}'));
    }

    #[test]
    fn test_extract_json_no_json() {
        assert!(extract_json("I don't understand that command").is_none());
        assert!(extract_json("} backwards {").is_none());
    }

    #[test]
    fn test_direct_json() {
        let action = parse_action(r#"{"action": "deleteLines", "startLine": 4, "endLine": 6}"#);
        assert_eq!(
            action,
            Action::DeleteLines {
                start_line: 4,
                end_line: 6
            }
        );
    }

    #[test]
    fn test_fenced_json() {
        let raw = "Sure!\n```json\n{\"action\": \"goToTop\"}\n```\nDone.";
        assert_eq!(parse_action(raw), Action::GoToTop);
    }

    #[test]
    fn test_trailing_comma_repaired() {
        let raw = r#"{"action": "findText", "searchText": "getData",}"#;
        assert!(parse_direct(raw).is_none());
        assert_eq!(
            parse_repaired(raw),
            Some(Action::FindText {
                search_text: "getData".into()
            })
        );
    }

    #[test]
    fn test_truncated_json_repaired() {
        let raw = r#"{"action": "insertCode", "code": "function add(a, b) {\n  return a + b;"#;
        let action = parse_action(raw);
        match action {
            Action::InsertCode { code, .. } => {
                assert!(code.starts_with("function add(a, b) {\n"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_field_extraction_unescapes() {
        let raw = r#"action: broken {"action": "replaceCode", "startLine": 3, "newCode": "say(\"hi\")\nnext", oops"#;
        let action = extract_fields(raw).unwrap();
        assert_eq!(
            action,
            Action::ReplaceCode {
                start_line: 3,
                end_line: 3,
                new_code: "say(\"hi\")\nnext".into(),
                description: None
            }
        );
    }

    #[test]
    fn test_code_fragment_recovered() {
        let raw = "function greet(name) {\n  return `Hello ${name}`;\n}";
        let action = parse_action(raw);
        assert_eq!(
            action,
            Action::InsertCode {
                code: raw.into(),
                line: None,
                description: Some("Recovered code".into())
            }
        );
    }

    #[test]
    fn test_prose_degrades_to_voice_response() {
        let action = parse_action("I am not sure what you mean");
        assert_eq!(action, degraded_response());
        assert_eq!(parse_action(""), degraded_response());
    }

    #[test]
    fn test_unknown_kind_survives_parsing() {
        let action = parse_action(r#"{"action": "summonDragon"}"#);
        assert_eq!(
            action,
            Action::Unknown {
                kind: "summonDragon".into()
            }
        );
    }

    #[test]
    fn test_extract_value_for_classification() {
        let value = extract_value("```\n{\"actionType\": \"edit\", \"confidence\": 0.9,}\n```").unwrap();
        assert_eq!(value["actionType"], "edit");
        assert!(extract_value("no json here").is_none());
    }

    #[test]
    fn test_replace_cut_before_new_code_is_error() {
        let action = parse_action(r#"{"action": "replaceCode", "startLine": 2, "endLine": 5, "newCo"#);
        assert_eq!(action, Action::error("replaceCode needs newCode"));
    }

    proptest! {
        #[test]
        fn test_parser_is_total(raw in "\\PC*") {
            let _ = parse_action(&raw);
        }

        #[test]
        fn test_truncated_valid_json_is_total(cut in 0usize..80) {
            let full = r#"{"action": "replaceCode", "startLine": 2, "endLine": 5, "newCode": "a\nb", "description": "x"}"#;
            let end = cut.min(full.len());
            let _ = parse_action(&full[..end]);
        }
    }
}
