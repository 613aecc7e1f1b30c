//! Prompt text for the classifier and the action generators
//!
//! Each prompt states the JSON shape it expects back. The field names here
//! are the ones `Action::from_value` reads, so the two must change together.

use crate::llm::classifier::IntentKind;
use crate::llm::context::EditorContext;

/// Prompt asking which category a command belongs to
pub fn classifier_prompt(transcript: &str, context: &EditorContext, excerpt_chars: usize) -> String {
    format!(
        r#"You decide what kind of action a user wants to perform in a code editor.

User command: "{transcript}"

Current editor context:
{context}
Return ONLY a JSON object with this structure:
{{
  "actionType": "code_action" | "edit" | "navigation" | "format" | "question" | "conversation",
  "confidence": 0.0-1.0,
  "reasoning": "brief explanation"
}}

Action types:
- "code_action": Writing, creating, or generating new code
- "edit": Modifying existing code (delete, replace, insert at a line, move lines, undo, redo)
- "navigation": Moving around (go to line, move the cursor, find text, next/previous match, open files or folders, terminal commands)
- "format": Indentation, formatting the file, adding blank lines
- "question": Asking about code, concepts, or getting explanations
- "conversation": General chat not related to coding

Examples:
- "create a function that adds two numbers" -> {{"actionType": "code_action", "confidence": 0.95, "reasoning": "User wants new code"}}
- "delete line 10" -> {{"actionType": "edit", "confidence": 0.98, "reasoning": "User wants to modify existing code"}}
- "go to line 42" -> {{"actionType": "navigation", "confidence": 0.99, "reasoning": "User wants to move in the editor"}}
- "open the terminal" -> {{"actionType": "navigation", "confidence": 0.9, "reasoning": "Terminal control"}}
- "indent lines 3 to 5" -> {{"actionType": "format", "confidence": 0.95, "reasoning": "Indentation change"}}
- "what does this function do?" -> {{"actionType": "question", "confidence": 0.9, "reasoning": "User is asking about code"}}
- "how are you today?" -> {{"actionType": "conversation", "confidence": 0.85, "reasoning": "General conversation"}}

Return ONLY the JSON object."#,
        transcript = transcript,
        context = context.summary(excerpt_chars),
    )
}

/// Prompt for the generator that handles `kind`
pub fn generator_prompt(
    kind: IntentKind,
    transcript: &str,
    context: &EditorContext,
    excerpt_chars: usize,
) -> String {
    let (role, schema) = match kind {
        IntentKind::CodeAction => (CODE_ROLE, CODE_SCHEMA),
        IntentKind::Edit => (EDIT_ROLE, EDIT_SCHEMA),
        IntentKind::Navigation => (NAVIGATION_ROLE, NAVIGATION_SCHEMA),
        IntentKind::Format => (FORMAT_ROLE, FORMAT_SCHEMA),
        IntentKind::Question => (QUESTION_ROLE, QUESTION_SCHEMA),
        IntentKind::Conversation => (CONVERSATION_ROLE, CONVERSATION_SCHEMA),
    };

    format!(
        "{role}\n\nUser request: \"{transcript}\"\n\nEditor context:\n{context}\n{schema}\n\nReturn ONLY the JSON object.",
        role = role,
        transcript = transcript,
        context = context.summary(excerpt_chars),
        schema = schema,
    )
}

const CODE_ROLE: &str = "You are a code generation assistant. Create code based on the user's request.";

const CODE_SCHEMA: &str = r#"Generate appropriate code and return a JSON object:
{
  "action": "insertCode" | "createFunction",
  "code": "the generated code (insertCode)",
  "name": "function name (createFunction)",
  "params": ["parameter names (createFunction)"],
  "line": line_number_to_insert_at or null for the cursor line,
  "description": "brief description of what was created"
}

Important:
- Write clean code that fits the existing file and language
- Use the file's indentation style
- Escape newlines inside "code" as \n
- Use "createFunction" only for an empty stub with a name and parameters"#;

const EDIT_ROLE: &str = "You are a code editing assistant. Modify existing code based on the user's request.";

const EDIT_SCHEMA: &str = r#"Determine the edit and return a JSON object:
{
  "action": "deleteLines" | "replaceCode" | "insertAt" | "moveLines" | "undo" | "redo",
  "startLine": first_line,
  "endLine": last_line (inclusive),
  "line": line_number (insertAt),
  "targetLine": line the moved block should start at (moveLines),
  "newCode": "replacement or inserted code",
  "description": "brief description of the edit"
}

For line operations:
- Deleting: provide startLine and endLine
- Replacing: provide startLine, endLine and newCode
- Inserting: provide line and newCode
- Moving: provide startLine, endLine and targetLine
- Undo/redo need no other fields

Examples:
- "delete lines 4 through 6" -> {"action": "deleteLines", "startLine": 4, "endLine": 6}
- "move line 3 to line 10" -> {"action": "moveLines", "startLine": 3, "endLine": 3, "targetLine": 10}
- "undo that" -> {"action": "undo"}"#;

const NAVIGATION_ROLE: &str = "You are a navigation assistant. Help the user move around the editor, the project files and the terminal.";

const NAVIGATION_SCHEMA: &str = r#"Parse the request and return a JSON object:
{
  "action": "goToLine" | "goToTop" | "goToBottom" | "moveCursor" | "findText"
          | "nextSearchResult" | "previousSearchResult" | "firstSearchResult" | "lastSearchResult" | "clearSearch"
          | "undo" | "redo"
          | "openFolder" | "openFile" | "expandFolder" | "refreshExplorer"
          | "openTerminal" | "closeTerminal" | "toggleTerminal" | "runCommand",
  "line": line_number (goToLine),
  "direction": "up" | "down" | "left" | "right" | "lineStart" | "lineEnd" (moveCursor),
  "count": how_many_lines_or_characters (moveCursor),
  "searchText": "text to find" (findText),
  "fileName": "part of a file name" (openFile),
  "folderName": "part of a folder name" (expandFolder),
  "command": "shell command" (runCommand),
  "description": "brief description of the navigation"
}

Examples:
- "go to line 42" -> {"action": "goToLine", "line": 42}
- "find getData" -> {"action": "findText", "searchText": "getData"}
- "next one" -> {"action": "nextSearchResult"}
- "go to the bottom" -> {"action": "goToBottom"}
- "move down three lines" -> {"action": "moveCursor", "direction": "down", "count": 3}
- "open app dot jsx" -> {"action": "openFile", "fileName": "app.jsx"}
- "run npm test" -> {"action": "runCommand", "command": "npm test"}"#;

const FORMAT_ROLE: &str = "You are a formatting assistant. Adjust indentation and layout of the user's code.";

const FORMAT_SCHEMA: &str = r#"Return a JSON object:
{
  "action": "indent" | "outdent" | "formatCode" | "addNewLine",
  "levels": number_of_indent_levels (indent/outdent, default 1),
  "startLine": first_line (indent/outdent, default the cursor line),
  "endLine": last_line (indent/outdent),
  "line": line_number (addNewLine, default the cursor line),
  "position": "before" | "after" (addNewLine),
  "description": "brief description"
}

Examples:
- "indent lines 3 to 5 twice" -> {"action": "indent", "levels": 2, "startLine": 3, "endLine": 5}
- "format the file" -> {"action": "formatCode"}
- "add a blank line after line 7" -> {"action": "addNewLine", "line": 7, "position": "after"}"#;

const QUESTION_ROLE: &str = "You are a helpful coding assistant. Answer the user's question about their code or programming concepts.";

const QUESTION_SCHEMA: &str = r#"Provide a helpful, concise answer. Return a JSON object:
{
  "action": "voiceResponse",
  "response": "your answer",
  "shouldSpeak": true
}

Keep responses clear, technically accurate, relevant to the current code, and under about 150 words for voice delivery."#;

const CONVERSATION_ROLE: &str = "You are a friendly assistant helping with coding. The user is having a casual conversation.";

const CONVERSATION_SCHEMA: &str = r#"Respond naturally. Return a JSON object:
{
  "action": "voiceResponse",
  "response": "your reply",
  "shouldSpeak": true
}

Keep replies warm, brief (about 50 words), and helpful when possible."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifier_prompt_contains_transcript_and_taxonomy() {
        let prompt = classifier_prompt("go to line 10", &EditorContext::empty(), 1000);
        assert!(prompt.contains("User command: \"go to line 10\""));
        for kind in ["code_action", "edit", "navigation", "format", "question", "conversation"] {
            assert!(prompt.contains(kind), "missing {}", kind);
        }
    }

    #[test]
    fn test_each_generator_names_its_actions() {
        let ctx = EditorContext::empty();
        let cases = [
            (IntentKind::CodeAction, "insertCode"),
            (IntentKind::Edit, "deleteLines"),
            (IntentKind::Navigation, "runCommand"),
            (IntentKind::Format, "outdent"),
            (IntentKind::Question, "voiceResponse"),
            (IntentKind::Conversation, "voiceResponse"),
        ];
        for (kind, action) in cases {
            let prompt = generator_prompt(kind, "do it", &ctx, 2000);
            assert!(prompt.contains(action), "{:?} prompt missing {}", kind, action);
            assert!(prompt.contains("User request: \"do it\""));
        }
    }

    #[test]
    fn test_navigation_and_edit_both_offer_undo() {
        let ctx = EditorContext::empty();
        assert!(generator_prompt(IntentKind::Edit, "undo", &ctx, 0).contains("\"undo\""));
        assert!(generator_prompt(IntentKind::Navigation, "undo", &ctx, 0).contains("\"undo\""));
    }
}
