//! Action execution - applies actions to the host surfaces
//!
//! Line numbers arrive unclamped and are clamped here, right before use.
//! Buffer changes go through `apply_edits` so each action is one undo step.
//! Spoken feedback is skipped while a voice session is live, otherwise the
//! microphone would pick the speech up as the next command.

use crate::command::action::{Action, CursorDirection, NewLinePosition, MAX_INDENT_LEVELS};
use crate::command::search::{SearchNavigator, SearchOutcome, Step};
use crate::core::config::PipelineConfig;
use crate::core::error::VoxError;
use crate::core::types::{Position, TextEdit, TextRange};
use crate::host::{EditorBuffer, FileExplorer, HostSurfaces, TerminalPanel};
use crate::llm::context::language_for_file;

const APOLOGY: &str = "Sorry, I couldn't do that. Could you rephrase your request?";

/// Longest voice response shown in the status bar before it is cut
const STATUS_PREVIEW_CHARS: usize = 50;

/// How an action ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// Valid request with nothing to do
    NoOp,
    /// Not allowed in the current state, e.g. no file open
    Rejected,
    Failed,
}

/// Result of executing an action
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub outcome: Outcome,
    pub status: String,
    /// Text handed to speech output, if any
    pub spoken: Option<String>,
}

impl ExecutionResult {
    pub fn succeeded(&self) -> bool {
        self.outcome == Outcome::Applied
    }
}

/// What a handler reports back before feedback is delivered
struct Report {
    outcome: Outcome,
    status: String,
    speech: Option<String>,
}

impl Report {
    fn new(outcome: Outcome, status: impl Into<String>) -> Self {
        Self {
            outcome,
            status: status.into(),
            speech: None,
        }
    }

    fn applied(status: impl Into<String>) -> Self {
        Self::new(Outcome::Applied, status)
    }

    fn noop(status: impl Into<String>) -> Self {
        Self::new(Outcome::NoOp, status)
    }

    fn rejected(status: impl Into<String>) -> Self {
        Self::new(Outcome::Rejected, status)
    }

    fn failed(status: impl Into<String>) -> Self {
        Self::new(Outcome::Failed, status)
    }

    fn speaking(mut self, text: impl Into<String>) -> Self {
        self.speech = Some(text.into());
        self
    }
}

/// Executes actions against the host, owning the search state
pub struct ActionExecutor {
    search: SearchNavigator,
    indent_width: usize,
}

impl ActionExecutor {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            search: SearchNavigator::new(),
            indent_width: config.indent_width.max(1),
        }
    }

    pub fn search(&self) -> &SearchNavigator {
        &self.search
    }

    /// Drop the active search and its highlights
    pub fn clear_search(&mut self, buffer: Option<&mut dyn EditorBuffer>) {
        self.search.clear(buffer);
    }

    /// Execute one action and deliver its status and spoken feedback
    pub fn execute(
        &mut self,
        action: &Action,
        host: &mut HostSurfaces<'_>,
        voice_session_live: bool,
    ) -> ExecutionResult {
        let mut report = self.dispatch(action, host);
        if report.speech.is_none() && matches!(report.outcome, Outcome::Rejected | Outcome::Failed)
        {
            report.speech = Some(APOLOGY.into());
        }

        tracing::info!(
            action = action.kind(),
            outcome = ?report.outcome,
            status = %report.status,
            "Executed action"
        );

        host.status.show_status(&report.status);

        let spoken = match report.speech {
            Some(text) if !voice_session_live => {
                host.status.speak(&text);
                Some(text)
            }
            Some(_) => {
                tracing::debug!("Speech suppressed while voice session is live");
                None
            }
            None => None,
        };

        if !action.is_voice_only() {
            if let Some(buffer) = host.buffer.as_deref_mut() {
                buffer.focus();
            }
        }

        ExecutionResult {
            outcome: report.outcome,
            status: report.status,
            spoken,
        }
    }

    fn dispatch(&mut self, action: &Action, host: &mut HostSurfaces<'_>) -> Report {
        if action.needs_buffer() {
            return match host.buffer.as_deref_mut() {
                Some(buffer) => self.buffer_action(action, buffer),
                None => {
                    let error = VoxError::UnavailableResource("no file is open".into());
                    tracing::warn!(action = action.kind(), %error, "Action needs a buffer");
                    Report::rejected("No file is open")
                }
            };
        }

        match action {
            Action::OpenFolder
            | Action::OpenFile { .. }
            | Action::ExpandFolder { .. }
            | Action::RefreshExplorer => explorer_action(action, host.explorer),

            Action::OpenTerminal
            | Action::CloseTerminal
            | Action::ToggleTerminal
            | Action::RunCommand { .. } => terminal_action(action, host.terminal),

            Action::VoiceResponse {
                response,
                should_speak,
            } => {
                let report = Report::applied(status_preview(response));
                if *should_speak {
                    report.speaking(response.as_str())
                } else {
                    report
                }
            }

            Action::Error { message } => Report::failed(format!("Error: {}", message)),

            // Unknown kinds; buffer actions were handled above
            _ => {
                let kind = action.kind();
                tracing::warn!(error = %VoxError::UnknownActionKind(kind.to_string()), "Skipping action");
                Report::rejected(format!("Unknown action: {}", kind))
            }
        }
    }

    fn buffer_action(&mut self, action: &Action, buffer: &mut dyn EditorBuffer) -> Report {
        match action {
            // === CONTENT ===
            Action::InsertCode {
                code,
                line,
                description,
            } => {
                let target = line.map(|l| clamp_line(buffer, l)).unwrap_or(buffer.cursor().line);
                insert_block(buffer, target, code);
                Report::applied(
                    description
                        .clone()
                        .unwrap_or_else(|| format!("Inserted code at line {}", target)),
                )
            }
            Action::CreateFunction { name, params, line } => {
                let target = line.map(|l| clamp_line(buffer, l)).unwrap_or(buffer.cursor().line);
                let language = buffer
                    .file_name()
                    .map(|f| language_for_file(&f))
                    .unwrap_or("javascript");
                let stub = function_stub(language, name, params, self.indent_width);
                insert_block(buffer, target, &stub);
                Report::applied(format!("Created function {}", name))
            }

            // === EDIT ===
            Action::DeleteLines {
                start_line,
                end_line,
            } => {
                let (start, end) = clamp_span(buffer, *start_line, *end_line);
                delete_lines(buffer, start, end);
                move_to(buffer, Position::line_start(start));
                Report::applied(describe_span("Deleted", start, end))
            }
            Action::ReplaceCode {
                start_line,
                end_line,
                new_code,
                description,
            } => {
                let (start, end) = clamp_span(buffer, *start_line, *end_line);
                let replacement = new_code.strip_suffix('\n').unwrap_or(new_code);
                let range = lines_range(buffer, start, end);
                buffer.apply_edits(&[TextEdit::replace(range, replacement)]);
                move_to(buffer, Position::line_start(start));
                Report::applied(
                    description
                        .clone()
                        .unwrap_or_else(|| describe_span("Replaced", start, end)),
                )
            }
            Action::InsertAt { line, code } => {
                let target = clamp_line(buffer, *line);
                insert_block(buffer, target, code);
                Report::applied(format!("Inserted code at line {}", target))
            }
            Action::MoveLines {
                start_line,
                end_line,
                target_line,
            } => move_lines(buffer, *start_line, *end_line, *target_line),
            Action::Undo => {
                if buffer.can_undo() {
                    buffer.undo();
                    Report::applied("Undone")
                } else {
                    Report::noop("Nothing to undo")
                }
            }
            Action::Redo => {
                if buffer.can_redo() {
                    buffer.redo();
                    Report::applied("Redone")
                } else {
                    Report::noop("Nothing to redo")
                }
            }

            // === NAVIGATION ===
            Action::GoToLine { line } => {
                let target = clamp_line(buffer, *line);
                move_to(buffer, Position::line_start(target));
                Report::applied(format!("Moved to line {}", target))
            }
            Action::GoToTop => {
                move_to(buffer, Position::line_start(1));
                Report::applied("Moved to top")
            }
            Action::GoToBottom => {
                let last = buffer.line_count().max(1);
                let column = buffer.line_max_column(last);
                move_to(buffer, Position::new(last, column));
                Report::applied("Moved to bottom")
            }
            Action::MoveCursor { direction, count } => {
                let position = cursor_target(buffer, *direction, *count);
                move_to(buffer, position);
                Report::applied(format!(
                    "Cursor at line {}, column {}",
                    position.line, position.column
                ))
            }
            Action::FindText { search_text } => {
                let outcome = self.search.search(buffer, search_text);
                match outcome {
                    SearchOutcome::Match { total, .. } => Report::applied(format!(
                        "Found {} {} for \"{}\"",
                        total,
                        if total == 1 { "match" } else { "matches" },
                        search_text
                    )),
                    SearchOutcome::NoMatches => {
                        Report::noop(format!("No matches for \"{}\"", search_text))
                    }
                    SearchOutcome::NoSearch => Report::noop("Nothing to search for"),
                }
            }
            Action::NextSearchResult => self.step(buffer, Step::Next),
            Action::PreviousSearchResult => self.step(buffer, Step::Previous),
            Action::FirstSearchResult => self.step(buffer, Step::First),
            Action::LastSearchResult => self.step(buffer, Step::Last),
            Action::ClearSearch => {
                self.search.clear(Some(buffer));
                Report::applied("Search cleared")
            }

            // === FORMAT ===
            Action::Indent {
                levels,
                start_line,
                end_line,
            } => {
                let (start, end) = format_span(buffer, *start_line, *end_line);
                let width = self.indent_width * (*levels).clamp(1, MAX_INDENT_LEVELS) as usize;
                indent_lines(buffer, start, end, width)
            }
            Action::Outdent {
                levels,
                start_line,
                end_line,
            } => {
                let (start, end) = format_span(buffer, *start_line, *end_line);
                let width = self.indent_width * (*levels).clamp(1, MAX_INDENT_LEVELS) as usize;
                outdent_lines(buffer, start, end, width, self.indent_width)
            }
            Action::FormatCode => format_document(buffer, self.indent_width),
            Action::AddNewLine { line, position } => {
                let target = line.map(|l| clamp_line(buffer, l)).unwrap_or(buffer.cursor().line);
                match position {
                    NewLinePosition::Before => {
                        buffer.apply_edits(&[TextEdit::insert(Position::line_start(target), "\n")]);
                        move_to(buffer, Position::line_start(target));
                        Report::applied(format!("Added a line before line {}", target))
                    }
                    NewLinePosition::After => {
                        let end = Position::new(target, buffer.line_max_column(target));
                        buffer.apply_edits(&[TextEdit::insert(end, "\n")]);
                        move_to(buffer, Position::line_start(target + 1));
                        Report::applied(format!("Added a line after line {}", target))
                    }
                }
            }

            // Host-level actions are dispatched before a buffer is needed
            other => Report::rejected(format!("Unsupported action: {}", other.kind())),
        }
    }

    fn step(&mut self, buffer: &mut dyn EditorBuffer, step: Step) -> Report {
        match self.search.step(buffer, step) {
            SearchOutcome::Match { index, total } => {
                Report::applied(format!("Match {} of {}", index + 1, total))
            }
            SearchOutcome::NoMatches => Report::noop("No matches"),
            SearchOutcome::NoSearch => Report::noop("No active search"),
        }
    }
}

fn explorer_action(action: &Action, explorer: &mut dyn FileExplorer) -> Report {
    match action {
        Action::OpenFolder => match explorer.open_folder_picker() {
            Ok(()) => Report::applied("Opening folder picker"),
            Err(e) => Report::failed(format!("Could not open a folder: {}", e)),
        },
        Action::OpenFile { name } => match explorer.open_file_by_name(name) {
            Ok(Some(path)) => Report::applied(format!("Opened {}", path)),
            Ok(None) => Report::noop(format!("No file matching \"{}\"", name)),
            Err(e) => Report::failed(format!("Could not open {}: {}", name, e)),
        },
        Action::ExpandFolder { name } => match explorer.expand_directory_by_name(name) {
            Ok(Some(path)) => Report::applied(format!("Expanded {}", path)),
            Ok(None) => Report::noop(format!("No folder matching \"{}\"", name)),
            Err(e) => Report::failed(format!("Could not expand {}: {}", name, e)),
        },
        Action::RefreshExplorer => match explorer.refresh() {
            Ok(()) => Report::applied("Explorer refreshed"),
            Err(e) => Report::failed(format!("Could not refresh the explorer: {}", e)),
        },
        other => Report::rejected(format!("Unsupported action: {}", other.kind())),
    }
}

fn terminal_action(action: &Action, terminal: &mut dyn TerminalPanel) -> Report {
    match action {
        Action::OpenTerminal => {
            terminal.open();
            Report::applied("Terminal opened")
        }
        Action::CloseTerminal => {
            terminal.close();
            Report::applied("Terminal closed")
        }
        Action::ToggleTerminal => {
            terminal.toggle();
            if terminal.is_open() {
                Report::applied("Terminal opened")
            } else {
                Report::applied("Terminal closed")
            }
        }
        Action::RunCommand { command } => {
            if !terminal.is_open() {
                terminal.open();
            }
            match terminal.run_command(command) {
                Ok(output) => {
                    tracing::debug!(command = %command, output = %output, "Terminal command finished");
                    Report::applied(format!("Ran: {}", command))
                }
                Err(e) => Report::failed(format!("Command failed: {}", e)),
            }
        }
        other => Report::rejected(format!("Unsupported action: {}", other.kind())),
    }
}

fn status_preview(response: &str) -> String {
    match response.char_indices().nth(STATUS_PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &response[..idx]),
        None => response.to_string(),
    }
}

fn clamp_line(buffer: &dyn EditorBuffer, line: i64) -> u32 {
    line.clamp(1, buffer.line_count().max(1) as i64) as u32
}

/// Clamp both ends and put them in order
fn clamp_span(buffer: &dyn EditorBuffer, start: i64, end: i64) -> (u32, u32) {
    let a = clamp_line(buffer, start);
    let b = clamp_line(buffer, end);
    (a.min(b), a.max(b))
}

/// Explicit lines, else the selected lines, else the cursor line
fn format_span(buffer: &dyn EditorBuffer, start: Option<i64>, end: Option<i64>) -> (u32, u32) {
    match (start, buffer.selection()) {
        (Some(start), _) => clamp_span(buffer, start, end.unwrap_or(start)),
        (None, Some(selection)) => (selection.start.line, selection.end.line),
        (None, None) => {
            let line = buffer.cursor().line;
            (line, line)
        }
    }
}

fn describe_span(verb: &str, start: u32, end: u32) -> String {
    if start == end {
        format!("{} line {}", verb, start)
    } else {
        format!("{} lines {}-{}", verb, start, end)
    }
}

/// From the start of `start` to the end of `end`, newline excluded
fn lines_range(buffer: &dyn EditorBuffer, start: u32, end: u32) -> TextRange {
    TextRange::new(
        Position::line_start(start),
        Position::new(end, buffer.line_max_column(end)),
    )
}

fn move_to(buffer: &mut dyn EditorBuffer, position: Position) {
    buffer.set_cursor(position);
    let line = buffer.cursor().line;
    buffer.reveal_line(line);
}

/// Insert `code` as whole lines above `line`
fn insert_block(buffer: &mut dyn EditorBuffer, line: u32, code: &str) {
    let mut text = code.to_string();
    if !text.ends_with('\n') {
        text.push('\n');
    }
    buffer.apply_edits(&[TextEdit::insert(Position::line_start(line), text)]);
    move_to(buffer, Position::line_start(line));
}

/// Remove lines `start..=end` including their line breaks
fn delete_lines(buffer: &mut dyn EditorBuffer, start: u32, end: u32) {
    let count = buffer.line_count();
    let range = if end < count {
        TextRange::new(Position::line_start(start), Position::line_start(end + 1))
    } else if start > 1 {
        // Last line has no trailing break; take the one before the span
        TextRange::new(
            Position::new(start - 1, buffer.line_max_column(start - 1)),
            Position::new(end, buffer.line_max_column(end)),
        )
    } else {
        lines_range(buffer, start, end)
    };
    buffer.apply_edits(&[TextEdit::delete(range)]);
}

fn move_lines(buffer: &mut dyn EditorBuffer, start: i64, end: i64, target: i64) -> Report {
    let (start, end) = clamp_span(buffer, start, end);
    let count = buffer.line_count().max(1);
    let block_len = end - start + 1;
    let target = target.clamp(1, (count - block_len + 1) as i64) as u32;
    if target == start {
        return Report::noop(format!("Lines {}-{} are already at line {}", start, end, target));
    }

    let text = buffer.text();
    let mut lines: Vec<&str> = text.split('\n').collect();
    let block: Vec<&str> = lines
        .drain((start - 1) as usize..end as usize)
        .collect();
    let tail = lines.split_off((target - 1) as usize);
    lines.extend(block);
    lines.extend(tail);

    let lo = start.min(target);
    let hi = end.max(target + block_len - 1);
    let replacement = lines[(lo - 1) as usize..hi as usize].join("\n");
    let range = lines_range(buffer, lo, hi);
    buffer.apply_edits(&[TextEdit::replace(range, replacement)]);
    move_to(buffer, Position::line_start(target));

    Report::applied(format!(
        "{} to line {}",
        describe_span("Moved", start, end),
        target
    ))
}

fn cursor_target(buffer: &dyn EditorBuffer, direction: CursorDirection, count: u32) -> Position {
    let cursor = buffer.cursor();
    let line = match direction {
        CursorDirection::Up => cursor.line.saturating_sub(count).max(1),
        CursorDirection::Down => cursor
            .line
            .saturating_add(count)
            .min(buffer.line_count().max(1)),
        _ => cursor.line,
    };
    let max_column = buffer.line_max_column(line);
    let column = match direction {
        CursorDirection::Left => cursor.column.saturating_sub(count),
        CursorDirection::Right => cursor.column.saturating_add(count),
        CursorDirection::LineStart => 1,
        CursorDirection::LineEnd => max_column,
        CursorDirection::Up | CursorDirection::Down => cursor.column,
    };
    Position::new(line, column.clamp(1, max_column))
}

fn line_text(buffer: &dyn EditorBuffer, line: u32) -> String {
    buffer.text_in_range(lines_range(buffer, line, line))
}

fn indent_lines(buffer: &mut dyn EditorBuffer, start: u32, end: u32, width: usize) -> Report {
    let pad = " ".repeat(width);
    let edits: Vec<TextEdit> = (start..=end)
        .filter(|&line| !line_text(buffer, line).trim().is_empty())
        .map(|line| TextEdit::insert(Position::line_start(line), pad.as_str()))
        .collect();
    if edits.is_empty() {
        return Report::noop("Nothing to indent");
    }
    buffer.apply_edits(&edits);
    Report::applied(describe_span("Indented", start, end))
}

fn outdent_lines(
    buffer: &mut dyn EditorBuffer,
    start: u32,
    end: u32,
    width: usize,
    tab_width: usize,
) -> Report {
    let edits: Vec<TextEdit> = (start..=end)
        .filter_map(|line| {
            let removable = removable_indent(&line_text(buffer, line), width, tab_width);
            (removable > 0).then(|| {
                TextEdit::delete(TextRange::new(
                    Position::line_start(line),
                    Position::new(line, removable as u32 + 1),
                ))
            })
        })
        .collect();
    if edits.is_empty() {
        return Report::noop("Nothing to outdent");
    }
    buffer.apply_edits(&edits);
    Report::applied(describe_span("Outdented", start, end))
}

/// Leading whitespace characters to drop to remove `width` columns of indent
fn removable_indent(text: &str, width: usize, tab_width: usize) -> usize {
    let mut columns = 0;
    let mut chars = 0;
    for c in text.chars() {
        if columns >= width {
            break;
        }
        match c {
            ' ' => columns += 1,
            '\t' => columns += tab_width,
            _ => break,
        }
        chars += 1;
    }
    chars
}

/// Trailing whitespace removed, leading tabs expanded to spaces
fn format_document(buffer: &mut dyn EditorBuffer, tab_width: usize) -> Report {
    let text = buffer.text();
    let formatted = text
        .split('\n')
        .map(|line| {
            let body = line.trim_start_matches(['\t', ' ']);
            let leading = &line[..line.len() - body.len()];
            let indent: String = leading
                .chars()
                .map(|c| if c == '\t' { " ".repeat(tab_width) } else { c.to_string() })
                .collect();
            format!("{}{}", indent, body).trim_end().to_string()
        })
        .collect::<Vec<_>>()
        .join("\n");

    if formatted == text {
        return Report::noop("Already formatted");
    }
    let range = lines_range(buffer, 1, buffer.line_count().max(1));
    buffer.apply_edits(&[TextEdit::replace(range, formatted)]);
    Report::applied("Formatted document")
}

/// Empty function in the file's language
fn function_stub(language: &str, name: &str, params: &[String], indent_width: usize) -> String {
    let params = params.join(", ");
    let indent = " ".repeat(indent_width);
    match language {
        "python" => format!("def {}({}):\n{}pass\n", name, params, indent),
        "ruby" => format!("def {}({})\nend\n", name, params),
        "rust" => format!("fn {}({}) {{\n}}\n", name, params),
        "go" => format!("func {}({}) {{\n}}\n", name, params),
        "shell" => format!("{}() {{\n}}\n", name),
        "php" => format!("function {}({}) {{\n}}\n", name, params),
        _ => format!("function {}({}) {{\n{}\n}}\n", name, params, indent),
    }
}
