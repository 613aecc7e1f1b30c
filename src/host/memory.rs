//! In-memory host surfaces
//!
//! A line-based text buffer with its own undo history and decoration table,
//! plus recording doubles for the explorer, terminal and status bar. The demo
//! binary edits files through [`MemoryBuffer`]; tests inspect what the
//! recorders captured.

use crate::core::types::{Decoration, DecorationId, Position, TextEdit, TextRange};
use crate::host::{
    EditorBuffer, FileExplorer, HostSurfaces, StatusSurface, TerminalPanel, Workspace,
};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Line-based text buffer
#[derive(Debug, Clone)]
pub struct MemoryBuffer {
    file_name: Option<String>,
    lines: Vec<String>,
    cursor: Position,
    selection: Option<TextRange>,
    decorations: HashMap<DecorationId, Decoration>,
    undo_stack: Vec<Vec<String>>,
    redo_stack: Vec<Vec<String>>,
    revealed_line: Option<u32>,
    focused: bool,
    edit_batches: usize,
}

impl MemoryBuffer {
    pub fn new(file_name: Option<&str>, text: &str) -> Self {
        Self {
            file_name: file_name.map(str::to_string),
            lines: split_lines(text),
            cursor: Position::line_start(1),
            selection: None,
            decorations: HashMap::new(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            revealed_line: None,
            focused: false,
            edit_batches: 0,
        }
    }

    pub fn set_selection(&mut self, selection: Option<TextRange>) {
        self.selection = selection;
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line(&self, line: u32) -> Option<&str> {
        self.lines.get(line.checked_sub(1)? as usize).map(String::as_str)
    }

    /// Decorations currently registered with the buffer
    pub fn active_decorations(&self) -> Vec<Decoration> {
        let mut decorations: Vec<_> = self.decorations.values().copied().collect();
        decorations.sort_by_key(|d| d.range.start);
        decorations
    }

    pub fn revealed_line(&self) -> Option<u32> {
        self.revealed_line
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Number of `apply_edits` calls that changed the text
    pub fn edit_batches(&self) -> usize {
        self.edit_batches
    }

    fn clamp_line(&self, line: u32) -> u32 {
        line.clamp(1, self.lines.len() as u32)
    }

    /// Byte offset of a position in the joined text
    fn offset_of(&self, position: Position) -> usize {
        let line = self.clamp_line(position.line);
        let before: usize = self.lines[..(line - 1) as usize]
            .iter()
            .map(|l| l.len() + 1)
            .sum();
        let text = &self.lines[(line - 1) as usize];
        let column = position.column.max(1) as usize - 1;
        let within = text
            .char_indices()
            .nth(column)
            .map(|(idx, _)| idx)
            .unwrap_or(text.len());
        before + within
    }

    fn clamp_cursor(&mut self) {
        let line = self.clamp_line(self.cursor.line);
        let column = self.cursor.column.clamp(1, self.line_max_column(line));
        self.cursor = Position::new(line, column);
    }
}

fn split_lines(text: &str) -> Vec<String> {
    text.split('\n').map(str::to_string).collect()
}

impl EditorBuffer for MemoryBuffer {
    fn file_name(&self) -> Option<String> {
        self.file_name.clone()
    }

    fn cursor(&self) -> Position {
        self.cursor
    }

    fn set_cursor(&mut self, position: Position) {
        self.cursor = position;
        self.clamp_cursor();
    }

    fn selection(&self) -> Option<TextRange> {
        self.selection.filter(|s| !s.is_empty())
    }

    fn line_count(&self) -> u32 {
        self.lines.len() as u32
    }

    fn line_max_column(&self, line: u32) -> u32 {
        self.line(line)
            .map(|l| l.chars().count() as u32 + 1)
            .unwrap_or(1)
    }

    fn text(&self) -> String {
        self.lines.join("\n")
    }

    fn text_in_range(&self, range: TextRange) -> String {
        let text = self.text();
        let start = self.offset_of(range.start);
        let end = self.offset_of(range.end).max(start);
        text[start..end].to_string()
    }

    fn apply_edits(&mut self, edits: &[TextEdit]) {
        if edits.is_empty() {
            return;
        }

        let mut resolved: Vec<(usize, usize, &str)> = edits
            .iter()
            .map(|e| {
                let start = self.offset_of(e.range.start);
                let end = self.offset_of(e.range.end).max(start);
                (start, end, e.text.as_str())
            })
            .collect();
        // Back to front so earlier offsets stay valid
        resolved.sort_by(|a, b| b.0.cmp(&a.0));

        let mut text = self.text();
        for (start, end, replacement) in resolved {
            text.replace_range(start..end, replacement);
        }

        let previous = std::mem::replace(&mut self.lines, split_lines(&text));
        if previous != self.lines {
            self.undo_stack.push(previous);
            self.redo_stack.clear();
            self.edit_batches += 1;
        }
        self.clamp_cursor();
    }

    fn reveal_line(&mut self, line: u32) {
        self.revealed_line = Some(line);
    }

    fn replace_decorations(
        &mut self,
        old: &[DecorationId],
        new: &[Decoration],
    ) -> Vec<DecorationId> {
        for id in old {
            self.decorations.remove(id);
        }
        new.iter()
            .map(|decoration| {
                let id = DecorationId::new();
                self.decorations.insert(id, *decoration);
                id
            })
            .collect()
    }

    fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    fn undo(&mut self) {
        if let Some(previous) = self.undo_stack.pop() {
            let current = std::mem::replace(&mut self.lines, previous);
            self.redo_stack.push(current);
            self.clamp_cursor();
        }
    }

    fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    fn redo(&mut self) {
        if let Some(next) = self.redo_stack.pop() {
            let current = std::mem::replace(&mut self.lines, next);
            self.undo_stack.push(current);
            self.clamp_cursor();
        }
    }

    fn focus(&mut self) {
        self.focused = true;
    }
}

/// Explorer double that records requests and answers from a fixed file list
#[derive(Debug, Default)]
pub struct RecordingExplorer {
    pub files: Vec<String>,
    pub directories: Vec<String>,
    pub opened: Vec<String>,
    pub expanded: Vec<String>,
    pub picker_requests: usize,
    pub refreshes: usize,
}

impl RecordingExplorer {
    pub fn with_entries(files: &[&str], directories: &[&str]) -> Self {
        Self {
            files: files.iter().map(|f| f.to_string()).collect(),
            directories: directories.iter().map(|d| d.to_string()).collect(),
            ..Self::default()
        }
    }
}

fn fuzzy_find<'a>(candidates: &'a [String], name: &str) -> Option<&'a String> {
    let needle = name.to_lowercase();
    candidates
        .iter()
        .find(|c| c.to_lowercase().contains(&needle))
}

impl FileExplorer for RecordingExplorer {
    fn open_folder_picker(&mut self) -> Result<(), String> {
        self.picker_requests += 1;
        Ok(())
    }

    fn open_file_by_name(&mut self, name: &str) -> Result<Option<String>, String> {
        let found = fuzzy_find(&self.files, name).cloned();
        if let Some(path) = &found {
            self.opened.push(path.clone());
        }
        Ok(found)
    }

    fn expand_directory_by_name(&mut self, name: &str) -> Result<Option<String>, String> {
        let found = fuzzy_find(&self.directories, name).cloned();
        if let Some(path) = &found {
            self.expanded.push(path.clone());
        }
        Ok(found)
    }

    fn refresh(&mut self) -> Result<(), String> {
        self.refreshes += 1;
        Ok(())
    }
}

/// Terminal double that records commands instead of running them
#[derive(Debug, Default)]
pub struct RecordingTerminal {
    pub open: bool,
    pub commands: Vec<String>,
}

impl TerminalPanel for RecordingTerminal {
    fn is_open(&self) -> bool {
        self.open
    }

    fn open(&mut self) {
        self.open = true;
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn run_command(&mut self, command: &str) -> Result<String, String> {
        self.commands.push(command.to_string());
        Ok(String::new())
    }
}

/// Status bar with auto-expiring messages
#[derive(Debug)]
pub struct StatusLine {
    ttl: Duration,
    current: Option<(String, Instant)>,
    /// Every status shown, oldest first
    pub history: Vec<String>,
    /// Every speech request, oldest first
    pub spoken: Vec<String>,
}

impl StatusLine {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            current: None,
            history: Vec::new(),
            spoken: Vec::new(),
        }
    }

    /// The visible message, or None once it has expired
    pub fn current(&self) -> Option<&str> {
        self.current_at(Instant::now())
    }

    pub fn current_at(&self, now: Instant) -> Option<&str> {
        match &self.current {
            Some((message, shown_at)) if now.duration_since(*shown_at) < self.ttl => {
                Some(message.as_str())
            }
            _ => None,
        }
    }

    pub fn last(&self) -> Option<&str> {
        self.history.last().map(String::as_str)
    }
}

impl StatusSurface for StatusLine {
    fn show_status(&mut self, message: &str) {
        self.current = Some((message.to_string(), Instant::now()));
        self.history.push(message.to_string());
    }

    fn speak(&mut self, text: &str) {
        self.spoken.push(text.to_string());
    }
}

/// All in-memory surfaces bundled together
pub struct MemoryWorkspace {
    pub buffer: Option<MemoryBuffer>,
    pub explorer: RecordingExplorer,
    pub terminal: RecordingTerminal,
    pub status: StatusLine,
}

impl MemoryWorkspace {
    pub fn new(buffer: Option<MemoryBuffer>) -> Self {
        Self {
            buffer,
            explorer: RecordingExplorer::default(),
            terminal: RecordingTerminal::default(),
            status: StatusLine::new(Duration::from_secs(3)),
        }
    }

    /// Workspace with a buffer of `count` numbered lines ("line 1", "line 2", ...)
    pub fn with_numbered_lines(count: u32) -> Self {
        let text = (1..=count)
            .map(|i| format!("line {}", i))
            .collect::<Vec<_>>()
            .join("\n");
        Self::new(Some(MemoryBuffer::new(Some("main.js"), &text)))
    }

    pub fn buffer(&self) -> Option<&MemoryBuffer> {
        self.buffer.as_ref()
    }
}

impl Workspace for MemoryWorkspace {
    fn surfaces(&mut self) -> HostSurfaces<'_> {
        HostSurfaces {
            buffer: self.buffer.as_mut().map(|b| b as &mut dyn EditorBuffer),
            explorer: &mut self.explorer,
            terminal: &mut self.terminal,
            status: &mut self.status,
        }
    }
}
