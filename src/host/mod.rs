//! Capability surfaces the pipeline drives
//!
//! The editor widget, file tree, terminal panel and status bar belong to the
//! host application. The pipeline only sees these narrow traits, so a real UI,
//! the in-memory doubles in [`memory`] and the filesystem-backed workspace in
//! [`workspace`] are interchangeable.

pub mod memory;
pub mod workspace;

use crate::core::types::{Decoration, DecorationId, Position, TextEdit, TextRange};

/// Text buffer capability surface
///
/// All positions are 1-based. Implementations are not required to clamp;
/// the execution engine clamps before calling.
pub trait EditorBuffer {
    fn file_name(&self) -> Option<String>;

    fn cursor(&self) -> Position;
    fn set_cursor(&mut self, position: Position);

    /// Current selection, if any
    fn selection(&self) -> Option<TextRange>;

    fn line_count(&self) -> u32;
    /// Column just past the last character of `line`
    fn line_max_column(&self, line: u32) -> u32;

    fn text(&self) -> String;
    fn text_in_range(&self, range: TextRange) -> String;

    /// Apply every edit as one atomic change (one undo step).
    /// Ranges refer to the document before any of the edits.
    fn apply_edits(&mut self, edits: &[TextEdit]);

    fn reveal_line(&mut self, line: u32);

    /// Swap the decorations in `old` for a new set in one call
    fn replace_decorations(
        &mut self,
        old: &[DecorationId],
        new: &[Decoration],
    ) -> Vec<DecorationId>;

    fn can_undo(&self) -> bool;
    fn undo(&mut self);
    fn can_redo(&self) -> bool;
    fn redo(&mut self);

    fn focus(&mut self);
}

/// File-explorer capability surface
pub trait FileExplorer {
    /// Ask the user to pick a root folder
    fn open_folder_picker(&mut self) -> Result<(), String>;
    /// Open the first file whose name contains `name` (case-insensitive).
    /// Returns the path that was opened.
    fn open_file_by_name(&mut self, name: &str) -> Result<Option<String>, String>;
    /// Expand the first directory whose name contains `name` (case-insensitive)
    fn expand_directory_by_name(&mut self, name: &str) -> Result<Option<String>, String>;
    fn refresh(&mut self) -> Result<(), String>;
}

/// Terminal/process capability surface
pub trait TerminalPanel {
    fn is_open(&self) -> bool;
    fn open(&mut self);
    fn close(&mut self);
    fn toggle(&mut self) {
        if self.is_open() {
            self.close();
        } else {
            self.open();
        }
    }
    /// Run a command string in the active working directory
    fn run_command(&mut self, command: &str) -> Result<String, String>;
}

/// Outward status and spoken feedback
pub trait StatusSurface {
    /// Short-lived message; the surface expires it on its own
    fn show_status(&mut self, message: &str);
    /// Spoken feedback request. The execution engine decides whether to call
    /// this at all, so implementations always speak.
    fn speak(&mut self, text: &str);
}

/// Borrowed view over the host for one command
pub struct HostSurfaces<'a> {
    pub buffer: Option<&'a mut dyn EditorBuffer>,
    pub explorer: &'a mut dyn FileExplorer,
    pub terminal: &'a mut dyn TerminalPanel,
    pub status: &'a mut dyn StatusSurface,
}

/// Something that can lend out its surfaces for one command
pub trait Workspace {
    fn surfaces(&mut self) -> HostSurfaces<'_>;
}
