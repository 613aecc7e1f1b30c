//! Filesystem-backed host surfaces for the command-line front end
//!
//! The explorer walks a project root (respecting `.gitignore`), the terminal
//! runs commands through the system shell, and the status surface writes to
//! stdout.

use crate::host::memory::{MemoryBuffer, StatusLine};
use crate::host::{
    EditorBuffer, FileExplorer, HostSurfaces, StatusSurface, TerminalPanel, Workspace,
};
use ignore::WalkBuilder;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

/// Explorer over a directory tree on disk
pub struct FsExplorer {
    root: Option<PathBuf>,
    expanded: BTreeSet<PathBuf>,
    entry_count: usize,
    pending_open: Option<PathBuf>,
}

impl FsExplorer {
    pub fn new(root: Option<PathBuf>) -> Self {
        let mut explorer = Self {
            root,
            expanded: BTreeSet::new(),
            entry_count: 0,
            pending_open: None,
        };
        explorer.entry_count = explorer.walk().count();
        explorer
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn expanded(&self) -> impl Iterator<Item = &PathBuf> {
        self.expanded.iter()
    }

    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    /// File chosen by the last open request, for the front end to load
    pub fn take_pending_open(&mut self) -> Option<PathBuf> {
        self.pending_open.take()
    }

    fn walk(&self) -> impl Iterator<Item = ignore::DirEntry> {
        let walker = self.root.as_ref().map(|root| {
            WalkBuilder::new(root)
                .hidden(true)
                .sort_by_file_name(|a, b| a.cmp(b))
                .build()
        });
        walker.into_iter().flatten().filter_map(|entry| entry.ok())
    }

    fn find(&self, name: &str, want_dir: bool) -> Option<PathBuf> {
        let needle = name.to_lowercase();
        self.walk()
            .filter(|entry| entry.depth() > 0)
            .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_dir()) == want_dir)
            .find(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .to_lowercase()
                    .contains(&needle)
            })
            .map(|entry| entry.into_path())
    }
}

impl FileExplorer for FsExplorer {
    fn open_folder_picker(&mut self) -> Result<(), String> {
        Err("no folder picker in this host; pass --root instead".into())
    }

    fn open_file_by_name(&mut self, name: &str) -> Result<Option<String>, String> {
        if self.root.is_none() {
            return Err("no folder is open".into());
        }
        let found = self.find(name, false);
        if let Some(path) = &found {
            tracing::info!(path = %path.display(), "Opening file");
            self.pending_open = Some(path.clone());
        }
        Ok(found.map(|p| p.display().to_string()))
    }

    fn expand_directory_by_name(&mut self, name: &str) -> Result<Option<String>, String> {
        if self.root.is_none() {
            return Err("no folder is open".into());
        }
        let found = self.find(name, true);
        if let Some(path) = &found {
            self.expanded.insert(path.clone());
        }
        Ok(found.map(|p| p.display().to_string()))
    }

    fn refresh(&mut self) -> Result<(), String> {
        if self.root.is_none() {
            return Err("no folder is open".into());
        }
        self.entry_count = self.walk().count();
        // Drop expansions whose directories vanished
        self.expanded.retain(|dir| dir.is_dir());
        Ok(())
    }
}

/// Terminal that runs commands through `sh -c`
pub struct ShellTerminal {
    open: bool,
    working_dir: PathBuf,
}

impl ShellTerminal {
    pub fn new(working_dir: PathBuf) -> Self {
        Self {
            open: false,
            working_dir,
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn change_directory(&mut self, target: &str) -> Result<String, String> {
        let target = if target.is_empty() {
            std::env::var("HOME").map(PathBuf::from).map_err(|_| "HOME is not set".to_string())?
        } else {
            self.working_dir.join(target)
        };
        let resolved = target
            .canonicalize()
            .map_err(|e| format!("cd: {}: {}", target.display(), e))?;
        if !resolved.is_dir() {
            return Err(format!("cd: {}: not a directory", resolved.display()));
        }
        self.working_dir = resolved;
        Ok(self.working_dir.display().to_string())
    }
}

impl TerminalPanel for ShellTerminal {
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
        let command = command.trim();
        match command {
            "" => return Ok(String::new()),
            "clear" | "cls" => return Ok(String::new()),
            "pwd" => return Ok(self.working_dir.display().to_string()),
            "cd" => return self.change_directory(""),
            _ => {}
        }
        if let Some(target) = command.strip_prefix("cd ") {
            return self.change_directory(target.trim());
        }

        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&self.working_dir)
            .output()
            .map_err(|e| format!("failed to start shell: {}", e))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            Ok(stdout)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(format!("exit {}: {}", output.status, stderr.trim()))
        }
    }
}

/// Status surface that prints to stdout
pub struct ConsoleStatus {
    line: StatusLine,
}

impl ConsoleStatus {
    pub fn new(ttl: Duration) -> Self {
        Self {
            line: StatusLine::new(ttl),
        }
    }
}

impl StatusSurface for ConsoleStatus {
    fn show_status(&mut self, message: &str) {
        println!("[status] {}", message);
        self.line.show_status(message);
    }

    fn speak(&mut self, text: &str) {
        println!("[speak] {}", text);
        self.line.speak(text);
    }
}

/// Workspace used by the `vox` binary
pub struct FileWorkspace {
    pub buffer: Option<MemoryBuffer>,
    pub buffer_path: Option<PathBuf>,
    pub explorer: FsExplorer,
    pub terminal: ShellTerminal,
    pub status: ConsoleStatus,
    /// Buffer text as last read from disk
    loaded_text: String,
    /// Edited buffers that were switched away from, by path
    unsaved: BTreeMap<PathBuf, String>,
}

impl FileWorkspace {
    /// Workspace rooted at `root` (or the current directory), optionally with
    /// `file` loaded into the buffer
    pub fn open(file: Option<PathBuf>, root: Option<PathBuf>, status_ttl: Duration) -> std::io::Result<Self> {
        let working_dir = match &root {
            Some(root) => root.clone(),
            None => std::env::current_dir()?,
        };
        let mut workspace = Self {
            buffer: None,
            buffer_path: None,
            explorer: FsExplorer::new(Some(working_dir.clone())),
            terminal: ShellTerminal::new(working_dir),
            status: ConsoleStatus::new(status_ttl),
            loaded_text: String::new(),
            unsaved: BTreeMap::new(),
        };
        if let Some(path) = file {
            workspace.load(path)?;
        }
        Ok(workspace)
    }

    /// Load any file the explorer was asked to open into the buffer
    ///
    /// Edits to the outgoing buffer are kept and written by [`save`](Self::save).
    pub fn sync_open_requests(&mut self) -> std::io::Result<()> {
        match self.explorer.take_pending_open() {
            Some(path) => self.load(path),
            None => Ok(()),
        }
    }

    fn load(&mut self, path: PathBuf) -> std::io::Result<()> {
        let on_disk = std::fs::read_to_string(&path)?;

        if let (Some(buffer), Some(previous)) = (self.buffer.take(), self.buffer_path.take()) {
            let text = buffer.text();
            if text != self.loaded_text {
                tracing::debug!(path = %previous.display(), "Keeping edits to switched-out file");
                self.unsaved.insert(previous, text);
            }
        }

        let text = self.unsaved.remove(&path).unwrap_or_else(|| on_disk.clone());
        self.buffer = Some(MemoryBuffer::new(Some(&path.display().to_string()), &text));
        self.buffer_path = Some(path);
        self.loaded_text = on_disk;
        Ok(())
    }

    /// Paths with edits that have not been written yet
    pub fn dirty_paths(&self) -> Vec<&Path> {
        let mut paths: Vec<&Path> = self.unsaved.keys().map(PathBuf::as_path).collect();
        if let (Some(buffer), Some(path)) = (&self.buffer, &self.buffer_path) {
            if buffer.text() != self.loaded_text {
                paths.push(path);
            }
        }
        paths
    }

    /// Write every edited file back to disk; returns how many were written
    pub fn save(&mut self) -> std::io::Result<usize> {
        let mut written = 0;
        for (path, text) in std::mem::take(&mut self.unsaved) {
            std::fs::write(&path, text)?;
            written += 1;
        }
        if let (Some(buffer), Some(path)) = (&self.buffer, &self.buffer_path) {
            let text = buffer.text();
            if text != self.loaded_text {
                std::fs::write(path, &text)?;
                self.loaded_text = text;
                written += 1;
            }
        }
        Ok(written)
    }
}

impl Workspace for FileWorkspace {
    fn surfaces(&mut self) -> HostSurfaces<'_> {
        // A file opened by the previous command becomes the buffer now
        if let Err(e) = self.sync_open_requests() {
            tracing::warn!(error = %e, "Could not load requested file");
        }
        HostSurfaces {
            buffer: self.buffer.as_mut().map(|b| b as &mut dyn EditorBuffer),
            explorer: &mut self.explorer,
            terminal: &mut self.terminal,
            status: &mut self.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/components")).unwrap();
        fs::write(dir.path().join("src/components/Terminal.jsx"), "export {}").unwrap();
        fs::write(dir.path().join("src/main.rs"), "fn main() {}").unwrap();
        dir
    }

    #[test]
    fn test_open_file_by_fuzzy_name() {
        let dir = project();
        let mut explorer = FsExplorer::new(Some(dir.path().to_path_buf()));

        let opened = explorer.open_file_by_name("terminal").unwrap();
        assert!(opened.unwrap().ends_with("Terminal.jsx"));
        assert!(explorer.take_pending_open().is_some());
        assert!(explorer.take_pending_open().is_none());
    }

    #[test]
    fn test_expand_directory_by_fuzzy_name() {
        let dir = project();
        let mut explorer = FsExplorer::new(Some(dir.path().to_path_buf()));

        let expanded = explorer.expand_directory_by_name("COMPON").unwrap();
        assert!(expanded.unwrap().ends_with("components"));
        assert_eq!(explorer.expanded().count(), 1);
    }

    #[test]
    fn test_explorer_without_root_reports_error() {
        let mut explorer = FsExplorer::new(None);
        assert!(explorer.open_file_by_name("main").is_err());
        assert!(explorer.refresh().is_err());
    }

    #[test]
    fn test_shell_terminal_builtins() {
        let dir = project();
        let root = dir.path().canonicalize().unwrap();
        let mut terminal = ShellTerminal::new(root.clone());

        assert_eq!(terminal.run_command("pwd").unwrap(), root.display().to_string());
        terminal.run_command("cd src").unwrap();
        assert_eq!(terminal.working_dir(), root.join("src"));
        assert!(terminal.run_command("cd nowhere").is_err());
    }

    #[test]
    fn test_opened_file_becomes_buffer() {
        let dir = project();
        let mut workspace =
            FileWorkspace::open(None, Some(dir.path().to_path_buf()), Duration::from_secs(3)).unwrap();
        assert!(workspace.buffer.is_none());

        workspace.explorer.open_file_by_name("main.rs").unwrap();
        let surfaces = workspace.surfaces();
        assert_eq!(surfaces.buffer.map(|b| b.text()), Some("fn main() {}".to_string()));
        assert!(workspace.buffer_path.unwrap().ends_with("main.rs"));
    }

    #[test]
    fn test_save_writes_buffer_back() {
        let dir = project();
        let path = dir.path().join("src/main.rs");
        let mut workspace =
            FileWorkspace::open(Some(path.clone()), Some(dir.path().to_path_buf()), Duration::from_secs(3))
                .unwrap();

        workspace
            .buffer
            .as_mut()
            .unwrap()
            .apply_edits(&[crate::core::types::TextEdit::insert(
                crate::core::types::Position::line_start(1),
                "// edited\n",
            )]);

        assert_eq!(workspace.save().unwrap(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "// edited\nfn main() {}");
        assert_eq!(workspace.save().unwrap(), 0);
    }

    #[test]
    fn test_switching_files_keeps_edits() {
        let dir = project();
        let first = dir.path().join("src/main.rs");
        let mut workspace =
            FileWorkspace::open(Some(first.clone()), Some(dir.path().to_path_buf()), Duration::from_secs(3))
                .unwrap();
        workspace
            .buffer
            .as_mut()
            .unwrap()
            .apply_edits(&[crate::core::types::TextEdit::insert(
                crate::core::types::Position::line_start(1),
                "// first\n",
            )]);

        workspace.explorer.open_file_by_name("terminal").unwrap();
        let surfaces = workspace.surfaces();
        assert_eq!(surfaces.buffer.map(|b| b.text()), Some("export {}".to_string()));
        assert_eq!(workspace.dirty_paths(), vec![first.as_path()]);

        // Nothing written until save
        assert_eq!(fs::read_to_string(&first).unwrap(), "fn main() {}");
        assert_eq!(workspace.save().unwrap(), 1);
        assert_eq!(fs::read_to_string(&first).unwrap(), "// first\nfn main() {}");
        assert!(workspace.dirty_paths().is_empty());
    }

    #[test]
    fn test_reopening_switched_file_restores_edits() {
        let dir = project();
        let first = dir.path().join("src/main.rs");
        let mut workspace =
            FileWorkspace::open(Some(first.clone()), Some(dir.path().to_path_buf()), Duration::from_secs(3))
                .unwrap();
        workspace
            .buffer
            .as_mut()
            .unwrap()
            .apply_edits(&[crate::core::types::TextEdit::insert(
                crate::core::types::Position::line_start(1),
                "// first\n",
            )]);

        workspace.explorer.open_file_by_name("terminal").unwrap();
        workspace.sync_open_requests().unwrap();
        workspace.explorer.open_file_by_name("main.rs").unwrap();
        workspace.sync_open_requests().unwrap();

        assert_eq!(workspace.buffer.as_ref().unwrap().text(), "// first\nfn main() {}");
        assert_eq!(workspace.dirty_paths().len(), 1);
    }

    #[test]
    fn test_toggle_flips_panel() {
        let mut terminal = ShellTerminal::new(PathBuf::from("."));
        terminal.toggle();
        assert!(terminal.is_open());
        terminal.toggle();
        assert!(!terminal.is_open());
    }
}
