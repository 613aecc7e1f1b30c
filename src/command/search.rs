//! Search-result navigation
//!
//! Owns the current search and the buffer decorations that highlight it.
//! Every change swaps the whole decoration set in a single
//! `replace_decorations` call, so highlights never pile up across searches.

use crate::core::types::{Decoration, DecorationId, Position, TextRange};
use crate::host::EditorBuffer;
use regex::RegexBuilder;

/// Matches for the active query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    pub query: String,
    /// Non-overlapping, in document order
    pub matches: Vec<TextRange>,
    /// None when there are no matches
    pub current: Option<usize>,
}

impl SearchState {
    pub fn total(&self) -> usize {
        self.matches.len()
    }

    pub fn current_match(&self) -> Option<TextRange> {
        self.current.and_then(|i| self.matches.get(i).copied())
    }
}

/// Which way to step through matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Next,
    Previous,
    First,
    Last,
}

/// Result of a search operation, for status reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Positioned on match `index` (0-based) of `total`
    Match { index: usize, total: usize },
    NoMatches,
    /// Navigation requested with no active search
    NoSearch,
}

#[derive(Debug, Default)]
pub struct SearchNavigator {
    state: SearchState,
    decorations: Vec<DecorationId>,
    /// File name and text the matches were computed against
    source: Option<(Option<String>, String)>,
}

impl SearchNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    /// Decoration handles currently owned
    pub fn decoration_count(&self) -> usize {
        self.decorations.len()
    }

    /// Literal, case-insensitive search over the whole buffer
    ///
    /// An empty query changes nothing and reports [`SearchOutcome::NoSearch`].
    pub fn search(&mut self, buffer: &mut dyn EditorBuffer, query: &str) -> SearchOutcome {
        if query.is_empty() {
            return SearchOutcome::NoSearch;
        }

        let text = buffer.text();
        let matches = find_matches(&text, query);
        self.source = Some((buffer.file_name(), text));

        self.state = SearchState {
            query: query.to_string(),
            current: if matches.is_empty() { None } else { Some(0) },
            matches,
        };
        tracing::debug!(query, total = self.state.total(), "Search complete");

        self.refresh(buffer)
    }

    /// Move between matches, wrapping around at both ends
    ///
    /// Matches from another file are discarded. If the buffer text changed
    /// since the search ran, matches are recomputed first.
    pub fn step(&mut self, buffer: &mut dyn EditorBuffer, step: Step) -> SearchOutcome {
        self.revalidate(buffer);
        let total = self.state.total();
        if total == 0 {
            return if self.state.query.is_empty() {
                SearchOutcome::NoSearch
            } else {
                SearchOutcome::NoMatches
            };
        }

        let current = self.state.current.unwrap_or(0);
        let next = match step {
            Step::Next => (current + 1) % total,
            Step::Previous => (current + total - 1) % total,
            Step::First => 0,
            Step::Last => total - 1,
        };
        self.state.current = Some(next);

        self.refresh(buffer)
    }

    /// Forget the search and remove its highlights
    pub fn clear(&mut self, buffer: Option<&mut dyn EditorBuffer>) {
        if let Some(buffer) = buffer {
            buffer.replace_decorations(&self.decorations, &[]);
        }
        self.decorations.clear();
        self.state = SearchState::default();
        self.source = None;
    }

    fn revalidate(&mut self, buffer: &mut dyn EditorBuffer) {
        let Some((file, text)) = &self.source else {
            return;
        };
        if *file != buffer.file_name() {
            tracing::debug!(query = %self.state.query, "Buffer changed, dropping search");
            // Decoration handles belong to the previous buffer
            self.decorations.clear();
            self.state = SearchState::default();
            self.source = None;
            return;
        }

        let current = buffer.text();
        if *text != current {
            let matches = find_matches(&current, &self.state.query);
            self.state.current = match self.state.current {
                _ if matches.is_empty() => None,
                Some(i) => Some(i.min(matches.len() - 1)),
                None => Some(0),
            };
            self.state.matches = matches;
            self.source = Some((buffer.file_name(), current));
        }
    }

    /// Swap in decorations for the current state and move to the current match
    fn refresh(&mut self, buffer: &mut dyn EditorBuffer) -> SearchOutcome {
        let decorations: Vec<Decoration> = self
            .state
            .matches
            .iter()
            .enumerate()
            .map(|(i, range)| Decoration {
                range: *range,
                current: Some(i) == self.state.current,
            })
            .collect();
        self.decorations = buffer.replace_decorations(&self.decorations, &decorations);

        match (self.state.current, self.state.current_match()) {
            (Some(index), Some(range)) => {
                buffer.set_cursor(range.start);
                buffer.reveal_line(range.start.line);
                SearchOutcome::Match {
                    index,
                    total: self.state.total(),
                }
            }
            _ => SearchOutcome::NoMatches,
        }
    }
}

fn find_matches(text: &str, query: &str) -> Vec<TextRange> {
    match RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()
    {
        Ok(pattern) => {
            let mut locator = Locator::new(text);
            pattern
                .find_iter(text)
                .filter(|m| !m.as_str().is_empty())
                .map(|m| TextRange::new(locator.position(m.start()), locator.position(m.end())))
                .collect()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Search pattern rejected");
            Vec::new()
        }
    }
}

/// Converts ascending byte offsets into 1-based line/character positions
struct Locator<'a> {
    text: &'a str,
    offset: usize,
    line: u32,
    line_start: usize,
}

impl<'a> Locator<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            offset: 0,
            line: 1,
            line_start: 0,
        }
    }

    fn position(&mut self, target: usize) -> Position {
        for (i, c) in self.text[self.offset..target].char_indices() {
            if c == '\n' {
                self.line += 1;
                self.line_start = self.offset + i + 1;
            }
        }
        self.offset = target;
        let column = self.text[self.line_start..target].chars().count() as u32 + 1;
        Position::new(self.line, column)
    }
}
