//! Transcript gate: debounce and single-flight guard
//!
//! Speech recognition streams growing partial transcripts ("go", "go to",
//! "go to line 10"). Each accepted transcript restarts a quiet window and only
//! the one still pending when the window closes is dispatched. While a command
//! is in flight new transcripts are dropped, never queued.
//!
//! Time is passed in so the gate stays pure and testable.

use crate::core::types::Transcript;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Pending; the quiet window restarted
    Accepted,
    /// Same text as the last accepted transcript
    Duplicate,
    /// A command is in flight; the transcript was dropped
    Busy,
    Empty,
}

#[derive(Debug)]
pub struct TranscriptGate {
    quiet: Duration,
    last_accepted: Option<String>,
    pending: Option<Transcript>,
    deadline: Option<Instant>,
    in_flight: bool,
    dropped: usize,
}

impl TranscriptGate {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            last_accepted: None,
            pending: None,
            deadline: None,
            in_flight: false,
            dropped: 0,
        }
    }

    pub fn offer(&mut self, text: &str, now: Instant) -> GateDecision {
        let text = text.trim();
        if text.is_empty() {
            return GateDecision::Empty;
        }
        if self.in_flight {
            self.dropped += 1;
            tracing::info!(transcript = text, "Command in flight, dropping transcript");
            return GateDecision::Busy;
        }
        if self.last_accepted.as_deref() == Some(text) {
            return GateDecision::Duplicate;
        }

        self.last_accepted = Some(text.to_string());
        self.pending = Some(Transcript::new(text, now));
        self.deadline = Some(now + self.quiet);
        GateDecision::Accepted
    }

    /// When the pending transcript becomes due
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn pending(&self) -> Option<&Transcript> {
        self.pending.as_ref()
    }

    /// Take the pending transcript once its quiet window has elapsed
    pub fn take_due(&mut self, now: Instant) -> Option<Transcript> {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                self.pending.take()
            }
            _ => None,
        }
    }

    pub fn begin(&mut self) {
        self.in_flight = true;
    }

    pub fn finish(&mut self) {
        self.in_flight = false;
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Transcripts dropped because a command was in flight
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUIET: Duration = Duration::from_millis(500);

    #[test]
    fn test_partials_coalesce_into_last() {
        let mut gate = TranscriptGate::new(QUIET);
        let t0 = Instant::now();

        assert_eq!(gate.offer("go", t0), GateDecision::Accepted);
        assert_eq!(gate.offer("go to", t0 + Duration::from_millis(200)), GateDecision::Accepted);
        assert_eq!(
            gate.offer("go to line 10", t0 + Duration::from_millis(400)),
            GateDecision::Accepted
        );

        // Window restarted at 400ms, so nothing is due at 700ms
        assert!(gate.take_due(t0 + Duration::from_millis(700)).is_none());

        let due = gate.take_due(t0 + Duration::from_millis(900)).unwrap();
        assert_eq!(due.text, "go to line 10");
        assert!(gate.take_due(t0 + Duration::from_secs(5)).is_none());
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut gate = TranscriptGate::new(QUIET);
        let t0 = Instant::now();
        gate.offer("undo", t0);
        assert_eq!(gate.offer("undo ", t0), GateDecision::Duplicate);
    }

    #[test]
    fn test_busy_drops_without_queueing() {
        let mut gate = TranscriptGate::new(QUIET);
        let t0 = Instant::now();
        gate.offer("delete line 3", t0);
        gate.take_due(t0 + QUIET).unwrap();
        gate.begin();

        assert_eq!(gate.offer("go to top", t0 + QUIET), GateDecision::Busy);
        assert_eq!(gate.dropped(), 1);
        assert!(gate.pending().is_none());

        gate.finish();
        assert!(gate.take_due(t0 + QUIET * 4).is_none());
        assert_eq!(gate.offer("go to top", t0 + QUIET * 4), GateDecision::Accepted);
    }

    #[test]
    fn test_empty_ignored() {
        let mut gate = TranscriptGate::new(QUIET);
        assert_eq!(gate.offer("   ", Instant::now()), GateDecision::Empty);
        assert!(gate.deadline().is_none());
    }
}
