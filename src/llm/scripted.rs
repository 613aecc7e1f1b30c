//! Completion service that answers from a script
//!
//! Used by tests and by the binary when no API key is configured.

use crate::core::error::{Result, VoxError};
use crate::llm::resilience::CompletionService;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays canned answers in order and records every prompt
#[derive(Debug, Default)]
pub struct ScriptedService {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
    offline: bool,
}

impl ScriptedService {
    pub fn new<I, T>(responses: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
            offline: false,
        }
    }

    /// Answers every prompt with a conversational notice that no service is configured
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    pub fn push(&self, response: impl Into<String>) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(response.into());
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().map(|q| q.len()).unwrap_or(0)
    }
}

impl CompletionService for ScriptedService {
    async fn complete(&self, prompt: &str) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        if self.offline {
            return Ok(OFFLINE_ANSWER.to_string());
        }

        self.responses
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
            .ok_or_else(|| VoxError::Network("script exhausted".into()))
    }
}

/// Classifies as conversation and replies with a spoken notice
const OFFLINE_ANSWER: &str = r#"{"actionType": "conversation", "confidence": 1.0, "action": "voiceResponse", "response": "No completion service is configured. Set LLM_API_KEY and try again.", "shouldSpeak": true}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order() {
        let service = ScriptedService::new(["one", "two"]);
        assert_eq!(service.complete("a").await.unwrap(), "one");
        assert_eq!(service.complete("b").await.unwrap(), "two");
        assert!(matches!(service.complete("c").await, Err(VoxError::Network(_))));
        assert_eq!(service.prompts(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_offline_never_runs_out() {
        let service = ScriptedService::offline();
        for _ in 0..3 {
            let answer = service.complete("anything").await.unwrap();
            assert!(answer.contains("LLM_API_KEY"));
        }
        assert_eq!(service.remaining(), 0);
    }
}
