//! Classify a transcript into a coarse intent
//!
//! Classification never blocks the pipeline. Any failure becomes a
//! low-confidence [`IntentKind::Conversation`], which is routed like any
//! other intent.

use crate::core::config::PipelineConfig;
use crate::llm::context::EditorContext;
use crate::llm::parser::extract_value;
use crate::llm::prompts::classifier_prompt;
use crate::llm::resilience::CompletionService;
use serde_json::Value;

/// Which generator handles a transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntentKind {
    CodeAction,
    Edit,
    Navigation,
    Format,
    Question,
    Conversation,
}

impl IntentKind {
    /// Map a classifier label; anything unrecognised is conversation
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "code_action" | "code" | "codeaction" => Self::CodeAction,
            "edit" => Self::Edit,
            "navigation" | "navigate" => Self::Navigation,
            "format" | "formatting" => Self::Format,
            "question" => Self::Question,
            _ => Self::Conversation,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::CodeAction => "code_action",
            Self::Edit => "edit",
            Self::Navigation => "navigation",
            Self::Format => "format",
            Self::Question => "question",
            Self::Conversation => "conversation",
        }
    }
}

/// Classification result. Confidence and reason are diagnostic only.
#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub kind: IntentKind,
    /// In [0, 1]
    pub confidence: f32,
    pub reason: String,
}

impl Intent {
    pub fn new(kind: IntentKind, confidence: f32, reason: impl Into<String>) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            kind,
            confidence,
            reason: reason.into(),
        }
    }

    /// What a failed classification turns into
    pub fn fallback() -> Self {
        Self::new(IntentKind::Conversation, 0.1, "classification failed")
    }

    fn from_value(value: &Value) -> Option<Self> {
        let label = value
            .get("actionType")
            .or_else(|| value.get("intent"))?
            .as_str()?;
        let confidence = value
            .get("confidence")
            .and_then(Value::as_f64)
            .unwrap_or(0.5) as f32;
        let reason = value
            .get("reasoning")
            .and_then(Value::as_str)
            .unwrap_or_default();
        Some(Self::new(IntentKind::from_label(label), confidence, reason))
    }
}

/// Classify `transcript` with one completion call
pub async fn classify<C: CompletionService>(
    service: &C,
    transcript: &str,
    context: &EditorContext,
    config: &PipelineConfig,
) -> Intent {
    let prompt = classifier_prompt(transcript, context, config.classifier_excerpt_chars);

    let raw = match service.complete(&prompt).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(error = %e, "Classification request failed");
            return Intent::fallback();
        }
    };

    match extract_value(&raw).as_ref().and_then(Intent::from_value) {
        Some(intent) => {
            tracing::debug!(
                kind = intent.kind.label(),
                confidence = intent.confidence,
                reason = %intent.reason,
                "Classified transcript"
            );
            intent
        }
        None => {
            tracing::warn!(response = %raw, "Classification output was not usable");
            Intent::fallback()
        }
    }
}
