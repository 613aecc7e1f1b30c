//! One action generator per intent
//!
//! Every generator issues exactly one completion call with its own schema
//! prompt and hands the answer to the parser. Service failures become
//! [`Action::Error`] so the executor can report them.

use crate::command::action::Action;
use crate::core::config::PipelineConfig;
use crate::llm::classifier::IntentKind;
use crate::llm::context::EditorContext;
use crate::llm::parser::parse_action;
use crate::llm::prompts::generator_prompt;
use crate::llm::resilience::CompletionService;

/// Produce the action for `transcript` using the generator for `kind`
pub async fn generate_action<C: CompletionService>(
    service: &C,
    kind: IntentKind,
    transcript: &str,
    context: &EditorContext,
    config: &PipelineConfig,
) -> Action {
    let prompt = generator_prompt(kind, transcript, context, config.generator_excerpt_chars);

    match service.complete(&prompt).await {
        Ok(raw) => {
            let action = parse_action(&raw);
            tracing::debug!(intent = kind.label(), action = action.kind(), "Generated action");
            action
        }
        Err(e) => {
            tracing::warn!(intent = kind.label(), error = %e, "Action generation failed");
            Action::error(failure_message(kind))
        }
    }
}

fn failure_message(kind: IntentKind) -> &'static str {
    match kind {
        IntentKind::CodeAction => "Failed to generate code",
        IntentKind::Edit => "Failed to process the edit",
        IntentKind::Navigation => "Failed to process the navigation",
        IntentKind::Format => "Failed to format",
        IntentKind::Question => "Failed to answer the question",
        IntentKind::Conversation => "Failed to respond",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::scripted::ScriptedService;

    #[tokio::test]
    async fn test_generator_sends_one_prompt() {
        let service = ScriptedService::new([r#"{"action": "goToLine", "line": 42}"#]);

        let action = generate_action(
            &service,
            IntentKind::Navigation,
            "go to line 42",
            &EditorContext::empty(),
            &PipelineConfig::default(),
        )
        .await;

        assert_eq!(action, Action::GoToLine { line: 42 });
        let prompts = service.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("go to line 42"));
        assert!(prompts[0].contains("moveCursor"));
    }

    #[tokio::test]
    async fn test_exhausted_service_becomes_error_action() {
        let service = ScriptedService::new(Vec::<String>::new());

        let action = generate_action(
            &service,
            IntentKind::Question,
            "what is a closure",
            &EditorContext::empty(),
            &PipelineConfig::default(),
        )
        .await;

        assert_eq!(action, Action::error("Failed to answer the question"));
    }
}
