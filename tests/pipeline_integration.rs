//! Integration tests for the transcript -> action pipeline
//!
//! Completion answers are scripted; the host is the in-memory workspace.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use vox_command::command::{Action, Outcome};
use vox_command::core::config::PipelineConfig;
use vox_command::core::error::{Result, VoxError};
use vox_command::host::memory::MemoryWorkspace;
use vox_command::host::{EditorBuffer, Workspace};
use vox_command::llm::classifier::IntentKind;
use vox_command::llm::parser::parse_action;
use vox_command::llm::resilience::CompletionService;
use vox_command::llm::scripted::ScriptedService;
use vox_command::pipeline::{CommandPipeline, VoiceSession};

fn classified(kind: &str, action: &str) -> ScriptedService {
    ScriptedService::new([
        format!(r#"{{"actionType": "{}", "confidence": 0.9, "reasoning": "test"}}"#, kind),
        action.to_string(),
    ])
}

/// Answers from a script after a fixed delay
struct Slow {
    script: ScriptedService,
    delay: Duration,
}

impl CompletionService for Slow {
    async fn complete(&self, prompt: &str) -> Result<String> {
        tokio::time::sleep(self.delay).await;
        self.script.complete(prompt).await
    }
}

/// Always answers 503
#[derive(Default)]
struct Unavailable {
    calls: AtomicUsize,
}

impl CompletionService for Unavailable {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(VoxError::Service {
            status: 503,
            message: "overloaded".into(),
        })
    }
}

// ============================================================================
// End to end
// ============================================================================

#[tokio::test]
async fn test_delete_lines_end_to_end() {
    let mut workspace = MemoryWorkspace::with_numbered_lines(20);
    let mut pipeline = CommandPipeline::new(
        classified("edit", r#"{"action": "deleteLines", "startLine": 4, "endLine": 6}"#),
        PipelineConfig::default(),
    );

    let report = pipeline
        .process("delete lines 4 through 6", &mut workspace.surfaces(), false)
        .await;

    assert_eq!(report.intent.kind, IntentKind::Edit);
    assert_eq!(
        report.action,
        Action::DeleteLines {
            start_line: 4,
            end_line: 6
        }
    );
    assert_eq!(report.result.status, "Deleted lines 4-6");

    let buffer = workspace.buffer().unwrap();
    assert_eq!(buffer.edit_batches(), 1);
    assert_eq!(buffer.line_count(), 17);
    assert_eq!(buffer.line(3), Some("line 3"));
    assert_eq!(buffer.line(4), Some("line 7"));
    assert_eq!(workspace.status.last(), Some("Deleted lines 4-6"));
}

#[tokio::test]
async fn test_out_of_range_line_is_clamped() {
    let mut workspace = MemoryWorkspace::with_numbered_lines(20);
    let mut pipeline = CommandPipeline::new(
        classified("navigation", r#"{"action": "goToLine", "line": 500}"#),
        PipelineConfig::default(),
    );

    let report = pipeline
        .process("go to line 500", &mut workspace.surfaces(), false)
        .await;

    assert_eq!(report.result.status, "Moved to line 20");
    let buffer = workspace.buffer().unwrap();
    assert_eq!(buffer.cursor().line, 20);
    assert_eq!(buffer.revealed_line(), Some(20));
    assert_eq!(buffer.edit_batches(), 0);
}

#[tokio::test]
async fn test_truncated_code_still_inserted() {
    let mut workspace = MemoryWorkspace::with_numbered_lines(3);
    let mut pipeline = CommandPipeline::new(
        classified(
            "code_action",
            r#"{"action": "insertCode", "line": 2, "code": "function add(a, b) {\n  return a + b;"#,
        ),
        PipelineConfig::default(),
    );

    let report = pipeline
        .process("create an add function", &mut workspace.surfaces(), false)
        .await;

    assert_eq!(report.result.outcome, Outcome::Applied);
    let buffer = workspace.buffer().unwrap();
    assert_eq!(buffer.line(2), Some("function add(a, b) {"));
    assert_eq!(buffer.line(3), Some("  return a + b;"));
    assert_eq!(buffer.line(4), Some("line 2"));
}

#[tokio::test]
async fn test_repeated_searches_keep_one_highlight_set() {
    let mut workspace = MemoryWorkspace::new(Some(vox_command::host::memory::MemoryBuffer::new(
        Some("app.js"),
        "let data = 1;\nfetch(data);\nconsole.log(data);",
    )));
    let script = ScriptedService::new([
        r#"{"actionType": "navigation"}"#,
        r#"{"action": "findText", "searchText": "data"}"#,
        r#"{"actionType": "navigation"}"#,
        r#"{"action": "findText", "searchText": "fetch"}"#,
    ]);
    let mut pipeline = CommandPipeline::new(script, PipelineConfig::default());

    pipeline.process("find data", &mut workspace.surfaces(), false).await;
    assert_eq!(workspace.buffer().unwrap().active_decorations().len(), 3);

    pipeline.process("find fetch", &mut workspace.surfaces(), false).await;
    assert_eq!(workspace.buffer().unwrap().active_decorations().len(), 1);
    assert_eq!(pipeline.executor().search().state().total(), 1);
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_unavailable_service_degrades_to_error() {
    let mut workspace = MemoryWorkspace::with_numbered_lines(5);
    let mut pipeline = CommandPipeline::new(Unavailable::default(), PipelineConfig::default());

    let report = pipeline
        .process("what does this do", &mut workspace.surfaces(), false)
        .await;

    // Classifier and generator each try three times
    assert_eq!(pipeline.service().inner().calls.load(Ordering::SeqCst), 6);
    assert_eq!(report.intent.kind, IntentKind::Conversation);
    assert!(matches!(report.action, Action::Error { .. }));
    assert_eq!(report.result.outcome, Outcome::Failed);
    assert_eq!(workspace.status.spoken.len(), 1);
    assert_eq!(workspace.buffer().unwrap().edit_batches(), 0);
}

#[tokio::test]
async fn test_edit_without_buffer_is_rejected() {
    let mut workspace = MemoryWorkspace::new(None);
    let mut pipeline = CommandPipeline::new(
        classified("edit", r#"{"action": "deleteLines", "startLine": 1}"#),
        PipelineConfig::default(),
    );

    let report = pipeline
        .process("delete line 1", &mut workspace.surfaces(), false)
        .await;

    assert_eq!(report.result.outcome, Outcome::Rejected);
    assert_eq!(workspace.status.last(), Some("No file is open"));
}

// ============================================================================
// Voice session
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_partial_transcripts_dispatch_once() {
    let mut session = VoiceSession::new(
        classified("navigation", r#"{"action": "goToLine", "line": 10}"#),
        MemoryWorkspace::with_numbered_lines(20),
        PipelineConfig::default(),
    );
    let (tx, rx) = mpsc::channel(8);

    let feeder = async move {
        for partial in ["go", "go to", "go to line 10"] {
            tx.send(partial.to_string()).await.unwrap();
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
    };
    let (reports, ()) = tokio::join!(session.run(rx), feeder);

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].transcript, "go to line 10");
    assert_eq!(session.workspace().buffer().unwrap().cursor().line, 10);
}

#[tokio::test(start_paused = true)]
async fn test_transcript_during_flight_is_dropped() {
    let service = Slow {
        script: classified("edit", r#"{"action": "deleteLines", "startLine": 1, "endLine": 1}"#),
        delay: Duration::from_secs(1),
    };
    let mut session = VoiceSession::new(
        service,
        MemoryWorkspace::with_numbered_lines(5),
        PipelineConfig::default(),
    );
    assert!(!session.is_busy());
    let (tx, rx) = mpsc::channel(8);

    let feeder = async move {
        tx.send("delete line 1".to_string()).await.unwrap();
        // Dispatched at 500ms, in flight until 2500ms
        tokio::time::sleep(Duration::from_millis(900)).await;
        tx.send("go to top".to_string()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
    };
    let (reports, ()) = tokio::join!(session.run(rx), feeder);

    assert_eq!(reports.len(), 1);
    assert_eq!(session.gate().dropped(), 1);
    assert!(!session.is_busy());
    assert_eq!(session.workspace().buffer().unwrap().line_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_live_session_never_speaks() {
    let mut session = VoiceSession::new(
        classified("question", r#"{"action": "voiceResponse", "response": "A closure.", "shouldSpeak": true}"#),
        MemoryWorkspace::new(None),
        PipelineConfig::default(),
    );
    session.set_listening(true);
    let (tx, rx) = mpsc::channel(8);
    tx.send("what is a closure".to_string()).await.unwrap();
    drop(tx);

    let reports = session.run(rx).await;

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].result.spoken, None);
    assert!(session.workspace().status.spoken.is_empty());
    assert_eq!(session.workspace().status.last(), Some("A closure."));
}

// ============================================================================
// Parser robustness
// ============================================================================

#[test]
fn test_parser_handles_every_shape() {
    let inputs = [
        "",
        "plain prose with no structure",
        r#"{"action": "goToTop"}"#,
        "```json\n{\"action\": \"redo\"}\n```",
        r#"{"action": "replaceCode", "startLine": 2, "newCode": "x"#,
        r#"{"action": "indent", "levels": 2,}"#,
        "{{{{",
        "}",
        r#"{"no_action": true}"#,
    ];
    for input in inputs {
        let action = parse_action(input);
        assert!(!action.kind().is_empty(), "empty kind for {:?}", input);
    }
    assert_eq!(parse_action("```json\n{\"action\": \"redo\"}\n```"), Action::Redo);
}
