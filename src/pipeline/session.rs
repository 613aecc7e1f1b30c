//! Command processing and the voice session loop
//!
//! [`CommandPipeline`] runs one transcript through classify, generate, parse
//! and execute. [`VoiceSession`] feeds it from a transcript channel through
//! the gate, so at most one command is ever in flight.

use crate::command::action::Action;
use crate::command::executor::{ActionExecutor, ExecutionResult};
use crate::core::config::PipelineConfig;
use crate::host::{EditorBuffer, HostSurfaces, Workspace};
use crate::llm::classifier::{classify, Intent};
use crate::llm::context::EditorContext;
use crate::llm::generators::generate_action;
use crate::llm::resilience::{CompletionService, ResilientCompletion, RetryPolicy};
use crate::pipeline::gate::TranscriptGate;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

/// Everything that happened to one command
#[derive(Debug, Clone)]
pub struct CommandReport {
    pub transcript: String,
    pub intent: Intent,
    pub action: Action,
    pub result: ExecutionResult,
}

/// Classify, generate and execute a single transcript
pub struct CommandPipeline<S> {
    service: ResilientCompletion<S>,
    executor: ActionExecutor,
    config: PipelineConfig,
}

impl<S: CompletionService> CommandPipeline<S> {
    pub fn new(service: S, config: PipelineConfig) -> Self {
        Self {
            service: ResilientCompletion::new(service, RetryPolicy::from_config(&config)),
            executor: ActionExecutor::new(&config),
            config,
        }
    }

    pub fn service(&self) -> &ResilientCompletion<S> {
        &self.service
    }

    pub fn executor(&self) -> &ActionExecutor {
        &self.executor
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run `transcript` end to end against `host`
    ///
    /// Never fails: every error along the way ends up as a reported action.
    pub async fn process(
        &mut self,
        transcript: &str,
        host: &mut HostSurfaces<'_>,
        voice_session_live: bool,
    ) -> CommandReport {
        tracing::info!(transcript, "Processing command");

        let context = EditorContext::capture(host.buffer.as_deref(), &self.config);
        let intent = classify(&self.service, transcript, &context, &self.config).await;
        let action = generate_action(&self.service, intent.kind, transcript, &context, &self.config).await;
        let result = self.executor.execute(&action, host, voice_session_live);

        CommandReport {
            transcript: transcript.to_string(),
            intent,
            action,
            result,
        }
    }

    /// Remove search highlights; called when a session ends
    pub fn shutdown(&mut self, host: &mut HostSurfaces<'_>) {
        self.executor
            .clear_search(host.buffer.as_deref_mut().map(|b| b as &mut dyn EditorBuffer));
    }
}

/// Gate plus pipeline driven by a stream of transcripts
pub struct VoiceSession<S, W> {
    gate: TranscriptGate,
    pipeline: CommandPipeline<S>,
    workspace: W,
    listening: bool,
}

impl<S: CompletionService, W: Workspace> VoiceSession<S, W> {
    pub fn new(service: S, workspace: W, config: PipelineConfig) -> Self {
        Self {
            gate: TranscriptGate::new(config.debounce()),
            pipeline: CommandPipeline::new(service, config),
            workspace,
            listening: false,
        }
    }

    /// Mark the microphone as live; spoken feedback is suppressed while it is
    pub fn set_listening(&mut self, listening: bool) {
        self.listening = listening;
    }

    pub fn is_busy(&self) -> bool {
        self.gate.is_in_flight()
    }

    pub fn gate(&self) -> &TranscriptGate {
        &self.gate
    }

    pub fn pipeline(&self) -> &CommandPipeline<S> {
        &self.pipeline
    }

    pub fn workspace(&self) -> &W {
        &self.workspace
    }

    pub fn workspace_mut(&mut self) -> &mut W {
        &mut self.workspace
    }

    pub fn into_workspace(self) -> W {
        self.workspace
    }

    /// Consume transcripts until the channel closes
    ///
    /// A transcript still pending when the channel closes is dispatched once
    /// its quiet window has passed. Returns the report of every command run.
    pub async fn run(&mut self, mut transcripts: mpsc::Receiver<String>) -> Vec<CommandReport> {
        let Self {
            gate,
            pipeline,
            workspace,
            listening,
        } = self;
        let mut reports = Vec::new();
        let mut open = true;

        loop {
            let deadline = gate.deadline();
            if !open && deadline.is_none() {
                break;
            }

            tokio::select! {
                received = transcripts.recv(), if open => match received {
                    Some(text) => {
                        let decision = gate.offer(&text, Instant::now());
                        tracing::debug!(transcript = %text, ?decision, "Transcript offered");
                    }
                    None => open = false,
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    let Some(transcript) = gate.take_due(Instant::now()) else {
                        continue;
                    };

                    gate.begin();
                    let mut host = workspace.surfaces();
                    let work = pipeline.process(&transcript.text, &mut host, *listening);
                    tokio::pin!(work);

                    // Keep draining the channel so arrivals are dropped, not queued
                    let report = loop {
                        tokio::select! {
                            report = &mut work => break report,
                            received = transcripts.recv(), if open => match received {
                                Some(text) => {
                                    gate.offer(&text, Instant::now());
                                }
                                None => open = false,
                            },
                        }
                    };
                    gate.finish();
                    reports.push(report);
                }
            }
        }

        pipeline.shutdown(&mut workspace.surfaces());
        tracing::info!(
            commands = reports.len(),
            dropped = gate.dropped(),
            "Voice session ended"
        );
        reports
    }
}
