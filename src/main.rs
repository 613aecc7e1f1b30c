//! Vox - Entry Point
//!
//! Reads transcripts from stdin, one per line, and runs them through the
//! voice session against a file on disk. Piping partial transcripts in quick
//! succession exercises the debounce just like a speech recognizer would.

use clap::Parser;
use std::io::BufRead;
use std::path::PathBuf;
use tokio::sync::mpsc;
use vox_command::core::config::PipelineConfig;
use vox_command::core::error::Result;
use vox_command::host::workspace::FileWorkspace;
use vox_command::llm::client::LlmClient;
use vox_command::llm::resilience::CompletionService;
use vox_command::llm::scripted::ScriptedService;
use vox_command::pipeline::{CommandReport, VoiceSession};

/// Voice command pipeline for a text editor
#[derive(Parser, Debug)]
#[command(name = "vox")]
#[command(about = "Turn spoken editor commands into edits, navigation and terminal actions")]
struct Args {
    /// File to load into the editor buffer
    #[arg(long)]
    file: Option<PathBuf>,

    /// Pipeline settings file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Project root for the file explorer and terminal (defaults to the current directory)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Treat the microphone as live, which silences spoken feedback
    #[arg(long)]
    listening: bool,

    /// Write the buffer back to its file on exit
    #[arg(long)]
    write: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing for logging; RUST_LOG overrides the default filter
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("vox_command=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    config.validate()?;

    let workspace = FileWorkspace::open(args.file.clone(), args.root.clone(), config.status_ttl())?;

    // Everything runs on one thread; commands never overlap
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let mut workspace = match LlmClient::from_env() {
        Ok(client) => {
            tracing::info!(format = ?client.api_format(), "Using completion service");
            rt.block_on(run_session(client, workspace, config, args.listening))
        }
        Err(e) => {
            tracing::warn!(error = %e, "No completion service configured, running offline");
            rt.block_on(run_session(ScriptedService::offline(), workspace, config, args.listening))
        }
    };

    if args.write {
        match workspace.save()? {
            0 => tracing::info!("Nothing to save"),
            written => tracing::info!(files = written, "Saved edited files"),
        }
    } else {
        for path in workspace.dirty_paths() {
            tracing::warn!(path = %path.display(), "Edits not saved; pass --write to keep them");
        }
    }

    Ok(())
}

async fn run_session<S: CompletionService>(
    service: S,
    workspace: FileWorkspace,
    config: PipelineConfig,
    listening: bool,
) -> FileWorkspace {
    let mut session = VoiceSession::new(service, workspace, config);
    session.set_listening(listening);

    let (tx, rx) = mpsc::channel(32);

    // Blocking stdin reads stay off the runtime thread
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    let reports = session.run(rx).await;
    for report in &reports {
        print_report(report);
    }
    session.into_workspace()
}

fn print_report(report: &CommandReport) {
    println!(
        "\"{}\" -> {} ({:.2}) -> {} -> {:?}: {}",
        report.transcript,
        report.intent.kind.label(),
        report.intent.confidence,
        report.action.kind(),
        report.result.outcome,
        report.result.status
    );
}
