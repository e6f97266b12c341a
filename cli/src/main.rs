//! CLI entrypoint for atelier
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod commands;
mod script;

use anyhow::{Context, Result, anyhow};
use atelier_application::{
    BargainingSession, BargainingSessionBuilder, ConversationLogger, NoConversationLogger,
    NoTranscriptSink, TranscriptSink, TurnScheduler,
};
use atelier_domain::{PersonaBook, PersonaState};
use atelier_infrastructure::{
    ConfigLoader, FileConfig, InMemoryMarket, JsonlConversationLogger, JsonlTranscriptSink,
};
use clap::Parser;
use commands::{Cli, Command};
use script::BargainScript;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Persona key of the seller in dry runs.
const SELLER: &str = "seller";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).map_err(|e| anyhow!("invalid configuration: {e}"))?
    };

    let log_dir = cli.log_dir.clone().or_else(|| config.logging.log_dir.clone());
    let _guard = init_tracing(cli.verbose, log_dir.as_deref());

    for issue in config.validate() {
        warn!("{}", issue.message);
    }

    match &cli.command {
        Command::Config => show_config(&cli, &config),
        Command::Bargain { script } => run_bargain(&config, script).await,
    }
}

fn init_tracing(verbose: u8, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Initialize logging based on verbosity level
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };

    let stderr = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(level));

    let Some(dir) = log_dir else {
        tracing_subscriber::registry().with(stderr).init();
        return None;
    };

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(
        dir,
        "atelier.log",
    ));
    let file = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(EnvFilter::new(level));
    tracing_subscriber::registry().with(stderr).with(file).init();
    Some(guard)
}

fn show_config(cli: &Cli, config: &FileConfig) -> Result<()> {
    println!("Configuration sources (in priority order):");
    for line in ConfigLoader::describe_sources(cli.config.as_ref()) {
        println!("{}", line);
    }
    println!();
    println!(
        "{}",
        toml::to_string_pretty(config).context("rendering configuration")?
    );
    Ok(())
}

async fn run_bargain(config: &FileConfig, script_path: &Path) -> Result<()> {
    let script = BargainScript::load(script_path)?;
    info!(
        "Replaying {} buyer messages from {}",
        script.messages.len(),
        script_path.display()
    );

    let conversation_logger: Arc<dyn ConversationLogger> = match &config.logging.conversation_log {
        Some(path) => Arc::new(
            JsonlConversationLogger::new(path)
                .with_context(|| format!("opening conversation log {}", path.display()))?,
        ),
        None => Arc::new(NoConversationLogger),
    };
    let transcript_sink: Arc<dyn TranscriptSink> = match &config.logging.transcript_log {
        Some(path) => Arc::new(
            JsonlTranscriptSink::new(path)
                .with_context(|| format!("opening transcript log {}", path.display()))?,
        ),
        None => Arc::new(NoTranscriptSink),
    };

    // === Dependency Injection ===
    let market = Arc::new(InMemoryMarket::new(script.market.clone()));
    let mut personas = PersonaBook::new();
    if let Some(mood) = script.seller_mood {
        personas.insert(SELLER, PersonaState::default().with_mood(mood));
    }
    let topology = BargainingSessionBuilder::new(market.ports(), config.bargaining_params())
        .with_personas(personas, SELLER)
        .build()?;

    let scheduler = TurnScheduler::new(Arc::new(script.reasoner()))
        .with_params(config.scheduler_params())
        .with_conversation_logger(conversation_logger.clone());
    let mut session =
        BargainingSession::new(scheduler, topology).with_conversation_logger(conversation_logger);

    let mut replies = Vec::new();
    let mut transcript = Vec::new();
    for message in &script.messages {
        if let Some(deposit) = &message.deposit {
            market.deposit(&deposit.address, deposit.amount)?;
        }
        let reply = session.respond(message.text.clone()).await?;
        replies.push(json!({
            "buyer": message.text,
            "reply": reply.content,
            "speaker": reply.speaker.as_ref().map(|s| s.as_str()),
            "termination": reply.termination.as_ref().map(|t| t.as_str()),
        }));
        for entry in &reply.entries {
            transcript_sink.append(entry)?;
        }
        transcript.extend(reply.entries);
    }

    let report = json!({
        "replies": replies,
        "transcript": transcript,
        "context": session.context().to_json(),
        "deal_closed": session.deal_closed(),
        "transfers": market.transfers(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
