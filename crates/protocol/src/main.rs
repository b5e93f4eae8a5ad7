//! Colend CLI - Main entry point

use colend_events::{EventReader, EventSink, EventStore, MemorySink};
use colend_oracle::{MockOracle, PriceOracle};
use colend_protocol::commands::{self, Script};
use colend_protocol::{LendingProtocol, ProtocolConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "colend")]
#[command(about = "Colend - collateralized lending core", long_about = None)]
struct Cli {
    /// JSON config file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a JSON script against a fresh in-memory market
    Run {
        /// Script file path
        script: PathBuf,
        /// Write events as JSONL to this directory (overrides config)
        #[arg(long)]
        events: Option<PathBuf>,
        /// Continue after a failing step
        #[arg(long)]
        keep_going: bool,
    },

    /// Print a JSONL event log
    Events {
        /// Event directory
        dir: PathBuf,
        /// Verify the hash chain while reading
        #[arg(long)]
        verify: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ProtocolConfig::from_file(path)?,
        None => ProtocolConfig::default(),
    };

    match cli.command {
        Commands::Run {
            script,
            events,
            keep_going,
        } => {
            let script = Script::from_file(&script)?;

            let sink: Box<dyn EventSink> = match events.or_else(|| config.event_dir.clone()) {
                Some(dir) => {
                    // State is not replayed, so an existing log would not match it
                    if EventReader::from_directory(&dir)?.file_count() > 0 {
                        anyhow::bail!("event directory {} already holds a log", dir.display());
                    }
                    Box::new(EventStore::new(&dir)?)
                }
                None => Box::new(MemorySink::new()),
            };

            let oracle = Arc::new(MockOracle::new());
            let feed: Arc<dyn PriceOracle> = oracle.clone();
            let mut protocol = LendingProtocol::new(script.admin.clone(), feed, sink, config);

            let summary = commands::run_script(&mut protocol, &oracle, &script, keep_going).await?;
            if summary.failed > 0 {
                anyhow::bail!("{} of {} steps failed", summary.failed, script.steps.len());
            }
        }

        Commands::Events { dir, verify } => {
            commands::events(&dir, verify)?;
        }
    }

    Ok(())
}
