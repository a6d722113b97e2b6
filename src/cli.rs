//! Command-line interface

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::Config;
use crate::core::PacketRecord;
use crate::ml::ModelArtifact;
use crate::signatures::registry;
use crate::Daemon;

#[derive(Parser)]
#[command(
    name = "netsentry",
    version,
    about = "Signature and classifier based network intrusion detection"
)]
pub struct Cli {
    /// Path to config file (default: /etc/netsentry/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Force debug-level logging, overriding config and RUST_LOG
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run detection over a packet trace (one JSON record per line)
    Run {
        /// Packet trace to replay
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Validate the configuration and print the effective values
    CheckConfig,
    /// List the loaded attack signatures
    Signatures,
    /// Inspect the classifier artifact
    ModelInfo,
}

pub async fn run_command(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Run { input } => run_replay(&input, &config).await,
        Commands::CheckConfig => check_config(&config),
        Commands::Signatures => list_signatures(&config),
        Commands::ModelInfo => model_info(&config),
    }
}

async fn run_replay(input: &Path, config: &Config) -> Result<()> {
    let content = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read packet trace: {}", input.display()))?;

    let daemon = Daemon::new(config)?;
    let (tx, rx) = mpsc::channel(config.sink.queue_size);
    let run = tokio::spawn(daemon.run(rx));

    let mut sent = 0usize;
    let mut malformed = 0usize;
    for (lineno, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<PacketRecord>(line) {
            Ok(packet) => {
                tx.send(packet).await.context("detection loop exited early")?;
                sent += 1;
            }
            Err(e) => {
                malformed += 1;
                warn!("Skipping malformed packet on line {}: {}", lineno + 1, e);
            }
        }
    }
    drop(tx);

    run.await.context("detection loop panicked")??;
    info!(sent, malformed, "replay finished");
    Ok(())
}

fn check_config(config: &Config) -> Result<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

fn list_signatures(config: &Config) -> Result<()> {
    let set = registry::default_signatures(&config.signatures);
    println!("{:<20} {:<10} {:<10} kind", "name", "protocol", "dst_port");
    for rule in set.rules() {
        let port = rule
            .dst_port
            .map(|p| p.to_string())
            .unwrap_or_else(|| "any".to_string());
        println!(
            "{:<20} {:<10} {:<10} {}",
            rule.name,
            rule.protocol.to_string(),
            port,
            rule.kind.describe()
        );
    }
    Ok(())
}

fn model_info(config: &Config) -> Result<()> {
    let artifact = ModelArtifact::load(&config.detection.model_path)?;
    println!("path:        {}", config.detection.model_path.display());
    println!("input width: {}", artifact.input_width);
    println!("bias:        {}", artifact.bias);
    if let Some(label) = &artifact.label {
        println!("label:       {}", label);
    }
    if let Some(trained_at) = &artifact.trained_at {
        println!("trained at:  {}", trained_at);
    }
    println!("threshold:   {}", config.detection.decision_threshold);
    Ok(())
}
