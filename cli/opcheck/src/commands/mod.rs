//! CLI commands.

mod delete;
mod get;
mod present;
mod verify;
mod wait;

use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use opcheck_reconcile::PollConfig;
use opcheck_store::ApiServerStore;
use tokio::sync::watch;
use tracing::info;

use crate::config::Config;
use crate::error::CliError;
use crate::output::OutputFormat;

/// opcheck - verify operator-managed resources exist and converge.
#[derive(Debug, Parser)]
#[command(name = "opcheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format (text or json).
    #[arg(long, global = true, default_value = "text")]
    format: String,

    /// API server URL (overrides OPCHECK_API_URL).
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Skip TLS certificate verification.
    #[arg(long, global = true)]
    insecure: bool,

    /// Log level (overrides OPCHECK_LOG_LEVEL; RUST_LOG wins over both).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Ensure a resource exists and wait for its workload to converge.
    Verify(verify::VerifyCommand),

    /// Show the live resource for a manifest.
    Get(get::GetCommand),

    /// Delete the resource described by a manifest.
    Delete(delete::DeleteCommand),

    /// Wait for a Deployment to reach a ready replica count.
    Wait(wait::WaitCommand),

    /// Check that named objects of one type exist.
    Present(present::PresentCommand),

    /// Show CLI version.
    Version,
}

impl Cli {
    /// Log level from the flag, then the environment.
    pub fn log_level(&self) -> String {
        self.log_level
            .clone()
            .or_else(|| std::env::var("OPCHECK_LOG_LEVEL").ok())
            .unwrap_or_else(|| "info".to_string())
    }

    pub fn log_json(&self) -> bool {
        self.log_json
    }

    /// Run the CLI command.
    pub async fn run(self) -> Result<()> {
        if let Commands::Version = self.command {
            println!("opcheck {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }

        let mut config = Config::from_env()?;
        if let Some(api_url) = self.api_url {
            config.api_url = api_url;
        }
        if self.insecure {
            config.insecure_tls = true;
        }

        let ctx = CommandContext {
            config,
            format: OutputFormat::parse(&self.format),
        };

        match self.command {
            Commands::Verify(cmd) => cmd.run(ctx).await,
            Commands::Get(cmd) => cmd.run(ctx).await,
            Commands::Delete(cmd) => cmd.run(ctx).await,
            Commands::Wait(cmd) => cmd.run(ctx).await,
            Commands::Present(cmd) => cmd.run(ctx).await,
            Commands::Version => Ok(()),
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    pub config: Config,
    pub format: OutputFormat,
}

impl CommandContext {
    /// Get a store client for the configured API server.
    pub fn store(&self) -> Result<ApiServerStore, CliError> {
        Ok(ApiServerStore::new(&self.config.store_config())?)
    }

    /// Poll timing from config, with per-command overrides in seconds.
    pub fn poll_config(
        &self,
        interval_secs: Option<u64>,
        deadline_secs: Option<u64>,
        max_failures: Option<u32>,
    ) -> PollConfig {
        let defaults = &self.config.poll;
        PollConfig {
            interval: interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.interval),
            deadline: deadline_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.deadline),
            max_consecutive_failures: max_failures.unwrap_or(defaults.max_consecutive_failures),
        }
    }
}

/// Channel that flips to `true` on Ctrl+C.
///
/// Waits stop early but still report what they observed.
fn interrupt_channel() -> watch::Receiver<bool> {
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received interrupt, cancelling");
            let _ = cancel_tx.send(true);
        }
    });
    cancel_rx
}
