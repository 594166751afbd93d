//! Verify command (ensure resource, wait for workload).

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use opcheck_reconcile::ObservationTarget;
use opcheck_verify::{DeploymentReader, OperatorCheck};

use crate::error::CliError;
use crate::manifest::Manifest;
use crate::output::print_verification;

use super::{interrupt_channel, CommandContext};

/// Verify command - ensure a custom resource exists and its Deployment
/// reaches the expected ready replica count.
#[derive(Debug, Args)]
pub struct VerifyCommand {
    /// Manifest of the custom resource (JSON or TOML).
    #[arg(long, short = 'f')]
    manifest: PathBuf,

    /// Plural resource name used in API paths (defaults to lowercased kind + "s").
    #[arg(long)]
    plural: Option<String>,

    /// Deployment to observe (defaults to the resource name).
    #[arg(long)]
    workload: Option<String>,

    /// Namespace of the Deployment (defaults to the resource namespace).
    #[arg(long)]
    workload_namespace: Option<String>,

    /// Ready replicas to wait for.
    #[arg(long, default_value_t = 1)]
    replicas: u32,

    /// Seconds between readiness samples.
    #[arg(long)]
    interval: Option<u64>,

    /// Total seconds to wait for convergence.
    #[arg(long)]
    deadline: Option<u64>,

    /// Consecutive failed reads tolerated while waiting.
    #[arg(long)]
    max_failures: Option<u32>,
}

impl VerifyCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let manifest = Manifest::load(&self.manifest)?;
        let desired = manifest.desired_resource(self.plural.as_deref())?;

        let target = ObservationTarget::new(
            self.workload_namespace
                .unwrap_or_else(|| desired.namespace().to_string()),
            self.workload.unwrap_or_else(|| desired.name().to_string()),
            self.replicas,
        );
        let poll = ctx.poll_config(self.interval, self.deadline, self.max_failures);

        let store = ctx.store()?;
        let check = OperatorCheck::new(store.clone(), DeploymentReader::new(store), poll)
            .map_err(CliError::from)?
            .with_cancellation(interrupt_channel());

        let report = check.run(&desired, &target).await.map_err(CliError::from)?;
        print_verification(&report, ctx.format);

        if !report.is_success() {
            return Err(CliError::NotConverged(format!(
                "{} did not converge ({})",
                report.poll.target,
                report.poll.outcome.as_str()
            ))
            .into());
        }

        Ok(())
    }
}
