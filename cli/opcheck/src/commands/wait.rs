//! Wait command (workload readiness only).

use anyhow::Result;
use clap::Args;
use opcheck_reconcile::{ConvergencePoller, ObservationTarget};
use opcheck_verify::{wait_for_workload, DeploymentReader};

use crate::error::CliError;
use crate::output::print_poll;

use super::{interrupt_channel, CommandContext};

/// Wait command - wait for a Deployment to reach a ready replica count.
///
/// Checks workloads that exist without a custom resource, such as the
/// operator's own Deployment:
///
/// ```text
/// opcheck wait -n openshift-ocm-agent-operator ocm-agent-operator
/// ```
#[derive(Debug, Args)]
pub struct WaitCommand {
    /// Deployment name.
    name: String,

    /// Deployment namespace.
    #[arg(long, short = 'n')]
    namespace: String,

    /// Ready replicas to wait for.
    #[arg(long, default_value_t = 1)]
    replicas: u32,

    /// Seconds between readiness samples.
    #[arg(long)]
    interval: Option<u64>,

    /// Total seconds to wait for readiness.
    #[arg(long)]
    deadline: Option<u64>,

    /// Consecutive failed reads tolerated while waiting.
    #[arg(long)]
    max_failures: Option<u32>,
}

impl WaitCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let target = ObservationTarget::new(self.namespace, self.name, self.replicas);
        let poller = ConvergencePoller::new(ctx.poll_config(
            self.interval,
            self.deadline,
            self.max_failures,
        ))
        .map_err(|e| CliError::Verify(e.into()))?
        .with_cancellation(interrupt_channel());

        let reader = DeploymentReader::new(ctx.store()?);
        let report = wait_for_workload(&poller, &reader, &target).await;
        print_poll(&report, ctx.format);

        if !report.outcome.is_converged() {
            return Err(CliError::NotConverged(format!(
                "{} did not become ready ({})",
                report.target,
                report.outcome.as_str()
            ))
            .into());
        }

        Ok(())
    }
}
