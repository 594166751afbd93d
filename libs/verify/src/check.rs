//! Ensure-then-converge operator check.

use std::fmt;

use opcheck_reconcile::{ConvergencePoller, ObservationTarget, PollConfig, PollReport};
use opcheck_store::ObjectStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::watch;
use tracing::info;

use crate::ensure::{EnsureOutcome, ResourceEnsurer};
use crate::error::VerifyError;
use crate::resource::DesiredResource;
use crate::workload::{wait_for_workload, WorkloadReader};

/// Result of one operator check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    /// Identity of the ensured resource.
    pub resource: String,

    /// Whether the resource had to be created.
    pub ensured: EnsureOutcome,

    /// How the dependent workload behaved.
    pub poll: PollReport,
}

impl VerificationReport {
    /// Returns true if the workload converged.
    pub fn is_success(&self) -> bool {
        self.poll.outcome.is_converged()
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ensured = match self.ensured {
            EnsureOutcome::Existed => "already present",
            EnsureOutcome::Created => "created",
        };
        write!(f, "{} {}; workload {}", self.resource, ensured, self.poll)
    }
}

/// Ensures a resource, then waits for its workload to converge.
///
/// The workload is observed whether or not the resource had to be created.
pub struct OperatorCheck<St, R> {
    ensurer: ResourceEnsurer<St>,
    reader: R,
    poller: ConvergencePoller,
}

impl<St, R> OperatorCheck<St, R>
where
    St: ObjectStore,
    R: WorkloadReader,
{
    /// Build a check, rejecting unusable poll configurations.
    pub fn new(store: St, reader: R, config: PollConfig) -> Result<Self, VerifyError> {
        Ok(Self {
            ensurer: ResourceEnsurer::new(store),
            reader,
            poller: ConvergencePoller::new(config)?,
        })
    }

    /// Abort the convergence wait when the channel flips to `true`.
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.poller = self.poller.with_cancellation(cancel);
        self
    }

    pub fn ensurer(&self) -> &ResourceEnsurer<St> {
        &self.ensurer
    }

    /// Run the check.
    ///
    /// Store and schema failures while ensuring are returned as errors.
    /// Everything that happens while waiting is part of the report.
    pub async fn run<S>(
        &self,
        desired: &DesiredResource<S>,
        target: &ObservationTarget,
    ) -> Result<VerificationReport, VerifyError>
    where
        S: Serialize + DeserializeOwned + Sync,
    {
        let ensured = self.ensurer.ensure(desired).await?;
        info!(
            resource = %desired,
            existed = ensured.existed(),
            workload = %target,
            desired_replicas = target.desired_count,
            "Waiting for workload to converge"
        );

        let poll = wait_for_workload(&self.poller, &self.reader, target).await;

        Ok(VerificationReport {
            resource: desired.identity(),
            ensured,
            poll,
        })
    }
}
