//! Convergence polling primitives.
//!
//! This library provides a poller that waits for remote state to converge
//! on a target. Key concepts:
//!
//! - **Observation**: A caller-supplied read of current state (for example the
//!   ready replica count of a workload).
//! - **Target**: The count the observation must reach.
//! - **Convergence**: The observed count equals the target count.
//!
//! # Invariants
//!
//! - Every poll takes at least one sample, even for a target of zero
//! - No sample starts after the deadline boundary
//! - A poll owns its loop state; concurrent polls share nothing mutable

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Default interval between samples.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default total poll budget.
pub const DEFAULT_POLL_DEADLINE: Duration = Duration::from_secs(2 * 60);

/// Default number of consecutive failed observations tolerated.
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 3;

/// Reconciliation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// The poll configuration cannot be used.
    #[error("invalid poll configuration: {0}")]
    InvalidConfig(String),
}

/// What "converged" means for a single poll.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObservationTarget {
    /// Namespace of the observed workload.
    pub namespace: String,

    /// Name of the observed workload.
    pub name: String,

    /// Count the observation must reach.
    pub desired_count: u32,
}

impl ObservationTarget {
    /// Create a new observation target.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, desired_count: u32) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            desired_count,
        }
    }
}

impl fmt::Display for ObservationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Sampling configuration for a poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Time between the starts of consecutive samples.
    pub interval: Duration,

    /// Total budget measured from the start of the poll.
    pub deadline: Duration,

    /// Consecutive failed observations tolerated before giving up.
    ///
    /// The poll fails once the failure streak exceeds this value, so `0`
    /// makes the first failed observation fatal.
    pub max_consecutive_failures: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            deadline: DEFAULT_POLL_DEADLINE,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
        }
    }
}

impl PollConfig {
    /// Create a config with the default failure tolerance.
    pub fn new(interval: Duration, deadline: Duration) -> Self {
        Self {
            interval,
            deadline,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
        }
    }

    /// Set the consecutive failure tolerance.
    pub fn with_max_consecutive_failures(mut self, max: u32) -> Self {
        self.max_consecutive_failures = max;
        self
    }

    /// Check that the interval is positive and fits inside the deadline.
    pub fn validate(&self) -> Result<(), ReconcileError> {
        if self.interval.is_zero() {
            return Err(ReconcileError::InvalidConfig(
                "interval must be greater than zero".to_string(),
            ));
        }
        if self.deadline < self.interval {
            return Err(ReconcileError::InvalidConfig(format!(
                "deadline {:?} is shorter than interval {:?}",
                self.deadline, self.interval
            )));
        }
        Ok(())
    }

    /// Upper bound on the number of samples one poll can take.
    pub fn max_samples(&self) -> u64 {
        let ticks = self.deadline.as_nanos() / self.interval.as_nanos().max(1);
        u64::try_from(ticks).unwrap_or(u64::MAX).saturating_add(1)
    }
}

/// Terminal result of a poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The observed count reached the target.
    Converged,

    /// The deadline elapsed before convergence.
    TimedOut,

    /// The caller aborted the poll.
    Cancelled,

    /// Too many consecutive observations failed.
    ObservationError(String),
}

impl PollOutcome {
    /// Returns true if the poll converged.
    pub fn is_converged(&self) -> bool {
        matches!(self, Self::Converged)
    }

    /// Short label for logs and summaries.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Converged => "converged",
            Self::TimedOut => "timed_out",
            Self::Cancelled => "cancelled",
            Self::ObservationError(_) => "observation_error",
        }
    }
}

/// Outcome of a poll plus the context needed to diagnose it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollReport {
    /// What was being observed.
    pub target: ObservationTarget,

    /// How the poll ended.
    pub outcome: PollOutcome,

    /// Number of observations started.
    pub samples: u32,

    /// Most recent successfully observed count.
    pub last_observed: Option<u32>,

    /// Most recent observation failure, if any.
    pub last_error: Option<String>,

    /// Failure streak at the time the poll ended.
    pub consecutive_failures: u32,

    /// Time from the start of the poll to its end.
    pub elapsed: Duration,
}

impl fmt::Display for PollReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let observed = self
            .last_observed
            .map(|c| c.to_string())
            .unwrap_or_else(|| "none".to_string());

        match &self.outcome {
            PollOutcome::Converged => write!(
                f,
                "{} converged at {} after {} samples in {:?}",
                self.target, self.target.desired_count, self.samples, self.elapsed
            ),
            PollOutcome::TimedOut => write!(
                f,
                "{} timed out after {:?}: last observed {}, desired {} ({} samples)",
                self.target, self.elapsed, observed, self.target.desired_count, self.samples
            ),
            PollOutcome::Cancelled => write!(
                f,
                "{} cancelled after {:?}: last observed {}, desired {}",
                self.target, self.elapsed, observed, self.target.desired_count
            ),
            PollOutcome::ObservationError(detail) => write!(
                f,
                "{} observation failed {} times in a row after {:?}: {} (last observed {})",
                self.target, self.consecutive_failures, self.elapsed, detail, observed
            ),
        }
    }
}

/// Polls a remote observation until it converges on a target.
#[derive(Debug, Clone)]
pub struct ConvergencePoller {
    config: PollConfig,
    cancel: Option<watch::Receiver<bool>>,
}

/// Per-poll loop state.
#[derive(Debug, Default)]
struct LoopState {
    samples: u32,
    last_observed: Option<u32>,
    last_error: Option<String>,
    consecutive_failures: u32,
}

impl LoopState {
    fn begin_sample(&mut self) {
        self.samples = self.samples.saturating_add(1);
    }

    fn record_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }
}

enum Step<E> {
    Observed(Result<u32, E>),
    DeadlineReached,
    Cancelled,
}

impl ConvergencePoller {
    /// Create a poller, rejecting unusable configurations.
    pub fn new(config: PollConfig) -> Result<Self, ReconcileError> {
        config.validate()?;
        Ok(Self {
            config,
            cancel: None,
        })
    }

    /// Abort polls when the channel flips to `true`.
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// The poller's configuration.
    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Sample `observe` once per interval until it reports the target count.
    ///
    /// A failed observation is recorded and polling continues until the
    /// failure streak exceeds `max_consecutive_failures`. The wait between
    /// samples and any in-flight observation are abandoned as soon as the
    /// deadline passes or the cancellation channel fires.
    pub async fn poll_until<F, Fut, E>(&self, target: &ObservationTarget, observe: F) -> PollReport
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<u32, E>>,
        E: fmt::Display,
    {
        self.poll_until_with(target, |_: &E| false, observe).await
    }

    /// Like [`poll_until`](Self::poll_until), but failures for which
    /// `is_fatal` returns true end the poll with
    /// [`PollOutcome::ObservationError`] on the spot, regardless of the
    /// failure threshold.
    pub async fn poll_until_with<F, Fut, E, C>(
        &self,
        target: &ObservationTarget,
        is_fatal: C,
        mut observe: F,
    ) -> PollReport
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<u32, E>>,
        E: fmt::Display,
        C: Fn(&E) -> bool,
    {
        let started = Instant::now();
        let deadline_at = started + self.config.deadline;
        let mut cancel = self.cancel.clone();
        let mut state = LoopState::default();
        let mut next_sample = started;

        debug!(
            target = %target,
            desired = target.desired_count,
            interval_ms = self.config.interval.as_millis() as u64,
            deadline_ms = self.config.deadline.as_millis() as u64,
            "Starting convergence poll"
        );

        let outcome = loop {
            tokio::select! {
                biased;
                _ = cancelled(&mut cancel) => break PollOutcome::Cancelled,
                _ = tokio::time::sleep_until(next_sample) => {}
            }

            state.begin_sample();
            let step = tokio::select! {
                biased;
                _ = cancelled(&mut cancel) => Step::Cancelled,
                result = observe() => Step::Observed(result),
                _ = tokio::time::sleep_until(deadline_at) => Step::DeadlineReached,
            };

            match step {
                Step::Cancelled => break PollOutcome::Cancelled,
                Step::DeadlineReached => break PollOutcome::TimedOut,
                Step::Observed(Ok(count)) => {
                    state.consecutive_failures = 0;
                    state.last_observed = Some(count);
                    if count == target.desired_count {
                        break PollOutcome::Converged;
                    }
                    debug!(
                        target = %target,
                        observed = count,
                        desired = target.desired_count,
                        sample = state.samples,
                        "Not converged yet"
                    );
                }
                Step::Observed(Err(e)) => {
                    state.record_failure();
                    let detail = e.to_string();
                    if is_fatal(&e)
                        || state.consecutive_failures > self.config.max_consecutive_failures
                    {
                        break PollOutcome::ObservationError(detail);
                    }
                    warn!(
                        target = %target,
                        error = %detail,
                        consecutive_failures = state.consecutive_failures,
                        sample = state.samples,
                        "Observation failed, will retry"
                    );
                    state.last_error = Some(detail);
                }
            }

            // An observation that overran the interval is followed by an
            // immediate sample rather than a burst of catch-up samples.
            next_sample = (next_sample + self.config.interval).max(Instant::now());
            if next_sample > deadline_at {
                tokio::select! {
                    biased;
                    _ = cancelled(&mut cancel) => break PollOutcome::Cancelled,
                    _ = tokio::time::sleep_until(deadline_at) => break PollOutcome::TimedOut,
                }
            }
        };

        let report = PollReport {
            target: target.clone(),
            samples: state.samples,
            last_observed: state.last_observed,
            last_error: match &outcome {
                PollOutcome::ObservationError(detail) => Some(detail.clone()),
                _ => state.last_error,
            },
            consecutive_failures: state.consecutive_failures,
            elapsed: started.elapsed(),
            outcome,
        };

        match &report.outcome {
            PollOutcome::Converged => info!(
                target = %target,
                samples = report.samples,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "Converged"
            ),
            PollOutcome::ObservationError(detail) => error!(
                target = %target,
                error = %detail,
                consecutive_failures = report.consecutive_failures,
                "Observation failed repeatedly"
            ),
            other => warn!(
                target = %target,
                outcome = other.as_str(),
                last_observed = ?report.last_observed,
                desired = target.desired_count,
                samples = report.samples,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "Poll ended without convergence"
            ),
        }

        report
    }
}

/// Resolves once cancellation is requested; never resolves without a channel
/// or after the sender is gone.
async fn cancelled(cancel: &mut Option<watch::Receiver<bool>>) {
    match cancel {
        Some(rx) => {
            if rx.wait_for(|cancelled| *cancelled).await.is_err() {
                std::future::pending::<()>().await;
            }
        }
        None => std::future::pending::<()>().await,
    }
}
