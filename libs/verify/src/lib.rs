//! Verification of operator-managed resources.
//!
//! An operator check has two steps:
//!
//! 1. [`ResourceEnsurer`] makes sure the desired custom resource exists,
//!    creating it at most once.
//! 2. A [`ConvergencePoller`](opcheck_reconcile::ConvergencePoller) waits for
//!    the workload the operator builds from that resource to reach its
//!    target replica count.
//!
//! [`OperatorCheck`] runs both and returns a [`VerificationReport`] that any
//! test runner can assert on. [`wait_for_workload`] runs the second step on
//! its own, for workloads no custom resource is involved in (such as the
//! operator's own Deployment).

mod check;
mod ensure;
mod error;
mod presence;
mod resource;
mod workload;

pub use check::{OperatorCheck, VerificationReport};
pub use ensure::{EnsureOutcome, ResourceEnsurer};
pub use error::VerifyError;
pub use presence::{check_present, PresenceReport};
pub use resource::{DesiredResource, ObjectMeta};
pub use workload::{wait_for_workload, DeploymentReader, WorkloadReader};

pub use opcheck_reconcile::{
    ConvergencePoller, ObservationTarget, PollConfig, PollOutcome, PollReport,
};
pub use opcheck_store::{ApiResource, DynamicObject, ObjectStore, StoreError};
