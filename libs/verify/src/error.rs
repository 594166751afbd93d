//! Verification errors.

use opcheck_reconcile::ReconcileError;
use opcheck_store::StoreError;
use thiserror::Error;

/// Errors raised while ensuring or observing resources.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The desired resource is incomplete.
    #[error("invalid resource: {0}")]
    InvalidResource(String),

    /// An object's shape does not match its typed representation.
    #[error("schema mismatch for {identity}: {detail}")]
    SchemaMismatch { identity: String, detail: String },

    /// A remote store call for `identity` failed.
    #[error("{identity}: {source}")]
    Store {
        identity: String,
        #[source]
        source: StoreError,
    },

    /// The poll configuration is unusable.
    #[error(transparent)]
    InvalidPollConfig(#[from] ReconcileError),
}

impl VerifyError {
    pub(crate) fn schema_mismatch(identity: impl Into<String>, detail: impl ToString) -> Self {
        Self::SchemaMismatch {
            identity: identity.into(),
            detail: detail.to_string(),
        }
    }

    pub(crate) fn store(identity: impl Into<String>, source: StoreError) -> Self {
        Self::Store {
            identity: identity.into(),
            source,
        }
    }

    /// The underlying store failure, if any.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            Self::Store { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Returns true for errors that retrying cannot fix.
    ///
    /// A schema mismatch or an invalid resource ends a convergence wait at
    /// once; store failures are left to the poller's failure threshold.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::SchemaMismatch { .. } | Self::InvalidResource(_) | Self::InvalidPollConfig(_)
        )
    }
}
