//! Error handling and display for the CLI.

use colored::Colorize;
use opcheck_store::StoreError;
use opcheck_verify::VerifyError;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    NotConverged(String),

    #[error("{count} {resource} missing: {names}")]
    Missing {
        resource: String,
        count: usize,
        names: String,
    },

    #[error("Invalid manifest {path}: {message}")]
    InvalidManifest { path: String, message: String },

    #[error(transparent)]
    Verify(#[from] VerifyError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), err);

    let store_err = match err.downcast_ref::<CliError>() {
        Some(CliError::Store(e)) => Some(e),
        Some(CliError::Verify(e)) => e.store_error(),
        _ => None,
    };

    if let Some(hint) = store_err.and_then(store_hint) {
        eprintln!("\n{}", hint.yellow());
    }

    if let Some(CliError::Verify(VerifyError::SchemaMismatch { .. })) = err.downcast_ref::<CliError>() {
        eprintln!(
            "\n{}",
            "Hint: The live resource no longer matches the manifest's shape.".yellow()
        );
    }
}

fn store_hint(err: &StoreError) -> Option<&'static str> {
    match err {
        StoreError::Unauthorized(_) => {
            Some("Hint: Set OPCHECK_TOKEN or OPCHECK_TOKEN_FILE to a valid bearer token.")
        }
        StoreError::Forbidden(_) => {
            Some("Hint: The token lacks RBAC permission for this resource.")
        }
        StoreError::Api { status: 404, .. } | StoreError::NotFound { .. } => {
            Some("Hint: Check the resource group, version and --plural name.")
        }
        e if e.is_transient() => {
            Some("Hint: The API server is unreachable or overloaded. Retry, or check OPCHECK_API_URL.")
        }
        StoreError::Transport(_) => {
            Some("Hint: Check OPCHECK_API_URL and your network connection.")
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hints() {
        assert!(store_hint(&StoreError::Forbidden("x".to_string())).is_some());
        assert!(store_hint(&StoreError::Unavailable("x".to_string()))
            .is_some_and(|h| h.contains("Retry")));
        assert!(store_hint(&StoreError::Decode("x".to_string())).is_none());
    }

    #[test]
    fn test_missing_message() {
        let err = CliError::Missing {
            resource: "clusterroles.rbac.authorization.k8s.io".to_string(),
            count: 2,
            names: "a, b".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "2 clusterroles.rbac.authorization.k8s.io missing: a, b"
        );
    }
}
