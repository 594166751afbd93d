//! Configuration loaded from the environment.
//!
//! Handles:
//! - API server endpoint and credentials
//! - Default poll timing

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use opcheck_reconcile::{PollConfig, DEFAULT_MAX_CONSECUTIVE_FAILURES};
use opcheck_store::ApiServerConfig;

/// Service account token mounted into pods.
const IN_CLUSTER_TOKEN_FILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// CLI configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// API server URL.
    pub api_url: String,

    /// Bearer token.
    pub token: Option<String>,

    /// Skip TLS certificate verification.
    pub insecure_tls: bool,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Default poll timing.
    pub poll: PollConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_url = match lookup("OPCHECK_API_URL") {
            Some(url) => url,
            None => match (
                lookup("KUBERNETES_SERVICE_HOST"),
                lookup("KUBERNETES_SERVICE_PORT"),
            ) {
                (Some(host), Some(port)) => format!("https://{host}:{port}"),
                _ => "https://127.0.0.1:6443".to_string(),
            },
        };

        let token = match (lookup("OPCHECK_TOKEN"), lookup("OPCHECK_TOKEN_FILE")) {
            (Some(token), _) => Some(token),
            (None, Some(path)) => Some(read_token(Path::new(&path))?),
            (None, None) if Path::new(IN_CLUSTER_TOKEN_FILE).exists() => {
                Some(read_token(Path::new(IN_CLUSTER_TOKEN_FILE))?)
            }
            (None, None) => None,
        };

        let insecure_tls = lookup("OPCHECK_INSECURE_TLS")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false);

        let request_timeout_secs = parse_var(&lookup, "OPCHECK_REQUEST_TIMEOUT_SECS", 30)?;

        let defaults = PollConfig::default();
        let poll = PollConfig {
            interval: Duration::from_secs(parse_var(
                &lookup,
                "OPCHECK_POLL_INTERVAL_SECS",
                defaults.interval.as_secs(),
            )?),
            deadline: Duration::from_secs(parse_var(
                &lookup,
                "OPCHECK_POLL_DEADLINE_SECS",
                defaults.deadline.as_secs(),
            )?),
            max_consecutive_failures: parse_var(
                &lookup,
                "OPCHECK_MAX_FAILURES",
                DEFAULT_MAX_CONSECUTIVE_FAILURES,
            )?,
        };

        Ok(Self {
            api_url,
            token,
            insecure_tls,
            request_timeout_secs,
            poll,
        })
    }

    /// Connection settings for the API server store.
    pub fn store_config(&self) -> ApiServerConfig {
        ApiServerConfig {
            api_url: self.api_url.clone(),
            token: self.token.clone(),
            accept_invalid_certs: self.insecure_tls,
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

fn read_token(path: &Path) -> Result<String> {
    let token = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read token from {}", path.display()))?;
    Ok(token.trim().to_string())
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}
