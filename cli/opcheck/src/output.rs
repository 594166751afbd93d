//! Output formatting for CLI commands.

use colored::Colorize;
use opcheck_reconcile::{PollOutcome, PollReport};
use opcheck_verify::{PresenceReport, VerificationReport};
use serde::Serialize;

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// JSON format.
    Json,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Self {
        match value {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Machine-readable form of a [`PollReport`].
#[derive(Debug, Serialize)]
pub struct PollSummary {
    pub workload: String,
    pub desired_replicas: u32,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub samples: u32,
    pub last_observed: Option<u32>,
    pub elapsed_ms: u64,
}

impl From<&PollReport> for PollSummary {
    fn from(poll: &PollReport) -> Self {
        let detail = match &poll.outcome {
            PollOutcome::ObservationError(detail) => Some(detail.clone()),
            _ => poll.last_error.clone(),
        };
        Self {
            workload: poll.target.to_string(),
            desired_replicas: poll.target.desired_count,
            outcome: poll.outcome.as_str(),
            detail,
            samples: poll.samples,
            last_observed: poll.last_observed,
            elapsed_ms: u64::try_from(poll.elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Machine-readable form of a [`VerificationReport`].
#[derive(Debug, Serialize)]
pub struct VerificationSummary {
    pub resource: String,
    pub created: bool,
    #[serde(flatten)]
    pub poll: PollSummary,
}

impl From<&VerificationReport> for VerificationSummary {
    fn from(report: &VerificationReport) -> Self {
        Self {
            resource: report.resource.clone(),
            created: !report.ensured.existed(),
            poll: PollSummary::from(&report.poll),
        }
    }
}

/// Print the result of a verification.
pub fn print_verification(report: &VerificationReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&VerificationSummary::from(report)),
        OutputFormat::Text => {
            if report.is_success() {
                print_success(&report.to_string());
            } else {
                print_failure(&report.to_string());
            }
        }
    }
}

/// Print the result of a standalone workload wait.
pub fn print_poll(report: &PollReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&PollSummary::from(report)),
        OutputFormat::Text if report.outcome.is_converged() => print_success(&report.to_string()),
        OutputFormat::Text => print_failure(&report.to_string()),
    }
}

/// Print the result of a presence check.
pub fn print_presence(report: &PresenceReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "resource": report.resource.to_string(),
            "present": report.present,
            "missing": report.missing,
        })),
        OutputFormat::Text => {
            for name in &report.present {
                println!("{} {} {}", "present".green(), report.resource, name);
            }
            for name in &report.missing {
                println!("{} {} {}", "missing".red(), report.resource, name);
            }
        }
    }
}

/// Print a value as pretty JSON.
pub fn print_json<T: Serialize>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("{} failed to render JSON: {}", "Error:".red().bold(), e),
    }
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", "Success:".green().bold(), message);
}

/// Print an info message.
pub fn print_info(message: &str) {
    println!("{} {}", "Info:".blue().bold(), message);
}

/// Print a failure message.
pub fn print_failure(message: &str) {
    println!("{} {}", "Failed:".red().bold(), message);
}
