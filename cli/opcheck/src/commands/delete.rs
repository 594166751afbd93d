//! Delete command.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use opcheck_verify::ResourceEnsurer;

use crate::error::CliError;
use crate::manifest::Manifest;
use crate::output::{print_info, print_json, print_success, OutputFormat};

use super::CommandContext;

/// Delete command - remove the resource so the next verify starts fresh.
#[derive(Debug, Args)]
pub struct DeleteCommand {
    /// Manifest of the custom resource (JSON or TOML).
    #[arg(long, short = 'f')]
    manifest: PathBuf,

    /// Plural resource name used in API paths.
    #[arg(long)]
    plural: Option<String>,
}

impl DeleteCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let manifest = Manifest::load(&self.manifest)?;
        let desired = manifest.desired_resource(self.plural.as_deref())?;
        let ensurer = ResourceEnsurer::new(ctx.store()?);

        let deleted = ensurer.delete(&desired).await.map_err(CliError::from)?;

        match ctx.format {
            OutputFormat::Json => print_json(&serde_json::json!({
                "resource": desired.identity(),
                "deleted": deleted,
            })),
            OutputFormat::Text if deleted => {
                print_success(&format!("{} deleted", desired.identity()))
            }
            OutputFormat::Text => print_info(&format!("{} was already absent", desired.identity())),
        }

        Ok(())
    }
}
