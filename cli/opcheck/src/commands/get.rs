//! Get command (show the live resource).

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use opcheck_store::ObjectStore;

use crate::error::CliError;
use crate::manifest::Manifest;
use crate::output::{print_info, print_json, OutputFormat};

use super::CommandContext;

/// Get command - print the live object and whether its spec matches.
#[derive(Debug, Args)]
pub struct GetCommand {
    /// Manifest of the custom resource (JSON or TOML).
    #[arg(long, short = 'f')]
    manifest: PathBuf,

    /// Plural resource name used in API paths.
    #[arg(long)]
    plural: Option<String>,
}

impl GetCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let manifest = Manifest::load(&self.manifest)?;
        let desired = manifest.desired_resource(self.plural.as_deref())?;

        let live = ctx
            .store()?
            .get(desired.resource(), Some(desired.namespace()), desired.name())
            .await
            .map_err(CliError::from)?;
        print_json(&live);

        if ctx.format == OutputFormat::Text {
            if live.pointer(&["spec"]) == Some(desired.spec()) {
                print_info("spec matches the manifest");
            } else {
                print_info("spec differs from the manifest");
            }
        }

        Ok(())
    }
}
