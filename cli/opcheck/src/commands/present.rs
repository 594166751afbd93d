//! Present command (check supporting objects exist).

use anyhow::Result;
use clap::Args;
use opcheck_store::ApiResource;
use opcheck_verify::check_present;

use crate::error::CliError;
use crate::output::print_presence;

use super::CommandContext;

/// Present command - check that named objects of one type exist.
///
/// ```text
/// opcheck present --api-version rbac.authorization.k8s.io/v1 \
///     --kind ClusterRole ocm-agent-operator ocm-agent
/// ```
#[derive(Debug, Args)]
pub struct PresentCommand {
    /// API version of the objects.
    #[arg(long)]
    api_version: String,

    /// Kind of the objects.
    #[arg(long)]
    kind: String,

    /// Plural resource name (defaults to lowercased kind + "s").
    #[arg(long)]
    plural: Option<String>,

    /// Namespace of the objects; omit for cluster-scoped kinds.
    #[arg(long, short = 'n')]
    namespace: Option<String>,

    /// Object names.
    #[arg(required = true)]
    names: Vec<String>,
}

impl PresentCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let resource = ApiResource::from_api_version(
            &self.api_version,
            &self.kind,
            self.plural.as_deref(),
            self.namespace.is_some(),
        );
        let store = ctx.store()?;

        let report = check_present(&store, &resource, self.namespace.as_deref(), &self.names)
            .await
            .map_err(CliError::from)?;
        print_presence(&report, ctx.format);

        if !report.all_present() {
            return Err(CliError::Missing {
                resource: resource.to_string(),
                count: report.missing.len(),
                names: report.missing.join(", "),
            }
            .into());
        }

        Ok(())
    }
}
