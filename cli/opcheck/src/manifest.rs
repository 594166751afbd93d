//! Manifest loading.
//!
//! A manifest is a single custom resource in JSON or TOML. The file
//! extension picks the format; anything other than `.toml` is read as JSON.

use std::path::Path;

use anyhow::{Context, Result};
use opcheck_store::{ApiResource, DynamicObject};
use opcheck_verify::DesiredResource;
use serde_json::Value;

use crate::error::CliError;

/// A parsed manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    source: String,
    object: DynamicObject,
}

impl Manifest {
    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;
        let is_toml = path.extension().and_then(|e| e.to_str()) == Some("toml");
        Self::parse(&path.display().to_string(), &contents, is_toml)
    }

    /// Parse manifest contents.
    pub fn parse(source: &str, contents: &str, is_toml: bool) -> Result<Self> {
        let value: Value = if is_toml {
            toml::from_str(contents).map_err(|e| invalid(source, e))?
        } else {
            serde_json::from_str(contents).map_err(|e| invalid(source, e))?
        };
        let object = DynamicObject::from_value(value).map_err(|e| invalid(source, e))?;

        for (field, present) in [
            ("apiVersion", object.api_version().is_some()),
            ("kind", object.kind().is_some()),
            ("metadata.name", object.name().is_some()),
            ("metadata.namespace", object.namespace().is_some()),
            ("spec", object.pointer(&["spec"]).is_some()),
        ] {
            if !present {
                return Err(invalid(source, format!("missing {field}")).into());
            }
        }

        Ok(Self {
            source: source.to_string(),
            object,
        })
    }

    /// Resource type of the manifest's object.
    pub fn api_resource(&self, plural: Option<&str>) -> ApiResource {
        ApiResource::from_api_version(
            self.object.api_version().unwrap_or_default(),
            self.object.kind().unwrap_or_default(),
            plural,
            true,
        )
    }

    /// The manifest as a desired resource with an untyped spec.
    pub fn desired_resource(&self, plural: Option<&str>) -> Result<DesiredResource<Value>, CliError> {
        DesiredResource::from_object(&self.api_resource(plural), &self.object)
            .map_err(|e| invalid(&self.source, e))
    }
}

fn invalid(source: &str, err: impl ToString) -> CliError {
    CliError::InvalidManifest {
        path: source.to_string(),
        message: err.to_string(),
    }
}
