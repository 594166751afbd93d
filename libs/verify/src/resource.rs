//! Typed desired-state resources and their generic representation.

use std::collections::BTreeMap;
use std::fmt;

use opcheck_store::{ApiResource, DynamicObject};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::VerifyError;

/// Identity metadata of a desired resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub name: String,

    pub namespace: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// A custom resource the caller wants to exist.
///
/// `S` is the typed spec. The descriptor is fixed once built; the ensurer
/// only reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredResource<S> {
    resource: ApiResource,
    metadata: ObjectMeta,
    spec: S,
}

/// On-the-wire shape shared by both conversion directions.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireObject<M, S> {
    api_version: String,
    kind: String,
    metadata: M,
    spec: S,
}

impl<S> DesiredResource<S> {
    /// Describe a namespaced resource. Namespace and name must be non-empty.
    pub fn new(
        resource: ApiResource,
        namespace: impl Into<String>,
        name: impl Into<String>,
        spec: S,
    ) -> Result<Self, VerifyError> {
        let metadata = ObjectMeta {
            name: name.into(),
            namespace: namespace.into(),
            ..ObjectMeta::default()
        };
        Self::from_parts(resource, metadata, spec)
    }

    /// Add labels before the resource is handed to an ensurer.
    pub fn with_labels<I, K, V>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.metadata
            .labels
            .extend(labels.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    fn from_parts(resource: ApiResource, metadata: ObjectMeta, spec: S) -> Result<Self, VerifyError> {
        if !resource.namespaced {
            return Err(VerifyError::InvalidResource(format!(
                "{resource} is cluster-scoped"
            )));
        }
        if metadata.namespace.is_empty() {
            return Err(VerifyError::InvalidResource("namespace is empty".to_string()));
        }
        if metadata.name.is_empty() {
            return Err(VerifyError::InvalidResource("name is empty".to_string()));
        }
        Ok(Self {
            resource,
            metadata,
            spec,
        })
    }

    pub fn resource(&self) -> &ApiResource {
        &self.resource
    }

    pub fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    pub fn spec(&self) -> &S {
        &self.spec
    }

    /// Human-readable identity, e.g. `OcmAgent ops/ocm-agent`.
    pub fn identity(&self) -> String {
        format!("{} {}/{}", self.resource.kind, self.namespace(), self.name())
    }
}

impl<S: Serialize> DesiredResource<S> {
    /// Convert to the store's generic representation.
    pub fn to_object(&self) -> Result<DynamicObject, VerifyError> {
        let wire = WireObject {
            api_version: self.resource.api_version(),
            kind: self.resource.kind.clone(),
            metadata: &self.metadata,
            spec: &self.spec,
        };
        let value =
            serde_json::to_value(&wire).map_err(|e| VerifyError::schema_mismatch(self.identity(), e))?;
        DynamicObject::from_value(value).map_err(|e| VerifyError::schema_mismatch(self.identity(), e))
    }
}

impl<S: DeserializeOwned> DesiredResource<S> {
    /// Convert a stored object back into its typed form.
    ///
    /// Fields the typed form does not model (status, server metadata) are
    /// ignored; a wrong type or a spec that no longer decodes is a
    /// [`VerifyError::SchemaMismatch`].
    pub fn from_object(resource: &ApiResource, object: &DynamicObject) -> Result<Self, VerifyError> {
        let identity = format!(
            "{} {}/{}",
            resource.kind,
            object.namespace().unwrap_or_default(),
            object.name().unwrap_or_default()
        );

        let expected_version = resource.api_version();
        if object.api_version() != Some(expected_version.as_str())
            || object.kind() != Some(resource.kind.as_str())
        {
            return Err(VerifyError::schema_mismatch(
                identity,
                format!(
                    "expected {} {}, found {} {}",
                    expected_version,
                    resource.kind,
                    object.api_version().unwrap_or("<none>"),
                    object.kind().unwrap_or("<none>")
                ),
            ));
        }

        let wire: WireObject<ObjectMeta, S> =
            serde_json::from_value(serde_json::Value::Object(object.as_map().clone()))
                .map_err(|e| VerifyError::schema_mismatch(identity, e))?;

        Self::from_parts(resource.clone(), wire.metadata, wire.spec)
    }
}

impl<S> fmt::Display for DesiredResource<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identity())
    }
}
