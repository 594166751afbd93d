//! Resource type descriptors.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Identifies a resource type served by the store.
///
/// Carries both the `kind` written into objects and the plural `resource`
/// name used in request paths; the two are not interchangeable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApiResource {
    /// API group; empty for the core group.
    pub group: String,

    /// API version within the group.
    pub version: String,

    /// Object kind (e.g. `Deployment`).
    pub kind: String,

    /// Plural resource name used in paths (e.g. `deployments`).
    pub plural: String,

    /// Whether objects live inside a namespace.
    pub namespaced: bool,
}

impl ApiResource {
    /// Describe a namespaced resource type.
    pub fn namespaced(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
        plural: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
            plural: plural.into(),
            namespaced: true,
        }
    }

    /// Describe a cluster-scoped resource type.
    pub fn cluster_scoped(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
        plural: impl Into<String>,
    ) -> Self {
        Self {
            namespaced: false,
            ..Self::namespaced(group, version, kind, plural)
        }
    }

    /// Derive a descriptor from an `apiVersion` string and kind.
    ///
    /// The plural defaults to the lowercased kind with an `s` suffix.
    pub fn from_api_version(
        api_version: &str,
        kind: &str,
        plural: Option<&str>,
        namespaced: bool,
    ) -> Self {
        let (group, version) = match api_version.split_once('/') {
            Some((group, version)) => (group, version),
            None => ("", api_version),
        };
        let plural = plural
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}s", kind.to_lowercase()));

        Self {
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
            plural,
            namespaced,
        }
    }

    /// `apps/v1 Deployment`.
    pub fn deployment() -> Self {
        Self::namespaced("apps", "v1", "Deployment", "deployments")
    }

    /// `rbac.authorization.k8s.io/v1 ClusterRole`.
    pub fn cluster_role() -> Self {
        Self::cluster_scoped("rbac.authorization.k8s.io", "v1", "ClusterRole", "clusterroles")
    }

    /// `rbac.authorization.k8s.io/v1 ClusterRoleBinding`.
    pub fn cluster_role_binding() -> Self {
        Self::cluster_scoped(
            "rbac.authorization.k8s.io",
            "v1",
            "ClusterRoleBinding",
            "clusterrolebindings",
        )
    }

    /// The `apiVersion` field value for objects of this type.
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// Check that a namespace was given exactly when the type needs one.
    pub fn check_scope(&self, namespace: Option<&str>) -> Result<(), StoreError> {
        match (self.namespaced, namespace) {
            (true, None) | (true, Some("")) => Err(StoreError::InvalidRequest(format!(
                "{} is namespaced but no namespace was given",
                self.plural
            ))),
            (false, Some(ns)) => Err(StoreError::InvalidRequest(format!(
                "{} is cluster-scoped but namespace {ns} was given",
                self.plural
            ))),
            _ => Ok(()),
        }
    }

    /// REST path of the collection, or of one object when `name` is given.
    pub fn path(&self, namespace: Option<&str>, name: Option<&str>) -> Result<String, StoreError> {
        self.check_scope(namespace)?;

        let mut path = if self.group.is_empty() {
            format!("/api/{}", self.version)
        } else {
            format!("/apis/{}/{}", self.group, self.version)
        };
        if let Some(ns) = namespace {
            path.push_str("/namespaces/");
            path.push_str(ns);
        }
        path.push('/');
        path.push_str(&self.plural);
        if let Some(name) = name {
            if name.is_empty() {
                return Err(StoreError::InvalidRequest("object name is empty".to_string()));
            }
            path.push('/');
            path.push_str(name);
        }
        Ok(path)
    }
}

impl fmt::Display for ApiResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.plural)
        } else {
            write!(f, "{}.{}", self.plural, self.group)
        }
    }
}
