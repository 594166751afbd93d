//! Presence checks for supporting objects.
//!
//! Operators usually ship with objects the check does not create, such as
//! cluster roles and their bindings. These only need to exist.

use opcheck_store::{ApiResource, ObjectStore};
use tracing::{debug, warn};

use crate::error::VerifyError;

/// Which of the expected objects exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceReport {
    pub resource: ApiResource,
    pub present: Vec<String>,
    pub missing: Vec<String>,
}

impl PresenceReport {
    /// Returns true if nothing is missing.
    pub fn all_present(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Check that every named object of `resource` exists.
///
/// Missing objects are reported, not treated as errors. Any other store
/// failure aborts the check.
pub async fn check_present<St>(
    store: &St,
    resource: &ApiResource,
    namespace: Option<&str>,
    names: &[String],
) -> Result<PresenceReport, VerifyError>
where
    St: ObjectStore + ?Sized,
{
    let mut report = PresenceReport {
        resource: resource.clone(),
        present: Vec::new(),
        missing: Vec::new(),
    };

    for name in names {
        match store.get(resource, namespace, name).await {
            Ok(_) => {
                debug!(resource = %resource, name = %name, "Present");
                report.present.push(name.clone());
            }
            Err(e) if e.is_not_found() => {
                warn!(resource = %resource, name = %name, "Missing");
                report.missing.push(name.clone());
            }
            Err(e) => {
                let identity = match namespace {
                    Some(ns) => format!("{} {ns}/{name}", resource.kind),
                    None => format!("{} {name}", resource.kind),
                };
                return Err(VerifyError::store(identity, e));
            }
        }
    }

    Ok(report)
}
