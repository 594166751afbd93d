//! Idempotent creation of desired resources.

use opcheck_store::{ObjectStore, StoreError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::VerifyError;
use crate::resource::DesiredResource;

/// How [`ResourceEnsurer::ensure`] satisfied the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// The resource was already present; nothing was written.
    Existed,

    /// The resource was absent and has been created.
    Created,
}

impl EnsureOutcome {
    /// Returns true if no write was needed.
    pub fn existed(&self) -> bool {
        matches!(self, Self::Existed)
    }
}

/// Makes desired resources exist without clobbering existing ones.
#[derive(Debug, Clone)]
pub struct ResourceEnsurer<St> {
    store: St,
}

impl<St: ObjectStore> ResourceEnsurer<St> {
    /// Create an ensurer writing to `store`.
    pub fn new(store: St) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &St {
        &self.store
    }

    /// Make sure `desired` exists, creating it if the store reports it absent.
    ///
    /// Reads before writing, so repeated calls write at most once. Only a
    /// `NotFound` read leads to a create; any other read failure is returned
    /// as is. An existing object whose shape no longer decodes into `S` is a
    /// [`VerifyError::SchemaMismatch`]. A create that loses a race to another
    /// writer counts as [`EnsureOutcome::Existed`].
    pub async fn ensure<S>(&self, desired: &DesiredResource<S>) -> Result<EnsureOutcome, VerifyError>
    where
        S: Serialize + DeserializeOwned + Sync,
    {
        let resource = desired.resource();
        let namespace = Some(desired.namespace());

        match self.store.get(resource, namespace, desired.name()).await {
            Ok(live) => {
                DesiredResource::<S>::from_object(resource, &live)?;
                info!(resource = %desired, uid = ?live.uid(), "Resource already present");
                return Ok(EnsureOutcome::Existed);
            }
            Err(e) if e.is_not_found() => {
                debug!(resource = %desired, "Resource absent, creating");
            }
            Err(e) => return Err(VerifyError::store(desired.identity(), e)),
        }

        let object = desired.to_object()?;
        match self.store.create(resource, namespace, &object).await {
            Ok(created) => {
                info!(resource = %desired, uid = ?created.uid(), "Resource created");
                Ok(EnsureOutcome::Created)
            }
            Err(StoreError::AlreadyExists { .. }) => {
                warn!(resource = %desired, "Resource was created concurrently");
                Ok(EnsureOutcome::Existed)
            }
            Err(e) => Err(VerifyError::store(desired.identity(), e)),
        }
    }

    /// Read the live resource back in typed form, if it exists.
    pub async fn fetch<S>(
        &self,
        desired: &DesiredResource<S>,
    ) -> Result<Option<DesiredResource<S>>, VerifyError>
    where
        S: DeserializeOwned + Sync,
    {
        let resource = desired.resource();
        match self
            .store
            .get(resource, Some(desired.namespace()), desired.name())
            .await
        {
            Ok(live) => DesiredResource::from_object(resource, &live).map(Some),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(VerifyError::store(desired.identity(), e)),
        }
    }

    /// Delete the resource. Returns false if it was already gone.
    pub async fn delete<S: Sync>(&self, desired: &DesiredResource<S>) -> Result<bool, VerifyError> {
        match self
            .store
            .delete(desired.resource(), Some(desired.namespace()), desired.name())
            .await
        {
            Ok(()) => {
                info!(resource = %desired, "Resource deleted");
                Ok(true)
            }
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(VerifyError::store(desired.identity(), e)),
        }
    }
}
