use std::sync::Arc;

use vcstore_core::{CoreError, CoreResult, InstanceRef, ProvisionedIdentity, SecretStore};

/// Attempts at create-or-replace before giving up on a contended record.
pub const MAX_SAVE_ATTEMPTS: u32 = 5;

/// Persists the credential record issued to each instance.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn SecretStore>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }

    /// Creates or replaces the credential record of `instance`.
    ///
    /// A concurrent writer or deleter causes a retry from the top, so the
    /// record ends up holding the latest identity.
    pub async fn save(
        &self,
        instance: &InstanceRef,
        identity: &ProvisionedIdentity,
    ) -> CoreResult<()> {
        let record = identity.to_credential_record(instance);

        for attempt in 1..=MAX_SAVE_ATTEMPTS {
            match self.store.create(&record).await {
                Ok(()) => {
                    tracing::info!(instance = %instance, record = %record.name, "Created credential record");
                    return Ok(());
                }
                Err(e) if e.is_already_exists() => {}
                Err(e) => return Err(e),
            }

            match self.store.replace(&record).await {
                Ok(()) => {
                    tracing::info!(instance = %instance, record = %record.name, "Updated credential record");
                    return Ok(());
                }
                Err(e) if e.is_conflict() || e.is_not_found() => {
                    tracing::debug!(
                        instance = %instance,
                        attempt,
                        "Credential record changed underneath us, retrying: {}",
                        e
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(CoreError::Persistence(format!(
            "credential record `{}/{}` still contended after {MAX_SAVE_ATTEMPTS} attempts",
            record.namespace, record.name
        )))
    }

    /// Reads back the identity stored for `instance`, if any.
    pub async fn load(&self, instance: &InstanceRef) -> CoreResult<Option<ProvisionedIdentity>> {
        self.store
            .get(&instance.namespace, &instance.credential_record_name())
            .await?
            .map(|record| ProvisionedIdentity::from_credential_record(&record))
            .transpose()
    }

    /// Deletes the credential record; an absent record counts as deleted.
    pub async fn delete(&self, instance: &InstanceRef) -> CoreResult<()> {
        match self
            .store
            .delete(&instance.namespace, &instance.credential_record_name())
            .await
        {
            Ok(()) => {
                tracing::info!(instance = %instance, "Deleted credential record");
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }
}
