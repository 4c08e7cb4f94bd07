use std::fmt;

use crate::error::{CoreError, CoreResult};
use crate::instance::InstanceRef;
use crate::record::SecretRecord;

/// Label keys attached to every credential record.
pub mod labels {
    pub const APP: &str = "app";
    pub const APP_VALUE: &str = "vcluster";
    pub const NAME: &str = "vcluster.loft.sh/name";
    pub const NAMESPACE: &str = "vcluster.loft.sh/namespace";
    pub const PROVISIONED: &str = "vcluster.loft.sh/provisioned";
}

/// Database, role, and credentials issued to one instance.
#[derive(Clone, PartialEq, Eq)]
pub struct ProvisionedIdentity {
    pub database_name: String,
    pub database_user: String,
    /// Rotated on every provisioning run.
    pub database_password: String,
    /// Connection string for the store's translation proxy.
    pub data_source: String,
}

impl ProvisionedIdentity {
    pub const KEY_DATABASE: &'static str = "database";
    pub const KEY_USER: &'static str = "user";
    pub const KEY_PASSWORD: &'static str = "password";
    pub const KEY_DATA_SOURCE: &'static str = "dataSource";

    /// Builds the credential record persisted for `instance`.
    #[must_use]
    pub fn to_credential_record(&self, instance: &InstanceRef) -> SecretRecord {
        SecretRecord::new(instance.credential_record_name(), &instance.namespace)
            .with_label(labels::APP, labels::APP_VALUE)
            .with_label(labels::NAME, &instance.name)
            .with_label(labels::NAMESPACE, &instance.namespace)
            .with_label(labels::PROVISIONED, "true")
            .with_entry(Self::KEY_DATABASE, &self.database_name)
            .with_entry(Self::KEY_USER, &self.database_user)
            .with_entry(Self::KEY_PASSWORD, &self.database_password)
            .with_entry(Self::KEY_DATA_SOURCE, &self.data_source)
    }

    /// Reads an identity back from a credential record.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] when any of the four keys is absent.
    pub fn from_credential_record(record: &SecretRecord) -> CoreResult<Self> {
        let field = |key: &str| {
            record.entry(key).ok_or_else(|| {
                CoreError::validation(format!(
                    "credential record `{}` is missing `{key}`",
                    record.name
                ))
            })
        };
        Ok(Self {
            database_name: field(Self::KEY_DATABASE)?,
            database_user: field(Self::KEY_USER)?,
            database_password: field(Self::KEY_PASSWORD)?,
            data_source: field(Self::KEY_DATA_SOURCE)?,
        })
    }
}

impl fmt::Debug for ProvisionedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisionedIdentity")
            .field("database_name", &self.database_name)
            .field("database_user", &self.database_user)
            .field("database_password", &"<redacted>")
            .field("data_source", &"<redacted>")
            .finish()
    }
}
