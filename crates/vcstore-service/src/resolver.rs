use std::sync::Arc;

use vcstore_core::{ConnectorDescriptor, CoreError, CoreResult, SecretStore};

/// Looks up connector records and turns them into validated descriptors.
#[derive(Clone)]
pub struct ConnectorResolver {
    store: Arc<dyn SecretStore>,
}

impl ConnectorResolver {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }

    /// Resolves connector `name` in `namespace`.
    ///
    /// # Errors
    ///
    /// `NotFound` when no record exists, `Validation` when the record is
    /// incomplete or names an unsupported dialect.
    pub async fn resolve(&self, namespace: &str, name: &str) -> CoreResult<ConnectorDescriptor> {
        let record = self
            .store
            .get(namespace, name)
            .await?
            .ok_or_else(|| CoreError::not_found("connector", format!("{namespace}/{name}")))?;

        let connector = ConnectorDescriptor::from_record(&record)?;
        tracing::debug!(
            connector = %format!("{namespace}/{name}"),
            dialect = connector.dialect.as_str(),
            endpoint = %connector.endpoint(),
            "Resolved connector"
        );
        Ok(connector)
    }
}
