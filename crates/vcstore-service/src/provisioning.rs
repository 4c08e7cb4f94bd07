use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use vcstore_core::naming::random_password;
use vcstore_core::{
    AdminConnector, AdminSession, AdminStatement, ConnectorDescriptor, CoreError, CoreResult,
    InstanceNames, InstanceRef, ProvisionedIdentity,
};

use crate::config::{AgentConfig, InstanceConfig};
use crate::credentials::CredentialStore;
use crate::locks::InstanceLocks;
use crate::resolver::ConnectorResolver;

/// Deadlines and credential policy for provisioning.
#[derive(Debug, Clone)]
pub struct ProvisioningSettings {
    pub connect_timeout: Duration,
    pub statement_timeout: Duration,
    pub password_length: usize,
}

impl Default for ProvisioningSettings {
    fn default() -> Self {
        Self::from_config(&AgentConfig::default())
    }
}

impl ProvisioningSettings {
    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            connect_timeout: config.timeouts.connect(),
            statement_timeout: config.timeouts.statement(),
            password_length: config.credentials.password_length,
        }
    }
}

/// Creates (or re-establishes) the database and role backing an instance.
pub struct ProvisioningService {
    resolver: ConnectorResolver,
    credentials: CredentialStore,
    admin: Arc<dyn AdminConnector>,
    locks: InstanceLocks,
    settings: ProvisioningSettings,
}

impl ProvisioningService {
    pub fn new(
        resolver: ConnectorResolver,
        credentials: CredentialStore,
        admin: Arc<dyn AdminConnector>,
        settings: ProvisioningSettings,
    ) -> Self {
        Self {
            resolver,
            credentials,
            admin,
            locks: InstanceLocks::new(),
            settings,
        }
    }

    /// Provisions `instance` on the server described by connector
    /// `connector_name` and returns the instance's data source.
    ///
    /// Safe to repeat: existing objects are kept and the role's password is
    /// rotated to a fresh value. Calls for the same instance are serialized.
    ///
    /// # Errors
    ///
    /// Connector lookup, connectivity, timeout, and statement failures abort
    /// the call. Failing to persist the credential record does not.
    pub async fn provision(
        &self,
        instance: &InstanceRef,
        connector_name: &str,
    ) -> CoreResult<ProvisionedIdentity> {
        let _guard = self.locks.acquire(instance).await;

        let connector = self
            .resolver
            .resolve(&instance.namespace, connector_name)
            .await?;
        let adapter = connector.dialect.adapter();
        let names = InstanceNames::derive(instance, adapter.identifier_limits());
        let password = random_password(self.settings.password_length);

        tracing::info!(
            instance = %instance,
            dialect = connector.dialect.as_str(),
            database = %names.database,
            user = %names.user,
            "Provisioning backing store"
        );

        let statements = adapter.create_statements(&names.database, &names.user, &password);
        self.run_on(&connector, None, &statements).await?;

        let grants = adapter.schema_grant_statements(&names.user);
        if !grants.is_empty() {
            if let Err(e) = self
                .run_on(&connector, Some(names.database.as_str()), &grants)
                .await
            {
                tracing::warn!(
                    instance = %instance,
                    database = %names.database,
                    "Failed to grant schema privileges, continuing: {}",
                    e
                );
            }
        }

        let identity = ProvisionedIdentity {
            data_source: adapter.instance_data_source(
                &connector,
                &names.database,
                &names.user,
                &password,
            ),
            database_name: names.database,
            database_user: names.user,
            database_password: password,
        };

        if let Err(e) = self.credentials.save(instance, &identity).await {
            tracing::warn!(
                instance = %instance,
                "Failed to persist credential record, continuing: {}",
                e
            );
        }

        tracing::info!(
            instance = %instance,
            database = %identity.database_name,
            "Backing store provisioned"
        );
        Ok(identity)
    }

    /// Picks the data source for `instance`.
    ///
    /// A configured connector wins and triggers provisioning; otherwise the
    /// explicit data source is returned unchanged.
    pub async fn resolve_data_source(
        &self,
        instance: &InstanceRef,
        config: &InstanceConfig,
    ) -> CoreResult<String> {
        if let Some(connector) = config.connector() {
            if !config.data_source.is_empty() {
                tracing::info!(
                    instance = %instance,
                    "Both a connector and a data source are configured, using the connector"
                );
            }
            return Ok(self.provision(instance, connector).await?.data_source);
        }

        if config.data_source.is_empty() {
            return Err(CoreError::validation(
                "neither a connector nor a data source is configured",
            ));
        }
        Ok(config.data_source.clone())
    }

    /// Opens one admin connection, runs `statements` in order, and closes it.
    async fn run_on(
        &self,
        connector: &ConnectorDescriptor,
        database: Option<&str>,
        statements: &[AdminStatement],
    ) -> CoreResult<()> {
        let mut session = bounded(
            self.settings.connect_timeout,
            "admin connect",
            self.admin.connect(connector, database),
        )
        .await?;

        let result = self.execute_all(session.as_mut(), statements).await;

        if let Err(e) = session.close().await {
            tracing::debug!(endpoint = %connector.endpoint(), "Closing admin connection failed: {}", e);
        }
        result
    }

    async fn execute_all(
        &self,
        session: &mut dyn AdminSession,
        statements: &[AdminStatement],
    ) -> CoreResult<()> {
        for statement in statements {
            let limit = self.settings.statement_timeout;
            let outcome = tokio::time::timeout(limit, session.execute(statement))
                .await
                .unwrap_or_else(|_| {
                    Err(CoreError::statement(
                        statement.purpose,
                        &statement.object,
                        format!("timed out after {}s", limit.as_secs()),
                    ))
                });

            match outcome {
                Ok(()) => {
                    tracing::debug!(
                        purpose = statement.purpose,
                        object = %statement.object,
                        "Statement applied"
                    );
                }
                Err(e) if statement.tolerate_failure => {
                    tracing::warn!(
                        purpose = statement.purpose,
                        object = %statement.object,
                        "Ignoring failed statement: {}",
                        e
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

async fn bounded<T>(
    limit: Duration,
    operation: &'static str,
    future: impl Future<Output = CoreResult<T>>,
) -> CoreResult<T> {
    tokio::time::timeout(limit, future)
        .await
        .map_err(|_| CoreError::Timeout { operation })?
}
