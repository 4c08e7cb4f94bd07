use std::sync::Arc;
use std::time::Duration;

use vcstore_core::script::render_teardown_script;
use vcstore_core::{
    CoreResult, InstanceNames, InstanceRef, TeardownJob, TeardownSettings, WorkloadScheduler,
};

use crate::credentials::CredentialStore;
use crate::deferred::DeferredTasks;
use crate::resolver::ConnectorResolver;

/// Tears down an instance's database and role by scheduling a one-shot job
/// inside the cluster network.
pub struct CleanupService {
    resolver: ConnectorResolver,
    credentials: CredentialStore,
    scheduler: Arc<dyn WorkloadScheduler>,
    settings: TeardownSettings,
    artifact_grace: Duration,
    deferred: DeferredTasks,
}

impl CleanupService {
    pub fn new(
        resolver: ConnectorResolver,
        credentials: CredentialStore,
        scheduler: Arc<dyn WorkloadScheduler>,
        settings: TeardownSettings,
        artifact_grace: Duration,
    ) -> Self {
        Self {
            resolver,
            credentials,
            scheduler,
            settings,
            artifact_grace,
            deferred: DeferredTasks::new(),
        }
    }

    /// Schedules removal of `instance`'s database and role.
    ///
    /// Names are re-derived from the instance identity and the connector is
    /// looked up again; nothing from provisioning is reused. A connector
    /// that no longer exists makes this a no-op.
    ///
    /// Returns once the job is submitted; the job runs asynchronously.
    pub async fn cleanup(&self, instance: &InstanceRef, connector_name: &str) -> CoreResult<()> {
        let connector = match self
            .resolver
            .resolve(&instance.namespace, connector_name)
            .await
        {
            Ok(connector) => connector,
            Err(e) if e.is_not_found() => {
                tracing::info!(
                    instance = %instance,
                    connector = connector_name,
                    "Connector is gone, nothing to clean up"
                );
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let adapter = connector.dialect.adapter();
        let names = InstanceNames::derive(instance, adapter.identifier_limits());
        let script = render_teardown_script(
            &connector,
            &adapter.drop_statements(&names.database, &names.user),
        );
        let (artifact, job) =
            TeardownJob::for_instance(instance, connector.dialect, &self.settings, script);

        match self.scheduler.create_artifact(&artifact).await {
            Ok(()) => {}
            Err(e) if e.is_already_exists() => {
                tracing::debug!(artifact = %artifact.name, "Teardown script already stored");
            }
            Err(e) => return Err(e),
        }

        match self.scheduler.submit_job(&job).await {
            Ok(()) => {
                tracing::info!(
                    instance = %instance,
                    job = %job.name,
                    database = %names.database,
                    user = %names.user,
                    "Teardown job submitted"
                );
            }
            Err(e) if e.is_already_exists() => {
                tracing::info!(instance = %instance, job = %job.name, "Teardown job already running");
            }
            Err(e) => {
                if let Err(delete_err) = self
                    .scheduler
                    .delete_artifact(&artifact.namespace, &artifact.name)
                    .await
                {
                    tracing::debug!(artifact = %artifact.name, "Removing orphaned script failed: {}", delete_err);
                }
                return Err(e);
            }
        }

        if let Err(e) = self.credentials.delete(instance).await {
            tracing::warn!(instance = %instance, "Failed to delete credential record: {}", e);
        }

        let scheduler = Arc::clone(&self.scheduler);
        self.deferred.schedule(
            format!("delete {}/{}", artifact.namespace, artifact.name),
            self.artifact_grace,
            async move {
                match scheduler
                    .delete_artifact(&artifact.namespace, &artifact.name)
                    .await
                {
                    Ok(()) => {
                        tracing::debug!(artifact = %artifact.name, "Deleted teardown script");
                    }
                    Err(e) if e.is_not_found() => {}
                    Err(e) => {
                        tracing::warn!(artifact = %artifact.name, "Failed to delete teardown script: {}", e);
                    }
                }
            },
        );

        Ok(())
    }

    /// Deferred artifact deletions still waiting on their grace period.
    pub fn deferred(&self) -> &DeferredTasks {
        &self.deferred
    }
}
