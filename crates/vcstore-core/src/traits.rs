use async_trait::async_trait;

use crate::connector::ConnectorDescriptor;
use crate::dialect::AdminStatement;
use crate::error::CoreResult;
use crate::record::SecretRecord;
use crate::workload::{ScriptArtifact, TeardownJob};

/// Namespaced key/value store holding connector and credential records.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetches a record, returning `None` when it does not exist.
    async fn get(&self, namespace: &str, name: &str) -> CoreResult<Option<SecretRecord>>;

    /// Creates a record; fails with `AlreadyExists` when the name is taken.
    async fn create(&self, record: &SecretRecord) -> CoreResult<()>;

    /// Replaces an existing record wholesale.
    ///
    /// Fails with `NotFound` when absent and `Conflict` when a concurrent
    /// writer won the optimistic concurrency check.
    async fn replace(&self, record: &SecretRecord) -> CoreResult<()>;

    /// Deletes a record; fails with `NotFound` when absent.
    async fn delete(&self, namespace: &str, name: &str) -> CoreResult<()>;
}

/// Single administrative connection, opened and closed within one call.
#[async_trait]
pub trait AdminSession: Send {
    /// Runs one statement, honoring its existence probe.
    ///
    /// Failures are reported as `Statement` errors naming the statement's
    /// purpose and object.
    async fn execute(&mut self, statement: &AdminStatement) -> CoreResult<()>;

    /// Closes the connection gracefully.
    async fn close(self: Box<Self>) -> CoreResult<()>;
}

/// Opens administrative connections to a connector's server.
#[async_trait]
pub trait AdminConnector: Send + Sync {
    /// Connects with the connector's admin credentials and verifies the
    /// server answers before returning.
    ///
    /// `database` selects the database to connect to; `None` means the
    /// dialect's maintenance database.
    async fn connect(
        &self,
        connector: &ConnectorDescriptor,
        database: Option<&str>,
    ) -> CoreResult<Box<dyn AdminSession>>;
}

/// Schedules teardown work onto the cluster network.
#[async_trait]
pub trait WorkloadScheduler: Send + Sync {
    /// Stores the script artifact; fails with `AlreadyExists` when present.
    async fn create_artifact(&self, artifact: &ScriptArtifact) -> CoreResult<()>;

    /// Submits the job; fails with `AlreadyExists` when present.
    async fn submit_job(&self, job: &TeardownJob) -> CoreResult<()>;

    /// Deletes the script artifact; fails with `NotFound` when absent.
    async fn delete_artifact(&self, namespace: &str, name: &str) -> CoreResult<()>;
}
