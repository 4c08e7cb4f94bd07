//! In-memory stand-ins for the secret store, admin connector, and workload
//! scheduler, recording every interaction for assertions.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use vcstore_core::{
    AdminConnector, AdminSession, AdminStatement, ConnectorDescriptor, CoreError, CoreResult,
    Dialect, InstanceRef, ScriptArtifact, SecretRecord, SecretStore, TeardownJob,
    WorkloadScheduler,
};
use vcstore_service::{ConnectorResolver, CredentialStore};

pub const CONNECTOR_NAME: &str = "db-connector";

/// Connector record for a server at `pg.example` / `mysql.example`.
pub fn connector_record(namespace: &str, dialect: Dialect) -> SecretRecord {
    let host = match dialect {
        Dialect::Postgres => "pg.example",
        Dialect::Mysql => "mysql.example",
    };
    SecretRecord::new(CONNECTOR_NAME, namespace)
        .with_entry(ConnectorDescriptor::FIELD_TYPE, dialect.as_str())
        .with_entry(ConnectorDescriptor::FIELD_HOST, host)
        .with_entry(ConnectorDescriptor::FIELD_PORT, dialect.default_port())
        .with_entry(ConnectorDescriptor::FIELD_ADMIN_USER, "admin")
        .with_entry(ConnectorDescriptor::FIELD_ADMIN_PASSWORD, "s3cr3t")
}

pub fn team_a() -> InstanceRef {
    InstanceRef::new("team-a", "ns1")
}

// ---------------------------------------------------------------------------
// Secret store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemorySecretStore {
    records: Mutex<BTreeMap<(String, String), SecretRecord>>,
    conflicts_to_inject: AtomicUsize,
    fail_writes: AtomicBool,
    reads: AtomicUsize,
}

impl MemorySecretStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, record: SecretRecord) {
        self.records
            .lock()
            .unwrap()
            .insert((record.namespace.clone(), record.name.clone()), record);
    }

    pub fn record(&self, namespace: &str, name: &str) -> Option<SecretRecord> {
        self.records
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn remove(&self, namespace: &str, name: &str) {
        self.records
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()));
    }

    /// The next `count` replace calls lose the optimistic concurrency check.
    pub fn inject_conflicts(&self, count: usize) {
        self.conflicts_to_inject.store(count, Ordering::SeqCst);
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn check_writable(&self) -> CoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CoreError::Persistence("store is read-only".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get(&self, namespace: &str, name: &str) -> CoreResult<Option<SecretRecord>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.record(namespace, name))
    }

    async fn create(&self, record: &SecretRecord) -> CoreResult<()> {
        self.check_writable()?;
        let mut records = self.records.lock().unwrap();
        let key = (record.namespace.clone(), record.name.clone());
        if records.contains_key(&key) {
            return Err(CoreError::already_exists("secret", &record.name));
        }
        records.insert(key, record.clone());
        Ok(())
    }

    async fn replace(&self, record: &SecretRecord) -> CoreResult<()> {
        self.check_writable()?;
        let injected = self
            .conflicts_to_inject
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(CoreError::conflict("secret", &record.name));
        }

        let mut records = self.records.lock().unwrap();
        let key = (record.namespace.clone(), record.name.clone());
        match records.get_mut(&key) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(CoreError::not_found("secret", &record.name)),
        }
    }

    async fn delete(&self, namespace: &str, name: &str) -> CoreResult<()> {
        self.check_writable()?;
        self.records
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()))
            .map(|_| ())
            .ok_or_else(|| CoreError::not_found("secret", name))
    }
}

// ---------------------------------------------------------------------------
// Admin connector
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executed {
    /// Database the session was opened against; `None` for maintenance.
    pub database: Option<String>,
    pub purpose: &'static str,
    pub object: String,
    pub sql: String,
}

#[derive(Default)]
struct ServerState {
    executed: Vec<Executed>,
    /// Objects whose existence probes answer `true`.
    existing: HashSet<String>,
    failing_purposes: HashSet<&'static str>,
    slow_purposes: HashMap<&'static str, Duration>,
    unreachable: bool,
    connect_delay: Option<Duration>,
}

/// Pretends to be a database server; every session shares its state.
#[derive(Default)]
pub struct RecordingConnector {
    state: Arc<Mutex<ServerState>>,
    connects: AtomicUsize,
    closes: Arc<AtomicUsize>,
}

impl RecordingConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn executed(&self) -> Vec<Executed> {
        self.state.lock().unwrap().executed.clone()
    }

    pub fn purposes(&self) -> Vec<&'static str> {
        self.executed().iter().map(|e| e.purpose).collect()
    }

    pub fn fail_purpose(&self, purpose: &'static str) {
        self.state.lock().unwrap().failing_purposes.insert(purpose);
    }

    pub fn make_unreachable(&self) {
        self.state.lock().unwrap().unreachable = true;
    }

    pub fn delay_purpose(&self, purpose: &'static str, delay: Duration) {
        self.state
            .lock()
            .unwrap()
            .slow_purposes
            .insert(purpose, delay);
    }

    pub fn delay_connect(&self, delay: Duration) {
        self.state.lock().unwrap().connect_delay = Some(delay);
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AdminConnector for RecordingConnector {
    async fn connect(
        &self,
        connector: &ConnectorDescriptor,
        database: Option<&str>,
    ) -> CoreResult<Box<dyn AdminSession>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let (unreachable, delay) = {
            let state = self.state.lock().unwrap();
            (state.unreachable, state.connect_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if unreachable {
            return Err(CoreError::connectivity(
                connector.endpoint(),
                "connection refused",
            ));
        }
        Ok(Box::new(RecordingSession {
            database: database.map(str::to_string),
            state: Arc::clone(&self.state),
            closes: Arc::clone(&self.closes),
        }))
    }
}

struct RecordingSession {
    database: Option<String>,
    state: Arc<Mutex<ServerState>>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl AdminSession for RecordingSession {
    async fn execute(&mut self, statement: &AdminStatement) -> CoreResult<()> {
        let delay = self
            .state
            .lock()
            .unwrap()
            .slow_purposes
            .get(statement.purpose)
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        if let Some(probe) = &statement.skip_if_exists {
            if state.existing.contains(&probe.parameter) {
                return Ok(());
            }
        }
        if state.failing_purposes.contains(statement.purpose) {
            return Err(CoreError::statement(
                statement.purpose,
                &statement.object,
                "permission denied",
            ));
        }
        if let Some(probe) = &statement.skip_if_exists {
            state.existing.insert(probe.parameter.clone());
        }
        state.executed.push(Executed {
            database: self.database.clone(),
            purpose: statement.purpose,
            object: statement.object.clone(),
            sql: statement.sql.clone(),
        });
        Ok(())
    }

    async fn close(self: Box<Self>) -> CoreResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Workload scheduler
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingScheduler {
    artifacts: Mutex<BTreeMap<(String, String), ScriptArtifact>>,
    jobs: Mutex<Vec<TeardownJob>>,
    deleted: Mutex<Vec<(String, String)>>,
    fail_submit: AtomicBool,
}

impl RecordingScheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn artifact(&self, namespace: &str, name: &str) -> Option<ScriptArtifact> {
        self.artifacts
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn jobs(&self) -> Vec<TeardownJob> {
        self.jobs.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<(String, String)> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn fail_submit(&self) {
        self.fail_submit.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl WorkloadScheduler for RecordingScheduler {
    async fn create_artifact(&self, artifact: &ScriptArtifact) -> CoreResult<()> {
        let mut artifacts = self.artifacts.lock().unwrap();
        let key = (artifact.namespace.clone(), artifact.name.clone());
        if artifacts.contains_key(&key) {
            return Err(CoreError::already_exists("config map", &artifact.name));
        }
        artifacts.insert(key, artifact.clone());
        Ok(())
    }

    async fn submit_job(&self, job: &TeardownJob) -> CoreResult<()> {
        if self.fail_submit.load(Ordering::SeqCst) {
            return Err(CoreError::Persistence("admission webhook denied".to_string()));
        }
        let mut jobs = self.jobs.lock().unwrap();
        if jobs
            .iter()
            .any(|j| j.namespace == job.namespace && j.name == job.name)
        {
            return Err(CoreError::already_exists("job", &job.name));
        }
        jobs.push(job.clone());
        Ok(())
    }

    async fn delete_artifact(&self, namespace: &str, name: &str) -> CoreResult<()> {
        self.deleted
            .lock()
            .unwrap()
            .push((namespace.to_string(), name.to_string()));
        self.artifacts
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()))
            .map(|_| ())
            .ok_or_else(|| CoreError::not_found("config map", name))
    }
}

pub fn resolver(store: &Arc<MemorySecretStore>) -> ConnectorResolver {
    ConnectorResolver::new(Arc::clone(store) as Arc<dyn SecretStore>)
}

pub fn credentials(store: &Arc<MemorySecretStore>) -> CredentialStore {
    CredentialStore::new(Arc::clone(store) as Arc<dyn SecretStore>)
}
