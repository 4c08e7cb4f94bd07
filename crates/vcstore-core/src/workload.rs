use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::connector::Dialect;
use crate::identity::labels;
use crate::instance::InstanceRef;

/// File name of the teardown script inside its artifact.
pub const SCRIPT_FILE_NAME: &str = "cleanup.sh";

/// Tunables for the teardown execution unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeardownSettings {
    /// Image providing the `mysql` client.
    #[serde(default = "default_mysql_image")]
    pub mysql_image: String,

    /// Image providing the `psql` client.
    #[serde(default = "default_postgres_image")]
    pub postgres_image: String,

    /// Retries before the job is marked failed.
    #[serde(default = "default_backoff_limit")]
    pub backoff_limit: i32,

    /// Seconds a finished job is retained before garbage collection.
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds_after_finished: i32,

    /// Directory the script artifact is mounted at.
    #[serde(default = "default_mount_path")]
    pub script_mount_path: String,
}

fn default_mysql_image() -> String {
    "mysql:8".to_string()
}

fn default_postgres_image() -> String {
    "postgres:15".to_string()
}

fn default_backoff_limit() -> i32 {
    3
}

fn default_ttl_seconds() -> i32 {
    300
}

fn default_mount_path() -> String {
    "/scripts".to_string()
}

impl Default for TeardownSettings {
    fn default() -> Self {
        Self {
            mysql_image: default_mysql_image(),
            postgres_image: default_postgres_image(),
            backoff_limit: default_backoff_limit(),
            ttl_seconds_after_finished: default_ttl_seconds(),
            script_mount_path: default_mount_path(),
        }
    }
}

impl TeardownSettings {
    /// Client image for `dialect`.
    #[must_use]
    pub fn image(&self, dialect: Dialect) -> &str {
        match dialect {
            Dialect::Mysql => &self.mysql_image,
            Dialect::Postgres => &self.postgres_image,
        }
    }
}

/// Mountable key/value artifact holding the teardown script.
#[derive(Clone, PartialEq, Eq)]
pub struct ScriptArtifact {
    pub name: String,
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
    /// Script body, stored under [`SCRIPT_FILE_NAME`].
    pub script: String,
}

impl std::fmt::Debug for ScriptArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptArtifact")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("labels", &self.labels)
            .field("script_bytes", &self.script.len())
            .finish()
    }
}

/// One-shot job that mounts a [`ScriptArtifact`] and runs it to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownJob {
    pub name: String,
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
    pub image: String,
    /// Artifact mounted into the container.
    pub artifact_name: String,
    pub mount_path: String,
    pub command: Vec<String>,
    pub backoff_limit: i32,
    pub ttl_seconds_after_finished: i32,
}

impl TeardownJob {
    /// Builds the script artifact and job tearing down `instance`'s database.
    #[must_use]
    pub fn for_instance(
        instance: &InstanceRef,
        dialect: Dialect,
        settings: &TeardownSettings,
        script: String,
    ) -> (ScriptArtifact, Self) {
        let name = instance.teardown_name();
        let labels: BTreeMap<String, String> = [
            (labels::APP, labels::APP_VALUE),
            (labels::NAME, instance.name.as_str()),
            (labels::NAMESPACE, instance.namespace.as_str()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let artifact = ScriptArtifact {
            name: name.clone(),
            namespace: instance.namespace.clone(),
            labels: labels.clone(),
            script,
        };

        let mount_path = settings.script_mount_path.trim_end_matches('/').to_string();
        let job = Self {
            name: name.clone(),
            namespace: instance.namespace.clone(),
            labels,
            image: settings.image(dialect).to_string(),
            artifact_name: name,
            command: vec![
                "/bin/sh".to_string(),
                format!("{mount_path}/{SCRIPT_FILE_NAME}"),
            ],
            mount_path,
            backoff_limit: settings.backoff_limit,
            ttl_seconds_after_finished: settings.ttl_seconds_after_finished,
        };

        (artifact, job)
    }
}
