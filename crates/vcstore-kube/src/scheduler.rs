use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::{Api, DeleteParams, PostParams};
use kube::Client;
use serde_json::json;
use tracing::debug;
use vcstore_core::workload::SCRIPT_FILE_NAME;
use vcstore_core::{CoreError, CoreResult, ScriptArtifact, TeardownJob, WorkloadScheduler};

use crate::error::map_kube_error;

const SCRIPT_VOLUME: &str = "scripts";
const SCRIPT_MODE: i32 = 0o755;

/// [`WorkloadScheduler`] running teardown as batch/v1 Jobs with the script
/// mounted from a ConfigMap.
#[derive(Clone)]
pub struct KubeWorkloadScheduler {
    client: Client,
}

impl KubeWorkloadScheduler {
    /// Creates a scheduler using the given client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// ConfigMap carrying the script under [`SCRIPT_FILE_NAME`].
///
/// # Errors
///
/// Returns [`CoreError::Internal`] if the manifest does not deserialize.
pub fn config_map_from_artifact(artifact: &ScriptArtifact) -> CoreResult<ConfigMap> {
    serde_json::from_value(json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": {
            "name": artifact.name,
            "namespace": artifact.namespace,
            "labels": artifact.labels,
        },
        "data": {
            SCRIPT_FILE_NAME: artifact.script,
        },
    }))
    .map_err(|err| CoreError::internal(format!("building config map manifest: {err}")))
}

/// Never-restarting Job with bounded retries and a TTL after completion.
///
/// # Errors
///
/// Returns [`CoreError::Internal`] if the manifest does not deserialize.
pub fn job_from_teardown(job: &TeardownJob) -> CoreResult<Job> {
    serde_json::from_value(json!({
        "apiVersion": "batch/v1",
        "kind": "Job",
        "metadata": {
            "name": job.name,
            "namespace": job.namespace,
            "labels": job.labels,
        },
        "spec": {
            "backoffLimit": job.backoff_limit,
            "ttlSecondsAfterFinished": job.ttl_seconds_after_finished,
            "template": {
                "metadata": { "labels": job.labels },
                "spec": {
                    "restartPolicy": "Never",
                    "dnsPolicy": "ClusterFirst",
                    "containers": [{
                        "name": "cleanup",
                        "image": job.image,
                        "command": job.command,
                        "volumeMounts": [{
                            "name": SCRIPT_VOLUME,
                            "mountPath": job.mount_path,
                            "readOnly": true,
                        }],
                    }],
                    "volumes": [{
                        "name": SCRIPT_VOLUME,
                        "configMap": {
                            "name": job.artifact_name,
                            "defaultMode": SCRIPT_MODE,
                        },
                    }],
                },
            },
        },
    }))
    .map_err(|err| CoreError::internal(format!("building job manifest: {err}")))
}

#[async_trait]
impl WorkloadScheduler for KubeWorkloadScheduler {
    async fn create_artifact(&self, artifact: &ScriptArtifact) -> CoreResult<()> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), &artifact.namespace);
        api.create(&PostParams::default(), &config_map_from_artifact(artifact)?)
            .await
            .map_err(|err| map_kube_error("config map", &artifact.name, err))?;
        debug!(config_map = %artifact.name, namespace = %artifact.namespace, "created script artifact");
        Ok(())
    }

    async fn submit_job(&self, job: &TeardownJob) -> CoreResult<()> {
        let api: Api<Job> = Api::namespaced(self.client.clone(), &job.namespace);
        api.create(&PostParams::default(), &job_from_teardown(job)?)
            .await
            .map_err(|err| map_kube_error("job", &job.name, err))?;
        debug!(job = %job.name, namespace = %job.namespace, "submitted teardown job");
        Ok(())
    }

    async fn delete_artifact(&self, namespace: &str, name: &str) -> CoreResult<()> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        api.delete(name, &DeleteParams::default())
            .await
            .map_err(|err| map_kube_error("config map", name, err))?;
        Ok(())
    }
}
