use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::api::{Api, DeleteParams, PostParams};
use kube::Client;
use tracing::debug;
use vcstore_core::{CoreResult, SecretRecord, SecretStore};

use crate::error::map_kube_error;

const ENTITY: &str = "secret";

/// [`SecretStore`] over core/v1 Secrets in the host cluster.
#[derive(Clone)]
pub struct KubeSecretStore {
    client: Client,
}

impl KubeSecretStore {
    /// Creates a store using the given client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Converts a record into an Opaque Secret.
pub fn secret_from_record(record: &SecretRecord) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(record.name.clone()),
            namespace: Some(record.namespace.clone()),
            labels: (!record.labels.is_empty()).then(|| record.labels.clone()),
            ..ObjectMeta::default()
        },
        type_: Some("Opaque".to_string()),
        data: Some(
            record
                .data
                .iter()
                .map(|(k, v)| (k.clone(), ByteString(v.clone())))
                .collect(),
        ),
        ..Secret::default()
    }
}

/// Converts a Secret into a record, folding `stringData` over `data`.
pub fn record_from_secret(secret: Secret) -> SecretRecord {
    let mut data: BTreeMap<String, Vec<u8>> = secret
        .data
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, v.0))
        .collect();
    for (k, v) in secret.string_data.unwrap_or_default() {
        data.insert(k, v.into_bytes());
    }

    SecretRecord {
        name: secret.metadata.name.unwrap_or_default(),
        namespace: secret.metadata.namespace.unwrap_or_default(),
        labels: secret.metadata.labels.unwrap_or_default(),
        data,
    }
}

#[async_trait]
impl SecretStore for KubeSecretStore {
    async fn get(&self, namespace: &str, name: &str) -> CoreResult<Option<SecretRecord>> {
        match self.api(namespace).get_opt(name).await {
            Ok(secret) => Ok(secret.map(record_from_secret)),
            Err(err) => Err(map_kube_error(ENTITY, name, err)),
        }
    }

    async fn create(&self, record: &SecretRecord) -> CoreResult<()> {
        self.api(&record.namespace)
            .create(&PostParams::default(), &secret_from_record(record))
            .await
            .map_err(|err| map_kube_error(ENTITY, &record.name, err))?;
        debug!(secret = %record.name, namespace = %record.namespace, "created secret");
        Ok(())
    }

    async fn replace(&self, record: &SecretRecord) -> CoreResult<()> {
        let api = self.api(&record.namespace);
        let current = api
            .get(&record.name)
            .await
            .map_err(|err| map_kube_error(ENTITY, &record.name, err))?;

        let mut secret = secret_from_record(record);
        secret.metadata.resource_version = current.metadata.resource_version;
        api.replace(&record.name, &PostParams::default(), &secret)
            .await
            .map_err(|err| map_kube_error(ENTITY, &record.name, err))?;
        debug!(secret = %record.name, namespace = %record.namespace, "replaced secret");
        Ok(())
    }

    async fn delete(&self, namespace: &str, name: &str) -> CoreResult<()> {
        self.api(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|err| map_kube_error(ENTITY, name, err))?;
        Ok(())
    }
}
