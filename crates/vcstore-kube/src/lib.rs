//! Host-cluster adapters: Secrets as the key/value store, ConfigMaps as
//! script artifacts, and batch Jobs as the teardown execution unit.

mod error;
mod scheduler;
mod secrets;

pub use error::map_kube_error;
pub use scheduler::{config_map_from_artifact, job_from_teardown, KubeWorkloadScheduler};
pub use secrets::{record_from_secret, secret_from_record, KubeSecretStore};
