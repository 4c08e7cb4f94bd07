//! Core domain types, naming rules, and dialect adapters for provisioning a
//! virtual cluster's external backing store.

pub mod connector;
pub mod dialect;
pub mod error;
pub mod identity;
pub mod instance;
pub mod naming;
pub mod record;
pub mod script;
pub mod traits;
pub mod workload;

pub use connector::{ConnectorDescriptor, Dialect};
pub use dialect::{AdminStatement, DialectAdapter, ExistenceProbe, MySql, Postgres};
pub use error::{CoreError, CoreResult};
pub use identity::ProvisionedIdentity;
pub use instance::InstanceRef;
pub use naming::{IdentifierLimits, InstanceNames};
pub use record::SecretRecord;
pub use traits::{AdminConnector, AdminSession, SecretStore, WorkloadScheduler};
pub use workload::{ScriptArtifact, TeardownJob, TeardownSettings};
