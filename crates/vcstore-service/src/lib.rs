//! Orchestration for an instance's external backing store: provisioning on
//! startup, teardown on shutdown, and the process-wide lifecycle glue.

mod cleanup;
mod config;
mod credentials;
mod deferred;
mod lifecycle;
mod locks;
mod provisioning;
mod resolver;

pub use cleanup::CleanupService;
pub use config::{
    AgentConfig, ConfigError, CredentialsConfig, InstanceConfig, LoggingConfig, OutputConfig,
    TimeoutConfig, DEFAULT_CONFIG_FILE,
};
pub use credentials::{CredentialStore, MAX_SAVE_ATTEMPTS};
pub use deferred::DeferredTasks;
pub use lifecycle::{LifecycleManager, ShutdownOutcome};
pub use locks::InstanceLocks;
pub use provisioning::{ProvisioningService, ProvisioningSettings};
pub use resolver::ConnectorResolver;
