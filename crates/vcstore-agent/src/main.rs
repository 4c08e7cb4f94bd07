//! Agent provisioning a virtual cluster's external backing store on startup
//! and tearing it down on shutdown.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use vcstore_core::{AdminConnector, InstanceRef, SecretStore, WorkloadScheduler};
use vcstore_kube::{KubeSecretStore, KubeWorkloadScheduler};
use vcstore_service::{
    AgentConfig, CleanupService, ConnectorResolver, CredentialStore, LifecycleManager,
    ProvisioningService, ProvisioningSettings, ShutdownOutcome,
};
use vcstore_sql::SqlxAdminConnector;

mod output;
mod signals;

use output::publish_data_source;
use signals::ShutdownSignals;

#[derive(Parser, Debug)]
#[command(name = "vcstore-agent")]
#[command(about = "Provisions and tears down a virtual cluster's external backing store", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./vcstore.toml when present)
    #[arg(long, global = true, env = "VCSTORE_CONFIG")]
    config: Option<PathBuf>,

    /// Instance name, overriding the configuration
    #[arg(long, global = true)]
    name: Option<String>,

    /// Host namespace, overriding the configuration
    #[arg(long, global = true)]
    namespace: Option<String>,

    /// Connector record name, overriding the configuration
    #[arg(long, global = true)]
    connector: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Provision, publish the data source, and tear down on SIGINT/SIGTERM
    Run,

    /// Provision once and publish the data source
    Provision,

    /// Schedule teardown once and wait for the script to be removed
    Cleanup,
}

/// Everything the subcommands need, wired to the cluster and database drivers.
struct Agent {
    config: AgentConfig,
    instance: InstanceRef,
    provisioning: ProvisioningService,
    cleanup: Arc<CleanupService>,
}

impl Agent {
    async fn connect(config: AgentConfig) -> anyhow::Result<Self> {
        let client = kube::Client::try_default()
            .await
            .context("failed to build cluster client")?;

        let store: Arc<dyn SecretStore> = Arc::new(KubeSecretStore::new(client.clone()));
        let scheduler: Arc<dyn WorkloadScheduler> = Arc::new(KubeWorkloadScheduler::new(client));
        let admin: Arc<dyn AdminConnector> = Arc::new(SqlxAdminConnector::new());

        let resolver = ConnectorResolver::new(Arc::clone(&store));
        let credentials = CredentialStore::new(store);

        let provisioning = ProvisioningService::new(
            resolver.clone(),
            credentials.clone(),
            admin,
            ProvisioningSettings::from_config(&config),
        );
        let cleanup = Arc::new(CleanupService::new(
            resolver,
            credentials,
            scheduler,
            config.teardown.clone(),
            config.timeouts.artifact_grace(),
        ));

        Ok(Self {
            instance: config.instance.instance_ref(),
            config,
            provisioning,
            cleanup,
        })
    }

    async fn provision(&self) -> anyhow::Result<()> {
        let data_source = self
            .provisioning
            .resolve_data_source(&self.instance, &self.config.instance)
            .await
            .with_context(|| format!("failed to configure backing store for {}", self.instance))?;

        publish_data_source(self.config.output.data_source_path.as_deref(), &data_source)
    }

    async fn run(&self) -> anyhow::Result<()> {
        let mut signals = ShutdownSignals::install()?;

        self.provision().await?;

        let lifecycle = LifecycleManager::new();
        if let Some(connector) = self.config.instance.connector() {
            let cleanup = Arc::clone(&self.cleanup);
            let instance = self.instance.clone();
            let connector = connector.to_string();
            lifecycle.register_once(move || async move {
                if let Err(e) = cleanup.cleanup(&instance, &connector).await {
                    tracing::error!(instance = %instance, "Backing store cleanup failed: {}", e);
                }
                cleanup.deferred().drain().await;
            });
        }

        signals.recv().await;

        shutdown(&lifecycle, &self.instance, self.config.timeouts.cleanup()).await;
        Ok(())
    }

    /// One-shot teardown; like shutdown cleanup, failures are only logged.
    async fn cleanup(&self) -> anyhow::Result<()> {
        let connector = self
            .config
            .instance
            .connector()
            .context("cleanup requires a connector")?;

        let work = async {
            if let Err(e) = self.cleanup.cleanup(&self.instance, connector).await {
                tracing::error!(instance = %self.instance, "Backing store cleanup failed: {}", e);
            }
            self.cleanup.deferred().drain().await;
        };

        if tokio::time::timeout(self.config.timeouts.cleanup(), work)
            .await
            .is_err()
        {
            tracing::warn!(
                instance = %self.instance,
                deadline_seconds = self.config.timeouts.cleanup_seconds,
                "Backing store cleanup did not finish before the deadline"
            );
        }
        Ok(())
    }
}

/// Runs the registered cleanup within `deadline`.
///
/// Cleanup trouble is logged and never turns into a failing exit.
async fn shutdown(lifecycle: &LifecycleManager, instance: &InstanceRef, deadline: Duration) {
    match lifecycle.shutdown(deadline).await {
        ShutdownOutcome::Completed | ShutdownOutcome::NothingRegistered => {}
        ShutdownOutcome::TimedOut => {
            tracing::warn!(
                instance = %instance,
                deadline_seconds = deadline.as_secs(),
                "Backing store cleanup did not finish before the deadline"
            );
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AgentConfig::load(cli.config.as_deref())?;
    if let Some(name) = cli.name {
        config.instance.name = name;
    }
    if let Some(namespace) = cli.namespace {
        config.instance.namespace = namespace;
    }
    if let Some(connector) = cli.connector {
        config.instance.connector = connector;
    }
    config.validate()?;

    init_logging(&config.logging.level, &config.logging.format);

    tracing::info!(
        instance = %config.instance.instance_ref(),
        connector = config.instance.connector().unwrap_or("-"),
        "Starting vcstore-agent"
    );

    let agent = Agent::connect(config).await?;

    match cli.command {
        Commands::Run => agent.run().await,
        Commands::Provision => agent.provision().await,
        Commands::Cleanup => agent.cleanup().await,
    }
}

/// `RUST_LOG` wins over the configured level.
fn init_logging(level: &str, format: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
