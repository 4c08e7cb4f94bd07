//! Provisioning against in-memory fakes of the secret store and database.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use vcstore_core::identity::labels;
use vcstore_core::{AdminConnector, CoreError, Dialect, ProvisionedIdentity};
use vcstore_service::{InstanceConfig, ProvisioningService, ProvisioningSettings};

struct Harness {
    store: Arc<MemorySecretStore>,
    server: Arc<RecordingConnector>,
    service: ProvisioningService,
}

fn harness_with(dialect: Option<Dialect>, settings: ProvisioningSettings) -> Harness {
    let store = MemorySecretStore::new();
    if let Some(dialect) = dialect {
        store.insert(connector_record("ns1", dialect));
    }
    let server = RecordingConnector::new();
    let service = ProvisioningService::new(
        resolver(&store),
        credentials(&store),
        Arc::clone(&server) as Arc<dyn AdminConnector>,
        settings,
    );
    Harness {
        store,
        server,
        service,
    }
}

fn harness(dialect: Dialect) -> Harness {
    harness_with(Some(dialect), ProvisioningSettings::default())
}

#[tokio::test]
async fn test_provision_postgres_end_to_end() {
    let h = harness(Dialect::Postgres);

    let identity = h.service.provision(&team_a(), CONNECTOR_NAME).await.unwrap();

    let suffix = identity
        .database_name
        .strip_prefix("vcluster_team_a_")
        .expect("database name carries the sanitized instance name");
    assert_eq!(suffix.len(), 8);
    assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(identity.database_user, "vcluster_team_a");
    assert_eq!(identity.database_password.len(), 32);
    assert!(identity
        .database_password
        .chars()
        .all(|c| c.is_ascii_alphanumeric()));
    assert_eq!(
        identity.data_source,
        format!(
            "postgres://vcluster_team_a:{}@pg.example:5432/{}?sslmode=disable",
            identity.database_password, identity.database_name
        )
    );

    let executed = h.server.executed();
    let maintenance: Vec<_> = executed
        .iter()
        .filter(|e| e.database.is_none())
        .map(|e| e.purpose)
        .collect();
    assert_eq!(
        maintenance,
        vec![
            "create database",
            "create user",
            "rotate password",
            "grant privileges"
        ]
    );
    let in_instance_db: Vec<_> = executed
        .iter()
        .filter(|e| e.database.as_deref() == Some(identity.database_name.as_str()))
        .map(|e| e.purpose)
        .collect();
    assert_eq!(
        in_instance_db,
        vec!["grant schema privileges", "grant create on schema"]
    );

    assert_eq!(h.server.connects(), 2);
    assert_eq!(h.server.closes(), 2);

    let record = h
        .store
        .record("ns1", "vc-db-team-a")
        .expect("credential record persisted");
    assert_eq!(record.labels.get(labels::APP).map(String::as_str), Some("vcluster"));
    assert_eq!(record.labels.get(labels::NAME).map(String::as_str), Some("team-a"));
    assert_eq!(
        record.labels.get(labels::PROVISIONED).map(String::as_str),
        Some("true")
    );
    assert_eq!(
        ProvisionedIdentity::from_credential_record(&record).unwrap(),
        identity
    );
}

#[tokio::test]
async fn test_provision_mysql_uses_single_connection() {
    let h = harness(Dialect::Mysql);

    let identity = h.service.provision(&team_a(), CONNECTOR_NAME).await.unwrap();

    assert_eq!(
        identity.data_source,
        format!(
            "mysql://vcluster_team_a:{}@tcp(mysql.example:3306)/{}",
            identity.database_password, identity.database_name
        )
    );
    assert_eq!(
        h.server.purposes(),
        vec![
            "create database",
            "create user",
            "rotate password",
            "grant privileges",
            "flush privileges"
        ]
    );
    assert_eq!(h.server.connects(), 1);
}

#[tokio::test]
async fn test_reprovision_rotates_password_and_keeps_names() {
    let h = harness(Dialect::Postgres);
    let instance = team_a();

    let first = h.service.provision(&instance, CONNECTOR_NAME).await.unwrap();
    let executed_after_first = h.server.executed().len();
    let second = h.service.provision(&instance, CONNECTOR_NAME).await.unwrap();

    assert_eq!(first.database_name, second.database_name);
    assert_eq!(first.database_user, second.database_user);
    assert_ne!(first.database_password, second.database_password);

    // Existing database and role are kept; only the password and grants run again.
    let rerun: Vec<_> = h.server.executed()[executed_after_first..]
        .iter()
        .map(|e| e.purpose)
        .collect();
    assert!(!rerun.contains(&"create database"));
    assert!(!rerun.contains(&"create user"));
    let rotation = h.server.executed()[executed_after_first..]
        .iter()
        .find(|e| e.purpose == "rotate password")
        .cloned()
        .expect("password rotated");
    assert!(rotation.sql.contains(&second.database_password));

    let record = h.store.record("ns1", "vc-db-team-a").unwrap();
    assert_eq!(
        ProvisionedIdentity::from_credential_record(&record)
            .unwrap()
            .database_password,
        second.database_password
    );
}

#[tokio::test]
async fn test_missing_connector_is_not_found() {
    let h = harness_with(None, ProvisioningSettings::default());

    let err = h
        .service
        .provision(&team_a(), CONNECTOR_NAME)
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(h.server.connects(), 0);
}

#[tokio::test]
async fn test_unsupported_dialect_is_rejected() {
    let h = harness_with(None, ProvisioningSettings::default());
    h.store.insert(
        connector_record("ns1", Dialect::Postgres)
            .with_entry(vcstore_core::ConnectorDescriptor::FIELD_TYPE, "oracle"),
    );

    let err = h
        .service
        .provision(&team_a(), CONNECTOR_NAME)
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Validation(_)));
    assert!(err.to_string().contains("unsupported database type"));
    assert_eq!(h.server.connects(), 0);
}

#[tokio::test]
async fn test_unreachable_server_fails_without_persisting() {
    let h = harness(Dialect::Postgres);
    h.server.make_unreachable();

    let err = h
        .service
        .provision(&team_a(), CONNECTOR_NAME)
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Connectivity { .. }));
    assert!(err.to_string().contains("pg.example:5432"));
    assert!(h.store.record("ns1", "vc-db-team-a").is_none());
}

#[tokio::test]
async fn test_statement_failure_aborts_and_closes_connection() {
    let h = harness(Dialect::Postgres);
    h.server.fail_purpose("grant privileges");

    let err = h
        .service
        .provision(&team_a(), CONNECTOR_NAME)
        .await
        .unwrap_err();

    match err {
        CoreError::Statement { purpose, .. } => assert_eq!(purpose, "grant privileges"),
        other => panic!("expected statement error, got {other:?}"),
    }
    assert_eq!(
        h.server.purposes(),
        vec!["create database", "create user", "rotate password"]
    );
    assert_eq!(h.server.closes(), 1);
    assert!(h.store.record("ns1", "vc-db-team-a").is_none());
}

#[tokio::test]
async fn test_schema_grant_failure_is_not_fatal() {
    let granted = harness(Dialect::Postgres);
    let with_grants = granted
        .service
        .provision(&team_a(), CONNECTOR_NAME)
        .await
        .unwrap();

    let denied = harness(Dialect::Postgres);
    denied.server.fail_purpose("grant schema privileges");
    let without_grants = denied
        .service
        .provision(&team_a(), CONNECTOR_NAME)
        .await
        .unwrap();

    assert!(!denied.server.purposes().contains(&"grant create on schema"));
    assert!(denied.store.record("ns1", "vc-db-team-a").is_some());

    assert_eq!(with_grants.database_name, without_grants.database_name);
    assert_eq!(with_grants.database_user, without_grants.database_user);
    assert_eq!(
        with_grants
            .data_source
            .replace(&with_grants.database_password, "<password>"),
        without_grants
            .data_source
            .replace(&without_grants.database_password, "<password>")
    );
}

#[tokio::test(start_paused = true)]
async fn test_statement_timeout_names_statement() {
    let h = harness_with(
        Some(Dialect::Mysql),
        ProvisioningSettings {
            statement_timeout: Duration::from_secs(30),
            ..ProvisioningSettings::default()
        },
    );
    h.server
        .delay_purpose("grant privileges", Duration::from_secs(120));

    let err = h
        .service
        .provision(&team_a(), CONNECTOR_NAME)
        .await
        .unwrap_err();

    match &err {
        CoreError::Statement {
            purpose, object, ..
        } => {
            assert_eq!(*purpose, "grant privileges");
            assert!(object.starts_with("vcluster_team_a_"));
        }
        other => panic!("expected statement error, got {other:?}"),
    }
    assert!(err.to_string().contains("timed out after 30s"));
    assert_eq!(h.server.closes(), 1);
    assert!(h.store.record("ns1", "vc-db-team-a").is_none());
}

#[tokio::test]
async fn test_credential_persistence_failure_is_not_fatal() {
    let h = harness(Dialect::Mysql);
    h.store.fail_writes();

    let identity = h.service.provision(&team_a(), CONNECTOR_NAME).await.unwrap();

    assert!(!identity.data_source.is_empty());
    assert!(h.store.record("ns1", "vc-db-team-a").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_connect_timeout() {
    let h = harness_with(
        Some(Dialect::Postgres),
        ProvisioningSettings {
            connect_timeout: Duration::from_secs(10),
            ..ProvisioningSettings::default()
        },
    );
    h.server.delay_connect(Duration::from_secs(60));

    let err = h
        .service
        .provision(&team_a(), CONNECTOR_NAME)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CoreError::Timeout {
            operation: "admin connect"
        }
    ));
}

#[tokio::test]
async fn test_longer_password_length_is_honored() {
    let h = harness_with(
        Some(Dialect::Mysql),
        ProvisioningSettings {
            password_length: 48,
            ..ProvisioningSettings::default()
        },
    );

    let identity = h.service.provision(&team_a(), CONNECTOR_NAME).await.unwrap();
    assert_eq!(identity.database_password.len(), 48);
}

#[tokio::test]
async fn test_concurrent_provisioning_of_one_instance() {
    let h = harness(Dialect::Mysql);
    let service = Arc::new(h.service);

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.provision(&team_a(), CONNECTOR_NAME).await })
        })
        .collect();

    let mut passwords = Vec::new();
    for task in tasks {
        passwords.push(task.await.unwrap().unwrap().database_password);
    }

    let stored = ProvisionedIdentity::from_credential_record(
        &h.store.record("ns1", "vc-db-team-a").unwrap(),
    )
    .unwrap();
    assert!(passwords.contains(&stored.database_password));
    assert_eq!(h.server.connects(), 4);
}

#[tokio::test]
async fn test_connector_takes_precedence_over_explicit_data_source() {
    let h = harness(Dialect::Mysql);
    let config = InstanceConfig {
        name: "team-a".to_string(),
        namespace: "ns1".to_string(),
        connector: CONNECTOR_NAME.to_string(),
        data_source: "mysql://legacy@tcp(old:3306)/kine".to_string(),
    };

    let data_source = h
        .service
        .resolve_data_source(&team_a(), &config)
        .await
        .unwrap();

    assert!(data_source.starts_with("mysql://vcluster_team_a:"));
}

#[tokio::test]
async fn test_explicit_data_source_without_connector() {
    let h = harness_with(None, ProvisioningSettings::default());
    let mut config = InstanceConfig {
        data_source: "mysql://legacy@tcp(old:3306)/kine".to_string(),
        ..InstanceConfig::default()
    };

    let data_source = h
        .service
        .resolve_data_source(&team_a(), &config)
        .await
        .unwrap();
    assert_eq!(data_source, "mysql://legacy@tcp(old:3306)/kine");
    assert_eq!(h.server.connects(), 0);

    config.data_source.clear();
    let err = h
        .service
        .resolve_data_source(&team_a(), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
}
