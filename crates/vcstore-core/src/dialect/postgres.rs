use super::{quote_literal, AdminStatement, DialectAdapter};
use crate::connector::{ConnectorDescriptor, Dialect};
use crate::naming::{sanitize_identifier, IdentifierLimits};

const DATABASE_EXISTS: &str = "SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)";
const ROLE_EXISTS: &str = "SELECT EXISTS(SELECT 1 FROM pg_roles WHERE rolname = $1)";

/// PostgreSQL adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl Postgres {
    /// Database the administrative connection lands in.
    pub const MAINTENANCE_DATABASE: &'static str = "postgres";

    fn ident(name: &str) -> String {
        format!("\"{}\"", sanitize_identifier(name))
    }
}

impl DialectAdapter for Postgres {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn identifier_limits(&self) -> IdentifierLimits {
        IdentifierLimits {
            database: 63,
            user: 63,
        }
    }

    fn admin_data_source(&self, connector: &ConnectorDescriptor) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            connector.admin_user,
            connector.admin_password,
            connector.host,
            connector.port,
            Self::MAINTENANCE_DATABASE,
            connector.ssl_mode
        )
    }

    fn instance_data_source(
        &self,
        connector: &ConnectorDescriptor,
        database: &str,
        user: &str,
        password: &str,
    ) -> String {
        format!(
            "postgres://{user}:{password}@{}:{}/{database}?sslmode={}",
            connector.host, connector.port, connector.ssl_mode
        )
    }

    fn create_statements(
        &self,
        database: &str,
        user: &str,
        password: &str,
    ) -> Vec<AdminStatement> {
        let db = Self::ident(database);
        let role = Self::ident(user);
        let secret = quote_literal(password);
        vec![
            // CREATE DATABASE has no IF NOT EXISTS form.
            AdminStatement::new("create database", database, format!("CREATE DATABASE {db}"))
                .unless_exists(DATABASE_EXISTS, &sanitize_identifier(database)),
            AdminStatement::new(
                "create user",
                user,
                format!("CREATE USER {role} WITH PASSWORD {secret}"),
            )
            .unless_exists(ROLE_EXISTS, &sanitize_identifier(user)),
            AdminStatement::new(
                "rotate password",
                user,
                format!("ALTER USER {role} WITH PASSWORD {secret}"),
            ),
            AdminStatement::new(
                "grant privileges",
                database,
                format!("GRANT ALL PRIVILEGES ON DATABASE {db} TO {role}"),
            ),
        ]
    }

    fn schema_grant_statements(&self, user: &str) -> Vec<AdminStatement> {
        let role = Self::ident(user);
        vec![
            AdminStatement::new(
                "grant schema privileges",
                "public",
                format!("GRANT ALL ON SCHEMA public TO {role}"),
            ),
            AdminStatement::new(
                "grant create on schema",
                "public",
                format!("GRANT CREATE ON SCHEMA public TO {role}"),
            ),
        ]
    }

    fn drop_statements(&self, database: &str, user: &str) -> Vec<AdminStatement> {
        vec![
            AdminStatement::new(
                "terminate connections",
                database,
                format!(
                    "SELECT pg_terminate_backend(pid) FROM pg_stat_activity \
                     WHERE datname = {} AND pid <> pg_backend_pid()",
                    quote_literal(&sanitize_identifier(database))
                ),
            )
            .tolerating_failure(),
            AdminStatement::new(
                "drop database",
                database,
                format!("DROP DATABASE IF EXISTS {}", Self::ident(database)),
            ),
            AdminStatement::new(
                "drop user",
                user,
                format!("DROP USER IF EXISTS {}", Self::ident(user)),
            ),
        ]
    }
}
