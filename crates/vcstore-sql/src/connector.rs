use async_trait::async_trait;
use sqlx::mysql::MySqlConnection;
use sqlx::postgres::PgConnection;
use sqlx::{Connection, Executor};
use tracing::debug;
use vcstore_core::{
    AdminConnector, AdminSession, AdminStatement, ConnectorDescriptor, CoreError, CoreResult,
    Dialect,
};

use crate::options::{mysql_options, postgres_options};

/// [`AdminConnector`] backed by a single, unpooled `sqlx` connection per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlxAdminConnector;

impl SqlxAdminConnector {
    /// Creates a new connector.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AdminConnector for SqlxAdminConnector {
    async fn connect(
        &self,
        connector: &ConnectorDescriptor,
        database: Option<&str>,
    ) -> CoreResult<Box<dyn AdminSession>> {
        let endpoint = connector.endpoint();
        let unreachable = |err: sqlx::Error| CoreError::connectivity(&endpoint, err.to_string());

        let session = match connector.dialect {
            Dialect::Mysql => {
                let options = mysql_options(connector, database)?;
                let mut conn = MySqlConnection::connect_with(&options)
                    .await
                    .map_err(unreachable)?;
                conn.ping().await.map_err(unreachable)?;
                SqlxSession::MySql(conn)
            }
            Dialect::Postgres => {
                let options = postgres_options(connector, database)?;
                let mut conn = PgConnection::connect_with(&options)
                    .await
                    .map_err(unreachable)?;
                conn.ping().await.map_err(unreachable)?;
                SqlxSession::Postgres(conn)
            }
        };

        debug!(
            dialect = %connector.dialect,
            endpoint = %endpoint,
            database = database.unwrap_or("<default>"),
            "admin connection established"
        );
        Ok(Box::new(session))
    }
}

enum SqlxSession {
    MySql(MySqlConnection),
    Postgres(PgConnection),
}

impl SqlxSession {
    async fn exists(&mut self, statement: &AdminStatement) -> Result<bool, sqlx::Error> {
        let Some(probe) = &statement.skip_if_exists else {
            return Ok(false);
        };
        match self {
            Self::MySql(conn) => {
                let found: i64 = sqlx::query_scalar(probe.sql)
                    .bind(probe.parameter.as_str())
                    .fetch_one(&mut *conn)
                    .await?;
                Ok(found != 0)
            }
            Self::Postgres(conn) => {
                sqlx::query_scalar(probe.sql)
                    .bind(probe.parameter.as_str())
                    .fetch_one(&mut *conn)
                    .await
            }
        }
    }

    // Unparameterized text protocol: CREATE DATABASE and FLUSH PRIVILEGES
    // cannot be prepared.
    async fn run(&mut self, sql: &str) -> Result<(), sqlx::Error> {
        match self {
            Self::MySql(conn) => conn.execute(sql).await.map(|_| ()),
            Self::Postgres(conn) => conn.execute(sql).await.map(|_| ()),
        }
    }
}

#[async_trait]
impl AdminSession for SqlxSession {
    async fn execute(&mut self, statement: &AdminStatement) -> CoreResult<()> {
        let exists = self
            .exists(statement)
            .await
            .map_err(|err| map_sqlx_error(statement, err))?;
        if exists {
            debug!(
                purpose = statement.purpose,
                object = %statement.object,
                "object already exists, skipping"
            );
            return Ok(());
        }

        self.run(&statement.sql)
            .await
            .map_err(|err| map_sqlx_error(statement, err))
    }

    async fn close(self: Box<Self>) -> CoreResult<()> {
        let result = match *self {
            Self::MySql(conn) => conn.close().await,
            Self::Postgres(conn) => conn.close().await,
        };
        result.map_err(|err| CoreError::internal(format!("closing admin connection: {err}")))
    }
}

fn map_sqlx_error(statement: &AdminStatement, err: sqlx::Error) -> CoreError {
    let message = match err {
        sqlx::Error::Database(db_err) => db_err.message().to_string(),
        other => other.to_string(),
    };
    CoreError::statement(statement.purpose, &statement.object, message)
}
