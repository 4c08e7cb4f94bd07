use std::str::FromStr;

use sqlx::mysql::{MySqlConnectOptions, MySqlSslMode};
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use sqlx::ConnectOptions;
use vcstore_core::{ConnectorDescriptor, CoreError, CoreResult, Postgres};

/// Builds MySQL connect options for the connector's admin account.
///
/// `tls = true` on the connector requires TLS; otherwise TLS is used when the
/// server offers it. Statement logging is off because DDL carries passwords.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] when the port is not numeric.
pub fn mysql_options(
    connector: &ConnectorDescriptor,
    database: Option<&str>,
) -> CoreResult<MySqlConnectOptions> {
    let ssl_mode = if connector.use_tls {
        MySqlSslMode::Required
    } else {
        MySqlSslMode::Preferred
    };

    let mut options = MySqlConnectOptions::new()
        .host(&connector.host)
        .port(connector.port_number()?)
        .username(&connector.admin_user)
        .password(&connector.admin_password)
        .ssl_mode(ssl_mode)
        .disable_statement_logging();
    if let Some(database) = database {
        options = options.database(database);
    }
    Ok(options)
}

/// Builds PostgreSQL connect options for the connector's admin account.
///
/// Without an explicit `database` the connection lands in the `postgres`
/// maintenance database.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] when the port or `sslMode` is invalid.
pub fn postgres_options(
    connector: &ConnectorDescriptor,
    database: Option<&str>,
) -> CoreResult<PgConnectOptions> {
    let ssl_mode = PgSslMode::from_str(&connector.ssl_mode).map_err(|_| {
        CoreError::validation(format!("invalid sslMode `{}`", connector.ssl_mode))
    })?;

    Ok(PgConnectOptions::new()
        .host(&connector.host)
        .port(connector.port_number()?)
        .username(&connector.admin_user)
        .password(&connector.admin_password)
        .database(database.unwrap_or(Postgres::MAINTENANCE_DATABASE))
        .ssl_mode(ssl_mode)
        .disable_statement_logging())
}
