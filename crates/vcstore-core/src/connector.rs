use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dialect::{DialectAdapter, MySql, Postgres};
use crate::error::{CoreError, CoreResult};
use crate::record::SecretRecord;

/// Relational database product behind a connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// MySQL 8.0+ (or a wire-compatible server).
    Mysql,
    /// PostgreSQL.
    Postgres,
}

impl Dialect {
    /// Returns the canonical lowercase tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mysql => "mysql",
            Self::Postgres => "postgres",
        }
    }

    /// Port used when the connector record omits one.
    #[must_use]
    pub const fn default_port(&self) -> &'static str {
        match self {
            Self::Mysql => "3306",
            Self::Postgres => "5432",
        }
    }

    /// Returns the statement and data-source builder for this dialect.
    #[must_use]
    pub fn adapter(&self) -> &'static dyn DialectAdapter {
        match self {
            Self::Mysql => &MySql,
            Self::Postgres => &Postgres,
        }
    }
}

impl FromStr for Dialect {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" => Ok(Self::Mysql),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "" => Err(CoreError::validation("connector field `type` is required")),
            other => Err(CoreError::validation(format!(
                "unsupported database type `{other}` (must be `mysql` or `postgres`)"
            ))),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Admin-reachable database server described by a connector record.
///
/// Built fresh for every provisioning or cleanup call and never mutated.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectorDescriptor {
    pub dialect: Dialect,
    pub host: String,
    pub port: String,
    pub admin_user: String,
    pub admin_password: String,
    /// Postgres `sslmode`; `"disable"` unless the record says otherwise.
    pub ssl_mode: String,
    /// MySQL `tls` flag.
    pub use_tls: bool,
    // Carried for completeness; no adapter consumes the certificate blobs yet.
    pub ca_cert: Option<String>,
    pub client_cert: Option<String>,
    pub client_key: Option<String>,
}

impl ConnectorDescriptor {
    pub const FIELD_TYPE: &'static str = "type";
    pub const FIELD_HOST: &'static str = "host";
    pub const FIELD_PORT: &'static str = "port";
    pub const FIELD_ADMIN_USER: &'static str = "adminUser";
    pub const FIELD_ADMIN_PASSWORD: &'static str = "adminPassword";
    pub const FIELD_SSL_MODE: &'static str = "sslMode";
    pub const FIELD_TLS: &'static str = "tls";
    pub const FIELD_CA_CERT: &'static str = "caCert";
    pub const FIELD_CLIENT_CERT: &'static str = "clientCert";
    pub const FIELD_CLIENT_KEY: &'static str = "clientKey";

    /// Default Postgres `sslmode`.
    pub const DEFAULT_SSL_MODE: &'static str = "disable";

    /// Parses and validates a connector record.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] when the dialect is missing or
    /// unsupported, or when host, port, or admin credentials are empty after
    /// defaults are applied.
    pub fn from_record(record: &SecretRecord) -> CoreResult<Self> {
        let dialect: Dialect = record
            .entry(Self::FIELD_TYPE)
            .unwrap_or_default()
            .parse()?;

        let port = record
            .entry(Self::FIELD_PORT)
            .unwrap_or_else(|| dialect.default_port().to_string());

        let descriptor = Self {
            dialect,
            host: record.entry(Self::FIELD_HOST).unwrap_or_default(),
            port,
            admin_user: record.entry(Self::FIELD_ADMIN_USER).unwrap_or_default(),
            admin_password: record
                .entry(Self::FIELD_ADMIN_PASSWORD)
                .unwrap_or_default(),
            ssl_mode: record
                .entry(Self::FIELD_SSL_MODE)
                .unwrap_or_else(|| Self::DEFAULT_SSL_MODE.to_string()),
            use_tls: record.entry(Self::FIELD_TLS).as_deref() == Some("true"),
            ca_cert: record.entry(Self::FIELD_CA_CERT),
            client_cert: record.entry(Self::FIELD_CLIENT_CERT),
            client_key: record.entry(Self::FIELD_CLIENT_KEY),
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Checks the required fields are non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] naming the first empty field.
    pub fn validate(&self) -> CoreResult<()> {
        let required = [
            (Self::FIELD_HOST, &self.host),
            (Self::FIELD_PORT, &self.port),
            (Self::FIELD_ADMIN_USER, &self.admin_user),
            (Self::FIELD_ADMIN_PASSWORD, &self.admin_password),
        ];
        for (field, value) in required {
            if value.is_empty() {
                return Err(CoreError::validation(format!(
                    "connector field `{field}` cannot be empty"
                )));
            }
        }
        Ok(())
    }

    /// `host:port` of the server, for logs and error messages.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Numeric port.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] when the port is not a valid `u16`.
    pub fn port_number(&self) -> CoreResult<u16> {
        self.port
            .parse()
            .map_err(|_| CoreError::validation(format!("invalid port `{}`", self.port)))
    }
}

impl fmt::Debug for ConnectorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorDescriptor")
            .field("dialect", &self.dialect)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("admin_user", &self.admin_user)
            .field("admin_password", &"<redacted>")
            .field("ssl_mode", &self.ssl_mode)
            .field("use_tls", &self.use_tls)
            .field("ca_cert", &self.ca_cert.is_some())
            .field("client_cert", &self.client_cert.is_some())
            .field("client_key", &self.client_key.is_some())
            .finish()
    }
}
