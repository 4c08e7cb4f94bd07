//! Per-dialect data-source strings and DDL/DCL statement builders.
//!
//! Adapters are pure: they only format strings. Executing the statements is
//! the job of an [`AdminConnector`](crate::traits::AdminConnector).

mod mysql;
mod postgres;

pub use mysql::MySql;
pub use postgres::Postgres;

use crate::connector::{ConnectorDescriptor, Dialect};
use crate::naming::IdentifierLimits;

/// Query returning a single boolean; when it yields `true` the guarded
/// statement is skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistenceProbe {
    /// SQL with exactly one positional parameter.
    pub sql: &'static str,
    /// Value bound to the parameter.
    pub parameter: String,
}

/// One administrative statement plus the context needed to report it.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminStatement {
    /// What the statement does, e.g. `"create database"`.
    pub purpose: &'static str,
    /// Database object it targets.
    pub object: String,
    pub sql: String,
    pub skip_if_exists: Option<ExistenceProbe>,
    /// Failure is logged and ignored instead of aborting the sequence.
    pub tolerate_failure: bool,
}

impl AdminStatement {
    pub(crate) fn new(purpose: &'static str, object: &str, sql: String) -> Self {
        Self {
            purpose,
            object: object.to_string(),
            sql,
            skip_if_exists: None,
            tolerate_failure: false,
        }
    }

    pub(crate) fn unless_exists(mut self, sql: &'static str, parameter: &str) -> Self {
        self.skip_if_exists = Some(ExistenceProbe {
            sql,
            parameter: parameter.to_string(),
        });
        self
    }

    pub(crate) fn tolerating_failure(mut self) -> Self {
        self.tolerate_failure = true;
        self
    }
}

// Statements can embed passwords.
impl std::fmt::Debug for AdminStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminStatement")
            .field("purpose", &self.purpose)
            .field("object", &self.object)
            .field("guarded", &self.skip_if_exists.is_some())
            .field("tolerate_failure", &self.tolerate_failure)
            .finish_non_exhaustive()
    }
}

/// Capability set every supported dialect provides.
pub trait DialectAdapter: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Longest database and role names the server accepts.
    fn identifier_limits(&self) -> IdentifierLimits;

    /// Data source for the connector's administrative account.
    fn admin_data_source(&self, connector: &ConnectorDescriptor) -> String;

    /// Data source for an instance's own database and role.
    fn instance_data_source(
        &self,
        connector: &ConnectorDescriptor,
        database: &str,
        user: &str,
        password: &str,
    ) -> String;

    /// Ordered, idempotent statements creating the database and role,
    /// granting privileges, and setting the role's password.
    fn create_statements(&self, database: &str, user: &str, password: &str)
        -> Vec<AdminStatement>;

    /// Statements that must run while connected to the new database itself.
    /// Failures here are not fatal to provisioning.
    fn schema_grant_statements(&self, _user: &str) -> Vec<AdminStatement> {
        Vec::new()
    }

    /// Ordered statements removing the database and role.
    fn drop_statements(&self, database: &str, user: &str) -> Vec<AdminStatement>;
}

/// Quotes a string literal by doubling embedded single quotes.
pub(crate) fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
