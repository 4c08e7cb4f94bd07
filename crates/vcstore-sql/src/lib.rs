//! `sqlx` administrative connections for MySQL and PostgreSQL servers.

mod connector;
mod options;

pub use connector::SqlxAdminConnector;
pub use options::{mysql_options, postgres_options};
