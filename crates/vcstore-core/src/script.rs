//! Self-contained shell scripts that run dialect statements through the
//! dialect's stock command-line client.

use crate::connector::{ConnectorDescriptor, Dialect};
use crate::dialect::{AdminStatement, Postgres};

/// Quotes `value` for POSIX `sh` using single quotes.
#[must_use]
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Renders a `/bin/sh` script executing `statements` in order against the
/// connector's server with its admin credentials.
///
/// The admin password travels through the client's environment variable, so
/// it never shows up in a process listing. Statements marked
/// `tolerate_failure` may fail without stopping the script.
#[must_use]
pub fn render_teardown_script(
    connector: &ConnectorDescriptor,
    statements: &[AdminStatement],
) -> String {
    let mut script = String::from("#!/bin/sh\nset -e\n");

    match connector.dialect {
        Dialect::Postgres => {
            script.push_str(&format!(
                "export PGPASSWORD={}\n",
                shell_quote(&connector.admin_password)
            ));
            script.push_str(&format!(
                "export PGSSLMODE={}\n",
                shell_quote(&connector.ssl_mode)
            ));
        }
        Dialect::Mysql => {
            script.push_str(&format!(
                "export MYSQL_PWD={}\n",
                shell_quote(&connector.admin_password)
            ));
        }
    }

    let client = client_invocation(connector);
    for statement in statements {
        script.push_str(&format!(
            "echo {}\n",
            shell_quote(&format!("{} {}...", statement.purpose, statement.object))
        ));
        script.push_str(&format!("{client} {}", shell_quote(&statement.sql)));
        if statement.tolerate_failure {
            script.push_str(" || true");
        }
        script.push('\n');
    }

    script.push_str("echo 'Cleanup completed successfully'\n");
    script
}

fn client_invocation(connector: &ConnectorDescriptor) -> String {
    let host = shell_quote(&connector.host);
    let port = shell_quote(&connector.port);
    let user = shell_quote(&connector.admin_user);
    match connector.dialect {
        Dialect::Postgres => format!(
            "psql -v ON_ERROR_STOP=1 -h {host} -p {port} -U {user} -d {} -c",
            Postgres::MAINTENANCE_DATABASE
        ),
        Dialect::Mysql => {
            let tls = if connector.use_tls {
                " --ssl-mode=REQUIRED"
            } else {
                ""
            };
            format!("mysql -h {host} -P {port} -u {user}{tls} -e")
        }
    }
}
