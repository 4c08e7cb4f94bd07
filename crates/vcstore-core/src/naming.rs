//! Deterministic naming and credential generation for provisioned databases.

use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;

use crate::instance::InstanceRef;

/// Prefix shared by every generated database and role name.
pub const NAME_PREFIX: &str = "vcluster_";

/// Shortest password [`random_password`] will ever produce.
pub const MIN_PASSWORD_LENGTH: usize = 32;

/// Hex characters in a [`deterministic_suffix`].
pub const SUFFIX_LENGTH: usize = 8;

/// Strips quote characters, semicolons, and `--` sequences, then rewrites
/// hyphens to underscores.
///
/// Applied to names derived from instance metadata so they stay valid
/// unquoted identifiers; it is not a filter for arbitrary user input.
#[must_use]
pub fn sanitize_identifier(identifier: &str) -> String {
    identifier
        .replace('`', "")
        .replace('\'', "")
        .replace('"', "")
        .replace(';', "")
        .replace("--", "")
        .replace('-', "_")
}

/// Fixed-width hex digest of `namespace/name`.
///
/// MD5 is used for spread, not secrecy: the suffix only has to keep two
/// namespaces that reuse an instance name from colliding.
#[must_use]
pub fn deterministic_suffix(namespace: &str, name: &str) -> String {
    short_hash(&format!("{namespace}/{name}"))
}

fn short_hash(input: &str) -> String {
    let digest = md5::compute(input.as_bytes());
    hex::encode(&digest.0[..SUFFIX_LENGTH / 2])
}

/// Generates an alphanumeric password from the operating system CSPRNG.
///
/// Lengths below [`MIN_PASSWORD_LENGTH`] are raised to the minimum.
#[must_use]
pub fn random_password(length: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(length.max(MIN_PASSWORD_LENGTH))
        .map(char::from)
        .collect()
}

/// Maximum identifier lengths (in bytes) a dialect accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentifierLimits {
    pub database: usize,
    pub user: usize,
}

/// Database and role names owned by one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceNames {
    pub database: String,
    pub user: String,
}

impl InstanceNames {
    /// Derives the names for `instance` within the given limits.
    ///
    /// The database name depends on both namespace and name; the user
    /// depends on the name alone. Both are pure functions of their input.
    #[must_use]
    pub fn derive(instance: &InstanceRef, limits: IdentifierLimits) -> Self {
        Self {
            database: database_name(instance, limits.database),
            user: database_user(&instance.name, limits.user),
        }
    }
}

/// `vcluster_<sanitized name>_<8 hex>`, with the name part shortened to fit
/// `max_len`.
#[must_use]
pub fn database_name(instance: &InstanceRef, max_len: usize) -> String {
    let suffix = deterministic_suffix(&instance.namespace, &instance.name);
    let budget = max_len.saturating_sub(NAME_PREFIX.len() + 1 + suffix.len());
    let sanitized = sanitize_identifier(&instance.name);
    format!(
        "{NAME_PREFIX}{}_{suffix}",
        truncate_on_char_boundary(&sanitized, budget)
    )
}

/// `vcluster_<sanitized name>`; names that do not fit `max_len` are
/// shortened and suffixed with a hash of the instance name.
#[must_use]
pub fn database_user(instance_name: &str, max_len: usize) -> String {
    let sanitized = sanitize_identifier(instance_name);
    if NAME_PREFIX.len() + sanitized.len() <= max_len {
        return format!("{NAME_PREFIX}{sanitized}");
    }

    let suffix = short_hash(instance_name);
    let budget = max_len.saturating_sub(NAME_PREFIX.len() + 1 + suffix.len());
    format!(
        "{NAME_PREFIX}{}_{suffix}",
        truncate_on_char_boundary(&sanitized, budget)
    )
}

fn truncate_on_char_boundary(value: &str, max_bytes: usize) -> &str {
    if value.len() <= max_bytes {
        return value;
    }
    let mut end = max_bytes;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}
