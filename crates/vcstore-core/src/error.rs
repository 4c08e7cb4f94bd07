use thiserror::Error;

/// Canonical error type for provisioning and teardown operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A connector record or derived value failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Record was not found in the backing key/value store.
    #[error("{entity} `{id}` was not found")]
    NotFound {
        /// Entity type name (e.g. `"connector"`).
        entity: &'static str,
        /// Identifier of the missing entity.
        id: String,
    },

    /// Record already exists and cannot be created again.
    #[error("{entity} `{id}` already exists")]
    AlreadyExists {
        /// Entity type name (e.g. `"credential record"`).
        entity: &'static str,
        /// Identifier that conflicts.
        id: String,
    },

    /// Optimistic concurrency check failed on update.
    #[error("{entity} `{id}` was modified concurrently")]
    Conflict {
        /// Entity type name.
        entity: &'static str,
        /// Identifier of the contended entity.
        id: String,
    },

    /// The administrative endpoint could not be reached or refused the login.
    #[error("cannot reach {endpoint}: {message}")]
    Connectivity {
        /// `host:port` of the database server.
        endpoint: String,
        /// Driver-level failure message.
        message: String,
    },

    /// A DDL/DCL statement failed on the database server.
    #[error("{purpose} `{object}` failed: {message}")]
    Statement {
        /// What the statement was doing (e.g. `"create database"`).
        purpose: &'static str,
        /// Database object the statement targeted.
        object: String,
        /// Server-reported failure message.
        message: String,
    },

    /// Writing or deleting a persisted record failed.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// A bounded operation exceeded its deadline.
    #[error("{operation} timed out")]
    Timeout {
        /// Operation that was cut off.
        operation: &'static str,
    },

    /// Unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Creates a `Validation` variant.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a `NotFound` variant.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Creates an `AlreadyExists` variant.
    #[must_use]
    pub fn already_exists(entity: &'static str, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity,
            id: id.into(),
        }
    }

    /// Creates a `Conflict` variant.
    #[must_use]
    pub fn conflict(entity: &'static str, id: impl Into<String>) -> Self {
        Self::Conflict {
            entity,
            id: id.into(),
        }
    }

    /// Creates a `Connectivity` variant.
    #[must_use]
    pub fn connectivity(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connectivity {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Creates a `Statement` variant.
    #[must_use]
    pub fn statement(
        purpose: &'static str,
        object: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Statement {
            purpose,
            object: object.into(),
            message: message.into(),
        }
    }

    /// Creates an `Internal` variant.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns `true` for `NotFound`.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` for `AlreadyExists`.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Returns `true` for `Conflict`.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Convenient result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
