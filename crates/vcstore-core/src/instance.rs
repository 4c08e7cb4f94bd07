use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of one virtual-cluster control plane: `(namespace, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceRef {
    /// Instance name (the virtual cluster's release name).
    pub name: String,
    /// Host namespace the instance runs in.
    pub namespace: String,
}

impl InstanceRef {
    /// Creates a new instance reference.
    #[must_use]
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// Name of the credential record persisted for this instance.
    #[must_use]
    pub fn credential_record_name(&self) -> String {
        format!("vc-db-{}", self.name)
    }

    /// Name shared by the teardown job and its script artifact.
    #[must_use]
    pub fn teardown_name(&self) -> String {
        format!("vc-db-cleanup-{}", self.name)
    }
}

impl fmt::Display for InstanceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
