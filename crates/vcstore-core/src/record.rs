use std::collections::BTreeMap;

/// Namespaced, labeled key/value record as held by the host cluster's
/// secret store.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretRecord {
    /// Record name, unique within its namespace.
    pub name: String,
    /// Namespace the record lives in.
    pub namespace: String,
    /// Discovery labels.
    pub labels: BTreeMap<String, String>,
    /// Opaque payload entries.
    pub data: BTreeMap<String, Vec<u8>>,
}

impl SecretRecord {
    /// Creates an empty record with the given coordinates.
    #[must_use]
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// Adds a label, builder style.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Adds a UTF-8 payload entry, builder style.
    #[must_use]
    pub fn with_entry(mut self, key: impl Into<String>, value: impl AsRef<str>) -> Self {
        self.data
            .insert(key.into(), value.as_ref().as_bytes().to_vec());
        self
    }

    /// Returns a payload entry decoded as UTF-8, if present.
    ///
    /// Invalid UTF-8 is replaced lossily; connector fields are plain text.
    #[must_use]
    pub fn entry(&self, key: &str) -> Option<String> {
        self.data
            .get(key)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }
}

// Payload values are credentials; only keys are shown.
impl std::fmt::Debug for SecretRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretRecord")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("labels", &self.labels)
            .field("keys", &self.data.keys().collect::<Vec<_>>())
            .finish()
    }
}
