//! Domain structs for the storage layer.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const NEW_DOCUMENT_SUFFIX: &str = "new";

/// Logical identifier of the document a snapshot belongs to.
///
/// Editors derive it from the entity being edited: `post_42` for an
/// existing post, `post_new` for one that has no server id yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DraftKey(String);

impl DraftKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn existing(entity: &str, id: impl fmt::Display) -> Self {
        Self(format!("{entity}_{id}"))
    }

    pub fn new_document(entity: &str) -> Self {
        Self(format!("{entity}_{NEW_DOCUMENT_SUFFIX}"))
    }

    pub fn for_entity(entity: &str, id: Option<&str>) -> Self {
        match id {
            Some(id) if !id.is_empty() => Self::existing(entity, id),
            _ => Self::new_document(entity),
        }
    }

    pub fn is_new(&self) -> bool {
        self.0
            .rsplit_once('_')
            .is_some_and(|(_, suffix)| suffix == NEW_DOCUMENT_SUFFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DraftKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DraftKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for DraftKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// A snapshot read back from storage.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEnvelope {
    pub key: DraftKey,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// On-disk shape of a snapshot. The key lives in the storage key, not the body.
#[derive(Debug, Serialize)]
pub(crate) struct StoredSnapshotRef<'a, T: ?Sized> {
    pub data: &'a T,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StoredSnapshot {
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl StoredSnapshot {
    pub fn into_envelope(self, key: DraftKey) -> SnapshotEnvelope {
        SnapshotEnvelope {
            key,
            data: self.data,
            timestamp: self.timestamp,
        }
    }
}
