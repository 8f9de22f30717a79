//! Namespaced draft snapshot store.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::types::{DraftKey, SnapshotEnvelope, StoredSnapshot, StoredSnapshotRef};
use super::SharedStorage;
use crate::utils::time::now_utc;

/// Prefix applied to every storage key written by a [`SnapshotStore`].
pub const DEFAULT_NAMESPACE: &str = "autosave_";

/// One snapshot per draft key, last write wins.
///
/// None of the operations fail from the caller's point of view: a write
/// that cannot be serialized or stored is logged and dropped, and a read
/// that cannot be parsed is reported as no snapshot.
#[derive(Clone)]
pub struct SnapshotStore {
    storage: SharedStorage,
    namespace: String,
}

impl SnapshotStore {
    pub fn new(storage: SharedStorage) -> Self {
        Self::with_namespace(storage, DEFAULT_NAMESPACE)
    }

    pub fn with_namespace(storage: SharedStorage, namespace: impl Into<String>) -> Self {
        Self {
            storage,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn storage_key(&self, key: &DraftKey) -> String {
        format!("{}{}", self.namespace, key)
    }

    /// Save `data` stamped with the current time, replacing any previous snapshot.
    pub fn save<T: Serialize + ?Sized>(&self, key: &DraftKey, data: &T) {
        self.save_at(key, data, now_utc());
    }

    pub fn save_at<T: Serialize + ?Sized>(&self, key: &DraftKey, data: &T, timestamp: DateTime<Utc>) {
        let serialized = match serde_json::to_string(&StoredSnapshotRef { data, timestamp }) {
            Ok(serialized) => serialized,
            Err(error) => {
                tracing::warn!(key = %key, "autosave snapshot not serializable: {error}");
                return;
            }
        };
        match self.storage.set(&self.storage_key(key), &serialized) {
            Ok(()) => tracing::debug!(key = %key, bytes = serialized.len(), "autosave snapshot saved"),
            Err(error) => tracing::warn!(key = %key, "autosave snapshot not saved: {error}"),
        }
    }

    pub fn load(&self, key: &DraftKey) -> Option<SnapshotEnvelope> {
        let raw = match self.storage.get(&self.storage_key(key)) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(error) => {
                tracing::warn!(key = %key, "autosave snapshot unreadable: {error}");
                return None;
            }
        };
        match serde_json::from_str::<StoredSnapshot>(&raw) {
            Ok(stored) => Some(stored.into_envelope(key.clone())),
            Err(error) => {
                tracing::warn!(key = %key, "autosave snapshot corrupt, ignoring: {error}");
                None
            }
        }
    }

    pub fn clear(&self, key: &DraftKey) {
        match self.storage.remove(&self.storage_key(key)) {
            Ok(()) => tracing::debug!(key = %key, "autosave snapshot cleared"),
            Err(error) => tracing::warn!(key = %key, "autosave snapshot not cleared: {error}"),
        }
    }

    /// Draft keys that currently hold a snapshot in this namespace, sorted.
    pub fn list(&self) -> Vec<DraftKey> {
        let keys = match self.storage.keys() {
            Ok(keys) => keys,
            Err(error) => {
                tracing::warn!("autosave snapshots not listable: {error}");
                return Vec::new();
            }
        };
        let mut drafts: Vec<DraftKey> = keys
            .iter()
            .filter_map(|key| key.strip_prefix(&self.namespace))
            .filter(|key| !key.is_empty())
            .map(DraftKey::from)
            .collect();
        drafts.sort();
        drafts
    }
}
