//! In-memory storage backend.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::Storage;
use crate::error::{AutosaveError, AutosaveResult};

/// Process-local map of string values with an optional byte quota.
///
/// The quota counts key and value bytes across all entries, the same way a
/// browser's local storage budget does.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: RwLock<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(bytes: usize) -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            quota: Some(bytes),
        }
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> AutosaveResult<Option<String>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> AutosaveResult<()> {
        let mut data = self.data.write();
        if let Some(quota) = self.quota {
            let used: usize = data
                .iter()
                .filter(|(existing, _)| existing.as_str() != key)
                .map(|(existing, stored)| existing.len() + stored.len())
                .sum();
            let needed = key.len() + value.len();
            let available = quota.saturating_sub(used);
            if needed > available {
                return Err(AutosaveError::QuotaExceeded { needed, available });
            }
        }
        data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> AutosaveResult<()> {
        self.data.write().remove(key);
        Ok(())
    }

    fn keys(&self) -> AutosaveResult<Vec<String>> {
        Ok(self.data.read().keys().cloned().collect())
    }
}
