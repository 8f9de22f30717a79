pub mod file;
pub mod memory;
pub mod snapshot_store;
pub mod types;

use std::sync::Arc;

use crate::error::AutosaveResult;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use snapshot_store::{SnapshotStore, DEFAULT_NAMESPACE};
pub use types::{DraftKey, SnapshotEnvelope};

/// Synchronous string key-value capability that snapshots are persisted through.
///
/// Implementations report every failure as an error; deciding whether a
/// failure matters is left to the caller.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> AutosaveResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> AutosaveResult<()>;
    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> AutosaveResult<()>;
    fn keys(&self) -> AutosaveResult<Vec<String>>;
}

pub type SharedStorage = Arc<dyn Storage>;
