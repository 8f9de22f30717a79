//! Draft autosave and recovery for the folio CMS editors.
//!
//! Long-form editors (posts, projects) snapshot their form state to local
//! storage every few seconds. When an editor mounts and finds a snapshot for
//! the same document, the operator chooses to restore or discard it.
//!
//! - `storage`: the key-value capability, its backends and the snapshot store
//! - `scheduler`: per-session periodic snapshotting
//! - `recovery`: the restore-or-discard state machine
//! - `editor`: the pieces wired together for one editor form
//! - `sections`: heading-delimited markdown section extraction and replacement

pub mod config;
pub mod editor;
pub mod error;
pub mod recovery;
pub mod scheduler;
pub mod sections;
pub mod storage;
pub mod utils;

pub use crate::config::{load_or_create_config, AutosaveConfig};
pub use crate::editor::{Autosave, EditorSession, FormState};
pub use crate::error::{AutosaveError, AutosaveResult};
pub use crate::recovery::{DocumentIdentity, RecoveryPrompt, RecoveryState, RecoveryWorkflow};
pub use crate::scheduler::{AutosaveHandle, AutosaveScheduler, SnapshotSource};
pub use crate::storage::{
    DraftKey, FileStorage, MemoryStorage, SharedStorage, SnapshotEnvelope, SnapshotStore, Storage,
};
