//! Autosave wiring for one editor form.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::AutosaveConfig;
use crate::error::AutosaveResult;
use crate::recovery::{DocumentIdentity, RecoveryPrompt, RecoveryState, RecoveryWorkflow};
use crate::scheduler::{AutosaveHandle, AutosaveScheduler};
use crate::storage::{DraftKey, FileStorage, SharedStorage, SnapshotStore};

/// Form state an editor can autosave.
pub trait FormState: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> FormState for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// Shared entry point: one store and scheduler for every editor in the process.
#[derive(Clone)]
pub struct Autosave {
    store: SnapshotStore,
    scheduler: AutosaveScheduler,
    identity_field: String,
}

impl Autosave {
    pub fn new(storage: SharedStorage, config: &AutosaveConfig) -> AutosaveResult<Self> {
        config.validate()?;
        let store = SnapshotStore::with_namespace(storage, config.namespace.clone());
        Ok(Self {
            scheduler: AutosaveScheduler::from_config(store.clone(), config),
            store,
            identity_field: config.identity_field.clone(),
        })
    }

    /// Autosave into one JSON file per draft under `config.storage_dir`.
    pub fn file_backed(config: &AutosaveConfig) -> AutosaveResult<Self> {
        Self::new(Arc::new(FileStorage::new(config.storage_dir.clone())), config)
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Mount an editor for `key`, checking for a recoverable draft first.
    ///
    /// `initial` is the form state from the server (or blank for a new
    /// document). Autosave starts right away when there is nothing to
    /// recover; otherwise it waits for [`EditorSession::restore`] or
    /// [`EditorSession::discard`].
    pub fn open_editor<D: FormState>(
        &self,
        key: DraftKey,
        identity: DocumentIdentity,
        initial: D,
    ) -> EditorSession<D> {
        if key.is_new() != identity.is_new() {
            tracing::warn!(key = %key, ?identity, "autosave key and document identity disagree");
        }
        let mut workflow = RecoveryWorkflow::new(self.store.clone(), key.clone(), identity)
            .with_identity_field(self.identity_field.clone());
        workflow.check_where(|data| D::deserialize(data).is_ok());

        let mut session = EditorSession {
            key,
            form: Arc::new(RwLock::new(initial)),
            workflow,
            scheduler: self.scheduler.clone(),
            autosave: None,
        };
        if !session.workflow.is_pending() {
            session.start_autosave();
        }
        session
    }

    /// [`Autosave::open_editor`] with the key and identity derived from the
    /// entity name and its server id, if it has one.
    pub fn open_entity_editor<D: FormState>(
        &self,
        entity: &str,
        id: Option<&str>,
        initial: D,
    ) -> EditorSession<D> {
        self.open_editor(DraftKey::for_entity(entity, id), DocumentIdentity::from_id(id), initial)
    }
}

/// A mounted editor: its form state, recovery decision and running autosave.
///
/// Dropping the session stops autosave but leaves the draft stored, which is
/// what navigating away should do.
pub struct EditorSession<D: FormState> {
    key: DraftKey,
    form: Arc<RwLock<D>>,
    workflow: RecoveryWorkflow,
    scheduler: AutosaveScheduler,
    autosave: Option<AutosaveHandle>,
}

impl<D: FormState> EditorSession<D> {
    pub fn key(&self) -> &DraftKey {
        &self.key
    }

    pub fn state(&self) -> &RecoveryState {
        self.workflow.state()
    }

    pub fn prompt(&self) -> Option<RecoveryPrompt> {
        self.workflow.prompt()
    }

    pub fn is_autosaving(&self) -> bool {
        self.autosave
            .as_ref()
            .is_some_and(|handle| !handle.is_cancelled())
    }

    pub fn form(&self) -> D {
        self.form.read().clone()
    }

    pub fn update(&self, edit: impl FnOnce(&mut D)) {
        edit(&mut self.form.write());
    }

    /// Replace the form with the pending draft and start autosaving it.
    pub fn restore(&mut self) -> bool {
        let Some(data) = self.workflow.restore() else {
            return false;
        };
        match serde_json::from_value::<D>(data) {
            Ok(draft) => *self.form.write() = draft,
            Err(error) => {
                tracing::warn!(key = %self.key, "autosave draft no longer fits the form: {error}");
            }
        }
        self.start_autosave();
        true
    }

    /// Drop the pending draft, keep the initial form and start autosaving it.
    pub fn discard(&mut self) -> bool {
        if !self.workflow.discard() {
            return false;
        }
        self.start_autosave();
        true
    }

    /// Snapshot the current form immediately.
    pub fn flush(&self) {
        if let Some(handle) = &self.autosave {
            handle.flush();
        }
    }

    /// The server accepted the form; the draft is no longer needed.
    pub fn complete_submit(mut self) {
        self.teardown();
        tracing::info!(key = %self.key, "editor submitted");
    }

    /// The operator abandoned the edit; the draft goes with it.
    pub fn cancel(mut self) {
        self.teardown();
        tracing::info!(key = %self.key, "editor cancelled");
    }

    fn teardown(&mut self) {
        if let Some(handle) = self.autosave.take() {
            handle.cancel();
        }
        self.workflow.finish();
    }

    fn start_autosave(&mut self) {
        if self.is_autosaving() {
            return;
        }
        let form = Arc::clone(&self.form);
        let source = move || -> AutosaveResult<Value> { Ok(serde_json::to_value(&*form.read())?) };
        self.autosave = Some(self.scheduler.start(self.key.clone(), source));
    }
}
