//! Restore-or-discard decision for a draft found when an editor mounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::config::DEFAULT_IDENTITY_FIELD;
use crate::storage::{DraftKey, SnapshotEnvelope, SnapshotStore};
use crate::utils::time::{format_relative, now_utc};

/// Server-side identity of an edited document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentIdentity {
    /// Not created on the server yet.
    New,
    Existing(String),
}

impl DocumentIdentity {
    pub fn existing(id: impl ToString) -> Self {
        Self::Existing(id.to_string())
    }

    /// Identity for an optional server id. Same rule as [`DraftKey::for_entity`].
    pub fn from_id(id: Option<&str>) -> Self {
        match id {
            Some(id) if !id.is_empty() => Self::existing(id),
            _ => Self::New,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Self::New)
    }

    /// Reads the identity embedded in snapshot data under `field`.
    ///
    /// A missing, null or empty field means the draft was never saved.
    /// Integral floats (`42.0`) read as the integer id.
    pub fn from_snapshot(data: &Value, field: &str) -> Self {
        match data.get(field) {
            Some(Value::String(id)) if !id.is_empty() => Self::Existing(id.clone()),
            Some(Value::Number(id)) => Self::Existing(numeric_id(id)),
            _ => Self::New,
        }
    }

    /// Both new, or both existing with the same id.
    pub fn matches(&self, other: &DocumentIdentity) -> bool {
        self == other
    }
}

fn numeric_id(id: &Number) -> String {
    match id.as_f64() {
        Some(value) if id.is_f64() && value.fract() == 0.0 && value.abs() < 1e15 => {
            format!("{}", value as i64)
        }
        _ => id.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryState {
    /// The store has not been consulted yet.
    Idle,
    PendingDecision(SnapshotEnvelope),
    Clean,
}

/// What the operator is shown while a decision is pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryPrompt {
    pub key: DraftKey,
    pub saved_at: DateTime<Utc>,
    pub relative: String,
}

impl RecoveryPrompt {
    fn for_snapshot(snapshot: &SnapshotEnvelope, now: DateTime<Utc>) -> Self {
        Self {
            key: snapshot.key.clone(),
            saved_at: snapshot.timestamp,
            relative: format_relative(snapshot.timestamp, now),
        }
    }
}

pub struct RecoveryWorkflow {
    store: SnapshotStore,
    key: DraftKey,
    identity: DocumentIdentity,
    identity_field: String,
    state: RecoveryState,
}

impl RecoveryWorkflow {
    pub fn new(store: SnapshotStore, key: DraftKey, identity: DocumentIdentity) -> Self {
        Self {
            store,
            key,
            identity,
            identity_field: DEFAULT_IDENTITY_FIELD.to_string(),
            state: RecoveryState::Idle,
        }
    }

    pub fn with_identity_field(mut self, field: impl Into<String>) -> Self {
        self.identity_field = field.into();
        self
    }

    pub fn key(&self) -> &DraftKey {
        &self.key
    }

    pub fn state(&self) -> &RecoveryState {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, RecoveryState::PendingDecision(_))
    }

    /// Consult the store for a draft belonging to the opened document.
    pub fn check(&mut self) -> Option<RecoveryPrompt> {
        self.check_where(|_| true)
    }

    /// Like [`check`](Self::check), but a snapshot whose data `usable`
    /// rejects is treated as absent.
    ///
    /// Only the first call consults the store; later calls report the
    /// current prompt, if any.
    pub fn check_where(&mut self, usable: impl Fn(&Value) -> bool) -> Option<RecoveryPrompt> {
        if !matches!(self.state, RecoveryState::Idle) {
            return self.prompt();
        }
        self.state = match self.store.load(&self.key) {
            None => RecoveryState::Clean,
            Some(snapshot) => {
                let embedded = DocumentIdentity::from_snapshot(&snapshot.data, &self.identity_field);
                if !embedded.matches(&self.identity) {
                    tracing::info!(
                        key = %self.key,
                        "autosave draft belongs to {embedded:?}, not {:?}; not offering it",
                        self.identity
                    );
                    RecoveryState::Clean
                } else if !usable(&snapshot.data) {
                    tracing::warn!(key = %self.key, "autosave draft does not fit the form; not offering it");
                    RecoveryState::Clean
                } else {
                    tracing::info!(key = %self.key, saved_at = %snapshot.timestamp, "autosave draft found");
                    RecoveryState::PendingDecision(snapshot)
                }
            }
        };
        self.prompt()
    }

    pub fn prompt(&self) -> Option<RecoveryPrompt> {
        self.prompt_at(now_utc())
    }

    pub fn prompt_at(&self, now: DateTime<Utc>) -> Option<RecoveryPrompt> {
        match &self.state {
            RecoveryState::PendingDecision(snapshot) => Some(RecoveryPrompt::for_snapshot(snapshot, now)),
            _ => None,
        }
    }

    /// Accept the pending draft. Returns its data; the snapshot stays stored.
    pub fn restore(&mut self) -> Option<Value> {
        match std::mem::replace(&mut self.state, RecoveryState::Clean) {
            RecoveryState::PendingDecision(snapshot) => {
                tracing::info!(key = %self.key, "autosave draft restored");
                Some(snapshot.data)
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Reject the pending draft and clear it from the store.
    pub fn discard(&mut self) -> bool {
        if !self.is_pending() {
            return false;
        }
        self.store.clear(&self.key);
        self.state = RecoveryState::Clean;
        tracing::info!(key = %self.key, "autosave draft discarded");
        true
    }

    /// Clear the draft after the editor was submitted or cancelled.
    pub fn finish(&mut self) {
        self.store.clear(&self.key);
        self.state = RecoveryState::Clean;
    }
}
