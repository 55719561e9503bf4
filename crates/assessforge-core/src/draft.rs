//! Draft snapshots of authoring sessions.
//!
//! A draft is the whole session serialized to JSON under a namespaced key in
//! a host-supplied [`KeyValueStore`]. Pending uploads are not persisted: a
//! restored session has to pick its binaries again.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;
use crate::traits::KeyValueStore;
use crate::wizard::AuthoringSession;

/// Bumped when the snapshot layout changes incompatibly.
pub const SNAPSHOT_SCHEMA: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSnapshot {
    pub schema: u32,
    pub saved_at: DateTime<Utc>,
    pub session: AuthoringSession,
}

/// Saves, loads and discards session drafts.
#[derive(Clone)]
pub struct DraftStore {
    store: Arc<dyn KeyValueStore>,
    namespace: String,
}

impl std::fmt::Debug for DraftStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftStore")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl DraftStore {
    pub fn new(store: Arc<dyn KeyValueStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn storage_key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    /// Persist a snapshot of `session` stamped with the current time.
    pub fn save(&self, key: &str, session: &AuthoringSession) -> Result<DateTime<Utc>, PersistenceError> {
        self.save_at(key, session, Utc::now())
    }

    pub fn save_at(
        &self,
        key: &str,
        session: &AuthoringSession,
        saved_at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, PersistenceError> {
        let storage_key = self.storage_key(key);
        let snapshot = DraftSnapshot {
            schema: SNAPSHOT_SCHEMA,
            saved_at,
            session: session.clone(),
        };
        let encoded = serde_json::to_string(&snapshot).map_err(|source| PersistenceError::Encode {
            key: storage_key.clone(),
            source,
        })?;
        self.store
            .set(&storage_key, &encoded)
            .map_err(|source| PersistenceError::Store {
                key: storage_key.clone(),
                source,
            })?;
        tracing::debug!(key = %storage_key, bytes = encoded.len(), "draft saved");
        Ok(saved_at)
    }

    /// Load the snapshot for `key`, if one exists.
    pub fn load(&self, key: &str) -> Result<Option<DraftSnapshot>, PersistenceError> {
        let storage_key = self.storage_key(key);
        let raw = self
            .store
            .get(&storage_key)
            .map_err(|source| PersistenceError::Store {
                key: storage_key.clone(),
                source,
            })?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        let snapshot: DraftSnapshot =
            serde_json::from_str(&raw).map_err(|source| PersistenceError::Corrupt {
                key: storage_key.clone(),
                source,
            })?;
        if snapshot.schema != SNAPSHOT_SCHEMA {
            tracing::warn!(
                key = %storage_key,
                schema = snapshot.schema,
                expected = SNAPSHOT_SCHEMA,
                "draft has a different schema tag"
            );
        }
        Ok(Some(snapshot))
    }

    pub fn discard(&self, key: &str) -> Result<(), PersistenceError> {
        let storage_key = self.storage_key(key);
        self.store
            .remove(&storage_key)
            .map_err(|source| PersistenceError::Store {
                key: storage_key.clone(),
                source,
            })?;
        tracing::debug!(key = %storage_key, "draft discarded");
        Ok(())
    }

    /// Save, logging rather than returning any failure.
    ///
    /// Returns whether the save succeeded.
    pub fn autosave(&self, key: &str, session: &AuthoringSession) -> bool {
        match self.save(key, session) {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(error = %err, "autosave failed");
                false
            }
        }
    }

    /// Offer a stored draft to `confirm` and overwrite `session` if accepted.
    ///
    /// Returns `Ok(true)` only when a draft existed and was applied.
    pub fn restore_into<F>(
        &self,
        key: &str,
        session: &mut AuthoringSession,
        confirm: F,
    ) -> Result<bool, PersistenceError>
    where
        F: FnOnce(&DraftSnapshot) -> bool,
    {
        let Some(snapshot) = self.load(key)? else {
            return Ok(false);
        };
        if !confirm(&snapshot) {
            tracing::debug!(key, "draft restore declined");
            return Ok(false);
        }
        session.overwrite_with(snapshot.session);
        tracing::info!(key, saved_at = %snapshot.saved_at, "draft restored");
        Ok(true)
    }
}
