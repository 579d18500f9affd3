//! Process-wide session table
//!
//! An explicit owned store with a create/get/delete/expire lifecycle.
//! Access is mediated entirely through session ids; callers never hold
//! references into the store's internals, only `Arc<Session>` handles.

use crate::config::SessionConfig;
use crate::error::{Result, TagcanvasError};
use crate::session::Session;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Table of live sessions
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Arc<Session>>>,
    config: SessionConfig,
}

impl SessionStore {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            config,
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<Uuid, Arc<Session>>> {
        self.sessions.read().expect("session table lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<Uuid, Arc<Session>>> {
        self.sessions.write().expect("session table lock poisoned")
    }

    /// Create a new session and return its handle
    pub fn create(&self) -> Arc<Session> {
        let session = Arc::new(Session::new(self.config.clone()));
        self.write().insert(session.id(), Arc::clone(&session));
        tracing::info!(session = %session.id(), "session created");
        session
    }

    /// Fetch a live session, recording the access as activity
    ///
    /// # Errors
    ///
    /// Returns `TagcanvasError::SessionNotFound` for unknown or deleted
    /// session ids.
    pub fn get(&self, id: Uuid) -> Result<Arc<Session>> {
        let session = self
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| TagcanvasError::SessionNotFound(id.to_string()))?;
        session.touch();
        Ok(session)
    }

    /// Delete a session, returning its handle for collaborator cleanup
    ///
    /// Deletion synchronizes with in-flight work: while a generation is
    /// running the delete fails with `SessionBusy` instead of freeing
    /// registry state under it. The session's tombstone guarantees a
    /// racing generate cannot revive it afterwards.
    ///
    /// # Errors
    ///
    /// Returns `TagcanvasError::SessionNotFound` for unknown ids and
    /// `TagcanvasError::SessionBusy` while a generation is in flight.
    pub fn delete(&self, id: Uuid) -> Result<Arc<Session>> {
        let mut sessions = self.write();
        let session = sessions
            .get(&id)
            .cloned()
            .ok_or_else(|| TagcanvasError::SessionNotFound(id.to_string()))?;
        session.close()?;
        sessions.remove(&id);
        tracing::info!(session = %id, "session deleted");
        Ok(session)
    }

    /// Remove sessions idle for longer than `max_idle_seconds`
    ///
    /// The idle threshold and sweep schedule are the caller's policy;
    /// this only provides the mechanism. Busy sessions are skipped and
    /// picked up by a later sweep. Returns the removed sessions so the
    /// caller can destroy their stored blobs.
    pub fn sweep_idle(&self, max_idle_seconds: u64) -> Vec<Arc<Session>> {
        let cutoff = Utc::now() - Duration::seconds(max_idle_seconds as i64);
        let mut sessions = self.write();
        let expired: Vec<Uuid> = sessions
            .values()
            .filter(|s| s.last_activity() < cutoff && s.close().is_ok())
            .map(|s| s.id())
            .collect();
        expired
            .iter()
            .filter_map(|id| sessions.remove(id))
            .inspect(|s| tracing::info!(session = %s.id(), "idle session swept"))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SessionStore {
        SessionStore::new(SessionConfig {
            auto_tag: false,
            ..SessionConfig::default()
        })
    }

    #[test]
    fn test_create_and_get() {
        let store = store();
        let session = store.create();
        let fetched = store.get(session.id()).unwrap();
        assert_eq!(fetched.id(), session.id());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_unknown_session() {
        let store = store();
        let err = store.get(Uuid::new_v4()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TagcanvasError>(),
            Some(TagcanvasError::SessionNotFound(_))
        ));
    }

    #[test]
    fn test_delete_removes_session() {
        let store = store();
        let session = store.create();
        store.delete(session.id()).unwrap();
        assert!(store.is_empty());
        assert!(store.get(session.id()).is_err());
        assert!(session.is_closed());
    }

    #[test]
    fn test_delete_unknown_session() {
        let store = store();
        let err = store.delete(Uuid::new_v4()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TagcanvasError>(),
            Some(TagcanvasError::SessionNotFound(_))
        ));
    }

    #[test]
    fn test_delete_blocked_while_generating() {
        let store = store();
        let session = store.create();
        let guard = session.begin_generation().unwrap();

        let err = store.delete(session.id()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TagcanvasError>(),
            Some(TagcanvasError::SessionBusy)
        ));
        // still present until the generation settles
        assert!(store.get(session.id()).is_ok());

        drop(guard);
        assert!(store.delete(session.id()).is_ok());
    }

    #[test]
    fn test_sweep_idle_skips_active_and_busy() {
        let store = store();
        let idle = store.create();
        let busy = store.create();
        let _guard = busy.begin_generation().unwrap();

        // nothing is older than an hour yet
        assert!(store.sweep_idle(3600).is_empty());

        // with a zero threshold everything idle is expired; the busy
        // session must survive
        std::thread::sleep(std::time::Duration::from_millis(5));
        let swept = store.sweep_idle(0);
        assert_eq!(swept.len(), 1);
        assert_eq!(swept[0].id(), idle.id());
        assert_eq!(store.len(), 1);
        assert!(store.get(busy.id()).is_ok());
    }
}
