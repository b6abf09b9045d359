use crate::{
    CoreResult,
    persistence::{KeyValueStore, PersistedSessionState},
};

use tracing::{debug, instrument, warn};

/// Key the session snapshot is stored under.
pub const SESSION_KEY: &str = "session";

/// Saves and restores the in-flight session snapshot.
pub struct SessionPersistence {
    store: Box<dyn KeyValueStore>,
}

impl SessionPersistence {
    /// Persists snapshots into `store`.
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Overwrites the stored snapshot.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn save(&self, snapshot: &PersistedSessionState) -> CoreResult<()> {
        let encoded = snapshot.encode()?;
        self.store.set(SESSION_KEY, &encoded)?;
        debug!(state = %snapshot.state, "Session snapshot saved");
        Ok(())
    }

    /// Reads the stored snapshot.
    ///
    /// Unreadable or invalid snapshots are logged and reported as absent so
    /// startup can always proceed.
    #[instrument(skip(self))]
    pub fn load(&self) -> Option<PersistedSessionState> {
        match self.try_load() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Discarding persisted session state");
                None
            }
        }
    }

    /// Like [`SessionPersistence::load`], but surfaces why a snapshot was rejected.
    #[track_caller]
    pub fn try_load(&self) -> CoreResult<Option<PersistedSessionState>> {
        match self.store.get(SESSION_KEY)? {
            Some(raw) => PersistedSessionState::decode(&raw).map(Some),
            None => Ok(None),
        }
    }

    /// Removes the stored snapshot.
    #[track_caller]
    pub fn clear(&self) -> CoreResult<()> {
        self.store.remove(SESSION_KEY)?;
        debug!("Session snapshot cleared");
        Ok(())
    }
}
