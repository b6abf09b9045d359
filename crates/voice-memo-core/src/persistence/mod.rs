mod session_persistence;
mod snapshot;
mod store;

pub use {
    session_persistence::{SESSION_KEY, SessionPersistence},
    snapshot::PersistedSessionState,
    store::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore},
};
