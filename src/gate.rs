//! Admin Access Gate
//!
//! A single shared passphrase guards the dashboard. The unlocked flag is
//! persisted under [`UNLOCK_KEY`] so it survives restarts; the literal
//! `"true"` means unlocked and anything else means locked.
//!
//! This is a visibility gate, not a credential system: there is no expiry,
//! no per-user identity and no attempt limit.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Passphrase accepted when none is configured
pub const DEFAULT_PASSPHRASE: &str = "1234admin";

/// Key under which the unlocked flag is persisted
pub const UNLOCK_KEY: &str = "accesoAdmin";

const UNLOCKED_VALUE: &str = "true";

/// Client-side persistent key/value storage
pub trait GateStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, GateError>;
    fn set(&self, key: &str, value: &str) -> Result<(), GateError>;
    fn remove(&self, key: &str) -> Result<(), GateError>;
}

/// Stores each key as a small file under a directory
#[derive(Debug, Clone)]
pub struct FileGateStore {
    dir: PathBuf,
}

impl FileGateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl GateStore for FileGateStore {
    fn get(&self, key: &str) -> Result<Option<String>, GateError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value.trim_end_matches(['\r', '\n']).to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(GateError::Store(e.to_string())),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), GateError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| GateError::Store(e.to_string()))?;
        std::fs::write(self.path_for(key), value).map_err(|e| GateError::Store(e.to_string()))
    }

    fn remove(&self, key: &str) -> Result<(), GateError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(GateError::Store(e.to_string())),
        }
    }
}

/// Volatile store, for tests and one-off sessions
#[derive(Debug, Default)]
pub struct MemoryGateStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryGateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, GateError> {
        self.values
            .lock()
            .map_err(|_| GateError::Store("store lock poisoned".to_string()))
    }
}

impl GateStore for MemoryGateStore {
    fn get(&self, key: &str) -> Result<Option<String>, GateError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), GateError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), GateError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// Holds the unlocked flag and keeps it in sync with the store
pub struct AccessGate {
    store: Arc<dyn GateStore>,
    passphrase: String,
    unlocked: bool,
}

impl AccessGate {
    /// Create a gate, restoring the persisted flag
    ///
    /// An unreadable store is treated as locked.
    pub fn new(store: Arc<dyn GateStore>, passphrase: impl Into<String>) -> Self {
        let unlocked = match store.get(UNLOCK_KEY) {
            Ok(value) => value.as_deref() == Some(UNLOCKED_VALUE),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read persisted gate state, starting locked");
                false
            }
        };

        Self {
            store,
            passphrase: passphrase.into(),
            unlocked,
        }
    }

    /// Gate using [`DEFAULT_PASSPHRASE`]
    pub fn with_default_passphrase(store: Arc<dyn GateStore>) -> Self {
        Self::new(store, DEFAULT_PASSPHRASE)
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    /// Unlock with a candidate passphrase
    ///
    /// The flag is only set once it has been persisted.
    pub fn submit_passphrase(&mut self, candidate: &str) -> Result<(), GateError> {
        if candidate != self.passphrase {
            tracing::warn!("Rejected admin passphrase");
            return Err(GateError::WrongPassphrase);
        }

        self.store.set(UNLOCK_KEY, UNLOCKED_VALUE)?;
        self.unlocked = true;

        tracing::info!("Admin dashboard unlocked");
        Ok(())
    }

    /// Lock the dashboard and clear the persisted flag
    ///
    /// The in-memory flag is cleared even when the store fails.
    pub fn lock_out(&mut self) -> Result<(), GateError> {
        self.unlocked = false;
        self.store.remove(UNLOCK_KEY)?;

        tracing::info!("Admin dashboard locked");
        Ok(())
    }
}

/// Access gate errors
#[derive(Debug, Error)]
pub enum GateError {
    #[error("Clave incorrecta")]
    WrongPassphrase,

    #[error("Gate state store error: {0}")]
    Store(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    struct BrokenStore;

    impl GateStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, GateError> {
            Err(GateError::Store("disk on fire".to_string()))
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), GateError> {
            Err(GateError::Store("disk on fire".to_string()))
        }
        fn remove(&self, _key: &str) -> Result<(), GateError> {
            Err(GateError::Store("disk on fire".to_string()))
        }
    }

    #[test]
    fn test_correct_passphrase_unlocks_and_persists() {
        let store = Arc::new(MemoryGateStore::new());
        let mut gate = AccessGate::with_default_passphrase(store.clone());
        assert!(!gate.is_unlocked());

        gate.submit_passphrase("1234admin").unwrap();

        assert!(gate.is_unlocked());
        assert_eq!(store.get(UNLOCK_KEY).unwrap().as_deref(), Some("true"));
    }

    #[test]
    fn test_wrong_passphrase_stays_locked() {
        let store = Arc::new(MemoryGateStore::new());
        let mut gate = AccessGate::with_default_passphrase(store.clone());

        let err = gate.submit_passphrase("1234Admin").unwrap_err();

        assert!(matches!(err, GateError::WrongPassphrase));
        assert!(!gate.is_unlocked());
        assert_eq!(store.get(UNLOCK_KEY).unwrap(), None);
    }

    #[test]
    fn test_lock_out_clears_memory_and_store() {
        let store = Arc::new(MemoryGateStore::new());
        let mut gate = AccessGate::with_default_passphrase(store.clone());
        gate.submit_passphrase("1234admin").unwrap();

        gate.lock_out().unwrap();

        assert!(!gate.is_unlocked());
        assert_eq!(store.get(UNLOCK_KEY).unwrap(), None);

        // Locking an already-locked gate is fine
        gate.lock_out().unwrap();
        assert!(!gate.is_unlocked());
    }

    #[test]
    fn test_restores_persisted_flag() {
        let store = Arc::new(MemoryGateStore::new());
        store.set(UNLOCK_KEY, "true").unwrap();
        assert!(AccessGate::with_default_passphrase(store.clone()).is_unlocked());

        store.set(UNLOCK_KEY, "yes").unwrap();
        assert!(!AccessGate::with_default_passphrase(store).is_unlocked());
    }

    #[test]
    fn test_persist_failure_leaves_gate_locked() {
        let mut gate = AccessGate::with_default_passphrase(Arc::new(BrokenStore));
        assert!(!gate.is_unlocked());

        let err = gate.submit_passphrase("1234admin").unwrap_err();
        assert!(matches!(err, GateError::Store(_)));
        assert!(!gate.is_unlocked());

        assert!(gate.lock_out().is_err());
        assert!(!gate.is_unlocked());
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempdir().unwrap();
        let state_dir = dir.path().join("state");

        let mut gate = AccessGate::new(Arc::new(FileGateStore::new(&state_dir)), "secreto");
        gate.submit_passphrase("secreto").unwrap();
        assert_eq!(
            std::fs::read_to_string(state_dir.join(UNLOCK_KEY)).unwrap(),
            "true"
        );

        let mut reopened = AccessGate::new(Arc::new(FileGateStore::new(&state_dir)), "secreto");
        assert!(reopened.is_unlocked());

        reopened.lock_out().unwrap();
        assert!(!state_dir.join(UNLOCK_KEY).exists());
        assert!(!AccessGate::new(Arc::new(FileGateStore::new(&state_dir)), "secreto").is_unlocked());
    }
}
