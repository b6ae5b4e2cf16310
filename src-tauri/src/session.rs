//! Bearer credential for the remote API.
//!
//! `Session` is the single source of truth for the token. It is handed to the
//! HTTP client and the auth service at construction; nothing reads the token
//! from ambient storage.

use std::sync::{Mutex, PoisonError, RwLock};

use keyring::Entry;
use tracing::{info, warn};

use crate::error::DicomViewError;

pub const KEYRING_SERVICE: &str = "dicomview-session";
pub const KEYRING_USER: &str = "dicomview";

/// Persistent backing for the session token.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<String>, DicomViewError>;
    fn save(&self, token: &str) -> Result<(), DicomViewError>;
    fn delete(&self) -> Result<(), DicomViewError>;
}

/// Token stored in the OS keychain.
pub struct KeyringStore {
    service: String,
    user: String,
}

impl KeyringStore {
    pub fn new(service: &str, user: &str) -> Self {
        Self {
            service: service.to_string(),
            user: user.to_string(),
        }
    }

    fn entry(&self) -> Result<Entry, DicomViewError> {
        Entry::new(&self.service, &self.user).map_err(|e| {
            warn!("Failed to create keyring entry for {}: {}", self.service, e);
            DicomViewError::Session(e.to_string())
        })
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new(KEYRING_SERVICE, KEYRING_USER)
    }
}

impl CredentialStore for KeyringStore {
    fn load(&self) -> Result<Option<String>, DicomViewError> {
        match self.entry()?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(DicomViewError::Session(e.to_string())),
        }
    }

    fn save(&self, token: &str) -> Result<(), DicomViewError> {
        self.entry()?
            .set_password(token)
            .map_err(|e| DicomViewError::Session(e.to_string()))
    }

    fn delete(&self) -> Result<(), DicomViewError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(DicomViewError::Session(e.to_string())),
        }
    }
}

/// Process-local store, used in tests and when no keychain is available.
#[derive(Default)]
pub struct MemoryStore {
    token: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_string())),
        }
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self) -> Result<Option<String>, DicomViewError> {
        Ok(self.token.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, token: &str) -> Result<(), DicomViewError> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn delete(&self) -> Result<(), DicomViewError> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

pub struct Session {
    token: RwLock<Option<String>>,
    store: Box<dyn CredentialStore>,
}

impl Session {
    /// Create a session, restoring any token the store already holds.
    pub fn new(store: impl CredentialStore + 'static) -> Self {
        let token = match store.load() {
            Ok(token) => token,
            Err(e) => {
                warn!("Failed to restore session token: {}", e);
                None
            }
        };
        if token.is_some() {
            info!("Restored session token from credential store");
        }
        Self {
            token: RwLock::new(token),
            store: Box::new(store),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::default())
    }

    pub fn get(&self) -> Option<String> {
        self.token.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Store a new token. The in-memory value is updated even when the
    /// backing store rejects the write.
    pub fn set(&self, token: &str) -> Result<(), DicomViewError> {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        self.store.save(token).map_err(|e| {
            warn!("Failed to persist session token: {}", e);
            e
        })
    }

    /// Forget the token. Idempotent.
    pub fn clear(&self) {
        self.token.write().unwrap_or_else(PoisonError::into_inner).take();
        if let Err(e) = self.store.delete() {
            warn!("Failed to remove persisted session token: {}", e);
        }
    }
}
