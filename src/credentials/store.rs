//! Active server credential.
//!
//! A single-slot register shared by the serving context. Writers replace the
//! slot unconditionally (last writer wins); readers get a snapshot.

use std::sync::{PoisonError, RwLock};
use tracing::info;

use super::types::Credential;

/// Holds the credential the server currently accepts.
#[derive(Debug, Default)]
pub struct CredentialStore {
    active: RwLock<Option<Credential>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the active credential, returning the previous one.
    pub fn set_credential(&self, credential: Credential) -> Option<Credential> {
        let access_key = credential.access_key.clone();
        let expiration = credential.expiration;

        // The slot holds a whole value, so a poisoned lock never exposes a torn write.
        let previous = {
            let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
            active.replace(credential)
        };

        info!(
            access_key = %access_key,
            expiration = %expiration,
            replaced = ?previous.as_ref().map(|c| c.access_key.as_str()),
            replaced_expired = ?previous.as_ref().map(Credential::is_expired),
            "Active server credential updated"
        );

        previous
    }

    /// Snapshot of the active credential.
    pub fn current(&self) -> Option<Credential> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Access key of the active credential.
    pub fn access_key(&self) -> Option<String> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|c| c.access_key.clone())
    }
}
