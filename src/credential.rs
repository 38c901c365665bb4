//! The credential gate.
//!
//! Chat is available only while a non-empty credential is held.  The key is never
//! checked against the endpoint here; a bad key surfaces on the first request.

use tracing::debug;

use crate::error::Result;
use crate::store::{CREDENTIAL_KEY, KeyValueStore};

/// Accepts a submitted credential.
///
/// Returns the trimmed input, or `None` when nothing but whitespace was entered.
///
/// ```
/// # use palaver::accept_credential;
/// assert_eq!(accept_credential("  abc123 \n"), Some("abc123".to_string()));
/// assert_eq!(accept_credential("   "), None);
/// ```
pub fn accept_credential(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Holds the current credential and keeps its persisted form in sync.
#[derive(Debug, Clone, Default)]
pub struct CredentialGate {
    credential: String,
}

impl CredentialGate {
    /// A gate with no credential.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores the gate from `store`.  A stored empty string counts as absent.
    pub fn load<S: KeyValueStore>(store: &S) -> Result<Self> {
        let credential = store.get(CREDENTIAL_KEY)?.unwrap_or_default();
        debug!(present = !credential.is_empty(), "loaded credential");
        Ok(Self { credential })
    }

    /// Runs `input` through [`accept_credential`] and persists it on acceptance.
    ///
    /// Returns whether the input was accepted.
    pub fn submit<S: KeyValueStore>(&mut self, store: &mut S, input: &str) -> Result<bool> {
        let Some(credential) = accept_credential(input) else {
            return Ok(false);
        };
        store.set(CREDENTIAL_KEY, &credential)?;
        self.credential = credential;
        Ok(true)
    }

    /// Forgets the credential and removes its persisted form.
    pub fn clear<S: KeyValueStore>(&mut self, store: &mut S) -> Result<()> {
        self.credential.clear();
        store.remove(CREDENTIAL_KEY)
    }

    /// The current credential, if one is held.
    pub fn get(&self) -> Option<&str> {
        if self.credential.is_empty() {
            None
        } else {
            Some(&self.credential)
        }
    }

    /// True when chat may proceed.
    pub fn is_unlocked(&self) -> bool {
        !self.credential.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn rejects_blank_input() {
        assert_eq!(accept_credential(""), None);
        assert_eq!(accept_credential(" \t\n"), None);
    }

    #[test]
    fn submit_trims_and_persists() {
        let mut store = MemoryStore::new();
        let mut gate = CredentialGate::new();
        assert!(!gate.is_unlocked());

        assert!(gate.submit(&mut store, "  abc123  ").unwrap());
        assert_eq!(gate.get(), Some("abc123"));
        assert_eq!(store.get(CREDENTIAL_KEY).unwrap().as_deref(), Some("abc123"));
    }

    #[test]
    fn blank_submit_changes_nothing() {
        let mut store = MemoryStore::with_entries([(CREDENTIAL_KEY, "abc123")]);
        let mut gate = CredentialGate::load(&store).unwrap();

        assert!(!gate.submit(&mut store, "   ").unwrap());
        assert_eq!(gate.get(), Some("abc123"));
        assert_eq!(store.get(CREDENTIAL_KEY).unwrap().as_deref(), Some("abc123"));
    }

    #[test]
    fn load_treats_empty_as_locked() {
        let store = MemoryStore::with_entries([(CREDENTIAL_KEY, "")]);
        let gate = CredentialGate::load(&store).unwrap();
        assert!(!gate.is_unlocked());
        assert_eq!(gate.get(), None);
    }

    #[test]
    fn clear_locks_and_removes() {
        let mut store = MemoryStore::with_entries([(CREDENTIAL_KEY, "abc123")]);
        let mut gate = CredentialGate::load(&store).unwrap();
        assert!(gate.is_unlocked());

        gate.clear(&mut store).unwrap();
        assert!(!gate.is_unlocked());
        assert!(!store.contains(CREDENTIAL_KEY));
    }
}
