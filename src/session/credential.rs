use std::sync::{Arc, PoisonError, RwLock};

use crate::foundation::error::CredentialError;

/// Environment variables consulted by [`ApiKeyStore::from_env`], in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Capability that must report a usable credential before a run may start.
pub trait CredentialGate: Send + Sync {
    fn has_credential(&self) -> bool;

    /// Run the interactive selection flow. On `Ok`, `has_credential` must return `true`.
    fn select_credential(&self) -> Result<(), CredentialError>;
}

/// Interactive source of a key, e.g. a terminal prompt.
pub type KeySelector = dyn Fn() -> Result<String, CredentialError> + Send + Sync;

/// Shared, swappable API key. Clones observe the same key.
#[derive(Clone, Default)]
pub struct ApiKeyStore {
    key: Arc<RwLock<Option<String>>>,
    selector: Option<Arc<KeySelector>>,
}

impl ApiKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(key: impl Into<String>) -> Self {
        let store = Self::new();
        store.set_key(key);
        store
    }

    /// Seed from the first non-empty variable in [`API_KEY_ENV_VARS`].
    pub fn from_env() -> Self {
        let store = Self::new();
        if let Some(key) = API_KEY_ENV_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|v| !v.trim().is_empty())
        {
            store.set_key(key);
        }
        store
    }

    pub fn with_selector(
        mut self,
        selector: impl Fn() -> Result<String, CredentialError> + Send + Sync + 'static,
    ) -> Self {
        self.selector = Some(Arc::new(selector));
        self
    }

    /// Blank keys clear the store.
    pub fn set_key(&self, key: impl Into<String>) {
        let key = key.into().trim().to_string();
        *self.key.write().unwrap_or_else(PoisonError::into_inner) =
            (!key.is_empty()).then_some(key);
    }

    pub fn clear(&self) {
        *self.key.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn api_key(&self) -> Option<String> {
        self.key
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CredentialGate for ApiKeyStore {
    fn has_credential(&self) -> bool {
        self.api_key().is_some()
    }

    fn select_credential(&self) -> Result<(), CredentialError> {
        let selector = self.selector.as_ref().ok_or(CredentialError::NoSelectionFlow)?;
        let key = selector()?;
        if key.trim().is_empty() {
            return Err(CredentialError::Rejected("empty API key".to_string()));
        }
        self.set_key(key);
        tracing::info!("API key selected");
        Ok(())
    }
}

impl std::fmt::Debug for ApiKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyStore")
            .field("has_key", &self.has_credential())
            .field("has_selector", &self.selector.is_some())
            .finish()
    }
}

/// Make sure `gate` holds a credential, running its selection flow once if it does not.
pub fn ensure_credential(gate: &dyn CredentialGate) -> Result<(), CredentialError> {
    if gate.has_credential() {
        return Ok(());
    }
    gate.select_credential()?;
    if gate.has_credential() {
        Ok(())
    } else {
        Err(CredentialError::Rejected(
            "selection finished without a credential".to_string(),
        ))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/credential.rs"]
mod tests;
