//! Bearer-token source.
//!
//! The console's session token lives outside this layer; providers read it
//! through this trait and never write it.

use std::sync::RwLock;

/// Read-only source of the session bearer token.
pub trait TokenStore: Send + Sync {
    /// The current bearer token, if a session is active.
    fn bearer_token(&self) -> Option<String>;
}

/// In-memory token store for embedding and tests.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }

    pub fn set(&self, token: impl Into<String>) {
        *self
            .token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(token.into());
    }

    pub fn clear(&self) {
        *self
            .token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}

impl TokenStore for MemoryTokenStore {
    fn bearer_token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}
