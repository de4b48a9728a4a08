//! Access to the bearer token used for admin scoped requests.

use std::fmt::Debug;
use std::sync::{Mutex, PoisonError};

/// Holder of the current authentication token.
///
/// The token is populated at login, and cleared at logout or whenever the
/// backend answers with `401 Unauthorized`.
pub trait AuthContext: Debug + Send + Sync {
    fn get(&self) -> Option<String>;
    fn set(&self, token: String);
    fn clear(&self);
}

/// An [`AuthContext`] that only lives as long as the process.
#[derive(Debug, Default)]
pub struct InMemoryAuth {
    token: Mutex<Option<String>>,
}

impl InMemoryAuth {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl AuthContext for InMemoryAuth {
    fn get(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, token: String) {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    fn clear(&self) {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_lifecycle() {
        let auth = InMemoryAuth::default();
        assert_eq!(auth.get(), None);

        auth.set("abc".to_string());
        assert_eq!(auth.get().as_deref(), Some("abc"));

        auth.clear();
        assert_eq!(auth.get(), None);
    }
}
