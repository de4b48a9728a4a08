//! An [`AuthContext`] backed by the `admin_token` key of the user config.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use cartalog_client::AuthContext;
use toml_edit::Key;
use tracing::{debug, warn};

use crate::config::{Config, ReadWriteError};

const TOKEN_KEY: &str = "admin_token";

/// Keeps the admin token in memory and mirrors every change to the config file,
/// so a login outlives the process.
#[derive(Debug)]
pub struct ConfigTokenStore {
    config_file: PathBuf,
    token: Mutex<Option<String>>,
    write_error: Mutex<Option<ReadWriteError>>,
}

impl ConfigTokenStore {
    pub fn new(config: &Config) -> Self {
        ConfigTokenStore {
            config_file: config.config_file(),
            token: Mutex::new(config.admin_token.clone().filter(|t| !t.is_empty())),
            write_error: Mutex::new(None),
        }
    }

    pub fn config_file(&self) -> &PathBuf {
        &self.config_file
    }

    /// The error of the last failed write to the config file, if any.
    ///
    /// [`AuthContext`] cannot fail, so callers that promise a lasting
    /// login check here afterwards.
    pub fn take_write_error(&self) -> Option<ReadWriteError> {
        self.write_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn persist(&self, token: Option<&str>) {
        let query = [Key::new(TOKEN_KEY)];
        let error = match Config::write_to_in(&self.config_file, &query, token) {
            Ok(()) => {
                debug!(stored = token.is_some(), "updated persisted admin token");
                None
            },
            // nothing to remove
            Err(ReadWriteError::NotAUserValue(_)) => None,
            Err(err) => {
                warn!("Could not update the stored admin token: {err}");
                Some(err)
            },
        };
        *self.write_error.lock().unwrap_or_else(PoisonError::into_inner) = error;
    }
}

impl AuthContext for ConfigTokenStore {
    fn get(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, token: String) {
        self.persist(Some(&token));
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    fn clear(&self) {
        let previous = self
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            self.persist(None);
        }
    }
}
