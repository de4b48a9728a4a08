use std::collections::HashMap;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use anyhow::{Context, Result};
use cartalog_sdk::models::debounce::QuietPeriod;
use cartalog_sdk::session::SessionConfig;
use config::{Config as HierarchicalConfig, Environment};
use itertools::Itertools;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use tempfile::PersistError;
use thiserror::Error;
use toml_edit::{DocumentMut, Item, Key, Table, TableLike};

/// Name of the cartalog config directory
pub const CARTALOG_DIR_NAME: &str = "cartalog";
const CARTALOG_CONFIG_DIR_VAR: &str = "CARTALOG_CONFIG_DIR";
const CARTALOG_ENV_PREFIX: &str = "CARTALOG";
pub const CARTALOG_CONFIG_FILE: &str = "cartalog.toml";

/// User configuration, read from the config file and `CARTALOG_*` variables
#[derive(Clone, Debug, Deserialize, Serialize, Default)]
pub struct Config {
    /// Directory where cartalog loads its configuration file from
    /// (default: `$XDG_CONFIG_HOME/cartalog`)
    #[serde(default)]
    pub config_dir: PathBuf,

    /// Base URL of the catalog backend
    // Using a URL here adds an extra trailing slash,
    // so just use a String.
    pub catalog_url: Option<String>,

    /// How many cars a page of results holds
    pub page_size: Option<NonZeroU32>,

    /// Seconds to wait for a page of results before giving up
    pub request_timeout_secs: Option<u64>,

    /// Milliseconds the keyword must stay unchanged after typing
    pub typing_quiet_ms: Option<u64>,

    /// Milliseconds the keyword must stay unchanged after deleting
    pub deletion_quiet_ms: Option<u64>,

    /// Token of the logged in administrator
    pub admin_token: Option<String>,
}

/// Error returned by [`Config::get()`]
#[derive(Debug, Error)]
pub enum ReadWriteError {
    #[error("Invalid config key: '{}'", display_key(_0))]
    InvalidKey(Vec<Key>),
    #[error("Config key '{}' not in user configuration", display_key(_0))]
    NotAUserValue(Vec<Key>),
    #[error(transparent)]
    TomlEdit(#[from] toml_edit::TomlError),
    #[error(transparent)]
    TomlSer(#[from] toml_edit::ser::Error),
    #[error(transparent)]
    TomlDe(#[from] toml_edit::de::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Could not read config file: {0}")]
    ReadConfig(std::io::Error),
    #[error("Could not write config file: {0}")]
    WriteConfig(std::io::Error),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

fn display_key(path: &[Key]) -> String {
    path.iter()
        .map(|key| key.display_repr().into_owned())
        .join(".")
}

impl Config {
    fn read_raw_config() -> Result<HierarchicalConfig> {
        let config_dir = match env::var(CARTALOG_CONFIG_DIR_VAR) {
            Ok(v) => {
                debug!("`${CARTALOG_CONFIG_DIR_VAR}` set: {v}");
                PathBuf::from(v)
            },
            Err(_) => {
                let config_dir = dirs::config_dir()
                    .context("Could not determine the user config directory")?
                    .join(CARTALOG_DIR_NAME);
                debug!("`${CARTALOG_CONFIG_DIR_VAR}` not set, using {config_dir:?}");
                config_dir
            },
        };
        fs::create_dir_all(&config_dir)
            .with_context(|| format!("Could not create config directory: {config_dir:?}"))?;

        let config_dir_str = config_dir
            .to_str()
            .context("Config directory is not valid UTF-8")?;

        let builder = HierarchicalConfig::builder()
            // Config dir is added to the config for completeness;
            // the config file cannot change the config dir.
            .set_override("config_dir", config_dir_str)?
            .add_source(
                config::File::from(config_dir.join(CARTALOG_CONFIG_FILE))
                    .format(config::FileFormat::Toml)
                    .required(false),
            );

        // override via env variables
        let cartalog_envs: HashMap<String, String> = env::vars()
            .filter(|(k, _)| k != CARTALOG_CONFIG_DIR_VAR)
            .filter_map(|(k, v)| {
                k.strip_prefix(&format!("{CARTALOG_ENV_PREFIX}_"))
                    .map(|k| (k.to_lowercase(), v))
            })
            .collect();

        let builder = builder.add_source(
            Environment::default()
                .source(Some(cartalog_envs))
                .try_parsing(true),
        );

        Ok(builder.build()?)
    }

    /// Creates a [Config] from the environment and config file
    pub fn parse() -> Result<Config> {
        let raw = Self::read_raw_config()?;
        let config: Config = raw.try_deserialize().context("Could not parse config")?;
        Ok(config)
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CARTALOG_CONFIG_FILE)
    }

    /// Settings of an interactive browsing session
    pub fn session_config(&self) -> SessionConfig {
        let defaults = SessionConfig::default();
        let quiet = QuietPeriod {
            typing: self
                .typing_quiet_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.quiet.typing),
            deletion: self
                .deletion_quiet_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.quiet.deletion),
        };
        SessionConfig {
            page_size: self.page_size.unwrap_or(defaults.page_size),
            quiet,
            fetch_timeout: self
                .request_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.fetch_timeout),
        }
    }

    /// get a value from the config
    ///
    /// **intended for human consumption/introspection of config only**
    ///
    /// Values in the context should be read from the [Config] type instead!
    pub fn get(&self, path: &[Key]) -> Result<String, ReadWriteError> {
        let document: DocumentMut = toml_edit::ser::to_document(self)?;

        let Some((key, parents)) = path.split_last() else {
            return Ok(document.to_string());
        };

        let mut cfg = document.as_table() as &dyn TableLike;

        for (n, segment) in parents.iter().enumerate() {
            match cfg.get(segment).and_then(|item| item.as_table_like()) {
                Some(v) => cfg = v,
                None => return Err(ReadWriteError::InvalidKey(path[..=n].to_vec())),
            }
        }

        let value = cfg
            .get(key.get())
            .ok_or_else(|| ReadWriteError::InvalidKey(path.to_vec()))?;

        Ok(value.to_string())
    }

    /// Append, update or remove a key in the toml representation of a partial config
    ///
    /// Validate using [Self]
    pub fn write_to<V: Serialize>(
        config_file: Option<String>,
        path: &[Key],
        value: Option<V>,
    ) -> Result<String, ReadWriteError> {
        let mut validation_document = toml_edit::ser::to_document(&Config::default())?;

        let mut document = match config_file {
            Some(content) => content.parse::<DocumentMut>()?,
            None => DocumentMut::new(),
        };

        let Some((key, parents)) = path.split_last() else {
            return Err(ReadWriteError::InvalidKey(vec![]));
        };

        let (mut handle, mut validation) =
            (document.as_table_mut(), validation_document.as_table_mut());

        for segment in parents {
            trace!("stepping into path segment {}", segment);

            if !handle.contains_table(segment) {
                handle.insert(segment, Item::Table(Table::new()));
            }
            if !validation.contains_table(segment) {
                validation.insert(segment, Item::Table(Table::new()));
            }

            handle = handle
                .get_mut(segment)
                .and_then(Item::as_table_mut)
                .ok_or_else(|| ReadWriteError::InvalidKey(path.to_vec()))?;
            validation = validation
                .get_mut(segment)
                .and_then(Item::as_table_mut)
                .ok_or_else(|| ReadWriteError::InvalidKey(path.to_vec()))?;
        }

        trace!("write value for key '{}'", key.display_repr());

        match value {
            None => {
                handle
                    .remove(key.get())
                    .ok_or_else(|| ReadWriteError::NotAUserValue(path.to_vec()))?;
            },
            Some(ref value) => {
                for handle in [handle, validation] {
                    handle.insert(
                        key.get(),
                        Item::Value(value.serialize(toml_edit::ser::ValueSerializer::new())?),
                    );
                }
                trace!("try parsing the new virtual config (validation)");
                let validation_config: Config = toml_edit::de::from_document(validation_document)?;

                validation_config.get(path)?;
            },
        }

        Ok(document.to_string())
    }

    /// Update the config file at `config_file_path` with [Self::write_to],
    /// replacing it atomically.
    pub fn write_to_in<V: Serialize>(
        config_file_path: impl AsRef<Path>,
        query: &[Key],
        value: Option<V>,
    ) -> Result<(), ReadWriteError> {
        let config_file_path = config_file_path.as_ref();
        let config_file_contents = match fs::read_to_string(config_file_path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(
                    "No existing user config file found in {:?}, creating it now",
                    config_file_path
                );
                Ok(None)
            },
            Err(e) => Err(e),
        }
        .map_err(ReadWriteError::ReadConfig)?;

        let config_file_contents = Self::write_to(config_file_contents, query, value)?;

        let temp_dir = config_file_path.parent().unwrap_or(Path::new("."));
        let tempfile = tempfile::Builder::new().tempfile_in(temp_dir)?;
        fs::write(&tempfile, config_file_contents).map_err(ReadWriteError::WriteConfig)?;
        tempfile.persist(config_file_path)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;

    fn key(key: &str) -> Vec<Key> {
        Key::parse(key).unwrap()
    }

    #[test]
    fn read_number() {
        let config = Config {
            page_size: NonZeroU32::new(12),
            ..Default::default()
        };
        assert_eq!(config.get(&key("page_size")).unwrap(), "12");
    }

    #[test]
    fn set_by_env() {
        let tempdir = tempfile::tempdir().unwrap();
        temp_env::with_vars(
            [
                (
                    CARTALOG_CONFIG_DIR_VAR,
                    Some(tempdir.path().to_string_lossy().as_ref()),
                ),
                ("CARTALOG_CATALOG_URL", Some("https://cars.example.com")),
                ("CARTALOG_PAGE_SIZE", Some("5")),
            ],
            || {
                let config = Config::parse().unwrap();
                assert_eq!(
                    config.catalog_url.as_deref(),
                    Some("https://cars.example.com")
                );
                assert_eq!(config.session_config().page_size.get(), 5);
                assert_eq!(config.config_dir, tempdir.path());
            },
        );
    }

    #[test]
    fn file_is_read_and_env_wins() {
        let tempdir = tempfile::tempdir().unwrap();
        fs::write(tempdir.path().join(CARTALOG_CONFIG_FILE), indoc! {"
            catalog_url = \"http://from-file\"
            typing_quiet_ms = 150
        "})
        .unwrap();

        temp_env::with_vars(
            [
                (
                    CARTALOG_CONFIG_DIR_VAR,
                    Some(tempdir.path().to_string_lossy().as_ref()),
                ),
                ("CARTALOG_CATALOG_URL", Some("http://from-env")),
            ],
            || {
                let config = Config::parse().unwrap();
                assert_eq!(config.catalog_url.as_deref(), Some("http://from-env"));

                let session = config.session_config();
                assert_eq!(session.quiet.typing, Duration::from_millis(150));
                assert_eq!(session.quiet.deletion, QuietPeriod::default().deletion);
            },
        );
    }

    #[test]
    fn writing_value() {
        let config_content =
            Config::write_to(None, &key("catalog_url"), Some("https://example.com")).unwrap();
        assert_eq!(config_content, indoc! {"
            catalog_url = \"https://example.com\"
            "})
    }

    #[test]
    fn appending_value_keeps_comment() {
        let config_before = indoc! {"
        # staging backend
        catalog_url = \"hello\"
        "};

        let config_content =
            Config::write_to(Some(config_before.to_string()), &key("page_size"), Some(10)).unwrap();
        assert_eq!(config_content, indoc! {"
        # staging backend
        catalog_url = \"hello\"
        page_size = 10
        "});
    }

    #[test]
    fn writing_invalid_key() {
        let result = Config::write_to(None, &key("does_not_exist"), Some("true"));
        assert!(matches!(result, Err(ReadWriteError::InvalidKey(_))));
    }

    #[test]
    fn writing_invalid_value() {
        let result = Config::write_to(None, &key("page_size"), Some(0));
        assert!(matches!(result, Err(ReadWriteError::TomlDe(_))));
    }

    #[test]
    fn removing_missing_value() {
        let result = Config::write_to::<()>(None, &key("admin_token"), None);
        assert!(matches!(result, Err(ReadWriteError::NotAUserValue(_))));
    }

    #[test]
    fn write_to_in_persists() {
        let tempdir = tempfile::tempdir().unwrap();
        let file = tempdir.path().join(CARTALOG_CONFIG_FILE);

        Config::write_to_in(&file, &key("admin_token"), Some("jwt")).unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "admin_token = \"jwt\"\n");

        Config::write_to_in::<()>(&file, &key("admin_token"), None).unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "");
    }
}
