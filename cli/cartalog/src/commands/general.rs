use std::io;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use bpaf::Bpaf;
use serde::Serialize;
use serde_json::Value;
use tokio::fs;
use toml_edit::{Key, TomlError};
use tracing::{debug, instrument};

use crate::config::{Config, ReadWriteError};
use crate::utils::message;

const REDACTED: &str = "<redacted>";

#[derive(Debug, Bpaf, Clone)]
#[bpaf(fallback(ConfigArgs::List))]
pub enum ConfigArgs {
    /// List the current values of all options
    #[bpaf(short, long)]
    List,
    /// Reset all options to their default values without further confirmation
    #[bpaf(short, long)]
    Reset,
    /// Set a config value
    Set(#[bpaf(external(config_set))] ConfigSet),
    /// Delete a config value
    Delete(#[bpaf(external(config_delete))] ConfigDelete),
}

impl ConfigArgs {
    /// handle config flags like commands
    #[instrument(name = "config", skip_all)]
    pub async fn handle(&self, config: Config) -> Result<()> {
        match self {
            ConfigArgs::List => println!("{}", listing(config)?),
            ConfigArgs::Reset => {
                match fs::remove_file(config.config_file()).await {
                    Err(err) if err.kind() != io::ErrorKind::NotFound => {
                        Err(err).context("Could not reset config file")?
                    },
                    _ => (),
                }
                message::deleted("Configuration reset to defaults");
            },
            ConfigArgs::Set(ConfigSet { key, value, .. }) => {
                let parsed_value = match Value::from_str(value) {
                    Ok(parsed) => {
                        debug!(supplied = value, ?parsed, "parsed config value");
                        parsed
                    },
                    Err(error) => {
                        debug!(
                            supplied = value,
                            ?error,
                            "failed to parse as JSON value, treating as unquoted string"
                        );
                        Value::String(value.clone())
                    },
                };

                update_config(&config.config_file(), key, Some(parsed_value))?;
                message::updated(format!("Set '{key}'"));
            },
            ConfigArgs::Delete(ConfigDelete { key }) => {
                update_config::<()>(&config.config_file(), key, None)?;
                message::deleted(format!("Deleted '{key}'"));
            },
        }
        Ok(())
    }
}

/// The effective config as TOML, without the stored token.
fn listing(mut config: Config) -> Result<String, ReadWriteError> {
    if config.admin_token.is_some() {
        config.admin_token = Some(REDACTED.to_string());
    }
    config.get(&[])
}

#[derive(Debug, Clone, Bpaf)]
#[bpaf(adjacent)]
pub struct ConfigSet {
    /// set <key> to <string>
    #[allow(unused)]
    set: (),
    /// Configuration key
    #[bpaf(positional("key"))]
    key: String,
    /// Configuration value (string)
    #[bpaf(positional("string"))]
    value: String,
}

#[derive(Debug, Clone, Bpaf)]
pub struct ConfigDelete {
    /// Delete config key
    #[bpaf(long("delete"), argument("key"))]
    key: String,
}

/// wrapper around [Config::write_to_in]
fn update_config<V: Serialize>(
    config_file_path: &Path,
    key: impl AsRef<str>,
    value: Option<V>,
) -> Result<()> {
    let query = parse_toml_key(key.as_ref()).context("Could not parse key")?;

    match Config::write_to_in(config_file_path, &query, value) {
        err @ Err(ReadWriteError::ReadConfig(_)) => err.context(
            "Could not read current config file.\nPlease verify the format or reset using `cartalog config --reset`",
        )?,
        err @ Err(_) => err?,
        Ok(()) => (),
    }
    Ok(())
}

/// Parse a TOML key from a string, quoting any segments where necessary, so
/// that a user doesn't need to understand the intricacies of TOML.
fn parse_toml_key(key: &str) -> Result<Vec<Key>, TomlError> {
    let normalized_key = key
        .split('.')
        .map(|segment| {
            let quoting_not_needed = segment
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '-');
            let contains_some_quotes = segment.contains('"') || segment.contains('\'');

            if quoting_not_needed || contains_some_quotes {
                segment.to_string()
            } else {
                format!("'{}'", segment)
            }
        })
        .collect::<Vec<_>>()
        .join(".");

    Key::parse(&normalized_key)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;
    use crate::config::CARTALOG_CONFIG_FILE;

    fn config_in(dir: &TempDir) -> Config {
        Config {
            config_dir: dir.path().to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn parse_toml_key_plain() {
        let parsed = parse_toml_key("catalog_url").unwrap();
        assert_eq!(parsed, vec!["catalog_url"]);
    }

    #[test]
    fn parse_toml_key_adds_quoting() {
        let parsed = parse_toml_key("headers.x/y").unwrap();
        assert_eq!(parsed, vec!["headers", "x/y"]);
    }

    #[test]
    fn parse_toml_key_already_double_quoted_dotted() {
        let parsed = parse_toml_key(r#"headers."a.b""#).unwrap();
        assert_eq!(parsed, vec!["headers", "a.b"]);
    }

    #[test]
    fn parse_toml_key_stray_quote() {
        assert!(parse_toml_key("catalog'url").is_err());
    }

    #[test]
    fn listing_hides_token() {
        let config = Config {
            admin_token: Some("jwt".to_string()),
            ..Default::default()
        };
        let listed = listing(config).unwrap();
        assert!(listed.contains(REDACTED), "{listed}");
        assert!(!listed.contains("jwt"), "{listed}");
    }

    #[tokio::test]
    async fn set_parses_numbers_and_strings() {
        let dir = TempDir::new().unwrap();

        for (key, value) in [("page_size", "12"), ("catalog_url", "http://localhost:9000")] {
            ConfigArgs::Set(ConfigSet {
                set: (),
                key: key.to_string(),
                value: value.to_string(),
            })
            .handle(config_in(&dir))
            .await
            .unwrap();
        }

        let written = std::fs::read_to_string(dir.path().join(CARTALOG_CONFIG_FILE)).unwrap();
        assert_eq!(
            written,
            "page_size = 12\ncatalog_url = \"http://localhost:9000\"\n"
        );
    }

    #[tokio::test]
    async fn set_rejects_unknown_values() {
        let dir = TempDir::new().unwrap();
        let result = ConfigArgs::Set(ConfigSet {
            set: (),
            key: "page_size".to_string(),
            value: "many".to_string(),
        })
        .handle(config_in(&dir))
        .await;

        assert!(result.is_err());
        assert!(!dir.path().join(CARTALOG_CONFIG_FILE).exists());
    }

    #[tokio::test]
    async fn delete_then_reset() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join(CARTALOG_CONFIG_FILE);
        std::fs::write(&file, "page_size = 5\nrequest_timeout_secs = 3\n").unwrap();

        ConfigArgs::Delete(ConfigDelete {
            key: "page_size".to_string(),
        })
        .handle(config_in(&dir))
        .await
        .unwrap();
        assert_eq!(
            std::fs::read_to_string(&file).unwrap(),
            "request_timeout_secs = 3\n"
        );

        ConfigArgs::Reset.handle(config_in(&dir)).await.unwrap();
        assert!(!file.exists());

        // nothing left to reset
        ConfigArgs::Reset.handle(config_in(&dir)).await.unwrap();
    }
}
