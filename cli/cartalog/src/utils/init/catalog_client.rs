use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use cartalog_client::{
    AuthContext,
    CATALOG_MOCK_ENV,
    CatalogClient,
    CatalogClientConfig,
    Client,
    DEFAULT_CATALOG_URL,
    MockClient,
};
use tracing::debug;

use crate::config::Config;

/// Initialize the catalog client
///
/// - Initialize a mock client if `_CARTALOG_USE_CATALOG_MOCK` points at a file of mock responses
/// - Initialize a real client otherwise
pub fn init_catalog_client(
    config: &Config,
    auth: Arc<dyn AuthContext>,
) -> Result<Client, anyhow::Error> {
    if let Ok(path_str) = std::env::var(CATALOG_MOCK_ENV) {
        let path = PathBuf::from(path_str);
        if !path.exists() {
            bail!("path to mock data file doesn't exist: {}", path.display());
        }

        debug!(mock_data_path = %path.display(), "using mock catalog client");
        return Ok(MockClient::new(Some(path))?.into());
    }

    let mut extra_headers: BTreeMap<String, String> = BTreeMap::new();

    // Pass in a bool if we are running in CI, so requests can reflect this in the headers
    if std::env::var("CI").is_ok() {
        extra_headers.insert("cartalog-ci".to_string(), "true".to_string());
    };

    let catalog_url = config
        .catalog_url
        .clone()
        .unwrap_or_else(|| DEFAULT_CATALOG_URL.to_string());

    let mut client_config = CatalogClientConfig {
        catalog_url,
        extra_headers,
        user_agent: Some(format!("cartalog/{}", env!("CARGO_PKG_VERSION"))),
        ..Default::default()
    };
    if let Some(secs) = config.request_timeout_secs {
        client_config.request_timeout = Duration::from_secs(secs);
    }

    debug!("using catalog client with url: {}", client_config.catalog_url);
    let client = CatalogClient::new(client_config, auth).context("Invalid catalog URL")?;
    Ok(client.into())
}
