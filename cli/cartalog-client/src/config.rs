//! Configuration types for catalog client construction.

use std::collections::BTreeMap;
use std::time::Duration;

/// Where the catalog backend listens unless configured otherwise.
pub const DEFAULT_CATALOG_URL: &str = "http://localhost:8082/CarCatalog";

/// Configuration for catalog client construction.
#[derive(Debug, Clone)]
pub struct CatalogClientConfig {
    /// Base URL for the catalog API, without a trailing slash.
    pub catalog_url: String,
    /// Additional headers to include in requests.
    pub extra_headers: BTreeMap<String, String>,
    /// Override for the `User-Agent` header.
    pub user_agent: Option<String>,
    pub connect_timeout: Duration,
    /// Upper bound for a whole request, including reading the body.
    pub request_timeout: Duration,
}

impl Default for CatalogClientConfig {
    fn default() -> Self {
        Self {
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            extra_headers: BTreeMap::new(),
            user_agent: None,
            connect_timeout: Duration::from_secs(15),
            request_timeout: Duration::from_secs(60),
        }
    }
}
