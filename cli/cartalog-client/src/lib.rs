//! HTTP client for the car catalog REST API.
//!
//! This crate provides:
//! - HTTP client construction with bearer token authentication
//! - Wire types for cars, categories, manufacturers and filter queries
//! - Common error handling for catalog API operations
//! - An in-process [`MockClient`] with canned responses for tests
//!
//! ## Usage
//!
//! ```ignore
//! use cartalog_client::{CatalogClient, CatalogClientConfig, ClientTrait, InMemoryAuth};
//!
//! let auth = Arc::new(InMemoryAuth::default());
//! let client = CatalogClient::new(CatalogClientConfig::default(), auth)?;
//! let page = client.filter_cars(&FilterParams::default()).await?;
//! ```

mod auth;
mod client;
mod config;
mod dispatch;
mod error;
mod mock;
pub mod types;

pub use auth::{AuthContext, InMemoryAuth};
pub use client::{CatalogClient, ClientTrait};
pub use config::{CatalogClientConfig, DEFAULT_CATALOG_URL};
pub use dispatch::Client;
pub use error::{CatalogClientError, ResponseStatusExt};
pub use mock::{MockClient, MockDataError, MockResponse, MockResponseKind, CATALOG_MOCK_ENV};
