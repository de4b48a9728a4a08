//! Error handling for catalog API operations.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Common error type for catalog API operations.
#[derive(Debug, Error)]
pub enum CatalogClientError {
    /// Either no token is available or the backend rejected it.
    /// Callers are expected to send the user back through login.
    #[error("Authentication token not found. Please login again.")]
    Unauthorized,
    #[error("{}", .0)]
    NotFound(String),
    #[error("{status}: {message}")]
    ErrorResponse { status: StatusCode, message: String },
    #[error("request to catalog failed")]
    Request(#[source] reqwest::Error),
    #[error("{}", .0)]
    Other(String),
}

impl CatalogClientError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, CatalogClientError::Unauthorized)
    }

    /// Whether the request never got an answer in time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CatalogClientError::Request(err) if err.is_timeout())
    }
}

/// The body the backend sends along with non-success statuses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Extension trait for converting non-success responses into client errors.
pub trait ResponseStatusExt: Sized {
    /// Passes successful responses through, and turns everything else
    /// into a [`CatalogClientError`], preferring the backend's own message.
    fn error_for_catalog_status(
        self,
    ) -> impl std::future::Future<Output = Result<Self, CatalogClientError>> + Send;
}

impl ResponseStatusExt for reqwest::Response {
    async fn error_for_catalog_status(self) -> Result<Self, CatalogClientError> {
        let status = self.status();
        if status.is_success() {
            return Ok(self);
        }

        if status == StatusCode::UNAUTHORIZED {
            return Err(CatalogClientError::Unauthorized);
        }

        // The body may be HTML from a proxy, only keep it if it parses.
        let message = self
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message)
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unexpected response")
                    .to_string()
            });

        if status == StatusCode::NOT_FOUND {
            return Err(CatalogClientError::NotFound(message));
        }

        Err(CatalogClientError::ErrorResponse { status, message })
    }
}
