//! An in-process catalog with canned responses.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::client::ClientTrait;
use crate::error::CatalogClientError;
use crate::types::*;

/// Points at a JSON file with a list of [`MockResponse`]s.
/// When set, the CLI answers every request from that file instead of the network.
pub const CATALOG_MOCK_ENV: &str = "_CARTALOG_USE_CATALOG_MOCK";

// Arc allows pushing responses from outside the client while it is in use.
type MockField<T> = Arc<Mutex<T>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MockResponseKind {
    Page(PageResponse<CarSummary>),
    Cars(Vec<CarSummary>),
    Car(CarSummary),
    Categories(Vec<Category>),
    Category(Category),
    Manufacturers(Vec<Manufacturer>),
    Manufacturer(Manufacturer),
    Token(TokenResponse),
    /// An empty successful answer, as sent for deletions.
    Deleted,
    Error { status: u16, message: String },
}

/// A queued response, answered after an optional delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockResponse {
    pub response: MockResponseKind,
    #[serde(default)]
    pub delay_ms: u64,
}

impl From<MockResponseKind> for MockResponse {
    fn from(response: MockResponseKind) -> Self {
        MockResponse {
            response,
            delay_ms: 0,
        }
    }
}

#[derive(Debug, Error)]
pub enum MockDataError {
    /// Failed to read the JSON file pointed at by the mock data variable
    #[error("failed to read mock response file")]
    ReadMockFile(#[source] std::io::Error),
    /// Failed to parse the contents of the mock data file as JSON
    #[error("failed to parse mock data as JSON")]
    ParseJson(#[source] serde_json::Error),
}

/// Reads a list of mock responses from disk.
fn read_mock_responses(path: impl AsRef<Path>) -> Result<VecDeque<MockResponse>, MockDataError> {
    let contents = std::fs::read_to_string(path).map_err(MockDataError::ReadMockFile)?;
    let deserialized: Vec<MockResponse> =
        serde_json::from_str(&contents).map_err(MockDataError::ParseJson)?;
    Ok(deserialized.into())
}

/// A [`ClientTrait`] implementation answering from a queue of responses.
///
/// Every call pops the front of the queue.
/// Filter requests are recorded so tests can check what was asked for.
#[derive(Debug, Clone, Default)]
pub struct MockClient {
    mock_responses: MockField<VecDeque<MockResponse>>,
    filter_requests: MockField<Vec<FilterParams>>,
}

impl MockClient {
    /// Create a new mock client, potentially reading mock responses from disk
    pub fn new(mock_data_path: Option<impl AsRef<Path>>) -> Result<Self, MockDataError> {
        let mock_responses = match mock_data_path {
            Some(path) => read_mock_responses(path)?,
            None => VecDeque::new(),
        };
        Ok(Self {
            mock_responses: Arc::new(Mutex::new(mock_responses)),
            filter_requests: Default::default(),
        })
    }

    /// Push a new response into the list of mock responses
    pub fn push_response(&self, response: impl Into<MockResponse>) {
        self.mock_responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(response.into());
    }

    /// Push a response that is only answered after `delay`
    pub fn push_delayed_response(&self, response: MockResponseKind, delay: Duration) {
        self.push_response(MockResponse {
            response,
            delay_ms: delay.as_millis() as u64,
        });
    }

    /// Push an error response with the given status into the list of mock responses
    pub fn push_error_response(&self, status: u16, message: impl Into<String>) {
        self.push_response(MockResponseKind::Error {
            status,
            message: message.into(),
        });
    }

    /// The filters of all `filter_cars` calls so far, oldest first.
    pub fn filter_requests(&self) -> Vec<FilterParams> {
        self.filter_requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn remaining_responses(&self) -> usize {
        self.mock_responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    async fn next_response(
        &self,
        expected: &'static str,
    ) -> Result<MockResponseKind, CatalogClientError> {
        let mock_resp = self
            .mock_responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        let Some(MockResponse { response, delay_ms }) = mock_resp else {
            return Err(CatalogClientError::Other(format!(
                "expected {expected} response, but no mock responses are left"
            )));
        };

        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        debug!(expected, "answering from mock");
        match response {
            MockResponseKind::Error { status, message } => Err(mock_error(status, message)),
            other => Ok(other),
        }
    }
}

fn mock_error(status: u16, message: String) -> CatalogClientError {
    match StatusCode::from_u16(status) {
        Ok(StatusCode::UNAUTHORIZED) => CatalogClientError::Unauthorized,
        Ok(StatusCode::NOT_FOUND) => CatalogClientError::NotFound(message),
        Ok(status) => CatalogClientError::ErrorResponse { status, message },
        Err(_) => CatalogClientError::Other(format!("invalid mock status code {status}")),
    }
}

fn unexpected(expected: &str, found: MockResponseKind) -> CatalogClientError {
    CatalogClientError::Other(format!(
        "expected {expected} response, found {found:?}"
    ))
}

impl ClientTrait for MockClient {
    async fn filter_cars(
        &self,
        params: &FilterParams,
    ) -> Result<PageResponse<CarSummary>, CatalogClientError> {
        self.filter_requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(params.clone());
        match self.next_response("page").await? {
            MockResponseKind::Page(page) => Ok(page),
            other => Err(unexpected("page", other)),
        }
    }

    async fn cars(&self) -> Result<Vec<CarSummary>, CatalogClientError> {
        match self.next_response("cars").await? {
            MockResponseKind::Cars(cars) => Ok(cars),
            other => Err(unexpected("cars", other)),
        }
    }

    async fn car(&self, _id: u64) -> Result<CarSummary, CatalogClientError> {
        match self.next_response("car").await? {
            MockResponseKind::Car(car) => Ok(car),
            other => Err(unexpected("car", other)),
        }
    }

    async fn create_car(
        &self,
        _payload: &CarPayload,
        _images: Vec<ImageAttachment>,
    ) -> Result<CarSummary, CatalogClientError> {
        self.car(0).await
    }

    async fn update_car(
        &self,
        id: u64,
        _payload: &CarPayload,
        _images: Vec<ImageAttachment>,
    ) -> Result<CarSummary, CatalogClientError> {
        self.car(id).await
    }

    async fn delete_car(&self, _id: u64) -> Result<(), CatalogClientError> {
        match self.next_response("deleted").await? {
            MockResponseKind::Deleted => Ok(()),
            other => Err(unexpected("deleted", other)),
        }
    }

    async fn categories(&self) -> Result<Vec<Category>, CatalogClientError> {
        match self.next_response("categories").await? {
            MockResponseKind::Categories(categories) => Ok(categories),
            other => Err(unexpected("categories", other)),
        }
    }

    async fn category(&self, _id: u64) -> Result<Category, CatalogClientError> {
        match self.next_response("category").await? {
            MockResponseKind::Category(category) => Ok(category),
            other => Err(unexpected("category", other)),
        }
    }

    async fn create_category(
        &self,
        _payload: &CategoryPayload,
    ) -> Result<Category, CatalogClientError> {
        self.category(0).await
    }

    async fn update_category(
        &self,
        id: u64,
        _payload: &CategoryPayload,
    ) -> Result<Category, CatalogClientError> {
        self.category(id).await
    }

    async fn delete_category(&self, id: u64) -> Result<(), CatalogClientError> {
        self.delete_car(id).await
    }

    async fn manufacturers(&self) -> Result<Vec<Manufacturer>, CatalogClientError> {
        match self.next_response("manufacturers").await? {
            MockResponseKind::Manufacturers(manufacturers) => Ok(manufacturers),
            other => Err(unexpected("manufacturers", other)),
        }
    }

    async fn manufacturer(&self, _id: u64) -> Result<Manufacturer, CatalogClientError> {
        match self.next_response("manufacturer").await? {
            MockResponseKind::Manufacturer(manufacturer) => Ok(manufacturer),
            other => Err(unexpected("manufacturer", other)),
        }
    }

    async fn create_manufacturer(
        &self,
        _payload: &ManufacturerPayload,
    ) -> Result<Manufacturer, CatalogClientError> {
        self.manufacturer(0).await
    }

    async fn update_manufacturer(
        &self,
        id: u64,
        _payload: &ManufacturerPayload,
    ) -> Result<Manufacturer, CatalogClientError> {
        self.manufacturer(id).await
    }

    async fn delete_manufacturer(&self, id: u64) -> Result<(), CatalogClientError> {
        self.delete_car(id).await
    }

    async fn authenticate(
        &self,
        _credentials: &Credentials,
    ) -> Result<TokenResponse, CatalogClientError> {
        match self.next_response("token").await? {
            MockResponseKind::Token(token) => Ok(token),
            other => Err(unexpected("token", other)),
        }
    }
}
