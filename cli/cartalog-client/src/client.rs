//! Catalog client talking to the car catalog REST API.

use std::fmt::Debug;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use reqwest::header::{self, HeaderMap};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::auth::AuthContext;
use crate::config::CatalogClientConfig;
use crate::error::{CatalogClientError, ResponseStatusExt};
use crate::types::*;

/// A client for the catalog service.
///
/// Handles:
/// - HTTP client configuration with timeouts
/// - Bearer token authentication via an injected [`AuthContext`]
/// - Mapping of error responses, including clearing rejected tokens
pub struct CatalogClient {
    client: reqwest::Client,
    config: CatalogClientConfig,
    auth: Arc<dyn AuthContext>,
}

impl Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("catalog_url", &self.config.catalog_url)
            .finish_non_exhaustive()
    }
}

impl CatalogClient {
    /// Create a new catalog client from configuration.
    pub fn new(
        config: CatalogClientConfig,
        auth: Arc<dyn AuthContext>,
    ) -> Result<Self, CatalogClientError> {
        url::Url::parse(&config.catalog_url).map_err(|e| {
            CatalogClientError::Other(format!("invalid catalog url '{}': {e}", config.catalog_url))
        })?;
        let client = build_http_client(&config)?;
        Ok(Self {
            client,
            config,
            auth,
        })
    }

    /// Get the configured catalog URL.
    pub fn catalog_url(&self) -> &str {
        &self.config.catalog_url
    }

    pub fn auth(&self) -> &Arc<dyn AuthContext> {
        &self.auth
    }

    /// Update the client configuration and recreate the client.
    pub fn update_config(
        &mut self,
        update: impl FnOnce(&mut CatalogClientConfig),
    ) -> Result<(), CatalogClientError> {
        let mut modified_config = self.config.clone();
        update(&mut modified_config);
        *self = Self::new(modified_config, self.auth.clone())?;
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.catalog_url.trim_end_matches('/'))
    }

    /// Start a request, attaching the current token if there is one.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match self.auth.get() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Start a request that must not leave the process without a token.
    fn admin_request(
        &self,
        method: Method,
        path: &str,
    ) -> Result<RequestBuilder, CatalogClientError> {
        let Some(token) = self.auth.get() else {
            debug!(path, "no token available for admin request");
            return Err(CatalogClientError::Unauthorized);
        };
        Ok(self
            .client
            .request(method, self.url(path))
            .bearer_auth(token))
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, CatalogClientError> {
        let response = request.send().await.map_err(CatalogClientError::Request)?;
        debug!(status = %response.status(), url = %response.url(), "catalog responded");

        match response.error_for_catalog_status().await {
            Err(CatalogClientError::Unauthorized) => {
                debug!("token rejected, clearing authentication");
                self.auth.clear();
                Err(CatalogClientError::Unauthorized)
            },
            other => other,
        }
    }

    async fn send_json<T>(&self, request: RequestBuilder) -> Result<T, CatalogClientError>
    where
        T: DeserializeOwned + Send,
    {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(CatalogClientError::Request)
    }

    async fn get_json<T>(&self, path: &str) -> Result<T, CatalogClientError>
    where
        T: DeserializeOwned + Send,
    {
        self.send_json(self.request(Method::GET, path)).await
    }

    async fn write_json<B, T>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, CatalogClientError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        let request = self.admin_request(method, path)?.json(body);
        self.send_json(request).await
    }

    async fn delete(&self, path: &str) -> Result<(), CatalogClientError> {
        let request = self.admin_request(Method::DELETE, path)?;
        self.send(request).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Catalog trait
// ---------------------------------------------------------------------------

/// The complete catalog API interface.
///
/// This trait enables alternate implementations:
/// - **HTTP**: REST calls to the catalog backend via [`CatalogClient`]
/// - **Mock**: canned responses without HTTP via [`crate::MockClient`]
pub trait ClientTrait: Send + Sync {
    /// Fetch one page of cars matching the given filter.
    fn filter_cars(
        &self,
        params: &FilterParams,
    ) -> impl Future<Output = Result<PageResponse<CarSummary>, CatalogClientError>> + Send;

    /// List every car without pagination.
    fn cars(&self) -> impl Future<Output = Result<Vec<CarSummary>, CatalogClientError>> + Send;

    fn car(&self, id: u64) -> impl Future<Output = Result<CarSummary, CatalogClientError>> + Send;

    /// Create a car, uploading `images` next to the JSON description.
    fn create_car(
        &self,
        payload: &CarPayload,
        images: Vec<ImageAttachment>,
    ) -> impl Future<Output = Result<CarSummary, CatalogClientError>> + Send;

    fn update_car(
        &self,
        id: u64,
        payload: &CarPayload,
        images: Vec<ImageAttachment>,
    ) -> impl Future<Output = Result<CarSummary, CatalogClientError>> + Send;

    fn delete_car(&self, id: u64) -> impl Future<Output = Result<(), CatalogClientError>> + Send;

    fn categories(&self) -> impl Future<Output = Result<Vec<Category>, CatalogClientError>> + Send;

    fn category(&self, id: u64) -> impl Future<Output = Result<Category, CatalogClientError>> + Send;

    fn create_category(
        &self,
        payload: &CategoryPayload,
    ) -> impl Future<Output = Result<Category, CatalogClientError>> + Send;

    fn update_category(
        &self,
        id: u64,
        payload: &CategoryPayload,
    ) -> impl Future<Output = Result<Category, CatalogClientError>> + Send;

    fn delete_category(
        &self,
        id: u64,
    ) -> impl Future<Output = Result<(), CatalogClientError>> + Send;

    fn manufacturers(
        &self,
    ) -> impl Future<Output = Result<Vec<Manufacturer>, CatalogClientError>> + Send;

    fn manufacturer(
        &self,
        id: u64,
    ) -> impl Future<Output = Result<Manufacturer, CatalogClientError>> + Send;

    fn create_manufacturer(
        &self,
        payload: &ManufacturerPayload,
    ) -> impl Future<Output = Result<Manufacturer, CatalogClientError>> + Send;

    fn update_manufacturer(
        &self,
        id: u64,
        payload: &ManufacturerPayload,
    ) -> impl Future<Output = Result<Manufacturer, CatalogClientError>> + Send;

    fn delete_manufacturer(
        &self,
        id: u64,
    ) -> impl Future<Output = Result<(), CatalogClientError>> + Send;

    /// Exchange credentials for a bearer token.
    ///
    /// Does not store the token, see the SDK's login flow for that.
    fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<TokenResponse, CatalogClientError>> + Send;
}

impl ClientTrait for CatalogClient {
    #[instrument(skip_all, fields(page = params.page, size = %params.size))]
    async fn filter_cars(
        &self,
        params: &FilterParams,
    ) -> Result<PageResponse<CarSummary>, CatalogClientError> {
        let query = params.to_query_pairs();
        debug!(params = query.len(), "filtering cars");
        let request = self
            .request(Method::GET, "/admin/cars/filter")
            .query(&query);
        let page: PageResponse<CarSummary> = self.send_json(request).await?;
        debug!(
            items = page.content.len(),
            total_pages = page.total_pages,
            "received page of cars"
        );
        Ok(page)
    }

    #[instrument(skip_all)]
    async fn cars(&self) -> Result<Vec<CarSummary>, CatalogClientError> {
        self.get_json("/admin/cars/collections").await
    }

    #[instrument(skip(self))]
    async fn car(&self, id: u64) -> Result<CarSummary, CatalogClientError> {
        self.get_json(&format!("/admin/cars/{id}")).await
    }

    #[instrument(skip_all, fields(name = %payload.name, images = images.len()))]
    async fn create_car(
        &self,
        payload: &CarPayload,
        images: Vec<ImageAttachment>,
    ) -> Result<CarSummary, CatalogClientError> {
        let form = car_form(payload, images)?;
        let request = self
            .admin_request(Method::POST, "/admin/cars")?
            .multipart(form);
        self.send_json(request).await
    }

    #[instrument(skip(self, payload, images), fields(images = images.len()))]
    async fn update_car(
        &self,
        id: u64,
        payload: &CarPayload,
        images: Vec<ImageAttachment>,
    ) -> Result<CarSummary, CatalogClientError> {
        let form = car_form(payload, images)?;
        let request = self
            .admin_request(Method::PUT, &format!("/admin/cars/{id}"))?
            .multipart(form);
        self.send_json(request).await
    }

    #[instrument(skip(self))]
    async fn delete_car(&self, id: u64) -> Result<(), CatalogClientError> {
        self.delete(&format!("/admin/cars/{id}")).await
    }

    #[instrument(skip_all)]
    async fn categories(&self) -> Result<Vec<Category>, CatalogClientError> {
        self.get_json("/admin/categories/collections").await
    }

    #[instrument(skip(self))]
    async fn category(&self, id: u64) -> Result<Category, CatalogClientError> {
        self.get_json(&format!("/admin/categories/{id}")).await
    }

    #[instrument(skip_all, fields(name = %payload.name))]
    async fn create_category(
        &self,
        payload: &CategoryPayload,
    ) -> Result<Category, CatalogClientError> {
        self.write_json(Method::POST, "/admin/categories", payload)
            .await
    }

    #[instrument(skip(self, payload))]
    async fn update_category(
        &self,
        id: u64,
        payload: &CategoryPayload,
    ) -> Result<Category, CatalogClientError> {
        self.write_json(Method::PUT, &format!("/admin/categories/{id}"), payload)
            .await
    }

    #[instrument(skip(self))]
    async fn delete_category(&self, id: u64) -> Result<(), CatalogClientError> {
        self.delete(&format!("/admin/categories/{id}")).await
    }

    #[instrument(skip_all)]
    async fn manufacturers(&self) -> Result<Vec<Manufacturer>, CatalogClientError> {
        self.get_json("/admin/suppliers/collections").await
    }

    #[instrument(skip(self))]
    async fn manufacturer(&self, id: u64) -> Result<Manufacturer, CatalogClientError> {
        self.get_json(&format!("/admin/suppliers/{id}")).await
    }

    #[instrument(skip_all, fields(name = %payload.name))]
    async fn create_manufacturer(
        &self,
        payload: &ManufacturerPayload,
    ) -> Result<Manufacturer, CatalogClientError> {
        self.write_json(Method::POST, "/admin/suppliers", payload)
            .await
    }

    #[instrument(skip(self, payload))]
    async fn update_manufacturer(
        &self,
        id: u64,
        payload: &ManufacturerPayload,
    ) -> Result<Manufacturer, CatalogClientError> {
        self.write_json(Method::PUT, &format!("/admin/suppliers/{id}"), payload)
            .await
    }

    #[instrument(skip(self))]
    async fn delete_manufacturer(&self, id: u64) -> Result<(), CatalogClientError> {
        self.delete(&format!("/admin/suppliers/{id}")).await
    }

    #[instrument(skip_all, fields(username = %credentials.username))]
    async fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<TokenResponse, CatalogClientError> {
        // Login never carries a stale token.
        let request = self
            .client
            .post(self.url("/authenticate"))
            .json(credentials);
        let response = request.send().await.map_err(CatalogClientError::Request)?;
        response
            .error_for_catalog_status()
            .await?
            .json()
            .await
            .map_err(CatalogClientError::Request)
    }
}

/// Build the multipart body of a car create or update request:
/// one `car` JSON part and one `images` part per attachment.
fn car_form(payload: &CarPayload, images: Vec<ImageAttachment>) -> Result<Form, CatalogClientError> {
    let car_json =
        serde_json::to_string(payload).map_err(|e| CatalogClientError::Other(e.to_string()))?;
    let car_part = Part::text(car_json)
        .mime_str("application/json")
        .map_err(CatalogClientError::Request)?;

    let mut form = Form::new().part("car", car_part);
    for image in images {
        let part = Part::bytes(image.bytes)
            .file_name(image.file_name)
            .mime_str(&image.mime)
            .map_err(CatalogClientError::Request)?;
        form = form.part("images", part);
    }
    Ok(form)
}

fn build_http_client(config: &CatalogClientConfig) -> Result<reqwest::Client, CatalogClientError> {
    let mut headers = HeaderMap::new();

    for (key, value) in &config.extra_headers {
        headers.insert(
            header::HeaderName::from_str(key).map_err(
                |e: reqwest::header::InvalidHeaderName| CatalogClientError::Other(e.to_string()),
            )?,
            header::HeaderValue::from_str(value).map_err(
                |e: reqwest::header::InvalidHeaderValue| CatalogClientError::Other(e.to_string()),
            )?,
        );
    }

    debug!(
        catalog_url = %config.catalog_url,
        extra_headers = config.extra_headers.len(),
        "building catalog HTTP client"
    );

    let client_builder = reqwest::Client::builder()
        .default_headers(headers)
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout);

    let client_builder = if let Some(ref user_agent) = config.user_agent {
        client_builder.user_agent(user_agent)
    } else {
        client_builder
    };

    client_builder
        .build()
        .map_err(|e| CatalogClientError::Other(e.to_string()))
}

#[cfg(test)]
pub mod tests {
    use std::collections::BTreeMap;

    use httpmock::Method::{DELETE, GET, POST, PUT};
    use httpmock::MockServer;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::auth::InMemoryAuth;

    fn client_config(url: &str) -> CatalogClientConfig {
        CatalogClientConfig {
            catalog_url: url.to_string(),
            ..Default::default()
        }
    }

    fn client_with_token(url: &str, token: Option<&str>) -> (CatalogClient, Arc<InMemoryAuth>) {
        let auth = Arc::new(match token {
            Some(token) => InMemoryAuth::with_token(token),
            None => InMemoryAuth::default(),
        });
        let client = CatalogClient::new(client_config(url), auth.clone()).unwrap();
        (client, auth)
    }

    fn empty_page() -> serde_json::Value {
        json!({
            "content": [],
            "totalPages": 0,
            "totalElements": 0,
            "number": 0,
            "size": 20
        })
    }

    #[test]
    fn invalid_url_rejected() {
        let err = CatalogClient::new(client_config("not a url"), Arc::new(InMemoryAuth::default()))
            .unwrap_err();
        assert!(err.to_string().starts_with("invalid catalog url"));
    }

    #[tokio::test]
    async fn filter_sends_query_parameters() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/admin/cars/filter")
                .query_param("categoryId", "3")
                .query_param("carColors", "RED")
                .query_param("carColors", "BLACK")
                .query_param("page", "0")
                .query_param("size", "20");
            then.status(200).json_body(json!({
                "content": [{
                    "id": 7,
                    "name": "Civic",
                    "price": 21000,
                    "supplierName": "Honda",
                    "carColors": ["RED"],
                    "imageUrls": ["a.png", "b.png"]
                }],
                "totalPages": 1,
                "totalElements": 1,
                "number": 0,
                "size": 20
            }));
        });

        let (client, _) = client_with_token(&server.base_url(), None);
        let params = FilterParams {
            category_id: Some(3),
            car_colors: [CarColor::Red, CarColor::Black].into(),
            ..Default::default()
        };
        let page = client.filter_cars(&params).await.unwrap();

        mock.assert();
        assert_eq!(page.content.len(), 1);
        assert_eq!(page.content[0].supplier_name.as_deref(), Some("Honda"));
        assert_eq!(page.content[0].category_name, None);
    }

    #[tokio::test]
    async fn token_attached_when_present() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.header("authorization", "Bearer secret");
            then.status(200).json_body(empty_page());
        });

        let (client, _) = client_with_token(&server.base_url(), Some("secret"));
        client.filter_cars(&FilterParams::default()).await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn extra_headers_set_on_all_requests() {
        let mut extra_headers: BTreeMap<String, String> = BTreeMap::new();
        extra_headers.insert("cartalog-test".to_string(), "test-value".to_string());
        extra_headers.insert("cartalog-test2".to_string(), "test-value2".to_string());

        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.header("cartalog-test", "test-value")
                .header("cartalog-test2", "test-value2");
            then.status(200).json_body(json!([]));
        });

        let config = CatalogClientConfig {
            extra_headers,
            ..client_config(&server.base_url())
        };

        let client = CatalogClient::new(config, Arc::new(InMemoryAuth::default())).unwrap();
        client.categories().await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn user_agent_set_on_all_requests() {
        let expected_agent = "my-custom-user-agent";

        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.header("user-agent", expected_agent);
            then.status(200).json_body(json!([]));
        });

        let config = CatalogClientConfig {
            user_agent: Some(expected_agent.to_owned()),
            ..client_config(&server.base_url())
        };

        let client = CatalogClient::new(config, Arc::new(InMemoryAuth::default())).unwrap();
        client.manufacturers().await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn unauthorized_clears_token() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/admin/categories/collections");
            then.status(401);
        });

        let (client, auth) = client_with_token(&server.base_url(), Some("expired"));
        let err = client.categories().await.unwrap_err();

        mock.assert();
        assert!(
            matches!(err, CatalogClientError::Unauthorized),
            "expected Unauthorized, got {err:?}"
        );
        assert_eq!(auth.get(), None, "rejected token should be cleared");
    }

    #[tokio::test]
    async fn admin_write_without_token_never_reaches_server() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.path("/admin/categories");
            then.status(200);
        });

        let (client, _) = client_with_token(&server.base_url(), None);
        let err = client
            .create_category(&CategoryPayload {
                name: "SUV".to_string(),
                description: "Sport utility".to_string(),
            })
            .await
            .unwrap_err();

        assert!(err.is_unauthorized());
        mock.assert_hits(0);
    }

    #[tokio::test]
    async fn error_message_taken_from_body() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(PUT).path("/admin/suppliers/4");
            then.status(409)
                .json_body(json!({ "message": "Supplier name already exists" }));
        });

        let (client, _) = client_with_token(&server.base_url(), Some("tok"));
        let err = client
            .update_manufacturer(4, &ManufacturerPayload {
                name: "Honda".to_string(),
                email: "info@honda.com".to_string(),
                address: "Tokyo".to_string(),
                website: "https://honda.com".to_string(),
                phone: "123".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "409 Conflict: Supplier name already exists");
    }

    #[tokio::test]
    async fn not_found_falls_back_to_reason() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/admin/cars/99");
            then.status(404).body("<html>nope</html>");
        });

        let (client, _) = client_with_token(&server.base_url(), None);
        let err = client.car(99).await.unwrap_err();
        assert!(
            matches!(&err, CatalogClientError::NotFound(message) if message == "Not Found"),
            "unexpected error: {err:?}"
        );
    }

    #[tokio::test]
    async fn create_car_sends_multipart() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/admin/cars")
                .header("authorization", "Bearer tok")
                .body_contains("name=\"car\"")
                .body_contains("\"manufacturedDate\":\"2020-01-31\"")
                .body_contains("filename=\"front.png\"");
            then.status(201).json_body(json!({ "id": 1, "name": "Civic" }));
        });

        let (client, _) = client_with_token(&server.base_url(), Some("tok"));
        let payload = CarPayload {
            name: "Civic".to_string(),
            description: String::new(),
            supplier_id: 1,
            category_id: 1,
            price: 21000.0,
            car_colors: vec![CarColor::Red],
            car_transmission: Some(Transmission::Manual),
            engine_type: Some(EngineType::Petrol),
            image_urls: vec![],
            mileage: None,
            manufactured_date: chrono::NaiveDate::from_ymd_opt(2020, 1, 31).unwrap(),
        };
        let created = client
            .create_car(&payload, vec![ImageAttachment {
                file_name: "front.png".to_string(),
                mime: "image/png".to_string(),
                bytes: vec![0x89, 0x50, 0x4e, 0x47],
            }])
            .await
            .unwrap();

        mock.assert();
        assert_eq!(created.id, 1);
    }

    #[tokio::test]
    async fn delete_uses_id_in_path() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(DELETE).path("/admin/cars/12");
            then.status(204);
        });

        let (client, _) = client_with_token(&server.base_url(), Some("tok"));
        client.delete_car(12).await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn authenticate_returns_token() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/authenticate")
                .json_body(json!({ "username": "admin", "password": "hunter2" }));
            then.status(200).json_body(json!({ "token": "jwt" }));
        });

        let (client, _) = client_with_token(&server.base_url(), None);
        let response = client
            .authenticate(&Credentials {
                username: "admin".to_string(),
                password: "hunter2".to_string(),
            })
            .await
            .unwrap();

        mock.assert();
        assert_eq!(response.token, "jwt");
    }

    #[tokio::test]
    async fn request_timeout_is_reported() {
        let server = MockServer::start_async().await;
        server.mock(|_when, then| {
            then.status(200)
                .delay(std::time::Duration::from_millis(500))
                .json_body(empty_page());
        });

        let config = CatalogClientConfig {
            request_timeout: std::time::Duration::from_millis(50),
            ..client_config(&server.base_url())
        };
        let client = CatalogClient::new(config, Arc::new(InMemoryAuth::default())).unwrap();
        let err = client
            .filter_cars(&FilterParams::default())
            .await
            .unwrap_err();
        assert!(err.is_timeout(), "expected a timeout, got {err:?}");
    }
}
