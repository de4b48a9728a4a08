use crate::types::{
    CarPayload,
    CarSummary,
    Category,
    CategoryPayload,
    Credentials,
    FilterParams,
    ImageAttachment,
    Manufacturer,
    ManufacturerPayload,
    PageResponse,
    TokenResponse,
};
use crate::{CatalogClient, CatalogClientError, ClientTrait, MockClient};

/// Either a client for the actual catalog service,
/// or a mock client for testing.
#[derive(Debug)]
pub enum Client {
    Catalog(CatalogClient),
    Mock(MockClient),
}

impl From<CatalogClient> for Client {
    fn from(client: CatalogClient) -> Self {
        Client::Catalog(client)
    }
}

impl From<MockClient> for Client {
    fn from(client: MockClient) -> Self {
        Client::Mock(client)
    }
}

macro_rules! dispatch {
    ($self:ident, $client:ident => $call:expr) => {
        match $self {
            Client::Catalog($client) => $call.await,
            Client::Mock($client) => $call.await,
        }
    };
}

impl ClientTrait for Client {
    async fn filter_cars(
        &self,
        params: &FilterParams,
    ) -> Result<PageResponse<CarSummary>, CatalogClientError> {
        dispatch!(self, client => client.filter_cars(params))
    }

    async fn cars(&self) -> Result<Vec<CarSummary>, CatalogClientError> {
        dispatch!(self, client => client.cars())
    }

    async fn car(&self, id: u64) -> Result<CarSummary, CatalogClientError> {
        dispatch!(self, client => client.car(id))
    }

    async fn create_car(
        &self,
        payload: &CarPayload,
        images: Vec<ImageAttachment>,
    ) -> Result<CarSummary, CatalogClientError> {
        dispatch!(self, client => client.create_car(payload, images))
    }

    async fn update_car(
        &self,
        id: u64,
        payload: &CarPayload,
        images: Vec<ImageAttachment>,
    ) -> Result<CarSummary, CatalogClientError> {
        dispatch!(self, client => client.update_car(id, payload, images))
    }

    async fn delete_car(&self, id: u64) -> Result<(), CatalogClientError> {
        dispatch!(self, client => client.delete_car(id))
    }

    async fn categories(&self) -> Result<Vec<Category>, CatalogClientError> {
        dispatch!(self, client => client.categories())
    }

    async fn category(&self, id: u64) -> Result<Category, CatalogClientError> {
        dispatch!(self, client => client.category(id))
    }

    async fn create_category(
        &self,
        payload: &CategoryPayload,
    ) -> Result<Category, CatalogClientError> {
        dispatch!(self, client => client.create_category(payload))
    }

    async fn update_category(
        &self,
        id: u64,
        payload: &CategoryPayload,
    ) -> Result<Category, CatalogClientError> {
        dispatch!(self, client => client.update_category(id, payload))
    }

    async fn delete_category(&self, id: u64) -> Result<(), CatalogClientError> {
        dispatch!(self, client => client.delete_category(id))
    }

    async fn manufacturers(&self) -> Result<Vec<Manufacturer>, CatalogClientError> {
        dispatch!(self, client => client.manufacturers())
    }

    async fn manufacturer(&self, id: u64) -> Result<Manufacturer, CatalogClientError> {
        dispatch!(self, client => client.manufacturer(id))
    }

    async fn create_manufacturer(
        &self,
        payload: &ManufacturerPayload,
    ) -> Result<Manufacturer, CatalogClientError> {
        dispatch!(self, client => client.create_manufacturer(payload))
    }

    async fn update_manufacturer(
        &self,
        id: u64,
        payload: &ManufacturerPayload,
    ) -> Result<Manufacturer, CatalogClientError> {
        dispatch!(self, client => client.update_manufacturer(id, payload))
    }

    async fn delete_manufacturer(&self, id: u64) -> Result<(), CatalogClientError> {
        dispatch!(self, client => client.delete_manufacturer(id))
    }

    async fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<TokenResponse, CatalogClientError> {
        dispatch!(self, client => client.authenticate(credentials))
    }
}
