use anyhow::{Result, anyhow};
use bpaf::Bpaf;
use cartalog_client::ClientTrait;
use cartalog_client::types::FilterParams;
use cartalog_sdk::models::filter_store::FilterStore;
use cartalog_sdk::models::quick_search;
use tracing::{debug, instrument};

use super::search::show_page;
use crate::config::Config;
use crate::utils::errors::format_client_error;

/// Terms are matched in order: manufacturer, category, transmission, engine
#[derive(Debug, Bpaf, Clone)]
pub struct QuickSearch {
    /// Display the page of results as JSON
    #[bpaf(long)]
    pub json: bool,

    /// For example `toyota suv automatic hybrid`
    #[bpaf(positional("TERM"), many)]
    pub terms: Vec<String>,
}

impl QuickSearch {
    /// Resolve the terms against the catalog's manufacturers and categories.
    async fn to_params(&self, config: &Config, client: &impl ClientTrait) -> Result<FilterParams> {
        let (manufacturers, categories) =
            tokio::try_join!(client.manufacturers(), client.categories())
                .map_err(|err| anyhow!(format_client_error(&err)))?;

        let found = quick_search::parse(&self.terms.join(" "), &manufacturers, &categories)?;
        debug!(?found, "resolved quick search");

        let store = FilterStore::new(config.session_config().page_size);
        store.apply_partial(found.to_filter_update());
        Ok(store.snapshot())
    }

    #[instrument(name = "quick-search", fields(terms = self.terms.len()), skip_all)]
    pub async fn handle(self, config: &Config, client: &impl ClientTrait) -> Result<()> {
        let params = self.to_params(config, client).await?;
        show_page(&params, self.json, config, client).await
    }
}

#[cfg(test)]
mod tests {
    use cartalog_client::types::{Category, EngineType, Manufacturer, PageResponse, Transmission};
    use cartalog_client::{MockClient, MockResponseKind};
    use pretty_assertions::assert_eq;

    use super::*;

    fn catalog(client: &MockClient) {
        client.push_response(MockResponseKind::Manufacturers(vec![Manufacturer {
            id: 4,
            name: "Toyota".to_string(),
            email: String::new(),
            address: String::new(),
            website: String::new(),
            phone: String::new(),
        }]));
        client.push_response(MockResponseKind::Categories(vec![Category {
            id: 2,
            name: "SUV".to_string(),
            description: String::new(),
        }]));
    }

    fn quick_search(terms: &[&str]) -> QuickSearch {
        QuickSearch {
            json: false,
            terms: terms.iter().map(|term| term.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn terms_become_filters() {
        let client = MockClient::default();
        catalog(&client);
        client.push_response(MockResponseKind::Page(PageResponse {
            content: vec![],
            total_pages: 0,
            total_elements: 0,
            number: 0,
            size: 20,
        }));

        quick_search(&["toyota", "suv", "automatic", "electric"])
            .handle(&Config::default(), &client)
            .await
            .unwrap();

        assert_eq!(client.filter_requests(), vec![FilterParams {
            supplier_id: Some(4),
            category_id: Some(2),
            transmission: Some(Transmission::Automatic),
            engine_type: Some(EngineType::Electric),
            ..Default::default()
        }]);
    }

    #[tokio::test]
    async fn unknown_terms_are_all_reported() {
        let client = MockClient::default();
        catalog(&client);

        let err = quick_search(&["tesla", "suv", "warp"])
            .handle(&Config::default(), &client)
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Manufacturer \"tesla\" not found\nTransmission \"warp\" not found"
        );
        assert!(client.filter_requests().is_empty());
    }
}
