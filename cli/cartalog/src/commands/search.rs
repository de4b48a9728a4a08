use std::num::NonZeroU32;

use anyhow::{Context, Result};
use bpaf::Bpaf;
use cartalog_client::ClientTrait;
use cartalog_client::types::{CarColor, EngineType, FilterParams, Transmission};
use cartalog_sdk::models::catalog_page::CatalogPage;
use cartalog_sdk::models::filter_form::FilterForm;
use cartalog_sdk::models::filter_store::FilterStore;
use cartalog_sdk::models::result_renderer::RenderedPage;
use log::debug;
use tracing::instrument;

use crate::config::Config;
use crate::utils::errors::format_client_error;
use crate::utils::message;

/// Filter dimensions shared by the listing commands
#[derive(Debug, Bpaf, Clone, Default)]
pub struct FilterOptions {
    /// Only show cars of this category
    #[bpaf(long("category"), argument("ID"))]
    pub category_id: Option<u64>,

    /// Only show cars of this manufacturer
    #[bpaf(long("manufacturer"), argument("ID"))]
    pub supplier_id: Option<u64>,

    /// Automatic, manual or semi-automatic
    #[bpaf(long, argument("NAME"))]
    pub transmission: Option<Transmission>,

    /// Petrol, diesel, electric or hybrid
    #[bpaf(long("engine"), argument("NAME"))]
    pub engine_type: Option<EngineType>,

    /// Only show cars available in this color, may be repeated
    #[bpaf(long("color"), argument("COLOR"), many)]
    pub colors: Vec<CarColor>,

    #[bpaf(long, argument("PRICE"))]
    pub min_price: Option<String>,

    #[bpaf(long, argument("PRICE"))]
    pub max_price: Option<String>,

    #[bpaf(long, argument("KM"))]
    pub min_mileage: Option<String>,

    #[bpaf(long, argument("KM"))]
    pub max_mileage: Option<String>,
}

impl FilterOptions {
    /// Fill a filter form as if the options had been entered by hand.
    pub fn to_form(&self) -> FilterForm {
        let mut form = FilterForm::default();
        form.select_category(self.category_id);
        form.select_manufacturer(self.supplier_id);
        form.select_transmission(self.transmission);
        form.select_engine_type(self.engine_type);
        for color in &self.colors {
            if !form.colors().contains(color) {
                form.toggle_color(*color);
            }
        }
        if let Some(min) = &self.min_price {
            form.set_min_price(min.as_str());
        }
        if let Some(max) = &self.max_price {
            form.set_max_price(max.as_str());
        }
        if let Some(min) = &self.min_mileage {
            form.set_min_mileage(min.as_str());
        }
        if let Some(max) = &self.max_mileage {
            form.set_max_mileage(max.as_str());
        }
        form
    }
}

// Search the catalog for cars
#[derive(Debug, Bpaf, Clone)]
pub struct Search {
    /// Display the page of results as JSON
    #[bpaf(long)]
    pub json: bool,

    #[bpaf(external(filter_options))]
    pub filters: FilterOptions,

    /// Page to show, starting at 1
    #[bpaf(long, argument("N"), fallback(NonZeroU32::MIN))]
    pub page: NonZeroU32,

    /// Number of cars per page
    #[bpaf(long, argument("N"))]
    pub size: Option<NonZeroU32>,

    /// Match against names and descriptions
    #[bpaf(positional("keyword"))]
    pub keyword: Option<String>,
}

impl Search {
    /// Build the request the same way the interactive catalog would.
    pub(crate) fn to_params(&self, config: &Config) -> Result<FilterParams> {
        let size = self
            .size
            .unwrap_or_else(|| config.session_config().page_size);
        let store = FilterStore::new(size);

        let update = self
            .filters
            .to_form()
            .apply()
            .context("Invalid filter")?;
        store.replace_filters(update);
        if let Some(keyword) = &self.keyword {
            store.apply_settled_keyword(keyword.trim());
        }
        store.set_page(self.page.get() - 1);

        Ok(store.snapshot())
    }

    #[instrument(name = "search", fields(json = self.json), skip_all)]
    pub async fn handle(self, config: &Config, client: &impl ClientTrait) -> Result<()> {
        let params = self.to_params(config)?;
        show_page(&params, self.json, config, client).await
    }
}

/// Fetch the page `params` describe and print it.
pub(crate) async fn show_page(
    params: &FilterParams,
    json: bool,
    config: &Config,
    client: &impl ClientTrait,
) -> Result<()> {
    debug!("performing search: {params:?}");

    let timeout = config.session_config().fetch_timeout;
    let response = match tokio::time::timeout(timeout, client.filter_cars(params)).await {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => anyhow::bail!(format_client_error(&err)),
        Err(_) => anyhow::bail!(
            "The catalog did not answer within {}s.",
            timeout.as_secs_f32()
        ),
    };

    let rendered = RenderedPage::from(&CatalogPage::from(response));
    if json {
        debug!("printing search results as JSON");
        println!("{}", serde_json::to_string_pretty(&rendered)?);
        return Ok(());
    }

    print!("{rendered}");
    if rendered.total_elements > 0 {
        message::plain(format!("{} cars in total", rendered.total_elements));
    }
    Ok(())
}
