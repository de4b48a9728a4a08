use std::fmt::{self, Display};

use cartalog_client::types::CarColor;
use itertools::Itertools;
use serde::Serialize;

use super::catalog_page::{CatalogItem, CatalogPage};
use super::filter_store::{FilterChange, FilterStore};

/// Format a price the way the catalog shows it, e.g. `$21,499.5`.
pub fn format_price(price: f64) -> String {
    let cents = (price.abs() * 100.0).round() as u64;
    let (whole, fraction) = (cents / 100, cents % 100);

    let digits = whole.to_string();
    let grouped = digits
        .as_bytes()
        .rchunks(3)
        .rev()
        .map(|chunk| String::from_utf8_lossy(chunk))
        .join(",");

    let sign = if price < 0.0 && cents > 0 { "-" } else { "" };
    match fraction {
        0 => format!("{sign}${grouped}"),
        f if f % 10 == 0 => format!("{sign}${grouped}.{}", f / 10),
        f => format!("{sign}${grouped}.{f:02}"),
    }
}

/// Cycles through the images of a listing, wrapping around at both ends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImageCarousel {
    urls: Vec<String>,
    index: usize,
}

impl ImageCarousel {
    pub fn new(urls: Vec<String>) -> Self {
        ImageCarousel { urls, index: 0 }
    }

    pub fn current(&self) -> Option<&str> {
        self.urls.get(self.index).map(String::as_str)
    }

    pub fn position(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn next(&mut self) -> Option<&str> {
        if !self.urls.is_empty() {
            self.index = (self.index + 1) % self.urls.len();
        }
        self.current()
    }

    pub fn previous(&mut self) -> Option<&str> {
        if !self.urls.is_empty() {
            self.index = (self.index + self.urls.len() - 1) % self.urls.len();
        }
        self.current()
    }
}

/// A single listing as displayed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarCard {
    pub id: u64,
    pub title: String,
    pub price: String,
    pub manufacturer: String,
    pub category: String,
    pub engine: Option<String>,
    pub transmission: Option<String>,
    pub colors: Vec<CarColor>,
    pub images: ImageCarousel,
}

impl From<&CatalogItem> for CarCard {
    fn from(item: &CatalogItem) -> Self {
        CarCard {
            id: item.id,
            title: item.name.clone(),
            price: format_price(item.price),
            manufacturer: item.manufacturer.clone(),
            category: item.category.clone(),
            engine: item.engine.clone(),
            transmission: item.transmission.clone(),
            colors: item.colors.clone(),
            images: ImageCarousel::new(item.image_urls.clone()),
        }
    }
}

impl Display for CarCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} - {} ({}, {})",
            self.id, self.title, self.price, self.manufacturer, self.category
        )?;

        let details = [self.engine.as_deref(), self.transmission.as_deref()]
            .into_iter()
            .flatten()
            .join(", ");
        if !details.is_empty() {
            write!(f, " [{details}]")?;
        }
        if !self.colors.is_empty() {
            write!(f, " {}", self.colors.iter().join("/"))?;
        }
        Ok(())
    }
}

/// A request to show another page, the only event the listing emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageChange(pub u32);

impl PageChange {
    pub fn apply(self, store: &FilterStore) -> FilterChange {
        store.set_page(self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page_index: u32,
    pub total_pages: u32,
}

impl Pagination {
    pub fn new(page_index: u32, total_pages: u32) -> Self {
        Pagination {
            page_index,
            total_pages,
        }
    }

    /// Controls are only shown when there is more than one page.
    pub fn is_visible(&self) -> bool {
        self.total_pages > 1
    }

    pub fn can_go_previous(&self) -> bool {
        self.page_index > 0
    }

    pub fn can_go_next(&self) -> bool {
        self.page_index.saturating_add(1) < self.total_pages
    }

    pub fn previous(&self) -> Option<PageChange> {
        self.can_go_previous().then(|| PageChange(self.page_index - 1))
    }

    pub fn next(&self) -> Option<PageChange> {
        self.can_go_next().then(|| PageChange(self.page_index + 1))
    }

    pub fn label(&self) -> String {
        format!(
            "Page {} of {}",
            self.page_index.saturating_add(1),
            self.total_pages
        )
    }
}

/// A fetched page prepared for display.
///
/// Cards keep the order of the response.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderedPage {
    pub cards: Vec<CarCard>,
    pub pagination: Pagination,
    pub total_elements: u64,
}

impl From<&CatalogPage> for RenderedPage {
    fn from(page: &CatalogPage) -> Self {
        RenderedPage {
            cards: page.items.iter().map(CarCard::from).collect(),
            pagination: Pagination::new(page.page_index, page.total_pages),
            total_elements: page.total_elements,
        }
    }
}

impl Display for RenderedPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cards.is_empty() {
            return writeln!(f, "No cars found.");
        }
        for card in &self.cards {
            writeln!(f, "{card}")?;
        }
        if self.pagination.is_visible() {
            let previous = if self.pagination.can_go_previous() { "[prev]" } else { "      " };
            let next = if self.pagination.can_go_next() { "[next]" } else { "" };
            writeln!(f, "{previous} {} {next}", self.pagination.label())?;
        }
        Ok(())
    }
}
