use cartalog_client::types::{CarColor, CarSummary, PageResponse};
use serde::Serialize;

pub const UNKNOWN_SUPPLIER: &str = "Unknown Supplier";
pub const UNKNOWN_CATEGORY: &str = "Unknown Category";

/// A listing as displayed in the catalog.
///
/// Unlike [`CarSummary`] every display field is populated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogItem {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub manufacturer: String,
    pub category: String,
    pub engine: Option<String>,
    pub transmission: Option<String>,
    pub mileage: Option<u64>,
    pub image_urls: Vec<String>,
    pub colors: Vec<CarColor>,
}

impl From<CarSummary> for CatalogItem {
    fn from(car: CarSummary) -> Self {
        let engine = car
            .engine_description
            .filter(|description| !description.is_empty())
            .or_else(|| car.engine_type.map(|engine| engine.to_string()));
        let transmission = car
            .transmission_description
            .filter(|description| !description.is_empty())
            .or_else(|| car.transmission.map(|transmission| transmission.to_string()));

        CatalogItem {
            id: car.id,
            name: car.name,
            description: car.description,
            price: car.price,
            manufacturer: display_name_or(car.supplier_name, UNKNOWN_SUPPLIER),
            category: display_name_or(car.category_name, UNKNOWN_CATEGORY),
            engine,
            transmission,
            mileage: car.mileage,
            image_urls: car.image_urls,
            colors: car.car_colors,
        }
    }
}

/// Blank names are as good as missing ones.
fn display_name_or(name: Option<String>, fallback: &str) -> String {
    name.filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// One page of catalog results, replaced as a whole on every successful fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CatalogPage {
    pub items: Vec<CatalogItem>,
    pub page_index: u32,
    pub total_pages: u32,
    pub total_elements: u64,
}

impl From<PageResponse<CarSummary>> for CatalogPage {
    fn from(response: PageResponse<CarSummary>) -> Self {
        CatalogPage {
            items: response.content.into_iter().map(CatalogItem::from).collect(),
            page_index: response.number,
            total_pages: response.total_pages,
            total_elements: response.total_elements,
        }
    }
}

impl CatalogPage {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use cartalog_client::types::EngineType;
    use pretty_assertions::assert_eq;

    use super::*;

    /// A minimal listing, named after its id.
    pub(crate) fn car(id: u64) -> CarSummary {
        CarSummary {
            id,
            name: format!("car-{id}"),
            description: String::new(),
            supplier_name: Some("Toyota".to_string()),
            category_name: Some("Sedan".to_string()),
            price: 10_000.0,
            car_colors: vec![],
            color_code: None,
            transmission: None,
            transmission_description: None,
            engine_type: None,
            engine_description: None,
            mileage: None,
            image_urls: vec![],
            manufactured_date: None,
            created_at: None,
            updated_at: None,
            deleted: false,
        }
    }

    pub(crate) fn page_of(ids: &[u64], number: u32, total_pages: u32) -> PageResponse<CarSummary> {
        PageResponse {
            content: ids.iter().copied().map(car).collect(),
            total_pages,
            total_elements: (total_pages as u64) * 20,
            number,
            size: 20,
        }
    }

    #[test]
    fn missing_names_fall_back() {
        let summary = CarSummary {
            supplier_name: None,
            category_name: Some("  ".to_string()),
            ..car(1)
        };
        let item = CatalogItem::from(summary);

        assert_eq!(item.manufacturer, UNKNOWN_SUPPLIER);
        assert_eq!(item.category, UNKNOWN_CATEGORY);
    }

    #[test]
    fn engine_label_used_without_description() {
        let summary = CarSummary {
            engine_type: Some(EngineType::Hybrid),
            engine_description: Some(String::new()),
            ..car(1)
        };
        assert_eq!(CatalogItem::from(summary).engine.as_deref(), Some("Hybrid"));
    }

    #[test]
    fn page_keeps_response_order() {
        let page = CatalogPage::from(page_of(&[3, 1, 2], 1, 4));
        let ids: Vec<_> = page.items.iter().map(|item| item.id).collect();

        assert_eq!(ids, vec![3, 1, 2]);
        assert_eq!(page.page_index, 1);
        assert_eq!(page.total_pages, 4);
    }
}
