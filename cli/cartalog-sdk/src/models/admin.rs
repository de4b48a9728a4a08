//! Drafts of the entities edited in the admin console.
//!
//! A draft holds raw user input and turns into a request payload only
//! once it passes the same checks the backend would otherwise reject.

use std::sync::LazyLock;

use cartalog_client::types::{
    CarColor,
    CarPayload,
    CarSummary,
    CategoryPayload,
    EngineType,
    ManufacturerPayload,
    Transmission,
};
use chrono::NaiveDate;
use itertools::Itertools;
use regex::Regex;
use thiserror::Error;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
static WEBSITE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s/$.?#].[^\s]*$").expect("valid website regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("Please fill in all required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Please enter a valid website URL (starting with http:// or https://)")]
    InvalidWebsite,
    #[error("{0} cannot be negative")]
    Negative(&'static str),
    #[error("Invalid release date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
}

/// Names of the fields in `fields` that are blank.
fn missing<'a>(fields: impl IntoIterator<Item = (&'static str, &'a str)>) -> Vec<&'static str> {
    fields
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryDraft {
    pub name: String,
    pub description: String,
}

impl CategoryDraft {
    pub fn validate(&self) -> Result<CategoryPayload, DraftError> {
        let missing = missing([("name", self.name.as_str()), ("description", self.description.as_str())]);
        if !missing.is_empty() {
            return Err(DraftError::MissingFields(missing));
        }
        Ok(CategoryPayload {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManufacturerDraft {
    pub name: String,
    pub email: String,
    pub address: String,
    pub website: String,
    pub phone: String,
}

impl ManufacturerDraft {
    pub fn validate(&self) -> Result<ManufacturerPayload, DraftError> {
        let missing = missing([
            ("name", self.name.as_str()),
            ("email", self.email.as_str()),
            ("address", self.address.as_str()),
            ("website", self.website.as_str()),
            ("phone", self.phone.as_str()),
        ]);
        if !missing.is_empty() {
            return Err(DraftError::MissingFields(missing));
        }

        let email = self.email.trim();
        if !EMAIL.is_match(email) {
            return Err(DraftError::InvalidEmail);
        }
        let website = self.website.trim();
        if !WEBSITE.is_match(website) {
            return Err(DraftError::InvalidWebsite);
        }

        Ok(ManufacturerPayload {
            name: self.name.trim().to_string(),
            email: email.to_string(),
            address: self.address.trim().to_string(),
            website: website.to_string(),
            phone: self.phone.trim().to_string(),
        })
    }
}

/// Input of the car create and edit form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CarDraft {
    pub name: String,
    pub description: String,
    pub manufacturer_id: Option<u64>,
    pub category_id: Option<u64>,
    pub price: f64,
    pub colors: Vec<CarColor>,
    pub transmission: Option<Transmission>,
    pub engine_type: Option<EngineType>,
    pub image_urls: Vec<String>,
    pub mileage: Option<u64>,
    /// As typed, `YYYY-MM-DD`.
    pub release_date: String,
}

impl CarDraft {
    pub fn validate(&self) -> Result<CarPayload, DraftError> {
        let mut missing = missing([("name", self.name.as_str())]);
        if self.manufacturer_id.is_none() {
            missing.push("manufacturer");
        }
        if self.category_id.is_none() {
            missing.push("category");
        }
        if self.release_date.trim().is_empty() {
            missing.push("release date");
        }

        let (Some(supplier_id), Some(category_id), true) = (
            self.manufacturer_id,
            self.category_id,
            missing.is_empty(),
        ) else {
            return Err(DraftError::MissingFields(missing));
        };

        if self.price < 0.0 {
            return Err(DraftError::Negative("Price"));
        }

        let manufactured_date = NaiveDate::parse_from_str(self.release_date.trim(), "%Y-%m-%d")
            .map_err(|_| DraftError::InvalidDate(self.release_date.clone()))?;

        Ok(CarPayload {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            supplier_id,
            category_id,
            price: self.price,
            car_colors: self.colors.iter().copied().unique().collect(),
            car_transmission: self.transmission,
            engine_type: self.engine_type,
            image_urls: self.image_urls.clone(),
            mileage: self.mileage,
            manufactured_date,
        })
    }

    /// Start editing an existing car.
    ///
    /// The listing only carries display names, so manufacturer and category
    /// ids are resolved by the caller.
    pub fn from_existing(
        car: &CarSummary,
        manufacturer_id: Option<u64>,
        category_id: Option<u64>,
    ) -> Self {
        CarDraft {
            name: car.name.clone(),
            description: car.description.clone(),
            manufacturer_id,
            category_id,
            price: car.price,
            colors: car.car_colors.clone(),
            transmission: car.transmission,
            engine_type: car.engine_type,
            image_urls: car.image_urls.clone(),
            mileage: car.mileage,
            release_date: car
                .manufactured_date
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        }
    }
}
