//! Wire types exchanged with the catalog backend.

use std::collections::BTreeSet;
use std::num::NonZeroU32;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Page size used when nothing else was requested.
pub const DEFAULT_PAGE_SIZE: NonZeroU32 = NonZeroU32::new(20).unwrap();

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

/// Fold a wire name or a display label into the wire spelling,
/// e.g. `semi-automatic` -> `SEMI_AUTOMATIC`.
fn wire_name(input: &str) -> String {
    input
        .trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CarColor {
    #[display("Red")]
    Red,
    #[display("Green")]
    Green,
    #[display("Blue")]
    Blue,
    #[display("Yellow")]
    Yellow,
    #[display("Black")]
    Black,
    #[display("White")]
    White,
}

impl CarColor {
    pub const ALL: [CarColor; 6] = [
        CarColor::Red,
        CarColor::Green,
        CarColor::Blue,
        CarColor::Yellow,
        CarColor::Black,
        CarColor::White,
    ];

    pub fn as_wire(&self) -> &'static str {
        match self {
            CarColor::Red => "RED",
            CarColor::Green => "GREEN",
            CarColor::Blue => "BLUE",
            CarColor::Yellow => "YELLOW",
            CarColor::Black => "BLACK",
            CarColor::White => "WHITE",
        }
    }

    pub fn hex_code(&self) -> &'static str {
        match self {
            CarColor::Red => "#fc0303",
            CarColor::Green => "#03fc4e",
            CarColor::Blue => "#0331fc",
            CarColor::Yellow => "#fcf403",
            CarColor::Black => "#080808",
            CarColor::White => "#ffffff",
        }
    }
}

impl FromStr for CarColor {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wire = wire_name(s);
        CarColor::ALL
            .into_iter()
            .find(|color| color.as_wire() == wire)
            .ok_or_else(|| UnknownVariant {
                kind: "color",
                value: s.to_string(),
            })
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Transmission {
    #[display("Automatic")]
    Automatic,
    #[display("Manual")]
    Manual,
    #[display("Semi-Automatic")]
    SemiAutomatic,
}

impl Transmission {
    pub const ALL: [Transmission; 3] = [
        Transmission::Automatic,
        Transmission::Manual,
        Transmission::SemiAutomatic,
    ];

    pub fn as_wire(&self) -> &'static str {
        match self {
            Transmission::Automatic => "AUTOMATIC",
            Transmission::Manual => "MANUAL",
            Transmission::SemiAutomatic => "SEMI_AUTOMATIC",
        }
    }
}

impl FromStr for Transmission {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wire = wire_name(s);
        Transmission::ALL
            .into_iter()
            .find(|transmission| transmission.as_wire() == wire)
            .ok_or_else(|| UnknownVariant {
                kind: "transmission",
                value: s.to_string(),
            })
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineType {
    #[display("Petrol")]
    Petrol,
    #[display("Diesel")]
    Diesel,
    #[display("Electric")]
    Electric,
    #[display("Hybrid")]
    Hybrid,
}

impl EngineType {
    pub const ALL: [EngineType; 4] = [
        EngineType::Petrol,
        EngineType::Diesel,
        EngineType::Electric,
        EngineType::Hybrid,
    ];

    pub fn as_wire(&self) -> &'static str {
        match self {
            EngineType::Petrol => "PETROL",
            EngineType::Diesel => "DIESEL",
            EngineType::Electric => "ELECTRIC",
            EngineType::Hybrid => "HYBRID",
        }
    }
}

impl FromStr for EngineType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wire = wire_name(s);
        EngineType::ALL
            .into_iter()
            .find(|engine| engine.as_wire() == wire)
            .ok_or_else(|| UnknownVariant {
                kind: "engine type",
                value: s.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Filter query
// ---------------------------------------------------------------------------

/// The parameters of a catalog listing request.
///
/// Every dimension except `page` and `size` is optional,
/// absent dimensions are not sent at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transmission: Option<Transmission>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_type: Option<EngineType>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub car_colors: BTreeSet<CarColor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_mileage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_mileage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    /// Zero based page index.
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub size: NonZeroU32,
}

fn default_page_size() -> NonZeroU32 {
    DEFAULT_PAGE_SIZE
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            category_id: None,
            supplier_id: None,
            transmission: None,
            engine_type: None,
            car_colors: BTreeSet::new(),
            min_price: None,
            max_price: None,
            min_mileage: None,
            max_mileage: None,
            keyword: None,
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl FilterParams {
    /// Encode the parameters as query pairs for `GET /admin/cars/filter`.
    ///
    /// Colors are repeated as one `carColors` pair each.
    /// An empty keyword is treated like an absent one.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();

        if let Some(category_id) = self.category_id {
            pairs.push(("categoryId", category_id.to_string()));
        }
        if let Some(supplier_id) = self.supplier_id {
            pairs.push(("supplierId", supplier_id.to_string()));
        }
        if let Some(transmission) = self.transmission {
            pairs.push(("transmission", transmission.as_wire().to_string()));
        }
        if let Some(engine_type) = self.engine_type {
            pairs.push(("engineType", engine_type.as_wire().to_string()));
        }
        for color in &self.car_colors {
            pairs.push(("carColors", color.as_wire().to_string()));
        }

        let ranges = [
            ("minPrice", self.min_price),
            ("maxPrice", self.max_price),
            ("minMileage", self.min_mileage),
            ("maxMileage", self.max_mileage),
        ];
        for (name, value) in ranges {
            if let Some(value) = value {
                pairs.push((name, value.to_string()));
            }
        }

        if let Some(keyword) = self.keyword.as_deref().filter(|k| !k.is_empty()) {
            pairs.push(("keyword", keyword.to_string()));
        }

        pairs.push(("page", self.page.to_string()));
        pairs.push(("size", self.size.to_string()));
        pairs
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// A page of results as returned by the backend.
///
/// The backend sends more pagination metadata than this, it is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub content: Vec<T>,
    pub total_pages: u32,
    pub total_elements: u64,
    /// Zero based index of this page.
    pub number: u32,
    pub size: u32,
}

/// A car as listed by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarSummary {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub supplier_name: Option<String>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub car_colors: Vec<CarColor>,
    #[serde(default)]
    pub color_code: Option<String>,
    #[serde(default)]
    pub transmission: Option<Transmission>,
    #[serde(default)]
    pub transmission_description: Option<String>,
    #[serde(default)]
    pub engine_type: Option<EngineType>,
    #[serde(default)]
    pub engine_description: Option<String>,
    #[serde(default)]
    pub mileage: Option<u64>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub manufactured_date: Option<NaiveDate>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// A car manufacturer, called a supplier by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manufacturer {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPayload {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManufacturerPayload {
    pub name: String,
    pub email: String,
    pub address: String,
    pub website: String,
    pub phone: String,
}

/// The `car` JSON part of a car create or update request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarPayload {
    pub name: String,
    pub description: String,
    pub supplier_id: u64,
    pub category_id: u64,
    pub price: f64,
    pub car_colors: Vec<CarColor>,
    pub car_transmission: Option<Transmission>,
    pub engine_type: Option<EngineType>,
    pub image_urls: Vec<String>,
    pub mileage: Option<u64>,
    /// Serialized as `YYYY-MM-DD`.
    pub manufactured_date: NaiveDate,
}

/// A binary image uploaded next to a [`CarPayload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}
