use std::collections::BTreeSet;

use cartalog_client::types::{CarColor, EngineType, Transmission};
use itertools::Itertools;
use thiserror::Error;
use tracing::debug;

use super::filter_store::{FilterChange, FilterStore, FilterUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeKind {
    Price,
    Mileage,
}

impl RangeKind {
    fn noun(&self) -> &'static str {
        match self {
            RangeKind::Price => "price",
            RangeKind::Mileage => "mileage",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            RangeKind::Price => "Price",
            RangeKind::Mileage => "Mileage",
        }
    }
}

/// Why a range currently can't be applied, shown next to the range inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("Minimum {} cannot be greater than maximum {}", .0.noun(), .0.noun())]
    MinExceedsMax(RangeKind),
    #[error("{} cannot be negative", .0.title())]
    Negative(RangeKind),
    #[error("{} must be a number", .0.title())]
    NotANumber(RangeKind),
}

#[derive(Debug, Error, PartialEq)]
pub enum FormError {
    #[error("{}", .0.iter().join("; "))]
    ValidationFailed(Vec<RangeError>),
}

/// The raw text of a min/max input pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeInput {
    pub min: String,
    pub max: String,
}

impl RangeInput {
    /// Parse both bounds, an empty bound is absent.
    pub fn parse(&self, kind: RangeKind) -> Result<(Option<f64>, Option<f64>), RangeError> {
        let bound = |text: &str| -> Result<Option<f64>, RangeError> {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            match text.parse::<f64>() {
                Ok(value) if value.is_finite() => Ok(Some(value)),
                _ => Err(RangeError::NotANumber(kind)),
            }
        };

        let min = bound(&self.min)?;
        let max = bound(&self.max)?;

        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(RangeError::MinExceedsMax(kind));
            }
        }
        if min.is_some_and(|min| min < 0.0) || max.is_some_and(|max| max < 0.0) {
            return Err(RangeError::Negative(kind));
        }
        Ok((min, max))
    }
}

/// Uncommitted filter selections.
///
/// Nothing reaches the [`FilterStore`] until [`FilterForm::apply`] succeeds.
#[derive(Debug, Clone, Default)]
pub struct FilterForm {
    category_id: Option<u64>,
    supplier_id: Option<u64>,
    transmission: Option<Transmission>,
    engine_type: Option<EngineType>,
    colors: BTreeSet<CarColor>,
    price: RangeInput,
    mileage: RangeInput,
}

impl FilterForm {
    pub fn select_category(&mut self, category_id: Option<u64>) {
        self.category_id = category_id;
    }

    pub fn select_manufacturer(&mut self, supplier_id: Option<u64>) {
        self.supplier_id = supplier_id;
    }

    pub fn select_transmission(&mut self, transmission: Option<Transmission>) {
        self.transmission = transmission;
    }

    pub fn select_engine_type(&mut self, engine_type: Option<EngineType>) {
        self.engine_type = engine_type;
    }

    /// Select `color`, or deselect it if it was already selected.
    ///
    /// Returns whether the color is selected afterwards.
    pub fn toggle_color(&mut self, color: CarColor) -> bool {
        if self.colors.remove(&color) {
            false
        } else {
            self.colors.insert(color);
            true
        }
    }

    pub fn colors(&self) -> &BTreeSet<CarColor> {
        &self.colors
    }

    pub fn set_min_price(&mut self, text: impl Into<String>) -> Option<RangeError> {
        self.price.min = text.into();
        self.price_error()
    }

    pub fn set_max_price(&mut self, text: impl Into<String>) -> Option<RangeError> {
        self.price.max = text.into();
        self.price_error()
    }

    pub fn set_min_mileage(&mut self, text: impl Into<String>) -> Option<RangeError> {
        self.mileage.min = text.into();
        self.mileage_error()
    }

    pub fn set_max_mileage(&mut self, text: impl Into<String>) -> Option<RangeError> {
        self.mileage.max = text.into();
        self.mileage_error()
    }

    pub fn price_error(&self) -> Option<RangeError> {
        self.price.parse(RangeKind::Price).err()
    }

    pub fn mileage_error(&self) -> Option<RangeError> {
        self.mileage.parse(RangeKind::Mileage).err()
    }

    pub fn errors(&self) -> Vec<RangeError> {
        self.price_error()
            .into_iter()
            .chain(self.mileage_error())
            .collect()
    }

    /// Whether the apply action is enabled.
    pub fn can_apply(&self) -> bool {
        self.errors().is_empty()
    }

    /// Every dimension of the form, `None` where nothing is selected.
    pub fn apply(&self) -> Result<FilterUpdate, FormError> {
        let errors = self.errors();
        if !errors.is_empty() {
            return Err(FormError::ValidationFailed(errors));
        }

        let (min_price, max_price) = self
            .price
            .parse(RangeKind::Price)
            .map_err(|e| FormError::ValidationFailed(vec![e]))?;
        let (min_mileage, max_mileage) = self
            .mileage
            .parse(RangeKind::Mileage)
            .map_err(|e| FormError::ValidationFailed(vec![e]))?;

        Ok(FilterUpdate {
            category_id: self.category_id,
            supplier_id: self.supplier_id,
            transmission: self.transmission,
            engine_type: self.engine_type,
            car_colors: Some(self.colors.clone()).filter(|colors| !colors.is_empty()),
            min_price,
            max_price,
            min_mileage,
            max_mileage,
        })
    }

    /// Validate the selections and make them the filter of `store`.
    ///
    /// A dimension deselected since the last apply is cleared.
    pub fn apply_to(&self, store: &FilterStore) -> Result<FilterChange, FormError> {
        let update = self.apply()?;
        debug!(?update, "applying filter form");
        Ok(store.replace_filters(update))
    }

    /// Clear every selection and reset the store, regardless of validation state.
    pub fn reset(&mut self, store: &FilterStore) -> FilterChange {
        *self = FilterForm::default();
        store.reset()
    }
}
