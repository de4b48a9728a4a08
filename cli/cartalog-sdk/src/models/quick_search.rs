//! The quick search box of the car management screen.
//!
//! Input is split on whitespace into at most four positional tokens:
//! manufacturer, category, transmission and engine type, in that order.
//! Each token is looked up on its own, so one unknown token does not hide
//! the matches of the others.

use cartalog_client::types::{Category, EngineType, Manufacturer, Transmission};
use itertools::Itertools;
use thiserror::Error;

use super::filter_store::FilterUpdate;

const SLOTS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    #[error("Manufacturer \"{0}\" not found")]
    Manufacturer(String),
    #[error("Category \"{0}\" not found")]
    Category(String),
    #[error("Transmission \"{0}\" not found")]
    Transmission(String),
    #[error("Engine type \"{0}\" not found")]
    EngineType(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuickSearchError {
    #[error("{}", .0.iter().join("\n"))]
    UnknownTerms(Vec<SlotError>),
    #[error("expected at most 4 search terms (manufacturer category transmission engine), got {0}")]
    TooManyTerms(usize),
}

/// What each token of a quick search resolved to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuickSearchMatch {
    pub manufacturer: Option<Manufacturer>,
    pub category: Option<Category>,
    pub transmission: Option<Transmission>,
    pub engine_type: Option<EngineType>,
}

impl QuickSearchMatch {
    pub fn to_filter_update(&self) -> FilterUpdate {
        FilterUpdate {
            supplier_id: self.manufacturer.as_ref().map(|manufacturer| manufacturer.id),
            category_id: self.category.as_ref().map(|category| category.id),
            transmission: self.transmission,
            engine_type: self.engine_type,
            ..Default::default()
        }
    }
}

/// Resolve `input` against the known manufacturers and categories.
///
/// Names are compared case insensitively. Every unknown token is reported.
pub fn parse(
    input: &str,
    manufacturers: &[Manufacturer],
    categories: &[Category],
) -> Result<QuickSearchMatch, QuickSearchError> {
    let tokens: Vec<&str> = input.split_whitespace().collect();
    if tokens.len() > SLOTS {
        return Err(QuickSearchError::TooManyTerms(tokens.len()));
    }

    let token = |slot: usize| tokens.get(slot).copied();
    let mut errors = Vec::new();
    let mut found = QuickSearchMatch::default();

    if let Some(name) = token(0) {
        found.manufacturer = manufacturers
            .iter()
            .find(|manufacturer| manufacturer.name.eq_ignore_ascii_case(name))
            .cloned();
        if found.manufacturer.is_none() {
            errors.push(SlotError::Manufacturer(name.to_string()));
        }
    }

    if let Some(name) = token(1) {
        found.category = categories
            .iter()
            .find(|category| category.name.eq_ignore_ascii_case(name))
            .cloned();
        if found.category.is_none() {
            errors.push(SlotError::Category(name.to_string()));
        }
    }

    if let Some(name) = token(2) {
        match name.parse() {
            Ok(transmission) => found.transmission = Some(transmission),
            Err(_) => errors.push(SlotError::Transmission(name.to_string())),
        }
    }

    if let Some(name) = token(3) {
        match name.parse() {
            Ok(engine_type) => found.engine_type = Some(engine_type),
            Err(_) => errors.push(SlotError::EngineType(name.to_string())),
        }
    }

    if !errors.is_empty() {
        return Err(QuickSearchError::UnknownTerms(errors));
    }
    Ok(found)
}
