use std::collections::BTreeSet;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cartalog_client::types::{CarColor, EngineType, FilterParams, Transmission};
use tokio::sync::mpsc;
use tracing::debug;

/// A change of the filter dimensions.
///
/// Merged with [`FilterStore::apply_partial`], `None` means "leave as is".
/// Applied with [`FilterStore::replace_filters`], `None` clears the dimension.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterUpdate {
    pub category_id: Option<u64>,
    pub supplier_id: Option<u64>,
    pub transmission: Option<Transmission>,
    pub engine_type: Option<EngineType>,
    pub car_colors: Option<BTreeSet<CarColor>>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_mileage: Option<f64>,
    pub max_mileage: Option<f64>,
}

impl FilterUpdate {
    pub fn is_empty(&self) -> bool {
        self == &FilterUpdate::default()
    }

    fn merge_into(self, params: &mut FilterParams) {
        fn merge<T>(target: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *target = value;
            }
        }

        merge(&mut params.category_id, self.category_id);
        merge(&mut params.supplier_id, self.supplier_id);
        merge(&mut params.transmission, self.transmission);
        merge(&mut params.engine_type, self.engine_type);
        merge(&mut params.min_price, self.min_price);
        merge(&mut params.max_price, self.max_price);
        merge(&mut params.min_mileage, self.min_mileage);
        merge(&mut params.max_mileage, self.max_mileage);
        if let Some(colors) = self.car_colors {
            params.car_colors = colors;
        }
    }

    fn replace_in(self, params: &mut FilterParams) {
        params.category_id = self.category_id;
        params.supplier_id = self.supplier_id;
        params.transmission = self.transmission;
        params.engine_type = self.engine_type;
        params.car_colors = self.car_colors.unwrap_or_default();
        params.min_price = self.min_price;
        params.max_price = self.max_price;
        params.min_mileage = self.min_mileage;
        params.max_mileage = self.max_mileage;
    }
}

/// What kind of mutation produced a [`FilterChange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeCause {
    Filters,
    Keyword,
    Page,
    Reset,
}

/// Sent to every subscriber after each mutation of a [`FilterStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct FilterChange {
    /// Increases by one with every mutation.
    pub revision: u64,
    pub cause: ChangeCause,
    /// The complete parameters after the mutation.
    pub params: FilterParams,
}

#[derive(Debug)]
struct StoreState {
    params: FilterParams,
    revision: u64,
    subscribers: Vec<mpsc::UnboundedSender<FilterChange>>,
}

/// The single source of truth for the active filter and page.
///
/// Cloning the store yields another handle to the same state.
#[derive(Debug, Clone)]
pub struct FilterStore {
    state: Arc<Mutex<StoreState>>,
}

impl Default for FilterStore {
    fn default() -> Self {
        FilterStore::new(FilterParams::default().size)
    }
}

impl FilterStore {
    pub fn new(size: NonZeroU32) -> Self {
        let params = FilterParams {
            size,
            ..Default::default()
        };
        FilterStore {
            state: Arc::new(Mutex::new(StoreState {
                params,
                revision: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A copy of the current parameters.
    pub fn snapshot(&self) -> FilterParams {
        self.lock().params.clone()
    }

    pub fn revision(&self) -> u64 {
        self.lock().revision
    }

    /// Receive a [`FilterChange`] for every mutation from now on.
    ///
    /// Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<FilterChange> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.lock().subscribers.push(sender);
        receiver
    }

    /// Merge `update` into the current filter and go back to the first page.
    pub fn apply_partial(&self, update: FilterUpdate) -> FilterChange {
        self.mutate(ChangeCause::Filters, |params| {
            update.merge_into(params);
            params.page = 0;
        })
    }

    /// Replace every filter dimension with `update` and go back to the first page.
    ///
    /// Keyword and page size are kept.
    pub fn replace_filters(&self, update: FilterUpdate) -> FilterChange {
        self.mutate(ChangeCause::Filters, |params| {
            update.replace_in(params);
            params.page = 0;
        })
    }

    /// Set the keyword settled by the debouncer and go back to the first page.
    ///
    /// An empty keyword removes the keyword filter.
    pub fn apply_settled_keyword(&self, keyword: impl Into<String>) -> FilterChange {
        let keyword = keyword.into();
        self.mutate(ChangeCause::Keyword, |params| {
            params.keyword = Some(keyword).filter(|keyword| !keyword.is_empty());
            params.page = 0;
        })
    }

    /// Move to another page, keeping every filter.
    pub fn set_page(&self, page: u32) -> FilterChange {
        self.mutate(ChangeCause::Page, |params| params.page = page)
    }

    /// Restore the defaults, keeping the page size.
    pub fn reset(&self) -> FilterChange {
        self.mutate(ChangeCause::Reset, |params| {
            *params = FilterParams {
                size: params.size,
                ..Default::default()
            };
        })
    }

    fn mutate(&self, cause: ChangeCause, f: impl FnOnce(&mut FilterParams)) -> FilterChange {
        let mut state = self.lock();
        f(&mut state.params);
        state.revision += 1;

        let change = FilterChange {
            revision: state.revision,
            cause,
            params: state.params.clone(),
        };

        state
            .subscribers
            .retain(|subscriber| subscriber.send(change.clone()).is_ok());
        debug!(
            revision = change.revision,
            ?cause,
            page = change.params.page,
            subscribers = state.subscribers.len(),
            "filter changed"
        );
        change
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;

    fn arb_update() -> impl Strategy<Value = FilterUpdate> {
        (
            proptest::option::of(0u64..100),
            proptest::option::of(0u64..100),
            proptest::option::of(proptest::sample::select(Transmission::ALL.to_vec())),
            proptest::option::of(0.0f64..1e6),
            proptest::option::of(0.0f64..1e6),
        )
            .prop_map(
                |(category_id, supplier_id, transmission, min_price, max_mileage)| FilterUpdate {
                    category_id,
                    supplier_id,
                    transmission,
                    min_price,
                    max_mileage,
                    ..Default::default()
                },
            )
    }

    #[test]
    fn starts_with_defaults() {
        let store = FilterStore::default();
        assert_eq!(store.snapshot(), FilterParams::default());
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn apply_partial_on_page_two_resets_page() {
        let store = FilterStore::default();
        store.set_page(2);

        let change = store.apply_partial(FilterUpdate {
            category_id: Some(3),
            ..Default::default()
        });

        assert_eq!(change.params.page, 0);
        assert_eq!(change.params.category_id, Some(3));
        assert_eq!(change.cause, ChangeCause::Filters);
    }

    #[test]
    fn absent_fields_do_not_overwrite() {
        let store = FilterStore::default();
        store.apply_partial(FilterUpdate {
            category_id: Some(3),
            car_colors: Some([CarColor::Red].into()),
            ..Default::default()
        });
        store.apply_partial(FilterUpdate {
            max_price: Some(5000.0),
            ..Default::default()
        });

        let params = store.snapshot();
        assert_eq!(params.category_id, Some(3));
        assert_eq!(params.car_colors, BTreeSet::from([CarColor::Red]));
        assert_eq!(params.max_price, Some(5000.0));
    }

    #[test]
    fn replaced_filters_clear_what_is_missing() {
        let store = FilterStore::default();
        store.apply_partial(FilterUpdate {
            transmission: Some(Transmission::Manual),
            car_colors: Some([CarColor::Red].into()),
            min_price: Some(100.0),
            ..Default::default()
        });
        store.apply_settled_keyword("civic");
        store.set_page(2);

        let change = store.replace_filters(FilterUpdate {
            category_id: Some(3),
            ..Default::default()
        });

        assert_eq!(change.params, FilterParams {
            category_id: Some(3),
            keyword: Some("civic".to_string()),
            ..Default::default()
        });
    }

    #[test]
    fn settled_keyword_resets_page() {
        let store = FilterStore::default();
        store.set_page(4);

        store.apply_settled_keyword("corolla");
        assert_eq!(store.snapshot().keyword.as_deref(), Some("corolla"));
        assert_eq!(store.snapshot().page, 0);

        store.apply_settled_keyword("");
        assert_eq!(store.snapshot().keyword, None);
    }

    #[test]
    fn reset_keeps_size() {
        let store = FilterStore::new(NonZeroU32::new(50).unwrap());
        store.apply_partial(FilterUpdate {
            engine_type: Some(EngineType::Diesel),
            ..Default::default()
        });
        store.apply_settled_keyword("van");
        store.set_page(3);

        store.reset();

        assert_eq!(store.snapshot(), FilterParams {
            size: NonZeroU32::new(50).unwrap(),
            ..Default::default()
        });
    }

    #[test]
    fn every_mutation_notifies_all_subscribers() {
        let store = FilterStore::default();
        let mut first = store.subscribe();
        let mut second = store.subscribe();

        store.set_page(1);
        store.set_page(1);
        store.reset();

        for receiver in [&mut first, &mut second] {
            let revisions: Vec<_> = std::iter::from_fn(|| receiver.try_recv().ok())
                .map(|change| (change.revision, change.cause))
                .collect();
            assert_eq!(revisions, vec![
                (1, ChangeCause::Page),
                (2, ChangeCause::Page),
                (3, ChangeCause::Reset),
            ]);
        }
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let store = FilterStore::default();
        let kept = store.subscribe();
        drop(store.subscribe());

        store.set_page(1);
        assert_eq!(store.lock().subscribers.len(), 1);
        drop(kept);
    }

    #[test]
    fn clones_share_state() {
        let store = FilterStore::default();
        let handle = store.clone();
        handle.set_page(7);
        assert_eq!(store.snapshot().page, 7);
    }

    proptest! {
        #[test]
        fn apply_partial_always_resets_page(page in 0u32..1000, update in arb_update()) {
            let store = FilterStore::default();
            store.set_page(page);
            prop_assert_eq!(store.apply_partial(update).params.page, 0);
        }

        #[test]
        fn set_page_changes_nothing_else(update in arb_update(), page in 0u32..1000) {
            let store = FilterStore::default();
            store.apply_partial(update);
            let before = store.snapshot();

            let after = store.set_page(page).params;
            prop_assert_eq!(after.page, page);
            prop_assert_eq!(FilterParams { page: before.page, ..after }, before);
        }
    }
}
