//! A catalog browsing session: filter form, keyword debouncer, filter store
//! and fetch controller wired together.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use cartalog_client::ClientTrait;
use cartalog_client::types::DEFAULT_PAGE_SIZE;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::models::debounce::{KeywordDebouncer, KeywordEdit, QuietPeriod};
use crate::models::fetch_controller::{
    CatalogFetchController,
    CatalogView,
    ControllerHandle,
    DEFAULT_FETCH_TIMEOUT,
};
use crate::models::filter_form::{FilterForm, FormError};
use crate::models::filter_store::{FilterChange, FilterStore};
use crate::models::result_renderer::RenderedPage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub page_size: NonZeroU32,
    pub quiet: QuietPeriod,
    pub fetch_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            page_size: DEFAULT_PAGE_SIZE,
            quiet: QuietPeriod::default(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// Owns every component of the catalog screen for as long as it is shown.
///
/// Dropping the session stops the debouncer and the controller.
#[derive(Debug)]
pub struct BrowseSession {
    store: FilterStore,
    form: FilterForm,
    debouncer: KeywordDebouncer,
    controller: ControllerHandle,
    controller_task: JoinHandle<()>,
    keyword: String,
}

impl BrowseSession {
    /// Start a session on the current runtime, which immediately loads the first page.
    pub fn start<C>(client: Arc<C>, config: SessionConfig) -> Self
    where
        C: ClientTrait + 'static,
    {
        let store = FilterStore::new(config.page_size);

        let (controller, handle) =
            CatalogFetchController::new(client, &store, config.fetch_timeout);
        let controller_task = tokio::spawn(controller.run());

        let keyword_store = store.clone();
        let debouncer = KeywordDebouncer::spawn(config.quiet, move |keyword| {
            keyword_store.apply_settled_keyword(keyword);
        });

        BrowseSession {
            store,
            form: FilterForm::default(),
            debouncer,
            controller: handle,
            controller_task,
            keyword: String::new(),
        }
    }

    pub fn store(&self) -> &FilterStore {
        &self.store
    }

    pub fn form(&self) -> &FilterForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FilterForm {
        &mut self.form
    }

    pub fn controller(&mut self) -> &mut ControllerHandle {
        &mut self.controller
    }

    /// The keyword as typed so far, settled or not.
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Replace the keyword input with `value`.
    ///
    /// A shorter value than before counts as a deletion.
    pub fn type_keyword(&mut self, value: impl Into<String>) {
        let edit = KeywordEdit::between(&self.keyword, value);
        self.push_keyword(edit);
    }

    pub fn push_keyword(&mut self, edit: KeywordEdit) {
        self.keyword = edit.value.clone();
        if !self.debouncer.push(edit) {
            debug!("keyword debouncer stopped, dropping edit");
        }
    }

    pub fn apply_form(&self) -> Result<FilterChange, FormError> {
        self.form.apply_to(&self.store)
    }

    /// Clear the form and the keyword input, and reset the store.
    ///
    /// A keyword still waiting to settle is dropped.
    pub fn reset(&mut self) -> FilterChange {
        self.keyword.clear();
        if !self.debouncer.reset() {
            debug!("keyword debouncer stopped, nothing to reset");
        }
        self.form.reset(&self.store)
    }

    pub fn view(&self) -> CatalogView {
        self.controller.view()
    }

    pub fn rendered(&self) -> RenderedPage {
        RenderedPage::from(self.view().page())
    }

    /// Go to the next page, if the displayed page is not the last one.
    pub fn next_page(&self) -> Option<FilterChange> {
        let change = self.rendered().pagination.next()?;
        Some(change.apply(&self.store))
    }

    /// Go to the previous page, if the displayed page is not the first one.
    pub fn previous_page(&self) -> Option<FilterChange> {
        let change = self.rendered().pagination.previous()?;
        Some(change.apply(&self.store))
    }

    pub fn retry(&self) -> bool {
        self.view().can_retry() && self.controller.retry()
    }
}

impl Drop for BrowseSession {
    fn drop(&mut self) {
        self.controller.shutdown();
        self.controller_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use cartalog_client::types::Transmission;
    use cartalog_client::{MockClient, MockResponseKind};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::catalog_page::tests::page_of;
    use crate::models::fetch_controller::FetchState;

    async fn settled_on(session: &mut BrowseSession, page_index: u32) -> CatalogView {
        session
            .controller()
            .wait_for(|view| {
                *view.state() == FetchState::Success && view.page().page_index == page_index
            })
            .await
            .expect("controller stopped")
    }

    #[tokio::test(start_paused = true)]
    async fn next_four_times_previous_once() {
        let client = MockClient::default();
        for number in [0, 1, 2, 3, 4, 3] {
            client.push_response(MockResponseKind::Page(page_of(&[number as u64], number, 5)));
        }
        let mut session = BrowseSession::start(Arc::new(client.clone()), SessionConfig::default());
        settled_on(&mut session, 0).await;

        for expected in 1..=4 {
            session.next_page().expect("next enabled");
            settled_on(&mut session, expected).await;
        }
        assert_eq!(session.next_page(), None, "next disabled on the last page");

        session.previous_page().expect("previous enabled");
        settled_on(&mut session, 3).await;

        let pagination = session.rendered().pagination;
        assert_eq!(pagination.page_index, 3);
        assert!(pagination.can_go_next());
        assert!(pagination.can_go_previous());
        assert_eq!(client.filter_requests().len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn typed_keyword_fetches_after_quiet_period() {
        let client = MockClient::default();
        client.push_response(MockResponseKind::Page(page_of(&[1], 0, 1)));
        client.push_response(MockResponseKind::Page(page_of(&[2], 0, 1)));
        let mut session = BrowseSession::start(Arc::new(client.clone()), SessionConfig::default());
        settled_on(&mut session, 0).await;

        session.type_keyword("c");
        session.type_keyword("ci");
        session.type_keyword("civ");
        session
            .controller()
            .wait_for(|view| view.page().items.first().map(|item| item.id) == Some(2))
            .await
            .unwrap();

        let requests = client.filter_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].keyword.as_deref(), Some("civ"));
    }

    #[tokio::test(start_paused = true)]
    async fn reset_drops_pending_keyword() {
        let client = MockClient::default();
        client.push_response(MockResponseKind::Page(page_of(&[1], 0, 1)));
        client.push_response(MockResponseKind::Page(page_of(&[1], 0, 1)));
        let mut session = BrowseSession::start(Arc::new(client.clone()), SessionConfig::default());
        settled_on(&mut session, 0).await;

        session.type_keyword("civ");
        session.reset();
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(session.keyword(), "");
        assert_eq!(session.store().snapshot().keyword, None);
        let requests = client.filter_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].keyword, None);
    }

    #[tokio::test(start_paused = true)]
    async fn same_keyword_after_reset_fetches_again() {
        let client = MockClient::default();
        for id in 1..=4 {
            client.push_response(MockResponseKind::Page(page_of(&[id], 0, 1)));
        }
        let mut session = BrowseSession::start(Arc::new(client.clone()), SessionConfig::default());
        settled_on(&mut session, 0).await;

        session.type_keyword("civic");
        tokio::time::sleep(Duration::from_secs(1)).await;
        session.reset();
        tokio::time::sleep(Duration::from_secs(1)).await;
        session.type_keyword("civic");
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(session.store().snapshot().keyword.as_deref(), Some("civic"));
        let keywords = client
            .filter_requests()
            .into_iter()
            .map(|params| params.keyword)
            .collect::<Vec<_>>();
        assert_eq!(keywords, vec![
            None,
            Some("civic".to_string()),
            None,
            Some("civic".to_string())
        ]);
    }

    #[tokio::test(start_paused = true)]
    async fn deselected_filter_is_cleared() {
        let client = MockClient::default();
        for id in 1..=3 {
            client.push_response(MockResponseKind::Page(page_of(&[id], 0, 1)));
        }
        let mut session = BrowseSession::start(Arc::new(client.clone()), SessionConfig::default());
        settled_on(&mut session, 0).await;

        session.form_mut().select_transmission(Some(Transmission::Manual));
        session.apply_form().unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        session.form_mut().select_transmission(None);
        session.apply_form().unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(session.store().snapshot().transmission, None);
        let transmissions = client
            .filter_requests()
            .into_iter()
            .map(|params| params.transmission)
            .collect::<Vec<_>>();
        assert_eq!(transmissions, vec![None, Some(Transmission::Manual), None]);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_form_is_not_applied() {
        let client = MockClient::default();
        client.push_response(MockResponseKind::Page(page_of(&[1], 0, 1)));
        let mut session = BrowseSession::start(Arc::new(client.clone()), SessionConfig::default());
        settled_on(&mut session, 0).await;

        session.form_mut().set_min_price("10");
        session.form_mut().set_max_price("5");
        assert!(session.apply_form().is_err());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(client.filter_requests().len(), 1);
    }
}
