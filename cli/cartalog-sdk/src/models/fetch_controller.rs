//! Fetching catalog pages in reaction to filter changes.
//!
//! [`CatalogView`] is the state machine itself and performs no IO.
//! [`CatalogFetchController`] drives it: every [`FilterChange`] starts one
//! request, and only the answer to the most recently started request is
//! applied. Older answers arriving late are discarded.

use std::sync::Arc;
use std::time::Duration;

use cartalog_client::types::FilterParams;
use cartalog_client::{CatalogClientError, ClientTrait};
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tracing::{debug, instrument, warn};

use super::catalog_page::CatalogPage;
use super::filter_store::{FilterChange, FilterStore};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The request failed or the answer could not be read.
    RequestFailed,
    /// The backend rejected the credentials, the user has to log in again.
    Unauthorized,
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchFailure {
    fn timed_out(after: Duration) -> Self {
        FetchFailure {
            kind: FailureKind::TimedOut,
            message: format!("catalog did not respond within {}s", after.as_secs_f32()),
        }
    }
}

impl From<&CatalogClientError> for FetchFailure {
    fn from(err: &CatalogClientError) -> Self {
        let kind = if err.is_unauthorized() {
            FailureKind::Unauthorized
        } else if err.is_timeout() {
            FailureKind::TimedOut
        } else {
            FailureKind::RequestFailed
        };
        FetchFailure {
            kind,
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum FetchState {
    #[default]
    Idle,
    Loading,
    Success,
    Failed(FetchFailure),
}

/// Identifies a request, later requests have larger ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

#[derive(Debug, Clone, PartialEq)]
pub struct RequestTicket {
    pub id: RequestId,
    pub params: FilterParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    Applied,
    /// The answer belonged to a superseded request.
    Discarded,
}

/// Render ready state of the catalog listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogView {
    state: FetchState,
    page: CatalogPage,
    issued: u64,
    latest: Option<RequestTicket>,
}

impl CatalogView {
    pub fn state(&self) -> &FetchState {
        &self.state
    }

    /// The last successfully fetched page, kept across failures.
    pub fn page(&self) -> &CatalogPage {
        &self.page
    }

    pub fn is_loading(&self) -> bool {
        self.state == FetchState::Loading
    }

    pub fn failure(&self) -> Option<&FetchFailure> {
        match &self.state {
            FetchState::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn latest_request(&self) -> Option<&RequestTicket> {
        self.latest.as_ref()
    }

    /// Start a request for `params`, superseding any request in flight.
    pub fn begin(&mut self, params: FilterParams) -> RequestTicket {
        self.issued += 1;
        let ticket = RequestTicket {
            id: RequestId(self.issued),
            params,
        };
        self.state = FetchState::Loading;
        self.latest = Some(ticket.clone());
        ticket
    }

    /// Reconcile the answer to request `id`.
    ///
    /// A failure keeps the previously fetched page.
    pub fn complete(
        &mut self,
        id: RequestId,
        result: Result<CatalogPage, FetchFailure>,
    ) -> Reconciliation {
        if self.latest.as_ref().map(|ticket| ticket.id) != Some(id) {
            return Reconciliation::Discarded;
        }

        match result {
            Ok(page) => {
                self.page = page;
                self.state = FetchState::Success;
            },
            Err(failure) => self.state = FetchState::Failed(failure),
        }
        Reconciliation::Applied
    }

    pub fn can_retry(&self) -> bool {
        matches!(self.state, FetchState::Failed(_)) && self.latest.is_some()
    }

    /// Start the failed request over.
    pub fn retry(&mut self) -> Option<RequestTicket> {
        if !self.can_retry() {
            return None;
        }
        let params = self.latest.as_ref()?.params.clone();
        Some(self.begin(params))
    }
}

#[derive(Debug)]
enum ControllerCommand {
    Retry,
    Shutdown,
}

/// The consumer's side of a running [`CatalogFetchController`].
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    commands: mpsc::UnboundedSender<ControllerCommand>,
    view: watch::Receiver<CatalogView>,
}

impl ControllerHandle {
    /// A copy of the current view.
    pub fn view(&self) -> CatalogView {
        self.view.borrow().clone()
    }

    /// A receiver that is notified about every published view.
    pub fn watch(&self) -> watch::Receiver<CatalogView> {
        self.view.clone()
    }

    /// Wait until the view satisfies `predicate`.
    ///
    /// Returns `None` if the controller stopped before that happened.
    pub async fn wait_for(
        &mut self,
        predicate: impl FnMut(&CatalogView) -> bool,
    ) -> Option<CatalogView> {
        self.view
            .wait_for(predicate)
            .await
            .ok()
            .map(|view| view.clone())
    }

    /// Ask the controller to repeat the failed request.
    ///
    /// Returns whether the controller is still running to receive it, not
    /// whether a request was repeated. The controller ignores the retry unless
    /// the latest request failed.
    pub fn retry(&self) -> bool {
        self.commands.send(ControllerCommand::Retry).is_ok()
    }

    pub fn shutdown(&self) {
        let _ = self.commands.send(ControllerCommand::Shutdown);
    }
}

type PendingFetch = BoxFuture<'static, (RequestId, Result<CatalogPage, FetchFailure>)>;

/// Issues a listing request for every change of a [`FilterStore`].
pub struct CatalogFetchController<C> {
    client: Arc<C>,
    initial: FilterParams,
    changes: mpsc::UnboundedReceiver<FilterChange>,
    commands: mpsc::UnboundedReceiver<ControllerCommand>,
    view: watch::Sender<CatalogView>,
    timeout: Duration,
}

impl<C> CatalogFetchController<C>
where
    C: ClientTrait + 'static,
{
    /// Subscribe to `store`, the returned controller does nothing until [`Self::run`].
    pub fn new(client: Arc<C>, store: &FilterStore, timeout: Duration) -> (Self, ControllerHandle) {
        let changes = store.subscribe();
        let (command_sender, commands) = mpsc::unbounded_channel();
        let (view, view_receiver) = watch::channel(CatalogView::default());

        let controller = CatalogFetchController {
            client,
            initial: store.snapshot(),
            changes,
            commands,
            view,
            timeout,
        };
        let handle = ControllerHandle {
            commands: command_sender,
            view: view_receiver,
        };
        (controller, handle)
    }

    /// Fetch the initial page, then follow the store until shut down.
    #[instrument(name = "fetch_controller", skip_all)]
    pub async fn run(self) {
        let CatalogFetchController {
            client,
            initial,
            mut changes,
            mut commands,
            view,
            timeout,
        } = self;

        let mut state = CatalogView::default();
        let mut in_flight: FuturesUnordered<PendingFetch> = FuturesUnordered::new();

        let ticket = state.begin(initial);
        in_flight.push(fetch_page(client.clone(), ticket, timeout).boxed());
        view.send_replace(state.clone());

        loop {
            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(ControllerCommand::Retry) => {
                        let Some(ticket) = state.retry() else {
                            debug!("nothing to retry");
                            continue;
                        };
                        debug!(request = ?ticket.id, "retrying");
                        in_flight.push(fetch_page(client.clone(), ticket, timeout).boxed());
                        view.send_replace(state.clone());
                    },
                    Some(ControllerCommand::Shutdown) | None => break,
                },

                change = changes.recv() => {
                    let Some(change) = change else {
                        break;
                    };
                    let ticket = state.begin(change.params);
                    debug!(request = ?ticket.id, revision = change.revision, "filter changed, fetching");
                    in_flight.push(fetch_page(client.clone(), ticket, timeout).boxed());
                    view.send_replace(state.clone());
                },

                Some((id, result)) = in_flight.next(), if !in_flight.is_empty() => {
                    match state.complete(id, result) {
                        Reconciliation::Applied => {
                            view.send_replace(state.clone());
                        },
                        Reconciliation::Discarded => {
                            debug!(request = ?id, "discarding stale response");
                        },
                    }
                },
            }
        }

        debug!(in_flight = in_flight.len(), "fetch controller stopped");
    }
}

async fn fetch_page<C>(
    client: Arc<C>,
    ticket: RequestTicket,
    timeout: Duration,
) -> (RequestId, Result<CatalogPage, FetchFailure>)
where
    C: ClientTrait + 'static,
{
    let result = match tokio::time::timeout(timeout, client.filter_cars(&ticket.params)).await {
        Ok(Ok(response)) => Ok(CatalogPage::from(response)),
        Ok(Err(err)) => {
            warn!(request = ?ticket.id, error = %err, "fetching catalog page failed");
            Err(FetchFailure::from(&err))
        },
        Err(_) => {
            warn!(request = ?ticket.id, "fetching catalog page timed out");
            Err(FetchFailure::timed_out(timeout))
        },
    };
    (ticket.id, result)
}
