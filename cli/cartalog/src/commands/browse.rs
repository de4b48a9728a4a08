use std::ops::ControlFlow;
use std::sync::Arc;

use anyhow::{Result, bail};
use bpaf::Bpaf;
use cartalog_client::ClientTrait;
use cartalog_client::types::{CarColor, EngineType, Transmission};
use cartalog_sdk::models::fetch_controller::{CatalogView, FailureKind, FetchState};
use cartalog_sdk::models::filter_form::FilterForm;
use cartalog_sdk::models::result_renderer::RenderedPage;
use cartalog_sdk::session::BrowseSession;
use indoc::indoc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{debug, instrument};

use super::search::{FilterOptions, filter_options};
use crate::config::Config;
use crate::utils::message;

const BROWSE_HELP: &str = indoc! {"
    n                 next page
    p                 previous page
    k [TEXT]          search for TEXT, or clear the keyword
    f KEY=VALUE...    filter by category, manufacturer, transmission, engine,
                      color (toggles), min-price, max-price, min-mileage, max-mileage
    reset             clear all filters and the keyword
    r                 retry a failed request
    s                 show the current page again
    q                 quit
"};

// Browse the catalog interactively
#[derive(Debug, Bpaf, Clone)]
pub struct Browse {
    /// Filters to start with
    #[bpaf(external(filter_options))]
    pub filters: FilterOptions,
}

/// One line of user input.
#[derive(Debug, Clone, PartialEq)]
enum BrowseInput {
    Next,
    Previous,
    Keyword(String),
    Filter(Vec<FilterAssignment>),
    Reset,
    Retry,
    Show,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
enum FilterAssignment {
    Category(Option<u64>),
    Manufacturer(Option<u64>),
    Transmission(Option<Transmission>),
    Engine(Option<EngineType>),
    Color(CarColor),
    MinPrice(String),
    MaxPrice(String),
    MinMileage(String),
    MaxMileage(String),
}

fn optional<T: std::str::FromStr>(value: &str) -> Result<Option<T>, T::Err> {
    if value.is_empty() {
        return Ok(None);
    }
    value.parse().map(Some)
}

impl FilterAssignment {
    fn parse(assignment: &str) -> Result<Self> {
        let Some((key, value)) = assignment.split_once('=') else {
            bail!("expected KEY=VALUE, got '{assignment}'");
        };
        let value = value.trim();
        let parsed = match key.trim() {
            "category" => FilterAssignment::Category(optional(value)?),
            "manufacturer" => FilterAssignment::Manufacturer(optional(value)?),
            "transmission" => FilterAssignment::Transmission(optional(value)?),
            "engine" => FilterAssignment::Engine(optional(value)?),
            "color" => FilterAssignment::Color(value.parse()?),
            "min-price" => FilterAssignment::MinPrice(value.to_string()),
            "max-price" => FilterAssignment::MaxPrice(value.to_string()),
            "min-mileage" => FilterAssignment::MinMileage(value.to_string()),
            "max-mileage" => FilterAssignment::MaxMileage(value.to_string()),
            other => bail!("unknown filter '{other}'"),
        };
        Ok(parsed)
    }

    fn apply(self, form: &mut FilterForm) {
        let range_error = match self {
            FilterAssignment::Category(id) => {
                form.select_category(id);
                None
            },
            FilterAssignment::Manufacturer(id) => {
                form.select_manufacturer(id);
                None
            },
            FilterAssignment::Transmission(transmission) => {
                form.select_transmission(transmission);
                None
            },
            FilterAssignment::Engine(engine_type) => {
                form.select_engine_type(engine_type);
                None
            },
            FilterAssignment::Color(color) => {
                let selected = form.toggle_color(color);
                debug!(%color, selected, "toggled color");
                None
            },
            FilterAssignment::MinPrice(text) => form.set_min_price(text),
            FilterAssignment::MaxPrice(text) => form.set_max_price(text),
            FilterAssignment::MinMileage(text) => form.set_min_mileage(text),
            FilterAssignment::MaxMileage(text) => form.set_max_mileage(text),
        };
        if let Some(err) = range_error {
            message::warning(err);
        }
    }
}

impl BrowseInput {
    fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let input = match command {
            "n" | "next" => BrowseInput::Next,
            "p" | "prev" | "previous" => BrowseInput::Previous,
            // keep inner whitespace, the keyword is sent as typed
            "k" | "keyword" => BrowseInput::Keyword(rest.to_string()),
            "f" | "filter" => {
                let assignments = rest
                    .split_whitespace()
                    .map(FilterAssignment::parse)
                    .collect::<Result<Vec<_>>>()?;
                if assignments.is_empty() {
                    bail!("expected at least one KEY=VALUE filter");
                }
                BrowseInput::Filter(assignments)
            },
            "reset" => BrowseInput::Reset,
            "r" | "retry" => BrowseInput::Retry,
            "" | "s" | "show" => BrowseInput::Show,
            "h" | "help" | "?" => BrowseInput::Help,
            "q" | "quit" | "exit" => BrowseInput::Quit,
            other => bail!("unknown command '{other}', type 'help' for a list of commands"),
        };
        Ok(input)
    }
}

/// Act on one line of input, stopping the session on `quit`.
fn dispatch(session: &mut BrowseSession, input: BrowseInput) -> ControlFlow<()> {
    match input {
        BrowseInput::Next => {
            if session.next_page().is_none() {
                message::warning("Already on the last page");
            }
        },
        BrowseInput::Previous => {
            if session.previous_page().is_none() {
                message::warning("Already on the first page");
            }
        },
        BrowseInput::Keyword(keyword) => session.type_keyword(keyword),
        BrowseInput::Filter(assignments) => {
            for assignment in assignments {
                assignment.apply(session.form_mut());
            }
            if let Err(err) = session.apply_form() {
                message::error(err);
            }
        },
        BrowseInput::Reset => {
            session.reset();
        },
        BrowseInput::Retry => {
            if !session.retry() {
                message::warning("Nothing to retry");
            }
        },
        BrowseInput::Show => {
            if let Some(description) = describe(&session.view()) {
                print!("{description}");
            }
        },
        BrowseInput::Help => message::plain(BROWSE_HELP),
        BrowseInput::Quit => return ControlFlow::Break(()),
    }
    ControlFlow::Continue(())
}

/// What to print for a view, if anything.
fn describe(view: &CatalogView) -> Option<String> {
    match view.state() {
        FetchState::Idle | FetchState::Loading => None,
        FetchState::Success => Some(RenderedPage::from(view.page()).to_string()),
        FetchState::Failed(failure) => {
            let hint = match failure.kind {
                FailureKind::Unauthorized => "Log in with 'cartalog auth login', then retry with 'r'.",
                FailureKind::RequestFailed | FailureKind::TimedOut => "Type 'r' to retry.",
            };
            Some(format!("Could not load cars: {}\n{hint}\n", failure.message))
        },
    }
}

/// Print every settled view until the controller goes away.
async fn render_views(mut views: watch::Receiver<CatalogView>) {
    while views.changed().await.is_ok() {
        let view = views.borrow_and_update().clone();
        match (view.failure(), describe(&view)) {
            (Some(_), Some(description)) => message::error(description.trim_end()),
            (None, Some(description)) => print!("{description}"),
            (_, None) => debug!("loading"),
        }
    }
}

impl Browse {
    #[instrument(name = "browse", skip_all)]
    pub async fn handle<C>(self, config: &Config, client: Arc<C>) -> Result<()>
    where
        C: ClientTrait + 'static,
    {
        let mut session = BrowseSession::start(client, config.session_config());
        let renderer = tokio::spawn(render_views(session.controller().watch()));

        // the session already loads the unfiltered first page
        *session.form_mut() = self.filters.to_form();
        let has_filters = session.form().apply().map_or(true, |update| !update.is_empty());
        if has_filters {
            if let Err(err) = session.apply_form() {
                message::error(err);
            }
        }

        message::plain("Type 'help' for a list of commands.");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            let input = match BrowseInput::parse(&line) {
                Ok(input) => input,
                Err(err) => {
                    message::error(err);
                    continue;
                },
            };
            if dispatch(&mut session, input).is_break() {
                break;
            }
        }

        drop(session);
        renderer.abort();
        Ok(())
    }
}
