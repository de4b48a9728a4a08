mod auth;
mod browse;
mod cars;
mod categories;
mod general;
mod manufacturers;
mod quick_search;
mod search;

use std::fmt;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use bpaf::Bpaf;
use cartalog_client::Client;
use indoc::{formatdoc, indoc};
use tracing::debug;

use crate::config::Config;
use crate::utils::init::init_catalog_client;
use crate::utils::message;
use crate::utils::token_store::ConfigTokenStore;

static CARTALOG_DESCRIPTION: &'_ str = indoc! {"
    Cartalog browses a car catalog and manages its inventory.\n\n

    Search and page through listings, or log in as an administrator
    to manage cars, categories and manufacturers."
};

fn vec_len<T>(x: Vec<T>) -> usize {
    Vec::len(&x)
}

fn vec_not_empty<T>(x: Vec<T>) -> bool {
    !x.is_empty()
}

#[derive(Bpaf, Clone, Copy, Debug)]
pub enum Verbosity {
    Verbose(
        /// Increase logging verbosity
        ///
        /// Invoke multiple times for increasing detail.
        #[bpaf(short('v'), long("verbose"), req_flag(()), many, map(vec_len))]
        usize,
    ),

    /// Silence logs except for errors
    #[bpaf(short, long)]
    Quiet,
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Verbose(0)
    }
}

#[derive(Bpaf)]
#[bpaf(options, version, descr(CARTALOG_DESCRIPTION))]
pub struct CartalogCli(#[bpaf(external(cartalog_args))] pub CartalogArgs);

/// Main cartalog args parser
///
/// To parse the cartalog CLI, use [`CartalogCli`] through [`cartalog_cli()`].
#[derive(Debug, Bpaf)]
#[bpaf(ignore_rustdoc)]
pub struct CartalogArgs {
    /// Verbose mode
    ///
    /// Invoke multiple times for increasing detail.
    #[bpaf(external, fallback(Default::default()))]
    pub verbosity: Verbosity,

    /// Debug mode
    #[bpaf(long, req_flag(()), many, map(vec_not_empty), hide)]
    pub debug: bool,

    #[bpaf(external(commands), optional)]
    command: Option<Commands>,
}

impl fmt::Debug for Commands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Command")
    }
}

impl CartalogArgs {
    pub async fn handle(self, config: Config) -> Result<()> {
        let Some(command) = self.command else {
            print_welcome_message(&config);
            return Ok(());
        };

        let auth = Arc::new(ConfigTokenStore::new(&config));
        let client = Arc::new(init_catalog_client(&config, auth.clone())?);

        let cli_worker = command.handle(config, client, auth);

        // Wait for either an interrupting signal or completion of the cli work
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                debug!("received interrupt");
                Err(anyhow!("user interrupted process"))
            }
            result = cli_worker => result,
        }
    }
}

/// Print general welcome message with short usage instructions
fn print_welcome_message(config: &Config) {
    let version = env!("CARGO_PKG_VERSION");
    let login_hint = if config.admin_token.is_some() {
        "Logged in as administrator."
    } else {
        "Log in with 'cartalog auth login' to manage the catalog."
    };

    message::plain(formatdoc! {"
        cartalog version {version}

        Usage: cartalog OPTIONS (search|browse|quick-search|cars|...) [--help]

        Use 'cartalog --help' for full list of commands and more information

        {login_hint}
    "});
}

#[derive(Bpaf, Clone)]
enum Commands {
    /// Show one page of cars matching the given filters
    #[bpaf(command)]
    Search(#[bpaf(external(search::search))] search::Search),

    /// Page through the catalog interactively
    #[bpaf(command)]
    Browse(#[bpaf(external(browse::browse))] browse::Browse),

    /// Filter by manufacturer, category, transmission and engine in one go
    #[bpaf(command("quick-search"))]
    QuickSearch(#[bpaf(external(quick_search::quick_search))] quick_search::QuickSearch),

    /// Log in to or out of the admin console
    #[bpaf(command)]
    Auth(#[bpaf(external(auth::auth_commands))] auth::AuthCommands),

    /// Manage cars
    #[bpaf(command)]
    Cars(#[bpaf(external(cars::car_commands))] cars::CarCommands),

    /// Manage car categories
    #[bpaf(command)]
    Categories(#[bpaf(external(categories::category_commands))] categories::CategoryCommands),

    /// Manage manufacturers
    #[bpaf(command)]
    Manufacturers(
        #[bpaf(external(manufacturers::manufacturer_commands))]
        manufacturers::ManufacturerCommands,
    ),

    /// View and set configuration options
    #[bpaf(command)]
    Config(#[bpaf(external(general::config_args))] general::ConfigArgs),
}

impl Commands {
    async fn handle(
        self,
        config: Config,
        client: Arc<Client>,
        auth: Arc<ConfigTokenStore>,
    ) -> Result<()> {
        match self {
            Commands::Search(args) => args.handle(&config, &*client).await,
            Commands::Browse(args) => args.handle(&config, client).await,
            Commands::QuickSearch(args) => args.handle(&config, &*client).await,
            Commands::Auth(args) => args.handle(&*client, &auth).await,
            Commands::Cars(args) => args.handle(&*client).await,
            Commands::Categories(args) => args.handle(&*client).await,
            Commands::Manufacturers(args) => args.handle(&*client).await,
            Commands::Config(args) => args.handle(config).await,
        }
    }
}

/// Parse `args` the way the binary would, for tests.
#[cfg(test)]
pub(crate) fn parse_args(args: &[&str]) -> Result<CartalogArgs, bpaf::ParseFailure> {
    cartalog_cli()
        .run_inner(args)
        .map(|CartalogCli(args)| args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_counts_flags() {
        let args = parse_args(&["-vv", "search"]).unwrap();
        assert!(matches!(args.verbosity, Verbosity::Verbose(2)));

        let args = parse_args(&["-q"]).unwrap();
        assert!(matches!(args.verbosity, Verbosity::Quiet));
        assert!(args.command.is_none());
    }

    #[test]
    fn subcommands_parse() {
        for args in [
            &["search", "--json", "--category", "3"][..],
            &["quick-search", "toyota", "suv"],
            &["auth", "status"],
            &["cars", "show", "4"],
            &["categories", "list"],
            &["manufacturers", "delete", "2"],
            &["config", "--set", "page_size", "10"],
        ] {
            let parsed = parse_args(args);
            assert!(parsed.is_ok(), "{args:?} failed to parse");
        }
    }

    #[test]
    fn unknown_transmission_rejected() {
        assert!(parse_args(&["search", "--transmission", "warp"]).is_err());
    }
}
