use anyhow::{Result, bail};
use bpaf::Bpaf;
use cartalog_client::types::Credentials;
use cartalog_client::{AuthContext, ClientTrait};
use cartalog_sdk::providers::auth::{self, AuthError};
use tracing::instrument;

use crate::utils::errors::format_auth_error;
use crate::utils::message;
use crate::utils::token_store::ConfigTokenStore;

/// Log in as an administrator
#[derive(Debug, Bpaf, Clone)]
pub enum LoginMethod {
    Password {
        /// Administrator user name
        #[bpaf(long, short, argument("NAME"))]
        username: String,
        /// Password, read from `$CARTALOG_PASSWORD` when not given
        #[bpaf(long, short, argument("PASSWORD"), env("CARTALOG_PASSWORD"))]
        password: String,
    },
    /// Use a token handed out by another session instead of logging in
    Token {
        #[bpaf(long("token"), argument("TOKEN"))]
        token: String,
    },
}

#[derive(Debug, Bpaf, Clone)]
pub enum AuthCommands {
    /// Log in and remember the token for later commands
    #[bpaf(command)]
    Login(#[bpaf(external(login_method))] LoginMethod),

    /// Forget the stored token
    #[bpaf(command)]
    Logout,

    /// Show whether a token is stored
    #[bpaf(command)]
    Status,
}

impl AuthCommands {
    #[instrument(name = "auth", skip_all)]
    pub async fn handle(self, client: &impl ClientTrait, store: &ConfigTokenStore) -> Result<()> {
        let auth: &dyn AuthContext = store;
        match self {
            AuthCommands::Login(LoginMethod::Password { username, password }) => {
                let credentials = Credentials { username, password };
                match auth::login(client, auth, &credentials).await {
                    Ok(()) => {
                        ensure_saved(store, "Logged in, but the token could not be saved to")?;
                        message::updated(format!("Logged in as '{}'", credentials.username))
                    },
                    Err(err @ AuthError::InvalidCredentials) => {
                        bail!("{}", format_auth_error(&err))
                    },
                    Err(err) => bail!("Login failed: {}", format_auth_error(&err)),
                }
            },
            AuthCommands::Login(LoginMethod::Token { token }) => {
                if token.trim().is_empty() {
                    bail!("The token must not be empty");
                }
                auth::adopt_token(auth, Some(token));
                ensure_saved(store, "The token could not be saved to")?;
                message::updated("Token stored");
            },
            AuthCommands::Logout => {
                if auth::logout(auth) {
                    ensure_saved(store, "Logged out, but the token could not be removed from")?;
                    message::deleted("Logged out");
                } else {
                    message::warning("Not logged in");
                }
            },
            AuthCommands::Status => match auth::require_token(auth) {
                Ok(_) => message::plain("Logged in as administrator"),
                Err(err) => message::plain(err),
            },
        }
        Ok(())
    }
}

/// Fail if the last token change did not reach the config file.
fn ensure_saved(store: &ConfigTokenStore, failure: &str) -> Result<()> {
    match store.take_write_error() {
        Some(err) => bail!("{failure} {}: {err}", store.config_file().display()),
        None => Ok(()),
    }
}
