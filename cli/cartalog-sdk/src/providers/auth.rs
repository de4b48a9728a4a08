//! The login lifecycle around an [`AuthContext`].
//!
//! A token is populated at login, or adopted when handed in explicitly,
//! and cleared at logout. The catalog client clears it on its own when the
//! backend answers `401`.

use cartalog_client::types::Credentials;
use cartalog_client::{AuthContext, CatalogClientError, ClientTrait};
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Username and password are required")]
    MissingCredentials,
    #[error(transparent)]
    Client(#[from] CatalogClientError),
}

/// Exchange `credentials` for a token and store it in `auth`.
#[instrument(skip_all, fields(username = %credentials.username))]
pub async fn login<C>(
    client: &C,
    auth: &dyn AuthContext,
    credentials: &Credentials,
) -> Result<(), AuthError>
where
    C: ClientTrait,
{
    if credentials.username.trim().is_empty() || credentials.password.is_empty() {
        return Err(AuthError::MissingCredentials);
    }

    let response = match client.authenticate(credentials).await {
        Ok(response) => response,
        Err(CatalogClientError::Unauthorized) => return Err(AuthError::InvalidCredentials),
        Err(err) => return Err(err.into()),
    };

    debug!("received token, storing");
    auth.set(response.token);
    Ok(())
}

/// Forget the stored token.
///
/// Returns whether there was a token to forget.
pub fn logout(auth: &dyn AuthContext) -> bool {
    let was_logged_in = auth.get().is_some();
    auth.clear();
    was_logged_in
}

/// Let an explicitly provided token take precedence over the stored one.
pub fn adopt_token(auth: &dyn AuthContext, token: Option<String>) {
    if let Some(token) = token.filter(|token| !token.trim().is_empty()) {
        debug!("using explicitly provided token");
        auth.set(token);
    }
}

/// The current token, or [`CatalogClientError::Unauthorized`] if there is none.
pub fn require_token(auth: &dyn AuthContext) -> Result<String, CatalogClientError> {
    auth.get().ok_or(CatalogClientError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use cartalog_client::types::TokenResponse;
    use cartalog_client::{InMemoryAuth, MockClient, MockResponseKind};

    use super::*;

    fn credentials() -> Credentials {
        Credentials {
            username: "admin".to_string(),
            password: "secret".to_string(),
        }
    }

    #[tokio::test]
    async fn login_stores_token() {
        let client = MockClient::default();
        client.push_response(MockResponseKind::Token(TokenResponse {
            token: "jwt".to_string(),
        }));
        let auth = InMemoryAuth::default();

        login(&client, &auth, &credentials()).await.unwrap();
        assert_eq!(require_token(&auth).unwrap(), "jwt");
    }

    #[tokio::test]
    async fn rejected_login_is_invalid_credentials() {
        let client = MockClient::default();
        client.push_error_response(401, "Invalid credentials");
        let auth = InMemoryAuth::default();

        let err = login(&client, &auth, &credentials()).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials), "got {err:?}");
        assert!(require_token(&auth).unwrap_err().is_unauthorized());
    }

    #[tokio::test]
    async fn blank_credentials_never_sent() {
        let client = MockClient::default();
        let auth = InMemoryAuth::default();

        let err = login(&client, &auth, &Credentials {
            username: " ".to_string(),
            password: String::new(),
        })
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::MissingCredentials));
    }

    #[test]
    fn explicit_token_overrides_stored_one() {
        let auth = InMemoryAuth::with_token("stored");
        adopt_token(&auth, None);
        assert_eq!(auth.get().as_deref(), Some("stored"));

        adopt_token(&auth, Some("from-link".to_string()));
        assert_eq!(auth.get().as_deref(), Some("from-link"));
    }

    #[test]
    fn logout_clears() {
        let auth = InMemoryAuth::with_token("stored");
        assert!(logout(&auth));
        assert!(!logout(&auth));
    }
}
