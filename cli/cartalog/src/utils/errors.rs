use cartalog_client::CatalogClientError;
use cartalog_sdk::providers::auth::AuthError;
use indoc::formatdoc;
use tracing::trace;

pub fn display_chain(mut err: &dyn std::error::Error) -> String {
    let mut fmt = err.to_string();
    while let Some(source) = err.source() {
        fmt = format!("{fmt}: {source}");
        err = source;
    }

    fmt
}

pub fn format_client_error(err: &CatalogClientError) -> String {
    trace!("formatting catalog_client_error: {err:?}");

    match err {
        CatalogClientError::Unauthorized => formatdoc! {"
            {err}

            Log in with 'cartalog auth login' and try again.
        "},
        CatalogClientError::Request(source) if source.is_connect() => formatdoc! {"
            Could not connect to the catalog.

            Check that the backend is running and that 'catalog_url' points at it,
            see 'cartalog config --list'.
        "},
        CatalogClientError::Request(_) if err.is_timeout() => {
            "The catalog did not answer in time.".to_string()
        },
        _ => display_chain(err),
    }
}

pub fn format_auth_error(err: &AuthError) -> String {
    match err {
        AuthError::Client(err) => format_client_error(err),
        _ => display_chain(err),
    }
}
