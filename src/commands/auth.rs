//! Authentication command handlers for the OAuth flow.
//!
//! - `caroney auth` runs the consent flow in a browser
//! - `caroney auth --verify` checks the stored token against the sheet

use crate::api::{self, TokenProvider};
use crate::commands::Out;
use crate::{Config, Result};

/// Handles `caroney auth`. This is the only command that opens a browser.
///
/// The client secret copied by `caroney init` is used to start the consent flow. Google redirects
/// back to a short-lived local server, and the resulting tokens are saved to the token file with
/// owner-only permissions.
///
/// # Errors
/// Returns an `Auth` error if the consent flow fails or is abandoned.
pub async fn auth(config: &Config) -> Result<Out<()>> {
    TokenProvider::initialize(config.client_secret_path(), config.token_path()).await?;
    Ok(format!(
        "Authorization succeeded, the token is saved at {}",
        config.token_path().display()
    )
    .into())
}

/// Handles `caroney auth --verify`. This never opens a browser.
///
/// The stored token is refreshed and then used to read the ledger worksheet. If the token is
/// missing or has been revoked, the error tells the user to run `caroney auth`.
pub async fn auth_verify(config: &Config) -> Result<Out<usize>> {
    let rows = api::verify(config).await.map_err(|e| {
        e.context(
            "Unable to use the stored token. \n\n\
            You should run 'caroney auth' (without the --verify flag).",
        )
    })?;
    Ok(Out::new(
        format!("Your OAuth token is valid! The ledger worksheet has {rows} rows in use."),
        rows,
    ))
}
