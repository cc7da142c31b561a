//! OAuth 2.0 authentication flow for the Google Sheets API.
//!
//! This module handles:
//! - Loading OAuth client credentials from `client_secret.json`
//! - Running the consent flow with a local callback server on localhost
//! - Storing access and refresh tokens in `token.json`
//! - Refreshing the access token when it is about to expire

use crate::api::files::{File, SecretFile, TokenFile};
use crate::api::OAUTH_SCOPES;
use crate::error::{ErrorType, IntoResult, Res};
use crate::Result;
use anyhow::Context;
use chrono::{DateTime, Utc};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
};
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info};

const OAUTH_CALLBACK_PORT: u16 = 3030;

type OAuthClient = BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Provides a valid access token for the Sheets API, refreshing it when necessary and persisting
/// the refreshed token to disk.
#[derive(Debug, Clone)]
pub(crate) struct TokenProvider {
    secret: SecretFile,
    token: File<TokenFile>,
}

impl TokenProvider {
    /// Runs the OAuth consent flow and saves the resulting token to `token_path`.
    ///
    /// This prints a URL that the user must open in a browser. A local HTTP server on
    /// `localhost:3030` waits for Google to redirect back with an authorization code, which is then
    /// exchanged for access and refresh tokens.
    pub(crate) async fn initialize(
        secret_path: impl Into<PathBuf>,
        token_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let secret = load_secret(&secret_path.into()).await?;
        let token_path = token_path.into();
        let client = oauth_client(&secret)?;
        let http = http_client()?;

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (auth_url, csrf_token) = client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(OAUTH_SCOPES.iter().map(|s| Scope::new(s.to_string())))
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .set_pkce_challenge(pkce_challenge)
            .url();

        info!("Open this URL in your browser to authorize caroney:\n\n{auth_url}\n");
        info!("Waiting for the authorization on http://localhost:{OAUTH_CALLBACK_PORT}");

        let (code, state) = receive_callback(OAUTH_CALLBACK_PORT)
            .await
            .pub_result(ErrorType::Auth)?;
        if state != *csrf_token.secret() {
            return Err(crate::Error::msg(
                ErrorType::Auth,
                "The OAuth state parameter did not match, refusing the authorization code",
            ));
        }

        let response = client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(&http)
            .await
            .context("Failed to exchange the authorization code for a token")
            .pub_result(ErrorType::Auth)?;

        let refresh_token = response
            .refresh_token()
            .map(|t| t.secret().to_string())
            .context("Google did not return a refresh token")
            .pub_result(ErrorType::Auth)?;

        let token = File::new(
            token_path,
            TokenFile::new(
                OAUTH_SCOPES.iter().map(|s| s.to_string()).collect(),
                response.access_token().secret().to_string(),
                refresh_token,
                expiry(response.expires_in()),
            ),
        );
        token.save().await.pub_result(ErrorType::Io)?;
        info!("Tokens saved to {}", token.path().display());

        Ok(Self { secret, token })
    }

    /// Loads existing credentials. Fails if either file is missing or malformed, or if the token
    /// lacks a required scope. Never opens a browser.
    pub(crate) async fn load(
        secret_path: impl Into<PathBuf>,
        token_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let secret = load_secret(&secret_path.into()).await?;
        let token_path = token_path.into();
        let token: File<TokenFile> = File::load(&token_path)
            .await
            .with_context(|| {
                format!(
                    "Unable to load the OAuth token at {}, run 'caroney auth' first",
                    token_path.display()
                )
            })
            .pub_result(ErrorType::Config)?;
        token
            .data()
            .validate_scopes()
            .context("The OAuth token is not usable, run 'caroney auth' again")
            .pub_result(ErrorType::Config)?;
        Ok(Self { secret, token })
    }

    /// The current access token, which may be expired.
    pub(crate) fn token(&self) -> &str {
        self.token.data().access_token()
    }

    /// Returns a valid access token, refreshing it first if it is expired or about to expire.
    pub(crate) async fn token_with_refresh(&mut self) -> Result<&str> {
        if self.token.data().is_expired() {
            self.refresh().await?;
        }
        Ok(self.token())
    }

    /// Uses the refresh token to obtain a new access token and saves it.
    pub(crate) async fn refresh(&mut self) -> Result<()> {
        debug!(
            "Refreshing the access token which expires at {}",
            self.token.data().expires_at()
        );
        let client = oauth_client(&self.secret)?;
        let http = http_client()?;
        let refresh_token = RefreshToken::new(self.token.data().refresh_token().to_string());
        let response = client
            .exchange_refresh_token(&refresh_token)
            .request_async(&http)
            .await
            .context("Unable to refresh the OAuth token, you may need to run 'caroney auth'")
            .pub_result(ErrorType::StoreUnavailable)?;

        self.token.data_mut().update(
            response.access_token().secret().to_string(),
            expiry(response.expires_in()),
            response.refresh_token().map(|t| t.secret().to_string()),
        );
        self.token.save().await.pub_result(ErrorType::Io)?;
        debug!("Access token valid until {}", self.token.data().expires_at());
        Ok(())
    }
}

async fn load_secret(path: &Path) -> Result<SecretFile> {
    SecretFile::load(path)
        .await
        .with_context(|| format!("The client secret at {} is not usable", path.display()))
        .pub_result(ErrorType::Config)
}

fn oauth_client(secret: &SecretFile) -> Result<OAuthClient> {
    let build = || -> Res<OAuthClient> {
        Ok(BasicClient::new(ClientId::new(secret.client_id().to_string()))
            .set_client_secret(ClientSecret::new(secret.client_secret().to_string()))
            .set_auth_uri(AuthUrl::new(secret.auth_uri().to_string())?)
            .set_token_uri(TokenUrl::new(secret.token_uri().to_string())?)
            .set_redirect_uri(RedirectUrl::new(format!(
                "http://localhost:{OAUTH_CALLBACK_PORT}"
            ))?))
    };
    build()
        .context("The OAuth endpoints in the client secret are invalid")
        .pub_result(ErrorType::Config)
}

fn http_client() -> Result<reqwest::Client> {
    // Redirects must not be followed when talking to the token endpoint
    reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .context("Unable to build the HTTP client")
        .pub_result(ErrorType::Auth)
}

fn expiry(expires_in: Option<Duration>) -> DateTime<Utc> {
    let seconds = expires_in.map(|d| d.as_secs()).unwrap_or(3600);
    Utc::now() + chrono::Duration::seconds(i64::try_from(seconds).unwrap_or(3600))
}

/// Serves HTTP on localhost until a request arrives that carries both `code` and `state` query
/// parameters, and returns them.
async fn receive_callback(port: u16) -> Res<(String, String)> {
    let listener = TcpListener::bind(("127.0.0.1", port))
        .await
        .with_context(|| format!("Unable to listen on localhost:{port}"))?;
    let (tx, mut rx) = mpsc::channel::<(String, String)>(1);

    loop {
        let (stream, _) = listener
            .accept()
            .await
            .context("Unable to accept the OAuth callback connection")?;
        let tx = tx.clone();
        let service = service_fn(move |req: Request<Incoming>| {
            let tx = tx.clone();
            async move {
                let body = match callback_params(req.uri()) {
                    Some(params) => {
                        let _ = tx.send(params).await;
                        "caroney has been authorized. You can close this window."
                    }
                    None => "Waiting for the authorization code.",
                };
                Ok::<_, Infallible>(Response::new(body.to_string()))
            }
        });
        if let Err(e) = http1::Builder::new()
            .keep_alive(false)
            .serve_connection(TokioIo::new(stream), service)
            .await
        {
            debug!("OAuth callback connection error: {e}");
        }
        if let Ok(params) = rx.try_recv() {
            return Ok(params);
        }
    }
}

/// Pulls the `code` and `state` parameters out of the callback request URI.
fn callback_params(uri: &hyper::Uri) -> Option<(String, String)> {
    let url = url::Url::parse(&format!("http://localhost{uri}")).ok()?;
    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => {
                tracing::error!("Google returned an OAuth error: {value}");
            }
            _ => {}
        }
    }
    Some((code?, state?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_params() {
        let uri: hyper::Uri = "/?state=abc&code=4%2F0Ab&scope=x".parse().unwrap();
        assert_eq!(
            callback_params(&uri),
            Some(("4/0Ab".to_string(), "abc".to_string()))
        );
    }

    #[test]
    fn test_callback_params_missing() {
        let uri: hyper::Uri = "/favicon.ico".parse().unwrap();
        assert_eq!(callback_params(&uri), None);
        let uri: hyper::Uri = "/?error=access_denied&state=abc".parse().unwrap();
        assert_eq!(callback_params(&uri), None);
    }

    #[test]
    fn test_expiry_defaults_to_an_hour() {
        let e = expiry(None);
        let minutes = (e - Utc::now()).num_minutes();
        assert!((58..=60).contains(&minutes));
    }
}
