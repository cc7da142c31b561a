//! Serialization and deserialization structures for Google OAuth credential files.
//! - `client_secret.json`: OAuth 2.0 client credentials from Google Cloud Console
//! - `token.json`: the access and refresh tokens obtained by `caroney auth`

use crate::api::OAUTH_SCOPES;
use crate::error::Res;
use crate::utils;
use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, Error};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

/// This redirect needs to be present in the OAuth credential file, or else OAuth will not work.
const REDIRECT: &str = "http://localhost";

/// Holds the `path` of a JSON file along with its deserialized `data` so that it can be changed in
/// memory and saved back to the same place.
#[derive(Default, Debug, Clone)]
pub(super) struct File<F>
where
    F: Serialize + DeserializeOwned + Clone + Debug,
{
    path: PathBuf,
    data: F,
}

impl<F> File<F>
where
    F: Serialize + DeserializeOwned + Clone + Debug,
{
    pub(super) async fn load(path: impl Into<PathBuf>) -> Res<Self> {
        let path = path.into();
        let data: F = utils::deserialize(&path).await?;
        Ok(Self { path, data })
    }

    pub(super) fn new(path: impl Into<PathBuf>, data: F) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }

    /// Save the current data to the file, readable only by its owner.
    pub(super) async fn save(&self) -> Res<()> {
        let json =
            serde_json::to_string_pretty(&self.data).context("Failed to serialize data to JSON")?;
        utils::write_secret(&self.path, json).await
    }

    pub(super) fn data(&self) -> &F {
        &self.data
    }

    pub(super) fn data_mut(&mut self) -> &mut F {
        &mut self.data
    }

    pub(super) fn path(&self) -> &Path {
        &self.path
    }
}

/// Represents the structure of the `client_secret.json` file downloaded from Google Cloud Console.
///
/// This file contains OAuth 2.0 Desktop Application credentials. The standard format from Google
/// has an "installed" wrapper around the actual credentials.
///
/// Example:
/// ```json
/// {
///   "installed": {
///     "client_id": "YOUR_CLIENT_ID.apps.googleusercontent.com",
///     "client_secret": "YOUR_CLIENT_SECRET",
///     "redirect_uris": ["http://localhost"],
///     "auth_uri": "https://accounts.google.com/o/oauth2/auth",
///     "token_uri": "https://oauth2.googleapis.com/token"
///   }
/// }
/// ```
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SecretFile {
    installed: InstalledCredentials,
}

impl SecretFile {
    pub(crate) async fn load(path: &Path) -> Res<SecretFile> {
        utils::deserialize(path)
            .await
            .context("Unable to read the OAuth client secret file")
    }

    pub(super) fn client_id(&self) -> &str {
        &self.installed.client_id
    }

    pub(super) fn client_secret(&self) -> &str {
        &self.installed.client_secret
    }

    pub(super) fn auth_uri(&self) -> &str {
        &self.installed.auth_uri
    }

    pub(super) fn token_uri(&self) -> &str {
        &self.installed.token_uri
    }
}

/// The actual OAuth credentials nested within the `client_secret.json` file.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
struct InstalledCredentials {
    client_id: String,
    client_secret: String,
    /// Must contain "http://localhost" (without a port number)
    redirect_uris: RedirectUris,
    auth_uri: String,
    token_uri: String,
}

#[derive(Default, Debug, Clone)]
struct RedirectUris(Vec<String>);

impl Serialize for RedirectUris {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RedirectUris {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let vec = Vec::<String>::deserialize(deserializer)?;
        if !vec.iter().any(|s| is_valid_redirect(s)) {
            return Err(D::Error::custom(format!(
                "At least one of the redirects needs to be {REDIRECT}, but this was not found. \
                When creating the OAuth client for caroney, you must include '{REDIRECT}'"
            )));
        }
        Ok(RedirectUris(vec))
    }
}

fn is_valid_redirect(s: &str) -> bool {
    s == REDIRECT || s == "http://127.0.0.1"
}

/// This is how we save the token information that we receive from Google OAuth.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub(super) struct TokenFile {
    scopes: Vec<String>,
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl TokenFile {
    pub(super) fn new(
        scopes: Vec<String>,
        access_token: String,
        refresh_token: String,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            scopes,
            access_token,
            refresh_token,
            expires_at,
        }
    }

    /// Makes sure the token was granted every scope that caroney needs.
    pub(super) fn validate_scopes(&self) -> Res<()> {
        let found_scopes: HashSet<&str> = self.scopes.iter().map(|s| s.as_str()).collect();
        for &required_scope in OAUTH_SCOPES {
            if !found_scopes.contains(required_scope) {
                bail!("OAuth scope '{required_scope}' is missing.");
            }
        }
        Ok(())
    }

    pub(super) fn access_token(&self) -> &str {
        &self.access_token
    }

    pub(super) fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    pub(super) fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Check if the token is expired or will expire soon (within 5 minutes)
    pub(super) fn is_expired(&self) -> bool {
        let buffer = chrono::Duration::minutes(5);
        self.expires_at <= Utc::now() + buffer
    }

    /// Update the token with new values. Google does not always send a new refresh token.
    pub(super) fn update(
        &mut self,
        access_token: String,
        expires_at: DateTime<Utc>,
        refresh_token: Option<String>,
    ) {
        self.access_token = access_token;
        self.expires_at = expires_at;
        if let Some(rt) = refresh_token {
            self.refresh_token = rt;
        }
    }
}
