//! Configuration file handling for caroney.
//!
//! The configuration file is stored at `$CARONEY_HOME/config.json` and contains the URL of the
//! Google Sheet that holds the ledger along with the locations of the OAuth credential files.

use crate::api::SecretFile;
use crate::error::{ErrorType, IntoResult, Res};
use crate::{utils, Error, Result};
use anyhow::{bail, ensure, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

const APP_NAME: &str = "caroney";
const CONFIG_VERSION: u8 = 1;
const SECRETS: &str = ".secrets";
const EXPORTS: &str = "exports";
const CLIENT_SECRET_JSON: &str = "client_secret.json";
const TOKEN_JSON: &str = "token.json";
const CONFIG_JSON: &str = "config.json";

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$CARONEY_HOME` and from there it loads `$CARONEY_HOME/config.json`. It provides
/// paths to other items that are either configurable or are expected in a certain location within
/// the home directory.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    secrets: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    spreadsheet_id: String,
}

impl Config {
    /// Creates the home directory, its subdirectories and:
    /// - Creates an initial `config.json` file using `sheet_url`
    /// - Copies `secret_file` into its default location in the home directory
    ///
    /// # Arguments
    /// - `dir` - The directory that will be the root of the home directory, e.g. `$HOME/caroney`
    /// - `secret_file` - The downloaded OAuth 2.0 client credentials JSON needed to start the
    ///   Google OAuth workflow.
    /// - `sheet_url` - The URL of the Google Sheet that holds the ledger, e.g.
    ///   https://docs.google.com/spreadsheets/d/1a7Km9FxQwRbPt82JvN4LzYpH5OcGnWsT6iDuE3VhMjX
    pub async fn create(
        dir: impl Into<PathBuf>,
        secret_file: &Path,
        sheet_url: &str,
    ) -> Result<Self> {
        let spreadsheet_id = extract_spreadsheet_id(sheet_url).pub_result(ErrorType::Config)?;
        SecretFile::load(secret_file)
            .await
            .with_context(|| format!("The client secret at {} is not usable", secret_file.display()))
            .pub_result(ErrorType::Config)?;

        let maybe_relative = dir.into();
        let root = async {
            utils::make_dir(&maybe_relative)
                .await
                .context("Unable to create the caroney home directory")?;
            let root = utils::canonicalize(&maybe_relative).await?;
            utils::make_dir(root.join(SECRETS)).await?;
            utils::make_dir(root.join(EXPORTS)).await?;
            Ok::<PathBuf, anyhow::Error>(root)
        }
        .await
        .pub_result(ErrorType::Io)?;

        let config_file = ConfigFile {
            sheet_url: sheet_url.to_string(),
            ..ConfigFile::default()
        };
        let config = Self {
            secrets: root.join(SECRETS),
            config_path: root.join(CONFIG_JSON),
            root,
            config_file,
            spreadsheet_id,
        };

        utils::copy(secret_file, config.client_secret_path())
            .await
            .pub_result(ErrorType::Io)?;
        config
            .config_file
            .save(&config.config_path)
            .await
            .pub_result(ErrorType::Io)?;
        debug!("Created the caroney home at {}", config.root.display());
        Ok(config)
    }

    /// This will
    /// - validate that the home directory and the config file exist
    /// - load the config file
    /// - validate that the secrets directory and the client secret exist and are well formed
    /// - return the loaded configuration object
    pub async fn load(caroney_home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = caroney_home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("The caroney home directory is missing, run 'caroney init' first")
            .pub_result(ErrorType::Config)?;

        let config_path = root.join(CONFIG_JSON);
        let config_file = ConfigFile::load(&config_path)
            .await
            .pub_result(ErrorType::Config)?;
        let spreadsheet_id =
            extract_spreadsheet_id(&config_file.sheet_url).pub_result(ErrorType::Config)?;

        let config = Self {
            secrets: root.join(SECRETS),
            root,
            config_path,
            config_file,
            spreadsheet_id,
        };
        if !config.secrets.is_dir() {
            return Err(Error::msg(
                ErrorType::Config,
                format!(
                    "The secrets directory is missing '{}'",
                    config.secrets.display()
                ),
            ));
        }
        let secret_path = config.client_secret_path();
        SecretFile::load(&secret_path)
            .await
            .with_context(|| format!("The client secret at {} is not usable", secret_path.display()))
            .pub_result(ErrorType::Config)?;
        Ok(config)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn secrets(&self) -> &Path {
        &self.secrets
    }

    /// Where exported workbooks are written unless another directory is given.
    pub fn exports(&self) -> PathBuf {
        self.root.join(EXPORTS)
    }

    pub fn sheet_url(&self) -> &str {
        &self.config_file.sheet_url
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    /// Returns the stored `client_secret_path` if it is absolute, otherwise resolves the relative path.
    pub fn client_secret_path(&self) -> PathBuf {
        self.resolve(self.config_file.client_secret_path())
    }

    /// Returns the stored `token_path` if it is absolute, otherwise resolves the relative path.
    pub fn token_path(&self) -> PathBuf {
        self.resolve(self.config_file.token_path())
    }

    fn resolve(&self, p: PathBuf) -> PathBuf {
        if p.is_absolute() {
            return p;
        }
        self.root.join(p)
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "caroney",
///   "config_version": 1,
///   "sheet_url": "https://docs.google.com/spreadsheets/d/7KpXm2RfZwNJgs84QhVYno5DU6iM9Wlr3bCzAv1txRpL",
///   "client_secret_path": ".secrets/client_secret.json",
///   "token_path": ".secrets/token.json"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "caroney"
    app_name: String,

    config_version: u8,

    /// URL to the ledger Google Sheet
    sheet_url: String,

    /// Path to the OAuth 2.0 client credentials file, relative to the home directory or absolute.
    /// Defaults to $CARONEY_HOME/.secrets/client_secret.json
    #[serde(default, skip_serializing_if = "Option::is_none")]
    client_secret_path: Option<PathBuf>,

    /// Path to the OAuth token file, relative to the home directory or absolute.
    /// Defaults to $CARONEY_HOME/.secrets/token.json
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_path: Option<PathBuf>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            sheet_url: String::new(),
            client_secret_path: None,
            token_path: None,
        }
    }
}

impl ConfigFile {
    async fn load(path: &Path) -> Res<Self> {
        if !path.is_file() {
            bail!(
                "The config file is missing '{}', run 'caroney init' first",
                path.display()
            );
        }
        let config: ConfigFile = utils::deserialize(path).await?;
        ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{APP_NAME}', got '{}'",
            config.app_name
        );
        ensure!(
            config.config_version == CONFIG_VERSION,
            "Unsupported config_version {}, expected {CONFIG_VERSION}",
            config.config_version
        );
        Ok(config)
    }

    async fn save(&self, path: &Path) -> Res<()> {
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(path, data)
            .await
            .context("Unable to write config file")
    }

    fn client_secret_path(&self) -> PathBuf {
        self.client_secret_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(CLIENT_SECRET_JSON))
    }

    fn token_path(&self) -> PathBuf {
        self.token_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(TOKEN_JSON))
    }
}

/// Extracts the spreadsheet ID from a Google Sheets URL of the form
/// `https://docs.google.com/spreadsheets/d/SPREADSHEET_ID/...`.
fn extract_spreadsheet_id(sheet_url: &str) -> Res<String> {
    let url = Url::parse(sheet_url)
        .with_context(|| format!("The sheet URL '{sheet_url}' is not a valid URL"))?;
    let mut segments = url.path_segments().into_iter().flatten();
    let id = segments
        .by_ref()
        .find(|s| *s == "d")
        .and_then(|_| segments.next())
        .filter(|id| !id.is_empty());
    match id {
        Some(id) => Ok(id.to_string()),
        None => bail!(
            "Invalid Google Sheets URL '{sheet_url}'. \
            Expected: https://docs.google.com/spreadsheets/d/SPREADSHEET_ID"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::write_client_secret;
    use tempfile::TempDir;

    const SHEET_URL: &str =
        "https://docs.google.com/spreadsheets/d/7KpXm2RfZwNJgs84QhVYno5DU6iM9Wlr3bCzAv1txRpL/edit";

    #[tokio::test]
    async fn test_config_create_and_load() {
        let dir = TempDir::new().unwrap();
        let home_dir = dir.path().join("caroney_home");
        let secret = write_client_secret(&dir);

        let config = Config::create(&home_dir, &secret, SHEET_URL).await.unwrap();
        assert_eq!(SHEET_URL, config.sheet_url());
        assert_eq!(
            "7KpXm2RfZwNJgs84QhVYno5DU6iM9Wlr3bCzAv1txRpL",
            config.spreadsheet_id()
        );
        assert!(config.secrets().is_dir());
        assert!(config.exports().is_dir());
        assert!(config.client_secret_path().is_file());
        assert!(secret.is_file());
        assert_eq!(
            config.token_path(),
            config.root().join(".secrets").join("token.json")
        );

        let loaded = Config::load(&home_dir).await.unwrap();
        assert_eq!(loaded.spreadsheet_id(), config.spreadsheet_id());
        assert_eq!(loaded.config_path(), config.config_path());
    }

    #[tokio::test]
    async fn test_config_create_rejects_bad_input() {
        let dir = TempDir::new().unwrap();
        let secret = write_client_secret(&dir);
        let err = Config::create(dir.path().join("a"), &secret, "https://example.com/nope")
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);

        let not_a_secret = dir.path().join("notes.txt");
        std::fs::write(&not_a_secret, "hello").unwrap();
        let err = Config::create(dir.path().join("b"), &not_a_secret, SHEET_URL)
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
        assert!(!dir.path().join("b").exists());
    }

    #[tokio::test]
    async fn test_config_load_missing_home() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(dir.path().join("nothing here"))
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);

        let err = Config::load(dir.path()).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
        assert!(err.to_string().contains("config.json"));
    }

    #[tokio::test]
    async fn test_config_load_fails_without_client_secret() {
        let dir = TempDir::new().unwrap();
        let home_dir = dir.path().join("home");
        let secret = write_client_secret(&dir);
        let config = Config::create(&home_dir, &secret, SHEET_URL).await.unwrap();
        std::fs::remove_file(config.client_secret_path()).unwrap();
        let err = Config::load(&home_dir).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
    }

    #[tokio::test]
    async fn test_config_file_load_with_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let json = r#"{
            "app_name": "caroney",
            "config_version": 1,
            "sheet_url": "https://docs.google.com/spreadsheets/d/minimal"
        }"#;
        utils::write(&config_path, json).await.unwrap();

        let config = ConfigFile::load(&config_path).await.unwrap();
        assert_eq!(
            config.sheet_url,
            "https://docs.google.com/spreadsheets/d/minimal"
        );
        assert_eq!(
            config.client_secret_path(),
            PathBuf::from(SECRETS).join(CLIENT_SECRET_JSON)
        );
        assert_eq!(config.token_path(), PathBuf::from(SECRETS).join(TOKEN_JSON));
    }

    #[tokio::test]
    async fn test_config_file_load_invalid_app_name() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let json = r#"{
            "app_name": "ledgerly",
            "config_version": 1,
            "sheet_url": "https://docs.google.com/spreadsheets/d/test"
        }"#;
        utils::write(&config_path, json).await.unwrap();

        let err = ConfigFile::load(&config_path).await.unwrap_err();
        assert!(err.to_string().contains("Invalid app_name"));
    }

    #[tokio::test]
    async fn test_config_file_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        let original = ConfigFile {
            sheet_url: "https://docs.google.com/spreadsheets/d/test123".to_string(),
            client_secret_path: Some(PathBuf::from("/elsewhere/secret.json")),
            ..ConfigFile::default()
        };
        original.save(&path).await.unwrap();
        let loaded = ConfigFile::load(&path).await.unwrap();
        assert_eq!(original, loaded);

        let json = serde_json::to_string(&ConfigFile::default()).unwrap();
        assert!(!json.contains("client_secret_path"));
        assert!(!json.contains("token_path"));
    }

    #[test]
    fn test_extract_spreadsheet_id() {
        assert_eq!(
            extract_spreadsheet_id(SHEET_URL).unwrap(),
            "7KpXm2RfZwNJgs84QhVYno5DU6iM9Wlr3bCzAv1txRpL"
        );
        assert_eq!(
            extract_spreadsheet_id("https://docs.google.com/spreadsheets/d/ABC123").unwrap(),
            "ABC123"
        );
        assert_eq!(
            extract_spreadsheet_id("https://docs.google.com/spreadsheets/d/ABC123?usp=sharing#gid=0")
                .unwrap(),
            "ABC123"
        );
        assert!(extract_spreadsheet_id("https://example.com/invalid").is_err());
        assert!(extract_spreadsheet_id("https://docs.google.com/spreadsheets/d/").is_err());
        assert!(extract_spreadsheet_id("").is_err());
    }
}
