use crate::commands::Out;
use crate::{Config, Result};
use std::path::Path;

/// Creates the home directory, its subdirectories and:
/// - Creates an initial `config.json` file using `sheet_url`
/// - Copies `secret_file` into its default location in the home directory.
///
/// # Arguments
/// - `caroney_home` - The directory that will be the home directory, e.g. `$HOME/caroney`
/// - `secret_file` - The downloaded OAuth 2.0 client credentials JSON. The original file is left
///   where it is.
/// - `sheet_url` - The URL of the Google Sheet that holds the ledger.
///
/// # Errors
/// - `Config` if the URL or the client secret is unusable.
/// - `Io` if any file operations fail.
pub async fn init(caroney_home: &Path, secret_file: &Path, sheet_url: &str) -> Result<Out<()>> {
    let config = Config::create(caroney_home, secret_file, sheet_url)
        .await
        .map_err(|e| e.context("Unable to create the caroney home directory and config"))?;
    Ok(format!(
        "Created the caroney home at {}. Run 'caroney auth' next.",
        config.root().display()
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::write_client_secret;
    use crate::ErrorType;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init() {
        let dir = TempDir::new().unwrap();
        let secret = write_client_secret(&dir);
        let home = dir.path().join("home");
        let url = "https://docs.google.com/spreadsheets/d/abc123/edit#gid=0";

        let out = init(&home, &secret, url).await.unwrap();
        assert!(out.message().contains("caroney auth"));
        assert!(secret.is_file());

        let config = Config::load(&home).await.unwrap();
        assert_eq!(config.spreadsheet_id(), "abc123");
        assert!(config.client_secret_path().is_file());
        assert!(config.exports().is_dir());
    }

    #[tokio::test]
    async fn test_init_bad_url() {
        let dir = TempDir::new().unwrap();
        let secret = write_client_secret(&dir);
        let home = dir.path().join("home");

        let err = init(&home, &secret, "https://example.com/nothing")
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
        assert!(!home.exists());
    }
}
