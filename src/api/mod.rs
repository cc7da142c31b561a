//! The boundary between caroney and the remote spreadsheet.
//!
//! `Sheet` is the raw, untyped row interface: everything is a `String` and rows are addressed by
//! their 1-based physical index. `LedgerStore` sits on top of it and is the only thing that turns
//! rows into `Transaction`s and back.

mod files;
mod ledger;
mod oauth;
mod sheet;
mod sheet_test_client;

use crate::model::{SourceRow, Transaction};
use crate::{Config, Result};
use std::env::VarError;
use tracing::{debug, info};

pub(crate) use files::SecretFile;
pub(crate) use ledger::LedgerStoreImpl;
pub(crate) use oauth::TokenProvider;
pub(crate) use sheet_test_client::TestSheet;

/// The only scope caroney asks for: read and write access to spreadsheets.
pub(crate) const OAUTH_SCOPES: &[&str] = &["https://www.googleapis.com/auth/spreadsheets"];

/// When this is set to a non-empty value, caroney uses an in-memory sheet instead of Google.
pub const CARONEY_IN_TEST_MODE: &str = "CARONEY_IN_TEST_MODE";

/// Whether to talk to Google or to the seeded, in-memory test sheet.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum Mode {
    #[default]
    Google,
    Test,
}

impl Mode {
    /// Reads `CARONEY_IN_TEST_MODE` to decide which mode to run in.
    pub fn from_env() -> Self {
        match std::env::var(CARONEY_IN_TEST_MODE) {
            Ok(value) if !value.trim().is_empty() => Mode::Test,
            Ok(_) | Err(VarError::NotPresent) => Mode::Google,
            Err(VarError::NotUnicode(_)) => Mode::Test,
        }
    }
}

/// Untyped access to the first worksheet of the ledger spreadsheet. Row numbers are 1-based and
/// include the header row.
#[async_trait::async_trait]
pub(crate) trait Sheet {
    /// Every row of the worksheet, header included, with trailing empty cells removed.
    async fn get(&mut self) -> Result<Vec<Vec<String>>>;

    /// The number of rows in use, header included.
    async fn row_count(&mut self) -> Result<usize> {
        Ok(self.get().await?.len())
    }

    /// Adds `rows` after the last row in use, in order, as a single request.
    async fn append_rows(&mut self, rows: &[Vec<String>]) -> Result<()>;

    /// Overwrites the cells of physical row `row`, starting at column A.
    async fn write_row(&mut self, row: usize, values: &[String]) -> Result<()>;

    /// Removes physical row `row`. The rows below it move up by one.
    async fn delete_row(&mut self, row: usize) -> Result<()>;
}

/// The system of record for the ledger. Every call either succeeds completely or fails without a
/// change that the caller needs to know about.
#[async_trait::async_trait]
pub trait LedgerStore {
    /// All transactions in storage order. The returned transactions do not have a `source_row`,
    /// their position in the vector determines it.
    async fn load_all(&mut self) -> Result<Vec<Transaction>>;

    /// Adds `transaction` after the last row.
    async fn append(&mut self, transaction: &Transaction) -> Result<()>;

    /// Overwrites the transaction stored at `row`.
    async fn update_range(&mut self, row: SourceRow, transaction: &Transaction) -> Result<()>;

    /// Removes the transaction stored at `row`.
    async fn delete_row(&mut self, row: SourceRow) -> Result<()>;
}

/// Opens the `LedgerStore` for `mode`. In `Mode::Google` this loads the OAuth credentials, which
/// fails if `caroney auth` has not been run.
pub async fn ledger_store(config: &Config, mode: Mode) -> Result<Box<dyn LedgerStore + Send>> {
    let sheet: Box<dyn Sheet + Send> = match mode {
        Mode::Google => {
            debug!("Opening the Google sheet {}", config.spreadsheet_id());
            let token_provider =
                TokenProvider::load(config.client_secret_path(), config.token_path()).await?;
            Box::new(sheet::GoogleSheet::new(config.spreadsheet_id(), token_provider))
        }
        Mode::Test => {
            info!("Running in test mode, the Google sheet will not be used");
            Box::new(TestSheet::default())
        }
    };
    Ok(Box::new(LedgerStoreImpl::new(sheet)))
}

/// Checks that the stored token works by refreshing it and reading the sheet.
pub(crate) async fn verify(config: &Config) -> Result<usize> {
    let mut token_provider =
        TokenProvider::load(config.client_secret_path(), config.token_path()).await?;
    token_provider.refresh().await?;
    let mut sheet = sheet::GoogleSheet::new(config.spreadsheet_id(), token_provider);
    sheet.row_count().await
}
