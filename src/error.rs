//! Error types for the public interface of the library.
//!
//! Internally the crate uses `anyhow` for plumbing and context messages. Anything that leaves a
//! public function is converted into an `Error`, which carries an `ErrorType` so that the caller
//! (e.g. the CLI) can tell a stale row from an unreachable sheet.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

/// Internal result type used by helpers that only need `anyhow` context.
pub(crate) type Res<T> = std::result::Result<T, anyhow::Error>;

/// The result type returned by public functions in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies an `Error` by what went wrong.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The remote sheet could not be reached or authentication with it failed.
    StoreUnavailable,
    /// A physical row number no longer exists in the remote sheet.
    StoreRowNotFound,
    /// The remote sheet refused a write.
    StoreRejected,
    /// Data read from the remote sheet does not fit the ledger schema.
    Parse,
    /// User input was not acceptable, e.g. a negative amount.
    Validation,
    /// The home directory, config file or credential files are missing or malformed.
    Config,
    /// The OAuth flow or a token refresh failed.
    Auth,
    /// An export workbook could not be produced.
    Export,
    /// A local file operation failed.
    Io,
}

serde_plain::derive_display_from_serialize!(ErrorType);
serde_plain::derive_fromstr_from_deserialize!(ErrorType);

/// The error type returned by public functions in this crate.
pub struct Error {
    error_type: ErrorType,
    inner: anyhow::Error,
}

impl Error {
    pub(crate) fn new(error_type: ErrorType, inner: impl Into<anyhow::Error>) -> Self {
        Self {
            error_type,
            inner: inner.into(),
        }
    }

    /// Creates an error from a message.
    pub(crate) fn msg(error_type: ErrorType, message: impl Display) -> Self {
        Self::new(error_type, anyhow::anyhow!("{message}"))
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }

    /// Wraps the error with additional context, keeping its `ErrorType`.
    pub(crate) fn context(self, context: impl Display + Send + Sync + 'static) -> Self {
        Self {
            error_type: self.error_type,
            inner: self.inner.context(context),
        }
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {:?}", self.error_type, self.inner)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#}", self.inner)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

/// Converts any result whose error can become an `anyhow::Error` into a public `Result`.
pub(crate) trait IntoResult<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T, E> IntoResult<T> for std::result::Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| Error::new(error_type, e))
    }
}
