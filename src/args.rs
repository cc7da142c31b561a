//! These structs provide the CLI interface for the caroney CLI.

use crate::export::ExportScope;
use crate::model::{Kind, SourceRow};
use crate::query::{DateRange, Filter};
use chrono::NaiveDate;
use clap::{Args as ClapArgs, Parser, Subcommand};
use rust_decimal::Decimal;
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// caroney: a small income and expense ledger that lives in a Google sheet.
///
/// Every transaction is a row in the first worksheet of your sheet, under the header
/// `Fecha, Monto, Tipo, Categoría, Descripción`. Rows are numbered the way the sheet numbers
/// them, so the first transaction is row 2. Use those numbers with `update` and `delete`.
///
/// You will need to set up Google OAuth credentials and run `caroney init` followed by
/// `caroney auth` before anything else works.
#[derive(Debug, Parser, Clone)]
#[command(version)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the home directory and initialize the configuration files.
    ///
    /// This is the first command you should run. You need the URL of your Google sheet and the
    /// OAuth client credentials file that you downloaded from the Google Cloud Console. The
    /// credentials file must list `http://localhost` as a redirect URI.
    Init(InitArgs),
    /// Authenticate with Google Sheets via OAuth.
    Auth(AuthArgs),
    /// Add an income or expense to the end of the ledger.
    Add(AddArgs),
    /// Change the transaction on a given row. Fields you leave out keep their current values.
    Update(UpdateArgs),
    /// Delete the transaction on a given row. Rows below it move up by one.
    Delete(DeleteArgs),
    /// Print transactions and their totals.
    List(ListArgs),
    /// Write transactions and their totals to an .xlsx file.
    Export(ExportArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where caroney configuration and credentials are held. Defaults to ~/caroney
    #[arg(long, env = "CARONEY_HOME", default_value_t = default_caroney_home())]
    caroney_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, caroney_home: PathBuf) -> Self {
        Self {
            log_level,
            caroney_home: caroney_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn caroney_home(&self) -> &DisplayPath {
        &self.caroney_home
    }
}

/// (Not shown): Args for the `caroney init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The URL to your Google sheet. It looks like this:
    /// https://docs.google.com/spreadsheets/d/1a7Km9FxQwRbPt82JvN4LzYpH5OcGnWsT6iDuE3VhMjX
    #[arg(long)]
    sheet_url: String,

    /// The path to your downloaded OAuth client credentials. This file will be copied to the
    /// default secrets location in the home directory.
    #[arg(long)]
    client_secret: PathBuf,
}

impl InitArgs {
    pub fn new(sheet_url: impl Into<String>, client_secret: impl Into<PathBuf>) -> Self {
        Self {
            sheet_url: sheet_url.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn sheet_url(&self) -> &str {
        &self.sheet_url
    }

    pub fn client_secret(&self) -> &Path {
        &self.client_secret
    }
}

/// (Not shown): Args for the `caroney auth` command.
#[derive(Debug, Parser, Clone)]
pub struct AuthArgs {
    /// Verify and refresh authentication instead of starting the consent flow.
    #[arg(long)]
    verify: bool,
}

impl AuthArgs {
    pub fn new(verify: bool) -> Self {
        Self { verify }
    }

    pub fn verify(&self) -> bool {
        self.verify
    }
}

/// (Not shown): Args for the `caroney add` command.
#[derive(Debug, Parser, Clone)]
pub struct AddArgs {
    /// The date of the transaction as YYYY-MM-DD. Defaults to today.
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// The amount, without a sign. The sign comes from --kind.
    #[arg(long)]
    pub amount: Decimal,

    /// Either Ingreso or Egreso.
    #[arg(long)]
    pub kind: Kind,

    /// Defaults to "Sin categoría".
    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub description: Option<String>,
}

/// (Not shown): Args for the `caroney update` command.
#[derive(Debug, Parser, Clone)]
pub struct UpdateArgs {
    /// The row of the transaction to change, as numbered in the sheet.
    pub row: SourceRow,

    /// The new date as YYYY-MM-DD.
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// The new amount, without a sign.
    #[arg(long)]
    pub amount: Option<Decimal>,

    /// Either Ingreso or Egreso.
    #[arg(long)]
    pub kind: Option<Kind>,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub description: Option<String>,
}

/// (Not shown): Args for the `caroney delete` command.
#[derive(Debug, Parser, Clone)]
pub struct DeleteArgs {
    /// The row of the transaction to delete, as numbered in the sheet.
    pub row: SourceRow,
}

/// Selects which transactions a command looks at. With no flags, every transaction is included.
#[derive(Debug, Default, ClapArgs, Clone)]
pub struct ViewArgs {
    /// Only the current month, from its first day through today.
    #[arg(long, conflicts_with_all = ["from", "to"])]
    pub month: bool,

    /// The first date of a range, inclusive. Defaults to the earliest transaction.
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// The last date of a range, inclusive. Defaults to the latest transaction.
    #[arg(long)]
    pub to: Option<NaiveDate>,
}

impl ViewArgs {
    /// Resolves the flags to an `ExportScope`. A range with a missing end takes it from `bounds`,
    /// the dates of the earliest and latest transactions.
    pub fn scope(&self, today: NaiveDate, bounds: Option<DateRange>) -> ExportScope {
        if self.month {
            return ExportScope::Month { today };
        }
        if self.from.is_none() && self.to.is_none() {
            return ExportScope::Total;
        }
        let fallback = bounds.unwrap_or(DateRange::new(today, today));
        ExportScope::Range(DateRange::new(
            self.from.unwrap_or(fallback.start),
            self.to.unwrap_or(fallback.end),
        ))
    }

    pub fn filter(&self, today: NaiveDate, bounds: Option<DateRange>) -> Filter {
        self.scope(today, bounds).filter()
    }
}

/// (Not shown): Args for the `caroney list` command.
#[derive(Debug, Default, Parser, Clone)]
pub struct ListArgs {
    #[clap(flatten)]
    pub view: ViewArgs,
}

/// (Not shown): Args for the `caroney export` command.
#[derive(Debug, Default, Parser, Clone)]
pub struct ExportArgs {
    #[clap(flatten)]
    pub view: ViewArgs,

    /// The directory to write the file to. Defaults to $CARONEY_HOME/exports
    #[arg(long)]
    pub out: Option<PathBuf>,
}

fn default_caroney_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("caroney"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --caroney-home or CARONEY_HOME instead of relying on the \
                default home directory. If you continue using the program right now, you may \
                have problems!",
            );
            PathBuf::from("caroney")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::date;

    fn parse(args: &[&str]) -> Args {
        let mut argv = vec!["caroney", "--caroney-home", "/tmp/caroney"];
        argv.extend_from_slice(args);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_parse_add() {
        let args = parse(&[
            "add",
            "--date",
            "2024-01-06",
            "--amount",
            "40.5",
            "--kind",
            "egreso",
            "--category",
            "Comida",
        ]);
        let Command::Add(add) = args.command() else {
            panic!("expected add, got {:?}", args.command());
        };
        assert_eq!(add.date, Some(date(2024, 1, 6)));
        assert_eq!(add.amount, Decimal::new(405, 1));
        assert_eq!(add.kind, Kind::Expense);
        assert_eq!(add.category.as_deref(), Some("Comida"));
        assert_eq!(add.description, None);
        assert_eq!(args.common().log_level(), LevelFilter::INFO);
        assert_eq!(args.common().caroney_home().path(), Path::new("/tmp/caroney"));
    }

    #[test]
    fn test_parse_rows() {
        let args = parse(&["delete", "3"]);
        let Command::Delete(delete) = args.command() else {
            panic!("expected delete");
        };
        assert_eq!(delete.row.get(), 3);

        let argv = ["caroney", "--caroney-home", "/tmp/x", "delete", "1"];
        assert!(Args::try_parse_from(argv).is_err());

        let args = parse(&["update", "5", "--kind", "Ingreso"]);
        let Command::Update(update) = args.command() else {
            panic!("expected update");
        };
        assert_eq!(update.row.get(), 5);
        assert_eq!(update.kind, Some(Kind::Income));
        assert_eq!(update.amount, None);
    }

    #[test]
    fn test_month_conflicts_with_range() {
        let argv = [
            "caroney",
            "--caroney-home",
            "/tmp/x",
            "list",
            "--month",
            "--from",
            "2024-01-01",
        ];
        assert!(Args::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_view_scope() {
        let today = date(2024, 3, 15);
        let bounds = Some(DateRange::new(date(2024, 1, 5), date(2024, 3, 31)));
        assert_eq!(ViewArgs::default().scope(today, bounds), ExportScope::Total);

        let month = ViewArgs {
            month: true,
            ..ViewArgs::default()
        };
        assert_eq!(month.scope(today, bounds), ExportScope::Month { today });

        let from_only = ViewArgs {
            from: Some(date(2024, 2, 1)),
            ..ViewArgs::default()
        };
        assert_eq!(
            from_only.scope(today, bounds),
            ExportScope::Range(DateRange::new(date(2024, 2, 1), date(2024, 3, 31)))
        );
        assert_eq!(
            from_only.scope(today, None),
            ExportScope::Range(DateRange::new(date(2024, 2, 1), today))
        );
    }
}
