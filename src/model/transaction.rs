use crate::error::{ErrorType, IntoResult};
use crate::model::Amount;
use crate::{Error, Result};
use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The category written when the user leaves the category blank.
pub const UNCATEGORIZED: &str = "Sin categoría";

/// Whether a transaction brings money in or takes money out.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Kind {
    #[serde(rename = "Ingreso", alias = "ingreso", alias = "income")]
    Income,
    #[serde(rename = "Egreso", alias = "egreso", alias = "expense")]
    Expense,
}

serde_plain::derive_display_from_serialize!(Kind);
serde_plain::derive_fromstr_from_deserialize!(Kind);

impl Kind {
    /// Applies the sign of this kind to a non-negative magnitude.
    pub fn signed(&self, magnitude: Decimal) -> Amount {
        if magnitude.is_zero() {
            return Amount::ZERO;
        }
        match self {
            Kind::Income => Amount::new(magnitude),
            Kind::Expense => Amount::new(-magnitude),
        }
    }

    /// Returns true if `amount` has a sign that is legal for this kind. Zero is legal for both.
    pub fn agrees_with(&self, amount: Amount) -> bool {
        match self {
            Kind::Income => !amount.is_negative(),
            Kind::Expense => !amount.is_positive(),
        }
    }
}

/// The 1-based physical row number of a transaction in the remote sheet. Row 1 is the header, so a
/// valid `SourceRow` is always 2 or greater.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceRow(usize);

impl SourceRow {
    /// The row of the first transaction, directly beneath the header.
    pub const FIRST: SourceRow = SourceRow(2);

    pub fn new(row: usize) -> Result<Self> {
        if row < Self::FIRST.0 {
            return Err(Error::msg(
                ErrorType::StoreRowNotFound,
                format!("Row {row} is not a transaction row, the first transaction is on row 2"),
            ));
        }
        Ok(Self(row))
    }

    pub fn get(&self) -> usize {
        self.0
    }

    pub(crate) fn next(&self) -> SourceRow {
        SourceRow(self.0 + 1)
    }

    pub(crate) fn prev(&self) -> SourceRow {
        SourceRow(self.0 - 1)
    }
}

impl Display for SourceRow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for SourceRow {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let row = s
            .trim()
            .parse::<usize>()
            .with_context(|| format!("'{s}' is not a row number"))
            .pub_result(ErrorType::Validation)?;
        SourceRow::new(row)
    }
}

/// One income or expense entry in the ledger.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    date: NaiveDate,
    amount: Amount,
    kind: Kind,
    category: String,
    description: String,
    /// Where this transaction lives in the remote sheet, `None` until it has been written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_row: Option<SourceRow>,
}

impl Transaction {
    /// Creates a transaction from form-style input: a non-negative `magnitude` whose sign is taken
    /// from `kind`. The magnitude is rounded to cents, the way it will be written to the sheet.
    /// Category and description are trimmed and a blank category becomes `UNCATEGORIZED`.
    pub fn new(
        date: NaiveDate,
        magnitude: Decimal,
        kind: Kind,
        category: impl AsRef<str>,
        description: impl AsRef<str>,
    ) -> Result<Self> {
        if magnitude.is_sign_negative() && !magnitude.is_zero() {
            return Err(Error::msg(
                ErrorType::Validation,
                format!("The amount must not be negative, got {magnitude}"),
            ));
        }
        let magnitude = Amount::new(magnitude).to_cents().value();
        Ok(Self {
            date,
            amount: kind.signed(magnitude),
            kind,
            category: clean_category(category.as_ref()),
            description: description.as_ref().trim().to_string(),
            source_row: None,
        })
    }

    /// Creates a transaction from an already-signed amount, as found in the sheet.
    pub(crate) fn from_signed(
        date: NaiveDate,
        amount: Amount,
        kind: Kind,
        category: impl AsRef<str>,
        description: impl AsRef<str>,
    ) -> Result<Self> {
        if !kind.agrees_with(amount) {
            return Err(Error::msg(
                ErrorType::Parse,
                format!("An amount of {amount} cannot be of type {kind}"),
            ));
        }
        Ok(Self {
            date,
            amount,
            kind,
            category: clean_category(category.as_ref()),
            description: description.as_ref().trim().to_string(),
            source_row: None,
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// The signed amount: positive for income, negative for expenses.
    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn source_row(&self) -> Option<SourceRow> {
        self.source_row
    }

    pub(crate) fn set_source_row(&mut self, row: Option<SourceRow>) {
        self.source_row = row;
    }

    /// Returns a copy of `self` with `source_row` replaced.
    pub(crate) fn with_source_row(mut self, row: SourceRow) -> Self {
        self.source_row = Some(row);
        self
    }

    /// Compares every ledger field, ignoring `source_row`.
    pub fn same_data(&self, other: &Transaction) -> bool {
        self.date == other.date
            && self.amount.value() == other.amount.value()
            && self.kind == other.kind
            && self.category == other.category
            && self.description == other.description
    }

    /// Renders the value of `column` the way it is written to the sheet.
    pub(crate) fn cell(&self, column: TransactionColumn) -> String {
        match column {
            TransactionColumn::Date => format_date(self.date),
            TransactionColumn::Amount => self.amount.to_plain_string(),
            TransactionColumn::Kind => self.kind.to_string(),
            TransactionColumn::Category => self.category.clone(),
            TransactionColumn::Description => self.description.clone(),
        }
    }
}

impl Display for Transaction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(row) = self.source_row {
            write!(f, "{row}. ")?;
        }
        write!(
            f,
            "{} | {} | {} | {} | {}",
            format_date(self.date),
            self.kind,
            self.amount,
            self.category,
            self.description
        )
    }
}

fn clean_category(category: &str) -> String {
    let trimmed = category.trim();
    if trimmed.is_empty() {
        UNCATEGORIZED.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Renders a date as `YYYY-MM-DD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parses a date cell. The sheet may render dates in a few shapes depending on its locale and on
/// whether a time crept in, so a handful of formats are accepted. Any time of day is dropped.
pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, DATE_FORMAT) {
        return Ok(date);
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(date_time) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(date_time.date());
        }
    }
    for format in OTHER_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Ok(date);
        }
    }
    anyhow::bail!("Unable to parse '{s}' as a date, expected YYYY-MM-DD")
}

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
const OTHER_DATE_FORMATS: &[&str] = &["%Y/%m/%d", "%m/%d/%Y"];

/// The columns of the ledger sheet.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum TransactionColumn {
    #[serde(rename = "Fecha")]
    Date,
    #[serde(rename = "Monto")]
    Amount,
    #[serde(rename = "Tipo")]
    Kind,
    #[serde(rename = "Categoría")]
    Category,
    #[serde(rename = "Descripción")]
    Description,
}

serde_plain::derive_display_from_serialize!(TransactionColumn);
serde_plain::derive_fromstr_from_deserialize!(TransactionColumn);

impl TransactionColumn {
    /// All columns in the order they are written to a new sheet.
    pub const ALL: [TransactionColumn; 5] = [
        TransactionColumn::Date,
        TransactionColumn::Amount,
        TransactionColumn::Kind,
        TransactionColumn::Category,
        TransactionColumn::Description,
    ];

    pub fn from_header(header: impl AsRef<str>) -> anyhow::Result<TransactionColumn> {
        let header = header.as_ref().trim();
        TransactionColumn::from_str(header)
            .map_err(|_| anyhow::anyhow!("Invalid ledger column name '{header}'"))
    }

    pub fn header(&self) -> &'static str {
        match self {
            TransactionColumn::Date => DATE_STR,
            TransactionColumn::Amount => AMOUNT_STR,
            TransactionColumn::Kind => KIND_STR,
            TransactionColumn::Category => CATEGORY_STR,
            TransactionColumn::Description => DESCRIPTION_STR,
        }
    }
}

pub(crate) const DATE_STR: &str = "Fecha";
pub(crate) const AMOUNT_STR: &str = "Monto";
pub(crate) const KIND_STR: &str = "Tipo";
pub(crate) const CATEGORY_STR: &str = "Categoría";
pub(crate) const DESCRIPTION_STR: &str = "Descripción";
