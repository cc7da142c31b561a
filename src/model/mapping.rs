//! Maps the header row of the ledger sheet to `TransactionColumn`s so that rows can be read and
//! written by header name rather than by position.

use crate::model::transaction::{parse_date, TransactionColumn};
use crate::model::{Amount, Kind, Transaction};
use anyhow::{bail, Context};
use serde::de::Error as SerdeError;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::str::FromStr;

/// The column layout of a ledger sheet, as found in its header row.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Mapping {
    columns: Vec<TransactionColumn>,
    index: HashMap<TransactionColumn, usize>,
}

impl Default for Mapping {
    /// The layout used when a new header row is written.
    fn default() -> Self {
        Self::from_columns(TransactionColumn::ALL.to_vec())
    }
}

impl Mapping {
    /// Create a new `Mapping` from the header row of a sheet. Every ledger column must be present
    /// exactly once and no other headers are allowed. Trailing empty header cells are ignored.
    pub fn new<S, I>(headers: I) -> anyhow::Result<Self>
    where
        S: AsRef<str>,
        I: IntoIterator<Item = S>,
    {
        let mut headers: Vec<String> = headers
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .collect();
        while headers.last().is_some_and(|h| h.is_empty()) {
            headers.pop();
        }

        let columns = headers
            .iter()
            .map(TransactionColumn::from_header)
            .collect::<anyhow::Result<Vec<_>>>()?;

        let mapping = Self::from_columns(columns);
        if mapping.index.len() != mapping.columns.len() {
            bail!("Encountered a duplicate header in {headers:?}");
        }
        if let Some(missing) = TransactionColumn::ALL
            .iter()
            .find(|c| !mapping.index.contains_key(c))
        {
            bail!("The header row is missing the '{missing}' column");
        }
        Ok(mapping)
    }

    fn from_columns(columns: Vec<TransactionColumn>) -> Self {
        let index = columns
            .iter()
            .enumerate()
            .map(|(ix, col)| (*col, ix))
            .collect();
        Self { columns, index }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[TransactionColumn] {
        &self.columns
    }

    /// The header row as it should appear in the sheet.
    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.header().to_string()).collect()
    }

    /// Renders `transaction` as a sheet row in this layout.
    pub fn to_row(&self, transaction: &Transaction) -> Vec<String> {
        self.columns.iter().map(|c| transaction.cell(*c)).collect()
    }

    /// Parses a sheet row in this layout. Missing trailing cells are treated as empty, which is how
    /// the Sheets API returns a row whose last cells are blank.
    pub fn parse_row<S: AsRef<str>>(&self, values: &[S]) -> anyhow::Result<Transaction> {
        if values.len() > self.len() {
            bail!(
                "The row has {} cells but there are only {} columns",
                values.len(),
                self.len()
            );
        }
        let cell = |column: TransactionColumn| -> &str {
            self.index
                .get(&column)
                .and_then(|ix| values.get(*ix))
                .map(|s| s.as_ref())
                .unwrap_or_default()
        };

        let date = parse_date(cell(TransactionColumn::Date))?;
        let amount_str = cell(TransactionColumn::Amount);
        let amount = Amount::from_str(amount_str)?;
        let kind_str = cell(TransactionColumn::Kind).trim();
        let kind = Kind::from_str(kind_str)
            .ok()
            .with_context(|| format!("Unknown type '{kind_str}', expected Ingreso or Egreso"))?;

        Ok(Transaction::from_signed(
            date,
            amount,
            kind,
            cell(TransactionColumn::Category),
            cell(TransactionColumn::Description),
        )?)
    }
}

impl Serialize for Mapping {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.columns.len()))?;
        for column in &self.columns {
            seq.serialize_element(column.header())?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Mapping {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let items: Vec<String> = Vec::deserialize(deserializer)?;
        Mapping::new(items).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::NaiveDate;

    const REORDERED: [&str; 5] = ["Tipo", "Fecha", "Descripción", "Monto", "Categoría"];

    #[test]
    fn test_default_headers() {
        let mapping = Mapping::default();
        assert_eq!(
            mapping.headers(),
            vec!["Fecha", "Monto", "Tipo", "Categoría", "Descripción"]
        );
    }

    #[test]
    fn test_reordered_headers_round_trip_a_row() {
        let mapping = Mapping::new(REORDERED).unwrap();
        let row = vec!["Egreso", "2024-01-06", "tacos", "-40.00", "comida"];
        let t = mapping.parse_row(&row).unwrap();
        assert_eq!(t.date(), NaiveDate::from_ymd_opt(2024, 1, 6).unwrap());
        assert_eq!(t.kind(), Kind::Expense);
        assert_eq!(t.category(), "comida");
        assert_eq!(t.description(), "tacos");
        assert_eq!(mapping.to_row(&t), row);
    }

    #[test]
    fn test_missing_trailing_cells_are_empty() {
        let mapping = Mapping::default();
        let t = mapping
            .parse_row(&["2024-01-05", "100", "Ingreso"])
            .unwrap();
        assert_eq!(t.category(), crate::model::UNCATEGORIZED);
        assert_eq!(t.description(), "");
    }

    #[test]
    fn test_trailing_empty_headers_are_ignored() {
        let mapping =
            Mapping::new(["Fecha", "Monto", "Tipo", "Categoría", "Descripción", "", " "]).unwrap();
        assert_eq!(mapping.len(), 5);
    }

    #[test]
    fn test_bad_headers() {
        assert!(Mapping::new(["Fecha", "Monto", "Tipo", "Categoría"]).is_err());
        assert!(Mapping::new(["Fecha", "Monto", "Tipo", "Categoría", "Descripción", "Notas"]).is_err());
        assert!(Mapping::new(["Fecha", "Fecha", "Monto", "Tipo", "Categoría", "Descripción"]).is_err());
    }

    #[test]
    fn test_bad_rows() {
        let mapping = Mapping::default();
        assert!(mapping.parse_row(&["ayer", "1", "Ingreso"]).is_err());
        assert!(mapping.parse_row(&["2024-01-05", "uno", "Ingreso"]).is_err());
        assert!(mapping.parse_row(&["2024-01-05", "1", "Gasto"]).is_err());
        assert!(mapping.parse_row(&["2024-01-05", "-1", "Ingreso"]).is_err());
        assert!(mapping
            .parse_row(&["2024-01-05", "1", "Ingreso", "", "", "extra"])
            .is_err());
    }

    #[test]
    fn test_mapping_serde() {
        let original_json = r##"["Tipo","Fecha","Descripción","Monto","Categoría"]"##;
        let mapping: Mapping = serde_json::from_str(original_json).unwrap();
        assert_eq!(mapping, Mapping::new(REORDERED).unwrap());
        let serialized = serde_json::to_string(&mapping).unwrap();
        assert_eq!(original_json, serialized);
    }
}
