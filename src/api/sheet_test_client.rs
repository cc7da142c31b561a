//! Implements the `Sheet` trait using in-memory data for testing purposes.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without using Google Sheets.

use crate::api::Sheet;
use crate::error::{ErrorType, IntoResult, Res};
use crate::{Error, Result};
use anyhow::anyhow;
use std::io::Cursor;
use std::sync::{Arc, Mutex, MutexGuard};

/// An implementation of the `Sheet` trait that does not use Google sheets. It holds its rows in
/// memory and, by default, is seeded with a few months of transactions.
///
/// Clones share the same rows, so a test can keep a handle while the store owns another.
#[derive(Debug, Clone)]
pub(crate) struct TestSheet {
    state: Arc<Mutex<State>>,
}

#[derive(Debug, Default)]
struct State {
    rows: Vec<Vec<String>>,
    failure: Option<ErrorType>,
    calls: usize,
}

impl TestSheet {
    /// Create a new `TestSheet` holding `rows`, header included.
    pub(crate) fn new(rows: Vec<Vec<String>>) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                rows,
                ..State::default()
            })),
        }
    }

    /// A sheet with no rows at all, not even a header.
    #[cfg(test)]
    pub(crate) fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Every call fails with `error_type` until this is called again with `None`.
    #[cfg(test)]
    pub(crate) fn set_failure(&self, error_type: Option<ErrorType>) {
        if let Ok(mut state) = self.state.lock() {
            state.failure = error_type;
        }
    }

    /// How many calls the sheet has received, including failed ones.
    #[cfg(test)]
    pub(crate) fn calls(&self) -> usize {
        self.state.lock().map(|s| s.calls).unwrap_or_default()
    }

    /// A copy of the rows currently held.
    #[cfg(test)]
    pub(crate) fn rows(&self) -> Vec<Vec<String>> {
        self.state
            .lock()
            .map(|s| s.rows.clone())
            .unwrap_or_default()
    }

    /// Locks the state, counts the call and fails if a failure has been set.
    fn begin(&self, action: &str) -> Result<MutexGuard<'_, State>> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow!("The test sheet lock is poisoned"))
            .pub_result(ErrorType::StoreUnavailable)?;
        state.calls += 1;
        if let Some(error_type) = state.failure {
            return Err(Error::msg(
                error_type,
                format!("The test sheet was told to fail: {action}"),
            ));
        }
        Ok(state)
    }
}

#[async_trait::async_trait]
impl Sheet for TestSheet {
    async fn get(&mut self) -> Result<Vec<Vec<String>>> {
        let state = self.begin("get")?;
        // Like the Sheets API, trailing empty rows and trailing empty cells are not returned.
        let in_use = last_row_in_use(&state.rows);
        Ok(state.rows[..in_use]
            .iter()
            .map(|row| {
                let end = row
                    .iter()
                    .rposition(|cell| !cell.is_empty())
                    .map_or(0, |ix| ix + 1);
                row[..end].to_vec()
            })
            .collect())
    }

    async fn append_rows(&mut self, rows: &[Vec<String>]) -> Result<()> {
        let mut state = self.begin("append_rows")?;
        // Rows past the last one in use are empty and are overwritten by an append.
        let in_use = last_row_in_use(&state.rows);
        state.rows.truncate(in_use);
        state.rows.extend(rows.iter().cloned());
        Ok(())
    }

    async fn write_row(&mut self, row: usize, values: &[String]) -> Result<()> {
        let mut state = self.begin("write_row")?;
        if row == 0 {
            return Err(Error::msg(ErrorType::StoreRejected, "Rows start at 1"));
        }
        while state.rows.len() < row {
            state.rows.push(Vec::new());
        }
        state.rows[row - 1] = values.to_vec();
        Ok(())
    }

    async fn delete_row(&mut self, row: usize) -> Result<()> {
        let mut state = self.begin("delete_row")?;
        if row == 0 || row > state.rows.len() {
            return Err(Error::msg(
                ErrorType::StoreRejected,
                format!("Row {row} is out of range"),
            ));
        }
        state.rows.remove(row - 1);
        Ok(())
    }
}

impl Default for TestSheet {
    /// Loads seed data from this module.
    fn default() -> Self {
        match load_csv(TRANSACTION_DATA) {
            Ok(rows) => Self::new(rows),
            Err(e) => {
                tracing::error!("Unable to load the test sheet seed data: {e:#}");
                Self::new(Vec::new())
            }
        }
    }
}

/// The number of rows up to and including the last one with a non-empty cell.
fn last_row_in_use(rows: &[Vec<String>]) -> usize {
    rows.iter()
        .rposition(|row| row.iter().any(|cell| !cell.is_empty()))
        .map_or(0, |ix| ix + 1)
}

/// Loads data from a CSV-formatted string.
fn load_csv(csv_data: &str) -> Res<Vec<Vec<String>>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(Cursor::new(csv_data.as_bytes()));

    let mut rows: Vec<Vec<String>> = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(|field| field.to_string()).collect());
    }
    Ok(rows)
}

/// Seed transaction data. Amounts are rendered the way a currency-formatted sheet returns them.
const TRANSACTION_DATA: &str = r##"Fecha,Monto,Tipo,Categoría,Descripción
2024-01-05,"$1,500.00",Ingreso,Sueldo,Quincena
2024-01-06,-$40.00,Egreso,Comida,Tacos
2024-01-20,-$350.00,Egreso,Renta,Renta de enero
2024-01-31,$200.00,Ingreso,Ventas,Bicicleta usada
2024-02-01,-$60.50,Egreso,Transporte,Gasolina
2024-02-15,"$1,500.00",Ingreso,Sueldo,Quincena
2024-02-29,-$120.25,Egreso,,
2024-03-01,-$35.00,Egreso,Comida,Café y pan
2024-03-10,$80.00,Ingreso,Regalos,Cumpleaños
2024-03-31,-$15.75,Egreso,Transporte,Metro
"##;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seed_data() {
        let mut sheet = TestSheet::default();
        let rows = sheet.get().await.unwrap();
        assert_eq!(rows.len(), 11);
        assert_eq!(
            rows[0],
            vec!["Fecha", "Monto", "Tipo", "Categoría", "Descripción"]
        );
        // trailing empty cells are dropped
        assert_eq!(rows[7], vec!["2024-02-29", "-$120.25", "Egreso"]);
    }

    #[tokio::test]
    async fn test_clones_share_rows() {
        let handle = TestSheet::empty();
        let mut sheet = handle.clone();
        sheet
            .append_rows(&[vec!["a".to_string(), "b".to_string()]])
            .await
            .unwrap();
        assert_eq!(handle.rows(), vec![vec!["a", "b"]]);
        assert_eq!(handle.calls(), 1);
    }

    #[tokio::test]
    async fn test_trailing_empty_rows_are_not_in_use() {
        let handle = TestSheet::new(vec![
            vec!["h".to_string()],
            vec!["x".to_string(), String::new()],
            vec![String::new(), String::new()],
            Vec::new(),
        ]);
        let mut sheet = handle.clone();
        assert_eq!(sheet.get().await.unwrap(), vec![vec!["h"], vec!["x"]]);
        assert_eq!(sheet.row_count().await.unwrap(), 2);

        sheet.append_rows(&[vec!["y".to_string()]]).await.unwrap();
        assert_eq!(sheet.get().await.unwrap(), vec![vec!["h"], vec!["x"], vec!["y"]]);
    }

    #[tokio::test]
    async fn test_whitespace_rows_are_in_use() {
        let mut sheet = TestSheet::new(vec![vec!["h".to_string()], vec![" ".to_string()]]);
        assert_eq!(sheet.row_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let handle = TestSheet::default();
        let mut sheet = handle.clone();
        handle.set_failure(Some(ErrorType::StoreUnavailable));
        let err = sheet.delete_row(2).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::StoreUnavailable);
        assert_eq!(handle.rows().len(), 11);
        handle.set_failure(None);
        sheet.delete_row(2).await.unwrap();
        assert_eq!(handle.rows().len(), 10);
    }
}
