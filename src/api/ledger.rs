//! Implements the `LedgerStore` trait on top of an untyped `Sheet`.

use crate::api::{LedgerStore, Sheet};
use crate::error::{ErrorType, IntoResult};
use crate::model::{Mapping, SourceRow, Transaction};
use crate::{Error, Result};
use anyhow::Context;
use tracing::{debug, trace};

/// Reads and writes transactions in a `Sheet`. Rows are mapped by header name, so the columns of
/// the sheet may be in any order.
pub(crate) struct LedgerStoreImpl {
    sheet: Box<dyn Sheet + Send>,
    mapping: Option<Mapping>,
}

impl LedgerStoreImpl {
    /// Create a new `LedgerStoreImpl` object that will use a dynamically-dispatched `sheet` to get
    /// and send its data.
    pub(crate) fn new(sheet: Box<dyn Sheet + Send>) -> Self {
        Self {
            sheet,
            mapping: None,
        }
    }

    /// Returns the column layout, reading the header row if it has not been seen yet, and whether
    /// the sheet still needs a header row. A sheet with no rows at all uses the default layout.
    async fn mapping(&mut self) -> Result<(Mapping, bool)> {
        if let Some(mapping) = &self.mapping {
            return Ok((mapping.clone(), false));
        }
        let rows = self.sheet.get().await?;
        match rows.first() {
            Some(header) => {
                let mapping = parse_header(header)?;
                self.mapping = Some(mapping.clone());
                Ok((mapping, false))
            }
            None => Ok((Mapping::default(), true)),
        }
    }

    /// Fails with `StoreRowNotFound` unless `row` is a data row that exists in the sheet.
    async fn check_row(&mut self, row: SourceRow) -> Result<()> {
        let count = self.sheet.row_count().await?;
        if row.get() > count {
            return Err(Error::msg(
                ErrorType::StoreRowNotFound,
                format!("Row {row} does not exist, the sheet has {count} rows"),
            ));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl LedgerStore for LedgerStoreImpl {
    async fn load_all(&mut self) -> Result<Vec<Transaction>> {
        trace!("load_all");
        let rows = self.sheet.get().await?;
        let Some((header, data)) = rows.split_first() else {
            self.mapping = None;
            return Ok(Vec::new());
        };
        let mapping = parse_header(header)?;

        // Every row the sheet reports as in use must hold a transaction, otherwise the physical row
        // numbers would not match the cached ones.
        let mut transactions = Vec::with_capacity(data.len());
        for (ix, row) in data.iter().enumerate() {
            let row_number = ix + SourceRow::FIRST.get();
            if is_blank(row) {
                return Err(Error::msg(
                    ErrorType::Parse,
                    format!(
                        "Row {row_number} is blank, every row below the header must hold a \
                        transaction"
                    ),
                ));
            }
            let transaction = mapping
                .parse_row(row)
                .with_context(|| format!("Unable to read row {row_number}"))
                .pub_result(ErrorType::Parse)?;
            transactions.push(transaction);
        }
        self.mapping = Some(mapping);
        debug!("Loaded {} transactions", transactions.len());
        Ok(transactions)
    }

    async fn append(&mut self, transaction: &Transaction) -> Result<()> {
        trace!("append {transaction}");
        let (mapping, needs_header) = self.mapping().await?;
        let mut rows = Vec::with_capacity(2);
        if needs_header {
            debug!("The sheet is empty, writing the header row with the first transaction");
            rows.push(mapping.headers());
        }
        rows.push(mapping.to_row(transaction));
        // The header and the first transaction are written by the same call.
        self.sheet.append_rows(&rows).await?;
        self.mapping = Some(mapping);
        Ok(())
    }

    async fn update_range(&mut self, row: SourceRow, transaction: &Transaction) -> Result<()> {
        trace!("update_range {row} with {transaction}");
        self.check_row(row).await?;
        let (mapping, _) = self.mapping().await?;
        self.sheet
            .write_row(row.get(), &mapping.to_row(transaction))
            .await
    }

    async fn delete_row(&mut self, row: SourceRow) -> Result<()> {
        trace!("delete_row {row}");
        self.check_row(row).await?;
        self.sheet.delete_row(row.get()).await
    }
}

fn parse_header(header: &[String]) -> Result<Mapping> {
    Mapping::new(header)
        .context("The first row of the sheet is not a valid ledger header")
        .pub_result(ErrorType::Parse)
}

fn is_blank(row: &[String]) -> bool {
    row.iter().all(|cell| cell.trim().is_empty())
}
