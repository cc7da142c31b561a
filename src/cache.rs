//! The in-process mirror of the remote ledger.
//!
//! Every cached transaction carries the physical row it occupies in the sheet. Rows are contiguous:
//! for `n` cached transactions the rows are exactly `2..=n+1`, in order. The cache only changes
//! after the `LedgerStore` call it mirrors has succeeded.

use crate::api::LedgerStore;
use crate::error::ErrorType;
use crate::model::{SourceRow, Transaction};
use crate::{Error, Result};
use tracing::{debug, trace};

/// Holds the transactions of the ledger for the duration of a session. It is loaded from the store
/// on first access and can be invalidated to force a reload.
pub struct LedgerCache {
    store: Box<dyn LedgerStore + Send>,
    entries: Option<Vec<Transaction>>,
}

impl LedgerCache {
    pub fn new(store: Box<dyn LedgerStore + Send>) -> Self {
        Self {
            store,
            entries: None,
        }
    }

    /// Reads every transaction from the store and replaces the cache, numbering rows from 2.
    pub async fn load(&mut self) -> Result<()> {
        let mut transactions = self.store.load_all().await?;
        let mut row = SourceRow::FIRST;
        for transaction in transactions.iter_mut() {
            transaction.set_source_row(Some(row));
            row = row.next();
        }
        debug!("Cached {} transactions", transactions.len());
        self.entries = Some(transactions);
        self.check_rows();
        Ok(())
    }

    /// Drops the cached transactions. The next access reloads them from the store.
    pub fn invalidate(&mut self) {
        debug!("Invalidating the ledger cache");
        self.entries = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.entries.is_some()
    }

    /// Appends `transaction` to the store and then to the cache. Returns the cached copy, which has
    /// its `source_row` set.
    pub async fn add(&mut self, transaction: Transaction) -> Result<Transaction> {
        self.ensure_loaded().await?;
        self.store.append(&transaction).await?;

        let entries = self.loaded();
        let row = entries
            .iter()
            .filter_map(|t| t.source_row())
            .max()
            .map_or(SourceRow::FIRST, |max| max.next());
        let added = transaction.with_source_row(row);
        entries.push(added.clone());
        debug!("Added row {row}: {added}");
        self.check_rows();
        Ok(added)
    }

    /// Overwrites the transaction at `row` in the store and then in the cache. The row number does
    /// not change. Fails with `StoreRowNotFound`, without calling the store, if the cache has no
    /// such row.
    pub async fn update(&mut self, row: SourceRow, transaction: Transaction) -> Result<Transaction> {
        self.ensure_loaded().await?;
        let ix = self.index_of(row)?;
        self.store.update_range(row, &transaction).await?;

        let updated = transaction.with_source_row(row);
        self.loaded()[ix] = updated.clone();
        debug!("Updated row {row}: {updated}");
        self.check_rows();
        Ok(updated)
    }

    /// Deletes the transaction at `row` from the store and then from the cache. Every cached
    /// transaction below it moves up one row. Returns the removed transaction.
    pub async fn remove(&mut self, row: SourceRow) -> Result<Transaction> {
        self.ensure_loaded().await?;
        let ix = self.index_of(row)?;
        self.store.delete_row(row).await?;

        let entries = self.loaded();
        let removed = entries.remove(ix);
        for shifted in entries[ix..].iter_mut() {
            let new_row = shifted.source_row().map(|r| r.prev());
            shifted.set_source_row(new_row);
        }
        debug!("Removed row {row}: {removed}");
        self.check_rows();
        Ok(removed)
    }

    /// An owned copy of the cached transactions, in row order.
    pub async fn snapshot(&mut self) -> Result<Vec<Transaction>> {
        self.ensure_loaded().await?;
        Ok(self.loaded().clone())
    }

    /// The cached transaction at `row`.
    pub async fn get(&mut self, row: SourceRow) -> Result<Transaction> {
        self.ensure_loaded().await?;
        let ix = self.index_of(row)?;
        Ok(self.loaded()[ix].clone())
    }

    async fn ensure_loaded(&mut self) -> Result<()> {
        if self.entries.is_none() {
            self.load().await?;
        }
        Ok(())
    }

    fn loaded(&mut self) -> &mut Vec<Transaction> {
        self.entries.get_or_insert_with(Vec::new)
    }

    fn index_of(&self, row: SourceRow) -> Result<usize> {
        let entries = self.entries.as_deref().unwrap_or_default();
        let ix = row.get() - SourceRow::FIRST.get();
        match entries.get(ix) {
            Some(t) if t.source_row() == Some(row) => Ok(ix),
            _ => Err(Error::msg(
                ErrorType::StoreRowNotFound,
                format!(
                    "There is no transaction on row {row}, the ledger has {} transactions",
                    entries.len()
                ),
            )),
        }
    }

    fn check_rows(&self) {
        let entries = self.entries.as_deref().unwrap_or_default();
        let contiguous = entries
            .iter()
            .enumerate()
            .all(|(ix, t)| t.source_row().map(|r| r.get()) == Some(ix + SourceRow::FIRST.get()));
        trace!(
            "{} cached transactions, rows contiguous: {contiguous}",
            entries.len()
        );
        debug_assert!(contiguous, "cached rows are not contiguous");
    }
}
