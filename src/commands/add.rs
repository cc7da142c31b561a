use crate::args::AddArgs;
use crate::cache::LedgerCache;
use crate::commands::Out;
use crate::model::Transaction;
use crate::Result;
use chrono::NaiveDate;

/// Validates the input, appends it to the end of the ledger and returns the stored transaction,
/// which carries its new row number. The date defaults to `today`.
pub async fn add(
    cache: &mut LedgerCache,
    args: &AddArgs,
    today: NaiveDate,
) -> Result<Out<Transaction>> {
    let transaction = Transaction::new(
        args.date.unwrap_or(today),
        args.amount,
        args.kind,
        args.category.as_deref().unwrap_or_default(),
        args.description.as_deref().unwrap_or_default(),
    )?;
    let added = cache.add(transaction).await?;
    Ok(Out::new(format!("Added {added}"), added))
}
