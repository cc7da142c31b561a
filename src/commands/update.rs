use crate::args::UpdateArgs;
use crate::cache::LedgerCache;
use crate::commands::Out;
use crate::model::Transaction;
use crate::Result;

/// Overwrites the transaction on `args.row`. Fields that are not given keep their current values.
/// When only the kind changes, the magnitude is kept and the sign flips.
pub async fn update(cache: &mut LedgerCache, args: &UpdateArgs) -> Result<Out<Transaction>> {
    let current = cache.get(args.row).await?;
    let transaction = Transaction::new(
        args.date.unwrap_or(current.date()),
        args.amount.unwrap_or(current.amount().abs().value()),
        args.kind.unwrap_or(current.kind()),
        args.category.as_deref().unwrap_or(current.category()),
        args.description
            .as_deref()
            .unwrap_or(current.description()),
    )?;
    if transaction.same_data(&current) {
        return Ok(Out::new(
            format!("Row {} already has these values, nothing to update", args.row),
            current,
        ));
    }
    let updated = cache.update(args.row, transaction).await?;
    Ok(Out::new(format!("Updated {updated}"), updated))
}
