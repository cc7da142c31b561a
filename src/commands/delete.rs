use crate::args::DeleteArgs;
use crate::cache::LedgerCache;
use crate::commands::Out;
use crate::model::Transaction;
use crate::Result;

/// Deletes the transaction on `args.row`. Every transaction below it moves up one row, so row
/// numbers printed before this call are stale for those rows.
pub async fn delete(cache: &mut LedgerCache, args: &DeleteArgs) -> Result<Out<Transaction>> {
    let removed = cache.remove(args.row).await?;
    Ok(Out::new(format!("Deleted {removed}"), removed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TestSheet;
    use crate::model::SourceRow;
    use crate::test::{cache_for, rows_of};
    use crate::ErrorType;

    #[tokio::test]
    async fn test_delete_shifts_rows() {
        let (sheet, mut cache) = cache_for(TestSheet::default());
        let args = DeleteArgs {
            row: SourceRow::new(5).unwrap(),
        };
        let out = delete(&mut cache, &args).await.unwrap();
        assert_eq!(out.structure().unwrap().description(), "Bicicleta usada");

        let snapshot = cache.snapshot().await.unwrap();
        assert_eq!(rows_of(&snapshot), (2..=10).collect::<Vec<_>>());
        assert_eq!(snapshot[3].description(), "Gasolina");
        assert_eq!(sheet.rows()[4][4], "Gasolina");
    }

    #[tokio::test]
    async fn test_delete_failure_leaves_cache() {
        let (sheet, mut cache) = cache_for(TestSheet::default());
        let before = cache.snapshot().await.unwrap();
        sheet.set_failure(Some(ErrorType::StoreUnavailable));

        let args = DeleteArgs {
            row: SourceRow::new(2).unwrap(),
        };
        let err = delete(&mut cache, &args).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::StoreUnavailable);
        assert_eq!(cache.snapshot().await.unwrap(), before);
    }
}
