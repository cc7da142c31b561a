use crate::args::ListArgs;
use crate::cache::LedgerCache;
use crate::commands::Out;
use crate::model::Transaction;
use crate::query::{aggregate, date_bounds, Aggregate};
use crate::Result;
use chrono::NaiveDate;
use serde::Serialize;

/// The transactions selected by `caroney list` and their totals.
#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub filter: String,
    pub transactions: Vec<Transaction>,
    pub totals: Aggregate,
}

/// Prints the selected transactions, one per line with their row numbers, followed by the totals.
pub async fn list(cache: &mut LedgerCache, args: &ListArgs, today: NaiveDate) -> Result<Out<Listing>> {
    let snapshot = cache.snapshot().await?;
    let filter = args.view.filter(today, date_bounds(&snapshot));
    let transactions = filter.apply(&snapshot);
    let totals = aggregate(&transactions);

    let lines = std::iter::once(format!("{} transactions, {filter}", transactions.len()))
        .chain(transactions.iter().map(|t| t.to_string()))
        .chain(std::iter::once(format!(
            "Ingresos: {}  Egresos: {}  Balance: {}",
            totals.income, totals.expense, totals.balance
        )));
    let message = lines.collect::<Vec<_>>().join("\n");

    let listing = Listing {
        filter: filter.to_string(),
        transactions,
        totals,
    };
    Ok(Out::new(message, listing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TestSheet;
    use crate::args::ViewArgs;
    use crate::test::{cache_for, date, rows_of};
    use std::str::FromStr;

    #[tokio::test]
    async fn test_list_all() {
        let (_, mut cache) = cache_for(TestSheet::default());
        let out = list(&mut cache, &ListArgs::default(), date(2024, 3, 31))
            .await
            .unwrap();
        let listing = out.structure().unwrap();
        assert_eq!(listing.transactions.len(), 10);
        assert_eq!(listing.totals.balance.to_plain_string(), "2658.50");
        assert!(out
            .message()
            .ends_with("Ingresos: $3,280.00  Egresos: $621.50  Balance: $2,658.50"));
    }

    #[tokio::test]
    async fn test_list_range() {
        let (_, mut cache) = cache_for(TestSheet::default());
        let args = ListArgs {
            view: ViewArgs {
                month: false,
                from: Some(NaiveDate::from_str("2024-02-01").unwrap()),
                to: Some(NaiveDate::from_str("2024-02-29").unwrap()),
            },
        };
        let out = list(&mut cache, &args, date(2024, 10, 1)).await.unwrap();
        let listing = out.structure().unwrap();
        assert_eq!(rows_of(&listing.transactions), vec![6, 7, 8]);
        assert_eq!(listing.totals.expense.to_plain_string(), "180.75");
        assert!(out.message().contains("6. 2024-02-01 | Egreso | -$60.50 | Transporte"));
        let lines: Vec<&str> = out.message().lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "3 transactions, rango 2024-02-01 a 2024-02-29");
        assert!(lines[4].starts_with("Ingresos: $1,500.00"));
    }

    #[tokio::test]
    async fn test_list_month_with_no_transactions() {
        let (_, mut cache) = cache_for(TestSheet::default());
        let args = ListArgs {
            view: ViewArgs {
                month: true,
                ..ViewArgs::default()
            },
        };
        let out = list(&mut cache, &args, date(2026, 10, 16)).await.unwrap();
        let listing = out.structure().unwrap();
        assert!(listing.transactions.is_empty());
        assert_eq!(listing.totals, Aggregate::default());
    }
}
