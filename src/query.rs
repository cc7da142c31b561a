//! Pure functions over a snapshot of the ledger: date filters and totals.

use crate::model::{format_date, Amount, Kind, Transaction};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// An inclusive range of dates. A range whose `start` is after its `end` contains nothing.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The range from the first day of `today`'s month through `today`.
    pub fn month_to_date(today: NaiveDate) -> Self {
        let first = today.with_day(1).unwrap_or(today);
        Self::new(first, today)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl Display for DateRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} a {}", format_date(self.start), format_date(self.end))
    }
}

/// The totals of a set of transactions. `expense` is reported as a positive magnitude.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub income: Amount,
    pub expense: Amount,
    pub balance: Amount,
}

/// Which transactions to look at.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Filter {
    All,
    CurrentMonth { today: NaiveDate },
    Range(DateRange),
}

impl Filter {
    pub fn apply(&self, snapshot: &[Transaction]) -> Vec<Transaction> {
        match self {
            Filter::All => snapshot.to_vec(),
            Filter::CurrentMonth { today } => filter_by_current_month(snapshot, *today),
            Filter::Range(range) => filter_by_date_range(snapshot, range.start, range.end),
        }
    }
}

impl Display for Filter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Filter::All => write!(f, "todas las transacciones"),
            Filter::CurrentMonth { today } => {
                write!(f, "mes actual ({})", DateRange::month_to_date(*today))
            }
            Filter::Range(range) => write!(f, "rango {range}"),
        }
    }
}

/// The transactions dated from `start` through `end`, inclusive, in their original order.
pub fn filter_by_date_range(
    snapshot: &[Transaction],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<Transaction> {
    let range = DateRange::new(start, end);
    snapshot
        .iter()
        .filter(|t| range.contains(t.date()))
        .cloned()
        .collect()
}

/// The transactions dated from the first of `today`'s month through `today`.
pub fn filter_by_current_month(snapshot: &[Transaction], today: NaiveDate) -> Vec<Transaction> {
    let range = DateRange::month_to_date(today);
    filter_by_date_range(snapshot, range.start, range.end)
}

/// Sums income and expenses. An empty snapshot sums to zero everywhere.
pub fn aggregate(snapshot: &[Transaction]) -> Aggregate {
    let income: Amount = snapshot
        .iter()
        .filter(|t| t.kind() == Kind::Income)
        .map(|t| t.amount())
        .sum();
    let expenses: Amount = snapshot
        .iter()
        .filter(|t| t.kind() == Kind::Expense)
        .map(|t| t.amount())
        .sum();
    Aggregate {
        income,
        expense: -expenses,
        balance: income + expenses,
    }
}

/// The earliest and latest dates in the snapshot, or `None` if it is empty.
pub fn date_bounds(snapshot: &[Transaction]) -> Option<DateRange> {
    let start = snapshot.iter().map(|t| t.date()).min()?;
    let end = snapshot.iter().map(|t| t.date()).max()?;
    Some(DateRange::new(start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{date, expense, income, seed_transactions};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn amount(s: &str) -> Amount {
        Amount::from_str(s).unwrap()
    }

    #[test]
    fn test_aggregate_empty() {
        let totals = aggregate(&[]);
        assert!(totals.income.is_zero());
        assert!(totals.expense.is_zero());
        assert!(totals.balance.is_zero());
        assert_eq!(totals, Aggregate::default());
    }

    #[test]
    fn test_aggregate_income_and_expense() {
        let totals = aggregate(&[income(2024, 1, 5, 100), expense(2024, 1, 6, 40)]);
        assert_eq!(totals.income.value(), Decimal::from(100));
        assert_eq!(totals.expense.value(), Decimal::from(40));
        assert_eq!(totals.balance.value(), Decimal::from(60));
    }

    #[test]
    fn test_aggregate_seed() {
        let totals = aggregate(&seed_transactions());
        assert_eq!(totals.income, amount("3280.00"));
        assert_eq!(totals.expense, amount("621.50"));
        assert_eq!(totals.balance, amount("2658.50"));
    }

    #[test]
    fn test_aggregate_ignores_order() {
        let transactions = seed_transactions();
        let expected = aggregate(&transactions);
        let mut reversed = transactions.clone();
        reversed.reverse();
        assert_eq!(aggregate(&reversed), expected);
        for n in 1..transactions.len() {
            let mut rotated = transactions.clone();
            rotated.rotate_left(n);
            assert_eq!(aggregate(&rotated), expected);
        }
    }

    #[test]
    fn test_aggregate_relations() {
        let transactions = seed_transactions();
        for n in 0..=transactions.len() {
            let totals = aggregate(&transactions[..n]);
            assert!(!totals.expense.is_negative());
            assert!(!totals.income.is_negative());
            assert_eq!(
                totals.balance.value(),
                totals.income.value() - totals.expense.value()
            );
        }
    }

    #[test]
    fn test_filter_february() {
        let transactions = seed_transactions();
        let february = filter_by_date_range(&transactions, date(2024, 2, 1), date(2024, 2, 29));
        let rows: Vec<usize> = crate::test::rows_of(&february);
        assert_eq!(rows, vec![6, 7, 8]);
        assert!(february.iter().all(|t| t.date().month() == 2));
        let totals = aggregate(&february);
        assert_eq!(totals.income, amount("1500"));
        assert_eq!(totals.expense, amount("180.75"));
    }

    #[test]
    fn test_filter_single_day() {
        let transactions = seed_transactions();
        let day = date(2024, 1, 6);
        let found = filter_by_date_range(&transactions, day, day);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].description(), "Tacos");
        assert!(filter_by_date_range(&transactions, date(2024, 1, 7), date(2024, 1, 7)).is_empty());
    }

    #[test]
    fn test_filter_reversed_range_is_empty() {
        let transactions = seed_transactions();
        assert!(filter_by_date_range(&transactions, date(2024, 3, 1), date(2024, 1, 1)).is_empty());
    }

    #[test]
    fn test_filter_current_month() {
        let transactions = seed_transactions();
        let march = filter_by_current_month(&transactions, date(2024, 3, 15));
        let descriptions: Vec<&str> = march.iter().map(|t| t.description()).collect();
        assert_eq!(descriptions, vec!["Café y pan", "Cumpleaños"]);
        assert!(filter_by_current_month(&transactions, date(2024, 4, 30)).is_empty());
    }

    #[test]
    fn test_filter_apply() {
        let transactions = seed_transactions();
        assert_eq!(Filter::All.apply(&transactions), transactions);
        let range = DateRange::new(date(2024, 1, 31), date(2024, 2, 1));
        assert_eq!(Filter::Range(range).apply(&transactions).len(), 2);
        let month = Filter::CurrentMonth {
            today: date(2024, 1, 31),
        };
        assert_eq!(month.apply(&transactions).len(), 4);
        assert_eq!(
            month.to_string(),
            "mes actual (2024-01-01 a 2024-01-31)"
        );
    }

    #[test]
    fn test_date_bounds() {
        assert_eq!(date_bounds(&[]), None);
        assert_eq!(
            date_bounds(&seed_transactions()),
            Some(DateRange::new(date(2024, 1, 5), date(2024, 3, 31)))
        );
    }
}
