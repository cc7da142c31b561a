//! Types that represent the core data model, such as `Transaction` and `Amount`.
mod amount;
mod mapping;
mod transaction;

pub use amount::{Amount, AmountError};
pub use mapping::Mapping;
pub use transaction::{
    format_date, parse_date, Kind, SourceRow, Transaction, TransactionColumn, UNCATEGORIZED,
};
