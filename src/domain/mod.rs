pub mod account;
pub mod transaction;

pub use account::{Account, NewAccount};
pub use transaction::{TransactionKind, TransactionRecord, TransactionStatus};
