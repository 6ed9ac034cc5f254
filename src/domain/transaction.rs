//! Transaction domain entity.
//! Framework-agnostic representation of one ledger entry and its status machine.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Payment,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdrawal => "withdrawal",
            TransactionKind::Payment => "payment",
        }
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(TransactionKind::Deposit),
            "withdrawal" => Ok(TransactionKind::Withdrawal),
            "payment" => Ok(TransactionKind::Payment),
            other => Err(format!("unknown transaction kind '{}'", other)),
        }
    }
}

/// Lifecycle of a ledger entry. `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Completed | TransactionStatus::Failed)
    }

    /// Whether moving from `self` to `next` changes the record.
    /// Re-applying the current status and touching a terminal record are both no-ops.
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        *self == TransactionStatus::Pending && next.is_terminal()
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "completed" => Ok(TransactionStatus::Completed),
            "failed" => Ok(TransactionStatus::Failed),
            other => Err(format!("unknown transaction status '{}'", other)),
        }
    }
}

/// One deposit attempt as recorded in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub transaction_id: Uuid,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: BigDecimal,
    pub currency: String,
    pub status: TransactionStatus,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// A pending top-up correlated with a processor payment id.
    pub fn pending_deposit(
        user_id: String,
        amount_minor: i64,
        currency: String,
        payment_id: String,
    ) -> Self {
        let now = Utc::now();
        let amount = minor_to_major(amount_minor);
        Self {
            transaction_id: Uuid::new_v4(),
            description: top_up_description(&amount, &currency),
            user_id,
            kind: TransactionKind::Deposit,
            amount,
            currency,
            status: TransactionStatus::Pending,
            payment_id: Some(payment_id),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Converts an amount in minor units (cents, grosze) to a two-decimal major amount.
pub fn minor_to_major(amount_minor: i64) -> BigDecimal {
    BigDecimal::new(amount_minor.into(), 2)
}

pub fn top_up_description(amount: &BigDecimal, currency: &str) -> String {
    format!("Wallet top-up - {} {}", amount.with_scale(2), currency)
}
