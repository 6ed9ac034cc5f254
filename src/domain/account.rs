//! Account domain entity.
//! The balance is an opaque ciphertext produced client-side; nothing here reads it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub user_id: String,
    pub login: String,
    pub email: String,
    pub salt: String,
    pub password_hash: String,
    pub encrypted_balance: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registration input after validation.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub login: String,
    pub email: String,
    pub salt: String,
    pub password_hash: String,
}

impl Account {
    pub fn new(input: NewAccount) -> Self {
        let now = Utc::now();
        Self {
            user_id: Uuid::new_v4().to_string(),
            login: input.login,
            email: input.email,
            salt: input.salt,
            password_hash: input.password_hash,
            encrypted_balance: String::new(),
            created_at: now,
            updated_at: now,
        }
    }
}
