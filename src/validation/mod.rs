use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fmt;

use crate::domain::NewAccount;

pub const LOGIN_MAX_LEN: usize = 64;
pub const EMAIL_MAX_LEN: usize = 254;
pub const SALT_MAX_LEN: usize = 512;
pub const PASSWORD_HASH_MAX_LEN: usize = 1024;
pub const ENCRYPTED_BALANCE_MAX_LEN: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

pub fn sanitize_string(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn validate_required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }

    Ok(())
}

pub fn validate_max_len(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    if value.len() > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }

    Ok(())
}

pub fn validate_email(email: &str) -> ValidationResult {
    validate_required("email", email)?;
    validate_max_len("email", email, EMAIL_MAX_LEN)?;

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::new("email", "must contain '@'"));
    };
    if local.is_empty() || !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.')
    {
        return Err(ValidationError::new("email", "is not a valid address"));
    }

    Ok(())
}

pub fn validate_positive_amount(amount_minor: i64) -> ValidationResult {
    if amount_minor <= 0 {
        return Err(ValidationError::new("amount", "must be greater than zero"));
    }

    Ok(())
}

/// The balance is client-side ciphertext; only its transport encoding is checked.
pub fn validate_encrypted_balance(value: &str) -> ValidationResult {
    validate_required("encrypted_balance", value)?;
    validate_max_len("encrypted_balance", value, ENCRYPTED_BALANCE_MAX_LEN)?;

    if STANDARD.decode(value.trim()).is_err() {
        return Err(ValidationError::new("encrypted_balance", "must be base64"));
    }

    Ok(())
}

/// Validates registration fields. Salt and hash are produced by the client and
/// stored verbatim.
pub fn validate_registration(
    login: &str,
    email: &str,
    salt: &str,
    password_hash: &str,
) -> Result<NewAccount, ValidationError> {
    let login = sanitize_string(login);
    let email = email.trim().to_string();

    validate_required("login", &login)?;
    validate_max_len("login", &login, LOGIN_MAX_LEN)?;
    validate_email(&email)?;
    validate_required("salt", salt)?;
    validate_max_len("salt", salt, SALT_MAX_LEN)?;
    validate_required("password_hash", password_hash)?;
    validate_max_len("password_hash", password_hash, PASSWORD_HASH_MAX_LEN)?;

    Ok(NewAccount {
        login,
        email,
        salt: salt.to_string(),
        password_hash: password_hash.to_string(),
    })
}
