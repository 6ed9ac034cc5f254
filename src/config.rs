use anyhow::Context;
use dotenvy::dotenv;
use std::env;
use std::time::Duration;
use url::Url;

use crate::gateway::stripe::{StripeSettings, DEFAULT_API_BASE};

/// Process-wide configuration. Built once in `main` and passed down explicitly;
/// nothing below the binary reads the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub store_timeout: Duration,
    pub currency: String,
    pub json_logs: bool,
    pub stripe: StripeSettings,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present
        Self::from_lookup(|key| env::var(key).ok().filter(|v| !v.trim().is_empty()))
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed_or = |key: &str, default: u64| -> anyhow::Result<u64> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{} must be a non-negative integer", key)),
                None => Ok(default),
            }
        };

        let api_base = lookup("STRIPE_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        Url::parse(&api_base).with_context(|| format!("STRIPE_API_BASE '{}' is not a URL", api_base))?;

        let currency = lookup("WALLET_CURRENCY")
            .unwrap_or_else(|| "PLN".to_string())
            .trim()
            .to_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            anyhow::bail!("WALLET_CURRENCY must be a three-letter ISO code, got '{}'", currency);
        }

        let stripe = StripeSettings {
            api_base,
            secret_key: lookup("STRIPE_SECRET_KEY").unwrap_or_default(),
            publishable_key: lookup("STRIPE_PUBLISHABLE_KEY").unwrap_or_default(),
            webhook_secret: lookup("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
            timeout: Duration::from_secs(parsed_or("STRIPE_TIMEOUT_SECS", 10)?.max(1)),
            webhook_tolerance: Duration::from_secs(parsed_or("WEBHOOK_TOLERANCE_SECS", 300)?),
        };

        Ok(Config {
            server_port: lookup("SERVER_PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse()
                .context("SERVER_PORT must be a port number")?,
            database_url: lookup("DATABASE_URL"),
            database_max_connections: u32::try_from(
                parsed_or("DATABASE_MAX_CONNECTIONS", 5)?.max(1),
            )
            .context("DATABASE_MAX_CONNECTIONS must fit in u32")?,
            store_timeout: Duration::from_secs(parsed_or("STORE_TIMEOUT_SECS", 5)?.max(1)),
            currency,
            json_logs: lookup("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            stripe,
        })
    }

    /// Both Stripe keys; only serving needs them.
    pub fn require_stripe_secrets(&self) -> anyhow::Result<()> {
        if self.stripe.secret_key.is_empty() {
            anyhow::bail!("STRIPE_SECRET_KEY must be set");
        }
        self.require_webhook_secret()
    }

    pub fn require_webhook_secret(&self) -> anyhow::Result<()> {
        if self.stripe.webhook_secret.is_empty() {
            anyhow::bail!("STRIPE_WEBHOOK_SECRET must be set");
        }
        Ok(())
    }

    pub fn database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set (or run `serve --in-memory`)")
    }
}

/// Keeps the first and last four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}****{}", head, tail)
}
