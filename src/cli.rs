use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::adapters::PostgresLedgerStore;
use crate::config::{mask_secret, Config};
use crate::domain::TransactionStatus;
use crate::gateway::signature::sign;
use crate::ports::LedgerStore;

#[derive(Parser)]
#[command(name = "pocket-wallet-core")]
#[command(about = "Pocket Wallet Core - wallet accounts and Stripe top-up reconciliation", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve {
        /// Keep accounts and ledger in process memory instead of Postgres
        #[arg(long)]
        in_memory: bool,
    },

    /// Transaction management commands
    #[command(subcommand)]
    Tx(TxCommands),

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),

    /// Configuration validation
    Config,

    /// Print a Stripe-Signature header for a local event file
    SignEvent {
        /// JSON event payload
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum TxCommands {
    /// Force complete a pending transaction by ID
    ForceComplete {
        /// Transaction UUID
        #[arg(value_name = "TX_ID")]
        tx_id: Uuid,
    },

    /// Force fail a pending transaction by ID
    ForceFail {
        /// Transaction UUID
        #[arg(value_name = "TX_ID")]
        tx_id: Uuid,
    },
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Run database migrations
    Migrate,
}

/// Moves a pending record to `target`. Records that are already final are
/// reported and left untouched.
pub async fn handle_tx_force_status(
    store: &PostgresLedgerStore,
    tx_id: Uuid,
    target: TransactionStatus,
) -> anyhow::Result<()> {
    let change = store.update_status(tx_id, target).await?;
    if !change.applied {
        tracing::warn!(%tx_id, status = %change.record.status, "Transaction already final");
        anyhow::bail!(
            "Transaction {} is already {}; not changed",
            tx_id,
            change.record.status
        );
    }

    tracing::info!(%tx_id, status = %change.record.status, "Transaction status forced");
    println!("✓ Transaction {} marked as {}", tx_id, change.record.status);
    Ok(())
}

pub async fn handle_db_migrate(config: &Config) -> anyhow::Result<()> {
    let pool = crate::db::create_pool(config).await?;

    tracing::info!("Running database migrations...");
    crate::db::run_migrations(&pool).await?;

    println!("✓ Database migrations completed");
    Ok(())
}

pub fn handle_config_validate(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Validating configuration...");
    config.require_stripe_secrets()?;

    println!("Configuration:");
    println!("  Server Port: {}", config.server_port);
    println!(
        "  Database URL: {}",
        config
            .database_url
            .as_deref()
            .map(mask_password)
            .unwrap_or_else(|| "(not set, in-memory only)".to_string())
    );
    println!("  Currency: {}", config.currency);
    println!("  Stripe API: {}", config.stripe.api_base);
    println!("  Stripe Secret Key: {}", mask_secret(&config.stripe.secret_key));
    println!(
        "  Stripe Webhook Secret: {}",
        mask_secret(&config.stripe.webhook_secret)
    );
    println!(
        "  Webhook Tolerance: {}s",
        config.stripe.webhook_tolerance.as_secs()
    );

    tracing::info!("Configuration is valid");
    println!("✓ Configuration is valid");

    Ok(())
}

pub fn handle_sign_event(config: &Config, file: &Path) -> anyhow::Result<()> {
    config.require_webhook_secret()?;
    let payload = std::fs::read(file)?;
    serde_json::from_slice::<serde_json::Value>(&payload)
        .map_err(|e| anyhow::anyhow!("{} is not valid JSON: {}", file.display(), e))?;

    let header = sign(
        &config.stripe.webhook_secret,
        chrono::Utc::now().timestamp(),
        &payload,
    );
    println!("{}", header);
    Ok(())
}

fn mask_password(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            if let Some(slash_pos) = url[..colon_pos].rfind("//") {
                let prefix = &url[..slash_pos + 2];
                let user = &url[slash_pos + 2..colon_pos];
                let suffix = &url[at_pos..];
                return format!("{}{}:****{}", prefix, user, suffix);
            }
        }
    }
    url.to_string()
}
