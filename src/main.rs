use clap::Parser;
use pocket_wallet_core::{
    adapters::{InMemoryAccountStore, InMemoryLedgerStore, PostgresAccountStore, PostgresLedgerStore},
    cli::{self, Cli, Commands, DbCommands, TxCommands},
    config::Config,
    create_app, db,
    domain::TransactionStatus,
    gateway::{PaymentGateway, StripeClient},
    ports::{AccountStore, LedgerStore},
    use_cases::Reconciler,
    AppState, ClientSettings,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env()?;
    init_tracing(config.json_logs);

    match cli.command {
        None => serve(config, false).await,
        Some(Commands::Serve { in_memory }) => serve(config, in_memory).await,
        Some(Commands::Tx(TxCommands::ForceComplete { tx_id })) => {
            let store = ledger_store(&config).await?;
            cli::handle_tx_force_status(&store, tx_id, TransactionStatus::Completed).await
        }
        Some(Commands::Tx(TxCommands::ForceFail { tx_id })) => {
            let store = ledger_store(&config).await?;
            cli::handle_tx_force_status(&store, tx_id, TransactionStatus::Failed).await
        }
        Some(Commands::Db(DbCommands::Migrate)) => cli::handle_db_migrate(&config).await,
        Some(Commands::Config) => cli::handle_config_validate(&config),
        Some(Commands::SignEvent { file }) => cli::handle_sign_event(&config, &file),
    }
}

fn init_tracing(json_logs: bool) {
    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn ledger_store(config: &Config) -> anyhow::Result<PostgresLedgerStore> {
    let pool = db::create_pool(config).await?;
    Ok(PostgresLedgerStore::new(pool, config.store_timeout))
}

async fn serve(config: Config, in_memory: bool) -> anyhow::Result<()> {
    config.require_stripe_secrets()?;

    let (ledger, accounts): (Arc<dyn LedgerStore>, Arc<dyn AccountStore>) = if in_memory {
        tracing::warn!("Running with in-memory stores; data is lost on exit");
        (
            Arc::new(InMemoryLedgerStore::new()),
            Arc::new(InMemoryAccountStore::new()),
        )
    } else {
        let pool = db::create_pool(&config).await?;
        db::run_migrations(&pool).await?;
        (
            Arc::new(PostgresLedgerStore::new(pool.clone(), config.store_timeout)),
            Arc::new(PostgresAccountStore::new(pool, config.store_timeout)),
        )
    };

    let stripe = StripeClient::new(config.stripe.clone(), config.currency.clone())?;
    tracing::info!(
        api_base = %config.stripe.api_base,
        currency = %config.currency,
        "Stripe client initialized"
    );
    let gateway: Arc<dyn PaymentGateway> = Arc::new(stripe);

    let reconciler = Reconciler::new(gateway, ledger, accounts.clone(), config.currency.clone());
    let app_state = AppState {
        reconciler: Arc::new(reconciler),
        accounts,
        client: ClientSettings {
            publishable_key: config.stripe.publishable_key.clone(),
            currency: config.currency.clone(),
        },
    };
    let app = create_app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
