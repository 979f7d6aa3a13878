use clap::Parser;
use miette::{IntoDiagnostic, Result};
use pinecoin_upgrades::application::initiator::PaymentInitiator;
use pinecoin_upgrades::application::reconciler::PaymentReconciler;
use pinecoin_upgrades::application::status::StatusPoller;
use pinecoin_upgrades::config::AppConfig;
use pinecoin_upgrades::domain::ports::{GatewayRef, LedgerRef, ProfilesRef};
use pinecoin_upgrades::infrastructure::in_memory::{InMemoryLedger, InMemoryProfileStore};
use pinecoin_upgrades::infrastructure::payhero::{PayHeroClient, UnconfiguredGateway};
use pinecoin_upgrades::interfaces::http::{router, AppState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:8080")]
    listen: SocketAddr,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// JSON config file overriding the merchant, catalog and gateway defaults
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load(path).into_diagnostic()?,
        None => AppConfig::default(),
    };

    let (ledger, profiles) = build_stores(cli.db_path)?;
    let gateway = build_gateway(&config);

    let catalog = Arc::new(config.catalog.clone());
    let state = AppState {
        initiator: Arc::new(PaymentInitiator::new(
            ledger.clone(),
            gateway,
            catalog.clone(),
            config.gateway.callback_url.clone(),
        )),
        reconciler: Arc::new(PaymentReconciler::new(
            ledger.clone(),
            profiles,
            catalog,
            config.merchant.clone(),
        )),
        poller: Arc::new(StatusPoller::new(ledger)),
    };

    let listener = tokio::net::TcpListener::bind(cli.listen)
        .await
        .into_diagnostic()?;
    info!(listen = %cli.listen, "upgrade service listening");
    axum::serve(listener, router(state)).await.into_diagnostic()?;

    Ok(())
}

#[cfg(feature = "storage-rocksdb")]
fn build_stores(db_path: Option<PathBuf>) -> Result<(LedgerRef, ProfilesRef)> {
    use pinecoin_upgrades::infrastructure::rocksdb::RocksDbStore;

    match db_path {
        Some(path) => {
            let store = RocksDbStore::open(path).into_diagnostic()?;
            let ledger: LedgerRef = Arc::new(store.clone());
            let profiles: ProfilesRef = Arc::new(store);
            Ok((ledger, profiles))
        }
        None => {
            let ledger: LedgerRef = Arc::new(InMemoryLedger::new());
            let profiles: ProfilesRef = Arc::new(InMemoryProfileStore::new());
            Ok((ledger, profiles))
        }
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn build_stores(db_path: Option<PathBuf>) -> Result<(LedgerRef, ProfilesRef)> {
    if db_path.is_some() {
        miette::bail!("--db-path requires the storage-rocksdb feature");
    }
    let ledger: LedgerRef = Arc::new(InMemoryLedger::new());
    let profiles: ProfilesRef = Arc::new(InMemoryProfileStore::new());
    Ok((ledger, profiles))
}

fn build_gateway(config: &AppConfig) -> GatewayRef {
    let api_key = std::env::var("PAYHERO_API_KEY").ok();
    let channel_id = std::env::var("PAYHERO_CHANNEL_ID")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok());

    match (api_key, channel_id) {
        (Some(api_key), Some(channel_id)) => {
            let gateway: GatewayRef = Arc::new(PayHeroClient::new(
                config.gateway.clone(),
                api_key,
                channel_id,
            ));
            gateway
        }
        _ => {
            warn!("PAYHERO_API_KEY / PAYHERO_CHANNEL_ID not set; push payments disabled");
            Arc::new(UnconfiguredGateway)
        }
    }
}
