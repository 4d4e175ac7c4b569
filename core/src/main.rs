use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::net::TcpListener;
use tokio::signal;

use murk_core::api::{ApiState, create_router};
use murk_core::clock::{Clock, SystemClock};
use murk_core::config::{MurkConfig, expand_home};
use murk_core::error::PoolError;
use murk_core::pool::{PoolManager, PrivacyPool};
use murk_core::relayer::Relayer;
use murk_core::storage::{LedgerStore, MemoryStore, RocksDbStore};
use murk_keypair::Keypair;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    if std::env::args().nth(1).as_deref() == Some("--sample-config") {
        println!("{}", MurkConfig::generate_sample());
        return Ok(());
    }

    let config = MurkConfig::load()?;

    info!("============================================");
    info!("            MURK NODE v{}             ", env!("CARGO_PKG_VERSION"));
    info!("============================================");
    info!("DB path           : {}", config.database.path);
    info!("Ephemeral ledger  : {}", config.database.ephemeral);
    info!("API               : {}:{}", config.api.host, config.api.port);
    info!("Settlement fee    : {} lamports", config.relayer.settlement_fee);
    info!("Operator API      : {}", config.features.operator_api);
    info!("Dev mode          : {}", config.features.dev_mode);
    info!("============================================");

    // Open ledger
    let store: Arc<dyn LedgerStore> = if config.database.ephemeral {
        warn!("Using in-memory ledger, state is lost on shutdown");
        Arc::new(MemoryStore::new())
    } else {
        let db = RocksDbStore::open(&config.database.path)?;
        info!("Database opened at {}", config.database.path);
        Arc::new(db)
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let pool = PoolManager::new(
        PrivacyPool::new(store, clock.clone()).with_settlement_fee(config.relayer.settlement_fee),
    );

    // Authority used to initialize a fresh pool. Operator calls are signed
    // by the pool authority itself, so the node never signs on their behalf.
    let authority = match &config.operator.authority_keypair_path {
        Some(path) => {
            let path = expand_home(path);
            let keypair = Keypair::from_file(&path).with_context(|| {
                format!("failed to load authority keypair from {}", path.display())
            })?;
            Some(keypair.account_id())
        }
        None => None,
    };

    match pool.stats().await {
        Ok(stats) => {
            info!(
                "Pool loaded: seq {}, {} deposits, {} withdrawals, vault {} lamports",
                stats.aggregate.sequence,
                stats.aggregate.deposit_count,
                stats.aggregate.withdraw_count,
                stats.vault_balance
            );
            if let Some(a) = authority.filter(|a| *a != stats.aggregate.authority) {
                warn!(
                    "Configured authority {} differs from the pool authority {}",
                    a, stats.aggregate.authority
                );
            }
        }
        Err(PoolError::PoolNotInitialized) => match authority {
            Some(a) => {
                pool.init_pool(a).await?;
            }
            None => warn!("Pool not initialized and no authority configured"),
        },
        Err(e) => return Err(e.into()),
    }

    let relayer_path = config
        .relayer
        .keypair_path
        .as_deref()
        .map(|p| expand_home(p).to_string_lossy().into_owned());
    let relayer = Arc::new(Relayer::from_keypair_path(relayer_path.as_deref())?);

    let api_state = ApiState {
        pool,
        relayer,
        clock,
        dev_mode: config.features.dev_mode,
        operator_api: config.features.operator_api,
        start_time: std::time::Instant::now(),
    };

    let router = create_router(api_state);
    let addr: SocketAddr = format!("{}:{}", config.api.host, config.api.port)
        .parse()
        .context("invalid API host/port")?;
    let listener = TcpListener::bind(addr).await?;

    info!("============================================");
    info!("  Murk node is ready!");
    info!("  API: http://{}", addr);
    info!("============================================");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    info!("Murk node stopped");
    Ok(())
}
