//! Maintenance daemon: expires stale marriage requests and aged-out chat
//! rooms on an interval. Both sweeps are idempotent, so overlapping runs and
//! restarts are harmless.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use rishta_db::Database;
use rishta_engine::{ChatManager, EngineConfig, RequestManager};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rishta=info".into()),
        )
        .init();

    // Config
    let db_path = std::env::var("RISHTA_DB_PATH").unwrap_or_else(|_| "rishta.db".into());
    let interval_secs: u64 = std::env::var("RISHTA_SWEEP_INTERVAL_SECS")
        .unwrap_or_else(|_| "300".into())
        .parse()?;
    let config = EngineConfig::from_env();

    let db = Arc::new(Database::open(&PathBuf::from(&db_path))?);
    let requests = RequestManager::new(db.clone(), config.clone());
    let chat = ChatManager::new(db, config);

    info!(
        "Sweeper running against {} every {}s",
        db_path, interval_secs
    );
    run_sweep_loop(requests, chat, interval_secs).await;
    Ok(())
}

async fn run_sweep_loop(requests: RequestManager, chat: ChatManager, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;
        let now = Utc::now();

        match requests.sweep_expired(now) {
            Ok(count) if count > 0 => info!("Sweep: expired {} marriage requests", count),
            Ok(_) => {}
            Err(e) => warn!("Request sweep error: {}", e),
        }

        match chat.sweep_expired(now) {
            Ok(count) if count > 0 => info!("Sweep: expired {} chat rooms", count),
            Ok(_) => {}
            Err(e) => warn!("Room sweep error: {}", e),
        }
    }
}
