use anyhow::{Context, Result};
use chrono::Utc;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use tasklane::backend::factory::create_backend;
use tasklane::backend::{AuthBackend, Backend};
use tasklane::config::Config;
use tasklane::constants::ERROR_NO_API_TOKEN;
use tasklane::logger::Logger;
use tasklane::network::{probe_loop, Connectivity};
use tasklane::notify::LogNotifier;
use tasklane::session::{Session, SessionManager};
use tasklane::storage::{DurableStore, LocalStorage};
use tasklane::sync::SyncService;
use tasklane::sync_coordinator::SyncCoordinator;
use tasklane::utils::datetime::format_last_sync;

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::args().any(|arg| arg == "--generate-config") {
        let path = Config::get_default_config_path()?;
        return Config::generate_default_config(&path);
    }

    let config = Config::load()?;
    Logger::init(&config.logging)?;

    let storage: Arc<dyn DurableStore> = Arc::new(LocalStorage::from_config(&config.storage).await?);
    let backend = create_backend(&config.remote)?;
    let session = SessionManager::new(storage.clone(), Some(backend.clone() as Arc<dyn AuthBackend>));

    if session.restore().await?.is_none() {
        // No stored session: fall back to a pre-issued token
        let Ok(token) = std::env::var(&config.remote.api_token_env) else {
            eprintln!("{}", ERROR_NO_API_TOKEN);
            eprintln!("\n💡 To use this app:");
            eprintln!("1. Get a bearer token from your task service");
            eprintln!("2. Set it as environment variable: export {}=your_token_here", config.remote.api_token_env);
            eprintln!("3. Run the app again");
            return Ok(());
        };
        session.sign_in(Session::new("api-token", token)).await?;
    }

    let connectivity = Connectivity::new(backend.ping().await.is_ok());
    if !connectivity.is_online() {
        warn!("📴 {} is unreachable, starting offline", backend.base_url());
    }

    let sync_service = SyncService::new(
        backend.clone(),
        storage,
        session.clone(),
        connectivity.clone(),
        Arc::new(LogNotifier),
    );
    sync_service.load().await.context("Failed to load local tasks")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let probe = tokio::spawn(probe_loop(
        connectivity.clone(),
        backend.clone(),
        Duration::from_secs(config.remote.probe_interval_secs),
        shutdown_rx.clone(),
    ));
    let coordinator = SyncCoordinator::from_config(sync_service.clone(), session, connectivity, &config.sync);
    let coordinator = tokio::spawn(coordinator.run(shutdown_rx));

    info!(
        "🚀 Tasklane running against {} ({}), press Ctrl-C to stop",
        backend.base_url(),
        backend.backend_type()
    );
    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;

    let _ = shutdown_tx.send(true);
    let _ = tokio::join!(probe, coordinator);

    let status = sync_service.status();
    println!(
        "📋 {} tasks, {} pending sync, last sync: {}",
        sync_service.tasks().await.len(),
        status.pending_count,
        format_last_sync(status.last_sync_at, Utc::now())
    );
    Ok(())
}
