use billsnap_core::api::{create_router, AppState, RemoteMirror};
use billsnap_core::capture::{JpegImageEditor, LocalFileStore};
use billsnap_core::config::AppConfig;
use billsnap_core::db;
use billsnap_core::store::BillCollection;
use billsnap_core::sync::{spawn_initial_load, PgRemoteBills, RemoteBills};
use dotenv::dotenv;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Connects the remote mirror and starts the initial load.
///
/// Any failure is logged and the server keeps running with local bills only.
async fn connect_remote(
    config: &AppConfig,
    bills: &Arc<RwLock<BillCollection>>,
) -> Option<RemoteMirror> {
    let remote = config.remote.as_ref()?;

    let pool = match db::create_pool(&remote.database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Remote bill database unavailable: {}", e);
            return None;
        }
    };
    if let Err(e) = db::ensure_schema(&pool).await {
        error!("Could not prepare remote bills table: {}", e);
        return None;
    }

    let source: Arc<dyn RemoteBills> = Arc::new(PgRemoteBills::new(pool));
    spawn_initial_load(source.clone(), remote.merchant_id.clone(), bills.clone());

    Some(RemoteMirror {
        bills: source,
        merchant_id: remote.merchant_id.clone(),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive(LevelFilter::INFO.into());

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    info!("Starting BillSnap Core Server...");

    let mut config = AppConfig::from_env()?;

    // Image directories, made absolute so stored URIs stay valid
    config.prepare_storage().await?;
    info!(
        "Bill images stored in {}, cache in {}",
        config.storage_dir.display(),
        config.cache_dir.display()
    );

    let bills = Arc::new(RwLock::new(BillCollection::new()));
    let mut state = AppState::new(
        bills.clone(),
        config.monthly_budget,
        Arc::new(LocalFileStore::new(&config.storage_dir, &config.cache_dir)),
        Arc::new(JpegImageEditor::new(&config.cache_dir)),
    );

    match connect_remote(&config, &bills).await {
        Some(remote) => {
            info!("Remote sync enabled for merchant {}", remote.merchant_id);
            state = state.with_remote(remote);
        }
        None if config.remote.is_none() => info!("Remote sync disabled"),
        None => warn!("Remote sync configured but not connected"),
    }

    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", address, e))?;

    info!("Server listening on {}", address);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
