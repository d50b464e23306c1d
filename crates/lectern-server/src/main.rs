use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lectern_db::open_stores;
use lectern_server::{routes, AppState, Config};

#[tokio::main]
async fn main() {
    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            eprintln!(
                "Optional: LECTERN_LISTEN_ADDR, LECTERN_DATA_DIR, LECTERN_RECONCILE_INTERVAL_SECS, \
                 LECTERN_MIGRATE_ON_START, LECTERN_CORS_ORIGINS"
            );
            std::process::exit(1);
        }
    };

    tracing::info!("Starting Lectern server");
    tracing::info!("Listen address: {}", config.listen_addr);
    tracing::info!("Data directory: {}", config.data_dir.display());

    // Open the three stores
    let stores = match open_stores(&config.data_dir) {
        Ok(stores) => stores,
        Err(e) => {
            eprintln!("Database error: {}", e);
            std::process::exit(1);
        }
    };

    let state = AppState::new(stores);

    if config.migrate_on_start {
        let migration = state.migration.clone();
        match tokio::task::spawn_blocking(move || migration.migrate_all()).await {
            Ok(Ok(report)) => tracing::info!("Startup migration finished: {:?}", report),
            Ok(Err(e)) => tracing::error!("Startup migration failed: {}", e),
            Err(e) => tracing::error!("Startup migration aborted: {}", e),
        }
    }

    // Repair catalog ratings left behind by failed cross-store writes
    let reconciler = state.reconciler.clone();
    let interval = Duration::from_secs(config.reconcile_interval_secs);
    tokio::spawn(async move {
        reconciler.run(interval).await;
    });

    // Build router
    let mut app = routes::create_router(state);
    if let Some(cors) = routes::cors_layer(&config.cors_origins) {
        app = app.layer(cors);
    }

    // Start server
    let listener = match tokio::net::TcpListener::bind(&config.listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", config.listen_addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server running at http://{}", config.listen_addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
