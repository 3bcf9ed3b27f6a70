//! Main entry point for the Service Gateway

use service_gateway::{
    api,
    config::{Settings, StoreBackend},
    store::{GatewayStore, MemoryStore, PostgresStore},
    AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = Settings::load()?;
    settings.validate()?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    let registry = tracing_subscriber::registry().with(filter);
    if settings.logging.format == "json" {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }

    info!(
        "Loaded configuration: server={}:{}",
        settings.server.host, settings.server.port
    );

    // Open the store once; every component shares this handle
    let store: Arc<dyn GatewayStore> = match settings.database.backend {
        StoreBackend::Postgres => {
            let pg = PostgresStore::connect(&settings.database).await?;
            if settings.database.run_migrations {
                pg.migrate().await?;
            }
            Arc::new(pg)
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store; audit log and registry are not durable");
            Arc::new(MemoryStore::new())
        }
    };

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let app_state = Arc::new(AppState::new(settings, store.clone())?);

    app_state.registry.bootstrap(&app_state.settings).await;

    // Build the router
    let app = api::create_router(app_state.clone());

    info!("{} listening on {}", app_state.settings.server.display_name, addr);

    // Start the server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    store.close().await;
    info!("Gateway stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received, starting graceful shutdown");
}
