use std::net::SocketAddr;

use tokio::signal;
use tracing_subscriber::EnvFilter;

use osd_signoff::config::Config;
use osd_signoff::state::AppState;
use osd_signoff::storage::DirectoryStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let config = Config::from_env().expect("Failed to load configuration");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(&config.log_level)
        }))
        .init();

    tracing::info!("Starting OSD sign-off server");

    let addr = SocketAddr::new(config.host, config.port);

    let store = DirectoryStore::new(config.out_dir.clone());
    store
        .ensure_dir()
        .await
        .expect("Failed to create output directory");
    tracing::info!("Writing documents to {}", store.dir().display());

    let state = AppState::new(config).expect("Failed to configure mail transport");

    let app = osd_signoff::build_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
