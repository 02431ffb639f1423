use std::process::ExitCode;
use std::sync::Arc;

use friends_api::config::Config;
use friends_api::databases::SqliteDatabase;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "friends_api=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(?config, "Configuration loaded");

    // the storage handle is owned here and released after the server drains
    let db = match SqliteDatabase::open(&config.database, config.pool_size) {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Error connecting to SQLite: {}", e);
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("Connected to SQLite database");

    let app = friends_api::app(Arc::new(db.clone()));

    let addr = config.bind_addr();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("Server is running on http://{}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    if let Err(e) = &served {
        tracing::error!("Server error: {}", e);
    }

    let closed = db.close().await;
    if let Err(e) = &closed {
        tracing::error!("Error closing SQLite connection: {}", e);
    }

    if served.is_ok() && closed.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}
