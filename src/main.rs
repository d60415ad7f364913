//! Application entry point and server initialization
//!
//! Loads environment configuration, opens the database and serves the HTTP
//! API until a shutdown signal arrives.

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use shortlink::config::Config;
use shortlink::database::{init_db, AppState};
use shortlink::route::create_app;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if it exists
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("shortlink=debug,tower_http=debug")),
        )
        .init();

    let config = Config::from_env();

    let db = init_db(&config.database_url)?;
    info!(database = %config.database_url, "database ready");

    let addr = format!("0.0.0.0:{}", config.port);
    let public_url = config.public_url.clone();

    let app = create_app(AppState::new(db, config)).layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, %public_url, "server listening");

    // The server keeps running until it receives SIGTERM or SIGINT; open
    // connections are allowed to complete before exit.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

/// Resolves when Ctrl+C (SIGINT) or, on Unix, SIGTERM is received
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
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

    info!("shutdown signal received, stopping server");
}
