//! # DWP Converter - Main Application Entry Point
//!
//! HTTP service that accepts a JSON manifest plus sample files, packs them
//! into a `DWPv1` binary container and returns a ZIP bundle holding the
//! container, the manifest and the original samples.
//!
//! ## Application Architecture:
//! - **container**: The `DWPv1` codec (pure encode/decode, no I/O)
//! - **bundle**: ZIP packaging of a converted program
//! - **config**: Application configuration (TOML file + environment variables)
//! - **state**: Shared configuration and metrics
//! - **health**: Health and metrics endpoints
//! - **middleware**: Request logging and metrics collection
//! - **handlers**: Upload, inspect and config endpoints
//! - **error**: Error types and their HTTP responses

mod bundle;
mod config;
mod container;
mod error;
mod handlers;
mod health;
mod middleware;
mod state;

use crate::config::AppConfig;
use crate::state::AppState;
use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Set by the signal handlers when the server should shut down.
static SHUTDOWN_SIGNAL: AtomicBool = AtomicBool::new(false);

/// ## Startup sequence:
/// 1. Load `.env`, initialize tracing
/// 2. Load and validate configuration
/// 3. Build shared state and the HTTP server
/// 4. Run until the server exits or a shutdown signal arrives
#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded: {}:{}", config.server.host, config.server.port);

    let app_state = AppState::new(config.clone());
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    // The extractor limit is fixed at startup; the handler re-checks the
    // runtime value, so lowering it via PUT /config still takes effect.
    let inspect_payload_limit = config.upload.max_container_bytes;

    setup_signal_handlers();

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .expose_headers(vec![middleware::logging::REQUEST_ID_HEADER])
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(middleware::MetricsMiddleware)
            .wrap(middleware::RequestLogging)
            .route("/api/convert", web::post().to(handlers::convert))
            .service(
                web::scope("/api/v1")
                    .route("/health", web::get().to(health::health_check))
                    .route("/metrics", web::get().to(health::detailed_metrics))
                    .route("/config", web::get().to(handlers::get_config))
                    .route("/config", web::put().to(handlers::update_config))
                    .service(
                        web::resource("/inspect")
                            .app_data(web::PayloadConfig::new(inspect_payload_limit))
                            .route(web::post().to(handlers::inspect_container)),
                    ),
            )
            .route("/health", web::get().to(health::health_check))
            .default_service(web::route().to(handlers::not_found))
    })
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(Err(e)) => error!("Server error: {}", e),
                Err(e) => error!("Server task error: {}", e),
                Ok(Ok(())) => {}
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Initialize tracing.
///
/// `RUST_LOG` controls filtering; without it the default is
/// `dwp_converter=debug,actix_web=info`.
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dwp_converter=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    Ok(())
}

/// Listen for SIGTERM/SIGINT and raise the shutdown flag.
fn setup_signal_handlers() {
    tokio::spawn(async {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let (mut sigterm, mut sigint) =
                match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                    (Ok(term), Ok(int)) => (term, int),
                    (Err(e), _) | (_, Err(e)) => {
                        warn!("Failed to install signal handlers: {}", e);
                        return;
                    }
                };

            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM"),
                _ = sigint.recv() => info!("Received SIGINT"),
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl+C: {}", e);
                return;
            }
            info!("Received Ctrl+C");
        }

        SHUTDOWN_SIGNAL.store(true, Ordering::SeqCst);
    });
}

async fn wait_for_shutdown() {
    while !SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    }
}
