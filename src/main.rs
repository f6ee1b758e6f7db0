mod auth;
mod config;
mod docs;
mod handlers;
mod models;
mod routes;
mod services;
mod state;
mod utils;
mod websocket;
mod ws;

use config::Config;
use services::auth_service::JwtIdentityResolver;
use services::file_service::FileStore;
use services::project_service::ProjectManifest;
use state::AppState;
use std::panic;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() {

    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Load configuration; the outcome is logged once tracing is up
    let loaded = Config::load();
    let config = loaded.as_ref().cloned().unwrap_or_default();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Debug for our app, configured level for the rest
            config.default_log_filter().into()
        }))
        .init();

    info!("Starting server...");
    match loaded {
        Ok(_) => info!("✅ Configuration loaded successfully"),
        Err(e) => {
            error!("❌ Failed to load configuration: {}", e);
            warn!("Using default configuration");
        }
    }

    if config.is_development() {
        info!("Running in development mode");
    }

    // Prepare the projects root
    let files = match FileStore::new(&config.projects_dir) {
        Ok(files) => files,
        Err(e) => {
            error!("Failed to open projects directory '{}': {}", config.projects_dir, e);
            std::process::exit(1);
        }
    };
    info!("Serving projects from {}", files.root().display());

    // Load the project manifest
    let manifest = ProjectManifest::load(&config.projects_manifest).unwrap_or_else(|e| {
        error!("{}", e);
        warn!("Continuing without projects");
        ProjectManifest::default()
    });

    let identities = JwtIdentityResolver::new(config.auth_jwt_secret.clone(), config.identity_cache_ttl());
    let address = config.server_address();
    let state = Arc::new(AppState::new(config, files, Arc::new(identities), Arc::new(manifest)));
    let app_routes = routes::create_router(state);

    // Start the HTTP server
    let listener = match tokio::net::TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", address, e);
            std::process::exit(1);
        }
    };

    info!("🚀 Server running on http://{}", address);
    info!("📡 WebSocket available at ws://{}/ws", address);
    info!("📚 Swagger UI available at http://{}/swagger", address);

    if let Err(e) = axum::serve(listener, app_routes).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
