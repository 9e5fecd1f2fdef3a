// ./api/src/main.rs
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use api::{AppConfig, AppState, build_router, open_store};
use application::ResourceService;

// Application entry point
#[tokio::main]
async fn main() {
    // A missing .env file is fine; real environment variables still apply.
    let dotenv_loaded = dotenvy::dotenv().is_ok();

    // --- Logger Initialization ---
    let filter: EnvFilter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
    info!(dotenv_loaded, "Logger initialized successfully.");

    let config = AppConfig::from_env();
    info!(
        resource = %config.profile.resource,
        backend = %config.backend,
        seed_file = %config.seed_file.display(),
        replace_echo = %config.replace_echo,
        "Configuration loaded."
    );

    // --- Dependency Injection ---
    // 1. Create the store selected by configuration and seed it
    let store = match open_store(&config).await {
        Ok(store) => store,
        Err(e) => {
            error!(backend = %config.backend, "Failed to initialize storage backend: {}", e);
            std::process::exit(1);
        }
    };

    // 2. Create the resource service, injecting the store
    let service = Arc::new(ResourceService::new(
        config.profile.resource.clone(),
        store,
        config.replace_echo,
    ));
    info!("Application service initialized.");

    // 3. Create the application state and routes
    let app = build_router(AppState::new(service, config.profile.clone()));
    info!("API routes configured.");

    // --- Server Startup ---
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Server starting on {}", addr);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => {
            info!("Server listening on {}", addr);
            listener
        }
        Err(e) => {
            error!("Failed to bind to address {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app.into_make_service()).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
