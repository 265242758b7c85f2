mod models;
mod handlers;
mod routes;
mod docs;
mod config;
mod db;
mod websocket;
mod services;
mod clients;
mod auth;
mod state;

use clients::app_service_client::AppServiceClient;
use config::Config;
use db::{DocumentStore, MemoryDocumentStore, PgDocumentStore};
use routes::create_app;
use services::session_service::{HttpSessionDirectory, SessionDirectory, StaticSessionDirectory};
use services::sweeper_service::spawn_sweeper;
use state::AppState;
use std::panic;
use std::sync::Arc;
use tracing::{info, error, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

async fn open_store(config: &Config) -> Result<Arc<dyn DocumentStore>, String> {
    match &config.db_url {
        Some(db_url) => {
            let store = PgDocumentStore::connect(db_url)
                .await
                .map_err(|e| format!("Failed to initialize database: {}", e))?;
            store
                .run_migrations()
                .await
                .map_err(|e| format!("Failed to run migrations: {}", e))?;
            info!("Database initialized successfully");
            Ok(Arc::new(store))
        }
        None => {
            warn!("No database URL configured - documents are kept in memory only");
            Ok(Arc::new(MemoryDocumentStore::new()))
        }
    }
}

fn open_session_directory(config: &Config) -> Result<Arc<dyn SessionDirectory>, String> {
    match (&config.app_service_url, &config.cloud_auth_jwt_secret) {
        (Some(url), Some(secret)) => {
            let client = AppServiceClient::new(url.clone(), secret.clone(), config.cloud_service_name.clone())
                .map_err(|e| format!("Failed to create app service client: {}", e))?;
            info!("Validating sessions against {}", url);
            Ok(Arc::new(HttpSessionDirectory::new(client, config.session_cache_ttl())))
        }
        _ if config.is_development() => {
            warn!("No app service configured - every session is accepted (development only)");
            Ok(Arc::new(StaticSessionDirectory::open()))
        }
        _ => Err("APP_SERVICE_URL and CLOUD_AUTH_JWT_SECRET are required outside development".to_string()),
    }
}

#[tokio::main]
async fn main() {

    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to info level, but allow debug for our app
            "session_doc=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting server...");

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });

    if config.cloud_auth_jwt_secret.is_none() {
        warn!("CLOUD_AUTH_JWT_SECRET not set - every authenticated request will fail");
    }

    let store = match open_store(&config).await {
        Ok(store) => store,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    let sessions = match open_session_directory(&config) {
        Ok(sessions) => sessions,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let _sweeper = spawn_sweeper(store.clone(), config.sweep_interval());

    let address = config.server_address();
    let state = Arc::new(AppState::new(config, store, sessions));
    let app = create_app(state);

    // Start the HTTP/WebSocket server
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", address));

    info!("🚀 Server running on http://{}", address);
    info!("📡 WebSocket available at ws://{}/api/v1/documents/{{document_id}}/ws", address);
    info!("📚 Swagger UI available at http://{}/swagger", address);

    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
