mod config;
mod dto;
mod gemini;
mod handlers;
mod models;
mod repository;
mod service;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use gemini::GeminiClient;
use handlers::AppState;
use repository::Repository;
use service::NoteService;

#[tokio::main]
async fn main() {
    // Optional .env file, read first so RUST_LOG can come from it too.
    // Values already in the environment take precedence.
    let dotenv_path = dotenv::dotenv().ok();

    // Log setup
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Some(path) = dotenv_path {
        tracing::info!("Loaded environment from {}", path.display());
    }

    let cfg = config::load_config().unwrap_or_else(|e| {
        tracing::error!("Failed to load config: {e}");
        panic!("failed to locate or load config: {e}");
    });
    tracing::info!("Successfully loaded notes-analyzer config");

    // Repository creation and migration
    let mut repo = Repository::open(&cfg.database_path).unwrap_or_else(|e| {
        tracing::error!("Failed to open database: {e}");
        panic!("failed to open database: {e}");
    });

    repo.migrate().unwrap_or_else(|e| {
        tracing::error!("Failed to migrate database: {e}");
        panic!("failed to migrate database: {e}");
    });

    let repo_ptr = Arc::new(std::sync::Mutex::new(repo));

    // Gemini client
    tracing::info!("Configured Gemini: {:?}", cfg.gemini);
    let gemini = GeminiClient::new(&cfg.gemini).unwrap_or_else(|e| {
        tracing::error!("Failed to initialize Gemini client: {e}");
        panic!("failed to initialize Gemini client: {e}");
    });

    let state = Arc::new(AppState {
        notes: NoteService::new(repo_ptr),
        gemini,
    });

    let router = handlers::router(state, &cfg.uploads_dir);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", cfg.port))
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to bind port {}: {e}", cfg.port);
            panic!("failed to bind port {}: {e}", cfg.port);
        });

    match listener.local_addr() {
        Ok(addr) => tracing::info!("REST server starting, listening on {}", addr),
        Err(e) => tracing::warn!("Could not read listener address: {e}"),
    }
    tracing::info!("Serving uploads from {}", cfg.uploads_dir.display());

    axum::serve(listener, router)
        .await
        .expect("failed to start server");
}
