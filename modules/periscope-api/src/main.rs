mod rest;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ai_client::Claude;
use periscope_common::Config;
use periscope_engine::{ClaudeReasoner, ConnectionEngine};
use periscope_store::{migrate, PostgresStore};

use rest::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    info!("Periscope connection detection starting...");

    // Load config
    let config = Config::from_env();
    config.log_redacted();

    // Connect to Postgres and apply schema
    let pool = PgPool::connect(&config.database_url).await?;
    migrate(&pool).await?;

    let store = Arc::new(PostgresStore::new(pool));

    // Reasoning client is constructed once here and injected — no global
    // client state.
    let claude = Claude::new(&config.anthropic_api_key, &config.reasoning_model);
    let reasoner = Arc::new(
        ClaudeReasoner::new(claude)
            .with_timeout(Duration::from_secs(config.reasoning_timeout_secs)),
    );

    let engine = ConnectionEngine::new(
        store.clone(),
        store,
        reasoner,
        config.min_facts,
        Arc::new(AtomicBool::new(false)),
    );

    let state = Arc::new(AppState {
        engine,
        run_lock: AtomicBool::new(false),
    });

    let app = Router::new()
        .route("/healthz", get(rest::healthz))
        .route("/api/connections/detect", post(rest::detect_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!(addr = addr.as_str(), "Listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
