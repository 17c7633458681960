use edu_portal_gate::{AccessGate, AppState, config::{AppConfig, Env}, create_router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, sets up logging, builds the gate and serves it.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load().unwrap_or_else(|e| panic!("FATAL: {e}"));

    // 2. Logging: RUST_LOG wins, otherwise sensible local defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "edu_portal_gate=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // JSON lines for the log aggregator.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Gate starting in {:?} mode", config.env);

    // 3. Gate assembly. Key and route table are fixed from here on.
    let gate = AccessGate::from_config(&config).unwrap_or_else(|e| panic!("FATAL: {e}"));
    tracing::info!(
        cookie = %gate.cookie_name(),
        policy = ?gate.routes().unmatched,
        "Access gate ready"
    );

    let app_state = AppState {
        gate: Arc::new(gate),
        config: config.clone(),
    };

    // 4. Router and server startup
    let app = create_router(app_state);

    let listener = TcpListener::bind(config.bind_addr.as_str())
        .await
        .unwrap_or_else(|e| panic!("FATAL: cannot bind {}: {e}", config.bind_addr));

    tracing::info!("Listening on {}", config.bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server stopped: {e}");
    }
}
