use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chaincast_api::config::{AppConfig, ConfigError};
use chaincast_api::router::build_app_router;
use chaincast_api::state::AppState;
use chaincast_core::catalog::Catalog;
use chaincast_db::PgStateStore;
use chaincast_gemini::GeminiClient;
use chaincast_pipeline::Dispatcher;
use chaincast_twitter::TwitterClient;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    // Parsed before tracing so LOG_FORMAT can pick the formatter.
    let loaded = AppConfig::from_env();
    let json_logs = loaded.as_ref().is_ok_and(|c| c.server.json_logs);

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "chaincast_api=debug,chaincast_pipeline=debug,tower_http=debug".into()
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    let config = match loaded {
        Ok(config) => config,
        Err(ConfigError::Missing(vars)) => {
            for var in vars {
                tracing::error!(var, "Missing required environment variable");
            }
            return ExitCode::FAILURE;
        }
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        bot_id = %config.bot.bot_id,
        "Loaded configuration",
    );

    // --- Database ---
    let pool = chaincast_db::create_pool(&config.bot.database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    chaincast_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    chaincast_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Collaborators ---
    let generator =
        GeminiClient::new(config.bot.gemini.clone()).expect("Failed to build Gemini client");
    let publisher =
        TwitterClient::new(config.bot.twitter.clone()).expect("Failed to build Twitter client");

    let catalog = Catalog::builtin();
    tracing::info!(catalog_size = catalog.len(), "Catalog loaded");

    let dispatcher = Dispatcher::new(
        Arc::new(catalog),
        Arc::new(PgStateStore::new(pool)),
        Arc::new(generator),
        Arc::new(publisher),
        config.bot.dispatcher_config(),
    );

    // --- App state ---
    let state = AppState {
        dispatcher: Arc::new(dispatcher),
        config: Arc::new(config.server.clone()),
    };
    let app = build_app_router(state, &config.server);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.server.host.parse().expect("Invalid HOST address"),
        config.server.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
    ExitCode::SUCCESS
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C, starting graceful shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
