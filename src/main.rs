//! AppZero Accounts - membership, invitation and registration service
//!
//! Serves the sign-up wizard, invite acceptance and team administration
//! endpoints over a SQLite store.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{http::HeaderValue, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

use appzero_accounts::{
    api,
    config::{self, LogFormat, LogTarget},
    db,
    middleware::{self, rate_limit},
    services::{spawn_draft_cleanup, Argon2Credentials, InMemoryDraftStore, LogNotifier},
    AppConfig, AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_help();
        return Ok(());
    }

    if args.iter().any(|arg| arg == "--version" || arg == "-V") {
        println!("AppZero Accounts {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    if let Some(pos) = args.iter().position(|arg| arg == "--init-config") {
        let path = args
            .get(pos + 1)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("config.yaml"));
        AppConfig::create_default_config(&path)?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    // Load configuration first (before logging, so we know log format)
    let config = AppConfig::load().context("Failed to load configuration")?;

    if args.iter().any(|arg| arg == "--check-config") {
        println!("Configuration is valid");
        return Ok(());
    }

    // The guard must live until shutdown so buffered file logs are flushed
    let _log_guard = init_logging(&config);

    info!("AppZero Accounts {} starting up", env!("CARGO_PKG_VERSION"));

    ensure_data_directory(&config)?;

    info!("Initializing database connection");
    let db = db::init_pool(&config.database)
        .await
        .context("Failed to initialize database")?;

    let credentials = Arc::new(
        Argon2Credentials::from_config(&config.auth)
            .context("Invalid password hashing parameters")?,
    );
    let drafts = Arc::new(InMemoryDraftStore::new(Duration::from_secs(
        config.registration.draft_ttl_minutes * 60,
    )));
    spawn_draft_cleanup(drafts.clone(), Duration::from_secs(60));

    let state = AppState::with_collaborators(
        config.clone(),
        db,
        credentials,
        drafts,
        Arc::new(LogNotifier),
    );

    let app = create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address configuration")?;

    info!("Starting HTTP server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("HTTP server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Initialize logging based on configuration
fn init_logging(config: &AppConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer, Registry};

    type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

    let log_config = &config.logging;
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_config.level));

    let console_layer = |format: &LogFormat| -> BoxedLayer {
        match format {
            LogFormat::Json => fmt::layer().json().with_target(true).boxed(),
            LogFormat::Compact => fmt::layer().compact().with_target(false).boxed(),
            LogFormat::Pretty => fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .boxed(),
        }
    };

    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut guard = None;

    if matches!(log_config.target, LogTarget::Console | LogTarget::Both) {
        layers.push(console_layer(&log_config.format));
    }

    if matches!(log_config.target, LogTarget::File | LogTarget::Both) {
        let (writer, file_guard) = create_file_writer(log_config);
        guard = Some(file_guard);
        // Files never get ANSI colors
        let file_layer: BoxedLayer = match log_config.format {
            LogFormat::Json => fmt::layer()
                .json()
                .with_target(true)
                .with_writer(writer)
                .boxed(),
            LogFormat::Compact | LogFormat::Pretty => fmt::layer()
                .compact()
                .with_ansi(false)
                .with_target(true)
                .with_writer(writer)
                .boxed(),
        };
        layers.push(file_layer);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .init();

    guard
}

/// Create a file writer with optional daily rotation
fn create_file_writer(
    log_config: &config::LoggingConfig,
) -> (
    tracing_appender::non_blocking::NonBlocking,
    tracing_appender::non_blocking::WorkerGuard,
) {
    if let Err(e) = std::fs::create_dir_all(&log_config.log_dir) {
        eprintln!(
            "Warning: Failed to create log directory {:?}: {}",
            log_config.log_dir, e
        );
    }

    let file_appender = if log_config.daily_rotation {
        tracing_appender::rolling::daily(&log_config.log_dir, &log_config.log_prefix)
    } else {
        tracing_appender::rolling::never(&log_config.log_dir, &log_config.log_prefix)
    };

    tracing_appender::non_blocking(file_appender)
}

/// Create the parent directory of a file-backed SQLite database
fn ensure_data_directory(config: &AppConfig) -> Result<()> {
    let url = &config.database.url;
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .map(|p| p.split('?').next().unwrap_or(p));

    if let Some(path) = path.filter(|p| !p.starts_with(":memory:")) {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).context("Failed to create data directory")?;
                info!("Created data directory: {:?}", parent);
            }
        }
    }
    Ok(())
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .server
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
            .allow_credentials(false)
    }
}

/// Create the application router with all routes and middleware
fn create_router(state: AppState, config: &AppConfig) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let api_rate_limit = rate_limit::RateLimitState::new(rate_limit::api_rate_limit_config());
    let credential_rate_limit =
        rate_limit::RateLimitState::new(rate_limit::credential_rate_limit_config());
    rate_limit::spawn_rate_limit_cleanup(api_rate_limit.clone());
    rate_limit::spawn_rate_limit_cleanup(credential_rate_limit.clone());

    // Authentication is applied per group so login and sign-up stay reachable
    Router::new()
        .nest(
            "/api/v1",
            api::public_routes()
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    middleware::optional_auth_middleware,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    credential_rate_limit,
                    middleware::rate_limit_middleware,
                )),
        )
        .nest(
            "/api/v1",
            api::protected_routes()
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    middleware::auth_middleware,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    api_rate_limit,
                    middleware::rate_limit_middleware,
                )),
        )
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(trace_layer)
                .layer(cors_layer(config)),
        )
}

fn print_help() {
    println!(
        r#"AppZero Accounts {}

USAGE:
    appzero-accounts [OPTIONS]

OPTIONS:
    -h, --help              Print this help message
    -V, --version           Print version information
    --check-config          Load and validate the configuration, then exit
    --init-config [PATH]    Write a default configuration file (default: config.yaml)

ENVIRONMENT:
    APPZERO_CONFIG          Path to configuration file
    DATABASE_URL            SQLite connection string
    JWT_SECRET              Token signing secret (at least 32 characters)
    APPZERO_PUBLIC_BASE_URL Base URL used in invitation links
    RUST_LOG                Log filter (overrides logging.level)

CONFIGURATION:
    The application looks for configuration files in the following order:
    1. Path specified by APPZERO_CONFIG
    2. ./config.yaml
    3. ./config/config.yaml
    4. /etc/appzero/config.yaml"#,
        env!("CARGO_PKG_VERSION")
    );
}
