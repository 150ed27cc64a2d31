use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use redops_api::config::Config;
use redops_api::db::pg::PgStore;
use redops_api::db::store::{DocumentStore, MemoryStore};
use redops_api::gateway::Hub;
use redops_api::AppState;

#[tokio::main]
async fn main() {
    // .env is optional; the environment may already be populated.
    if dotenvy::dotenv().is_err() {
        let env_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(env_path);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let port = config.port;

    let store: Arc<dyn DocumentStore> = match &config.database_url {
        Some(url) => {
            let applied = redops_api::db::migrations::run_pending(url)
                .await
                .expect("failed to run migrations");
            if !applied.is_empty() {
                tracing::info!(?applied, "migrations applied");
            }
            let pool = redops_api::db::pool::connect(url).expect("failed to build connection pool");
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store (data is lost on restart)");
            Arc::new(MemoryStore::new())
        }
    };

    redops_api::bootstrap::ensure_initial_admin(store.as_ref())
        .await
        .expect("failed to seed initial account");

    let origin: HeaderValue = config
        .cors_origin
        .parse()
        .expect("CORS_ORIGIN is not a valid header value");
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .expose_headers([AUTHORIZATION])
        .allow_credentials(true);

    let (hub, hub_task) = Hub::spawn();
    let state = AppState::new(config, store, hub.clone());

    let app = Router::new()
        .merge(redops_api::routes::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "redops-api listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(hub))
        .await
        .expect("server error");

    let _ = hub_task.await;
    tracing::info!("redops-api stopped");
}

/// Resolves on SIGINT/SIGTERM after telling the hub to close every live
/// connection, so open WebSockets do not hold up graceful shutdown.
async fn shutdown_signal(hub: Hub) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(?err, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => tracing::error!(?err, "failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
    hub.shutdown();
}
