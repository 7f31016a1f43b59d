//! Shardline Engine - Main entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shardline_engine::infrastructure::{
    clock::{SystemClock, UuidIdGenerator},
    encounter::TracingEncounterMemory,
    gateway::HttpGateway,
    settings::ShardSettings,
    world_store::InMemoryWorldDirectory,
};
use shardline_engine::{api, App, Ports};

/// How often expired pending arrivals are dropped.
const ARRIVAL_CLEANUP_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root (the engine may run from `crates/engine`).
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shardline_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = ShardSettings::from_env();
    tracing::info!(
        server_id = %settings.server_id,
        peers = settings.gateway_peers.len(),
        handoff_timeout_ms = settings.handoff_timeout.as_millis() as u64,
        "Starting Shardline Engine"
    );

    tracing::info!(path = %settings.world_data_path.display(), "Loading world data");
    let world = Arc::new(InMemoryWorldDirectory::load(&settings.world_data_path).await?);

    let gateway = Arc::new(HttpGateway::new(
        settings.gateway_peers.clone(),
        settings.handoff_timeout,
    ));

    let cors = build_cors_layer(settings.cors_allowed_origins.as_deref());
    let addr: SocketAddr = settings.bind_address().parse()?;

    let app = Arc::new(App::new(
        settings,
        Ports {
            world,
            gateway,
            encounters: Arc::new(TracingEncounterMemory),
            clock: Arc::new(SystemClock),
            ids: Arc::new(UuidIdGenerator),
        },
    ));

    // Spawn pending arrival cleanup
    let arrivals = app.arrivals.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(ARRIVAL_CLEANUP_INTERVAL).await;
            let removed = arrivals.cleanup_expired().await;
            if removed > 0 {
                tracing::debug!(removed, "Dropped expired pending arrivals");
            }
        }
    });

    let mut router = api::router(app).layer(TraceLayer::new_for_http());
    if let Some(cors) = cors {
        router = router.layer(cors);
    }

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}

fn build_cors_layer(allowed_origins: Option<&str>) -> Option<CorsLayer> {
    let allowed_origins = allowed_origins.map(str::trim).filter(|s| !s.is_empty())?;

    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    if allowed_origins == "*" {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| HeaderValue::from_str(s).ok())
            .collect();

        if origins.is_empty() {
            return None;
        }

        cors = cors.allow_origin(origins);
    }

    Some(cors)
}
