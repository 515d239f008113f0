//! HTTP server wiring for the streaming gateway
//!
//! Builds the axum router over a shared gateway context and starts the
//! listener. Development mode wires the in-memory simulated backend with a
//! few demo items; production deployments supply their own session set.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::routing::get;
use streamgate_core::backend::{ChatSession, MediaKind};
use streamgate_core::config::StreamgateConfig;
use streamgate_core::gateway::Gateway;
use streamgate_core::mode::RuntimeMode;
use streamgate_sim::{InMemoryChatStorage, patterned_bytes, simulated_session_pool};
use tower_http::cors::CorsLayer;

use crate::handlers::{health, proxy_media, stream_media};

/// Shared state for all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub server_started_at: Instant,
}

impl AppState {
    /// Create state over a gateway context.
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self {
            gateway,
            server_started_at: Instant::now(),
        }
    }
}

/// Build the streaming router over the given state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/dl/{token}/{name}", get(stream_media))
        .route("/proxy/{token}/{name}", get(proxy_media))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run the streaming server until the listener fails.
///
/// Development mode seeds a simulated backend so the server is usable
/// offline; production mode requires a real session set via
/// [`run_server_with_sessions`].
///
/// # Errors
/// Returns an error if the production backend is not wired or the listener
/// cannot bind.
pub async fn run_server(
    config: StreamgateConfig,
    mode: RuntimeMode,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error>> {
    let sessions = match mode {
        RuntimeMode::Development => {
            let storage = Arc::new(InMemoryChatStorage::new());
            seed_development_storage(&storage);
            simulated_session_pool(storage, config.pool.session_count)
        }
        RuntimeMode::Production => {
            return Err(
                "no production chat backend is linked into this build; \
                 start with --mode development or embed the server via \
                 run_server_with_sessions"
                    .into(),
            );
        }
    };

    run_server_with_sessions(config, sessions, addr).await
}

/// Run the streaming server over an explicit backend session set.
///
/// # Errors
/// Returns an error if the listener cannot bind or serving fails.
pub async fn run_server_with_sessions(
    config: StreamgateConfig,
    sessions: Vec<Arc<dyn ChatSession>>,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error>> {
    let gateway = Arc::new(Gateway::new(config, sessions));
    let app = build_router(AppState::new(gateway));

    tracing::info!("Streamgate server running on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Seed a handful of deterministic demo items for offline development.
fn seed_development_storage(storage: &InMemoryChatStorage) {
    let demo_video = storage.insert_item(
        -1001,
        1,
        Some("demo-movie.mkv"),
        Some("video/x-matroska"),
        MediaKind::Video,
        patterned_bytes(8 * 1024 * 1024),
    );
    let demo_document = storage.insert_item(
        -1001,
        2,
        Some("release-notes.pdf"),
        Some("application/pdf"),
        MediaKind::Document,
        patterned_bytes(64 * 1024),
    );

    for file in [&demo_video, &demo_document] {
        tracing::info!(
            unique_id = %file.unique_id,
            size_bytes = file.size_bytes,
            name = file.file_name.as_deref().unwrap_or("<unnamed>"),
            "seeded development item"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_is_cloneable_across_handlers() {
        let gateway = Arc::new(Gateway::new(StreamgateConfig::default(), Vec::new()));
        let state = AppState::new(gateway);
        let cloned = state.clone();

        assert!(Arc::ptr_eq(&state.gateway, &cloned.gateway));
    }
}
