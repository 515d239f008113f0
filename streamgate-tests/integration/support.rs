//! Shared fixtures for router-level integration tests

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use bytes::Bytes;
use streamgate_core::backend::{MediaKind, ResolvedFile};
use streamgate_core::config::StreamgateConfig;
use streamgate_core::gateway::{Gateway, MediaLocator};
use streamgate_core::token;
use streamgate_sim::{InMemoryChatStorage, patterned_bytes, simulated_session_pool};
use streamgate_web::{AppState, build_router};
use tower::ServiceExt;

pub const TEST_CONTAINER: i64 = -1001;
pub const TEST_ITEM: i64 = 7;

/// A seeded router plus the metadata needed to address its one test item.
pub struct TestGateway {
    pub router: Router,
    pub file: ResolvedFile,
    pub content: Bytes,
}

/// Build a router over a simulated backend holding one patterned video.
pub fn gateway_with_item(size: usize) -> TestGateway {
    let storage = Arc::new(InMemoryChatStorage::new());
    let content = patterned_bytes(size);
    let file = storage.insert_item(
        TEST_CONTAINER,
        TEST_ITEM,
        Some("feature.mkv"),
        Some("video/x-matroska"),
        MediaKind::Video,
        content.clone(),
    );

    let sessions = simulated_session_pool(storage, 3);
    let gateway = Arc::new(Gateway::new(StreamgateConfig::default(), sessions));
    let router = build_router(AppState::new(gateway));

    TestGateway {
        router,
        file,
        content,
    }
}

/// Mint a valid stream token for the seeded item.
pub fn valid_token(file: &ResolvedFile) -> String {
    token_with_fragment(&file.unique_id[..6])
}

/// Mint a stream token for the seeded item with an arbitrary hash fragment.
pub fn token_with_fragment(fragment: &str) -> String {
    token::encode(&MediaLocator {
        container_id: TEST_CONTAINER,
        item_id: TEST_ITEM,
        hash_fragment: fragment.to_string(),
    })
    .expect("token encoding")
}

/// Issue one request against the router.
pub async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.expect("router call")
}

/// Collect a response body fully into memory.
pub async fn body_bytes(response: Response) -> Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body collect")
}
