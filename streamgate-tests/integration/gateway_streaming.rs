//! End-to-end tests for the native streaming path
//!
//! Each test drives `/dl/{token}/{name}` through the full router and
//! asserts on what an HTTP client would observe: status, headers, and
//! byte-exact bodies.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use streamgate_core::gateway::MediaLocator;
use streamgate_core::token;

use crate::support::{
    TEST_CONTAINER, body_bytes, gateway_with_item, send, token_with_fragment, valid_token,
};

const FILE_SIZE: usize = 3_000_000;

fn dl_request(token: &str, range: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::GET)
        .uri(format!("/dl/{token}/feature.mkv"));
    if let Some(range) = range {
        builder = builder.header(header::RANGE, range);
    }
    builder.body(Body::empty()).expect("request build")
}

#[tokio::test]
async fn test_full_download_without_range() {
    let fixture = gateway_with_item(FILE_SIZE);
    let token = valid_token(&fixture.file);

    let response = send(&fixture.router, dl_request(&token, None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_LENGTH).unwrap(),
        &FILE_SIZE.to_string()
    );
    assert_eq!(
        response.headers().get(header::ACCEPT_RANGES).unwrap(),
        "bytes"
    );
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "video/x-matroska"
    );
    assert!(response.headers().get(header::CONTENT_RANGE).is_none());

    let body = body_bytes(response).await;
    assert_eq!(body, fixture.content);
}

#[tokio::test]
async fn test_leading_range_returns_partial_content() {
    let fixture = gateway_with_item(FILE_SIZE);
    let token = valid_token(&fixture.file);

    let response = send(&fixture.router, dl_request(&token, Some("bytes=0-99"))).await;

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response.headers().get(header::CONTENT_RANGE).unwrap(),
        &format!("bytes 0-99/{FILE_SIZE}")
    );
    assert_eq!(
        response.headers().get(header::CONTENT_LENGTH).unwrap(),
        "100"
    );

    let body = body_bytes(response).await;
    assert_eq!(body.len(), 100);
    assert_eq!(body, fixture.content.slice(0..100));
}

#[tokio::test]
async fn test_mid_file_range_spanning_chunks() {
    let fixture = gateway_with_item(FILE_SIZE);
    let token = valid_token(&fixture.file);

    // Spans three 1 MiB chunk fetches
    let response = send(
        &fixture.router,
        dl_request(&token, Some("bytes=500000-2500000")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response.headers().get(header::CONTENT_LENGTH).unwrap(),
        "2000001"
    );

    let body = body_bytes(response).await;
    assert_eq!(body.len(), 2_000_001);
    assert_eq!(body, fixture.content.slice(500_000..2_500_001));
}

#[tokio::test]
async fn test_open_ended_range_runs_to_last_byte() {
    let fixture = gateway_with_item(FILE_SIZE);
    let token = valid_token(&fixture.file);

    let response = send(&fixture.router, dl_request(&token, Some("bytes=2999000-"))).await;

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    let body = body_bytes(response).await;
    assert_eq!(body.len(), 1000);
    assert_eq!(body, fixture.content.slice(2_999_000..));
}

#[tokio::test]
async fn test_range_past_end_is_unsatisfiable() {
    let fixture = gateway_with_item(FILE_SIZE);
    let token = valid_token(&fixture.file);

    let response = send(
        &fixture.router,
        dl_request(&token, Some(&format!("bytes=0-{FILE_SIZE}"))),
    )
    .await;

    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(
        response.headers().get(header::CONTENT_RANGE).unwrap(),
        &format!("bytes */{FILE_SIZE}")
    );
}

#[tokio::test]
async fn test_garbled_range_is_bad_request() {
    let fixture = gateway_with_item(FILE_SIZE);
    let token = valid_token(&fixture.file);

    let response = send(&fixture.router, dl_request(&token, Some("bytes=abc-def"))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_wrong_hash_fragment_streams_nothing() {
    let fixture = gateway_with_item(FILE_SIZE);
    let token = token_with_fragment("zzzzzz");

    let response = send(&fixture.router, dl_request(&token, None)).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_bytes(response).await;
    assert_ne!(body, fixture.content);
    assert!(body.len() < 100, "error body must not carry media bytes");
}

#[tokio::test]
async fn test_unknown_item_is_not_found() {
    let fixture = gateway_with_item(FILE_SIZE);
    let token = token::encode(&MediaLocator {
        container_id: TEST_CONTAINER,
        item_id: 999,
        hash_fragment: "abcdef".to_string(),
    })
    .expect("token encoding");

    let response = send(&fixture.router, dl_request(&token, None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_undecodable_token_is_bad_request() {
    let fixture = gateway_with_item(FILE_SIZE);

    let response = send(&fixture.router, dl_request("not-hex-at-all", None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_head_request_reports_headers_without_body() {
    let fixture = gateway_with_item(FILE_SIZE);
    let token = valid_token(&fixture.file);

    let request = Request::builder()
        .method(Method::HEAD)
        .uri(format!("/dl/{token}/feature.mkv"))
        .header(header::RANGE, "bytes=0-99")
        .body(Body::empty())
        .expect("request build");
    let response = send(&fixture.router, request).await;

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response.headers().get(header::CONTENT_LENGTH).unwrap(),
        "100"
    );

    let body = body_bytes(response).await;
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_cache_and_disposition_headers() {
    let fixture = gateway_with_item(FILE_SIZE);
    let token = valid_token(&fixture.file);

    let response = send(&fixture.router, dl_request(&token, None)).await;

    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "public, max-age=3600, immutable"
    );
    assert_eq!(
        response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
        "inline; filename=\"feature.mkv\""
    );
}

#[tokio::test]
async fn test_health_reports_session_loads() {
    let fixture = gateway_with_item(FILE_SIZE);

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .expect("request build");
    let response = send(&fixture.router, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_bytes(response).await;
    let json: serde_json::Value = serde_json::from_slice(&body).expect("health json");

    assert_eq!(json["status"], "healthy");
    assert_eq!(json["sessions"].as_array().map(Vec::len), Some(3));
}
