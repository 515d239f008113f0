//! End-to-end tests for the upstream proxy path
//!
//! Spins up a real local upstream server, then drives `/proxy/{token}/{name}`
//! through the router and verifies that range semantics and failure statuses
//! are mirrored the way a client would observe them.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use axum::response::Response;
use axum::routing::get;
use bytes::Bytes;
use streamgate_core::config::StreamgateConfig;
use streamgate_core::gateway::{Gateway, ProxyTarget};
use streamgate_core::token;
use streamgate_web::{AppState, build_router};

use crate::support::{body_bytes, send};

const UPSTREAM_SIZE: usize = 100_000;

/// Minimal range-capable upstream used as the proxy destination.
async fn upstream_file(State(content): State<Bytes>, headers: HeaderMap) -> Response {
    let total = content.len() as u64;

    let range = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("bytes="))
        .and_then(|spec| spec.split_once('-'))
        .and_then(|(from, until)| {
            let from: u64 = from.parse().ok()?;
            let until: u64 = if until.is_empty() {
                total - 1
            } else {
                until.parse().ok()?
            };
            (from <= until && until < total).then_some((from, until))
        });

    match range {
        Some((from, until)) => Response::builder()
            .status(StatusCode::PARTIAL_CONTENT)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header(header::CONTENT_LENGTH, (until - from + 1).to_string())
            .header(
                header::CONTENT_RANGE,
                format!("bytes {from}-{until}/{total}"),
            )
            .header(header::ACCEPT_RANGES, "bytes")
            .body(Body::from(content.slice(from as usize..=until as usize)))
            .expect("upstream response"),
        None => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header(header::CONTENT_LENGTH, total.to_string())
            .header(header::ACCEPT_RANGES, "bytes")
            .body(Body::from(content))
            .expect("upstream response"),
    }
}

/// Start the upstream fixture server on an ephemeral port.
async fn spawn_upstream(content: Bytes) -> SocketAddr {
    let app = Router::new()
        .route("/file.bin", get(upstream_file))
        .route(
            "/missing.bin",
            get(|| async { StatusCode::NOT_FOUND }),
        )
        .with_state(content);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("upstream bind");
    let addr = listener.local_addr().expect("upstream addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("upstream serve");
    });
    addr
}

fn proxy_router() -> Router {
    let gateway = Arc::new(Gateway::new(StreamgateConfig::default(), Vec::new()));
    build_router(AppState::new(gateway))
}

fn proxy_request(url: &str, range: Option<&str>) -> Request<Body> {
    let token = token::encode(&ProxyTarget {
        url: url.to_string(),
    })
    .expect("token encoding");

    let mut builder = Request::builder()
        .method(Method::GET)
        .uri(format!("/proxy/{token}/remote.bin"));
    if let Some(range) = range {
        builder = builder.header(header::RANGE, range);
    }
    builder.body(Body::empty()).expect("request build")
}

fn upstream_content() -> Bytes {
    (0..UPSTREAM_SIZE).map(|i| (i % 251) as u8).collect()
}

#[tokio::test]
async fn test_proxy_full_fetch() {
    let content = upstream_content();
    let addr = spawn_upstream(content.clone()).await;
    let router = proxy_router();

    let response = send(
        &router,
        proxy_request(&format!("http://{addr}/file.bin"), None),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_LENGTH).unwrap(),
        &UPSTREAM_SIZE.to_string()
    );

    let body = body_bytes(response).await;
    assert_eq!(body, content);
}

#[tokio::test]
async fn test_proxy_mirrors_partial_content() {
    let content = upstream_content();
    let addr = spawn_upstream(content.clone()).await;
    let router = proxy_router();

    let response = send(
        &router,
        proxy_request(&format!("http://{addr}/file.bin"), Some("bytes=1000-1999")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response.headers().get(header::CONTENT_RANGE).unwrap(),
        &format!("bytes 1000-1999/{UPSTREAM_SIZE}")
    );

    let body = body_bytes(response).await;
    assert_eq!(body, content.slice(1000..2000));
}

#[tokio::test]
async fn test_upstream_error_surfaces_as_bad_gateway() {
    let addr = spawn_upstream(upstream_content()).await;
    let router = proxy_router();

    let response = send(
        &router,
        proxy_request(&format!("http://{addr}/missing.bin"), None),
    )
    .await;

    // A missing upstream resource is our failure to proxy, not a 404
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let router = proxy_router();

    // Port 1 on localhost refuses connections
    let response = send(
        &router,
        proxy_request("http://127.0.0.1:1/file.bin", None),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_token_without_url_is_bad_request() {
    let router = proxy_router();

    let token = token::encode(&ProxyTarget {
        url: String::new(),
    })
    .expect("token encoding");
    let request = Request::builder()
        .uri(format!("/proxy/{token}/remote.bin"))
        .body(Body::empty())
        .expect("request build");

    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_non_http_scheme_is_bad_request() {
    let router = proxy_router();

    let response = send(&router, proxy_request("ftp://example.com/file.bin", None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_proxy_head_request_has_no_body() {
    let content = upstream_content();
    let addr = spawn_upstream(content).await;
    let router = proxy_router();

    let token = token::encode(&ProxyTarget {
        url: format!("http://{addr}/file.bin"),
    })
    .expect("token encoding");
    let request = Request::builder()
        .method(Method::HEAD)
        .uri(format!("/proxy/{token}/remote.bin"))
        .body(Body::empty())
        .expect("request build");

    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_bytes(response).await;
    assert!(body.is_empty());
}
