//! Upstream passthrough handler
//!
//! Serves `/proxy/{token}/{name}`: decodes the opaque token into an
//! upstream URL and streams it through with the inbound Range header
//! forwarded verbatim, mirroring the upstream's partial/full semantics.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method, Response};
use streamgate_core::gateway::{GatewayError, ProxyTarget};
use streamgate_core::token;
use tracing::debug;

use super::respond;
use super::stream::range_header;
use crate::server::AppState;

/// Proxy an arbitrary third-party download link with range support.
pub async fn proxy_media(
    State(state): State<AppState>,
    Path((token, name)): Path<(String, String)>,
    method: Method,
    headers: HeaderMap,
) -> Response<Body> {
    let target: ProxyTarget = match token::decode(&token) {
        Ok(target) => target,
        Err(error) => return respond::error_response(&GatewayError::Token(error)),
    };

    let range = range_header(&headers);
    let want_body = method != Method::HEAD;

    debug!(
        url = %target.url,
        range = range.as_deref().unwrap_or("<none>"),
        "proxy stream request"
    );

    match state
        .gateway
        .open_upstream_stream(&target, range.as_deref())
        .await
    {
        Ok((probe, upstream)) => {
            respond::proxy_response(probe, upstream, &name, range.is_some(), want_body)
        }
        Err(error) => respond::error_response(&error),
    }
}
