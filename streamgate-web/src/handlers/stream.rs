//! Native-path streaming handler
//!
//! Serves `/dl/{token}/{name}`: decodes the opaque token into a media
//! locator, prepares the gateway stream, and hands the result to response
//! assembly. All validation resolves before any headers are sent.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method, Response, header};
use streamgate_core::gateway::{GatewayError, MediaLocator};
use streamgate_core::token;
use tracing::debug;

use super::respond;
use crate::server::AppState;

/// Extract the Range header as a string, if present and valid UTF-8.
pub(crate) fn range_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}

/// Stream one stored media item with byte-range support.
///
/// `{name}` is advisory and only used for extension guessing; the backend's
/// own name and mime type take precedence.
pub async fn stream_media(
    State(state): State<AppState>,
    Path((token, name)): Path<(String, String)>,
    method: Method,
    headers: HeaderMap,
) -> Response<Body> {
    let locator: MediaLocator = match token::decode(&token) {
        Ok(locator) => locator,
        Err(error) => return respond::error_response(&GatewayError::Token(error)),
    };

    let range = range_header(&headers);
    let want_body = method != Method::HEAD;

    debug!(
        container_id = locator.container_id,
        item_id = locator.item_id,
        range = range.as_deref().unwrap_or("<none>"),
        "media stream request"
    );

    match state
        .gateway
        .open_media_stream(&locator, range.as_deref(), want_body)
        .await
    {
        Ok(media) => respond::media_response(media, &name),
        Err(error) => respond::error_response(&error),
    }
}
