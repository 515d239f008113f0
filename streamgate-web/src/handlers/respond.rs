//! Response assembly for both streaming modes
//!
//! Builds the final status and header set from prepared gateway streams and
//! maps gateway errors to HTTP status codes. This is the only place error
//! variants meet status codes.

use axum::body::Body;
use axum::http::{Response, StatusCode, header};
use rand::Rng;
use streamgate_core::backend::ResolvedFile;
use streamgate_core::gateway::{GatewayError, MediaStream, UpstreamProbe, UpstreamStream};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Build the native-path response for a prepared media stream.
///
/// Status 206 with `Content-Range` when the request carried a Range header,
/// 200 otherwise. A `None` body (HEAD) produces the same headers over an
/// empty body.
pub fn media_response(media: MediaStream, advisory_name: &str) -> Response<Body> {
    let content_type = media_content_type(&media.file, advisory_name);
    let file_name = disposition_filename(&media.file, &content_type);

    let mut response = Response::builder()
        .header(header::CONTENT_TYPE, content_type.as_str())
        .header(header::CONTENT_LENGTH, media.plan.requested_length.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{file_name}\""),
        )
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CACHE_CONTROL, "public, max-age=3600, immutable");

    if media.ranged {
        response = response.status(StatusCode::PARTIAL_CONTENT).header(
            header::CONTENT_RANGE,
            format!(
                "bytes {}-{}/{}",
                media.range.from_inclusive, media.range.until_inclusive, media.range.total_size
            ),
        );
    } else {
        response = response.status(StatusCode::OK);
    }

    let body = match media.into_body() {
        Some(stream) => Body::from_stream(stream),
        None => Body::empty(),
    };

    finish(response, body)
}

/// Build the proxy-path response, mirroring upstream range semantics.
///
/// Responds 206 with the upstream's `Content-Range` only when the inbound
/// request asked for a range and the upstream honored it; otherwise 200
/// with `Content-Length` when known.
pub fn proxy_response(
    probe: Option<UpstreamProbe>,
    upstream: UpstreamStream,
    advisory_name: &str,
    ranged: bool,
    want_body: bool,
) -> Response<Body> {
    let probe = probe.unwrap_or_default();

    let content_type = upstream
        .content_type
        .clone()
        .or(probe.content_type)
        .unwrap_or_else(|| guessed_mime(advisory_name));
    let content_length = upstream.content_length.or(probe.content_length);
    let accept_ranges = probe.accept_ranges.unwrap_or_else(|| "none".to_string());

    let mut response = Response::builder()
        .header(header::CONTENT_TYPE, content_type.as_str())
        .header(header::ACCEPT_RANGES, accept_ranges)
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", sanitize_filename(advisory_name)),
        );

    if ranged && upstream.is_partial() {
        response = response.status(StatusCode::PARTIAL_CONTENT);
        if let Some(content_range) = &upstream.content_range {
            response = response.header(header::CONTENT_RANGE, content_range.as_str());
        }
    } else {
        response = response.status(StatusCode::OK);
    }

    if let Some(length) = content_length {
        response = response.header(header::CONTENT_LENGTH, length.to_string());
    }

    let body = if want_body {
        Body::from_stream(upstream.body)
    } else {
        Body::empty()
    };

    finish(response, body)
}

/// Map a gateway error to its HTTP status and a terse text body.
///
/// Unsatisfiable ranges additionally carry the `Content-Range: bytes */N`
/// header so players can learn the real file size.
pub fn error_response(error: &GatewayError) -> Response<Body> {
    let status = status_for(error);

    tracing::warn!(%error, status = status.as_u16(), "request failed");

    let mut response = Response::builder().status(status);
    if let GatewayError::RangeNotSatisfiable { total_size } = error {
        response = response.header(header::CONTENT_RANGE, format!("bytes */{total_size}"));
    }

    finish(response, Body::from(public_message(error)))
}

/// HTTP status for each gateway error variant.
fn status_for(error: &GatewayError) -> StatusCode {
    match error {
        GatewayError::MalformedRange { .. } => StatusCode::BAD_REQUEST,
        GatewayError::RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
        GatewayError::Token(_) => StatusCode::BAD_REQUEST,
        GatewayError::InvalidUpstreamUrl { .. } => StatusCode::BAD_REQUEST,
        // Hash mismatch is deliberately indistinguishable from a missing item
        GatewayError::MetadataNotFound { .. } | GatewayError::HashMismatch => {
            StatusCode::NOT_FOUND
        }
        GatewayError::UpstreamFetch { .. } => StatusCode::BAD_GATEWAY,
        GatewayError::Backend(_) | GatewayError::NoSessions => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Caller-facing message; internal details stay in the logs.
fn public_message(error: &GatewayError) -> &'static str {
    match error {
        GatewayError::MalformedRange { .. } => "Invalid Range header",
        GatewayError::RangeNotSatisfiable { .. } => "Requested Range Not Satisfiable",
        GatewayError::Token(_) => "Invalid token",
        GatewayError::InvalidUpstreamUrl { .. } => "Missing or invalid URL",
        GatewayError::MetadataNotFound { .. } | GatewayError::HashMismatch => "Not found",
        GatewayError::UpstreamFetch { .. } => "Upstream fetch failed",
        GatewayError::Backend(_) | GatewayError::NoSessions => "Internal error",
    }
}

/// Content type for a resolved file: declared mime, else a guess from the
/// backend file name, else a guess from the advisory path name.
fn media_content_type(file: &ResolvedFile, advisory_name: &str) -> String {
    if let Some(mime) = &file.mime_type {
        return mime.clone();
    }
    if let Some(name) = &file.file_name
        && let Some(guess) = mime_guess::from_path(name).first_raw()
    {
        return guess.to_string();
    }
    guessed_mime(advisory_name)
}

fn guessed_mime(name: &str) -> String {
    mime_guess::from_path(name)
        .first_raw()
        .unwrap_or(FALLBACK_CONTENT_TYPE)
        .to_string()
}

/// File name for Content-Disposition: the backend's own name, else a random
/// stem with an extension taken from the mime subtype.
fn disposition_filename(file: &ResolvedFile, content_type: &str) -> String {
    if let Some(name) = &file.file_name {
        return sanitize_filename(name);
    }

    let stem: [u8; 2] = rand::rng().random();
    let extension = content_type
        .split_once('/')
        .map(|(_, subtype)| subtype)
        .filter(|subtype| !subtype.is_empty())
        .unwrap_or("unknown");
    format!("{}.{extension}", hex::encode(stem))
}

/// Keep header values valid: printable ASCII only, no quotes.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_graphic() && c != '"' || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn finish(response: axum::http::response::Builder, body: Body) -> Response<Body> {
    response.body(body).unwrap_or_else(|error| {
        tracing::error!("response build failed: {error}");
        Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .body(Body::empty())
            .expect("empty error response always builds")
    })
}

#[cfg(test)]
mod tests {
    use streamgate_core::backend::MediaKind;

    use super::*;

    fn file(name: Option<&str>, mime: Option<&str>) -> ResolvedFile {
        ResolvedFile {
            fetch_ref: "0:0".to_string(),
            unique_id: "abc123".to_string(),
            size_bytes: 1000,
            file_name: name.map(str::to_string),
            mime_type: mime.map(str::to_string),
            kind: MediaKind::Video,
        }
    }

    #[test]
    fn test_content_type_prefers_backend_mime() {
        let file = file(Some("movie.mkv"), Some("video/x-matroska"));
        assert_eq!(media_content_type(&file, "ignored.mp4"), "video/x-matroska");
    }

    #[test]
    fn test_content_type_guesses_from_backend_name() {
        let file = file(Some("movie.mp4"), None);
        assert_eq!(media_content_type(&file, "ignored.bin"), "video/mp4");
    }

    #[test]
    fn test_content_type_falls_back_to_advisory_name() {
        let file = file(None, None);
        assert_eq!(media_content_type(&file, "episode.mp4"), "video/mp4");
    }

    #[test]
    fn test_content_type_final_fallback() {
        let file = file(None, None);
        assert_eq!(
            media_content_type(&file, "no-extension"),
            FALLBACK_CONTENT_TYPE
        );
    }

    #[test]
    fn test_filename_uses_backend_name() {
        let file = file(Some("movie.mkv"), None);
        assert_eq!(disposition_filename(&file, "video/x-matroska"), "movie.mkv");
    }

    #[test]
    fn test_synthesized_filename_takes_mime_subtype() {
        let file = file(None, Some("video/mp4"));
        let name = disposition_filename(&file, "video/mp4");
        assert!(name.ends_with(".mp4"), "unexpected name {name:?}");
        assert_eq!(name.len(), "0000.mp4".len());
    }

    #[test]
    fn test_synthesized_filename_without_mime() {
        let file = file(None, None);
        let name = disposition_filename(&file, FALLBACK_CONTENT_TYPE);
        assert!(name.ends_with(".octet-stream"), "unexpected name {name:?}");
    }

    #[test]
    fn test_sanitize_strips_header_breaking_characters() {
        assert_eq!(sanitize_filename("a\"b\r\nc.mkv"), "a_b__c.mkv");
        assert_eq!(sanitize_filename("plain name.mkv"), "plain name.mkv");
    }

    #[test]
    fn test_error_statuses() {
        use GatewayError::*;

        assert_eq!(
            status_for(&MalformedRange {
                reason: "x".to_string()
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&RangeNotSatisfiable { total_size: 10 }),
            StatusCode::RANGE_NOT_SATISFIABLE
        );
        assert_eq!(
            status_for(&MetadataNotFound {
                container_id: 1,
                item_id: 2
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_for(&HashMismatch), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&UpstreamFetch {
                status: Some(404),
                reason: "x".to_string()
            }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(status_for(&NoSessions), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_unsatisfiable_range_carries_size_header() {
        let response = error_response(&GatewayError::RangeNotSatisfiable { total_size: 4096 });

        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(
            response.headers().get(header::CONTENT_RANGE).unwrap(),
            "bytes */4096"
        );
    }

    #[test]
    fn test_hash_mismatch_reads_like_not_found() {
        let mismatch = error_response(&GatewayError::HashMismatch);
        let missing = error_response(&GatewayError::MetadataNotFound {
            container_id: 1,
            item_id: 2,
        });

        assert_eq!(mismatch.status(), missing.status());
    }
}
