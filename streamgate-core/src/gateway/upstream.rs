//! Generic upstream HTTP passthrough
//!
//! Probes an external URL, forwards the inbound Range header verbatim, and
//! streams the body without buffering. Upstream failures surface before any
//! bytes are forwarded whenever they are detectable at connection time.

use std::pin::Pin;

use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use reqwest::header;
use url::Url;

use super::{GatewayError, GatewayResult};
use crate::config::NetworkConfig;

/// Headers learned from the best-effort HEAD probe.
#[derive(Debug, Clone, Default)]
pub struct UpstreamProbe {
    /// Upstream Content-Length, when reported
    pub content_length: Option<u64>,
    /// Upstream Content-Type, when reported
    pub content_type: Option<String>,
    /// Upstream Accept-Ranges, when reported
    pub accept_ranges: Option<String>,
}

/// An open streaming GET against the upstream, headers already received.
///
/// The underlying connection is released when the body stream is dropped,
/// on every exit path.
pub struct UpstreamStream {
    /// Upstream HTTP status code
    pub status: u16,
    /// Upstream Content-Length, when reported
    pub content_length: Option<u64>,
    /// Upstream Content-Type, when reported
    pub content_type: Option<String>,
    /// Upstream Content-Range, when the upstream honored the range
    pub content_range: Option<String>,
    /// Lazy body bytes
    pub body: Pin<Box<dyn Stream<Item = GatewayResult<Bytes>> + Send>>,
}

impl UpstreamStream {
    /// Whether the upstream answered with partial content.
    pub fn is_partial(&self) -> bool {
        self.status == 206
    }
}

/// HTTP passthrough client for third-party download links.
pub struct UpstreamProxy {
    client: reqwest::Client,
}

impl UpstreamProxy {
    /// Create the proxy client from network configuration.
    pub fn new(config: &NetworkConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(config.upstream_timeout)
                .user_agent(config.user_agent)
                .redirect(reqwest::redirect::Policy::limited(10))
                .build()
                .expect("HTTP client creation should not fail"),
        }
    }

    /// Probe the destination with a HEAD request, best effort.
    ///
    /// Any transport failure or error status yields `None`; the caller falls
    /// through to the streaming GET either way.
    pub async fn probe(&self, url: &Url, range_header: Option<&str>) -> Option<UpstreamProbe> {
        let mut request = self.client.head(url.clone());
        if let Some(range) = range_header {
            request = request.header(header::RANGE, range);
        }

        let response = match request.send().await {
            Ok(response) if response.status().as_u16() < 400 => response,
            Ok(response) => {
                tracing::debug!(status = response.status().as_u16(), %url, "HEAD probe rejected");
                return None;
            }
            Err(error) => {
                tracing::debug!(%url, "HEAD probe failed: {error}");
                return None;
            }
        };

        Some(UpstreamProbe {
            content_length: header_value(&response, header::CONTENT_LENGTH)
                .and_then(|v| v.parse().ok()),
            content_type: header_value(&response, header::CONTENT_TYPE),
            accept_ranges: header_value(&response, header::ACCEPT_RANGES),
        })
    }

    /// Open the streaming GET, forwarding the Range header verbatim.
    ///
    /// # Errors
    /// - `GatewayError::UpstreamFetch` - Connection failed or upstream
    ///   answered with an error status before any bytes were forwarded
    pub async fn open(
        &self,
        url: &Url,
        range_header: Option<&str>,
    ) -> GatewayResult<UpstreamStream> {
        let mut request = self.client.get(url.clone());
        if let Some(range) = range_header {
            request = request.header(header::RANGE, range);
        }

        let response = request
            .send()
            .await
            .map_err(|error| GatewayError::UpstreamFetch {
                status: None,
                reason: error.to_string(),
            })?;

        let status = response.status().as_u16();
        if status >= 400 {
            return Err(GatewayError::UpstreamFetch {
                status: Some(status),
                reason: format!("upstream answered {status}"),
            });
        }

        let content_length =
            header_value(&response, header::CONTENT_LENGTH).and_then(|v| v.parse().ok());
        let content_type = header_value(&response, header::CONTENT_TYPE);
        let content_range = header_value(&response, header::CONTENT_RANGE);

        let body = response
            .bytes_stream()
            .map_err(|error| GatewayError::UpstreamFetch {
                status: None,
                reason: error.to_string(),
            });

        Ok(UpstreamStream {
            status,
            content_length,
            content_type,
            content_range,
            body: Box::pin(body),
        })
    }
}

fn header_value(response: &reqwest::Response, name: header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}

/// Validate a proxy destination as a fetchable http(s) URL.
///
/// # Errors
/// - `GatewayError::InvalidUpstreamUrl` - Empty, unparsable, or wrong scheme
pub fn parse_upstream_url(raw: &str) -> GatewayResult<Url> {
    if raw.trim().is_empty() {
        return Err(GatewayError::InvalidUpstreamUrl {
            reason: "missing URL".to_string(),
        });
    }

    let url = Url::parse(raw).map_err(|error| GatewayError::InvalidUpstreamUrl {
        reason: error.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(GatewayError::InvalidUpstreamUrl {
            reason: format!("unsupported scheme {scheme:?}"),
        }),
    }
}
