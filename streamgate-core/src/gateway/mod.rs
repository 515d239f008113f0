//! Streaming gateway
//!
//! Turns HTTP range requests into precise plans of fixed-size chunk fetches
//! against the chat-storage backend, load-balanced across a session pool,
//! and streams the assembled bytes without buffering whole files. A second
//! mode proxies arbitrary upstream URLs with the same range semantics.

pub mod plan;
pub mod pool;
pub mod range;
pub mod resolver;
pub mod stream;
pub mod upstream;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use plan::ChunkPlan;
pub use pool::{SessionHandle, SessionLease, SessionLoad, SessionPool};
pub use range::ByteRange;
pub use resolver::{HASH_FRAGMENT_LEN, ResolverRegistry, SessionResolver};
pub use stream::ChunkStream;
pub use upstream::{UpstreamProbe, UpstreamProxy, UpstreamStream};

use crate::backend::{BackendError, ChatSession, ResolvedFile};
use crate::config::StreamgateConfig;
use crate::token::TokenError;

/// Unified error type for gateway operations.
///
/// Validation errors resolve fully before response headers are sent, so the
/// web boundary can always map them to a correct status code. A `Backend`
/// error surfacing mid-stream terminates the body instead.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The Range header could not be parsed.
    #[error("Malformed range header: {reason}")]
    MalformedRange {
        /// Description of the parse failure
        reason: String,
    },

    /// The Range header parsed but cannot be satisfied for this file.
    #[error("Requested range not satisfiable for size {total_size}")]
    RangeNotSatisfiable {
        /// Total size of the file the range was validated against
        total_size: u64,
    },

    /// The opaque path token could not be decoded.
    #[error("Invalid stream token: {0}")]
    Token(#[from] TokenError),

    /// The proxy destination is missing or not a fetchable URL.
    #[error("Invalid upstream URL: {reason}")]
    InvalidUpstreamUrl {
        /// Description of the URL failure
        reason: String,
    },

    /// The item could not be located through the backend.
    #[error("Item {item_id} not found in container {container_id}")]
    MetadataNotFound {
        /// Container the lookup was issued against
        container_id: i64,
        /// Item that could not be located
        item_id: i64,
    },

    /// The locator's hash fragment does not match the resolved file.
    ///
    /// Reported to callers identically to `MetadataNotFound` so valid ids
    /// cannot be confirmed by probing without the matching fragment.
    #[error("Hash fragment does not match resolved item")]
    HashMismatch,

    /// The upstream server refused or failed the proxied fetch.
    #[error("Upstream fetch failed: {reason}")]
    UpstreamFetch {
        /// Upstream HTTP status, when one was received
        status: Option<u16>,
        /// Description of the failure
        reason: String,
    },

    /// A backend session operation failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// The session pool is empty.
    #[error("No backend sessions available")]
    NoSessions,
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Opaque-token-derived address of one stored media item.
///
/// Created per request from a decoded path token; immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaLocator {
    /// Chat container holding the item
    pub container_id: i64,
    /// Item identifier within the container
    pub item_id: i64,
    /// Prefix of the item's content-derived unique id, gating access
    pub hash_fragment: String,
}

/// Opaque-token-derived destination for the proxy path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyTarget {
    /// Upstream URL to pass through
    pub url: String,
}

/// One prepared native-path response: resolved metadata, validated range,
/// chunk plan, and (for GET) the lazy body stream holding its session lease.
pub struct MediaStream {
    /// Resolved file metadata
    pub file: Arc<ResolvedFile>,
    /// Validated byte range this response covers
    pub range: ByteRange,
    /// Chunk fetch plan derived from the range
    pub plan: ChunkPlan,
    /// Whether the request carried a Range header
    pub ranged: bool,
    body: Option<ChunkStream>,
}

impl MediaStream {
    /// Take the body stream, if one was opened.
    ///
    /// `None` for metadata-only requests (HEAD); the session lease was
    /// already released in that case.
    pub fn into_body(self) -> Option<ChunkStream> {
        self.body
    }
}

/// Gateway context owning the session pool, resolver registry, and upstream
/// proxy client. Shared (`Arc`) across all request handlers.
pub struct Gateway {
    config: StreamgateConfig,
    pool: Arc<SessionPool>,
    registry: ResolverRegistry,
    upstream: UpstreamProxy,
}

impl Gateway {
    /// Create a gateway over a fixed set of backend sessions.
    ///
    /// Pool membership never changes after startup; sessions are selected
    /// per request by current load.
    pub fn new(config: StreamgateConfig, sessions: Vec<Arc<dyn ChatSession>>) -> Self {
        let registry = ResolverRegistry::new(config.gateway.resolved_cache_entries);
        let upstream = UpstreamProxy::new(&config.network);

        tracing::info!(sessions = sessions.len(), "gateway initialized");

        Self {
            config,
            pool: Arc::new(SessionPool::new(sessions)),
            registry,
            upstream,
        }
    }

    /// Session pool, for health reporting.
    pub fn pool(&self) -> &Arc<SessionPool> {
        &self.pool
    }

    /// Resolver registry, for session teardown.
    pub fn registry(&self) -> &ResolverRegistry {
        &self.registry
    }

    /// Prepare a native-path response: select a session, resolve and verify
    /// the item, validate the range, and plan the chunk fetches.
    ///
    /// With `want_body` the returned stream owns the session lease until the
    /// body completes or is dropped; without it the lease is released before
    /// returning.
    ///
    /// # Errors
    /// - `GatewayError::NoSessions` - Pool is empty
    /// - `GatewayError::MetadataNotFound` - Item cannot be located
    /// - `GatewayError::HashMismatch` - Locator fragment does not match
    /// - `GatewayError::MalformedRange` / `RangeNotSatisfiable` - Bad range
    /// - `GatewayError::Backend` - Session-level failure
    pub async fn open_media_stream(
        &self,
        locator: &MediaLocator,
        range_header: Option<&str>,
        want_body: bool,
    ) -> GatewayResult<MediaStream> {
        let lease = self.pool.acquire().ok_or(GatewayError::NoSessions)?;
        let resolver = self.registry.resolver_for(&lease);

        let file = resolver.resolve(locator).await?;
        let range = range::parse_range_header(range_header, file.size_bytes)?;
        let plan = ChunkPlan::compute(&range, self.config.gateway.chunk_size);

        tracing::debug!(
            session = lease.session().session_id(),
            unique_id = %file.unique_id,
            from = range.from_inclusive,
            until = range.until_inclusive,
            parts = plan.part_count,
            "media stream prepared"
        );

        let body = want_body.then(|| ChunkStream::new(Arc::clone(&file), lease, plan));

        Ok(MediaStream {
            file,
            range,
            plan,
            ranged: range_header.is_some(),
            body,
        })
    }

    /// Open a passthrough stream to an arbitrary upstream URL.
    ///
    /// Probes the destination first (best effort), then issues the streaming
    /// GET with the inbound Range header forwarded verbatim.
    ///
    /// # Errors
    /// - `GatewayError::InvalidUpstreamUrl` - Destination is not fetchable
    /// - `GatewayError::UpstreamFetch` - Upstream refused or failed
    pub async fn open_upstream_stream(
        &self,
        target: &ProxyTarget,
        range_header: Option<&str>,
    ) -> GatewayResult<(Option<UpstreamProbe>, UpstreamStream)> {
        let url = upstream::parse_upstream_url(&target.url)?;

        let probe = self.upstream.probe(&url, range_header).await;
        let stream = self.upstream.open(&url, range_header).await?;

        Ok((probe, stream))
    }
}
