//! Chat-storage backend session contract
//!
//! Abstracts one authenticated connection to the chat-based object store.
//! The gateway only ever talks to the backend through this trait, so real
//! transports and in-memory simulations are interchangeable.

use async_trait::async_trait;
use bytes::Bytes;

/// Error types for backend session operations
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The requested item does not exist or holds no supported media.
    #[error("Item {item_id} not found in container {container_id}")]
    ItemNotFound {
        /// Container the lookup was issued against
        container_id: i64,
        /// Item that could not be located
        item_id: i64,
    },

    /// A chunk fetch failed mid-transfer.
    #[error("Chunk fetch failed at offset {offset}: {reason}")]
    ChunkFetchFailed {
        /// Byte offset of the failed fetch
        offset: u64,
        /// Description of the failure
        reason: String,
    },

    /// The session itself is unusable (disconnected, unauthorized, ...).
    #[error("Session error: {reason}")]
    Session {
        /// Description of the session failure
        reason: String,
    },
}

/// Result type for backend session operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Media payload category carried by a stored item.
///
/// Resolved once at metadata-resolution time; downstream code matches on
/// this instead of probing optional attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Streamable video payload
    Video,
    /// Generic document payload
    Document,
}

/// File metadata for one stored media item, as reported by the backend.
///
/// Shared read-only between concurrent requests once resolved; the backend
/// remains authoritative, so re-resolution is always safe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    /// Opaque backend reference used to fetch chunks of this file
    pub fetch_ref: String,
    /// Content-derived unique identifier
    pub unique_id: String,
    /// Total file size in bytes
    pub size_bytes: u64,
    /// Original file name, if the backend recorded one
    pub file_name: Option<String>,
    /// Declared mime type, if the backend recorded one
    pub mime_type: Option<String>,
    /// Payload category of the item
    pub kind: MediaKind,
}

/// One pooled connection to the chat-storage backend.
///
/// Implementations must be safe to share between concurrent requests; the
/// gateway serializes nothing on their behalf.
#[async_trait]
pub trait ChatSession: Send + Sync {
    /// Resolve item metadata through this session.
    ///
    /// # Errors
    /// - `BackendError::ItemNotFound` - No such item, or no supported media in it
    /// - `BackendError::Session` - Session-level failure
    async fn resolve_item(&self, container_id: i64, item_id: i64) -> BackendResult<ResolvedFile>;

    /// Fetch one fixed-size chunk of a resolved file at `byte_offset`.
    ///
    /// The final chunk of a file may be shorter than `chunk_size`; callers
    /// must tolerate short reads at end of file.
    ///
    /// # Errors
    /// - `BackendError::ChunkFetchFailed` - Transfer failed at this offset
    /// - `BackendError::Session` - Session-level failure
    async fn fetch_chunk(
        &self,
        fetch_ref: &str,
        byte_offset: u64,
        chunk_size: u64,
    ) -> BackendResult<Bytes>;

    /// Stable identifier for this session, used in logs and health output.
    fn session_id(&self) -> &str;
}
