//! Simulated backend sessions
//!
//! Each simulated session wraps the shared in-memory store and implements
//! the same contract a real chat-storage connection would, with optional
//! latency and failure injection for exercising error paths.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use streamgate_core::backend::{BackendError, BackendResult, ChatSession, ResolvedFile};

use crate::storage::InMemoryChatStorage;

/// Behavior knobs for one simulated session.
#[derive(Debug, Clone, Default)]
pub struct SimSessionConfig {
    /// Artificial delay applied to every backend call
    pub latency: Option<Duration>,
    /// Fail every chunk fetch at exactly this byte offset
    pub fail_chunk_at_offset: Option<u64>,
}

/// One simulated connection to the in-memory store.
pub struct SimulatedSession {
    id: String,
    storage: Arc<InMemoryChatStorage>,
    config: SimSessionConfig,
}

impl SimulatedSession {
    /// Create a session over the shared store.
    pub fn new(id: impl Into<String>, storage: Arc<InMemoryChatStorage>) -> Self {
        Self::with_config(id, storage, SimSessionConfig::default())
    }

    /// Create a session with explicit behavior knobs.
    pub fn with_config(
        id: impl Into<String>,
        storage: Arc<InMemoryChatStorage>,
        config: SimSessionConfig,
    ) -> Self {
        Self {
            id: id.into(),
            storage,
            config,
        }
    }

    async fn apply_latency(&self) {
        if let Some(latency) = self.config.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl ChatSession for SimulatedSession {
    async fn resolve_item(&self, container_id: i64, item_id: i64) -> BackendResult<ResolvedFile> {
        self.apply_latency().await;

        self.storage
            .item(container_id, item_id)
            .map(|item| item.file.clone())
            .ok_or(BackendError::ItemNotFound {
                container_id,
                item_id,
            })
    }

    async fn fetch_chunk(
        &self,
        fetch_ref: &str,
        byte_offset: u64,
        chunk_size: u64,
    ) -> BackendResult<Bytes> {
        self.apply_latency().await;

        if self.config.fail_chunk_at_offset == Some(byte_offset) {
            return Err(BackendError::ChunkFetchFailed {
                offset: byte_offset,
                reason: "injected chunk failure".to_string(),
            });
        }

        let item = self
            .storage
            .item_by_ref(fetch_ref)
            .ok_or_else(|| BackendError::Session {
                reason: format!("unknown fetch ref {fetch_ref:?}"),
            })?;

        let len = item.content.len() as u64;
        let start = byte_offset.min(len);
        let end = (byte_offset + chunk_size).min(len);
        Ok(item.content.slice(start as usize..end as usize))
    }

    fn session_id(&self) -> &str {
        &self.id
    }
}

/// Build a pool's worth of simulated sessions over one shared store.
pub fn simulated_session_pool(
    storage: Arc<InMemoryChatStorage>,
    count: usize,
) -> Vec<Arc<dyn ChatSession>> {
    (0..count)
        .map(|index| {
            Arc::new(SimulatedSession::new(
                format!("sim-{index}"),
                Arc::clone(&storage),
            )) as Arc<dyn ChatSession>
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use streamgate_core::backend::MediaKind;

    use super::*;
    use crate::storage::patterned_bytes;

    fn storage_with_item() -> (Arc<InMemoryChatStorage>, ResolvedFile) {
        let storage = Arc::new(InMemoryChatStorage::new());
        let file = storage.insert_item(
            -100,
            1,
            Some("clip.mp4"),
            Some("video/mp4"),
            MediaKind::Video,
            patterned_bytes(3000),
        );
        (storage, file)
    }

    #[tokio::test]
    async fn test_resolve_known_item() {
        let (storage, file) = storage_with_item();
        let session = SimulatedSession::new("sim-0", storage);

        let resolved = session.resolve_item(-100, 1).await.unwrap();
        assert_eq!(resolved, file);
    }

    #[tokio::test]
    async fn test_resolve_unknown_item() {
        let (storage, _) = storage_with_item();
        let session = SimulatedSession::new("sim-0", storage);

        let result = session.resolve_item(-100, 99).await;
        assert!(matches!(
            result,
            Err(BackendError::ItemNotFound { item_id: 99, .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_chunk_slices_content() {
        let (storage, file) = storage_with_item();
        let session = SimulatedSession::new("sim-0", storage);

        let chunk = session.fetch_chunk(&file.fetch_ref, 1024, 1024).await.unwrap();
        assert_eq!(chunk.len(), 1024);
        assert_eq!(chunk[0], (1024 % 251) as u8);
    }

    #[tokio::test]
    async fn test_fetch_final_chunk_is_short() {
        let (storage, file) = storage_with_item();
        let session = SimulatedSession::new("sim-0", storage);

        let chunk = session.fetch_chunk(&file.fetch_ref, 2048, 1024).await.unwrap();
        assert_eq!(chunk.len(), 952);
    }

    #[tokio::test]
    async fn test_injected_failure_at_offset() {
        let (storage, file) = storage_with_item();
        let session = SimulatedSession::with_config(
            "sim-0",
            storage,
            SimSessionConfig {
                latency: None,
                fail_chunk_at_offset: Some(1024),
            },
        );

        assert!(session.fetch_chunk(&file.fetch_ref, 0, 1024).await.is_ok());
        let result = session.fetch_chunk(&file.fetch_ref, 1024, 1024).await;
        assert!(matches!(
            result,
            Err(BackendError::ChunkFetchFailed { offset: 1024, .. })
        ));
    }

    #[tokio::test]
    async fn test_session_pool_ids_are_stable() {
        let storage = Arc::new(InMemoryChatStorage::new());
        let sessions = simulated_session_pool(storage, 3);

        let ids: Vec<_> = sessions.iter().map(|s| s.session_id()).collect();
        assert_eq!(ids, vec!["sim-0", "sim-1", "sim-2"]);
    }
}
