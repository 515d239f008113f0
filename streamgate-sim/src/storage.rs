//! In-memory item store shared by simulated sessions

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use streamgate_core::backend::{MediaKind, ResolvedFile};

/// One stored media item: resolved metadata plus its full content.
#[derive(Debug, Clone)]
pub struct StoredItem {
    /// Metadata as a real backend would report it
    pub file: ResolvedFile,
    /// Complete item content
    pub content: Bytes,
}

/// Process-wide item store behind the simulated sessions.
///
/// All sessions of a simulated pool share one storage instance, mirroring a
/// real deployment where every session sees the same remote store.
#[derive(Default)]
pub struct InMemoryChatStorage {
    items: RwLock<HashMap<(i64, i64), Arc<StoredItem>>>,
}

impl InMemoryChatStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an item, deriving its unique id from the content.
    ///
    /// Returns the resolved metadata, including the derived unique id that
    /// callers need to mint valid stream tokens.
    pub fn insert_item(
        &self,
        container_id: i64,
        item_id: i64,
        file_name: Option<&str>,
        mime_type: Option<&str>,
        kind: MediaKind,
        content: Bytes,
    ) -> ResolvedFile {
        let file = ResolvedFile {
            fetch_ref: format!("{container_id}:{item_id}"),
            unique_id: content_unique_id(&content),
            size_bytes: content.len() as u64,
            file_name: file_name.map(str::to_string),
            mime_type: mime_type.map(str::to_string),
            kind,
        };

        let item = Arc::new(StoredItem {
            file: file.clone(),
            content,
        });
        self.items.write().insert((container_id, item_id), item);

        tracing::debug!(
            container_id,
            item_id,
            size_bytes = file.size_bytes,
            "stored simulated item"
        );

        file
    }

    /// Look up an item by container and item id.
    pub fn item(&self, container_id: i64, item_id: i64) -> Option<Arc<StoredItem>> {
        self.items.read().get(&(container_id, item_id)).cloned()
    }

    /// Look up an item by its fetch reference.
    pub fn item_by_ref(&self, fetch_ref: &str) -> Option<Arc<StoredItem>> {
        let (container, item) = fetch_ref.split_once(':')?;
        let container_id = container.parse().ok()?;
        let item_id = item.parse().ok()?;
        self.item(container_id, item_id)
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Whether the store holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

/// Derive a stable content-based unique id, hex-encoded.
fn content_unique_id(content: &Bytes) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    content.len().hash(&mut hasher);
    hex::encode(hasher.finish().to_be_bytes())
}

/// Deterministic content for tests and development fixtures.
///
/// Byte `i` is `i % 251`, so any sub-range can be asserted without holding
/// a copy of the whole buffer.
pub fn patterned_bytes(len: usize) -> Bytes {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_lookup() {
        let storage = InMemoryChatStorage::new();
        let file = storage.insert_item(
            -100,
            42,
            Some("movie.mkv"),
            Some("video/x-matroska"),
            MediaKind::Video,
            patterned_bytes(1000),
        );

        let item = storage.item(-100, 42).unwrap();
        assert_eq!(item.file, file);
        assert_eq!(item.content.len(), 1000);
    }

    #[test]
    fn test_unique_id_is_content_derived() {
        let storage = InMemoryChatStorage::new();
        let first = storage.insert_item(
            1,
            1,
            None,
            None,
            MediaKind::Document,
            patterned_bytes(500),
        );
        let same_content = storage.insert_item(
            1,
            2,
            None,
            None,
            MediaKind::Document,
            patterned_bytes(500),
        );
        let other_content = storage.insert_item(
            1,
            3,
            None,
            None,
            MediaKind::Document,
            patterned_bytes(501),
        );

        assert_eq!(first.unique_id, same_content.unique_id);
        assert_ne!(first.unique_id, other_content.unique_id);
    }

    #[test]
    fn test_lookup_by_fetch_ref() {
        let storage = InMemoryChatStorage::new();
        let file = storage.insert_item(
            -100,
            7,
            None,
            None,
            MediaKind::Video,
            patterned_bytes(10),
        );

        assert!(storage.item_by_ref(&file.fetch_ref).is_some());
        assert!(storage.item_by_ref("9:9").is_none());
        assert!(storage.item_by_ref("garbage").is_none());
    }

    #[test]
    fn test_patterned_bytes_wraps_at_prime() {
        let bytes = patterned_bytes(600);
        assert_eq!(bytes[0], 0);
        assert_eq!(bytes[250], 250);
        assert_eq!(bytes[251], 0);
        assert_eq!(bytes[502], 0);
    }
}
