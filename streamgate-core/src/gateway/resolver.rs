//! Metadata resolution with per-session caching
//!
//! Resolves a media locator to file metadata through a pooled session. Each
//! session gets one lightweight resolver, created lazily and held in an
//! explicit registry owned by the gateway, with a teardown step for retired
//! sessions. Resolved metadata is memoized per session; re-resolution is
//! always safe since the backend remains authoritative.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use super::pool::{SessionHandle, SessionLease};
use super::{GatewayError, GatewayResult, MediaLocator};
use crate::backend::{BackendError, ChatSession, ResolvedFile};

/// Length of the unique-id prefix carried in stream tokens.
///
/// The fragment gates access so valid container/item ids cannot be confirmed
/// by enumeration alone. It is not a cryptographic boundary; anyone holding
/// the full token can stream the item.
pub const HASH_FRAGMENT_LEN: usize = 6;

/// Registry of per-session resolvers, owned by the gateway context.
pub struct ResolverRegistry {
    cache_entries: NonZeroUsize,
    resolvers: Mutex<HashMap<usize, Arc<SessionResolver>>>,
}

impl ResolverRegistry {
    /// Create an empty registry; resolvers are added lazily per session.
    pub fn new(cache_entries: usize) -> Self {
        let cache_entries = NonZeroUsize::new(cache_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache_entries,
            resolvers: Mutex::new(HashMap::new()),
        }
    }

    /// Resolver bound to the leased session, creating it on first use.
    ///
    /// Concurrent first lookups for the same session race benignly; the
    /// entry inserted first wins and later callers share it.
    pub fn resolver_for(&self, lease: &SessionLease) -> Arc<SessionResolver> {
        let mut resolvers = self.resolvers.lock();
        Arc::clone(
            resolvers
                .entry(lease.handle().index())
                .or_insert_with(|| {
                    Arc::new(SessionResolver::new(
                        Arc::clone(lease.session()),
                        self.cache_entries,
                    ))
                }),
        )
    }

    /// Drop the resolver for a retired session.
    ///
    /// Returns whether an entry existed. In-flight requests holding the
    /// resolver keep it alive until they complete.
    pub fn retire(&self, handle: SessionHandle) -> bool {
        self.resolvers.lock().remove(&handle.index()).is_some()
    }

    /// Number of sessions with a live resolver.
    pub fn len(&self) -> usize {
        self.resolvers.lock().len()
    }

    /// Whether no resolver has been created yet.
    pub fn is_empty(&self) -> bool {
        self.resolvers.lock().is_empty()
    }
}

/// Resolver bound to one backend session, memoizing resolved metadata.
pub struct SessionResolver {
    session: Arc<dyn ChatSession>,
    resolved: Mutex<LruCache<(i64, i64), Arc<ResolvedFile>>>,
}

impl SessionResolver {
    fn new(session: Arc<dyn ChatSession>, cache_entries: NonZeroUsize) -> Self {
        Self {
            session,
            resolved: Mutex::new(LruCache::new(cache_entries)),
        }
    }

    /// Resolve a locator to file metadata and verify its hash fragment.
    ///
    /// The fragment check fails closed: on mismatch no metadata leaves this
    /// function, and the error is indistinguishable from a missing item at
    /// the HTTP boundary.
    ///
    /// # Errors
    /// - `GatewayError::MetadataNotFound` - Item cannot be located
    /// - `GatewayError::HashMismatch` - Fragment does not match the unique id
    /// - `GatewayError::Backend` - Session-level failure
    pub async fn resolve(&self, locator: &MediaLocator) -> GatewayResult<Arc<ResolvedFile>> {
        let key = (locator.container_id, locator.item_id);

        let cached = self.resolved.lock().get(&key).cloned();
        let file = match cached {
            Some(file) => file,
            None => {
                let file = self
                    .session
                    .resolve_item(locator.container_id, locator.item_id)
                    .await
                    .map_err(|error| match error {
                        BackendError::ItemNotFound {
                            container_id,
                            item_id,
                        } => GatewayError::MetadataNotFound {
                            container_id,
                            item_id,
                        },
                        other => GatewayError::Backend(other),
                    })?;
                let file = Arc::new(file);
                self.resolved.lock().put(key, Arc::clone(&file));
                file
            }
        };

        verify_hash_fragment(locator, &file)?;
        Ok(file)
    }
}

fn verify_hash_fragment(locator: &MediaLocator, file: &ResolvedFile) -> GatewayResult<()> {
    let fragment = locator.hash_fragment.as_str();
    if fragment.len() == HASH_FRAGMENT_LEN
        && file.unique_id.len() >= HASH_FRAGMENT_LEN
        && file.unique_id.starts_with(fragment)
    {
        Ok(())
    } else {
        Err(GatewayError::HashMismatch)
    }
}
