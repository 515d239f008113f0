//! Backend session pool with load-aware selection
//!
//! Tracks in-flight load per session and hands out the least-loaded one.
//! Acquisition is scoped: the returned lease decrements the counter on drop,
//! so every acquire is paired with exactly one release on all exit paths,
//! including cancellation.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::ChatSession;

/// Identifies one pooled backend session.
///
/// Handles are stable for the process lifetime; pool membership is fixed at
/// startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle(pub(crate) usize);

impl SessionHandle {
    /// Position of the session in the pool.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Point-in-time load of one session, for health reporting.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionLoad {
    /// Stable session identifier
    pub session_id: String,
    /// Requests currently holding a lease on this session
    pub load: usize,
}

/// Fixed pool of backend sessions with per-session load counters.
pub struct SessionPool {
    sessions: Vec<Arc<dyn ChatSession>>,
    loads: Mutex<Vec<usize>>,
}

impl SessionPool {
    /// Create a pool over a fixed set of sessions.
    pub fn new(sessions: Vec<Arc<dyn ChatSession>>) -> Self {
        let loads = Mutex::new(vec![0; sessions.len()]);
        Self { sessions, loads }
    }

    /// Number of sessions in the pool.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the pool holds no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Acquire the least-loaded session, ties broken by pool order.
    ///
    /// Returns `None` only for an empty pool. The lease releases the load
    /// slot when dropped.
    pub fn acquire(self: &Arc<Self>) -> Option<SessionLease> {
        let mut loads = self.loads.lock();
        let index = loads
            .iter()
            .enumerate()
            .min_by_key(|(_, load)| **load)
            .map(|(index, _)| index)?;
        loads[index] += 1;

        Some(SessionLease {
            pool: Arc::clone(self),
            handle: SessionHandle(index),
            session: Arc::clone(&self.sessions[index]),
        })
    }

    fn release(&self, handle: SessionHandle) {
        let mut loads = self.loads.lock();
        loads[handle.0] = loads[handle.0].saturating_sub(1);
    }

    /// Current load of every session, in pool order.
    pub fn load_snapshot(&self) -> Vec<SessionLoad> {
        let loads = self.loads.lock();
        self.sessions
            .iter()
            .zip(loads.iter())
            .map(|(session, load)| SessionLoad {
                session_id: session.session_id().to_string(),
                load: *load,
            })
            .collect()
    }
}

/// Scoped hold on one pooled session.
///
/// Dropping the lease decrements the session's load counter; leases are
/// owned by the body stream so a client disconnect releases the session.
pub struct SessionLease {
    pool: Arc<SessionPool>,
    handle: SessionHandle,
    session: Arc<dyn ChatSession>,
}

impl SessionLease {
    /// Handle of the leased session.
    pub fn handle(&self) -> SessionHandle {
        self.handle
    }

    /// The leased session.
    pub fn session(&self) -> &Arc<dyn ChatSession> {
        &self.session
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        self.pool.release(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use bytes::Bytes;

    use super::*;
    use crate::backend::{BackendResult, ChatSession, MediaKind, ResolvedFile};

    struct StubSession {
        id: String,
    }

    #[async_trait]
    impl ChatSession for StubSession {
        async fn resolve_item(
            &self,
            container_id: i64,
            item_id: i64,
        ) -> BackendResult<ResolvedFile> {
            Ok(ResolvedFile {
                fetch_ref: format!("{container_id}:{item_id}"),
                unique_id: "stub".to_string(),
                size_bytes: 0,
                file_name: None,
                mime_type: None,
                kind: MediaKind::Document,
            })
        }

        async fn fetch_chunk(
            &self,
            _fetch_ref: &str,
            _byte_offset: u64,
            _chunk_size: u64,
        ) -> BackendResult<Bytes> {
            Ok(Bytes::new())
        }

        fn session_id(&self) -> &str {
            &self.id
        }
    }

    fn pool_of(n: usize) -> Arc<SessionPool> {
        let sessions: Vec<Arc<dyn ChatSession>> = (0..n)
            .map(|i| {
                Arc::new(StubSession {
                    id: format!("session-{i}"),
                }) as Arc<dyn ChatSession>
            })
            .collect();
        Arc::new(SessionPool::new(sessions))
    }

    #[test]
    fn test_acquire_picks_minimum_load() {
        let pool = pool_of(3);
        *pool.loads.lock() = vec![5, 2, 8];

        let lease = pool.acquire().unwrap();
        assert_eq!(lease.handle().index(), 1);
        assert_eq!(pool.loads.lock()[1], 3);

        drop(lease);
        assert_eq!(pool.loads.lock()[1], 2);
    }

    #[test]
    fn test_ties_broken_by_pool_order() {
        let pool = pool_of(3);

        let lease = pool.acquire().unwrap();
        assert_eq!(lease.handle().index(), 0);
    }

    #[test]
    fn test_concurrent_leases_balance_across_pool() {
        let pool = pool_of(3);

        let leases: Vec<_> = (0..6).map(|_| pool.acquire().unwrap()).collect();
        assert_eq!(*pool.loads.lock(), vec![2, 2, 2]);

        drop(leases);
        assert_eq!(*pool.loads.lock(), vec![0, 0, 0]);
    }

    #[test]
    fn test_empty_pool_yields_no_lease() {
        let pool = pool_of(0);
        assert!(pool.acquire().is_none());
    }

    #[test]
    fn test_load_snapshot_reports_session_ids() {
        let pool = pool_of(2);
        let _lease = pool.acquire().unwrap();

        let snapshot = pool.load_snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].session_id, "session-0");
        assert_eq!(snapshot[0].load, 1);
        assert_eq!(snapshot[1].load, 0);
    }
}
