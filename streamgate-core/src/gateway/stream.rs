//! Lazy chunk streaming for one ranged response
//!
//! Fetches the planned chunks one at a time through the leased session,
//! trims the first and last chunk to the requested interval, and yields the
//! result as a forward-only stream of byte buffers. Nothing is fetched until
//! the previous buffer has been accepted downstream, so transport
//! backpressure throttles backend I/O naturally.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use futures::stream;

use super::plan::ChunkPlan;
use super::pool::SessionLease;
use super::{GatewayError, GatewayResult};
use crate::backend::{BackendError, ResolvedFile};

/// Forward-only stream of trimmed chunk buffers for one response body.
///
/// Single-pass and not restartable; a new request must build a new stream.
/// The stream owns its session lease: dropping it (client disconnect) stops
/// further backend fetches and releases the session immediately.
pub struct ChunkStream {
    inner: Pin<Box<dyn Stream<Item = GatewayResult<Bytes>> + Send>>,
}

struct StreamState {
    file: Arc<ResolvedFile>,
    lease: SessionLease,
    plan: ChunkPlan,
    next_part: u64,
    finished: bool,
}

impl ChunkStream {
    /// Build the body stream for a resolved file and fetch plan.
    ///
    /// The lease is held until the stream completes or is dropped.
    pub(crate) fn new(file: Arc<ResolvedFile>, lease: SessionLease, plan: ChunkPlan) -> Self {
        let state = StreamState {
            file,
            lease,
            plan,
            next_part: 0,
            finished: false,
        };

        let inner = stream::try_unfold(state, |mut state| async move {
            if state.finished || state.next_part >= state.plan.part_count {
                return Ok(None);
            }

            let offset = state.plan.chunk_offset(state.next_part);
            let raw = state
                .lease
                .session()
                .fetch_chunk(&state.file.fetch_ref, offset, state.plan.chunk_size)
                .await?;

            let is_first = state.next_part == 0;
            let is_last = state.next_part == state.plan.part_count - 1;
            let raw_len = raw.len() as u64;

            if raw_len < state.plan.chunk_size && !is_last {
                // A short interior chunk is only legitimate when the file
                // actually ends here.
                if offset + raw_len < state.file.size_bytes {
                    return Err(GatewayError::Backend(BackendError::ChunkFetchFailed {
                        offset,
                        reason: format!(
                            "short chunk: got {raw_len} bytes, file continues past {}",
                            offset + raw_len
                        ),
                    }));
                }
                state.finished = true;
            }

            let start = if is_first {
                state.plan.first_trim.min(raw_len)
            } else {
                0
            };
            let end = if is_last {
                state.plan.last_trim.min(raw_len)
            } else {
                raw_len
            };

            if start >= end {
                return Ok(None);
            }

            let trimmed = raw.slice(start as usize..end as usize);
            state.next_part += 1;
            Ok(Some((trimmed, state)))
        });

        Self {
            inner: Box::pin(inner),
        }
    }
}

impl Stream for ChunkStream {
    type Item = GatewayResult<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use futures::TryStreamExt;

    use super::*;
    use crate::backend::{BackendResult, ChatSession, MediaKind};
    use crate::gateway::pool::SessionPool;
    use crate::gateway::range::ByteRange;

    /// Session serving a deterministic in-memory file, with optional
    /// injected failure at a chunk offset.
    struct FixtureSession {
        content: Vec<u8>,
        fail_at_offset: Option<u64>,
        fetch_calls: AtomicUsize,
    }

    impl FixtureSession {
        fn new(len: usize) -> Self {
            Self {
                content: (0..len).map(|i| (i % 251) as u8).collect(),
                fail_at_offset: None,
                fetch_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ChatSession for FixtureSession {
        async fn resolve_item(
            &self,
            container_id: i64,
            item_id: i64,
        ) -> BackendResult<ResolvedFile> {
            Ok(ResolvedFile {
                fetch_ref: format!("{container_id}:{item_id}"),
                unique_id: "fixture".to_string(),
                size_bytes: self.content.len() as u64,
                file_name: None,
                mime_type: None,
                kind: MediaKind::Video,
            })
        }

        async fn fetch_chunk(
            &self,
            _fetch_ref: &str,
            byte_offset: u64,
            chunk_size: u64,
        ) -> BackendResult<Bytes> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);

            if self.fail_at_offset == Some(byte_offset) {
                return Err(BackendError::ChunkFetchFailed {
                    offset: byte_offset,
                    reason: "injected failure".to_string(),
                });
            }

            let start = (byte_offset as usize).min(self.content.len());
            let end = (byte_offset + chunk_size).min(self.content.len() as u64) as usize;
            Ok(Bytes::copy_from_slice(&self.content[start..end]))
        }

        fn session_id(&self) -> &str {
            "fixture"
        }
    }

    fn file_for(session: &FixtureSession) -> Arc<ResolvedFile> {
        Arc::new(ResolvedFile {
            fetch_ref: "0:0".to_string(),
            unique_id: "fixture".to_string(),
            size_bytes: session.content.len() as u64,
            file_name: None,
            mime_type: None,
            kind: MediaKind::Video,
        })
    }

    async fn collect_stream(
        session: Arc<FixtureSession>,
        from: u64,
        until: u64,
        chunk_size: u64,
    ) -> GatewayResult<Vec<u8>> {
        let file = file_for(&session);
        let pool = Arc::new(SessionPool::new(vec![
            Arc::clone(&session) as Arc<dyn ChatSession>
        ]));
        let lease = pool.acquire().unwrap();

        let range = ByteRange {
            from_inclusive: from,
            until_inclusive: until,
            total_size: file.size_bytes,
        };
        let plan = ChunkPlan::compute(&range, chunk_size);

        let stream = ChunkStream::new(file, lease, plan);
        let buffers: Vec<Bytes> = stream.try_collect().await?;
        Ok(buffers.concat())
    }

    #[tokio::test]
    async fn test_single_chunk_range_trims_both_ends() {
        let session = Arc::new(FixtureSession::new(1000));
        let body = collect_stream(Arc::clone(&session), 100, 199, 256).await.unwrap();

        assert_eq!(body.len(), 100);
        assert_eq!(body, session.content[100..200]);
        assert_eq!(session.fetch_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_multi_chunk_range_is_byte_exact() {
        let session = Arc::new(FixtureSession::new(4000));
        let body = collect_stream(Arc::clone(&session), 300, 3200, 1024).await.unwrap();

        assert_eq!(body.len(), 2901);
        assert_eq!(body, session.content[300..3201]);
        assert_eq!(session.fetch_calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_full_file_stream() {
        let session = Arc::new(FixtureSession::new(3000));
        let body = collect_stream(Arc::clone(&session), 0, 2999, 1024).await.unwrap();

        assert_eq!(body, session.content);
    }

    #[tokio::test]
    async fn test_range_ending_on_chunk_boundary() {
        let session = Arc::new(FixtureSession::new(4000));
        let body = collect_stream(Arc::clone(&session), 0, 1024, 1024).await.unwrap();

        assert_eq!(body.len(), 1025);
        assert_eq!(body, session.content[..1025]);
    }

    #[tokio::test]
    async fn test_fetch_error_terminates_stream() {
        let mut session = FixtureSession::new(4000);
        session.fail_at_offset = Some(2048);
        let session = Arc::new(session);

        let result = collect_stream(session, 0, 3999, 1024).await;
        assert!(matches!(result, Err(GatewayError::Backend(_))));
    }

    #[tokio::test]
    async fn test_short_final_chunk_truncates_cleanly() {
        // File is shorter than a whole chunk multiple; the final fetch
        // returns fewer bytes than chunk_size.
        let session = Arc::new(FixtureSession::new(2500));
        let body = collect_stream(Arc::clone(&session), 0, 2499, 1024).await.unwrap();

        assert_eq!(body, session.content);
    }

    #[tokio::test]
    async fn test_dropping_stream_releases_lease() {
        let session = Arc::new(FixtureSession::new(4000));
        let file = file_for(&session);
        let pool = Arc::new(SessionPool::new(vec![
            Arc::clone(&session) as Arc<dyn ChatSession>
        ]));
        let lease = pool.acquire().unwrap();
        assert_eq!(pool.load_snapshot()[0].load, 1);

        let range = ByteRange {
            from_inclusive: 0,
            until_inclusive: 3999,
            total_size: 4000,
        };
        let plan = ChunkPlan::compute(&range, 1024);
        let stream = ChunkStream::new(file, lease, plan);

        // Abandon the stream without polling it to completion
        drop(stream);
        assert_eq!(pool.load_snapshot()[0].load, 0);
    }

    #[tokio::test]
    async fn test_completed_stream_releases_lease() {
        let session = Arc::new(FixtureSession::new(1000));
        let file = file_for(&session);
        let pool = Arc::new(SessionPool::new(vec![
            Arc::clone(&session) as Arc<dyn ChatSession>
        ]));
        let lease = pool.acquire().unwrap();

        let range = ByteRange {
            from_inclusive: 0,
            until_inclusive: 999,
            total_size: 1000,
        };
        let plan = ChunkPlan::compute(&range, 256);
        let stream = ChunkStream::new(file, lease, plan);

        let _body: Vec<Bytes> = stream.try_collect().await.unwrap();
        assert_eq!(pool.load_snapshot()[0].load, 0);
    }
}
