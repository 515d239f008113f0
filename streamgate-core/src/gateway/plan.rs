//! Chunk fetch planning for ranged streaming
//!
//! Converts a validated byte range into an aligned sequence of fixed-size
//! chunk fetches plus the trim amounts that cut the first and last chunk
//! down to the exact requested interval. Integer arithmetic only.

use super::range::ByteRange;

/// Deterministic plan for satisfying one byte range with aligned chunk
/// fetches.
///
/// The first fetched chunk is trimmed by `first_trim` bytes from its start
/// and the last chunk is kept up to `last_trim` bytes; interior chunks pass
/// through unmodified. Trimmed output totals exactly `requested_length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    /// Fixed chunk fetch size in bytes
    pub chunk_size: u64,
    /// Chunk-aligned offset of the first fetch
    pub aligned_offset: u64,
    /// Bytes to drop from the start of the first chunk
    pub first_trim: u64,
    /// Bytes to keep from the start of the last chunk
    pub last_trim: u64,
    /// Number of chunk fetches required
    pub part_count: u64,
    /// Exact number of bytes the trimmed output must total
    pub requested_length: u64,
}

impl ChunkPlan {
    /// Compute the fetch plan for a validated range.
    ///
    /// `chunk_size` must be at least 1.
    pub fn compute(range: &ByteRange, chunk_size: u64) -> Self {
        let from = range.from_inclusive;
        let until = range.until_inclusive;

        let aligned_offset = from - (from % chunk_size);
        let first_trim = from - aligned_offset;
        let last_trim = (until % chunk_size) + 1;
        let requested_length = until - from + 1;
        // Count every chunk from the one containing `from` through the one
        // containing `until`, inclusive.
        let part_count = until / chunk_size - aligned_offset / chunk_size + 1;

        Self {
            chunk_size,
            aligned_offset,
            first_trim,
            last_trim,
            part_count,
            requested_length,
        }
    }

    /// Byte offset of the fetch for chunk `index` within this plan.
    pub fn chunk_offset(&self, index: u64) -> u64 {
        self.aligned_offset + index * self.chunk_size
    }
}
