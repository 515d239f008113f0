//! HTTP Range header parsing for gateway requests
//!
//! Implements the `bytes=<from>-[<until>]` subset of RFC 7233 used by media
//! players, validated against a known total size before any headers are sent.

use super::{GatewayError, GatewayResult};

/// A validated inclusive byte range within a file of known size.
///
/// Invariant: `0 <= from_inclusive <= until_inclusive <= total_size - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte of the range
    pub from_inclusive: u64,
    /// Last byte of the range
    pub until_inclusive: u64,
    /// Total size of the file the range was validated against
    pub total_size: u64,
}

impl ByteRange {
    /// Number of bytes the range covers.
    pub fn len(&self) -> u64 {
        self.until_inclusive - self.from_inclusive + 1
    }

    /// Always false; a validated range covers at least one byte.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Parse and validate a Range header against a known total size.
///
/// A missing header yields the full range. A present header must match
/// `bytes=<from>-[<until>]`; a missing `until` defaults to the last byte.
///
/// # Errors
/// - `GatewayError::MalformedRange` - Header cannot be parsed as integers
/// - `GatewayError::RangeNotSatisfiable` - Range lies outside the file
pub fn parse_range_header(header: Option<&str>, total_size: u64) -> GatewayResult<ByteRange> {
    if total_size == 0 {
        return Err(GatewayError::RangeNotSatisfiable { total_size });
    }

    let Some(header) = header else {
        return Ok(ByteRange {
            from_inclusive: 0,
            until_inclusive: total_size - 1,
            total_size,
        });
    };

    let spec = header
        .strip_prefix("bytes=")
        .ok_or_else(|| GatewayError::MalformedRange {
            reason: format!("expected bytes=<from>-<until>, got {header:?}"),
        })?;

    let (from_str, until_str) =
        spec.split_once('-')
            .ok_or_else(|| GatewayError::MalformedRange {
                reason: format!("missing '-' separator in {spec:?}"),
            })?;

    let from_inclusive: u64 = from_str
        .trim()
        .parse()
        .map_err(|_| GatewayError::MalformedRange {
            reason: format!("invalid start position {from_str:?}"),
        })?;

    let until_inclusive: u64 = if until_str.trim().is_empty() {
        total_size - 1
    } else {
        until_str
            .trim()
            .parse()
            .map_err(|_| GatewayError::MalformedRange {
                reason: format!("invalid end position {until_str:?}"),
            })?
    };

    if until_inclusive > total_size - 1 || until_inclusive < from_inclusive {
        return Err(GatewayError::RangeNotSatisfiable { total_size });
    }

    Ok(ByteRange {
        from_inclusive,
        until_inclusive,
        total_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_header_yields_full_range() {
        let range = parse_range_header(None, 1000).unwrap();
        assert_eq!(range.from_inclusive, 0);
        assert_eq!(range.until_inclusive, 999);
        assert_eq!(range.len(), 1000);
    }

    #[test]
    fn test_closed_range() {
        let range = parse_range_header(Some("bytes=100-199"), 1000).unwrap();
        assert_eq!(range.from_inclusive, 100);
        assert_eq!(range.until_inclusive, 199);
        assert_eq!(range.len(), 100);
    }

    #[test]
    fn test_open_ended_range_defaults_to_last_byte() {
        let range = parse_range_header(Some("bytes=500-"), 1000).unwrap();
        assert_eq!(range.from_inclusive, 500);
        assert_eq!(range.until_inclusive, 999);
    }

    #[test]
    fn test_missing_prefix_is_malformed() {
        let result = parse_range_header(Some("items=0-5"), 1000);
        assert!(matches!(
            result,
            Err(GatewayError::MalformedRange { .. })
        ));
    }

    #[test]
    fn test_non_numeric_positions_are_malformed() {
        for header in ["bytes=abc-def", "bytes=-", "bytes=-500", "bytes=12"] {
            let result = parse_range_header(Some(header), 1000);
            assert!(
                matches!(result, Err(GatewayError::MalformedRange { .. })),
                "expected MalformedRange for {header:?}"
            );
        }
    }

    #[test]
    fn test_end_past_file_is_not_satisfiable() {
        let result = parse_range_header(Some("bytes=0-1000"), 1000);
        assert!(matches!(
            result,
            Err(GatewayError::RangeNotSatisfiable { total_size: 1000 })
        ));
    }

    #[test]
    fn test_inverted_range_is_not_satisfiable() {
        let result = parse_range_header(Some("bytes=500-100"), 1000);
        assert!(matches!(
            result,
            Err(GatewayError::RangeNotSatisfiable { .. })
        ));
    }

    #[test]
    fn test_empty_file_satisfies_nothing() {
        assert!(parse_range_header(None, 0).is_err());
        assert!(parse_range_header(Some("bytes=0-0"), 0).is_err());
    }

    #[test]
    fn test_last_byte_of_file() {
        let range = parse_range_header(Some("bytes=999-999"), 1000).unwrap();
        assert_eq!(range.len(), 1);
    }
}
