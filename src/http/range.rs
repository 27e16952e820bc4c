//! HTTP Range request parsing module
//!
//! Single-range `bytes=` parsing for partial downloads (RFC 7233).

/// Byte range resolved against a file size, both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered
    #[inline]
    #[allow(clippy::len_without_is_empty)]
    pub const fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` header value
    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{total}", self.start, self.end)
    }
}

/// Range header parse result
#[derive(Debug, PartialEq, Eq)]
pub enum RangeParseResult {
    /// Satisfiable range, resolved against the file size
    Valid(ByteRange),
    /// Range cannot be served - should return 416
    NotSatisfiable,
    /// No Range header, other unit, multi-range or malformed (serve full content)
    None,
}

/// Parse an HTTP Range header against a file of `file_size` bytes
///
/// Supported formats:
/// - `bytes=start-end` - Specific range (end clamped to the last byte)
/// - `bytes=start-` - From start to end of file
/// - `bytes=-suffix` - Last `suffix` bytes
///
/// # Examples
/// ```
/// use asset_server::http::range::{parse_range_header, ByteRange, RangeParseResult};
///
/// let result = parse_range_header(Some("bytes=0-99"), 1000);
/// assert_eq!(result, RangeParseResult::Valid(ByteRange { start: 0, end: 99 }));
///
/// let result = parse_range_header(None, 1000);
/// assert_eq!(result, RangeParseResult::None);
/// ```
pub fn parse_range_header(range_header: Option<&str>, file_size: u64) -> RangeParseResult {
    let Some(header) = range_header else {
        return RangeParseResult::None;
    };

    let Some(ranges) = header.trim().strip_prefix("bytes=") else {
        return RangeParseResult::None;
    };

    // Multi-range responses (multipart/byteranges) are not produced
    if ranges.contains(',') {
        return RangeParseResult::None;
    }

    let Some((start_str, end_str)) = ranges.split_once('-') else {
        return RangeParseResult::None;
    };
    let (start_str, end_str) = (start_str.trim(), end_str.trim());

    if start_str.is_empty() {
        parse_suffix_range(end_str, file_size)
    } else {
        parse_standard_range(start_str, end_str, file_size)
    }
}

/// Parse suffix range (e.g., "-500")
fn parse_suffix_range(suffix_str: &str, file_size: u64) -> RangeParseResult {
    let Ok(suffix) = suffix_str.parse::<u64>() else {
        return RangeParseResult::None;
    };

    if suffix == 0 || file_size == 0 {
        return RangeParseResult::NotSatisfiable;
    }

    RangeParseResult::Valid(ByteRange {
        start: file_size.saturating_sub(suffix),
        end: file_size - 1,
    })
}

/// Parse standard range (e.g., "0-99" or "100-")
fn parse_standard_range(start_str: &str, end_str: &str, file_size: u64) -> RangeParseResult {
    let Ok(start) = start_str.parse::<u64>() else {
        return RangeParseResult::None;
    };

    if start >= file_size {
        return RangeParseResult::NotSatisfiable;
    }

    let last = file_size - 1;
    let end = if end_str.is_empty() {
        last
    } else {
        let Ok(e) = end_str.parse::<u64>() else {
            return RangeParseResult::None;
        };
        e.min(last)
    };

    if start > end {
        return RangeParseResult::NotSatisfiable;
    }

    RangeParseResult::Valid(ByteRange { start, end })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_range() {
        assert_eq!(parse_range_header(None, 100), RangeParseResult::None);
    }

    #[test]
    fn test_standard_range() {
        match parse_range_header(Some("bytes=0-9"), 100) {
            RangeParseResult::Valid(r) => {
                assert_eq!(r, ByteRange { start: 0, end: 9 });
                assert_eq!(r.len(), 10);
                assert_eq!(r.content_range(100), "bytes 0-9/100");
            }
            other => panic!("Expected Valid, got {other:?}"),
        }
    }

    #[test]
    fn test_open_range() {
        assert_eq!(
            parse_range_header(Some("bytes=50-"), 100),
            RangeParseResult::Valid(ByteRange { start: 50, end: 99 })
        );
    }

    #[test]
    fn test_end_clamped() {
        assert_eq!(
            parse_range_header(Some("bytes=90-500"), 100),
            RangeParseResult::Valid(ByteRange { start: 90, end: 99 })
        );
    }

    #[test]
    fn test_suffix_range() {
        assert_eq!(
            parse_range_header(Some("bytes=-20"), 100),
            RangeParseResult::Valid(ByteRange { start: 80, end: 99 })
        );
        assert_eq!(
            parse_range_header(Some("bytes=-500"), 100),
            RangeParseResult::Valid(ByteRange { start: 0, end: 99 })
        );
    }

    #[test]
    fn test_not_satisfiable() {
        assert_eq!(
            parse_range_header(Some("bytes=200-"), 100),
            RangeParseResult::NotSatisfiable
        );
        assert_eq!(
            parse_range_header(Some("bytes=-0"), 100),
            RangeParseResult::NotSatisfiable
        );
        assert_eq!(
            parse_range_header(Some("bytes=20-10"), 100),
            RangeParseResult::NotSatisfiable
        );
        assert_eq!(
            parse_range_header(Some("bytes=0-"), 0),
            RangeParseResult::NotSatisfiable
        );
    }

    #[test]
    fn test_invalid_format() {
        for header in ["bytes=a-b", "bytes=0-9,20-29", "items=0-9", "bytes=10"] {
            assert_eq!(
                parse_range_header(Some(header), 100),
                RangeParseResult::None,
                "{header}"
            );
        }
    }
}
