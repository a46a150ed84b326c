//! `Range: bytes=...` parsing for single byte ranges

/// Inclusive byte span inside a file of known size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` value for a partial response
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, size)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum RangeOutcome {
    /// Serve only this span with 206
    Partial(ByteRange),
    /// Answer 416
    Unsatisfiable,
    /// Missing, malformed or multi-range header: serve the full content
    Full,
}

/// Parse a `Range` header against a file size.
///
/// Accepts `bytes=start-end`, `bytes=start-` and `bytes=-suffix`. Several
/// ranges in one header are not split into a multipart body; the whole file is
/// served instead.
pub fn parse_range(header: Option<&str>, size: u64) -> RangeOutcome {
    let Some(ranges) = header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return RangeOutcome::Full;
    };
    if ranges.contains(',') {
        return RangeOutcome::Full;
    }
    let Some((first, last)) = ranges.split_once('-') else {
        return RangeOutcome::Full;
    };
    let (first, last) = (first.trim(), last.trim());

    if first.is_empty() {
        // suffix form
        let Ok(suffix) = last.parse::<u64>() else {
            return RangeOutcome::Full;
        };
        if suffix == 0 || size == 0 {
            return RangeOutcome::Unsatisfiable;
        }
        return RangeOutcome::Partial(ByteRange { start: size.saturating_sub(suffix), end: size - 1 });
    }

    let Ok(start) = first.parse::<u64>() else {
        return RangeOutcome::Full;
    };
    if start >= size {
        return RangeOutcome::Unsatisfiable;
    }
    let end = if last.is_empty() {
        size - 1
    } else {
        match last.parse::<u64>() {
            Ok(end) if end < start => return RangeOutcome::Full,
            Ok(end) => end.min(size - 1),
            Err(_) => return RangeOutcome::Full,
        }
    };
    RangeOutcome::Partial(ByteRange { start, end })
}
