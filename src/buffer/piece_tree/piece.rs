//! Pieces: references into one of the two backing buffers

/// Which backing buffer a piece points into
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferSource {
    /// Write-once content loaded when the tree was created
    Original,
    /// Append-only buffer holding every inserted byte
    Edit,
}

/// A contiguous span of one backing buffer.
///
/// Pieces are immutable values; edits replace them with new pieces instead
/// of changing the bytes they reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Piece {
    pub source: BufferSource,
    pub start: usize,
    pub len: usize,
    /// Number of `\n` bytes inside the span
    pub line_breaks: usize,
}

impl Piece {
    /// Create a piece over `bytes`, which must be the span it references.
    #[must_use]
    pub fn new(source: BufferSource, start: usize, bytes: &[u8]) -> Self {
        Self {
            source,
            start,
            len: bytes.len(),
            line_breaks: count_line_breaks(bytes),
        }
    }

    #[must_use]
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Narrow the piece to `range` (relative to the piece start).
    ///
    /// `bytes` is the full span of the piece; line breaks are recounted by
    /// scanning the retained part.
    #[must_use]
    pub fn sub_piece(&self, bytes: &[u8], range: std::ops::Range<usize>) -> Self {
        debug_assert_eq!(bytes.len(), self.len);
        Self::new(self.source, self.start + range.start, &bytes[range])
    }

    /// Split at `offset` (relative to the piece start) into two pieces.
    #[must_use]
    pub fn split_at(&self, bytes: &[u8], offset: usize) -> (Self, Self) {
        let left = self.sub_piece(bytes, 0..offset);
        let right = Self {
            source: self.source,
            start: self.start + offset,
            len: self.len - offset,
            line_breaks: self.line_breaks - left.line_breaks,
        };
        (left, right)
    }
}

/// Count `\n` bytes
#[must_use]
pub fn count_line_breaks(bytes: &[u8]) -> usize {
    bytes.iter().filter(|&&b| b == b'\n').count()
}

/// Position just past the `n`th (1-based) line feed in `bytes`
#[must_use]
pub fn nth_line_end(bytes: &[u8], n: usize) -> Option<usize> {
    if n == 0 {
        return Some(0);
    }
    bytes
        .iter()
        .enumerate()
        .filter(|(_, &b)| b == b'\n')
        .nth(n - 1)
        .map(|(i, _)| i + 1)
}
