//! Buffer abstraction layer
//!
//! Read-only access to a document, decoupling consumers (renderers, search,
//! the FFI layer) from the storage representation.
//!
//! ## Indexing model
//!
//! All offsets are **byte based**. Lines are separated by `\n`; a document
//! with N line feeds has N + 1 lines and the line contents returned here never
//! include the line feed itself.
//!
//! ## Chunked reads
//!
//! Reads hand out borrowed slices, one per piece overlapping the requested
//! span, so callers can stream a document without copying it.

use crate::buffer::piece_tree::{Chunks, PieceTree};
use crate::buffer::TextBuffer;
use crate::error::Result;

/// Read-only view of a document.
pub trait BufferView {
    /// Total number of bytes in the document.
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of logical lines.
    fn line_count(&self) -> usize;

    /// Byte offset of the start of `line` (0-based).
    fn line_start(&self, line: usize) -> Result<usize>;

    /// Contents of `line` without the trailing newline.
    fn line_bytes(&self, line: usize) -> Result<Chunks<'_>> {
        let start = self.line_start(line)?;
        let len = self.line_len(line)?;
        self.slice(start, start + len)
    }

    /// Length of `line` in bytes, excluding the newline.
    fn line_len(&self, line: usize) -> Result<usize>;

    /// Slice of the document between byte offsets `[start, end)`.
    fn slice(&self, start: usize, end: usize) -> Result<Chunks<'_>>;
}

impl BufferView for PieceTree {
    fn len(&self) -> usize {
        PieceTree::len(self)
    }

    fn line_count(&self) -> usize {
        PieceTree::line_count(self)
    }

    fn line_start(&self, line: usize) -> Result<usize> {
        self.line_start_offset(line)
    }

    fn line_len(&self, line: usize) -> Result<usize> {
        PieceTree::line_len(self, line)
    }

    fn slice(&self, start: usize, end: usize) -> Result<Chunks<'_>> {
        self.chunks_in(start, end.saturating_sub(start))
    }
}

impl BufferView for TextBuffer {
    fn len(&self) -> usize {
        self.tree().len()
    }

    fn line_count(&self) -> usize {
        self.tree().line_count()
    }

    fn line_start(&self, line: usize) -> Result<usize> {
        self.tree().line_start_offset(line)
    }

    fn line_len(&self, line: usize) -> Result<usize> {
        self.tree().line_len(line)
    }

    fn slice(&self, start: usize, end: usize) -> Result<Chunks<'_>> {
        BufferView::slice(self.tree(), start, end)
    }
}
