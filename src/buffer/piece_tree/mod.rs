//! Piece Tree: two backing buffers indexed by a red-black tree
//!
//! The document is the in-order concatenation of pieces. Each piece refers
//! either to the write-once original buffer or to the append-only edit
//! buffer. Inserting appends to the edit buffer and links a new piece;
//! deleting only drops or narrows pieces. No byte is ever rewritten.

pub mod index_tree;
pub mod piece;

pub use index_tree::{IndexTree, LineLocation, NodeId, OffsetLocation, Pieces, Violation};
pub use piece::{BufferSource, Piece};

use crate::error::{BufferError, ErrorKind, Result};
use piece::{count_line_breaks, nth_line_end};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Line and column (both 0-based, column in bytes)
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl Position {
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

/// Text storage with O(log n) edits and offset/line lookups.
#[derive(Clone, Debug)]
pub struct PieceTree {
    original: Arc<[u8]>,
    edit: Vec<u8>,
    tree: IndexTree,
}

impl PieceTree {
    /// Create an empty tree
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tree whose original buffer is `content`
    pub fn with_content(content: impl Into<Vec<u8>>) -> Result<Self> {
        let content: Vec<u8> = content.into();
        let mut tree = IndexTree::new();
        if !content.is_empty() {
            tree.insert_after(None, Piece::new(BufferSource::Original, 0, &content))?;
        }
        Ok(Self {
            original: Arc::from(content),
            edit: Vec::new(),
            tree,
        })
    }

    /// Load the original buffer from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = crate::buffer::file::read_file(path.as_ref())?;
        Self::with_content(bytes)
    }

    /// Total document length in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Number of lines (line feeds + 1)
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.tree.line_breaks() + 1
    }

    #[must_use]
    pub fn piece_count(&self) -> usize {
        self.tree.node_count()
    }

    #[must_use]
    pub fn original_len(&self) -> usize {
        self.original.len()
    }

    #[must_use]
    pub fn edit_len(&self) -> usize {
        self.edit.len()
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.tree.height()
    }

    /// Check the red-black and aggregate invariants of the index
    pub fn verify(&self) -> std::result::Result<(), Violation> {
        self.tree.verify()
    }

    /// The index tree (read-only)
    #[must_use]
    pub fn index(&self) -> &IndexTree {
        &self.tree
    }

    /// Locate the piece holding `offset`
    pub fn locate(&self, offset: usize) -> Result<OffsetLocation> {
        self.tree.find_by_offset(offset)
    }

    /// Iterate pieces in document order
    #[must_use]
    pub fn pieces(&self) -> Pieces<'_> {
        self.tree.iter()
    }

    /// Bytes referenced by `piece`
    #[must_use]
    pub fn piece_bytes(&self, piece: &Piece) -> &[u8] {
        match piece.source {
            BufferSource::Original => &self.original[piece.start..piece.end()],
            BufferSource::Edit => &self.edit[piece.start..piece.end()],
        }
    }

    /// Make room for `bytes` more edit-buffer bytes and `nodes` more pieces
    pub fn reserve(&mut self, bytes: usize, nodes: usize) -> Result<()> {
        self.tree.reserve(nodes)?;
        self.edit
            .try_reserve(bytes)
            .map_err(|_| BufferError::out_of_memory("edit buffer"))?;
        Ok(())
    }

    /// Insert `text` at `offset`
    pub fn insert(&mut self, offset: usize, text: &[u8]) -> Result<()> {
        let total = self.len();
        if offset > total {
            return Err(BufferError::invalid_offset(offset, total));
        }
        if text.is_empty() {
            return Ok(());
        }

        // Reserve up front so nothing below can fail half way.
        self.reserve(text.len(), 2)?;

        let start = self.edit.len();
        self.edit.extend_from_slice(text);
        let new_piece = Piece::new(BufferSource::Edit, start, text);

        if self.tree.is_empty() {
            self.tree.insert_after(None, new_piece)?;
            return Ok(());
        }

        let loc = self.tree.find_by_offset(offset)?;
        let existing = *self.tree.piece(loc.node);
        if loc.offset_in_piece == 0 {
            let before = self.tree.predecessor(loc.node);
            self.tree.insert_after(before, new_piece)?;
        } else if loc.offset_in_piece == existing.len {
            self.tree.insert_after(Some(loc.node), new_piece)?;
        } else {
            let (left, right) =
                existing.split_at(self.piece_bytes(&existing), loc.offset_in_piece);
            self.tree.set_piece(loc.node, left);
            let middle = self.tree.insert_after(Some(loc.node), new_piece)?;
            self.tree.insert_after(Some(middle), right)?;
        }
        Ok(())
    }

    /// Delete `len` bytes starting at `offset`
    pub fn delete(&mut self, offset: usize, len: usize) -> Result<()> {
        self.check_range(offset, len)?;
        if len == 0 {
            return Ok(());
        }

        // A delete strictly inside one piece needs one extra node.
        self.tree.reserve(1)?;

        let loc = self.tree.find_by_offset(offset)?;
        let mut node = Some(loc.node);
        let mut in_piece = loc.offset_in_piece;
        let mut remaining = len;

        while remaining > 0 {
            let Some(id) = node else {
                break;
            };
            let piece = *self.tree.piece(id);
            let take = (piece.len - in_piece).min(remaining);
            let end = in_piece + take;
            let next = self.tree.successor(id);

            if in_piece == 0 && end == piece.len {
                self.tree.remove(id);
            } else if in_piece == 0 {
                let tail = piece.sub_piece(self.piece_bytes(&piece), end..piece.len);
                self.tree.set_piece(id, tail);
            } else if end == piece.len {
                let head = piece.sub_piece(self.piece_bytes(&piece), 0..in_piece);
                self.tree.set_piece(id, head);
            } else {
                let bytes = self.piece_bytes(&piece);
                let head = piece.sub_piece(bytes, 0..in_piece);
                let tail = piece.sub_piece(bytes, end..piece.len);
                self.tree.set_piece(id, head);
                self.tree.insert_after(Some(id), tail)?;
            }

            remaining -= take;
            node = next;
            in_piece = 0;
        }
        Ok(())
    }

    /// Copy `len` bytes starting at `start`
    pub fn get_text(&self, start: usize, len: usize) -> Result<Vec<u8>> {
        let chunks = self.chunks_in(start, len)?;
        let mut out = Vec::new();
        out.try_reserve(len)
            .map_err(|_| BufferError::out_of_memory("text copy"))?;
        for chunk in chunks {
            out.extend_from_slice(chunk);
        }
        Ok(out)
    }

    /// Copy the whole document
    #[must_use]
    pub fn get_all_text(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        for chunk in self.chunks() {
            out.extend_from_slice(chunk);
        }
        out
    }

    /// Byte at `offset`
    pub fn byte_at(&self, offset: usize) -> Result<u8> {
        if self.is_empty() {
            return Err(BufferError::empty_buffer());
        }
        if offset >= self.len() {
            return Err(BufferError::invalid_offset(offset, self.len()));
        }
        let loc = self.tree.find_by_offset(offset)?;
        let piece = self.tree.piece(loc.node);
        Ok(self.piece_bytes(piece)[loc.offset_in_piece])
    }

    /// Borrowed per-piece slices covering the whole document
    #[must_use]
    pub fn chunks(&self) -> Chunks<'_> {
        Chunks {
            source: self,
            pieces: self.tree.iter(),
            skip: 0,
            remaining: self.len(),
        }
    }

    /// Borrowed per-piece slices covering `[start, start + len)`
    pub fn chunks_in(&self, start: usize, len: usize) -> Result<Chunks<'_>> {
        self.check_range(start, len)?;
        if len == 0 {
            return Ok(Chunks {
                source: self,
                pieces: self.tree.iter(),
                skip: 0,
                remaining: 0,
            });
        }
        let loc = self.tree.find_by_offset(start)?;
        Ok(Chunks {
            source: self,
            pieces: self.tree.iter_from(loc.node),
            skip: loc.offset_in_piece,
            remaining: len,
        })
    }

    /// Offset of the first byte of `line`
    pub fn line_start_offset(&self, line: usize) -> Result<usize> {
        if line == 0 {
            return Ok(0);
        }
        let loc = self.tree.find_by_line(line)?;
        let piece = self.tree.piece(loc.node);
        nth_line_end(self.piece_bytes(piece), loc.breaks_in_piece)
            .map(|i| loc.node_start + i)
            .ok_or_else(|| BufferError::invalid_line(line, self.line_count()))
    }

    /// Length of `line` excluding its line feed
    pub fn line_len(&self, line: usize) -> Result<usize> {
        let start = self.line_start_offset(line)?;
        let end = if line + 1 < self.line_count() {
            self.line_start_offset(line + 1)? - 1
        } else {
            self.len()
        };
        Ok(end - start)
    }

    /// Content of `line` without its line feed
    pub fn get_line(&self, line: usize) -> Result<Vec<u8>> {
        if line >= self.line_count() {
            return Err(BufferError::invalid_line(line, self.line_count()));
        }
        let start = self.line_start_offset(line)?;

        let mut out = Vec::new();
        for chunk in self.chunks_in(start, self.len() - start)? {
            match chunk.iter().position(|&b| b == b'\n') {
                Some(end) => {
                    out.extend_from_slice(&chunk[..end]);
                    break;
                }
                None => out.extend_from_slice(chunk),
            }
        }
        Ok(out)
    }

    /// Translate a byte offset into line and column
    pub fn offset_to_line_col(&self, offset: usize) -> Result<Position> {
        let total = self.len();
        if offset > total {
            return Err(BufferError::invalid_offset(offset, total));
        }
        if self.is_empty() {
            return Ok(Position::default());
        }

        let loc = self.tree.find_by_offset(offset)?;
        let piece = self.tree.piece(loc.node);
        let before = &self.piece_bytes(piece)[..loc.offset_in_piece];
        let line = loc.line_breaks_before + count_line_breaks(before);
        let col = match before.iter().rposition(|&b| b == b'\n') {
            Some(lf) => loc.offset_in_piece - lf - 1,
            None => offset - self.line_start_offset(line)?,
        };
        Ok(Position::new(line, col))
    }

    /// Translate line and column into a byte offset
    pub fn line_col_to_offset(&self, pos: Position) -> Result<usize> {
        if pos.line >= self.line_count() {
            return Err(BufferError::invalid_line(pos.line, self.line_count()));
        }
        let line_len = self.line_len(pos.line)?;
        if pos.col > line_len {
            return Err(BufferError::new(
                ErrorKind::InvalidRange,
                format!(
                    "Column {} exceeds length {} of line {}",
                    pos.col, line_len, pos.line
                ),
            ));
        }
        Ok(self.line_start_offset(pos.line)? + pos.col)
    }

    fn check_range(&self, start: usize, len: usize) -> Result<()> {
        let total = self.len();
        match start.checked_add(len) {
            Some(end) if end <= total => Ok(()),
            _ => Err(BufferError::invalid_range(start, len, total)),
        }
    }
}

impl Default for PieceTree {
    fn default() -> Self {
        Self {
            original: Arc::from(Vec::new()),
            edit: Vec::new(),
            tree: IndexTree::new(),
        }
    }
}

impl fmt::Display for PieceTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.get_all_text()))
    }
}

/// Iterator over borrowed byte slices of a [`PieceTree`], one per piece
#[derive(Clone, Debug)]
pub struct Chunks<'a> {
    source: &'a PieceTree,
    pieces: Pieces<'a>,
    skip: usize,
    remaining: usize,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining > 0 {
            let (_, piece) = self.pieces.next()?;
            let bytes = self.source.piece_bytes(piece);
            let bytes = &bytes[self.skip.min(bytes.len())..];
            self.skip = 0;

            let take = bytes.len().min(self.remaining);
            if take == 0 {
                continue;
            }
            self.remaining -= take;
            return Some(&bytes[..take]);
        }
        None
    }
}
