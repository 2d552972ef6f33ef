//! Text Buffer implementation backed by a Piece Tree
//!
//! `TextBuffer` is the editing façade: it owns the piece tree, the undo log,
//! a byte-offset cursor, the modification flag and the associated file.
//! Every mutation goes through the tree first; cursor, flag and history are
//! only touched once the tree accepted the edit, so a failed call leaves the
//! buffer exactly as it was.

use crate::constants::ui::NO_NAME;
use crate::error::{BufferError, ErrorKind, Result};
use crate::history::{EditOperation, UndoLog};
use std::fmt::{self, Display};
use std::path::{Path, PathBuf};

pub mod api;
pub mod file;
pub mod options;
pub mod piece_tree;

pub use options::BufferOptions;
pub use piece_tree::{PieceTree, Position};

/// Size and shape of a buffer
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BufferStats {
    pub total_length: usize,
    pub line_count: usize,
    pub piece_count: usize,
    pub original_size: usize,
    pub edit_size: usize,
    pub tree_height: usize,
}

/// Editable text with a cursor, undo history and file association.
#[derive(Clone, Debug)]
pub struct TextBuffer {
    tree: PieceTree,
    history: UndoLog,
    /// Cursor position (byte offset, always <= len)
    cursor: usize,
    modified: bool,
    /// File path (None if new/unsaved)
    file_path: Option<PathBuf>,
    options: BufferOptions,
    /// Monotonic revision counter for change detection
    revision: u64,
    /// Edits made inside an open group, counted once when it closes
    pending_revision: bool,
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextBuffer {
    /// Create an empty buffer
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(BufferOptions::default())
    }

    #[must_use]
    pub fn with_options(options: BufferOptions) -> Self {
        Self::from_tree(PieceTree::new(), options)
    }

    /// Create a buffer whose original content is `content`
    pub fn with_content(content: impl Into<Vec<u8>>) -> Result<Self> {
        Ok(Self::from_tree(
            PieceTree::with_content(content)?,
            BufferOptions::default(),
        ))
    }

    /// Load a buffer from a file and associate it with that path
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_file_with_options(path, BufferOptions::default())
    }

    pub fn from_file_with_options(path: impl AsRef<Path>, options: BufferOptions) -> Result<Self> {
        let path = path.as_ref();
        let mut buffer = Self::from_tree(PieceTree::from_file(path)?, options);
        buffer.file_path = Some(path.to_path_buf());
        Ok(buffer)
    }

    fn from_tree(tree: PieceTree, options: BufferOptions) -> Self {
        TextBuffer {
            tree,
            history: UndoLog::new(options.max_undo_entries),
            cursor: 0,
            modified: false,
            file_path: None,
            options,
            revision: 0,
            pending_revision: false,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The underlying piece tree (read-only)
    #[must_use]
    pub fn tree(&self) -> &PieceTree {
        &self.tree
    }

    #[must_use]
    pub fn history(&self) -> &UndoLog {
        &self.history
    }

    #[must_use]
    pub fn options(&self) -> &BufferOptions {
        &self.options
    }

    /// Get the total length of text (in bytes)
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.tree.line_count()
    }

    /// Incremented on every content change
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn get_text(&self, start: usize, len: usize) -> Result<Vec<u8>> {
        self.tree.get_text(start, len)
    }

    #[must_use]
    pub fn get_all_text(&self) -> Vec<u8> {
        self.tree.get_all_text()
    }

    pub fn get_line(&self, line: usize) -> Result<Vec<u8>> {
        self.tree.get_line(line)
    }

    pub fn offset_to_line_col(&self, offset: usize) -> Result<Position> {
        self.tree.offset_to_line_col(offset)
    }

    pub fn line_col_to_offset(&self, pos: Position) -> Result<usize> {
        self.tree.line_col_to_offset(pos)
    }

    #[must_use]
    pub fn stats(&self) -> BufferStats {
        BufferStats {
            total_length: self.tree.len(),
            line_count: self.tree.line_count(),
            piece_count: self.tree.piece_count(),
            original_size: self.tree.original_len(),
            edit_size: self.tree.edit_len(),
            tree_height: self.tree.height(),
        }
    }

    /// Check the tree invariants
    pub fn verify(&self) -> std::result::Result<(), piece_tree::Violation> {
        self.tree.verify()
    }

    // =========================================================================
    // Cursor
    // =========================================================================

    /// Get the current cursor position
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Move the cursor to `offset`, clamped to the document. Returns the
    /// position actually set.
    pub fn set_cursor(&mut self, offset: usize) -> usize {
        self.cursor = offset.min(self.len());
        self.cursor
    }

    /// Move the cursor by `delta` bytes, clamped to the document
    pub fn move_cursor(&mut self, delta: isize) -> usize {
        let target = if delta < 0 {
            self.cursor.saturating_sub(delta.unsigned_abs())
        } else {
            self.cursor.saturating_add(delta.unsigned_abs())
        };
        self.set_cursor(target)
    }

    pub fn move_to_start(&mut self) {
        self.cursor = 0;
    }

    pub fn move_to_end(&mut self) {
        self.cursor = self.len();
    }

    pub fn cursor_line_col(&self) -> Result<Position> {
        self.tree.offset_to_line_col(self.cursor)
    }

    /// Move the cursor to a line and column; fails if either is out of range
    pub fn set_cursor_line_col(&mut self, pos: Position) -> Result<()> {
        self.cursor = self.tree.line_col_to_offset(pos)?;
        Ok(())
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Insert at the cursor and move the cursor past the new text
    pub fn insert(&mut self, text: &[u8]) -> Result<()> {
        self.insert_at(self.cursor, text)
    }

    pub fn insert_str(&mut self, s: &str) -> Result<()> {
        self.insert(s.as_bytes())
    }

    /// Insert at `offset` and move the cursor past the new text
    pub fn insert_at(&mut self, offset: usize, text: &[u8]) -> Result<()> {
        if text.is_empty() {
            if offset > self.len() {
                return Err(BufferError::invalid_offset(offset, self.len()));
            }
            self.cursor = offset;
            return Ok(());
        }
        let operation = EditOperation::insert(offset, text)?;
        self.history.reserve()?;
        self.tree.insert(offset, text)?;

        let after = offset + text.len();
        self.history.record(operation, self.cursor, after);
        self.cursor = after;
        self.touch();
        Ok(())
    }

    /// Delete up to `count` bytes before the cursor
    pub fn backspace(&mut self, count: usize) -> Result<()> {
        let n = count.min(self.cursor);
        if n == 0 {
            return Ok(());
        }
        let start = self.cursor - n;
        self.remove(start, n, start)
    }

    /// Delete up to `count` bytes at the cursor
    pub fn delete_forward(&mut self, count: usize) -> Result<()> {
        let n = count.min(self.len() - self.cursor);
        if n == 0 {
            return Ok(());
        }
        self.remove(self.cursor, n, self.cursor)
    }

    /// Delete `[start, start + len)` and keep the cursor on the same text
    pub fn delete_range(&mut self, start: usize, len: usize) -> Result<()> {
        let end = start
            .checked_add(len)
            .filter(|&end| end <= self.len())
            .ok_or_else(|| BufferError::invalid_range(start, len, self.len()))?;
        if len == 0 {
            return Ok(());
        }
        let cursor = if self.cursor >= end {
            self.cursor - len
        } else if self.cursor > start {
            start
        } else {
            self.cursor
        };
        self.remove(start, len, cursor)
    }

    /// Replace `[start, start + len)` with `text` as one undoable step
    pub fn replace(&mut self, start: usize, len: usize, text: &[u8]) -> Result<()> {
        let total = self.len();
        match start.checked_add(len) {
            Some(end) if end <= total => {}
            _ => return Err(BufferError::invalid_range(start, len, total)),
        }
        // One split for the delete plus two pieces for the insert
        self.tree.reserve(text.len(), 3)?;

        self.begin_group();
        let result = self
            .delete_range(start, len)
            .and_then(|()| self.insert_at(start, text));
        self.end_group();
        result
    }

    fn remove(&mut self, start: usize, len: usize, cursor_after: usize) -> Result<()> {
        let deleted_text = self.tree.get_text(start, len)?;
        self.history.reserve()?;
        self.tree.delete(start, len)?;

        self.history.record(
            EditOperation::Delete {
                offset: start,
                deleted_text,
            },
            self.cursor,
            cursor_after,
        );
        self.cursor = cursor_after;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.modified = true;
        if self.history.is_grouping() {
            self.pending_revision = true;
        } else {
            self.revision += 1;
        }
    }

    /// Count the edits of a group that is no longer open
    fn settle_revision(&mut self) {
        if self.pending_revision && !self.history.is_grouping() {
            self.pending_revision = false;
            self.revision += 1;
        }
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Undo the last entry. Returns whether there was one.
    pub fn undo(&mut self) -> Result<bool> {
        let result = self.history.undo(&mut self.tree);
        self.settle_revision();
        match result? {
            Some(cursor) => {
                self.cursor = cursor.min(self.len());
                self.touch();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Redo the last undone entry. Returns whether there was one.
    pub fn redo(&mut self) -> Result<bool> {
        let result = self.history.redo(&mut self.tree);
        self.settle_revision();
        match result? {
            Some(cursor) => {
                self.cursor = cursor.min(self.len());
                self.touch();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
        self.settle_revision();
    }

    /// Start collecting edits into one undo entry. The revision advances
    /// once when the outermost group closes.
    pub fn begin_group(&mut self) {
        self.history.begin_group(self.cursor);
    }

    pub fn end_group(&mut self) {
        self.history.end_group();
        self.settle_revision();
    }

    // =========================================================================
    // File association
    // =========================================================================

    /// Check if buffer has unsaved changes
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn mark_unmodified(&mut self) {
        self.modified = false;
    }

    /// Get the file path if it exists
    #[must_use]
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn set_path(&mut self, path: impl AsRef<Path>) {
        self.file_path = Some(path.as_ref().to_path_buf());
    }

    /// Get display name for UI (filename or "[No Name]")
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.file_path
            .as_ref()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .unwrap_or(NO_NAME)
    }

    /// Save buffer to its current path
    pub fn save(&mut self) -> Result<()> {
        let path = self.file_path.clone().ok_or_else(no_path)?;
        file::write_file(&path, self.tree.chunks(), self.options.atomic_save)?;
        self.modified = false;
        Ok(())
    }

    /// Save buffer to a new path and associate it with that path
    pub fn save_as(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        file::write_file(path, self.tree.chunks(), self.options.atomic_save)?;
        self.file_path = Some(path.to_path_buf());
        self.modified = false;
        Ok(())
    }

    /// Re-read the associated file, dropping edits and history
    pub fn reload(&mut self) -> Result<()> {
        let path = self.file_path.clone().ok_or_else(no_path)?;
        self.tree = PieceTree::from_file(&path)?;
        self.history.clear();
        self.cursor = 0;
        self.modified = false;
        self.pending_revision = false;
        self.revision += 1;
        Ok(())
    }
}

fn no_path() -> BufferError {
    BufferError::new(ErrorKind::NoPath, "No file path")
}

impl Display for TextBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.tree, f)
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
