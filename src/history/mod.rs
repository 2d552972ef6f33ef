//! Undo/Redo history
//!
//! Every mutation of a buffer is recorded as an [`EditOperation`] holding a
//! copy of the affected bytes. Operations are collected into [`UndoEntry`]
//! values; one undo reverses one entry. Grouping brackets several operations
//! into a single entry, which is how a replace (delete + insert) becomes one
//! undoable step.
//!
//! The undo stack is bounded. When it grows past the configured maximum the
//! oldest entry is dropped. Recording a new edit always clears the redo stack.

use crate::buffer::piece_tree::PieceTree;
use crate::constants::history::{DEFAULT_MAX_UNDO_ENTRIES, OPERATION_OVERHEAD};
use crate::error::{BufferError, Result};
use std::collections::{TryReserveError, VecDeque};

// =============================================================================
// Edit Operations
// =============================================================================

/// A single edit applied to the piece tree
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditOperation {
    /// `text` was inserted at `offset`
    Insert { offset: usize, text: Vec<u8> },

    /// `deleted_text` was removed starting at `offset`
    Delete { offset: usize, deleted_text: Vec<u8> },
}

impl EditOperation {
    /// Insert record holding a copy of `text`. The copy is allocated
    /// fallibly so it can be made before the tree changes.
    pub fn insert(offset: usize, text: &[u8]) -> Result<Self> {
        let mut copy = Vec::new();
        copy.try_reserve_exact(text.len())
            .map_err(|_| BufferError::out_of_memory("undo record"))?;
        copy.extend_from_slice(text);
        Ok(EditOperation::Insert { offset, text: copy })
    }

    /// Get the inverse operation (for undo)
    #[must_use]
    pub fn inverse(&self) -> EditOperation {
        match self {
            EditOperation::Insert { offset, text } => EditOperation::Delete {
                offset: *offset,
                deleted_text: text.clone(),
            },
            EditOperation::Delete {
                offset,
                deleted_text,
            } => EditOperation::Insert {
                offset: *offset,
                text: deleted_text.clone(),
            },
        }
    }

    /// Apply the operation to `tree`
    pub fn apply(&self, tree: &mut PieceTree) -> Result<()> {
        match self {
            EditOperation::Insert { offset, text } => tree.insert(*offset, text),
            EditOperation::Delete {
                offset,
                deleted_text,
            } => tree.delete(*offset, deleted_text.len()),
        }
    }

    /// Bytes touched by the operation
    #[must_use]
    pub fn text(&self) -> &[u8] {
        match self {
            EditOperation::Insert { text, .. } => text,
            EditOperation::Delete { deleted_text, .. } => deleted_text,
        }
    }

    /// Get minimal diff size (for memory estimation)
    #[must_use]
    pub fn estimated_size(&self) -> usize {
        self.text().len() + OPERATION_OVERHEAD
    }

    /// Describe operation for UI (e.g., "Delete 42 bytes")
    #[must_use]
    pub fn description(&self) -> String {
        let verb = match self {
            EditOperation::Insert { .. } => "Insert",
            EditOperation::Delete { .. } => "Delete",
        };
        let text = self.text();
        if text.len() <= 20 {
            let s = String::from_utf8_lossy(text).replace('\n', "\\n");
            format!("{} '{}'", verb, s)
        } else {
            format!("{} {} bytes", verb, text.len())
        }
    }
}

// =============================================================================
// Undo Entry
// =============================================================================

/// One undoable unit: the operations in the order they were applied plus
/// the cursor on both sides of them
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UndoEntry {
    pub ops: Vec<EditOperation>,
    pub cursor_before: usize,
    pub cursor_after: usize,
}

impl UndoEntry {
    pub fn new(cursor_before: usize) -> Self {
        Self {
            ops: Vec::new(),
            cursor_before,
            cursor_after: cursor_before,
        }
    }

    /// Record operation within the entry
    pub fn record(&mut self, operation: EditOperation, cursor_after: usize) {
        self.ops.push(operation);
        self.cursor_after = cursor_after;
    }

    /// Check if entry is empty
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Get inverse operations in REVERSE order (for undo)
    #[must_use]
    pub fn inverse(&self) -> Vec<EditOperation> {
        self.ops.iter().rev().map(|op| op.inverse()).collect()
    }

    /// Estimated memory size
    pub fn estimated_size(&self) -> usize {
        self.ops.iter().map(|op| op.estimated_size()).sum::<usize>() + OPERATION_OVERHEAD
    }

    /// Describe the entry for UI
    pub fn description(&self) -> String {
        match self.ops.as_slice() {
            [] => "Empty".to_string(),
            [op] => op.description(),
            ops => format!("{} edits", ops.len()),
        }
    }
}

// =============================================================================
// Undo Log
// =============================================================================

/// Whether operations are currently being collected into a group
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum GroupState {
    #[default]
    Idle,
    /// An entry is being accumulated; `depth` counts nested `begin_group`s
    Grouping { entry: UndoEntry, depth: usize },
}

/// Bounded undo and redo stacks
#[derive(Clone, Debug)]
pub struct UndoLog {
    /// Oldest entry at the front
    undo: VecDeque<UndoEntry>,
    redo: Vec<UndoEntry>,
    max_entries: usize,
    state: GroupState,
    /// Operation storage for the next ungrouped entry, filled by `reserve`
    spare: Vec<EditOperation>,
}

impl Default for UndoLog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UNDO_ENTRIES)
    }
}

impl UndoLog {
    /// Create a log keeping at most `max_entries` undo entries.
    /// A bound of 0 disables recording.
    pub fn new(max_entries: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            max_entries,
            state: GroupState::Idle,
            spare: Vec::new(),
        }
    }

    #[must_use]
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    #[must_use]
    pub fn state(&self) -> &GroupState {
        &self.state
    }

    #[must_use]
    pub fn is_grouping(&self) -> bool {
        matches!(self.state, GroupState::Grouping { .. })
    }

    /// Record an operation that has already been applied to the tree
    pub fn record(&mut self, operation: EditOperation, cursor_before: usize, cursor_after: usize) {
        self.redo.clear();
        if let GroupState::Grouping { entry, .. } = &mut self.state {
            entry.record(operation, cursor_after);
            return;
        }
        let mut entry = UndoEntry {
            ops: std::mem::take(&mut self.spare),
            cursor_before,
            cursor_after: cursor_before,
        };
        entry.record(operation, cursor_after);
        self.push_undo(entry);
    }

    /// Make room for one more `record` and the entry it may push, so that
    /// recording after the tree changed does not allocate.
    pub fn reserve(&mut self) -> Result<()> {
        match &mut self.state {
            GroupState::Grouping { entry, .. } => entry.ops.try_reserve(1).map_err(history_oom)?,
            GroupState::Idle => self.spare.try_reserve(1).map_err(history_oom)?,
        }
        self.undo.try_reserve(1).map_err(history_oom)
    }

    /// Open a group. Nested calls fold into the outermost group.
    pub fn begin_group(&mut self, cursor: usize) {
        if let GroupState::Grouping { depth, .. } = &mut self.state {
            *depth += 1;
            return;
        }
        self.state = GroupState::Grouping {
            entry: UndoEntry::new(cursor),
            depth: 1,
        };
    }

    /// Close a group. Returns true when the outermost group closed and a
    /// non-empty entry was committed.
    pub fn end_group(&mut self) -> bool {
        let GroupState::Grouping { depth, .. } = &mut self.state else {
            return false;
        };
        if *depth > 1 {
            *depth -= 1;
            return false;
        }
        self.commit_group()
    }

    /// Commit the open group regardless of nesting
    fn commit_group(&mut self) -> bool {
        match std::mem::take(&mut self.state) {
            GroupState::Grouping { entry, .. } if !entry.is_empty() => {
                log::trace!("Committing group: {}", entry.description());
                self.push_undo(entry);
                true
            }
            _ => false,
        }
    }

    fn push_undo(&mut self, entry: UndoEntry) {
        if self.max_entries == 0 {
            return;
        }
        self.undo.push_back(entry);
        while self.undo.len() > self.max_entries {
            if let Some(evicted) = self.undo.pop_front() {
                log::debug!("Evicting oldest undo entry: {}", evicted.description());
            }
        }
    }

    /// Undo the most recent entry against `tree`.
    ///
    /// Returns the cursor to restore, or `None` when there is nothing to
    /// undo. On failure the tree and both stacks are left as they were.
    pub fn undo(&mut self, tree: &mut PieceTree) -> Result<Option<usize>> {
        self.commit_group();
        if self.undo.is_empty() {
            return Ok(None);
        }
        self.redo.try_reserve(1).map_err(history_oom)?;
        let Some(entry) = self.undo.pop_back() else {
            return Ok(None);
        };
        log::trace!("Undo: {}", entry.description());

        if let Err(e) = replay(tree, &entry.inverse()) {
            self.undo.push_back(entry);
            return Err(e);
        }
        let cursor = entry.cursor_before;
        self.redo.push(entry);
        Ok(Some(cursor))
    }

    /// Reapply the most recently undone entry against `tree`.
    pub fn redo(&mut self, tree: &mut PieceTree) -> Result<Option<usize>> {
        self.commit_group();
        if self.redo.is_empty() {
            return Ok(None);
        }
        self.undo.try_reserve(1).map_err(history_oom)?;
        let Some(entry) = self.redo.pop() else {
            return Ok(None);
        };
        log::trace!("Redo: {}", entry.description());

        if let Err(e) = replay(tree, &entry.ops) {
            self.redo.push(entry);
            return Err(e);
        }
        let cursor = entry.cursor_after;
        self.push_undo(entry);
        Ok(Some(cursor))
    }

    /// Check if undo is available (an open non-empty group counts)
    pub fn can_undo(&self) -> bool {
        match &self.state {
            GroupState::Grouping { entry, .. } if !entry.is_empty() => true,
            _ => !self.undo.is_empty(),
        }
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Most recent undo entry
    pub fn peek_undo(&self) -> Option<&UndoEntry> {
        self.undo.back()
    }

    /// Most recent redo entry
    pub fn peek_redo(&self) -> Option<&UndoEntry> {
        self.redo.last()
    }

    /// Approximate memory held by both stacks
    pub fn memory_usage(&self) -> usize {
        self.undo
            .iter()
            .chain(self.redo.iter())
            .map(UndoEntry::estimated_size)
            .sum()
    }

    /// Drop all history, including an open group
    pub fn clear(&mut self) {
        log::debug!(
            "Clearing history ({} undo, {} redo)",
            self.undo.len(),
            self.redo.len()
        );
        self.undo.clear();
        self.redo.clear();
        self.state = GroupState::Idle;
    }
}

fn history_oom(_: TryReserveError) -> BufferError {
    BufferError::out_of_memory("undo history")
}

/// Apply `ops` in order. If one fails, the ones already applied are reversed
/// before the error is returned.
fn replay(tree: &mut PieceTree, ops: &[EditOperation]) -> Result<()> {
    for (i, op) in ops.iter().enumerate() {
        if let Err(e) = op.apply(tree) {
            log::warn!("Replay failed after {} operations, rolling back: {}", i, e);
            for done in ops[..i].iter().rev() {
                if let Err(rollback) = done.inverse().apply(tree) {
                    log::warn!("Rollback of '{}' failed: {}", done.description(), rollback);
                }
            }
            return Err(e);
        }
    }
    Ok(())
}
