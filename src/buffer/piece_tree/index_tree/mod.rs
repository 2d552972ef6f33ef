//! Red-black index tree over pieces
//!
//! Pieces are kept in document order in a red-black tree whose nodes live in
//! an arena and refer to each other by `NodeId`. Every node caches the byte
//! length and line-break count of its subtree and of its left child, so that
//! offset and line lookups are a single O(log n) descent.
//!
//! Invariants after every public mutation:
//! - the root is black and no red node has a red child
//! - all root-to-leaf paths carry the same number of black nodes
//! - aggregates equal the sums over the node's piece and children
//! - no node holds an empty piece

use super::piece::Piece;
use crate::error::{BufferError, Result};
use std::fmt;

/// Stable handle to a node in the arena
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Color {
    Red,
    Black,
}

#[derive(Clone, Debug)]
struct Node {
    piece: Piece,
    color: Color,
    parent: Option<NodeId>,
    left: Option<NodeId>,
    right: Option<NodeId>,

    // Aggregates
    subtree_len: usize,
    subtree_line_breaks: usize,
    left_len: usize,
    left_line_breaks: usize,
}

impl Node {
    fn new(piece: Piece) -> Self {
        Self {
            piece,
            color: Color::Red,
            parent: None,
            left: None,
            right: None,
            subtree_len: piece.len,
            subtree_line_breaks: piece.line_breaks,
            left_len: 0,
            left_line_breaks: 0,
        }
    }
}

/// Result of an offset lookup
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OffsetLocation {
    pub node: NodeId,
    /// Document offset of the first byte of the node's piece
    pub node_start: usize,
    /// Offset of the target inside the piece; equals the piece length only
    /// at the end of the document
    pub offset_in_piece: usize,
    /// Line breaks in the document before the node's piece
    pub line_breaks_before: usize,
}

/// Result of a line lookup
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineLocation {
    pub node: NodeId,
    pub node_start: usize,
    /// The line starts right after this many line feeds of the node's
    /// piece (0 means at the piece start)
    pub breaks_in_piece: usize,
}

/// A broken tree invariant, reported by [`IndexTree::verify`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Violation {
    RedRoot,
    RedRedEdge(NodeId),
    BlackHeightMismatch(NodeId),
    StaleAggregate(NodeId),
    BrokenParentLink(NodeId),
    EmptyPiece(NodeId),
    CountMismatch { expected: usize, found: usize },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::RedRoot => write!(f, "Root is red"),
            Violation::RedRedEdge(id) => write!(f, "Red node {:?} has a red parent", id),
            Violation::BlackHeightMismatch(id) => {
                write!(f, "Black heights differ below {:?}", id)
            }
            Violation::StaleAggregate(id) => write!(f, "Stale aggregates at {:?}", id),
            Violation::BrokenParentLink(id) => write!(f, "Wrong parent link at {:?}", id),
            Violation::EmptyPiece(id) => write!(f, "Empty piece at {:?}", id),
            Violation::CountMismatch { expected, found } => {
                write!(f, "Node count {} but {} reachable", expected, found)
            }
        }
    }
}

impl std::error::Error for Violation {}

/// Arena-backed red-black tree of pieces in document order.
#[derive(Clone, Debug, Default)]
pub struct IndexTree {
    nodes: Vec<Node>,
    free: Vec<NodeId>,
    root: Option<NodeId>,
    count: usize,
}

impl IndexTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total bytes referenced by all pieces
    #[must_use]
    pub fn len(&self) -> usize {
        self.root.map_or(0, |r| self.node(r).subtree_len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Total line feeds referenced by all pieces
    #[must_use]
    pub fn line_breaks(&self) -> usize {
        self.root.map_or(0, |r| self.node(r).subtree_line_breaks)
    }

    /// Number of live nodes (one per piece)
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn piece(&self, id: NodeId) -> &Piece {
        &self.node(id).piece
    }

    /// Make sure `additional` nodes can be created, and every node later
    /// released, without allocating.
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        let spare = self.free.len();
        if additional > spare {
            self.nodes
                .try_reserve(additional - spare)
                .map_err(|_| BufferError::out_of_memory("node arena"))?;
        }
        // The free list never holds more ids than the arena has slots.
        let slots = self.nodes.len() + additional.saturating_sub(spare);
        self.free
            .try_reserve(slots - spare)
            .map_err(|_| BufferError::out_of_memory("node free list"))?;
        Ok(())
    }

    /// Capacity of the free list, for allocation checks in tests
    #[cfg(test)]
    pub(crate) fn free_capacity(&self) -> usize {
        self.free.capacity()
    }

    /// Drop every node
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.root = None;
        self.count = 0;
    }

    /// Leftmost node (start of the document)
    #[must_use]
    pub fn first(&self) -> Option<NodeId> {
        self.root.map(|r| self.minimum(r))
    }

    /// Rightmost node (end of the document)
    #[must_use]
    pub fn last(&self) -> Option<NodeId> {
        self.root.map(|r| self.maximum(r))
    }

    /// In-order successor
    #[must_use]
    pub fn successor(&self, id: NodeId) -> Option<NodeId> {
        if let Some(right) = self.node(id).right {
            return Some(self.minimum(right));
        }
        let mut child = id;
        let mut parent = self.node(id).parent;
        while let Some(p) = parent {
            if self.node(p).left == Some(child) {
                return Some(p);
            }
            child = p;
            parent = self.node(p).parent;
        }
        None
    }

    /// In-order predecessor
    #[must_use]
    pub fn predecessor(&self, id: NodeId) -> Option<NodeId> {
        if let Some(left) = self.node(id).left {
            return Some(self.maximum(left));
        }
        let mut child = id;
        let mut parent = self.node(id).parent;
        while let Some(p) = parent {
            if self.node(p).right == Some(child) {
                return Some(p);
            }
            child = p;
            parent = self.node(p).parent;
        }
        None
    }

    /// Height of the tree in nodes (0 for an empty tree)
    #[must_use]
    pub fn height(&self) -> usize {
        let mut max = 0;
        let mut stack: Vec<(NodeId, usize)> = self.root.map(|r| (r, 1)).into_iter().collect();
        while let Some((id, depth)) = stack.pop() {
            max = max.max(depth);
            let node = self.node(id);
            for child in [node.left, node.right].into_iter().flatten() {
                stack.push((child, depth + 1));
            }
        }
        max
    }

    /// Locate the piece containing `offset`.
    ///
    /// An offset on a boundary between two pieces resolves to the start of
    /// the later piece; `offset == len()` resolves to the end of the last
    /// piece.
    pub fn find_by_offset(&self, offset: usize) -> Result<OffsetLocation> {
        let total = self.len();
        let (Some(mut id), true) = (self.root, offset <= total) else {
            return Err(BufferError::invalid_offset(offset, total));
        };

        let mut remaining = offset;
        let mut node_start = 0;
        let mut breaks_before = 0;
        loop {
            let node = self.node(id);
            if remaining < node.left_len {
                if let Some(left) = node.left {
                    id = left;
                    continue;
                }
            }

            let within = remaining - node.left_len;
            if within < node.piece.len || (within == node.piece.len && node.right.is_none()) {
                return Ok(OffsetLocation {
                    node: id,
                    node_start: node_start + node.left_len,
                    offset_in_piece: within,
                    line_breaks_before: breaks_before + node.left_line_breaks,
                });
            }

            let Some(right) = node.right else {
                return Err(BufferError::invalid_offset(offset, total));
            };
            remaining = within - node.piece.len;
            node_start += node.left_len + node.piece.len;
            breaks_before += node.left_line_breaks + node.piece.line_breaks;
            id = right;
        }
    }

    /// Locate the piece in which line `line` (0-based) starts.
    pub fn find_by_line(&self, line: usize) -> Result<LineLocation> {
        let breaks = self.line_breaks();
        let (Some(root), true) = (self.root, line <= breaks) else {
            return Err(BufferError::invalid_line(line, breaks + 1));
        };

        if line == 0 {
            return Ok(LineLocation {
                node: self.minimum(root),
                node_start: 0,
                breaks_in_piece: 0,
            });
        }

        let mut target = line;
        let mut id = root;
        let mut node_start = 0;
        loop {
            let node = self.node(id);
            if target <= node.left_line_breaks {
                if let Some(left) = node.left {
                    id = left;
                    continue;
                }
            }

            let within = target - node.left_line_breaks;
            if within <= node.piece.line_breaks {
                return Ok(LineLocation {
                    node: id,
                    node_start: node_start + node.left_len,
                    breaks_in_piece: within,
                });
            }

            let Some(right) = node.right else {
                return Err(BufferError::invalid_line(line, breaks + 1));
            };
            target = within - node.piece.line_breaks;
            node_start += node.left_len + node.piece.len;
            id = right;
        }
    }

    /// Insert `piece` right after `after`, or at the start of the document
    /// when `after` is `None`.
    pub fn insert_after(&mut self, after: Option<NodeId>, piece: Piece) -> Result<NodeId> {
        debug_assert!(!piece.is_empty(), "empty pieces never enter the tree");
        let id = self.alloc(piece)?;

        match after {
            None => match self.root {
                None => self.root = Some(id),
                Some(root) => {
                    let first = self.minimum(root);
                    self.link_left(first, id);
                }
            },
            Some(after) => match self.node(after).right {
                None => self.link_right(after, id),
                Some(right) => {
                    let next = self.minimum(right);
                    self.link_left(next, id);
                }
            },
        }
        self.count += 1;

        // Rotations recompute from children, so the path must be exact first.
        self.refresh_to_root(id);
        self.insert_fixup(id);
        Ok(id)
    }

    /// Replace the piece held by `id` and refresh aggregates up to the root.
    pub fn set_piece(&mut self, id: NodeId, piece: Piece) {
        debug_assert!(!piece.is_empty(), "empty pieces never enter the tree");
        self.node_mut(id).piece = piece;
        self.refresh_to_root(id);
    }

    /// Unlink `id` from the tree and return its piece.
    ///
    /// Other `NodeId`s stay valid; the removed slot is reused by later
    /// insertions.
    pub fn remove(&mut self, z: NodeId) -> Piece {
        let (z_left, z_right, z_parent, z_color) = {
            let n = self.node(z);
            (n.left, n.right, n.parent, n.color)
        };

        let mut removed_color = z_color;
        let x;
        let x_parent;
        match (z_left, z_right) {
            (None, _) => {
                x = z_right;
                x_parent = z_parent;
                self.transplant(z, z_right);
            }
            (_, None) => {
                x = z_left;
                x_parent = z_parent;
                self.transplant(z, z_left);
            }
            (Some(zl), Some(zr)) => {
                let y = self.minimum(zr);
                removed_color = self.node(y).color;
                x = self.node(y).right;
                if self.node(y).parent == Some(z) {
                    x_parent = Some(y);
                } else {
                    x_parent = self.node(y).parent;
                    self.transplant(y, x);
                    self.node_mut(y).right = Some(zr);
                    self.node_mut(zr).parent = Some(y);
                }
                self.transplant(z, Some(y));
                self.node_mut(y).left = Some(zl);
                self.node_mut(zl).parent = Some(y);
                self.node_mut(y).color = z_color;
            }
        }

        if let Some(p) = x_parent {
            self.refresh_to_root(p);
        }
        if removed_color == Color::Black {
            self.remove_fixup(x, x_parent);
        }

        self.count -= 1;
        self.release(z)
    }

    /// Check every structural invariant of the tree.
    pub fn verify(&self) -> std::result::Result<(), Violation> {
        let Some(root) = self.root else {
            return match self.count {
                0 => Ok(()),
                n => Err(Violation::CountMismatch {
                    expected: n,
                    found: 0,
                }),
            };
        };

        if self.node(root).color == Color::Red {
            return Err(Violation::RedRoot);
        }
        if self.node(root).parent.is_some() {
            return Err(Violation::BrokenParentLink(root));
        }

        let mut visited = 0;
        self.verify_subtree(Some(root), &mut visited)?;
        if visited != self.count {
            return Err(Violation::CountMismatch {
                expected: self.count,
                found: visited,
            });
        }
        Ok(())
    }

    /// Iterate pieces in document order
    #[must_use]
    pub fn iter(&self) -> Pieces<'_> {
        Pieces {
            tree: self,
            next: self.first(),
        }
    }

    /// Iterate pieces in document order starting at `id`
    #[must_use]
    pub fn iter_from(&self, id: NodeId) -> Pieces<'_> {
        Pieces {
            tree: self,
            next: Some(id),
        }
    }

    // --- Arena ---

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    fn alloc(&mut self, piece: Piece) -> Result<NodeId> {
        if let Some(id) = self.free.pop() {
            *self.node_mut(id) = Node::new(piece);
            return Ok(id);
        }
        self.nodes
            .try_reserve(1)
            .map_err(|_| BufferError::out_of_memory("node arena"))?;
        self.nodes.push(Node::new(piece));
        Ok(NodeId(self.nodes.len() - 1))
    }

    fn release(&mut self, id: NodeId) -> Piece {
        let node = self.node_mut(id);
        node.parent = None;
        node.left = None;
        node.right = None;
        let piece = node.piece;
        self.free.push(id);
        piece
    }

    // --- Structure helpers ---

    fn minimum(&self, mut id: NodeId) -> NodeId {
        while let Some(left) = self.node(id).left {
            id = left;
        }
        id
    }

    fn maximum(&self, mut id: NodeId) -> NodeId {
        while let Some(right) = self.node(id).right {
            id = right;
        }
        id
    }

    fn link_left(&mut self, parent: NodeId, child: NodeId) {
        self.node_mut(parent).left = Some(child);
        self.node_mut(child).parent = Some(parent);
    }

    fn link_right(&mut self, parent: NodeId, child: NodeId) {
        self.node_mut(parent).right = Some(child);
        self.node_mut(child).parent = Some(parent);
    }

    fn replace_child(&mut self, parent: Option<NodeId>, old: NodeId, new: Option<NodeId>) {
        match parent {
            None => self.root = new,
            Some(p) => {
                if self.node(p).left == Some(old) {
                    self.node_mut(p).left = new;
                } else {
                    self.node_mut(p).right = new;
                }
            }
        }
    }

    /// Put `v` where `u` hangs from its parent
    fn transplant(&mut self, u: NodeId, v: Option<NodeId>) {
        let parent = self.node(u).parent;
        self.replace_child(parent, u, v);
        if let Some(v) = v {
            self.node_mut(v).parent = parent;
        }
    }

    fn is_red(&self, id: Option<NodeId>) -> bool {
        id.is_some_and(|id| self.node(id).color == Color::Red)
    }

    fn set_color(&mut self, id: NodeId, color: Color) {
        self.node_mut(id).color = color;
    }

    fn blacken(&mut self, id: Option<NodeId>) {
        if let Some(id) = id {
            self.set_color(id, Color::Black);
        }
    }

    // --- Aggregates ---

    fn subtree_totals(&self, id: Option<NodeId>) -> (usize, usize) {
        id.map_or((0, 0), |id| {
            let n = self.node(id);
            (n.subtree_len, n.subtree_line_breaks)
        })
    }

    /// Recompute the aggregates of `id` from its piece and children
    fn refresh(&mut self, id: NodeId) {
        let (left_len, left_breaks) = self.subtree_totals(self.node(id).left);
        let (right_len, right_breaks) = self.subtree_totals(self.node(id).right);
        let node = self.node_mut(id);
        node.left_len = left_len;
        node.left_line_breaks = left_breaks;
        node.subtree_len = left_len + node.piece.len + right_len;
        node.subtree_line_breaks = left_breaks + node.piece.line_breaks + right_breaks;
    }

    fn refresh_to_root(&mut self, from: NodeId) {
        let mut current = Some(from);
        while let Some(id) = current {
            self.refresh(id);
            current = self.node(id).parent;
        }
    }

    // --- Rotations ---

    /// Rotate `x` down to the left; refreshes `x` then its new parent.
    fn rotate_left(&mut self, x: NodeId) {
        let Some(y) = self.node(x).right else {
            return;
        };
        let y_left = self.node(y).left;
        self.node_mut(x).right = y_left;
        if let Some(b) = y_left {
            self.node_mut(b).parent = Some(x);
        }
        let parent = self.node(x).parent;
        self.node_mut(y).parent = parent;
        self.replace_child(parent, x, Some(y));
        self.link_left(y, x);

        self.refresh(x);
        self.refresh(y);
    }

    /// Rotate `y` down to the right; refreshes `y` then its new parent.
    fn rotate_right(&mut self, y: NodeId) {
        let Some(x) = self.node(y).left else {
            return;
        };
        let x_right = self.node(x).right;
        self.node_mut(y).left = x_right;
        if let Some(b) = x_right {
            self.node_mut(b).parent = Some(y);
        }
        let parent = self.node(y).parent;
        self.node_mut(x).parent = parent;
        self.replace_child(parent, y, Some(x));
        self.link_right(x, y);

        self.refresh(y);
        self.refresh(x);
    }

    // --- Fixups ---

    fn insert_fixup(&mut self, mut z: NodeId) {
        while let Some(parent) = self.node(z).parent {
            if self.node(parent).color == Color::Black {
                break;
            }
            let Some(grand) = self.node(parent).parent else {
                break;
            };

            if self.node(grand).left == Some(parent) {
                let uncle = self.node(grand).right;
                if self.is_red(uncle) {
                    self.set_color(parent, Color::Black);
                    self.blacken(uncle);
                    self.set_color(grand, Color::Red);
                    z = grand;
                } else {
                    if self.node(parent).right == Some(z) {
                        self.rotate_left(parent);
                        z = parent;
                    }
                    let Some(parent) = self.node(z).parent else {
                        break;
                    };
                    self.set_color(parent, Color::Black);
                    self.set_color(grand, Color::Red);
                    self.rotate_right(grand);
                }
            } else {
                let uncle = self.node(grand).left;
                if self.is_red(uncle) {
                    self.set_color(parent, Color::Black);
                    self.blacken(uncle);
                    self.set_color(grand, Color::Red);
                    z = grand;
                } else {
                    if self.node(parent).left == Some(z) {
                        self.rotate_right(parent);
                        z = parent;
                    }
                    let Some(parent) = self.node(z).parent else {
                        break;
                    };
                    self.set_color(parent, Color::Black);
                    self.set_color(grand, Color::Red);
                    self.rotate_left(grand);
                }
            }
        }
        self.blacken(self.root);
    }

    /// Restore the black-height after removing a black node; `x` took the
    /// removed node's place below `parent` and may be a nil leaf.
    fn remove_fixup(&mut self, mut x: Option<NodeId>, mut parent: Option<NodeId>) {
        while x != self.root && !self.is_red(x) {
            let Some(p) = parent else {
                break;
            };

            if self.node(p).left == x {
                let Some(mut w) = self.node(p).right else {
                    break;
                };
                if self.node(w).color == Color::Red {
                    self.set_color(w, Color::Black);
                    self.set_color(p, Color::Red);
                    self.rotate_left(p);
                    let Some(next) = self.node(p).right else {
                        break;
                    };
                    w = next;
                }

                if !self.is_red(self.node(w).left) && !self.is_red(self.node(w).right) {
                    self.set_color(w, Color::Red);
                    x = Some(p);
                    parent = self.node(p).parent;
                } else {
                    if !self.is_red(self.node(w).right) {
                        self.blacken(self.node(w).left);
                        self.set_color(w, Color::Red);
                        self.rotate_right(w);
                        let Some(next) = self.node(p).right else {
                            break;
                        };
                        w = next;
                    }
                    let p_color = self.node(p).color;
                    self.set_color(w, p_color);
                    self.set_color(p, Color::Black);
                    self.blacken(self.node(w).right);
                    self.rotate_left(p);
                    x = self.root;
                    parent = None;
                }
            } else {
                let Some(mut w) = self.node(p).left else {
                    break;
                };
                if self.node(w).color == Color::Red {
                    self.set_color(w, Color::Black);
                    self.set_color(p, Color::Red);
                    self.rotate_right(p);
                    let Some(next) = self.node(p).left else {
                        break;
                    };
                    w = next;
                }

                if !self.is_red(self.node(w).left) && !self.is_red(self.node(w).right) {
                    self.set_color(w, Color::Red);
                    x = Some(p);
                    parent = self.node(p).parent;
                } else {
                    if !self.is_red(self.node(w).left) {
                        self.blacken(self.node(w).right);
                        self.set_color(w, Color::Red);
                        self.rotate_left(w);
                        let Some(next) = self.node(p).left else {
                            break;
                        };
                        w = next;
                    }
                    let p_color = self.node(p).color;
                    self.set_color(w, p_color);
                    self.set_color(p, Color::Black);
                    self.blacken(self.node(w).left);
                    self.rotate_right(p);
                    x = self.root;
                    parent = None;
                }
            }
        }
        self.blacken(x);
    }

    // --- Verification ---

    /// Returns the black-height of the subtree (nil leaves count as one)
    fn verify_subtree(
        &self,
        id: Option<NodeId>,
        visited: &mut usize,
    ) -> std::result::Result<usize, Violation> {
        let Some(id) = id else {
            return Ok(1);
        };
        *visited += 1;
        let node = self.node(id);

        if node.piece.is_empty() {
            return Err(Violation::EmptyPiece(id));
        }
        for child in [node.left, node.right].into_iter().flatten() {
            if self.node(child).parent != Some(id) {
                return Err(Violation::BrokenParentLink(child));
            }
            if node.color == Color::Red && self.node(child).color == Color::Red {
                return Err(Violation::RedRedEdge(child));
            }
        }

        let left_height = self.verify_subtree(node.left, visited)?;
        let right_height = self.verify_subtree(node.right, visited)?;
        if left_height != right_height {
            return Err(Violation::BlackHeightMismatch(id));
        }

        let (left_len, left_breaks) = self.subtree_totals(node.left);
        let (right_len, right_breaks) = self.subtree_totals(node.right);
        if node.left_len != left_len
            || node.left_line_breaks != left_breaks
            || node.subtree_len != left_len + node.piece.len + right_len
            || node.subtree_line_breaks != left_breaks + node.piece.line_breaks + right_breaks
        {
            return Err(Violation::StaleAggregate(id));
        }

        Ok(left_height + usize::from(node.color == Color::Black))
    }
}

/// In-order iterator over the pieces of an [`IndexTree`]
#[derive(Clone, Debug)]
pub struct Pieces<'a> {
    tree: &'a IndexTree,
    next: Option<NodeId>,
}

impl<'a> Iterator for Pieces<'a> {
    type Item = (NodeId, &'a Piece);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        self.next = self.tree.successor(id);
        Some((id, self.tree.piece(id)))
    }
}
