//! Rift buffer - piece-tree text storage with grouped undo/redo
//!
//! The document lives in two byte buffers (the write-once original and the
//! append-only edit buffer) indexed by a red-black tree of pieces, giving
//! logarithmic inserts, deletes and offset/line lookups. [`TextBuffer`] adds
//! a cursor, undo history and file association on top, and [`ffi`] exposes it
//! to C hosts.

pub mod buffer;
pub mod constants;
pub mod error;
pub mod ffi;
pub mod history;

pub use buffer::api::BufferView;
pub use buffer::piece_tree::{BufferSource, Piece, PieceTree, Position, Violation};
pub use buffer::{BufferOptions, BufferStats, TextBuffer};
pub use error::{BufferError, ErrorKind, Result};
pub use history::{EditOperation, UndoEntry, UndoLog};
