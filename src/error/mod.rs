//! Centralized error handling for the buffer
//! Defines the error taxonomy, error codes and the crate-wide `Result`

use crate::constants::errors;
use std::collections::TryReserveError;
use std::fmt;

/// Category of the error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Allocation failure while growing a buffer or the node arena
    OutOfMemory,
    /// Byte offset outside the document
    InvalidOffset,
    /// Line number outside the document
    InvalidLine,
    /// Span or column outside the document or line
    InvalidRange,
    /// Position query against an empty document
    EmptyBuffer,
    /// File open/read/write failure
    Io,
    /// Save requested but no file is associated with the buffer
    NoPath,
}

impl ErrorKind {
    /// Machine-readable code for this kind
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::OutOfMemory => errors::OUT_OF_MEMORY,
            Self::InvalidOffset => errors::INVALID_OFFSET,
            Self::InvalidLine => errors::INVALID_LINE,
            Self::InvalidRange => errors::INVALID_RANGE,
            Self::EmptyBuffer => errors::EMPTY_BUFFER,
            Self::Io => errors::IO_ERROR,
            Self::NoPath => errors::NO_PATH,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory => write!(f, "OutOfMemory"),
            Self::InvalidOffset => write!(f, "InvalidOffset"),
            Self::InvalidLine => write!(f, "InvalidLine"),
            Self::InvalidRange => write!(f, "InvalidRange"),
            Self::EmptyBuffer => write!(f, "EmptyBuffer"),
            Self::Io => write!(f, "IO"),
            Self::NoPath => write!(f, "NoPath"),
        }
    }
}

/// A structured buffer error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferError {
    /// What kind of error occurred
    pub kind: ErrorKind,
    /// Machine-readable error code (e.g., "INVALID_OFFSET")
    pub code: &'static str,
    /// Human-readable description
    pub message: String,
}

impl BufferError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: kind.code(),
            message: message.into(),
        }
    }

    pub fn invalid_offset(offset: usize, len: usize) -> Self {
        Self::new(
            ErrorKind::InvalidOffset,
            format!("Offset {} out of bounds (len: {})", offset, len),
        )
    }

    pub fn invalid_line(line: usize, line_count: usize) -> Self {
        Self::new(
            ErrorKind::InvalidLine,
            format!("Line {} out of bounds (lines: {})", line, line_count),
        )
    }

    pub fn invalid_range(start: usize, len: usize, total: usize) -> Self {
        Self::new(
            ErrorKind::InvalidRange,
            format!(
                "Range {}..{} out of bounds (len: {})",
                start,
                start.saturating_add(len),
                total
            ),
        )
    }

    pub fn out_of_memory(what: &str) -> Self {
        Self::new(
            ErrorKind::OutOfMemory,
            format!("Allocation failed while growing {}", what),
        )
    }

    pub fn empty_buffer() -> Self {
        Self::new(ErrorKind::EmptyBuffer, "Buffer is empty")
    }

    /// Check if the message contains a substring (useful for tests)
    pub fn contains_msg(&self, sub: &str) -> bool {
        self.message.contains(sub)
    }
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}): {}", self.kind, self.code, self.message)
    }
}

impl std::error::Error for BufferError {}

impl From<std::io::Error> for BufferError {
    fn from(err: std::io::Error) -> Self {
        Self::new(ErrorKind::Io, err.to_string())
    }
}

impl From<TryReserveError> for BufferError {
    fn from(err: TryReserveError) -> Self {
        Self::new(ErrorKind::OutOfMemory, err.to_string())
    }
}

/// Result alias for buffer operations
pub type Result<T> = std::result::Result<T, BufferError>;
