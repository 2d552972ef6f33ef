//! C ABI for native hosts
//!
//! Buffers cross the boundary as opaque `TextBuffer` pointers created by one
//! of the `rift_buffer_create*` functions and released with
//! `rift_buffer_destroy`. Fallible calls return a [`Status`]. Text handed to
//! the host is an owned byte array that must be given back to
//! `rift_buffer_free_text` together with its length.
//!
//! No panic unwinds into the host: every entry point catches it and reports
//! [`Status::Internal`] (or a null/zero result for calls without a status).

use crate::buffer::{BufferStats, Position, TextBuffer};
use crate::error::{BufferError, ErrorKind, Result};
use std::ffi::{c_char, CStr};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

/// Result code of a fallible call
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    Ok = 0,
    OutOfMemory = 1,
    InvalidOffset = 2,
    InvalidLine = 3,
    InvalidRange = 4,
    EmptyBuffer = 5,
    IoError = 6,
    NullPointer = 7,
    /// Bad argument such as a non UTF-8 path
    InvalidArgument = 8,
    /// A panic was caught at the boundary
    Internal = 9,
}

impl From<ErrorKind> for Status {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::OutOfMemory => Status::OutOfMemory,
            ErrorKind::InvalidOffset => Status::InvalidOffset,
            ErrorKind::InvalidLine => Status::InvalidLine,
            ErrorKind::InvalidRange => Status::InvalidRange,
            ErrorKind::EmptyBuffer => Status::EmptyBuffer,
            ErrorKind::Io | ErrorKind::NoPath => Status::IoError,
        }
    }
}

impl From<&BufferError> for Status {
    fn from(err: &BufferError) -> Self {
        err.kind.into()
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn guard<T>(fallback: T, f: impl FnOnce() -> T) -> T {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or(fallback)
}

/// Run `f` against the buffer behind `handle` and turn the outcome into a status
unsafe fn with_buffer(
    handle: *mut TextBuffer,
    f: impl FnOnce(&mut TextBuffer) -> Result<()>,
) -> Status {
    guard(Status::Internal, || {
        // SAFETY: the host passes a pointer obtained from rift_buffer_create*
        let Some(buffer) = (unsafe { handle.as_mut() }) else {
            return Status::NullPointer;
        };
        match f(buffer) {
            Ok(()) => Status::Ok,
            Err(e) => {
                log::debug!("FFI call failed: {}", e);
                Status::from(&e)
            }
        }
    })
}

/// Read-only variant of [`with_buffer`] for calls that return a plain value
unsafe fn read_buffer<T>(
    handle: *const TextBuffer,
    fallback: T,
    f: impl FnOnce(&TextBuffer) -> T,
) -> T {
    // SAFETY: see with_buffer
    match unsafe { handle.as_ref() } {
        Some(buffer) => guard(fallback, || f(buffer)),
        None => fallback,
    }
}

/// Borrow `len` bytes at `data`. A zero length accepts a null pointer.
unsafe fn bytes<'a>(data: *const u8, len: usize) -> Option<&'a [u8]> {
    if len == 0 {
        return Some(&[]);
    }
    if data.is_null() {
        return None;
    }
    // SAFETY: the host guarantees `data` points at `len` readable bytes
    Some(unsafe { std::slice::from_raw_parts(data, len) })
}

unsafe fn path_arg<'a>(path: *const c_char) -> std::result::Result<&'a str, Status> {
    if path.is_null() {
        return Err(Status::NullPointer);
    }
    // SAFETY: the host passes a NUL-terminated string
    unsafe { CStr::from_ptr(path) }
        .to_str()
        .map_err(|_| Status::InvalidArgument)
}

/// Hand `text` to the host, storing its length in `out_len`
unsafe fn export_text(text: Vec<u8>, out_len: *mut usize) -> *mut u8 {
    let boxed = text.into_boxed_slice();
    if let Some(out) = unsafe { out_len.as_mut() } {
        *out = boxed.len();
    }
    Box::into_raw(boxed) as *mut u8
}

fn into_handle(buffer: TextBuffer) -> *mut TextBuffer {
    Box::into_raw(Box::new(buffer))
}

// =============================================================================
// Lifecycle
// =============================================================================

/// Create an empty buffer
#[no_mangle]
pub extern "C" fn rift_buffer_create() -> *mut TextBuffer {
    guard(ptr::null_mut(), || into_handle(TextBuffer::new()))
}

/// Create a buffer holding a copy of `len` bytes at `data`.
/// Returns null on failure.
///
/// # Safety
/// `data` must point at `len` readable bytes (or be null when `len` is 0).
#[no_mangle]
pub unsafe extern "C" fn rift_buffer_create_with_content(
    data: *const u8,
    len: usize,
) -> *mut TextBuffer {
    let Some(content) = (unsafe { bytes(data, len) }) else {
        return ptr::null_mut();
    };
    guard(ptr::null_mut(), || match TextBuffer::with_content(content) {
        Ok(buffer) => into_handle(buffer),
        Err(_) => ptr::null_mut(),
    })
}

/// Load a buffer from the file at `path`. Returns null on failure.
///
/// # Safety
/// `path` must be a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn rift_buffer_create_from_file(path: *const c_char) -> *mut TextBuffer {
    let Ok(path) = (unsafe { path_arg(path) }) else {
        return ptr::null_mut();
    };
    guard(ptr::null_mut(), || match TextBuffer::from_file(path) {
        Ok(buffer) => into_handle(buffer),
        Err(e) => {
            log::debug!("rift_buffer_create_from_file: {}", e);
            ptr::null_mut()
        }
    })
}

/// Release a buffer. Null is ignored.
///
/// # Safety
/// `handle` must come from `rift_buffer_create*` and not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn rift_buffer_destroy(handle: *mut TextBuffer) {
    if handle.is_null() {
        return;
    }
    // SAFETY: ownership returns from the host
    drop(unsafe { Box::from_raw(handle) });
}

/// Release text returned by `rift_buffer_get_text` or `rift_buffer_get_line`.
///
/// # Safety
/// `data` and `len` must be exactly what one of those calls returned.
#[no_mangle]
pub unsafe extern "C" fn rift_buffer_free_text(data: *mut u8, len: usize) {
    if data.is_null() {
        return;
    }
    // SAFETY: reconstructs the boxed slice leaked by export_text
    drop(unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(data, len)) });
}

// =============================================================================
// Mutation
// =============================================================================

/// # Safety
/// `handle` must be a live buffer; `text` must point at `len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn rift_buffer_insert(
    handle: *mut TextBuffer,
    text: *const u8,
    len: usize,
) -> Status {
    let Some(text) = (unsafe { bytes(text, len) }) else {
        return Status::NullPointer;
    };
    unsafe { with_buffer(handle, |b| b.insert(text)) }
}

/// # Safety
/// Same as `rift_buffer_insert`.
#[no_mangle]
pub unsafe extern "C" fn rift_buffer_insert_at(
    handle: *mut TextBuffer,
    offset: usize,
    text: *const u8,
    len: usize,
) -> Status {
    let Some(text) = (unsafe { bytes(text, len) }) else {
        return Status::NullPointer;
    };
    unsafe { with_buffer(handle, |b| b.insert_at(offset, text)) }
}

/// # Safety
/// `handle` must be a live buffer.
#[no_mangle]
pub unsafe extern "C" fn rift_buffer_backspace(handle: *mut TextBuffer, count: usize) -> Status {
    unsafe { with_buffer(handle, |b| b.backspace(count)) }
}

/// # Safety
/// `handle` must be a live buffer.
#[no_mangle]
pub unsafe extern "C" fn rift_buffer_delete_forward(
    handle: *mut TextBuffer,
    count: usize,
) -> Status {
    unsafe { with_buffer(handle, |b| b.delete_forward(count)) }
}

/// # Safety
/// `handle` must be a live buffer.
#[no_mangle]
pub unsafe extern "C" fn rift_buffer_delete_range(
    handle: *mut TextBuffer,
    start: usize,
    len: usize,
) -> Status {
    unsafe { with_buffer(handle, |b| b.delete_range(start, len)) }
}

/// # Safety
/// `handle` must be a live buffer; `text` must point at `text_len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn rift_buffer_replace(
    handle: *mut TextBuffer,
    start: usize,
    len: usize,
    text: *const u8,
    text_len: usize,
) -> Status {
    let Some(text) = (unsafe { bytes(text, text_len) }) else {
        return Status::NullPointer;
    };
    unsafe { with_buffer(handle, |b| b.replace(start, len, text)) }
}

// =============================================================================
// Reads
// =============================================================================

/// # Safety
/// `handle` must be a live buffer or null.
#[no_mangle]
pub unsafe extern "C" fn rift_buffer_length(handle: *const TextBuffer) -> usize {
    unsafe { read_buffer(handle, 0, TextBuffer::len) }
}

/// # Safety
/// `handle` must be a live buffer or null.
#[no_mangle]
pub unsafe extern "C" fn rift_buffer_line_count(handle: *const TextBuffer) -> usize {
    unsafe { read_buffer(handle, 0, TextBuffer::line_count) }
}

/// Copy `[start, start + len)`. Returns null on failure; otherwise the length
/// is written to `out_len` and the result must go to `rift_buffer_free_text`.
///
/// # Safety
/// `handle` must be a live buffer; `out_len` must be writable or null.
#[no_mangle]
pub unsafe extern "C" fn rift_buffer_get_text(
    handle: *const TextBuffer,
    start: usize,
    len: usize,
    out_len: *mut usize,
) -> *mut u8 {
    unsafe {
        read_buffer(handle, ptr::null_mut(), |b| match b.get_text(start, len) {
            Ok(text) => export_text(text, out_len),
            Err(_) => ptr::null_mut(),
        })
    }
}

/// Copy line `line` without its line feed; see `rift_buffer_get_text`.
///
/// # Safety
/// Same as `rift_buffer_get_text`.
#[no_mangle]
pub unsafe extern "C" fn rift_buffer_get_line(
    handle: *const TextBuffer,
    line: usize,
    out_len: *mut usize,
) -> *mut u8 {
    unsafe {
        read_buffer(handle, ptr::null_mut(), |b| match b.get_line(line) {
            Ok(text) => export_text(text, out_len),
            Err(_) => ptr::null_mut(),
        })
    }
}

// =============================================================================
// Cursor and coordinates
// =============================================================================

/// # Safety
/// `handle` must be a live buffer or null.
#[no_mangle]
pub unsafe extern "C" fn rift_buffer_get_cursor(handle: *const TextBuffer) -> usize {
    unsafe { read_buffer(handle, 0, TextBuffer::cursor) }
}

/// Set the cursor, clamped to the document. Returns the position set.
///
/// # Safety
/// `handle` must be a live buffer or null.
#[no_mangle]
pub unsafe extern "C" fn rift_buffer_set_cursor(handle: *mut TextBuffer, offset: usize) -> usize {
    match unsafe { handle.as_mut() } {
        Some(b) => guard(0, || b.set_cursor(offset)),
        None => 0,
    }
}

/// Move the cursor by `delta`, clamped. Returns the new position.
///
/// # Safety
/// `handle` must be a live buffer or null.
#[no_mangle]
pub unsafe extern "C" fn rift_buffer_move_cursor(handle: *mut TextBuffer, delta: isize) -> usize {
    match unsafe { handle.as_mut() } {
        Some(b) => guard(0, || b.move_cursor(delta)),
        None => 0,
    }
}

/// # Safety
/// `handle` must be a live buffer or null.
#[no_mangle]
pub unsafe extern "C" fn rift_buffer_get_cursor_line_col(handle: *const TextBuffer) -> Position {
    unsafe {
        read_buffer(handle, Position::default(), |b| {
            b.cursor_line_col().unwrap_or_default()
        })
    }
}

/// # Safety
/// `handle` must be a live buffer.
#[no_mangle]
pub unsafe extern "C" fn rift_buffer_set_cursor_line_col(
    handle: *mut TextBuffer,
    line: usize,
    col: usize,
) -> Status {
    unsafe { with_buffer(handle, |b| b.set_cursor_line_col(Position::new(line, col))) }
}

/// # Safety
/// `handle` must be a live buffer; `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn rift_buffer_offset_to_line_col(
    handle: *const TextBuffer,
    offset: usize,
    out: *mut Position,
) -> Status {
    let Some(out) = (unsafe { out.as_mut() }) else {
        return Status::NullPointer;
    };
    unsafe {
        with_buffer(handle.cast_mut(), |b| {
            *out = b.offset_to_line_col(offset)?;
            Ok(())
        })
    }
}

/// # Safety
/// `handle` must be a live buffer; `out_offset` must be writable.
#[no_mangle]
pub unsafe extern "C" fn rift_buffer_line_col_to_offset(
    handle: *const TextBuffer,
    line: usize,
    col: usize,
    out_offset: *mut usize,
) -> Status {
    let Some(out) = (unsafe { out_offset.as_mut() }) else {
        return Status::NullPointer;
    };
    unsafe {
        with_buffer(handle.cast_mut(), |b| {
            *out = b.line_col_to_offset(Position::new(line, col))?;
            Ok(())
        })
    }
}

// =============================================================================
// History
// =============================================================================

/// Undo one entry. `performed` (optional) receives whether anything was undone.
///
/// # Safety
/// `handle` must be a live buffer; `performed` must be writable or null.
#[no_mangle]
pub unsafe extern "C" fn rift_buffer_undo(handle: *mut TextBuffer, performed: *mut bool) -> Status {
    unsafe {
        with_buffer(handle, |b| {
            let done = b.undo()?;
            if let Some(out) = performed.as_mut() {
                *out = done;
            }
            Ok(())
        })
    }
}

/// Redo one entry; see `rift_buffer_undo`.
///
/// # Safety
/// Same as `rift_buffer_undo`.
#[no_mangle]
pub unsafe extern "C" fn rift_buffer_redo(handle: *mut TextBuffer, performed: *mut bool) -> Status {
    unsafe {
        with_buffer(handle, |b| {
            let done = b.redo()?;
            if let Some(out) = performed.as_mut() {
                *out = done;
            }
            Ok(())
        })
    }
}

/// # Safety
/// `handle` must be a live buffer or null.
#[no_mangle]
pub unsafe extern "C" fn rift_buffer_can_undo(handle: *const TextBuffer) -> bool {
    unsafe { read_buffer(handle, false, TextBuffer::can_undo) }
}

/// # Safety
/// `handle` must be a live buffer or null.
#[no_mangle]
pub unsafe extern "C" fn rift_buffer_can_redo(handle: *const TextBuffer) -> bool {
    unsafe { read_buffer(handle, false, TextBuffer::can_redo) }
}

/// # Safety
/// `handle` must be a live buffer.
#[no_mangle]
pub unsafe extern "C" fn rift_buffer_clear_history(handle: *mut TextBuffer) -> Status {
    unsafe {
        with_buffer(handle, |b| {
            b.clear_history();
            Ok(())
        })
    }
}

// =============================================================================
// Persistence and state
// =============================================================================

/// # Safety
/// `handle` must be a live buffer.
#[no_mangle]
pub unsafe extern "C" fn rift_buffer_save(handle: *mut TextBuffer) -> Status {
    unsafe { with_buffer(handle, TextBuffer::save) }
}

/// # Safety
/// `handle` must be a live buffer; `path` must be a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn rift_buffer_save_as(
    handle: *mut TextBuffer,
    path: *const c_char,
) -> Status {
    let path = match unsafe { path_arg(path) } {
        Ok(p) => p,
        Err(status) => return status,
    };
    unsafe { with_buffer(handle, |b| b.save_as(path)) }
}

/// # Safety
/// `handle` must be a live buffer or null.
#[no_mangle]
pub unsafe extern "C" fn rift_buffer_is_modified(handle: *const TextBuffer) -> bool {
    unsafe { read_buffer(handle, false, TextBuffer::is_modified) }
}

/// # Safety
/// `handle` must be a live buffer.
#[no_mangle]
pub unsafe extern "C" fn rift_buffer_mark_unmodified(handle: *mut TextBuffer) -> Status {
    unsafe {
        with_buffer(handle, |b| {
            b.mark_unmodified();
            Ok(())
        })
    }
}

/// Zeroed stats for a null handle
///
/// # Safety
/// `handle` must be a live buffer or null.
#[no_mangle]
pub unsafe extern "C" fn rift_buffer_get_stats(handle: *const TextBuffer) -> BufferStats {
    unsafe { read_buffer(handle, BufferStats::default(), TextBuffer::stats) }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
