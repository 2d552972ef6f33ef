use super::*;
use std::ffi::CString;
use tempfile::tempdir;

/// Copy out and release text returned across the boundary
unsafe fn take_text(data: *mut u8, len: usize) -> Vec<u8> {
    assert!(!data.is_null());
    let copy = unsafe { std::slice::from_raw_parts(data, len) }.to_vec();
    unsafe { rift_buffer_free_text(data, len) };
    copy
}

unsafe fn all_text(h: *const TextBuffer) -> Vec<u8> {
    let mut len: usize = 0;
    let len_total = unsafe { rift_buffer_length(h) };
    let data = unsafe { rift_buffer_get_text(h, 0, len_total, &mut len) };
    unsafe { take_text(data, len) }
}

#[test]
fn test_status_codes() {
    assert_eq!(Status::Ok as i32, 0);
    assert_eq!(Status::OutOfMemory as i32, 1);
    assert_eq!(Status::IoError as i32, 6);
    assert_eq!(Status::Internal as i32, 9);
    assert_eq!(Status::from(ErrorKind::NoPath), Status::IoError);
    assert_eq!(Status::from(ErrorKind::InvalidLine), Status::InvalidLine);
}

#[test]
fn test_edit_session() {
    unsafe {
        let h = rift_buffer_create();
        assert!(!h.is_null());

        assert_eq!(rift_buffer_insert(h, b"Hello".as_ptr(), 5), Status::Ok);
        assert_eq!(rift_buffer_insert(h, b" World".as_ptr(), 6), Status::Ok);
        assert_eq!(all_text(h), b"Hello World");
        assert_eq!(rift_buffer_get_cursor(h), 11);

        assert_eq!(rift_buffer_backspace(h, 6), Status::Ok);
        assert_eq!(all_text(h), b"Hello");
        assert_eq!(rift_buffer_get_cursor(h), 5);
        assert!(rift_buffer_is_modified(h));

        rift_buffer_destroy(h);
    }
}

#[test]
fn test_replace_undo_redo() {
    unsafe {
        let h = rift_buffer_create_with_content(b"Hello World".as_ptr(), 11);
        assert_eq!(rift_buffer_replace(h, 6, 5, b"Zig".as_ptr(), 3), Status::Ok);
        assert_eq!(all_text(h), b"Hello Zig");

        let mut done = false;
        assert_eq!(rift_buffer_undo(h, &mut done), Status::Ok);
        assert!(done);
        assert_eq!(all_text(h), b"Hello World");
        assert!(rift_buffer_can_redo(h));

        assert_eq!(rift_buffer_redo(h, ptr::null_mut()), Status::Ok);
        assert_eq!(all_text(h), b"Hello Zig");

        assert_eq!(rift_buffer_clear_history(h), Status::Ok);
        assert!(!rift_buffer_can_undo(h));
        assert_eq!(rift_buffer_undo(h, &mut done), Status::Ok);
        assert!(!done);

        rift_buffer_destroy(h);
    }
}

#[test]
fn test_errors_map_to_status() {
    unsafe {
        let h = rift_buffer_create_with_content(b"abc".as_ptr(), 3);
        assert_eq!(rift_buffer_insert_at(h, 9, b"x".as_ptr(), 1), Status::InvalidOffset);
        assert_eq!(rift_buffer_delete_range(h, 2, 5), Status::InvalidRange);
        assert_eq!(rift_buffer_set_cursor_line_col(h, 4, 0), Status::InvalidLine);
        assert_eq!(rift_buffer_save(h), Status::IoError);
        assert_eq!(rift_buffer_insert(h, ptr::null(), 3), Status::NullPointer);

        let mut len: usize = 0;
        assert!(rift_buffer_get_text(h, 2, 5, &mut len).is_null());
        assert!(rift_buffer_get_line(h, 3, &mut len).is_null());

        assert_eq!(all_text(h), b"abc");
        rift_buffer_destroy(h);
    }
}

#[test]
fn test_null_handles() {
    unsafe {
        let h: *mut TextBuffer = ptr::null_mut();
        assert_eq!(rift_buffer_insert(h, b"x".as_ptr(), 1), Status::NullPointer);
        assert_eq!(rift_buffer_length(h), 0);
        assert_eq!(rift_buffer_set_cursor(h, 3), 0);
        assert!(!rift_buffer_can_undo(h));
        assert_eq!(rift_buffer_get_stats(h), BufferStats::default());
        rift_buffer_destroy(h);
        rift_buffer_free_text(ptr::null_mut(), 0);
    }
}

#[test]
fn test_cursor_and_coordinates() {
    unsafe {
        let text = b"Hello\nWorld";
        let h = rift_buffer_create_with_content(text.as_ptr(), text.len());
        assert_eq!(rift_buffer_line_count(h), 2);

        assert_eq!(rift_buffer_set_cursor(h, 6), 6);
        assert_eq!(rift_buffer_get_cursor_line_col(h), Position::new(1, 0));
        assert_eq!(rift_buffer_move_cursor(h, -100), 0);
        assert_eq!(rift_buffer_set_cursor(h, 100), 11);

        let mut pos = Position::default();
        assert_eq!(rift_buffer_offset_to_line_col(h, 8, &mut pos), Status::Ok);
        assert_eq!(pos, Position::new(1, 2));

        let mut offset: usize = 0;
        assert_eq!(rift_buffer_line_col_to_offset(h, 0, 4, &mut offset), Status::Ok);
        assert_eq!(offset, 4);
        assert_eq!(
            rift_buffer_line_col_to_offset(h, 0, 9, &mut offset),
            Status::InvalidRange
        );

        let mut len: usize = 0;
        let line = rift_buffer_get_line(h, 1, &mut len);
        assert_eq!(take_text(line, len), b"World");

        rift_buffer_destroy(h);
    }
}

#[test]
fn test_empty_text_round_trip() {
    unsafe {
        let h = rift_buffer_create();
        let mut len: usize = 7;
        let data = rift_buffer_get_text(h, 0, 0, &mut len);
        assert_eq!(len, 0);
        assert!(take_text(data, len).is_empty());
        rift_buffer_destroy(h);
    }
}

#[test]
fn test_files_and_stats() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ffi.txt");
    std::fs::write(&path, "one\ntwo").unwrap();
    let c_path = CString::new(path.to_str().unwrap()).unwrap();

    unsafe {
        let h = rift_buffer_create_from_file(c_path.as_ptr());
        assert!(!h.is_null());
        assert_eq!(rift_buffer_insert_at(h, 7, b"!".as_ptr(), 1), Status::Ok);

        let stats = rift_buffer_get_stats(h);
        assert_eq!(stats.total_length, 8);
        assert_eq!(stats.line_count, 2);
        assert_eq!(stats.piece_count, 2);
        assert_eq!(stats.original_size, 7);
        assert_eq!(stats.edit_size, 1);

        assert_eq!(rift_buffer_save(h), Status::Ok);
        assert!(!rift_buffer_is_modified(h));
        assert_eq!(std::fs::read(&path).unwrap(), b"one\ntwo!");

        let copy = CString::new(dir.path().join("copy.txt").to_str().unwrap()).unwrap();
        assert_eq!(rift_buffer_save_as(h, copy.as_ptr()), Status::Ok);
        assert_eq!(rift_buffer_save_as(h, ptr::null()), Status::NullPointer);

        rift_buffer_insert(h, b"?".as_ptr(), 1);
        assert_eq!(rift_buffer_mark_unmodified(h), Status::Ok);
        assert!(!rift_buffer_is_modified(h));

        rift_buffer_destroy(h);
    }

    let missing = CString::new(dir.path().join("missing").to_str().unwrap()).unwrap();
    assert!(unsafe { rift_buffer_create_from_file(missing.as_ptr()) }.is_null());
}
