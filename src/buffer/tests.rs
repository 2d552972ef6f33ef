use super::*;
use tempfile::tempdir;

fn buffer_with(text: &str) -> TextBuffer {
    TextBuffer::with_content(text).unwrap()
}

#[test]
fn test_new_buffer() {
    let buffer = TextBuffer::new();
    assert!(buffer.is_empty());
    assert_eq!(buffer.len(), 0);
    assert_eq!(buffer.cursor(), 0);
    assert_eq!(buffer.line_count(), 1);
    assert!(!buffer.is_modified());
    assert!(!buffer.can_undo());
    assert_eq!(buffer.display_name(), "[No Name]");
}

#[test]
fn test_insert_str() {
    let mut buffer = TextBuffer::new();
    buffer.insert_str("Hello").unwrap();
    buffer.insert_str(" World").unwrap();

    assert_eq!(buffer.to_string(), "Hello World");
    assert_eq!(buffer.cursor(), 11);
    assert!(buffer.is_modified());
    assert_eq!(buffer.revision(), 2);
}

#[test]
fn test_insert_at_moves_cursor() {
    let mut buffer = buffer_with("ac");
    buffer.insert_at(1, b"b").unwrap();
    assert_eq!(buffer.to_string(), "abc");
    assert_eq!(buffer.cursor(), 2);
}

#[test]
fn test_failed_insert_changes_nothing() {
    let mut buffer = buffer_with("abc");
    buffer.set_cursor(1);
    let err = buffer.insert_at(10, b"x").unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidOffset);
    assert_eq!(buffer.cursor(), 1);
    assert!(!buffer.is_modified());
    assert!(!buffer.can_undo());
    assert_eq!(buffer.revision(), 0);
}

#[test]
fn test_backspace() {
    let mut buffer = TextBuffer::new();
    buffer.insert_str("Hello World").unwrap();
    buffer.backspace(6).unwrap();
    assert_eq!(buffer.to_string(), "Hello");
    assert_eq!(buffer.cursor(), 5);

    // Clamped to what is before the cursor
    buffer.set_cursor(2);
    buffer.backspace(10).unwrap();
    assert_eq!(buffer.to_string(), "llo");
    assert_eq!(buffer.cursor(), 0);

    // No-op at the start
    let rev = buffer.revision();
    buffer.backspace(1).unwrap();
    assert_eq!(buffer.revision(), rev);
}

#[test]
fn test_delete_forward() {
    let mut buffer = buffer_with("abcdef");
    buffer.set_cursor(2);
    buffer.delete_forward(2).unwrap();
    assert_eq!(buffer.to_string(), "abef");
    assert_eq!(buffer.cursor(), 2);

    buffer.delete_forward(100).unwrap();
    assert_eq!(buffer.to_string(), "ab");
    buffer.delete_forward(1).unwrap();
    assert_eq!(buffer.to_string(), "ab");
}

#[test]
fn test_delete_range_cursor_rules() {
    // Cursor after the range shifts left
    let mut buffer = buffer_with("0123456789");
    buffer.set_cursor(8);
    buffer.delete_range(2, 3).unwrap();
    assert_eq!(buffer.to_string(), "0156789");
    assert_eq!(buffer.cursor(), 5);

    // Cursor inside the range snaps to its start
    let mut buffer = buffer_with("0123456789");
    buffer.set_cursor(4);
    buffer.delete_range(2, 5).unwrap();
    assert_eq!(buffer.cursor(), 2);

    // Cursor before the range stays
    let mut buffer = buffer_with("0123456789");
    buffer.set_cursor(1);
    buffer.delete_range(2, 5).unwrap();
    assert_eq!(buffer.cursor(), 1);
}

#[test]
fn test_delete_range_invalid() {
    let mut buffer = buffer_with("abc");
    let err = buffer.delete_range(2, 5).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidRange);
    assert_eq!(buffer.to_string(), "abc");
}

#[test]
fn test_replace_is_one_undo_step() {
    let mut buffer = buffer_with("Hello World");
    buffer.replace(6, 5, b"Zig").unwrap();
    assert_eq!(buffer.to_string(), "Hello Zig");
    assert_eq!(buffer.cursor(), 9);
    assert_eq!(buffer.history().undo_len(), 1);

    assert!(buffer.undo().unwrap());
    assert_eq!(buffer.to_string(), "Hello World");
    assert_eq!(buffer.cursor(), 0);

    assert!(buffer.redo().unwrap());
    assert_eq!(buffer.to_string(), "Hello Zig");
    assert_eq!(buffer.cursor(), 9);
}

#[test]
fn test_replace_advances_revision_once() {
    let mut buffer = buffer_with("Hello World");
    buffer.replace(6, 5, b"Zig").unwrap();
    assert_eq!(buffer.revision(), 1);

    buffer.undo().unwrap();
    assert_eq!(buffer.revision(), 2);
    buffer.redo().unwrap();
    assert_eq!(buffer.revision(), 3);
}

#[test]
fn test_group_revision_counts_on_close() {
    let mut buffer = TextBuffer::new();
    buffer.begin_group();
    buffer.insert_str("a").unwrap();
    buffer.begin_group();
    buffer.insert_str("b").unwrap();
    buffer.end_group();
    assert_eq!(buffer.revision(), 0);
    assert!(buffer.is_modified());
    buffer.end_group();
    assert_eq!(buffer.revision(), 1);

    // An empty group does not count
    buffer.begin_group();
    buffer.end_group();
    assert_eq!(buffer.revision(), 1);

    // Undo while grouping commits the group first
    buffer.begin_group();
    buffer.insert_str("c").unwrap();
    assert!(buffer.undo().unwrap());
    assert_eq!(buffer.to_string(), "ab");
    assert_eq!(buffer.revision(), 3);
}

#[test]
fn test_replace_pure_insert_and_pure_delete() {
    let mut buffer = buffer_with("ac");
    buffer.replace(1, 0, b"b").unwrap();
    assert_eq!(buffer.to_string(), "abc");
    buffer.replace(0, 2, b"").unwrap();
    assert_eq!(buffer.to_string(), "c");
    assert_eq!(buffer.history().undo_len(), 2);
}

#[test]
fn test_replace_invalid_range_leaves_no_group() {
    let mut buffer = buffer_with("abc");
    assert!(buffer.replace(2, 2, b"x").is_err());
    assert!(!buffer.history().is_grouping());
    assert_eq!(buffer.to_string(), "abc");
}

#[test]
fn test_undo_redo_restore_cursor() {
    let mut buffer = TextBuffer::new();
    buffer.insert_str("abc").unwrap();
    buffer.set_cursor(1);
    buffer.backspace(1).unwrap();
    assert_eq!(buffer.to_string(), "bc");

    buffer.undo().unwrap();
    assert_eq!(buffer.to_string(), "abc");
    assert_eq!(buffer.cursor(), 1);

    buffer.redo().unwrap();
    assert_eq!(buffer.cursor(), 0);
    assert!(!buffer.redo().unwrap());
}

#[test]
fn test_edit_after_undo_clears_redo() {
    let mut buffer = TextBuffer::new();
    buffer.insert_str("a").unwrap();
    buffer.insert_str("b").unwrap();
    buffer.undo().unwrap();
    assert!(buffer.can_redo());
    buffer.insert_str("c").unwrap();
    assert!(!buffer.can_redo());
}

#[test]
fn test_user_groups() {
    let mut buffer = TextBuffer::new();
    buffer.begin_group();
    buffer.insert_str("one ").unwrap();
    buffer.insert_str("two").unwrap();
    buffer.end_group();
    buffer.insert_str("!").unwrap();

    buffer.undo().unwrap();
    assert_eq!(buffer.to_string(), "one two");
    buffer.undo().unwrap();
    assert_eq!(buffer.to_string(), "");
    assert!(!buffer.undo().unwrap());
}

#[test]
fn test_clear_history() {
    let mut buffer = TextBuffer::new();
    buffer.insert_str("x").unwrap();
    buffer.clear_history();
    assert!(!buffer.can_undo());
    assert_eq!(buffer.to_string(), "x");
}

#[test]
fn test_undo_disabled() {
    let mut buffer = TextBuffer::with_options(BufferOptions::default().with_max_undo_entries(0));
    buffer.insert_str("x").unwrap();
    assert!(!buffer.can_undo());
    assert!(!buffer.undo().unwrap());
}

#[test]
fn test_cursor_clamping() {
    let mut buffer = buffer_with("hello");
    assert_eq!(buffer.set_cursor(99), 5);
    assert_eq!(buffer.move_cursor(-2), 3);
    assert_eq!(buffer.move_cursor(-10), 0);
    assert_eq!(buffer.move_cursor(isize::MAX), 5);
    buffer.move_to_start();
    assert_eq!(buffer.cursor(), 0);
    buffer.move_to_end();
    assert_eq!(buffer.cursor(), 5);
}

#[test]
fn test_cursor_line_col() {
    let mut buffer = buffer_with("Hello\nWorld");
    buffer.set_cursor(6);
    assert_eq!(buffer.cursor_line_col().unwrap(), Position::new(1, 0));

    buffer.set_cursor_line_col(Position::new(1, 3)).unwrap();
    assert_eq!(buffer.cursor(), 9);

    let err = buffer.set_cursor_line_col(Position::new(5, 0)).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidLine);
    assert_eq!(buffer.cursor(), 9);
}

#[test]
fn test_stats() {
    let mut buffer = buffer_with("line one\nline two");
    buffer.set_cursor(4);
    buffer.insert_str("!").unwrap();

    let stats = buffer.stats();
    assert_eq!(stats.total_length, 18);
    assert_eq!(stats.line_count, 2);
    assert_eq!(stats.piece_count, 3);
    assert_eq!(stats.original_size, 17);
    assert_eq!(stats.edit_size, 1);
    assert!(stats.tree_height >= 2);
    assert!(buffer.verify().is_ok());
}

#[test]
fn test_save_without_path() {
    let mut buffer = buffer_with("x");
    let err = buffer.save().unwrap_err();
    assert_eq!(err.kind, ErrorKind::NoPath);
}

#[test]
fn test_save_as_and_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("doc.txt");

    let mut buffer = TextBuffer::new();
    buffer.insert_str("first\nsecond").unwrap();
    buffer.save_as(&path).unwrap();
    assert!(!buffer.is_modified());
    assert_eq!(buffer.file_path(), Some(path.as_path()));
    assert_eq!(buffer.display_name(), "doc.txt");
    assert_eq!(std::fs::read(&path).unwrap(), b"first\nsecond");

    buffer.insert_str("!").unwrap();
    assert!(buffer.is_modified());
    buffer.save().unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"first\nsecond!");

    buffer.insert_str("?").unwrap();
    buffer.reload().unwrap();
    assert_eq!(buffer.to_string(), "first\nsecond!");
    assert_eq!(buffer.cursor(), 0);
    assert!(!buffer.is_modified());
    assert!(!buffer.can_undo());
}

#[test]
fn test_from_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("in.txt");
    std::fs::write(&path, "a\nb\nc").unwrap();

    let buffer = TextBuffer::from_file(&path).unwrap();
    assert_eq!(buffer.line_count(), 3);
    assert_eq!(buffer.get_line(2).unwrap(), b"c");
    assert_eq!(buffer.stats().original_size, 5);
    assert_eq!(buffer.file_path(), Some(path.as_path()));
    assert!(!buffer.is_modified());

    let err = TextBuffer::from_file(dir.path().join("missing")).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Io);
}

#[test]
fn test_non_atomic_save() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("plain.txt");
    let mut buffer = TextBuffer::with_options(BufferOptions::default().with_atomic_save(false));
    buffer.insert_str("data").unwrap();
    buffer.set_path(&path);
    buffer.save().unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"data");
}

#[test]
fn test_mark_unmodified() {
    let mut buffer = TextBuffer::new();
    buffer.insert_str("x").unwrap();
    buffer.mark_unmodified();
    assert!(!buffer.is_modified());
    buffer.undo().unwrap();
    assert!(buffer.is_modified());
}
