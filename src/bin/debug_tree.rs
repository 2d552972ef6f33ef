use anyhow::{anyhow, Context, Result};
use rift_buffer::buffer::api::BufferView;
use rift_buffer::{BufferStats, TextBuffer};

fn print_stats(label: &str, stats: &BufferStats) {
    println!(
        "{:<10} len={} lines={} pieces={} original={} edit={} height={}",
        label,
        stats.total_length,
        stats.line_count,
        stats.piece_count,
        stats.original_size,
        stats.edit_size,
        stats.tree_height
    );
}

fn main() -> Result<()> {
    let mut buffer = match std::env::args().nth(1) {
        Some(path) => TextBuffer::from_file(&path).with_context(|| format!("loading {}", path))?,
        None => TextBuffer::with_content("Hello World\nLine 2\nLine 3")?,
    };
    println!("Buffer: {}", buffer.display_name());
    print_stats("loaded", &buffer.stats());

    // Scatter small edits across the document to split pieces
    let steps = 64;
    for i in 0..steps {
        let offset = (buffer.len() * i) / steps;
        buffer.insert_at(offset, b"#")?;
    }
    print_stats("inserted", &buffer.stats());

    for _ in 0..steps / 2 {
        buffer.set_cursor(buffer.len() / 2);
        buffer.delete_forward(1)?;
    }
    print_stats("deleted", &buffer.stats());
    buffer
        .verify()
        .map_err(|v| anyhow!("tree invariant broken: {}", v))?;

    let first: Vec<u8> = buffer.line_bytes(0)?.flatten().copied().collect();
    println!("Line 0: {:?}", String::from_utf8_lossy(&first));

    let mut undone = 0;
    while buffer.undo()? {
        undone += 1;
    }
    print_stats("undone", &buffer.stats());
    println!("Undid {} edits, modified: {}", undone, buffer.is_modified());

    buffer
        .verify()
        .map_err(|v| anyhow!("tree invariant broken after undo: {}", v))?;
    println!("Invariants hold");
    Ok(())
}
