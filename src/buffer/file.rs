//! File loading and saving for buffers

use crate::constants::io::TEMP_SUFFIX;
use crate::error::{BufferError, ErrorKind, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Read a whole file into memory
pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    let bytes = fs::read(path).map_err(|e| {
        BufferError::new(
            ErrorKind::Io,
            format!("Failed to read {}: {}", path.display(), e),
        )
    })?;
    log::debug!("Loaded {} bytes from {}", bytes.len(), path.display());
    Ok(bytes)
}

/// Write `chunks` to `path`.
///
/// With `atomic` set the data goes to a hidden temporary file next to the
/// target, is synced, and then renamed over the target.
pub fn write_file<'a, I>(path: &Path, chunks: I, atomic: bool) -> Result<usize>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let target = if atomic {
        temp_path(path)
    } else {
        path.to_path_buf()
    };

    let written = match write_chunks(&target, chunks) {
        Ok(n) => n,
        Err(e) => {
            if atomic {
                let _ = fs::remove_file(&target);
            }
            return Err(BufferError::new(
                ErrorKind::Io,
                format!("Failed to write {}: {}", path.display(), e),
            ));
        }
    };

    if atomic {
        fs::rename(&target, path).map_err(|e| {
            let _ = fs::remove_file(&target);
            BufferError::new(
                ErrorKind::Io,
                format!("Failed to replace {}: {}", path.display(), e),
            )
        })?;
    }

    log::debug!("Saved {} bytes to {}", written, path.display());
    Ok(written)
}

fn write_chunks<'a, I>(path: &Path, chunks: I) -> std::io::Result<usize>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut file = fs::File::create(path)?;
    let mut written = 0;
    for chunk in chunks {
        file.write_all(chunk)?;
        written += chunk.len();
    }
    file.sync_all()?;
    Ok(written)
}

/// `dir/.name.tmp` for `dir/name`
fn temp_path(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("buffer");
    parent.join(format!(".{}{}", name, TEMP_SUFFIX))
}
