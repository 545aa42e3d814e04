use std::fs;
use std::io;
use std::path::Path;

pub const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;
pub const LOG_KEEP_LINES: usize = 1000;

/// Truncate `path` to its last `keep_lines` lines once it grows past `max_size` bytes.
///
/// Returns `Ok(true)` when the file was rewritten. A missing file is a no-op.
pub fn rotate_log(path: &Path, max_size: u64, keep_lines: usize) -> io::Result<bool> {
    if !path.is_file() {
        return Ok(false);
    }
    if fs::metadata(path)?.len() <= max_size {
        return Ok(false);
    }

    let raw = fs::read(path)?;
    let text = String::from_utf8_lossy(&raw);
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    let tail = &lines[lines.len().saturating_sub(keep_lines)..];

    fs::write(path, tail.concat())?;
    Ok(true)
}
