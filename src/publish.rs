use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::debug;

#[cfg(unix)]
const FILE_MODE: u32 = 0o644;

/// Atomically replace `path` with `content`.
///
/// The content goes to a temporary file in the destination directory, which
/// is renamed over `path` once fully written, so readers only ever see the old
/// or the new file. On failure the temporary file is removed.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::Builder::new()
        .suffix(".tmp")
        .tempfile_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;

    debug!("Writing {} via {}", path.display(), temp.path().display());

    temp.write_all(content.as_bytes())
        .context("Failed to write temporary file")?;
    temp.as_file()
        .sync_all()
        .context("Failed to sync temporary file")?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(temp.path(), fs::Permissions::from_mode(FILE_MODE))
            .context("Failed to set permissions on temporary file")?;
    }

    // Dropping the PersistError drops the temp file, which unlinks it.
    temp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to rename temporary file onto {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leftover_temp_files(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect()
    }

    #[test]
    fn replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vpn-nodes.json");
        fs::write(&path, "old").unwrap();

        write_atomic(&path, "[\n  \"new\"\n]").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "[\n  \"new\"\n]");
        assert!(leftover_temp_files(dir.path()).is_empty());
    }

    #[test]
    fn creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("whitebox-sd-config.yml");

        write_atomic(&path, "# header\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "# header\n");
    }

    #[cfg(unix)]
    #[test]
    fn published_file_is_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vpn-nodes.json");
        write_atomic(&path, "[]").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }

    #[test]
    fn failed_rename_leaves_destination_and_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory cannot be replaced by a file rename.
        let path = dir.path().join("target");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "x").unwrap();

        assert!(write_atomic(&path, "data").is_err());

        assert!(path.is_dir());
        assert_eq!(fs::read_to_string(path.join("keep")).unwrap(), "x");
        assert!(leftover_temp_files(dir.path()).is_empty());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent").join("vpn-nodes.json");
        assert!(write_atomic(&path, "[]").is_err());
        assert!(!path.exists());
    }
}
