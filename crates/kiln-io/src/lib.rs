//! File output helpers for kiln
//!
//! Everything kiln writes (manifests, driver sources, packed headers, the
//! amalgamation) goes through here so that readers never observe a
//! half-written file and unchanged outputs keep their mtimes.

use std::io::Write;

use camino::Utf8Path;

/// Atomically write contents to a file.
///
/// Creates a temporary file in the same directory, writes contents,
/// then atomically renames to the final path. This ensures the file
/// is never partially written.
pub fn atomic_write(path: &Utf8Path, contents: &[u8]) -> Result<(), std::io::Error> {
    let parent_dir = match path.parent() {
        Some(p) if !p.as_str().is_empty() => p,
        _ => Utf8Path::new("."),
    };
    std::fs::create_dir_all(parent_dir)?;

    let temp_file = tempfile::Builder::new()
        .prefix(".tmp-")
        .tempfile_in(parent_dir)
        .map_err(std::io::Error::other)?;

    let (mut file, temp_path) = temp_file.into_parts();
    file.write_all(contents)?;
    file.sync_all()?;
    drop(file);

    temp_path
        .persist(path)
        .map_err(|e| std::io::Error::other(format!("failed to persist temp file: {}", e)))?;

    Ok(())
}

/// What [`write_if_changed`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The file did not exist or had different contents
    Written,
    /// The file already held exactly these bytes
    Unchanged,
}

/// Atomically write `contents` unless the file already holds those bytes.
///
/// Ninja decides staleness by mtime, so rewriting an identical manifest or
/// generated source would trigger rebuilds of everything downstream.
pub fn write_if_changed(path: &Utf8Path, contents: &[u8]) -> Result<WriteOutcome, std::io::Error> {
    match std::fs::read(path) {
        Ok(existing) if existing == contents => {
            tracing::debug!(path = %path, "contents unchanged, not rewriting");
            return Ok(WriteOutcome::Unchanged);
        }
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    atomic_write(path, contents)?;
    Ok(WriteOutcome::Written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test_log::test]
    fn atomic_write_creates_parent_dirs() {
        let temp = TempDir::new().unwrap();
        let root = Utf8Path::from_path(temp.path()).unwrap();
        let path = root.join("out/ld/build.ninja");

        atomic_write(&path, b"rule cc\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "rule cc\n");
    }

    #[test_log::test]
    fn write_if_changed_skips_identical_contents() {
        let temp = TempDir::new().unwrap();
        let root = Utf8Path::from_path(temp.path()).unwrap();
        let path = root.join("build.ninja");

        assert_eq!(write_if_changed(&path, b"a").unwrap(), WriteOutcome::Written);
        assert_eq!(write_if_changed(&path, b"a").unwrap(), WriteOutcome::Unchanged);
        assert_eq!(write_if_changed(&path, b"b").unwrap(), WriteOutcome::Written);
        assert_eq!(std::fs::read(&path).unwrap(), b"b");
    }

    #[test_log::test]
    fn no_temp_files_left_behind() {
        let temp = TempDir::new().unwrap();
        let root = Utf8Path::from_path(temp.path()).unwrap();

        atomic_write(&root.join("x.c"), b"int x;").unwrap();

        let names: Vec<_> = std::fs::read_dir(root)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["x.c".to_string()]);
    }
}
