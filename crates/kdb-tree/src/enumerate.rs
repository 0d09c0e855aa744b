use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{io_err, TreeError};

/// Relative paths of every leaf (non-directory) entry below `root`.
///
/// Descends into subdirectories using full paths, never into `skip` (compared
/// against the joined path, so pass it the same way `root` is spelled).
/// Symlinks are reported as leaves and not followed. A missing `root` yields
/// an empty list. Order is unspecified.
pub fn enumerate(root: &Path, skip: Option<&Path>) -> Result<Vec<PathBuf>, TreeError> {
    let mut out = Vec::new();
    walk(root, Path::new(""), skip, &mut out)?;
    Ok(out)
}

fn walk(dir: &Path, rel: &Path, skip: Option<&Path>, out: &mut Vec<PathBuf>) -> Result<(), TreeError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        // vanished between listing and descent, or never existed
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(io_err("read dir", dir)(e)),
    };
    for entry in entries {
        let entry = entry.map_err(io_err("read dir", dir))?;
        let path = entry.path();
        let child_rel = rel.join(entry.file_name());
        let file_type = entry.file_type().map_err(io_err("stat", &path))?;
        if file_type.is_dir() {
            if skip == Some(path.as_path()) {
                continue;
            }
            walk(&path, &child_rel, skip, out)?;
        } else {
            out.push(child_rel);
        }
    }
    Ok(())
}
