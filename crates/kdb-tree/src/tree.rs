use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use kdb_core::{DomainName, HostId, CONFIG_SUFFIX, QUARANTINE_DIR};
use tracing::debug;

use crate::enumerate::enumerate;
use crate::error::{io_err, TreeError};

/// What a rotation pass did with the files it found.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RotationReport {
    /// Quarantine paths of files moved out of the host directory.
    pub moved: Vec<PathBuf>,
    /// Current files deleted because quarantine already held their name.
    pub discarded: Vec<PathBuf>,
}

impl RotationReport {
    pub fn is_empty(&self) -> bool {
        self.moved.is_empty() && self.discarded.is_empty()
    }
}

/// Quarantine state for a domain at the moment a fresh configuration was written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreviousGeneration {
    None,
    Unchanged,
    Changed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteOutcome {
    pub path: PathBuf,
    pub previous: PreviousGeneration,
}

/// Backup root laid out as `<root>/<host>/<domain>.xml` plus `<root>/lost/<domain>.xml`.
///
/// Assumes exclusive ownership of the root for the duration of a run.
#[derive(Clone, Debug)]
pub struct RetentionTree {
    root: PathBuf,
    quarantine: PathBuf,
}

impl RetentionTree {
    /// Opens an existing backup root and makes sure the quarantine directory exists.
    pub fn initialize(root: impl Into<PathBuf>) -> Result<Self, TreeError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(TreeError::NotADirectory(root));
        }
        let tree = Self { quarantine: root.join(QUARANTINE_DIR), root };
        tree.ensure_quarantine()?;
        Ok(tree)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn quarantine_dir(&self) -> &Path {
        &self.quarantine
    }

    pub fn host_dir(&self, host: &HostId) -> PathBuf {
        self.root.join(host.as_str())
    }

    pub fn current_path(&self, host: &HostId, domain: &DomainName) -> PathBuf {
        self.host_dir(host).join(domain.file_name())
    }

    pub fn quarantine_path(&self, domain: &DomainName) -> PathBuf {
        self.quarantine.join(domain.file_name())
    }

    fn ensure_quarantine(&self) -> Result<(), TreeError> {
        fs::create_dir_all(&self.quarantine).map_err(io_err("create quarantine dir", &self.quarantine))
    }

    /// Moves every configuration file left in the host directory into quarantine.
    ///
    /// When quarantine already holds a file of the same name, that older copy
    /// wins and the current file is deleted instead. Files without the
    /// configuration suffix are left alone.
    pub fn rotate_host(&self, host: &HostId) -> Result<RotationReport, TreeError> {
        self.ensure_quarantine()?;
        let host_dir = self.host_dir(host);
        let mut report = RotationReport::default();

        for rel in enumerate(&host_dir, Some(self.quarantine.as_path()))? {
            if !is_config_file(&rel) {
                continue;
            }
            let Some(base) = rel.file_name() else { continue };
            let src = host_dir.join(&rel);
            let dst = self.quarantine.join(base);

            if occupied(&dst)? {
                if remove_if_present(&src)? {
                    debug!("rm {} (kept {})", src.display(), dst.display());
                    report.discarded.push(src);
                }
            } else if move_if_present(&src, &dst)? {
                debug!("mv {} -> {}", src.display(), dst.display());
                report.moved.push(dst);
            }
        }
        Ok(report)
    }

    /// Stores `content` as the current configuration of `domain` on `host`, then
    /// drops any quarantine entry of the same name.
    pub fn write(&self, host: &HostId, domain: &DomainName, content: &[u8]) -> Result<WriteOutcome, TreeError> {
        let dir = self.host_dir(host);
        fs::create_dir_all(&dir).map_err(io_err("create host dir", &dir))?;
        let path = dir.join(domain.file_name());
        fs::write(&path, content).map_err(io_err("write", &path))?;

        let lost = self.quarantine_path(domain);
        let previous = if occupied(&lost)? {
            match fs::read(&lost) {
                Ok(prev) if prev == content => PreviousGeneration::Unchanged,
                // dangling links and directories land here too
                _ => PreviousGeneration::Changed,
            }
        } else {
            PreviousGeneration::None
        };
        if purge_entry(&lost)? {
            debug!("purged {}", lost.display());
        }
        debug!("wrote {} ({} bytes)", path.display(), content.len());
        Ok(WriteOutcome { path, previous })
    }

    /// Domains currently held in quarantine, sorted.
    pub fn quarantined(&self) -> Result<Vec<DomainName>, TreeError> {
        let entries = match fs::read_dir(&self.quarantine) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_err("read dir", &self.quarantine)(e)),
        };
        let mut out = Vec::new();
        for entry in entries {
            let entry = entry.map_err(io_err("read dir", &self.quarantine))?;
            if let Some(name) = entry.file_name().to_str().and_then(DomainName::from_file_name) {
                out.push(name);
            }
        }
        out.sort();
        Ok(out)
    }
}

fn is_config_file(rel: &Path) -> bool {
    rel.file_name()
        .map(|n| n.as_encoded_bytes().ends_with(CONFIG_SUFFIX.as_bytes()))
        .unwrap_or(false)
}

fn occupied(path: &Path) -> Result<bool, TreeError> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(io_err("stat", path)(e)),
    }
}

/// A source that is already gone counts as done.
fn remove_if_present(path: &Path) -> Result<bool, TreeError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(io_err("remove", path)(e)),
    }
}

/// Removes whatever sits at `path` without following symlinks.
fn purge_entry(path: &Path) -> Result<bool, TreeError> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => {
            fs::remove_dir_all(path).map_err(io_err("remove", path))?;
            Ok(true)
        }
        Ok(_) => remove_if_present(path),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(io_err("stat", path)(e)),
    }
}

fn move_if_present(src: &Path, dst: &Path) -> Result<bool, TreeError> {
    match fs::rename(src, dst) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(io_err("move", src)(e)),
    }
}
