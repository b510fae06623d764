//! Répertoire de contrôle et verrou consultatif.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::retry::{Exhausted, RetryPolicy, retry};

#[derive(Debug, Error)]
pub enum DirError {
    #[error("{path} exists and is not a directory")]
    NotADirectory { path: String },
    #[error("could not create dir {path}: {source}")]
    Create { path: String, source: io::Error },
}

/// Ensures `path` exists and is a directory. A pre-existing non-directory
/// at that path is a static fault, never retried.
pub fn ensure_dir(path: &Path) -> Result<(), DirError> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => {
            debug!(path = %path.display(), "dir already exists");
            Ok(())
        }
        Ok(_) => Err(DirError::NotADirectory {
            path: path.display().to_string(),
        }),
        Err(_) => {
            debug!(path = %path.display(), "dir does not exist, creating");
            fs::create_dir_all(path).map_err(|source| DirError::Create {
                path: path.display().to_string(),
                source,
            })
        }
    }
}

#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock {path} is held by another invocation")]
    Held { path: String },
    #[error("cannot create lock {path}: {source}")]
    Io { path: String, source: io::Error },
}

/// Advisory lock file scoped to the control directory. Hotplug events are
/// normally serialized by the event source; the lock catches the overlap
/// case anyway. Released on drop, on every exit path.
#[derive(Debug)]
pub struct LockFile {
    path: PathBuf,
}

impl LockFile {
    /// Single acquisition attempt. The file is created exclusively and
    /// stamped with our pid.
    pub fn try_acquire(path: &Path) -> Result<Self, LockError> {
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                let _ = writeln!(file, "{}", std::process::id());
                debug!(path = %path.display(), "lock acquired");
                Ok(Self {
                    path: path.to_path_buf(),
                })
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Err(LockError::Held {
                path: path.display().to_string(),
            }),
            Err(source) => Err(LockError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    /// Bounded wait on a lock held by a previous invocation still
    /// finishing up.
    pub fn acquire(path: &Path, policy: RetryPolicy) -> Result<Self, Exhausted<LockError>> {
        retry("lock acquire", policy, |_| Self::try_acquire(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %err, "failed to remove lock file");
        }
    }
}
