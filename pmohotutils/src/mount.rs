//! Attente d'un point de montage dans la table des montages.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::retry::{Exhausted, RetryPolicy, retry};

/// Live mount table of the running system.
pub const PROC_MOUNTS: &str = "/proc/mounts";

#[derive(Debug, Error)]
pub enum MountError {
    #[error("cannot read mount table {path}: {source}")]
    Table { path: String, source: io::Error },
    #[error("{0} is not mounted")]
    NotMounted(String),
    #[error("device path {0:?} has no final component")]
    BadDevicePath(String),
}

/// Read-only view over a mounts file in `/proc/mounts` format. The table
/// is re-read in full on every poll; mounts can appear and disappear
/// between two polls.
#[derive(Debug, Clone)]
pub struct MountTable {
    path: PathBuf,
}

impl Default for MountTable {
    fn default() -> Self {
        Self::new(PROC_MOUNTS)
    }
}

impl MountTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reports whether `target` is currently a mount point. The match is
    /// an exact string comparison on the mount-point field: a mount at
    /// `/media/sda11` never satisfies a check for `/media/sda1`.
    pub fn is_mounted(&self, target: &Path) -> Result<bool, MountError> {
        let contents = fs::read_to_string(&self.path).map_err(|source| MountError::Table {
            path: self.path.display().to_string(),
            source,
        })?;
        Ok(table_contains(&contents, target))
    }

    /// Polls the table until `target` shows up as a mount point.
    pub fn wait_for_mount(
        &self,
        target: &Path,
        policy: RetryPolicy,
    ) -> Result<(), Exhausted<MountError>> {
        debug!(target = %target.display(), table = %self.path.display(), "waiting for mount");
        retry("mount wait", policy, |_| {
            if self.is_mounted(target)? {
                Ok(())
            } else {
                Err(MountError::NotMounted(target.display().to_string()))
            }
        })
    }
}

// Une ligne typique :
// /dev/sda1 /media/sda1 vfat rw,relatime,fmask=0022 0 0
fn table_contains(contents: &str, target: &Path) -> bool {
    let needle = target.to_string_lossy();
    contents
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .any(|mount_point| mount_point == needle.as_ref())
}

/// Maps a hotplug device path to its expected mount point: the last path
/// segment joined under `mount_root`, e.g.
/// `/devices/.../block/sda/sda1` + `/media` → `/media/sda1`.
pub fn mount_point_for(device_path: &str, mount_root: &Path) -> Result<PathBuf, MountError> {
    let name = Path::new(device_path)
        .file_name()
        .ok_or_else(|| MountError::BadDevicePath(device_path.to_string()))?;
    Ok(mount_root.join(name))
}
