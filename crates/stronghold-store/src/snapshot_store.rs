//! Timestamped JSON snapshots with an atomically swapped `latest` marker.
//!
//! Layout under the data directory:
//!
//! ```text
//! <data_dir>/
//!   latest -> snapshots/snapshot_20250101T120000.000Z.json
//!   snapshots/
//!     snapshot_20250101T115900.000Z.json
//!     snapshot_20250101T120000.000Z.json
//! ```
//!
//! On Unix the marker is a relative symbolic link. Elsewhere it is a small
//! file holding the same relative path.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use stronghold_core::config::StorageConfig;
use stronghold_core::runner::SnapshotSink;
use stronghold_world::World;
use tracing::{debug, error, info, warn};

use crate::error::{StoreError, io};

const SNAPSHOT_DIR: &str = "snapshots";
const MARKER: &str = "latest";
const MARKER_TMP: &str = ".latest.tmp";
const PREFIX: &str = "snapshot_";
const SUFFIX: &str = ".json";

/// Reads and writes world snapshots under one data directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    data_dir: PathBuf,
    retention: usize,
    max_snapshot_bytes: u64,
}

impl SnapshotStore {
    /// Create a store rooted at `data_dir`. Nothing is touched on disk
    /// until the first save.
    pub fn new(data_dir: impl Into<PathBuf>, retention: usize, max_snapshot_bytes: u64) -> Self {
        Self {
            data_dir: data_dir.into(),
            retention,
            max_snapshot_bytes,
        }
    }

    /// Create a store from the `storage` config section.
    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(
            config.data_dir.clone(),
            config.retention,
            config.max_snapshot_bytes,
        )
    }

    /// Root data directory.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Directory holding the snapshot files.
    pub fn snapshot_dir(&self) -> PathBuf {
        self.data_dir.join(SNAPSHOT_DIR)
    }

    /// Location of the `latest` marker.
    pub fn marker_path(&self) -> PathBuf {
        self.data_dir.join(MARKER)
    }

    // =========================================================================
    // Save
    // =========================================================================

    /// Serialize the world as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] if encoding fails, or
    /// [`StoreError::TooLarge`] if the result exceeds the size limit.
    pub fn encode(&self, world: &World) -> Result<Vec<u8>, StoreError> {
        let bytes = serde_json::to_vec_pretty(world)?;
        self.check_size(&bytes)?;
        Ok(bytes)
    }

    /// Durably write encoded bytes as a new snapshot, repoint the marker
    /// at it, then prune old snapshots. Returns the new snapshot's path.
    ///
    /// If any step before the marker swap fails the marker still names
    /// the previous snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TooLarge`] without touching the disk if the
    /// bytes exceed the size limit, or [`StoreError::Io`] if creating,
    /// writing, syncing or renaming a file fails.
    pub fn write_encoded(&self, bytes: &[u8]) -> Result<PathBuf, StoreError> {
        self.check_size(bytes)?;

        let dir = self.snapshot_dir();
        fs::create_dir_all(&dir).map_err(io("create directory", &dir))?;

        let mut temp = tempfile::Builder::new()
            .prefix(".snapshot-")
            .suffix(".tmp")
            .tempfile_in(&dir)
            .map_err(io("create temporary file in", &dir))?;
        let temp_path = temp.path().to_path_buf();
        temp.write_all(bytes).map_err(io("write", &temp_path))?;
        temp.as_file().sync_all().map_err(io("sync", &temp_path))?;

        let (name, target) = next_snapshot_path(&dir);
        temp.persist(&target).map_err(|e| StoreError::Io {
            op: "rename",
            path: target.clone(),
            source: e.error,
        })?;
        sync_dir(&dir);

        self.point_marker_at(&name)?;
        info!(file = %name, bytes = bytes.len(), "snapshot saved");

        self.rotate();
        Ok(target)
    }

    /// Encode and write in one step.
    ///
    /// # Errors
    ///
    /// See [`encode`](Self::encode) and [`write_encoded`](Self::write_encoded).
    pub fn save(&self, world: &World) -> Result<PathBuf, StoreError> {
        let bytes = self.encode(world)?;
        self.write_encoded(&bytes)
    }

    fn check_size(&self, bytes: &[u8]) -> Result<(), StoreError> {
        let size = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        if size > self.max_snapshot_bytes {
            return Err(StoreError::TooLarge {
                size,
                limit: self.max_snapshot_bytes,
            });
        }
        Ok(())
    }

    fn point_marker_at(&self, name: &str) -> Result<(), StoreError> {
        let relative = Path::new(SNAPSHOT_DIR).join(name);
        let temp = self.data_dir.join(MARKER_TMP);
        let marker = self.marker_path();

        match fs::remove_file(&temp) {
            Ok(()) => debug!(path = %temp.display(), "removed stale marker"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(io("remove", &temp)(e)),
        }
        write_marker(&temp, &relative).map_err(io("create marker", &temp))?;
        fs::rename(&temp, &marker).map_err(io("rename marker", &marker))?;
        sync_dir(&self.data_dir);
        Ok(())
    }

    // =========================================================================
    // Restore
    // =========================================================================

    /// Path of the snapshot the marker names, or `None` if there is no
    /// marker yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the marker exists but cannot be read.
    pub fn latest_path(&self) -> Result<Option<PathBuf>, StoreError> {
        let marker = self.marker_path();
        let meta = match fs::symlink_metadata(&marker) {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io("inspect", &marker)(e)),
        };

        let relative = if meta.file_type().is_symlink() {
            fs::read_link(&marker).map_err(io("read link", &marker))?
        } else {
            let contents = fs::read_to_string(&marker).map_err(io("read", &marker))?;
            PathBuf::from(contents.trim())
        };
        Ok(Some(self.data_dir.join(relative)))
    }

    /// Restore the world from the snapshot the marker names. With no
    /// marker, returns a fresh empty world.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the snapshot cannot be read,
    /// [`StoreError::Serialization`] if it is not a valid world, or
    /// [`StoreError::Corrupt`] if it decodes but breaks world invariants.
    pub fn load_latest(&self) -> Result<World, StoreError> {
        let Some(path) = self.latest_path()? else {
            info!(
                data_dir = %self.data_dir.display(),
                "no snapshot found, starting with an empty world"
            );
            return Ok(World::new());
        };

        let bytes = fs::read(&path).map_err(io("read", &path))?;
        let world: World = serde_json::from_slice(&bytes)?;

        let violations = world.validate();
        if !violations.is_empty() {
            for violation in &violations {
                error!(path = %path.display(), %violation, "snapshot invariant violated");
            }
            return Err(StoreError::Corrupt { path, violations });
        }

        info!(
            path = %path.display(),
            users = world.user_count(),
            cities = world.city_count(),
            "world restored from snapshot"
        );
        Ok(world)
    }

    // =========================================================================
    // Retention
    // =========================================================================

    /// Snapshot file names, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the snapshot directory exists but
    /// cannot be listed.
    pub fn list_snapshots(&self) -> Result<Vec<String>, StoreError> {
        let dir = self.snapshot_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io("list", &dir)(e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(io("list", &dir))?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let is_file = entry.file_type().is_ok_and(|kind| kind.is_file());
            if is_file && name.starts_with(PREFIX) && name.ends_with(SUFFIX) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Delete the oldest snapshots beyond the retention count. Deletion
    /// failures are logged and skipped. Returns how many were deleted.
    ///
    /// At least one snapshot is always kept, even with a retention of
    /// zero. The file the marker names is never deleted, even when a
    /// clock step makes it sort before older files.
    pub fn rotate(&self) -> usize {
        let names = match self.list_snapshots() {
            Ok(names) => names,
            Err(e) => {
                warn!(error = %e, "could not list snapshots for rotation");
                return 0;
            }
        };
        let pinned = match self.latest_path() {
            Ok(path) => path
                .as_deref()
                .and_then(Path::file_name)
                .and_then(std::ffi::OsStr::to_str)
                .map(str::to_owned),
            Err(e) => {
                warn!(error = %e, "could not resolve latest marker, skipping rotation");
                return 0;
            }
        };

        let excess = names.len().saturating_sub(self.retention.max(1));
        let dir = self.snapshot_dir();
        let mut deleted: usize = 0;
        let candidates = names
            .iter()
            .filter(|name| pinned.as_deref() != Some(name.as_str()));
        for name in candidates.take(excess) {
            let path = dir.join(name);
            match fs::remove_file(&path) {
                Ok(()) => {
                    deleted = deleted.saturating_add(1);
                    debug!(file = %name, "old snapshot deleted");
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "could not delete old snapshot");
                }
            }
        }
        deleted
    }
}

impl SnapshotSink for SnapshotStore {
    type Error = StoreError;

    fn encode(&self, world: &World) -> Result<Vec<u8>, StoreError> {
        Self::encode(self, world)
    }

    fn write_encoded(&self, bytes: Vec<u8>) -> Result<PathBuf, StoreError> {
        Self::write_encoded(self, &bytes)
    }
}

/// A fresh, sortable snapshot file name for the current instant.
fn next_snapshot_path(dir: &Path) -> (String, PathBuf) {
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ").to_string();
    snapshot_path_for(dir, &stamp)
}

/// First unused name for `stamp`. Collisions get a zero-padded counter so
/// `_002` still sorts before `_010`.
fn snapshot_path_for(dir: &Path, stamp: &str) -> (String, PathBuf) {
    let mut name = format!("{PREFIX}{stamp}{SUFFIX}");
    let mut suffix: u32 = 1;
    while dir.join(&name).exists() {
        name = format!("{PREFIX}{stamp}_{suffix:03}{SUFFIX}");
        suffix = suffix.saturating_add(1);
    }
    let path = dir.join(&name);
    (name, path)
}

#[cfg(unix)]
fn write_marker(temp: &Path, relative: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(relative, temp)
}

#[cfg(not(unix))]
fn write_marker(temp: &Path, relative: &Path) -> std::io::Result<()> {
    let mut file = File::create(temp)?;
    file.write_all(relative.to_string_lossy().as_bytes())?;
    file.sync_all()
}

#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(e) = File::open(dir).and_then(|handle| handle.sync_all()) {
        debug!(path = %dir.display(), error = %e, "directory sync failed");
    }
}

#[cfg(not(unix))]
const fn sync_dir(_dir: &Path) {}
