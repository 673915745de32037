//! Filesystem snapshot store.
//!
//! Implements [`SnapshotStore`] by writing one artifact per export into a
//! storage directory.
//!
//! - Atomic writes: the artifact is written to a `NamedTempFile` in the
//!   same directory, synced, then renamed into place.  Readers never see
//!   a partial file.
//! - Names: `frames_%Y%m%d_%H%M%S.snap` from the newest sample's
//!   timestamp (UTC).  Two exports in the same second get `_1`, `_2`, …
//! - Explicit names are plain file names only; anything that could
//!   escape the storage directory is rejected.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::info;
use tempfile::NamedTempFile;

use crate::app::ports::SnapshotStore;
use crate::error::PersistenceError;
use crate::snapshot::{EXTENSION, Snapshot, SnapshotId};

/// Give up looking for a free name after this many suffixes.
const MAX_COLLISION_SUFFIX: u32 = 10_000;

// ───────────────────────────────────────────────────────────────
// Naming
// ───────────────────────────────────────────────────────────────

/// Hands out artifact names.  Remembers the last generated stem so that
/// back-to-back exports in one second never resolve to the same file,
/// even before the first one reaches the disk.
#[derive(Debug, Default)]
pub struct SnapshotNamer {
    last: Option<(i64, u32)>,
}

impl SnapshotNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// `frames_%Y%m%d_%H%M%S` for `timestamp` (seconds since epoch, UTC).
    pub fn stem(timestamp: i64) -> String {
        let when = chrono::DateTime::from_timestamp(timestamp, 0).unwrap_or_default();
        when.format("frames_%Y%m%d_%H%M%S").to_string()
    }

    /// Validate an operator-supplied name and give it the artifact
    /// extension if it lacks one.
    pub fn explicit(name: &str) -> Result<String, PersistenceError> {
        let name = name.trim();
        if name.is_empty()
            || name.starts_with('.')
            || name.contains(['/', '\\', '\0'])
            || name.contains("..")
        {
            return Err(PersistenceError::InvalidName);
        }
        if Path::new(name).extension().is_some_and(|e| e == EXTENSION) {
            Ok(name.to_owned())
        } else {
            Ok(format!("{name}.{EXTENSION}"))
        }
    }

    /// First free generated path in `dir` for `timestamp`.
    pub fn next_path(&mut self, dir: &Path, timestamp: i64) -> Result<PathBuf, PersistenceError> {
        let stem = Self::stem(timestamp);
        let start = match self.last {
            Some((ts, next)) if ts == timestamp => next,
            _ => 0,
        };
        for n in start..MAX_COLLISION_SUFFIX {
            let file = if n == 0 {
                format!("{stem}.{EXTENSION}")
            } else {
                format!("{stem}_{n}.{EXTENSION}")
            };
            let path = dir.join(file);
            if !path.exists() {
                self.last = Some((timestamp, n + 1));
                return Ok(path);
            }
        }
        Err(PersistenceError::Write(ErrorKind::AlreadyExists))
    }

    /// Resolve the destination for one export.
    pub fn resolve(
        &mut self,
        dir: &Path,
        snapshot: &Snapshot,
        name: Option<&str>,
    ) -> Result<PathBuf, PersistenceError> {
        match name {
            Some(name) => Ok(dir.join(Self::explicit(name)?)),
            None => {
                let ts = snapshot.records().last().map_or(0, |r| r.timestamp);
                self.next_path(dir, ts)
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Writing
// ───────────────────────────────────────────────────────────────

/// Create `dir` (and parents) if missing.
pub fn prepare_dir(dir: impl Into<PathBuf>) -> Result<PathBuf, PersistenceError> {
    let dir = dir.into();
    std::fs::create_dir_all(&dir).map_err(|e| PersistenceError::CreateDir(e.kind()))?;
    Ok(dir)
}

/// Encode `snapshot` and atomically place it at `path`.  An existing file
/// at `path` is replaced.
pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), PersistenceError> {
    let bytes = snapshot.encode()?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| PersistenceError::Write(e.kind()))?;
    tmp.write_all(&bytes)
        .map_err(|e| PersistenceError::Write(e.kind()))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| PersistenceError::Write(e.kind()))?;
    tmp.persist(path)
        .map_err(|e| PersistenceError::Write(e.error.kind()))?;

    info!(
        "Snapshot: wrote {} samples ({} bytes) to {}",
        snapshot.len(),
        bytes.len(),
        path.display()
    );
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// Store
// ───────────────────────────────────────────────────────────────

/// Writes each snapshot inline, on the caller's tick.
pub struct FileSnapshotStore {
    dir: PathBuf,
    namer: SnapshotNamer,
}

impl FileSnapshotStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let dir = prepare_dir(dir)?;
        info!("FileSnapshotStore: writing to {}", dir.display());
        Ok(Self {
            dir,
            namer: SnapshotNamer::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn persist(
        &mut self,
        snapshot: Snapshot,
        name: Option<&str>,
    ) -> Result<SnapshotId, PersistenceError> {
        let path = self.namer.resolve(&self.dir, &snapshot, name)?;
        write_snapshot(&path, &snapshot)?;
        Ok(SnapshotId::new(path))
    }
}
