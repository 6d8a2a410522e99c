//! Scoped file backups with automatic rollback.
//!
//! Every destructive write goes through [`BackupManager::with_backup`]: the
//! file is copied into the backup directory, the caller's work runs, and if
//! the work fails the copy is written back over the original before the
//! error is handed to the caller. Backups survive success as an audit trail
//! and are garbage-collected by age with [`BackupManager::prune`].

use crate::error::{Result, SeoError};
use crate::io;
use crate::paths;
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

// ---------------------------------------------------------------------------
// BackupEntry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct BackupEntry {
    pub path: PathBuf,
    /// Original absolute path recorded in the `.meta` sidecar.
    pub original: Option<PathBuf>,
    pub created: DateTime<Utc>,
    pub size: u64,
}

// ---------------------------------------------------------------------------
// Scoped
// ---------------------------------------------------------------------------

/// Result of a backup-scoped unit of work.
#[derive(Debug)]
pub struct Scoped<T> {
    pub backup: PathBuf,
    pub outcome: Result<T>,
    /// True when the work failed and the original bytes were put back.
    pub rolled_back: bool,
}

// ---------------------------------------------------------------------------
// BackupManager
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct BackupManager {
    dir: PathBuf,
    in_flight: Mutex<HashSet<PathBuf>>,
}

impl BackupManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy `path` into the backup directory and record its absolute origin.
    pub fn backup(&self, path: &Path) -> Result<PathBuf> {
        if !path.is_file() {
            return Err(SeoError::SourceNotFound(path.to_path_buf()));
        }
        io::ensure_dir(&self.dir)?;

        let original = std::fs::canonicalize(path)?;
        let backup = self.unique_name(path);
        std::fs::copy(path, &backup)?;
        io::atomic_write(
            &paths::backup_meta_path(&backup),
            original.to_string_lossy().as_bytes(),
        )?;

        tracing::debug!(
            source = %original.display(),
            backup = %backup.display(),
            "backup created"
        );
        Ok(backup)
    }

    /// Write a backup's bytes back. Without `target` the original path is
    /// read from the sidecar.
    pub fn restore(&self, backup: &Path, target: Option<&Path>) -> Result<PathBuf> {
        if !backup.is_file() {
            return Err(SeoError::BackupNotFound(backup.to_path_buf()));
        }
        let target = match target {
            Some(t) => t.to_path_buf(),
            None => read_original(backup)?
                .ok_or_else(|| SeoError::BackupMetaMissing(backup.to_path_buf()))?,
        };

        let data = std::fs::read(backup)?;
        io::atomic_write(&target, &data)?;
        tracing::info!(
            backup = %backup.display(),
            target = %target.display(),
            "backup restored"
        );
        Ok(target)
    }

    /// Back up `path`, run `work`, and restore the backup if `work` fails.
    ///
    /// An `Err` from this function means the backup itself could not be
    /// taken and `work` never ran. Errors from `work` come back in
    /// [`Scoped::outcome`] after the rollback has happened. The backup file
    /// is never deleted here.
    pub fn with_backup<T, F>(&self, path: &Path, work: F) -> Result<Scoped<T>>
    where
        F: FnOnce(&Path) -> Result<T>,
    {
        let backup = self.backup(path)?;
        self.lock_in_flight().insert(backup.clone());

        let outcome = work(&backup);
        let mut rolled_back = false;
        if let Err(e) = &outcome {
            tracing::warn!(file = %path.display(), error = %e, "rolling back");
            match self.restore(&backup, Some(path)) {
                Ok(_) => rolled_back = true,
                Err(restore_err) => tracing::error!(
                    file = %path.display(),
                    backup = %backup.display(),
                    error = %restore_err,
                    "rollback failed"
                ),
            }
        }

        self.lock_in_flight().remove(&backup);
        Ok(Scoped {
            backup,
            outcome,
            rolled_back,
        })
    }

    /// Backups in the directory, newest first.
    pub fn list(&self) -> Result<Vec<BackupEntry>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if is_sidecar(&path) || !path.is_file() {
                continue;
            }
            let meta = entry.metadata()?;
            entries.push(BackupEntry {
                original: read_original(&path)?,
                created: meta.modified()?.into(),
                size: meta.len(),
                path,
            });
        }
        entries.sort_by(|a, b| b.created.cmp(&a.created).then(b.path.cmp(&a.path)));
        Ok(entries)
    }

    /// Delete backups (and their sidecars) older than `max_age`.
    /// Backups held by a running [`with_backup`](Self::with_backup) are kept.
    pub fn prune(&self, max_age: Duration) -> Result<usize> {
        if !self.dir.is_dir() {
            return Ok(0);
        }
        let cutoff = SystemTime::now()
            .checked_sub(max_age)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let in_flight = self.lock_in_flight().clone();

        let mut removed = 0;
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if is_sidecar(&path) || !path.is_file() || in_flight.contains(&path) {
                continue;
            }
            let modified = std::fs::metadata(&path)?.modified()?;
            if modified >= cutoff {
                continue;
            }
            std::fs::remove_file(&path)?;
            let sidecar = paths::backup_meta_path(&path);
            if sidecar.exists() {
                std::fs::remove_file(&sidecar)?;
            }
            tracing::debug!(backup = %path.display(), "backup pruned");
            removed += 1;
        }
        if removed > 0 {
            tracing::info!(removed, dir = %self.dir.display(), "old backups pruned");
        }
        Ok(removed)
    }

    fn unique_name(&self, path: &Path) -> PathBuf {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        let stamp = Local::now().format("%Y%m%d_%H%M%S_%6f");

        // Neither the name nor its sidecar slot may be taken.
        let free = |p: &Path| !p.exists() && !paths::backup_meta_path(p).exists();

        let candidate = self.dir.join(format!("{stamp}_{filename}"));
        if free(&candidate) {
            return candidate;
        }
        let mut n = 1u32;
        loop {
            let candidate = self.dir.join(format!("{stamp}_{n}_{filename}"));
            if free(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A sidecar is `<backup>.meta` whose backup file exists. A backup of a
/// file that is itself named `*.meta` has no such companion.
fn is_sidecar(path: &Path) -> bool {
    path.to_string_lossy()
        .strip_suffix(paths::BACKUP_META_SUFFIX)
        .is_some_and(|companion| Path::new(companion).is_file())
}

fn read_original(backup: &Path) -> Result<Option<PathBuf>> {
    let sidecar = paths::backup_meta_path(backup);
    if !sidecar.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(sidecar)?;
    let raw = raw.trim();
    Ok((!raw.is_empty()).then(|| PathBuf::from(raw)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn setup() -> (TempDir, BackupManager, PathBuf) {
        let dir = TempDir::new().unwrap();
        let mgr = BackupManager::new(dir.path().join("backups"));
        let file = dir.path().join("layout.tsx");
        std::fs::write(&file, "export const metadata = { title: \"Old\" };\n").unwrap();
        (dir, mgr, file)
    }

    #[test]
    fn backup_missing_source() {
        let (dir, mgr, _) = setup();
        let err = mgr.backup(&dir.path().join("nope.tsx")).unwrap_err();
        assert!(matches!(err, SeoError::SourceNotFound(_)));
    }

    #[test]
    fn backup_then_restore_reproduces_bytes() {
        let (_dir, mgr, file) = setup();
        let original = std::fs::read(&file).unwrap();

        let backup = mgr.backup(&file).unwrap();
        assert!(backup.file_name().unwrap().to_string_lossy().ends_with("_layout.tsx"));
        assert!(paths::backup_meta_path(&backup).exists());

        std::fs::write(&file, "garbage").unwrap();
        let restored = mgr.restore(&backup, None).unwrap();
        assert_eq!(
            std::fs::canonicalize(&restored).unwrap(),
            std::fs::canonicalize(&file).unwrap()
        );
        assert_eq!(std::fs::read(&file).unwrap(), original);
    }

    #[test]
    fn restore_to_explicit_target() {
        let (dir, mgr, file) = setup();
        let backup = mgr.backup(&file).unwrap();
        let other = dir.path().join("copy.tsx");
        mgr.restore(&backup, Some(&other)).unwrap();
        assert_eq!(
            std::fs::read(&other).unwrap(),
            std::fs::read(&file).unwrap()
        );
    }

    #[test]
    fn restore_missing_backup() {
        let (dir, mgr, _) = setup();
        let err = mgr.restore(&dir.path().join("backups/x"), None).unwrap_err();
        assert!(matches!(err, SeoError::BackupNotFound(_)));
    }

    #[test]
    fn restore_without_sidecar_needs_target() {
        let (_dir, mgr, file) = setup();
        let backup = mgr.backup(&file).unwrap();
        std::fs::remove_file(paths::backup_meta_path(&backup)).unwrap();
        let err = mgr.restore(&backup, None).unwrap_err();
        assert!(matches!(err, SeoError::BackupMetaMissing(_)));
    }

    #[test]
    fn failed_work_rolls_back() {
        let (_dir, mgr, file) = setup();
        let before = std::fs::read(&file).unwrap();

        let scoped = mgr
            .with_backup(&file, |_| -> Result<()> {
                std::fs::write(&file, "half written")?;
                Err(SeoError::NoChange(file.clone()))
            })
            .unwrap();

        assert!(scoped.outcome.is_err());
        assert!(scoped.rolled_back);
        assert_eq!(std::fs::read(&file).unwrap(), before);
        assert!(scoped.backup.exists(), "backup kept as artifact");
    }

    #[test]
    fn successful_work_keeps_backup() {
        let (_dir, mgr, file) = setup();
        let scoped = mgr
            .with_backup(&file, |_| {
                std::fs::write(&file, "new")?;
                Ok(42)
            })
            .unwrap();
        assert_eq!(scoped.outcome.unwrap(), 42);
        assert!(!scoped.rolled_back);
        assert!(scoped.backup.exists());
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "new");
    }

    #[test]
    fn backups_in_same_instant_do_not_collide() {
        let (_dir, mgr, file) = setup();
        let a = mgr.backup(&file).unwrap();
        let b = mgr.backup(&file).unwrap();
        assert_ne!(a, b);
        assert_eq!(mgr.list().unwrap().len(), 2);
    }

    #[test]
    fn list_reads_sidecars() {
        let (_dir, mgr, file) = setup();
        mgr.backup(&file).unwrap();
        let entries = mgr.list().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].original.as_deref(),
            Some(std::fs::canonicalize(&file).unwrap().as_path())
        );
    }

    #[test]
    fn prune_removes_old_backups_and_sidecars() {
        let (_dir, mgr, file) = setup();
        let old = mgr.backup(&file).unwrap();
        let fresh = mgr.backup(&file).unwrap();

        let ten_days_ago = SystemTime::now() - Duration::from_secs(10 * 86_400);
        File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(ten_days_ago)
            .unwrap();

        let removed = mgr.prune(Duration::from_secs(7 * 86_400)).unwrap();
        assert_eq!(removed, 1);
        assert!(!old.exists());
        assert!(!paths::backup_meta_path(&old).exists());
        assert!(fresh.exists());
    }

    #[test]
    fn prune_skips_in_flight_backup() {
        let (_dir, mgr, file) = setup();
        let scoped = mgr
            .with_backup(&file, |backup| {
                // Everything is older than a zero max age, but this backup is in use.
                let removed = mgr.prune(Duration::ZERO)?;
                assert!(backup.exists());
                Ok(removed)
            })
            .unwrap();
        assert_eq!(scoped.outcome.unwrap(), 0);
    }

    #[test]
    fn backup_of_a_meta_file_is_listed_and_pruned() {
        let (dir, mgr, file) = setup();
        let meta_named = dir.path().join("site.meta");
        std::fs::write(&meta_named, "k=v").unwrap();
        let meta_backup = mgr.backup(&meta_named).unwrap();
        mgr.backup(&file).unwrap();

        let entries = mgr.list().unwrap();
        assert_eq!(entries.len(), 2);
        let listed = entries.iter().find(|e| e.path == meta_backup).unwrap();
        assert_eq!(
            listed.original.as_deref(),
            Some(std::fs::canonicalize(&meta_named).unwrap().as_path())
        );

        let ten_days_ago = SystemTime::now() - Duration::from_secs(10 * 86_400);
        File::options()
            .write(true)
            .open(&meta_backup)
            .unwrap()
            .set_modified(ten_days_ago)
            .unwrap();
        assert_eq!(mgr.prune(Duration::from_secs(7 * 86_400)).unwrap(), 1);
        assert!(!meta_backup.exists());
        assert!(!paths::backup_meta_path(&meta_backup).exists());
        assert_eq!(mgr.list().unwrap().len(), 1);
    }

    #[test]
    fn prune_on_missing_dir_is_noop() {
        let dir = TempDir::new().unwrap();
        let mgr = BackupManager::new(dir.path().join("none"));
        assert_eq!(mgr.prune(Duration::ZERO).unwrap(), 0);
        assert!(mgr.list().unwrap().is_empty());
    }
}
