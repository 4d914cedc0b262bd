//! Filesystem-backed job store.
//!
//! The store is a single flat directory. A job exists exactly as long as its
//! file does; there is no index. Removal is idempotent: a missing file counts
//! as removed, and other failures are logged and swallowed.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::job::Job;

/// Counters from one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Regular files inspected.
    pub scanned: usize,
    /// Files older than the threshold that were deleted.
    pub removed: usize,
    /// Entries whose metadata could not be read.
    pub skipped: usize,
}

/// Handle to the store directory. Cheap to clone.
#[derive(Debug, Clone)]
pub struct JobStore {
    root: Arc<PathBuf>,
}

impl JobStore {
    /// Opens the store at `root`, creating the directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        let root = tokio::fs::canonicalize(&root).await?;
        info!(root = %root.display(), "job store ready");
        Ok(Self { root: Arc::new(root) })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final location of `job`'s file.
    pub fn path_for(&self, job: &Job) -> PathBuf {
        self.root.join(job.filename())
    }

    /// Location of `job`'s file without extension; the extractor appends it.
    pub fn stem_path(&self, job: &Job) -> PathBuf {
        self.root.join(job.stem())
    }

    /// Looks up a stored file by name.
    ///
    /// Returns `None` for names that are not a single plain path component,
    /// and for names with no regular file behind them.
    pub async fn resolve(&self, filename: &str) -> Option<PathBuf> {
        if !is_plain_file_name(filename) {
            debug!(filename, "rejected non-plain store filename");
            return None;
        }
        let path = self.root.join(filename);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(path),
            _ => None,
        }
    }

    /// Deletes `path`. Returns `true` if this call removed the file.
    pub async fn remove(&self, path: &Path) -> bool {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                debug!(path = %path.display(), "removed job file");
                true
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to remove job file");
                false
            }
        }
    }

    /// Deletes `path` after `delay` on a background task.
    pub fn schedule_removal(&self, path: PathBuf, delay: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            store.remove(&path).await;
        })
    }

    /// Returns a guard that schedules removal of `path` when dropped.
    pub fn removal_guard(&self, path: PathBuf, delay: Duration) -> RemovalGuard {
        RemovalGuard {
            store: self.clone(),
            path: Some(path),
            delay,
        }
    }

    /// Deletes every regular file whose mtime is more than `max_age` ago.
    pub async fn sweep(&self, max_age: Duration) -> SweepReport {
        self.sweep_at(SystemTime::now(), max_age).await
    }

    /// [`JobStore::sweep`] against an explicit clock reading.
    pub async fn sweep_at(&self, now: SystemTime, max_age: Duration) -> SweepReport {
        let mut report = SweepReport::default();

        let mut entries = match tokio::fs::read_dir(self.root.as_path()).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(root = %self.root.display(), error = %e, "cannot list job store");
                return report;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "job store listing interrupted");
                    break;
                }
            };

            let modified = match entry.metadata().await {
                Ok(meta) if !meta.is_file() => continue,
                Ok(meta) => meta.modified(),
                Err(e) => Err(e),
            };
            report.scanned += 1;

            let modified = match modified {
                Ok(t) => t,
                Err(e) => {
                    debug!(path = %entry.path().display(), error = %e, "skipping unreadable entry");
                    report.skipped += 1;
                    continue;
                }
            };

            // An mtime in the future counts as age zero.
            let age = now.duration_since(modified).unwrap_or_default();
            if age > max_age && self.remove(&entry.path()).await {
                report.removed += 1;
            }
        }

        report
    }
}

/// Schedules removal of a stored file when dropped.
///
/// Carried inside a response body stream so the file is cleaned up once the
/// transfer finishes, whether it completed or the client went away.
#[derive(Debug)]
pub struct RemovalGuard {
    store: JobStore,
    path: Option<PathBuf>,
    delay: Duration,
}

impl RemovalGuard {
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Drop for RemovalGuard {
    fn drop(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(_) => {
                self.store.schedule_removal(path, self.delay);
            }
            // Outside a runtime the sweeper picks the file up later.
            Err(_) => warn!(path = %path.display(), "no runtime to schedule removal"),
        }
    }
}

fn is_plain_file_name(name: &str) -> bool {
    if name.is_empty() || name.contains(['/', '\\', '\0']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
