//! Multi-process batch collector
//!
//! Per-file integrations (editor plugins, watch scripts) tend to fire one
//! process per spreadsheet, even when a user drops twenty files at once.
//! Submitting twenty single-file batches wastes credits and rate budget, so
//! simultaneous invocations coordinate through a shared on-disk queue: every
//! invocation appends its file, waits a settle delay for stragglers, then
//! tries to claim the whole queue. Exactly one claimant wins and submits the
//! merged batch; the rest observe an empty queue and exit.
//!
//! All queue access happens under a named lock file so the append and claim
//! steps are atomic across processes. Locks held by crashed processes are
//! taken over once they exceed a staleness age.


use crate::error::{CollectorError, Result};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const QUEUE_FILE_NAME: &str = "pending-files.txt";
const LOCK_FILE_NAME: &str = "queue.lock";

/// Collector behavior knobs
#[derive(Clone, Debug)]
pub struct CollectorConfig {
    /// Directory holding the queue and lock files, shared by all processes
    pub queue_dir: PathBuf,

    /// How long to wait after appending before attempting to claim,
    /// giving sibling invocations time to append too (default: 2s)
    pub settle_delay: Duration,

    /// Total budget for acquiring the lock (default: 10s)
    pub lock_timeout: Duration,

    /// Delay between lock acquisition attempts (default: 50ms)
    pub lock_retry_interval: Duration,

    /// Age after which a held lock is considered abandoned (default: 30s)
    pub stale_lock_age: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            queue_dir: std::env::temp_dir().join("rentroll-batch-queue"),
            settle_delay: Duration::from_secs(2),
            lock_timeout: Duration::from_secs(10),
            lock_retry_interval: Duration::from_millis(50),
            stale_lock_age: Duration::from_secs(30),
        }
    }
}

/// Result of attempting to claim the queue
#[derive(Debug, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// This invocation won; it now owns every queued file
    Claimed(Vec<PathBuf>),
    /// A sibling already claimed the queue; nothing left to do
    Empty,
}

/// Coordinates simultaneous single-file invocations into one batch
#[derive(Clone, Debug)]
pub struct BatchCollector {
    config: CollectorConfig,
}

impl BatchCollector {
    /// Create a collector over the configured queue directory
    pub fn new(config: CollectorConfig) -> Self {
        Self { config }
    }

    /// A collector with default timings over the given queue directory
    pub fn with_queue_dir(queue_dir: impl Into<PathBuf>) -> Self {
        Self::new(CollectorConfig {
            queue_dir: queue_dir.into(),
            ..Default::default()
        })
    }

    fn queue_path(&self) -> PathBuf {
        self.config.queue_dir.join(QUEUE_FILE_NAME)
    }

    fn lock_path(&self) -> PathBuf {
        self.config.queue_dir.join(LOCK_FILE_NAME)
    }

    /// Append one file, wait for stragglers, then try to claim the queue
    ///
    /// This is the whole collector protocol for a single invocation. At most
    /// one of the simultaneous callers receives [`ClaimOutcome::Claimed`]
    /// with every queued file; the others receive [`ClaimOutcome::Empty`].
    pub async fn collect(&self, file: &Path) -> Result<ClaimOutcome> {
        self.append(file).await?;
        tokio::time::sleep(self.config.settle_delay).await;
        self.claim().await
    }

    /// Append a file path to the shared queue
    pub async fn append(&self, file: &Path) -> Result<()> {
        let lock = self.acquire_lock().await?;

        // Store absolute paths; the claimant may run in a different cwd
        let absolute = std::path::absolute(file).map_err(|e| queue_io(file, e))?;

        let queue_path = self.queue_path();
        let mut handle = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&queue_path)
            .map_err(|e| queue_io(&queue_path, e))?;
        use std::io::Write;
        writeln!(handle, "{}", absolute.display()).map_err(|e| queue_io(&queue_path, e))?;

        debug!(file = ?absolute, "appended to collector queue");
        drop(lock);
        Ok(())
    }

    /// Atomically take every queued file, leaving the queue empty
    ///
    /// The queue file is renamed away before it is read. Rename is atomic,
    /// so even if two claimants ever raced past the lock, at most one can
    /// win the rename; the other observes an empty queue. A claimant that
    /// wins can never leave a partially consumed queue behind.
    pub async fn claim(&self) -> Result<ClaimOutcome> {
        let lock = self.acquire_lock().await?;

        let queue_path = self.queue_path();
        let claimed_path = self
            .config
            .queue_dir
            .join(format!("{QUEUE_FILE_NAME}.claim-{}", unique_suffix()));
        match std::fs::rename(&queue_path, &claimed_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                drop(lock);
                return Ok(ClaimOutcome::Empty);
            }
            Err(e) => return Err(queue_io(&queue_path, e).into()),
        }

        let contents =
            std::fs::read_to_string(&claimed_path).map_err(|e| queue_io(&claimed_path, e))?;

        let mut files = Vec::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let path = PathBuf::from(line);
            if !files.contains(&path) {
                files.push(path);
            }
        }

        std::fs::remove_file(&claimed_path).map_err(|e| queue_io(&claimed_path, e))?;
        drop(lock);

        if files.is_empty() {
            return Ok(ClaimOutcome::Empty);
        }
        info!(files = files.len(), "claimed collector queue");
        Ok(ClaimOutcome::Claimed(files))
    }

    /// Acquire the named lock, taking over stale locks from dead processes
    async fn acquire_lock(&self) -> Result<LockGuard> {
        let lock_path = self.lock_path();
        std::fs::create_dir_all(&self.config.queue_dir)
            .map_err(|e| queue_io(&self.config.queue_dir, e))?;

        let started = Instant::now();
        loop {
            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&lock_path)
            {
                Ok(_) => return Ok(LockGuard { path: lock_path }),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if self.lock_is_stale(&lock_path) {
                        self.take_over_stale_lock(&lock_path);
                        continue;
                    }
                }
                Err(e) => return Err(queue_io(&lock_path, e).into()),
            }

            if started.elapsed() >= self.config.lock_timeout {
                return Err(CollectorError::LockTimeout {
                    lock_path,
                    waited_ms: started.elapsed().as_millis() as u64,
                }
                .into());
            }
            tokio::time::sleep(self.config.lock_retry_interval).await;
        }
    }

    /// Take over an abandoned lock without ever deleting a live one
    ///
    /// The lock is never removed in place: the path may have been re-created
    /// by a fresh acquirer between the staleness check and the removal, and
    /// deleting that would let two processes into the critical section.
    /// Instead the file is renamed to a unique name, so at most one waiter
    /// wins the takeover, and only the winner deletes, after re-checking
    /// that the file it now exclusively owns really was stale. A fresh lock
    /// grabbed by mistake is put back via an exclusive hard link, which
    /// cannot displace a lock acquired in the meantime.
    fn take_over_stale_lock(&self, lock_path: &Path) {
        let reclaimed = self
            .config
            .queue_dir
            .join(format!("{LOCK_FILE_NAME}.takeover-{}", unique_suffix()));

        if std::fs::rename(lock_path, &reclaimed).is_err() {
            // Another waiter won the takeover, or the holder released
            return;
        }

        if self.lock_is_stale(&reclaimed) {
            warn!(lock = ?lock_path, "taking over stale collector lock");
            let _ = std::fs::remove_file(&reclaimed);
            return;
        }

        let _ = std::fs::hard_link(&reclaimed, lock_path);
        let _ = std::fs::remove_file(&reclaimed);
    }

    fn lock_is_stale(&self, lock_path: &Path) -> bool {
        std::fs::metadata(lock_path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .map(|age| age >= self.config.stale_lock_age)
            .unwrap_or(false)
    }
}

fn unique_suffix() -> String {
    format!("{}-{:x}", std::process::id(), rand::random::<u64>())
}

fn queue_io(path: &Path, source: std::io::Error) -> CollectorError {
    CollectorError::QueueIo {
        path: path.to_path_buf(),
        source,
    }
}

/// Removes the lock file when dropped
struct LockGuard {
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(lock = ?self.path, error = %e, "failed to release collector lock");
        }
    }
}
