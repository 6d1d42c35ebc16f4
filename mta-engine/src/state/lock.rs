//! Marker-file lock guarding the state document.
//!
//! The lock is held while a marker file exists. Acquisition creates the marker
//! with `create_new`, so exactly one holder wins. On contention the marker's
//! mtime decides: older than `stale_after` means the holder crashed and the
//! marker is reclaimed, otherwise the acquirer polls until its timeout.
//!
//! Cooperative only: it serializes engine tasks within one deployment, not
//! arbitrary processes touching the same files.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use mta_common::config::LockSettings;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

/// Errors from lock operations.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("Could not acquire state lock {} within {:?}", .path.display(), .waited)]
    Timeout { path: PathBuf, waited: Duration },

    #[error("Lock marker I/O error on {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Lock manager for one marker path
#[derive(Debug, Clone)]
pub struct StateLock {
    marker_path: PathBuf,
    timeout: Duration,
    stale_after: Duration,
    poll_interval: Duration,
}

impl StateLock {
    pub fn new(marker_path: impl Into<PathBuf>, settings: &LockSettings) -> Self {
        Self::with_timings(
            marker_path,
            Duration::from_millis(settings.timeout_ms),
            Duration::from_millis(settings.stale_after_ms),
            Duration::from_millis(settings.poll_interval_ms),
        )
    }

    pub fn with_timings(
        marker_path: impl Into<PathBuf>,
        timeout: Duration,
        stale_after: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            marker_path: marker_path.into(),
            timeout,
            stale_after,
            poll_interval,
        }
    }

    pub fn marker_path(&self) -> &Path {
        &self.marker_path
    }

    /// Acquire with the configured timeout
    pub async fn acquire(&self) -> Result<StateLockGuard, LockError> {
        self.acquire_within(self.timeout).await
    }

    /// Acquire, waiting at most `timeout`.
    ///
    /// The returned guard removes the marker when released or dropped.
    pub async fn acquire_within(&self, timeout: Duration) -> Result<StateLockGuard, LockError> {
        let started = Instant::now();
        let holder_id = format!("{}:{}", std::process::id(), Uuid::new_v4());
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match create_marker(&self.marker_path, &holder_id).await {
                Ok(()) => {
                    debug!(
                        marker = %self.marker_path.display(),
                        attempts,
                        waited_ms = started.elapsed().as_millis() as u64,
                        "Acquired state lock"
                    );
                    return Ok(StateLockGuard {
                        marker_path: self.marker_path.clone(),
                        holder_id,
                        released: false,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    match marker_age(&self.marker_path).await {
                        Ok(Some(age)) if age > self.stale_after => {
                            let observed = match tokio::fs::read_to_string(&self.marker_path).await {
                                Ok(content) => content,
                                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                                Err(source) => {
                                    return Err(LockError::Io {
                                        path: self.marker_path.clone(),
                                        source,
                                    })
                                }
                            };
                            let reclaimed = reclaim_stale(&self.marker_path, &observed)
                                .await
                                .map_err(|source| LockError::Io {
                                    path: self.marker_path.clone(),
                                    source,
                                })?;
                            if reclaimed {
                                warn!(
                                    marker = %self.marker_path.display(),
                                    age_ms = age.as_millis() as u64,
                                    "Reclaimed stale state lock"
                                );
                                continue;
                            }
                        }
                        // Released between our create attempt and the stat
                        Ok(None) => continue,
                        Ok(Some(_)) => {}
                        Err(source) => {
                            return Err(LockError::Io {
                                path: self.marker_path.clone(),
                                source,
                            })
                        }
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    // Data folder does not exist yet
                    let parent = self.marker_path.parent().unwrap_or(Path::new("."));
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|source| LockError::Io {
                            path: self.marker_path.clone(),
                            source,
                        })?;
                    continue;
                }
                Err(source) => {
                    return Err(LockError::Io {
                        path: self.marker_path.clone(),
                        source,
                    })
                }
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                warn!(
                    marker = %self.marker_path.display(),
                    attempts,
                    "Timed out waiting for state lock"
                );
                return Err(LockError::Timeout {
                    path: self.marker_path.clone(),
                    waited: elapsed,
                });
            }
            tokio::time::sleep(self.poll_interval.min(timeout - elapsed)).await;
        }
    }

    /// Remove the marker regardless of holder. Idempotent.
    pub async fn release(&self) -> Result<(), LockError> {
        remove_marker(&self.marker_path)
            .await
            .map_err(|source| LockError::Io {
                path: self.marker_path.clone(),
                source,
            })
    }

    /// Whether a marker currently exists
    pub async fn is_held(&self) -> bool {
        tokio::fs::try_exists(&self.marker_path).await.unwrap_or(false)
    }
}

/// Scoped ownership of the state lock.
///
/// The marker is removed on [`StateLockGuard::release`] or, failing that, on
/// drop, so every exit path (including `?` and panics) gives the lock back.
#[derive(Debug)]
pub struct StateLockGuard {
    marker_path: PathBuf,
    holder_id: String,
    released: bool,
}

impl StateLockGuard {
    pub fn holder_id(&self) -> &str {
        &self.holder_id
    }

    /// Release explicitly. Only removes the marker if this guard still owns it.
    pub async fn release(mut self) -> Result<(), LockError> {
        self.released = true;
        match tokio::fs::read_to_string(&self.marker_path).await {
            Ok(content) if content == self.holder_id => remove_marker(&self.marker_path)
                .await
                .map_err(|source| LockError::Io {
                    path: self.marker_path.clone(),
                    source,
                }),
            Ok(_) => {
                warn!(
                    marker = %self.marker_path.display(),
                    "State lock was reclaimed by another holder; leaving its marker"
                );
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(LockError::Io {
                path: self.marker_path.clone(),
                source,
            }),
        }
    }
}

impl Drop for StateLockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::read_to_string(&self.marker_path) {
            Ok(content) if content == self.holder_id => {
                if let Err(e) = std::fs::remove_file(&self.marker_path) {
                    if e.kind() != io::ErrorKind::NotFound {
                        warn!("Failed to remove state lock {}: {}", self.marker_path.display(), e);
                    }
                }
            }
            Ok(_) => debug!("State lock reclaimed by another holder before drop"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to read state lock {}: {}", self.marker_path.display(), e),
        }
    }
}

async fn create_marker(path: &Path, holder_id: &str) -> io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    let written = async {
        file.write_all(holder_id.as_bytes()).await?;
        file.flush().await
    }
    .await;
    if let Err(e) = written {
        drop(file);
        let _ = tokio::fs::remove_file(path).await;
        return Err(e);
    }
    Ok(())
}

/// Age of the marker by mtime; `None` when it does not exist
async fn marker_age(path: &Path) -> io::Result<Option<Duration>> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => {
            let modified = meta.modified()?;
            Ok(Some(
                SystemTime::now()
                    .duration_since(modified)
                    .unwrap_or(Duration::ZERO),
            ))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Remove the marker only if it still holds `observed`.
///
/// The marker is first renamed to a unique tombstone, so of several waiters
/// that saw the same stale marker only one can take it. A waiter that ends up
/// with someone else's fresh marker links it back in place and reports false.
async fn reclaim_stale(path: &Path, observed: &str) -> io::Result<bool> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "lock".to_string());
    let tombstone = path
        .parent()
        .unwrap_or(Path::new("."))
        .join(format!(".{}.{}.stale", name, Uuid::new_v4().simple()));

    match tokio::fs::rename(path, &tombstone).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    }

    let taken = tokio::fs::read_to_string(&tombstone).await?;
    if taken == observed {
        remove_marker(&tombstone).await?;
        return Ok(true);
    }

    match tokio::fs::hard_link(&tombstone, path).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            warn!(marker = %path.display(), "State lock changed hands while reclaiming a stale marker");
        }
        Err(e) => {
            let _ = tokio::fs::rename(&tombstone, path).await;
            return Err(e);
        }
    }
    remove_marker(&tombstone).await?;
    Ok(false)
}

async fn remove_marker(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
