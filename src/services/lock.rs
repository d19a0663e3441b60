//! Advisory filesystem lock serializing ingestion process-wide.
//!
//! The marker is a cooperative token, not an OS lock: a fresh marker means
//! another ingest is in flight; a stale one is treated as the leftover of a
//! crashed run and taken over.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LockError;

/// A marker younger than this is live contention; older markers are
/// removed and the lock re-acquired.
pub const STALE_AFTER_SECS: i64 = 15 * 60;

#[derive(Debug, Serialize, Deserialize)]
struct LockMarker {
    pid: u32,
    acquired_at: DateTime<Utc>,
}

/// RAII guard for the ingestion marker file.
///
/// The marker is removed when the guard drops, on every exit path.
#[derive(Debug)]
pub struct IngestLock {
    path: Option<PathBuf>,
}

impl IngestLock {
    /// No-op lock for backends that arbitrate concurrent writers natively.
    pub fn noop() -> Self {
        Self { path: None }
    }

    /// Acquire the marker, failing immediately on live contention.
    pub fn acquire(path: &Path) -> Result<Self, LockError> {
        match read_marker(path) {
            Some(marker) => {
                let age = Utc::now().signed_duration_since(marker.acquired_at);
                if age < chrono::Duration::seconds(STALE_AFTER_SECS) {
                    return Err(LockError::Contention {
                        since: marker.acquired_at.to_rfc3339(),
                    });
                }
                // Stale marker from a crashed run
                fs::remove_file(path)?;
            }
            None => {
                if path.exists() {
                    // Unreadable marker, same treatment as stale
                    fs::remove_file(path)?;
                }
            }
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let marker = LockMarker {
            pid: std::process::id(),
            acquired_at: Utc::now(),
        };
        let body = serde_json::to_vec(&marker)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(path, body)?;

        Ok(Self {
            path: Some(path.to_path_buf()),
        })
    }
}

impl Drop for IngestLock {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let _ = fs::remove_file(path);
        }
    }
}

fn read_marker(path: &Path) -> Option<LockMarker> {
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker_json(age_secs: i64) -> String {
        let acquired = Utc::now() - chrono::Duration::seconds(age_secs);
        format!(
            r#"{{"pid":1,"acquired_at":"{}"}}"#,
            acquired.to_rfc3339()
        )
    }

    #[test]
    fn test_acquire_creates_and_drop_removes_marker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memoria.db.ingest.lock");

        let lock = IngestLock::acquire(&path).unwrap();
        assert!(path.exists());
        drop(lock);
        assert!(!path.exists());
    }

    #[test]
    fn test_fresh_marker_contends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memoria.db.ingest.lock");
        fs::write(&path, marker_json(60)).unwrap();

        let result = IngestLock::acquire(&path);
        assert!(matches!(result, Err(LockError::Contention { .. })));
        // A failed acquire must not remove the live marker
        assert!(path.exists());
    }

    #[test]
    fn test_stale_marker_is_taken_over() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memoria.db.ingest.lock");
        fs::write(&path, marker_json(16 * 60)).unwrap();

        let lock = IngestLock::acquire(&path).unwrap();
        assert!(path.exists());
        drop(lock);
        assert!(!path.exists());
    }

    #[test]
    fn test_corrupt_marker_is_taken_over() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memoria.db.ingest.lock");
        fs::write(&path, "not json").unwrap();

        let _lock = IngestLock::acquire(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_second_acquire_after_release_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memoria.db.ingest.lock");

        drop(IngestLock::acquire(&path).unwrap());
        let second = IngestLock::acquire(&path);
        assert!(second.is_ok());
    }

    #[test]
    fn test_noop_lock_touches_nothing() {
        let lock = IngestLock::noop();
        drop(lock);
    }
}
