use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::download::temp_path;

/// Errors that can occur while taking or giving back the process lock.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("can't lock {}: held by process {pid}", .path.display())]
    AlreadyHeld { path: PathBuf, pid: u32 },

    #[error("can't lock {}: it changed owner while acquiring", .path.display())]
    Contended { path: PathBuf },

    #[error("can't unlock {}: not owned by this process", .path.display())]
    NotOwner { path: PathBuf },

    #[error("lock file {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
}

/// Who the lock file says holds the lock.
enum Owner {
    Alive(u32),
    Stale,
}

/// A PID lock file guaranteeing a single running instance.
///
/// The lock file holds the owner's process id. A lock naming a process that
/// no longer exists, or holding garbage, is stale and gets taken over. The
/// lock is not re-entrant: acquiring it twice from one process fails.
///
/// Dropping the lock releases it; call [`ProcessLock::release`] to observe
/// release failures.
#[derive(Debug)]
pub struct ProcessLock {
    path: PathBuf,
    pid: u32,
    released: bool,
}

impl ProcessLock {
    /// Take the lock at `path` without waiting.
    pub fn try_acquire(path: impl Into<PathBuf>) -> Result<Self, LockError> {
        let path = path.into();
        let pid = std::process::id();
        let io_err = |source| LockError::Io {
            path: path.clone(),
            source,
        };

        // Stage the PID in a sibling file and hard-link it into place, so the
        // lock file never exists without its content.
        let staging = temp_path(&path).ok_or_else(|| {
            io_err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "lock path has no file name",
            ))
        })?;
        fs::write(&staging, format!("{pid}\n")).map_err(io_err)?;

        let linked = link_or_take_over(&staging, &path);
        if let Err(e) = fs::remove_file(&staging) {
            warn!(staging = %staging.display(), error = %e, "failed to remove lock staging file");
        }
        linked?;

        debug!(path = %path.display(), pid, "acquired process lock");
        Ok(Self {
            path,
            pid,
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the lock file, provided it still names this process.
    pub fn release(mut self) -> Result<(), LockError> {
        self.released = true;
        self.remove()
    }

    fn remove(&self) -> Result<(), LockError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(LockError::NotOwner {
                    path: self.path.clone(),
                });
            }
            Err(source) => {
                return Err(LockError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if parse_pid(&contents) != Some(self.pid) {
            return Err(LockError::NotOwner {
                path: self.path.clone(),
            });
        }

        fs::remove_file(&self.path).map_err(|source| LockError::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), "released process lock");
        Ok(())
    }
}

impl Drop for ProcessLock {
    fn drop(&mut self) {
        if !self.released
            && let Err(e) = self.remove()
        {
            warn!(error = %e, "failed to release process lock");
        }
    }
}

fn link_or_take_over(staging: &Path, path: &Path) -> Result<(), LockError> {
    // One retry after clearing a stale lock.
    for _ in 0..2 {
        match fs::hard_link(staging, path) {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(source) => {
                return Err(LockError::Io {
                    path: path.to_owned(),
                    source,
                });
            }
        }

        match read_owner(path)? {
            Owner::Alive(pid) => {
                return Err(LockError::AlreadyHeld {
                    path: path.to_owned(),
                    pid,
                });
            }
            Owner::Stale => {
                warn!(path = %path.display(), "removing stale lock file");
                match fs::remove_file(path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(source) => {
                        return Err(LockError::Io {
                            path: path.to_owned(),
                            source,
                        });
                    }
                }
            }
        }
    }

    Err(LockError::Contended {
        path: path.to_owned(),
    })
}

fn read_owner(path: &Path) -> Result<Owner, LockError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Owner::Stale),
        Err(e) if e.kind() == io::ErrorKind::InvalidData => return Ok(Owner::Stale),
        Err(source) => {
            return Err(LockError::Io {
                path: path.to_owned(),
                source,
            });
        }
    };

    Ok(match parse_pid(&contents) {
        Some(pid) if process_alive(pid) => Owner::Alive(pid),
        _ => Owner::Stale,
    })
}

fn parse_pid(contents: &str) -> Option<u32> {
    contents.trim().parse().ok().filter(|pid| *pid > 0)
}

fn process_alive(pid: u32) -> bool {
    let proc_root = Path::new("/proc");
    if cfg!(target_os = "linux") && proc_root.is_dir() {
        proc_root.join(pid.to_string()).exists()
    } else {
        // Without procfs there is no portable check; assume the owner lives.
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lock_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("mediasync.lock")
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn acquire_writes_own_pid() {
        let dir = tempfile::tempdir().unwrap();
        let path = lock_path(&dir);

        let lock = ProcessLock::try_acquire(&path).unwrap();

        assert_eq!(lock.path(), path);
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(parse_pid(&contents), Some(std::process::id()));
        assert_eq!(entries(dir.path()), vec!["mediasync.lock"]);
    }

    #[test]
    fn second_acquire_fails_while_held() {
        let dir = tempfile::tempdir().unwrap();
        let path = lock_path(&dir);

        let _held = ProcessLock::try_acquire(&path).unwrap();
        let err = ProcessLock::try_acquire(&path).unwrap_err();

        match err {
            LockError::AlreadyHeld { pid, .. } => assert_eq!(pid, std::process::id()),
            other => panic!("expected AlreadyHeld, got {other:?}"),
        }
        assert_eq!(entries(dir.path()), vec!["mediasync.lock"]);
    }

    #[test]
    fn release_removes_lock_and_allows_reacquire() {
        let dir = tempfile::tempdir().unwrap();
        let path = lock_path(&dir);

        let lock = ProcessLock::try_acquire(&path).unwrap();
        lock.release().unwrap();
        assert!(!path.exists());

        let again = ProcessLock::try_acquire(&path).unwrap();
        again.release().unwrap();
    }

    #[test]
    fn drop_releases_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = lock_path(&dir);

        {
            let _lock = ProcessLock::try_acquire(&path).unwrap();
            assert!(path.exists());
        }

        assert!(!path.exists());
    }

    #[test]
    fn garbage_lock_file_is_taken_over() {
        let dir = tempfile::tempdir().unwrap();
        let path = lock_path(&dir);
        fs::write(&path, "not a pid").unwrap();

        let lock = ProcessLock::try_acquire(&path).unwrap();

        assert_eq!(
            parse_pid(&fs::read_to_string(&path).unwrap()),
            Some(std::process::id())
        );
        lock.release().unwrap();
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn dead_owner_is_taken_over() {
        let dir = tempfile::tempdir().unwrap();
        let path = lock_path(&dir);
        // Above the kernel's maximum pid, so never a live process.
        fs::write(&path, "4294967\n").unwrap();

        let lock = ProcessLock::try_acquire(&path).unwrap();
        lock.release().unwrap();
    }

    #[test]
    fn release_refuses_foreign_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = lock_path(&dir);

        let lock = ProcessLock::try_acquire(&path).unwrap();
        fs::write(&path, "1\n").unwrap();

        let err = lock.release().unwrap_err();
        assert!(matches!(err, LockError::NotOwner { .. }));
        assert!(path.exists());
    }

    #[test]
    fn release_of_vanished_lock_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = lock_path(&dir);

        let lock = ProcessLock::try_acquire(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert!(matches!(lock.release(), Err(LockError::NotOwner { .. })));
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing/mediasync.lock");

        let err = ProcessLock::try_acquire(&path).unwrap_err();
        assert!(matches!(err, LockError::Io { .. }));
    }
}
