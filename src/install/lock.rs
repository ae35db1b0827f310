//! Per-package install locks.
//!
//! A lock is an OS advisory lock on a file under the state directory. The
//! kernel releases it when the holder exits, so a killed install never
//! blocks the next run. The lock file itself stays on disk.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::install::InstallError;
use crate::util::fs::ensure_dir;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug)]
pub struct InstallLock {
    file: File,
    path: PathBuf,
}

impl InstallLock {
    /// Take the lock at `path`, waiting up to `timeout` for a holder to
    /// release it.
    pub fn acquire(package: &str, path: &Path, timeout: Duration) -> Result<Self, InstallError> {
        if let Some(parent) = path.parent() {
            ensure_dir(parent).map_err(|e| InstallError::io(package, parent, e))?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| InstallError::io(package, path, e))?;

        let start = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    tracing::debug!("acquired install lock {}", path.display());
                    return Ok(InstallLock {
                        file,
                        path: path.to_path_buf(),
                    });
                }
                Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                    if start.elapsed() >= timeout {
                        return Err(InstallError::LockTimeout {
                            package: package.to_string(),
                            lock: path.to_path_buf(),
                        });
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(e) => return Err(InstallError::io(package, path, e)),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!("failed to release install lock {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_exclusive_and_released_on_drop() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("locks").join("zlib-1.3.0.lock");

        let lock = InstallLock::acquire("zlib", &path, Duration::from_secs(1)).unwrap();
        assert!(path.exists());

        let err = InstallLock::acquire("zlib", &path, Duration::from_millis(120)).unwrap_err();
        assert!(matches!(err, InstallError::LockTimeout { .. }));

        drop(lock);
        assert!(InstallLock::acquire("zlib", &path, Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn test_leftover_lock_file_does_not_block() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("locks").join("zlib-1.3.0.lock");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "4242\n").unwrap();

        assert!(InstallLock::acquire("zlib", &path, Duration::from_millis(200)).is_ok());
    }
}
