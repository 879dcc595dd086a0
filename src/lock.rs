//! Machine-wide single-instance lock backed by a lock file.
//!
//! On unix the lock is an exclusive `flock` on a well-known file, and a
//! lock is only kept if the path still names the locked file. On Windows
//! the file is opened without sharing. Failing to get the lock is an
//! expected outcome, so [`InstanceLock::acquire`] reports it with `false`
//! instead of an error.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

// A releasing holder unlinks the file, so an opened handle can go stale
// between open and flock. Each retry reopens the path.
const STALE_RETRIES: usize = 8;

/// Result of locking an already opened lock file.
#[derive(Debug)]
enum Attempt {
    /// Locked, and the handle is still the file at the lock path.
    Held(File),
    /// Another handle holds the lock.
    Busy,
    /// Locked, but the path no longer names this file.
    Stale,
}

/// Exclusive lock held for the lifetime of a running job.
///
/// Released explicitly with [`release`](InstanceLock::release) or, failing
/// that, when dropped. Releasing twice is a no-op.
#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
    file: Option<File>,
}

impl InstanceLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Try to take the lock without blocking.
    ///
    /// Returns `false` if another holder has it, if this handle already
    /// holds it, or if the lock file cannot be opened.
    pub fn acquire(&mut self) -> bool {
        if self.file.is_some() {
            debug!(path = %self.path.display(), "instance lock already held by this handle");
            return false;
        }

        for _ in 0..STALE_RETRIES {
            let file = match open_lock_file(&self.path) {
                Ok(Some(file)) => file,
                Ok(None) => {
                    info!(path = %self.path.display(), "instance lock held elsewhere");
                    return false;
                }
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "cannot open lock file");
                    return false;
                }
            };

            match lock_opened(&self.path, file) {
                Ok(Attempt::Held(file)) => {
                    info!(path = %self.path.display(), "instance lock acquired");
                    self.file = Some(file);
                    return true;
                }
                Ok(Attempt::Busy) => {
                    info!(path = %self.path.display(), "instance lock held elsewhere");
                    return false;
                }
                Ok(Attempt::Stale) => {
                    debug!(path = %self.path.display(), "lock file replaced while locking, retrying");
                }
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "failed to lock file");
                    return false;
                }
            }
        }

        warn!(path = %self.path.display(), "lock file kept changing, giving up");
        false
    }

    /// Release the OS lock, close the handle and remove the lock file.
    ///
    /// Does nothing when the lock is not held.
    pub fn release(&mut self) {
        let Some(file) = self.file.take() else {
            return;
        };

        if let Err(e) = unlock(&file) {
            warn!(path = %self.path.display(), error = %e, "failed to unlock file");
        }
        drop(file);

        match std::fs::remove_file(&self.path) {
            Ok(()) => info!(path = %self.path.display(), "instance lock released"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove lock file"),
        }
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        self.release();
    }
}

/// Check whether another process currently holds the lock at `path`.
///
/// The check takes and immediately gives back the lock; it removes the lock
/// file only when nobody else held it.
pub fn is_locked_elsewhere(path: &Path) -> bool {
    if !path.exists() {
        return false;
    }
    let mut check = InstanceLock::new(path);
    let acquired = check.acquire();
    check.release();
    !acquired
}

fn lock_opened(path: &Path, file: File) -> io::Result<Attempt> {
    if !try_lock_exclusive(&file)? {
        return Ok(Attempt::Busy);
    }
    if is_same_file(&file, path)? {
        Ok(Attempt::Held(file))
    } else {
        Ok(Attempt::Stale)
    }
}

#[cfg(not(windows))]
fn open_lock_file(path: &Path) -> io::Result<Option<File>> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map(Some)
}

// No sharing: while one handle is open, every other open fails, so the
// open itself is the lock.
#[cfg(windows)]
fn open_lock_file(path: &Path) -> io::Result<Option<File>> {
    use std::os::windows::fs::OpenOptionsExt;
    const ERROR_SHARING_VIOLATION: i32 = 32;

    match OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .share_mode(0)
        .open(path)
    {
        Ok(file) => Ok(Some(file)),
        Err(e) if e.raw_os_error() == Some(ERROR_SHARING_VIOLATION) => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn try_lock_exclusive(file: &File) -> io::Result<bool> {
    use std::os::unix::io::AsRawFd;
    let fd = file.as_raw_fd();
    // SAFETY: fd is a valid descriptor owned by `file` for the whole call.
    let result = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        return Ok(true);
    }
    let err = io::Error::last_os_error();
    if err.kind() == io::ErrorKind::WouldBlock || err.raw_os_error() == Some(libc::EWOULDBLOCK) {
        return Ok(false);
    }
    Err(err)
}

#[cfg(unix)]
fn unlock(file: &File) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;
    // SAFETY: fd is a valid descriptor owned by `file` for the whole call.
    let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_UN) };
    if result == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Whether `path` still names the file behind `file`.
#[cfg(unix)]
fn is_same_file(file: &File, path: &Path) -> io::Result<bool> {
    use std::os::unix::fs::MetadataExt;
    let held = file.metadata()?;
    match std::fs::metadata(path) {
        Ok(on_disk) => Ok(held.dev() == on_disk.dev() && held.ino() == on_disk.ino()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

// An unshared open handle keeps the file from being deleted or replaced.
#[cfg(not(unix))]
fn is_same_file(_file: &File, _path: &Path) -> io::Result<bool> {
    Ok(true)
}

// Closing the unshared handle releases it.
#[cfg(not(unix))]
fn try_lock_exclusive(_file: &File) -> io::Result<bool> {
    Ok(true)
}

#[cfg(not(unix))]
fn unlock(_file: &File) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn acquire_and_release_removes_lock_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("program.lock");
        let mut lock = InstanceLock::new(&path);

        assert!(lock.acquire());
        assert!(lock.is_held());
        assert!(path.exists());

        lock.release();
        assert!(!lock.is_held());
        assert!(!path.exists());
    }

    #[test]
    fn second_acquire_on_same_handle_is_refused() {
        let tmp = TempDir::new().unwrap();
        let mut lock = InstanceLock::new(tmp.path().join("program.lock"));

        assert!(lock.acquire());
        assert!(!lock.acquire());
        assert!(lock.is_held());
    }

    #[test]
    fn release_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("program.lock");
        let mut lock = InstanceLock::new(&path);

        lock.release();
        assert!(lock.acquire());
        lock.release();
        lock.release();
        assert!(!path.exists());
    }

    #[test]
    fn unopenable_path_returns_false() {
        let tmp = TempDir::new().unwrap();
        let mut lock = InstanceLock::new(tmp.path().join("missing-dir").join("program.lock"));
        assert!(!lock.acquire());
        assert!(!lock.is_held());
    }

    #[test]
    fn drop_releases_lock() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("program.lock");
        {
            let mut lock = InstanceLock::new(&path);
            assert!(lock.acquire());
        }
        assert!(!path.exists());

        let mut again = InstanceLock::new(&path);
        assert!(again.acquire());
    }

    #[test]
    fn second_handle_is_refused_while_first_holds() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("program.lock");
        let mut first = InstanceLock::new(&path);
        let mut second = InstanceLock::new(&path);

        assert!(first.acquire());
        assert!(!second.acquire());
        assert!(!second.is_held());
        // A refused handle must not remove the holder's file.
        second.release();
        assert!(path.exists());

        first.release();
        assert!(second.acquire());
    }

    #[test]
    fn locked_elsewhere_reports_contention() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("program.lock");
        assert!(!is_locked_elsewhere(&path));

        let mut holder = InstanceLock::new(&path);
        assert!(holder.acquire());
        assert!(is_locked_elsewhere(&path));
        assert!(path.exists());

        holder.release();
        assert!(!is_locked_elsewhere(&path));
    }

    #[cfg(unix)]
    #[test]
    fn handle_opened_before_release_cannot_lock_replaced_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("program.lock");

        let mut first = InstanceLock::new(&path);
        assert!(first.acquire());
        // A racing process opened the file while `first` still held it.
        let early = open_lock_file(&path).unwrap().unwrap();
        first.release();

        let mut third = InstanceLock::new(&path);
        assert!(third.acquire());

        // The early handle locks the unlinked file, which is not the lock.
        assert!(matches!(lock_opened(&path, early).unwrap(), Attempt::Stale));

        // Retrying from the path meets the real holder.
        let mut second = InstanceLock::new(&path);
        assert!(!second.acquire());
        assert!(third.is_held());
        assert!(path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn acquire_after_stale_handle_gets_fresh_lock() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("program.lock");

        let mut first = InstanceLock::new(&path);
        assert!(first.acquire());
        let early = open_lock_file(&path).unwrap().unwrap();
        first.release();

        assert!(matches!(lock_opened(&path, early).unwrap(), Attempt::Stale));
        let mut second = InstanceLock::new(&path);
        assert!(second.acquire());
        assert!(path.exists());
    }
}
