use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::StoreError;

/// Lock files held by this process.
static HELD: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());

/// Exclusive ownership of a portfolio file for the lifetime of the process.
///
/// Backed by a `<file>.lock` sibling created with `create_new` that records
/// the owner's pid, so a second process pointed at the same file refuses to
/// start. A lock left behind by a process that is no longer running is taken
/// over. Removed on drop.
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
}

impl StoreLock {
    pub fn acquire(store_path: &Path) -> Result<Self, StoreError> {
        let path = lock_path_for(store_path);

        match create_lock_file(&path) {
            Err(StoreError::Locked(_)) if is_stale(&path) => {
                tracing::warn!(lock = %path.display(), "Removing stale portfolio lock");
                match fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
                create_lock_file(&path)?;
            }
            other => other?,
        }

        held().push(path.clone());
        tracing::debug!(lock = %path.display(), "Portfolio lock acquired");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        held().retain(|p| p != &self.path);
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(error = %e, lock = %self.path.display(), "Failed to remove portfolio lock");
        }
    }
}

fn held() -> std::sync::MutexGuard<'static, Vec<PathBuf>> {
    HELD.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn create_lock_file(path: &Path) -> Result<(), StoreError> {
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Err(StoreError::Locked(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    writeln!(file, "{}", std::process::id())?;
    Ok(())
}

/// A lock is stale when its recorded pid is no longer running, or is our
/// own pid without this process holding it (a leftover from an earlier run
/// that was given the same pid). Unreadable contents count as held.
fn is_stale(path: &Path) -> bool {
    let Some(pid) = fs::read_to_string(path)
        .ok()
        .and_then(|s| s.trim().parse::<u32>().ok())
    else {
        return false;
    };

    if pid == std::process::id() {
        return !held().iter().any(|p| p == path);
    }
    !process_alive(pid)
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> bool {
    true
}

fn lock_path_for(store_path: &Path) -> PathBuf {
    let mut name = store_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "portfolio".into());
    name.push(".lock");
    store_path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> PathBuf {
        std::env::temp_dir().join(format!("lock_{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_second_acquire_fails_until_drop() {
        let store = temp_store();

        let first = StoreLock::acquire(&store).unwrap();
        assert!(first.path().exists());
        assert!(matches!(StoreLock::acquire(&store), Err(StoreError::Locked(_))));

        let lock_file = first.path().to_path_buf();
        drop(first);
        assert!(!lock_file.exists());

        let again = StoreLock::acquire(&store);
        assert!(again.is_ok());
    }

    #[test]
    fn test_leftover_lock_with_own_pid_is_taken_over() {
        let store = temp_store();
        let lock_file = lock_path_for(&store);
        fs::write(&lock_file, format!("{}\n", std::process::id())).unwrap();

        let lock = StoreLock::acquire(&store).unwrap();
        assert_eq!(lock.path(), lock_file.as_path());
        assert!(matches!(StoreLock::acquire(&store), Err(StoreError::Locked(_))));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_lock_of_dead_process_is_taken_over() {
        let store = temp_store();
        let lock_file = lock_path_for(&store);
        // Above any kernel pid_max
        fs::write(&lock_file, "4294967295\n").unwrap();

        let lock = StoreLock::acquire(&store).unwrap();
        let owner = fs::read_to_string(lock.path()).unwrap();
        assert_eq!(owner.trim(), std::process::id().to_string());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_lock_of_live_process_is_respected() {
        let store = temp_store();
        let lock_file = lock_path_for(&store);
        // pid 1 is always running
        fs::write(&lock_file, "1\n").unwrap();

        if std::process::id() != 1 {
            assert!(matches!(StoreLock::acquire(&store), Err(StoreError::Locked(_))));
        }
        fs::remove_file(&lock_file).unwrap();
    }

    #[test]
    fn test_unreadable_lock_counts_as_held() {
        let store = temp_store();
        let lock_file = lock_path_for(&store);
        fs::write(&lock_file, "not a pid").unwrap();

        assert!(matches!(StoreLock::acquire(&store), Err(StoreError::Locked(_))));
        fs::remove_file(&lock_file).unwrap();
    }

    #[test]
    fn test_lock_path_is_sibling() {
        let p = lock_path_for(Path::new("/data/portfolio_db.json"));
        assert_eq!(p, PathBuf::from("/data/portfolio_db.json.lock"));
    }
}
