//! Working-copy directories and the run lock

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::identifier::RepoRef;
use crate::{Error, Result};

const LOCK_FILE_NAME: &str = ".forksync.lock";

/// Joins the encoded components. Percent-encoding always escapes it.
const SEPARATOR: char = '+';

/// Directory holding the working copy of `fork` for `account`.
///
/// Each of `(account, owner, repo)` is percent-encoded before joining, so
/// distinct triples always map to distinct directories.
pub fn working_copy_dir(root: &Path, account: &str, fork: &RepoRef) -> PathBuf {
    root.join(format!(
        "{}{SEPARATOR}{}{SEPARATOR}{}",
        urlencoding::encode(account),
        urlencoding::encode(&fork.owner),
        urlencoding::encode(&fork.name)
    ))
}

/// Exclusive lock over a working-copy root.
///
/// Whole-batch runs sharing working copies must not overlap. The lock is
/// released when the value is dropped.
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Take the lock without blocking, failing if another run holds it.
    pub fn acquire(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        let path = root.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        if file.try_lock_exclusive().is_err() {
            return Err(Error::RunInProgress { path });
        }

        tracing::debug!(path = %path.display(), "Acquired run lock");
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to release run lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_working_copy_dir_is_deterministic() {
        let fork = RepoRef::parse("me/widgets:main").unwrap();
        let root = Path::new("/srv/forksync");

        let a = working_copy_dir(root, "personal", &fork);
        let b = working_copy_dir(root, "personal", &fork);
        assert_eq!(a, b);
        assert_eq!(a, root.join("personal+me+widgets"));
    }

    #[test]
    fn test_working_copy_dir_differs_per_account() {
        let fork = RepoRef::parse("me/widgets:main").unwrap();
        let root = Path::new("/srv");
        assert_ne!(
            working_copy_dir(root, "work", &fork),
            working_copy_dir(root, "personal", &fork)
        );
    }

    #[test]
    fn test_working_copy_dir_encodes_unsafe_characters() {
        let fork = RepoRef::parse("me/wid@gets:main").unwrap();
        let dir = working_copy_dir(Path::new("/srv"), "team a/b", &fork);
        assert_eq!(dir, Path::new("/srv").join("team%20a%2Fb+me+wid%40gets"));
    }

    #[rstest::rstest]
    #[case("team a", "team-a")]
    #[case("team/a", "team-a")]
    #[case("a+me", "a")]
    #[case("a__me", "a")]
    #[case("a%20b", "a b")]
    fn test_similar_account_names_get_distinct_dirs(#[case] first: &str, #[case] second: &str) {
        let root = Path::new("/r");
        let fork = RepoRef::parse("me/w:main").unwrap();
        let other = RepoRef::parse("me+me/w:main").unwrap();

        assert_ne!(
            working_copy_dir(root, first, &fork),
            working_copy_dir(root, second, &fork)
        );
        assert_ne!(
            working_copy_dir(root, first, &fork),
            working_copy_dir(root, second, &other)
        );
    }

    #[test]
    fn test_run_lock_is_exclusive() {
        let temp = TempDir::new().unwrap();

        let first = RunLock::acquire(temp.path()).unwrap();
        let second = RunLock::acquire(temp.path());
        assert!(matches!(second, Err(Error::RunInProgress { .. })));

        drop(first);
        RunLock::acquire(temp.path()).unwrap();
    }
}
