//! [`ForkFixture`]: an upstream repository and a bare fork of it, both local.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::git::{commit_file, configure_identity, git, init_repo_with_commit, rev_parse};

/// Local stand-ins for an upstream repository and its fork.
///
/// Layout inside the temporary directory:
///
/// ```text
/// upstream/   working repository, branch `main`
/// fork.git/   bare clone of upstream, what the sync engine pushes to
/// scratch/    clone of fork.git used to add fork-only commits
/// work/       parent directory for working copies under test
/// ```
///
/// Paths double as remote URLs; git accepts local paths anywhere a URL goes.
pub struct ForkFixture {
    temp_dir: TempDir,
}

impl Default for ForkFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl ForkFixture {
    /// Create an upstream with one commit and a bare fork of it.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        init_repo_with_commit(&root.join("upstream"));
        git(root, &["clone", "--bare", "upstream", "fork.git"]);
        std::fs::create_dir_all(root.join("work")).unwrap();

        Self { temp_dir }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn upstream_path(&self) -> PathBuf {
        self.root().join("upstream")
    }

    pub fn fork_path(&self) -> PathBuf {
        self.root().join("fork.git")
    }

    pub fn upstream_url(&self) -> String {
        self.upstream_path().to_string_lossy().into_owned()
    }

    pub fn fork_url(&self) -> String {
        self.fork_path().to_string_lossy().into_owned()
    }

    /// A not-yet-existing working copy directory under `work/`.
    pub fn workdir(&self, name: &str) -> PathBuf {
        self.root().join("work").join(name)
    }

    /// Commit a file on upstream `main`.
    pub fn upstream_commit(&self, file: &str, content: &str, message: &str) {
        commit_file(&self.upstream_path(), file, content, message);
    }

    /// Commit a file on the fork's `main` and push it to `fork.git`.
    pub fn fork_commit(&self, file: &str, content: &str, message: &str) {
        let scratch = self.root().join("scratch");
        if !scratch.exists() {
            git(self.root(), &["clone", "fork.git", "scratch"]);
            configure_identity(&scratch);
        } else {
            git(&scratch, &["pull", "--ff-only", "origin", "main"]);
        }
        commit_file(&scratch, file, content, message);
        git(&scratch, &["push", "origin", "main"]);
    }

    /// Current tip of `main` in the bare fork.
    pub fn fork_head(&self) -> String {
        rev_parse(&self.fork_path(), "refs/heads/main")
    }

    /// Current tip of `main` upstream.
    pub fn upstream_head(&self) -> String {
        rev_parse(&self.upstream_path(), "refs/heads/main")
    }
}
