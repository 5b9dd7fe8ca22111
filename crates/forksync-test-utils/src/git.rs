//! Real git repositories driven through the `git` CLI.
//!
//! All helpers panic on failure; they are for test setup only.

use std::fs;
use std::path::Path;
use std::process::Command;

/// Run `git <args>` in `dir`, panicking with stderr on failure.
///
/// Returns trimmed stdout.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .unwrap_or_else(|e| panic!("git: failed to run `git {args:?}`: {e}"));
    if !output.status.success() {
        panic!(
            "git: `git {args:?}` failed in {}:\n{}",
            dir.display(),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Configure a throwaway identity so commits work on machines without one.
pub fn configure_identity(dir: &Path) {
    git(dir, &["config", "user.email", "test@test.com"]);
    git(dir, &["config", "user.name", "Test User"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
}

/// Initialise a repository at `path` whose first commit lands on `main`.
///
/// Creates `README.md` and commits it.
pub fn init_repo_with_commit(path: &Path) {
    fs::create_dir_all(path)
        .unwrap_or_else(|e| panic!("init_repo_with_commit: failed to create dir: {e}"));
    git(path, &["init"]);
    // Works regardless of init.defaultBranch or git version
    git(path, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    configure_identity(path);
    commit_file(path, "README.md", "# Test\n", "Initial commit");
}

/// Write `content` to `file` and commit it.
pub fn commit_file(repo: &Path, file: &str, content: &str, message: &str) {
    let target = repo.join(file);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .unwrap_or_else(|e| panic!("commit_file: failed to create {}: {e}", parent.display()));
    }
    fs::write(&target, content)
        .unwrap_or_else(|e| panic!("commit_file: failed to write {file}: {e}"));
    git(repo, &["add", "--", file]);
    git(repo, &["commit", "-m", message]);
}

/// Resolve `revision` in the repository at `dir` (bare or not).
pub fn rev_parse(dir: &Path, revision: &str) -> String {
    git(dir, &["rev-parse", revision])
}
