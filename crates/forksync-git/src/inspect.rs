//! Read-only repository inspection through git2
//!
//! These functions never touch the network or the working tree, so they open
//! the repository directly instead of spawning `git`.

use std::collections::BTreeSet;
use std::path::Path;

use git2::{BranchType, ErrorCode, Repository};

use crate::client::Remote;
use crate::{Error, Result};

/// Whether `path` is the root of a git working copy.
pub fn repository_exists(path: &Path) -> bool {
    if !path.exists() {
        return false;
    }
    match Repository::open(path) {
        Ok(repo) => !repo.is_bare(),
        Err(_) => false,
    }
}

/// List configured remotes with their fetch URLs.
pub fn list_remotes(repo: &Repository) -> Result<Vec<Remote>> {
    let names = repo.remotes()?;
    let mut remotes = Vec::with_capacity(names.len());

    for name in names.iter().flatten() {
        let remote = repo.find_remote(name).map_err(|_| Error::RemoteNotFound {
            name: name.to_string(),
        })?;
        remotes.push(Remote {
            name: name.to_string(),
            url: remote.url().unwrap_or_default().to_string(),
        });
    }

    Ok(remotes)
}

/// Collect paths with unresolved conflicts from the index.
///
/// Each conflict entry may lack a side (added/deleted on one branch), so the
/// first available path among ours, theirs, and ancestor is used.
pub fn conflicted_paths(repo: &Repository) -> Result<Vec<String>> {
    let index = repo.index()?;
    if !index.has_conflicts() {
        return Ok(Vec::new());
    }

    let mut paths = BTreeSet::new();
    for conflict in index.conflicts()? {
        let conflict = conflict?;
        let entry = conflict
            .our
            .as_ref()
            .or(conflict.their.as_ref())
            .or(conflict.ancestor.as_ref());
        if let Some(entry) = entry {
            paths.insert(String::from_utf8_lossy(&entry.path).into_owned());
        }
    }

    Ok(paths.into_iter().collect())
}

/// List commits in `range` (`base..tip`), one `<short hash> <summary>` per line.
pub fn list_commits_in_range(repo: &Repository, range: &str) -> Result<String> {
    let mut revwalk = repo.revwalk()?;
    revwalk.push_range(range)?;
    revwalk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::TIME)?;

    let mut lines = Vec::new();
    for oid in revwalk {
        let oid = oid?;
        let commit = repo.find_commit(oid)?;
        let summary = commit.summary().unwrap_or("");
        let hash = oid.to_string();
        lines.push(format!("{} {}", &hash[..7], summary));
    }

    Ok(lines.join("\n"))
}

/// Whether a local branch named `branch` exists.
pub fn local_branch_exists(repo: &Repository, branch: &str) -> Result<bool> {
    match repo.find_branch(branch, BranchType::Local) {
        Ok(_) => Ok(true),
        Err(e) if e.code() == ErrorCode::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Full hash of the commit HEAD resolves to.
pub fn head_revision(repo: &Repository) -> Result<String> {
    let commit = repo.head()?.peel_to_commit()?;
    Ok(commit.id().to_string())
}

/// Read a UTF-8 file as it exists in the tree of `revision`.
pub fn read_file_at(repo: &Repository, revision: &str, path: &str) -> Result<String> {
    let tree = repo.revparse_single(revision)?.peel_to_tree()?;

    let entry = match tree.get_path(Path::new(path)) {
        Ok(entry) => entry,
        Err(e) if e.code() == ErrorCode::NotFound => {
            return Err(Error::FileNotFound {
                revision: revision.to_string(),
                path: path.to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    let blob = entry.to_object(repo)?.peel_to_blob()?;
    String::from_utf8(blob.content().to_vec()).map_err(|_| Error::NotUtf8 {
        revision: revision.to_string(),
        path: path.to_string(),
    })
}
