//! Repository identifiers of the form `owner/repo:branch`

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::{Error, Result};

/// A repository plus the branch the sync engine works on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
    pub branch: String,
}

impl RepoRef {
    /// Parse `owner/repo:branch`.
    ///
    /// Requires exactly one `:` overall and exactly one `/` before it. No
    /// part may be empty, start with `-`, or contain whitespace or control
    /// characters. The branch itself may contain `/`.
    ///
    /// # Example
    ///
    /// ```
    /// use forksync_core::RepoRef;
    ///
    /// let r = RepoRef::parse("rust-lang/log:master").unwrap();
    /// assert_eq!(r.full_name(), "rust-lang/log");
    /// assert_eq!(r.branch, "master");
    /// assert!(RepoRef::parse("rust-lang/log").is_err());
    /// ```
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = || Error::InvalidIdentifier {
            value: value.to_string(),
        };

        if value.matches(':').count() != 1 {
            return Err(invalid());
        }
        let (repo, branch) = value.split_once(':').ok_or_else(invalid)?;

        if repo.matches('/').count() != 1 {
            return Err(invalid());
        }
        let (owner, name) = repo.split_once('/').ok_or_else(invalid)?;

        // Parts end up as positional `git` arguments
        if [owner, name, branch].iter().any(|part| !is_valid_part(part)) {
            return Err(invalid());
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
            branch: branch.to_string(),
        })
    }

    /// `owner/repo`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// HTTPS clone URL without credentials.
    pub fn public_url(&self, host: &str) -> String {
        format!("https://{}/{}/{}.git", host, self.owner, self.name)
    }

    /// HTTPS clone URL carrying `token` as userinfo.
    pub fn authenticated_url(&self, host: &str, token: &str) -> String {
        format!("https://{}@{}/{}/{}.git", token, host, self.owner, self.name)
    }
}

fn is_valid_part(part: &str) -> bool {
    !part.is_empty()
        && !part.starts_with('-')
        && !part.chars().any(|c| c.is_whitespace() || c.is_control())
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.owner, self.name, self.branch)
    }
}

impl FromStr for RepoRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A fork and the upstream it tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoPair {
    pub upstream: RepoRef,
    pub fork: RepoRef,
}

impl RepoPair {
    pub fn parse(upstream: &str, fork: &str) -> Result<Self> {
        Ok(Self {
            upstream: RepoRef::parse(upstream)?,
            fork: RepoRef::parse(fork)?,
        })
    }

    /// Whether `selector` names this pair by its upstream or fork identifier.
    pub fn matches(&self, selector: &str) -> bool {
        self.upstream.to_string() == selector || self.fork.to_string() == selector
    }

    /// Remote-tracking reference for the upstream branch, e.g. `upstream/main`.
    pub fn upstream_ref(&self) -> String {
        format!("upstream/{}", self.upstream.branch)
    }
}
