//! Account configuration and its validated form

use serde::{Deserialize, Serialize};

use crate::identifier::RepoPair;
use crate::{Error, Result};

/// A repository pair as written in the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoPairConfig {
    /// `owner/repo:branch` to merge from
    pub upstream: String,
    /// `owner/repo:branch` to merge into and push
    pub fork: String,
}

/// An account section as written in the configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountConfig {
    pub name: String,

    /// Inline access token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Name of an environment variable holding the token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,

    #[serde(default)]
    pub repos: Vec<RepoPairConfig>,
}

/// A validated account: token resolved, identifiers parsed.
#[derive(Clone)]
pub struct Account {
    pub name: String,
    pub token: String,
    pub repos: Vec<RepoPair>,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("name", &self.name)
            .field("token", &"***")
            .field("repos", &self.repos)
            .finish()
    }
}

impl Account {
    /// Build an account directly, mostly useful for tests and embedding.
    pub fn new(name: impl Into<String>, token: impl Into<String>, repos: Vec<RepoPair>) -> Self {
        Self {
            name: name.into(),
            token: token.into(),
            repos,
        }
    }
}

impl AccountConfig {
    /// Resolve the token and parse every repository pair.
    ///
    /// `env` looks up environment variables; it is injected so validation can
    /// be tested without touching the process environment.
    pub fn resolve(&self, env: impl Fn(&str) -> Option<String>) -> Result<Account> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidConfig {
                message: "account name must not be empty".into(),
            });
        }

        let token = match (&self.token, &self.token_env) {
            (Some(token), _) if !token.is_empty() => token.clone(),
            (_, Some(var)) => env(var).filter(|t| !t.is_empty()).ok_or_else(|| {
                Error::InvalidConfig {
                    message: format!(
                        "account '{}': environment variable {} is not set",
                        self.name, var
                    ),
                }
            })?,
            _ => {
                return Err(Error::InvalidConfig {
                    message: format!(
                        "account '{}': either token or token_env is required",
                        self.name
                    ),
                });
            }
        };

        let repos = self
            .repos
            .iter()
            .map(|pair| {
                RepoPair::parse(&pair.upstream, &pair.fork).map_err(|e| Error::InvalidConfig {
                    message: format!("account '{}': {}", self.name, e),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Account {
            name: self.name.clone(),
            token,
            repos,
        })
    }
}
