//! [`ConflictResolver`] backed by a chat model

use async_trait::async_trait;
use forksync_core::config::ModelConfig;
use forksync_core::{ConflictResolver, RepoLogger, Resolution};
use forksync_git::RepoClient;

use crate::chat::{ChatClient, Completion};
use crate::prompt::{ConflictFile, build_messages, extract_content, has_conflict_markers};
use crate::{Error, Result};

/// Resolves conflicts file by file through an OpenAI-compatible endpoint.
///
/// Nothing is staged unless every file resolves.
#[derive(Debug, Clone)]
pub struct ModelResolver {
    client: ChatClient,
}

impl ModelResolver {
    /// Build a resolver, reading the API key from `config.api_key_env`.
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        Self::from_env(config, |var| std::env::var(var).ok())
    }

    /// Build a resolver with an injected environment lookup.
    pub fn from_env(config: &ModelConfig, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = env(&config.api_key_env)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::MissingApiKey {
                var: config.api_key_env.clone(),
            })?;
        let client = ChatClient::new(&config.base_url, api_key, config.timeout())?;
        Ok(Self { client })
    }

    pub fn with_client(client: ChatClient) -> Self {
        Self { client }
    }

    /// Produce merged content for one file without touching the working tree.
    async fn resolve_file(
        &self,
        repo: &dyn RepoClient,
        path: &str,
        model: &ModelConfig,
        logger: &RepoLogger,
    ) -> Result<String> {
        let full = repo.workdir().join(path);
        if !full.is_file() {
            return Err(Error::Missing { path: full });
        }
        let merged = tokio::fs::read_to_string(&full).await?;
        if merged.len() > model.max_file_bytes {
            return Err(Error::TooLarge {
                path: path.to_string(),
                size: merged.len(),
                limit: model.max_file_bytes,
            });
        }

        // Either side may not have the file; the markers alone still work
        let ours = repo.read_file_at("HEAD", path).await.ok();
        let theirs = repo.read_file_at("MERGE_HEAD", path).await.ok();
        let ours = ours.filter(|s| s.len() <= model.max_file_bytes);
        let theirs = theirs.filter(|s| s.len() <= model.max_file_bytes);

        let messages = build_messages(&ConflictFile {
            path,
            merged: &merged,
            ours: ours.as_deref(),
            theirs: theirs.as_deref(),
        });

        logger.debug(format_args!("Requesting resolution for {path} from {}", model.model));
        let options = Completion {
            model: &model.model,
            temperature: model.temperature,
            max_retries: model.max_retries,
        };
        let response = self.client.complete(&messages, &options).await?;

        let content = extract_content(&response);
        if has_conflict_markers(&content) {
            return Err(Error::ConflictMarkers {
                path: path.to_string(),
            });
        }
        Ok(content)
    }
}

#[async_trait]
impl ConflictResolver for ModelResolver {
    async fn resolve(
        &self,
        repo: &dyn RepoClient,
        conflicted: &[String],
        model: &ModelConfig,
        logger: &RepoLogger,
    ) -> Resolution {
        let mut resolved = Vec::with_capacity(conflicted.len());
        for path in conflicted {
            match self.resolve_file(repo, path, model, logger).await {
                Ok(content) => resolved.push((path, content)),
                Err(e) => {
                    logger.warn(format_args!("Could not resolve {path}: {e}"));
                    return Resolution::failed(format!("{path}: {e}"));
                }
            }
        }

        for (path, content) in &resolved {
            if let Err(e) = tokio::fs::write(repo.workdir().join(path), content).await {
                return Resolution::failed(format!("{path}: {e}"));
            }
            logger.debug(format_args!("Rewrote {path}"));
        }

        if let Err(e) = repo.stage_files(conflicted).await {
            return Resolution::failed(format!("staging resolved files: {e}"));
        }

        logger.info(format_args!("Resolved {} file(s)", resolved.len()));
        Resolution::Resolved
    }
}
