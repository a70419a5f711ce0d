use std::fmt;

use crate::error::ConfigError;

pub const DEFAULT_COMMIT_COUNT: usize = 10;
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_LANGUAGE: &str = "English";
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_MODEL_API_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_CHANGELOG_PATH: &str = "CHANGELOG.md";

/// Run parameters, read once at startup and passed to every stage.
#[derive(Clone)]
pub struct Config {
    pub github_token: String,
    pub model_api_key: String,
    pub owner: String,
    pub repo: String,
    pub commit_count: usize,
    pub target_branch: String,
    pub model: String,
    pub language: String,
    pub github_api_url: String,
    pub model_api_url: String,
    pub changelog_path: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source.
    ///
    /// Each input is resolved as `INPUT_<NAME>` first, then `<NAME>`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let input = |name: &str| {
            lookup(&format!("INPUT_{}", name))
                .filter(|v| !v.trim().is_empty())
                .or_else(|| lookup(name).filter(|v| !v.trim().is_empty()))
                .map(|v| v.trim().to_string())
        };

        let github_token = input("GITHUB_TOKEN").ok_or(ConfigError::Missing("GITHUB_TOKEN"))?;
        let model_api_key =
            input("GEMINI_API_KEY").ok_or(ConfigError::Missing("GEMINI_API_KEY"))?;

        let repository =
            input("GITHUB_REPOSITORY").ok_or(ConfigError::Missing("GITHUB_REPOSITORY"))?;
        let (owner, repo) = parse_repository(&repository)?;

        let commit_count = match input("COMMIT_COUNT") {
            Some(raw) => parse_commit_count(&raw)?,
            None => DEFAULT_COMMIT_COUNT,
        };

        let target_branch = input("TARGET_BRANCH")
            .or_else(|| input("GITHUB_BASE_REF"))
            .unwrap_or_else(|| DEFAULT_BRANCH.to_string());

        Ok(Self {
            github_token,
            model_api_key,
            owner,
            repo,
            commit_count,
            target_branch,
            model: input("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            language: input("CHANGELOG_LANGUAGE").unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            github_api_url: input("GITHUB_API_URL")
                .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string()),
            model_api_url: input("GEMINI_API_URL")
                .unwrap_or_else(|| DEFAULT_MODEL_API_URL.to_string()),
            changelog_path: input("CHANGELOG_PATH")
                .unwrap_or_else(|| DEFAULT_CHANGELOG_PATH.to_string()),
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("github_token", &"<redacted>")
            .field("model_api_key", &"<redacted>")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("commit_count", &self.commit_count)
            .field("target_branch", &self.target_branch)
            .field("model", &self.model)
            .field("language", &self.language)
            .field("github_api_url", &self.github_api_url)
            .field("model_api_url", &self.model_api_url)
            .field("changelog_path", &self.changelog_path)
            .finish()
    }
}

fn parse_repository(value: &str) -> Result<(String, String), ConfigError> {
    match value.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(ConfigError::Invalid {
            name: "GITHUB_REPOSITORY",
            reason: format!("expected owner/name, got '{}'", value),
        }),
    }
}

fn parse_commit_count(value: &str) -> Result<usize, ConfigError> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::Invalid {
            name: "COMMIT_COUNT",
            reason: format!("expected a positive integer, got '{}'", value),
        }),
    }
}
