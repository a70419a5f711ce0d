use reqwest::StatusCode;
use thiserror::Error;

/// Failure talking to an external HTTP API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Status { status: StatusCode, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Http(e) => e.status(),
            ApiError::Decode(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required input: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to list commits on {branch}: {source}")]
    Commits {
        branch: String,
        #[source]
        source: ApiError,
    },

    #[error("Failed to read {path}: {source}")]
    File {
        path: String,
        #[source]
        source: ApiError,
    },
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("No commits to summarize")]
    NoCommits,

    #[error("Model API key is not configured")]
    MissingApiKey,

    #[error("Model request failed: {0}")]
    Api(#[from] ApiError),

    #[error("Model returned no text")]
    EmptyResponse,
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Failed to resolve head of {branch}: {source}")]
    BranchHead {
        branch: String,
        #[source]
        source: ApiError,
    },

    #[error("Failed to create branch {branch}: {source}")]
    CreateBranch {
        branch: String,
        #[source]
        source: ApiError,
    },

    #[error("Failed to write {path}: {source}")]
    WriteFile {
        path: String,
        #[source]
        source: ApiError,
    },

    #[error("Failed to open pull request: {0}")]
    PullRequest(#[source] ApiError),
}

/// Any error that aborts a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}
