use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One commit as the rest of the pipeline sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    /// First line of the full commit message
    pub message: String,
    pub date: DateTime<Utc>,
    pub author: String,
}

impl Commit {
    pub fn short_sha(&self) -> &str {
        self.sha.get(..7).unwrap_or(&self.sha)
    }
}

/// Result of splicing a new entry into the changelog document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub content: String,
    pub has_changes: bool,
}

/// Current content of a file on a branch, with the blob sha needed to update it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub content: String,
    pub sha: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub html_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchCreation {
    Created,
    AlreadyExists,
}

// Raw hosting API payloads, projected into the types above at the boundary.

#[derive(Debug, Deserialize)]
pub struct RawCommit {
    pub sha: String,
    pub commit: RawCommitDetail,
}

#[derive(Debug, Deserialize)]
pub struct RawCommitDetail {
    pub message: String,
    pub author: Option<RawSignature>,
    pub committer: Option<RawSignature>,
}

#[derive(Debug, Deserialize)]
pub struct RawSignature {
    pub name: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct RawContent {
    pub sha: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct RawRef {
    pub object: RawRefObject,
}

#[derive(Debug, Deserialize)]
pub struct RawRefObject {
    pub sha: String,
}
