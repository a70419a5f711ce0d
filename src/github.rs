use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::config::Config;
use crate::error::ApiError;
use crate::models::{BranchCreation, PullRequest, RawCommit, RawContent, RawRef, RemoteFile};

const USER_AGENT: &str = "changelog-bot";
const MAX_PER_PAGE: usize = 100;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Thin typed client over the hosting REST API, scoped to one repository.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    base_url: String,
    owner: String,
    repo: String,
    token: String,
}

impl GitHubClient {
    pub fn new(base_url: &str, owner: &str, repo: &str, token: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            token: token.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.github_api_url,
            &config.owner,
            &config.repo,
            &config.github_token,
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}/repos/{}/{}/{}", self.base_url, self.owner, self.repo, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json")
            .header("Authorization", format!("Bearer {}", self.token))
    }

    /// List up to `count` commits reachable from `branch`, in API order.
    ///
    /// An empty repository (409) yields no commits rather than an error.
    pub async fn list_commits(&self, branch: &str, count: usize) -> Result<Vec<RawCommit>, ApiError> {
        let mut commits = Vec::with_capacity(count);
        let mut page = 1;
        // Page offsets are computed from per_page, so it must stay fixed across pages.
        let per_page = count.min(MAX_PER_PAGE);

        while commits.len() < count {
            let request = self.authorized(self.http.get(self.url("commits"))).query(&[
                ("sha", branch.to_string()),
                ("per_page", per_page.to_string()),
                ("page", page.to_string()),
            ]);

            let response = request.send().await?;
            if response.status() == StatusCode::CONFLICT {
                tracing::debug!("Repository is empty, no commits on {}", branch);
                break;
            }

            let batch: Vec<RawCommit> = parse_json(response).await?;
            let short_page = batch.len() < per_page;
            commits.extend(batch);
            if short_page {
                break;
            }
            page += 1;
        }

        commits.truncate(count);
        Ok(commits)
    }

    /// Read a file at a ref. Returns `None` when it does not exist there.
    pub async fn get_file(&self, path: &str, git_ref: &str) -> Result<Option<RemoteFile>, ApiError> {
        let request = self
            .authorized(self.http.get(self.url(&format!("contents/{}", path))))
            .query(&[("ref", git_ref)]);

        let response = request.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let raw: RawContent = parse_json(response).await?;
        let content = decode_content(&raw.content)?;
        Ok(Some(RemoteFile {
            content,
            sha: raw.sha,
        }))
    }

    /// Create or update a file on `branch`. Pass the current blob sha to update in place.
    pub async fn put_file(
        &self,
        path: &str,
        branch: &str,
        content: &str,
        message: &str,
        sha: Option<&str>,
    ) -> Result<(), ApiError> {
        let mut body = json!({
            "message": message,
            "content": STANDARD.encode(content.as_bytes()),
            "branch": branch,
        });
        if let Some(sha) = sha {
            body["sha"] = json!(sha);
        }

        let response = self
            .authorized(self.http.put(self.url(&format!("contents/{}", path))))
            .json(&body)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    /// Commit sha at the tip of `branch`.
    pub async fn branch_head(&self, branch: &str) -> Result<String, ApiError> {
        let response = self
            .authorized(self.http.get(self.url(&format!("git/ref/heads/{}", branch))))
            .send()
            .await?;
        let raw: RawRef = parse_json(response).await?;
        Ok(raw.object.sha)
    }

    /// Create `branch` pointing at `sha`. A conflict means it already exists.
    pub async fn create_branch(&self, branch: &str, sha: &str) -> Result<BranchCreation, ApiError> {
        let response = self
            .authorized(self.http.post(self.url("git/refs")))
            .json(&json!({
                "ref": format!("refs/heads/{}", branch),
                "sha": sha,
            }))
            .send()
            .await?;

        match check_status(response).await {
            Ok(_) => Ok(BranchCreation::Created),
            Err(e)
                if matches!(
                    e.status(),
                    Some(StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY)
                ) =>
            {
                Ok(BranchCreation::AlreadyExists)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn create_pull_request(
        &self,
        head: &str,
        base: &str,
        title: &str,
        body: &str,
    ) -> Result<PullRequest, ApiError> {
        let response = self
            .authorized(self.http.post(self.url("pulls")))
            .json(&json!({
                "title": title,
                "head": head,
                "base": base,
                "body": body,
            }))
            .send()
            .await?;
        parse_json(response).await
    }
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await?;
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|e| e.message)
        .unwrap_or(text);
    Err(ApiError::Status { status, message })
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let response = check_status(response).await?;
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
}

/// File content comes back as base64 wrapped at 60 columns.
fn decode_content(encoded: &str) -> Result<String, ApiError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| ApiError::Decode(format!("invalid base64 content: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| ApiError::Decode(format!("content is not UTF-8: {}", e)))
}
