use crate::error::FetchError;
use crate::github::GitHubClient;
use crate::models::{Commit, RawCommit};

/// Fetch the last `count` commits on `branch`, newest first.
pub async fn fetch_commits(
    client: &GitHubClient,
    branch: &str,
    count: usize,
) -> Result<Vec<Commit>, FetchError> {
    let raw = client
        .list_commits(branch, count)
        .await
        .map_err(|source| FetchError::Commits {
            branch: branch.to_string(),
            source,
        })?;

    let listed = raw.len();
    let mut commits: Vec<Commit> = raw.into_iter().filter_map(project_commit).collect();
    // Stable, so API order survives for commits sharing a timestamp.
    commits.sort_by(|a, b| b.date.cmp(&a.date));

    let skipped = listed - commits.len();
    if skipped > 0 {
        tracing::info!(
            "Fetched {} commits from {} ({} skipped without a date)",
            commits.len(),
            branch,
            skipped
        );
    } else {
        tracing::info!("Fetched {} commits from {}", commits.len(), branch);
    }
    Ok(commits)
}

/// Project a raw API commit; commits with neither an author nor committer date are skipped.
fn project_commit(raw: RawCommit) -> Option<Commit> {
    let detail = raw.commit;
    let date = detail
        .author
        .as_ref()
        .and_then(|a| a.date)
        .or_else(|| detail.committer.as_ref().and_then(|c| c.date));

    let Some(date) = date else {
        tracing::warn!("Commit {} has no date, skipping", raw.sha);
        return None;
    };

    let author = detail
        .author
        .and_then(|a| a.name)
        .unwrap_or_else(|| "unknown".to_string());
    let message = detail.message.lines().next().unwrap_or("").trim().to_string();

    Some(Commit {
        sha: raw.sha,
        message,
        date,
        author,
    })
}
