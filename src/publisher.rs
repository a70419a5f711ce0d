use chrono::NaiveDate;

use crate::error::PublishError;
use crate::github::GitHubClient;
use crate::models::{BranchCreation, PullRequest};

pub const PR_TITLE: &str = "docs: update changelog";

/// What gets published and where.
#[derive(Debug, Clone)]
pub struct Publication<'a> {
    pub content: &'a str,
    pub path: &'a str,
    pub target_branch: &'a str,
    pub date_range: &'a str,
    pub commit_count: usize,
}

pub fn branch_name(date: NaiveDate) -> String {
    format!("changelog/update-{}", date.format("%Y%m%d"))
}

pub fn pull_request_body(commit_count: usize, date_range: &str) -> String {
    format!(
        "This PR updates the changelog with a summary of the last {} commits ({}).\n\n\
         The entry was generated automatically; please review the wording before merging.",
        commit_count, date_range
    )
}

/// Create the update branch, write the changelog to it and open a PR into the target branch.
///
/// Nothing is rolled back on failure: a branch or file written before the
/// failing step stays in place.
pub async fn publish(
    client: &GitHubClient,
    publication: &Publication<'_>,
    today: NaiveDate,
) -> Result<PullRequest, PublishError> {
    let branch = branch_name(today);
    let target = publication.target_branch;

    let head = client
        .branch_head(target)
        .await
        .map_err(|source| PublishError::BranchHead {
            branch: target.to_string(),
            source,
        })?;

    match client.create_branch(&branch, &head).await {
        Ok(BranchCreation::Created) => tracing::info!("Created branch {} from {}", branch, target),
        Ok(BranchCreation::AlreadyExists) => tracing::info!("Branch {} already exists, reusing it", branch),
        Err(source) => return Err(PublishError::CreateBranch { branch, source }),
    }

    let write_err = |source| PublishError::WriteFile {
        path: publication.path.to_string(),
        source,
    };
    let current = client
        .get_file(publication.path, &branch)
        .await
        .map_err(write_err)?;
    let message = format!("{} for {}", PR_TITLE, publication.date_range);
    client
        .put_file(
            publication.path,
            &branch,
            publication.content,
            &message,
            current.as_ref().map(|f| f.sha.as_str()),
        )
        .await
        .map_err(write_err)?;
    tracing::info!(
        "{} {} on {}",
        if current.is_some() { "Updated" } else { "Created" },
        publication.path,
        branch
    );

    let pr = client
        .create_pull_request(
            &branch,
            target,
            PR_TITLE,
            &pull_request_body(publication.commit_count, publication.date_range),
        )
        .await
        .map_err(PublishError::PullRequest)?;
    tracing::info!("Opened pull request #{}: {}", pr.number, pr.html_url);

    Ok(pr)
}
