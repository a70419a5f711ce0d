use chrono::{NaiveDate, Utc};

use crate::config::Config;
use crate::error::{FetchError, RunError};
use crate::fetcher::fetch_commits;
use crate::github::GitHubClient;
use crate::merger::merge_changelog;
use crate::model::GeminiClient;
use crate::models::PullRequest;
use crate::publisher::{publish, Publication};
use crate::summarizer::{date_range, summarize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The branch had no commits; nothing was generated.
    NoCommits,
    /// The changelog already has an entry for this date range.
    UpToDate,
    Published(PullRequest),
}

pub async fn run(config: &Config) -> Result<RunOutcome, RunError> {
    let github = GitHubClient::from_config(config);
    let model = GeminiClient::from_config(config);
    run_with(config, &github, &model, Utc::now().date_naive()).await
}

/// One pass: fetch, summarize, merge, publish. Each stage only starts once the previous one succeeded.
pub async fn run_with(
    config: &Config,
    github: &GitHubClient,
    model: &GeminiClient,
    today: NaiveDate,
) -> Result<RunOutcome, RunError> {
    tracing::info!(
        "Fetching last {} commits of {}/{}@{}",
        config.commit_count,
        config.owner,
        config.repo,
        config.target_branch
    );
    let commits = fetch_commits(github, &config.target_branch, config.commit_count).await?;
    let Some(range) = date_range(&commits) else {
        tracing::info!("No commits found, nothing to do");
        return Ok(RunOutcome::NoCommits);
    };

    let entry = summarize(model, &commits, &config.repo, &config.language).await?;
    tracing::info!("Generated changelog entry:\n{}", entry);

    let existing = github
        .get_file(&config.changelog_path, &config.target_branch)
        .await
        .map_err(|source| FetchError::File {
            path: config.changelog_path.clone(),
            source,
        })?
        .map(|f| f.content)
        .unwrap_or_default();

    let merged = merge_changelog(&entry, &config.repo, &existing);
    if !merged.has_changes {
        tracing::info!("Changelog is already up to date");
        return Ok(RunOutcome::UpToDate);
    }

    let publication = Publication {
        content: &merged.content,
        path: &config.changelog_path,
        target_branch: &config.target_branch,
        date_range: &range,
        commit_count: commits.len(),
    };
    let pr = publish(github, &publication, today).await?;
    Ok(RunOutcome::Published(pr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationError;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde_json::json;
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> Config {
        let uri = server.uri();
        Config::from_lookup(move |key| match key {
            "GITHUB_TOKEN" => Some("token".to_string()),
            "GEMINI_API_KEY" => Some("key".to_string()),
            "GITHUB_REPOSITORY" => Some("acme/widgets".to_string()),
            "GITHUB_API_URL" | "GEMINI_API_URL" => Some(uri.clone()),
            _ => None,
        })
        .unwrap()
    }

    fn clients(config: &Config) -> (GitHubClient, GeminiClient) {
        (GitHubClient::from_config(config), GeminiClient::from_config(config))
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()
    }

    async fn mount_commits(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/commits"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "sha": "bbbbbbbb", "commit": { "message": "fix bug", "author": { "name": "a", "date": "2024-01-07T10:00:00Z" } } },
                { "sha": "aaaaaaaa", "commit": { "message": "add feature", "author": { "name": "b", "date": "2024-01-01T10:00:00Z" } } }
            ])))
            .mount(server)
            .await;
    }

    async fn mount_model(server: &MockServer, text: &str) {
        Mock::given(method("POST"))
            .and(path_regex(r"^/v1beta/models/.*:generateContent$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": text }] } }]
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    async fn mount_main_changelog(server: &MockServer, content: &str) {
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/contents/CHANGELOG.md"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sha": "blob",
                "content": STANDARD.encode(content)
            })))
            .mount(server)
            .await;
    }

    async fn forbid(server: &MockServer, verb: &str) {
        Mock::given(method(verb))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_zero_commits_stops_before_any_other_stage() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/commits"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/contents/CHANGELOG.md"))
            .respond_with(ResponseTemplate::new(404))
            .expect(0)
            .mount(&server)
            .await;
        forbid(&server, "POST").await;
        forbid(&server, "PUT").await;

        let config = config(&server);
        let (github, model) = clients(&config);
        let outcome = run_with(&config, &github, &model, today()).await.unwrap();
        assert_eq!(outcome, RunOutcome::NoCommits);
    }

    #[tokio::test]
    async fn test_existing_range_is_up_to_date() {
        let server = MockServer::start().await;
        mount_commits(&server).await;
        mount_model(&server, "### 01.01.2024 - 07.01.2024\n- Added a feature").await;
        mount_main_changelog(
            &server,
            "## widgets - Changelog\n\n### 01.01.2024 - 07.01.2024\n- Added a feature\n",
        )
        .await;
        forbid(&server, "PUT").await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/repos/"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let config = config(&server);
        let (github, model) = clients(&config);
        let outcome = run_with(&config, &github, &model, today()).await.unwrap();
        assert_eq!(outcome, RunOutcome::UpToDate);
    }

    #[tokio::test]
    async fn test_full_run_publishes_pull_request() {
        let server = MockServer::start().await;
        mount_commits(&server).await;
        mount_model(&server, "- Added a feature\n- Fixed a bug").await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/contents/CHANGELOG.md"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/git/ref/heads/main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "object": { "sha": "head" } })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/acme/widgets/git/refs"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/repos/acme/widgets/contents/CHANGELOG.md"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/acme/widgets/pulls"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "number": 7,
                "html_url": "https://github.com/acme/widgets/pull/7"
            })))
            .mount(&server)
            .await;

        let config = config(&server);
        let (github, model) = clients(&config);
        let outcome = run_with(&config, &github, &model, today()).await.unwrap();
        assert_eq!(
            outcome,
            RunOutcome::Published(PullRequest {
                number: 7,
                html_url: "https://github.com/acme/widgets/pull/7".to_string(),
            })
        );

        let requests = server.received_requests().await.unwrap();
        let put = requests.iter().find(|r| r.method.as_str() == "PUT").unwrap();
        let body: serde_json::Value = serde_json::from_slice(&put.body).unwrap();
        assert_eq!(body["branch"], "changelog/update-20240108");
        let written = STANDARD.decode(body["content"].as_str().unwrap()).unwrap();
        assert_eq!(
            String::from_utf8(written).unwrap(),
            "## widgets - Changelog\n\n### 01.01.2024 - 07.01.2024\n\n- Added a feature\n- Fixed a bug"
        );
    }

    #[tokio::test]
    async fn test_changelog_read_failure_aborts_run() {
        let server = MockServer::start().await;
        mount_commits(&server).await;
        mount_model(&server, "- Added a feature").await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/contents/CHANGELOG.md"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({ "message": "Server Error" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/repos/"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;
        forbid(&server, "PUT").await;

        let config = config(&server);
        let (github, model) = clients(&config);
        let err = run_with(&config, &github, &model, today()).await.unwrap_err();
        let RunError::Fetch(FetchError::File { path: file, source }) = err else {
            panic!("expected changelog read error");
        };
        assert_eq!(file, "CHANGELOG.md");
        assert_eq!(source.status().map(|s| s.as_u16()), Some(500));
    }

    #[tokio::test]
    async fn test_model_failure_aborts_run() {
        let server = MockServer::start().await;
        mount_commits(&server).await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/v1beta/"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;
        forbid(&server, "PUT").await;

        let config = config(&server);
        let (github, model) = clients(&config);
        let err = run_with(&config, &github, &model, today()).await.unwrap_err();
        assert!(matches!(err, RunError::Generation(GenerationError::Api(_))));
    }
}
