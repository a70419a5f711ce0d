use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::error::GenerationError;
use crate::model::GeminiClient;
use crate::models::Commit;

pub const HEADING_MARKER: &str = "###";
const DATE_FORMAT: &str = "%d.%m.%Y";

pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// `- <date>: <message> (<short sha>)` per commit, in the given order.
pub fn format_commit_list(commits: &[Commit]) -> String {
    commits
        .iter()
        .map(|c| format!("- {}: {} ({})", format_date(&c.date), c.message, c.short_sha()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `<oldest> - <newest>`, independent of the order commits are passed in.
pub fn date_range(commits: &[Commit]) -> Option<String> {
    let oldest = commits.iter().map(|c| c.date).min()?;
    let newest = commits.iter().map(|c| c.date).max()?;
    Some(format!("{} - {}", format_date(&oldest), format_date(&newest)))
}

pub fn build_prompt(repo_name: &str, commit_list: &str, date_range: &str, language: &str) -> String {
    format!(
        "You maintain the changelog of the repository \"{repo_name}\".\n\
         Summarize the following commits into one changelog entry written in {language}.\n\
         \n\
         Rules:\n\
         - Group related commits into a single bullet point.\n\
         - Write short, user-facing sentences that describe what changed, not how.\n\
         - Skip trivial changes such as typo fixes, formatting, merges or version bumps.\n\
         - Output only the entry: first the heading line \"{HEADING_MARKER} {date_range}\", \
         then one bullet line per change, each starting with \"- \".\n\
         - Do not mention the repository name and do not add any other headings or text.\n\
         \n\
         Commits:\n\
         {commit_list}\n"
    )
}

fn excess_newlines() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("newline pattern is valid"))
}

/// Trim the model output, make sure it opens with a heading, and collapse runs of blank lines.
pub fn normalize_entry(raw: &str, date_range: &str) -> String {
    let trimmed = raw.trim();
    let with_heading = if trimmed.starts_with(HEADING_MARKER) {
        trimmed.to_string()
    } else {
        format!("{} {}\n\n{}", HEADING_MARKER, date_range, trimmed)
    };
    excess_newlines()
        .replace_all(&with_heading, "\n\n")
        .trim_end()
        .to_string()
}

/// Turn a batch of commits into a single changelog entry.
pub async fn summarize(
    model: &GeminiClient,
    commits: &[Commit],
    repo_name: &str,
    language: &str,
) -> Result<String, GenerationError> {
    let range = date_range(commits).ok_or(GenerationError::NoCommits)?;
    if !model.has_credential() {
        return Err(GenerationError::MissingApiKey);
    }

    let prompt = build_prompt(repo_name, &format_commit_list(commits), &range, language);
    tracing::debug!("Prompt:\n{}", prompt);

    tracing::info!("Generating changelog entry for {} ({} commits)", range, commits.len());
    let raw = model.generate(&prompt).await?;
    Ok(normalize_entry(&raw, &range))
}
