use std::sync::OnceLock;

use regex::Regex;

use crate::models::MergeOutcome;

pub fn changelog_header(repo_name: &str) -> String {
    format!("## {} - Changelog\n\n", repo_name)
}

fn heading_range() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"###\s+(\d{2}\.\d{2}\.\d{4} - \d{2}\.\d{2}\.\d{4})")
            .expect("heading pattern is valid")
    })
}

/// The key an entry is deduplicated on: its date range, or the whole heading line if it has none.
pub fn entry_key(entry: &str) -> String {
    if let Some(range) = heading_range().captures(entry).and_then(|c| c.get(1)) {
        return range.as_str().to_string();
    }
    entry.lines().next().unwrap_or("").trim().to_string()
}

/// Splice `entry` in as the newest block of the changelog for `repo_name`.
///
/// Duplicate detection is a plain substring test on the entry key, so a
/// matching date range anywhere in the document suppresses insertion.
pub fn merge_changelog(entry: &str, repo_name: &str, existing: &str) -> MergeOutcome {
    let key = entry_key(entry);
    if !key.is_empty() && existing.contains(&key) {
        tracing::info!("Changelog already contains an entry for {}", key);
        return MergeOutcome {
            content: existing.to_string(),
            has_changes: false,
        };
    }

    let header = changelog_header(repo_name);
    let content = match existing.find(&header) {
        Some(idx) => {
            let (head, rest) = existing.split_at(idx + header.len());
            // Header-only document: same shape as the empty-document case, no trailing separator.
            if rest.is_empty() {
                format!("{}{}", head, entry)
            } else {
                format!("{}{}\n\n{}", head, entry, rest)
            }
        }
        None => {
            if !existing.trim().is_empty() {
                tracing::warn!("Existing changelog has no '{}' header, replacing it", header.trim());
            }
            format!("{}{}", header, entry)
        }
    };

    MergeOutcome {
        content,
        has_changes: true,
    }
}
