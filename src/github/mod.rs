//! Read-only access to the GitHub REST API: repository metadata for
//! projects, bulk repository listings, and the OAuth login flow.

mod client;

pub use client::{DEFAULT_API_URL, DEFAULT_OAUTH_URL, GitHubClient, GitHubUser};

use crate::error::{Error, Result};

fn is_valid_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'
}

/// Extracts `(owner, repo)` from `https://github.com/{owner}/{repo}`.
///
/// A trailing slash and a `.git` suffix are tolerated; anything else is
/// `InvalidInput`.
pub fn parse_repo_url(url: &str) -> Result<(String, String)> {
    let invalid = || {
        Error::invalid(format!(
            "Invalid GitHub URL '{url}', expected https://github.com/{{owner}}/{{repo}}"
        ))
    };

    let rest = url
        .trim()
        .strip_prefix("https://github.com/")
        .ok_or_else(invalid)?;
    let rest = rest.trim_end_matches('/');

    let (owner, repo) = rest.split_once('/').ok_or_else(invalid)?;
    let repo = repo.strip_suffix(".git").unwrap_or(repo);

    let valid = |s: &str| !s.is_empty() && s != "." && s != ".." && s.chars().all(is_valid_name_char);
    if !valid(owner) || !valid(repo) {
        return Err(invalid());
    }

    Ok((owner.to_string(), repo.to_string()))
}
