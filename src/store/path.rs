use crate::error::{Error, Result};

const MAX_SEGMENT_LEN: usize = 768;
const INVALID_CHARS: &[char] = &['.', '#', '$', '[', ']', '/'];

/// Normalizes a slash-delimited store path: trims, collapses repeated
/// slashes, and validates every segment. The result has no leading or
/// trailing slash.
pub fn normalize_path(path: &str) -> Result<String> {
    let path = path.trim();

    if path.is_empty() {
        return Err(Error::invalid("Path cannot be empty"));
    }

    let segments: Vec<&str> = path
        .trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    if segments.is_empty() {
        return Err(Error::invalid("Path cannot be empty"));
    }

    for segment in &segments {
        validate_segment(segment)?;
    }

    Ok(segments.join("/"))
}

pub fn validate_segment(segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(Error::invalid("Path segment cannot be empty"));
    }

    if segment.len() > MAX_SEGMENT_LEN {
        return Err(Error::invalid(format!(
            "Path segment cannot exceed {MAX_SEGMENT_LEN} bytes"
        )));
    }

    if segment
        .chars()
        .any(|c| c.is_control() || INVALID_CHARS.contains(&c))
    {
        return Err(Error::invalid(format!(
            "Path segment '{segment}' contains invalid characters"
        )));
    }

    Ok(())
}

/// Joins a normalized base path and a single child key.
pub fn child(base: &str, key: &str) -> Result<String> {
    validate_segment(key)?;
    Ok(format!("{base}/{key}"))
}

pub fn users() -> String {
    "users".to_string()
}

pub fn user(username: &str) -> Result<String> {
    child("users", username)
}

pub fn resume(username: &str) -> Result<String> {
    Ok(format!("{}/resume", user(username)?))
}

pub fn posts(username: &str) -> Result<String> {
    Ok(format!("{}/posts", user(username)?))
}

pub fn post(username: &str, post_id: &str) -> Result<String> {
    child(&posts(username)?, post_id)
}

pub fn comments(username: &str, post_id: &str) -> Result<String> {
    Ok(format!("{}/comments", post(username, post_id)?))
}

pub fn comment(username: &str, post_id: &str, comment_id: &str) -> Result<String> {
    child(&comments(username, post_id)?, comment_id)
}

pub fn projects(username: &str) -> Result<String> {
    Ok(format!("{}/projects", user(username)?))
}

pub fn project(username: &str, project_id: &str) -> Result<String> {
    child(&projects(username)?, project_id)
}

/// Maps an identity-provider uid to the username that owns it.
pub fn uid_index(uid: &str) -> Result<String> {
    child("uids", uid)
}

pub fn account(uid: &str) -> Result<String> {
    child("accounts", uid)
}

/// Accounts by email; `email_key` is a hash since emails contain '.'.
pub fn account_email(email_key: &str) -> Result<String> {
    child("account_emails", email_key)
}

pub fn session(lookup: &str) -> Result<String> {
    child("sessions", lookup)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_basic() {
        assert_eq!(normalize_path("users").unwrap(), "users");
        assert_eq!(normalize_path("/users").unwrap(), "users");
        assert_eq!(normalize_path("users/").unwrap(), "users");
        assert_eq!(normalize_path("/users/alice/").unwrap(), "users/alice");
    }

    #[test]
    fn test_normalize_path_collapses_slashes() {
        assert_eq!(
            normalize_path("//users//alice//posts").unwrap(),
            "users/alice/posts"
        );
    }

    #[test]
    fn test_normalize_path_empty_error() {
        assert!(normalize_path("").is_err());
        assert!(normalize_path("/").is_err());
        assert!(normalize_path("//").is_err());
    }

    #[test]
    fn test_invalid_key_characters() {
        assert!(normalize_path("users/a.b").is_err());
        assert!(normalize_path("users/a#b").is_err());
        assert!(normalize_path("users/a$b").is_err());
        assert!(normalize_path("users/[x]").is_err());
        assert!(normalize_path("users/a\nb").is_err());
    }

    #[test]
    fn test_builders_reject_embedded_slash() {
        assert!(post("alice", "abc/../../bob").is_err());
        assert!(user("").is_err());
        assert_eq!(
            comment("alice", "p1", "c1").unwrap(),
            "users/alice/posts/p1/comments/c1"
        );
        assert_eq!(project("alice", "x").unwrap(), "users/alice/projects/x");
    }
}
