use crate::error::{Error, Result};

pub const MAX_USERNAME_LEN: usize = 39;
pub const MAX_TAGS: usize = 10;
const MAX_TAG_LEN: usize = 50;
const MAX_TITLE_LEN: usize = 200;
const MIN_PASSWORD_LEN: usize = 6;

fn is_valid_username_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Usernames double as store keys and URL segments.
pub fn validate_username(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid("Username cannot be empty"));
    }
    if name.len() > MAX_USERNAME_LEN {
        return Err(Error::invalid(format!(
            "Username cannot exceed {MAX_USERNAME_LEN} characters"
        )));
    }
    if !name.chars().all(is_valid_username_char) {
        return Err(Error::invalid(
            "Username can only contain alphanumeric characters, hyphens, and underscores",
        ));
    }
    if name.starts_with('-') || name.starts_with('_') {
        return Err(Error::invalid(
            "Username cannot start with a hyphen or underscore",
        ));
    }
    Ok(())
}

/// Shape check only: something@something.tld with no whitespace.
pub fn validate_email(email: &str) -> Result<()> {
    let invalid = || Error::invalid("Invalid email address");

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let (host, tld) = domain.rsplit_once('.').ok_or_else(invalid)?;
    if host.is_empty() || tld.is_empty() {
        return Err(invalid());
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::invalid(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::invalid("Title cannot be empty"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(Error::invalid(format!(
            "Title cannot exceed {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

/// Trims tags and drops empty ones, keeping order. At most [`MAX_TAGS`].
pub fn normalize_tags(tags: &[String]) -> Result<Vec<String>> {
    let tags: Vec<String> = tags
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    if tags.len() > MAX_TAGS {
        return Err(Error::invalid(format!(
            "A post can have at most {MAX_TAGS} tags"
        )));
    }
    if let Some(tag) = tags.iter().find(|t| t.chars().count() > MAX_TAG_LEN) {
        return Err(Error::invalid(format!(
            "Tag '{tag}' exceeds {MAX_TAG_LEN} characters"
        )));
    }
    Ok(tags)
}
