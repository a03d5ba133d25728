use crate::validation::MAX_USERNAME_LEN;

const FALLBACK: &str = "user";

/// Derives a username candidate from an OAuth profile.
///
/// Display names written in a non-Latin script don't survive ASCII
/// sanitizing, so those fall back to the email local-part.
#[must_use]
pub fn synthesize(display_name: Option<&str>, email: &str) -> String {
    let source = match display_name.map(str::trim) {
        Some(name) if !name.is_empty() && !has_non_latin_letters(name) => name,
        _ => email.split('@').next().unwrap_or_default(),
    };

    let candidate = sanitize(source);
    if candidate.is_empty() {
        FALLBACK.to_string()
    } else {
        candidate
    }
}

/// The `n`th candidate for a base name: `base`, `base-2`, `base-3`, ...
#[must_use]
pub fn with_suffix(base: &str, n: u32) -> String {
    if n <= 1 {
        return base.to_string();
    }
    let suffix = format!("-{n}");
    let keep = MAX_USERNAME_LEN.saturating_sub(suffix.len()).min(base.len());
    format!("{}{suffix}", &base[..keep])
}

fn has_non_latin_letters(name: &str) -> bool {
    name.chars().any(|c| c.is_alphabetic() && !c.is_ascii())
}

fn sanitize(source: &str) -> String {
    let joined = source.split_whitespace().collect::<Vec<_>>().join("-");

    let cleaned: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();

    let trimmed = cleaned.trim_start_matches(['-', '_']);
    trimmed.chars().take(MAX_USERNAME_LEN).collect()
}
