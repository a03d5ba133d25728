use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::Post;

/// Filters for a user's post listing. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostQuery {
    /// Exact tag match.
    pub tag: Option<String>,
    /// Case-insensitive substring of the title or content.
    pub term: Option<String>,
}

impl PostQuery {
    #[must_use]
    pub fn matches(&self, post: &Post) -> bool {
        if let Some(tag) = self.tag.as_deref().filter(|t| !t.is_empty()) {
            if !post.tags.iter().any(|t| t == tag) {
                return false;
            }
        }

        match self.term.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            Some(term) => {
                let term = term.to_lowercase();
                post.title.to_lowercase().contains(&term)
                    || post.content.to_lowercase().contains(&term)
            }
            None => true,
        }
    }

    /// Matching posts, newest first.
    #[must_use]
    pub fn apply(&self, posts: Vec<Post>) -> Vec<Post> {
        let mut matched: Vec<Post> = posts.into_iter().filter(|p| self.matches(p)).collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matched
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

/// How often each tag is used, most used first, then alphabetically.
#[must_use]
pub fn tag_summary(posts: &[Post]) -> Vec<TagCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for tag in posts.iter().flat_map(|p| p.tags.iter()) {
        *counts.entry(tag.as_str()).or_default() += 1;
    }

    let mut summary: Vec<TagCount> = counts
        .into_iter()
        .map(|(tag, count)| TagCount {
            tag: tag.to_string(),
            count,
        })
        .collect();
    summary.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
    summary
}
