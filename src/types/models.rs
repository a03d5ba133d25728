use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::keyed::{self, Keyed};

/// A registered user, stored at `users/{username}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    pub email: String,
    /// Epoch millis.
    pub created_at: i64,
    /// Identity-provider uid of the account that owns this namespace.
    pub user_id: String,
    #[serde(default)]
    pub resume: String,
}

/// What anyone may see about a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub username: String,
    pub resume: String,
    pub created_at: i64,
}

impl From<User> for PublicProfile {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            resume: user.resume,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Generated by the store; not part of the stored record.
    #[serde(default)]
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub author_id: String,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(
        default,
        deserialize_with = "keyed::deserialize",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub comments: Vec<Comment>,
}

impl Keyed for Post {
    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(default)]
    pub id: String,
    pub content: String,
    pub author_id: String,
    pub created_at: i64,
}

impl Keyed for Comment {
    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default)]
    pub id: String,
    /// Owner handle, used for routing and display.
    pub username: String,
    /// Owner uid, used for authorization.
    pub owner_id: String,
    pub repo_url: String,
    #[serde(default)]
    pub custom_description: String,
    pub repo_info: RepoInfo,
    pub created_at: i64,
}

impl Keyed for Project {
    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

/// Snapshot of GitHub repository metadata. Field names follow the GitHub
/// REST API so responses deserialize directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoInfo {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing)]
    pub fork: bool,
}
