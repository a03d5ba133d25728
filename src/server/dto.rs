use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::SignedIn;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// A Google ID token from the browser sign-in flow.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleLoginRequest {
    pub id_token: String,
}

#[derive(Debug, Deserialize)]
pub struct OAuthCallbackParams {
    pub code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub uid: String,
    pub username: String,
    pub email: String,
}

impl From<SignedIn> for AuthResponse {
    fn from(signed_in: SignedIn) -> Self {
        Self {
            token: signed_in.token.token,
            expires_at: signed_in.token.expires_at,
            uid: signed_in.token.session.uid,
            username: signed_in.user.username,
            email: signed_in.user.email,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    /// None when the account has no user record yet.
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UsernameResponse {
    pub username: String,
    pub exists: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateResumeRequest {
    pub resume: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListPostsParams {
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePostRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
}

/// Returned when a record is created and only its generated id is new.
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub repo_url: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadImageRequest {
    /// Base64 bytes, optionally as a `data:` URL.
    pub data: String,
}

#[derive(Debug, Serialize)]
pub struct UploadImageResponse {
    pub name: String,
    pub url: String,
    pub markdown: String,
}
