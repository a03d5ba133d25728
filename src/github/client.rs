use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode, header};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::config::GitHubOAuthConfig;
use crate::error::{Error, Result};
use crate::types::{AuthProvider, OAuthProfile, RepoInfo};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_OAUTH_URL: &str = "https://github.com";

const ACCEPT: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = "archilog";
const REPOS_PER_PAGE: u32 = 100;

/// The signed-in GitHub account, as returned by `GET /user`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubUser {
    pub id: u64,
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl GitHubUser {
    /// Accounts with a private email get GitHub's noreply address.
    #[must_use]
    pub fn into_profile(self) -> OAuthProfile {
        let email = self
            .email
            .unwrap_or_else(|| format!("{}@users.noreply.github.com", self.login));
        OAuthProfile {
            provider: AuthProvider::GitHub,
            provider_id: self.id.to_string(),
            display_name: Some(self.name.unwrap_or(self.login)),
            email,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    api_url: String,
    oauth_url: String,
    oauth: Option<GitHubOAuthConfig>,
}

fn upstream(e: reqwest::Error) -> Error {
    Error::Upstream(format!("GitHub request failed: {e}"))
}

impl GitHubClient {
    pub fn new(
        api_url: &str,
        oauth_url: &str,
        oauth: Option<GitHubOAuthConfig>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .map_err(upstream)?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            oauth_url: oauth_url.trim_end_matches('/').to_string(),
            oauth,
        })
    }

    fn api_get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(format!("{}{}", self.api_url, path))
            .header(header::ACCEPT, ACCEPT)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T> {
        let resp = request.send().await.map_err(upstream)?;
        let status = resp.status();

        if !status.is_success() {
            tracing::warn!("GitHub returned {status} for {what}");
            return Err(match status {
                StatusCode::UNAUTHORIZED => Error::Unauthenticated,
                s if s.is_server_error() => {
                    Error::Upstream(format!("GitHub returned {s} for {what}"))
                }
                _ => Error::not_found(what.to_string()),
            });
        }

        resp.json().await.map_err(upstream)
    }

    /// Live metadata for one repository. Any non-2xx answer is `NotFound`.
    pub async fn fetch_repo(&self, owner: &str, repo: &str) -> Result<RepoInfo> {
        let what = format!("GitHub repository {owner}/{repo}");
        let resp = self
            .api_get(&format!("/repos/{owner}/{repo}"))
            .send()
            .await
            .map_err(upstream)?;

        if !resp.status().is_success() {
            tracing::warn!("GitHub returned {} for {what}", resp.status());
            return Err(Error::not_found(what));
        }

        resp.json().await.map_err(upstream)
    }

    /// Public, non-fork repositories of `login`, most recently updated first.
    pub async fn list_user_repos(&self, login: &str) -> Result<Vec<RepoInfo>> {
        let request = self
            .api_get(&format!("/users/{}/repos", urlencoding::encode(login)))
            .query(&[("per_page", REPOS_PER_PAGE)]);
        let repos: Vec<RepoInfo> = self
            .send_json(request, &format!("GitHub user {login}"))
            .await?;

        let mut repos: Vec<RepoInfo> = repos.into_iter().filter(|r| !r.fork).collect();
        repos.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(repos)
    }

    /// Trades an OAuth authorization code for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<String> {
        let oauth = self
            .oauth
            .as_ref()
            .ok_or_else(|| Error::Config("GitHub OAuth is not configured".into()))?;

        let resp = self
            .client
            .post(format!("{}/login/oauth/access_token", self.oauth_url))
            .header(header::ACCEPT, "application/json")
            .json(&json!({
                "client_id": oauth.client_id,
                "client_secret": oauth.client_secret,
                "code": code,
            }))
            .send()
            .await
            .map_err(upstream)?;

        if !resp.status().is_success() {
            return Err(Error::Upstream(format!(
                "GitHub token exchange returned {}",
                resp.status()
            )));
        }

        let body: AccessTokenResponse = resp.json().await.map_err(upstream)?;
        match body.access_token {
            Some(token) => Ok(token),
            None => {
                let reason = body
                    .error_description
                    .or(body.error)
                    .unwrap_or_else(|| "no access token returned".into());
                tracing::warn!("GitHub OAuth code exchange failed: {reason}");
                Err(Error::Unauthenticated)
            }
        }
    }

    pub async fn fetch_user(&self, access_token: &str) -> Result<GitHubUser> {
        let request = self.api_get("/user").bearer_auth(access_token);
        self.send_json(request, "GitHub user").await
    }
}
