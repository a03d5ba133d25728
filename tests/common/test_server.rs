use std::path::Path;
use std::sync::Arc;

use archilog::config::{GitHubOAuthConfig, ServerConfig};
use archilog::server::{AppState, create_router};
use archilog::store::{SqliteStore, Store};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::task::JoinHandle;

use super::{fake_github, fake_google};

/// An in-process server with its own data directory, fake GitHub and
/// fake Google.
pub struct TestServer {
    pub temp_dir: TempDir,
    pub base_url: String,
    pub github_url: String,
    client: Client,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let github_url = fake_github::start().await;
        let tokeninfo_url = fake_google::start().await;

        let config = ServerConfig {
            data_dir: temp_dir.path().to_path_buf(),
            public_base_url: Some("https://blog.example.com".to_string()),
            github_api_url: github_url.clone(),
            github_oauth_url: github_url.clone(),
            github_oauth: Some(GitHubOAuthConfig {
                client_id: "test-client".to_string(),
                client_secret: "test-secret".to_string(),
            }),
            google_client_id: Some(fake_google::CLIENT_ID.to_string()),
            google_tokeninfo_url: tokeninfo_url,
            ..ServerConfig::default()
        };

        let store = SqliteStore::new(config.db_path()).expect("open store");
        store.initialize().expect("initialize store");
        let state = AppState::new(Arc::new(store), &config).expect("build state");
        let app = create_router(Arc::new(state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        Self {
            temp_dir,
            base_url: format!("http://{addr}"),
            github_url,
            client: Client::new(),
            handle,
        }
    }

    pub fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path))
    }

    pub fn put(&self, path: &str) -> RequestBuilder {
        self.client.put(self.url(path))
    }

    pub fn patch(&self, path: &str) -> RequestBuilder {
        self.client.patch(self.url(path))
    }

    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.client.delete(self.url(path))
    }

    /// Registers `username` with a derived email and returns its bearer token.
    pub async fn register(&self, username: &str) -> String {
        let resp = self
            .post("/auth/register")
            .json(&json!({
                "email": format!("{username}@example.com"),
                "password": "correct-horse",
                "username": username,
            }))
            .send()
            .await
            .expect("register");
        assert_eq!(resp.status(), 201, "register {username}");

        let body: Value = resp.json().await.expect("parse register response");
        body["data"]["token"]
            .as_str()
            .expect("token in register response")
            .to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Reads the `data` field of an API envelope.
pub async fn data(resp: Response) -> Value {
    let body: Value = resp.json().await.expect("parse response body");
    body["data"].clone()
}

/// Reads the `error` field of an API envelope.
pub async fn error(resp: Response) -> String {
    let body: Value = resp.json().await.expect("parse response body");
    body["error"].as_str().unwrap_or_default().to_string()
}
