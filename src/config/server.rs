use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use chrono::TimeDelta;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::github::{DEFAULT_API_URL, DEFAULT_OAUTH_URL};
use crate::google::DEFAULT_TOKENINFO_URL;

pub const DEFAULT_TOKEN_TTL_DAYS: i64 = 30;
pub const MAX_TOKEN_TTL_DAYS: i64 = 3650;

/// OAuth app credentials for "Sign in with GitHub".
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GitHubOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Public base URL for external access (e.g., "https://blog.example.com").
    /// Used for image download URLs. If not set, URLs are derived from request headers.
    pub public_base_url: Option<String>,
    pub github_api_url: String,
    pub github_oauth_url: String,
    pub github_oauth: Option<GitHubOAuthConfig>,
    /// OAuth client id that Google ID tokens must be issued to. Google
    /// sign-in is disabled when unset.
    pub google_client_id: Option<String>,
    pub google_tokeninfo_url: String,
    /// Session token lifetime; `None` means tokens never expire.
    pub token_ttl_days: Option<i64>,
}

impl ServerConfig {
    /// Reads a TOML config file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.token_ttl()?;
        Ok(config)
    }

    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("archilog.db")
    }

    #[must_use]
    pub fn images_dir(&self) -> PathBuf {
        self.data_dir.join("images")
    }

    /// Session token lifetime. Must be between one day and
    /// [`MAX_TOKEN_TTL_DAYS`].
    pub fn token_ttl(&self) -> Result<Option<TimeDelta>> {
        let Some(days) = self.token_ttl_days else {
            return Ok(None);
        };
        if !(1..=MAX_TOKEN_TTL_DAYS).contains(&days) {
            return Err(Error::Config(format!(
                "token_ttl_days must be between 1 and {MAX_TOKEN_TTL_DAYS}, got {days}"
            )));
        }
        TimeDelta::try_days(days)
            .map(Some)
            .ok_or_else(|| Error::Config(format!("token_ttl_days out of range: {days}")))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            public_base_url: None,
            github_api_url: DEFAULT_API_URL.to_string(),
            github_oauth_url: DEFAULT_OAUTH_URL.to_string(),
            github_oauth: None,
            google_client_id: None,
            google_tokeninfo_url: DEFAULT_TOKENINFO_URL.to_string(),
            token_ttl_days: Some(DEFAULT_TOKEN_TTL_DAYS),
        }
    }
}
