mod server;

pub use server::{DEFAULT_TOKEN_TTL_DAYS, GitHubOAuthConfig, MAX_TOKEN_TTL_DAYS, ServerConfig};
