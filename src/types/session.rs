use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The authenticated caller, passed explicitly into every repository call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub uid: String,
    pub display_name: Option<String>,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Password,
    GitHub,
    Google,
}

/// An identity-provider account, stored at `accounts/{uid}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// argon2id PHC string; absent for OAuth-only accounts.
    #[serde(default)]
    pub password_hash: Option<String>,
    pub provider: AuthProvider,
    pub created_at: DateTime<Utc>,
}

impl Account {
    #[must_use]
    pub fn session(&self) -> Session {
        Session {
            uid: self.uid.clone(),
            display_name: self.display_name.clone(),
            email: self.email.clone(),
        }
    }
}

/// A bearer token issued at sign-in, stored at `sessions/{lookup}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionToken {
    pub id: String,
    pub token_hash: String,
    pub token_lookup: String,
    pub uid: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Profile handed over by an OAuth provider after a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthProfile {
    pub provider: AuthProvider,
    /// Provider-side account id, stable across logins.
    pub provider_id: String,
    pub display_name: Option<String>,
    pub email: String,
}
