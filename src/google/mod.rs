//! Google sign-in: ID tokens are checked against Google's `tokeninfo`
//! endpoint, and only the claims it returns are trusted.

use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::types::{AuthProvider, OAuthProfile};

pub const DEFAULT_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

const ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Claims of a verified ID token. `tokeninfo` encodes booleans and numbers
/// as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleClaims {
    pub iss: String,
    pub aud: String,
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub exp: Option<String>,
}

impl GoogleClaims {
    fn check(&self, client_id: &str) -> Result<()> {
        if self.aud != client_id {
            tracing::warn!("Google ID token issued for another client: {}", self.aud);
            return Err(Error::Unauthenticated);
        }
        if !ISSUERS.contains(&self.iss.as_str()) {
            tracing::warn!("Google ID token from unexpected issuer: {}", self.iss);
            return Err(Error::Unauthenticated);
        }
        if let Some(exp) = &self.exp {
            let exp: i64 = exp.parse().map_err(|_| Error::Unauthenticated)?;
            if exp < Utc::now().timestamp() {
                return Err(Error::Unauthenticated);
            }
        }
        if self.sub.trim().is_empty() {
            return Err(Error::Unauthenticated);
        }
        Ok(())
    }

    /// Only a verified email is usable for the account.
    pub fn into_profile(self) -> Result<OAuthProfile> {
        let email = match (self.email, self.email_verified.as_deref()) {
            (Some(email), Some("true")) => email,
            _ => return Err(Error::invalid("Google account has no verified email")),
        };
        Ok(OAuthProfile {
            provider: AuthProvider::Google,
            provider_id: self.sub,
            display_name: self.name,
            email,
        })
    }
}

#[derive(Clone)]
pub struct GoogleVerifier {
    client: Client,
    tokeninfo_url: String,
    client_id: Option<String>,
}

fn upstream(e: reqwest::Error) -> Error {
    Error::Upstream(format!("Google request failed: {e}"))
}

impl GoogleVerifier {
    pub fn new(tokeninfo_url: &str, client_id: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("archilog")
            .build()
            .map_err(upstream)?;

        Ok(Self {
            client,
            tokeninfo_url: tokeninfo_url.to_string(),
            client_id,
        })
    }

    /// Asks Google whether `id_token` is genuine and issued to this app.
    pub async fn verify(&self, id_token: &str) -> Result<GoogleClaims> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or_else(|| Error::Config("Google sign-in is not configured".into()))?;
        if id_token.trim().is_empty() {
            return Err(Error::Unauthenticated);
        }

        let resp = self
            .client
            .get(&self.tokeninfo_url)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(upstream)?;

        let status = resp.status();
        if status.is_server_error() {
            return Err(Error::Upstream(format!("Google tokeninfo returned {status}")));
        }
        if !status.is_success() {
            tracing::warn!("Google rejected an ID token: {status}");
            return Err(Error::Unauthenticated);
        }

        let claims: GoogleClaims = resp.json().await.map_err(upstream)?;
        claims.check(client_id)?;
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, extract::Query, http::StatusCode, routing::get};
    use serde_json::{Value, json};
    use std::collections::HashMap;

    async fn fake_google() -> String {
        let app = Router::new().route(
            "/tokeninfo",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                let aud = match q.get("id_token").map(String::as_str) {
                    Some("good") => "client-1",
                    Some("other-app") => "client-2",
                    _ => return Err(StatusCode::BAD_REQUEST),
                };
                Ok::<_, StatusCode>(Json(json!({
                    "iss": "https://accounts.google.com",
                    "aud": aud,
                    "sub": "1029384756",
                    "email": "minji@example.com",
                    "email_verified": "true",
                    "name": "Minji",
                    "exp": (Utc::now().timestamp() + 600).to_string(),
                })))
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}/tokeninfo")
    }

    fn claims(value: Value) -> GoogleClaims {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_verify_accepts_token_for_this_client() {
        let url = fake_google().await;
        let verifier = GoogleVerifier::new(&url, Some("client-1".into())).unwrap();

        let profile = verifier.verify("good").await.unwrap().into_profile().unwrap();
        assert_eq!(profile.provider_id, "1029384756");
        assert_eq!(profile.email, "minji@example.com");
    }

    #[tokio::test]
    async fn test_verify_rejects_forged_and_foreign_tokens() {
        let url = fake_google().await;
        let verifier = GoogleVerifier::new(&url, Some("client-1".into())).unwrap();

        assert!(matches!(
            verifier.verify("forged").await,
            Err(Error::Unauthenticated)
        ));
        assert!(matches!(
            verifier.verify("other-app").await,
            Err(Error::Unauthenticated)
        ));
        assert!(matches!(verifier.verify("").await, Err(Error::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_verify_requires_client_id() {
        let verifier = GoogleVerifier::new(DEFAULT_TOKENINFO_URL, None).unwrap();
        assert!(matches!(
            verifier.verify("good").await,
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_expired_claims_rejected() {
        let expired = claims(json!({
            "iss": "accounts.google.com",
            "aud": "client-1",
            "sub": "1",
            "exp": "1000",
        }));
        assert!(matches!(expired.check("client-1"), Err(Error::Unauthenticated)));
    }

    #[test]
    fn test_unverified_email_is_unusable() {
        let unverified = claims(json!({
            "iss": "accounts.google.com",
            "aud": "client-1",
            "sub": "1",
            "email": "someone@example.com",
            "email_verified": "false",
        }));
        assert!(matches!(
            unverified.into_profile(),
            Err(Error::InvalidInput(_))
        ));
    }
}
