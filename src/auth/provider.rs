use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::token::{SecretHasher, TokenGenerator, parse_token};
use crate::error::{Error, Result};
use crate::store::{Store, path};
use crate::types::{Account, AuthProvider, OAuthProfile, Session, SessionToken};
use crate::validation::{validate_email, validate_password};

/// A bearer token handed to the client, together with who it belongs to.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub session: Session,
    pub expires_at: Option<DateTime<Utc>>,
}

/// The identity provider seam: accounts, sign-in, and session tokens.
pub trait IdentityProvider: Send + Sync {
    fn email_in_use(&self, email: &str) -> Result<bool>;

    /// Creates a password account. `Conflict` if the email is taken.
    fn create_account(&self, email: &str, password: &str) -> Result<Account>;

    fn get_account(&self, uid: &str) -> Result<Option<Account>>;

    fn delete_account(&self, uid: &str) -> Result<bool>;

    fn set_display_name(&self, uid: &str, display_name: &str) -> Result<()>;

    /// Email/password sign-in. `Unauthenticated` on bad credentials.
    fn sign_in(&self, email: &str, password: &str) -> Result<IssuedToken>;

    /// Finds or creates the account linked to an OAuth profile.
    fn link_oauth_account(&self, profile: &OAuthProfile) -> Result<Account>;

    fn issue_token(&self, account: &Account) -> Result<IssuedToken>;

    /// Resolves a raw bearer token to its session.
    fn verify_token(&self, raw_token: &str) -> Result<Session>;

    fn revoke_token(&self, raw_token: &str) -> Result<bool>;
}

/// Identity provider that keeps its accounts and sessions in the tree store.
pub struct LocalIdentityProvider {
    store: Arc<dyn Store>,
    tokens: TokenGenerator,
    passwords: SecretHasher,
    token_ttl: Option<Duration>,
}

fn email_key(email: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.trim().to_lowercase().as_bytes());
    hex::encode(hasher.finalize())
}

fn oauth_uid(profile: &OAuthProfile) -> String {
    let provider = match profile.provider {
        AuthProvider::Password => "password",
        AuthProvider::GitHub => "github",
        AuthProvider::Google => "google",
    };
    format!("{provider}-{}", profile.provider_id)
}

impl LocalIdentityProvider {
    pub fn new(store: Arc<dyn Store>, token_ttl: Option<Duration>) -> Result<Self> {
        Ok(Self {
            store,
            tokens: TokenGenerator::new()?,
            passwords: SecretHasher::for_passwords(),
            token_ttl,
        })
    }

    fn uid_for_email(&self, email: &str) -> Result<Option<String>> {
        let value = self
            .store
            .get(&path::account_email(&email_key(email))?)?;
        Ok(value.and_then(|v| v.as_str().map(str::to_string)))
    }

    fn insert_account(&self, account: &Account) -> Result<()> {
        let index = path::account_email(&email_key(&account.email))?;
        if !self.store.insert_if_absent(&index, &json!(account.uid))? {
            return Err(Error::conflict("Email already in use"));
        }

        let record = serde_json::to_value(account)?;
        if let Err(e) = self.store.set(&path::account(&account.uid)?, &record) {
            self.store.remove(&index)?;
            return Err(e);
        }
        Ok(())
    }

    fn load_token(&self, raw_token: &str) -> Result<SessionToken> {
        let (lookup, _secret) = parse_token(raw_token).map_err(|_| Error::Unauthenticated)?;

        let value = self
            .store
            .get(&path::session(&lookup)?)?
            .ok_or(Error::Unauthenticated)?;
        let token: SessionToken = serde_json::from_value(value)?;

        if !self.tokens.verify(raw_token, &token.token_hash)? {
            return Err(Error::Unauthenticated);
        }
        Ok(token)
    }
}

impl IdentityProvider for LocalIdentityProvider {
    fn email_in_use(&self, email: &str) -> Result<bool> {
        Ok(self.uid_for_email(email)?.is_some())
    }

    fn create_account(&self, email: &str, password: &str) -> Result<Account> {
        validate_email(email)?;
        validate_password(password)?;

        let account = Account {
            uid: Uuid::new_v4().simple().to_string(),
            email: email.trim().to_string(),
            display_name: None,
            password_hash: Some(self.passwords.hash(password)?),
            provider: AuthProvider::Password,
            created_at: Utc::now(),
        };
        self.insert_account(&account)?;

        tracing::info!("Created account {}", account.uid);
        Ok(account)
    }

    fn get_account(&self, uid: &str) -> Result<Option<Account>> {
        self.store
            .get(&path::account(uid)?)?
            .map(serde_json::from_value)
            .transpose()
            .map_err(Error::from)
    }

    fn delete_account(&self, uid: &str) -> Result<bool> {
        let Some(account) = self.get_account(uid)? else {
            return Ok(false);
        };
        self.store
            .remove(&path::account_email(&email_key(&account.email))?)?;
        self.store.remove(&path::account(uid)?)
    }

    fn set_display_name(&self, uid: &str, display_name: &str) -> Result<()> {
        let account_path = path::account(uid)?;
        if !self.store.exists(&account_path)? {
            return Err(Error::not_found("Account not found"));
        }

        let mut fields = Map::new();
        fields.insert("displayName".into(), Value::from(display_name));
        self.store.update(&account_path, &fields)
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<IssuedToken> {
        let uid = self.uid_for_email(email)?.ok_or(Error::Unauthenticated)?;
        let account = self.get_account(&uid)?.ok_or(Error::Unauthenticated)?;

        let hash = account
            .password_hash
            .as_deref()
            .ok_or(Error::Unauthenticated)?;
        if !self.passwords.verify(password, hash)? {
            return Err(Error::Unauthenticated);
        }

        self.issue_token(&account)
    }

    fn link_oauth_account(&self, profile: &OAuthProfile) -> Result<Account> {
        let uid = oauth_uid(profile);
        path::validate_segment(&uid)?;

        if let Some(account) = self.get_account(&uid)? {
            return Ok(account);
        }

        let account = Account {
            uid,
            email: profile.email.trim().to_string(),
            display_name: None,
            password_hash: None,
            provider: profile.provider,
            created_at: Utc::now(),
        };
        self.insert_account(&account)?;

        tracing::info!("Linked {:?} account {}", profile.provider, account.uid);
        Ok(account)
    }

    fn issue_token(&self, account: &Account) -> Result<IssuedToken> {
        let (raw_token, lookup, hash) = self.tokens.generate()?;
        let now = Utc::now();
        let expires_at = match self.token_ttl {
            Some(ttl) => Some(
                now.checked_add_signed(ttl)
                    .ok_or_else(|| Error::Config("Session token lifetime is too long".into()))?,
            ),
            None => None,
        };

        let token = SessionToken {
            id: Uuid::new_v4().to_string(),
            token_hash: hash,
            token_lookup: lookup.clone(),
            uid: account.uid.clone(),
            created_at: now,
            expires_at,
            last_used_at: None,
        };

        let inserted = self
            .store
            .insert_if_absent(&path::session(&lookup)?, &serde_json::to_value(&token)?)?;
        if !inserted {
            return Err(Error::TokenLookupCollision);
        }

        Ok(IssuedToken {
            token: raw_token,
            session: account.session(),
            expires_at: token.expires_at,
        })
    }

    fn verify_token(&self, raw_token: &str) -> Result<Session> {
        let token = self.load_token(raw_token)?;

        if let Some(expires_at) = &token.expires_at {
            if expires_at < &Utc::now() {
                return Err(Error::Unauthenticated);
            }
        }

        let account = self
            .get_account(&token.uid)?
            .ok_or(Error::Unauthenticated)?;

        let mut fields = Map::new();
        fields.insert("lastUsedAt".into(), serde_json::to_value(Utc::now())?);
        if let Err(e) = self
            .store
            .update(&path::session(&token.token_lookup)?, &fields)
        {
            tracing::warn!("Failed to update session last_used_at: {e}");
        }

        Ok(account.session())
    }

    fn revoke_token(&self, raw_token: &str) -> Result<bool> {
        let token = self.load_token(raw_token)?;
        self.store.remove(&path::session(&token.token_lookup)?)
    }
}
