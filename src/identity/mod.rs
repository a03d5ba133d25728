//! Maps identity-provider accounts to usernames.
//!
//! A username is reserved with a single insert-if-absent write on
//! `users/{username}`, so two registrations racing for the same handle
//! can't both win. The `uids/{uid}` index then resolves a session to its
//! namespace without trusting the display name.

mod username;

pub use username::{synthesize, with_suffix};

use std::sync::Arc;

use serde_json::{Value, json};

use crate::auth::{IdentityProvider, IssuedToken};
use crate::error::{Error, Result};
use crate::store::{Store, path, server_timestamp};
use crate::types::{Account, OAuthProfile, Session, User};
use crate::validation::{validate_email, validate_password, validate_username};

const MAX_USERNAME_ATTEMPTS: u32 = 100;

/// A user record together with a freshly issued token for it.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub user: User,
    pub token: IssuedToken,
}

pub struct IdentityResolver {
    store: Arc<dyn Store>,
    provider: Arc<dyn IdentityProvider>,
}

fn user_record(username: &str, account: &Account) -> Value {
    json!({
        "username": username,
        "email": account.email,
        "createdAt": server_timestamp(),
        "userId": account.uid,
        "resume": "",
    })
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn Store>, provider: Arc<dyn IdentityProvider>) -> Self {
        Self { store, provider }
    }

    pub fn provider(&self) -> &Arc<dyn IdentityProvider> {
        &self.provider
    }

    /// Handles that could never be stored are reported as free; registering
    /// them still fails validation.
    pub fn username_exists(&self, candidate: &str) -> Result<bool> {
        match path::user(candidate) {
            Ok(user_path) => self.store.exists(&user_path),
            Err(_) => Ok(false),
        }
    }

    pub fn get_user(&self, username: &str) -> Result<Option<User>> {
        self.store
            .get(&path::user(username)?)?
            .map(serde_json::from_value)
            .transpose()
            .map_err(Error::from)
    }

    /// The username owned by the session's uid.
    pub fn resolve_username(&self, session: &Session) -> Result<String> {
        self.username_for_uid(&session.uid)?
            .ok_or_else(|| Error::not_found("No user record for this session"))
    }

    pub fn register(&self, email: &str, password: &str, username: &str) -> Result<SignedIn> {
        validate_email(email)?;
        validate_username(username)?;
        validate_password(password)?;

        if self.username_exists(username)? {
            return Err(Error::conflict("Username already taken"));
        }
        if self.provider.email_in_use(email)? {
            return Err(Error::conflict("Email already in use"));
        }

        let account = self.provider.create_account(email, password)?;

        if !self.reserve(username, &account)? {
            self.provider.delete_account(&account.uid)?;
            return Err(Error::conflict("Username already taken"));
        }
        self.store
            .set(&path::uid_index(&account.uid)?, &json!(username))?;

        tracing::info!("Registered user {username}");
        self.finish_sign_in(account, username)
    }

    /// Signs in through an OAuth provider, creating the user record on the
    /// first login.
    pub fn bootstrap_oauth(&self, profile: &OAuthProfile) -> Result<SignedIn> {
        let account = self.provider.link_oauth_account(profile)?;

        if let Some(username) = self.username_for_uid(&account.uid)? {
            return self.finish_sign_in(account, &username);
        }

        let base = synthesize(profile.display_name.as_deref(), &profile.email);
        let username = self.reserve_synthesized(&base, &account)?;

        let index = path::uid_index(&account.uid)?;
        if !self.store.insert_if_absent(&index, &json!(username))? {
            // A concurrent first login for the same account got there first.
            self.store.remove(&path::user(&username)?)?;
            let existing = self
                .username_for_uid(&account.uid)?
                .ok_or_else(|| Error::not_found("No user record for this account"))?;
            return self.finish_sign_in(account, &existing);
        }

        tracing::info!("Bootstrapped user {username} from {:?}", profile.provider);
        self.finish_sign_in(account, &username)
    }

    fn username_for_uid(&self, uid: &str) -> Result<Option<String>> {
        Ok(self
            .store
            .get(&path::uid_index(uid)?)?
            .and_then(|v| v.as_str().map(str::to_string)))
    }

    fn reserve(&self, username: &str, account: &Account) -> Result<bool> {
        self.store
            .insert_if_absent(&path::user(username)?, &user_record(username, account))
    }

    fn reserve_synthesized(&self, base: &str, account: &Account) -> Result<String> {
        for n in 1..=MAX_USERNAME_ATTEMPTS {
            let candidate = with_suffix(base, n);
            if self.reserve(&candidate, account)? {
                return Ok(candidate);
            }
        }
        Err(Error::conflict(format!(
            "Could not find a free username based on '{base}'"
        )))
    }

    fn finish_sign_in(&self, mut account: Account, username: &str) -> Result<SignedIn> {
        if account.display_name.as_deref() != Some(username) {
            self.provider.set_display_name(&account.uid, username)?;
            account.display_name = Some(username.to_string());
        }

        let user = self
            .get_user(username)?
            .ok_or_else(|| Error::not_found(format!("User '{username}'")))?;
        let token = self.provider.issue_token(&account)?;

        Ok(SignedIn { user, token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::LocalIdentityProvider;
    use crate::store::SqliteStore;
    use crate::types::AuthProvider;
    use tempfile::TempDir;

    fn test_resolver(temp: &TempDir) -> IdentityResolver {
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        let store: Arc<dyn Store> = Arc::new(store);
        let provider = LocalIdentityProvider::new(store.clone(), None).unwrap();
        IdentityResolver::new(store, Arc::new(provider))
    }

    fn octocat(display_name: Option<&str>) -> OAuthProfile {
        OAuthProfile {
            provider: AuthProvider::GitHub,
            provider_id: "583231".to_string(),
            display_name: display_name.map(str::to_string),
            email: "octocat@github.com".to_string(),
        }
    }

    #[test]
    fn test_username_exists_after_register() {
        let temp = TempDir::new().unwrap();
        let resolver = test_resolver(&temp);

        assert!(!resolver.username_exists("alice").unwrap());
        let signed_in = resolver
            .register("alice@example.com", "secret-pw", "alice")
            .unwrap();
        assert!(resolver.username_exists("alice").unwrap());

        assert_eq!(signed_in.user.username, "alice");
        assert_eq!(signed_in.user.email, "alice@example.com");
        assert_eq!(signed_in.user.resume, "");
        assert!(signed_in.user.created_at > 0);
        assert_eq!(
            signed_in.token.session.display_name.as_deref(),
            Some("alice")
        );
    }

    #[test]
    fn test_resolve_username_uses_uid() {
        let temp = TempDir::new().unwrap();
        let resolver = test_resolver(&temp);

        let signed_in = resolver
            .register("alice@example.com", "secret-pw", "alice")
            .unwrap();

        let mut session = signed_in.token.session.clone();
        session.display_name = Some("mallory".to_string());
        assert_eq!(resolver.resolve_username(&session).unwrap(), "alice");
    }

    #[test]
    fn test_register_conflicts() {
        let temp = TempDir::new().unwrap();
        let resolver = test_resolver(&temp);

        resolver
            .register("alice@example.com", "secret-pw", "alice")
            .unwrap();

        assert!(matches!(
            resolver.register("other@example.com", "secret-pw", "alice"),
            Err(Error::Conflict(_))
        ));
        assert!(matches!(
            resolver.register("alice@example.com", "secret-pw", "alice2"),
            Err(Error::Conflict(_))
        ));
    }

    #[test]
    fn test_register_validates_input() {
        let temp = TempDir::new().unwrap();
        let resolver = test_resolver(&temp);

        assert!(matches!(
            resolver.register("not-an-email", "secret-pw", "alice"),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            resolver.register("alice@example.com", "secret-pw", "al.ice"),
            Err(Error::InvalidInput(_))
        ));
        assert!(!resolver.username_exists("alice").unwrap());
    }

    #[test]
    fn test_reserved_handle_blocks_registration() {
        let temp = TempDir::new().unwrap();
        let resolver = test_resolver(&temp);

        let account = resolver
            .provider()
            .create_account("bob@example.com", "secret-pw")
            .unwrap();
        assert!(resolver.reserve("taken", &account).unwrap());

        let result = resolver.register("carol@example.com", "secret-pw", "taken");
        assert!(matches!(result, Err(Error::Conflict(_))));
        assert!(!resolver.provider().email_in_use("carol@example.com").unwrap());
    }

    #[test]
    fn test_oauth_bootstrap_then_reuse() {
        let temp = TempDir::new().unwrap();
        let resolver = test_resolver(&temp);

        let first = resolver
            .bootstrap_oauth(&octocat(Some("The Octocat")))
            .unwrap();
        assert_eq!(first.user.username, "The-Octocat");
        assert_eq!(first.user.user_id, "github-583231");

        let second = resolver
            .bootstrap_oauth(&octocat(Some("Renamed Cat")))
            .unwrap();
        assert_eq!(second.user.username, "The-Octocat");
    }

    #[test]
    fn test_oauth_bootstrap_picks_free_suffix() {
        let temp = TempDir::new().unwrap();
        let resolver = test_resolver(&temp);

        resolver
            .register("octo@example.com", "secret-pw", "octocat")
            .unwrap();

        let signed_in = resolver.bootstrap_oauth(&octocat(None)).unwrap();
        assert_eq!(signed_in.user.username, "octocat-2");
    }

    #[test]
    fn test_oauth_bootstrap_non_latin_name() {
        let temp = TempDir::new().unwrap();
        let resolver = test_resolver(&temp);

        let signed_in = resolver.bootstrap_oauth(&octocat(Some("김철수"))).unwrap();
        assert_eq!(signed_in.user.username, "octocat");
    }
}
