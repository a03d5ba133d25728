//! Typed access to the content stored under each user's namespace.
//!
//! Reads are public. Every mutation takes the acting [`Session`] and goes
//! through [`guard::require_owner`] before anything is written.

pub mod guard;
mod posts;
mod profiles;
mod projects;
mod query;

pub use guard::{owner_matches, require_owner};
pub use posts::{NewPost, PostUpdate};
pub use query::{PostQuery, TagCount, tag_summary};

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;
use crate::github::GitHubClient;
use crate::identity::IdentityResolver;
use crate::store::Store;
use crate::types::Session;
use crate::types::keyed::{Keyed, from_entry};

pub struct ContentRepository {
    store: Arc<dyn Store>,
    identity: Arc<IdentityResolver>,
    github: GitHubClient,
}

impl ContentRepository {
    pub fn new(
        store: Arc<dyn Store>,
        identity: Arc<IdentityResolver>,
        github: GitHubClient,
    ) -> Self {
        Self {
            store,
            identity,
            github,
        }
    }

    /// The namespace a session writes into.
    fn own_username(&self, session: &Session) -> Result<String> {
        self.identity.resolve_username(session)
    }

    /// Decodes every child of a collection. Records that no longer decode
    /// are logged and skipped so one bad entry doesn't hide the rest.
    fn read_collection<T: DeserializeOwned + Keyed>(&self, path: &str) -> Result<Vec<T>> {
        Ok(self
            .store
            .children(path)?
            .into_iter()
            .filter_map(|(id, value)| match from_entry(&id, value) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::error!("Skipping unreadable record {path}/{id}: {e}");
                    None
                }
            })
            .collect())
    }

    fn read_record<T: DeserializeOwned + Keyed>(&self, path: &str, id: &str) -> Result<Option<T>> {
        self.store
            .get(path)?
            .map(|value: Value| from_entry(id, value))
            .transpose()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::auth::LocalIdentityProvider;
    use crate::identity::SignedIn;
    use crate::store::SqliteStore;
    use tempfile::TempDir;

    pub struct Fixture {
        pub repo: ContentRepository,
        pub identity: Arc<IdentityResolver>,
        pub store: Arc<dyn Store>,
        _temp: TempDir,
    }

    impl Fixture {
        pub fn new() -> Self {
            Self::with_github_url("http://127.0.0.1:9")
        }

        pub fn with_github_url(url: &str) -> Self {
            let temp = TempDir::new().unwrap();
            let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
            store.initialize().unwrap();
            let store: Arc<dyn Store> = Arc::new(store);

            let provider = LocalIdentityProvider::new(store.clone(), None).unwrap();
            let identity = Arc::new(IdentityResolver::new(store.clone(), Arc::new(provider)));
            let github = GitHubClient::new(url, url, None).unwrap();

            Self {
                repo: ContentRepository::new(store.clone(), identity.clone(), github),
                identity,
                store,
                _temp: temp,
            }
        }

        pub fn register(&self, username: &str) -> Session {
            let SignedIn { token, .. } = self
                .identity
                .register(&format!("{username}@example.com"), "secret-pw", username)
                .unwrap();
            token.session
        }
    }
}
