use serde_json::Value;

use super::{ContentRepository, guard::require_owner};
use crate::error::{Error, Result};
use crate::store::path;
use crate::types::{PublicProfile, Session};

impl ContentRepository {
    pub fn get_profile(&self, username: &str) -> Result<PublicProfile> {
        self.identity
            .get_user(username)?
            .map(PublicProfile::from)
            .ok_or_else(|| Error::not_found(format!("User '{username}'")))
    }

    /// Replaces the résumé Markdown. Only the namespace owner may do this.
    pub fn update_resume(
        &self,
        session: &Session,
        username: &str,
        resume: &str,
    ) -> Result<PublicProfile> {
        let user = self
            .identity
            .get_user(username)?
            .ok_or_else(|| Error::not_found(format!("User '{username}'")))?;
        require_owner(session, &user.user_id, "profile")?;

        self.store
            .set(&path::resume(username)?, &Value::from(resume))?;

        tracing::info!("{username} updated their resume");
        self.get_profile(username)
    }
}
