use crate::error::{Error, Result};
use crate::types::Session;

/// True when `session` is the recorded owner. Ownership is always the
/// identity-provider uid; usernames and display names can change.
#[must_use]
pub fn owner_matches(session: &Session, owner_uid: &str) -> bool {
    !owner_uid.is_empty() && session.uid == owner_uid
}

pub fn require_owner(session: &Session, owner_uid: &str, what: &str) -> Result<()> {
    if owner_matches(session, owner_uid) {
        Ok(())
    } else {
        tracing::warn!("uid {} denied access to {what}", session.uid);
        Err(Error::forbidden(format!("You do not own this {what}")))
    }
}
