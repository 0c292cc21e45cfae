//! Ownership and role checks shared by every mutating service call.
//!
//! Lookups resolve first: a missing resource is `NotFound` no matter who asks,
//! and only an existing resource is compared against the acting user.

use studyhub_common::{AppError, AppResult};
use studyhub_db::entities::{
    comment, file_upload, group_message, note, notification, question, quiz, report, study_group,
    user,
};

/// A row owned by exactly one user.
pub trait Owned {
    /// ID of the owning user.
    fn owner_id(&self) -> &str;
}

impl Owned for note::Model {
    fn owner_id(&self) -> &str {
        &self.user_id
    }
}

impl Owned for question::Model {
    fn owner_id(&self) -> &str {
        &self.user_id
    }
}

impl Owned for comment::Model {
    fn owner_id(&self) -> &str {
        &self.user_id
    }
}

impl Owned for report::Model {
    fn owner_id(&self) -> &str {
        &self.reporter_id
    }
}

impl Owned for quiz::Model {
    fn owner_id(&self) -> &str {
        &self.user_id
    }
}

impl Owned for study_group::Model {
    fn owner_id(&self) -> &str {
        &self.owner_id
    }
}

impl Owned for group_message::Model {
    fn owner_id(&self) -> &str {
        &self.sender_id
    }
}

impl Owned for notification::Model {
    fn owner_id(&self) -> &str {
        &self.user_id
    }
}

impl Owned for file_upload::Model {
    fn owner_id(&self) -> &str {
        &self.user_id
    }
}

/// Resolve a fetched resource and require the caller to own it.
pub fn ensure_owner<T: Owned>(resource: Option<T>, user_id: &str, kind: &str) -> AppResult<T> {
    let resource = resource.ok_or_else(|| AppError::NotFound(format!("{kind} not found")))?;
    if resource.owner_id() != user_id {
        return Err(AppError::Unauthorized(format!(
            "You are not allowed to modify this {}",
            kind.to_lowercase()
        )));
    }
    Ok(resource)
}

/// Like [`ensure_owner`], but moderators pass as well.
pub fn ensure_owner_or_moderator<T: Owned>(
    resource: Option<T>,
    user: &user::Model,
    kind: &str,
) -> AppResult<T> {
    let resource = resource.ok_or_else(|| AppError::NotFound(format!("{kind} not found")))?;
    if resource.owner_id() != user.id && !user.is_moderator() {
        return Err(AppError::Unauthorized(format!(
            "You are not allowed to modify this {}",
            kind.to_lowercase()
        )));
    }
    Ok(resource)
}

/// Require the moderator (or admin) role.
pub fn require_moderator(user: &user::Model) -> AppResult<()> {
    if user.is_moderator() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Moderator access required".to_string()))
    }
}

/// Require the admin role.
pub fn require_admin(user: &user::Model) -> AppResult<()> {
    if user.role.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Admin access required".to_string()))
    }
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::test_support;
    use super::*;
    use studyhub_db::entities::user::Role;

    #[test]
    fn test_missing_resource_is_not_found_first() {
        let result = ensure_owner::<note::Model>(None, "anyone", "Note");
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_owner_mismatch_is_unauthorized() {
        let note = test_support::note("n1", "alice", true);
        let result = ensure_owner(Some(note), "bob", "Note");
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_owner_passes() {
        let note = test_support::note("n1", "alice", true);
        assert_eq!(ensure_owner(Some(note), "alice", "Note").unwrap().id, "n1");
    }

    #[test]
    fn test_moderator_passes_owner_or_moderator() {
        let note = test_support::note("n1", "alice", true);
        let moderator = test_support::user("mod", Role::Moderator);
        assert!(ensure_owner_or_moderator(Some(note.clone()), &moderator, "Note").is_ok());

        let stranger = test_support::user("bob", Role::User);
        assert!(matches!(
            ensure_owner_or_moderator(Some(note), &stranger, "Note"),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_role_requirements() {
        assert!(matches!(
            require_moderator(&test_support::user("u", Role::User)),
            Err(AppError::Forbidden(_))
        ));
        assert!(require_moderator(&test_support::user("a", Role::Admin)).is_ok());
        assert!(matches!(
            require_admin(&test_support::user("m", Role::Moderator)),
            Err(AppError::Forbidden(_))
        ));
    }
}
