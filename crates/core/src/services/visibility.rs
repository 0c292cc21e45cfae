//! Decides which unapproved content a caller may see.

use studyhub_db::{entities::user, repositories::Visibility};

/// Resolve the visibility predicate for a caller.
///
/// Without `include_unapproved` everyone sees approved content only. With it,
/// moderators see everything and other signed-in users additionally see their
/// own unapproved items. Anonymous callers never see unapproved content.
#[must_use]
pub fn visibility_for(viewer: Option<&user::Model>, include_unapproved: bool) -> Visibility {
    match viewer {
        Some(user) if include_unapproved && user.is_moderator() => Visibility::All,
        Some(user) if include_unapproved => Visibility::ApprovedOrOwnedBy(user.id.clone()),
        _ => Visibility::Approved,
    }
}
