//! The single ownership predicate used by every mutation handler.
//!
//! Each gated mutation follows the same contract: fetch the resource,
//! 404 if absent, then call [`ensure_owner`] with the resource's owning
//! user id.  Admins bypass the check only where the route says so
//! (listings yes, reviews no).

use uuid::Uuid;

use vista_shared::types::Role;

use crate::auth::AuthUser;
use crate::error::ApiError;

/// Whether the `admin` role may act on resources it does not own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminOverride {
    Allow,
    Deny,
}

/// Reject with 403 unless `caller` owns the resource (or is an admin and
/// the route allows the override).
pub fn ensure_owner(
    resource_owner: Uuid,
    caller: &AuthUser,
    admin_override: AdminOverride,
    denied_message: &str,
) -> Result<(), ApiError> {
    if resource_owner == caller.id() {
        return Ok(());
    }
    if admin_override == AdminOverride::Allow && caller.role() == Role::Admin {
        return Ok(());
    }
    Err(ApiError::Forbidden(denied_message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use vista_store::User;

    fn caller(role: Role) -> AuthUser {
        AuthUser {
            user: User {
                id: Uuid::new_v4(),
                name: "C".into(),
                email: "c@example.com".into(),
                password_hash: String::new(),
                role,
                phone: "077".into(),
                profile_image: None,
                is_verified: false,
                is_blocked: false,
                created_at: Utc::now(),
            },
        }
    }

    #[test]
    fn owner_passes() {
        let caller = caller(Role::Owner);
        assert!(ensure_owner(caller.id(), &caller, AdminOverride::Deny, "no").is_ok());
    }

    #[test]
    fn stranger_rejected() {
        let caller = caller(Role::Owner);
        let err = ensure_owner(Uuid::new_v4(), &caller, AdminOverride::Allow, "no").unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(m) if m == "no"));
    }

    #[test]
    fn admin_bypass_only_when_allowed() {
        let admin = caller(Role::Admin);
        let other = Uuid::new_v4();
        assert!(ensure_owner(other, &admin, AdminOverride::Allow, "no").is_ok());
        assert!(ensure_owner(other, &admin, AdminOverride::Deny, "no").is_err());
    }
}
