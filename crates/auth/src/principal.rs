//! The authenticated caller for one request.

use serde::{Deserialize, Serialize};

use medrec_core::UserId;

use crate::Role;

/// A fully authenticated principal, reconstructed from a verified token.
///
/// Constructed fresh on every successful decode and discarded at the end of
/// the request; only the token it came from is persisted (client-side).
///
/// # Invariants
/// - A `Professional` principal carries the id of the administrator it is
///   attached to in `admin_id`; other roles never do. A professional whose
///   link is absent (malformed provisioning) is still representable — the
///   scope resolver denies it instead of widening its access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub admin_id: Option<UserId>,
}

impl Principal {
    pub fn new(
        id: UserId,
        full_name: impl Into<String>,
        email: impl Into<String>,
        role: Role,
        admin_id: Option<UserId>,
    ) -> Self {
        // admin_id is only meaningful for professionals; drop it for other
        // roles so issued tokens never carry a stray tenant link.
        let admin_id = match role {
            Role::Professional => admin_id,
            _ => None,
        };
        Self {
            id,
            full_name: full_name.into(),
            email: email.into(),
            role,
            admin_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_id_is_dropped_for_non_professionals() {
        let stray = UserId::new();
        let p = Principal::new(
            UserId::new(),
            "Ana Souza",
            "ana@example.com",
            Role::Administrator,
            Some(stray),
        );
        assert_eq!(p.admin_id, None);
    }

    #[test]
    fn admin_id_is_kept_for_professionals() {
        let admin = UserId::new();
        let p = Principal::new(
            UserId::new(),
            "Rui Alves",
            "rui@example.com",
            Role::Professional,
            Some(admin),
        );
        assert_eq!(p.admin_id, Some(admin));
    }
}
