//! Per-resource ownership verification.
//!
//! Handlers call [`verify_ownership`] after fetching a specific resource by
//! id — i.e. wherever scope-based filtering was not already applied to a
//! list query. Rules are evaluated strictly in order; the first matching
//! rule decides. Each rule's denial reason is fixed and defined once here.

use medrec_core::UserId;

use crate::{AuthzError, Principal, Role, TenantScope};

/// Fixed denial reasons for ownership rules.
pub mod reasons {
    pub const HEALTH_UNIT_FOREIGN: &str = "Health unit belongs to a different administrator";
    pub const ATTENDANCE_UPDATE: &str =
        "You do not have permission to update this attendance";
    pub const ATTENDANCE_DELETE: &str =
        "You do not have permission to delete this attendance";
    pub const USER_NOT_ASSOCIATED: &str =
        "Professional is not associated with this administrator";
}

/// Which mutation is being attempted (picks the fixed message and, for user
/// targets, arms the self-delete guard).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MutationOp {
    Update,
    Delete,
}

/// Tenancy-relevant fields of a fetched resource, as stored.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OwnedResourceRef {
    /// A health unit owned by an administrator.
    HealthUnit { admin_id: UserId },
    /// An attendance record created by a professional.
    Attendance {
        professional_id: UserId,
        op: MutationOp,
    },
    /// Another user account as a mutation target.
    User {
        id: UserId,
        role: Role,
        admin_id: Option<UserId>,
        op: MutationOp,
    },
}

/// Decide allow/deny for a fetched resource against the caller's identity
/// and resolved scope.
pub fn verify_ownership(
    principal: &Principal,
    scope: &TenantScope,
    resource: OwnedResourceRef,
) -> Result<(), AuthzError> {
    match resource {
        OwnedResourceRef::HealthUnit { admin_id } => verify_health_unit(scope, admin_id),
        OwnedResourceRef::Attendance {
            professional_id,
            op,
        } => verify_attendance(principal, professional_id, op),
        OwnedResourceRef::User {
            id,
            role,
            admin_id,
            op,
        } => verify_user(principal, id, role, admin_id, op),
    }
}

/// A health unit is reachable when the scope is unrestricted or the unit
/// belongs to the scope's administrator.
fn verify_health_unit(scope: &TenantScope, admin_id: UserId) -> Result<(), AuthzError> {
    if scope.covers_admin(admin_id) {
        Ok(())
    } else {
        Err(AuthzError::NotOwner(reasons::HEALTH_UNIT_FOREIGN))
    }
}

/// Attendance mutation is role-based, not scope-based: any administrator
/// tier may act on any attendance, while a professional may only act on its
/// own records. Intentionally broader than the health-unit rule — do not
/// unify them.
fn verify_attendance(
    principal: &Principal,
    professional_id: UserId,
    op: MutationOp,
) -> Result<(), AuthzError> {
    if principal.role.is_administrative() || professional_id == principal.id {
        return Ok(());
    }
    Err(AuthzError::NotOwner(match op {
        MutationOp::Update => reasons::ATTENDANCE_UPDATE,
        MutationOp::Delete => reasons::ATTENDANCE_DELETE,
    }))
}

/// User mutation rules, first match decides:
/// 1. deleting your own account is always rejected, any role;
/// 2. acting on your own account is otherwise always allowed;
/// 3. the general administrator may act on any user;
/// 4. other callers may act on a professional attached to them.
fn verify_user(
    principal: &Principal,
    target_id: UserId,
    target_role: Role,
    target_admin_id: Option<UserId>,
    op: MutationOp,
) -> Result<(), AuthzError> {
    if op == MutationOp::Delete && target_id == principal.id {
        return Err(AuthzError::SelfActionForbidden);
    }
    if target_id == principal.id {
        return Ok(());
    }
    if principal.role == Role::GeneralAdministrator {
        return Ok(());
    }
    if target_role == Role::Professional && target_admin_id == Some(principal.id) {
        return Ok(());
    }
    Err(AuthzError::NotOwner(reasons::USER_NOT_ASSOCIATED))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn general_admin() -> Principal {
        Principal::new(
            UserId::new(),
            "Root",
            "root@example.com",
            Role::GeneralAdministrator,
            None,
        )
    }

    fn admin() -> Principal {
        Principal::new(
            UserId::new(),
            "Ana Souza",
            "ana@example.com",
            Role::Administrator,
            None,
        )
    }

    fn professional(admin_id: UserId) -> Principal {
        Principal::new(
            UserId::new(),
            "Rui Alves",
            "rui@example.com",
            Role::Professional,
            Some(admin_id),
        )
    }

    // ── health units ────────────────────────────────────────────────────────

    #[test]
    fn health_unit_in_scope_passes_and_foreign_unit_fails() {
        let admin_id = UserId::new();
        let foreign = UserId::new();
        let p = professional(admin_id);
        let scope = TenantScope::RestrictedToAdmin(admin_id);

        assert!(verify_ownership(
            &p,
            &scope,
            OwnedResourceRef::HealthUnit { admin_id }
        )
        .is_ok());

        assert_eq!(
            verify_ownership(
                &p,
                &scope,
                OwnedResourceRef::HealthUnit { admin_id: foreign }
            ),
            Err(AuthzError::NotOwner(reasons::HEALTH_UNIT_FOREIGN))
        );
    }

    #[test]
    fn unrestricted_scope_reaches_any_health_unit() {
        let p = general_admin();
        assert!(verify_ownership(
            &p,
            &TenantScope::Unrestricted,
            OwnedResourceRef::HealthUnit {
                admin_id: UserId::new()
            }
        )
        .is_ok());
    }

    // ── attendances ─────────────────────────────────────────────────────────

    #[test]
    fn attendance_ownership_is_asymmetric_between_roles() {
        let admin_id = UserId::new();
        let owner = professional(admin_id);
        let other = professional(admin_id);
        let administrator = admin();

        for op in [MutationOp::Update, MutationOp::Delete] {
            let resource = OwnedResourceRef::Attendance {
                professional_id: owner.id,
                op,
            };

            // An administrator may act on an attendance it did not create.
            assert!(verify_ownership(
                &administrator,
                &TenantScope::RestrictedToAdmin(administrator.id),
                resource
            )
            .is_ok());

            // The creating professional may act on it.
            assert!(verify_ownership(
                &owner,
                &TenantScope::RestrictedToAdmin(admin_id),
                resource
            )
            .is_ok());

            // A different professional may not, for either operation.
            assert!(verify_ownership(
                &other,
                &TenantScope::RestrictedToAdmin(admin_id),
                resource
            )
            .is_err());
        }
    }

    #[test]
    fn attendance_denials_carry_the_operation_message() {
        let other = professional(UserId::new());
        let owner_id = UserId::new();

        let update = verify_ownership(
            &other,
            &TenantScope::RestrictedToAdmin(UserId::new()),
            OwnedResourceRef::Attendance {
                professional_id: owner_id,
                op: MutationOp::Update,
            },
        )
        .unwrap_err();
        assert_eq!(
            update.to_string(),
            "You do not have permission to update this attendance"
        );

        let delete = verify_ownership(
            &other,
            &TenantScope::RestrictedToAdmin(UserId::new()),
            OwnedResourceRef::Attendance {
                professional_id: owner_id,
                op: MutationOp::Delete,
            },
        )
        .unwrap_err();
        assert_eq!(
            delete.to_string(),
            "You do not have permission to delete this attendance"
        );
    }

    // ── users ───────────────────────────────────────────────────────────────

    #[test]
    fn self_delete_is_rejected_for_every_role() {
        for p in [
            general_admin(),
            admin(),
            professional(UserId::new()),
        ] {
            let scope = TenantScope::data_scope(&p).unwrap();
            let result = verify_ownership(
                &p,
                &scope,
                OwnedResourceRef::User {
                    id: p.id,
                    role: p.role,
                    admin_id: p.admin_id,
                    op: MutationOp::Delete,
                },
            );
            assert_eq!(result, Err(AuthzError::SelfActionForbidden), "{:?}", p.role);
        }
    }

    #[test]
    fn self_update_is_allowed() {
        let p = professional(UserId::new());
        let scope = TenantScope::data_scope(&p).unwrap();
        assert!(verify_ownership(
            &p,
            &scope,
            OwnedResourceRef::User {
                id: p.id,
                role: p.role,
                admin_id: p.admin_id,
                op: MutationOp::Update,
            }
        )
        .is_ok());
    }

    #[test]
    fn general_admin_may_mutate_any_other_user() {
        let ga = general_admin();
        let target = admin();
        for op in [MutationOp::Update, MutationOp::Delete] {
            assert!(verify_ownership(
                &ga,
                &TenantScope::Unrestricted,
                OwnedResourceRef::User {
                    id: target.id,
                    role: target.role,
                    admin_id: None,
                    op,
                }
            )
            .is_ok());
        }
    }

    #[test]
    fn admin_may_mutate_its_own_professionals_only() {
        let administrator = admin();
        let own = professional(administrator.id);
        let foreign = professional(UserId::new());
        let scope = TenantScope::RestrictedToAdmin(administrator.id);

        assert!(verify_ownership(
            &administrator,
            &scope,
            OwnedResourceRef::User {
                id: own.id,
                role: Role::Professional,
                admin_id: own.admin_id,
                op: MutationOp::Update,
            }
        )
        .is_ok());

        let denied = verify_ownership(
            &administrator,
            &scope,
            OwnedResourceRef::User {
                id: foreign.id,
                role: Role::Professional,
                admin_id: foreign.admin_id,
                op: MutationOp::Delete,
            },
        )
        .unwrap_err();
        assert_eq!(
            denied.to_string(),
            "Professional is not associated with this administrator"
        );
    }

    #[test]
    fn admin_may_not_mutate_another_administrator() {
        let administrator = admin();
        let other = admin();
        let scope = TenantScope::RestrictedToAdmin(administrator.id);

        assert!(verify_ownership(
            &administrator,
            &scope,
            OwnedResourceRef::User {
                id: other.id,
                role: Role::Administrator,
                admin_id: None,
                op: MutationOp::Update,
            }
        )
        .is_err());
    }

    /// End-to-end scenario: professional P1 under administrator A1 lists
    /// health units; a unit under A2 must fail verification while a unit
    /// under A1 passes.
    #[test]
    fn professional_scope_scenario() {
        let a1 = UserId::new();
        let a2 = UserId::new();
        let p1 = professional(a1);

        let scope = crate::resolve(&p1, crate::RouteClass::ProfessionalOnly).unwrap();
        assert_eq!(scope, TenantScope::RestrictedToAdmin(a1));

        assert!(verify_ownership(&p1, &scope, OwnedResourceRef::HealthUnit { admin_id: a1 }).is_ok());
        assert_eq!(
            verify_ownership(&p1, &scope, OwnedResourceRef::HealthUnit { admin_id: a2 }),
            Err(AuthzError::NotOwner(reasons::HEALTH_UNIT_FOREIGN))
        );
    }
}
