//! Route classification and role/scope resolution.
//!
//! This module owns every role-to-permission decision in the system: the
//! route-class decision table, the per-operation guard rules and the tenant
//! scope a caller's queries must be filtered by. No other component compares
//! roles directly.

use medrec_core::UserId;

use crate::{AuthzError, Principal, Role};

// ─────────────────────────────────────────────────────────────────────────────
// Fixed denial reasons
// ─────────────────────────────────────────────────────────────────────────────

/// Fixed, human-readable denial reasons.
///
/// These strings are part of the API contract: clients branch on the exact
/// wording, so they live here as data rather than being re-derived at the
/// transport boundary.
pub mod reasons {
    pub const ADMIN_ROUTE: &str =
        "Unauthorized. This request can only be made by administrators.";
    pub const PROFESSIONAL_ROUTE: &str =
        "Unauthorized. This request can only be made by healthcare professionals.";
    pub const SUBSCRIPTIONS: &str = "Only general administrators can access subscriptions";
    pub const UNLINKED_PROFESSIONAL: &str =
        "Professional account has no administrator assigned";

    pub const ADD_USERS: &str = "Only administrators can add users";
    pub const DELETE_USERS: &str = "Only administrators can delete users";
    pub const READ_USER: &str = "You don't have permission to access this user's data";
    pub const UPDATE_USER: &str = "You don't have permission to update this user's data";
    pub const LIST_ADMINISTRATORS: &str = "You don't have permission to list administrators";
    pub const UPDATE_HEALTH_UNITS: &str = "Only administrators can update health units.";
    pub const DELETE_HEALTH_UNITS: &str = "Only administrators can delete health units.";
    pub const STATISTICS: &str = "Only administrators can access statistics";
    pub const PREDICTIONS: &str = "Only healthcare professionals can access predictions";
    pub const DETECTIONS: &str = "Only healthcare professionals can access detections";
}

// ─────────────────────────────────────────────────────────────────────────────
// Route classification
// ─────────────────────────────────────────────────────────────────────────────

/// Class of an inbound route, derived from the request path alone.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RouteClass {
    /// No token required (API key only).
    Public,
    /// Administrator tier required.
    AdminOnly,
    /// Healthcare professionals only.
    ProfessionalOnly,
    /// Subscription management (general administrators only).
    GeneralAdminOnly,
    /// Authentication only, no extra role check.
    Unclassified,
}

const PUBLIC_PREFIXES: &[&str] = &[
    "/api/auth/login",
    "/api/status",
    "/api/docs",
    "/api/openapi.json",
];

const ADMIN_PREFIXES: &[&str] = &[
    "/api/admin/",
    "/api/health-units/create",
    "/api/users/professionals/create",
    "/api/statistics/",
];

const PROFESSIONAL_PREFIXES: &[&str] = &["/api/attendances/create", "/api/diagnoses/"];

impl RouteClass {
    /// Classify a request path by prefix.
    ///
    /// The subscription-management path is an explicit override evaluated
    /// before the generic admin prefix list: subscriptions are a
    /// general-administrator-exclusive resource even though the path would
    /// otherwise classify as admin-level.
    pub fn classify(path: &str) -> Self {
        if path == "/api/users/subscriptions" || path.starts_with("/api/users/subscriptions/") {
            return RouteClass::GeneralAdminOnly;
        }
        if PUBLIC_PREFIXES.iter().any(|p| path.starts_with(p)) {
            return RouteClass::Public;
        }
        if ADMIN_PREFIXES.iter().any(|p| path.starts_with(p)) {
            return RouteClass::AdminOnly;
        }
        if PROFESSIONAL_PREFIXES.iter().any(|p| path.starts_with(p)) {
            return RouteClass::ProfessionalOnly;
        }
        RouteClass::Unclassified
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tenant scope
// ─────────────────────────────────────────────────────────────────────────────

/// The data-visibility boundary resolved for one request.
///
/// Derived deterministically from the principal; never persisted, recomputed
/// per request. Handed to the persistence layer as a filter predicate for
/// list-style reads.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TenantScope {
    /// The whole tree (general administrators).
    Unrestricted,
    /// One administrator's subtree.
    RestrictedToAdmin(UserId),
    /// One administrator's subtree, further narrowed to one professional's
    /// own records (attendance listing for professionals).
    RestrictedToAdminAndProfessional(UserId, UserId),
}

impl TenantScope {
    /// The administrator the scope is restricted to, if any.
    pub fn admin_id(&self) -> Option<UserId> {
        match self {
            TenantScope::Unrestricted => None,
            TenantScope::RestrictedToAdmin(admin_id)
            | TenantScope::RestrictedToAdminAndProfessional(admin_id, _) => Some(*admin_id),
        }
    }

    /// Whether a resource owned by `admin_id` is visible under this scope.
    pub fn covers_admin(&self, admin_id: UserId) -> bool {
        match self.admin_id() {
            None => true,
            Some(own) => own == admin_id,
        }
    }

    /// The finest filter for a principal's own data, independent of route:
    /// professionals are narrowed to their own records inside their
    /// administrator's subtree.
    ///
    /// Absence of a professional's administrator link is a deny, never a
    /// wildcard.
    pub fn data_scope(principal: &Principal) -> Result<TenantScope, AuthzError> {
        match principal.role {
            Role::GeneralAdministrator => Ok(TenantScope::Unrestricted),
            Role::Administrator => Ok(TenantScope::RestrictedToAdmin(principal.id)),
            Role::Professional => match principal.admin_id {
                Some(admin_id) => Ok(TenantScope::RestrictedToAdminAndProfessional(
                    admin_id,
                    principal.id,
                )),
                None => Err(AuthzError::WrongScope(reasons::UNLINKED_PROFESSIONAL)),
            },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decision table
// ─────────────────────────────────────────────────────────────────────────────

/// Resolve the effective tenant scope for a principal on a classified route.
///
/// Pure and deterministic — no I/O, no dependency on call order.
///
/// | role                 | Public | AdminOnly            | ProfessionalOnly       | GeneralAdminOnly | Unclassified |
/// |----------------------|--------|----------------------|------------------------|------------------|--------------|
/// | GeneralAdministrator | allow  | allow, Unrestricted  | deny                   | allow            | allow        |
/// | Administrator        | allow  | allow, own subtree   | deny                   | deny             | allow        |
/// | Professional         | allow  | deny                 | allow, admin's subtree | deny             | allow        |
pub fn resolve(principal: &Principal, route: RouteClass) -> Result<TenantScope, AuthzError> {
    match (principal.role, route) {
        // Public and unclassified routes need authentication only; the
        // caller still gets its natural data scope for query filtering.
        (_, RouteClass::Public | RouteClass::Unclassified) => TenantScope::data_scope(principal),

        (Role::GeneralAdministrator, RouteClass::AdminOnly) => Ok(TenantScope::Unrestricted),
        (Role::Administrator, RouteClass::AdminOnly) => {
            Ok(TenantScope::RestrictedToAdmin(principal.id))
        }
        (Role::Professional, RouteClass::AdminOnly) => {
            // A professional missing its administrator link is denied here
            // too, and never widened.
            Err(AuthzError::WrongRole(reasons::ADMIN_ROUTE))
        }

        (Role::Professional, RouteClass::ProfessionalOnly) => match principal.admin_id {
            Some(admin_id) => Ok(TenantScope::RestrictedToAdmin(admin_id)),
            None => Err(AuthzError::WrongScope(reasons::UNLINKED_PROFESSIONAL)),
        },
        (Role::GeneralAdministrator | Role::Administrator, RouteClass::ProfessionalOnly) => {
            Err(AuthzError::WrongRole(reasons::PROFESSIONAL_ROUTE))
        }

        (Role::GeneralAdministrator, RouteClass::GeneralAdminOnly) => {
            Ok(TenantScope::Unrestricted)
        }
        (Role::Administrator | Role::Professional, RouteClass::GeneralAdminOnly) => {
            Err(AuthzError::WrongRole(reasons::SUBSCRIPTIONS))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Per-operation guard rules
// ─────────────────────────────────────────────────────────────────────────────

/// Require an administrator-tier caller (either tier), with the operation's
/// fixed denial reason.
pub fn ensure_administrative(
    principal: &Principal,
    reason: &'static str,
) -> Result<(), AuthzError> {
    if principal.role.is_administrative() {
        Ok(())
    } else {
        Err(AuthzError::WrongRole(reason))
    }
}

/// Require a healthcare professional, with the operation's fixed denial
/// reason.
pub fn ensure_professional(
    principal: &Principal,
    reason: &'static str,
) -> Result<(), AuthzError> {
    if principal.role == Role::Professional {
        Ok(())
    } else {
        Err(AuthzError::WrongRole(reason))
    }
}

/// Require that the caller targets itself or holds an administrator tier,
/// with the operation's fixed denial reason.
pub fn ensure_self_or_administrative(
    principal: &Principal,
    target: UserId,
    reason: &'static str,
) -> Result<(), AuthzError> {
    if principal.id == target || principal.role.is_administrative() {
        Ok(())
    } else {
        Err(AuthzError::WrongRole(reason))
    }
}

/// Require the general administrator, with the operation's fixed denial
/// reason.
pub fn ensure_general_administrator(
    principal: &Principal,
    reason: &'static str,
) -> Result<(), AuthzError> {
    if principal.role == Role::GeneralAdministrator {
        Ok(())
    } else {
        Err(AuthzError::WrongRole(reason))
    }
}
