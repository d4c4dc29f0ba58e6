//! Per-request authenticated context.

use medrec_auth::{Principal, TenantScope};

/// The identity and resolved data-visibility boundary attached to a request
/// by the authorization middleware, consumed by handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub principal: Principal,
    pub scope: TenantScope,
}

impl AuthContext {
    pub fn new(principal: Principal, scope: TenantScope) -> Self {
        Self { principal, scope }
    }

    /// The scope widened to the whole administrator subtree: professionals
    /// see their administrator's users/units, not just their own records.
    pub fn subtree_scope(&self) -> TenantScope {
        match self.scope {
            TenantScope::RestrictedToAdminAndProfessional(admin_id, _) => {
                TenantScope::RestrictedToAdmin(admin_id)
            }
            scope => scope,
        }
    }
}
