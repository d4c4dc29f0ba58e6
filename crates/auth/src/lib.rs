//! `medrec-auth` — pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage. It owns the
//! signed identity-token codec, the role/route decision table, tenant-scope
//! resolution and per-resource ownership verification. Everything here is a
//! deterministic, non-blocking computation so it can be driven from blocking
//! or async handlers without modification.

pub mod config;
pub mod error;
pub mod ownership;
pub mod password;
pub mod principal;
pub mod roles;
pub mod scope;
pub mod token;

pub use config::AuthConfig;
pub use error::{AuthnError, AuthzError};
pub use ownership::{verify_ownership, MutationOp, OwnedResourceRef};
pub use password::{hash_password, verify_password, PasswordError};
pub use principal::Principal;
pub use roles::Role;
pub use scope::{resolve, RouteClass, TenantScope};
pub use token::{TokenCodec, TokenError};
