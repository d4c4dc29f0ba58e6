//! Caller roles (profiles).
//!
//! The role set is closed: every role-to-permission decision lives in the
//! scope resolver's decision table, and no other component compares role
//! strings directly.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use medrec_core::DomainError;

/// Profile of an authenticated account.
///
/// Wire representation (token claims, storage, request bodies) uses the
/// snake_case strings `general_administrator`, `administrator` and
/// `professional`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    GeneralAdministrator,
    Administrator,
    Professional,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::GeneralAdministrator => "general_administrator",
            Role::Administrator => "administrator",
            Role::Professional => "professional",
        }
    }

    /// True for both administrator tiers.
    pub fn is_administrative(&self) -> bool {
        matches!(self, Role::GeneralAdministrator | Role::Administrator)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general_administrator" => Ok(Role::GeneralAdministrator),
            "administrator" => Ok(Role::Administrator),
            "professional" => Ok(Role::Professional),
            other => Err(DomainError::validation(format!(
                "Invalid profile. Should be one of: general_administrator, administrator, professional (got '{other}')"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_strings_round_trip() {
        for role in [
            Role::GeneralAdministrator,
            Role::Administrator,
            Role::Professional,
        ] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&Role::GeneralAdministrator).unwrap();
        assert_eq!(json, "\"general_administrator\"");
    }

    #[test]
    fn unknown_profile_is_rejected() {
        assert!("superuser".parse::<Role>().is_err());
    }
}
