//! Root administrator provisioning.

use medrec_auth::{hash_password, Role};

use crate::error::StoreError;
use crate::models::{NewUser, UserRecord, UserStatus};
use crate::repository::UserRepository;

/// Seed values for the bootstrap administrator account, read from process
/// configuration at startup.
#[derive(Debug, Clone)]
pub struct RootUserConfig {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl RootUserConfig {
    /// Load the root account seed from `MEDREC_ROOT_*` environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let full_name = std::env::var("MEDREC_ROOT_NAME")
            .map_err(|_| anyhow::anyhow!("MEDREC_ROOT_NAME is not set"))?;
        let email = std::env::var("MEDREC_ROOT_EMAIL")
            .map_err(|_| anyhow::anyhow!("MEDREC_ROOT_EMAIL is not set"))?;
        let password = std::env::var("MEDREC_ROOT_PASSWORD")
            .map_err(|_| anyhow::anyhow!("MEDREC_ROOT_PASSWORD is not set"))?;
        let role = std::env::var("MEDREC_ROOT_PROFILE")
            .unwrap_or_else(|_| "general_administrator".to_string())
            .parse::<Role>()
            .map_err(|e| anyhow::anyhow!("MEDREC_ROOT_PROFILE: {e}"))?;
        Ok(Self {
            full_name,
            email,
            password,
            role,
        })
    }
}

/// Ensure the root administrator exists; create it when absent.
///
/// Idempotent: a second call finds the account by email and changes nothing.
/// Returns the record and whether it was created by this call.
pub async fn ensure_root_user(
    users: &dyn UserRepository,
    config: &RootUserConfig,
) -> Result<(UserRecord, bool), StoreError> {
    if let Some(existing) = users.get_user_by_email(&config.email).await? {
        return Ok((existing, false));
    }

    let password_hash = hash_password(&config.password)
        .map_err(|e| StoreError::Database(format!("ensure_root_user: {e}")))?;

    tracing::info!(email = %config.email, "creating root administrator user");
    let record = users
        .add_user(NewUser {
            full_name: config.full_name.clone(),
            email: config.email.clone(),
            password_hash,
            role: config.role,
            admin_id: None,
            status: UserStatus::Active,
        })
        .await?;

    Ok((record, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryUsers;

    fn config() -> RootUserConfig {
        RootUserConfig {
            full_name: "Root Admin".into(),
            email: "root@example.com".into(),
            password: "root-password".into(),
            role: Role::GeneralAdministrator,
        }
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let users = InMemoryUsers::new();

        let (first, created) = ensure_root_user(&users, &config()).await.unwrap();
        assert!(created);
        assert_eq!(first.role, Role::GeneralAdministrator);

        let (second, created) = ensure_root_user(&users, &config()).await.unwrap();
        assert!(!created);
        assert_eq!(second.id, first.id);
    }
}
