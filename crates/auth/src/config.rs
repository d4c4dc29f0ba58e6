//! Authorization configuration.
//!
//! Built once at process start and passed by reference into the token codec
//! and the request middleware. There is no ambient/global settings object;
//! rotating the secret key invalidates every previously issued token (known
//! limitation, no migration path).

use chrono::Duration;

/// Default token lifetime: 24 hours.
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 1440;

/// Configuration for token issuance and request authentication.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC-SHA256 signing secret for identity tokens.
    pub secret_key: String,
    /// Static API key every request must present in the `api_key` header.
    pub api_key: String,
    /// Default token lifetime in minutes, used when issuance does not
    /// override it.
    pub token_ttl_minutes: i64,
}

impl AuthConfig {
    pub fn new(secret_key: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            api_key: api_key.into(),
            token_ttl_minutes: DEFAULT_TOKEN_TTL_MINUTES,
        }
    }

    /// Load the configuration from the process environment.
    ///
    /// `MEDREC_SECRET_KEY` and `MEDREC_API_KEY` are required;
    /// `MEDREC_TOKEN_TTL_MINUTES` is optional and defaults to 1440.
    pub fn from_env() -> anyhow::Result<Self> {
        let secret_key = std::env::var("MEDREC_SECRET_KEY")
            .map_err(|_| anyhow::anyhow!("MEDREC_SECRET_KEY is not set"))?;
        let api_key = std::env::var("MEDREC_API_KEY")
            .map_err(|_| anyhow::anyhow!("MEDREC_API_KEY is not set"))?;

        let token_ttl_minutes = match std::env::var("MEDREC_TOKEN_TTL_MINUTES") {
            Ok(raw) => raw
                .parse::<i64>()
                .map_err(|e| anyhow::anyhow!("MEDREC_TOKEN_TTL_MINUTES: {e}"))?,
            Err(_) => DEFAULT_TOKEN_TTL_MINUTES,
        };

        Ok(Self {
            secret_key,
            api_key,
            token_ttl_minutes,
        })
    }

    /// Default token lifetime as a duration.
    pub fn token_ttl(&self) -> Duration {
        Duration::minutes(self.token_ttl_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ttl_is_24_hours() {
        let config = AuthConfig::new("secret", "key");
        assert_eq!(config.token_ttl(), Duration::hours(24));
    }
}
