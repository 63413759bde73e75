use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    /// Lifetime of customer/provider session tokens.
    pub ttl_minutes: i64,
    /// Lifetime of admin console access tokens.
    pub admin_ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// First admin account, created at startup when no user owns the email.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub jwt: JwtConfig,
    pub admin_seed: Option<AdminSeed>,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "localnest".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "localnest-api".into()),
            ttl_minutes: env_or("JWT_TTL_MINUTES", 60 * 24 * 7),
            admin_ttl_minutes: env_or("JWT_ADMIN_TTL_MINUTES", 60 * 8),
            refresh_ttl_minutes: env_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 7),
        };
        let admin_seed = match (std::env::var("ADMIN_EMAIL"), std::env::var("ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) if !email.trim().is_empty() && !password.is_empty() => {
                Some(AdminSeed {
                    email,
                    password,
                    first_name: std::env::var("ADMIN_FIRST_NAME").unwrap_or_else(|_| "System".into()),
                    last_name: std::env::var("ADMIN_LAST_NAME").unwrap_or_else(|_| "Admin".into()),
                })
            }
            _ => None,
        };
        Ok(Self {
            database_url,
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10),
            jwt,
            admin_seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::env_or;

    #[test]
    fn env_or_falls_back_on_missing_or_garbage() {
        std::env::remove_var("LOCALNEST_TEST_MISSING");
        assert_eq!(env_or("LOCALNEST_TEST_MISSING", 42i64), 42);

        std::env::set_var("LOCALNEST_TEST_GARBAGE", "not-a-number");
        assert_eq!(env_or("LOCALNEST_TEST_GARBAGE", 7u32), 7);

        std::env::set_var("LOCALNEST_TEST_SET", "15");
        assert_eq!(env_or("LOCALNEST_TEST_SET", 7u32), 15);
    }
}
