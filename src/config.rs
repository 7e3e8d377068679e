use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt: JwtConfig,
    pub invitation_ttl_days: i64,
    /// Upper bound applied by handlers before a list query runs.
    pub max_items_per_page: i64,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "campusdesk".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "campusdesk-users".into()),
            ttl_minutes: env_or("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: env_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };
        Ok(Self {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_or("APP_PORT", 8080),
            database_url,
            database_max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10),
            jwt,
            invitation_ttl_days: env_or("INVITATION_TTL_DAYS", 7),
            max_items_per_page: env_or("MAX_ITEMS_PER_PAGE", 10_000),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back_on_missing_or_garbage() {
        assert_eq!(env_or("CAMPUSDESK_TEST_UNSET_KEY", 42u32), 42);
        std::env::set_var("CAMPUSDESK_TEST_GARBAGE_KEY", "not-a-number");
        assert_eq!(env_or("CAMPUSDESK_TEST_GARBAGE_KEY", 7i64), 7);
        std::env::set_var("CAMPUSDESK_TEST_NUMBER_KEY", "25");
        assert_eq!(env_or("CAMPUSDESK_TEST_NUMBER_KEY", 7i64), 25);
    }
}
