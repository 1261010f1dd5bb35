use serde::Deserialize;

use crate::models::split_csv;

pub const DEV_JWT_SECRET: &str = "scent-api-development-secret";

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// PostgreSQL connection URL; the in-memory store is used when unset
    pub database_url: Option<String>,

    /// Redis connection URL; catalog caching is disabled when unset
    pub redis_url: Option<String>,

    /// HMAC secret for access tokens
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    #[serde(default = "default_token_ttl_minutes")]
    pub token_ttl_minutes: i64,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Comma-separated list of allowed browser origins
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,

    /// Comma-separated e-mails that register as administrators
    #[serde(default)]
    pub admin_emails: String,

    /// Number of perfumes returned when a request does not ask for a limit
    #[serde(default = "default_recommendation_limit")]
    pub recommendation_limit: usize,

    /// Load the bundled catalog when the perfume table is empty
    #[serde(default = "default_seed_catalog")]
    pub seed_catalog: bool,

    #[serde(default = "default_catalog_cache_ttl_secs")]
    pub catalog_cache_ttl_secs: u64,

    /// bcrypt work factor for new password hashes
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

fn default_jwt_secret() -> String {
    DEV_JWT_SECRET.to_string()
}

fn default_token_ttl_minutes() -> i64 {
    30
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_cors_origins() -> String {
    "http://localhost:5173,http://127.0.0.1:5173".to_string()
}

fn default_recommendation_limit() -> usize {
    5
}

fn default_seed_catalog() -> bool {
    true
}

fn default_catalog_cache_ttl_secs() -> u64 {
    300
}

fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            redis_url: None,
            jwt_secret: default_jwt_secret(),
            token_ttl_minutes: default_token_ttl_minutes(),
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
            admin_emails: String::new(),
            recommendation_limit: default_recommendation_limit(),
            seed_catalog: default_seed_catalog(),
            catalog_cache_ttl_secs: default_catalog_cache_ttl_secs(),
            bcrypt_cost: default_bcrypt_cost(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

        if config.jwt_secret == DEV_JWT_SECRET {
            tracing::warn!("JWT_SECRET not set, using the development secret");
        }
        Ok(config)
    }

    pub fn cors_origins(&self) -> Vec<String> {
        split_csv(&self.cors_origins).map(str::to_string).collect()
    }

    /// Lower-cased administrator e-mails
    pub fn admin_emails(&self) -> Vec<String> {
        split_csv(&self.admin_emails).map(str::to_lowercase).collect()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.token_ttl_minutes, 30);
        assert_eq!(config.recommendation_limit, 5);
        assert_eq!(config.bind_address(), "127.0.0.1:3000");
        assert_eq!(config.cors_origins().len(), 2);
    }

    #[test]
    fn test_admin_emails() {
        let config = Config {
            admin_emails: "root@example.com, Ops@Example.com".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.admin_emails(),
            vec!["root@example.com".to_string(), "ops@example.com".to_string()]
        );
        assert!(Config::default().admin_emails().is_empty());
    }

    #[test]
    fn test_from_env_map() {
        let vars = vec![
            ("PORT".to_string(), "8080".to_string()),
            ("SEED_CATALOG".to_string(), "false".to_string()),
        ];
        let config: Config = envy::from_iter(vars).unwrap();
        assert_eq!(config.port, 8080);
        assert!(!config.seed_catalog);
        assert!(config.database_url.is_none());
    }
}
