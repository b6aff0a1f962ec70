use core_config::{ConfigError, FromEnv};

/// Redis connection settings.
///
/// Construct manually or load from environment variables.
#[derive(Clone, Debug)]
pub struct RedisConfig {
    /// Redis connection URL (required)
    pub url: String,

    /// Optional database number (0-15 for default Redis)
    pub database: Option<u8>,
}

impl RedisConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Connection URL with the database number applied as the URL path,
    /// e.g. `redis://localhost:6379/3`.
    pub fn connection_url(&self) -> String {
        match self.database {
            Some(db) => format!("{}/{}", self.url.trim_end_matches('/'), db),
            None => self.url.clone(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            database: None,
        }
    }
}

/// Load RedisConfig from environment variables.
///
/// - `REDIS_URL` (required) - Redis connection string
/// - `REDIS_DATABASE` (optional) - database number
impl FromEnv for RedisConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let url = std::env::var("REDIS_URL")
            .map_err(|_| ConfigError::MissingEnvVar("REDIS_URL".to_string()))?;

        let database = if let Ok(db_str) = std::env::var("REDIS_DATABASE") {
            Some(db_str.parse().map_err(|e| ConfigError::ParseError {
                key: "REDIS_DATABASE".to_string(),
                details: format!("{}", e),
            })?)
        } else {
            None
        };

        Ok(Self { url, database })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_config_new() {
        let config = RedisConfig::new("redis://localhost:6379");
        assert_eq!(config.url, "redis://localhost:6379");
        assert_eq!(config.database, None);
    }

    #[test]
    fn test_connection_url_applies_database() {
        let mut config = RedisConfig::new("redis://localhost:6379");
        assert_eq!(config.connection_url(), "redis://localhost:6379");

        config.database = Some(3);
        assert_eq!(config.connection_url(), "redis://localhost:6379/3");
    }

    #[test]
    fn test_redis_config_from_env() {
        temp_env::with_var("REDIS_URL", Some("redis://prod:6379"), || {
            let config = RedisConfig::from_env().unwrap();
            assert_eq!(config.url, "redis://prod:6379");
        });
    }

    #[test]
    fn test_redis_config_from_env_missing() {
        temp_env::with_var_unset("REDIS_URL", || {
            let config = RedisConfig::from_env();
            assert!(config.is_err());
        });
    }

    #[test]
    fn test_redis_config_from_env_invalid_database() {
        temp_env::with_vars(
            [
                ("REDIS_URL", Some("redis://localhost:6379")),
                ("REDIS_DATABASE", Some("invalid")),
            ],
            || {
                let config = RedisConfig::from_env();
                assert!(config.is_err());
                assert!(config.unwrap_err().to_string().contains("REDIS_DATABASE"));
            },
        );
    }
}
