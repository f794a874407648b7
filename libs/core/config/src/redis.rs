use crate::{env_optional, env_parse, ConfigError, FromEnv};

/// Default lifetime of a cached product listing.
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 600;

/// Listing cache settings. Without `REDIS_URL` the service keeps its cache in memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedisConfig {
    pub url: Option<String>,
    pub ttl_seconds: u64,
}

impl RedisConfig {
    pub fn is_enabled(&self) -> bool {
        self.url.is_some()
    }
}

impl FromEnv for RedisConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let url = env_optional("REDIS_URL");
        let ttl_seconds = env_parse("CACHE_TTL_SECONDS", DEFAULT_CACHE_TTL_SECONDS)?;
        if ttl_seconds == 0 {
            return Err(ConfigError::ParseError {
                key: "CACHE_TTL_SECONDS".to_string(),
                details: "must be greater than zero".to_string(),
            });
        }

        Ok(Self { url, ttl_seconds })
    }
}
