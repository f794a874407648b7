use core_config::{
    app_info, env_optional, locale::LocaleConfig, redis::RedisConfig, server::ServerConfig,
    uploads::UploadConfig, AppInfo, FromEnv,
};

pub use core_config::Environment;

/// Application configuration, composed from the shared `core_config` pieces
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub server: ServerConfig,
    pub redis: RedisConfig,
    pub uploads: UploadConfig,
    pub locale: LocaleConfig,
    /// Optional; events are only logged without it
    pub nats_url: Option<String>,
    pub environment: Environment,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        Ok(Self {
            app: app_info!(),
            server: ServerConfig::from_env()?, // HOST=0.0.0.0, PORT=8080 by default
            redis: RedisConfig::from_env()?,   // in-memory cache without REDIS_URL
            uploads: UploadConfig::from_env()?,
            locale: LocaleConfig::from_env()?,
            nats_url: env_optional("NATS_URL"),
            environment: Environment::from_env(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        temp_env::with_vars(
            [
                ("PORT", None::<&str>),
                ("REDIS_URL", None),
                ("NATS_URL", None),
                ("UPLOAD_DIR", None),
                ("APP_LANGUAGE", None),
                ("APP_ENV", None),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.app.name, "shop_api");
                assert_eq!(config.server.port, 8080);
                assert!(!config.redis.is_enabled());
                assert_eq!(config.nats_url, None);
                assert_eq!(config.locale.language, "vi");
                assert!(config.environment.is_development());
            },
        );
    }

    #[test]
    fn test_config_invalid_port_fails() {
        temp_env::with_var("PORT", Some("http"), || {
            assert!(Config::from_env().is_err());
        });
    }
}
