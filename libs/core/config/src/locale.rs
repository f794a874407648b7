use crate::{env_or_default, ConfigError, FromEnv};

/// Language used for user-facing upload messages (`APP_LANGUAGE`, default `vi`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocaleConfig {
    pub language: String,
}

impl FromEnv for LocaleConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let language = env_or_default("APP_LANGUAGE", "vi").trim().to_lowercase();
        if language.is_empty() {
            return Err(ConfigError::ParseError {
                key: "APP_LANGUAGE".to_string(),
                details: "language tag is empty".to_string(),
            });
        }
        Ok(Self { language })
    }
}
