use crate::{env_or_default, env_parse, ConfigError, FromEnv};
use std::path::PathBuf;

pub const DEFAULT_MAX_FILES: usize = 5;
/// 10 MiB
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Where uploaded product images live and how large a batch may be.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub max_files: usize,
    pub max_file_size: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("uploads"),
            max_files: DEFAULT_MAX_FILES,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl FromEnv for UploadConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dir: PathBuf::from(env_or_default("UPLOAD_DIR", "uploads")),
            max_files: env_parse("UPLOAD_MAX_FILES", DEFAULT_MAX_FILES)?,
            max_file_size: env_parse("UPLOAD_MAX_FILE_SIZE", DEFAULT_MAX_FILE_SIZE)?,
        })
    }
}
