//! Localized user-facing messages.

use std::str::FromStr;
use strum::{Display, EnumString};

/// Keys of messages shown to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum MessageKey {
    #[strum(serialize = "UPLOAD_IMAGES_MAX_5")]
    UploadImagesMax5,
    #[strum(serialize = "UPLOAD_IMAGES_FILE_LARGE")]
    UploadImagesFileLarge,
    #[strum(serialize = "UPLOAD_IMAGES_FILE_MUST_BE_IMAGE")]
    UploadImagesFileMustBeImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Language {
    En,
    #[default]
    Vi,
}

/// Limits quoted by upload messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_files: usize,
    pub max_file_size: usize,
}

pub trait Localizer: Send + Sync {
    fn message(&self, key: MessageKey, limits: &UploadLimits) -> String;
}

/// `10485760` reads as `10MB`, `512000` as `500KB`
fn size_label(bytes: usize) -> String {
    const KIB: usize = 1024;
    const MIB: usize = 1024 * KIB;

    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else if bytes >= KIB && bytes % KIB == 0 {
        format!("{}KB", bytes / KIB)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Built-in message tables
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticLocalizer {
    language: Language,
}

impl StaticLocalizer {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    /// Unknown tags fall back to the default language.
    pub fn from_tag(tag: &str) -> Self {
        let language = Language::from_str(tag).unwrap_or_else(|_| {
            tracing::warn!(tag, "Unsupported language, using default");
            Language::default()
        });
        Self::new(language)
    }

    pub fn language(&self) -> Language {
        self.language
    }
}

impl Localizer for StaticLocalizer {
    fn message(&self, key: MessageKey, limits: &UploadLimits) -> String {
        let size = size_label(limits.max_file_size);
        match (self.language, key) {
            (Language::En, MessageKey::UploadImagesMax5) => {
                format!("You can only upload up to {} images", limits.max_files)
            }
            (Language::En, MessageKey::UploadImagesFileLarge) => {
                format!("File size exceeds {}", size)
            }
            (Language::En, MessageKey::UploadImagesFileMustBeImage) => {
                "File must be an image".to_string()
            }
            (Language::Vi, MessageKey::UploadImagesMax5) => {
                format!("Chỉ được upload tối đa {} ảnh", limits.max_files)
            }
            (Language::Vi, MessageKey::UploadImagesFileLarge) => {
                format!("Kích thước file vượt quá {}", size)
            }
            (Language::Vi, MessageKey::UploadImagesFileMustBeImage) => {
                "File phải là định dạng ảnh".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_tags() {
        assert_eq!(StaticLocalizer::from_tag("EN").language(), Language::En);
        assert_eq!(StaticLocalizer::from_tag("vi").language(), Language::Vi);
        assert_eq!(StaticLocalizer::from_tag("fr").language(), Language::Vi);
    }

    #[test]
    fn test_message_key_names() {
        assert_eq!(MessageKey::UploadImagesMax5.to_string(), "UPLOAD_IMAGES_MAX_5");
        assert_eq!(
            MessageKey::from_str("UPLOAD_IMAGES_FILE_MUST_BE_IMAGE").unwrap(),
            MessageKey::UploadImagesFileMustBeImage
        );
    }

    const DEFAULT_LIMITS: UploadLimits = UploadLimits {
        max_files: 5,
        max_file_size: 10 * 1024 * 1024,
    };

    #[test]
    fn test_messages_per_language() {
        let vi = StaticLocalizer::new(Language::Vi);
        let en = StaticLocalizer::new(Language::En);

        assert_eq!(
            vi.message(MessageKey::UploadImagesMax5, &DEFAULT_LIMITS),
            "Chỉ được upload tối đa 5 ảnh"
        );
        assert_eq!(
            en.message(MessageKey::UploadImagesFileLarge, &DEFAULT_LIMITS),
            "File size exceeds 10MB"
        );
        assert_eq!(
            en.message(MessageKey::UploadImagesFileMustBeImage, &DEFAULT_LIMITS),
            "File must be an image"
        );
    }

    #[test]
    fn test_messages_follow_configured_limits() {
        let limits = UploadLimits {
            max_files: 3,
            max_file_size: 500 * 1024,
        };
        let vi = StaticLocalizer::new(Language::Vi);
        let en = StaticLocalizer::new(Language::En);

        assert_eq!(
            vi.message(MessageKey::UploadImagesMax5, &limits),
            "Chỉ được upload tối đa 3 ảnh"
        );
        assert_eq!(
            en.message(MessageKey::UploadImagesFileLarge, &limits),
            "File size exceeds 500KB"
        );
    }

    #[test]
    fn test_size_label() {
        assert_eq!(size_label(10 * 1024 * 1024), "10MB");
        assert_eq!(size_label(2048), "2KB");
        assert_eq!(size_label(1500), "1500 bytes");
    }
}
