//! Image upload pipeline: batch validation, file storage, image records.

use axum::body::Bytes;
use axum::http::StatusCode;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::error::{ProductError, ProductResult};
use crate::i18n::{Localizer, MessageKey, UploadLimits};
use crate::models::ProductImage;
use crate::service::ProductService;
use crate::storage::FileStorage;

/// Extra request body allowance for multipart framing and headers
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// One file part of a multipart upload
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Declared content type is `image/*`
    pub fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
    }
}

/// Why a whole upload batch was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadRejection {
    TooManyFiles,
    FileTooLarge,
    NotAnImage,
}

impl UploadRejection {
    pub fn status(&self) -> StatusCode {
        match self {
            UploadRejection::TooManyFiles => StatusCode::BAD_REQUEST,
            UploadRejection::FileTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            UploadRejection::NotAnImage => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        }
    }

    pub fn message_key(&self) -> MessageKey {
        match self {
            UploadRejection::TooManyFiles => MessageKey::UploadImagesMax5,
            UploadRejection::FileTooLarge => MessageKey::UploadImagesFileLarge,
            UploadRejection::NotAnImage => MessageKey::UploadImagesFileMustBeImage,
        }
    }
}

/// Count, size and type limits of one upload batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadValidator {
    max_files: usize,
    max_file_size: usize,
}

impl UploadValidator {
    pub fn new(max_files: usize, max_file_size: usize) -> Self {
        Self {
            max_files,
            max_file_size,
        }
    }

    /// Check the whole batch before anything is stored.
    ///
    /// The count limit applies to every part received; empty parts are then
    /// dropped and each remaining file is checked for size, then type.
    pub fn validate(&self, files: Vec<UploadedFile>) -> Result<Vec<UploadedFile>, UploadRejection> {
        if files.len() > self.max_files {
            return Err(UploadRejection::TooManyFiles);
        }

        let files: Vec<UploadedFile> = files.into_iter().filter(|f| f.size() > 0).collect();
        for file in &files {
            if file.size() > self.max_file_size {
                return Err(UploadRejection::FileTooLarge);
            }
            if !file.is_image() {
                return Err(UploadRejection::NotAnImage);
            }
        }

        Ok(files)
    }

    pub fn max_files(&self) -> usize {
        self.max_files
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    pub fn limits(&self) -> UploadLimits {
        UploadLimits {
            max_files: self.max_files,
            max_file_size: self.max_file_size,
        }
    }
}

#[derive(Clone)]
pub struct ImageUploadService {
    products: ProductService,
    storage: Arc<dyn FileStorage>,
    validator: UploadValidator,
    localizer: Arc<dyn Localizer>,
}

impl ImageUploadService {
    pub fn new(
        products: ProductService,
        storage: impl FileStorage + 'static,
        validator: UploadValidator,
        localizer: impl Localizer + 'static,
    ) -> Self {
        Self {
            products,
            storage: Arc::new(storage),
            validator,
            localizer: Arc::new(localizer),
        }
    }

    /// Localized error for a refused batch
    pub fn reject(&self, rejection: UploadRejection) -> ProductError {
        ProductError::UploadRejected {
            rejection,
            message: self
                .localizer
                .message(rejection.message_key(), &self.validator.limits()),
        }
    }

    pub fn validator(&self) -> &UploadValidator {
        &self.validator
    }

    /// Validate, store and record a batch of images for an existing product.
    ///
    /// All or nothing: the product stays locked from the capacity check until
    /// the records are written, and files stored for a batch that fails later
    /// are removed again.
    #[instrument(skip(self, files), fields(files = files.len()))]
    pub async fn upload_images(
        &self,
        product_id: i64,
        files: Vec<UploadedFile>,
    ) -> ProductResult<Vec<ProductImage>> {
        self.products.get_product_by_id(product_id).await?;
        let files = self
            .validator
            .validate(files)
            .map_err(|rejection| self.reject(rejection))?;

        let reservation = self.products.reserve_images(product_id, files.len()).await?;

        let mut stored = Vec::with_capacity(files.len());
        for file in &files {
            match self.storage.store(file).await {
                Ok(name) => stored.push(name),
                Err(e) => {
                    self.discard_files(&stored).await;
                    return Err(e);
                }
            }
        }

        match reservation.record(stored.clone()).await {
            Ok(images) => {
                info!(product_id, stored = images.len(), "Uploaded product images");
                Ok(images)
            }
            Err(e) => {
                self.discard_files(&stored).await;
                Err(e)
            }
        }
    }

    async fn discard_files(&self, names: &[String]) {
        for name in names {
            if let Err(e) = self.storage.remove(name).await {
                warn!(file = %name, error = %e, "Failed to remove stored image");
            }
        }
    }

    pub async fn load_image(&self, name: &str) -> ProductResult<Bytes> {
        self.storage.load(name).await
    }

    /// Request body limit large enough for a full batch
    pub fn body_limit(&self) -> usize {
        self.validator
            .max_files()
            .saturating_mul(self.validator.max_file_size())
            .saturating_add(MULTIPART_OVERHEAD)
    }
}
