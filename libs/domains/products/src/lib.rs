//! Products Domain
//!
//! Product catalog: products, categories, product images, image uploads and
//! cached paginated listings.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ Handlers                                 │  ← HTTP endpoints, input validation
//! └──────┬──────────────┬───────────────┬────┘
//!        │              │               │
//! ┌──────▼──────┐ ┌─────▼──────┐ ┌──────▼───────────┐
//! │ Listing     │ │  Service   │ │ ImageUpload      │
//! │ (cache)     │ │            │ │ (validate+store) │
//! └──────┬──────┘ └─────┬──────┘ └──────┬───────────┘
//!        │              │               │
//! ┌──────▼──────┐ ┌─────▼──────┐ ┌──────▼──────┐
//! │ProductCache │ │Repositories│ │ FileStorage │
//! └─────────────┘ └────────────┘ └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_products::{
//!     handlers::{self, CatalogState},
//!     CatalogBuilder,
//! };
//!
//! # fn example() {
//! let state: CatalogState = CatalogBuilder::in_memory("uploads").build();
//! let router = handlers::api_router(state);
//! # }
//! ```

pub mod cache;
pub mod error;
pub mod events;
pub mod extract;
pub mod handlers;
pub mod i18n;
pub mod listing;
pub mod models;
pub mod repository;
pub mod service;
pub mod storage;
pub mod upload;

use std::path::PathBuf;

// Re-export commonly used types
pub use cache::{InMemoryProductCache, ListingKey, ProductCache, RedisProductCache};
pub use error::{ProductError, ProductResult};
pub use events::{EventPublisher, LogEventPublisher, NatsEventPublisher, ProductEvent};
pub use handlers::{ApiDoc, CatalogState};
pub use i18n::{Language, Localizer, MessageKey, StaticLocalizer, UploadLimits};
pub use listing::ProductListing;
pub use models::{
    Category, CategoryDto, PageRequest, Product, ProductDto, ProductImage, ProductImageDto,
    ProductListResponse, ProductPage, ProductResponse, MAXIMUM_IMAGES_PER_PRODUCT,
};
pub use repository::{
    CategoryRepository, InMemoryCategoryRepository, InMemoryProductImageRepository,
    InMemoryProductRepository, ProductImageRepository, ProductRepository,
};
pub use service::{ImageReservation, ProductService};
pub use storage::{FileStorage, LocalFileStorage, NOT_FOUND_IMAGE};
pub use upload::{ImageUploadService, UploadRejection, UploadValidator, UploadedFile};

/// Default upload limits: 5 files of at most 10 MiB each
pub const DEFAULT_MAX_FILES: usize = 5;
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Wires the catalog components into a [`CatalogState`].
///
/// Defaults to in-memory repositories and cache, the log-only event
/// publisher and Vietnamese messages; each piece can be swapped.
pub struct CatalogBuilder {
    products: ProductService,
    upload_dir: PathBuf,
    validator: UploadValidator,
    listing: Box<dyn FnOnce(ProductService) -> ProductListing>,
    localizer: StaticLocalizer,
}

impl CatalogBuilder {
    pub fn in_memory(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            products: ProductService::new(
                InMemoryProductRepository::new(),
                InMemoryCategoryRepository::new(),
                InMemoryProductImageRepository::new(),
            ),
            upload_dir: upload_dir.into(),
            validator: UploadValidator::new(DEFAULT_MAX_FILES, DEFAULT_MAX_FILE_SIZE),
            listing: Box::new(|products| ProductListing::new(products, InMemoryProductCache::new())),
            localizer: StaticLocalizer::default(),
        }
    }

    pub fn with_cache(mut self, cache: impl ProductCache + 'static) -> Self {
        self.listing = Box::new(move |products| ProductListing::new(products, cache));
        self
    }

    pub fn with_events(mut self, events: impl EventPublisher + 'static) -> Self {
        self.products = self.products.with_events(events);
        self
    }

    pub fn with_validator(mut self, validator: UploadValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_localizer(mut self, localizer: StaticLocalizer) -> Self {
        self.localizer = localizer;
        self
    }

    pub fn build(self) -> CatalogState {
        let listing = (self.listing)(self.products.clone());
        let uploads = ImageUploadService::new(
            self.products.clone(),
            LocalFileStorage::new(self.upload_dir),
            self.validator,
            self.localizer,
        );

        CatalogState {
            products: self.products,
            listing,
            uploads,
        }
    }
}
