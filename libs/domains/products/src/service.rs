//! Product Service - Business logic layer

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{instrument, warn};

use crate::error::{ProductError, ProductResult};
use crate::events::{EventPublisher, LogEventPublisher, ProductEvent};
use crate::models::{
    Category, CategoryDto, NewProductImage, PageRequest, Product, ProductDto, ProductImage,
    ProductImageDto, ProductPage, ProductResponse, MAXIMUM_IMAGES_PER_PRODUCT,
};
use crate::repository::{CategoryRepository, ProductImageRepository, ProductRepository};

/// One async mutex per product id, serializing writes to that product.
///
/// Entries are only created for products that exist and are dropped again
/// when the product is deleted.
#[derive(Clone, Default)]
struct ProductLocks {
    inner: Arc<Mutex<HashMap<i64, Arc<Mutex<()>>>>>,
}

impl ProductLocks {
    async fn acquire(&self, product_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.inner.lock().await;
            locks.entry(product_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    async fn forget(&self, product_id: i64) {
        self.inner.lock().await.remove(&product_id);
    }
}

/// Exclusive hold on a product's images with room for a batch of new ones.
///
/// Obtained from [`ProductService::reserve_images`]. The product stays
/// locked until the reservation is recorded or dropped, so callers can do
/// slow work (storing files) between the capacity check and the insert.
pub struct ImageReservation<'a> {
    service: &'a ProductService,
    product: Product,
    slots: usize,
    _guard: OwnedMutexGuard<()>,
}

impl ImageReservation<'_> {
    /// Insert one image record per url, all or none.
    ///
    /// The first image becomes the thumbnail when the product has none.
    /// On failure the records created so far are removed again.
    #[instrument(skip(self, image_urls), fields(product_id = self.product.id, images = image_urls.len()))]
    pub async fn record(self, image_urls: Vec<String>) -> ProductResult<Vec<ProductImage>> {
        let ImageReservation {
            service,
            mut product,
            slots,
            _guard,
        } = self;

        if image_urls.len() > slots {
            return Err(ProductError::Internal(format!(
                "{} images recorded against {} reserved slots",
                image_urls.len(),
                slots
            )));
        }

        let mut created = Vec::with_capacity(image_urls.len());
        for image_url in image_urls {
            let result = service
                .images
                .create(NewProductImage {
                    product_id: product.id,
                    image_url,
                })
                .await;
            match result {
                Ok(image) => created.push(image),
                Err(e) => {
                    service.discard_images(&created).await;
                    return Err(e);
                }
            }
        }

        if product.thumbnail.is_none() {
            if let Some(first) = created.first() {
                product.thumbnail = Some(first.image_url.clone());
                if let Err(e) = service.products.update(product).await {
                    service.discard_images(&created).await;
                    return Err(e);
                }
            }
        }

        for image in &created {
            service.events.publish(ProductEvent::image_added(image));
        }
        Ok(created)
    }
}

fn too_many_images() -> ProductError {
    ProductError::InvalidParam(format!(
        "Number of images must be <= {}",
        MAXIMUM_IMAGES_PER_PRODUCT
    ))
}

/// Product service providing business logic operations
///
/// Input DTOs are expected to be validated by the caller; the service checks
/// the rules that need storage (category existence, the image cap).
#[derive(Clone)]
pub struct ProductService {
    products: Arc<dyn ProductRepository>,
    categories: Arc<dyn CategoryRepository>,
    images: Arc<dyn ProductImageRepository>,
    events: Arc<dyn EventPublisher>,
    locks: ProductLocks,
}

impl ProductService {
    pub fn new(
        products: impl ProductRepository + 'static,
        categories: impl CategoryRepository + 'static,
        images: impl ProductImageRepository + 'static,
    ) -> Self {
        Self {
            products: Arc::new(products),
            categories: Arc::new(categories),
            images: Arc::new(images),
            events: Arc::new(LogEventPublisher),
            locks: ProductLocks::default(),
        }
    }

    /// Replace the default log-only publisher
    pub fn with_events(mut self, events: impl EventPublisher + 'static) -> Self {
        self.events = Arc::new(events);
        self
    }

    #[instrument(skip(self, input), fields(category_name = %input.name))]
    pub async fn create_category(&self, input: CategoryDto) -> ProductResult<Category> {
        self.categories.create(input.name).await
    }

    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> ProductResult<Vec<Category>> {
        self.categories.list().await
    }

    async fn require_category(&self, category_id: i64) -> ProductResult<Category> {
        self.categories
            .find_by_id(category_id)
            .await?
            .ok_or_else(|| ProductError::category_not_found(category_id))
    }

    async fn require_product(&self, id: i64) -> ProductResult<Product> {
        self.products
            .find_by_id(id)
            .await?
            .ok_or_else(|| ProductError::product_not_found(id))
    }

    /// Lock an existing product and read it under the lock.
    ///
    /// Unknown ids fail before a lock entry is created; a product deleted
    /// while waiting fails after its entry is dropped again.
    async fn lock_product(&self, id: i64) -> ProductResult<(OwnedMutexGuard<()>, Product)> {
        self.require_product(id).await?;

        let guard = self.locks.acquire(id).await;
        match self.products.find_by_id(id).await? {
            Some(product) => Ok((guard, product)),
            None => {
                drop(guard);
                self.locks.forget(id).await;
                Err(ProductError::product_not_found(id))
            }
        }
    }

    async fn discard_images(&self, images: &[ProductImage]) {
        for image in images {
            if let Err(e) = self.images.delete(image.id).await {
                warn!(image_id = image.id, error = %e, "Failed to discard image record");
            }
        }
    }

    /// Create a new product in an existing category
    #[instrument(skip(self, input), fields(product_name = %input.name))]
    pub async fn create_product(&self, input: ProductDto) -> ProductResult<Product> {
        self.require_category(input.category_id).await?;

        let product = self.products.create(input.into()).await?;
        self.events.publish(ProductEvent::created(&product));
        Ok(product)
    }

    /// Product detail with its images
    #[instrument(skip(self))]
    pub async fn get_product_by_id(&self, id: i64) -> ProductResult<ProductResponse> {
        let product = self.require_product(id).await?;
        let images = self.images.find_by_product_id(id).await?;
        Ok(ProductResponse::from_product(product, images))
    }

    #[instrument(skip(self))]
    pub async fn find_products_by_ids(&self, ids: &[i64]) -> ProductResult<Vec<Product>> {
        self.products.find_by_ids(ids).await
    }

    /// Replace name, description, price and category of a product.
    ///
    /// The thumbnail is only replaced when the input carries one.
    #[instrument(skip(self, input))]
    pub async fn update_product(&self, id: i64, input: ProductDto) -> ProductResult<Product> {
        let (_guard, mut product) = self.lock_product(id).await?;
        self.require_category(input.category_id).await?;

        product.name = input.name;
        product.description = input.description;
        product.price = input.price;
        product.category_id = input.category_id;
        if input.thumbnail.is_some() {
            product.thumbnail = input.thumbnail;
        }

        let product = self.products.update(product).await?;
        self.events.publish(ProductEvent::updated(&product));
        Ok(product)
    }

    /// Remove a product and its images. Unknown ids are ignored.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: i64) -> ProductResult<()> {
        if self.products.find_by_id(id).await?.is_none() {
            return Ok(());
        }

        let _guard = self.locks.acquire(id).await;
        self.images.delete_by_product_id(id).await?;
        self.products.delete(id).await?;
        self.locks.forget(id).await;

        self.events.publish(ProductEvent::Deleted { id });
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn exists_by_name(&self, name: &str) -> ProductResult<bool> {
        self.products.exists_by_name(name).await
    }

    /// Filtered page of product summaries.
    ///
    /// A `category_id` of 0 (or below) disables the category filter. Every
    /// summary carries the page count of the whole result.
    #[instrument(skip(self))]
    pub async fn get_all_products(
        &self,
        keyword: &str,
        category_id: i64,
        page: PageRequest,
    ) -> ProductResult<ProductPage> {
        let category = (category_id > 0).then_some(category_id);
        let slice = self.products.search(keyword.trim(), category, page).await?;
        let total_pages = page.total_pages(slice.total_elements);

        let mut content = Vec::with_capacity(slice.items.len());
        for product in slice.items {
            let images = self.images.find_by_product_id(product.id).await?;
            let mut summary = ProductResponse::from_product(product, images);
            summary.total_pages = total_pages;
            content.push(summary);
        }

        Ok(ProductPage {
            content,
            total_pages,
            total_elements: slice.total_elements,
            page,
        })
    }

    /// Lock a product and check that `count` more images fit under
    /// [`MAXIMUM_IMAGES_PER_PRODUCT`].
    #[instrument(skip(self))]
    pub async fn reserve_images(
        &self,
        product_id: i64,
        count: usize,
    ) -> ProductResult<ImageReservation<'_>> {
        let (guard, product) = self.lock_product(product_id).await?;

        let existing = self.images.count_by_product_id(product_id).await?;
        if existing + count > MAXIMUM_IMAGES_PER_PRODUCT {
            warn!(product_id, existing, requested = count, "Image limit reached");
            return Err(too_many_images());
        }

        Ok(ImageReservation {
            service: self,
            product,
            slots: count,
            _guard: guard,
        })
    }

    /// Attach an image to a product.
    ///
    /// Fails with `InvalidParam` once the product already holds
    /// [`MAXIMUM_IMAGES_PER_PRODUCT`] images. The first image of a product
    /// without a thumbnail becomes its thumbnail.
    #[instrument(skip(self, input))]
    pub async fn create_product_image(
        &self,
        product_id: i64,
        input: ProductImageDto,
    ) -> ProductResult<ProductImage> {
        let reservation = self.reserve_images(product_id, 1).await?;
        reservation
            .record(vec![input.image_url])
            .await?
            .pop()
            .ok_or_else(|| ProductError::Internal("Image was not recorded".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn get_product_images(&self, product_id: i64) -> ProductResult<Vec<ProductImage>> {
        self.require_product(product_id).await?;
        self.images.find_by_product_id(product_id).await
    }
}
