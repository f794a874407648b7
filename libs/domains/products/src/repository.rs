use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{ProductError, ProductResult};
use crate::models::{
    Category, NewProduct, NewProductImage, PageRequest, Product, ProductImage, ProductSlice,
};

/// Repository trait for Product persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Persist a new product and assign its id
    async fn create(&self, input: NewProduct) -> ProductResult<Product>;

    /// Replace a stored product
    async fn update(&self, product: Product) -> ProductResult<Product>;

    async fn find_by_id(&self, id: i64) -> ProductResult<Option<Product>>;

    /// Products whose id is in `ids`; unknown ids are skipped
    async fn find_by_ids(&self, ids: &[i64]) -> ProductResult<Vec<Product>>;

    async fn exists_by_name(&self, name: &str) -> ProductResult<bool>;

    async fn delete(&self, id: i64) -> ProductResult<()>;

    /// Filtered page ordered by id ascending.
    ///
    /// An empty `keyword` and a `None` category both mean "no filter".
    async fn search(
        &self,
        keyword: &str,
        category_id: Option<i64>,
        page: PageRequest,
    ) -> ProductResult<ProductSlice>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn create(&self, name: String) -> ProductResult<Category>;

    async fn find_by_id(&self, id: i64) -> ProductResult<Option<Category>>;

    async fn list(&self) -> ProductResult<Vec<Category>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductImageRepository: Send + Sync {
    async fn create(&self, input: NewProductImage) -> ProductResult<ProductImage>;

    async fn find_by_product_id(&self, product_id: i64) -> ProductResult<Vec<ProductImage>>;

    async fn count_by_product_id(&self, product_id: i64) -> ProductResult<usize>;

    async fn delete_by_product_id(&self, product_id: i64) -> ProductResult<()>;

    /// Remove one image record; unknown ids are ignored
    async fn delete(&self, id: i64) -> ProductResult<()>;
}

/// In-memory implementation of ProductRepository (for development/testing)
#[derive(Debug, Clone)]
pub struct InMemoryProductRepository {
    products: Arc<RwLock<BTreeMap<i64, Product>>>,
    next_id: Arc<AtomicI64>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self {
            products: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }
}

impl Default for InMemoryProductRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_keyword(product: &Product, keyword: &str) -> bool {
    if keyword.is_empty() {
        return true;
    }
    let keyword = keyword.to_lowercase();
    product.name.to_lowercase().contains(&keyword)
        || product.description.to_lowercase().contains(&keyword)
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn create(&self, input: NewProduct) -> ProductResult<Product> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        let product = Product {
            id,
            name: input.name,
            price: input.price,
            thumbnail: input.thumbnail,
            description: input.description,
            category_id: input.category_id,
            created_at: now,
            updated_at: now,
        };

        self.products.write().await.insert(id, product.clone());

        tracing::info!(product_id = id, "Created product");
        Ok(product)
    }

    async fn update(&self, mut product: Product) -> ProductResult<Product> {
        let mut products = self.products.write().await;
        let stored = products
            .get_mut(&product.id)
            .ok_or_else(|| ProductError::product_not_found(product.id))?;

        product.created_at = stored.created_at;
        product.updated_at = Utc::now();
        *stored = product.clone();

        tracing::info!(product_id = product.id, "Updated product");
        Ok(product)
    }

    async fn find_by_id(&self, id: i64) -> ProductResult<Option<Product>> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[i64]) -> ProductResult<Vec<Product>> {
        let products = self.products.read().await;
        Ok(ids.iter().filter_map(|id| products.get(id).cloned()).collect())
    }

    async fn exists_by_name(&self, name: &str) -> ProductResult<bool> {
        let products = self.products.read().await;
        Ok(products.values().any(|p| p.name == name))
    }

    async fn delete(&self, id: i64) -> ProductResult<()> {
        if self.products.write().await.remove(&id).is_some() {
            tracing::info!(product_id = id, "Deleted product");
        }
        Ok(())
    }

    async fn search(
        &self,
        keyword: &str,
        category_id: Option<i64>,
        page: PageRequest,
    ) -> ProductResult<ProductSlice> {
        let products = self.products.read().await;

        // BTreeMap iteration is already ordered by id
        let matching: Vec<&Product> = products
            .values()
            .filter(|p| category_id.is_none_or(|category| p.category_id == category))
            .filter(|p| matches_keyword(p, keyword))
            .collect();

        let total_elements = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(page.offset())
            .take(page.size as usize)
            .cloned()
            .collect();

        Ok(ProductSlice {
            items,
            total_elements,
        })
    }
}

/// In-memory implementation of CategoryRepository
#[derive(Debug, Clone)]
pub struct InMemoryCategoryRepository {
    categories: Arc<RwLock<BTreeMap<i64, Category>>>,
    next_id: Arc<AtomicI64>,
}

impl InMemoryCategoryRepository {
    pub fn new() -> Self {
        Self {
            categories: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }
}

impl Default for InMemoryCategoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CategoryRepository for InMemoryCategoryRepository {
    async fn create(&self, name: String) -> ProductResult<Category> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let category = Category { id, name };
        self.categories.write().await.insert(id, category.clone());

        tracing::info!(category_id = id, "Created category");
        Ok(category)
    }

    async fn find_by_id(&self, id: i64) -> ProductResult<Option<Category>> {
        Ok(self.categories.read().await.get(&id).cloned())
    }

    async fn list(&self) -> ProductResult<Vec<Category>> {
        Ok(self.categories.read().await.values().cloned().collect())
    }
}

/// In-memory implementation of ProductImageRepository
#[derive(Debug, Clone)]
pub struct InMemoryProductImageRepository {
    images: Arc<RwLock<BTreeMap<i64, ProductImage>>>,
    next_id: Arc<AtomicI64>,
}

impl InMemoryProductImageRepository {
    pub fn new() -> Self {
        Self {
            images: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }
}

impl Default for InMemoryProductImageRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProductImageRepository for InMemoryProductImageRepository {
    async fn create(&self, input: NewProductImage) -> ProductResult<ProductImage> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let image = ProductImage {
            id,
            product_id: input.product_id,
            image_url: input.image_url,
        };
        self.images.write().await.insert(id, image.clone());

        tracing::info!(image_id = id, product_id = image.product_id, "Created product image");
        Ok(image)
    }

    async fn find_by_product_id(&self, product_id: i64) -> ProductResult<Vec<ProductImage>> {
        let images = self.images.read().await;
        Ok(images
            .values()
            .filter(|image| image.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn count_by_product_id(&self, product_id: i64) -> ProductResult<usize> {
        let images = self.images.read().await;
        Ok(images
            .values()
            .filter(|image| image.product_id == product_id)
            .count())
    }

    async fn delete_by_product_id(&self, product_id: i64) -> ProductResult<()> {
        self.images
            .write()
            .await
            .retain(|_, image| image.product_id != product_id);
        Ok(())
    }

    async fn delete(&self, id: i64) -> ProductResult<()> {
        self.images.write().await.remove(&id);
        Ok(())
    }
}
