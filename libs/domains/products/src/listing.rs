//! Cache-aside read path for paginated product listings.

use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::cache::{ListingKey, ProductCache};
use crate::error::ProductResult;
use crate::models::{PageRequest, ProductListResponse};
use crate::service::ProductService;

#[derive(Clone)]
pub struct ProductListing {
    products: ProductService,
    cache: Arc<dyn ProductCache>,
}

impl ProductListing {
    pub fn new(products: ProductService, cache: impl ProductCache + 'static) -> Self {
        Self {
            products,
            cache: Arc::new(cache),
        }
    }

    /// One listing page, served from the cache when present.
    ///
    /// On a miss the service is queried once and exactly the returned page
    /// content is cached under the same key. Concurrent misses may both
    /// populate; the last write wins.
    #[instrument(skip(self))]
    pub async fn get_products(
        &self,
        keyword: &str,
        category_id: i64,
        page: PageRequest,
    ) -> ProductResult<ProductListResponse> {
        let key = ListingKey::new(keyword, category_id, page);

        if let Some(products) = self.cache.get_all_products(&key).await? {
            debug!("Listing cache hit");
            let total_pages = products.first().map_or(0, |p| p.total_pages);
            return Ok(ProductListResponse {
                products,
                total_pages,
            });
        }

        debug!("Listing cache miss");
        let page = self
            .products
            .get_all_products(keyword, category_id, page)
            .await?;
        self.cache.save_all_products(&key, &page.content).await?;

        Ok(ProductListResponse {
            products: page.content,
            total_pages: page.total_pages,
        })
    }

    /// Drop cached pages after a write. Failures are logged, not returned.
    pub async fn invalidate(&self) {
        if let Err(e) = self.cache.clear().await {
            warn!(error = %e, "Failed to clear listing cache");
        }
    }
}
