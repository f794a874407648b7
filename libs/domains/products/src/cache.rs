//! Storage for product listing pages.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::ProductResult;
use crate::models::{PageRequest, ProductResponse};

const KEY_PREFIX: &str = "all_products";
/// Keys requested per `SCAN` round while clearing
const SCAN_BATCH: usize = 500;

/// Identifies one cached listing page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListingKey {
    pub keyword: String,
    pub category_id: i64,
    pub page: PageRequest,
}

impl ListingKey {
    pub fn new(keyword: impl Into<String>, category_id: i64, page: PageRequest) -> Self {
        Self {
            keyword: keyword.into(),
            category_id,
            page,
        }
    }

    /// `all_products:{keyword}:{category_id}:{page}:{size}:id_asc`
    pub fn redis_key(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}:id_asc",
            KEY_PREFIX, self.keyword, self.category_id, self.page.page, self.page.size
        )
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductCache: Send + Sync {
    /// `None` on a miss
    async fn get_all_products(&self, key: &ListingKey)
        -> ProductResult<Option<Vec<ProductResponse>>>;

    async fn save_all_products(
        &self,
        key: &ListingKey,
        products: &[ProductResponse],
    ) -> ProductResult<()>;

    /// Drop every cached listing page
    async fn clear(&self) -> ProductResult<()>;
}

/// Process-local cache without expiry, used when no Redis is configured
#[derive(Debug, Clone, Default)]
pub struct InMemoryProductCache {
    pages: Arc<RwLock<HashMap<ListingKey, Vec<ProductResponse>>>>,
}

impl InMemoryProductCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductCache for InMemoryProductCache {
    async fn get_all_products(
        &self,
        key: &ListingKey,
    ) -> ProductResult<Option<Vec<ProductResponse>>> {
        Ok(self.pages.read().await.get(key).cloned())
    }

    async fn save_all_products(
        &self,
        key: &ListingKey,
        products: &[ProductResponse],
    ) -> ProductResult<()> {
        self.pages
            .write()
            .await
            .insert(key.clone(), products.to_vec());
        Ok(())
    }

    async fn clear(&self) -> ProductResult<()> {
        self.pages.write().await.clear();
        Ok(())
    }
}

/// Listing pages stored in Redis as JSON with a TTL
#[derive(Clone)]
pub struct RedisProductCache {
    redis: ConnectionManager,
    ttl_seconds: u64,
}

impl RedisProductCache {
    pub fn new(redis: ConnectionManager, ttl_seconds: u64) -> Self {
        Self { redis, ttl_seconds }
    }

    /// Connect and verify the server answers `PING`
    pub async fn connect(url: &str, ttl_seconds: u64) -> redis::RedisResult<Self> {
        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;

        let mut conn = manager.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;

        info!(ttl_seconds, "Connected to Redis listing cache");
        Ok(Self::new(manager, ttl_seconds))
    }
}

#[async_trait]
impl ProductCache for RedisProductCache {
    async fn get_all_products(
        &self,
        key: &ListingKey,
    ) -> ProductResult<Option<Vec<ProductResponse>>> {
        let mut conn = self.redis.clone();
        let value: Option<String> = conn.get(key.redis_key()).await?;

        match value {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save_all_products(
        &self,
        key: &ListingKey,
        products: &[ProductResponse],
    ) -> ProductResult<()> {
        let mut conn = self.redis.clone();
        let value = serde_json::to_string(products)?;

        conn.set_ex::<_, _, ()>(key.redis_key(), value, self.ttl_seconds)
            .await?;
        debug!(key = %key.redis_key(), "Cached listing page");
        Ok(())
    }

    async fn clear(&self) -> ProductResult<()> {
        let mut conn = self.redis.clone();
        let pattern = format!("{}:*", KEY_PREFIX);
        let mut cursor: u64 = 0;
        let mut removed = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                conn.del::<_, ()>(&keys).await?;
                removed += keys.len();
            }
            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!(removed, "Cleared listing cache");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn summary(id: i64) -> ProductResponse {
        let now = Utc::now();
        ProductResponse {
            id,
            name: "Lamp".to_string(),
            price: 12.0,
            thumbnail: None,
            description: String::new(),
            category_id: 1,
            total_pages: 4,
            product_images: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_redis_key_format() {
        let key = ListingKey::new("lamp", 3, PageRequest::new(1, 20).unwrap());
        assert_eq!(key.redis_key(), "all_products:lamp:3:1:20:id_asc");

        let empty = ListingKey::new("", 0, PageRequest::default());
        assert_eq!(empty.redis_key(), "all_products::0:0:10:id_asc");
    }

    #[tokio::test]
    async fn test_in_memory_cache_round_trip_and_clear() {
        let cache = InMemoryProductCache::new();
        let key = ListingKey::new("", 0, PageRequest::default());
        let other = ListingKey::new("", 0, PageRequest::new(1, 10).unwrap());

        assert_eq!(cache.get_all_products(&key).await.unwrap(), None);

        cache.save_all_products(&key, &[summary(1)]).await.unwrap();
        let cached = cache.get_all_products(&key).await.unwrap().unwrap();
        assert_eq!(cached[0].id, 1);
        assert_eq!(cache.get_all_products(&other).await.unwrap(), None);

        cache.clear().await.unwrap();
        assert_eq!(cache.get_all_products(&key).await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore] // Requires actual Redis
    async fn test_redis_clear_removes_every_page() {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let cache = RedisProductCache::connect(&redis_url, 60).await.unwrap();

        let pages = SCAN_BATCH * 2 + 7;
        for page in 0..pages {
            let key = ListingKey::new("scan", 0, PageRequest::new(page as u32, 10).unwrap());
            cache.save_all_products(&key, &[summary(1)]).await.unwrap();
        }

        cache.clear().await.unwrap();

        for page in [0, SCAN_BATCH, pages - 1] {
            let key = ListingKey::new("scan", 0, PageRequest::new(page as u32, 10).unwrap());
            assert_eq!(cache.get_all_products(&key).await.unwrap(), None);
        }
    }
}
