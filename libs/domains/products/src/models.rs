use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{ProductError, ProductResult};

/// Hard cap on images attached to a single product.
pub const MAXIMUM_IMAGES_PER_PRODUCT: usize = 5;

/// Page size used when a listing request does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Product category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// DTO for creating a category
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CategoryDto {
    #[validate(length(min = 1, max = 100, message = "Category name must be between 1 and 100 characters"))]
    pub name: String,
}

/// Product entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
    /// URL of the image shown in listings
    pub thumbnail: Option<String>,
    pub description: String,
    pub category_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields of a product that has not been persisted yet
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub price: f64,
    pub thumbnail: Option<String>,
    pub description: String,
    pub category_id: i64,
}

/// DTO for creating or replacing a product
#[derive(Debug, Clone, PartialEq, Deserialize, Validate, ToSchema)]
pub struct ProductDto {
    #[validate(length(min = 3, max = 200, message = "Title must be between 3 and 200 characters"))]
    pub name: String,
    #[validate(range(min = 0.0, max = 10_000_000.0, message = "Price must be between 0 and 10,000,000"))]
    pub price: f64,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub description: String,
    pub category_id: i64,
}

impl From<ProductDto> for NewProduct {
    fn from(dto: ProductDto) -> Self {
        Self {
            name: dto.name,
            price: dto.price,
            thumbnail: dto.thumbnail,
            description: dto.description,
            category_id: dto.category_id,
        }
    }
}

/// Image attached to a product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProductImage {
    pub id: i64,
    pub product_id: i64,
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, ToSchema)]
pub struct ProductImageDto {
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProductImage {
    pub product_id: i64,
    pub image_url: String,
}

/// Product summary returned by read endpoints and stored in the listing cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub thumbnail: Option<String>,
    pub description: String,
    pub category_id: i64,
    /// Page count of the listing this summary was produced for
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub product_images: Vec<ProductImage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductResponse {
    pub fn from_product(product: Product, product_images: Vec<ProductImage>) -> Self {
        Self {
            id: product.id,
            name: product.name,
            price: product.price,
            thumbnail: product.thumbnail,
            description: product.description,
            category_id: product.category_id,
            total_pages: 0,
            product_images,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

/// Zero-based page of a listing, always ordered by id ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> ProductResult<Self> {
        if size == 0 {
            return Err(ProductError::InvalidParam(
                "Page size must be at least 1".to_string(),
            ));
        }
        Ok(Self { page, size })
    }

    pub fn offset(&self) -> usize {
        self.page as usize * self.size as usize
    }

    /// Number of pages needed for `total_elements` items.
    pub fn total_pages(&self, total_elements: u64) -> u32 {
        let size = u64::from(self.size.max(1));
        u32::try_from(total_elements.div_ceil(size)).unwrap_or(u32::MAX)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of matching products as returned by a repository
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProductSlice {
    pub items: Vec<Product>,
    pub total_elements: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductPage {
    pub content: Vec<ProductResponse>,
    pub total_pages: u32,
    pub total_elements: u64,
    pub page: PageRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductListResponse {
    pub products: Vec<ProductResponse>,
    pub total_pages: u32,
}

/// Query parameters of the paginated listing
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct ListingQuery {
    /// Case-insensitive match against name or description
    #[serde(default)]
    pub keyword: String,
    /// 0 lists every category
    #[serde(default)]
    pub category_id: i64,
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_SIZE
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct ProductIdsQuery {
    /// Comma separated product ids, e.g. `1,2,3`
    pub ids: String,
}
