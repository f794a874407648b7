//! HTTP handlers for the catalog API

use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use utoipa::{OpenApi, ToSchema};

use crate::error::{ProductError, ProductResult};
use crate::extract::ValidatedJson;
use crate::listing::ProductListing;
use crate::models::{
    Category, CategoryDto, ListingQuery, PageRequest, Product, ProductDto, ProductIdsQuery,
    ProductImage, ProductListResponse, ProductResponse,
};
use crate::service::ProductService;
use crate::upload::{ImageUploadService, UploadRejection, UploadedFile};

/// Multipart field carrying the uploaded images
const FILES_FIELD: &str = "files";

/// Everything the catalog handlers need
#[derive(Clone)]
pub struct CatalogState {
    pub products: ProductService,
    pub listing: ProductListing,
    pub uploads: ImageUploadService,
}

/// OpenAPI documentation for the catalog API
#[derive(OpenApi)]
#[openapi(
    paths(
        list_products,
        create_product,
        get_products_by_ids,
        get_product,
        update_product,
        delete_product,
        upload_images,
        view_image,
        get_product_images,
        list_categories,
        create_category,
    ),
    components(
        schemas(
            Product, ProductDto, ProductResponse, ProductListResponse, ProductImage,
            Category, CategoryDto, UploadForm
        )
    ),
    tags(
        (name = "Products", description = "Product catalog endpoints"),
        (name = "Categories", description = "Product categories")
    )
)]
pub struct ApiDoc;

/// Multipart body of an image upload
#[derive(ToSchema)]
pub struct UploadForm {
    /// Up to 5 images, 10 MB each
    #[schema(value_type = Vec<String>, format = Binary)]
    pub files: Vec<Vec<u8>>,
}

/// `/v1/products` and `/v1/categories`, ready to be nested under `/api`
pub fn api_router(state: CatalogState) -> Router {
    Router::new()
        .nest("/v1/products", router(state.clone()))
        .nest("/v1/categories", categories_router(state))
}

/// Create the products router with all HTTP endpoints
pub fn router(state: CatalogState) -> Router {
    let body_limit = state.uploads.body_limit();

    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/by-ids", get(get_products_by_ids))
        .route(
            "/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/{id}/images", get(get_product_images))
        .route(
            "/uploads/{id}",
            post(upload_images).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/images/{name}", get(view_image))
        .with_state(state)
}

pub fn categories_router(state: CatalogState) -> Router {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .with_state(state)
}

/// Parse `1,2,3` into ids; blanks between commas are ignored
pub fn parse_ids(csv: &str) -> ProductResult<Vec<i64>> {
    csv.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| ProductError::InvalidParam(format!("Invalid product id: {}", s)))
        })
        .collect()
}

fn multipart_error(uploads: &ImageUploadService, error: MultipartError) -> ProductError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        uploads.reject(UploadRejection::FileTooLarge)
    } else {
        ProductError::InvalidParam(error.body_text())
    }
}

/// Collect the `files` parts of an upload.
///
/// Reading stops one part past the file limit, and no file is buffered
/// beyond one byte over the size limit; the rest of an oversized file is
/// drained so the validator still sees every part.
async fn read_files(
    mut multipart: Multipart,
    uploads: &ImageUploadService,
) -> ProductResult<Vec<UploadedFile>> {
    let limits = uploads.validator().limits();
    let keep = limits.max_file_size.saturating_add(1);
    let mut files = Vec::new();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(uploads, e))?
    {
        if field.name() != Some(FILES_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);

        if files.len() == limits.max_files {
            files.push(UploadedFile {
                file_name,
                content_type,
                bytes: Bytes::new(),
            });
            break;
        }

        let mut data = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| multipart_error(uploads, e))?
        {
            let room = keep - data.len();
            data.extend_from_slice(&chunk[..chunk.len().min(room)]);
        }

        files.push(UploadedFile {
            file_name,
            content_type,
            bytes: Bytes::from(data),
        });
    }

    Ok(files)
}

/// Paginated product listing
#[utoipa::path(
    get,
    path = "/api/v1/products",
    tag = "Products",
    params(ListingQuery),
    responses(
        (status = 200, description = "One page of products", body = ProductListResponse),
        (status = 400, description = "Invalid paging or backend failure", body = String)
    )
)]
async fn list_products(
    State(state): State<CatalogState>,
    Query(query): Query<ListingQuery>,
) -> ProductResult<Json<ProductListResponse>> {
    let page = PageRequest::new(query.page, query.limit)?;
    let response = state
        .listing
        .get_products(&query.keyword, query.category_id, page)
        .await?;
    Ok(Json(response))
}

/// Create a new product
#[utoipa::path(
    post,
    path = "/api/v1/products",
    tag = "Products",
    request_body = ProductDto,
    responses(
        (status = 200, description = "Product created", body = Product),
        (status = 400, description = "Field errors or unknown category")
    )
)]
async fn create_product(
    State(state): State<CatalogState>,
    ValidatedJson(input): ValidatedJson<ProductDto>,
) -> ProductResult<Json<Product>> {
    let product = state.products.create_product(input).await?;
    state.listing.invalidate().await;
    Ok(Json(product))
}

/// Products with the given ids; unknown ids are left out
#[utoipa::path(
    get,
    path = "/api/v1/products/by-ids",
    tag = "Products",
    params(ProductIdsQuery),
    responses(
        (status = 200, description = "Found products", body = Vec<Product>),
        (status = 400, description = "Unparseable id", body = String)
    )
)]
async fn get_products_by_ids(
    State(state): State<CatalogState>,
    Query(query): Query<ProductIdsQuery>,
) -> ProductResult<Json<Vec<Product>>> {
    let ids = parse_ids(&query.ids)?;
    let products = state.products.find_products_by_ids(&ids).await?;
    Ok(Json(products))
}

/// Get a product by ID
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    tag = "Products",
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 400, description = "Product not found", body = String)
    )
)]
async fn get_product(
    State(state): State<CatalogState>,
    Path(id): Path<i64>,
) -> ProductResult<Json<ProductResponse>> {
    Ok(Json(state.products.get_product_by_id(id).await?))
}

/// Replace a product
#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    tag = "Products",
    params(("id" = i64, Path, description = "Product ID")),
    request_body = ProductDto,
    responses(
        (status = 200, description = "Product updated", body = Product),
        (status = 400, description = "Field errors, unknown product or category")
    )
)]
async fn update_product(
    State(state): State<CatalogState>,
    Path(id): Path<i64>,
    ValidatedJson(input): ValidatedJson<ProductDto>,
) -> ProductResult<Json<Product>> {
    let product = state.products.update_product(id, input).await?;
    state.listing.invalidate().await;
    Ok(Json(product))
}

/// Delete a product and its images
#[utoipa::path(
    delete,
    path = "/api/v1/products/{id}",
    tag = "Products",
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Confirmation message", body = String),
        (status = 400, description = "Backend failure", body = String)
    )
)]
async fn delete_product(
    State(state): State<CatalogState>,
    Path(id): Path<i64>,
) -> ProductResult<String> {
    state.products.delete_product(id).await?;
    state.listing.invalidate().await;
    Ok(format!("Product with id = {} deleted successfully", id))
}

/// Upload up to 5 images for a product
#[utoipa::path(
    post,
    path = "/api/v1/products/uploads/{id}",
    tag = "Products",
    params(("id" = i64, Path, description = "Product ID")),
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Created images", body = Vec<ProductImage>),
        (status = 400, description = "Unknown product or too many files", body = String),
        (status = 413, description = "A file exceeds 10 MB", body = String),
        (status = 415, description = "A file is not an image", body = String)
    )
)]
async fn upload_images(
    State(state): State<CatalogState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> ProductResult<Json<Vec<ProductImage>>> {
    let files = read_files(multipart, &state.uploads).await?;
    let images = state.uploads.upload_images(id, files).await?;
    state.listing.invalidate().await;
    Ok(Json(images))
}

/// Serve a stored image
#[utoipa::path(
    get,
    path = "/api/v1/products/images/{name}",
    tag = "Products",
    params(("name" = String, Path, description = "Stored file name")),
    responses(
        (status = 200, description = "Image bytes served as image/jpeg"),
        (status = 404, description = "Image cannot be resolved")
    )
)]
async fn view_image(State(state): State<CatalogState>, Path(name): Path<String>) -> Response {
    match state.uploads.load_image(&name).await {
        Ok(bytes) => image_response(bytes),
        Err(e) => {
            tracing::warn!(image = %name, error = %e, "Image not served");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

fn image_response(bytes: Bytes) -> Response {
    ([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response()
}

/// Images of a product
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/images",
    tag = "Products",
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Images of the product", body = Vec<ProductImage>),
        (status = 400, description = "Product not found", body = String)
    )
)]
async fn get_product_images(
    State(state): State<CatalogState>,
    Path(id): Path<i64>,
) -> ProductResult<Json<Vec<ProductImage>>> {
    Ok(Json(state.products.get_product_images(id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    tag = "Categories",
    responses((status = 200, description = "All categories", body = Vec<Category>))
)]
async fn list_categories(State(state): State<CatalogState>) -> ProductResult<Json<Vec<Category>>> {
    Ok(Json(state.products.list_categories().await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/categories",
    tag = "Categories",
    request_body = CategoryDto,
    responses(
        (status = 200, description = "Category created", body = Category),
        (status = 400, description = "Field errors")
    )
)]
async fn create_category(
    State(state): State<CatalogState>,
    ValidatedJson(input): ValidatedJson<CategoryDto>,
) -> ProductResult<Json<Category>> {
    Ok(Json(state.products.create_category(input).await?))
}
