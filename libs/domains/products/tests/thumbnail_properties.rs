//! Property tests for product image invariants: the image cap,
//! thumbnail-only-when-unset and all-or-nothing batches.

use domain_products::*;
use proptest::prelude::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

async fn seeded_service(thumbnail: Option<String>) -> (ProductService, i64) {
    let service = ProductService::new(
        InMemoryProductRepository::new(),
        InMemoryCategoryRepository::new(),
        InMemoryProductImageRepository::new(),
    );
    let category = service
        .create_category(CategoryDto {
            name: "General".to_string(),
        })
        .await
        .unwrap();
    let product = service
        .create_product(ProductDto {
            name: "Sample".to_string(),
            price: 1.0,
            thumbnail,
            description: String::new(),
            category_id: category.id,
        })
        .await
        .unwrap();
    (service, product.id)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_thumbnail_is_set_once_and_cap_holds(
        attempts in 1usize..12,
        preset in proptest::option::of("[a-z]{1,8}\\.png"),
    ) {
        let rt = runtime();
        let (thumbnail, stored, rejected) = rt.block_on(async {
            let (service, id) = seeded_service(preset.clone()).await;
            let mut rejected = 0;
            for i in 0..attempts {
                let result = service
                    .create_product_image(id, ProductImageDto { image_url: format!("img_{i}.jpg") })
                    .await;
                match result {
                    Ok(_) => {}
                    Err(ProductError::InvalidParam(_)) => rejected += 1,
                    Err(other) => panic!("unexpected error: {other}"),
                }
            }
            let detail = service.get_product_by_id(id).await.unwrap();
            (detail.thumbnail, detail.product_images, rejected)
        });

        let expected_stored = attempts.min(MAXIMUM_IMAGES_PER_PRODUCT);
        prop_assert_eq!(stored.len(), expected_stored);
        prop_assert_eq!(rejected, attempts - expected_stored);

        let expected_thumbnail = preset.unwrap_or_else(|| "img_0.jpg".to_string());
        prop_assert_eq!(thumbnail, Some(expected_thumbnail));
    }

    #[test]
    fn prop_concurrent_uploads_never_exceed_cap(attempts in 1usize..15) {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .unwrap();

        let (thumbnail, stored) = rt.block_on(async {
            let (service, id) = seeded_service(None).await;
            let tasks: Vec<_> = (0..attempts)
                .map(|i| {
                    let service = service.clone();
                    tokio::spawn(async move {
                        service
                            .create_product_image(id, ProductImageDto { image_url: format!("c_{i}.jpg") })
                            .await
                    })
                })
                .collect();
            for task in tasks {
                let _ = task.await.unwrap();
            }
            let detail = service.get_product_by_id(id).await.unwrap();
            (detail.thumbnail, detail.product_images)
        });

        prop_assert_eq!(stored.len(), attempts.min(MAXIMUM_IMAGES_PER_PRODUCT));
        // whichever image landed first became the thumbnail
        let first = stored.iter().min_by_key(|image| image.id).map(|image| image.image_url.clone());
        prop_assert_eq!(thumbnail, first);
    }

    #[test]
    fn prop_concurrent_batches_are_all_or_nothing(
        batches in proptest::collection::vec(1usize..=3, 1..6),
    ) {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .unwrap();

        let (accepted, stored) = rt.block_on(async {
            let (service, id) = seeded_service(None).await;
            let tasks: Vec<_> = batches
                .iter()
                .enumerate()
                .map(|(batch, &size)| {
                    let service = service.clone();
                    tokio::spawn(async move {
                        let reservation = service.reserve_images(id, size).await?;
                        let urls = (0..size).map(|i| format!("b{batch}_{i}.jpg")).collect();
                        reservation.record(urls).await
                    })
                })
                .collect();

            let mut accepted = Vec::new();
            for task in tasks {
                match task.await.unwrap() {
                    Ok(images) => accepted.push(images),
                    Err(ProductError::InvalidParam(_)) => {}
                    Err(other) => panic!("unexpected error: {other}"),
                }
            }
            let detail = service.get_product_by_id(id).await.unwrap();
            (accepted, detail.product_images)
        });

        let accepted_total: usize = accepted.iter().map(Vec::len).sum();
        prop_assert!(stored.len() <= MAXIMUM_IMAGES_PER_PRODUCT);
        prop_assert_eq!(stored.len(), accepted_total);
        for images in &accepted {
            prop_assert!(images.iter().all(|image| stored.contains(image)));
        }
    }
}
