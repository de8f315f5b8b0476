//! API Integration Tests
//!
//! Each test starts an in-process server on the memory backend, so no
//! external services are needed.
//!
//! Run with: cargo test -p integration-tests --test api_tests

use futures::future::join_all;
use integration_tests::{
    assert_json, assert_status, fixtures::*, test_config, TestServer, SEED_PRODUCTS,
};
use reqwest::StatusCode;

async fn like_count(server: &TestServer, product_id: i64) -> u64 {
    let response = server
        .get(&format!("/api/v1/products/{product_id}/likes"))
        .await
        .unwrap();
    let body: Envelope<LikeCountBody> = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body.data.product_id, product_id);
    body.data.like_count
}

async fn toggle(server: &TestServer, product_id: i64, user_id: i64) -> LikeBody {
    let response = server
        .post_as(&format!("/api/v1/like/products/{product_id}"), user_id)
        .await
        .unwrap();
    let body: Envelope<LikeBody> = assert_json(response, StatusCode::OK).await.unwrap();
    body.data
}

async fn error_code(response: reqwest::Response, expected: StatusCode) -> String {
    let body: ErrorEnvelope = assert_json(response, expected).await.unwrap();
    assert!(!body.error.message.is_empty());
    body.error.code
}

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await.expect("Failed to start server");
    let response = server.get("/health").await.expect("Request failed");
    assert_status(response, StatusCode::OK).await.unwrap();
}

#[tokio::test]
async fn test_health_ready_reports_circuits() {
    let server = TestServer::start().await.expect("Failed to start server");
    let response = server.get("/health/ready").await.expect("Request failed");
    let body: ReadinessBody = assert_json(response, StatusCode::OK).await.unwrap();

    assert_eq!(body.status, "ready");
    assert_eq!(body.cache, "WARM");
    let names: Vec<_> = body.circuits.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["ledger", "counter", "catalog"]);
    assert!(body.circuits.iter().all(|c| c.state == "CLOSED"));
}

// ============================================================================
// Like Tests
// ============================================================================

#[tokio::test]
async fn test_toggle_twice_restores_count() {
    let server = TestServer::start().await.expect("Failed to start server");
    let original = like_count(&server, 42).await;

    let first = toggle(&server, 42, 7).await;
    assert_eq!(first.product_id, 42);
    assert_eq!(first.state, "ACTIVATED");
    assert!(!first.noop);
    assert_eq!(first.like_count, original + 1);

    let second = toggle(&server, 42, 7).await;
    assert_eq!(second.state, "DEACTIVATED");
    assert_eq!(second.like_count, original);
    assert!(!second.count_pending);

    assert_eq!(like_count(&server, 42).await, original);
}

#[tokio::test]
async fn test_like_and_unlike_are_idempotent() {
    let server = TestServer::start().await.expect("Failed to start server");
    let user = unique_user();

    for expected_noop in [false, true] {
        let response = server.put_as("/api/v1/like/products/5", user).await.unwrap();
        let body: Envelope<LikeBody> = assert_json(response, StatusCode::OK).await.unwrap();
        assert_eq!(body.data.state, "ACTIVATED");
        assert_eq!(body.data.noop, expected_noop);
        assert_eq!(body.data.like_count, 1);
    }

    for expected_noop in [false, true] {
        let response = server.delete_as("/api/v1/like/products/5", user).await.unwrap();
        let body: Envelope<LikeBody> = assert_json(response, StatusCode::OK).await.unwrap();
        assert_eq!(body.data.state, "DEACTIVATED");
        assert_eq!(body.data.noop, expected_noop);
        assert_eq!(body.data.like_count, 0);
    }
}

#[tokio::test]
async fn test_concurrent_users_all_counted() {
    let server = TestServer::start().await.expect("Failed to start server");
    let before = like_count(&server, 1).await;

    let requests = (0..100).map(|i| {
        let server = &server;
        async move {
            server
                .put_as("/api/v1/like/products/1", 10_000 + i)
                .await
                .unwrap()
                .status()
        }
    });
    let statuses = join_all(requests).await;
    assert!(statuses.iter().all(|s| *s == StatusCode::OK));

    let report = server
        .state()
        .engagement()
        .reconcile_now()
        .await
        .expect("reconcile failed");
    assert_eq!(report.drift_detected, 0);

    assert_eq!(like_count(&server, 1).await, before + 100);
}

#[tokio::test]
async fn test_concurrent_duplicate_toggles_net_one_change_each() {
    let server = TestServer::start().await.expect("Failed to start server");
    let user = unique_user();

    let requests = (0..5).map(|_| toggle(&server, 8, user));
    let results = join_all(requests).await;

    let activated = results.iter().filter(|r| r.state == "ACTIVATED").count();
    let deactivated = results.len() - activated;
    assert_eq!(activated, 3);
    assert_eq!(deactivated, 2);
    assert_eq!(like_count(&server, 8).await, 1);
}

#[tokio::test]
async fn test_liked_products_most_recent_first() {
    let server = TestServer::start().await.expect("Failed to start server");
    let user = unique_user();

    for product in [3, 17, 11] {
        server
            .put_as(&format!("/api/v1/like/products/{product}"), user)
            .await
            .unwrap();
    }

    let response = server.get_as("/api/v1/like/products", user).await.unwrap();
    let body: Envelope<Vec<LikedProductBody>> =
        assert_json(response, StatusCode::OK).await.unwrap();

    let ids: Vec<_> = body.data.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![11, 17, 3]);
    assert!(body.data.iter().all(|p| p.like_count == 1));
    assert!(body.data.windows(2).all(|w| w[0].liked_at >= w[1].liked_at));
}

// ============================================================================
// Listing Tests
// ============================================================================

#[tokio::test]
async fn test_listing_by_likes() {
    let server = TestServer::start().await.expect("Failed to start server");

    for (product, likes) in [(3, 3), (5, 2), (9, 1)] {
        for _ in 0..likes {
            toggle(&server, product, unique_user()).await;
        }
    }

    let response = server
        .get("/api/v1/products?sort=likes_desc&size=5")
        .await
        .unwrap();
    let body: Envelope<PageBody> = assert_json(response, StatusCode::OK).await.unwrap();
    let page = body.data;

    let ids: Vec<_> = page.items.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![3, 5, 9, 1, 2]);
    assert!(page
        .items
        .windows(2)
        .all(|w| w[0].like_count >= w[1].like_count));
    assert_eq!(page.total, SEED_PRODUCTS);
    assert!(page.has_more);
    assert!(!page.stale);
    assert_eq!(page.size, 5);
}

#[tokio::test]
async fn test_listing_brand_filter_and_pages() {
    let server = TestServer::start().await.expect("Failed to start server");

    let response = server
        .get("/api/v1/products?brandId=2&sort=price_asc&page=0&pageSize=4")
        .await
        .unwrap();
    let body: Envelope<PageBody> = assert_json(response, StatusCode::OK).await.unwrap();
    let first = body.data;

    assert_eq!(first.total, SEED_PRODUCTS / 10);
    assert_eq!(first.items.len(), 4);
    assert!(first.items.iter().all(|p| p.brand_id == 2));
    assert!(first
        .items
        .iter()
        .all(|p| p.brand_name.as_deref() == Some("Brand 2")));
    assert!(first.items.windows(2).all(|w| w[0].price <= w[1].price));

    let response = server
        .get("/api/v1/products?brandId=2&sort=price_asc&page=1&pageSize=4")
        .await
        .unwrap();
    let body: Envelope<PageBody> = assert_json(response, StatusCode::OK).await.unwrap();
    let second = body.data;

    assert_eq!(second.page, 1);
    assert_eq!(second.items.len(), SEED_PRODUCTS / 10 - 4);
    assert!(!second.has_more);
    assert!(second.items.iter().all(|p| !p.name.is_empty()));
}

// ============================================================================
// Error Tests
// ============================================================================

#[tokio::test]
async fn test_product_detail() {
    let server = TestServer::start().await.expect("Failed to start server");
    let before = like_count(&server, 13).await;
    toggle(&server, 13, unique_user()).await;

    let response = server.get("/api/v1/products/13").await.unwrap();
    let body: Envelope<ProductDetailBody> = assert_json(response, StatusCode::OK).await.unwrap();

    assert_eq!(body.data.product.id, 13);
    assert_eq!(body.data.product.brand_id, 3);
    assert_eq!(body.data.product.brand_name.as_deref(), Some("Brand 3"));
    assert_eq!(body.data.product.like_count, before + 1);
    assert!(!body.data.stale);
    assert!(body.data.degraded.is_empty());

    let response = server.get("/api/v1/products/99999").await.unwrap();
    assert_eq!(
        error_code(response, StatusCode::NOT_FOUND).await,
        "UNKNOWN_PRODUCT"
    );
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized_and_malformed_is_rejected() {
    let server = TestServer::start().await.expect("Failed to start server");

    let response = server.get("/api/v1/like/products").await.unwrap();
    assert_eq!(
        error_code(response, StatusCode::UNAUTHORIZED).await,
        "MISSING_IDENTITY"
    );

    let url = format!("{}/api/v1/like/products/1", server.base_url());
    let response = server
        .client
        .post(&url)
        .header("X-USER-ID", "not-a-number")
        .send()
        .await
        .unwrap();
    assert_eq!(
        error_code(response, StatusCode::BAD_REQUEST).await,
        "VALIDATION_ERROR"
    );
}

#[tokio::test]
async fn test_unknown_product_is_not_found() {
    let server = TestServer::start().await.expect("Failed to start server");

    let response = server
        .post_as("/api/v1/like/products/99999", unique_user())
        .await
        .unwrap();
    assert_eq!(
        error_code(response, StatusCode::NOT_FOUND).await,
        "UNKNOWN_PRODUCT"
    );

    let response = server.get("/api/v1/products/99999/likes").await.unwrap();
    assert_status(response, StatusCode::NOT_FOUND).await.unwrap();
}

#[tokio::test]
async fn test_invalid_input_is_bad_request() {
    let server = TestServer::start().await.expect("Failed to start server");

    let response = server
        .post_as("/api/v1/like/products/abc", unique_user())
        .await
        .unwrap();
    assert_eq!(
        error_code(response, StatusCode::BAD_REQUEST).await,
        "INVALID_PATH_PARAMETER"
    );

    let response = server.get("/api/v1/products?size=500").await.unwrap();
    assert_eq!(
        error_code(response, StatusCode::BAD_REQUEST).await,
        "VALIDATION_ERROR"
    );

    let response = server.get("/api/v1/products?sort=random").await.unwrap();
    assert_status(response, StatusCode::BAD_REQUEST).await.unwrap();
}

#[tokio::test]
async fn test_server_with_custom_config() {
    let config = test_config(&[("MEMORY_SEED_PRODUCTS", "3")]).unwrap();
    let server = TestServer::start_with_config(config)
        .await
        .expect("Failed to start server");

    let response = server.get("/api/v1/products").await.unwrap();
    let body: Envelope<PageBody> = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body.data.total, 3);
    // Newest first by default
    let ids: Vec<_> = body.data.items.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);

    server.stop().await;
}
