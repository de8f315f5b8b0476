//! Test fixtures and response shapes
//!
//! Provides unique caller ids and typed views of the JSON responses.

use serde::Deserialize;
use std::sync::atomic::{AtomicI64, Ordering};

/// Counter for unique caller ids
static USER_COUNTER: AtomicI64 = AtomicI64::new(1_000);

/// Get a user id no other test has used
pub fn unique_user() -> i64 {
    USER_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Success envelope
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// Like, unlike or toggle result
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeBody {
    pub product_id: i64,
    pub state: String,
    pub noop: bool,
    pub like_count: u64,
    pub count_pending: bool,
}

/// Like count of one product
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeCountBody {
    pub product_id: i64,
    pub like_count: u64,
    pub stale: bool,
}

/// Listed product
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductBody {
    pub id: i64,
    pub name: String,
    pub brand_id: i64,
    pub brand_name: Option<String>,
    pub price: i64,
    pub like_count: u64,
}

/// Single product view
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetailBody {
    #[serde(flatten)]
    pub product: ProductBody,
    pub stale: bool,
    #[serde(default)]
    pub degraded: Vec<String>,
}

/// Product the caller likes
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikedProductBody {
    pub id: i64,
    pub like_count: u64,
    pub liked_at: chrono::DateTime<chrono::Utc>,
}

/// One page of a listing
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageBody {
    pub items: Vec<ProductBody>,
    pub page: usize,
    pub size: usize,
    pub total: usize,
    pub has_more: bool,
    pub stale: bool,
}

/// Error envelope
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Readiness probe body
#[derive(Debug, Deserialize)]
pub struct ReadinessBody {
    pub status: String,
    pub cache: String,
    pub circuits: Vec<CircuitBody>,
}

#[derive(Debug, Deserialize)]
pub struct CircuitBody {
    pub name: String,
    pub state: String,
}
