//! Response DTOs for API endpoints
//!
//! All response DTOs implement `Serialize` for JSON output, with camelCase
//! field names.

use chrono::{DateTime, Utc};
use serde::Serialize;

use engage_cache::CacheState;
use engage_core::{BrandId, LikeState, ProductId};

use crate::resilience::{CircuitSnapshot, CircuitState, Dependency};

// ============================================================================
// Common Response Types
// ============================================================================

/// Generic API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

// ============================================================================
// Like Responses
// ============================================================================

/// Result of a like, unlike or toggle
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub product_id: ProductId,
    pub state: LikeState,
    /// The pair was already in the requested state
    pub noop: bool,
    pub like_count: u64,
    /// The count could not be confirmed and may lag for one reconciliation pass
    pub count_pending: bool,
}

/// Like count of a single product
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeCountResponse {
    pub product_id: ProductId,
    pub like_count: u64,
    pub stale: bool,
}

/// A product the caller likes
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikedProductResponse {
    #[serde(flatten)]
    pub product: ProductSummaryResponse,
    pub liked_at: DateTime<Utc>,
}

// ============================================================================
// Product Responses
// ============================================================================

/// Product as listed
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummaryResponse {
    pub id: ProductId,
    pub name: String,
    pub brand_id: BrandId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_name: Option<String>,
    pub price: i64,
    pub like_count: u64,
    pub released_at: DateTime<Utc>,
}

/// Single product view
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetailResponse {
    #[serde(flatten)]
    pub product: ProductSummaryResponse,
    pub stale: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<Dependency>,
}

/// One page of a product listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPageResponse {
    pub items: Vec<ProductSummaryResponse>,
    pub page: usize,
    pub size: usize,
    pub total: usize,
    pub has_more: bool,
    /// Ordering or counts may lag the stores
    pub stale: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<Dependency>,
}

// ============================================================================
// Health Responses
// ============================================================================

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Readiness check response
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub cache: CacheState,
    pub circuits: Vec<CircuitSnapshot>,
}

impl ReadinessResponse {
    /// `ready` while every circuit admits calls, `degraded` otherwise
    pub fn ready(cache: CacheState, circuits: Vec<CircuitSnapshot>) -> Self {
        let any_open = circuits.iter().any(|c| c.state == CircuitState::Open);
        Self {
            status: if any_open { "degraded" } else { "ready" }.to_string(),
            timestamp: Utc::now(),
            cache,
            circuits,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == "ready"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circuit(name: &str, state: CircuitState) -> CircuitSnapshot {
        CircuitSnapshot {
            name: name.to_string(),
            state,
            failure_rate: 0.0,
            calls_total: 0,
            successes: 0,
            failures: 0,
            rejections: 0,
        }
    }

    #[test]
    fn test_like_response_serialization() {
        let response = LikeResponse {
            product_id: ProductId::new(42).unwrap(),
            state: LikeState::Activated,
            noop: false,
            like_count: 3,
            count_pending: false,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["productId"], 42);
        assert_eq!(json["state"], "ACTIVATED");
        assert_eq!(json["likeCount"], 3);
        assert_eq!(json["countPending"], false);
    }

    #[test]
    fn test_page_omits_empty_degraded() {
        let page = ProductPageResponse {
            items: Vec::new(),
            page: 0,
            size: 20,
            total: 0,
            has_more: false,
            stale: false,
            degraded: Vec::new(),
        };
        let json = serde_json::to_value(&page).unwrap();
        assert!(json.get("degraded").is_none());
        assert_eq!(json["hasMore"], false);

        let page = ProductPageResponse {
            degraded: vec![Dependency::Catalog],
            ..page
        };
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["degraded"][0], "catalog");
    }

    #[test]
    fn test_health_response() {
        let health = HealthResponse::healthy();
        assert_eq!(health.status, "healthy");
    }

    #[test]
    fn test_readiness_response() {
        let ready = ReadinessResponse::ready(
            CacheState::Warm,
            vec![circuit("ledger", CircuitState::Closed), circuit("counter", CircuitState::HalfOpen)],
        );
        assert!(ready.is_ready());

        let degraded = ReadinessResponse::ready(
            CacheState::Warm,
            vec![circuit("ledger", CircuitState::Closed), circuit("counter", CircuitState::Open)],
        );
        assert_eq!(degraded.status, "degraded");

        let json = serde_json::to_value(&degraded).unwrap();
        assert_eq!(json["cache"], "WARM");
        assert_eq!(json["circuits"][1]["state"], "OPEN");
    }
}
