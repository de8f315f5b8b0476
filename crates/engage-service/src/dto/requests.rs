//! Request DTOs for API endpoints
//!
//! All request DTOs implement `Deserialize` and `Validate` for input validation.

use serde::Deserialize;
use validator::Validate;

use engage_core::{BrandId, SortKey};

use crate::services::{ListingQuery, ServiceError, ServiceResult};

/// Largest page a listing request may ask for
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page size used when the request does not name one
pub const DEFAULT_PAGE_SIZE: u32 = 20;

// ============================================================================
// Listing Requests
// ============================================================================

/// Product listing query string
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductListRequest {
    /// `latest`, `likes_desc`, `price_asc` or `price_desc`
    pub sort: Option<String>,

    #[validate(range(min = 1, message = "brandId must be positive"))]
    pub brand_id: Option<i64>,

    /// Zero-based page index
    pub page: Option<u32>,

    #[serde(alias = "pageSize")]
    #[validate(range(min = 1, max = 100, message = "size must be between 1 and 100"))]
    pub size: Option<u32>,
}

impl ProductListRequest {
    /// Resolve defaults and typed values
    ///
    /// # Errors
    /// Returns `ServiceError::Validation` for an unknown sort name or a bad brand id
    pub fn to_query(&self) -> ServiceResult<ListingQuery> {
        let sort = match self.sort.as_deref() {
            None | Some("") => SortKey::default(),
            Some(name) => SortKey::from_query_str(name)
                .ok_or_else(|| ServiceError::validation(format!("unknown sort: {name}")))?,
        };

        let brand_id = self
            .brand_id
            .map(BrandId::new)
            .transpose()
            .map_err(|e| ServiceError::validation(e.to_string()))?;

        let size = self.size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

        Ok(ListingQuery {
            sort,
            brand_id,
            page: self.page.unwrap_or(0) as usize,
            size: size as usize,
        })
    }
}
