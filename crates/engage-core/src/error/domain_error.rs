//! Domain errors - error types for the domain layer

use thiserror::Error;

use crate::value_objects::{IdParseError, ProductId};

/// Domain layer errors
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    InvalidId(#[from] IdParseError),

    // =========================================================================
    // Conflict Errors
    // =========================================================================
    #[error("Like state for product {product_id} kept changing after {attempts} attempts")]
    Conflict { product_id: ProductId, attempts: u32 },

    // =========================================================================
    // Availability Errors
    // =========================================================================
    /// Circuit open for the named dependency; the call was never attempted
    #[error("Dependency degraded: {0}")]
    Degraded(String),

    /// Transient store failure (connection refused, pool exhausted, ...)
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    /// Permanent store failure; retrying will not help
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get an error code string for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::ProductNotFound(_) => "UNKNOWN_PRODUCT",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::InvalidId(_) => "INVALID_ID",
            Self::Conflict { .. } => "CONFLICT",
            Self::Degraded(_) => "DEGRADED",
            Self::Unavailable(_) => "STORAGE_UNAVAILABLE",
            Self::Timeout(_) => "TIMEOUT",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ProductNotFound(_))
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationError(_) | Self::InvalidId(_))
    }

    /// Check if this is a conflict error
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Check if the dependency was short-circuited
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }

    /// Check if retrying the same call may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = DomainError::ProductNotFound(ProductId::new(1).unwrap());
        assert_eq!(err.code(), "UNKNOWN_PRODUCT");

        let err = DomainError::Degraded("ledger".to_string());
        assert_eq!(err.code(), "DEGRADED");
    }

    #[test]
    fn test_only_availability_errors_are_transient() {
        assert!(DomainError::Unavailable("pool".to_string()).is_transient());
        assert!(DomainError::Timeout("counter".to_string()).is_transient());
        assert!(!DomainError::Storage("constraint".to_string()).is_transient());
        assert!(!DomainError::ValidationError("bad".to_string()).is_transient());
        assert!(!DomainError::Degraded("ledger".to_string()).is_transient());
        assert!(
            !DomainError::Conflict {
                product_id: ProductId::new(1).unwrap(),
                attempts: 5
            }
            .is_transient()
        );
    }

    #[test]
    fn test_invalid_id_is_validation() {
        let err: DomainError = ProductId::new(0).unwrap_err().into();
        assert!(err.is_validation());
        assert_eq!(err.code(), "INVALID_ID");
    }

    #[test]
    fn test_error_display() {
        let err = DomainError::ProductNotFound(ProductId::new(123).unwrap());
        assert_eq!(err.to_string(), "Product not found: 123");
    }
}
