//! Like entity <-> model mapper

use engage_core::entities::{DeltaOutcome, LikeCount, LikeRecord};
use engage_core::error::DomainError;
use engage_core::value_objects::{ProductId, UserId};

use crate::models::{LikeModel, LikeSummaryDeltaModel, LikeSummaryModel};

/// Stored counters are non-negative by constraint; clamp anyway
pub(crate) fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

impl TryFrom<LikeModel> for LikeRecord {
    type Error = DomainError;

    fn try_from(model: LikeModel) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: UserId::new(model.user_id).map_err(corrupt_row)?,
            product_id: ProductId::new(model.product_id).map_err(corrupt_row)?,
            created_at: model.created_at,
        })
    }
}

impl TryFrom<LikeSummaryModel> for LikeCount {
    type Error = DomainError;

    fn try_from(model: LikeSummaryModel) -> Result<Self, Self::Error> {
        Ok(Self {
            product_id: ProductId::new(model.product_id).map_err(corrupt_row)?,
            count: to_u64(model.like_count),
            version: to_u64(model.version),
            updated_at: model.updated_at,
        })
    }
}

impl TryFrom<LikeSummaryDeltaModel> for DeltaOutcome {
    type Error = DomainError;

    fn try_from(model: LikeSummaryDeltaModel) -> Result<Self, Self::Error> {
        let clamped = model.clamped;
        let count = LikeCount::try_from(LikeSummaryModel {
            product_id: model.product_id,
            like_count: model.like_count,
            version: model.version,
            updated_at: model.updated_at,
        })?;
        Ok(Self { count, clamped })
    }
}

/// A row holding an identifier the domain rejects
pub(crate) fn corrupt_row(err: impl std::fmt::Display) -> DomainError {
    DomainError::Storage(format!("corrupt row: {err}"))
}
