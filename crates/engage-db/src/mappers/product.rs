//! Catalog entity <-> model mapper

use engage_core::entities::{Brand, CatalogProduct};
use engage_core::error::DomainError;
use engage_core::value_objects::{BrandId, ProductId};

use super::like::corrupt_row;
use crate::models::{BrandModel, ProductModel};

impl TryFrom<ProductModel> for CatalogProduct {
    type Error = DomainError;

    fn try_from(model: ProductModel) -> Result<Self, Self::Error> {
        CatalogProduct::new(
            ProductId::new(model.id).map_err(corrupt_row)?,
            model.name,
            BrandId::new(model.brand_id).map_err(corrupt_row)?,
            model.price,
            model.released_at,
        )
        .map_err(corrupt_row)
    }
}

impl TryFrom<BrandModel> for Brand {
    type Error = DomainError;

    fn try_from(model: BrandModel) -> Result<Self, Self::Error> {
        Ok(Self {
            id: BrandId::new(model.id).map_err(corrupt_row)?,
            name: model.name,
        })
    }
}
