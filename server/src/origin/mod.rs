//! Access to the upstream product API

pub mod http;

use crate::catalog::CatalogError;
use carview_model::{Category, CategoryId, Manufacturer, ManufacturerId, VehicleId, VehicleRecord};

/// Trait for reading the raw catalog from the origin
///
/// Calls are idempotent and have no side effects on the origin. The list
/// calls are the only ones a refresh cycle needs; the per-id calls default
/// to scanning the lists and exist so a remote-backed catalog can avoid
/// pulling whole lists for a single lookup.
#[async_trait::async_trait]
pub trait OriginFetcher: Send + Sync {
    async fn fetch_vehicles(&self) -> Result<Vec<VehicleRecord>, CatalogError>;

    async fn fetch_manufacturers(&self) -> Result<Vec<Manufacturer>, CatalogError>;

    async fn fetch_categories(&self) -> Result<Vec<Category>, CatalogError>;

    /// Fetch one vehicle record. Unknown ids are [`CatalogError::NotFound`].
    async fn fetch_vehicle(&self, id: VehicleId) -> Result<VehicleRecord, CatalogError> {
        self.fetch_vehicles()
            .await?
            .into_iter()
            .find(|record| record.id == id)
            .ok_or(CatalogError::NotFound(id))
    }

    /// Fetch one manufacturer, `None` if the origin does not know the id
    async fn fetch_manufacturer(&self, id: ManufacturerId) -> Result<Option<Manufacturer>, CatalogError> {
        Ok(self
            .fetch_manufacturers()
            .await?
            .into_iter()
            .find(|m| m.id == id))
    }

    /// Fetch one category, `None` if the origin does not know the id
    async fn fetch_category(&self, id: CategoryId) -> Result<Option<Category>, CatalogError> {
        Ok(self
            .fetch_categories()
            .await?
            .into_iter()
            .find(|c| c.id == id))
    }
}
