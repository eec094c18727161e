//! Catalog backend that reads through to the origin
//!
//! No snapshot is kept: every query goes to the origin and is enriched with
//! the same rules as a refresh cycle. Single-vehicle lookups and metadata
//! are memoized in [`TtlCache`]s.

use crate::catalog::cache::TtlCache;
use crate::catalog::refresh::build_snapshot;
use crate::catalog::store::sample_from;
use crate::catalog::{Catalog, CatalogError};
use crate::origin::OriginFetcher;
use carview_model::{Category, FilterOptions, Manufacturer, Metadata, Vehicle, VehicleId};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub struct RemoteCatalog {
    origin: Arc<dyn OriginFetcher>,
    vehicles: Arc<TtlCache<VehicleId, Vehicle>>,
    metadata: Arc<TtlCache<(), Metadata>>,
}

impl std::fmt::Debug for RemoteCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteCatalog")
            .field("origin", &"<dyn OriginFetcher>")
            .field("cached_vehicles", &self.vehicles.len())
            .field("cached_metadata", &self.metadata.len())
            .finish()
    }
}

impl RemoteCatalog {
    pub fn new(origin: Arc<dyn OriginFetcher>, cache_ttl: Duration) -> Self {
        Self {
            origin,
            vehicles: Arc::new(TtlCache::new(cache_ttl)),
            metadata: Arc::new(TtlCache::new(cache_ttl)),
        }
    }

    /// Start one janitor per cache
    pub fn spawn_janitors(&self, interval: Duration, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
        vec![
            self.vehicles.spawn_janitor(interval, cancel.clone()),
            self.metadata.spawn_janitor(interval, cancel),
        ]
    }

    /// Every vehicle the origin lists, enriched
    async fn load_all(&self) -> Result<Vec<Vehicle>, CatalogError> {
        let (records, manufacturers, categories) = tokio::join!(
            self.origin.fetch_vehicles(),
            self.origin.fetch_manufacturers(),
            self.origin.fetch_categories(),
        );
        let snapshot = build_snapshot(records?, &manufacturers?, &categories?, Utc::now());
        Ok(snapshot.vehicles().to_vec())
    }

    async fn fetch_vehicle(&self, id: VehicleId) -> Result<Vehicle, CatalogError> {
        let record = self.origin.fetch_vehicle(id).await?;

        let (manufacturer, category) = tokio::join!(
            self.origin.fetch_manufacturer(record.manufacturer_id),
            self.origin.fetch_category(record.category_id),
        );
        let manufacturer: Option<Manufacturer> = manufacturer?;
        let category: Option<Category> = category?;

        if manufacturer.is_none() || category.is_none() {
            warn!(
                "Vehicle {} references unknown manufacturer {} or category {}",
                id, record.manufacturer_id, record.category_id
            );
        }

        Ok(record.enrich(manufacturer.as_ref(), category.as_ref()))
    }
}

#[async_trait::async_trait]
impl Catalog for RemoteCatalog {
    async fn vehicle(&self, id: VehicleId) -> Result<Vehicle, CatalogError> {
        if let Some(vehicle) = self.vehicles.get(&id) {
            debug!("💾 Vehicle cache hit: {}", id);
            return Ok(vehicle);
        }
        debug!("Vehicle cache miss: {}", id);

        let vehicle = self.fetch_vehicle(id).await?;
        self.vehicles.insert(id, vehicle.clone());
        Ok(vehicle)
    }

    async fn vehicles(&self, filter: &FilterOptions) -> Result<Vec<Vehicle>, CatalogError> {
        Ok(self
            .load_all()
            .await?
            .into_iter()
            .filter(|v| filter.matches(v))
            .collect())
    }

    async fn random(&self, limit: usize) -> Result<Vec<Vehicle>, CatalogError> {
        Ok(sample_from(&self.load_all().await?, limit))
    }

    async fn metadata(&self) -> Result<Metadata, CatalogError> {
        if let Some(metadata) = self.metadata.get(&()) {
            debug!("💾 Metadata cache hit");
            return Ok(metadata);
        }
        debug!("Metadata cache miss");

        let metadata = Metadata::derive(&self.load_all().await?);
        self.metadata.insert((), metadata.clone());
        Ok(metadata)
    }

    fn backend(&self) -> &str {
        "remote"
    }
}
