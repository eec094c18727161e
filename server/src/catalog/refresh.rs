//! Refresh cycle: pull the origin, enrich, publish
//!
//! A cycle fetches vehicles, manufacturers and categories concurrently and
//! only publishes when all three succeed. Any failure, timeout or
//! cancellation leaves the published snapshot untouched.

use crate::catalog::store::{Snapshot, SnapshotStore};
use crate::catalog::{CatalogError, with_deadline};
use crate::origin::OriginFetcher;
use carview_model::{Category, Manufacturer, Metadata, References, VehicleRecord};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

/// Join the raw origin lists into a publishable snapshot.
///
/// Pure: the same input always yields the same snapshot. Vehicles whose
/// manufacturer or category id is unknown keep an id-only stub.
pub fn build_snapshot(
    records: Vec<VehicleRecord>,
    manufacturers: &[Manufacturer],
    categories: &[Category],
    refreshed_at: DateTime<Utc>,
) -> Snapshot {
    let references = References::new(manufacturers, categories);

    let gaps = records.iter().filter(|r| !references.resolves(r)).count();
    if gaps > 0 {
        warn!("{} vehicles reference unknown manufacturers or categories", gaps);
    }

    let vehicles: Vec<_> = records.into_iter().map(|r| references.enrich(r)).collect();
    let metadata = Metadata::derive(&vehicles);

    Snapshot::new(vehicles, metadata, refreshed_at)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    pub cycle: Uuid,
    pub generation: u64,
    pub vehicles: usize,
    pub elapsed: Duration,
}

/// Drives refresh cycles from an origin into a store
pub struct Refresher {
    origin: Arc<dyn OriginFetcher>,
    store: Arc<SnapshotStore>,
}

impl std::fmt::Debug for Refresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Refresher")
            .field("origin", &"<dyn OriginFetcher>")
            .field("store", &self.store.status())
            .finish()
    }
}

impl Refresher {
    pub fn new(origin: Arc<dyn OriginFetcher>, store: Arc<SnapshotStore>) -> Self {
        Self { origin, store }
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// Run one cycle bounded by `timeout`
    pub async fn refresh(&self, timeout: Duration) -> Result<RefreshReport, CatalogError> {
        self.refresh_until(timeout, &CancellationToken::new()).await
    }

    /// Run one cycle bounded by `timeout` that gives up when `cancel` fires
    pub async fn refresh_until(
        &self,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<RefreshReport, CatalogError> {
        let cycle = Uuid::new_v4();
        let span = info_span!("refresh", %cycle);
        self.cycle(cycle, timeout, cancel).instrument(span).await
    }

    async fn cycle(
        &self,
        cycle: Uuid,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<RefreshReport, CatalogError> {
        let started = Instant::now();
        let origin = &self.origin;

        let fetch = async {
            let (records, manufacturers, categories) = tokio::join!(
                origin.fetch_vehicles(),
                origin.fetch_manufacturers(),
                origin.fetch_categories(),
            );
            Ok::<_, CatalogError>((records?, manufacturers?, categories?))
        };

        let (records, manufacturers, categories) = tokio::select! {
            _ = cancel.cancelled() => return Err(CatalogError::Cancelled),
            fetched = with_deadline(timeout, fetch) => fetched?,
        };

        let snapshot = build_snapshot(records, &manufacturers, &categories, Utc::now());
        let vehicles = snapshot.len();

        if cancel.is_cancelled() {
            return Err(CatalogError::Cancelled);
        }
        let generation = self.store.replace(snapshot);

        Ok(RefreshReport {
            cycle,
            generation,
            vehicles,
            elapsed: started.elapsed(),
        })
    }

    /// Refresh every `interval` until `cancel` fires.
    ///
    /// The first tick is skipped: the caller performs the startup load
    /// itself. Failed cycles are logged and the old snapshot keeps serving.
    pub async fn run(&self, interval: Duration, timeout: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        info!("🔄 Refreshing catalog every {:?}", interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.refresh_until(timeout, &cancel).await {
                Ok(report) => info!(
                    "✅ Refreshed catalog: generation {} with {} vehicles in {:?}",
                    report.generation, report.vehicles, report.elapsed
                ),
                Err(CatalogError::Cancelled) => break,
                Err(e) => error!(
                    "❌ Catalog refresh failed, keeping generation {}: {}",
                    self.store.status().generation,
                    e
                ),
            }
        }

        info!("Refresh loop stopped");
    }
}
