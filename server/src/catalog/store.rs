//! In-memory snapshot store

use crate::catalog::{Catalog, CatalogError};
use carview_model::{FilterOptions, Metadata, Vehicle, VehicleId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// One complete, immutable copy of the catalog.
///
/// Built off to the side by the refresh cycle and published as a unit;
/// nothing mutates a snapshot after [`SnapshotStore::replace`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    vehicles: Vec<Vehicle>,
    index: HashMap<VehicleId, usize>,
    metadata: Metadata,
    generation: u64,
    refreshed_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn new(vehicles: Vec<Vehicle>, metadata: Metadata, refreshed_at: DateTime<Utc>) -> Self {
        // First occurrence wins if the origin repeats an id
        let mut index = HashMap::with_capacity(vehicles.len());
        for (pos, vehicle) in vehicles.iter().enumerate() {
            index.entry(vehicle.id).or_insert(pos);
        }

        Self {
            vehicles,
            index,
            metadata,
            generation: 0,
            refreshed_at: Some(refreshed_at),
        }
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get(&self, id: VehicleId) -> Option<&Vehicle> {
        self.index.get(&id).map(|&pos| &self.vehicles[pos])
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }
}

/// Up to `n` distinct entries of `vehicles`, chosen uniformly at random
pub(crate) fn sample_from(vehicles: &[Vehicle], n: usize) -> Vec<Vehicle> {
    let amount = n.min(vehicles.len());
    let mut rng = rand::rng();

    rand::seq::index::sample(&mut rng, vehicles.len(), amount)
        .into_iter()
        .map(|pos| vehicles[pos].clone())
        .collect()
}

/// Health view of the published snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStatus {
    pub generation: u64,
    pub vehicles: usize,
    pub refreshed_at: Option<DateTime<Utc>>,
}

/// Holder of the current snapshot.
///
/// Readers clone the `Arc` under the read lock and work on their own
/// reference afterwards, so a refresh only ever waits for pointer copies.
/// `replace` swaps the pointer; readers see the old or the new snapshot,
/// never a mix.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The snapshot published at the time of the call
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Publish `next` and return its generation number
    pub fn replace(&self, mut next: Snapshot) -> u64 {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        next.generation = current.generation + 1;
        let generation = next.generation;
        *current = Arc::new(next);
        generation
    }

    pub fn lookup(&self, id: VehicleId) -> Result<Vehicle, CatalogError> {
        self.snapshot()
            .get(id)
            .cloned()
            .ok_or(CatalogError::NotFound(id))
    }

    /// Up to `n` distinct vehicles chosen uniformly without replacement
    pub fn sample(&self, n: usize) -> Vec<Vehicle> {
        sample_from(&self.snapshot().vehicles, n)
    }

    /// Vehicles matching every constraint of `filter`, in snapshot order
    pub fn filter(&self, filter: &FilterOptions) -> Vec<Vehicle> {
        self.snapshot()
            .vehicles
            .iter()
            .filter(|v| filter.matches(v))
            .cloned()
            .collect()
    }

    pub fn metadata(&self) -> Metadata {
        self.snapshot().metadata.clone()
    }

    pub fn status(&self) -> StoreStatus {
        let snapshot = self.snapshot();
        StoreStatus {
            generation: snapshot.generation,
            vehicles: snapshot.len(),
            refreshed_at: snapshot.refreshed_at,
        }
    }
}

#[async_trait::async_trait]
impl Catalog for SnapshotStore {
    async fn vehicle(&self, id: VehicleId) -> Result<Vehicle, CatalogError> {
        self.lookup(id)
    }

    async fn vehicles(&self, filter: &FilterOptions) -> Result<Vec<Vehicle>, CatalogError> {
        Ok(self.filter(filter))
    }

    async fn random(&self, limit: usize) -> Result<Vec<Vehicle>, CatalogError> {
        Ok(self.sample(limit))
    }

    async fn metadata(&self) -> Result<Metadata, CatalogError> {
        Ok(SnapshotStore::metadata(self))
    }

    fn backend(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::refresh::build_snapshot;
    use crate::testing::{sample_categories, sample_manufacturers, sample_records, sample_store};
    use carview_model::Transmission;
    use std::collections::HashSet;

    #[test]
    fn test_empty_store_reads() {
        let store = SnapshotStore::new();
        assert!(store.lookup(1).unwrap_err().is_not_found());
        assert!(store.sample(4).is_empty());
        assert!(store.filter(&FilterOptions::default()).is_empty());
        assert_eq!(store.metadata(), Metadata::default());
        assert_eq!(store.status().generation, 0);
        assert_eq!(store.status().refreshed_at, None);
    }

    #[test]
    fn test_lookup() {
        let store = sample_store();
        let m3 = store.lookup(4).unwrap();
        assert_eq!(m3.name, "M3");
        assert_eq!(m3.manufacturer.name, "BMW");
        assert_eq!(m3.category.name, "Sports Car");
        assert!(matches!(store.lookup(99), Err(CatalogError::NotFound(99))));
    }

    #[test]
    fn test_lookup_returns_a_copy() {
        let store = sample_store();
        let mut copy = store.lookup(1).unwrap();
        copy.name = "changed".to_string();
        assert_eq!(store.lookup(1).unwrap().name, "Corolla");
    }

    #[test]
    fn test_sample_bound() {
        let store = sample_store();
        let total = store.snapshot().len();

        for n in 0..=total + 3 {
            let sampled = store.sample(n);
            assert_eq!(sampled.len(), n.min(total), "n = {n}");
            let ids: HashSet<_> = sampled.iter().map(|v| v.id).collect();
            assert_eq!(ids.len(), sampled.len(), "duplicates for n = {n}");
        }
    }

    #[test]
    fn test_filter_keeps_snapshot_order() {
        let store = sample_store();
        let filter = FilterOptions {
            transmission: Some(Transmission::Automatic),
            ..FilterOptions::default()
        };
        let ids: Vec<_> = store.filter(&filter).iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![1, 2, 5, 6]);
    }

    #[test]
    fn test_replace_increments_generation() {
        let store = SnapshotStore::new();
        let build = || {
            build_snapshot(
                sample_records(),
                &sample_manufacturers(),
                &sample_categories(),
                Utc::now(),
            )
        };
        assert_eq!(store.replace(build()), 1);
        assert_eq!(store.replace(build()), 2);
        assert_eq!(store.status().generation, 2);
        assert_eq!(store.status().vehicles, 6);
    }

    #[test]
    fn test_readers_never_see_mixed_snapshot() {
        let store = SnapshotStore::new();
        let records = sample_records();
        let manufacturers = sample_manufacturers();
        let categories = sample_categories();

        let full = build_snapshot(records.clone(), &manufacturers, &categories, Utc::now());
        let sports_only = build_snapshot(
            records.into_iter().filter(|r| r.category_id == 3).collect(),
            &manufacturers,
            &categories,
            Utc::now(),
        );
        store.replace(full.clone());

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..500 {
                        let snapshot = store.snapshot();
                        assert_eq!(
                            Metadata::derive(snapshot.vehicles()),
                            *snapshot.metadata(),
                            "generation {}",
                            snapshot.generation()
                        );
                    }
                });
            }

            scope.spawn(|| {
                for round in 0..200 {
                    let next = if round % 2 == 0 { sports_only.clone() } else { full.clone() };
                    store.replace(next);
                }
            });
        });

        assert_eq!(store.status().generation, 201);
    }
}
