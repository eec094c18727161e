//! Test doubles shared by the unit test modules

use crate::catalog::CatalogError;
use crate::catalog::refresh::build_snapshot;
use crate::catalog::store::SnapshotStore;
use crate::origin::OriginFetcher;
use carview_model::{Category, Manufacturer, VehicleRecord, decode_list};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

const MODELS: &str = include_str!("../../.sample_data/origin/models.json");
const MANUFACTURERS: &str = include_str!("../../.sample_data/origin/manufacturers.json");
const CATEGORIES: &str = include_str!("../../.sample_data/origin/categories.json");

pub fn sample_records() -> Vec<VehicleRecord> {
    decode_list(MODELS.as_bytes()).unwrap()
}

pub fn sample_manufacturers() -> Vec<Manufacturer> {
    decode_list(MANUFACTURERS.as_bytes()).unwrap()
}

pub fn sample_categories() -> Vec<Category> {
    decode_list(CATEGORIES.as_bytes()).unwrap()
}

/// Store loaded with the sample catalog
pub fn sample_store() -> Arc<SnapshotStore> {
    let store = SnapshotStore::new();
    store.replace(build_snapshot(
        sample_records(),
        &sample_manufacturers(),
        &sample_categories(),
        chrono::Utc::now(),
    ));
    Arc::new(store)
}

/// In-memory origin with switchable failures and call counting
#[derive(Debug, Default)]
pub struct FakeOrigin {
    pub records: Vec<VehicleRecord>,
    pub manufacturers: Vec<Manufacturer>,
    pub categories: Vec<Category>,
    pub fail_vehicles: AtomicBool,
    pub fail_manufacturers: AtomicBool,
    pub fail_categories: AtomicBool,
    pub delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl FakeOrigin {
    pub fn sample() -> Self {
        Self {
            records: sample_records(),
            manufacturers: sample_manufacturers(),
            categories: sample_categories(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn answer<T: Clone>(&self, fail: &AtomicBool, data: &[T]) -> Result<Vec<T>, CatalogError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if fail.load(Ordering::SeqCst) {
            return Err(CatalogError::Status {
                status: 503,
                url: "http://origin.test/".to_string(),
            });
        }
        Ok(data.to_vec())
    }
}

#[async_trait::async_trait]
impl OriginFetcher for FakeOrigin {
    async fn fetch_vehicles(&self) -> Result<Vec<VehicleRecord>, CatalogError> {
        self.answer(&self.fail_vehicles, &self.records).await
    }

    async fn fetch_manufacturers(&self) -> Result<Vec<Manufacturer>, CatalogError> {
        self.answer(&self.fail_manufacturers, &self.manufacturers).await
    }

    async fn fetch_categories(&self) -> Result<Vec<Category>, CatalogError> {
        self.answer(&self.fail_categories, &self.categories).await
    }
}
