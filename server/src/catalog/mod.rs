//! Catalog read side for Carview
//!
//! This module defines the query interface the presentation layer and the
//! recommender consume, plus the two backends behind it: an in-memory
//! snapshot refreshed on a timer, and a remote-backed catalog that goes to
//! the origin on every call with a short-lived cache in front.

pub mod cache;
pub mod refresh;
pub mod remote;
pub mod store;

use carview_model::{FilterOptions, Metadata, Vehicle, VehicleId};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Error type for catalog and origin operations
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Origin request failed: {0}")]
    Origin(#[from] Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error("Origin returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Failed to decode origin response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Vehicle not found: {0}")]
    NotFound(VehicleId),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Cancelled")]
    Cancelled,
}

impl CatalogError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound(_))
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(e: reqwest::Error) -> Self {
        CatalogError::Origin(Box::new(e))
    }
}

/// Bound `fut` by `timeout`, mapping expiry to [`CatalogError::Timeout`]
pub async fn with_deadline<T, F>(timeout: Duration, fut: F) -> Result<T, CatalogError>
where
    F: Future<Output = Result<T, CatalogError>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| CatalogError::Timeout(timeout))?
}

/// Query interface over one catalog backend
///
/// Every operation returns owned values; callers can never reach the
/// backend's internal state through a result.
#[async_trait::async_trait]
pub trait Catalog: Send + Sync {
    /// Exact lookup by id. A miss is [`CatalogError::NotFound`].
    async fn vehicle(&self, id: VehicleId) -> Result<Vehicle, CatalogError>;

    /// All vehicles satisfying every constraint in `filter`
    async fn vehicles(&self, filter: &FilterOptions) -> Result<Vec<Vehicle>, CatalogError>;

    /// Up to `limit` distinct vehicles chosen uniformly at random
    async fn random(&self, limit: usize) -> Result<Vec<Vehicle>, CatalogError>;

    /// Filter choices for the current data
    async fn metadata(&self) -> Result<Metadata, CatalogError>;

    /// Short backend identifier for health output (e.g. "memory", "remote")
    fn backend(&self) -> &str;
}
