//! Personalized suggestions from a view history
//!
//! Ranking is deterministic: frequency ties resolve by first appearance in
//! the history, which is most-recent-first. Personalization is best-effort.
//! Any catalog failure other than a missing vehicle falls back to random
//! picks, so `recommend` always answers.

use crate::catalog::{Catalog, CatalogError, with_deadline};
use carview_model::{CategoryId, FilterOptions, ManufacturerId, Vehicle, VehicleId, ViewHistory};
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Number of suggestions returned
pub const LIMIT: usize = 4;

/// Distinct items with their occurrence count, most frequent first.
///
/// Equal counts keep first-seen order.
pub fn rank_by_frequency<T>(items: impl IntoIterator<Item = T>) -> Vec<(T, usize)>
where
    T: Copy + Eq + Hash,
{
    let mut position: HashMap<T, usize> = HashMap::new();
    let mut ranked: Vec<(T, usize)> = Vec::new();

    for item in items {
        match position.get(&item) {
            Some(&pos) => ranked[pos].1 += 1,
            None => {
                position.insert(item, ranked.len());
                ranked.push((item, 1));
            }
        }
    }

    // Stable sort keeps first-seen order among equal counts
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}

/// Manufacturer and category preferences of one history
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Affinity {
    /// Up to two manufacturers, strongest first
    pub manufacturers: Vec<ManufacturerId>,
    pub category: Option<CategoryId>,
}

impl Affinity {
    /// Tally every history entry that resolved to a vehicle, so a vehicle
    /// viewed three times weighs three times.
    pub fn derive(history: &[VehicleId], resolved: &HashMap<VehicleId, Vehicle>) -> Self {
        let viewed: Vec<&Vehicle> = history.iter().filter_map(|id| resolved.get(id)).collect();

        let manufacturers = rank_by_frequency(viewed.iter().map(|v| v.manufacturer.id))
            .into_iter()
            .take(2)
            .map(|(id, _)| id)
            .collect();
        let category = rank_by_frequency(viewed.iter().map(|v| v.category.id))
            .first()
            .map(|&(id, _)| id);

        Self {
            manufacturers,
            category,
        }
    }

    /// Slot rules for this affinity, in evaluation order.
    ///
    /// One slot per preferred manufacturer, then one for any other
    /// manufacturer; all within the preferred category.
    pub fn slot_rules(&self, exclude: &[VehicleId]) -> Vec<SlotRule> {
        let Some(category) = self.category else {
            return Vec::new();
        };

        let mut rules: Vec<SlotRule> = self
            .manufacturers
            .iter()
            .map(|&id| SlotRule {
                category,
                maker: Maker::Is(id),
                exclude: exclude.to_vec(),
            })
            .collect();
        rules.push(SlotRule {
            category,
            maker: Maker::NoneOf(self.manufacturers.clone()),
            exclude: exclude.to_vec(),
        });
        rules
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Maker {
    Is(ManufacturerId),
    NoneOf(Vec<ManufacturerId>),
}

/// One candidate slot: the first vehicle in `category` whose manufacturer
/// satisfies `maker` and whose id is not in `exclude`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRule {
    pub category: CategoryId,
    pub maker: Maker,
    pub exclude: Vec<VehicleId>,
}

impl SlotRule {
    pub fn matches(&self, vehicle: &Vehicle) -> bool {
        let maker = match &self.maker {
            Maker::Is(id) => vehicle.manufacturer.id == *id,
            Maker::NoneOf(ids) => !ids.contains(&vehicle.manufacturer.id),
        };
        maker && vehicle.category.id == self.category && !self.exclude.contains(&vehicle.id)
    }

    pub fn pick<'a>(&self, candidates: &'a [Vehicle]) -> Option<&'a Vehicle> {
        candidates.iter().find(|v| self.matches(v))
    }
}

/// Drop `exclude` and repeated ids, keep assembly order, cap at [`LIMIT`]
pub fn finalize(candidates: impl IntoIterator<Item = Vehicle>, exclude: Option<VehicleId>) -> Vec<Vehicle> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|v| Some(v.id) != exclude && seen.insert(v.id))
        .take(LIMIT)
        .collect()
}

pub struct Recommender {
    catalog: Arc<dyn Catalog>,
    timeout: Duration,
}

impl std::fmt::Debug for Recommender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recommender")
            .field("catalog", &self.catalog.backend())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Recommender {
    /// `timeout` bounds each catalog call made while recommending
    pub fn new(catalog: Arc<dyn Catalog>, timeout: Duration) -> Self {
        Self { catalog, timeout }
    }

    /// Up to [`LIMIT`] suggestions for `history`, never containing `exclude`
    pub async fn recommend(&self, history: &ViewHistory, exclude: Option<VehicleId>) -> Vec<Vehicle> {
        if history.is_empty() {
            return self.cold_start(exclude).await;
        }

        match self.personalized(history).await {
            Ok(candidates) => {
                let filler = self.filler().await;
                finalize(candidates.into_iter().chain(filler), exclude)
            }
            Err(e) => {
                warn!("Recommendations fell back to random picks: {}", e);
                self.cold_start(exclude).await
            }
        }
    }

    async fn cold_start(&self, exclude: Option<VehicleId>) -> Vec<Vehicle> {
        finalize(self.filler().await, exclude)
    }

    // One extra so dropping the excluded id still leaves LIMIT
    async fn filler(&self) -> Vec<Vehicle> {
        match with_deadline(self.timeout, self.catalog.random(LIMIT + 1)).await {
            Ok(vehicles) => vehicles,
            Err(e) => {
                warn!("Could not sample filler vehicles: {}", e);
                Vec::new()
            }
        }
    }

    async fn personalized(&self, history: &ViewHistory) -> Result<Vec<Vehicle>, CatalogError> {
        let ranked: Vec<VehicleId> = rank_by_frequency(history.ids().iter().copied())
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        let top: Vec<VehicleId> = ranked.iter().copied().take(2).collect();

        let resolved = self.resolve(&ranked).await?;
        let affinity = Affinity::derive(history.ids(), &resolved);
        debug!("History affinity: {:?}, top vehicles {:?}", affinity, top);

        let mut candidates: Vec<Vehicle> = top.iter().filter_map(|id| resolved.get(id).cloned()).collect();

        if let Some(category) = affinity.category {
            let filter = FilterOptions {
                category_id: category,
                ..FilterOptions::default()
            };
            let pool = with_deadline(self.timeout, self.catalog.vehicles(&filter)).await?;

            // Slots only skip the top vehicles; `finalize` drops the excluded id
            candidates.extend(
                affinity
                    .slot_rules(&top)
                    .iter()
                    .filter_map(|rule| rule.pick(&pool))
                    .cloned(),
            );
        }

        Ok(candidates)
    }

    /// Look up every id concurrently. Ids the catalog no longer knows are
    /// skipped; any other failure aborts.
    async fn resolve(&self, ids: &[VehicleId]) -> Result<HashMap<VehicleId, Vehicle>, CatalogError> {
        let lookups = join_all(
            ids.iter()
                .map(|&id| with_deadline(self.timeout, self.catalog.vehicle(id))),
        )
        .await;

        let mut resolved = HashMap::with_capacity(ids.len());
        for (&id, result) in ids.iter().zip(lookups) {
            match result {
                Ok(vehicle) => {
                    resolved.insert(id, vehicle);
                }
                Err(e) if e.is_not_found() => debug!("Viewed vehicle {} is gone", id),
                Err(e) => return Err(e),
            }
        }
        Ok(resolved)
    }
}
