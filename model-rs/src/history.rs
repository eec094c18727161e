use crate::vehicle::VehicleId;
use serde::{Deserialize, Serialize};

/// Browsing history, most recent view first, at most [`ViewHistory::MAX_LEN`] ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewHistory(Vec<VehicleId>);

impl ViewHistory {
    pub const MAX_LEN: usize = 31;

    pub fn new(ids: impl IntoIterator<Item = VehicleId>) -> Self {
        Self(ids.into_iter().take(Self::MAX_LEN).collect())
    }

    /// Parse the comma-separated form (e.g. a cookie value).
    ///
    /// The raw entry count is capped before parsing so an oversized header
    /// costs nothing; entries that are not positive integers are dropped.
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return Self::default();
        }

        let ids = raw
            .split(',')
            .take(Self::MAX_LEN)
            .filter_map(|part| part.trim().parse::<VehicleId>().ok())
            .filter(|id| *id > 0)
            .collect();

        Self(ids)
    }

    /// Record a view of `id`: prepend it and drop the oldest entries past the cap
    pub fn track(&self, id: VehicleId) -> Self {
        Self::new(std::iter::once(id).chain(self.0.iter().copied()))
    }

    pub fn encode(&self) -> String {
        self.0
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn ids(&self) -> &[VehicleId] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<Vec<VehicleId>> for ViewHistory {
    fn from(ids: Vec<VehicleId>) -> Self {
        Self::new(ids)
    }
}
