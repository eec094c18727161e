use crate::vehicle::{Category, CategoryId, Manufacturer, ManufacturerId, Transmission, Vehicle};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use std::str::FromStr;

/// Catalog search predicates, combined with logical AND.
///
/// Numeric fields use `0` for "no constraint", the string-like fields use
/// `None`. Query strings with empty values (`?min_year=&transmission=`)
/// decode to the unconstrained form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterOptions {
    #[serde(deserialize_with = "empty_as_default")]
    pub manufacturer_id: ManufacturerId,
    #[serde(deserialize_with = "empty_as_default")]
    pub category_id: CategoryId,
    #[serde(deserialize_with = "empty_as_default")]
    pub min_year: u32,
    #[serde(deserialize_with = "empty_as_default")]
    pub min_hp: u32,
    #[serde(deserialize_with = "empty_as_none")]
    pub transmission: Option<Transmission>,
    #[serde(deserialize_with = "empty_as_none")]
    pub drivetrain: Option<String>,
}

impl FilterOptions {
    pub fn matches(&self, vehicle: &Vehicle) -> bool {
        let spec = &vehicle.specification;

        (self.manufacturer_id == 0 || vehicle.manufacturer.id == self.manufacturer_id)
            && (self.category_id == 0 || vehicle.category.id == self.category_id)
            && (self.min_year == 0 || vehicle.year >= self.min_year)
            && (self.min_hp == 0 || spec.horsepower >= self.min_hp)
            && self.transmission.is_none_or(|t| spec.transmission == t)
            && self
                .drivetrain
                .as_deref()
                .filter(|d| !d.is_empty())
                .is_none_or(|d| spec.drivetrain == d)
    }

    pub fn is_unconstrained(&self) -> bool {
        self.manufacturer_id == 0
            && self.category_id == 0
            && self.min_year == 0
            && self.min_hp == 0
            && self.transmission.is_none()
            && self.drivetrain.as_deref().is_none_or(str::is_empty)
    }
}

// Query strings carry text, JSON bodies may carry numbers
#[derive(Deserialize)]
#[serde(untagged)]
enum RawField {
    Text(String),
    Number(u64),
}

fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw = match Option::<RawField>::deserialize(deserializer)? {
        Some(RawField::Text(text)) => text,
        Some(RawField::Number(n)) => n.to_string(),
        None => return Ok(None),
    };

    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse().map(Some).map_err(serde::de::Error::custom)
}

fn empty_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Default,
    T::Err: Display,
{
    Ok(empty_as_none(deserializer)?.unwrap_or_default())
}

/// Filter choices derived from one set of vehicles
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub manufacturers: Vec<Manufacturer>,
    pub categories: Vec<Category>,
    pub drivetrains: Vec<String>,
    pub transmissions: Vec<Transmission>,
}

impl Metadata {
    /// Collect the distinct manufacturers, categories, drivetrains and
    /// transmission classes present in `vehicles`.
    ///
    /// Output order only depends on the set of vehicles: records by name
    /// then id, labels lexically.
    pub fn derive<'a>(vehicles: impl IntoIterator<Item = &'a Vehicle>) -> Self {
        let mut manufacturers = BTreeMap::new();
        let mut categories = BTreeMap::new();
        let mut drivetrains = BTreeSet::new();
        let mut transmissions = BTreeSet::new();

        for vehicle in vehicles {
            manufacturers
                .entry(vehicle.manufacturer.id)
                .or_insert_with(|| vehicle.manufacturer.clone());
            categories
                .entry(vehicle.category.id)
                .or_insert_with(|| vehicle.category.clone());
            if !vehicle.specification.drivetrain.is_empty() {
                drivetrains.insert(vehicle.specification.drivetrain.clone());
            }
            transmissions.insert(vehicle.specification.transmission);
        }

        let mut manufacturers: Vec<Manufacturer> = manufacturers.into_values().collect();
        manufacturers.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        let mut categories: Vec<Category> = categories.into_values().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        Self {
            manufacturers,
            categories,
            drivetrains: drivetrains.into_iter().collect(),
            transmissions: transmissions.into_iter().collect(),
        }
    }
}
