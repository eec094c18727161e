//! Wire records as published by the origin API.
//!
//! A `VehicleRecord` only knows the ids of its manufacturer and category;
//! [`VehicleRecord::enrich`] joins it against the reference lists.

use crate::vehicle::{
    Category, CategoryId, Manufacturer, ManufacturerId, Specification, Transmission, Vehicle,
    VehicleId,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpecificationRecord {
    pub engine: String,
    pub horsepower: u32,
    /// The origin calls the gearbox label "transmission"
    pub transmission: String,
    pub drivetrain: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VehicleRecord {
    pub id: VehicleId,
    pub name: String,
    pub manufacturer_id: ManufacturerId,
    pub category_id: CategoryId,
    pub year: u32,
    pub specifications: SpecificationRecord,
    pub image: String,
}

impl VehicleRecord {
    /// Build the enriched vehicle.
    ///
    /// Missing references are tolerated: the vehicle keeps an id-only stub.
    pub fn enrich(self, manufacturer: Option<&Manufacturer>, category: Option<&Category>) -> Vehicle {
        let transmission = Transmission::classify(&self.specifications.transmission);

        Vehicle {
            id: self.id,
            name: self.name,
            year: self.year,
            image: self.image,
            specification: Specification {
                engine: self.specifications.engine,
                horsepower: self.specifications.horsepower,
                gearbox: self.specifications.transmission,
                transmission,
                drivetrain: self.specifications.drivetrain,
            },
            manufacturer: manufacturer
                .cloned()
                .unwrap_or_else(|| Manufacturer::stub(self.manufacturer_id)),
            category: category
                .cloned()
                .unwrap_or_else(|| Category::stub(self.category_id)),
        }
    }
}

/// Lookup tables for the manufacturer/category join
#[derive(Debug, Clone, Default)]
pub struct References {
    manufacturers: HashMap<ManufacturerId, Manufacturer>,
    categories: HashMap<CategoryId, Category>,
}

impl References {
    pub fn new(manufacturers: &[Manufacturer], categories: &[Category]) -> Self {
        Self {
            manufacturers: manufacturers.iter().map(|m| (m.id, m.clone())).collect(),
            categories: categories.iter().map(|c| (c.id, c.clone())).collect(),
        }
    }

    pub fn manufacturer(&self, id: ManufacturerId) -> Option<&Manufacturer> {
        self.manufacturers.get(&id)
    }

    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        self.categories.get(&id)
    }

    /// True when both references of `record` resolve
    pub fn resolves(&self, record: &VehicleRecord) -> bool {
        self.manufacturers.contains_key(&record.manufacturer_id)
            && self.categories.contains_key(&record.category_id)
    }

    pub fn enrich(&self, record: VehicleRecord) -> Vehicle {
        let manufacturer = self.manufacturer(record.manufacturer_id);
        let category = self.category(record.category_id);
        record.enrich(manufacturer, category)
    }
}

/// Decode a JSON array payload from the origin
pub fn decode_list<T: DeserializeOwned>(data: &[u8]) -> Result<Vec<T>, serde_json::Error> {
    serde_json::from_slice(data)
}

/// Decode a single JSON object payload from the origin
pub fn decode_one<T: DeserializeOwned>(data: &[u8]) -> Result<T, serde_json::Error> {
    serde_json::from_slice(data)
}
