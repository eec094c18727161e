use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub type VehicleId = u32;
pub type ManufacturerId = u32;
pub type CategoryId = u32;

/// Transmission class derived from the free-form gearbox label.
///
/// Only two classes exist: catalog filters are built around exactly
/// "Manual" and "Automatic".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Transmission {
    Manual,
    Automatic,
}

impl Transmission {
    /// Classify a gearbox label. Anything mentioning "manual" (any case) is
    /// Manual; CVT, DSG, dual-clutch, single-speed etc. are Automatic.
    pub fn classify(gearbox: &str) -> Self {
        if gearbox.to_lowercase().contains("manual") {
            Transmission::Manual
        } else {
            Transmission::Automatic
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Transmission::Manual => "Manual",
            Transmission::Automatic => "Automatic",
        }
    }
}

impl fmt::Display for Transmission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown transmission class: {0}")]
pub struct ParseTransmissionError(pub String);

impl FromStr for Transmission {
    type Err = ParseTransmissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manual" => Ok(Transmission::Manual),
            "automatic" => Ok(Transmission::Automatic),
            _ => Err(ParseTransmissionError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Manufacturer {
    pub id: ManufacturerId,
    pub name: String,
    pub country: String,
    pub founding_year: i32,
}

impl Manufacturer {
    /// Id-only reference, used when the manufacturer list has no record for `id`
    pub fn stub(id: ManufacturerId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

impl Category {
    /// Id-only reference, used when the category list has no record for `id`
    pub fn stub(id: CategoryId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Specification {
    pub engine: String,
    pub horsepower: u32,
    /// Gearbox label as published by the origin, e.g. "8-Speed Automatic"
    pub gearbox: String,
    pub transmission: Transmission,
    pub drivetrain: String,
}

/// A fully enriched catalog entry.
///
/// `manufacturer` and `category` carry the denormalized records. They are
/// id-only stubs when the origin's reference lists did not contain the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: VehicleId,
    pub name: String,
    pub year: u32,
    pub image: String,
    pub specification: Specification,
    pub manufacturer: Manufacturer,
    pub category: Category,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_manual() {
        assert_eq!(Transmission::classify("6-Speed Manual"), Transmission::Manual);
        assert_eq!(Transmission::classify("5-speed MANUAL"), Transmission::Manual);
    }

    #[test]
    fn test_classify_everything_else_is_automatic() {
        for label in ["8-Speed Dual-Clutch Automatic", "CVT", "7-Speed DSG", "Single-Speed", ""] {
            assert_eq!(Transmission::classify(label), Transmission::Automatic, "{label}");
        }
    }

    #[test]
    fn test_transmission_parse() {
        assert_eq!("manual".parse::<Transmission>(), Ok(Transmission::Manual));
        assert_eq!(" Automatic ".parse::<Transmission>(), Ok(Transmission::Automatic));
        assert!("CVT".parse::<Transmission>().is_err());
        assert_eq!(Transmission::Manual.to_string(), "Manual");
    }

    #[test]
    fn test_manufacturer_decodes_origin_json() {
        let json = r#"{"id":3,"name":"BMW","country":"Germany","foundingYear":1916}"#;
        let m: Manufacturer = serde_json::from_str(json).unwrap();
        assert_eq!(m.founding_year, 1916);
        assert_eq!(Manufacturer::stub(3).name, "");
    }
}
