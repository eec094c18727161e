use carview_model::*;

pub const MODELS_JSON: &str = include_str!("../../.sample_data/origin/models.json");
pub const MANUFACTURERS_JSON: &str = include_str!("../../.sample_data/origin/manufacturers.json");
pub const CATEGORIES_JSON: &str = include_str!("../../.sample_data/origin/categories.json");

pub fn sample_records() -> Vec<VehicleRecord> {
    decode_list(MODELS_JSON.as_bytes()).expect("models.json should decode")
}

pub fn sample_manufacturers() -> Vec<Manufacturer> {
    decode_list(MANUFACTURERS_JSON.as_bytes()).expect("manufacturers.json should decode")
}

pub fn sample_categories() -> Vec<Category> {
    decode_list(CATEGORIES_JSON.as_bytes()).expect("categories.json should decode")
}

// Enriched form of the sample payloads
#[allow(dead_code)]
pub fn sample_vehicles() -> Vec<Vehicle> {
    let references = References::new(&sample_manufacturers(), &sample_categories());
    sample_records()
        .into_iter()
        .map(|record| references.enrich(record))
        .collect()
}
