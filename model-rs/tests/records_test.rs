use carview_model::*;

mod common;
use common::*;

#[test]
fn decode_sample_payloads() {
    let records = sample_records();
    assert_eq!(records.len(), 6);

    let civic = &records[2];
    assert_eq!(civic.id, 3);
    assert_eq!(civic.name, "Civic Type R");
    assert_eq!(civic.manufacturer_id, 2);
    assert_eq!(civic.category_id, 3);
    assert_eq!(civic.specifications.horsepower, 315);
    assert_eq!(civic.specifications.transmission, "6-Speed Manual");

    assert_eq!(sample_manufacturers().len(), 4);
    assert_eq!(sample_categories().len(), 3);
}

#[test]
fn enrichment_denormalizes_references() {
    let vehicles = sample_vehicles();
    let m3 = vehicles.iter().find(|v| v.id == 4).unwrap();

    assert_eq!(m3.manufacturer.name, "BMW");
    assert_eq!(m3.manufacturer.country, "Germany");
    assert_eq!(m3.manufacturer.founding_year, 1916);
    assert_eq!(m3.category.name, "Sports Car");
    assert_eq!(m3.specification.gearbox, "6-speed manual");
    assert_eq!(m3.specification.transmission, Transmission::Manual);
}

#[test]
fn transmission_classes_follow_gearbox_label() {
    let vehicles = sample_vehicles();
    let class_of = |id: VehicleId| {
        vehicles
            .iter()
            .find(|v| v.id == id)
            .map(|v| v.specification.transmission)
            .unwrap()
    };

    assert_eq!(class_of(1), Transmission::Automatic); // CVT
    assert_eq!(class_of(3), Transmission::Manual); // 6-Speed Manual
    assert_eq!(class_of(6), Transmission::Automatic); // 8-Speed Dual-Clutch Automatic
}

#[test]
fn missing_reference_leaves_stub() {
    let references = References::new(&sample_manufacturers(), &sample_categories());
    let record = VehicleRecord {
        id: 77,
        name: "Prototype".to_string(),
        manufacturer_id: 99,
        category_id: 2,
        ..VehicleRecord::default()
    };

    assert!(!references.resolves(&record));
    let vehicle = references.enrich(record);

    assert_eq!(vehicle.manufacturer, Manufacturer::stub(99));
    assert_eq!(vehicle.category.name, "Sedan");
}

#[test]
fn enrichment_is_deterministic() {
    assert_eq!(sample_vehicles(), sample_vehicles());
    assert_eq!(
        Metadata::derive(&sample_vehicles()),
        Metadata::derive(&sample_vehicles())
    );
}
