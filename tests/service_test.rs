//! Tests for city CRUD use-cases and the allied-power aggregate.

use diesel::{Connection, SqliteConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tempfile::NamedTempFile;
use uuid::Uuid;

use city_registry::{Beauty, CityError, CityPatch, CityService, CityStore, NewCityData};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Creates a temporary database file with schema applied, returns the file
/// handle (must stay in scope to keep the file alive) and a ready service.
fn setup_service() -> (NamedTempFile, CityService) {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();

    let mut conn = SqliteConnection::establish(&db_path).expect("Failed to connect");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Migrations failed");

    (db_file, CityService::new(CityStore::new(db_path)))
}

fn city_at(
    name: &str,
    population: i64,
    latitude: f64,
    longitude: f64,
    allies: Option<Vec<Uuid>>,
) -> NewCityData {
    NewCityData::new(
        name.to_string(),
        Some(Beauty::Average),
        population,
        latitude,
        longitude,
        allies,
    )
}

#[test]
fn create_round_trips_through_get() {
    let (_db, service) = setup_service();
    let created = service
        .create(city_at("Testing City A", 52_352, 12.432, 54.234, None))
        .expect("Create failed");

    assert_eq!(created.name(), "Testing City A");
    assert_eq!(*created.beauty(), Some(Beauty::Average));
    assert_eq!(*created.population(), 52_352);
    assert_eq!(*created.geo_location_latitude(), 12.432);
    assert_eq!(*created.geo_location_longitude(), 54.234);
    assert!(created.allied_cities().is_empty());

    let fetched = service.get(*created.city_uuid()).expect("Get failed");
    assert_eq!(fetched.city_uuid(), created.city_uuid());
    assert_eq!(fetched.name(), created.name());
    assert!(fetched.allied_cities().is_empty());
}

#[test]
fn create_generates_distinct_uuids() {
    let (_db, service) = setup_service();
    let a = service
        .create(city_at("A", 1, 0.0, 0.0, None))
        .expect("Create failed");
    let b = service
        .create(city_at("B", 1, 0.0, 0.0, None))
        .expect("Create failed");
    assert_ne!(a.city_uuid(), b.city_uuid());
}

#[test]
fn create_preserves_supplied_ally_order() {
    let (_db, service) = setup_service();
    let a = service
        .create(city_at("A", 1, 0.0, 0.0, None))
        .expect("Create failed");
    let b = service
        .create(city_at("B", 1, 1.0, 1.0, None))
        .expect("Create failed");

    // Deliberately reversed relative to creation order.
    let c = service
        .create(city_at(
            "C",
            1,
            2.0,
            2.0,
            Some(vec![*b.city_uuid(), *a.city_uuid()]),
        ))
        .expect("Create failed");

    assert_eq!(
        c.allied_cities(),
        &vec![*b.city_uuid(), *a.city_uuid()]
    );

    let fetched = service.get(*c.city_uuid()).expect("Get failed");
    assert_eq!(
        fetched.allied_cities(),
        &vec![*b.city_uuid(), *a.city_uuid()]
    );
}

#[test]
fn create_with_unknown_ally_rolls_back_the_city_row() {
    let (_db, service) = setup_service();
    let bogus = Uuid::new_v4();

    let err = service
        .create(city_at("Orphan", 1, 0.0, 0.0, Some(vec![bogus])))
        .expect_err("Unknown ally should fail");
    assert!(matches!(err, CityError::InvalidAllies { .. }));

    // Nothing was persisted, not even the city row itself.
    let cities = service.list(0, 100).expect("List failed");
    assert!(cities.is_empty());
}

#[test]
fn get_missing_city_is_not_found() {
    let (_db, service) = setup_service();
    let err = service.get(Uuid::new_v4()).expect_err("Get should fail");
    assert!(matches!(err, CityError::NotFound { .. }));
}

#[test]
fn list_is_sorted_by_name_and_paginated() {
    let (_db, service) = setup_service();
    for name in ["Gamma", "Alpha", "Beta"] {
        service
            .create(city_at(name, 1, 0.0, 0.0, None))
            .expect("Create failed");
    }

    let all = service.list(0, 100).expect("List failed");
    let names: Vec<&str> = all.iter().map(|c| c.name().as_str()).collect();
    assert_eq!(names, vec!["Alpha", "Beta", "Gamma"]);

    let page = service.list(1, 1).expect("List failed");
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].name(), "Beta");
}

#[test]
fn list_annotates_each_city_with_its_allies() {
    let (_db, service) = setup_service();
    let a = service
        .create(city_at("A", 1, 0.0, 0.0, None))
        .expect("Create failed");
    let b = service
        .create(city_at("B", 1, 1.0, 1.0, Some(vec![*a.city_uuid()])))
        .expect("Create failed");

    let all = service.list(0, 100).expect("List failed");
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].allied_cities(), &vec![*b.city_uuid()]);
    assert_eq!(all[1].allied_cities(), &vec![*a.city_uuid()]);
}

#[test]
fn partial_update_touches_only_supplied_fields() {
    let (_db, service) = setup_service();
    let a = service
        .create(city_at("A", 1, 0.0, 0.0, None))
        .expect("Create failed");
    let c = service
        .create(city_at("C", 50, 2.0, 2.0, Some(vec![*a.city_uuid()])))
        .expect("Create failed");

    let patch = CityPatch::new(None, None, Some(123), None, None, None);
    let updated = service.update(*c.city_uuid(), patch).expect("Update failed");

    assert_eq!(*updated.population(), 123);
    assert_eq!(updated.name(), "C");
    assert_eq!(*updated.beauty(), Some(Beauty::Average));
    assert_eq!(*updated.geo_location_latitude(), 2.0);
    // Alliances untouched when the patch omits allied_cities.
    assert_eq!(updated.allied_cities(), &vec![*a.city_uuid()]);
}

#[test]
fn update_can_change_name_and_beauty() {
    let (_db, service) = setup_service();
    let a = service
        .create(city_at("Old Name", 7, 0.0, 0.0, None))
        .expect("Create failed");

    let patch = CityPatch::new(
        Some("New Name".to_string()),
        Some(Beauty::Gorgeous),
        None,
        None,
        None,
        None,
    );
    let updated = service.update(*a.city_uuid(), patch).expect("Update failed");

    assert_eq!(updated.name(), "New Name");
    assert_eq!(*updated.beauty(), Some(Beauty::Gorgeous));
    assert_eq!(*updated.population(), 7);
}

#[test]
fn update_missing_city_is_not_found() {
    let (_db, service) = setup_service();
    let patch = CityPatch::new(None, None, Some(1), None, None, None);
    let err = service
        .update(Uuid::new_v4(), patch)
        .expect_err("Update should fail");
    assert!(matches!(err, CityError::NotFound { .. }));
}

#[test]
fn delete_returns_last_state_then_not_found() {
    let (_db, service) = setup_service();
    let a = service
        .create(city_at("A", 9, 0.0, 0.0, None))
        .expect("Create failed");
    let b = service
        .create(city_at("B", 9, 1.0, 1.0, Some(vec![*a.city_uuid()])))
        .expect("Create failed");

    let deleted = service.delete(*b.city_uuid()).expect("Delete failed");
    assert_eq!(deleted.name(), "B");
    assert_eq!(deleted.allied_cities(), &vec![*a.city_uuid()]);

    let err = service.get(*b.city_uuid()).expect_err("Get should fail");
    assert!(matches!(err, CityError::NotFound { .. }));

    let err = service.delete(*b.city_uuid()).expect_err("Delete should fail");
    assert!(matches!(err, CityError::NotFound { .. }));
}

#[test]
fn beauty_is_optional() {
    let (_db, service) = setup_service();
    let plain = service
        .create(NewCityData::new(
            "Plain".to_string(),
            None,
            10,
            0.0,
            0.0,
            None,
        ))
        .expect("Create failed");
    assert_eq!(*plain.beauty(), None);

    let fetched = service.get(*plain.city_uuid()).expect("Get failed");
    assert_eq!(*fetched.beauty(), None);
}

#[test]
fn allied_power_without_allies_is_the_population() {
    let (_db, service) = setup_service();
    let a = service
        .create(city_at("Testing City A", 52_352, 12.432, 54.234, None))
        .expect("Create failed");

    let view = service
        .get_with_power(*a.city_uuid())
        .expect("Power lookup failed");
    assert_eq!(*view.allied_power(), 52_352);
}

#[test]
fn allied_power_discounts_allies_by_distance_bracket() {
    let (_db, service) = setup_service();

    // Hamburg is under 1000 km from Frankfurt (full weight), Madrid is
    // mid-range (half), Arequipa is beyond 10000 km (quarter).
    let hamburg = service
        .create(city_at("Hamburg", 1_841_000, 53.551086, 9.993682, None))
        .expect("Create failed");
    let madrid = service
        .create(city_at("Madrid", 6_751_000, 40.413793, -3.702895, None))
        .expect("Create failed");
    let arequipa = service
        .create(city_at("Arequipa", 959_000, -16.408413, -71.537554, None))
        .expect("Create failed");

    let frankfurt = service
        .create(city_at(
            "Frankfurt",
            753_056,
            50.110924,
            8.682127,
            Some(vec![
                *hamburg.city_uuid(),
                *madrid.city_uuid(),
                *arequipa.city_uuid(),
            ]),
        ))
        .expect("Create failed");

    let view = service
        .get_with_power(*frankfurt.city_uuid())
        .expect("Power lookup failed");

    // 753056 + 1841000 + 6751000/2 + 959000/4
    assert_eq!(*view.allied_power(), 6_209_306);
    assert_eq!(view.city().allied_cities().len(), 3);
}
