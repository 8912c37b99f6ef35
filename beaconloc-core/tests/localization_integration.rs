//! End-to-end localization scenarios
//!
//! Readings are synthesized from known beacon positions and run through the
//! full engine: filtering, ranging, floor selection, solve and corrections.

mod common;

use beaconloc_core::{
    floor::FloorRule, EngineConfig, LocalizationError, Localizer, Position, Reading,
};

use common::{deployment, single_room, two_level_house, ReadingGenerator};

fn plan_error(found: &Position, target: &Position) -> f64 {
    ((found.x - target.x).powi(2) + (found.y - target.y).powi(2)).sqrt()
}

#[test]
fn exact_ranges_recover_beacon() {
    let room = single_room();
    let target = Position::new(5.0, 3.0, 1.0);
    let readings = ReadingGenerator::new().hear("beacon-1", target, &room, 10, 0.0);
    let site = deployment(vec![room]);
    let config = EngineConfig::default();

    let reports = Localizer::new(&site, &config).locate_all(&readings);
    assert_eq!(reports.len(), 1);

    let report = &reports[0];
    let found = report.estimate.position.expect("beacon should be located");
    assert!(found.distance_to(&target) < 1e-2, "found {found:?}");
    assert!(report.estimate.in_zone);
    assert_eq!(report.estimate.zone_name.as_deref(), Some("room"));

    for range in &report.ranges {
        let gateway = site.gateway(&range.gateway_id).unwrap();
        let truth = gateway.position.distance_to(&target);
        assert!((range.distance - truth).abs() < 1e-6, "{}: {}", range.gateway_id, range.distance);
    }
}

#[test]
fn noisy_readings_stay_in_the_room() {
    let room = single_room();
    let target = Position::new(4.0, 5.0, 1.0);
    let readings = ReadingGenerator::new().hear("beacon-1", target, &room, 30, 3.0);
    let site = deployment(vec![room]);
    let config = EngineConfig::default();

    let report = Localizer::new(&site, &config).locate_all(&readings).remove(0);
    let found = report.estimate.position.expect("beacon should be located");
    assert!((0.0..=10.0).contains(&found.x) && (0.0..=10.0).contains(&found.y));
    assert!((0.0..=3.0).contains(&found.z));
    assert_eq!(report.estimate.zone_name.as_deref(), Some("room"));
}

#[test]
fn beacons_are_independent() {
    let room = single_room();
    let mut generator = ReadingGenerator::new();
    let mut readings = generator.hear("a", Position::new(2.0, 2.0, 1.0), &room, 10, 0.0);
    readings.extend(generator.hear("b", Position::new(8.0, 6.0, 1.0), &room, 10, 0.0));
    // A beacon heard too rarely is reported without a position
    readings.extend(generator.hear("c", Position::new(5.0, 5.0, 1.0), &room, 2, 0.0));
    let site = deployment(vec![room]);
    let config = EngineConfig::default();

    let reports = Localizer::new(&site, &config).locate_all(&readings);
    let located: Vec<(&str, bool)> = reports
        .iter()
        .map(|r| (r.estimate.beacon_id.as_str(), r.is_located()))
        .collect();
    assert_eq!(located, [("a", true), ("b", true), ("c", false)]);

    let a = reports[0].estimate.position.unwrap();
    assert!(plan_error(&a, &Position::new(2.0, 2.0, 1.0)) < 1e-2);
}

#[test]
fn ground_floor_beacon_in_two_level_house() {
    let (ground, upper) = two_level_house();
    let target = Position::new(3.0, 4.0, 1.0);
    let mut generator = ReadingGenerator::new();
    let mut readings = generator.hear("tag", target, &ground, 10, 0.0);
    readings.extend(generator.constant("tag", "gw-bedroom", -88.0, 10));
    let site = deployment(vec![ground, upper]);
    let config = EngineConfig::default();

    let report = Localizer::new(&site, &config).locate_all(&readings).remove(0);
    assert_eq!(report.estimate.floor, Some(0));
    assert_eq!(report.floor_rule, Some(FloorRule::RssiMargin));

    // Ceiling-mounted gateways leave the height mirrored around z = 2;
    // only the plan position is determined.
    let found = report.estimate.position.unwrap();
    assert!(plan_error(&found, &target) < 1e-2, "found {found:?}");
    assert_eq!(report.estimate.zone_name.as_deref(), Some("kitchen"));
    assert!(report.ranges.iter().any(|r| r.gateway_id == "gw-bedroom" && !r.on_selected_floor));
}

#[test]
fn close_lone_gateway_claims_its_floor() {
    let (ground, upper) = two_level_house();
    let mut generator = ReadingGenerator::new();
    let mut readings: Vec<Reading> = Vec::new();
    readings.extend(generator.constant("tag", "gw-kitchen", -60.0, 8));
    readings.extend(generator.constant("tag", "gw-living", -62.0, 8));
    readings.extend(generator.constant("tag", "gw-hall", -64.0, 8));
    readings.extend(generator.constant("tag", "gw-bedroom", -48.0, 8));
    let site = deployment(vec![ground, upper]);
    let config = EngineConfig::default();

    let report = Localizer::new(&site, &config).locate_all(&readings).remove(0);
    assert_eq!(report.estimate.floor, Some(1));
    assert_eq!(report.floor_rule, Some(FloorRule::SingleGateway));
    // One gateway upstairs cannot place the beacon, but the floor is known
    assert!(!report.is_located());
    assert_eq!(
        report.failure,
        Some(LocalizationError::InsufficientGateways { required: 2, available: 1 })
    );
}

#[test]
fn gateway_offsets_shift_ranges() {
    let room = single_room();
    let target = Position::new(5.0, 3.0, 1.0);
    let readings = ReadingGenerator::new().hear("beacon-1", target, &room, 10, 0.0);
    let offsets = [("gw-1".to_string(), -3.0)].into_iter().collect();
    let site = deployment(vec![room]).with_corrections(offsets);
    let config = EngineConfig::default();

    let report = Localizer::new(&site, &config).locate_all(&readings).remove(0);
    let shifted = report.ranges.iter().find(|r| r.gateway_id == "gw-1").unwrap();
    let truth = site.gateway("gw-1").unwrap().position.distance_to(&target);
    assert!(shifted.distance > truth + 0.5);
}
