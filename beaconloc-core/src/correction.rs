//! Post-estimate corrections
//!
//! Three independent adjustments applied once a position is known:
//!
//! - **Path attenuation**: each gateway's signal is compensated by the
//!   `attenuation_db` of every region the straight beacon-gateway path
//!   touches.
//! - **Proximity bonus**: gateways closer than a threshold get a bonus that
//!   falls linearly from `max_bonus_db` at 0 m to nothing at the threshold.
//! - **Zone validation**: a point inside a zone is accepted as is; a point
//!   outside every zone is moved to the nearest point of the nearest zone.
//!
//! The first two only change the corrected RSSI reported with an estimate.
//! They are computed from the estimate itself and never fed back into the
//! solver.

use alloc::collections::BTreeMap;

use crate::{
    constants::correction::{PROXIMITY_MAX_BONUS_DB, PROXIMITY_THRESHOLD_M},
    deployment::{AttenuationRegion, Zone},
    geometry::Point2,
};

/// Total attenuation (dB) of the regions touched by segment `[from, to]`
pub fn path_attenuation(regions: &[AttenuationRegion], from: Point2, to: Point2) -> f64 {
    regions
        .iter()
        .filter(|region| region.polygon.intersects_segment(from, to))
        .map(|region| region.attenuation_db)
        .sum()
}

/// Add path attenuation to each gateway's signal
///
/// `signals` maps gateway ids to (signal, gateway plan position). Only
/// gateways present in `signals` are adjusted.
pub fn apply_path_attenuation<'a>(
    beacon: Point2,
    signals: &BTreeMap<&'a str, (f64, Point2)>,
    regions: &[AttenuationRegion],
) -> BTreeMap<&'a str, f64> {
    signals
        .iter()
        .map(|(gateway, (signal, position))| {
            (*gateway, signal + path_attenuation(regions, beacon, *position))
        })
        .collect()
}

/// Shape of the close-range bonus
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProximityBonus {
    /// Range below which the bonus applies (m)
    pub threshold: f64,
    /// Bonus at zero range (dB)
    pub max_bonus_db: f64,
}

impl Default for ProximityBonus {
    fn default() -> Self {
        Self {
            threshold: PROXIMITY_THRESHOLD_M,
            max_bonus_db: PROXIMITY_MAX_BONUS_DB,
        }
    }
}

impl ProximityBonus {
    /// Bonus for a gateway at `distance`
    pub fn bonus(&self, distance: f64) -> f64 {
        proximity_bonus(distance, self.threshold, self.max_bonus_db)
    }
}

/// `max_bonus_db · (1 - distance / threshold)` for `0 < distance < threshold`, else 0
pub fn proximity_bonus(distance: f64, threshold: f64, max_bonus_db: f64) -> f64 {
    if distance > 0.0 && distance < threshold {
        max_bonus_db * (1.0 - distance / threshold)
    } else {
        0.0
    }
}

/// Add the proximity bonus to every gateway with a known range
pub fn apply_proximity_bonus(
    signals: &mut BTreeMap<&str, f64>,
    distances: &BTreeMap<&str, f64>,
    shape: &ProximityBonus,
) {
    for (gateway, signal) in signals.iter_mut() {
        if let Some(distance) = distances.get(*gateway) {
            *signal += shape.bonus(*distance);
        }
    }
}

/// Outcome of checking a point against the floor's zones
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneCheck<'a> {
    /// Accepted point, moved into the nearest zone when it was outside
    pub point: Point2,
    /// The original point was inside a zone
    pub in_zone: bool,
    /// Containing zone, or the zone it was moved into
    pub zone: Option<&'a Zone>,
}

impl ZoneCheck<'_> {
    /// Whether the point had to be moved
    pub fn was_clamped(&self) -> bool {
        !self.in_zone && self.zone.is_some()
    }
}

/// Validate `point` against `zones`, clamping it into the nearest one
///
/// The first containing zone in declaration order wins. Outside all zones
/// the point moves to the zone with the smallest clamp distance; on ties the
/// first declared zone wins. Without zones the point is accepted unchanged.
pub fn validate_zone(point: Point2, zones: &[Zone]) -> ZoneCheck<'_> {
    if let Some(zone) = zones.iter().find(|z| z.rect.contains(point)) {
        return ZoneCheck { point, in_zone: true, zone: Some(zone) };
    }

    let mut nearest: Option<(&Zone, f64)> = None;
    for zone in zones {
        let d = zone.rect.distance_to(point);
        if nearest.map_or(true, |(_, best)| d < best) {
            nearest = Some((zone, d));
        }
    }

    match nearest {
        Some((zone, _)) => ZoneCheck {
            point: zone.rect.clamp(point),
            in_zone: false,
            zone: Some(zone),
        },
        None => ZoneCheck { point, in_zone: false, zone: None },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Polygon, Rect};
    use alloc::vec;

    fn wall(x1: f64, y1: f64, x2: f64, y2: f64, db: f64) -> AttenuationRegion {
        AttenuationRegion {
            polygon: Polygon::from_rect(Rect::new(x1, y1, x2, y2)),
            attenuation_db: db,
        }
    }

    #[test]
    fn bonus_shape() {
        assert_eq!(proximity_bonus(0.5, 1.0, 3.0), 1.5);
        assert_eq!(proximity_bonus(1.0, 1.0, 3.0), 0.0);
        assert_eq!(proximity_bonus(2.5, 1.0, 3.0), 0.0);
        assert_eq!(proximity_bonus(0.0, 1.0, 3.0), 0.0);
        assert_eq!(proximity_bonus(-1.0, 1.0, 3.0), 0.0);
        assert!((ProximityBonus::default().bonus(0.25) - 2.25).abs() < 1e-12);
    }

    #[test]
    fn bonus_applies_per_gateway() {
        let mut signals = BTreeMap::new();
        signals.insert("near", -50.0);
        signals.insert("far", -75.0);
        signals.insert("unranged", -70.0);
        let mut distances = BTreeMap::new();
        distances.insert("near", 0.5);
        distances.insert("far", 6.0);

        apply_proximity_bonus(&mut signals, &distances, &ProximityBonus::default());
        assert_eq!(signals["near"], -48.5);
        assert_eq!(signals["far"], -75.0);
        assert_eq!(signals["unranged"], -70.0);
    }

    #[test]
    fn attenuation_sums_crossed_regions() {
        let regions = vec![wall(4.0, 0.0, 5.0, 10.0, 6.0), wall(7.0, 0.0, 8.0, 10.0, 4.0)];
        let beacon = Point2::new(1.0, 5.0);

        let mut signals = BTreeMap::new();
        signals.insert("behind_both", (-70.0, Point2::new(9.0, 5.0)));
        signals.insert("behind_one", (-65.0, Point2::new(6.0, 5.0)));
        signals.insert("clear", (-60.0, Point2::new(1.0, 9.0)));

        let adjusted = apply_path_attenuation(beacon, &signals, &regions);
        assert_eq!(adjusted["behind_both"], -60.0);
        assert_eq!(adjusted["behind_one"], -59.0);
        assert_eq!(adjusted["clear"], -60.0);
    }

    #[test]
    fn touching_boundary_counts() {
        let regions = vec![wall(4.0, 0.0, 5.0, 10.0, 3.0)];
        // Segment ends exactly on the wall face
        let total = path_attenuation(&regions, Point2::new(0.0, 5.0), Point2::new(4.0, 5.0));
        assert_eq!(total, 3.0);
    }

    #[test]
    fn zone_contains_point() {
        let zones = vec![Zone::new("a", 0.0, 0.0, 10.0, 10.0)];
        let check = validate_zone(Point2::new(5.0, 3.0), &zones);
        assert!(check.in_zone);
        assert!(!check.was_clamped());
        assert_eq!(check.point, Point2::new(5.0, 3.0));
        assert_eq!(check.zone.map(|z| z.name.as_str()), Some("a"));
    }

    #[test]
    fn outside_point_clamped_to_nearest() {
        let zones = vec![
            Zone::new("left", 0.0, 0.0, 2.0, 2.0),
            Zone::new("right", 8.0, 0.0, 10.0, 2.0),
        ];
        let check = validate_zone(Point2::new(7.0, 3.0), &zones);
        assert!(!check.in_zone);
        assert!(check.was_clamped());
        assert_eq!(check.point, Point2::new(8.0, 2.0));
        assert_eq!(check.zone.map(|z| z.name.as_str()), Some("right"));
    }

    #[test]
    fn equidistant_zones_prefer_first_declared() {
        let zones = vec![
            Zone::new("first", 0.0, 0.0, 2.0, 2.0),
            Zone::new("second", 8.0, 0.0, 10.0, 2.0),
        ];
        let check = validate_zone(Point2::new(5.0, 1.0), &zones);
        assert_eq!(check.zone.map(|z| z.name.as_str()), Some("first"));
        assert_eq!(check.point, Point2::new(2.0, 1.0));
    }

    #[test]
    fn no_zones_accepts_point() {
        let check = validate_zone(Point2::new(42.0, -3.0), &[]);
        assert_eq!(check, ZoneCheck { point: Point2::new(42.0, -3.0), in_zone: false, zone: None });
    }
}
