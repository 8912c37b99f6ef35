//! Per-beacon localization
//!
//! [`Localizer`] runs the whole pipeline for every beacon in a reading
//! window and returns one [`BeaconReport`] per beacon. Nothing is carried
//! between calls: a report is a pure function of the window, the
//! [`Deployment`] and the [`EngineConfig`].
//!
//! ## Single-floor deployments
//!
//! ```text
//! series per gateway ─→ SignalFilter (≥5 samples) ─→ ranges
//!     ─→ solve (≥3) or solve_reduced (2) ─→ attenuation + proximity
//!     ─→ zone validation
//! ```
//!
//! ## Multi-floor deployments
//!
//! Every floor's gateways are filtered (≥3 samples). The floor is chosen by
//! the [`FloorSelector`] from the raw series, or forced by configuration,
//! and must have at least one filtered gateway. The solve and zone
//! validation then run on that floor only. Attenuation regions are not
//! floor scoped and are skipped here.
//!
//! ## Failures
//!
//! A beacon that cannot be placed still gets a report, carrying the
//! recovered [`LocalizationError`] and whatever floor had been selected.
//! Corrected RSSI values are only reported alongside a position.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::{
    constants::signal::{MIN_FULL_SOLVE_GATEWAYS, MULTI_FLOOR_MIN_SAMPLES, SINGLE_FLOOR_MIN_SAMPLES},
    correction::{apply_path_attenuation, apply_proximity_bonus, validate_zone, ProximityBonus},
    deployment::{Deployment, Floor, FloorId, Gateway},
    distance::{PathLossModel, UNKNOWN_DISTANCE},
    errors::{LocalizationError, LocalizationResult},
    filter::SignalFilter,
    floor::{FloorData, FloorRule, FloorSelector},
    geometry::{Point2, Position},
    optimize::MinimizerConfig,
    reading::{gateway_series, group_by_beacon, Reading},
    trilateration::TrilaterationSolver,
};

/// Engine tunables
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Samples a gateway needs in single-floor deployments
    pub single_floor_min_samples: usize,
    /// Samples a gateway needs in multi-floor deployments
    pub multi_floor_min_samples: usize,
    /// Solve approximately from two gateways
    pub allow_reduced_mode: bool,
    /// Report attenuation-compensated RSSI (single floor only)
    pub apply_attenuation: bool,
    /// Report proximity-boosted RSSI
    pub apply_proximity: bool,
    /// Use the only scoreable floor instead of failing the beacon
    pub single_floor_fallback: bool,
    /// Skip floor selection and use this floor when it has signals
    pub forced_floor: Option<FloorId>,
    /// RSSI to range conversion
    pub path_loss: PathLossModel,
    /// Smoothing pipeline (its sample floor is replaced per mode)
    pub filter: SignalFilter,
    /// Multi-floor disambiguator
    pub floor_selector: FloorSelector,
    /// Close-range bonus shape
    pub proximity: ProximityBonus,
    /// Solver limits
    pub minimizer: MinimizerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            single_floor_min_samples: SINGLE_FLOOR_MIN_SAMPLES,
            multi_floor_min_samples: MULTI_FLOOR_MIN_SAMPLES,
            allow_reduced_mode: true,
            apply_attenuation: true,
            apply_proximity: true,
            single_floor_fallback: false,
            forced_floor: None,
            path_loss: PathLossModel::default(),
            filter: SignalFilter::default(),
            floor_selector: FloorSelector::default(),
            proximity: ProximityBonus::default(),
            minimizer: MinimizerConfig::default(),
        }
    }
}

/// Where a beacon is this tick
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PositionEstimate {
    /// Beacon id
    pub beacon_id: String,
    /// Selected floor, if any
    pub floor: Option<FloorId>,
    /// Zone-validated position, if the solve succeeded
    pub position: Option<Position>,
    /// The solver output already lay inside a zone
    pub in_zone: bool,
    /// Containing zone, or the zone the position was clamped into
    pub zone_name: Option<String>,
}

/// Range estimate for one gateway
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct GatewayRange {
    /// Gateway id
    pub gateway_id: String,
    /// Floor the gateway is mounted on
    pub floor: FloorId,
    /// Smoothed RSSI (dBm)
    pub filtered_rssi: f64,
    /// Estimated range (m)
    pub distance: f64,
    /// Gateway is on the floor the beacon was placed on
    pub on_selected_floor: bool,
}

/// Everything computed for one beacon in one tick
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BeaconReport {
    /// Final estimate
    pub estimate: PositionEstimate,
    /// Solver output before zone clamping
    pub raw_position: Option<Position>,
    /// Rule that picked the floor (multi-floor, not forced)
    pub floor_rule: Option<FloorRule>,
    /// Ranges of every gateway with a filtered signal
    pub ranges: Vec<GatewayRange>,
    /// Per-gateway RSSI after attenuation and proximity corrections
    pub corrected_rssi: BTreeMap<String, f64>,
    /// Why there is no position
    pub failure: Option<LocalizationError>,
}

impl BeaconReport {
    fn unplaced(
        beacon_id: &str,
        floor: Option<FloorId>,
        floor_rule: Option<FloorRule>,
        ranges: Vec<GatewayRange>,
        failure: LocalizationError,
    ) -> Self {
        Self {
            estimate: PositionEstimate {
                beacon_id: beacon_id.to_string(),
                floor,
                position: None,
                in_zone: false,
                zone_name: None,
            },
            raw_position: None,
            floor_rule,
            ranges,
            corrected_rssi: BTreeMap::new(),
            failure: Some(failure),
        }
    }

    /// A position was produced
    pub fn is_located(&self) -> bool {
        self.estimate.position.is_some()
    }
}

/// Gateway with a usable signal this tick
#[derive(Debug, Clone, Copy)]
struct Anchor<'d> {
    gateway: &'d Gateway,
    floor: FloorId,
    rssi: f64,
    distance: f64,
}

/// Localization engine bound to one deployment
#[derive(Debug, Clone)]
pub struct Localizer<'a> {
    deployment: &'a Deployment,
    config: &'a EngineConfig,
    filter: SignalFilter,
}

impl<'a> Localizer<'a> {
    /// Engine for `deployment`
    pub fn new(deployment: &'a Deployment, config: &'a EngineConfig) -> Self {
        let min_samples = if deployment.is_multi_floor() {
            config.multi_floor_min_samples
        } else {
            config.single_floor_min_samples
        };
        Self {
            deployment,
            config,
            filter: config.filter.clone().with_min_samples(min_samples),
        }
    }

    /// Deployment this engine works on
    pub fn deployment(&self) -> &'a Deployment {
        self.deployment
    }

    /// Locate every admitted beacon in the window, ordered by beacon id
    pub fn locate_all(&self, readings: &[Reading]) -> Vec<BeaconReport> {
        group_by_beacon(readings, self.deployment)
            .into_iter()
            .map(|(beacon_id, readings)| self.locate_beacon(beacon_id, &readings))
            .collect()
    }

    /// Locate one beacon from its readings (in arrival order)
    pub fn locate_beacon(&self, beacon_id: &str, readings: &[&Reading]) -> BeaconReport {
        let series = gateway_series(readings, self.deployment);
        if self.deployment.is_multi_floor() {
            self.locate_multi_floor(beacon_id, series)
        } else {
            self.locate_single_floor(beacon_id, &series)
        }
    }

    fn locate_single_floor(
        &self,
        beacon_id: &str,
        series: &BTreeMap<&str, Vec<f64>>,
    ) -> BeaconReport {
        let floor_id: FloorId = 0;
        let floor = &self.deployment.floors()[floor_id];
        let anchors = self.anchors(floor_id, floor, series);
        let ranges = self.ranges(&anchors, Some(floor_id));

        match self.solve(floor, &anchors) {
            Ok(raw) => self.place(
                beacon_id,
                floor_id,
                floor,
                &anchors,
                raw,
                None,
                ranges,
                self.config.apply_attenuation,
            ),
            Err(err) => {
                log_warn!("{}: no position ({})", beacon_id, err);
                BeaconReport::unplaced(beacon_id, Some(floor_id), None, ranges, err)
            }
        }
    }

    fn locate_multi_floor(&self, beacon_id: &str, series: BTreeMap<&str, Vec<f64>>) -> BeaconReport {
        let mut floor_data: FloorData<'_> = BTreeMap::new();
        for (gateway, values) in series {
            if let Some(floor) = self.deployment.floor_of_gateway(gateway) {
                floor_data.entry(floor).or_default().insert(gateway, values);
            }
        }

        let mut anchors_by_floor: BTreeMap<FloorId, Vec<Anchor<'a>>> = BTreeMap::new();
        for (floor_id, floor) in self.deployment.floors().iter().enumerate() {
            if let Some(floor_series) = floor_data.get(&floor_id) {
                let anchors = self.anchors(floor_id, floor, floor_series);
                if !anchors.is_empty() {
                    anchors_by_floor.insert(floor_id, anchors);
                }
            }
        }
        let all_anchors: Vec<Anchor<'a>> = anchors_by_floor.values().flatten().copied().collect();

        let selection = match self.config.forced_floor {
            Some(forced) if anchors_by_floor.contains_key(&forced) => Ok((forced, None)),
            _ => self.select_floor(&floor_data, &anchors_by_floor),
        };

        let (floor_id, rule) = match selection {
            Ok(selected) => selected,
            Err(err) => {
                log_warn!("{}: no floor selected ({})", beacon_id, err);
                let ranges = self.ranges(&all_anchors, None);
                return BeaconReport::unplaced(beacon_id, None, None, ranges, err);
            }
        };

        let ranges = self.ranges(&all_anchors, Some(floor_id));
        let floor = &self.deployment.floors()[floor_id];
        let anchors = anchors_by_floor.get(&floor_id).map(Vec::as_slice).unwrap_or(&[]);

        match self.solve(floor, anchors) {
            Ok(raw) => self.place(beacon_id, floor_id, floor, anchors, raw, rule, ranges, false),
            Err(err) => {
                log_warn!("{}: no position on floor {} ({})", beacon_id, floor_id, err);
                BeaconReport::unplaced(beacon_id, Some(floor_id), rule, ranges, err)
            }
        }
    }

    /// Floor from the selector, restricted to floors with filtered signals
    fn select_floor(
        &self,
        floor_data: &FloorData<'_>,
        anchors_by_floor: &BTreeMap<FloorId, Vec<Anchor<'a>>>,
    ) -> LocalizationResult<(FloorId, Option<FloorRule>)> {
        match self
            .config
            .floor_selector
            .select_floor_with_layout(floor_data, self.deployment)
        {
            Ok(decision) if anchors_by_floor.contains_key(&decision.floor) => {
                log_info!("floor {} selected by {:?}", decision.floor, decision.rule);
                Ok((decision.floor, Some(decision.rule)))
            }
            Ok(_) => Err(LocalizationError::FloorUndetectable {
                scored: anchors_by_floor.len(),
            }),
            Err(err) => {
                if self.config.single_floor_fallback && anchors_by_floor.len() == 1 {
                    if let Some(floor) = anchors_by_floor.keys().next() {
                        return Ok((*floor, None));
                    }
                }
                Err(err)
            }
        }
    }

    /// Filtered gateways of a floor with a usable range, in declaration order
    fn anchors(
        &self,
        floor_id: FloorId,
        floor: &'a Floor,
        series: &BTreeMap<&str, Vec<f64>>,
    ) -> Vec<Anchor<'a>> {
        floor
            .gateways
            .iter()
            .filter_map(|gateway| {
                let values = series.get(gateway.id.as_str())?;
                let rssi = self.filter.smooth(values)?;
                let distance = self.config.path_loss.distance(rssi);
                if distance == UNKNOWN_DISTANCE {
                    log_warn!("{}: lost signal, no range", gateway.id);
                    return None;
                }
                log_debug!("{}: {:.2} dBm, {:.2} m", gateway.id, rssi, distance);
                Some(Anchor { gateway, floor: floor_id, rssi, distance })
            })
            .collect()
    }

    fn ranges(&self, anchors: &[Anchor<'_>], selected: Option<FloorId>) -> Vec<GatewayRange> {
        anchors
            .iter()
            .map(|a| GatewayRange {
                gateway_id: a.gateway.id.clone(),
                floor: a.floor,
                filtered_rssi: a.rssi,
                distance: a.distance,
                on_selected_floor: selected == Some(a.floor),
            })
            .collect()
    }

    fn solve(&self, floor: &Floor, anchors: &[Anchor<'_>]) -> LocalizationResult<Position> {
        let distances: Vec<f64> = anchors.iter().map(|a| a.distance).collect();
        let positions: Vec<Position> = anchors.iter().map(|a| a.gateway.position).collect();
        debug_assert_eq!(distances.len(), positions.len());

        let solver = TrilaterationSolver::for_extent(&floor.extent).with_minimizer(self.config.minimizer);
        if anchors.len() < MIN_FULL_SOLVE_GATEWAYS && self.config.allow_reduced_mode {
            log_info!("reduced solve with {} gateways", anchors.len());
            solver.solve_reduced(&distances, &positions)
        } else {
            solver.solve(&distances, &positions)
        }
    }

    /// Corrections and zone validation around a successful solve
    #[allow(clippy::too_many_arguments)]
    fn place(
        &self,
        beacon_id: &str,
        floor_id: FloorId,
        floor: &Floor,
        anchors: &[Anchor<'_>],
        raw: Position,
        rule: Option<FloorRule>,
        ranges: Vec<GatewayRange>,
        attenuation: bool,
    ) -> BeaconReport {
        let mut corrected: BTreeMap<&str, f64> = if attenuation {
            let signals: BTreeMap<&str, (f64, Point2)> = anchors
                .iter()
                .map(|a| (a.gateway.id.as_str(), (a.rssi, a.gateway.position.plan())))
                .collect();
            apply_path_attenuation(raw.plan(), &signals, self.deployment.attenuation_regions())
        } else {
            anchors.iter().map(|a| (a.gateway.id.as_str(), a.rssi)).collect()
        };

        if self.config.apply_proximity {
            let distances: BTreeMap<&str, f64> =
                anchors.iter().map(|a| (a.gateway.id.as_str(), a.distance)).collect();
            apply_proximity_bonus(&mut corrected, &distances, &self.config.proximity);
        }

        let check = validate_zone(raw.plan(), &floor.zones);
        let position = raw.with_plan(check.point);
        if check.was_clamped() {
            log_warn!(
                "{}: ({:.2}, {:.2}) outside all zones, clamped to ({:.2}, {:.2})",
                beacon_id,
                raw.x,
                raw.y,
                position.x,
                position.y
            );
        } else {
            log_info!("{}: ({:.2}, {:.2}) on floor {}", beacon_id, position.x, position.y, floor_id);
        }

        BeaconReport {
            estimate: PositionEstimate {
                beacon_id: beacon_id.to_string(),
                floor: Some(floor_id),
                position: Some(position),
                in_zone: check.in_zone,
                zone_name: check.zone.map(|z| z.name.clone()),
            },
            raw_position: Some(raw),
            floor_rule: rule,
            ranges,
            corrected_rssi: corrected
                .into_iter()
                .map(|(gateway, rssi)| (gateway.to_string(), rssi))
                .collect(),
            failure: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        deployment::{AttenuationRegion, Zone},
        distance::distance_to_rssi,
        geometry::{Extent, Polygon, Rect},
    };
    use alloc::vec;

    const REFERENCE: f64 = -59.0;

    fn triangle_floor() -> Floor {
        Floor::new("ground", Extent::new(0.0, 10.0, 0.0, 10.0))
            .with_gateway(Gateway::new("gw-a", Position::new(0.0, 0.0, 0.0)))
            .with_gateway(Gateway::new("gw-b", Position::new(10.0, 0.0, 0.0)))
            .with_gateway(Gateway::new("gw-c", Position::new(5.0, 10.0, 0.0)))
    }

    fn upstairs() -> Floor {
        Floor::new("upstairs", Extent::new(0.0, 10.0, 0.0, 10.0))
            .with_gateway(Gateway::new("gw-up", Position::new(5.0, 5.0, 0.0)))
            .with_zone(Zone::new("landing", 0.0, 0.0, 10.0, 10.0))
    }

    /// Noise-free readings of a beacon at `target`, `samples` per gateway
    fn heard_at(beacon: &str, target: Position, floor: &Floor, samples: usize) -> Vec<Reading> {
        let mut out = Vec::new();
        for t in 0..samples {
            for g in &floor.gateways {
                let rssi = distance_to_rssi(g.position.distance_to(&target), REFERENCE).unwrap();
                out.push(Reading::new(beacon, g.id.as_str(), rssi as i32, t as u64).with_smoothed(rssi));
            }
        }
        out
    }

    fn constant(beacon: &str, gateway: &str, rssi: f64, samples: usize) -> Vec<Reading> {
        (0..samples)
            .map(|t| Reading::new(beacon, gateway, rssi as i32, t as u64).with_smoothed(rssi))
            .collect()
    }

    fn locate(deployment: &Deployment, config: &EngineConfig, readings: &[Reading]) -> BeaconReport {
        let mut reports = Localizer::new(deployment, config).locate_all(readings);
        assert_eq!(reports.len(), 1);
        reports.remove(0)
    }

    #[test]
    fn single_floor_places_beacon_in_zone() {
        let floor = triangle_floor().with_zone(Zone::new("hall", 0.0, 0.0, 10.0, 10.0));
        let target = Position::new(5.0, 3.0, 1.0);
        let readings = heard_at("b1", target, &floor, 10);
        let deployment = Deployment::new("site", vec![floor]).unwrap();

        let report = locate(&deployment, &EngineConfig::default(), &readings);
        let position = report.estimate.position.unwrap();
        assert!(position.distance_to(&target) < 1e-2, "got {position:?}");
        assert!(report.estimate.in_zone);
        assert_eq!(report.estimate.zone_name.as_deref(), Some("hall"));
        assert_eq!(report.estimate.floor, Some(0));
        assert_eq!(report.ranges.len(), 3);
        assert!(report.ranges.iter().all(|r| r.on_selected_floor));
        assert!(report.failure.is_none());
    }

    #[test]
    fn position_outside_zones_is_clamped() {
        let floor = triangle_floor().with_zone(Zone::new("desk", 0.0, 0.0, 4.0, 2.0));
        let target = Position::new(5.0, 3.0, 1.0);
        let readings = heard_at("b1", target, &floor, 10);
        let deployment = Deployment::new("site", vec![floor]).unwrap();

        let report = locate(&deployment, &EngineConfig::default(), &readings);
        let position = report.estimate.position.unwrap();
        assert!((position.x - 4.0).abs() < 1e-9 && (position.y - 2.0).abs() < 1e-9);
        assert!(!report.estimate.in_zone);
        assert_eq!(report.estimate.zone_name.as_deref(), Some("desk"));
        assert!(report.raw_position.unwrap().distance_to(&target) < 1e-2);
    }

    #[test]
    fn sparse_gateways_are_left_out() {
        let floor = triangle_floor();
        let readings = heard_at("b1", Position::new(5.0, 3.0, 1.0), &floor, 4);
        let deployment = Deployment::new("site", vec![floor]).unwrap();

        let report = locate(&deployment, &EngineConfig::default(), &readings);
        assert!(!report.is_located());
        assert!(report.ranges.is_empty());
        assert_eq!(report.estimate.floor, Some(0));
        assert_eq!(
            report.failure,
            Some(LocalizationError::InsufficientGateways { required: 2, available: 0 })
        );
    }

    #[test]
    fn two_gateways_need_reduced_mode() {
        let floor = triangle_floor();
        let target = Position::new(5.0, 3.0, 1.0);
        let readings: Vec<Reading> = heard_at("b1", target, &floor, 10)
            .into_iter()
            .filter(|r| r.gateway_id != "gw-c")
            .collect();
        let deployment = Deployment::new("site", vec![floor]).unwrap();

        let report = locate(&deployment, &EngineConfig::default(), &readings);
        assert!(report.is_located());

        let strict = EngineConfig { allow_reduced_mode: false, ..EngineConfig::default() };
        let report = locate(&deployment, &strict, &readings);
        assert_eq!(
            report.failure,
            Some(LocalizationError::InsufficientGateways { required: 3, available: 2 })
        );
    }

    #[test]
    fn attenuation_only_touches_blocked_gateways() {
        let floor = triangle_floor();
        let target = Position::new(5.0, 3.0, 1.0);
        let readings = heard_at("b1", target, &floor, 10);
        let wall = AttenuationRegion {
            polygon: Polygon::from_rect(Rect::new(0.0, 6.0, 10.0, 7.0)),
            attenuation_db: 6.0,
        };
        let deployment = Deployment::new("site", vec![floor])
            .unwrap()
            .with_attenuation_regions(vec![wall]);

        let report = locate(&deployment, &EngineConfig::default(), &readings);
        for range in &report.ranges {
            let corrected = report.corrected_rssi[&range.gateway_id];
            let expected = if range.gateway_id == "gw-c" { 6.0 } else { 0.0 };
            assert!((corrected - range.filtered_rssi - expected).abs() < 1e-9);
        }

        let plain = EngineConfig { apply_attenuation: false, ..EngineConfig::default() };
        let report = locate(&deployment, &plain, &readings);
        for range in &report.ranges {
            assert_eq!(report.corrected_rssi[&range.gateway_id], range.filtered_rssi);
        }
    }

    #[test]
    fn lost_signal_is_not_a_range() {
        let floor = triangle_floor();
        let target = Position::new(5.0, 3.0, 1.0);
        let mut readings: Vec<Reading> = heard_at("b1", target, &floor, 10)
            .into_iter()
            .filter(|r| r.gateway_id != "gw-c")
            .collect();
        readings.extend(constant("b1", "gw-c", 0.0, 10));
        let deployment = Deployment::new("site", vec![floor]).unwrap();

        let report = locate(&deployment, &EngineConfig::default(), &readings);
        assert!(report.is_located());
        assert_eq!(report.ranges.len(), 2);
        assert!(report.ranges.iter().all(|r| r.gateway_id != "gw-c" && r.distance > 0.0));

        let strict = EngineConfig { allow_reduced_mode: false, ..EngineConfig::default() };
        let report = locate(&deployment, &strict, &readings);
        assert_eq!(
            report.failure,
            Some(LocalizationError::InsufficientGateways { required: 3, available: 2 })
        );
    }

    #[test]
    fn attenuation_skipped_on_multi_floor_sites() {
        let ground = triangle_floor().with_zone(Zone::new("hall", 0.0, 0.0, 10.0, 10.0));
        let target = Position::new(5.0, 3.0, 1.0);
        let mut readings = heard_at("b1", target, &ground, 10);
        readings.extend(constant("b1", "gw-up", -95.0, 10));
        let wall = AttenuationRegion {
            polygon: Polygon::from_rect(Rect::new(0.0, 6.0, 10.0, 7.0)),
            attenuation_db: 6.0,
        };
        let deployment = Deployment::new("site", vec![ground, upstairs()])
            .unwrap()
            .with_attenuation_regions(vec![wall]);

        let config = EngineConfig { apply_proximity: false, ..EngineConfig::default() };
        assert!(config.apply_attenuation);
        let report = locate(&deployment, &config, &readings);
        assert_eq!(report.estimate.floor, Some(0));
        assert!(report.is_located());

        let selected: Vec<&GatewayRange> =
            report.ranges.iter().filter(|r| r.on_selected_floor).collect();
        assert_eq!(selected.len(), 3);
        for range in selected {
            assert_eq!(report.corrected_rssi[&range.gateway_id], range.filtered_rssi);
        }
    }

    #[test]
    fn strongest_floor_is_selected() {
        let ground = triangle_floor().with_zone(Zone::new("hall", 0.0, 0.0, 10.0, 10.0));
        let target = Position::new(5.0, 3.0, 1.0);
        let mut readings = heard_at("b1", target, &ground, 10);
        readings.extend(constant("b1", "gw-up", -95.0, 10));
        let deployment = Deployment::new("site", vec![ground, upstairs()]).unwrap();

        let report = locate(&deployment, &EngineConfig::default(), &readings);
        assert_eq!(report.estimate.floor, Some(0));
        assert_eq!(report.floor_rule, Some(FloorRule::RssiMargin));
        assert!(report.estimate.position.unwrap().distance_to(&target) < 1e-2);

        let up = report.ranges.iter().find(|r| r.gateway_id == "gw-up").unwrap();
        assert_eq!(up.floor, 1);
        assert!(!up.on_selected_floor);
        assert!(!report.corrected_rssi.contains_key("gw-up"));
    }

    #[test]
    fn one_heard_floor_is_undetectable_without_fallback() {
        let ground = triangle_floor();
        let target = Position::new(5.0, 3.0, 1.0);
        let readings = heard_at("b1", target, &ground, 10);
        let deployment = Deployment::new("site", vec![ground, upstairs()]).unwrap();

        let report = locate(&deployment, &EngineConfig::default(), &readings);
        assert_eq!(report.estimate.floor, None);
        assert_eq!(report.failure, Some(LocalizationError::FloorUndetectable { scored: 1 }));
        assert_eq!(report.ranges.len(), 3);

        let fallback = EngineConfig { single_floor_fallback: true, ..EngineConfig::default() };
        let report = locate(&deployment, &fallback, &readings);
        assert_eq!(report.estimate.floor, Some(0));
        assert_eq!(report.floor_rule, None);
        assert!(report.estimate.position.unwrap().distance_to(&target) < 1e-2);
    }

    #[test]
    fn forced_floor_keeps_floor_without_position() {
        let ground = triangle_floor();
        let mut readings = heard_at("b1", Position::new(5.0, 3.0, 1.0), &ground, 10);
        readings.extend(constant("b1", "gw-up", -70.0, 10));
        let deployment = Deployment::new("site", vec![ground, upstairs()]).unwrap();

        let forced = EngineConfig { forced_floor: Some(1), ..EngineConfig::default() };
        let report = locate(&deployment, &forced, &readings);
        assert_eq!(report.estimate.floor, Some(1));
        assert_eq!(report.floor_rule, None);
        assert!(!report.is_located());
        assert_eq!(
            report.failure,
            Some(LocalizationError::InsufficientGateways { required: 2, available: 1 })
        );
    }

    #[test]
    fn allow_list_and_ordering() {
        let floor = triangle_floor();
        let mut readings = heard_at("zeta", Position::new(5.0, 3.0, 1.0), &floor, 10);
        readings.extend(heard_at("alpha", Position::new(2.0, 2.0, 1.0), &floor, 10));
        readings.extend(heard_at("stray", Position::new(8.0, 8.0, 1.0), &floor, 10));
        let deployment = Deployment::new("site", vec![floor])
            .unwrap()
            .with_beacon_filter(Some(vec!["zeta".into(), "alpha".into()]));

        let config = EngineConfig::default();
        let reports = Localizer::new(&deployment, &config).locate_all(&readings);
        let ids: Vec<&str> = reports.iter().map(|r| r.estimate.beacon_id.as_str()).collect();
        assert_eq!(ids, ["alpha", "zeta"]);
    }

    #[test]
    fn unknown_gateways_ignored() {
        let floor = triangle_floor();
        let mut readings = heard_at("b1", Position::new(5.0, 3.0, 1.0), &floor, 10);
        readings.extend(constant("b1", "gw-elsewhere", -40.0, 10));
        let deployment = Deployment::new("site", vec![floor]).unwrap();

        let report = locate(&deployment, &EngineConfig::default(), &readings);
        assert!(report.ranges.iter().all(|r| r.gateway_id != "gw-elsewhere"));
        assert!(report.is_located());
    }
}
