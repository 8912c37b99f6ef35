//! Shared fixtures for the integration tests
//!
//! - Reading generators that invert the path-loss model, so a beacon at a
//!   known position produces the RSSI the engine expects
//! - A deterministic noise source
//! - Ready-made sites: a one-room floor and a two-level house

#![allow(dead_code)]

use beaconloc_core::{
    distance::distance_to_rssi, Deployment, Extent, Floor, Gateway, Position, Reading, Zone,
};

pub const REFERENCE_POWER: f64 = -59.0;

/// Generates readings for beacons at known positions
pub struct ReadingGenerator {
    seed: u32,
    clock: u64,
    interval_ms: u64,
}

impl ReadingGenerator {
    pub fn new() -> Self {
        Self { seed: 42, clock: 1_700_000_000_000, interval_ms: 1000 }
    }

    /// `samples` rounds of readings from every gateway of `floor`
    ///
    /// `noise_db` is the half-width of the uniform noise added to each
    /// median; 0 gives exact values.
    pub fn hear(
        &mut self,
        beacon: &str,
        target: Position,
        floor: &Floor,
        samples: usize,
        noise_db: f64,
    ) -> Vec<Reading> {
        let mut out = Vec::with_capacity(samples * floor.gateways.len());
        for _ in 0..samples {
            for gateway in &floor.gateways {
                let exact = expected_rssi(gateway, &target);
                let rssi = exact + self.noise(noise_db);
                out.push(
                    Reading::new(beacon, gateway.id.as_str(), rssi.round() as i32, self.clock)
                        .with_smoothed(rssi),
                );
            }
            self.clock += self.interval_ms;
        }
        out
    }

    /// Constant level from one gateway
    pub fn constant(&mut self, beacon: &str, gateway: &str, rssi: f64, samples: usize) -> Vec<Reading> {
        (0..samples)
            .map(|_| {
                self.clock += self.interval_ms;
                Reading::new(beacon, gateway, rssi.round() as i32, self.clock).with_smoothed(rssi)
            })
            .collect()
    }

    fn noise(&mut self, half_width: f64) -> f64 {
        self.seed = self.seed.wrapping_mul(1664525).wrapping_add(1013904223);
        let uniform = self.seed as f64 / u32::MAX as f64;
        (uniform - 0.5) * 2.0 * half_width
    }
}

/// RSSI the path-loss model maps back to the true range
pub fn expected_rssi(gateway: &Gateway, target: &Position) -> f64 {
    distance_to_rssi(gateway.position.distance_to(target), REFERENCE_POWER)
        .expect("range outside the model's domain")
}

/// 10 x 10 room, three floor-level gateways, one zone covering it all
pub fn single_room() -> Floor {
    Floor::new("room", Extent::new(0.0, 10.0, 0.0, 10.0))
        .with_gateway(Gateway::new("gw-1", Position::new(0.0, 0.0, 0.0)))
        .with_gateway(Gateway::new("gw-2", Position::new(10.0, 0.0, 0.0)))
        .with_gateway(Gateway::new("gw-3", Position::new(5.0, 10.0, 0.0)))
        .with_zone(Zone::new("room", 0.0, 0.0, 10.0, 10.0))
}

/// Ground floor with three gateways, upper floor with one
pub fn two_level_house() -> (Floor, Floor) {
    let ground = Floor::new("ground", Extent::new(0.0, 12.0, 0.0, 8.0))
        .with_gateway(Gateway::new("gw-kitchen", Position::new(1.0, 1.0, 2.0)))
        .with_gateway(Gateway::new("gw-living", Position::new(11.0, 1.0, 2.0)))
        .with_gateway(Gateway::new("gw-hall", Position::new(6.0, 7.0, 2.0)))
        .with_zone(Zone::new("kitchen", 0.0, 0.0, 6.0, 8.0))
        .with_zone(Zone::new("living", 6.0, 0.0, 12.0, 8.0));
    let upper = Floor::new("upper", Extent::new(0.0, 12.0, 0.0, 8.0))
        .with_gateway(Gateway::new("gw-bedroom", Position::new(6.0, 4.0, 2.0)))
        .with_zone(Zone::new("bedroom", 0.0, 0.0, 12.0, 8.0));
    (ground, upper)
}

pub fn deployment(floors: Vec<Floor>) -> Deployment {
    Deployment::new("test-site", floors).expect("valid test deployment")
}
