//! Shared fixtures: a preset catalogue on disk and synthetic readings

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use beaconloc_core::{distance::distance_to_rssi, Position};
use beaconloc_runtime::{ReadingTime, StoredReading};

pub const CATALOG: &str = r#"{
    "presets": {
        "room": {
            "name": "Test room",
            "image_file": "room.png",
            "extent": [0, 10, 0, 10],
            "gateway_positions": {
                "gw-1": [0, 0, 0],
                "gw-2": [10, 0, 0],
                "gw-3": [5, 10, 0]
            },
            "zones": [["room", 0, 0, 10, 10]],
            "correction_rssi": {}
        },
        "house": {
            "name": "Two levels",
            "multi_floor": true,
            "floors": [
                { "name": "Ground", "image_file": "ground.png", "extent": [0, 10, 0, 10],
                  "gateway_positions": { "gw-1": [0, 0, 0], "gw-2": [10, 0, 0], "gw-3": [5, 10, 0] },
                  "zones": [["hall", 0, 0, 10, 10]] },
                { "name": "Upper", "image_file": "upper.png", "extent": [0, 10, 0, 10],
                  "gateway_positions": { "gw-up": [5, 5, 0] },
                  "zones": [] }
            ],
            "correction_rssi": {}
        }
    }
}"#;

pub const ROOM_GATEWAYS: [(&str, Position); 3] = [
    ("gw-1", Position::new(0.0, 0.0, 0.0)),
    ("gw-2", Position::new(10.0, 0.0, 0.0)),
    ("gw-3", Position::new(5.0, 10.0, 0.0)),
];

/// Write the catalogue into `dir`, returning its path
pub fn write_catalog(dir: &Path, text: &str) -> PathBuf {
    let path = dir.join("presets.json");
    std::fs::write(&path, text).expect("write catalogue");
    path
}

/// Exact readings of a beacon at `target`, `samples` rounds from every gateway
pub fn readings_at(beacon: &str, target: Position, samples: usize) -> Vec<StoredReading> {
    let mut out = Vec::new();
    for t in 0..samples as u64 {
        for (gateway, position) in ROOM_GATEWAYS {
            let rssi = distance_to_rssi(position.distance_to(&target), -59.0)
                .expect("range outside the model's domain");
            out.push(StoredReading {
                time: ReadingTime::Millis(1_714_564_800_000 + t * 1000),
                beacon: beacon.to_string(),
                rssi: rssi.round() as i32,
                median: Some(rssi),
                source: gateway.to_string(),
            });
        }
    }
    out
}
