//! Stored RSSI readings as the engine consumes them

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use crate::deployment::Deployment;

/// Milliseconds since the Unix epoch
pub type Timestamp = u64;

/// One RSSI report of a beacon by a gateway
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reading {
    /// Beacon that was heard
    pub beacon_id: String,
    /// Gateway that heard it
    pub gateway_id: String,
    /// Raw received power (dBm)
    pub rssi: i32,
    /// Running median computed at ingestion, if any
    pub smoothed_rssi: Option<f64>,
    /// When the gateway reported it
    pub timestamp: Timestamp,
}

impl Reading {
    /// Reading without an ingestion-side median
    pub fn new(
        beacon_id: impl Into<String>,
        gateway_id: impl Into<String>,
        rssi: i32,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            beacon_id: beacon_id.into(),
            gateway_id: gateway_id.into(),
            rssi,
            smoothed_rssi: None,
            timestamp,
        }
    }

    /// Attach the ingestion-side median
    pub fn with_smoothed(mut self, smoothed: f64) -> Self {
        self.smoothed_rssi = Some(smoothed);
        self
    }

    /// Value fed to the filters: the median when present, else the raw RSSI
    pub fn signal(&self) -> f64 {
        self.smoothed_rssi.unwrap_or(self.rssi as f64)
    }
}

/// Partition readings by beacon, keeping arrival order within each beacon
///
/// Beacons rejected by the deployment allow-list are dropped.
pub fn group_by_beacon<'a>(
    readings: &'a [Reading],
    deployment: &Deployment,
) -> BTreeMap<&'a str, Vec<&'a Reading>> {
    let mut groups: BTreeMap<&str, Vec<&Reading>> = BTreeMap::new();
    for reading in readings {
        if deployment.accepts_beacon(&reading.beacon_id) {
            groups.entry(reading.beacon_id.as_str()).or_default().push(reading);
        }
    }
    groups
}

/// Per-gateway signal series for one beacon, with gateway offsets applied
///
/// Readings from gateways the deployment does not know are ignored.
pub fn gateway_series<'a>(
    readings: &[&'a Reading],
    deployment: &Deployment,
) -> BTreeMap<&'a str, Vec<f64>> {
    let mut series: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for reading in readings {
        let gateway = reading.gateway_id.as_str();
        if deployment.floor_of_gateway(gateway).is_none() {
            continue;
        }
        series
            .entry(gateway)
            .or_default()
            .push(reading.signal() + deployment.correction_for(gateway));
    }
    series
}
