//! RSSI to range conversion
//!
//! Empirical log-distance model for BLE, expressed as a ratio of the
//! received power to the calibrated power at one meter:
//!
//! ```text
//! ratio = rssi / reference_power
//! ratio < 1  : d = ratio^10
//! ratio >= 1 : d = 0.89976 · ratio^7.7095 + 0.111
//! ```
//!
//! The two branches do not meet exactly at `ratio == 1` (1.0 vs 1.01076).
//! The gap is below the ranging noise of any real gateway and is kept as is.
//!
//! `rssi == 0` is what gateways report when they lost the beacon; it maps to
//! [`UNKNOWN_DISTANCE`] rather than a range.

use crate::constants::signal::{
    DEFAULT_REFERENCE_POWER_DBM, FAR_FIELD_COEFFICIENT, FAR_FIELD_EXPONENT, FAR_FIELD_OFFSET,
    NEAR_FIELD_EXPONENT,
};

/// Sentinel distance for an unusable reading
pub const UNKNOWN_DISTANCE: f64 = -1.0;

/// Convert an RSSI value (dBm) to an estimated range (meters)
///
/// `reference_power` is the expected RSSI at one meter and must be non-zero.
pub fn rssi_to_distance(rssi: f64, reference_power: f64) -> f64 {
    if rssi == 0.0 {
        return UNKNOWN_DISTANCE;
    }

    let ratio = rssi / reference_power;
    if ratio < 1.0 {
        libm::pow(ratio, NEAR_FIELD_EXPONENT)
    } else {
        FAR_FIELD_COEFFICIENT * libm::pow(ratio, FAR_FIELD_EXPONENT) + FAR_FIELD_OFFSET
    }
}

/// Inverse of [`rssi_to_distance`]: the RSSI that would produce `distance`
///
/// Distances below one meter use the near-field branch, distances at or
/// above the far-field value at `ratio == 1` use the far-field branch, and
/// the small gap between them maps to `reference_power`. Returns `None` for
/// non-positive distances.
pub fn distance_to_rssi(distance: f64, reference_power: f64) -> Option<f64> {
    if !(distance > 0.0) {
        return None;
    }

    let far_field_start = FAR_FIELD_COEFFICIENT + FAR_FIELD_OFFSET;
    let ratio = if distance < 1.0 {
        libm::pow(distance, 1.0 / NEAR_FIELD_EXPONENT)
    } else if distance < far_field_start {
        1.0
    } else {
        libm::pow(
            (distance - FAR_FIELD_OFFSET) / FAR_FIELD_COEFFICIENT,
            1.0 / FAR_FIELD_EXPONENT,
        )
    };

    Some(ratio * reference_power)
}

/// Path-loss model bound to a calibrated reference power
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathLossModel {
    /// Expected RSSI at one meter (dBm)
    pub reference_power: f64,
}

impl Default for PathLossModel {
    fn default() -> Self {
        Self {
            reference_power: DEFAULT_REFERENCE_POWER_DBM,
        }
    }
}

impl PathLossModel {
    /// Model with a custom reference power
    pub const fn new(reference_power: f64) -> Self {
        Self { reference_power }
    }

    /// Range for an RSSI value, [`UNKNOWN_DISTANCE`] for `rssi == 0`
    pub fn distance(&self, rssi: f64) -> f64 {
        rssi_to_distance(rssi, self.reference_power)
    }

    /// RSSI expected at a range
    pub fn rssi_at(&self, distance: f64) -> Option<f64> {
        distance_to_rssi(distance, self.reference_power)
    }
}
