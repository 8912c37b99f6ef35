//! Floor Disambiguation Constants
//!
//! Weights of the composite floor score and the thresholds that force a
//! decision. Tuned on a two-level deployment with three gateways downstairs
//! and a single one upstairs.

/// Weight of the strongest gateway mean in the floor score.
pub const SCORE_WEIGHT_MAX_RSSI: f64 = 0.6;

/// Weight of the mean over gateways in the floor score.
pub const SCORE_WEIGHT_AVG_RSSI: f64 = 0.3;

/// Bonus per gateway that hears the beacon.
pub const SCORE_WEIGHT_GATEWAY_COUNT: f64 = 2.0;

/// Strongest-signal margin that forces the best floor (dB).
pub const FLOOR_RSSI_MARGIN_DB: f64 = 15.0;

/// Score ratio (best / second) that forces the best floor.
pub const FLOOR_SCORE_RATIO: f64 = 1.5;

/// Lower bound on the ratio denominator.
pub const FLOOR_SCORE_RATIO_FLOOR: f64 = 0.1;

/// A single-gateway floor above this RSSI wins (dBm).
///
/// Roughly "within arm's reach" of the gateway.
pub const SINGLE_GATEWAY_OVERRIDE_DBM: f64 = -50.0;

/// Samples a gateway needs to contribute to a floor score.
pub const FLOOR_MIN_SAMPLES: usize = 3;

/// Trailing samples averaged per gateway for the floor score.
pub const FLOOR_RECENT_WINDOW: usize = 5;
