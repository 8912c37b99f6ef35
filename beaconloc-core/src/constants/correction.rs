//! Correction Constants

/// Distance under which a gateway gets a proximity bonus (m).
pub const PROXIMITY_THRESHOLD_M: f64 = 1.0;

/// Bonus at zero distance, decaying linearly to 0 at the threshold (dB).
pub const PROXIMITY_MAX_BONUS_DB: f64 = 3.0;
