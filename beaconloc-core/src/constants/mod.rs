//! Constants for BeaconLoc Core
//!
//! Every tunable number the localization pipeline uses lives here, with the
//! default the deployments were calibrated against. Components take these as
//! defaults for their config structs so each one can be overridden and
//! tested on its own.
//!
//! ## Organization
//!
//! - **Signal**: path-loss model and filter parameters
//! - **Solver**: optimizer tolerances and physical bounds
//! - **Floor**: multi-floor scoring weights and decision thresholds
//! - **Correction**: proximity bonus shape

/// Path-loss model and signal filter parameters.
pub mod signal;

/// Trilateration solver tolerances and bounds.
pub mod solver;

/// Floor disambiguation weights and thresholds.
pub mod floor;

/// Post-estimate correction parameters.
pub mod correction;

// Re-export commonly used constants for convenience
pub use signal::{
    DEFAULT_REFERENCE_POWER_DBM, MIN_FULL_SOLVE_GATEWAYS, MIN_REDUCED_SOLVE_GATEWAYS,
    MULTI_FLOOR_MIN_SAMPLES, SINGLE_FLOOR_MIN_SAMPLES,
};

pub use solver::{DEFAULT_HEIGHT_GUESS_M, MAX_HEIGHT_M, MIN_HEIGHT_M};

pub use floor::{
    FLOOR_RSSI_MARGIN_DB, FLOOR_SCORE_RATIO, SINGLE_GATEWAY_OVERRIDE_DBM,
};

pub use correction::{PROXIMITY_MAX_BONUS_DB, PROXIMITY_THRESHOLD_M};
