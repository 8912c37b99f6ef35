//! Signal Constants
//!
//! Parameters of the empirical path-loss model and of the two filter stages
//! that smooth each (beacon, gateway) RSSI series.

// ===== PATH-LOSS MODEL =====

/// Expected RSSI at 1 meter (dBm).
///
/// Typical iBeacon calibration value advertised in the measured-power field.
pub const DEFAULT_REFERENCE_POWER_DBM: f64 = -59.0;

/// Exponent of the near-field branch (`ratio < 1`).
pub const NEAR_FIELD_EXPONENT: f64 = 10.0;

/// Multiplier of the far-field branch.
pub const FAR_FIELD_COEFFICIENT: f64 = 0.89976;

/// Exponent of the far-field branch.
pub const FAR_FIELD_EXPONENT: f64 = 7.7095;

/// Additive offset of the far-field branch (meters).
pub const FAR_FIELD_OFFSET: f64 = 0.111;

// ===== KALMAN STAGE =====

/// Measurement noise (R) of the constant-velocity smoother.
pub const KALMAN_MEASUREMENT_NOISE: f64 = 17.0;

/// Process noise scale; Q = I · scale.
pub const KALMAN_PROCESS_NOISE_SCALE: f64 = 0.02;

/// Initial covariance scale; P₀ = I · scale (large = trust first samples).
pub const KALMAN_INITIAL_UNCERTAINTY: f64 = 1000.0;

// ===== BUTTERWORTH STAGE =====

/// Low-pass filter order.
pub const BUTTERWORTH_ORDER: usize = 2;

/// Normalized cutoff (fraction of Nyquist).
pub const BUTTERWORTH_CUTOFF: f64 = 0.1;

/// Lower bound on samples before the low-pass stage runs at all.
///
/// The effective minimum is `max(3 * order, BUTTERWORTH_MIN_SAMPLES_FLOOR)`.
pub const BUTTERWORTH_MIN_SAMPLES_FLOOR: usize = 10;

// ===== PIPELINE WINDOWS =====

/// Raw samples fed into the Kalman stage (trailing window).
pub const FILTER_INPUT_WINDOW: usize = 10;

/// Filtered samples averaged into the single FilteredSignal value.
pub const FILTER_OUTPUT_WINDOW: usize = 5;

/// Samples a gateway needs before it takes part in a single-floor solve.
pub const SINGLE_FLOOR_MIN_SAMPLES: usize = 5;

/// Samples a gateway needs before it takes part in a multi-floor solve.
pub const MULTI_FLOOR_MIN_SAMPLES: usize = 3;

// ===== SOLVE MODES =====

/// Gateways needed for a fully constrained 3D solve.
pub const MIN_FULL_SOLVE_GATEWAYS: usize = 3;

/// Gateways needed for the approximate two-anchor solve.
pub const MIN_REDUCED_SOLVE_GATEWAYS: usize = 2;
