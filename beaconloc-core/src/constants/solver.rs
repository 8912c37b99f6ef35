//! Solver Constants
//!
//! Bounds and stopping rules for the box-constrained trilateration solve.

/// Initial height estimate for the beacon (m).
///
/// Beacons are usually carried or mounted around waist height.
pub const DEFAULT_HEIGHT_GUESS_M: f64 = 0.5;

/// Lowest plausible beacon height (m).
pub const MIN_HEIGHT_M: f64 = 0.0;

/// Highest plausible beacon height (m).
pub const MAX_HEIGHT_M: f64 = 3.0;

/// Iteration cap for the projected-gradient minimizer.
pub const MAX_ITERATIONS: usize = 15_000;

/// Converged when every projected-gradient component is below this.
pub const PROJECTED_GRADIENT_TOLERANCE: f64 = 1e-5;

/// Converged when the relative objective reduction of a step is below this.
///
/// Relative to `max(|f_k|, |f_k+1|, 1)`, so it acts as an absolute
/// tolerance once the residual drops below one square meter.
pub const RELATIVE_REDUCTION_TOLERANCE: f64 = 1e-12;

/// Armijo sufficient-decrease constant.
pub const ARMIJO_CONSTANT: f64 = 1e-4;

/// Halvings tried before a line search is declared failed.
pub const MAX_LINE_SEARCH_STEPS: usize = 50;

/// Clamp range for Barzilai-Borwein trial steps.
pub const MIN_TRIAL_STEP: f64 = 1e-10;

/// Upper clamp for Barzilai-Borwein trial steps.
pub const MAX_TRIAL_STEP: f64 = 1e10;

/// Objective value treated as an exact fit.
pub const EXACT_FIT_OBJECTIVE: f64 = 1e-20;
