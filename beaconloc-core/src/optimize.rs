//! Box-constrained gradient minimizer
//!
//! ## Method
//!
//! Projected gradient descent on `lower <= x <= upper`:
//!
//! ```text
//! x⁺ = P(x - α·∇f(x))          P = component-wise clamp to the box
//! ```
//!
//! The trial step `α` is the Barzilai-Borwein step `sᵀs / sᵀy` from the
//! previous iteration, then halved until the Armijo condition
//! `f(x⁺) <= f(x) + c·∇f(x)ᵀ(x⁺ - x)` holds.
//!
//! ## Termination
//!
//! Converged when any of:
//! - the projected gradient `P(x - ∇f) - x` is below tolerance in max norm
//! - the relative objective reduction of a step is below tolerance
//! - the objective is numerically zero
//!
//! Failed when the iteration limit is reached or the line search cannot find
//! a decreasing step. Failures carry a static diagnostic.
//!
//! The method is deterministic: the same objective, start and bounds always
//! produce the same iterates.

use crate::{
    constants::solver::{
        ARMIJO_CONSTANT, EXACT_FIT_OBJECTIVE, MAX_ITERATIONS, MAX_LINE_SEARCH_STEPS,
        MAX_TRIAL_STEP, MIN_TRIAL_STEP, PROJECTED_GRADIENT_TOLERANCE,
        RELATIVE_REDUCTION_TOLERANCE,
    },
    errors::{LocalizationError, LocalizationResult},
};

/// A differentiable function of `N` variables
pub trait Objective<const N: usize> {
    /// Objective value and gradient at `x`
    fn evaluate(&self, x: &[f64; N]) -> (f64, [f64; N]);
}

/// Component-wise bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds<const N: usize> {
    /// Lower bound per component
    pub lower: [f64; N],
    /// Upper bound per component
    pub upper: [f64; N],
}

impl<const N: usize> Bounds<N> {
    /// Bounds from per-component limits (swapped limits are reordered)
    pub fn new(lower: [f64; N], upper: [f64; N]) -> Self {
        let mut lo = lower;
        let mut hi = upper;
        for i in 0..N {
            if lo[i] > hi[i] {
                core::mem::swap(&mut lo[i], &mut hi[i]);
            }
        }
        Self { lower: lo, upper: hi }
    }

    /// Clamp a point into the box
    pub fn project(&self, x: &[f64; N]) -> [f64; N] {
        let mut p = *x;
        for i in 0..N {
            p[i] = p[i].clamp(self.lower[i], self.upper[i]);
        }
        p
    }
}

/// Minimizer tunables
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimizerConfig {
    /// Iteration limit
    pub max_iterations: usize,
    /// Max-norm threshold on the projected gradient
    pub gradient_tolerance: f64,
    /// Threshold on `(f - f⁺) / max(|f|, |f⁺|, 1)`
    pub reduction_tolerance: f64,
}

impl Default for MinimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: MAX_ITERATIONS,
            gradient_tolerance: PROJECTED_GRADIENT_TOLERANCE,
            reduction_tolerance: RELATIVE_REDUCTION_TOLERANCE,
        }
    }
}

/// A converged minimization
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Minimum<const N: usize> {
    /// Minimizer
    pub x: [f64; N],
    /// Objective at `x`
    pub value: f64,
    /// Iterations used
    pub iterations: usize,
}

fn dot<const N: usize>(a: &[f64; N], b: &[f64; N]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn projected_gradient_norm<const N: usize>(x: &[f64; N], g: &[f64; N], bounds: &Bounds<N>) -> f64 {
    let mut norm: f64 = 0.0;
    for i in 0..N {
        let moved = (x[i] - g[i]).clamp(bounds.lower[i], bounds.upper[i]) - x[i];
        norm = norm.max(libm::fabs(moved));
    }
    norm
}

/// Minimize `objective` over `bounds` starting from `start`
pub fn minimize<const N: usize, F: Objective<N>>(
    objective: &F,
    start: [f64; N],
    bounds: &Bounds<N>,
    config: &MinimizerConfig,
) -> LocalizationResult<Minimum<N>> {
    let mut x = bounds.project(&start);
    let (mut f, mut g) = objective.evaluate(&x);
    if !f.is_finite() {
        return Err(LocalizationError::OptimizationFailed {
            reason: "objective is not finite at the starting point",
        });
    }

    let g_norm = g.iter().fold(0.0f64, |m, v| m.max(libm::fabs(*v)));
    let mut step = (1.0 / g_norm.max(1.0)).clamp(MIN_TRIAL_STEP, MAX_TRIAL_STEP);

    for iteration in 0..config.max_iterations {
        if f <= EXACT_FIT_OBJECTIVE
            || projected_gradient_norm(&x, &g, bounds) <= config.gradient_tolerance
        {
            return Ok(Minimum { x, value: f, iterations: iteration });
        }

        // Armijo backtracking along the projected path
        let mut alpha = step;
        let mut accepted = None;
        for _ in 0..MAX_LINE_SEARCH_STEPS {
            let mut trial = x;
            for i in 0..N {
                trial[i] -= alpha * g[i];
            }
            let trial = bounds.project(&trial);

            let mut d = [0.0; N];
            for i in 0..N {
                d[i] = trial[i] - x[i];
            }
            let (f_trial, g_trial) = objective.evaluate(&trial);
            if f_trial.is_finite() && f_trial <= f + ARMIJO_CONSTANT * dot(&g, &d) {
                accepted = Some((trial, d, f_trial, g_trial));
                break;
            }
            alpha *= 0.5;
        }

        let Some((x_next, s, f_next, g_next)) = accepted else {
            return Err(LocalizationError::OptimizationFailed {
                reason: "line search could not find a decreasing step",
            });
        };

        let reduction = (f - f_next) / libm::fabs(f).max(libm::fabs(f_next)).max(1.0);

        let mut y = [0.0; N];
        for i in 0..N {
            y[i] = g_next[i] - g[i];
        }
        let sy = dot(&s, &y);
        step = if sy > 0.0 {
            (dot(&s, &s) / sy).clamp(MIN_TRIAL_STEP, MAX_TRIAL_STEP)
        } else {
            1.0
        };

        x = x_next;
        f = f_next;
        g = g_next;

        if reduction <= config.reduction_tolerance {
            return Ok(Minimum { x, value: f, iterations: iteration + 1 });
        }
    }

    Err(LocalizationError::OptimizationFailed {
        reason: "iteration limit reached",
    })
}
