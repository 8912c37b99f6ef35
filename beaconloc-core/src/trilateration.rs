//! Bounded nonlinear trilateration
//!
//! Finds the point minimizing the squared range residuals
//!
//! ```text
//! f(p) = Σᵢ (‖p - gᵢ‖ - dᵢ)²
//! ```
//!
//! over the floor's plan extent and a fixed 0 to 3 m height band. The search
//! starts at the gateways' plan centroid at a height of 0.5 m.
//!
//! With three or more gateways the problem is fully constrained. With two,
//! [`TrilaterationSolver::solve_reduced`] still returns the residual minimizer
//! nearest the start, which lies somewhere on the intersection of two
//! spheres; callers must treat it as approximate.

use crate::{
    constants::{
        signal::{MIN_FULL_SOLVE_GATEWAYS, MIN_REDUCED_SOLVE_GATEWAYS},
        solver::{DEFAULT_HEIGHT_GUESS_M, MAX_HEIGHT_M, MIN_HEIGHT_M},
    },
    errors::{LocalizationError, LocalizationResult},
    geometry::{Extent, Position},
    optimize::{minimize, Bounds, MinimizerConfig, Objective},
};

/// Gradients are skipped within this distance of a gateway
const GRADIENT_SINGULARITY_M: f64 = 1e-12;

/// Search box for the solver
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverBounds {
    /// Lowest corner (x, y, z)
    pub min: Position,
    /// Highest corner (x, y, z)
    pub max: Position,
}

impl SolverBounds {
    /// Floor extent with the default height band
    pub fn from_extent(extent: &Extent) -> Self {
        Self::new(
            Position::new(extent.xmin, extent.ymin, MIN_HEIGHT_M),
            Position::new(extent.xmax, extent.ymax, MAX_HEIGHT_M),
        )
    }

    /// Arbitrary box (corners in any order)
    pub fn new(a: Position, b: Position) -> Self {
        Self {
            min: Position::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Position::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Whether a point lies inside the box (edges included)
    pub fn contains(&self, p: &Position) -> bool {
        (self.min.x..=self.max.x).contains(&p.x)
            && (self.min.y..=self.max.y).contains(&p.y)
            && (self.min.z..=self.max.z).contains(&p.z)
    }

    fn as_box(&self) -> Bounds<3> {
        Bounds::new(self.min.to_array(), self.max.to_array())
    }
}

/// Sum of squared range residuals
struct RangeResiduals<'a> {
    distances: &'a [f64],
    positions: &'a [Position],
}

impl Objective<3> for RangeResiduals<'_> {
    fn evaluate(&self, x: &[f64; 3]) -> (f64, [f64; 3]) {
        let p = Position::from_array(*x);
        let mut value = 0.0;
        let mut gradient = [0.0; 3];

        for (gateway, &range) in self.positions.iter().zip(self.distances) {
            let norm = p.distance_to(gateway);
            let residual = norm - range;
            value += residual * residual;

            if norm > GRADIENT_SINGULARITY_M {
                let scale = 2.0 * residual / norm;
                gradient[0] += scale * (p.x - gateway.x);
                gradient[1] += scale * (p.y - gateway.y);
                gradient[2] += scale * (p.z - gateway.z);
            }
        }

        (value, gradient)
    }
}

/// Range-based position solver for one floor
#[derive(Debug, Clone, PartialEq)]
pub struct TrilaterationSolver {
    bounds: SolverBounds,
    height_guess: f64,
    minimizer: MinimizerConfig,
}

impl TrilaterationSolver {
    /// Solver searching `bounds`
    pub fn new(bounds: SolverBounds) -> Self {
        Self {
            bounds,
            height_guess: DEFAULT_HEIGHT_GUESS_M,
            minimizer: MinimizerConfig::default(),
        }
    }

    /// Solver searching a floor extent
    pub fn for_extent(extent: &Extent) -> Self {
        Self::new(SolverBounds::from_extent(extent))
    }

    /// Starting height of the search
    pub fn with_height_guess(mut self, height: f64) -> Self {
        self.height_guess = height;
        self
    }

    /// Optimizer limits
    pub fn with_minimizer(mut self, config: MinimizerConfig) -> Self {
        self.minimizer = config;
        self
    }

    /// Search box
    pub fn bounds(&self) -> &SolverBounds {
        &self.bounds
    }

    /// Fully constrained solve, three or more ranges
    pub fn solve(&self, distances: &[f64], positions: &[Position]) -> LocalizationResult<Position> {
        self.solve_with_minimum(distances, positions, MIN_FULL_SOLVE_GATEWAYS)
    }

    /// Approximate solve accepting two ranges
    pub fn solve_reduced(
        &self,
        distances: &[f64],
        positions: &[Position],
    ) -> LocalizationResult<Position> {
        self.solve_with_minimum(distances, positions, MIN_REDUCED_SOLVE_GATEWAYS)
    }

    fn solve_with_minimum(
        &self,
        distances: &[f64],
        positions: &[Position],
        required: usize,
    ) -> LocalizationResult<Position> {
        if distances.len() != positions.len() {
            return Err(LocalizationError::DimensionMismatch {
                distances: distances.len(),
                positions: positions.len(),
            });
        }
        if positions.len() < required {
            return Err(LocalizationError::InsufficientGateways {
                required,
                available: positions.len(),
            });
        }

        let n = positions.len() as f64;
        let cx = positions.iter().map(|p| p.x).sum::<f64>() / n;
        let cy = positions.iter().map(|p| p.y).sum::<f64>() / n;
        let start = [cx, cy, self.height_guess];

        let objective = RangeResiduals { distances, positions };
        let minimum = minimize(&objective, start, &self.bounds.as_box(), &self.minimizer)?;

        log_debug!(
            "trilateration converged after {} iterations, residual {:.3e}",
            minimum.iterations,
            minimum.value
        );
        Ok(Position::from_array(minimum.x))
    }
}
