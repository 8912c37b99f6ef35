//! Error Types for Localization Failures
//!
//! ## Design Philosophy
//!
//! Almost every failure in this crate is *expected*: a beacon that two gateways
//! barely hear, an optimizer that stalls on contradictory ranges, a beacon
//! heard equally on two floors. None of these should stop a tick. Errors are
//! therefore small `Copy` values with `&'static str` messages so they can be
//! stored in per-beacon reports and logged without allocation.
//!
//! ## Error Categories
//!
//! ### Recoverable per beacon, per tick
//! - `InsufficientGateways`: not enough filtered signals on the selected floor
//! - `OptimizationFailed`: the bounded solver did not converge
//! - `FloorUndetectable`: fewer than two floors carried scoreable data
//!
//! A beacon hit by one of these has no position for the tick and is retried
//! naturally on the next one.
//!
//! ### Caller contract violations
//! - `DimensionMismatch`: distance and position sequences differ in length
//! - `InvalidConfiguration`: a deployment that breaks its own invariants
//!
//! ## Handling Strategy
//!
//! ```rust
//! use beaconloc_core::LocalizationError;
//!
//! fn on_failure(err: LocalizationError) {
//!     match err {
//!         LocalizationError::InsufficientGateways { .. }
//!         | LocalizationError::FloorUndetectable { .. } => {
//!             // clear the beacon marker, wait for more data
//!         }
//!         LocalizationError::OptimizationFailed { reason } => {
//!             // surface to logs only
//!             let _ = reason;
//!         }
//!         LocalizationError::DimensionMismatch { .. }
//!         | LocalizationError::InvalidConfiguration { .. } => {
//!             // bug in the caller or in the deployment file
//!         }
//!     }
//! }
//! ```

use thiserror_no_std::Error;

/// Result type for localization operations
pub type LocalizationResult<T> = Result<T, LocalizationError>;

/// Localization errors - small and `Copy` so reports can carry them
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum LocalizationError {
    /// Not enough gateways with a filtered signal for the requested solve
    #[error("Insufficient gateways: need {required}, have {available}")]
    InsufficientGateways {
        /// Minimum number of gateways the solve mode requires
        required: usize,
        /// Gateways that produced a filtered signal this tick
        available: usize,
    },

    /// Distance and position sequences have different lengths
    #[error("Dimension mismatch: {distances} distances for {positions} positions")]
    DimensionMismatch {
        /// Number of ranges supplied
        distances: usize,
        /// Number of gateway positions supplied
        positions: usize,
    },

    /// Bounded optimizer stopped without converging
    #[error("Optimization failed: {reason}")]
    OptimizationFailed {
        /// Optimizer diagnostic
        reason: &'static str,
    },

    /// Floor disambiguation had too little evidence
    #[error("Floor undetectable: {scored} floor(s) with scoreable data")]
    FloorUndetectable {
        /// Floors that produced a score
        scored: usize,
    },

    /// Deployment description violates its own invariants
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration {
        /// What was wrong with it
        reason: &'static str,
    },
}

impl LocalizationError {
    /// True for the conditions that simply mean "no estimate this tick"
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientGateways { .. }
                | Self::OptimizationFailed { .. }
                | Self::FloorUndetectable { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn recoverable_classification() {
        assert!(LocalizationError::InsufficientGateways { required: 3, available: 1 }.is_recoverable());
        assert!(LocalizationError::OptimizationFailed { reason: "stalled" }.is_recoverable());
        assert!(LocalizationError::FloorUndetectable { scored: 1 }.is_recoverable());
        assert!(!LocalizationError::DimensionMismatch { distances: 3, positions: 4 }.is_recoverable());
        assert!(!LocalizationError::InvalidConfiguration { reason: "no floors" }.is_recoverable());
    }

    #[test]
    fn messages_carry_context() {
        let msg = LocalizationError::InsufficientGateways { required: 3, available: 2 }.to_string();
        assert_eq!(msg, "Insufficient gateways: need 3, have 2");

        let msg = LocalizationError::OptimizationFailed { reason: "line search failed" }.to_string();
        assert!(msg.contains("line search failed"));
    }
}
