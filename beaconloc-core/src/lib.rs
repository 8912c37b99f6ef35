//! Localization engine for BeaconLoc
//!
//! Estimates where BLE beacons are inside a building from the RSSI values
//! that fixed gateways report for them. Designed to be embedded in a host
//! that owns ingestion, storage and display; this crate only turns a window
//! of readings plus a static deployment description into positions.
//!
//! Per beacon, per tick:
//!
//! ```text
//! readings ─→ SignalFilter (per gateway) ─→ distance model (per gateway)
//!          ─→ [FloorSelector, multi-floor only] ─→ TrilaterationSolver
//!          ─→ corrections ─→ zone-validated PositionEstimate
//! ```
//!
//! ```no_run
//! use beaconloc_core::{Deployment, EngineConfig, Localizer, Reading};
//!
//! # fn run(deployment: &Deployment, readings: &[Reading]) {
//! let config = EngineConfig::default();
//! let localizer = Localizer::new(deployment, &config);
//!
//! for report in localizer.locate_all(readings) {
//!     match report.estimate.position {
//!         Some(p) => { let _ = (p.x, p.y); } // render marker
//!         None => {}                          // clear marker this tick
//!     }
//! }
//! # }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

extern crate alloc;

// Logging compiles away when the `log` feature is off (no_std targets)
#[cfg(feature = "log")]
macro_rules! log_debug {
    ($($arg:tt)*) => { log::debug!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "log")]
macro_rules! log_info {
    ($($arg:tt)*) => { log::info!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_info {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "log")]
macro_rules! log_warn {
    ($($arg:tt)*) => { log::warn!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_warn {
    ($($arg:tt)*) => {};
}

pub mod constants;
pub mod correction;
pub mod deployment;
pub mod distance;
pub mod engine;
pub mod errors;
pub mod filter;
pub mod floor;
pub mod geometry;
pub mod optimize;
pub mod reading;
pub mod trilateration;

// Public API
pub use deployment::{AttenuationRegion, Deployment, Floor, FloorId, Gateway, Zone};
pub use distance::{rssi_to_distance, PathLossModel, UNKNOWN_DISTANCE};
pub use engine::{BeaconReport, EngineConfig, GatewayRange, Localizer, PositionEstimate};
pub use errors::{LocalizationError, LocalizationResult};
pub use filter::SignalFilter;
pub use floor::{FloorScore, FloorSelector};
pub use geometry::{Extent, Point2, Polygon, Position, Rect};
pub use reading::{Reading, Timestamp};
pub use trilateration::{SolverBounds, TrilaterationSolver};

/// Crate version, as reported in host logs
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
