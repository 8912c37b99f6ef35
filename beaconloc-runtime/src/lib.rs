//! BeaconLoc Runtime
//!
//! ## Overview
//!
//! The host around `beaconloc-core`. The engine only turns a reading window
//! and a deployment into positions; this crate supplies both and runs it on
//! a schedule:
//!
//! ```text
//! presets.json ─→ PresetCatalog ─→ DeploymentWatcher ──┐ watch<Arc<Deployment>>
//!                                                       ▼
//! data.json ───→ ReadingStore ─→ EstimationService ─→ TickReport ─→ mpsc / output.json
//! ```
//!
//! - [`config`]: the JSON preset catalogue and hot reload of a preset
//! - [`store`]: the persisted reading array, written by atomic replace
//! - [`service`]: the tick loop, one blocking task per beacon
//!
//! Ingestion writes the store independently; the two sides never lock each
//! other.
//!
//! ## Example
//!
//! ```no_run
//! use beaconloc_runtime::{DeploymentWatcher, EstimationService, ReadingStore, ServiceConfig};
//!
//! # async fn run() -> beaconloc_runtime::RuntimeResult<()> {
//! let (_watcher, deployment) = DeploymentWatcher::new("data/presets.json", "office")?;
//! let config = ServiceConfig::for_deployment(&deployment.borrow());
//! let mut service = EstimationService::new(ReadingStore::new("data/data.json"), deployment, config);
//!
//! let report = service.tick().await?;
//! println!("{} of {} beacons located", report.located(), report.beacons.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod service;
pub mod store;

pub use config::{DeploymentWatcher, PresetCatalog};
pub use error::{RuntimeError, RuntimeResult};
pub use service::{EstimationService, ServiceConfig, TickReport};
pub use store::{ReadingStore, ReadingTime, StoredReading};
