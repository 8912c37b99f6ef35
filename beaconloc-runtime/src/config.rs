//! Preset catalogue
//!
//! A deployment is described once per site in a JSON catalogue:
//!
//! ```json
//! {
//!   "beacon_filter": ["tag-1"],
//!   "presets": {
//!     "office": {
//!       "name": "Office",
//!       "image_file": "maps/office.png",
//!       "extent": [0, 10, 0, 11],
//!       "gateway_positions": { "gw-1": [6.77, 10.5, 1.0] },
//!       "zones": [["desk", 0, 0, 10, 11]],
//!       "correction_rssi": { "gw-1": 3 },
//!       "attenuation_regions": [{ "polygon": [[3, 6], [5, 6], [5, 10]], "attenuation_db": 10 }]
//!     },
//!     "house": {
//!       "name": "House",
//!       "multi_floor": true,
//!       "floors": [
//!         { "name": "Ground", "image_file": "maps/ground.png", "extent": [0, 25, 0, 15],
//!           "gateway_positions": {}, "zones": [] }
//!       ],
//!       "correction_rssi": {}
//!     }
//!   }
//! }
//! ```
//!
//! A preset without its own `beacon_filter` uses the catalogue's.
//!
//! [`DeploymentWatcher`] re-reads the catalogue when the file changes and
//! publishes the rebuilt [`Deployment`] as a whole. A running tick keeps the
//! `Arc` it started with.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use beaconloc_core::{
    AttenuationRegion, Deployment, Extent, Floor, Gateway, Point2, Polygon, Position, Zone,
};
use log::{debug, info, warn};
use serde::Deserialize;
use tokio::sync::watch;

use crate::error::{RuntimeError, RuntimeResult};

/// `[name, x1, y1, x2, y2]`
type ZoneEntry = (String, f64, f64, f64, f64);

#[derive(Debug, Clone, Deserialize)]
struct RegionEntry {
    polygon: Vec<[f64; 2]>,
    attenuation_db: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct FloorEntry {
    name: String,
    #[serde(default)]
    image_file: Option<String>,
    extent: [f64; 4],
    #[serde(default)]
    gateway_positions: BTreeMap<String, [f64; 3]>,
    #[serde(default)]
    zones: Vec<ZoneEntry>,
}

impl FloorEntry {
    fn build(&self) -> Floor {
        let [xmin, xmax, ymin, ymax] = self.extent;
        let mut floor = Floor::new(self.name.as_str(), Extent::new(xmin, xmax, ymin, ymax));
        for (id, [x, y, h]) in &self.gateway_positions {
            floor = floor.with_gateway(Gateway::new(id.as_str(), Position::new(*x, *y, *h)));
        }
        for (name, x1, y1, x2, y2) in &self.zones {
            floor = floor.with_zone(Zone::new(name.as_str(), *x1, *y1, *x2, *y2));
        }
        if let Some(image) = &self.image_file {
            floor = floor.with_image(image.as_str());
        }
        floor
    }
}

/// One preset as written in the catalogue
#[derive(Debug, Clone, Deserialize)]
struct PresetEntry {
    name: String,
    #[serde(default)]
    multi_floor: bool,
    #[serde(default)]
    image_file: Option<String>,
    #[serde(default)]
    extent: Option<[f64; 4]>,
    #[serde(default)]
    gateway_positions: BTreeMap<String, [f64; 3]>,
    #[serde(default)]
    zones: Vec<ZoneEntry>,
    #[serde(default)]
    floors: Vec<FloorEntry>,
    #[serde(default)]
    correction_rssi: BTreeMap<String, f64>,
    #[serde(default)]
    attenuation_regions: Vec<RegionEntry>,
    #[serde(default)]
    beacon_filter: Option<Vec<String>>,
}

impl PresetEntry {
    /// Floors in declaration order; a single-floor preset is its own floor
    fn floors(&self, key: &str) -> RuntimeResult<Vec<FloorEntry>> {
        if self.multi_floor {
            return Ok(self.floors.clone());
        }
        let extent = self.extent.ok_or_else(|| RuntimeError::InvalidPreset {
            preset: key.to_string(),
            reason: "single-floor preset has no extent".to_string(),
        })?;
        Ok(vec![FloorEntry {
            name: self.name.clone(),
            image_file: self.image_file.clone(),
            extent,
            gateway_positions: self.gateway_positions.clone(),
            zones: self.zones.clone(),
        }])
    }
}

/// All presets of a site
#[derive(Debug, Clone, Deserialize)]
pub struct PresetCatalog {
    #[serde(default)]
    beacon_filter: Option<Vec<String>>,
    presets: BTreeMap<String, PresetEntry>,
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl PresetCatalog {
    /// Read a catalogue file; image paths resolve against its directory
    pub fn load(path: impl AsRef<Path>) -> RuntimeResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let mut catalog = Self::from_json(&text)?;
        catalog.base_dir = path.parent().map(Path::to_path_buf);
        debug!("loaded {} presets from {}", catalog.presets.len(), path.display());
        Ok(catalog)
    }

    /// Parse a catalogue; image paths resolve against the working directory
    pub fn from_json(text: &str) -> RuntimeResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Preset keys, sorted
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(String::as_str)
    }

    /// Display name of a preset
    pub fn name(&self, key: &str) -> Option<&str> {
        self.presets.get(key).map(|p| p.name.as_str())
    }

    fn preset(&self, key: &str) -> RuntimeResult<&PresetEntry> {
        self.presets
            .get(key)
            .ok_or_else(|| RuntimeError::UnknownPreset(key.to_string()))
    }

    /// Build the validated deployment for a preset
    pub fn deployment(&self, key: &str) -> RuntimeResult<Deployment> {
        let preset = self.preset(key)?;
        let floors = preset.floors(key)?.iter().map(FloorEntry::build).collect();

        let regions = preset
            .attenuation_regions
            .iter()
            .map(|r| AttenuationRegion {
                polygon: Polygon::new(r.polygon.iter().map(|[x, y]| Point2::new(*x, *y)).collect()),
                attenuation_db: r.attenuation_db,
            })
            .collect();

        let beacon_filter = preset.beacon_filter.clone().or_else(|| self.beacon_filter.clone());

        let deployment = Deployment::new(preset.name.as_str(), floors)?
            .with_corrections(preset.correction_rssi.clone())
            .with_attenuation_regions(regions)
            .with_beacon_filter(beacon_filter);

        info!(
            "preset '{}' ({}): {} floor(s), {} gateway(s)",
            key,
            deployment.name(),
            deployment.floors().len(),
            deployment.gateway_counts().values().sum::<usize>()
        );
        Ok(deployment)
    }

    /// Image references of a preset that do not exist on disk
    ///
    /// Missing images only affect display, so they are reported, not fatal.
    pub fn validate_assets(&self, key: &str) -> RuntimeResult<Vec<PathBuf>> {
        let preset = self.preset(key)?;
        let mut missing = Vec::new();
        for floor in preset.floors(key)? {
            let Some(image) = floor.image_file else {
                warn!("preset '{}': floor '{}' has no image", key, floor.name);
                continue;
            };
            let path = match &self.base_dir {
                Some(dir) => dir.join(&image),
                None => PathBuf::from(&image),
            };
            if !path.exists() {
                warn!("preset '{}': image {} not found", key, path.display());
                missing.push(path);
            }
        }
        Ok(missing)
    }
}

/// Republishes a preset's deployment whenever its catalogue changes
#[derive(Debug)]
pub struct DeploymentWatcher {
    path: PathBuf,
    preset: String,
    modified: SystemTime,
    tx: watch::Sender<Arc<Deployment>>,
}

impl DeploymentWatcher {
    /// Load the preset once and hand out the receiving side
    pub fn new(
        path: impl Into<PathBuf>,
        preset: impl Into<String>,
    ) -> RuntimeResult<(Self, watch::Receiver<Arc<Deployment>>)> {
        let path = path.into();
        let preset = preset.into();
        let modified = modified_time(&path)?;
        let deployment = PresetCatalog::load(&path)?.deployment(&preset)?;
        let (tx, rx) = watch::channel(Arc::new(deployment));
        Ok((Self { path, preset, modified, tx }, rx))
    }

    /// Reload if the file changed; `Ok(true)` when a new deployment was sent
    ///
    /// A catalogue that fails to load leaves the previous deployment in
    /// place and is read again on the next poll.
    pub fn poll(&mut self) -> RuntimeResult<bool> {
        let modified = modified_time(&self.path)?;
        if modified == self.modified {
            return Ok(false);
        }

        // Stamp only after a successful load; a failed read is retried next poll
        let deployment = PresetCatalog::load(&self.path)?.deployment(&self.preset)?;
        self.tx.send_replace(Arc::new(deployment));
        self.modified = modified;
        info!("preset '{}' reloaded from {}", self.preset, self.path.display());
        Ok(true)
    }

    /// Poll every `period` until `shutdown` turns true
    pub async fn run(mut self, period: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.poll() {
                        warn!("keeping previous deployment: {e}");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }
}

fn modified_time(path: &Path) -> RuntimeResult<SystemTime> {
    fs::metadata(path)?
        .modified()
        .map_err(|_| RuntimeError::Unwatchable(path.to_path_buf()))
}
