//! Static deployment description
//!
//! A `Deployment` is everything the engine needs to know about a site:
//! floors, the gateways and zones on each floor, per-gateway RSSI correction
//! offsets, attenuation regions and the optional beacon allow-list.
//!
//! ## Immutability
//!
//! The engine borrows a `Deployment` for the duration of a tick and never
//! mutates it. Reloading a site means building a new `Deployment` and
//! swapping the shared reference, so a tick in progress keeps seeing the
//! configuration it started with.
//!
//! ## Invariants (checked by [`Deployment::new`])
//!
//! - At least one floor
//! - Every floor extent is non-empty
//! - A gateway id appears on exactly one floor

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use crate::{
    errors::{LocalizationError, LocalizationResult},
    geometry::{Extent, Polygon, Position, Rect},
};

/// Floor index, in declaration order (0 = first declared floor)
pub type FloorId = usize;

/// Fixed receiver reporting RSSI for beacons it hears
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Gateway {
    /// Gateway identifier as it appears in readings
    pub id: String,
    /// Mounting position (x, y, height)
    pub position: Position,
}

impl Gateway {
    /// Create a gateway
    pub fn new(id: impl Into<String>, position: Position) -> Self {
        Self { id: id.into(), position }
    }
}

/// Named rectangular area used to validate and clamp estimates
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Zone {
    /// Zone name reported with estimates
    pub name: String,
    /// Zone area
    pub rect: Rect,
}

impl Zone {
    /// Create a zone from two opposite corners
    pub fn new(name: impl Into<String>, x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            name: name.into(),
            rect: Rect::new(x1, y1, x2, y2),
        }
    }
}

/// Area that weakens signals passing through it (walls, shelving, ...)
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttenuationRegion {
    /// Region outline on the plan
    pub polygon: Polygon,
    /// RSSI compensation added for each crossing path (dB)
    pub attenuation_db: f64,
}

/// One level of the building
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Floor {
    /// Display name
    pub name: String,
    /// Gateways mounted on this floor, in declaration order
    pub gateways: Vec<Gateway>,
    /// Zones on this floor, in declaration order
    pub zones: Vec<Zone>,
    /// Plan area searched by the solver
    pub extent: Extent,
    /// Plan image reference, opaque to the engine
    pub image: Option<String>,
}

impl Floor {
    /// Create an empty floor with the given extent
    pub fn new(name: impl Into<String>, extent: Extent) -> Self {
        Self {
            name: name.into(),
            gateways: Vec::new(),
            zones: Vec::new(),
            extent,
            image: None,
        }
    }

    /// Add a gateway
    pub fn with_gateway(mut self, gateway: Gateway) -> Self {
        self.gateways.push(gateway);
        self
    }

    /// Add a zone
    pub fn with_zone(mut self, zone: Zone) -> Self {
        self.zones.push(zone);
        self
    }

    /// Set the plan image reference
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Look up a gateway on this floor
    pub fn gateway(&self, id: &str) -> Option<&Gateway> {
        self.gateways.iter().find(|g| g.id == id)
    }
}

/// Validated, immutable description of a site
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Deployment {
    name: String,
    floors: Vec<Floor>,
    correction_rssi: BTreeMap<String, f64>,
    attenuation_regions: Vec<AttenuationRegion>,
    beacon_filter: Option<Vec<String>>,
    gateway_floor: BTreeMap<String, FloorId>,
}

impl Deployment {
    /// Validate floors and build the deployment
    pub fn new(name: impl Into<String>, floors: Vec<Floor>) -> LocalizationResult<Self> {
        if floors.is_empty() {
            return Err(LocalizationError::InvalidConfiguration {
                reason: "deployment declares no floors",
            });
        }

        let mut gateway_floor = BTreeMap::new();
        for (floor_id, floor) in floors.iter().enumerate() {
            if !floor.extent.is_valid() {
                return Err(LocalizationError::InvalidConfiguration {
                    reason: "floor extent must satisfy xmin < xmax and ymin < ymax",
                });
            }
            for gateway in &floor.gateways {
                if gateway_floor.insert(gateway.id.clone(), floor_id).is_some() {
                    return Err(LocalizationError::InvalidConfiguration {
                        reason: "gateway declared more than once",
                    });
                }
            }
        }

        Ok(Self {
            name: name.into(),
            floors,
            correction_rssi: BTreeMap::new(),
            attenuation_regions: Vec::new(),
            beacon_filter: None,
            gateway_floor,
        })
    }

    /// Set per-gateway RSSI offsets (dB), added to every reading
    pub fn with_corrections(mut self, corrections: BTreeMap<String, f64>) -> Self {
        self.correction_rssi = corrections;
        self
    }

    /// Set attenuation regions
    pub fn with_attenuation_regions(mut self, regions: Vec<AttenuationRegion>) -> Self {
        self.attenuation_regions = regions;
        self
    }

    /// Restrict processing to the listed beacons
    pub fn with_beacon_filter(mut self, beacons: Option<Vec<String>>) -> Self {
        self.beacon_filter = beacons;
        self
    }

    /// Site name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All floors in declaration order
    pub fn floors(&self) -> &[Floor] {
        &self.floors
    }

    /// A floor by id
    pub fn floor(&self, id: FloorId) -> Option<&Floor> {
        self.floors.get(id)
    }

    /// More than one floor declared
    pub fn is_multi_floor(&self) -> bool {
        self.floors.len() > 1
    }

    /// Floor a gateway is mounted on
    pub fn floor_of_gateway(&self, gateway_id: &str) -> Option<FloorId> {
        self.gateway_floor.get(gateway_id).copied()
    }

    /// Gateway by id, on whichever floor it lives
    pub fn gateway(&self, gateway_id: &str) -> Option<&Gateway> {
        let floor = self.floor_of_gateway(gateway_id)?;
        self.floors[floor].gateway(gateway_id)
    }

    /// RSSI offset for a gateway (0 when none configured)
    pub fn correction_for(&self, gateway_id: &str) -> f64 {
        self.correction_rssi.get(gateway_id).copied().unwrap_or(0.0)
    }

    /// Attenuation regions (global, not floor scoped)
    pub fn attenuation_regions(&self) -> &[AttenuationRegion] {
        &self.attenuation_regions
    }

    /// Whether the allow-list admits this beacon (no list admits all)
    pub fn accepts_beacon(&self, beacon_id: &str) -> bool {
        match &self.beacon_filter {
            Some(allowed) => allowed.iter().any(|b| b == beacon_id),
            None => true,
        }
    }

    /// Number of gateways configured on each floor
    pub fn gateway_counts(&self) -> BTreeMap<FloorId, usize> {
        self.floors
            .iter()
            .enumerate()
            .map(|(id, floor)| (id, floor.gateways.len()))
            .collect()
    }
}
