//! Periodic estimation
//!
//! ## Tick
//!
//! 1. Snapshot the reading store on a blocking thread
//! 2. Take the current deployment from the watch channel
//! 3. Localize every admitted beacon on its own blocking task
//! 4. Collect the reports in beacon order, publish and optionally write them
//!
//! Beacons share nothing but the read-only deployment and engine config, so
//! step 3 runs them in parallel. A tick that overruns its interval delays the
//! next one; missed ticks are skipped, not queued.
//!
//! ## Cadence
//!
//! Defaults follow the deployment kind: 4 s for a single floor, 3 s for
//! several floors.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use beaconloc_core::{reading::group_by_beacon, BeaconReport, Deployment, EngineConfig, Localizer, Reading};
use chrono::Utc;
use log::{debug, error, info, warn};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use crate::error::RuntimeResult;
use crate::store::{write_atomic, ReadingStore};

/// Tick period for single-floor deployments
pub const SINGLE_FLOOR_INTERVAL: Duration = Duration::from_millis(4000);

/// Tick period for multi-floor deployments
pub const MULTI_FLOOR_INTERVAL: Duration = Duration::from_millis(3000);

/// Service tunables
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Time between ticks
    pub interval: Duration,
    /// Engine tunables shared by every beacon task
    pub engine: EngineConfig,
    /// Where to write each tick's report as JSON
    pub output: Option<PathBuf>,
}

impl ServiceConfig {
    /// Defaults for a deployment kind
    pub fn for_deployment(deployment: &Deployment) -> Self {
        Self {
            interval: if deployment.is_multi_floor() {
                MULTI_FLOOR_INTERVAL
            } else {
                SINGLE_FLOOR_INTERVAL
            },
            engine: EngineConfig::default(),
            output: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }
}

/// Result of one tick
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    /// Tick number, from 1
    pub tick: u64,
    /// RFC 3339 time the tick finished
    pub generated_at: String,
    /// Deployment name
    pub deployment: String,
    /// Readings in the snapshot
    pub readings: usize,
    /// One report per admitted beacon, by beacon id
    pub beacons: Vec<BeaconReport>,
}

impl TickReport {
    /// Beacons with a position
    pub fn located(&self) -> usize {
        self.beacons.iter().filter(|b| b.is_located()).count()
    }

    /// Report of one beacon
    pub fn beacon(&self, beacon_id: &str) -> Option<&BeaconReport> {
        self.beacons.iter().find(|b| b.estimate.beacon_id == beacon_id)
    }
}

/// Drives the engine over the reading store
pub struct EstimationService {
    store: ReadingStore,
    deployment: watch::Receiver<Arc<Deployment>>,
    engine: Arc<EngineConfig>,
    interval: Duration,
    output: Option<PathBuf>,
    reports: Option<mpsc::Sender<TickReport>>,
    ticks: u64,
}

impl EstimationService {
    pub fn new(
        store: ReadingStore,
        deployment: watch::Receiver<Arc<Deployment>>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            store,
            deployment,
            engine: Arc::new(config.engine),
            interval: config.interval,
            output: config.output,
            reports: None,
            ticks: 0,
        }
    }

    /// Publish every tick's report on `tx`
    pub fn with_reports(mut self, tx: mpsc::Sender<TickReport>) -> Self {
        self.reports = Some(tx);
        self
    }

    /// Ticks completed so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run one estimation pass
    pub async fn tick(&mut self) -> RuntimeResult<TickReport> {
        let store = self.store.clone();
        let readings = tokio::task::spawn_blocking(move || store.readings()).await??;
        let deployment = Arc::clone(&self.deployment.borrow());

        let groups: Vec<(String, Vec<Reading>)> = group_by_beacon(&readings, &deployment)
            .into_iter()
            .map(|(beacon, group)| (beacon.to_string(), group.into_iter().cloned().collect()))
            .collect();

        let mut tasks = JoinSet::new();
        for (beacon, group) in groups {
            let deployment = Arc::clone(&deployment);
            let engine = Arc::clone(&self.engine);
            tasks.spawn_blocking(move || {
                let refs: Vec<&Reading> = group.iter().collect();
                Localizer::new(&deployment, &engine).locate_beacon(&beacon, &refs)
            });
        }

        let mut beacons = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => beacons.push(report),
                Err(e) => error!("beacon task failed: {e}"),
            }
        }
        beacons.sort_by(|a, b| a.estimate.beacon_id.cmp(&b.estimate.beacon_id));

        self.ticks += 1;
        let report = TickReport {
            tick: self.ticks,
            generated_at: Utc::now().to_rfc3339(),
            deployment: deployment.name().to_string(),
            readings: readings.len(),
            beacons,
        };
        info!(
            "tick {}: {} readings, {}/{} beacons located",
            report.tick,
            report.readings,
            report.located(),
            report.beacons.len()
        );

        if let Some(path) = self.output.clone() {
            let bytes = serde_json::to_vec_pretty(&report)?;
            tokio::task::spawn_blocking(move || write_atomic(&path, &bytes)).await??;
        }

        if let Some(tx) = &self.reports {
            if tx.send(report.clone()).await.is_err() {
                debug!("report receiver closed");
            }
        }

        Ok(report)
    }

    /// Tick on the configured interval until `shutdown` turns true
    ///
    /// Returns the number of ticks run. A failed tick is logged and the
    /// loop carries on.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> u64 {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("estimation every {} ms", self.interval.as_millis());

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        warn!("tick failed: {e}");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("estimation stopped after {} ticks", self.ticks);
        self.ticks
    }
}
