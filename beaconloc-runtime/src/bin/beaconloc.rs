//! # beaconloc
//!
//! Periodic BLE beacon localization over a reading store.
//!
//! ```text
//! beaconloc --list
//! beaconloc --preset office --once
//! beaconloc --preset house --store data/data.json --output data/positions.json
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use beaconloc_runtime::{
    DeploymentWatcher, EstimationService, PresetCatalog, ReadingStore, ServiceConfig,
};
use clap::Parser;
use tokio::sync::watch;

/// How often the preset catalogue is checked for changes
const PRESET_POLL_PERIOD: Duration = Duration::from_secs(2);

#[derive(Parser)]
#[command(name = "beaconloc")]
#[command(version, about = "Indoor BLE beacon localization from gateway RSSI readings")]
struct Cli {
    /// Preset catalogue (JSON).
    #[arg(short, long, default_value = "data/presets.json")]
    presets: PathBuf,

    /// Preset key to run.
    #[arg(short = 'k', long)]
    preset: Option<String>,

    /// Reading store written by the ingestion side.
    #[arg(short, long, default_value = "data/data.json")]
    store: PathBuf,

    /// Write each tick's positions to this file.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Tick period in milliseconds.  Defaults to 4000 for one floor, 3000
    /// for several.
    #[arg(short, long)]
    interval_ms: Option<u64>,

    /// Empty the reading store before starting.
    #[arg(long)]
    clear_store: bool,

    /// Run a single tick, print it and exit.
    #[arg(long)]
    once: bool,

    /// List presets and exit.
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let catalog = PresetCatalog::load(&cli.presets)
        .with_context(|| format!("loading presets from {}", cli.presets.display()))?;

    if cli.list {
        for key in catalog.keys() {
            let status = match catalog.validate_assets(key) {
                Ok(missing) if missing.is_empty() => "ok".to_string(),
                Ok(missing) => format!("{} image(s) missing", missing.len()),
                Err(e) => format!("invalid: {e}"),
            };
            println!("{key:<20} {:<32} {status}", catalog.name(key).unwrap_or(""));
        }
        return Ok(());
    }

    let Some(preset) = cli.preset else {
        bail!("--preset is required (see --list)");
    };
    catalog.validate_assets(&preset)?;

    let (watcher, deployment) = DeploymentWatcher::new(&cli.presets, &preset)
        .with_context(|| format!("loading preset '{preset}'"))?;

    let mut config = ServiceConfig::for_deployment(&deployment.borrow());
    if let Some(ms) = cli.interval_ms {
        config = config.with_interval(Duration::from_millis(ms.max(1)));
    }
    if let Some(path) = &cli.output {
        config = config.with_output(path);
    }

    let store = ReadingStore::new(&cli.store);
    if cli.clear_store {
        store.clear().context("clearing reading store")?;
        log::info!("reading store {} cleared", store.path().display());
    }

    let mut service = EstimationService::new(store, deployment, config);

    if cli.once {
        let report = service.tick().await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    // ── Run until Ctrl-C ────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let watcher_task = tokio::spawn(watcher.run(PRESET_POLL_PERIOD, shutdown_rx.clone()));
    let service_task = tokio::spawn(service.run(shutdown_rx));

    tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
    log::info!("Interrupt received, shutting down");
    let _ = shutdown_tx.send(true);

    let ticks = service_task.await?;
    watcher_task.await?;
    log::info!("Done after {ticks} ticks.");
    Ok(())
}
