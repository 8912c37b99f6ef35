//! Persisted reading store
//!
//! The ingestion side and the estimation side only meet through a JSON
//! array of readings on disk:
//!
//! ```json
//! [
//!   { "time": "2024-05-01T12:00:00.123456", "beacon": "tag-1", "rssi": -71, "median": -70.5, "source": "gw-1" },
//!   { "time": 1714564800123, "beacon": "tag-1", "rssi": -68, "source": "gw-2" }
//! ]
//! ```
//!
//! `time` is a naive ISO-8601 timestamp (taken as UTC) or milliseconds since
//! the epoch. `median` is optional and defaults to `rssi`.
//!
//! ## Consistency
//!
//! Every write serializes the full array to a temporary file in the store's
//! directory and renames it over the store, so a reader sees either the old
//! or the new array, never a truncated one. Appends are read-modify-write
//! and are not coordinated between writers.
//!
//! A missing or empty file is an empty store. A file that does not parse is
//! logged and read as empty, so one bad write cannot stop estimation.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use beaconloc_core::{Reading, Timestamp};
use chrono::{DateTime, NaiveDateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{RuntimeError, RuntimeResult};

/// Reading time as written by the ingestion side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReadingTime {
    /// Milliseconds since the Unix epoch
    Millis(u64),
    /// ISO-8601, naive (UTC) or with an offset
    Iso(String),
}

impl ReadingTime {
    /// Current time, in the ingestion side's ISO format
    pub fn now() -> Self {
        Self::Iso(Utc::now().naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f").to_string())
    }

    /// Milliseconds since the Unix epoch
    pub fn to_millis(&self) -> RuntimeResult<Timestamp> {
        match self {
            Self::Millis(ms) => Ok(*ms),
            Self::Iso(text) => {
                let millis = match DateTime::parse_from_rfc3339(text) {
                    Ok(dt) => dt.timestamp_millis(),
                    Err(_) => text
                        .parse::<NaiveDateTime>()
                        .map_err(|_| RuntimeError::InvalidTimestamp(text.clone()))?
                        .and_utc()
                        .timestamp_millis(),
                };
                Timestamp::try_from(millis).map_err(|_| RuntimeError::InvalidTimestamp(text.clone()))
            }
        }
    }
}

/// One stored reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReading {
    pub time: ReadingTime,
    pub beacon: String,
    pub rssi: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub median: Option<f64>,
    pub source: String,
}

impl StoredReading {
    /// Engine view of this reading
    pub fn to_reading(&self) -> RuntimeResult<Reading> {
        let mut reading = Reading::new(
            self.beacon.as_str(),
            self.source.as_str(),
            self.rssi,
            self.time.to_millis()?,
        );
        reading.smoothed_rssi = self.median;
        Ok(reading)
    }
}

impl From<&Reading> for StoredReading {
    fn from(reading: &Reading) -> Self {
        Self {
            time: ReadingTime::Millis(reading.timestamp),
            beacon: reading.beacon_id.clone(),
            rssi: reading.rssi,
            median: reading.smoothed_rssi,
            source: reading.gateway_id.clone(),
        }
    }
}

/// JSON array of readings with atomic replace
#[derive(Debug, Clone)]
pub struct ReadingStore {
    path: PathBuf,
}

impl ReadingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Everything currently stored
    pub fn snapshot(&self) -> RuntimeResult<Vec<StoredReading>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str(&text) {
            Ok(readings) => Ok(readings),
            Err(e) => {
                warn!("unreadable store {}: {e}", self.path.display());
                Ok(Vec::new())
            }
        }
    }

    /// Snapshot converted for the engine; readings with bad timestamps are skipped
    pub fn readings(&self) -> RuntimeResult<Vec<Reading>> {
        let stored = self.snapshot()?;
        let mut readings = Vec::with_capacity(stored.len());
        for entry in &stored {
            match entry.to_reading() {
                Ok(reading) => readings.push(reading),
                Err(e) => warn!("skipping reading of {} from {}: {e}", entry.beacon, entry.source),
            }
        }
        Ok(readings)
    }

    /// Add readings at the end
    pub fn append(&self, batch: &[StoredReading]) -> RuntimeResult<()> {
        let mut all = self.snapshot()?;
        all.extend_from_slice(batch);
        self.replace(&all)
    }

    /// Overwrite the whole store
    pub fn replace(&self, all: &[StoredReading]) -> RuntimeResult<()> {
        write_json_atomic(&self.path, all)
    }

    /// Empty the store
    pub fn clear(&self) -> RuntimeResult<()> {
        self.replace(&[])
    }
}

/// Serialize `value` next to `path`, then rename over it
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> RuntimeResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &bytes)
}

/// Write `bytes` next to `path`, then rename over it
pub fn write_atomic(path: &Path, bytes: &[u8]) -> RuntimeResult<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_and_millis_timestamps() {
        let naive = ReadingTime::Iso("2024-05-01T12:00:00.250".to_string());
        assert_eq!(naive.to_millis().unwrap(), 1_714_564_800_250);

        let offset = ReadingTime::Iso("2024-05-01T14:00:00+02:00".to_string());
        assert_eq!(offset.to_millis().unwrap(), 1_714_564_800_000);

        assert_eq!(ReadingTime::Millis(42).to_millis().unwrap(), 42);
        assert!(ReadingTime::Iso("yesterday".to_string()).to_millis().is_err());
        assert!(ReadingTime::now().to_millis().is_ok());
    }

    #[test]
    fn wire_shape() {
        let json = r#"[
            {"time": "2024-05-01T12:00:00", "beacon": "tag-1", "rssi": -71, "median": -70.5, "source": "gw-1"},
            {"time": 1714564800123, "beacon": "tag-1", "rssi": -68, "source": "gw-2"}
        ]"#;
        let stored: Vec<StoredReading> = serde_json::from_str(json).unwrap();
        assert_eq!(stored[0].median, Some(-70.5));
        assert_eq!(stored[1].time, ReadingTime::Millis(1_714_564_800_123));

        let reading = stored[1].to_reading().unwrap();
        assert_eq!(reading.gateway_id, "gw-2");
        assert_eq!(reading.signal(), -68.0);
        assert_eq!(stored[0].to_reading().unwrap().signal(), -70.5);
    }
}
