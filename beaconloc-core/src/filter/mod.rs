//! Signal Filter Pipeline
//!
//! Turns the trailing RSSI window of one (beacon, gateway) pair into a single
//! representative value for the tick:
//!
//! ```text
//! last 10 samples ─→ Kalman (constant velocity) ─→ zero-phase Butterworth
//!                 ─→ mean of the last 5 outputs ─→ FilteredSignal
//! ```
//!
//! Every stage is a pure function of its input window. Nothing is carried
//! from one tick to the next, so the same window always filters to the same
//! value.
//!
//! ## Short windows
//!
//! - A pair with fewer than `min_samples` readings produces no signal and the
//!   gateway is left out of the tick.
//! - The Butterworth stage passes short series through unchanged (see
//!   [`butterworth`]).

use crate::constants::signal::{
    BUTTERWORTH_CUTOFF, BUTTERWORTH_ORDER, FILTER_INPUT_WINDOW, FILTER_OUTPUT_WINDOW,
    KALMAN_MEASUREMENT_NOISE, KALMAN_PROCESS_NOISE_SCALE, MULTI_FLOOR_MIN_SAMPLES,
};

pub mod butterworth;
pub mod kalman;
pub mod matrix;

pub use butterworth::{butterworth_filtfilt, LowPass};
pub use kalman::{kalman_smooth, KalmanConfig, KalmanFilter};

/// Two-stage smoothing of one gateway's RSSI series
#[derive(Debug, Clone, PartialEq)]
pub struct SignalFilter {
    measurement_noise: f64,
    process_noise: f64,
    low_pass: LowPass,
    input_window: usize,
    output_window: usize,
    min_samples: usize,
}

impl Default for SignalFilter {
    fn default() -> Self {
        Self {
            measurement_noise: KALMAN_MEASUREMENT_NOISE,
            process_noise: KALMAN_PROCESS_NOISE_SCALE,
            low_pass: LowPass::new(BUTTERWORTH_ORDER, BUTTERWORTH_CUTOFF),
            input_window: FILTER_INPUT_WINDOW,
            output_window: FILTER_OUTPUT_WINDOW,
            min_samples: MULTI_FLOOR_MIN_SAMPLES,
        }
    }
}

impl SignalFilter {
    /// Kalman noise parameters (measurement variance, process noise scale)
    pub fn with_kalman_noise(mut self, measurement: f64, process: f64) -> Self {
        self.measurement_noise = measurement;
        self.process_noise = process;
        self
    }

    /// Butterworth order and normalized cutoff
    pub fn with_low_pass(mut self, order: usize, cutoff: f64) -> Self {
        self.low_pass = LowPass::new(order, cutoff);
        self
    }

    /// Trailing samples fed to the filters and outputs averaged
    pub fn with_windows(mut self, input: usize, output: usize) -> Self {
        self.input_window = input.max(1);
        self.output_window = output.max(1);
        self
    }

    /// Fewest samples a gateway needs to produce a signal
    pub fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = min_samples.max(1);
        self
    }

    /// Configured sample floor
    pub fn min_samples(&self) -> usize {
        self.min_samples
    }

    /// Stage 1 then stage 2 over the trailing input window
    pub fn filter_series(&self, values: &[f64]) -> alloc::vec::Vec<f64> {
        let window = &values[values.len().saturating_sub(self.input_window)..];
        let smoothed = kalman_smooth(window, self.measurement_noise, self.process_noise);
        self.low_pass.apply(&smoothed)
    }

    /// Representative RSSI for the tick, `None` below the sample floor
    pub fn smooth(&self, values: &[f64]) -> Option<f64> {
        if values.len() < self.min_samples {
            return None;
        }

        let filtered = self.filter_series(values);
        let tail = &filtered[filtered.len().saturating_sub(self.output_window)..];
        if tail.is_empty() {
            return None;
        }
        Some(tail.iter().sum::<f64>() / tail.len() as f64)
    }
}
