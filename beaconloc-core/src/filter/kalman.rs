//! Kalman Filter Stage
//!
//! ## Overview
//!
//! First stage of the signal pipeline: a linear Kalman filter run over the
//! trailing RSSI window of one (beacon, gateway) pair. RSSI is modelled as a
//! constant-velocity process so that a beacon walking away from a gateway is
//! tracked instead of lagged.
//!
//! ## Kalman Filter Theory
//!
//! ### 1. Prediction Step
//! ```text
//! State prediction:      x̂ₖ|ₖ₋₁ = F·xₖ₋₁
//! Covariance prediction: Pₖ|ₖ₋₁ = F·Pₖ₋₁·Fᵀ + Q
//! ```
//!
//! ### 2. Update Step
//! ```text
//! Innovation:      yₖ = zₖ - H·x̂ₖ|ₖ₋₁
//! Innovation cov:  Sₖ = H·Pₖ|ₖ₋₁·Hᵀ + R
//! Kalman gain:     Kₖ = Pₖ|ₖ₋₁·Hᵀ·Sₖ⁻¹
//! State update:    x̂ₖ = x̂ₖ|ₖ₋₁ + Kₖ·yₖ
//! Covariance:      Pₖ = (I - Kₖ·H)·Pₖ|ₖ₋₁·(I - Kₖ·H)ᵀ + Kₖ·R·Kₖᵀ
//! ```
//!
//! The covariance update uses the Joseph form and re-symmetrizes after each
//! step, so P stays positive definite even with the large initial
//! uncertainty the RSSI model starts from.
//!
//! ## RSSI Model
//!
//! ```text
//! x = [rssi, rssi rate]     F = [[1, 1], [0, 1]]     H = [[1, 0]]
//! P₀ = 1000·I               Q = 0.02·I               R = 17
//! ```
//!
//! The state starts at the first sample of the window; each sample is one
//! step regardless of its timestamp.

use alloc::vec::Vec;

use crate::constants::signal::{
    KALMAN_INITIAL_UNCERTAINTY, KALMAN_MEASUREMENT_NOISE, KALMAN_PROCESS_NOISE_SCALE,
};

use super::matrix::{
    add, identity, invert, make_symmetric, matvec, multiply, transpose, Matrix, SquareMatrix,
    Vector,
};

/// Kalman filter configuration
#[derive(Debug, Clone, PartialEq)]
pub struct KalmanConfig<const N: usize, const M: usize> {
    /// Initial state estimate
    pub initial_state: Vector<N>,
    /// Initial covariance (uncertainty)
    pub initial_covariance: SquareMatrix<N>,
    /// Process noise covariance (Q)
    pub process_noise: SquareMatrix<N>,
    /// Measurement noise covariance (R)
    pub measurement_noise: SquareMatrix<M>,
    /// State transition matrix (F)
    pub transition: SquareMatrix<N>,
    /// Measurement matrix (H) - maps state to measurements
    pub measurement_matrix: Matrix<M, N>,
}

impl<const N: usize, const M: usize> Default for KalmanConfig<N, M> {
    fn default() -> Self {
        let mut measurement_matrix = [[0.0; N]; M];
        for (i, row) in measurement_matrix.iter_mut().enumerate().take(N) {
            row[i] = 1.0;
        }

        Self {
            initial_state: [0.0; N],
            initial_covariance: identity::<N>(),
            process_noise: scaled_identity::<N>(0.01),
            measurement_noise: scaled_identity::<M>(0.1),
            transition: identity::<N>(),
            measurement_matrix,
        }
    }
}

impl<const N: usize, const M: usize> KalmanConfig<N, M> {
    /// Set process noise to `scale`·I (higher = less trust in the model)
    pub fn with_process_noise(mut self, scale: f64) -> Self {
        self.process_noise = scaled_identity::<N>(scale);
        self
    }

    /// Set measurement noise variance for each measurement channel
    pub fn with_measurement_noise(mut self, variance: [f64; M]) -> Self {
        self.measurement_noise = [[0.0; M]; M];
        for (i, v) in variance.iter().enumerate() {
            self.measurement_noise[i][i] = *v;
        }
        self
    }

    /// Set initial covariance to `scale`·I
    pub fn with_initial_uncertainty(mut self, scale: f64) -> Self {
        self.initial_covariance = scaled_identity::<N>(scale);
        self
    }

    /// Set the starting state
    pub fn with_initial_state(mut self, state: Vector<N>) -> Self {
        self.initial_state = state;
        self
    }

    /// Set the state transition matrix
    pub fn with_transition(mut self, transition: SquareMatrix<N>) -> Self {
        self.transition = transition;
        self
    }

    /// Set the measurement matrix
    pub fn with_measurement_matrix(mut self, h: Matrix<M, N>) -> Self {
        self.measurement_matrix = h;
        self
    }
}

impl KalmanConfig<2, 1> {
    /// Constant-velocity RSSI model starting at `initial_rssi`
    pub fn rssi(initial_rssi: f64, measurement_noise: f64, process_noise: f64) -> Self {
        Self::default()
            .with_initial_state([initial_rssi, 0.0])
            .with_initial_uncertainty(KALMAN_INITIAL_UNCERTAINTY)
            .with_transition([[1.0, 1.0], [0.0, 1.0]])
            .with_measurement_matrix([[1.0, 0.0]])
            .with_measurement_noise([measurement_noise])
            .with_process_noise(process_noise)
    }
}

fn scaled_identity<const N: usize>(scale: f64) -> SquareMatrix<N> {
    let mut m = identity::<N>();
    for (i, row) in m.iter_mut().enumerate() {
        row[i] *= scale;
    }
    m
}

/// Kalman filter for state estimation
///
/// ## Type Parameters
/// - `N`: State vector dimension
/// - `M`: Measurement vector dimension
#[derive(Debug, Clone)]
pub struct KalmanFilter<const N: usize, const M: usize> {
    state: Vector<N>,
    covariance: SquareMatrix<N>,
    config: KalmanConfig<N, M>,
    update_count: u32,
}

impl<const N: usize, const M: usize> KalmanFilter<N, M> {
    /// Create new Kalman filter with configuration
    pub fn new(config: KalmanConfig<N, M>) -> Self {
        Self {
            state: config.initial_state,
            covariance: config.initial_covariance,
            config,
            update_count: 0,
        }
    }

    /// Advance one step: x = F·x, P = F·P·Fᵀ + Q
    pub fn predict(&mut self) {
        let f = &self.config.transition;
        self.state = matvec(f, &self.state);

        let fp = multiply(f, &self.covariance);
        let fpft = multiply(&fp, &transpose(f));
        self.covariance = add(&fpft, &self.config.process_noise);
        make_symmetric(&mut self.covariance);
    }

    /// Fold in a measurement
    ///
    /// Returns `false` and leaves the state untouched when the innovation
    /// covariance is singular.
    pub fn update(&mut self, measurement: &Vector<M>) -> bool {
        let h = &self.config.measurement_matrix;
        let h_t = transpose(h);

        let predicted = matvec(h, &self.state);
        let mut innovation = [0.0; M];
        for i in 0..M {
            innovation[i] = measurement[i] - predicted[i];
        }

        // S = H·P·Hᵀ + R
        let hp = multiply(h, &self.covariance);
        let s = add(&multiply(&hp, &h_t), &self.config.measurement_noise);
        let Some(s_inv) = invert(&s) else {
            return false;
        };

        // K = P·Hᵀ·S⁻¹
        let gain = multiply(&multiply(&self.covariance, &h_t), &s_inv);

        let correction = matvec(&gain, &innovation);
        for i in 0..N {
            self.state[i] += correction[i];
        }

        self.joseph_form_update(&gain);
        self.update_count += 1;
        true
    }

    /// P = (I - K·H)·P·(I - K·H)ᵀ + K·R·Kᵀ
    fn joseph_form_update(&mut self, gain: &Matrix<N, M>) {
        let kh = multiply(gain, &self.config.measurement_matrix);
        let mut i_kh = identity::<N>();
        for i in 0..N {
            for j in 0..N {
                i_kh[i][j] -= kh[i][j];
            }
        }

        let left = multiply(&multiply(&i_kh, &self.covariance), &transpose(&i_kh));
        let krk = multiply(
            &multiply(gain, &self.config.measurement_noise),
            &transpose(gain),
        );
        self.covariance = add(&left, &krk);
        make_symmetric(&mut self.covariance);
    }

    /// Current state estimate
    pub fn state(&self) -> &Vector<N> {
        &self.state
    }

    /// Diagonal of the covariance (variances)
    pub fn uncertainty(&self) -> Vector<N> {
        let mut variances = [0.0; N];
        for (i, v) in variances.iter_mut().enumerate() {
            *v = self.covariance[i][i];
        }
        variances
    }

    /// Number of measurements folded in
    pub fn update_count(&self) -> u32 {
        self.update_count
    }

    /// Back to the configured initial conditions
    pub fn reset(&mut self) {
        self.state = self.config.initial_state;
        self.covariance = self.config.initial_covariance;
        self.update_count = 0;
    }
}

/// Run the RSSI Kalman model over a series, one output per input
///
/// Empty input gives empty output.
pub fn kalman_smooth(values: &[f64], measurement_noise: f64, process_noise: f64) -> Vec<f64> {
    let Some(&first) = values.first() else {
        return Vec::new();
    };

    let mut kf = KalmanFilter::new(KalmanConfig::rssi(first, measurement_noise, process_noise));
    values
        .iter()
        .map(|&z| {
            kf.predict();
            kf.update(&[z]);
            kf.state()[0]
        })
        .collect()
}

/// [`kalman_smooth`] with the default noise parameters
pub fn kalman_smooth_default(values: &[f64]) -> Vec<f64> {
    kalman_smooth(values, KALMAN_MEASUREMENT_NOISE, KALMAN_PROCESS_NOISE_SCALE)
}
