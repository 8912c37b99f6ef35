//! Zero-phase Butterworth low-pass stage
//!
//! ## Design
//!
//! The digital filter is the bilinear transform of an analog Butterworth
//! prototype, built as cascaded second-order sections (plus one first-order
//! section for odd orders) and multiplied out into transfer-function form.
//! The cutoff is normalized to Nyquist (`0 < wn < 1`) and prewarped with
//! `K = tan(π·wn/2)`. Pole pair `k` of an order-`N` prototype has
//! `1/Q = 2·sin((2k+1)·π/(2N))`.
//!
//! ## Zero-phase filtering
//!
//! [`filtfilt`] runs the filter forward and then backward so the output has
//! no group delay relative to the input. Edges are handled by odd extension
//! of `3·(order+1)` samples on each side and by starting both passes from the
//! steady-state initial conditions of [`lfilter_zi`] scaled to the first
//! sample of the pass.
//!
//! ## Short windows
//!
//! Below `max(3·order, 10)` samples, or when the series is not longer than
//! the edge padding, the input is returned unchanged.

use alloc::vec::Vec;
use core::f64::consts::PI;

use crate::constants::signal::{BUTTERWORTH_CUTOFF, BUTTERWORTH_MIN_SAMPLES_FLOOR, BUTTERWORTH_ORDER};

use super::matrix::solve;

/// Transfer-function coefficients, `a[0] == 1`
#[derive(Debug, Clone, PartialEq)]
pub struct Coefficients {
    /// Numerator
    pub b: Vec<f64>,
    /// Denominator
    pub a: Vec<f64>,
}

/// Design an order-`order` low-pass Butterworth filter with cutoff `wn`
///
/// Returns `None` for order 0 or a cutoff outside `(0, 1)`.
pub fn design_lowpass(order: usize, wn: f64) -> Option<Coefficients> {
    if order == 0 || !(wn > 0.0 && wn < 1.0) {
        return None;
    }

    let k = libm::tan(PI * wn / 2.0);
    let k2 = k * k;

    let mut b = alloc::vec![1.0];
    let mut a = alloc::vec![1.0];

    for pair in 0..order / 2 {
        let theta = (2 * pair + 1) as f64 * PI / (2 * order) as f64;
        let inv_q = 2.0 * libm::sin(theta);
        let norm = 1.0 / (1.0 + k * inv_q + k2);

        let b0 = k2 * norm;
        b = poly_mul(&b, &[b0, 2.0 * b0, b0]);
        a = poly_mul(&a, &[1.0, 2.0 * (k2 - 1.0) * norm, (1.0 - k * inv_q + k2) * norm]);
    }

    if order % 2 == 1 {
        let norm = 1.0 / (1.0 + k);
        b = poly_mul(&b, &[k * norm, k * norm]);
        a = poly_mul(&a, &[1.0, (k - 1.0) * norm]);
    }

    Some(Coefficients { b, a })
}

fn poly_mul(p: &[f64], q: &[f64]) -> Vec<f64> {
    let mut out = alloc::vec![0.0; p.len() + q.len() - 1];
    for (i, pi) in p.iter().enumerate() {
        for (j, qj) in q.iter().enumerate() {
            out[i + j] += pi * qj;
        }
    }
    out
}

/// Steady-state filter state for a unit step input
///
/// Solves `(I - Aᵀ)·zi = b[1:] - a[1:]·b[0]` where `A` is the companion
/// matrix of `a`.
pub fn lfilter_zi(coeffs: &Coefficients) -> Option<Vec<f64>> {
    let Coefficients { b, a } = coeffs;
    let n = a.len().max(b.len());
    if n < 2 {
        return Some(Vec::new());
    }
    let a = padded(a, n);
    let b = padded(b, n);

    let m = n - 1;
    let mut system = alloc::vec![alloc::vec![0.0; m]; m];
    for (i, row) in system.iter_mut().enumerate() {
        row[i] += 1.0;
        row[0] += a[i + 1];
        if i + 1 < m {
            row[i + 1] -= 1.0;
        }
    }
    let rhs = (0..m).map(|i| b[i + 1] - a[i + 1] * b[0]).collect();
    solve(system, rhs)
}

fn padded(v: &[f64], n: usize) -> Vec<f64> {
    let mut out = v.to_vec();
    out.resize(n, 0.0);
    out
}

/// Direct form II transposed filter pass, state `zi` updated in place
pub fn lfilter(coeffs: &Coefficients, x: &[f64], zi: &mut [f64]) -> Vec<f64> {
    let n = coeffs.a.len().max(coeffs.b.len());
    let a = padded(&coeffs.a, n);
    let b = padded(&coeffs.b, n);

    x.iter()
        .map(|&xi| {
            let y = b[0] * xi + zi.first().copied().unwrap_or(0.0);
            for i in 0..zi.len() {
                let next = zi.get(i + 1).copied().unwrap_or(0.0);
                zi[i] = b[i + 1] * xi + next - a[i + 1] * y;
            }
            y
        })
        .collect()
}

/// Edge padding used by [`filtfilt`]
pub fn pad_length(coeffs: &Coefficients) -> usize {
    3 * coeffs.a.len().max(coeffs.b.len())
}

/// Zero-phase forward/backward filtering with odd edge extension
///
/// Returns the input unchanged when it is not longer than the padding.
pub fn filtfilt(coeffs: &Coefficients, x: &[f64]) -> Vec<f64> {
    let pad = pad_length(coeffs);
    if x.len() <= pad {
        return x.to_vec();
    }
    let Some(zi) = lfilter_zi(coeffs) else {
        return x.to_vec();
    };

    let ext = odd_extend(x, pad);

    let mut state: Vec<f64> = zi.iter().map(|z| z * ext[0]).collect();
    let mut y = lfilter(coeffs, &ext, &mut state);

    y.reverse();
    let mut state: Vec<f64> = zi.iter().map(|z| z * y[0]).collect();
    let mut y = lfilter(coeffs, &y, &mut state);
    y.reverse();

    y[pad..y.len() - pad].to_vec()
}

/// Design a low-pass of `order` and normalized `cutoff`, then `filtfilt` it
///
/// An invalid design returns the input unchanged.
pub fn butterworth_filtfilt(x: &[f64], order: usize, cutoff: f64) -> Vec<f64> {
    match design_lowpass(order, cutoff) {
        Some(coeffs) => filtfilt(&coeffs, x),
        None => x.to_vec(),
    }
}

/// `2·x[0] - x[pad..0]`, `x`, `2·x[last] - x[last-1..last-pad]`
fn odd_extend(x: &[f64], pad: usize) -> Vec<f64> {
    let first = x[0];
    let last = x[x.len() - 1];
    let mut ext = Vec::with_capacity(x.len() + 2 * pad);
    ext.extend((1..=pad).rev().map(|i| 2.0 * first - x[i]));
    ext.extend_from_slice(x);
    ext.extend((1..=pad).map(|i| 2.0 * last - x[x.len() - 1 - i]));
    ext
}

/// Low-pass stage as the signal pipeline applies it
#[derive(Debug, Clone, PartialEq)]
pub struct LowPass {
    order: usize,
    coeffs: Option<Coefficients>,
}

impl Default for LowPass {
    fn default() -> Self {
        Self::new(BUTTERWORTH_ORDER, BUTTERWORTH_CUTOFF)
    }
}

impl LowPass {
    /// Low-pass of the given order and normalized cutoff
    ///
    /// An invalid design turns the stage into a pass-through.
    pub fn new(order: usize, cutoff: f64) -> Self {
        Self {
            order,
            coeffs: design_lowpass(order, cutoff),
        }
    }

    /// Fewest samples the stage filters; shorter input passes through
    pub fn min_samples(&self) -> usize {
        (3 * self.order).max(BUTTERWORTH_MIN_SAMPLES_FLOOR)
    }

    /// Designed coefficients, if the parameters were valid
    pub fn coefficients(&self) -> Option<&Coefficients> {
        self.coeffs.as_ref()
    }

    /// Filter a series
    pub fn apply(&self, values: &[f64]) -> Vec<f64> {
        match &self.coeffs {
            Some(coeffs) if values.len() >= self.min_samples() => filtfilt(coeffs, values),
            _ => values.to_vec(),
        }
    }
}
