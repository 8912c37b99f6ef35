//! Small dense matrix helpers
//!
//! Fixed-size operations use const generics over plain arrays so the Kalman
//! stage runs without heap allocation. [`solve`] works on runtime-sized
//! systems for the filter initial conditions, whose size depends on the
//! configured filter order.

use alloc::vec::Vec;

/// Matrix type using const generics
pub type Matrix<const R: usize, const C: usize> = [[f64; C]; R];

/// Square matrix type
pub type SquareMatrix<const N: usize> = Matrix<N, N>;

/// Vector type
pub type Vector<const N: usize> = [f64; N];

/// Pivot magnitude below which a system is treated as singular
const SINGULAR_PIVOT: f64 = 1e-12;

/// Identity matrix
pub fn identity<const N: usize>() -> SquareMatrix<N> {
    let mut m = [[0.0; N]; N];
    for (i, row) in m.iter_mut().enumerate() {
        row[i] = 1.0;
    }
    m
}

/// Matrix multiplication: C = A × B
///
/// Dimensions: A[R×K] × B[K×C] = C[R×C]
pub fn multiply<const R: usize, const K: usize, const C: usize>(
    a: &Matrix<R, K>,
    b: &Matrix<K, C>,
) -> Matrix<R, C> {
    let mut result = [[0.0; C]; R];
    for i in 0..R {
        for j in 0..C {
            for k in 0..K {
                result[i][j] += a[i][k] * b[k][j];
            }
        }
    }
    result
}

/// Matrix transpose: B = Aᵀ
pub fn transpose<const R: usize, const C: usize>(a: &Matrix<R, C>) -> Matrix<C, R> {
    let mut result = [[0.0; R]; C];
    for i in 0..R {
        for j in 0..C {
            result[j][i] = a[i][j];
        }
    }
    result
}

/// Matrix addition: C = A + B
pub fn add<const R: usize, const C: usize>(a: &Matrix<R, C>, b: &Matrix<R, C>) -> Matrix<R, C> {
    let mut result = *a;
    for i in 0..R {
        for j in 0..C {
            result[i][j] += b[i][j];
        }
    }
    result
}

/// Make matrix symmetric: A = (A + Aᵀ) / 2
///
/// Keeps covariance matrices symmetric against rounding drift
pub fn make_symmetric<const N: usize>(matrix: &mut SquareMatrix<N>) {
    for i in 0..N {
        for j in i + 1..N {
            let avg = (matrix[i][j] + matrix[j][i]) * 0.5;
            matrix[i][j] = avg;
            matrix[j][i] = avg;
        }
    }
}

/// Matrix-vector multiplication: y = A × x
pub fn matvec<const R: usize, const C: usize>(matrix: &Matrix<R, C>, vector: &Vector<C>) -> Vector<R> {
    let mut result = [0.0; R];
    for i in 0..R {
        for j in 0..C {
            result[i] += matrix[i][j] * vector[j];
        }
    }
    result
}

/// Matrix inversion using Gauss-Jordan elimination with partial pivoting
///
/// Returns `None` if the matrix is singular
pub fn invert<const N: usize>(a: &SquareMatrix<N>) -> Option<SquareMatrix<N>> {
    let mut work = *a;
    let mut inv = identity::<N>();

    for k in 0..N {
        let pivot_row = (k..N).max_by(|&i, &j| {
            libm::fabs(work[i][k])
                .partial_cmp(&libm::fabs(work[j][k]))
                .unwrap_or(core::cmp::Ordering::Equal)
        })?;
        if libm::fabs(work[pivot_row][k]) < SINGULAR_PIVOT {
            return None;
        }
        work.swap(k, pivot_row);
        inv.swap(k, pivot_row);

        let pivot = work[k][k];
        for j in 0..N {
            work[k][j] /= pivot;
            inv[k][j] /= pivot;
        }

        for i in 0..N {
            if i != k {
                let factor = work[i][k];
                let (pivot_work, pivot_inv) = (work[k], inv[k]);
                for j in 0..N {
                    work[i][j] -= factor * pivot_work[j];
                    inv[i][j] -= factor * pivot_inv[j];
                }
            }
        }
    }

    Some(inv)
}

/// Solve the runtime-sized system `A·x = b` by Gaussian elimination
///
/// `a` is row-major with `b.len()` rows of `b.len()` columns. Returns `None`
/// for a singular or malformed system.
pub fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    if a.len() != n || a.iter().any(|row| row.len() != n) {
        return None;
    }

    for k in 0..n {
        let mut pivot_row = k;
        for i in k + 1..n {
            if libm::fabs(a[i][k]) > libm::fabs(a[pivot_row][k]) {
                pivot_row = i;
            }
        }
        if libm::fabs(a[pivot_row][k]) < SINGULAR_PIVOT {
            return None;
        }
        a.swap(k, pivot_row);
        b.swap(k, pivot_row);

        let pivot = a[k].clone();
        let pivot_b = b[k];
        for i in k + 1..n {
            let factor = a[i][k] / pivot[k];
            for j in k..n {
                a[i][j] -= factor * pivot[j];
            }
            b[i] -= factor * pivot_b;
        }
    }

    let mut x = alloc::vec![0.0; n];
    for i in (0..n).rev() {
        let tail: f64 = (i + 1..n).map(|j| a[i][j] * x[j]).sum();
        x[i] = (b[i] - tail) / a[i][i];
    }
    Some(x)
}
