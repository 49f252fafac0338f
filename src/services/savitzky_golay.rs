//! Savitzky-Golay smoothing
//!
//! Each point is replaced by the value of a least-squares polynomial fitted
//! over a window centered on it. The first and last half-windows are taken
//! from polynomials fitted to the first and last full windows, so the output
//! has the same length as the input and no padding is invented.

use ndarray::{Array1, Array2};

/// Smooths `values` with an odd `window` and polynomial `degree`.
///
/// Returns `None` when the filter cannot be applied: even or oversized
/// window, degree not below the window, or a singular fit.
pub fn savgol_filter(values: &[f64], window: usize, degree: usize) -> Option<Vec<f64>> {
    let n = values.len();
    if window % 2 == 0 || window > n || degree >= window {
        return None;
    }

    let half = window / 2;
    let hat = hat_matrix(window, degree)?;
    let mut smoothed = vec![0.0; n];

    // Interior points use the center row of the hat matrix
    for center in half..n - half {
        let segment = Array1::from(values[center - half..=center + half].to_vec());
        smoothed[center] = hat.row(half).dot(&segment);
    }

    // Leading edge: first window, rows before the center
    let head = Array1::from(values[..window].to_vec());
    for (i, value) in smoothed.iter_mut().enumerate().take(half) {
        *value = hat.row(i).dot(&head);
    }

    // Trailing edge: last window, rows after the center
    let tail = Array1::from(values[n - window..].to_vec());
    for i in half + 1..window {
        smoothed[n - window + i] = hat.row(i).dot(&tail);
    }

    if smoothed.iter().all(|v| v.is_finite()) {
        Some(smoothed)
    } else {
        None
    }
}

/// Hat matrix `A (AᵀA)⁻¹ Aᵀ` of a polynomial fit over centered window
/// positions. Row `i` maps the window's values to the fitted value at
/// position `i`.
fn hat_matrix(window: usize, degree: usize) -> Option<Array2<f64>> {
    let half = (window / 2) as f64;
    let design = Array2::from_shape_fn((window, degree + 1), |(i, j)| {
        (i as f64 - half).powi(j as i32)
    });

    let normal = design.t().dot(&design);
    let inverse = invert(&normal)?;

    Some(design.dot(&inverse).dot(&design.t()))
}

/// Gauss-Jordan inversion with partial pivoting. `None` if singular.
fn invert(matrix: &Array2<f64>) -> Option<Array2<f64>> {
    let size = matrix.nrows();
    let mut left = matrix.clone();
    let mut right = Array2::<f64>::eye(size);

    for col in 0..size {
        let pivot_row = (col..size).max_by(|&a, &b| {
            left[[a, col]].abs().total_cmp(&left[[b, col]].abs())
        })?;

        let pivot = left[[pivot_row, col]];
        if pivot.abs() < 1e-12 {
            return None;
        }

        if pivot_row != col {
            for k in 0..size {
                left.swap([pivot_row, k], [col, k]);
                right.swap([pivot_row, k], [col, k]);
            }
        }

        for k in 0..size {
            left[[col, k]] /= pivot;
            right[[col, k]] /= pivot;
        }

        for row in 0..size {
            if row == col {
                continue;
            }
            let factor = left[[row, col]];
            if factor == 0.0 {
                continue;
            }
            for k in 0..size {
                left[[row, k]] -= factor * left[[col, k]];
                right[[row, k]] -= factor * right[[col, k]];
            }
        }
    }

    Some(right)
}
