//! 2D interpolation over a rectilinear grid.
//!
//! Values are indexed `[x, y]` where `x` and `y` are strictly increasing axes.
//! Lookups locate the enclosing cell with a binary search and keep no state
//! between calls.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Interpolation scheme for a 2D table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    #[default]
    Bilinear,
    /// Bicubic Hermite interpolation with finite difference derivatives
    Bicubic,
}

/// Index `i` of the interval `[axis[i], axis[i + 1]]` containing `value`.
///
/// Values outside the axis are assigned to the first or last interval.
/// `axis` must hold at least two points.
pub fn locate(axis: &[f64], value: f64) -> usize {
    let upper = axis.partition_point(|x| *x <= value);
    upper.clamp(1, axis.len() - 1) - 1
}

/// Bilinear interpolation of `values` at `(x, y)`.
pub fn bilinear(x_axis: &[f64], y_axis: &[f64], values: &Array2<f64>, x: f64, y: f64) -> f64 {
    let i = locate(x_axis, x);
    let j = locate(y_axis, y);
    let t = (x - x_axis[i]) / (x_axis[i + 1] - x_axis[i]);
    let u = (y - y_axis[j]) / (y_axis[j + 1] - y_axis[j]);

    (1.0 - t) * (1.0 - u) * values[[i, j]]
        + t * (1.0 - u) * values[[i + 1, j]]
        + (1.0 - t) * u * values[[i, j + 1]]
        + t * u * values[[i + 1, j + 1]]
}

// Cubic Hermite basis functions
fn h00(t: f64) -> f64 {
    (1.0 + 2.0 * t) * (1.0 - t).powi(2)
}

fn h01(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

fn h10(t: f64) -> f64 {
    t * (1.0 - t).powi(2)
}

fn h11(t: f64) -> f64 {
    t * t * (t - 1.0)
}

/// Neighbouring indices used for a finite difference at `i`, one sided at the edges.
fn stencil(i: usize, n: usize) -> (usize, usize) {
    (i.saturating_sub(1), (i + 1).min(n - 1))
}

fn d_dx(x_axis: &[f64], values: &Array2<f64>, i: usize, j: usize) -> f64 {
    let (lo, hi) = stencil(i, x_axis.len());
    (values[[hi, j]] - values[[lo, j]]) / (x_axis[hi] - x_axis[lo])
}

fn d_dy(y_axis: &[f64], values: &Array2<f64>, i: usize, j: usize) -> f64 {
    let (lo, hi) = stencil(j, y_axis.len());
    (values[[i, hi]] - values[[i, lo]]) / (y_axis[hi] - y_axis[lo])
}

fn d2_dxdy(x_axis: &[f64], y_axis: &[f64], values: &Array2<f64>, i: usize, j: usize) -> f64 {
    let (il, ih) = stencil(i, x_axis.len());
    let (jl, jh) = stencil(j, y_axis.len());
    (values[[ih, jh]] - values[[ih, jl]] - values[[il, jh]] + values[[il, jl]])
        / ((x_axis[ih] - x_axis[il]) * (y_axis[jh] - y_axis[jl]))
}

/// Bicubic interpolation of `values` at `(x, y)`.
///
/// Tensor product of cubic Hermite splines. The first and cross derivatives at
/// each node are estimated with central differences (one sided at the table
/// edges), so node values and linear fields are reproduced exactly.
pub fn bicubic(x_axis: &[f64], y_axis: &[f64], values: &Array2<f64>, x: f64, y: f64) -> f64 {
    let i = locate(x_axis, x);
    let j = locate(y_axis, y);
    let dx = x_axis[i + 1] - x_axis[i];
    let dy = y_axis[j + 1] - y_axis[j];
    let t = (x - x_axis[i]) / dx;
    let u = (y - y_axis[j]) / dy;

    let value_basis_t = [h00(t), h01(t)];
    let slope_basis_t = [h10(t) * dx, h11(t) * dx];
    let value_basis_u = [h00(u), h01(u)];
    let slope_basis_u = [h10(u) * dy, h11(u) * dy];

    let mut result = 0.0;
    for a in 0..2 {
        for b in 0..2 {
            let (ia, jb) = (i + a, j + b);
            result += value_basis_t[a] * value_basis_u[b] * values[[ia, jb]]
                + slope_basis_t[a] * value_basis_u[b] * d_dx(x_axis, values, ia, jb)
                + value_basis_t[a] * slope_basis_u[b] * d_dy(y_axis, values, ia, jb)
                + slope_basis_t[a] * slope_basis_u[b] * d2_dxdy(x_axis, y_axis, values, ia, jb);
        }
    }
    result
}

impl Interpolation {
    pub fn evaluate(
        &self,
        x_axis: &[f64],
        y_axis: &[f64],
        values: &Array2<f64>,
        x: f64,
        y: f64,
    ) -> f64 {
        match self {
            Interpolation::Bilinear => bilinear(x_axis, y_axis, values, x, y),
            Interpolation::Bicubic => bicubic(x_axis, y_axis, values, x, y),
        }
    }
}
