//! Convergence of the temperature field between iterations.

use crate::grid::{Cell, Grid};
use log::debug;

/// Outcome of a convergence check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergenceReport {
    pub converged_cells: usize,
    pub total_cells: usize,
    /// `converged_cells / total_cells`
    pub fraction: f64,
}

/// Relative temperature change of a cell, $|T_{old} - T| / (T_{old} + T)$.
///
/// A cell with zero temperature before and after has not changed.
pub fn relative_change(cell: &Cell) -> f64 {
    let sum = cell.previous_temperature + cell.temperature;
    if sum == 0.0 {
        return 0.0;
    }
    (cell.previous_temperature - cell.temperature).abs() / sum
}

/// Count the cells whose temperature changed by less than `tolerance`.
pub fn check_convergence(grid: &Grid, tolerance: f64) -> ConvergenceReport {
    let converged_cells = grid
        .iter()
        .filter(|cell| relative_change(cell) < tolerance)
        .count();
    let total_cells = grid.len();
    let fraction = if total_cells == 0 {
        0.0
    } else {
        converged_cells as f64 / total_cells as f64
    };

    debug!(
        "{} cells out of {} converged ({:.3})",
        converged_cells, total_cells, fraction
    );

    ConvergenceReport {
        converged_cells,
        total_cells,
        fraction,
    }
}
