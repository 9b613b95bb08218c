//! Eddington temperature update
//!
//! In the grey Eddington approximation the temperature at optical depth $\tau$ is
//!
//! $$T^4 = \frac{3}{4} T_{eff}^4 \left(\tau + \frac{2}{3}\right)$$
//!
//! with the effective temperature fixed by the boundary temperature and the total
//! optical depth of the column
//!
//! $$T_{eff}^4 = \frac{4 T_{b}^4}{3 \tau_{tot} + 2}$$

use crate::grid::Grid;
use log::{debug, warn};

/// Relative tolerance for the optical depth accounting check
const ACCOUNTING_TOLERANCE: f64 = 1e-6;

/// $T^4$ from the Eddington approximation.
pub fn eddington_approximation(effective_temperature: f64, optical_depth: f64) -> f64 {
    0.75 * effective_temperature.powi(4) * (optical_depth + 2.0 / 3.0)
}

/// Effective temperature for a boundary temperature and total optical depth.
///
/// The denominator is at least 2 for a physical (non-negative) optical depth, it
/// is floored at `f64::MIN_POSITIVE` so a corrupt optical depth can not divide by
/// zero.
pub fn effective_temperature(boundary_temperature: f64, total_optical_depth: f64) -> f64 {
    let denominator = (3.0 * total_optical_depth + 2.0).max(f64::MIN_POSITIVE);
    (4.0 * boundary_temperature.powi(4) / denominator).powf(0.25)
}

/// The running sum of cell optical depths disagreed with the grid total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccountingMismatch {
    pub running_total: f64,
    pub total_optical_depth: f64,
}

/// Summary of a temperature update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureUpdate {
    pub effective_temperature: f64,
    /// Set when the optical depth double check failed. Never fatal.
    pub accounting: Option<AccountingMismatch>,
}

/// Whether two values agree to a relative tolerance
fn agrees(a: f64, b: f64) -> bool {
    let scale = a.abs() + b.abs();
    scale == 0.0 || (a - b).abs() / scale < ACCOUNTING_TOLERANCE
}

/// Apply the Eddington closure to every cell.
///
/// Each cell's `previous_temperature` is set to its current temperature before the
/// new temperature is written. Expects the optical depth to be up to date.
pub fn update_temperatures(grid: &mut Grid) -> TemperatureUpdate {
    let effective_temperature =
        effective_temperature(grid.parameters.boundary_temperature, grid.total_optical_depth);
    debug!("Effective temperature {:e} K", effective_temperature);

    let mut running_total = 0.0;
    for cell in grid.iter_mut() {
        cell.previous_temperature = cell.temperature;
        running_total += cell.cell_optical_depth;
        cell.temperature =
            eddington_approximation(effective_temperature, cell.cumulative_optical_depth)
                .powf(0.25);
    }

    let accounting = if agrees(running_total, grid.total_optical_depth) {
        None
    } else {
        let mismatch = AccountingMismatch {
            running_total,
            total_optical_depth: grid.total_optical_depth,
        };
        warn!(
            "Optical depth accounting mismatch: running total {:e} {} total {:e}",
            running_total,
            if running_total > grid.total_optical_depth { ">" } else { "<" },
            grid.total_optical_depth
        );
        Some(mismatch)
    };

    TemperatureUpdate {
        effective_temperature,
        accounting,
    }
}
