//! Rosseland mean opacity lookups
//!
//! An [`OpacityProvider`] maps the $(\log T, \log R)$ state of a cell onto
//! $\log_{10} \kappa_R$. Two providers are available and one is selected at startup:
//!
//! - [`CompositionTableOpacity`]: calls a composition dependent opacity routine
//!   (see [`CompositionOpacity`]) which is treated as a black box.
//! - [`TableOpacity`]: bilinear or bicubic interpolation over a precomputed
//!   $(\log T, \log R) \to \log \kappa_R$ table read from disk.
//!
//! Each provider validates lookups against its own [`LookupBounds`].

mod composition;
pub mod interpolate;
mod table;

pub use composition::{CompositionOpacity, CompositionTableOpacity, KramersOpacity};
pub use interpolate::Interpolation;
pub use table::{OpacityTable, TableOpacity};

use crate::errors::{LookupAxis, SnakeError, SnakeResult};
use crate::grid::{Cell, Grid};
use log::debug;
use rayon::prelude::*;
use std::fmt::Debug;

/// Domain of an opacity table in $(\log T, \log R)$.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookupBounds {
    pub min_log_t: f64,
    pub max_log_t: f64,
    pub min_log_r: f64,
    pub max_log_r: f64,
}

/// Domain of the composition dependent opacity tables.
pub const COMPOSITION_TABLE_BOUNDS: LookupBounds = LookupBounds {
    min_log_t: 3.75,
    max_log_t: 8.7,
    min_log_r: -8.0,
    max_log_r: 1.0,
};

/// Domain of the precomputed 2D opacity tables.
pub const PRECOMPUTED_TABLE_BOUNDS: LookupBounds = LookupBounds {
    min_log_t: 3.2,
    max_log_t: 8.5,
    min_log_r: -7.0,
    max_log_r: 1.0,
};

impl LookupBounds {
    /// Check a lookup falls inside the table.
    ///
    /// `logR` is checked first. NaN values are always out of bounds.
    pub fn validate(&self, cell: usize, log_t: f64, log_r: f64, table: &str) -> SnakeResult<()> {
        if !(self.min_log_r..=self.max_log_r).contains(&log_r) {
            return Err(SnakeError::TableBounds {
                cell,
                axis: LookupAxis::LogR,
                value: log_r,
                min: self.min_log_r,
                max: self.max_log_r,
                table: table.to_string(),
            });
        }
        if !(self.min_log_t..=self.max_log_t).contains(&log_t) {
            return Err(SnakeError::TableBounds {
                cell,
                axis: LookupAxis::LogT,
                value: log_t,
                min: self.min_log_t,
                max: self.max_log_t,
                table: table.to_string(),
            });
        }
        Ok(())
    }
}

/// Source of Rosseland mean opacities.
///
/// Lookups take `&self` so a provider can be shared between the workers which
/// refresh cells in parallel.
pub trait OpacityProvider: Debug + Send + Sync {
    /// Name used in log messages and bounds errors
    fn name(&self) -> &str;

    /// $\log_{10}$ of the Rosseland mean opacity for cell `cell`.
    ///
    /// Implementations validate the lookup against their table domain first.
    fn log_rosseland_mean(&self, cell: usize, log_t: f64, log_r: f64) -> SnakeResult<f64>;

    /// Refresh the opacity of a cell from its temperature and density.
    fn update_opacity(&self, cell: &mut Cell) -> SnakeResult<()> {
        let log_rmo = self.log_rosseland_mean(cell.index, cell.log_t(), cell.log_r())?;
        let opacity = 10f64.powf(log_rmo);
        if !(opacity > 0.0 && opacity.is_finite()) {
            return Err(SnakeError::NegativeOpacity {
                cell: cell.index,
                opacity,
            });
        }
        cell.opacity = opacity;
        Ok(())
    }
}

/// Refresh the opacity of every cell.
///
/// Cells are independent so the lookups run in parallel. Any failure aborts the
/// refresh.
pub fn update_opacities(grid: &mut Grid, provider: &dyn OpacityProvider) -> SnakeResult<()> {
    debug!("Updating cell opacities using {}", provider.name());
    grid.cells
        .par_iter_mut()
        .try_for_each(|cell| provider.update_opacity(cell))
}
