//! The cell grid
//!
//! A [`Grid`] is the whole simulation context for a run: the ordered cells of the
//! column plus the scalar parameters which every stage of the iteration reads.
//! Cells are ordered by depth, with index 0 at the outer boundary.

use crate::errors::{SnakeError, SnakeResult};
use crate::parameters::{Composition, GridParameters};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Source name used for errors in in-memory density samples
const SAMPLES_SOURCE: &str = "density samples";

/// A single cell of the column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Position of the cell in the grid
    pub index: usize,
    /// Distance from the outer boundary (cm)
    pub depth: f64,
    /// Mass density ($\text{g/cm}^3$)
    pub density: f64,
    /// Current temperature (K)
    pub temperature: f64,
    /// Temperature before the latest update (K)
    pub previous_temperature: f64,
    /// Rosseland mean opacity ($\text{cm}^2/\text{g}$)
    pub opacity: f64,
    /// Optical depth of this cell alone
    pub cell_optical_depth: f64,
    /// Optical depth from the outer boundary up to and including this cell
    pub cumulative_optical_depth: f64,
}

impl Cell {
    pub fn new(index: usize, depth: f64, density: f64, temperature: f64) -> Self {
        Self {
            index,
            depth,
            density,
            temperature,
            previous_temperature: temperature,
            opacity: 0.0,
            cell_optical_depth: 0.0,
            cumulative_optical_depth: 0.0,
        }
    }

    /// $\log_{10} T$
    pub fn log_t(&self) -> f64 {
        self.temperature.log10()
    }

    /// $\log_{10} R$ where $R = \rho / T_6^3$ and $T_6$ is the temperature in MK.
    pub fn log_r(&self) -> f64 {
        let t6 = self.temperature * 1e-6;
        (self.density / t6.powi(3)).log10()
    }
}

/// Density of the generated profile at a given depth.
///
/// A Gaussian falloff from `density_scale` with the column extent as its width.
pub fn generated_density(params: &GridParameters, depth: f64) -> f64 {
    params.density_scale * (-depth.powi(2) / (2.0 * params.column_extent.powi(2))).exp()
}

/// The cells of a column and the parameters of the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    pub cells: Vec<Cell>,
    pub parameters: GridParameters,
    pub composition: Composition,
    /// Number of completed Eddington iterations
    pub iteration: usize,
    /// Total optical depth of the column, mirrors the last cell's cumulative value
    pub total_optical_depth: f64,
}

impl Grid {
    /// Reserve an empty grid for `cell_count` cells.
    ///
    /// Fails if `cell_count` is zero or the memory can not be reserved.
    pub fn allocate(
        cell_count: usize,
        parameters: GridParameters,
        composition: Composition,
    ) -> SnakeResult<Self> {
        if cell_count == 0 {
            return Err(SnakeError::Allocation {
                what: "grid".to_string(),
                requested: cell_count,
            });
        }
        parameters.validate()?;
        composition.validate()?;

        let mut cells = Vec::new();
        cells
            .try_reserve_exact(cell_count)
            .map_err(|_| SnakeError::Allocation {
                what: "grid".to_string(),
                requested: cell_count,
            })?;
        debug!(
            "Allocated {:e} bytes for {} grid cells",
            cell_count.saturating_mul(std::mem::size_of::<Cell>()) as f64,
            cell_count
        );

        Ok(Self {
            cells,
            parameters,
            composition,
            iteration: 0,
            total_optical_depth: 0.0,
        })
    }

    /// Build a grid from the closed form density profile.
    ///
    /// Cell `i` sits at depth `i * column_extent / cell_count`.
    pub fn generated(parameters: GridParameters, composition: Composition) -> SnakeResult<Self> {
        let n = parameters.cell_count;
        let mut grid = Self::allocate(n, parameters, composition)?;
        let width = grid.parameters.cell_width();
        let temperature = grid.parameters.initial_temperature;

        for i in 0..n {
            let depth = i as f64 * width;
            let density = generated_density(&grid.parameters, depth);
            grid.cells.push(Cell::new(i, depth, density, temperature));
        }
        info!(
            "Initialised standard density profile for a {} column of {} cells",
            grid.parameters.geometry, n
        );

        Ok(grid)
    }

    /// Build a grid with one cell per `(depth, density)` sample.
    ///
    /// Samples given in descending depth order are reversed so depth ascends from
    /// the boundary. Depths must be non-negative and strictly monotonic.
    pub fn from_samples(
        samples: &[(f64, f64)],
        parameters: GridParameters,
        composition: Composition,
    ) -> SnakeResult<Self> {
        let mut grid = Self::allocate(samples.len(), parameters, composition)?;
        let temperature = grid.parameters.initial_temperature;

        grid.cells.extend(
            ascending(samples)?
                .into_iter()
                .enumerate()
                .map(|(i, (depth, density))| Cell::new(i, depth, density, temperature)),
        );
        grid.parameters.cell_count = grid.cells.len();
        info!("Initialised density profile of {} cells from samples", grid.cells.len());

        Ok(grid)
    }

    /// Build a grid of `cell_count` uniformly spaced cells spanning the sampled
    /// depths, linearly interpolating the sampled density.
    pub fn from_samples_resampled(
        samples: &[(f64, f64)],
        cell_count: usize,
        parameters: GridParameters,
        composition: Composition,
    ) -> SnakeResult<Self> {
        if samples.len() < 2 {
            return Err(SnakeError::configuration(
                "resample_cells",
                "at least two density samples are required to resample",
            ));
        }
        let samples = ascending(samples)?;
        let mut grid = Self::allocate(cell_count, parameters, composition)?;
        let temperature = grid.parameters.initial_temperature;

        let start = samples[0].0;
        let end = samples[samples.len() - 1].0;
        let step = if cell_count > 1 {
            (end - start) / (cell_count - 1) as f64
        } else {
            0.0
        };

        for i in 0..cell_count {
            let depth = start + i as f64 * step;
            let density = interpolate_samples(&samples, depth);
            grid.cells.push(Cell::new(i, depth, density, temperature));
        }
        grid.parameters.cell_count = cell_count;
        info!(
            "Resampled {} density samples onto {} cells",
            samples.len(),
            cell_count
        );

        Ok(grid)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Cell> {
        self.cells.iter()
    }

    pub fn iter_mut(&mut self) -> impl DoubleEndedIterator<Item = &mut Cell> {
        self.cells.iter_mut()
    }

    /// Read-only copy of the current state for output.
    pub fn snapshot(&self) -> GridSnapshot {
        GridSnapshot {
            iteration: self.iteration,
            total_optical_depth: self.total_optical_depth,
            rows: self
                .cells
                .iter()
                .map(|cell| SnapshotRow {
                    index: cell.index,
                    depth: cell.depth,
                    density: cell.density,
                    opacity: cell.opacity,
                    cell_optical_depth: cell.cell_optical_depth,
                    cumulative_optical_depth: cell.cumulative_optical_depth,
                    temperature: cell.temperature,
                })
                .collect(),
        }
    }
}

/// Samples in ascending depth order.
///
/// Descending samples are reversed. Anything else which is not strictly
/// increasing, or has a negative depth, is a `Format` error naming the offending
/// sample (1-based).
fn ascending(samples: &[(f64, f64)]) -> SnakeResult<Vec<(f64, f64)>> {
    let mut samples = samples.to_vec();
    if samples.len() > 1 && samples[0].0 > samples[1].0 {
        samples.reverse();
    }

    let mut previous: Option<f64> = None;
    for (i, (depth, _)) in samples.iter().enumerate() {
        if !(*depth >= 0.0) {
            return Err(SnakeError::format(
                SAMPLES_SOURCE,
                i + 1,
                format!("depth {} is negative", depth),
            ));
        }
        if let Some(previous) = previous {
            if !(*depth > previous) {
                return Err(SnakeError::format(
                    SAMPLES_SOURCE,
                    i + 1,
                    format!(
                        "depth {} does not follow {}, depths must be monotonic",
                        depth, previous
                    ),
                ));
            }
        }
        previous = Some(*depth);
    }

    Ok(samples)
}

/// Linear interpolation of density between ascending samples, clamped at the ends.
fn interpolate_samples(samples: &[(f64, f64)], depth: f64) -> f64 {
    let upper = samples.partition_point(|(z, _)| *z < depth);
    if upper == 0 {
        return samples[0].1;
    }
    if upper >= samples.len() {
        return samples[samples.len() - 1].1;
    }
    let (z0, rho0) = samples[upper - 1];
    let (z1, rho1) = samples[upper];
    if z1 == z0 {
        return rho0;
    }
    rho0 + (rho1 - rho0) * (depth - z0) / (z1 - z0)
}

/// Parse `(depth, density)` samples.
///
/// Lines starting with `#` and blank lines are ignored, every other line must hold
/// exactly two numbers.
pub fn read_density_samples<R: BufRead>(
    reader: R,
    source_name: &str,
) -> SnakeResult<Vec<(f64, f64)>> {
    let mut samples = Vec::new();

    for (line_index, line) in reader.lines().enumerate() {
        let line_num = line_index + 1;
        let line = line.map_err(|e| SnakeError::format(source_name, line_num, e.to_string()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let values = trimmed
            .split_whitespace()
            .map(|token| token.parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SnakeError::format(source_name, line_num, e.to_string()))?;
        match values.as_slice() {
            [depth, density] => samples.push((*depth, *density)),
            _ => {
                return Err(SnakeError::format(
                    source_name,
                    line_num,
                    format!("expected 2 values, found {}", values.len()),
                ))
            }
        }
    }

    Ok(samples)
}

/// Read density samples from a file.
pub fn load_density_samples(path: &Path) -> SnakeResult<Vec<(f64, f64)>> {
    let file = File::open(path).map_err(|e| SnakeError::resource(path, e.to_string()))?;
    info!("Reading density profile from {}", path.display());
    read_density_samples(BufReader::new(file), &path.display().to_string())
}

/// A row of a [`GridSnapshot`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub index: usize,
    pub depth: f64,
    pub density: f64,
    pub opacity: f64,
    pub cell_optical_depth: f64,
    pub cumulative_optical_depth: f64,
    pub temperature: f64,
}

/// State of the grid after an iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub iteration: usize,
    pub total_optical_depth: f64,
    pub rows: Vec<SnapshotRow>,
}
