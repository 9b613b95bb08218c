//! Optical depth through the column
//!
//! Optical depth is zero at the outer boundary (depth 0, cell 0) and is accumulated
//! toward the interior in ascending depth order. The temperature update walks the
//! cells in the same order.

use crate::errors::{SnakeError, SnakeResult};
use crate::grid::Grid;
use log::debug;

/// Recompute the per cell and cumulative optical depth of every cell.
///
/// The thickness of cell `i` is `depth[i] - depth[i - 1]`, and the first cell's
/// thickness is its own depth. Returns the total optical depth of the column,
/// which is also stored on the grid.
pub fn integrate_optical_depth(grid: &mut Grid) -> SnakeResult<f64> {
    if grid.is_empty() {
        return Err(SnakeError::Allocation {
            what: "optical depth integration".to_string(),
            requested: 0,
        });
    }

    let mut total = 0.0;
    let mut previous_depth = 0.0;
    for cell in grid.iter_mut() {
        let thickness = cell.depth - previous_depth;
        previous_depth = cell.depth;

        cell.cell_optical_depth = thickness * cell.density * cell.opacity;
        total += cell.cell_optical_depth;
        cell.cumulative_optical_depth = total;
    }

    grid.total_optical_depth = total;
    debug!("Total vertical optical depth {:e}", total);

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Cell;
    use crate::parameters::{Composition, GridParameters};
    use approx::assert_relative_eq;

    fn grid_from(cells: &[(f64, f64, f64)]) -> Grid {
        let samples: Vec<(f64, f64)> = cells.iter().map(|(z, rho, _)| (*z, *rho)).collect();
        let mut grid =
            Grid::from_samples(&samples, GridParameters::default(), Composition::default())
                .unwrap();
        for (cell, (_, _, kappa)) in grid.cells.iter_mut().zip(cells) {
            cell.opacity = *kappa;
        }
        grid
    }

    #[test]
    fn test_first_cell_thickness_is_its_depth() {
        let mut grid = grid_from(&[(2.0, 1.0, 3.0), (5.0, 1.0, 1.0)]);
        integrate_optical_depth(&mut grid).unwrap();

        assert_relative_eq!(grid.cells[0].cell_optical_depth, 6.0);
        assert_relative_eq!(grid.cells[1].cell_optical_depth, 3.0);
        assert_relative_eq!(grid.cells[1].cumulative_optical_depth, 9.0);
    }

    #[test]
    fn test_cumulative_is_monotonic_and_matches_total() {
        let cells: Vec<(f64, f64, f64)> = (0..25)
            .map(|i| (i as f64 * 0.4, 1e-3 * (1.0 + i as f64), 0.5 + 0.1 * i as f64))
            .collect();
        let mut grid = grid_from(&cells);
        let total = integrate_optical_depth(&mut grid).unwrap();

        let mut running = 0.0;
        let mut previous = 0.0;
        for cell in grid.iter() {
            running += cell.cell_optical_depth;
            assert!(cell.cumulative_optical_depth >= previous);
            assert_relative_eq!(cell.cumulative_optical_depth, running);
            previous = cell.cumulative_optical_depth;
        }
        assert_relative_eq!(total, grid.cells.last().unwrap().cumulative_optical_depth);
        assert_relative_eq!(grid.total_optical_depth, total);
    }

    #[test]
    fn test_repeated_integration_is_stable() {
        let mut grid = grid_from(&[(1.0, 2.0, 1.0), (2.0, 2.0, 1.0), (3.0, 2.0, 1.0)]);
        let first = integrate_optical_depth(&mut grid).unwrap();
        let second = integrate_optical_depth(&mut grid).unwrap();
        assert_relative_eq!(first, 6.0);
        assert_relative_eq!(first, second);
    }

    #[test]
    fn test_empty_grid() {
        let mut grid = grid_from(&[(1.0, 1.0, 1.0)]);
        grid.cells.clear();
        assert!(integrate_optical_depth(&mut grid).is_err());
    }

    #[test]
    fn test_cell_values_after_single_cell() {
        let mut grid = grid_from(&[(4.0, 0.5, 2.0)]);
        let total = integrate_optical_depth(&mut grid).unwrap();
        let cell: &Cell = &grid.cells[0];
        assert_relative_eq!(cell.cell_optical_depth, 4.0);
        assert_relative_eq!(total, 4.0);
    }
}
