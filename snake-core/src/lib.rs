//! Grey radiative equilibrium of a one dimensional column
//!
//! A column is divided into [`grid::Cell`]s ordered from the outer boundary
//! inward. Starting from an initial temperature the [`solver::EddingtonSolver`]
//! repeatedly
//!
//! 1. refreshes each cell's Rosseland mean opacity from an [`opacity::OpacityProvider`],
//! 2. integrates the optical depth through the column,
//! 3. applies the Eddington approximation to get a new temperature for each cell,
//!
//! until a large enough fraction of cells stop changing temperature.

pub mod convergence;
pub mod errors;
pub mod grid;
pub mod opacity;
pub mod optical_depth;
pub mod parameters;
pub mod solver;
pub mod temperature;

pub use errors::{SnakeError, SnakeResult};
pub use grid::{Cell, Grid, GridSnapshot};
pub use solver::{EddingtonSolver, SolverOutcome, SolverState};
