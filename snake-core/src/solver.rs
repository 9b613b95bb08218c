//! The Eddington iteration
//!
//! Each iteration refreshes the cell opacities, integrates the optical depth,
//! applies the Eddington closure and checks how many cells changed temperature by
//! less than the tolerance. The loop ends once enough cells are converged or the
//! iteration cap is reached.
//!
//! ```text
//! Idle -> Iterating -> Converged
//!                   -> MaxIterationsReached
//! ```

use crate::convergence::{check_convergence, ConvergenceReport};
use crate::errors::SnakeResult;
use crate::grid::Grid;
use crate::opacity::{update_opacities, OpacityProvider};
use crate::optical_depth::integrate_optical_depth;
use crate::parameters::SolverSettings;
use crate::temperature::{update_temperatures, TemperatureUpdate};
use log::{info, warn};
use std::time::Instant;

/// State of an [`EddingtonSolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverState {
    Idle,
    Iterating,
    Converged,
    /// The iteration cap was reached first. The last iteration is still the answer.
    MaxIterationsReached,
}

/// Summary of a single iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationReport {
    pub iteration: usize,
    pub total_optical_depth: f64,
    pub temperature: TemperatureUpdate,
    pub convergence: ConvergenceReport,
}

/// Result of a full run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverOutcome {
    pub state: SolverState,
    pub iterations: usize,
    pub converged_fraction: f64,
    pub effective_temperature: f64,
    pub total_optical_depth: f64,
    /// Number of iterations which reported an optical depth accounting mismatch
    pub accounting_mismatches: usize,
}

impl SolverOutcome {
    pub fn is_converged(&self) -> bool {
        self.state == SolverState::Converged
    }
}

/// Drives the Eddington iteration over a [`Grid`].
#[derive(Debug)]
pub struct EddingtonSolver {
    provider: Box<dyn OpacityProvider>,
    settings: SolverSettings,
    state: SolverState,
}

impl EddingtonSolver {
    pub fn new(provider: Box<dyn OpacityProvider>, settings: SolverSettings) -> SnakeResult<Self> {
        settings.validate()?;
        Ok(Self {
            provider,
            settings,
            state: SolverState::Idle,
        })
    }

    pub fn state(&self) -> SolverState {
        self.state
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    pub fn provider(&self) -> &dyn OpacityProvider {
        self.provider.as_ref()
    }

    /// Bring a freshly built grid up to date before iterating.
    ///
    /// Refreshes the opacities and optical depth from the initial temperatures. The
    /// grid is left at iteration 0.
    pub fn initialise(&self, grid: &mut Grid) -> SnakeResult<f64> {
        grid.iteration = 0;
        update_opacities(grid, self.provider.as_ref())?;
        integrate_optical_depth(grid)
    }

    /// Perform one iteration, advancing `grid.iteration`.
    pub fn iterate(&mut self, grid: &mut Grid) -> SnakeResult<IterationReport> {
        self.state = SolverState::Iterating;
        grid.iteration += 1;
        info!("Beginning iteration {}", grid.iteration);

        update_opacities(grid, self.provider.as_ref())?;
        let total_optical_depth = integrate_optical_depth(grid)?;
        let temperature = update_temperatures(grid);
        let convergence = check_convergence(grid, self.settings.tolerance);

        Ok(IterationReport {
            iteration: grid.iteration,
            total_optical_depth,
            temperature,
            convergence,
        })
    }

    /// Iterate until converged or the iteration cap is reached.
    pub fn run(&mut self, grid: &mut Grid) -> SnakeResult<SolverOutcome> {
        self.run_with(grid, |_| Ok(()))
    }

    /// Iterate until converged or the iteration cap is reached.
    ///
    /// `checkpoint` is called with the grid after every completed iteration, e.g. to
    /// write it to disk. It can not influence the iteration, but an error from it
    /// aborts the run.
    pub fn run_with<F>(&mut self, grid: &mut Grid, mut checkpoint: F) -> SnakeResult<SolverOutcome>
    where
        F: FnMut(&Grid) -> SnakeResult<()>,
    {
        info!("Beginning Eddington iterations");
        let start = Instant::now();
        let mut accounting_mismatches = 0;

        loop {
            let report = self.iterate(grid)?;
            if report.temperature.accounting.is_some() {
                accounting_mismatches += 1;
            }
            checkpoint(grid)?;

            let converged = report.convergence.fraction >= self.settings.convergence_fraction;
            if converged || report.iteration >= self.settings.max_iterations {
                self.state = if converged {
                    SolverState::Converged
                } else {
                    SolverState::MaxIterationsReached
                };

                match self.state {
                    SolverState::Converged => info!(
                        "Cells converged in {} iterations in {:.3?}",
                        report.iteration,
                        start.elapsed()
                    ),
                    _ => warn!(
                        "Max number of iterations ({}) reached with {:.3} of cells converged",
                        report.iteration, report.convergence.fraction
                    ),
                }

                return Ok(SolverOutcome {
                    state: self.state,
                    iterations: report.iteration,
                    converged_fraction: report.convergence.fraction,
                    effective_temperature: report.temperature.effective_temperature,
                    total_optical_depth: report.total_optical_depth,
                    accounting_mismatches,
                });
            }
        }
    }
}
