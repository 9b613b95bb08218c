//! Run a configured simulation end to end.

use crate::config::SimulationConfig;
use crate::output::GridWriter;
use log::info;
use snake_core::errors::SnakeResult;
use snake_core::solver::{EddingtonSolver, SolverOutcome};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub outcome: SolverOutcome,
    pub output_file: PathBuf,
    /// Snapshots written, including the initial grid
    pub snapshots: usize,
    pub elapsed: Duration,
}

/// Run a simulation, writing the grid after initialisation and after every
/// iteration to the configured output file.
pub fn run(config: &SimulationConfig) -> SnakeResult<RunSummary> {
    let start = Instant::now();

    let mut grid = config.build_grid()?;
    let provider = config.opacity.provider(config.composition)?;
    let mut solver = EddingtonSolver::new(provider, config.solver.clone())?;
    let mut writer = GridWriter::create(&config.output_file)?;

    solver.initialise(&mut grid)?;
    writer.write_grid(&grid)?;

    let outcome = solver.run_with(&mut grid, |grid| writer.write_grid(grid))?;
    let snapshots = writer.snapshots();
    writer.finish()?;

    let elapsed = start.elapsed();
    info!(
        "Finished after {} iterations: T_eff = {:e} K, total tau = {:e}",
        outcome.iterations, outcome.effective_temperature, outcome.total_optical_depth
    );
    info!("Run took {:.3?}", elapsed);

    Ok(RunSummary {
        outcome,
        output_file: config.output_file.clone(),
        snapshots,
        elapsed,
    })
}
