//! snake
//!
//! Solves for the grey Eddington temperature structure of an atmosphere column.
//!
//! # Usage
//!
//! ```bash
//! snake run.toml
//! ```
//!
//! Without a path the configuration file is asked for on stdin. The exit status
//! identifies the kind of failure.

use clap::Parser;
use log::{error, info};
use snake::app;
use snake::config::SimulationConfig;
use snake_core::errors::{SnakeError, SnakeResult};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

/// Grey Eddington radiative equilibrium solver
#[derive(Parser, Debug)]
#[command(name = "snake")]
#[command(about = "Iterate a 1D atmosphere column to grey radiative equilibrium")]
struct Args {
    /// TOML configuration file
    config: Option<PathBuf>,
}

/// Ask for the configuration path on stdin.
fn prompt_for_config() -> SnakeResult<PathBuf> {
    print!("Configuration file: ");
    io::stdout()
        .flush()
        .map_err(|e| SnakeError::configuration("configuration", e.to_string()))?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| SnakeError::configuration("configuration", e.to_string()))?;

    let path = line.trim();
    if path.is_empty() {
        return Err(SnakeError::configuration(
            "configuration",
            "no configuration file given",
        ));
    }
    Ok(PathBuf::from(path))
}

fn init_logger(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() {
    let args = Args::parse();

    let config = args
        .config
        .map_or_else(prompt_for_config, Ok)
        .and_then(|path| SimulationConfig::load(&path));
    init_logger(config.as_ref().is_ok_and(|c| c.verbose));

    match config.and_then(|config| app::run(&config)) {
        Ok(summary) => {
            info!(
                "{:?} after {} iterations, grid written to {}",
                summary.outcome.state,
                summary.outcome.iterations,
                summary.output_file.display()
            );
        }
        Err(e) => {
            error!("{}", e);
            process::exit(e.exit_code());
        }
    }
}
