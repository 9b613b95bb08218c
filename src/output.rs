//! Grid output
//!
//! Each snapshot is written as a block of whitespace separated columns:
//!
//! ```text
//! # iteration 3, total_tau=1.234e2
//! # n_cell depth density opacity cell_tau cumulative_tau temperature
//! 0 0e0 1e-5 3.4e-1 ...
//! ```

use snake_core::errors::{SnakeError, SnakeResult};
use snake_core::grid::{Grid, GridSnapshot};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const COLUMNS: &str = "# n_cell depth density opacity cell_tau cumulative_tau temperature";

/// Writes grid snapshots to a stream.
#[derive(Debug)]
pub struct GridWriter<W: Write> {
    writer: W,
    destination: PathBuf,
    snapshots: usize,
}

impl GridWriter<BufWriter<File>> {
    /// Create (or truncate) `path` for output.
    pub fn create(path: &Path) -> SnakeResult<Self> {
        let file = File::create(path).map_err(|e| SnakeError::resource(path, e.to_string()))?;
        Ok(Self::new(BufWriter::new(file), path))
    }
}

impl<W: Write> GridWriter<W> {
    /// `destination` names the stream in error messages.
    pub fn new(writer: W, destination: impl Into<PathBuf>) -> Self {
        Self {
            writer,
            destination: destination.into(),
            snapshots: 0,
        }
    }

    /// Number of snapshots written so far
    pub fn snapshots(&self) -> usize {
        self.snapshots
    }

    pub fn write_grid(&mut self, grid: &Grid) -> SnakeResult<()> {
        self.write_snapshot(&grid.snapshot())
    }

    pub fn write_snapshot(&mut self, snapshot: &GridSnapshot) -> SnakeResult<()> {
        self.write_rows(snapshot).map_err(|e| self.error(e))?;
        self.snapshots += 1;
        Ok(())
    }

    fn write_rows(&mut self, snapshot: &GridSnapshot) -> std::io::Result<()> {
        writeln!(
            self.writer,
            "# iteration {}, total_tau={:e}",
            snapshot.iteration, snapshot.total_optical_depth
        )?;
        writeln!(self.writer, "{}", COLUMNS)?;
        for row in &snapshot.rows {
            writeln!(
                self.writer,
                "{} {:e} {:e} {:e} {:e} {:e} {:e}",
                row.index,
                row.depth,
                row.density,
                row.opacity,
                row.cell_optical_depth,
                row.cumulative_optical_depth,
                row.temperature
            )?;
        }
        Ok(())
    }

    /// Flush and return the underlying writer.
    pub fn finish(mut self) -> SnakeResult<W> {
        self.writer.flush().map_err(|e| self.error(e))?;
        Ok(self.writer)
    }

    fn error(&self, e: std::io::Error) -> SnakeError {
        SnakeError::resource(&self.destination, e.to_string())
    }
}
