//! Run configuration
//!
//! A run is described by a single TOML file. Every key is optional.
//!
//! ```toml
//! output_file = "sgrid.out"
//! verbose = false
//!
//! [grid]
//! cell_count = 100
//! column_extent = 1e10
//! boundary_temperature = 4e4
//! initial_temperature = 1e5
//! density_scale = 1e-5
//! geometry = "planar"
//!
//! [density]
//! file = "density.txt"
//! resample_cells = 200
//!
//! [composition]
//! hydrogen = 0.74
//! metals = 0.02
//!
//! [opacity]
//! table = "GN93hz"
//! mode = "auto"
//! interpolation = "bilinear"
//!
//! [solver]
//! convergence_fraction = 0.9
//! tolerance = 0.05
//! max_iterations = 500
//! ```

use log::info;
use serde::{Deserialize, Serialize};
use snake_core::errors::{SnakeError, SnakeResult};
use snake_core::grid::{load_density_samples, Grid};
use snake_core::opacity::{
    CompositionTableOpacity, Interpolation, KramersOpacity, OpacityProvider, TableOpacity,
};
use snake_core::parameters::{Composition, GridParameters, SolverSettings};
use std::fs;
use std::path::{Path, PathBuf};

/// Where the initial density profile comes from.
///
/// Without a file the closed form profile described by the grid parameters is used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DensitySource {
    /// Whitespace separated `depth density` samples, one per line
    pub file: Option<PathBuf>,
    /// Resample the file onto this many uniformly spaced cells instead of using
    /// one cell per sample
    pub resample_cells: Option<usize>,
}

/// Which opacity provider to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OpacityMode {
    /// Composition routine if the table is named like the composition data,
    /// otherwise a precomputed table
    #[default]
    Auto,
    Composition,
    Table,
}

/// Opacity source settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpacityConfig {
    /// Opacity table file.
    /// Default: GN93hz
    pub table: PathBuf,

    /// Default: auto
    pub mode: OpacityMode,

    /// Interpolation over a precomputed table.
    /// Default: bilinear
    pub interpolation: Interpolation,
}

impl Default for OpacityConfig {
    fn default() -> Self {
        Self {
            table: PathBuf::from(CompositionTableOpacity::DEFAULT_TABLE),
            mode: OpacityMode::Auto,
            interpolation: Interpolation::Bilinear,
        }
    }
}

impl OpacityConfig {
    /// The mode after resolving [`OpacityMode::Auto`] from the table's file name.
    pub fn resolved_mode(&self) -> OpacityMode {
        match self.mode {
            OpacityMode::Auto => {
                let composition_table = self
                    .table
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.contains(CompositionTableOpacity::DEFAULT_TABLE));
                if composition_table {
                    OpacityMode::Composition
                } else {
                    OpacityMode::Table
                }
            }
            mode => mode,
        }
    }

    /// Create the configured opacity provider, reading any table it needs.
    pub fn provider(&self, composition: Composition) -> SnakeResult<Box<dyn OpacityProvider>> {
        let provider: Box<dyn OpacityProvider> = match self.resolved_mode() {
            OpacityMode::Table => Box::new(TableOpacity::load(&self.table, self.interpolation)?),
            _ => Box::new(CompositionTableOpacity::with_table(
                &self.table,
                composition,
                Box::new(KramersOpacity),
            )?),
        };
        info!(
            "Using {} opacity from {}",
            provider.name(),
            self.table.display()
        );
        Ok(provider)
    }
}

/// Complete description of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// File the grid is written to after every iteration.
    /// Default: sgrid.out
    pub output_file: PathBuf,

    /// Log at debug level.
    /// Default: false
    pub verbose: bool,

    pub grid: GridParameters,
    pub density: DensitySource,
    pub composition: Composition,
    pub opacity: OpacityConfig,
    pub solver: SolverSettings,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            output_file: PathBuf::from("sgrid.out"),
            verbose: false,
            grid: GridParameters::default(),
            density: DensitySource::default(),
            composition: Composition::default(),
            opacity: OpacityConfig::default(),
            solver: SolverSettings::default(),
        }
    }
}

impl SimulationConfig {
    /// Parse and validate a configuration.
    pub fn from_toml(text: &str) -> SnakeResult<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| SnakeError::configuration("configuration", e.message()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration file.
    pub fn load(path: &Path) -> SnakeResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| SnakeError::resource(path, e.to_string()))?;
        info!("Read configuration from {}", path.display());
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> SnakeResult<()> {
        if self.output_file.as_os_str().is_empty() {
            return Err(SnakeError::configuration(
                "output_file",
                "an output file is required",
            ));
        }
        if self.density.resample_cells == Some(0) {
            return Err(SnakeError::configuration(
                "resample_cells",
                "resample_cells > 0",
            ));
        }
        self.grid.validate()?;
        self.composition.validate()?;
        self.solver.validate()
    }

    /// Build the initial grid from the density source.
    pub fn build_grid(&self) -> SnakeResult<Grid> {
        let Some(path) = &self.density.file else {
            return Grid::generated(self.grid.clone(), self.composition);
        };

        let samples = load_density_samples(path)?;
        match self.density.resample_cells {
            Some(cell_count) => Grid::from_samples_resampled(
                &samples,
                cell_count,
                self.grid.clone(),
                self.composition,
            ),
            None => Grid::from_samples(&samples, self.grid.clone(), self.composition),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = SimulationConfig::from_toml("").unwrap();
        assert_eq!(config, SimulationConfig::default());
        assert_eq!(config.output_file, PathBuf::from("sgrid.out"));
        assert_eq!(config.grid.cell_count, 100);
        assert_eq!(config.solver.max_iterations, 500);
        assert_eq!(config.opacity.table, PathBuf::from("GN93hz"));
    }

    #[test]
    fn test_partial_config() {
        let config = SimulationConfig::from_toml(
            r#"
            output_file = "run.out"

            [grid]
            boundary_temperature = 1e4

            [opacity]
            table = "tables/opacity.dat"
            interpolation = "bicubic"
            "#,
        )
        .unwrap();

        assert_eq!(config.output_file, PathBuf::from("run.out"));
        assert_eq!(config.grid.boundary_temperature, 1e4);
        assert_eq!(config.grid.cell_count, 100);
        assert_eq!(config.opacity.interpolation, Interpolation::Bicubic);
        assert_eq!(config.opacity.mode, OpacityMode::Auto);
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let result = SimulationConfig::from_toml("[opacity]\nmode = \"grey\"\n");
        assert!(matches!(result, Err(SnakeError::Configuration { .. })));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let result = SimulationConfig::from_toml("[solver]\ntolerance = -1.0\n");
        assert!(matches!(result, Err(SnakeError::Configuration { .. })));

        let result = SimulationConfig::from_toml("[density]\nresample_cells = 0\n");
        assert!(matches!(
            result,
            Err(SnakeError::Configuration { parameter, .. }) if parameter == "resample_cells"
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = SimulationConfig::load(Path::new("does/not/exist.toml"));
        assert!(matches!(result, Err(SnakeError::Resource { .. })));
    }

    #[test]
    fn test_mode_from_file_name() {
        let mut opacity = OpacityConfig::default();
        assert_eq!(opacity.resolved_mode(), OpacityMode::Composition);

        opacity.table = PathBuf::from("data/GN93hz");
        assert_eq!(opacity.resolved_mode(), OpacityMode::Composition);

        opacity.table = PathBuf::from("data/rosseland.dat");
        assert_eq!(opacity.resolved_mode(), OpacityMode::Table);

        // An explicit mode wins over the file name
        opacity.table = PathBuf::from("GN93hz");
        opacity.mode = OpacityMode::Table;
        assert_eq!(opacity.resolved_mode(), OpacityMode::Table);
    }

    #[test]
    fn test_composition_provider_needs_table_file() {
        let opacity = OpacityConfig {
            table: PathBuf::from("missing/GN93hz"),
            ..Default::default()
        };
        assert!(matches!(
            opacity.provider(Composition::default()),
            Err(SnakeError::Resource { .. })
        ));

        let dir = tempfile::tempdir().unwrap();
        let table = dir.path().join("GN93hz");
        fs::write(&table, "").unwrap();
        let opacity = OpacityConfig {
            table,
            ..Default::default()
        };
        let provider = opacity.provider(Composition::default()).unwrap();
        assert_eq!(provider.name(), "composition");
    }

    #[test]
    fn test_build_grid_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# depth density").unwrap();
        writeln!(file, "3.0 1e-6").unwrap();
        writeln!(file, "2.0 1e-5").unwrap();
        writeln!(file, "1.0 1e-4").unwrap();

        let mut config = SimulationConfig::default();
        config.density.file = Some(file.path().to_path_buf());
        let grid = config.build_grid().unwrap();
        assert_eq!(grid.len(), 3);
        assert_eq!(grid.cells[0].depth, 1.0);

        config.density.resample_cells = Some(5);
        let grid = config.build_grid().unwrap();
        assert_eq!(grid.len(), 5);
        assert_eq!(grid.cells[4].depth, 3.0);
    }

    #[test]
    fn test_build_generated_grid() {
        let config = SimulationConfig::default();
        let grid = config.build_grid().unwrap();
        assert_eq!(grid.len(), 100);
    }
}
