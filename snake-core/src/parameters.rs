//! Run Parameters
//!
//! Scalar parameters describing the column, its composition and the iteration
//! controls. All structs deserialise with `#[serde(default)]` so a configuration
//! only has to name the values it changes.

use crate::errors::{SnakeError, SnakeResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Geometry of the atmosphere.
///
/// Both geometries are solved as a single 1D column by symmetry, the choice is
/// carried through for reporting only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Geometry {
    #[default]
    Planar,
    Spherical,
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Geometry::Planar => write!(f, "planar"),
            Geometry::Spherical => write!(f, "spherical"),
        }
    }
}

/// Parameters for the cell grid.
///
/// # Default Values
///
/// The defaults describe a small planar atmosphere of 100 cells over $10^{10}$ cm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridParameters {
    /// Number of cells for a generated density profile.
    /// Default: 100
    pub cell_count: usize,

    /// Extent of the column (cm). Also the width of the generated density profile.
    /// Default: 1e10
    pub column_extent: f64,

    /// Boundary (disk) temperature driving the Eddington boundary condition (K).
    /// Default: 4e4
    pub boundary_temperature: f64,

    /// Temperature every cell starts from (K).
    /// Default: 1e5
    pub initial_temperature: f64,

    /// Central density of the generated profile ($\text{g/cm}^3$).
    /// Default: 1e-5
    pub density_scale: f64,

    /// Default: planar
    pub geometry: Geometry,
}

impl Default for GridParameters {
    fn default() -> Self {
        Self {
            cell_count: 100,
            column_extent: 1e10,
            boundary_temperature: 4e4,
            initial_temperature: 1e5,
            density_scale: 1e-5,
            geometry: Geometry::Planar,
        }
    }
}

impl GridParameters {
    /// Width of a cell for a uniformly spaced grid of `cell_count` cells.
    pub fn cell_width(&self) -> f64 {
        self.column_extent / self.cell_count as f64
    }

    /// Check the values are physically meaningful.
    ///
    /// The cell count is checked when the grid is allocated, since a sample file
    /// determines the count on its own.
    pub fn validate(&self) -> SnakeResult<()> {
        if !(self.column_extent >= 0.0) {
            return Err(SnakeError::configuration(
                "column_extent",
                "column_extent >= 0",
            ));
        }
        if !(self.boundary_temperature >= 0.0) {
            return Err(SnakeError::configuration(
                "boundary_temperature",
                "boundary_temperature >= 0",
            ));
        }
        if !(self.initial_temperature > 0.0) {
            return Err(SnakeError::configuration(
                "initial_temperature",
                "initial_temperature > 0",
            ));
        }
        if !(self.density_scale >= 0.0) {
            return Err(SnakeError::configuration(
                "density_scale",
                "density_scale >= 0",
            ));
        }
        Ok(())
    }
}

/// Mass fractions of the gas.
///
/// Defaults are a roughly solar composition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Composition {
    /// Hydrogen mass fraction X.
    /// Default: 0.74
    pub hydrogen: f64,

    /// Metal mass fraction Z.
    /// Default: 0.02
    pub metals: f64,
}

impl Default for Composition {
    fn default() -> Self {
        Self {
            hydrogen: 0.74,
            metals: 0.02,
        }
    }
}

impl Composition {
    /// Helium mass fraction, $Y = 1 - X - Z$.
    pub fn helium(&self) -> f64 {
        1.0 - self.hydrogen - self.metals
    }

    pub fn validate(&self) -> SnakeResult<()> {
        if !(0.0..=1.0).contains(&self.hydrogen) {
            return Err(SnakeError::configuration("hydrogen", "0 <= X <= 1"));
        }
        if !(0.0..=1.0).contains(&self.metals) {
            return Err(SnakeError::configuration("metals", "0 <= Z <= 1"));
        }
        if self.hydrogen + self.metals > 1.0 {
            return Err(SnakeError::configuration(
                "hydrogen",
                format!(
                    "invalid choice for X = {} or Z = {}: X + Z <= 1",
                    self.hydrogen, self.metals
                ),
            ));
        }
        Ok(())
    }
}

/// Controls for the Eddington iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Fraction of cells which must be converged for the grid to be converged.
    /// Default: 0.9
    pub convergence_fraction: f64,

    /// Relative temperature change below which a cell is converged.
    /// Default: 0.05
    pub tolerance: f64,

    /// Hard cap on the number of iterations.
    /// Default: 500
    pub max_iterations: usize,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            convergence_fraction: 0.9,
            tolerance: 0.05,
            max_iterations: 500,
        }
    }
}

impl SolverSettings {
    pub fn validate(&self) -> SnakeResult<()> {
        if !(self.convergence_fraction > 0.0 && self.convergence_fraction <= 1.0) {
            return Err(SnakeError::configuration(
                "convergence_fraction",
                "0 < convergence_fraction <= 1",
            ));
        }
        if !(self.tolerance > 0.0) {
            return Err(SnakeError::configuration("tolerance", "tolerance > 0"));
        }
        if self.max_iterations == 0 {
            return Err(SnakeError::configuration(
                "max_iterations",
                "max_iterations > 0",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parameters() {
        let params = GridParameters::default();
        assert_eq!(params.cell_count, 100);
        assert!((params.column_extent - 1e10).abs() < 1e-3);
        assert!((params.boundary_temperature - 4e4).abs() < 1e-10);
        assert_eq!(params.geometry, Geometry::Planar);
        assert!(params.validate().is_ok());

        let settings = SolverSettings::default();
        assert_eq!(settings.max_iterations, 500);
        assert!((settings.convergence_fraction - 0.9).abs() < 1e-12);
        assert!((settings.tolerance - 0.05).abs() < 1e-12);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_cell_width() {
        let params = GridParameters {
            cell_count: 10,
            column_extent: 100.0,
            ..Default::default()
        };
        assert!((params.cell_width() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_helium_fraction() {
        let composition = Composition::default();
        assert!((composition.helium() - 0.24).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_composition() {
        let composition = Composition {
            hydrogen: 0.9,
            metals: 0.2,
        };
        assert!(matches!(
            composition.validate(),
            Err(SnakeError::Configuration { .. })
        ));
    }

    #[test]
    fn test_invalid_solver_settings() {
        let settings = SolverSettings {
            convergence_fraction: 0.0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let settings = SolverSettings {
            max_iterations: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_invalid_grid_parameters() {
        let params = GridParameters {
            initial_temperature: 0.0,
            ..Default::default()
        };
        assert!(params.validate().is_err());

        let params = GridParameters {
            column_extent: -1.0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_partial_deserialization() {
        let json = r#"{"cell_count": 10, "geometry": "spherical"}"#;
        let params: GridParameters =
            serde_json::from_str(json).expect("Partial deserialization failed");

        assert_eq!(params.cell_count, 10);
        assert_eq!(params.geometry, Geometry::Spherical);
        assert!((params.initial_temperature - 1e5).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_geometry_rejected() {
        let json = r#"{"geometry": "toroidal"}"#;
        assert!(serde_json::from_str::<GridParameters>(json).is_err());
    }

    #[test]
    fn test_toml_serialization() {
        let settings = SolverSettings::default();
        let serialised = toml::to_string(&settings).unwrap();
        let parsed: SolverSettings = toml::from_str(&serialised).unwrap();
        assert_eq!(parsed.max_iterations, settings.max_iterations);
    }
}
