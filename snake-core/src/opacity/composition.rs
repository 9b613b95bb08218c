use super::{LookupBounds, OpacityProvider, COMPOSITION_TABLE_BOUNDS};
use crate::errors::{SnakeError, SnakeResult};
use crate::parameters::Composition;
use std::fmt::Debug;
use std::path::Path;

/// A composition dependent Rosseland mean opacity routine.
///
/// The routine is opaque to the solver: it receives the metallicity $Z$, hydrogen
/// fraction $X$, the temperature in MK $T_6$ and $R = \rho / T_6^3$, and returns
/// $\log_{10} \kappa_R$ or `None` if it could not produce a value.
pub trait CompositionOpacity: Debug + Send + Sync {
    fn log_rosseland_mean(&self, metallicity: f64, hydrogen: f64, t6: f64, r: f64)
        -> Option<f64>;
}

/// Closed form Rosseland mean opacity.
///
/// Sum of electron scattering and the Kramers free-free and bound-free opacities:
///
/// $$\kappa_{es} = 0.2 (1 + X)$$
/// $$\kappa_{ff} = 3.68 \times 10^{22} (1 - Z)(1 + X) \rho T^{-3.5}$$
/// $$\kappa_{bf} = 4.34 \times 10^{25} Z (1 + X) \rho T^{-3.5}$$
///
/// Used when no tabulated routine is linked in.
#[derive(Debug, Clone, Copy, Default)]
pub struct KramersOpacity;

impl CompositionOpacity for KramersOpacity {
    fn log_rosseland_mean(
        &self,
        metallicity: f64,
        hydrogen: f64,
        t6: f64,
        r: f64,
    ) -> Option<f64> {
        if !(t6 > 0.0 && r >= 0.0) {
            return None;
        }
        let temperature = t6 * 1e6;
        let density = r * t6.powi(3);
        let kramers = density * temperature.powf(-3.5) * (1.0 + hydrogen);

        let electron_scattering = 0.2 * (1.0 + hydrogen);
        let free_free = 3.68e22 * (1.0 - metallicity) * kramers;
        let bound_free = 4.34e25 * metallicity * kramers;

        let kappa = electron_scattering + free_free + bound_free;
        kappa.is_finite().then(|| kappa.log10())
    }
}

/// Opacity from a composition dependent routine.
#[derive(Debug)]
pub struct CompositionTableOpacity {
    composition: Composition,
    routine: Box<dyn CompositionOpacity>,
    bounds: LookupBounds,
}

impl CompositionTableOpacity {
    /// Default identifier of the tabulated composition opacity data.
    pub const DEFAULT_TABLE: &'static str = "GN93hz";

    pub fn new(composition: Composition, routine: Box<dyn CompositionOpacity>) -> Self {
        Self {
            composition,
            routine,
            bounds: COMPOSITION_TABLE_BOUNDS,
        }
    }

    /// Create the provider after checking the routine's data file is present.
    pub fn with_table(
        table: &Path,
        composition: Composition,
        routine: Box<dyn CompositionOpacity>,
    ) -> SnakeResult<Self> {
        if !table.exists() {
            return Err(SnakeError::resource(
                table,
                "composition opacity table not found",
            ));
        }
        composition.validate()?;
        Ok(Self::new(composition, routine))
    }

    pub fn bounds(&self) -> &LookupBounds {
        &self.bounds
    }
}

impl OpacityProvider for CompositionTableOpacity {
    fn name(&self) -> &str {
        "composition"
    }

    fn log_rosseland_mean(&self, cell: usize, log_t: f64, log_r: f64) -> SnakeResult<f64> {
        self.bounds.validate(cell, log_t, log_r, self.name())?;

        let t6 = 10f64.powf(log_t) * 1e-6;
        let r = 10f64.powf(log_r);
        self.routine
            .log_rosseland_mean(self.composition.metals, self.composition.hydrogen, t6, r)
            .ok_or(SnakeError::OpacityNotReturned { cell })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Cell;
    use approx::assert_relative_eq;

    #[derive(Debug)]
    struct FailingRoutine;

    impl CompositionOpacity for FailingRoutine {
        fn log_rosseland_mean(&self, _: f64, _: f64, _: f64, _: f64) -> Option<f64> {
            None
        }
    }

    fn provider() -> CompositionTableOpacity {
        CompositionTableOpacity::new(Composition::default(), Box::new(KramersOpacity))
    }

    #[test]
    fn test_electron_scattering_floor() {
        // Very hot and diffuse gas is dominated by electron scattering
        let log_kappa = KramersOpacity
            .log_rosseland_mean(0.02, 0.7, 100.0, 1e-8)
            .unwrap();
        assert_relative_eq!(10f64.powf(log_kappa), 0.34, max_relative = 1e-3);
    }

    #[test]
    fn test_kramers_scaling() {
        // Cool dense gas follows rho T^-3.5
        let low = KramersOpacity.log_rosseland_mean(0.02, 0.7, 0.01, 1.0).unwrap();
        let high = KramersOpacity.log_rosseland_mean(0.02, 0.7, 0.01, 10.0).unwrap();
        assert!(high > low);
        assert_relative_eq!(high - low, 1.0, max_relative = 1e-3);
    }

    #[test]
    fn test_update_opacity_in_range() {
        let provider = provider();
        let mut cell = Cell::new(0, 0.0, 1e-8, 1e5);
        provider.update_opacity(&mut cell).unwrap();
        assert!(cell.opacity > 0.0);
    }

    #[test]
    fn test_out_of_bounds() {
        let provider = provider();
        // logT = 3.5 is below the composition table
        assert!(matches!(
            provider.log_rosseland_mean(3, 3.5, -3.0),
            Err(SnakeError::TableBounds { cell: 3, .. })
        ));
        // logR = 1.5 is above the table
        assert!(matches!(
            provider.log_rosseland_mean(4, 5.0, 1.5),
            Err(SnakeError::TableBounds { cell: 4, .. })
        ));
        // logR = -7.5 is inside this table
        assert!(provider.log_rosseland_mean(5, 5.0, -7.5).is_ok());
    }

    #[test]
    fn test_routine_failure() {
        let provider = CompositionTableOpacity::new(Composition::default(), Box::new(FailingRoutine));
        assert!(matches!(
            provider.log_rosseland_mean(2, 5.0, -3.0),
            Err(SnakeError::OpacityNotReturned { cell: 2 })
        ));
    }

    #[test]
    fn test_missing_table_file() {
        let result = CompositionTableOpacity::with_table(
            Path::new("definitely/missing/GN93hz"),
            Composition::default(),
            Box::new(KramersOpacity),
        );
        assert!(matches!(result, Err(SnakeError::Resource { .. })));
    }

    #[test]
    fn test_existing_table_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let result = CompositionTableOpacity::with_table(
            file.path(),
            Composition::default(),
            Box::new(KramersOpacity),
        );
        assert!(result.is_ok());
    }
}
