use super::interpolate::Interpolation;
use super::{LookupBounds, OpacityProvider, PRECOMPUTED_TABLE_BOUNDS};
use crate::errors::{SnakeError, SnakeResult};
use log::{debug, info};
use ndarray::Array2;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Number of header tokens preceding the table data
const HEADER_TOKENS: usize = 2;

/// A precomputed $(\log T, \log R) \to \log \kappa_R$ table.
///
/// # File format
///
/// Two header tokens (conventionally `logR` and `logT`) followed by one table row
/// per line:
///
/// ```text
///            logR
///   logT
///   +0.000 -7.000 -6.500 ...   <- corner placeholder, then the logR axis
///   +3.200 -2.132 -1.998 ...   <- logT, then logRMO for every logR
///   ...
/// ```
///
/// Every row must have the same number of values.
#[derive(Debug, Clone, PartialEq)]
pub struct OpacityTable {
    log_t: Vec<f64>,
    log_r: Vec<f64>,
    /// Indexed `[logT index, logR index]`
    log_rmo: Array2<f64>,
}

impl OpacityTable {
    /// Build a table from its axes and values.
    ///
    /// Both axes must be strictly increasing with at least two points and `log_rmo`
    /// must have shape `(log_t.len(), log_r.len())`.
    pub fn new(log_t: Vec<f64>, log_r: Vec<f64>, log_rmo: Array2<f64>) -> SnakeResult<Self> {
        check_axis("logT", &log_t)?;
        check_axis("logR", &log_r)?;
        if log_rmo.dim() != (log_t.len(), log_r.len()) {
            return Err(SnakeError::configuration(
                "opacity table",
                format!(
                    "table of shape {:?} does not match axes of length ({}, {})",
                    log_rmo.dim(),
                    log_t.len(),
                    log_r.len()
                ),
            ));
        }
        Ok(Self {
            log_t,
            log_r,
            log_rmo,
        })
    }

    /// Parse a table from a reader. `source_name` is used in error messages.
    pub fn read<R: BufRead>(reader: R, source_name: &str) -> SnakeResult<Self> {
        let mut header_skipped = 0;
        let mut rows: Vec<Vec<f64>> = Vec::new();

        for (line_index, line) in reader.lines().enumerate() {
            let line_num = line_index + 1;
            let line =
                line.map_err(|e| SnakeError::format(source_name, line_num, e.to_string()))?;
            let mut tokens = line.split_whitespace().peekable();

            while header_skipped < HEADER_TOKENS {
                match tokens.next() {
                    Some(token) if token.parse::<f64>().is_err() => header_skipped += 1,
                    Some(token) => {
                        return Err(SnakeError::format(
                            source_name,
                            line_num,
                            format!("didn't discard header, found value {}", token),
                        ))
                    }
                    None => break,
                }
            }
            if tokens.peek().is_none() {
                continue;
            }

            let row = tokens
                .map(|token| token.parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| SnakeError::format(source_name, line_num, e.to_string()))?;
            if let Some(first) = rows.first() {
                if row.len() != first.len() {
                    return Err(SnakeError::format(
                        source_name,
                        line_num,
                        format!("expected {} values, found {}", first.len(), row.len()),
                    ));
                }
            }
            rows.push(row);
        }

        if header_skipped < HEADER_TOKENS {
            return Err(SnakeError::format(source_name, 1, "missing table header"));
        }
        if rows.len() < 3 || rows[0].len() < 3 {
            return Err(SnakeError::format(
                source_name,
                rows.len(),
                "table needs at least two logT rows and two logR columns",
            ));
        }

        let log_r = rows[0][1..].to_vec();
        let log_t: Vec<f64> = rows[1..].iter().map(|row| row[0]).collect();
        let values: Vec<f64> = rows[1..]
            .iter()
            .flat_map(|row| row[1..].iter().copied())
            .collect();
        let log_rmo = Array2::from_shape_vec((log_t.len(), log_r.len()), values).map_err(|e| {
            SnakeError::format(source_name, rows.len(), e.to_string())
        })?;

        debug!(
            "Read {} x {} opacity table from {}",
            log_t.len(),
            log_r.len(),
            source_name
        );
        Self::new(log_t, log_r, log_rmo)
    }

    /// Read a table from a file.
    ///
    /// A file which is absent, unreadable or malformed is a `Resource` error.
    pub fn load(path: &Path) -> SnakeResult<Self> {
        let file = File::open(path).map_err(|e| SnakeError::resource(path, e.to_string()))?;
        info!("Opacity table {} opened", path.display());
        Self::read(BufReader::new(file), &path.display().to_string()).map_err(|e| match e {
            SnakeError::Format { .. } | SnakeError::Configuration { .. } => {
                SnakeError::resource(path, e.to_string())
            }
            other => other,
        })
    }

    pub fn log_t(&self) -> &[f64] {
        &self.log_t
    }

    pub fn log_r(&self) -> &[f64] {
        &self.log_r
    }

    pub fn log_rmo(&self) -> &Array2<f64> {
        &self.log_rmo
    }

    /// The region covered by the axes. Interpolation outside it is not supported.
    pub fn domain(&self) -> LookupBounds {
        LookupBounds {
            min_log_t: self.log_t[0],
            max_log_t: self.log_t[self.log_t.len() - 1],
            min_log_r: self.log_r[0],
            max_log_r: self.log_r[self.log_r.len() - 1],
        }
    }

    pub fn interpolate(&self, scheme: Interpolation, log_t: f64, log_r: f64) -> f64 {
        scheme.evaluate(&self.log_t, &self.log_r, &self.log_rmo, log_t, log_r)
    }
}

fn check_axis(name: &str, axis: &[f64]) -> SnakeResult<()> {
    if axis.len() < 2 {
        return Err(SnakeError::configuration(
            "opacity table",
            format!("{} axis needs at least two points", name),
        ));
    }
    if axis.windows(2).any(|pair| !(pair[1] > pair[0])) {
        return Err(SnakeError::configuration(
            "opacity table",
            format!("{} axis must be strictly increasing", name),
        ));
    }
    Ok(())
}

/// Opacity interpolated from a precomputed table.
#[derive(Debug, Clone)]
pub struct TableOpacity {
    table: OpacityTable,
    interpolation: Interpolation,
    bounds: LookupBounds,
}

impl TableOpacity {
    pub fn new(table: OpacityTable, interpolation: Interpolation) -> Self {
        Self {
            table,
            interpolation,
            bounds: PRECOMPUTED_TABLE_BOUNDS,
        }
    }

    pub fn load(path: &Path, interpolation: Interpolation) -> SnakeResult<Self> {
        let table = OpacityTable::load(path)?;
        info!("Using {:?} interpolation over opacity table", interpolation);
        Ok(Self::new(table, interpolation))
    }

    pub fn table(&self) -> &OpacityTable {
        &self.table
    }

    pub fn bounds(&self) -> &LookupBounds {
        &self.bounds
    }
}

impl OpacityProvider for TableOpacity {
    fn name(&self) -> &str {
        "precomputed"
    }

    fn log_rosseland_mean(&self, cell: usize, log_t: f64, log_r: f64) -> SnakeResult<f64> {
        self.bounds.validate(cell, log_t, log_r, self.name())?;
        self.table.domain().validate(cell, log_t, log_r, self.name())?;
        Ok(self.table.interpolate(self.interpolation, log_t, log_r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LookupAxis;
    use crate::grid::Cell;
    use approx::assert_relative_eq;
    use std::io::Write;

    const TABLE: &str = "\
                 logR
  logT
 +0.000 -7.000 -3.000 +1.000
 +3.000 -2.000 -1.000 +0.000
 +6.000 -1.000 +0.000 +1.000
 +9.000 +0.000 +1.000 +2.000
";

    #[test]
    fn test_read_table() {
        let table = OpacityTable::read(TABLE.as_bytes(), "inline").unwrap();
        assert_eq!(table.log_t(), &[3.0, 6.0, 9.0]);
        assert_eq!(table.log_r(), &[-7.0, -3.0, 1.0]);
        assert_eq!(table.log_rmo()[[1, 2]], 1.0);
        assert_eq!(table.log_rmo()[[2, 0]], 0.0);
    }

    #[test]
    fn test_header_on_single_line() {
        let text = "logR logT\n0 1 2\n1 0.5 0.25\n2 0.1 0.2\n";
        let table = OpacityTable::read(text.as_bytes(), "inline").unwrap();
        assert_eq!(table.log_r(), &[1.0, 2.0]);
        assert_eq!(table.log_t(), &[1.0, 2.0]);
    }

    #[test]
    fn test_numeric_header_rejected() {
        let text = "1.0 logT\n0 1 2\n1 0.5 0.25\n2 0.1 0.2\n";
        assert!(matches!(
            OpacityTable::read(text.as_bytes(), "inline"),
            Err(SnakeError::Format { line: 1, .. })
        ));
    }

    #[test]
    fn test_ragged_row_rejected() {
        let text = "logR\nlogT\n0 1 2\n1 0.5\n2 0.1 0.2\n";
        assert!(matches!(
            OpacityTable::read(text.as_bytes(), "inline"),
            Err(SnakeError::Format { line: 4, .. })
        ));
    }

    #[test]
    fn test_non_monotonic_axis_rejected() {
        let text = "logR\nlogT\n0 1 2\n2 0.5 0.25\n1 0.1 0.2\n";
        assert!(matches!(
            OpacityTable::read(text.as_bytes(), "inline"),
            Err(SnakeError::Configuration { .. })
        ));
    }

    #[test]
    fn test_missing_table_file() {
        assert!(matches!(
            OpacityTable::load(Path::new("missing/opacity.dat")),
            Err(SnakeError::Resource { .. })
        ));
    }

    #[test]
    fn test_malformed_table_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"logR\nlogT\n0 1 2\n1 0.5\n2 0.1 0.2\n").unwrap();
        let err = OpacityTable::load(file.path()).unwrap_err();
        assert!(matches!(err, SnakeError::Resource { .. }));
        assert!(err.to_string().contains("line 4"), "{}", err);
        assert_eq!(err.exit_code(), 4);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"logR\nlogT\n0 1 2\n2 0.5 0.25\n1 0.1 0.2\n").unwrap();
        assert!(matches!(
            OpacityTable::load(file.path()),
            Err(SnakeError::Resource { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TABLE.as_bytes()).unwrap();
        let provider = TableOpacity::load(file.path(), Interpolation::Bicubic).unwrap();
        assert_eq!(provider.table().log_t().len(), 3);
    }

    #[test]
    fn test_lookup_interpolates() {
        let table = OpacityTable::read(TABLE.as_bytes(), "inline").unwrap();
        let provider = TableOpacity::new(table, Interpolation::Bilinear);

        // The table is the plane logRMO = (logT - 3) / 3 + (logR + 7) / 4 - 2
        let value = provider.log_rosseland_mean(0, 4.5, -5.0).unwrap();
        assert_relative_eq!(value, 0.5 + 0.5 - 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_out_of_bounds() {
        let table = OpacityTable::read(TABLE.as_bytes(), "inline").unwrap();
        let provider = TableOpacity::new(table, Interpolation::Bilinear);

        // logT = 3.0 is inside the precomputed table but logR = -7.5 is not
        assert!(matches!(
            provider.log_rosseland_mean(9, 3.0, -7.5),
            Err(SnakeError::TableBounds { cell: 9, .. })
        ));
        // logT = 8.6 is beyond this table's upper bound of 8.5
        assert!(matches!(
            provider.log_rosseland_mean(1, 8.6, 0.0),
            Err(SnakeError::TableBounds { cell: 1, .. })
        ));
    }

    #[test]
    fn test_lookup_outside_loaded_axes() {
        let text = "logR\nlogT\n0 -3 -2\n4 0.5 1.0\n5 1.5 2.0\n";
        let table = OpacityTable::read(text.as_bytes(), "inline").unwrap();
        let provider = TableOpacity::new(table, Interpolation::Bilinear);

        // Inside the precomputed bounds but beyond both axes of this table
        assert!(matches!(
            provider.log_rosseland_mean(0, 8.0, 0.5),
            Err(SnakeError::TableBounds {
                cell: 0,
                axis: LookupAxis::LogR,
                ..
            })
        ));
        assert!(matches!(
            provider.log_rosseland_mean(3, 6.0, -2.5),
            Err(SnakeError::TableBounds {
                cell: 3,
                axis: LookupAxis::LogT,
                max,
                ..
            }) if max == 5.0
        ));
        // Table edges are still inside
        assert_relative_eq!(provider.log_rosseland_mean(0, 5.0, -2.0).unwrap(), 2.0);
        assert_relative_eq!(provider.log_rosseland_mean(0, 4.5, -2.5).unwrap(), 1.25);
    }

    #[test]
    fn test_update_opacity() {
        let table = OpacityTable::read(TABLE.as_bytes(), "inline").unwrap();
        let provider = TableOpacity::new(table, Interpolation::Bicubic);

        // logT = 6, logR = log10(1e-3 / 1) = -3 which is a table node
        let mut cell = Cell::new(0, 0.0, 1e-3, 1e6);
        provider.update_opacity(&mut cell).unwrap();
        assert_relative_eq!(cell.opacity, 1.0, max_relative = 1e-9);
    }
}
