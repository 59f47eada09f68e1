use std::{
    fmt, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One replayed record: feature vector plus ground truth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample<'a> {
    /// Model input.
    pub features: &'a [f64],
    /// Measured value.
    pub actual: f64,
}

/// Immutable, indexable dataset replayed by the driver.
pub trait DatasetSource {
    /// Number of samples.
    fn len(&self) -> usize;

    /// Sample `index`, or `None` when `index >= len()`.
    fn get(&self, index: usize) -> Option<Sample<'_>>;

    /// Whether the dataset holds no samples.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Errors raised while loading tabular data.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// Input file does not exist.
    #[error("dataset file not found: {}", .path.display())]
    Missing {
        /// Expected location.
        path: PathBuf,
    },
    /// Filesystem failure other than a missing file.
    #[error("reading {}: {source}", .path.display())]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// A cell is not a finite number.
    #[error("{}:{line}: column {column} is not a number: {value:?}", .path.display())]
    Parse {
        /// File being parsed.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// 1-based column number.
        column: usize,
        /// Offending cell.
        value: String,
    },
    /// Row width differs from the first data row.
    #[error("{}:{line}: expected {expected} columns, found {found}", .path.display())]
    Ragged {
        /// File being parsed.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// Width of the first row.
        expected: usize,
        /// Width of this row.
        found: usize,
    },
    /// Feature rows and targets disagree in count.
    #[error("{features} feature rows but {targets} targets")]
    LengthMismatch {
        /// Feature row count.
        features: usize,
        /// Target count.
        targets: usize,
    },
}

/// Row-major in-memory dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularDataset {
    width: usize,
    features: Vec<f64>,
    targets: Vec<f64>,
}

impl TabularDataset {
    /// Builds a dataset from rows and targets.
    pub fn from_rows(rows: Vec<Vec<f64>>, targets: Vec<f64>) -> Result<Self, DatasetError> {
        if rows.len() != targets.len() {
            return Err(DatasetError::LengthMismatch {
                features: rows.len(),
                targets: targets.len(),
            });
        }
        let width = rows.first().map_or(0, Vec::len);
        let mut features = Vec::with_capacity(width * rows.len());
        for (idx, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(DatasetError::Ragged {
                    path: PathBuf::from("<memory>"),
                    line: idx + 1,
                    expected: width,
                    found: row.len(),
                });
            }
            features.extend(row);
        }
        Ok(Self {
            width,
            features,
            targets,
        })
    }

    /// Loads a features CSV and a targets CSV. Both files carry a header row;
    /// targets are flattened in row order.
    pub fn from_csv(
        features_path: impl AsRef<Path>,
        targets_path: impl AsRef<Path>,
    ) -> Result<Self, DatasetError> {
        let rows = read_numeric_csv(features_path.as_ref())?;
        let targets = read_numeric_csv(targets_path.as_ref())?
            .into_iter()
            .flatten()
            .collect();
        Self::from_rows(rows, targets)
    }

    /// Features per sample.
    #[must_use]
    pub const fn feature_width(&self) -> usize {
        self.width
    }

    /// Ground-truth values in sample order.
    #[must_use]
    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    /// Count, width and target range.
    #[must_use]
    pub fn summary(&self) -> DatasetSummary {
        let samples = self.targets.len();
        let (min, max) = self
            .targets
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        #[allow(clippy::cast_precision_loss)]
        let mean = (samples > 0).then(|| self.targets.iter().sum::<f64>() / samples as f64);
        DatasetSummary {
            samples,
            features: self.width,
            target_min: (samples > 0).then_some(min),
            target_mean: mean,
            target_max: (samples > 0).then_some(max),
        }
    }
}

impl DatasetSource for TabularDataset {
    fn len(&self) -> usize {
        self.targets.len()
    }

    fn get(&self, index: usize) -> Option<Sample<'_>> {
        let actual = *self.targets.get(index)?;
        let start = index * self.width;
        let features = self.features.get(start..start + self.width)?;
        Some(Sample { features, actual })
    }
}

/// Shape and target statistics of a loaded dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    /// Sample count.
    pub samples: usize,
    /// Features per sample.
    pub features: usize,
    /// Smallest target.
    pub target_min: Option<f64>,
    /// Mean target.
    pub target_mean: Option<f64>,
    /// Largest target.
    pub target_max: Option<f64>,
}

impl fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Loaded {} samples with {} features.",
            self.samples, self.features
        )
    }
}

fn read_numeric_csv(path: &Path) -> Result<Vec<Vec<f64>>, DatasetError> {
    let raw = fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => DatasetError::Missing {
            path: path.to_path_buf(),
        },
        _ => DatasetError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;
    let mut rows = Vec::new();
    let mut width = None;
    let data_lines = raw
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .skip(1);
    for (idx, line) in data_lines {
        let row = parse_row(path, idx + 1, line)?;
        let expected = *width.get_or_insert(row.len());
        if row.len() != expected {
            return Err(DatasetError::Ragged {
                path: path.to_path_buf(),
                line: idx + 1,
                expected,
                found: row.len(),
            });
        }
        rows.push(row);
    }
    Ok(rows)
}

fn parse_row(path: &Path, line_no: usize, line: &str) -> Result<Vec<f64>, DatasetError> {
    line.split(',')
        .enumerate()
        .map(|(col, cell)| {
            let cell = cell.trim().trim_matches('"');
            cell.parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| DatasetError::Parse {
                    path: path.to_path_buf(),
                    line: line_no,
                    column: col + 1,
                    value: cell.to_string(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn loads_features_and_flattened_targets() {
        let tmp = tempdir().unwrap();
        let x = write(
            tmp.path(),
            "x.csv",
            "ambient,coolant,torque\n19.1,18.8,0.5\n\n19.2,18.9,0.7\r\n",
        );
        let y = write(tmp.path(), "y.csv", "pm\n24.5\n24.9\n");
        let dataset = TabularDataset::from_csv(&x, &y).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.feature_width(), 3);
        let sample = dataset.get(1).unwrap();
        assert_eq!(sample.features, &[19.2, 18.9, 0.7]);
        assert!((sample.actual - 24.9).abs() < 1e-12);
        assert!(dataset.get(2).is_none());
        assert_eq!(
            dataset.summary().to_string(),
            "Loaded 2 samples with 3 features."
        );
    }

    #[test]
    fn missing_file_is_reported() {
        let tmp = tempdir().unwrap();
        let y = write(tmp.path(), "y.csv", "pm\n1\n");
        let err = TabularDataset::from_csv(tmp.path().join("nope.csv"), &y).unwrap_err();
        assert!(matches!(err, DatasetError::Missing { .. }));
    }

    #[test]
    fn bad_cell_reports_position() {
        let tmp = tempdir().unwrap();
        let x = write(tmp.path(), "x.csv", "a,b\n1,2\n3,oops\n");
        let y = write(tmp.path(), "y.csv", "pm\n1\n2\n");
        match TabularDataset::from_csv(&x, &y).unwrap_err() {
            DatasetError::Parse { line, column, value, .. } => {
                assert_eq!((line, column), (3, 2));
                assert_eq!(value, "oops");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn ragged_rows_and_count_mismatch_are_rejected() {
        let tmp = tempdir().unwrap();
        let x = write(tmp.path(), "x.csv", "a,b\n1,2\n3\n");
        let y = write(tmp.path(), "y.csv", "pm\n1\n2\n");
        assert!(matches!(
            TabularDataset::from_csv(&x, &y).unwrap_err(),
            DatasetError::Ragged { expected: 2, found: 1, .. }
        ));
        let err = TabularDataset::from_rows(vec![vec![1.0]], vec![1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::LengthMismatch { features: 1, targets: 2 }
        ));
    }

    #[test]
    fn summary_covers_target_range() {
        let dataset =
            TabularDataset::from_rows(vec![vec![0.0], vec![0.0], vec![0.0]], vec![20.0, 40.0, 90.0])
                .unwrap();
        let summary = dataset.summary();
        assert_eq!(summary.target_min, Some(20.0));
        assert_eq!(summary.target_max, Some(90.0));
        assert!((summary.target_mean.unwrap() - 50.0).abs() < 1e-12);
        assert!(TabularDataset::from_rows(vec![], vec![]).unwrap().is_empty());
    }
}
