//! Benchmark parameters
//!
//! Every benchmark runs with literal defaults. A YAML file can override any
//! field, and the command line overrides the file.

use crate::candidates::{ListStrategy, RemapStrategy, SelectStrategy};
use crate::dataset::{NormSpec, CATEGORY_COLUMN, MONTH_COLUMN, QUARTER_COLUMN};
use crate::errors::{BenchError, BenchResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BenchConfig {
    pub list: ListConfig,
    pub remap: RemapConfig,
    pub select: SelectConfig,
}

impl BenchConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> BenchResult<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(BenchError::IoError)?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> BenchResult<Self> {
        serde_yaml::from_str(text).map_err(|e| BenchError::ConfigError(e, None))
    }
}

/// Column-to-sequence benchmark over a synthetic normal table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ListConfig {
    pub column: String,
    pub repetitions: usize,
    pub replications: usize,
    pub rows: usize,
    pub columns: usize,
    pub loc: f64,
    pub scale: f64,
    pub seed: Option<u64>,
    pub candidates: Vec<ListStrategy>,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            column: "col7".to_string(),
            repetitions: 1000,
            replications: 100,
            rows: 42,
            columns: 13,
            loc: 69.0,
            scale: 13.0,
            seed: None,
            candidates: ListStrategy::ALL.to_vec(),
        }
    }
}

impl ListConfig {
    pub fn norm_spec(&self) -> NormSpec {
        NormSpec {
            rows: self.rows,
            columns: self.columns,
            loc: self.loc,
            scale: self.scale,
            seed: self.seed,
        }
    }
}

/// Month-code to quarter-code remap benchmark.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RemapConfig {
    pub year: u16,
    pub source: String,
    pub target: String,
    pub repetitions: usize,
    pub replications: usize,
    pub candidates: Vec<RemapStrategy>,
}

impl Default for RemapConfig {
    fn default() -> Self {
        Self {
            year: 2021,
            source: MONTH_COLUMN.to_string(),
            target: QUARTER_COLUMN.to_string(),
            repetitions: 1000,
            replications: 10,
            candidates: RemapStrategy::ALL.to_vec(),
        }
    }
}

/// Row-selection benchmark over a large table loaded from feather and CSV.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SelectConfig {
    pub feather_path: PathBuf,
    pub csv_path: PathBuf,
    pub column: String,
    pub value: String,
    pub repetitions: usize,
    pub replications: usize,
    pub chunk_size: usize,
    /// Write both data files before benchmarking.
    pub generate: bool,
    pub rows_per_category: usize,
    pub int_columns: usize,
    /// Downcast integers and categorise strings before writing the feather file.
    pub optimize: bool,
    pub seed: Option<u64>,
    pub candidates: Vec<SelectStrategy>,
}

impl Default for SelectConfig {
    fn default() -> Self {
        Self {
            feather_path: PathBuf::from("very_large.feather"),
            csv_path: PathBuf::from("very_large.csv"),
            column: CATEGORY_COLUMN.to_string(),
            value: "A".to_string(),
            repetitions: 10,
            replications: 5,
            chunk_size: 1_000_000,
            generate: false,
            rows_per_category: 2_500_000,
            int_columns: 50,
            optimize: true,
            seed: None,
            candidates: SelectStrategy::ALL.to_vec(),
        }
    }
}

impl SelectConfig {
    /// Whether both data files are present or will be generated.
    pub fn inputs_available(&self) -> bool {
        self.generate || (self.feather_path.exists() && self.csv_path.exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_literals() {
        let config = BenchConfig::default();
        assert_eq!(config.list.column, "col7");
        assert_eq!(config.list.repetitions, 1000);
        assert_eq!(config.list.replications, 100);
        assert_eq!(config.remap.replications, 10);
        assert_eq!(config.select.repetitions, 10);
        assert_eq!(config.select.replications, 5);
        assert_eq!(config.select.value, "A");
        assert_eq!(config.select.candidates.len(), 3);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
list:
  repetitions: 5
  candidates: [native, export]
select:
  value: "B"
  csv_path: "data/rows.csv"
"#;
        let config = BenchConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.list.repetitions, 5);
        assert_eq!(config.list.replications, 100);
        assert_eq!(
            config.list.candidates,
            vec![ListStrategy::Native, ListStrategy::Export]
        );
        assert_eq!(config.select.value, "B");
        assert_eq!(config.select.csv_path, PathBuf::from("data/rows.csv"));
        assert_eq!(config.remap, RemapConfig::default());
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(BenchConfig::from_yaml("{}").unwrap(), BenchConfig::default());
    }

    #[test]
    fn test_bad_yaml_is_config_error() {
        let err = BenchConfig::from_yaml("list:\n  repetitions: lots\n").unwrap_err();
        assert!(matches!(err, BenchError::ConfigError(..)));
    }

    #[test]
    fn test_unknown_candidate_rejected() {
        let err = BenchConfig::from_yaml("remap:\n  candidates: [regex]\n").unwrap_err();
        assert!(matches!(err, BenchError::ConfigError(..)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = BenchConfig::from_path("/no/such/bench.yaml").unwrap_err();
        assert!(matches!(err, BenchError::IoError(_)));
    }

    #[test]
    fn test_inputs_available() {
        let mut select = SelectConfig {
            feather_path: PathBuf::from("/no/such.feather"),
            ..Default::default()
        };
        assert!(!select.inputs_available());
        select.generate = true;
        assert!(select.inputs_available());
    }
}
