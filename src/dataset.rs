//! Dataset providers
//!
//! Builds the tables the benchmarks run against: a synthetic table of
//! normal-distributed columns, the literal month/quarter lookup table and a
//! large integer table with a repeating category column.

use crate::errors::{BenchError, BenchResult};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Column holding `YYYY/MM` codes in the month table.
pub const MONTH_COLUMN: &str = "Cal Yr-Mth";

/// Column the remap benchmark writes quarter codes into.
pub const QUARTER_COLUMN: &str = "Yr-Qtr";

/// Column holding the repeating `A..D` labels of the category table.
pub const CATEGORY_COLUMN: &str = "category";

pub const CATEGORIES: [&str; 4] = ["A", "B", "C", "D"];

/// Shape and distribution of a synthetic normal table.
#[derive(Debug, Clone, PartialEq)]
pub struct NormSpec {
    pub rows: usize,
    pub columns: usize,
    pub loc: f64,
    pub scale: f64,
    pub seed: Option<u64>,
}

impl Default for NormSpec {
    fn default() -> Self {
        Self {
            rows: 42,
            columns: 13,
            loc: 69.0,
            scale: 13.0,
            seed: None,
        }
    }
}

fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Create a table of `spec.columns` float columns named `col0..`, each
/// drawn from N(loc, scale).
pub fn create_dataframe_norm(spec: &NormSpec) -> BenchResult<DataFrame> {
    let normal = Normal::new(spec.loc, spec.scale)
        .map_err(|e| BenchError::config(format!("Invalid normal distribution: {}", e)))?;
    let mut rng = rng_from(spec.seed);

    let columns: Vec<Column> = (0..spec.columns)
        .map(|i| {
            let values: Vec<f64> = (0..spec.rows).map(|_| normal.sample(&mut rng)).collect();
            Column::new(format!("col{}", i).into(), values)
        })
        .collect();

    Ok(DataFrame::new(columns)?)
}

/// Convert a `YYYY/MM` month code into its `YYYY-nQ` quarter code.
pub fn month_to_quarter(code: &str) -> BenchResult<String> {
    let pattern = regex::Regex::new(r"^(\d{4})/(\d{2})$")
        .map_err(|e| BenchError::Unknown(e.into()))?;
    let caps = pattern
        .captures(code)
        .ok_or_else(|| BenchError::InvalidCode(code.to_string()))?;

    let month: u32 = caps[2]
        .parse()
        .map_err(|_| BenchError::InvalidCode(code.to_string()))?;
    if !(1..=12).contains(&month) {
        return Err(BenchError::InvalidCode(code.to_string()));
    }

    Ok(format!("{}-{}Q", &caps[1], (month - 1) / 3 + 1))
}

fn month_codes(year: u16) -> Vec<String> {
    (1..=12).map(|m| format!("{}/{:02}", year, m)).collect()
}

/// The twelve month codes of `year` in a single [`MONTH_COLUMN`] column.
pub fn month_table(year: u16) -> BenchResult<DataFrame> {
    Ok(df! { MONTH_COLUMN => month_codes(year) }?)
}

/// Month code to quarter code for every month of `year`.
pub fn quarter_mapping(year: u16) -> BenchResult<HashMap<String, String>> {
    month_codes(year)
        .into_iter()
        .map(|code| {
            let quarter = month_to_quarter(&code)?;
            Ok((code, quarter))
        })
        .collect()
}

/// Create `int_columns` columns `x_0..` of integers in `[0, 100)` plus a
/// [`CATEGORY_COLUMN`] cycling through [`CATEGORIES`].
/// The table has `4 * rows_per_category` rows.
pub fn create_category_table(
    rows_per_category: usize,
    int_columns: usize,
    seed: Option<u64>,
) -> BenchResult<DataFrame> {
    let rows = rows_per_category * CATEGORIES.len();
    let mut rng = rng_from(seed);

    let mut columns: Vec<Column> = (0..int_columns)
        .map(|i| {
            let values: Vec<i64> = (0..rows).map(|_| rng.gen_range(0..100)).collect();
            Column::new(format!("x_{}", i).into(), values)
        })
        .collect();

    let categories: Vec<&str> = CATEGORIES.iter().copied().cycle().take(rows).collect();
    columns.push(Column::new(CATEGORY_COLUMN.into(), categories));

    Ok(DataFrame::new(columns)?)
}

fn smallest_int_type(min: i64, max: i64) -> DataType {
    if min >= i8::MIN as i64 && max <= i8::MAX as i64 {
        DataType::Int8
    } else if min >= i16::MIN as i64 && max <= i16::MAX as i64 {
        DataType::Int16
    } else if min >= i32::MIN as i64 && max <= i32::MAX as i64 {
        DataType::Int32
    } else {
        DataType::Int64
    }
}

/// Downcast integer columns to the smallest signed type that holds their
/// values and turn string columns into categoricals.
pub fn optimize_columns(df: DataFrame) -> BenchResult<DataFrame> {
    let mut columns = Vec::with_capacity(df.width());

    for column in df.get_columns() {
        let dtype = column.dtype();
        let optimized = if dtype.is_integer() {
            let wide = column.cast(&DataType::Int64)?;
            let ca = wide.i64()?;
            match (ca.min(), ca.max()) {
                (Some(min), Some(max)) => column.cast(&smallest_int_type(min, max))?,
                _ => column.clone(),
            }
        } else if dtype == &DataType::String {
            column.cast(&DataType::Categorical(None, CategoricalOrdering::Physical))?
        } else {
            column.clone()
        };
        tracing::debug!(
            "Column {}: {} -> {}",
            column.name(),
            dtype,
            optimized.dtype()
        );
        columns.push(optimized);
    }

    Ok(DataFrame::new(columns)?)
}

/// Summary of a table's shape, column types and memory footprint.
#[derive(Debug, Clone, PartialEq)]
pub struct TableInfo {
    pub rows: usize,
    pub columns: usize,
    pub dtypes: BTreeMap<String, usize>,
    pub estimated_bytes: usize,
}

impl TableInfo {
    pub fn of(df: &DataFrame) -> Self {
        let mut dtypes = BTreeMap::new();
        for dtype in df.dtypes() {
            *dtypes.entry(dtype.to_string()).or_insert(0) += 1;
        }
        Self {
            rows: df.height(),
            columns: df.width(),
            dtypes,
            estimated_bytes: df.estimated_size(),
        }
    }
}

impl fmt::Display for TableInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} rows, {} columns", self.rows, self.columns)?;
        let dtypes: Vec<String> = self
            .dtypes
            .iter()
            .map(|(name, count)| format!("{}({})", name, count))
            .collect();
        writeln!(f, "dtypes: {}", dtypes.join(", "))?;
        write!(
            f,
            "memory usage: {:.1} MB",
            self.estimated_bytes as f64 / (1024.0 * 1024.0)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_norm_table_shape_and_names() {
        let spec = NormSpec {
            seed: Some(7),
            ..Default::default()
        };
        let df = create_dataframe_norm(&spec).unwrap();

        assert_eq!(df.shape(), (42, 13));
        assert_eq!(df.get_column_names()[7].as_str(), "col7");
        assert_eq!(df.column("col0").unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn test_norm_table_is_reproducible_with_seed() {
        let spec = NormSpec {
            rows: 10,
            columns: 2,
            seed: Some(42),
            ..Default::default()
        };
        let a = create_dataframe_norm(&spec).unwrap();
        let b = create_dataframe_norm(&spec).unwrap();
        assert!(a.equals(&b));
    }

    #[test]
    fn test_norm_rejects_negative_scale() {
        let spec = NormSpec {
            scale: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            create_dataframe_norm(&spec),
            Err(BenchError::ConfigError(..))
        ));
    }

    #[test]
    fn test_month_to_quarter() {
        assert_eq!(month_to_quarter("2021/01").unwrap(), "2021-1Q");
        assert_eq!(month_to_quarter("2021/03").unwrap(), "2021-1Q");
        assert_eq!(month_to_quarter("2021/04").unwrap(), "2021-2Q");
        assert_eq!(month_to_quarter("2021/09").unwrap(), "2021-3Q");
        assert_eq!(month_to_quarter("2021/12").unwrap(), "2021-4Q");
    }

    #[test]
    fn test_month_to_quarter_rejects_bad_codes() {
        for code in ["2021-01", "2021/13", "2021/00", "21/01", ""] {
            assert!(
                matches!(month_to_quarter(code), Err(BenchError::InvalidCode(_))),
                "{} should be rejected",
                code
            );
        }
    }

    #[test]
    fn test_quarter_mapping_covers_year() {
        let mapping = quarter_mapping(2021).unwrap();
        assert_eq!(mapping.len(), 12);
        assert_eq!(mapping["2021/02"], "2021-1Q");
        assert_eq!(mapping["2021/11"], "2021-4Q");

        let table = month_table(2021).unwrap();
        assert_eq!(table.height(), 12);
        let codes = table.column(MONTH_COLUMN).unwrap().str().unwrap();
        assert_eq!(codes.get(0), Some("2021/01"));
        assert_eq!(codes.get(11), Some("2021/12"));
    }

    #[test]
    fn test_category_table_cycles_labels() {
        let df = create_category_table(3, 4, Some(1)).unwrap();
        assert_eq!(df.shape(), (12, 5));

        let cats = df.column(CATEGORY_COLUMN).unwrap().str().unwrap();
        let labels: Vec<&str> = cats.into_iter().flatten().collect();
        assert_eq!(&labels[..5], &["A", "B", "C", "D", "A"]);

        let x0 = df.column("x_0").unwrap().i64().unwrap();
        assert!(x0.into_iter().flatten().all(|v| (0..100).contains(&v)));
    }

    #[test]
    fn test_optimize_columns_downcasts() {
        let df = create_category_table(5, 2, Some(3)).unwrap();
        let optimized = optimize_columns(df).unwrap();

        assert_eq!(optimized.column("x_0").unwrap().dtype(), &DataType::Int8);
        assert!(matches!(
            optimized.column(CATEGORY_COLUMN).unwrap().dtype(),
            DataType::Categorical(..)
        ));
    }

    #[test]
    fn test_optimize_keeps_wide_values() {
        let df = df! { "big" => [0i64, 40_000], "mid" => [-300i64, 300] }.unwrap();
        let optimized = optimize_columns(df).unwrap();
        assert_eq!(optimized.column("big").unwrap().dtype(), &DataType::Int32);
        assert_eq!(optimized.column("mid").unwrap().dtype(), &DataType::Int16);
    }

    #[test]
    fn test_table_info_counts_dtypes() {
        let df = create_category_table(2, 3, Some(9)).unwrap();
        let info = TableInfo::of(&df);

        assert_eq!(info.rows, 8);
        assert_eq!(info.columns, 4);
        assert_eq!(info.dtypes.values().sum::<usize>(), 4);
        assert!(info.to_string().starts_with("8 rows, 4 columns"));
    }
}
