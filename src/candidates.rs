//! Candidate operations
//!
//! Each benchmark compares several strategies computing the same logical
//! result. Strategies take the table and their selectors explicitly and never
//! mutate the input table.

use crate::errors::{BenchError, BenchResult};
use clap::ValueEnum;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const ROW_INDEX: &str = "__framebench_row";
const JOIN_KEY: &str = "__framebench_key";

/// Ways of turning one column into a plain `Vec<f64>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ListStrategy {
    /// Collect the typed column iterator.
    Native,
    /// Fetch every row as a generic value and extract the float.
    Generic,
    /// Walk the underlying Arrow buffers.
    Array,
    /// Rechunk and copy the contiguous value slice.
    Export,
}

impl ListStrategy {
    pub const ALL: [ListStrategy; 4] = [
        ListStrategy::Native,
        ListStrategy::Generic,
        ListStrategy::Array,
        ListStrategy::Export,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ListStrategy::Native => "native",
            ListStrategy::Generic => "generic",
            ListStrategy::Array => "array",
            ListStrategy::Export => "export",
        }
    }
}

/// Ways of deriving a new column by looking values up in a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RemapStrategy {
    /// Per-value hash map lookup. Unmapped values become null.
    Map,
    /// Left join against a two-column lookup table.
    Join,
}

impl RemapStrategy {
    pub const ALL: [RemapStrategy; 2] = [RemapStrategy::Map, RemapStrategy::Join];

    pub fn label(&self) -> &'static str {
        match self {
            RemapStrategy::Map => "map",
            RemapStrategy::Join => "join",
        }
    }
}

/// Ways of selecting the rows whose column equals a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SelectStrategy {
    /// Build a boolean mask and filter with it.
    Mask,
    /// Index the column by value, then gather the rows of one key.
    Index,
    /// Lazy `filter(col == value)` expression.
    Lazy,
}

impl SelectStrategy {
    pub const ALL: [SelectStrategy; 3] = [
        SelectStrategy::Mask,
        SelectStrategy::Index,
        SelectStrategy::Lazy,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SelectStrategy::Mask => "mask",
            SelectStrategy::Index => "index",
            SelectStrategy::Lazy => "lazy",
        }
    }
}

fn non_null_column<'a>(df: &'a DataFrame, name: &str) -> BenchResult<&'a Column> {
    let column = df.column(name)?;
    let count = column.null_count();
    if count > 0 {
        return Err(BenchError::NullValues {
            column: name.to_string(),
            count,
        });
    }
    Ok(column)
}

/// Copy the values of `column` into a `Vec<f64>` using `strategy`.
pub fn column_to_vec(
    df: &DataFrame,
    column: &str,
    strategy: ListStrategy,
) -> BenchResult<Vec<f64>> {
    let source = non_null_column(df, column)?;
    // Strict, so unparsable values fail every strategy alike instead of
    // turning into nulls.
    let floats = source.strict_cast(&DataType::Float64)?;

    let values: Vec<f64> = match strategy {
        ListStrategy::Native => floats.f64()?.into_iter().flatten().collect(),
        ListStrategy::Generic => {
            let mut values = Vec::with_capacity(floats.len());
            for row in 0..floats.len() {
                let value = floats.get(row)?.extract::<f64>().ok_or_else(|| {
                    BenchError::Unknown(anyhow::anyhow!(
                        "Row {} of column '{}' is not numeric",
                        row,
                        column
                    ))
                })?;
                values.push(value);
            }
            values
        }
        ListStrategy::Array => floats
            .f64()?
            .downcast_iter()
            .flat_map(|arr| arr.values().iter().copied())
            .collect(),
        ListStrategy::Export => {
            let ca = floats.f64()?.rechunk();
            ca.cont_slice()?.to_vec()
        }
    };

    Ok(values)
}

/// Return a copy of `df` with `target` holding `mapping[source]` per row.
pub fn remap_column(
    df: &DataFrame,
    source: &str,
    target: &str,
    mapping: &HashMap<String, String>,
    strategy: RemapStrategy,
) -> BenchResult<DataFrame> {
    match strategy {
        RemapStrategy::Map => {
            let keys = string_column(df.column(source)?)?;
            let mapped: StringChunked = keys
                .str()?
                .into_iter()
                .map(|key| key.and_then(|k| mapping.get(k).map(String::as_str)))
                .collect();

            let mut out = df.clone();
            out.with_column(mapped.with_name(target.into()).into_series())?;
            Ok(out)
        }
        RemapStrategy::Join => {
            let base = if df.get_column_index(target).is_some() {
                df.drop(target)?
            } else {
                df.clone()
            };

            let (keys, values): (Vec<&str>, Vec<&str>) = mapping
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .unzip();
            let lookup = DataFrame::new(vec![
                Column::new(JOIN_KEY.into(), keys),
                Column::new(target.into(), values),
            ])?;

            // Join on the string form so categorical sources match the lookup.
            let mut out = base
                .lazy()
                .with_row_index(ROW_INDEX, None)
                .with_column(col(source).cast(DataType::String).alias(JOIN_KEY))
                .join(
                    lookup.lazy(),
                    [col(JOIN_KEY)],
                    [col(JOIN_KEY)],
                    JoinArgs::new(JoinType::Left),
                )
                .sort([ROW_INDEX], Default::default())
                .collect()?;
            out.drop_in_place(JOIN_KEY)?;
            out.drop_in_place(ROW_INDEX)?;
            Ok(out)
        }
    }
}

/// Categorical columns compare through their string values.
fn string_column(column: &Column) -> BenchResult<Column> {
    if column.dtype() == &DataType::String {
        Ok(column.clone())
    } else {
        Ok(column.cast(&DataType::String)?)
    }
}

/// Rows of `df` whose `column` equals `value`, in their original order.
pub fn select_rows(
    df: &DataFrame,
    column: &str,
    value: &str,
    strategy: SelectStrategy,
) -> BenchResult<DataFrame> {
    match strategy {
        SelectStrategy::Mask => {
            let keys = string_column(df.column(column)?)?;
            let mask = keys.str()?.equal(value);
            Ok(df.filter(&mask)?)
        }
        SelectStrategy::Index => {
            let keys = string_column(df.column(column)?)?;
            let mut index: HashMap<&str, Vec<IdxSize>> = HashMap::new();
            for (row, key) in keys.str()?.into_iter().enumerate() {
                if let Some(key) = key {
                    index.entry(key).or_default().push(row as IdxSize);
                }
            }

            let rows = index.remove(value).ok_or_else(|| BenchError::KeyNotFound {
                column: column.to_string(),
                key: value.to_string(),
            })?;
            Ok(df.take(&IdxCa::from_vec("rows".into(), rows))?)
        }
        SelectStrategy::Lazy => Ok(df
            .clone()
            .lazy()
            .filter(col(column).cast(DataType::String).eq(lit(value)))
            .collect()?),
    }
}

/// Whether two tables hold the same rows, ignoring row order.
pub fn same_rows(left: &DataFrame, right: &DataFrame) -> BenchResult<bool> {
    if left.shape() != right.shape() || left.get_column_names() != right.get_column_names() {
        return Ok(false);
    }
    if left.height() == 0 {
        return Ok(true);
    }

    let by = left.get_column_names_owned();
    let left = left.sort(by.clone(), SortMultipleOptions::default())?;
    let right = right.sort(by, SortMultipleOptions::default())?;
    Ok(left.equals_missing(&right))
}

/// Whether two value lists are bit-for-bit equal, so `NaN` matches `NaN`.
pub fn same_values(left: &[f64], right: &[f64]) -> BenchResult<bool> {
    Ok(left.len() == right.len()
        && left
            .iter()
            .zip(right)
            .all(|(a, b)| a.to_bits() == b.to_bits()))
}

/// Check every labelled result against the first one.
pub fn verify_agreement<T, F>(results: &[(String, T)], same: F) -> BenchResult<()>
where
    F: Fn(&T, &T) -> BenchResult<bool>,
{
    let Some((first_label, first)) = results.first() else {
        return Ok(());
    };

    for (label, result) in &results[1..] {
        if !same(first, result)? {
            return Err(BenchError::CandidateMismatch {
                left: first_label.clone(),
                right: label.clone(),
            });
        }
    }
    Ok(())
}
