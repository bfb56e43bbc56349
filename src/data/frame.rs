//! Column checks and cell access on data frames

use polars::prelude::*;

use crate::{FeatureError, Result};

/// Fail with `MissingColumn` unless `name` is a column of `df`
pub fn require_column(df: &DataFrame, name: &str) -> Result<()> {
    match df.get_column_index(name) {
        Some(_) => Ok(()),
        None => Err(FeatureError::MissingColumn(name.to_string())),
    }
}

/// Check several columns, reporting the first one missing
pub fn require_columns<S: AsRef<str>>(df: &DataFrame, names: &[S]) -> Result<()> {
    names
        .iter()
        .try_for_each(|name| require_column(df, name.as_ref()))
}

/// Fail with `DuplicateColumn` if `name` is already taken
pub fn require_absent(df: &DataFrame, name: &str) -> Result<()> {
    match df.get_column_index(name) {
        Some(_) => Err(FeatureError::DuplicateColumn(name.to_string())),
        None => Ok(()),
    }
}

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}

/// A column rendered as text, whatever its type
pub fn text_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    require_column(df, name)?;
    let column = df.column(name)?.cast(&DataType::String)?;
    let values = column
        .as_materialized_series()
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(values)
}

/// Text of a single cell as it would be written to CSV
pub fn cell_text(value: &AnyValue) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        other => other.to_string(),
    }
}
