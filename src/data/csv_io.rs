//! Loading and saving frames
//!
//! CSV with a header row in both directions, plus a JSON export of row
//! objects. Every column is read as text first; a column becomes numeric
//! only when all of its cells are numbers that write back unchanged, so
//! ids like `007`, labels like `False` and timestamps survive a round trip.

use polars::prelude::*;
use std::fs::File;
use std::io::{Cursor, Write};
use std::path::Path;

use crate::Result;

/// Load a frame from a CSV file with a header row
pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
    let raw = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.as_ref().to_path_buf()))?
        .finish()?;
    let df = infer_column_types(raw)?;
    log::debug!(
        "Loaded {} rows x {} columns from {}",
        df.height(),
        df.width(),
        path.as_ref().display()
    );
    Ok(df)
}

/// Load a frame from CSV bytes with a header row
pub fn read_csv_from(bytes: &[u8]) -> Result<DataFrame> {
    let raw = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()?;
    infer_column_types(raw)
}

fn infer_column_types(df: DataFrame) -> Result<DataFrame> {
    let columns = df
        .get_columns()
        .iter()
        .map(infer_column)
        .collect::<Result<Vec<_>>>()?;
    Ok(DataFrame::new(columns)?)
}

/// Int64 when every cell is a plain integer, Float64 when every cell is a
/// finite decimal, otherwise the text as read. Empty cells are null and
/// do not vote.
fn infer_column(column: &Column) -> Result<Column> {
    let series = column.as_materialized_series();
    let cells: Vec<&str> = series.str()?.into_iter().flatten().collect();
    if cells.is_empty() {
        return Ok(column.clone());
    }

    if cells.iter().all(|cell| is_integer(cell)) {
        return Ok(Column::from(series.strict_cast(&DataType::Int64)?));
    }
    if cells.iter().all(|cell| is_decimal(cell)) {
        return Ok(Column::from(series.strict_cast(&DataType::Float64)?));
    }
    Ok(column.clone())
}

fn is_integer(cell: &str) -> bool {
    cell.parse::<i64>()
        .map_or(false, |value| value.to_string() == cell)
}

fn is_decimal(cell: &str) -> bool {
    let digits = cell.strip_prefix('-').unwrap_or(cell);
    let leading_zero =
        digits.len() > 1 && digits.starts_with('0') && !digits[1..].starts_with('.');
    // "inf" and "nan" parse as floats but are not finite
    !leading_zero && cell.parse::<f64>().map_or(false, f64::is_finite)
}

/// Save a frame as CSV with a header row
pub fn write_csv<P: AsRef<Path>>(df: &DataFrame, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    write_csv_to(df, file)?;
    log::debug!(
        "Wrote {} rows x {} columns to {}",
        df.height(),
        df.width(),
        path.as_ref().display()
    );
    Ok(())
}

/// Write a frame as CSV; nulls become empty cells
pub fn write_csv_to<W: Write>(df: &DataFrame, mut writer: W) -> Result<()> {
    let mut df = df.clone();
    CsvWriter::new(&mut writer)
        .include_header(true)
        .finish(&mut df)?;
    Ok(())
}

/// Save a frame as a JSON array of row objects
pub fn write_json<P: AsRef<Path>>(df: &DataFrame, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    write_json_to(df, file)
}

pub fn write_json_to<W: Write>(df: &DataFrame, mut writer: W) -> Result<()> {
    let mut df = df.clone();
    JsonWriter::new(&mut writer)
        .with_json_format(JsonFormat::Json)
        .finish(&mut df)?;
    Ok(())
}
