//! Tabular data and file I/O
//!
//! Every pipeline stage consumes and produces a polars `DataFrame`. This
//! module holds the column checks they share and the CSV/JSON collaborators
//! that load and save frames.

pub mod csv_io;
pub mod frame;

pub use csv_io::{read_csv, read_csv_from, write_csv, write_json};
pub use frame::{
    cell_text, column_names, require_absent, require_column, require_columns, text_values,
};
