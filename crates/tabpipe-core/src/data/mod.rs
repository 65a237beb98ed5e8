//! Table abstraction for tabpipe
//!
//! This module provides:
//! - DataFrame: Apache Arrow-backed columnar table
//! - Series: Single column representation
//! - Value: Scalar cell values for row-level access
//! - File I/O for CSV, Parquet, JSON, and Excel

mod dataframe;
mod error;
pub mod io;
mod series;
mod value;

pub use dataframe::DataFrame;
pub use error::{DataError, DataResult};
pub use io::{
    read_csv, read_excel, read_json, read_parquet, read_table, write_csv, write_parquet, Codec,
    FileFormat,
};
pub use series::Series;
pub use value::Value;
