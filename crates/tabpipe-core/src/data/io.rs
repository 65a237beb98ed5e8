//! File I/O for DataFrame
//!
//! Reads CSV, Parquet, JSON, and Excel files; writes CSV and Parquet.
//! The format is a closed enumeration resolved once per run from the file
//! extension, never re-detected per row.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write as _};
use std::path::Path;
use std::sync::Arc;

use arrow::array::RecordBatch;
use arrow::datatypes::SchemaRef;
use arrow_csv::{ReaderBuilder as CsvReaderBuilder, WriterBuilder as CsvWriterBuilder};
use arrow_json::ReaderBuilder as JsonReaderBuilder;
use calamine::{open_workbook_auto, Data, Reader as _};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel};
use parquet::file::properties::WriterProperties;

use super::dataframe::DataFrame;
use super::error::{DataError, DataResult};
use super::series::Series;
use super::value::Value;

/// Supported file formats, keyed by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Parquet,
    Json,
    Excel,
}

impl FileFormat {
    /// Detect the format from a path's extension
    ///
    /// Returns `None` for unknown extensions; the caller decides whether
    /// that is fatal.
    #[must_use]
    pub fn detect(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(FileFormat::Csv),
            "parquet" | "pq" => Some(FileFormat::Parquet),
            "json" | "jsonl" => Some(FileFormat::Json),
            "xlsx" | "xls" => Some(FileFormat::Excel),
            _ => None,
        }
    }

    /// Format name for status and error messages
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            FileFormat::Csv => "CSV",
            FileFormat::Parquet => "Parquet",
            FileFormat::Json => "JSON",
            FileFormat::Excel => "Excel",
        }
    }

    /// Whether the format is supported as an output target
    #[must_use]
    pub fn is_writable(self) -> bool {
        matches!(self, FileFormat::Csv | FileFormat::Parquet)
    }
}

/// Compression codec for Parquet output
///
/// Codec choice affects physical encoding only; reading the file back
/// yields the same logical table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Codec {
    #[default]
    None,
    Snappy,
    Gzip,
}

impl Codec {
    /// Codec name as it appears in configuration files
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Codec::None => "none",
            Codec::Snappy => "snappy",
            Codec::Gzip => "gzip",
        }
    }

    fn to_parquet(self) -> Compression {
        match self {
            Codec::None => Compression::UNCOMPRESSED,
            Codec::Snappy => Compression::SNAPPY,
            Codec::Gzip => Compression::GZIP(GzipLevel::default()),
        }
    }
}

/// Read a file into a DataFrame, dispatching on the resolved format
///
/// # Errors
/// Returns error if the file cannot be read or parsed
pub fn read_table<P: AsRef<Path>>(path: P, format: FileFormat) -> DataResult<DataFrame> {
    match format {
        FileFormat::Csv => read_csv(path),
        FileFormat::Parquet => read_parquet(path),
        FileFormat::Json => read_json(path),
        FileFormat::Excel => read_excel(path),
    }
}

/// Read a Parquet file into a DataFrame
///
/// # Errors
/// Returns error if file cannot be read or is not valid Parquet
pub fn read_parquet<P: AsRef<Path>>(path: P) -> DataResult<DataFrame> {
    let file = File::open(path.as_ref()).map_err(|e| {
        DataError::Io(format!(
            "failed to open file '{}': {}",
            path.as_ref().display(),
            e
        ))
    })?;

    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| DataError::Parquet(format!("failed to read parquet: {e}")))?;

    let schema = builder.schema().clone();
    let reader = builder
        .build()
        .map_err(|e| DataError::Parquet(format!("failed to build reader: {e}")))?;

    let batches: Vec<RecordBatch> = reader
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| DataError::Parquet(format!("failed to read batches: {e}")))?;

    DataFrame::from_batches(schema, batches)
}

/// Write a DataFrame to a Parquet file with the given compression codec
///
/// # Errors
/// Returns error if file cannot be written
pub fn write_parquet<P: AsRef<Path>>(df: &DataFrame, path: P, codec: Codec) -> DataResult<()> {
    let file = File::create(path.as_ref()).map_err(|e| {
        DataError::Io(format!(
            "failed to create file '{}': {}",
            path.as_ref().display(),
            e
        ))
    })?;

    let props = WriterProperties::builder()
        .set_compression(codec.to_parquet())
        .build();

    let schema = df.schema().clone();
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))
        .map_err(|e| DataError::Parquet(format!("failed to create writer: {e}")))?;

    for batch in df.batches() {
        writer
            .write(batch)
            .map_err(|e| DataError::Parquet(format!("failed to write batch: {e}")))?;
    }

    writer
        .close()
        .map_err(|e| DataError::Parquet(format!("failed to close writer: {e}")))?;

    Ok(())
}

/// Read a CSV file into a DataFrame
///
/// The schema is inferred from a sample of the file; the first row is
/// treated as the header.
///
/// # Errors
/// Returns error if file cannot be read or is not valid CSV
pub fn read_csv<P: AsRef<Path>>(path: P) -> DataResult<DataFrame> {
    let file = File::open(path.as_ref()).map_err(|e| {
        DataError::Io(format!(
            "failed to open file '{}': {}",
            path.as_ref().display(),
            e
        ))
    })?;

    let reader = BufReader::new(file);

    let (schema, _) = arrow_csv::reader::Format::default()
        .with_header(true)
        .infer_schema(
            BufReader::new(File::open(path.as_ref()).map_err(|e| {
                DataError::Io(format!("failed to open file for schema inference: {e}"))
            })?),
            Some(100), // Sample 100 rows for schema inference
        )
        .map_err(|e| DataError::Csv(format!("failed to infer schema: {e}")))?;

    let schema_ref: SchemaRef = Arc::new(schema);

    let csv_reader = CsvReaderBuilder::new(schema_ref.clone())
        .with_header(true)
        .build(reader)
        .map_err(|e| DataError::Csv(format!("failed to build CSV reader: {e}")))?;

    let batches: Vec<RecordBatch> = csv_reader
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| DataError::Csv(format!("failed to read CSV batches: {e}")))?;

    DataFrame::from_batches(schema_ref, batches)
}

/// Write a DataFrame to a CSV file
///
/// Output is uncompressed, newline-delimited, with a header row and column
/// order preserved. The header is written even when the table has no rows.
///
/// # Errors
/// Returns error if file cannot be written
pub fn write_csv<P: AsRef<Path>>(df: &DataFrame, path: P) -> DataResult<()> {
    let file = File::create(path.as_ref()).map_err(|e| {
        DataError::Io(format!(
            "failed to create file '{}': {}",
            path.as_ref().display(),
            e
        ))
    })?;

    let writer = BufWriter::new(file);
    let mut csv_writer = CsvWriterBuilder::new().with_header(true).build(writer);

    if df.batches().is_empty() {
        // The writer only emits the header on its first write, so a table
        // with no batches needs an empty one pushed through it
        let empty = RecordBatch::new_empty(df.schema().clone());
        csv_writer
            .write(&empty)
            .map_err(|e| DataError::Csv(format!("failed to write header: {e}")))?;
    }

    for batch in df.batches() {
        csv_writer
            .write(batch)
            .map_err(|e| DataError::Csv(format!("failed to write batch: {e}")))?;
    }

    csv_writer
        .into_inner()
        .flush()
        .map_err(|e| DataError::Io(format!("failed to flush CSV output: {e}")))?;

    Ok(())
}

/// Read a JSON file (newline-delimited records) into a DataFrame
///
/// # Errors
/// Returns error if file cannot be read or is not valid JSON
pub fn read_json<P: AsRef<Path>>(path: P) -> DataResult<DataFrame> {
    let file = File::open(path.as_ref()).map_err(|e| {
        DataError::Io(format!(
            "failed to open file '{}': {}",
            path.as_ref().display(),
            e
        ))
    })?;

    let reader = BufReader::new(file);

    let (schema, _) = arrow_json::reader::infer_json_schema(
        BufReader::new(File::open(path.as_ref()).map_err(|e| {
            DataError::Io(format!("failed to open file for schema inference: {e}"))
        })?),
        Some(100), // Sample 100 rows for schema inference
    )
    .map_err(|e| DataError::Json(format!("failed to infer schema: {e}")))?;

    let schema_ref: SchemaRef = Arc::new(schema);

    let json_reader = JsonReaderBuilder::new(schema_ref.clone())
        .build(reader)
        .map_err(|e| DataError::Json(format!("failed to build JSON reader: {e}")))?;

    let batches: Vec<RecordBatch> = json_reader
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| DataError::Json(format!("failed to read JSON batches: {e}")))?;

    DataFrame::from_batches(schema_ref, batches)
}

/// Read the first worksheet of an Excel file into a DataFrame
///
/// The first row is treated as the header. Column types are inferred from
/// the cells; a column mixing integers and floats becomes Float64.
///
/// # Errors
/// Returns error if file cannot be read or has no usable sheet
pub fn read_excel<P: AsRef<Path>>(path: P) -> DataResult<DataFrame> {
    let mut workbook = open_workbook_auto(path.as_ref()).map_err(|e| {
        DataError::Excel(format!(
            "failed to open file '{}': {}",
            path.as_ref().display(),
            e
        ))
    })?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| DataError::Excel("workbook has no sheets".to_string()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| DataError::Excel(format!("failed to read sheet '{sheet_name}': {e}")))?;

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| DataError::Excel(format!("sheet '{sheet_name}' is empty")))?;

    let names: Vec<String> = header.iter().map(cell_to_header).collect();

    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); names.len()];
    for row in rows {
        for (col_idx, column) in columns.iter_mut().enumerate() {
            let cell = row.get(col_idx).unwrap_or(&Data::Empty);
            column.push(cell_to_value(cell)?);
        }
    }

    let series: Vec<Series> = names
        .into_iter()
        .zip(columns)
        .map(|(name, mut values)| {
            // Mixed int/float columns widen to float before type inference
            if values.iter().any(|v| matches!(v, Value::Float(_))) {
                for v in &mut values {
                    if let Value::Int(i) = v {
                        *v = Value::Float(*i as f64);
                    }
                }
            }
            Series::from_values(name, &values)
        })
        .collect::<DataResult<Vec<_>>>()?;

    DataFrame::from_series(series)
}

fn cell_to_header(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn cell_to_value(cell: &Data) -> DataResult<Value> {
    match cell {
        Data::Empty => Ok(Value::Null),
        Data::String(s) => Ok(Value::Str(s.clone())),
        Data::Int(i) => Ok(Value::Int(*i)),
        Data::Float(f) => {
            // Excel stores integers as floats; narrow them back when exact
            if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 {
                Ok(Value::Int(*f as i64))
            } else {
                Ok(Value::Float(*f))
            }
        }
        Data::Bool(b) => Ok(Value::Bool(*b)),
        Data::DateTime(dt) => Ok(Value::Float(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Ok(Value::Str(s.clone())),
        Data::Error(e) => Err(DataError::Excel(format!("cell error: {e:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_dataframe() -> DataFrame {
        let names = Series::from_strings("name", vec!["Alice", "Bob", "Charlie"]);
        let ages = Series::from_ints("age", vec![30, 25, 35]);
        let scores = Series::from_floats("score", vec![85.5, 92.0, 78.3]);

        DataFrame::from_series(vec![names, ages, scores]).unwrap()
    }

    fn assert_logical_eq(a: &DataFrame, b: &DataFrame) {
        assert_eq!(a.num_rows(), b.num_rows());
        assert_eq!(a.columns(), b.columns());
        for name in a.columns() {
            let ca = a.column(&name).unwrap();
            let cb = b.column(&name).unwrap();
            for i in 0..ca.len() {
                assert_eq!(ca.get(i).unwrap(), cb.get(i).unwrap(), "column {name} row {i}");
            }
        }
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(
            FileFormat::detect(Path::new("data/input.csv")),
            Some(FileFormat::Csv)
        );
        assert_eq!(
            FileFormat::detect(Path::new("out.PARQUET")),
            Some(FileFormat::Parquet)
        );
        assert_eq!(
            FileFormat::detect(Path::new("x.pq")),
            Some(FileFormat::Parquet)
        );
        assert_eq!(
            FileFormat::detect(Path::new("rows.jsonl")),
            Some(FileFormat::Json)
        );
        assert_eq!(
            FileFormat::detect(Path::new("book.xlsx")),
            Some(FileFormat::Excel)
        );
        assert_eq!(FileFormat::detect(Path::new("notes.txt")), None);
        assert_eq!(FileFormat::detect(Path::new("no_extension")), None);
    }

    #[test]
    fn test_writable_formats() {
        assert!(FileFormat::Csv.is_writable());
        assert!(FileFormat::Parquet.is_writable());
        assert!(!FileFormat::Json.is_writable());
        assert!(!FileFormat::Excel.is_writable());
    }

    #[test]
    fn test_parquet_roundtrip_uncompressed() {
        let df = sample_dataframe();
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.parquet");

        write_parquet(&df, &path, Codec::None).unwrap();
        let loaded = read_parquet(&path).unwrap();

        assert_logical_eq(&df, &loaded);
    }

    #[test]
    fn test_parquet_roundtrip_snappy() {
        let df = sample_dataframe();
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.parquet");

        write_parquet(&df, &path, Codec::Snappy).unwrap();
        let loaded = read_parquet(&path).unwrap();

        assert_logical_eq(&df, &loaded);
    }

    #[test]
    fn test_parquet_roundtrip_gzip() {
        let df = sample_dataframe();
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.parquet");

        write_parquet(&df, &path, Codec::Gzip).unwrap();
        let loaded = read_parquet(&path).unwrap();

        assert_logical_eq(&df, &loaded);
    }

    #[test]
    fn test_csv_roundtrip() {
        let df = sample_dataframe();
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.csv");

        write_csv(&df, &path).unwrap();
        let loaded = read_csv(&path).unwrap();

        assert_eq!(loaded.num_rows(), df.num_rows());
        assert_eq!(loaded.columns(), df.columns());
    }

    #[test]
    fn test_write_csv_empty_table_keeps_header() {
        let df = sample_dataframe().filter_by_indices(&[]).unwrap();
        assert!(df.is_empty());

        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        write_csv(&df, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().next(), Some("name,age,score"));

        let loaded = read_csv(&path).unwrap();
        assert_eq!(loaded.num_rows(), 0);
        assert_eq!(loaded.columns(), df.columns());
    }

    #[test]
    fn test_csv_preserves_column_order() {
        let df = sample_dataframe();
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.csv");

        write_csv(&df, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let header = content.lines().next().unwrap();
        assert_eq!(header, "name,age,score");
    }

    #[test]
    fn test_read_json_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rows.json");
        std::fs::write(
            &path,
            "{\"city\":\"Manhattan\",\"price\":100}\n{\"city\":\"Queens\",\"price\":200}\n",
        )
        .unwrap();

        let df = read_json(&path).unwrap();
        assert_eq!(df.num_rows(), 2);
        assert!(df.has_column("city"));
        assert!(df.has_column("price"));
    }

    #[test]
    fn test_read_missing_file() {
        let result = read_csv("does_not_exist.csv");
        assert!(matches!(result, Err(DataError::Io(_))));
    }

    #[test]
    fn test_read_excel_missing_file() {
        let result = read_excel("does_not_exist.xlsx");
        assert!(matches!(result, Err(DataError::Excel(_))));
    }

    #[test]
    fn test_read_excel_rejects_non_workbook() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bogus.xlsx");
        std::fs::write(&path, "not a workbook").unwrap();

        let result = read_excel(&path);
        assert!(matches!(result, Err(DataError::Excel(_))));
    }

    #[test]
    fn test_excel_cell_conversion() {
        assert_eq!(cell_to_value(&Data::Empty).unwrap(), Value::Null);
        assert_eq!(
            cell_to_value(&Data::String("Office".to_string())).unwrap(),
            Value::Str("Office".to_string())
        );
        assert_eq!(cell_to_value(&Data::Int(42)).unwrap(), Value::Int(42));
        // Whole floats narrow back to integers, fractional ones stay float
        assert_eq!(cell_to_value(&Data::Float(3.0)).unwrap(), Value::Int(3));
        assert_eq!(cell_to_value(&Data::Float(2.5)).unwrap(), Value::Float(2.5));
        assert_eq!(cell_to_value(&Data::Bool(true)).unwrap(), Value::Bool(true));

        assert_eq!(cell_to_header(&Data::String("city".to_string())), "city");
        assert_eq!(cell_to_header(&Data::Int(7)), "7");
    }
}
