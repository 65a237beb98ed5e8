//! Pipeline stages and the per-run driver
//!
//! A run is a fixed linear composition: load -> schema validation ->
//! filter -> sort -> group -> write. Each stage consumes the table the
//! previous stage produced; errors propagate to the run boundary
//! unmodified. A failed run never leaves a partial output file: data is
//! written to a temporary file in the output directory and renamed into
//! place only on success.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{ConfigError, PipelineSpec};
use crate::data::{io, Codec, DataError, DataFrame, FileFormat};

pub mod filter;
pub mod group;
pub mod sort;

pub use group::{GroupKey, GroupSummary, GroupedTable, PrimaryGroup, SubGroup};

/// Errors that can fail a pipeline run
#[derive(Debug)]
pub enum PipelineError {
    /// Invalid configuration (missing/contradictory fields)
    Config(ConfigError),
    /// Data-level failure (missing column, type mismatch, I/O on the table)
    Data(DataError),
    /// Input or output extension outside the supported set
    UnsupportedFormat { path: PathBuf, extension: String },
    /// Filesystem failure outside the table codecs
    Io(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Config(err) => write!(f, "configuration error: {err}"),
            PipelineError::Data(err) => write!(f, "data error: {err}"),
            PipelineError::UnsupportedFormat { path, extension } => write!(
                f,
                "unsupported format '.{extension}' for '{}'",
                path.display()
            ),
            PipelineError::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Config(err) => Some(err),
            PipelineError::Data(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for PipelineError {
    fn from(err: ConfigError) -> Self {
        PipelineError::Config(err)
    }
}

impl From<DataError> for PipelineError {
    fn from(err: DataError) -> Self {
        PipelineError::Data(err)
    }
}

/// What a completed run did, for the caller to report
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Name of the pipeline that ran
    pub pipeline: String,
    /// Rows in the loaded input table
    pub rows_loaded: usize,
    /// Rows remaining after the filter stage
    pub rows_after_filter: usize,
    /// Rows in the written output
    pub rows_written: usize,
    /// Primary groups formed, when grouping was configured
    pub num_groups: Option<usize>,
    /// Where the data output landed
    pub output_path: PathBuf,
    /// The statistics table, when `show_stats` was set
    pub stats: Option<DataFrame>,
    /// Where the statistics table was written, when `show_stats` was set
    pub stats_path: Option<PathBuf>,
}

/// Resolve a path's format, failing on unknown extensions
fn detect_format(path: &Path) -> Result<FileFormat, PipelineError> {
    FileFormat::detect(path).ok_or_else(|| PipelineError::UnsupportedFormat {
        path: path.to_path_buf(),
        extension: path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_string(),
    })
}

/// Path of the statistics side output: `<output stem>_stats.csv`
fn stats_path_for(output_path: &Path) -> PathBuf {
    let stem = output_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    output_path.with_file_name(format!("{stem}_stats.csv"))
}

/// Write a table to its final path via a temporary file in the same
/// directory, so a failure cannot leave a partial output behind.
fn write_atomic(
    df: &DataFrame,
    path: &Path,
    format: FileFormat,
    codec: Codec,
) -> Result<(), PipelineError> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let tmp = match dir {
        Some(dir) => tempfile::NamedTempFile::new_in(dir),
        None => tempfile::NamedTempFile::new(),
    }
    .map_err(|e| PipelineError::Io(format!("failed to create temporary file: {e}")))?;

    match format {
        FileFormat::Csv => io::write_csv(df, tmp.path())?,
        FileFormat::Parquet => io::write_parquet(df, tmp.path(), codec)?,
        FileFormat::Json | FileFormat::Excel => {
            return Err(PipelineError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension: format.name().to_ascii_lowercase(),
            });
        }
    }

    tmp.persist(path).map_err(|e| {
        PipelineError::Io(format!(
            "failed to move output into place at '{}': {}",
            path.display(),
            e.error
        ))
    })?;

    Ok(())
}

/// Run one pipeline end to end.
///
/// # Errors
/// Returns the first error any stage produces; nothing is swallowed or
/// retried, and no output file is left behind on failure
pub fn run_pipeline(spec: &PipelineSpec) -> Result<RunReport, PipelineError> {
    if !spec.input_file.exists() {
        return Err(PipelineError::Io(format!(
            "input file not found: {}",
            spec.input_file.display()
        )));
    }

    let input_format = detect_format(&spec.input_file)?;
    let df = io::read_table(&spec.input_file, input_format)?;
    let rows_loaded = df.num_rows();

    // Validate referenced columns against the actual schema before any
    // transform touches the table
    spec.validate_against(&df)?;

    let df = filter::apply_filters(&df, spec.keep.as_ref(), spec.filter.as_ref())?;
    let rows_after_filter = df.num_rows();

    let df = match (&spec.primary_column, &spec.sort_order) {
        (Some(primary), Some(order)) => sort::sort_table(&df, primary, Some(order))?,
        _ => df,
    };

    let (df, num_groups, stats) = match &spec.primary_column {
        None => (df, None, None),
        Some(primary) => {
            let grouped = GroupedTable::new(&df, primary, &spec.sub_columns)?;
            let stats = if spec.show_stats {
                Some(grouped.summary_table()?)
            } else {
                None
            };
            let num_groups = grouped.num_groups();
            (grouped.reordered()?, Some(num_groups), stats)
        }
    };

    let output_path = spec.output_path();
    let output_format = detect_format(&output_path)?;
    if !output_format.is_writable() {
        return Err(PipelineError::UnsupportedFormat {
            path: output_path,
            extension: output_format.name().to_ascii_lowercase(),
        });
    }

    fs::create_dir_all(&spec.output_dir).map_err(|e| {
        PipelineError::Io(format!(
            "failed to create output directory '{}': {}",
            spec.output_dir.display(),
            e
        ))
    })?;

    write_atomic(&df, &output_path, output_format, spec.compression)?;

    let stats_path = match &stats {
        Some(stats_df) => {
            let path = stats_path_for(&output_path);
            write_atomic(stats_df, &path, FileFormat::Csv, Codec::None)?;
            Some(path)
        }
        None => None,
    };

    Ok(RunReport {
        pipeline: spec.name.clone(),
        rows_loaded,
        rows_after_filter,
        rows_written: df.num_rows(),
        num_groups,
        output_path,
        stats,
        stats_path,
    })
}
