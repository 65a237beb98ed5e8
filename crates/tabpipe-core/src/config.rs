//! Pipeline configuration parsing and validation.
//!
//! A configuration file is a JSON mapping from pipeline name to an options
//! object. `PipelineSpec::resolve` turns one raw options object into a
//! validated, immutable spec; validation happens exactly once, at the
//! boundary, before any file is touched.

use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::data::{Codec, DataError, DataFrame, DataResult};

/// Errors that can occur when resolving pipeline configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("pipeline '{pipeline}': missing required field '{field}'")]
    MissingField {
        pipeline: String,
        field: &'static str,
    },

    #[error("pipeline '{pipeline}': field '{field}' must not be empty")]
    EmptyField {
        pipeline: String,
        field: &'static str,
    },

    #[error("pipeline '{pipeline}': '{field}' requires '{requires}' to be set and non-empty")]
    UnpairedField {
        pipeline: String,
        field: &'static str,
        requires: &'static str,
    },

    #[error("pipeline '{pipeline}': duplicate entry '{entry}' in sort_order")]
    DuplicateSortEntry { pipeline: String, entry: String },

    #[error("pipeline '{pipeline}': unknown compression '{value}', expected one of: snappy, gzip")]
    UnknownCompression { pipeline: String, value: String },

    #[error("pipeline '{0}' not found in configuration")]
    UnknownPipeline(String),
}

/// One options object as it appears in the configuration file.
///
/// All fields are optional at this layer; `PipelineSpec::resolve` enforces
/// which are mandatory and which must appear in pairs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPipelineOptions {
    pub input_file: Option<String>,
    pub output_file: Option<String>,
    pub output_dir: Option<String>,
    pub compression: Option<String>,
    pub primary_column: Option<String>,
    pub sub_columns: Option<Vec<String>>,
    pub sort_order: Option<Vec<String>>,
    pub filter_column: Option<String>,
    pub filter_values: Option<Vec<String>>,
    pub keep_column: Option<String>,
    pub keep_values: Option<Vec<String>>,
    pub show_stats: Option<bool>,
}

/// A column paired with the set of values it is matched against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnValues {
    pub column: String,
    pub values: Vec<String>,
}

/// The validated, typed configuration for one pipeline run.
///
/// Constructed once per run, immutable thereafter. Absence is always
/// `None`/empty, never an empty string.
#[derive(Debug, Clone)]
pub struct PipelineSpec {
    /// Pipeline name, used in reporting and error messages
    pub name: String,
    /// Path of the input data file
    pub input_file: PathBuf,
    /// File name of the output, relative to `output_dir`
    pub output_file: String,
    /// Directory the output is written into (created if absent)
    pub output_dir: PathBuf,
    /// Parquet compression codec
    pub compression: Codec,
    /// Column for the first level of grouping
    pub primary_column: Option<String>,
    /// Columns for the nested second level of grouping
    pub sub_columns: Vec<String>,
    /// Custom category order for sorting the primary column
    pub sort_order: Option<Vec<String>>,
    /// Rows whose value in this column is in the set are dropped
    pub filter: Option<ColumnValues>,
    /// Only rows whose value in this column is in the set are kept
    pub keep: Option<ColumnValues>,
    /// Whether to emit group statistics as a side output
    pub show_stats: bool,
}

/// Load a configuration file: a JSON map from pipeline name to options.
///
/// # Errors
/// Returns error if the file cannot be read or is not valid JSON
pub fn load_config(path: impl AsRef<Path>) -> Result<BTreeMap<String, RawPipelineOptions>, ConfigError> {
    let content = std::fs::read_to_string(path.as_ref())?;
    let configs = serde_json::from_str(&content)?;
    Ok(configs)
}

impl PipelineSpec {
    /// Validate and normalize a raw options record into a spec.
    ///
    /// # Errors
    /// Returns a `ConfigError` naming the pipeline and the offending field
    pub fn resolve(name: &str, raw: &RawPipelineOptions) -> Result<Self, ConfigError> {
        let input_file = required(name, "input_file", raw.input_file.as_deref())?;
        let output_file = required(name, "output_file", raw.output_file.as_deref())?;
        let output_dir = required(name, "output_dir", raw.output_dir.as_deref())?;

        let filter = resolve_pair(
            name,
            "filter_column",
            raw.filter_column.as_deref(),
            "filter_values",
            raw.filter_values.as_deref(),
        )?;
        let keep = resolve_pair(
            name,
            "keep_column",
            raw.keep_column.as_deref(),
            "keep_values",
            raw.keep_values.as_deref(),
        )?;

        let sub_columns = raw.sub_columns.clone().unwrap_or_default();
        if !sub_columns.is_empty() && raw.primary_column.is_none() {
            return Err(ConfigError::UnpairedField {
                pipeline: name.to_string(),
                field: "sub_columns",
                requires: "primary_column",
            });
        }

        let sort_order = match &raw.sort_order {
            None => None,
            Some(order) => {
                if order.is_empty() {
                    return Err(ConfigError::EmptyField {
                        pipeline: name.to_string(),
                        field: "sort_order",
                    });
                }
                let mut seen = HashSet::new();
                for entry in order {
                    if !seen.insert(entry.as_str()) {
                        return Err(ConfigError::DuplicateSortEntry {
                            pipeline: name.to_string(),
                            entry: entry.clone(),
                        });
                    }
                }
                if raw.primary_column.is_none() {
                    return Err(ConfigError::UnpairedField {
                        pipeline: name.to_string(),
                        field: "sort_order",
                        requires: "primary_column",
                    });
                }
                Some(order.clone())
            }
        };

        let compression = match raw.compression.as_deref() {
            None => Codec::None,
            Some("snappy") => Codec::Snappy,
            Some("gzip") => Codec::Gzip,
            Some(other) => {
                return Err(ConfigError::UnknownCompression {
                    pipeline: name.to_string(),
                    value: other.to_string(),
                });
            }
        };

        Ok(Self {
            name: name.to_string(),
            input_file: PathBuf::from(input_file),
            output_file: output_file.to_string(),
            output_dir: PathBuf::from(output_dir),
            compression,
            primary_column: raw.primary_column.clone(),
            sub_columns,
            sort_order,
            filter,
            keep,
            show_stats: raw.show_stats.unwrap_or(false),
        })
    }

    /// Full path of the data output file.
    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.output_file)
    }

    /// Check every column the spec references against the loaded table's
    /// schema, before any transform runs.
    ///
    /// # Errors
    /// Returns `DataError::ColumnNotFound` naming the missing column
    pub fn validate_against(&self, df: &DataFrame) -> DataResult<()> {
        let mut referenced: Vec<&str> = Vec::new();
        if let Some(filter) = &self.filter {
            referenced.push(&filter.column);
        }
        if let Some(keep) = &self.keep {
            referenced.push(&keep.column);
        }
        if let Some(primary) = &self.primary_column {
            referenced.push(primary);
        }
        for sub in &self.sub_columns {
            referenced.push(sub);
        }

        for column in referenced {
            if !df.has_column(column) {
                return Err(DataError::ColumnNotFound(column.to_string()));
            }
        }
        Ok(())
    }
}

fn required<'a>(
    pipeline: &str,
    field: &'static str,
    value: Option<&'a str>,
) -> Result<&'a str, ConfigError> {
    match value {
        None => Err(ConfigError::MissingField {
            pipeline: pipeline.to_string(),
            field,
        }),
        Some("") => Err(ConfigError::EmptyField {
            pipeline: pipeline.to_string(),
            field,
        }),
        Some(v) => Ok(v),
    }
}

fn resolve_pair(
    pipeline: &str,
    column_field: &'static str,
    column: Option<&str>,
    values_field: &'static str,
    values: Option<&[String]>,
) -> Result<Option<ColumnValues>, ConfigError> {
    match (column, values) {
        (None, None) => Ok(None),
        (Some(col), Some(vals)) if !vals.is_empty() => Ok(Some(ColumnValues {
            column: col.to_string(),
            values: vals.to_vec(),
        })),
        (Some(_), _) => Err(ConfigError::UnpairedField {
            pipeline: pipeline.to_string(),
            field: column_field,
            requires: values_field,
        }),
        (None, Some(_)) => Err(ConfigError::UnpairedField {
            pipeline: pipeline.to_string(),
            field: values_field,
            requires: column_field,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Series;

    fn minimal_raw() -> RawPipelineOptions {
        RawPipelineOptions {
            input_file: Some("data/in.csv".to_string()),
            output_file: Some("out.csv".to_string()),
            output_dir: Some("processed".to_string()),
            ..RawPipelineOptions::default()
        }
    }

    #[test]
    fn test_resolve_minimal() {
        let spec = PipelineSpec::resolve("props", &minimal_raw()).unwrap();
        assert_eq!(spec.name, "props");
        assert_eq!(spec.compression, Codec::None);
        assert!(!spec.show_stats);
        assert!(spec.filter.is_none());
        assert!(spec.keep.is_none());
        assert_eq!(spec.output_path(), PathBuf::from("processed/out.csv"));
    }

    #[test]
    fn test_missing_input_file() {
        let raw = RawPipelineOptions {
            input_file: None,
            ..minimal_raw()
        };
        let err = PipelineSpec::resolve("p", &raw).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingField {
                field: "input_file",
                ..
            }
        ));
    }

    #[test]
    fn test_empty_string_is_not_absent() {
        let raw = RawPipelineOptions {
            output_dir: Some(String::new()),
            ..minimal_raw()
        };
        let err = PipelineSpec::resolve("p", &raw).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::EmptyField {
                field: "output_dir",
                ..
            }
        ));
    }

    #[test]
    fn test_filter_column_without_values() {
        let raw = RawPipelineOptions {
            filter_column: Some("city".to_string()),
            ..minimal_raw()
        };
        let err = PipelineSpec::resolve("p", &raw).unwrap_err();
        assert!(matches!(err, ConfigError::UnpairedField { .. }));
    }

    #[test]
    fn test_empty_filter_values_rejected() {
        let raw = RawPipelineOptions {
            filter_column: Some("city".to_string()),
            filter_values: Some(vec![]),
            ..minimal_raw()
        };
        let err = PipelineSpec::resolve("p", &raw).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnpairedField {
                field: "filter_column",
                ..
            }
        ));
    }

    #[test]
    fn test_keep_values_without_column() {
        let raw = RawPipelineOptions {
            keep_values: Some(vec!["Manhattan".to_string()]),
            ..minimal_raw()
        };
        let err = PipelineSpec::resolve("p", &raw).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnpairedField {
                field: "keep_values",
                ..
            }
        ));
    }

    #[test]
    fn test_sub_columns_require_primary() {
        let raw = RawPipelineOptions {
            sub_columns: Some(vec!["type".to_string()]),
            ..minimal_raw()
        };
        let err = PipelineSpec::resolve("p", &raw).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnpairedField {
                field: "sub_columns",
                ..
            }
        ));
    }

    #[test]
    fn test_sort_order_duplicates_rejected() {
        let raw = RawPipelineOptions {
            primary_column: Some("type".to_string()),
            sort_order: Some(vec!["Retail".to_string(), "Retail".to_string()]),
            ..minimal_raw()
        };
        let err = PipelineSpec::resolve("p", &raw).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateSortEntry { .. }));
    }

    #[test]
    fn test_compression_values() {
        let raw = RawPipelineOptions {
            compression: Some("snappy".to_string()),
            ..minimal_raw()
        };
        assert_eq!(
            PipelineSpec::resolve("p", &raw).unwrap().compression,
            Codec::Snappy
        );

        let raw = RawPipelineOptions {
            compression: Some("brotli".to_string()),
            ..minimal_raw()
        };
        assert!(matches!(
            PipelineSpec::resolve("p", &raw).unwrap_err(),
            ConfigError::UnknownCompression { .. }
        ));
    }

    #[test]
    fn test_validate_against_schema() {
        let raw = RawPipelineOptions {
            primary_column: Some("city".to_string()),
            sub_columns: Some(vec!["type".to_string()]),
            ..minimal_raw()
        };
        let spec = PipelineSpec::resolve("p", &raw).unwrap();

        let df = DataFrame::from_series(vec![
            Series::from_strings("city", vec!["Manhattan"]),
            Series::from_strings("type", vec!["Office"]),
        ])
        .unwrap();
        assert!(spec.validate_against(&df).is_ok());

        let df = DataFrame::from_series(vec![Series::from_strings("city", vec!["Manhattan"])])
            .unwrap();
        let err = spec.validate_against(&df).unwrap_err();
        assert!(matches!(err, DataError::ColumnNotFound(name) if name == "type"));
    }

    #[test]
    fn test_load_config_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("datasets.json");
        std::fs::write(
            &path,
            r#"{
                "props": {
                    "input_file": "in.csv",
                    "output_file": "out.parquet",
                    "output_dir": "processed",
                    "compression": "gzip",
                    "show_stats": true
                }
            }"#,
        )
        .unwrap();

        let configs = load_config(&path).unwrap();
        assert_eq!(configs.len(), 1);
        let spec = PipelineSpec::resolve("props", &configs["props"]).unwrap();
        assert_eq!(spec.compression, Codec::Gzip);
        assert!(spec.show_stats);
    }

    #[test]
    fn test_load_config_rejects_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("datasets.json");
        std::fs::write(
            &path,
            r#"{"p": {"input_file": "a.csv", "output_file": "b.csv", "output_dir": "o", "shuffle": true}}"#,
        )
        .unwrap();

        assert!(matches!(load_config(&path), Err(ConfigError::Parse(_))));
    }
}
