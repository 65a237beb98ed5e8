//! tabpipe core - transformation and aggregation engine
//!
//! This crate provides the core functionality:
//! - Data: Arrow-backed columnar table, Series, and file I/O
//! - Config: configuration parsing and the options resolver
//! - Pipeline: filter, sort, and grouping stages plus the run driver
//!
//! A pipeline is one named, fully configured run: load a table, apply the
//! configured row filters, sort, group, and write the result. The CLI
//! crate owns the command surface; this crate never prints.

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Table abstraction and file I/O
pub mod data;

/// Configuration parsing and validation
pub mod config;

/// Pipeline stages and the run driver
pub mod pipeline;

pub use config::{load_config, ConfigError, PipelineSpec, RawPipelineOptions};
pub use data::{DataError, DataFrame, Series, Value};
pub use pipeline::{run_pipeline, PipelineError, RunReport};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
