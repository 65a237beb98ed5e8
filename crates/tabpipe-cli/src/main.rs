//! tabpipe CLI - command-line interface for the tabpipe batch data tool

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use tabpipe_core::config::{load_config, ConfigError, PipelineSpec, RawPipelineOptions};
use tabpipe_core::pipeline::{run_pipeline, RunReport};

#[derive(Parser)]
#[command(name = "tabpipe")]
#[command(version = tabpipe_core::VERSION)]
#[command(about = "Configuration-driven batch transformer for tabular datasets", long_about = None)]
struct Cli {
    /// Path to the pipeline configuration file
    #[arg(long, global = true, default_value = "datasets.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the configured pipelines
    List,

    /// Run a single pipeline by name
    Run {
        /// Pipeline name as it appears in the configuration file
        name: String,
    },

    /// Run every configured pipeline
    All,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let configs = load_config(&cli.config).with_context(|| {
        format!(
            "failed to load configuration from '{}'",
            cli.config.display()
        )
    })?;

    match cli.command {
        Commands::List => {
            list_pipelines(&configs);
            Ok(())
        }
        Commands::Run { name } => {
            let report = run_one(&configs, &name)?;
            print_report(&report);
            Ok(())
        }
        Commands::All => run_all(&configs),
    }
}

fn list_pipelines(configs: &BTreeMap<String, RawPipelineOptions>) {
    if configs.is_empty() {
        println!("No pipelines configured");
        return;
    }

    println!("Configured pipelines:");
    for (i, (name, options)) in configs.iter().enumerate() {
        let output = options.output_file.as_deref().unwrap_or("N/A");
        println!("  {}. {name} -> {output}", i + 1);
    }
}

fn run_one(configs: &BTreeMap<String, RawPipelineOptions>, name: &str) -> Result<RunReport> {
    let raw = configs
        .get(name)
        .ok_or_else(|| ConfigError::UnknownPipeline(name.to_string()))?;

    let spec = PipelineSpec::resolve(name, raw)?;

    println!("Running pipeline '{name}'");
    println!("  input:  {}", spec.input_file.display());
    println!("  output: {}", spec.output_path().display());

    let report = run_pipeline(&spec).with_context(|| format!("pipeline '{name}' failed"))?;
    Ok(report)
}

fn run_all(configs: &BTreeMap<String, RawPipelineOptions>) -> Result<()> {
    println!("Running {} pipeline(s)...\n", configs.len());

    let mut failures = 0usize;
    for name in configs.keys() {
        match run_one(configs, name) {
            Ok(report) => {
                print_report(&report);
                println!("'{name}' completed\n");
            }
            Err(err) => {
                eprintln!("'{name}' failed: {err:#}\n");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} pipeline(s) failed");
    }

    println!("All pipelines completed");
    Ok(())
}

fn print_report(report: &RunReport) {
    println!("  loaded {} row(s)", report.rows_loaded);
    let dropped = report.rows_loaded - report.rows_after_filter;
    if dropped > 0 {
        println!("  dropped {dropped} row(s) in filtering");
    }
    if let Some(groups) = report.num_groups {
        println!("  formed {groups} group(s)");
    }
    println!(
        "  wrote {} row(s) to {}",
        report.rows_written,
        report.output_path.display()
    );

    if let Some(stats) = &report.stats {
        println!("\nStatistics:");
        println!("{}", stats.to_pretty_string(50));
        if let Some(path) = &report.stats_path {
            println!("  stats written to {}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn sample_configs(dir: &std::path::Path) -> BTreeMap<String, RawPipelineOptions> {
        fs::write(
            dir.join("sales.csv"),
            "region,amount\nNorth,100\nSouth,200\nNorth,150\n",
        )
        .unwrap();

        let config_path = dir.join("datasets.json");
        fs::write(
            &config_path,
            format!(
                r#"{{
                    "sales": {{
                        "input_file": "{input}",
                        "output_file": "sales_out.csv",
                        "output_dir": "{out_dir}",
                        "primary_column": "region",
                        "show_stats": true
                    }}
                }}"#,
                input = dir.join("sales.csv").display(),
                out_dir = dir.join("processed").display()
            ),
        )
        .unwrap();

        load_config(&config_path).unwrap()
    }

    #[test]
    fn test_run_one() {
        let dir = tempdir().unwrap();
        let configs = sample_configs(dir.path());

        let report = run_one(&configs, "sales").unwrap();
        assert_eq!(report.rows_loaded, 3);
        assert_eq!(report.num_groups, Some(2));
        assert!(report.output_path.exists());
        assert!(report.stats.is_some());
    }

    #[test]
    fn test_run_unknown_pipeline() {
        let dir = tempdir().unwrap();
        let configs = sample_configs(dir.path());

        let err = run_one(&configs, "missing").unwrap_err();
        assert!(err.to_string().contains("missing"));
    }
}
