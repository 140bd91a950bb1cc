//! # SHR JSON Schema CLI
//!
//! Command-line interface for exporting expanded SHR specifications.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use shr_jsonschema::{
    ExporterConfig, JsonSchemaExporter, OutputMode, Severity, SpecificationExporter,
    Specifications, write_schemas,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shr-jsonschema")]
#[command(about = "Export SHR specifications as JSON Schema documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Export every namespace of an expanded specification file
    Export(ExportCommand),
}

#[derive(Args)]
struct ExportCommand {
    /// Expanded specifications as JSON
    input: PathBuf,

    /// Output directory for the schema documents
    #[arg(short, long, default_value = "out")]
    out: PathBuf,

    /// Inline inherited fields and entry identity instead of composing bases
    #[arg(long)]
    flat: bool,

    /// Base URL of the generated schema documents
    #[arg(long)]
    schema_url: Option<String>,

    /// Base URL of entry types
    #[arg(long)]
    type_url: Option<String>,

    /// Exporter configuration file (JSON); flags take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Exit with an error status when any error diagnostic was reported
    #[arg(long)]
    strict: bool,
}

impl ExportCommand {
    fn config(&self) -> Result<ExporterConfig> {
        let mut config = match &self.config {
            Some(path) => ExporterConfig::from_file(path)
                .with_context(|| format!("Failed to load configuration: {}", path.display()))?,
            None => ExporterConfig::default(),
        };
        if let Some(url) = &self.schema_url {
            config = config.with_base_schema_url(url);
        }
        if let Some(url) = &self.type_url {
            config = config.with_base_type_url(url);
        }
        if self.flat {
            config = config.with_mode(OutputMode::Flattened);
        }
        config.validate().context("Invalid exporter configuration")?;
        Ok(config)
    }

    fn execute(&self) -> Result<()> {
        if !self.input.exists() {
            anyhow::bail!("Input path does not exist: {}", self.input.display());
        }

        let config = self.config()?;
        info!(
            "Exporting {} ({:?} mode) to {}",
            self.input.display(),
            config.mode,
            self.out.display()
        );

        let content = fs::read_to_string(&self.input)
            .with_context(|| format!("Failed to read input file: {}", self.input.display()))?;
        let specs = Specifications::from_json(&content)
            .with_context(|| "Failed to parse expanded specifications")?;

        let result = JsonSchemaExporter::with_config(config)
            .export(&specs)
            .with_context(|| "Failed to export specifications")?;
        let written = write_schemas(&result, &self.out)
            .with_context(|| format!("Failed to write schemas to {}", self.out.display()))?;

        for path in &written {
            println!("{}", path.display());
        }

        let errors = result
            .diagnostics
            .iter()
            .filter(|d| d.severity >= Severity::Error)
            .count();
        if !result.diagnostics.is_empty() {
            warn!(
                "{} diagnostics reported ({} errors)",
                result.diagnostics.len(),
                errors
            );
        }
        if self.strict && errors > 0 {
            anyhow::bail!("{errors} error diagnostics reported");
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Export(cmd) => cmd.execute(),
    }
}
