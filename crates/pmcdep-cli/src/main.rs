//! PMC deposit CLI — build deposit archives from a manifest file.
//!
//! `pmcdep build` produces `<output>/pmc/<taskId>.tar.gz` without
//! uploading anything; `pmcdep check` only validates the manifest.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use pmcdep_cli::init_tracing;
use pmcdep_core::{validate_manifest, Config};
use pmcdep_services::{BuildOptions, DepositPipeline, DepositTransport, SftpTransport};
use pmcdep_storage::{FileFetcher, HttpFetcher};

#[derive(Parser)]
#[command(name = "pmcdep", about = "PMC manuscript deposit CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a deposit archive from a manifest
    Build {
        /// Path to the deposit manifest JSON
        manifest: PathBuf,
        /// Output directory (default: OUTPUT_DIR or `deposits`)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Keep the assembled deposit folder next to the archive
        #[arg(short, long)]
        keep_files: bool,
        /// Validate the generated XML against a DTD (requires xmllint)
        #[arg(long)]
        dtd: Option<PathBuf>,
    },
    /// Validate a manifest without building anything
    Check {
        /// Path to the deposit manifest JSON
        manifest: PathBuf,
    },
}

fn read_manifest(path: &PathBuf) -> anyhow::Result<serde_json::Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Unable to read manifest {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Manifest {} is not valid JSON", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            manifest,
            output,
            keep_files,
            dtd,
        } => {
            let value = read_manifest(&manifest)?;
            let manifest = match validate_manifest(&value, &config.default_agency) {
                Ok(manifest) => manifest,
                Err(err) => {
                    for field_error in &err.errors {
                        eprintln!("{}", field_error.describe());
                    }
                    anyhow::bail!("Manifest validation failed");
                }
            };

            let fetcher: Arc<dyn FileFetcher> =
                Arc::new(HttpFetcher::new(config.stream_buffer_bytes())?);
            let transport: Arc<dyn DepositTransport> =
                Arc::new(SftpTransport::new(config.sftp.clone()));
            let pipeline = DepositPipeline::new(&config, fetcher, transport);

            let opts = BuildOptions {
                output_dir: output.unwrap_or_else(|| config.output_dir.clone()),
                keep_files,
                dtd,
            };
            let archive_path = pipeline.build_deposit(&manifest, &opts).await?;
            println!("{}", archive_path.display());
        }
        Commands::Check { manifest } => {
            let value = read_manifest(&manifest)?;
            match validate_manifest(&value, &config.default_agency) {
                Ok(manifest) => {
                    println!("Manifest is valid: {}", manifest.task_id);
                }
                Err(err) => {
                    for field_error in &err.errors {
                        eprintln!("{}", field_error.describe());
                    }
                    anyhow::bail!("Manifest validation failed");
                }
            }
        }
    }

    Ok(())
}
