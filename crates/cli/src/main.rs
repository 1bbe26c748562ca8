//! Archivum CLI — scan a source tree into a resumable output tree, then
//! replay it to a catalog server.

mod upload;

use archivum_core::model::SourceType;
use archivum_scanner::config::ScannerConfig;
use archivum_scanner::orchestrator::{self, run_scan};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Archivum — file cataloging and deduplication across external media.
#[derive(Parser)]
#[command(name = "archivum", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk a path and write an output tree of sources, files, and code projects
    Scan {
        /// Root path to scan
        path: PathBuf,

        /// Logical source name (default: the folder name)
        #[arg(long)]
        name: Option<String>,

        /// Directory to write the output tree into
        #[arg(long, default_value = "./archivum-output")]
        output: PathBuf,

        /// Optional YAML config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Hashing worker-pool size (overrides config)
        #[arg(long)]
        threads: Option<usize>,

        /// Files per batch file (overrides config)
        #[arg(long)]
        batch_size: Option<usize>,

        /// Source type
        #[arg(long, value_enum, default_value = "disk")]
        source_type: SourceTypeArg,
    },
    /// Replay a previously produced output tree to a catalog server
    Upload {
        /// Output tree directory produced by `scan`
        output_dir: PathBuf,

        /// Catalog server base URL
        #[arg(long, default_value = "http://localhost:8080")]
        server_url: String,

        /// Per-request timeout in seconds
        #[arg(long, default_value = "60")]
        timeout: u64,

        /// Verbose logging
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum SourceTypeArg {
    Disk,
    Partition,
    Cloud,
    Network,
    Archive,
}

impl From<SourceTypeArg> for SourceType {
    fn from(v: SourceTypeArg) -> Self {
        match v {
            SourceTypeArg::Disk => SourceType::Disk,
            SourceTypeArg::Partition => SourceType::Partition,
            SourceTypeArg::Cloud => SourceType::Cloud,
            SourceTypeArg::Network => SourceType::Network,
            SourceTypeArg::Archive => SourceType::Archive,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "archivum=debug" } else { "archivum=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive)),
        )
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            path,
            name,
            output,
            config,
            threads,
            batch_size,
            source_type,
        } => {
            init_tracing(false);

            let mut cfg = match ScannerConfig::load(config.as_deref()) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("configuration error: {e}");
                    std::process::exit(1);
                }
            };
            if let Some(t) = threads {
                cfg.hash_threads = t;
            }
            if let Some(b) = batch_size {
                cfg.batch_size = b;
            }

            let source_name = name.unwrap_or_else(|| {
                path.file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| "source".to_string())
            });

            let exif_extractor = orchestrator::default_exif_extractor();
            match run_scan(
                &path,
                &source_name,
                source_type.into(),
                &output,
                &cfg,
                &exif_extractor,
            ) {
                Ok(outcome) => {
                    println!(
                        "scanned {} files ({} bytes), {} errors -> {}",
                        outcome.total_files,
                        outcome.total_size,
                        outcome.errors.len(),
                        outcome.output_dir.display()
                    );
                }
                Err(e) => {
                    eprintln!("scan failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Upload {
            output_dir,
            server_url,
            timeout,
            verbose,
        } => {
            init_tracing(verbose);

            let opts = upload::UploadOptions {
                server_url,
                timeout: Duration::from_secs(timeout),
            };
            if let Err(e) = upload::upload_tree(&output_dir, &opts) {
                eprintln!("upload failed: {e}");
                std::process::exit(1);
            }
        }
    }
}
