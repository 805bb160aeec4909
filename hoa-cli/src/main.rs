//! hoa CLI - Human Organ Atlas dataset tools.
//!
//! Browses dataset metadata, registration paths and projects volumes of
//! interest between registered datasets.
#![allow(clippy::uninlined_format_args, clippy::too_many_lines)]

use clap::{Parser, Subcommand};

use hoa_core::{ArrayCoordinate, Voi};
use hoa_io::{write_inventory, CatalogConfig, DatasetCatalog, StorageLocation};
use log::LevelFilter;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    HoaIo(#[from] hoa_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] hoa_core::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no metadata directory given, use --metadata-dir or set HOA_METADATA_DIR")]
    MissingMetadataDir,
}

/// Human Organ Atlas dataset and registration tools.
#[derive(Parser)]
#[command(name = "hoa")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory of dataset metadata JSON files
    #[arg(long, env = "HOA_METADATA_DIR", global = true)]
    metadata_dir: Option<PathBuf>,

    /// Fail on registration hints naming unknown datasets
    #[arg(long, global = true)]
    strict: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List dataset names
    List {
        /// Only list datasets of this organ
        #[arg(long)]
        organ: Option<String>,
    },

    /// Show metadata of a dataset
    Info {
        /// Dataset name
        name: String,
    },

    /// Show the chain of registrations between two datasets
    Path {
        /// Source dataset name
        source: String,
        /// Target dataset name
        target: String,
    },

    /// Project a volume of interest into another dataset
    TransformVoi {
        /// Dataset the VOI is in
        source: String,

        /// Dataset to project the VOI into
        target: String,

        /// Downsample level of the VOI
        #[arg(short, long, default_value = "0")]
        level: i32,

        /// Lower corner as X,Y,Z
        #[arg(long, value_parser = parse_coordinate)]
        lower: ArrayCoordinate,

        /// Size as X,Y,Z
        #[arg(long, value_parser = parse_coordinate)]
        size: ArrayCoordinate,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the dataset inventory as CSV
    Inventory {
        /// Output file path, stdout if not given
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn parse_coordinate(s: &str) -> std::result::Result<ArrayCoordinate, String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<i64>().map_err(|e| format!("{p:?}: {e}")))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    match parts.as_slice() {
        [x, y, z] => Ok(ArrayCoordinate::new(*x, *y, *z)),
        _ => Err(format!("expected X,Y,Z, got {s:?}")),
    }
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
}

fn load_catalog(cli: &Cli) -> Result<DatasetCatalog> {
    let dir = cli
        .metadata_dir
        .as_ref()
        .ok_or(CliError::MissingMetadataDir)?;
    let config = CatalogConfig::default().with_strict_registrations(cli.strict);
    let catalog = DatasetCatalog::load_dir(dir, &config)?;
    for skipped in catalog.skipped_hints() {
        eprintln!("Skipped registration {}", skipped);
    }
    Ok(catalog)
}

fn names(datasets: &[std::sync::Arc<hoa_core::Dataset>]) -> String {
    if datasets.is_empty() {
        return "-".to_string();
    }
    datasets
        .iter()
        .map(|d| d.name())
        .collect::<Vec<_>>()
        .join(", ")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let catalog = load_catalog(&cli)?;

    match cli.command {
        Commands::List { organ } => {
            for dataset in catalog.iter() {
                if organ.as_deref().map_or(true, |o| dataset.sample.organ == o) {
                    println!("{}", dataset.name());
                }
            }
        }

        Commands::Info { name } => {
            let dataset = catalog.get(&name)?;
            println!("Name:          {}", dataset.name());
            println!("Donor:         {}", dataset.donor.id);
            println!("Organ:         {}", dataset.organ_label());
            println!("VOI:           {}", dataset.voi);
            println!("Beamline:      {}", dataset.scan.beamline);
            println!("Voxel size:    {} um", dataset.voxel_size_um());
            println!(
                "Shape:         {} x {} x {}",
                dataset.data.shape[0], dataset.data.shape[1], dataset.data.shape[2]
            );
            match StorageLocation::of(&dataset) {
                Ok(location) => println!("Storage:       {}", location),
                Err(e) => println!("Storage:       {}", e),
            }
            println!("Parents:       {}", names(&catalog.parents(&dataset)));
            println!("Children:      {}", names(&catalog.children(&dataset)));
            println!("Registered to: {}", names(&catalog.registered(&dataset)));
        }

        Commands::Path { source, target } => {
            let source = catalog.get(&source)?;
            let target = catalog.get(&target)?;
            let path = catalog
                .registrations()
                .path(source.name(), target.name())
                .ok_or_else(|| hoa_core::Error::NoRegistrationPath {
                    source_dataset: source.name().to_owned(),
                    target_dataset: target.name().to_owned(),
                })?;
            println!("{}", path.join(" -> "));
        }

        Commands::TransformVoi {
            source,
            target,
            level,
            lower,
            size,
            json,
        } => {
            let voi = Voi::new(catalog.get(&source)?, level, lower, size)?;
            let projected = voi.transform_to(catalog.get(&target)?, catalog.registrations())?;

            if json {
                let lo = projected.lower_corner();
                let sz = projected.size();
                let value = serde_json::json!({
                    "dataset": projected.dataset().name(),
                    "downsample_level": projected.downsample_level(),
                    "lower_corner": [lo.x, lo.y, lo.z],
                    "size": [sz.x, sz.y, sz.z],
                    "voxel_size_um": projected.voxel_size_um(),
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("{}", voi);
                println!("  -> {}", projected);
            }
        }

        Commands::Inventory { output } => match output {
            Some(path) => {
                write_inventory(&catalog, File::create(&path)?)?;
                println!("Wrote {} datasets to {}", catalog.len(), path.display());
            }
            None => {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                write_inventory(&catalog, &mut handle)?;
                handle.flush()?;
            }
        },
    }

    Ok(())
}
