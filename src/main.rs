use artgraph::config;
use artgraph::imaging::RustBackend;
use artgraph::output;
use artgraph::pipeline::{Pipeline, PipelineOptions};
use artgraph::resolve;
use artgraph::tree::ContentTree;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "artgraph")]
#[command(about = "Resolve art-gallery content into a content graph")]
#[command(long_about = "\
Resolve art-gallery content into a content graph

Gallery documents list art pieces or extend other galleries. Every image they
reference is rendered once into a content-addressed output directory, and the
resolved model points at those renditions.

Data root structure:

  data/
  ├── artgraph.toml                # Config (optional)
  ├── artists.yaml                 # Artist roster (optional)
  ├── characters/
  │   ├── characters.yaml          # Character sheets (optional)
  │   └── ivy.png                  # Paths are relative to the document
  ├── art/
  │   ├── sketches.gallery         # pieces: [...]
  │   ├── paintings.gallery
  │   ├── all.gallery              # $extends: [sketches.gallery, paintings.gallery]
  │   └── dawn.png
  └── static/_/                    # Rendered outputs, one directory per source hash
      └── 9e107d9d/
          ├── details.json
          ├── 640x427.avif
          └── 640x427.webp

Run 'artgraph gen-config' to generate a documented artgraph.toml.")]
#[command(version)]
struct Cli {
    /// Data root containing the gallery documents
    #[arg(long, default_value = ".", global = true)]
    data_root: PathBuf,

    /// Output directory for rendered media (overrides `public_dir` in artgraph.toml)
    #[arg(long, global = true)]
    public_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve the content model, rendering any missing media
    Resolve {
        /// Write the resolved model as JSON to this file
        #[arg(long)]
        json: Option<PathBuf>,
        /// Ignore the fast hash ledger and rehash every media file
        #[arg(long)]
        no_cache: bool,
    },
    /// Validate documents and inheritance without touching media
    Check,
    /// Delete output directories no longer referenced by the content
    Gc {
        /// List what would be deleted without deleting it
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the version token of the data root
    Fingerprint,
    /// Print a stock artgraph.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let site_config = config::load_config(&cli.data_root)?;
    let public_dir = match &cli.public_dir {
        Some(dir) => dir.clone(),
        None => site_config.public_dir_in(&cli.data_root),
    };

    match cli.command {
        Command::Check => {
            let tree = ContentTree::new(&cli.data_root, &public_dir);
            let raw = resolve::load_raw(&tree)?;
            let report = resolve::check(&raw)?;
            output::print_check_output(&report);
        }
        Command::Resolve { json, no_cache } => {
            init_thread_pool(&site_config.processing);
            let options = PipelineOptions::from_config(&cli.data_root, &public_dir, &site_config);
            let mut pipeline = Pipeline::new(RustBackend::new(), &options);
            if no_cache {
                pipeline.clear_ledger();
            }
            let model = pipeline.resolve()?;
            if let Some(path) = json {
                write_json(&path, &*model)?;
            }
            output::print_resolve_output(&model, &pipeline.stats());
        }
        Command::Gc { dry_run } => {
            init_thread_pool(&site_config.processing);
            let options = PipelineOptions::from_config(&cli.data_root, &public_dir, &site_config);
            let mut pipeline = Pipeline::new(RustBackend::new(), &options);
            if dry_run {
                output::print_gc_plan(&pipeline.unused_hashes()?);
            } else {
                output::print_gc_output(&pipeline.collect_garbage()?);
            }
        }
        Command::Fingerprint => {
            let options = PipelineOptions::from_config(&cli.data_root, &public_dir, &site_config);
            let pipeline = Pipeline::new(RustBackend::new(), &options);
            println!("{}", pipeline.fingerprint()?);
        }
        Command::GenConfig => {}
    }

    Ok(())
}

/// Log to stderr; `RUST_LOG` overrides the default `artgraph=info`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("artgraph=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; users can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    tracing::info!(path = %path.display(), "Wrote content model");
    Ok(())
}
