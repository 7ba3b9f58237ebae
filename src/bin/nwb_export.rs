//! NWB export command line
//!
//! **Usage:**
//! ```bash
//! nwb-export --scan stack.tif --scan stack.tif --output-dir ./nwb --with-rois session-1 session-2
//! nwb-export --frame-rate 30 --num-planes 1 --readers 2 session-1
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use ophys_nwb_export::config::ExportConfig;
use ophys_nwb_export::export::{SessionExporter, WriteStatus};
use ophys_nwb_export::nwb::JsonNwbWriter;
use ophys_nwb_export::placeholder::RandomPlaceholders;
use ophys_nwb_export::scan::{ImageStackReader, ScanImageTiff, StaticScan};

/// Export imaging sessions to NWB
#[derive(Parser, Debug)]
#[clap(name = "nwb-export")]
#[clap(about = "Assemble imaging sessions into NWB files")]
struct Args {
    /// Session keys to export, in order
    #[clap(required = true)]
    session_keys: Vec<String>,

    /// Output directory (created if missing)
    #[clap(long, short, default_value = "./", env = "NWB_EXPORT_DIR")]
    output_dir: PathBuf,

    /// Keep existing output files instead of replacing them
    #[clap(long)]
    no_overwrite: bool,

    /// TOML configuration file
    #[clap(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Populate ROIs and fluorescence traces
    #[clap(long)]
    with_rois: bool,

    /// Seed for placeholder data
    #[clap(long)]
    seed: Option<u64>,

    /// ScanImage TIFF to open, once per plane
    #[clap(long, value_name = "PATH")]
    scan: Vec<PathBuf>,

    /// Use static readers with this frame rate instead of opening files
    #[clap(long, conflicts_with = "scan")]
    frame_rate: Option<f64>,

    /// Planes reported by static readers
    #[clap(long, default_value = "1", requires = "frame_rate")]
    num_planes: usize,

    /// Number of static readers
    #[clap(long, default_value = "2", requires = "frame_rate")]
    readers: usize,

    /// Indent the JSON output
    #[clap(long)]
    pretty: bool,
}

fn open_readers(args: &Args) -> Result<Vec<Box<dyn ImageStackReader>>> {
    if let Some(frame_rate) = args.frame_rate {
        return Ok((0..args.readers)
            .map(|_| {
                Box::new(StaticScan::new("static.tif", args.num_planes, frame_rate))
                    as Box<dyn ImageStackReader>
            })
            .collect());
    }
    if args.scan.is_empty() {
        bail!("pass --scan PATH once per plane, or --frame-rate for static readers");
    }
    args.scan
        .iter()
        .map(|path| {
            ScanImageTiff::open(path)
                .map(|scan| Box::new(scan) as Box<dyn ImageStackReader>)
                .with_context(|| format!("opening {}", path.display()))
        })
        .collect()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ExportConfig::from_toml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ExportConfig::default(),
    };
    if args.with_rois {
        config.include_rois = true;
    }

    let placeholders = args
        .seed
        .map_or_else(RandomPlaceholders::from_entropy, RandomPlaceholders::seeded);

    let mut exporter = SessionExporter::builder(config)
        .readers(open_readers(&args)?)
        .placeholders(placeholders)
        .writer(JsonNwbWriter::new().pretty(args.pretty))
        .build()?;

    let entries = exporter.export_many(&args.session_keys, &args.output_dir, !args.no_overwrite)?;

    let written = entries
        .iter()
        .filter(|e| e.status == WriteStatus::Written)
        .count();
    info!(
        written,
        skipped = entries.len() - written,
        "Done."
    );
    Ok(())
}
