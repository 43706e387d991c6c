//! mesh-split: split oversized models into printable, joinable parts.
//!
//! Loads a mesh, optionally hollows it, cuts it into parts that fit the
//! printer's build volume, adds pins and holes (or dowel holes) on every
//! seam, and writes one file per part plus a `manifest.json`.
//!
//! # Logging
//!
//! Set the `RUST_LOG` environment variable to control log output:
//! - `RUST_LOG=mesh_segment=info` - Stage summaries
//! - `RUST_LOG=mesh_segment=debug` - Every cut and joint
//! - `RUST_LOG=mesh_core::timing=debug` - Performance timing
//! - `RUST_LOG=debug` - All debug output
//!
//! # Example
//!
//! ```bash
//! # Split for a 250mm cube printer with integrated pins
//! mesh-split split statue.stl -o statue_parts --build-volume 250,250,250
//!
//! # Hollow first, 3mm walls, dowel joints, verbose
//! mesh-split -v split statue.stl -o statue_parts --hollow 3 --joints dowel
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod export;
mod output;

use commands::{batch, hollow, info, split};
use export::PartFormat;

/// mesh-split - split oversized models into parts that fit a printer.
#[derive(Parser)]
#[command(name = "mesh-split")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format for results
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Suppress all non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Increase output verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Display mesh size, units and solidity
    Info {
        /// Input mesh file
        input: PathBuf,

        /// Source units (detected from size when omitted)
        #[arg(long)]
        units: Option<UnitsArg>,
    },

    /// Hollow a mesh into a shell of uniform wall thickness
    Hollow {
        /// Input mesh file
        input: PathBuf,

        /// Output file path (.stl or .3mf)
        #[arg(short, long)]
        output: PathBuf,

        /// Wall thickness in mm
        #[arg(long, short, default_value = "2.0")]
        wall: f64,

        /// Voxels along the longest dimension
        #[arg(long, default_value = "128")]
        resolution: usize,

        /// Source units (detected from size when omitted)
        #[arg(long)]
        units: Option<UnitsArg>,
    },

    /// Split a mesh into parts that fit the build volume
    Split {
        /// Input mesh file
        input: PathBuf,

        /// Output directory for parts and manifest
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        options: SplitOptions,
    },

    /// Split several meshes in parallel, one output directory each
    Batch {
        /// Input mesh files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Directory that receives one sub-directory per input
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        options: SplitOptions,
    },
}

/// Segmentation settings shared by `split` and `batch`.
#[derive(Args, Clone, Debug)]
pub struct SplitOptions {
    /// TOML configuration file; flags below override its values
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Build volume as X,Y,Z in mm
    #[arg(long, value_delimiter = ',')]
    pub build_volume: Option<Vec<f64>>,

    /// Hollow with this wall thickness in mm
    #[arg(long)]
    pub hollow: Option<f64>,

    /// Hollow each part after cutting instead of the whole mesh first
    #[arg(long, requires = "hollow")]
    pub hollow_parts: bool,

    /// Voxels along the longest dimension when hollowing
    #[arg(long)]
    pub resolution: Option<usize>,

    /// Joint style on each seam
    #[arg(long)]
    pub joints: Option<JointArg>,

    /// Pin or dowel diameter in mm
    #[arg(long)]
    pub pin_diameter: Option<f64>,

    /// Pin height (or dowel length) in mm
    #[arg(long)]
    pub pin_height: Option<f64>,

    /// Clearance added to hole diameter and depth in mm
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Joints requested per seam
    #[arg(long)]
    pub joints_per_seam: Option<usize>,

    /// Fail if more than this many parts are needed (0 = automatic)
    #[arg(long)]
    pub max_parts: Option<usize>,

    /// Source units (detected from size when omitted)
    #[arg(long)]
    pub units: Option<UnitsArg>,

    /// File format for parts
    #[arg(long, default_value = "3mf")]
    pub part_format: PartFormat,

    /// Replace an existing output directory
    #[arg(long)]
    pub force: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum JointArg {
    /// No joints
    None,
    /// Pin on one part, hole on the other
    Integrated,
    /// Holes on both parts for a separate dowel
    Dowel,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum UnitsArg {
    #[value(name = "mm")]
    Millimeters,
    #[value(name = "cm")]
    Centimeters,
    #[value(name = "m")]
    Meters,
    #[value(name = "in")]
    Inches,
}

impl From<UnitsArg> for mesh_core::Units {
    fn from(arg: UnitsArg) -> Self {
        match arg {
            UnitsArg::Millimeters => mesh_core::Units::Millimeters,
            UnitsArg::Centimeters => mesh_core::Units::Centimeters,
            UnitsArg::Meters => mesh_core::Units::Meters,
            UnitsArg::Inches => mesh_core::Units::Inches,
        }
    }
}

impl From<JointArg> for mesh_segment::JointType {
    fn from(arg: JointArg) -> Self {
        match arg {
            JointArg::None => mesh_segment::JointType::None,
            JointArg::Integrated => mesh_segment::JointType::Integrated,
            JointArg::Dowel => mesh_segment::JointType::Dowel,
        }
    }
}

/// Initialize the tracing subscriber based on verbosity level.
fn init_tracing(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    // RUST_LOG wins over -v flags.
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "warn",
            1 => "mesh_core=info,mesh_hollow=info,mesh_segment=info,mesh_split=info",
            2 => "mesh_core=debug,mesh_hollow=debug,mesh_segment=debug,mesh_split=debug",
            _ => "trace",
        };
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(filter)
        .init();
}

/// Print a failure with code, suggestion and location when known.
fn report_error(e: &anyhow::Error) {
    if let Some(err) = e.downcast_ref::<mesh_segment::SegmentError>() {
        eprintln!("{}: {}", "Error".red().bold(), err);
        eprintln!("  {}: {}", "Code".cyan(), err.code());
        eprintln!("  {}: {}", "Kind".cyan(), err.kind());
        eprintln!("  {}: {}", "Suggestion".green(), err.recovery_suggestion());
        if let Some(part) = err.part() {
            eprintln!("  {}: part {}", "Location".yellow(), part);
        }
    } else if let Some(err) = e.downcast_ref::<mesh_hollow::HollowError>() {
        eprintln!("{}: {}", "Error".red().bold(), err);
        eprintln!("  {}: {}", "Code".cyan(), err.code());
        eprintln!("  {}: {}", "Suggestion".green(), err.recovery_suggestion());
    } else if let Some(err) = e.downcast_ref::<mesh_core::MeshError>() {
        eprintln!("{}: {}", "Error".red().bold(), err);
        eprintln!("  {}: {}", "Code".cyan(), err.code());
        eprintln!("  {}: {}", "Suggestion".green(), err.recovery_suggestion());
        if let Some(location) = err.location() {
            eprintln!("  {}: {}", "Location".yellow(), location);
        }
    } else {
        eprintln!("{}: {}", "Error".red().bold(), e);
    }
    for cause in e.chain().skip(1) {
        eprintln!("  {}: {}", "Caused by".yellow(), cause);
    }
}

fn main() -> Result<()> {
    #[cfg(debug_assertions)]
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Info { input, units } => info::run(input, *units, &cli),
        Commands::Hollow {
            input,
            output,
            wall,
            resolution,
            units,
        } => hollow::run(input, output, *wall, *resolution, *units, &cli),
        Commands::Split {
            input,
            output,
            options,
        } => split::run(input, output, options, &cli),
        Commands::Batch {
            inputs,
            output,
            options,
        } => batch::run(inputs, output, options, &cli),
    };

    if let Err(e) = &result {
        if !cli.quiet {
            report_error(e);
        }
        std::process::exit(1);
    }

    Ok(())
}
