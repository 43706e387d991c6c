//! mesh-split split command - cut a mesh into parts that fit the printer.

use std::path::Path;

use anyhow::{Context, Result, bail};
use colored::Colorize;
use mesh_core::load_mesh;
use mesh_segment::{HollowingStrategy, SegmentationConfig, SegmentationResult, segment_mesh};
use serde::Serialize;

use crate::export::{ExportReport, export_result};
use crate::{Cli, OutputFormat, SplitOptions, output};

#[derive(Serialize)]
pub struct SplitSummary {
    pub input: String,
    pub output: String,
    pub parts: usize,
    pub seams: usize,
    pub joints: usize,
    pub warnings: Vec<String>,
    pub files: Vec<String>,
}

impl SplitSummary {
    pub fn new(input: &Path, result: &SegmentationResult, report: &ExportReport) -> Self {
        Self {
            input: input.display().to_string(),
            output: report.directory.display().to_string(),
            parts: result.parts().len(),
            seams: result.seams().len(),
            joints: result.joints().len(),
            warnings: result.warnings().iter().map(|w| w.to_string()).collect(),
            files: report.files.clone(),
        }
    }
}

/// Configuration from an optional TOML file with command-line overrides.
pub fn build_config(options: &SplitOptions) -> Result<SegmentationConfig> {
    let mut config = match &options.config {
        Some(path) => SegmentationConfig::from_toml_file(path)
            .with_context(|| format!("Failed to read configuration from {:?}", path))?,
        None => SegmentationConfig::default(),
    };

    if let Some(volume) = &options.build_volume {
        let &[x, y, z] = volume.as_slice() else {
            bail!("--build-volume needs exactly three values (X,Y,Z), got {}", volume.len());
        };
        config = config.with_build_volume(x, y, z);
    }
    if let Some(wall) = options.hollow {
        config = config.with_hollowing(wall);
        if options.hollow_parts {
            config = config.with_strategy(HollowingStrategy::SegmentThenHollow);
        }
    }
    if let Some(resolution) = options.resolution {
        config = config.with_resolution(resolution);
    }
    if let Some(joints) = options.joints {
        config = config.with_joints(joints.into());
    }
    if options.pin_diameter.is_some() || options.pin_height.is_some() {
        let diameter = options.pin_diameter.unwrap_or(config.pin_diameter);
        let height = options.pin_height.unwrap_or(config.pin_height);
        config = config.with_pin(diameter, height);
    }
    if let Some(tolerance) = options.tolerance {
        config = config.with_tolerance(tolerance);
    }
    if let Some(count) = options.joints_per_seam {
        config.joints_per_seam = count;
    }
    if let Some(max_parts) = options.max_parts {
        config = config.with_max_parts(max_parts);
    }
    if let Some(units) = options.units {
        config = config.with_units(units.into());
    }

    config.validate()?;
    Ok(config)
}

/// Print warnings and a short report for one finished split.
pub fn print_summary(summary: &SplitSummary, result: &SegmentationResult, cli: &Cli) {
    for warning in &summary.warnings {
        output::warn(warning, cli.quiet);
    }

    match cli.format {
        OutputFormat::Json => {
            output::print(summary, cli.format, cli.quiet);
        }
        OutputFormat::Text => {
            if cli.quiet {
                return;
            }
            output::success(
                &format!("{} parts written to {}", summary.parts, summary.output),
                cli.format,
                cli.quiet,
            );
            println!(
                "  {}: {} seams, {} joints",
                "Seams".cyan(),
                summary.seams,
                summary.joints
            );
            if let Some(v) = result.summary().hollowed_volume {
                println!(
                    "  {}: {:.1} → {:.1} mm³",
                    "Hollowed".cyan(),
                    result.summary().original_volume,
                    v
                );
            }
            for part in result.parts() {
                let e = part.extents();
                println!(
                    "  {} {:>2}: {:.1} x {:.1} x {:.1} mm, {} seams",
                    "Part".cyan(),
                    part.id,
                    e[0],
                    e[1],
                    e[2],
                    part.seams.len()
                );
            }
        }
    }
}

pub fn run(input: &Path, output_dir: &Path, options: &SplitOptions, cli: &Cli) -> Result<()> {
    let config = build_config(options)?;
    if output_dir.exists() && !options.force {
        bail!("Output directory {:?} already exists (use --force to replace it)", output_dir);
    }

    let mesh = load_mesh(input).with_context(|| format!("Failed to load mesh from {:?}", input))?;
    output::info(
        &format!(
            "Splitting {} for a {} x {} x {} mm build volume...",
            input.display(),
            config.build_volume[0],
            config.build_volume[1],
            config.build_volume[2]
        ),
        cli.format,
        cli.quiet,
    );

    let result = segment_mesh(&mesh, &config)?;
    let report = export_result(
        &result,
        &input.display().to_string(),
        output_dir,
        options.part_format,
        options.force,
    )?;

    let summary = SplitSummary::new(input, &result, &report);
    print_summary(&summary, &result, cli);
    Ok(())
}
