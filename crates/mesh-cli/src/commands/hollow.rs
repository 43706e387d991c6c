//! mesh-split hollow command - hollow a mesh into a uniform-wall shell.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use mesh_core::{UnitPolicy, load_mesh, normalize_units, save_mesh, validate_solid};
use mesh_hollow::{HollowBuilder, HollowStats};
use serde::Serialize;

use crate::{Cli, OutputFormat, UnitsArg, output};

#[derive(Serialize)]
struct HollowSummary {
    input: String,
    output: String,
    wall_thickness: f64,
    input_faces: usize,
    stats: HollowStats,
}

pub fn run(
    input: &Path,
    output_path: &Path,
    wall: f64,
    resolution: usize,
    units: Option<UnitsArg>,
    cli: &Cli,
) -> Result<()> {
    let mut mesh =
        load_mesh(input).with_context(|| format!("Failed to load mesh from {:?}", input))?;

    let policy = match units {
        Some(u) => UnitPolicy::explicit(u.into()),
        None => UnitPolicy::default(),
    };
    normalize_units(&mut mesh, &policy)?;
    validate_solid(&mut mesh)?;
    let input_faces = mesh.face_count();

    output::info(
        &format!("Hollowing with {:.2}mm walls at resolution {}...", wall, resolution),
        cli.format,
        cli.quiet,
    );

    let result = HollowBuilder::new(&mesh)
        .wall_thickness(wall)
        .resolution(resolution)
        .build()?;

    if !result.stats.closed {
        output::warn("hollowed surface is not closed", cli.quiet);
    }

    save_mesh(&result.mesh, output_path)
        .with_context(|| format!("Failed to save shell to {:?}", output_path))?;

    let summary = HollowSummary {
        input: input.display().to_string(),
        output: output_path.display().to_string(),
        wall_thickness: wall,
        input_faces,
        stats: result.stats,
    };

    match cli.format {
        OutputFormat::Json => {
            output::print(&summary, cli.format, cli.quiet);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                output::success(
                    &format!("Shell saved to {}", output_path.display()),
                    cli.format,
                    cli.quiet,
                );
                let s = &summary.stats;
                println!(
                    "  {}: {:.3}mm requested, {:.3}mm produced ({} voxels)",
                    "Wall".cyan(),
                    wall,
                    s.effective_wall_thickness,
                    s.erosion_radius
                );
                println!(
                    "  {}: {}x{}x{} at {:.3}mm",
                    "Grid".cyan(),
                    s.grid_dims[0],
                    s.grid_dims[1],
                    s.grid_dims[2],
                    s.voxel_size
                );
                println!(
                    "  {}: {:.1} → {:.1} mm³",
                    "Volume".cyan(),
                    s.original_volume,
                    s.hollow_volume
                );
                println!(
                    "  {}: {} → {} faces",
                    "Faces".cyan(),
                    summary.input_faces,
                    s.output_faces
                );
            }
        }
    }

    Ok(())
}
