//! mesh-split info command - display mesh size, units and solidity.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use mesh_core::{UnitPolicy, detect_units, inspect_solid, load_mesh};
use serde::Serialize;

use crate::{Cli, OutputFormat, UnitsArg, output};

#[derive(Serialize)]
struct MeshInfo {
    path: String,
    vertices: usize,
    faces: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    bounds: Option<BoundsInfo>,
    volume: f64,
    surface_area: f64,
    closed_solid: bool,
    boundary_edges: usize,
    non_manifold_edges: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    units: Option<UnitsInfo>,
}

#[derive(Serialize)]
struct BoundsInfo {
    min: [f64; 3],
    max: [f64; 3],
    dimensions: [f64; 3],
}

#[derive(Serialize)]
struct UnitsInfo {
    source: String,
    detected: bool,
    scale: f64,
    dimensions_mm: [f64; 3],
}

pub fn run(input: &Path, units: Option<UnitsArg>, cli: &Cli) -> Result<()> {
    let mesh = load_mesh(input).with_context(|| format!("Failed to load mesh from {:?}", input))?;
    let report = inspect_solid(&mesh);

    let bounds = mesh.bounds().map(|b| {
        let dims = b.extents();
        BoundsInfo {
            min: [b.min.x, b.min.y, b.min.z],
            max: [b.max.x, b.max.y, b.max.z],
            dimensions: [dims.x, dims.y, dims.z],
        }
    });

    let policy = match units {
        Some(u) => UnitPolicy::explicit(u.into()),
        None => UnitPolicy::default(),
    };
    // Implausible sizes are reported, not fatal, here.
    let units = match (detect_units(&mesh, &policy), &bounds) {
        (Ok(n), Some(b)) => Some(UnitsInfo {
            source: n.source_units.to_string(),
            detected: n.detected,
            scale: n.scale,
            dimensions_mm: b.dimensions.map(|d| d * n.scale),
        }),
        (Err(e), _) => {
            output::warn(&e.to_string(), cli.quiet);
            None
        }
        _ => None,
    };

    let info = MeshInfo {
        path: input.display().to_string(),
        vertices: mesh.vertex_count(),
        faces: mesh.face_count(),
        bounds,
        volume: report.signed_volume,
        surface_area: report.surface_area,
        closed_solid: report.is_closed_solid(),
        boundary_edges: report.boundary_edge_count,
        non_manifold_edges: report.non_manifold_edge_count,
        units,
    };

    match cli.format {
        OutputFormat::Json => {
            output::print(&info, cli.format, cli.quiet);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                println!("{}", "Mesh Information".bold().underline());
                println!("  {}: {}", "File".cyan(), input.display());
                println!("  {}: {}", "Vertices".cyan(), info.vertices);
                println!("  {}: {}", "Faces".cyan(), info.faces);

                if let Some(ref b) = info.bounds {
                    println!(
                        "  {}: {:.3} x {:.3} x {:.3}",
                        "Dimensions".cyan(),
                        b.dimensions[0],
                        b.dimensions[1],
                        b.dimensions[2]
                    );
                }
                if let Some(ref u) = info.units {
                    println!(
                        "  {}: {}{} → {:.1} x {:.1} x {:.1} mm",
                        "Units".cyan(),
                        u.source,
                        if u.detected { " (detected)" } else { "" },
                        u.dimensions_mm[0],
                        u.dimensions_mm[1],
                        u.dimensions_mm[2]
                    );
                }
                println!("  {}: {:.3}", "Volume".cyan(), info.volume);
                println!("  {}: {:.3}", "Surface area".cyan(), info.surface_area);

                let solid = if info.closed_solid {
                    "yes".green()
                } else {
                    "no".red()
                };
                println!("  {}: {}", "Closed solid".cyan(), solid);
                if !info.closed_solid {
                    println!(
                        "    {} boundary edges, {} non-manifold edges",
                        info.boundary_edges, info.non_manifold_edges
                    );
                }
            }
        }
    }

    Ok(())
}
