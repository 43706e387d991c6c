//! End-to-end segmentation runs.
//!
//! A run is strictly sequential: units and topology are checked, the mesh is
//! optionally hollowed, the engine cuts until every part fits, joints are
//! fused on every seam, and the result is assembled. Nothing is returned
//! until the last stage has committed, so a failed or cancelled run never
//! yields a partial result.
//!
//! Independent runs share no state and can go through [`segment_batch`],
//! which spreads them over the rayon pool.

use hashbrown::HashMap;
use rayon::prelude::*;
use tracing::{info, warn};

use mesh_core::progress::{ProgressCallback, ProgressTracker};
use mesh_core::tracing_ext::{OperationTimer, log_mesh_stats};
use mesh_core::{Mesh, MeshError, normalize_units, validate_solid};
use mesh_hollow::{HollowStats, HollowingConfig, hollow_with_progress, trim_to_bounds};

use crate::assembly::{AssemblyInput, SegmentationResult};
use crate::config::{HollowingStrategy, SegmentationConfig};
use crate::engine::SegmentationEngine;
use crate::error::{SegmentError, SegmentResult};
use crate::joint::place_joints;
use crate::part::{Part, Seam};

/// Stages reported to the progress callback.
const STAGES: [&str; 5] = ["prepare", "hollow", "segment", "joints", "assemble"];

/// Segment a mesh with the given configuration.
///
/// The input is not modified; the result owns new meshes.
///
/// # Example
///
/// ```
/// use mesh_core::primitives::block;
/// use mesh_segment::{SegmentationConfig, segment_mesh};
///
/// let mesh = block(400.0, 100.0, 100.0);
/// let config = SegmentationConfig::default().without_joints();
/// let result = segment_mesh(&mesh, &config).unwrap();
/// assert_eq!(result.parts().len(), 2);
/// ```
pub fn segment_mesh(mesh: &Mesh, config: &SegmentationConfig) -> SegmentResult<SegmentationResult> {
    segment_mesh_with(mesh, config, None, None)
}

/// Segment with a progress callback; returning `false` from it cancels.
pub fn segment_mesh_with_progress(
    mesh: &Mesh,
    config: &SegmentationConfig,
    progress: Option<&ProgressCallback>,
) -> SegmentResult<SegmentationResult> {
    segment_mesh_with(mesh, config, None, progress)
}

/// Segment with explicit hollowing parameters.
///
/// `hollowing` replaces the parameters derived from `config`; it has no
/// effect when `config.hollowing` is off.
pub fn segment_mesh_with(
    mesh: &Mesh,
    config: &SegmentationConfig,
    hollowing: Option<&HollowingConfig>,
    progress: Option<&ProgressCallback>,
) -> SegmentResult<SegmentationResult> {
    let _timer = OperationTimer::with_context("segment_mesh", mesh.face_count(), mesh.vertex_count());
    config.validate()?;
    let hollow_config = match hollowing {
        Some(h) => h.clone(),
        None => config.hollowing_config(),
    };
    if config.hollowing {
        hollow_config
            .validate()
            .map_err(|e| SegmentError::from_hollow(e, None))?;
    }

    let stages = ProgressTracker::new(STAGES.len() as u64);
    let checkpoint = |stage: usize| -> SegmentResult<()> {
        stages.set(stage as u64);
        if stages.report(progress, STAGES[stage]) {
            Ok(())
        } else {
            Err(SegmentError::Cancelled { stage: STAGES[stage] })
        }
    };

    checkpoint(0)?;
    let mut work = mesh.clone();
    let units = normalize_units(&mut work, &config.units).map_err(SegmentError::from_input)?;
    let report = validate_solid(&mut work).map_err(SegmentError::from_input)?;
    log_mesh_stats(&work, "segmentation input");
    let original_volume = work.volume();
    info!(
        units = %units.source_units,
        scale = units.scale,
        faces = report.face_count,
        volume = original_volume,
        "Prepared input"
    );

    checkpoint(1)?;
    let mut hollow_stats = Vec::new();
    let mut hollowed_volume = None;
    if config.hollowing && config.hollowing_strategy == HollowingStrategy::HollowThenSegment {
        let hollowed = hollow_with_progress(&work, &hollow_config, progress)
            .map_err(|e| SegmentError::from_hollow(e, None))?;
        if !hollowed.stats.closed {
            warn!("Hollowed shell is not closed; cuts may fail");
        }
        hollowed_volume = Some(hollowed.stats.hollow_volume);
        hollow_stats.push(hollowed.stats);
        work = hollowed.mesh;
    }

    checkpoint(2)?;
    let output = SegmentationEngine::new(work, config)?.run(progress)?;
    let (mut parts, seams) = renumber(output.leaves, output.seams)?;

    if config.hollowing && config.hollowing_strategy == HollowingStrategy::SegmentThenHollow {
        let (volume, stats) = hollow_parts(&mut parts, &hollow_config, progress)?;
        hollowed_volume = Some(volume);
        hollow_stats = stats;
    }

    checkpoint(3)?;
    let outcome = place_joints(&mut parts, &seams, config, progress)?;
    for warning in &outcome.warnings {
        warn!(seam = warning.seam, placed = warning.placed, requested = warning.requested, "{}", warning);
    }

    checkpoint(4)?;
    SegmentationResult::assemble(AssemblyInput {
        parts,
        seams,
        joints: outcome.joints,
        cuts: output.cuts,
        warnings: outcome.warnings,
        hollow_stats,
        build_volume: config.build_volume,
        units: Some(units),
        original_volume,
        hollowed_volume,
        budget: output.budget,
        budget_exceeded: output.budget_exceeded,
    })
}

/// Turn engine leaves into parts numbered in node order and rewrite seams
/// to part indices.
fn renumber(leaves: Vec<(usize, Mesh)>, seams: Vec<Seam>) -> SegmentResult<(Vec<Part>, Vec<Seam>)> {
    let mut index = HashMap::with_capacity(leaves.len());
    let mut parts = Vec::with_capacity(leaves.len());
    for (id, (node, mesh)) in leaves.into_iter().enumerate() {
        let part = Part::new(id, node, mesh).ok_or_else(|| {
            SegmentError::Mesh(MeshError::empty_mesh(format!("part from node {} has no vertices", node)))
        })?;
        index.insert(node, id);
        parts.push(part);
    }

    let seams = seams
        .into_iter()
        .filter_map(|seam| {
            let below = index.get(&seam.below).copied();
            let above = index.get(&seam.above).copied();
            match (below, above) {
                (Some(below), Some(above)) => Some(Seam { below, above, ..seam }),
                _ => {
                    warn!(seam = seam.id, "Seam does not join two finished parts; dropped");
                    None
                }
            }
        })
        .enumerate()
        .map(|(id, seam)| Seam { id, ..seam })
        .collect();

    Ok((parts, seams))
}

/// Hollow each part and clamp the shell back into the part's bounds.
fn hollow_parts(
    parts: &mut [Part],
    config: &HollowingConfig,
    progress: Option<&ProgressCallback>,
) -> SegmentResult<(f64, Vec<HollowStats>)> {
    let _timer = OperationTimer::new("hollow_parts");
    let mut stats = Vec::with_capacity(parts.len());
    let mut total = 0.0;

    for part in parts.iter_mut() {
        let hollowed = hollow_with_progress(&part.mesh, config, progress)
            .map_err(|e| SegmentError::from_hollow(e, Some(part.id)))?;
        let mut shell = hollowed.mesh;
        trim_to_bounds(&mut shell, &part.bounds);
        if !hollowed.stats.closed {
            warn!(part = part.id, "Hollowed part is not closed");
        }
        total += shell.volume();
        part.mesh = shell;
        part.refresh_bounds();
        stats.push(hollowed.stats);
    }

    info!(parts = parts.len(), volume = total, "Hollowed parts");
    Ok((total, stats))
}

/// One independent job for [`segment_batch`].
#[derive(Debug, Clone)]
pub struct BatchJob {
    /// Label used in logs and outcomes.
    pub name: String,
    /// Input mesh.
    pub mesh: Mesh,
    /// Configuration for this job.
    pub config: SegmentationConfig,
}

impl BatchJob {
    pub fn new(name: impl Into<String>, mesh: Mesh, config: SegmentationConfig) -> Self {
        Self {
            name: name.into(),
            mesh,
            config,
        }
    }
}

/// Outcome of one batch job.
#[derive(Debug)]
pub struct BatchOutcome {
    pub name: String,
    pub result: SegmentResult<SegmentationResult>,
}

/// Run independent jobs in parallel.
///
/// Outcomes come back in job order. A failed job does not affect the others.
pub fn segment_batch(jobs: &[BatchJob]) -> Vec<BatchOutcome> {
    let _timer = OperationTimer::new("segment_batch");
    let outcomes: Vec<BatchOutcome> = jobs
        .par_iter()
        .map(|job| {
            let result = segment_mesh(&job.mesh, &job.config);
            if let Err(e) = &result {
                warn!(job = %job.name, code = e.code().as_str(), "Job failed: {}", e);
            }
            BatchOutcome {
                name: job.name.clone(),
                result,
            }
        })
        .collect();

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    info!(jobs = jobs.len(), failed, "Batch complete");
    outcomes
}
