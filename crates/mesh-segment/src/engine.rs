//! Greedy build-volume segmentation.
//!
//! The engine works through a worklist of leaf parts:
//!
//! 1. Pick the largest-by-volume leaf whose bounding box overshoots the
//!    build volume on some axis. If none does, stop.
//! 2. Cut along the axis with the largest overshoot ratio. Ties go to the
//!    axis cut least recently in that part's lineage.
//! 3. Try the midpoint of the part's extent, then the lower and upper
//!    quarter points. A candidate is rejected if either piece would be
//!    thinner than the minimum viable thickness.
//! 4. Clip the part against the half-spaces on either side of the plane.
//!    A kernel failure is retried once with the plane nudged along the axis.
//! 5. Retire the part, append both pieces, re-point the part's seams and
//!    record a new seam between the pieces.
//!
//! Each cut lands strictly inside the offending extent, so every child is
//! shorter than its parent on the cut axis and the loop terminates.

use tracing::{debug, info, warn};

use mesh_core::progress::{ProgressCallback, ProgressTracker};
use mesh_core::tracing_ext::OperationTimer;
use mesh_core::{Axis, Mesh, MeshError, Side, Solid};
use nalgebra::Vector3;

use crate::config::SegmentationConfig;
use crate::error::{SegmentError, SegmentResult};
use crate::part::{CutRecord, PartNode, Seam, SeamUpdate, inherit_seam};

/// Slack on the build-volume fit test.
pub const FIT_TOLERANCE: f64 = 1e-6;

/// Fractions of the extent tried as cut coordinates, in order.
const CUT_FRACTIONS: [f64; 3] = [0.5, 0.25, 0.75];

/// Cap on the number of parts the planner may reach.
pub(crate) const PART_BUDGET_CEILING: usize = 100_000;

/// How the part count is limited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartBudget {
    /// User-supplied limit; exceeding it fails the run.
    Hard(usize),
    /// Estimate from the volume ratio; exceeding it only warns.
    Soft(usize),
}

impl PartBudget {
    /// Budget for a mesh of `volume` mm³ under `config`.
    pub fn for_volume(volume: f64, config: &SegmentationConfig) -> Self {
        if config.max_parts > 0 {
            return PartBudget::Hard(config.max_parts);
        }
        let build = config.build_volume();
        let ratio = volume / (build.x * build.y * build.z);
        let estimate = (ratio * config.auto_budget_multiplier).ceil();
        let estimate = if estimate.is_finite() {
            (estimate as usize).clamp(1, PART_BUDGET_CEILING)
        } else {
            1
        };
        PartBudget::Soft(estimate)
    }

    /// The numeric limit.
    pub fn limit(&self) -> usize {
        match *self {
            PartBudget::Hard(n) | PartBudget::Soft(n) => n,
        }
    }
}

/// Output of the cut planner.
#[derive(Debug, Clone)]
pub struct EngineOutput {
    /// Leaf meshes as `(node, mesh)` in node order.
    pub leaves: Vec<(usize, Mesh)>,
    /// Seams between leaves, by node index.
    pub seams: Vec<Seam>,
    /// Cuts in the order they were made.
    pub cuts: Vec<CutRecord>,
    /// Budget the run was planned against.
    pub budget: PartBudget,
    /// Whether a soft budget was overrun.
    pub budget_exceeded: bool,
}

/// Splits a mesh into the halves below and above an axis plane.
type ClipFn = fn(&Mesh, Axis, f64) -> Result<(Mesh, Mesh), MeshError>;

/// Worklist-driven cut planner over an arena of part nodes.
pub struct SegmentationEngine<'a> {
    config: &'a SegmentationConfig,
    clip: ClipFn,
    build: Vector3<f64>,
    arena: Vec<PartNode>,
    seams: Vec<Seam>,
    cuts: Vec<CutRecord>,
    budget: PartBudget,
    budget_exceeded: bool,
}

impl<'a> SegmentationEngine<'a> {
    /// Start a run from a single input mesh.
    pub fn new(mesh: Mesh, config: &'a SegmentationConfig) -> SegmentResult<Self> {
        let root = PartNode::new(mesh, Vec::new()).ok_or_else(|| {
            SegmentError::InvalidMesh {
                details: "input mesh has no vertices".to_string(),
                source: None,
            }
        })?;
        let budget = PartBudget::for_volume(root.volume, config);
        debug!(?budget, volume = root.volume, "Planned part budget");

        Ok(Self {
            config,
            clip: clip_pair,
            build: config.build_volume(),
            arena: vec![root],
            seams: Vec::new(),
            cuts: Vec::new(),
            budget,
            budget_exceeded: false,
        })
    }

    /// Number of leaf parts.
    pub fn leaf_count(&self) -> usize {
        self.arena.iter().filter(|n| n.is_leaf()).count()
    }

    /// Cut until every leaf fits.
    pub fn run(mut self, progress: Option<&ProgressCallback>) -> SegmentResult<EngineOutput> {
        let _timer = OperationTimer::new("segment");
        let tracker = ProgressTracker::new(self.budget.limit().saturating_sub(1).max(1) as u64);

        while let Some(node) = self.next_oversized() {
            if !tracker.report(progress, format!("cut {}", self.cuts.len() + 1)) {
                return Err(SegmentError::Cancelled { stage: "segment" });
            }
            self.cut(node)?;
            tracker.increment();
            if tracker.current() > tracker.total() {
                tracker.set_total(tracker.current());
            }
        }

        let leaves: Vec<(usize, Mesh)> = self
            .arena
            .into_iter()
            .enumerate()
            .filter(|(_, n)| n.is_leaf())
            .map(|(i, n)| (i, n.mesh))
            .collect();

        info!(
            parts = leaves.len(),
            cuts = self.cuts.len(),
            seams = self.seams.len(),
            "Segmentation complete"
        );

        Ok(EngineOutput {
            leaves,
            seams: self.seams,
            cuts: self.cuts,
            budget: self.budget,
            budget_exceeded: self.budget_exceeded,
        })
    }

    /// Largest leaf that overshoots the build volume.
    fn next_oversized(&self) -> Option<usize> {
        self.arena
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_leaf() && !n.bounds.fits_within(&self.build, FIT_TOLERANCE))
            // Earliest node wins a volume tie.
            .fold(None, |best: Option<(usize, f64)>, (i, n)| match best {
                Some((_, v)) if v >= n.volume => best,
                _ => Some((i, n.volume)),
            })
            .map(|(i, _)| i)
    }

    /// Axis with the largest overshoot ratio, least recently cut on a tie.
    pub(crate) fn choose_axis(&self, node: &PartNode) -> Axis {
        let ratios = node.bounds.overshoot_ratios(&self.build);
        let max_ratio = ratios.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let tol = self.config.axis_tie_tolerance;

        Axis::ALL
            .into_iter()
            .filter(|a| ratios[a.index()] >= max_ratio - tol)
            // Never-cut axes rank as least recent; then lowest axis index.
            .min_by_key(|&a| match node.cuts_since(a) {
                None => (0, 0usize, a.index()),
                Some(n) => (1, usize::MAX - n, a.index()),
            })
            .unwrap_or(Axis::X)
    }

    /// Candidate coordinates that leave both pieces at least the minimum thickness.
    pub(crate) fn candidate_coordinates(&self, lo: f64, hi: f64) -> Vec<f64> {
        let min_t = self.config.min_viable_thickness;
        CUT_FRACTIONS
            .iter()
            .map(|f| lo + f * (hi - lo))
            .filter(|c| c - lo >= min_t && hi - c >= min_t)
            .collect()
    }

    fn cut(&mut self, node_idx: usize) -> SegmentResult<()> {
        let node = &self.arena[node_idx];
        let axis = self.choose_axis(node);
        let i = axis.index();
        let (lo, hi) = (node.bounds.min[i], node.bounds.max[i]);
        let extent = hi - lo;
        let _timer = OperationTimer::with_context(
            "cut",
            node.mesh.face_count(),
            node.mesh.vertex_count(),
        );

        self.check_budget(node_idx)?;

        debug!(
            node = node_idx,
            %axis,
            extent,
            ratio = extent / self.build[i],
            "Cutting part"
        );

        let min_t = self.config.min_viable_thickness;
        for planned in self.candidate_coordinates(lo, hi) {
            let split = self.split(node_idx, axis, planned)?;
            let thin = [&split.below, &split.above]
                .iter()
                .filter_map(|m| m.bounds())
                .any(|bb| bb.extent(axis) < min_t - FIT_TOLERANCE);
            if thin {
                debug!(
                    node = node_idx,
                    %axis,
                    coordinate = split.coordinate,
                    "Cut leaves a sliver; trying the next coordinate"
                );
                continue;
            }
            return self.commit(node_idx, axis, planned, split);
        }

        Err(SegmentError::NoValidCut {
            part: node_idx,
            axis,
            extent,
            min_thickness: min_t,
        })
    }

    fn check_budget(&mut self, node_idx: usize) -> SegmentResult<()> {
        let needed = self.leaf_count() + 1;
        match self.budget {
            PartBudget::Hard(max_parts) if needed > max_parts => {
                Err(SegmentError::PartBudgetExceeded {
                    part: node_idx,
                    needed,
                    max_parts,
                })
            }
            PartBudget::Soft(limit) if needed > limit && !self.budget_exceeded => {
                warn!(
                    parts = needed,
                    budget = limit,
                    "Part count exceeds the automatic budget; continuing"
                );
                self.budget_exceeded = true;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Clip a node on both sides of a plane, retrying once on kernel failure.
    fn split(&self, node_idx: usize, axis: Axis, planned: f64) -> SegmentResult<Split> {
        let mesh = &self.arena[node_idx].mesh;
        match (self.clip)(mesh, axis, planned) {
            Ok((below, above)) => Ok(Split {
                below,
                above,
                coordinate: planned,
                attempts: 1,
            }),
            Err(first) if first.is_retryable() => {
                let nudged = self.perturbed(node_idx, axis, planned);
                warn!(
                    node = node_idx,
                    %axis,
                    planned,
                    nudged,
                    error = %first,
                    "Cut failed; retrying with a perturbed plane"
                );
                (self.clip)(mesh, axis, nudged)
                    .map(|(below, above)| Split {
                        below,
                        above,
                        coordinate: nudged,
                        attempts: 2,
                    })
                    .map_err(|source| SegmentError::BooleanOperation {
                        part: node_idx,
                        axis,
                        coordinate: nudged,
                        operation: "cut".to_string(),
                        source,
                    })
            }
            Err(other) => Err(SegmentError::Mesh(other)),
        }
    }

    /// Coordinate nudged away from the planned one, toward the roomier side.
    fn perturbed(&self, node_idx: usize, axis: Axis, planned: f64) -> f64 {
        let bb = &self.arena[node_idx].bounds;
        let i = axis.index();
        let delta = self.config.cut_perturbation;
        if bb.max[i] - planned >= planned - bb.min[i] {
            planned + delta
        } else {
            planned - delta
        }
    }

    fn commit(&mut self, node_idx: usize, axis: Axis, planned: f64, split: Split) -> SegmentResult<()> {
        let Split {
            below,
            above,
            coordinate,
            attempts,
        } = split;

        let mut history = self.arena[node_idx].cut_history.clone();
        history.push(axis);

        let (Some(b), Some(a)) = (
            PartNode::new(below, history.clone()),
            PartNode::new(above, history),
        ) else {
            return Err(SegmentError::BooleanOperation {
                part: node_idx,
                axis,
                coordinate,
                operation: "cut".to_string(),
                source: MeshError::boolean_failed("cut", "cut produced an empty piece"),
            });
        };

        let below_idx = self.arena.len();
        let above_idx = below_idx + 1;
        self.arena.push(b);
        self.arena.push(a);
        self.arena[node_idx].children = Some([below_idx, above_idx]);

        self.inherit_seams(node_idx, [below_idx, above_idx]);

        self.seams.push(Seam {
            id: self.seams.len(),
            axis,
            coordinate,
            below: below_idx,
            above: above_idx,
        });

        debug!(
            node = node_idx,
            %axis,
            coordinate,
            below = below_idx,
            above = above_idx,
            "Committed cut"
        );

        self.cuts.push(CutRecord {
            node: node_idx,
            axis,
            coordinate,
            planned_coordinate: planned,
            attempts,
            perturbed: attempts > 1,
            children: [below_idx, above_idx],
        });
        Ok(())
    }

    fn inherit_seams(&mut self, node_idx: usize, children: [usize; 2]) {
        let affected: Vec<usize> = self
            .seams
            .iter()
            .filter(|s| s.involves(node_idx))
            .map(|s| s.id)
            .collect();

        let mut dropped = Vec::new();
        for seam_id in affected {
            let seam = self.seams[seam_id].clone();
            let Some(side) = seam.side_of(node_idx) else {
                continue;
            };
            match inherit_seam(&self.arena, &seam, node_idx, children) {
                SeamUpdate::Move(child) => {
                    set_side(&mut self.seams[seam_id], side, child);
                }
                SeamUpdate::Split(first, second) => {
                    set_side(&mut self.seams[seam_id], side, first);
                    let mut extra = seam.clone();
                    extra.id = self.seams.len();
                    set_side(&mut extra, side, second);
                    debug!(seam = seam_id, new_seam = extra.id, "Seam split by crossing cut");
                    self.seams.push(extra);
                }
                SeamUpdate::Drop => {
                    warn!(
                        seam = seam_id,
                        node = node_idx,
                        "No piece of the cut part still borders the seam neighbor; dropping seam"
                    );
                    dropped.push(seam_id);
                }
            }
        }

        if !dropped.is_empty() {
            self.seams.retain(|s| !dropped.contains(&s.id));
            for (id, seam) in self.seams.iter_mut().enumerate() {
                seam.id = id;
            }
        }
    }
}

/// Pieces produced by one planar cut.
struct Split {
    below: Mesh,
    above: Mesh,
    coordinate: f64,
    attempts: u32,
}

fn set_side(seam: &mut Seam, side: Side, node: usize) {
    match side {
        Side::Below => seam.below = node,
        Side::Above => seam.above = node,
    }
}

/// The two halves of a mesh on either side of `axis = coordinate`.
fn clip_pair(mesh: &Mesh, axis: Axis, coordinate: f64) -> Result<(Mesh, Mesh), MeshError> {
    let below = mesh.difference(&Solid::half_space(axis, coordinate, Side::Above))?;
    let above = mesh.difference(&Solid::half_space(axis, coordinate, Side::Below))?;
    Ok((below, above))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use mesh_core::primitives::{block, cuboid};

    fn config(x: f64, y: f64, z: f64) -> SegmentationConfig {
        SegmentationConfig::new(x, y, z).without_joints()
    }

    #[test]
    fn test_fitting_mesh_is_untouched() {
        let config = config(300.0, 320.0, 325.0);
        let out = SegmentationEngine::new(block(100.0, 100.0, 100.0), &config)
            .unwrap()
            .run(None)
            .unwrap();
        assert_eq!(out.leaves.len(), 1);
        assert!(out.seams.is_empty());
        assert!(out.cuts.is_empty());
    }

    #[test]
    fn test_long_block_split_at_midpoint() {
        let config = config(300.0, 320.0, 325.0);
        let out = SegmentationEngine::new(block(400.0, 100.0, 100.0), &config)
            .unwrap()
            .run(None)
            .unwrap();
        assert_eq!(out.leaves.len(), 2);
        assert_eq!(out.cuts.len(), 1);
        assert_eq!(out.cuts[0].axis, Axis::X);
        assert!((out.cuts[0].coordinate - 200.0).abs() < 1e-9);
        assert_eq!(out.seams.len(), 1);
        assert_eq!(out.seams[0].below, out.cuts[0].children[0]);
    }

    #[test]
    fn test_axis_tie_prefers_uncut_axis() {
        let config = config(100.0, 100.0, 100.0);
        let engine = SegmentationEngine::new(block(150.0, 150.0, 50.0), &config).unwrap();
        let mut node = engine.arena[0].clone();
        assert_eq!(engine.choose_axis(&node), Axis::X);

        node.cut_history = vec![Axis::X];
        assert_eq!(engine.choose_axis(&node), Axis::Y);

        node.cut_history = vec![Axis::Y, Axis::X];
        assert_eq!(engine.choose_axis(&node), Axis::Y);
    }

    #[test]
    fn test_largest_overshoot_ratio_wins() {
        let config = config(300.0, 100.0, 300.0);
        let engine = SegmentationEngine::new(block(400.0, 150.0, 50.0), &config).unwrap();
        // 400/300 < 150/100.
        assert_eq!(engine.choose_axis(&engine.arena[0]), Axis::Y);
    }

    #[test]
    fn test_candidates_respect_min_thickness() {
        let config = config(10.0, 10.0, 10.0).with_min_viable_thickness(5.0);
        let engine = SegmentationEngine::new(block(12.0, 5.0, 5.0), &config).unwrap();
        assert_eq!(engine.candidate_coordinates(0.0, 12.0), vec![6.0]);
        assert_eq!(engine.candidate_coordinates(0.0, 40.0), vec![20.0, 10.0, 30.0]);
        assert!(engine.candidate_coordinates(0.0, 9.0).is_empty());
    }

    #[test]
    fn test_no_valid_cut_for_thin_overshoot() {
        let config = config(6.0, 100.0, 100.0).with_min_viable_thickness(5.0);
        let err = SegmentationEngine::new(block(9.0, 50.0, 50.0), &config)
            .unwrap()
            .run(None)
            .unwrap_err();
        assert!(matches!(err, SegmentError::NoValidCut { part: 0, axis: Axis::X, .. }));
    }

    #[test]
    fn test_hard_budget_enforced() {
        let config = config(100.0, 100.0, 100.0).with_max_parts(3);
        let err = SegmentationEngine::new(block(400.0, 50.0, 50.0), &config)
            .unwrap()
            .run(None)
            .unwrap_err();
        match err {
            SegmentError::PartBudgetExceeded { needed, max_parts, .. } => {
                assert_eq!(max_parts, 3);
                assert_eq!(needed, 4);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_soft_budget_only_warns() {
        let mut config = config(100.0, 100.0, 100.0);
        config.auto_budget_multiplier = 1.0;
        // Thin rod: volume ratio says 1 part, geometry needs 4.
        let out = SegmentationEngine::new(block(400.0, 10.0, 10.0), &config)
            .unwrap()
            .run(None)
            .unwrap();
        assert_eq!(out.budget, PartBudget::Soft(1));
        assert!(out.budget_exceeded);
        assert_eq!(out.leaves.len(), 4);
    }

    #[test]
    fn test_crossing_cuts_split_seams() {
        // 2 x 2 grid in the XY plane.
        let config = config(100.0, 100.0, 200.0);
        let out = SegmentationEngine::new(cuboid([0.0; 3], [180.0, 180.0, 50.0]), &config)
            .unwrap()
            .run(None)
            .unwrap();
        assert_eq!(out.leaves.len(), 4);
        // First cut seam is split by the second-level cut, plus two new seams.
        assert_eq!(out.seams.len(), 4);
        let leaf_ids: Vec<usize> = out.leaves.iter().map(|(i, _)| *i).collect();
        for seam in &out.seams {
            assert!(leaf_ids.contains(&seam.below));
            assert!(leaf_ids.contains(&seam.above));
        }
    }

    fn fails_at_midpoint(mesh: &Mesh, axis: Axis, coordinate: f64) -> Result<(Mesh, Mesh), MeshError> {
        if coordinate == 200.0 {
            return Err(MeshError::boolean_failed("cut", "coincident cap vertices"));
        }
        clip_pair(mesh, axis, coordinate)
    }

    fn always_fails(_: &Mesh, _: Axis, _: f64) -> Result<(Mesh, Mesh), MeshError> {
        Err(MeshError::boolean_failed("cut", "degenerate cap"))
    }

    fn broken_topology(_: &Mesh, _: Axis, _: f64) -> Result<(Mesh, Mesh), MeshError> {
        Err(MeshError::invalid_topology("open edge"))
    }

    #[test]
    fn test_failed_cut_retries_once_nudged() {
        let config = config(300.0, 320.0, 325.0);
        let mut engine = SegmentationEngine::new(block(400.0, 100.0, 100.0), &config).unwrap();
        engine.clip = fails_at_midpoint;
        let out = engine.run(None).unwrap();

        assert_eq!(out.leaves.len(), 2);
        let cut = &out.cuts[0];
        assert_eq!(cut.attempts, 2);
        assert!(cut.perturbed);
        assert_eq!(cut.planned_coordinate, 200.0);
        assert!((cut.coordinate - (200.0 + config.cut_perturbation)).abs() < 1e-9);
    }

    #[test]
    fn test_second_cut_failure_aborts() {
        let config = config(300.0, 320.0, 325.0);
        let mut engine = SegmentationEngine::new(block(400.0, 100.0, 100.0), &config).unwrap();
        engine.clip = always_fails;
        let err = engine.run(None).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::BooleanOperation);
        match err {
            SegmentError::BooleanOperation { part, axis, coordinate, .. } => {
                assert_eq!(part, 0);
                assert_eq!(axis, Axis::X);
                assert!((coordinate - (200.0 + config.cut_perturbation)).abs() < 1e-9);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_non_boolean_failure_is_not_retried() {
        let config = config(300.0, 320.0, 325.0);
        let mut engine = SegmentationEngine::new(block(400.0, 100.0, 100.0), &config).unwrap();
        engine.clip = broken_topology;
        let err = engine.run(None).unwrap_err();
        assert!(matches!(err, SegmentError::Mesh(_)));
    }

    #[test]
    fn test_cancel_stops_run() {
        let config = config(100.0, 100.0, 100.0);
        let cancel: ProgressCallback = Box::new(|_| false);
        let err = SegmentationEngine::new(block(400.0, 50.0, 50.0), &config)
            .unwrap()
            .run(Some(&cancel))
            .unwrap_err();
        assert!(matches!(err, SegmentError::Cancelled { stage: "segment" }));
    }
}
