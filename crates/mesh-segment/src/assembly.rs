//! Segmentation result assembly.
//!
//! The result is built once, after every cut and joint has committed, and
//! is immutable afterwards. Building it re-checks that every part fits the
//! build volume on its own: joint geometry could in principle grow a part
//! past the limit, and such a part must be reported, never shipped.

use std::fmt;

use nalgebra::Vector3;
use tracing::info;

use mesh_core::tracing_ext::OperationTimer;
use mesh_core::UnitNormalization;
use mesh_hollow::HollowStats;

use crate::engine::{FIT_TOLERANCE, PartBudget};
use crate::error::{SegmentError, SegmentResult};
use crate::joint::{Joint, JointRole, JointWarning};
use crate::part::{CutRecord, Part, Seam, SeamRef};

/// Summary counts for a run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(serde::Serialize))]
pub struct SegmentationSummary {
    /// Volume of the normalized input in mm³.
    pub original_volume: f64,
    /// Volume after hollowing, if hollowing ran.
    pub hollowed_volume: Option<f64>,
    /// Total volume of the finished parts, joints included.
    pub final_volume: f64,
    /// Number of parts.
    pub part_count: usize,
    /// Number of seams.
    pub seam_count: usize,
    /// Number of joints placed.
    pub joint_count: usize,
    /// Number of cuts made.
    pub cut_count: usize,
    /// Part budget the run was planned against.
    pub part_budget: usize,
    /// Whether the budget was a user-supplied hard limit.
    pub hard_budget: bool,
    /// Whether an automatic budget was overrun.
    pub budget_exceeded: bool,
}

impl fmt::Display for SegmentationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Parts: {} ({} cuts, {} seams, {} joints)",
            self.part_count, self.cut_count, self.seam_count, self.joint_count
        )?;
        writeln!(f, "Original volume: {:.1} mm³", self.original_volume)?;
        if let Some(v) = self.hollowed_volume {
            writeln!(f, "Hollowed volume: {:.1} mm³", v)?;
        }
        write!(f, "Final volume: {:.1} mm³", self.final_volume)
    }
}

/// Inputs gathered by the pipeline for assembly.
#[derive(Debug)]
pub(crate) struct AssemblyInput {
    pub parts: Vec<Part>,
    pub seams: Vec<Seam>,
    pub joints: Vec<Joint>,
    pub cuts: Vec<CutRecord>,
    pub warnings: Vec<JointWarning>,
    pub hollow_stats: Vec<HollowStats>,
    pub build_volume: [f64; 3],
    pub units: Option<UnitNormalization>,
    pub original_volume: f64,
    pub hollowed_volume: Option<f64>,
    pub budget: PartBudget,
    pub budget_exceeded: bool,
}

/// Parts, seams, joints and bookkeeping for one finished run.
#[derive(Debug, Clone)]
pub struct SegmentationResult {
    parts: Vec<Part>,
    seams: Vec<Seam>,
    joints: Vec<Joint>,
    cuts: Vec<CutRecord>,
    warnings: Vec<JointWarning>,
    hollow_stats: Vec<HollowStats>,
    summary: SegmentationSummary,
    build_volume: [f64; 3],
    units: Option<UnitNormalization>,
}

impl SegmentationResult {
    /// Finalize a run: attach seam descriptors, check fit, compute the summary.
    pub(crate) fn assemble(input: AssemblyInput) -> SegmentResult<Self> {
        let _timer = OperationTimer::new("assembly");
        let AssemblyInput {
            mut parts,
            seams,
            joints,
            cuts,
            warnings,
            hollow_stats,
            build_volume,
            units,
            original_volume,
            hollowed_volume,
            budget,
            budget_exceeded,
        } = input;

        for part in &mut parts {
            part.refresh_bounds();
            part.seams = seams
                .iter()
                .filter_map(|seam| {
                    let side = seam.side_of(part.id)?;
                    Some(SeamRef {
                        seam: seam.id,
                        axis: seam.axis,
                        coordinate: seam.coordinate,
                        neighbor: seam.part_on(side.opposite()),
                        side,
                    })
                })
                .collect();
        }

        check_fit(&parts, &build_volume)?;

        let summary = SegmentationSummary {
            original_volume,
            hollowed_volume,
            final_volume: parts.iter().map(Part::volume).sum(),
            part_count: parts.len(),
            seam_count: seams.len(),
            joint_count: joints.len(),
            cut_count: cuts.len(),
            part_budget: budget.limit(),
            hard_budget: matches!(budget, PartBudget::Hard(_)),
            budget_exceeded,
        };

        info!(
            parts = summary.part_count,
            seams = summary.seam_count,
            joints = summary.joint_count,
            warnings = warnings.len(),
            "Assembled segmentation result"
        );

        Ok(Self {
            parts,
            seams,
            joints,
            cuts,
            warnings,
            hollow_stats,
            summary,
            build_volume,
            units,
        })
    }

    /// Finished parts, in output order.
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Seams between parts.
    pub fn seams(&self) -> &[Seam] {
        &self.seams
    }

    /// Joints placed.
    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    /// Cuts in the order they were made.
    pub fn cuts(&self) -> &[CutRecord] {
        &self.cuts
    }

    /// Seams that received fewer joints than requested.
    pub fn warnings(&self) -> &[JointWarning] {
        &self.warnings
    }

    /// Hollowing statistics: one entry for the whole mesh, or one per part.
    pub fn hollow_stats(&self) -> &[HollowStats] {
        &self.hollow_stats
    }

    /// Summary counts.
    pub fn summary(&self) -> &SegmentationSummary {
        &self.summary
    }

    /// Build volume the parts were checked against.
    pub fn build_volume(&self) -> [f64; 3] {
        self.build_volume
    }

    /// How the input units were resolved.
    pub fn units(&self) -> Option<&UnitNormalization> {
        self.units.as_ref()
    }

    /// Joints touching a part, with the role each plays there.
    pub fn joints_for(&self, part: usize) -> impl Iterator<Item = (&Joint, JointRole)> + '_ {
        self.joints
            .iter()
            .filter_map(move |j| j.role_for(part).map(|role| (j, role)))
    }

    /// Re-run the fit check on the finished parts.
    ///
    /// Assembly already ran it, so on a result this always succeeds and
    /// changes nothing.
    pub fn revalidate(&self) -> SegmentResult<()> {
        check_fit(&self.parts, &self.build_volume)
    }

    /// Hand the parts over to an exporter.
    pub fn into_parts(self) -> Vec<Part> {
        self.parts
    }
}

/// Fail on the first part whose bounds exceed the build volume.
pub fn check_fit(parts: &[Part], build_volume: &[f64; 3]) -> SegmentResult<()> {
    let volume = Vector3::from(*build_volume);
    match parts
        .iter()
        .find(|p| !p.bounds.fits_within(&volume, FIT_TOLERANCE))
    {
        Some(part) => Err(SegmentError::PartExceedsBuildVolume {
            part: part.id,
            extents: part.extents(),
            build_volume: *build_volume,
        }),
        None => Ok(()),
    }
}
