//! Connector geometry at seams.
//!
//! For every seam the joint factory reads the flat sections of both parts
//! on the seam plane, finds where they overlap, and places up to
//! [`SegmentationConfig::joints_per_seam`] connectors there:
//!
//! - [`JointStrategy::Integrated`]: a pin grows out of one part and a hole
//!   `tolerance` wider and deeper is bored into the other. The pin goes to
//!   the part that extends farther from the plane at that point.
//! - [`JointStrategy::Dowel`]: both parts get a hole for a separate dowel,
//!   each half the dowel length deep plus the tolerance.
//!
//! Sections are read for every seam before any geometry is fused, so each
//! seam sees the joint-free contours of its parts. A seam that ends up with
//! fewer joints than requested yields a [`JointWarning`]; it never aborts
//! the run.

pub mod overlap;

use std::fmt;

use nalgebra::Point3;
use tracing::{debug, info, warn};

use mesh_core::progress::{ProgressCallback, ProgressTracker};
use mesh_core::tracing_ext::OperationTimer;
use mesh_core::{Axis, Mesh, MeshError, PlanarSection, Side, Solid};

use crate::config::{JointType, SegmentationConfig};
use crate::error::{SegmentError, SegmentResult};
use crate::part::{Part, Seam};

use overlap::{OverlapShortfall, candidates, select};

/// Hits closer than this to the seam plane are the cap itself.
const RAY_EPSILON: f64 = 1e-6;

/// Material left beyond the bottom of a hole, in mm.
const HOLE_FLOOR: f64 = 0.5;

/// Joint spacing in hole diameters.
const SPACING_DIAMETERS: f64 = 2.0;

/// Pin joint dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinSpec {
    pub pin_diameter: f64,
    pub pin_height: f64,
    pub tolerance: f64,
}

impl PinSpec {
    pub fn hole_diameter(&self) -> f64 {
        self.pin_diameter + self.tolerance
    }

    pub fn hole_depth(&self) -> f64 {
        self.pin_height + self.tolerance
    }
}

/// Dowel joint dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DowelSpec {
    pub dowel_diameter: f64,
    pub dowel_length: f64,
    pub tolerance: f64,
}

impl DowelSpec {
    pub fn hole_diameter(&self) -> f64 {
        self.dowel_diameter + self.tolerance
    }

    /// Each side holds half the dowel.
    pub fn hole_depth(&self) -> f64 {
        self.dowel_length / 2.0 + self.tolerance
    }
}

/// Joint variant with its parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JointStrategy {
    Integrated(PinSpec),
    Dowel(DowelSpec),
}

impl JointStrategy {
    /// Strategy for a config, or `None` when joints are disabled.
    pub fn from_config(config: &SegmentationConfig) -> Option<Self> {
        match config.joint_type {
            JointType::None => None,
            JointType::Integrated => Some(JointStrategy::Integrated(PinSpec {
                pin_diameter: config.pin_diameter,
                pin_height: config.pin_height,
                tolerance: config.joint_tolerance,
            })),
            JointType::Dowel => Some(JointStrategy::Dowel(DowelSpec {
                dowel_diameter: config.pin_diameter,
                dowel_length: config.pin_height,
                tolerance: config.joint_tolerance,
            })),
        }
    }

    pub fn hole_diameter(&self) -> f64 {
        match self {
            JointStrategy::Integrated(p) => p.hole_diameter(),
            JointStrategy::Dowel(d) => d.hole_diameter(),
        }
    }

    pub fn joint_type(&self) -> JointType {
        match self {
            JointStrategy::Integrated(_) => JointType::Integrated,
            JointStrategy::Dowel(_) => JointType::Dowel,
        }
    }
}

/// Geometry a joint adds to one part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "config", derive(serde::Serialize))]
#[cfg_attr(feature = "config", serde(rename_all = "snake_case"))]
pub enum JointRole {
    /// Protruding pin.
    Pin,
    /// Hole receiving a pin.
    Hole,
    /// Hole receiving a separate dowel.
    DowelHole,
}

impl fmt::Display for JointRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JointRole::Pin => f.write_str("pin"),
            JointRole::Hole => f.write_str("hole"),
            JointRole::DowelHole => f.write_str("dowel hole"),
        }
    }
}

/// Joint-specific geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "config", derive(serde::Serialize))]
#[cfg_attr(feature = "config", serde(tag = "type", rename_all = "snake_case"))]
pub enum JointKind {
    Integrated {
        pin_part: usize,
        hole_part: usize,
        pin_diameter: f64,
        pin_height: f64,
        hole_diameter: f64,
        hole_depth: f64,
    },
    Dowel {
        parts: [usize; 2],
        dowel_diameter: f64,
        dowel_length: f64,
        hole_diameter: f64,
        hole_depth: f64,
    },
}

/// A connector fused into the parts of one seam.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(serde::Serialize))]
pub struct Joint {
    /// Joint index within the result.
    pub id: usize,
    /// Seam the joint sits on.
    pub seam: usize,
    /// Seam plane axis.
    pub axis: Axis,
    /// Center of the joint on the seam plane.
    pub position: [f64; 3],
    /// Variant and dimensions.
    pub kind: JointKind,
}

impl Joint {
    /// What this joint adds to `part`, if it touches it.
    pub fn role_for(&self, part: usize) -> Option<JointRole> {
        match self.kind {
            JointKind::Integrated {
                pin_part,
                hole_part,
                ..
            } => {
                if part == pin_part {
                    Some(JointRole::Pin)
                } else if part == hole_part {
                    Some(JointRole::Hole)
                } else {
                    None
                }
            }
            JointKind::Dowel { parts, .. } => parts.contains(&part).then_some(JointRole::DowelHole),
        }
    }

    /// Hole diameter.
    pub fn hole_diameter(&self) -> f64 {
        match self.kind {
            JointKind::Integrated { hole_diameter, .. } | JointKind::Dowel { hole_diameter, .. } => {
                hole_diameter
            }
        }
    }

    /// Center as a point.
    pub fn center(&self) -> Point3<f64> {
        Point3::from(self.position)
    }
}

/// Why a seam got fewer joints than requested.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(serde::Serialize))]
#[cfg_attr(feature = "config", serde(tag = "reason", rename_all = "snake_case"))]
pub enum JointWarningReason {
    /// The two sections do not overlap.
    EmptyOverlap,
    /// The overlap leaves no room for the footprint and edge margin.
    NarrowOverlap { clearance: f64 },
    /// Not enough well-spaced positions.
    Crowded { spacing: f64 },
    /// Too little material behind the seam for a hole.
    InsufficientDepth { part: usize, depth: f64, required: f64 },
    /// A pin would push its part past the build volume.
    ExceedsBuildVolume { part: usize },
    /// The boolean kernel refused the pin or hole.
    FusionFailed { details: String },
}

impl fmt::Display for JointWarningReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JointWarningReason::EmptyOverlap => write!(f, "seam sections do not overlap"),
            JointWarningReason::NarrowOverlap { clearance } => write!(
                f,
                "overlap has no point {:.2}mm clear of both outlines",
                clearance
            ),
            JointWarningReason::Crowded { spacing } => {
                write!(f, "no further position at least {:.2}mm from placed joints", spacing)
            }
            JointWarningReason::InsufficientDepth {
                part,
                depth,
                required,
            } => write!(
                f,
                "part {} is only {:.2}mm deep behind the seam, {:.2}mm needed",
                part, depth, required
            ),
            JointWarningReason::ExceedsBuildVolume { part } => {
                write!(f, "a pin would push part {} past the build volume", part)
            }
            JointWarningReason::FusionFailed { details } => {
                write!(f, "joint geometry could not be fused: {}", details)
            }
        }
    }
}

/// A seam with fewer joints than requested.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(serde::Serialize))]
pub struct JointWarning {
    /// Seam index.
    pub seam: usize,
    /// Last reason a joint was lost.
    pub reason: JointWarningReason,
    /// Joints requested.
    pub requested: usize,
    /// Joints placed.
    pub placed: usize,
}

impl JointWarning {
    /// Whether the seam got no joint at all.
    pub fn is_unjoined(&self) -> bool {
        self.placed == 0
    }
}

impl fmt::Display for JointWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "seam {}: placed {} of {} joints ({})",
            self.seam, self.placed, self.requested, self.reason
        )
    }
}

/// Joints and warnings from one placement pass.
#[derive(Debug, Clone, Default)]
pub struct JointOutcome {
    pub joints: Vec<Joint>,
    pub warnings: Vec<JointWarning>,
}

/// Sections and candidate positions for one seam, read before any fusion.
struct SeamPlan {
    seam: usize,
    positions: Vec<[f64; 2]>,
    shortfall: Option<JointWarningReason>,
}

/// Place joints on every seam, fusing them into `parts`.
///
/// `seams` refer to indices in `parts`.
pub fn place_joints(
    parts: &mut [Part],
    seams: &[Seam],
    config: &SegmentationConfig,
    progress: Option<&ProgressCallback>,
) -> SegmentResult<JointOutcome> {
    let Some(strategy) = JointStrategy::from_config(config) else {
        return Ok(JointOutcome::default());
    };
    let _timer = OperationTimer::new("joints");
    let requested = config.joints_per_seam;
    if requested == 0 || seams.is_empty() {
        return Ok(JointOutcome::default());
    }

    let hole_radius = strategy.hole_diameter() / 2.0;
    let clearance = hole_radius + config.joint_edge_margin;
    let spacing = SPACING_DIAMETERS * strategy.hole_diameter();

    let plans: Vec<SeamPlan> = seams
        .iter()
        .map(|seam| {
            let below = PlanarSection::extract(
                &parts[seam.below].mesh,
                seam.axis,
                seam.coordinate,
                Side::Above,
            );
            let above = PlanarSection::extract(
                &parts[seam.above].mesh,
                seam.axis,
                seam.coordinate,
                Side::Below,
            );
            match candidates(&below, &above, clearance, hole_radius / 2.0) {
                Ok(found) => {
                    let positions = select(&found, requested, spacing);
                    let shortfall = (positions.len() < requested)
                        .then_some(JointWarningReason::Crowded { spacing });
                    SeamPlan {
                        seam: seam.id,
                        positions,
                        shortfall,
                    }
                }
                Err(shortfall) => SeamPlan {
                    seam: seam.id,
                    positions: Vec::new(),
                    shortfall: Some(match shortfall {
                        OverlapShortfall::Empty => JointWarningReason::EmptyOverlap,
                        OverlapShortfall::Narrow => JointWarningReason::NarrowOverlap { clearance },
                    }),
                },
            }
        })
        .collect();

    let tracker = ProgressTracker::new(plans.len() as u64);
    let mut outcome = JointOutcome::default();

    for plan in plans {
        if !tracker.report(progress, format!("joints on seam {}", plan.seam)) {
            return Err(SegmentError::Cancelled { stage: "joints" });
        }
        let seam = &seams[plan.seam];
        let mut placed = 0;
        let mut last_reason = plan.shortfall;

        for uv in plan.positions {
            let attempt = match strategy {
                JointStrategy::Integrated(spec) => fuse_pin(parts, seam, uv, &spec, config),
                JointStrategy::Dowel(spec) => fuse_dowel(parts, seam, uv, &spec, config),
            };
            match attempt {
                Ok(kind) => {
                    let p = seam.axis.lift(uv, seam.coordinate);
                    let joint = Joint {
                        id: outcome.joints.len(),
                        seam: seam.id,
                        axis: seam.axis,
                        position: [p.x, p.y, p.z],
                        kind,
                    };
                    debug!(
                        joint = joint.id,
                        seam = seam.id,
                        position = ?joint.position,
                        "Placed joint"
                    );
                    outcome.joints.push(joint);
                    placed += 1;
                }
                Err(reason) => {
                    debug!(seam = seam.id, %reason, "Skipped joint");
                    last_reason = Some(reason);
                }
            }
        }

        if placed < requested {
            let warning = JointWarning {
                seam: seam.id,
                reason: last_reason.unwrap_or(JointWarningReason::Crowded { spacing }),
                requested,
                placed,
            };
            warn!(
                seam = seam.id,
                placed,
                requested,
                reason = %warning.reason,
                "Seam has fewer joints than requested"
            );
            outcome.warnings.push(warning);
        }
        tracker.increment();
    }

    info!(
        joints = outcome.joints.len(),
        warnings = outcome.warnings.len(),
        strategy = %strategy.joint_type(),
        "Joint placement complete"
    );
    Ok(outcome)
}

/// Material depth behind the seam plane inside `part`, at plane point `uv`.
fn depth_behind(mesh: &Mesh, seam: &Seam, uv: [f64; 2], side: Side) -> f64 {
    let origin = seam.axis.lift(uv, seam.coordinate);
    mesh.depth_along(&origin, seam.axis, side, RAY_EPSILON)
        .unwrap_or(0.0)
}

fn fusion_failed(err: MeshError) -> JointWarningReason {
    JointWarningReason::FusionFailed {
        details: err.to_string(),
    }
}

fn cylinder(
    seam: &Seam,
    uv: [f64; 2],
    diameter: f64,
    length: f64,
    direction: Side,
    config: &SegmentationConfig,
) -> Solid {
    Solid::Cylinder {
        axis: seam.axis,
        base: seam.coordinate,
        center: uv,
        radius: diameter / 2.0,
        length,
        direction,
        segments: config.cylinder_segments,
    }
}

/// Grow a pin on one part and bore the matching hole into the other.
///
/// Both meshes are replaced only if both operations succeed.
fn fuse_pin(
    parts: &mut [Part],
    seam: &Seam,
    uv: [f64; 2],
    spec: &PinSpec,
    config: &SegmentationConfig,
) -> Result<JointKind, JointWarningReason> {
    let depth_below = depth_behind(&parts[seam.below].mesh, seam, uv, Side::Below);
    let depth_above = depth_behind(&parts[seam.above].mesh, seam, uv, Side::Above);
    let hole_depth = spec.hole_depth();
    let required = hole_depth + HOLE_FLOOR;
    let build = config.build_volume();
    let i = seam.axis.index();

    // Preferred pin side first: the part reaching farther from the plane.
    let order = if depth_below >= depth_above {
        [Side::Below, Side::Above]
    } else {
        [Side::Above, Side::Below]
    };

    let mut reason = None;
    for pin_side in order {
        let hole_side = pin_side.opposite();
        let pin_part = seam.part_on(pin_side);
        let hole_part = seam.part_on(hole_side);
        let hole_room = match hole_side {
            Side::Below => depth_below,
            Side::Above => depth_above,
        };
        if hole_room < required {
            reason.get_or_insert(JointWarningReason::InsufficientDepth {
                part: hole_part,
                depth: hole_room,
                required,
            });
            continue;
        }
        let grown = grown_extent(&parts[pin_part], seam, pin_side, spec.pin_height);
        if grown > build[i] + crate::engine::FIT_TOLERANCE {
            reason.get_or_insert(JointWarningReason::ExceedsBuildVolume { part: pin_part });
            continue;
        }

        // The pin points into the hole part; the hole runs the same way.
        let direction = hole_side;
        let pin = cylinder(seam, uv, spec.pin_diameter, spec.pin_height, direction, config);
        let hole = cylinder(seam, uv, spec.hole_diameter(), hole_depth, direction, config);

        let bored = parts[hole_part].mesh.difference(&hole).map_err(fusion_failed)?;
        let grown_mesh = parts[pin_part].mesh.union(&pin).map_err(fusion_failed)?;
        parts[hole_part].mesh = bored;
        parts[pin_part].mesh = grown_mesh;
        parts[hole_part].refresh_bounds();
        parts[pin_part].refresh_bounds();

        return Ok(JointKind::Integrated {
            pin_part,
            hole_part,
            pin_diameter: spec.pin_diameter,
            pin_height: spec.pin_height,
            hole_diameter: spec.hole_diameter(),
            hole_depth,
        });
    }

    Err(reason.unwrap_or(JointWarningReason::FusionFailed {
        details: "no side can carry the pin".to_string(),
    }))
}

/// Bore matching dowel holes into both parts.
fn fuse_dowel(
    parts: &mut [Part],
    seam: &Seam,
    uv: [f64; 2],
    spec: &DowelSpec,
    config: &SegmentationConfig,
) -> Result<JointKind, JointWarningReason> {
    let hole_depth = spec.hole_depth();
    let required = hole_depth + HOLE_FLOOR;

    for side in [Side::Below, Side::Above] {
        let part = seam.part_on(side);
        let depth = depth_behind(&parts[part].mesh, seam, uv, side);
        if depth < required {
            return Err(JointWarningReason::InsufficientDepth {
                part,
                depth,
                required,
            });
        }
    }

    let bore = |side: Side| {
        cylinder(seam, uv, spec.hole_diameter(), hole_depth, side, config)
    };
    let below = parts[seam.below]
        .mesh
        .difference(&bore(Side::Below))
        .map_err(fusion_failed)?;
    let above = parts[seam.above]
        .mesh
        .difference(&bore(Side::Above))
        .map_err(fusion_failed)?;
    parts[seam.below].mesh = below;
    parts[seam.above].mesh = above;
    parts[seam.below].refresh_bounds();
    parts[seam.above].refresh_bounds();

    Ok(JointKind::Dowel {
        parts: [seam.below, seam.above],
        dowel_diameter: spec.dowel_diameter,
        dowel_length: spec.dowel_length,
        hole_diameter: spec.hole_diameter(),
        hole_depth,
    })
}

/// Extent of a part along the seam axis once a pin of `height` is added.
fn grown_extent(part: &Part, seam: &Seam, pin_side: Side, height: f64) -> f64 {
    let i = seam.axis.index();
    let (lo, hi) = (part.bounds.min[i], part.bounds.max[i]);
    match pin_side {
        // A pin on the low part sticks up past the plane.
        Side::Below => hi.max(seam.coordinate + height) - lo,
        Side::Above => hi - lo.min(seam.coordinate - height),
    }
}
