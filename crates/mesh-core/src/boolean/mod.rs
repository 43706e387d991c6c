//! Axis-aligned boolean operations.
//!
//! The kernel supports the two tool solids the decomposition pipeline needs:
//!
//! - **Half-spaces**: an oversized box covering one side of an axis-aligned
//!   plane. Subtracting it is an exact planar clip closed with a cap.
//! - **Cylinders**: an axis-aligned prism with a regular polygon section,
//!   standing on a planar face of the mesh. Subtracting it bores a blind
//!   hole into the face; uniting it grows a boss out of the face.
//!
//! Operands are never mutated. Any configuration the kernel cannot resolve
//! exactly (tool grazing other geometry, open input, degenerate result) is
//! reported as [`MeshError::BooleanFailed`], which callers may retry with a
//! perturbed tool or abandon.
//!
//! # Example
//!
//! ```
//! use mesh_core::boolean::Solid;
//! use mesh_core::{Axis, Side};
//!
//! let block = mesh_core::primitives::cuboid([0.0, 0.0, 0.0], [400.0, 100.0, 100.0]);
//! let left = block
//!     .difference(&Solid::half_space(Axis::X, 200.0, Side::Above))
//!     .unwrap();
//! assert!((left.volume() - 2_000_000.0).abs() < 1e-3);
//! ```

mod cap;
mod clip;
mod cylinder;

pub use clip::SNAP_TOLERANCE;

use tracing::debug;

use crate::bounds::{Axis, BoundingBox, Side};
use crate::error::{MeshError, MeshResult};
use crate::tracing_ext::OperationTimer;
use crate::types::Mesh;

/// Default number of sides used to approximate a cylinder.
pub const DEFAULT_CYLINDER_SEGMENTS: usize = 24;

/// Tool solid for a boolean operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Solid {
    /// Everything on `side` of the plane `axis = offset`.
    HalfSpace { axis: Axis, offset: f64, side: Side },

    /// An axis-aligned cylinder standing on the plane `axis = base`.
    ///
    /// The cylinder spans from `base` to `base + direction.sign() * length`
    /// and is centered at `center` in the plane coordinates given by
    /// [`Axis::plane_axes`].
    Cylinder {
        axis: Axis,
        base: f64,
        center: [f64; 2],
        radius: f64,
        length: f64,
        direction: Side,
        segments: usize,
    },
}

impl Solid {
    /// Half-space covering `side` of the plane.
    pub fn half_space(axis: Axis, offset: f64, side: Side) -> Self {
        Solid::HalfSpace { axis, offset, side }
    }

    /// Cylinder with the default segment count.
    pub fn cylinder(
        axis: Axis,
        base: f64,
        center: [f64; 2],
        radius: f64,
        length: f64,
        direction: Side,
    ) -> Self {
        Solid::Cylinder {
            axis,
            base,
            center,
            radius,
            length,
            direction,
            segments: DEFAULT_CYLINDER_SEGMENTS,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Solid::HalfSpace { .. } => "half-space",
            Solid::Cylinder { .. } => "cylinder",
        }
    }
}

impl Mesh {
    /// Subtract a tool solid, returning a new mesh.
    pub fn difference(&self, tool: &Solid) -> MeshResult<Mesh> {
        let _timer = OperationTimer::with_context(
            "boolean_difference",
            self.face_count(),
            self.vertex_count(),
        );
        debug!(tool = tool.describe(), "Boolean difference");
        match *tool {
            Solid::HalfSpace { axis, offset, side } => {
                clip::clip_half_space(self, axis, offset, side.opposite())
            }
            Solid::Cylinder {
                axis,
                base,
                center,
                radius,
                length,
                direction,
                segments,
            } => cylinder::apply(
                self,
                &cylinder::CylinderTool {
                    axis,
                    base,
                    center,
                    radius,
                    length,
                    direction,
                    segments,
                },
                cylinder::Mode::Bore,
            ),
        }
    }

    /// Unite with a tool solid, returning a new mesh.
    ///
    /// Only cylinders are supported: a half-space is unbounded.
    pub fn union(&self, tool: &Solid) -> MeshResult<Mesh> {
        let _timer =
            OperationTimer::with_context("boolean_union", self.face_count(), self.vertex_count());
        debug!(tool = tool.describe(), "Boolean union");
        match *tool {
            Solid::HalfSpace { .. } => Err(MeshError::boolean_failed(
                "union",
                "union with an unbounded half-space is not supported",
            )),
            Solid::Cylinder {
                axis,
                base,
                center,
                radius,
                length,
                direction,
                segments,
            } => cylinder::apply(
                self,
                &cylinder::CylinderTool {
                    axis,
                    base,
                    center,
                    radius,
                    length,
                    direction,
                    segments,
                },
                cylinder::Mode::Boss,
            ),
        }
    }

    /// Keep the part of the mesh on `keep` side of the plane.
    pub fn clip(&self, axis: Axis, offset: f64, keep: Side) -> MeshResult<Mesh> {
        clip::clip_half_space(self, axis, offset, keep)
    }

    /// Clip away everything outside a bounding box.
    ///
    /// Planes the mesh does not cross are skipped.
    pub fn clip_to_bounds(&self, bounds: &BoundingBox) -> MeshResult<Mesh> {
        let mut current = self.clone();
        for axis in Axis::ALL {
            let i = axis.index();
            let Some(bb) = current.bounds() else {
                return Err(MeshError::empty_mesh("nothing left to clip"));
            };
            if bb.min[i] < bounds.min[i] - SNAP_TOLERANCE {
                current = current.clip(axis, bounds.min[i], Side::Above)?;
            }
            if bb.max[i] > bounds.max[i] + SNAP_TOLERANCE {
                current = current.clip(axis, bounds.max[i], Side::Below)?;
            }
        }
        Ok(current)
    }
}
