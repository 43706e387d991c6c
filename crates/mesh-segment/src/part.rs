//! Parts, seams and the cut tree.
//!
//! The engine keeps every mesh it has ever produced in an arena of
//! [`PartNode`]s addressed by index. A cut retires its node and appends two
//! children, so indices stay stable for the whole run. Seams store node
//! index pairs instead of references; when a node is cut, each of its seams
//! is re-pointed at the child that still borders the seam plane.
//!
//! Finished parts are the leaves of the tree. They are renumbered densely
//! when the result is assembled.

use mesh_core::{Axis, BoundingBox, Mesh, PlanarSection, Side, rect_intersection};

/// Slack when deciding whether a part reaches a seam plane.
pub(crate) const PLANE_SLACK: f64 = 1e-6;

/// One mesh in the cut tree.
#[derive(Debug, Clone)]
pub(crate) struct PartNode {
    pub mesh: Mesh,
    pub bounds: BoundingBox,
    pub volume: f64,
    pub children: Option<[usize; 2]>,
    /// Axes cut along this lineage, oldest first.
    pub cut_history: Vec<Axis>,
}

impl PartNode {
    pub fn new(mesh: Mesh, cut_history: Vec<Axis>) -> Option<Self> {
        let bounds = mesh.bounds()?;
        let volume = mesh.volume();
        Some(Self {
            mesh,
            bounds,
            volume,
            children: None,
            cut_history,
        })
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// How many cuts ago `axis` was last cut in this lineage.
    ///
    /// `None` when it was never cut, which ranks as least recent.
    pub fn cuts_since(&self, axis: Axis) -> Option<usize> {
        self.cut_history
            .iter()
            .rev()
            .position(|&a| a == axis)
    }

    /// Flat faces of this part on a seam plane, facing its neighbor.
    pub fn section(&self, axis: Axis, coordinate: f64, facing: Side) -> PlanarSection {
        PlanarSection::extract(&self.mesh, axis, coordinate, facing)
    }
}

/// Planar interface between two parts produced by one cut.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(serde::Serialize))]
pub struct Seam {
    /// Seam index.
    pub id: usize,

    /// Normal axis of the seam plane.
    pub axis: Axis,

    /// Plane offset along `axis` in mm.
    pub coordinate: f64,

    /// Part on the low side of the plane.
    pub below: usize,

    /// Part on the high side of the plane.
    pub above: usize,
}

impl Seam {
    /// Part on the given side of the plane.
    pub fn part_on(&self, side: Side) -> usize {
        match side {
            Side::Below => self.below,
            Side::Above => self.above,
        }
    }

    /// Side of the plane `part` lies on, if it borders this seam.
    pub fn side_of(&self, part: usize) -> Option<Side> {
        if part == self.below {
            Some(Side::Below)
        } else if part == self.above {
            Some(Side::Above)
        } else {
            None
        }
    }

    /// The other part across the seam.
    pub fn neighbor_of(&self, part: usize) -> Option<usize> {
        self.side_of(part)
            .map(|side| self.part_on(side.opposite()))
    }

    /// Whether the seam connects `part` to anything.
    pub fn involves(&self, part: usize) -> bool {
        self.side_of(part).is_some()
    }
}

/// A seam as seen from one of its parts.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "config", derive(serde::Serialize))]
pub struct SeamRef {
    /// Seam index.
    pub seam: usize,

    /// Cut plane axis.
    pub axis: Axis,

    /// Cut coordinate in mm.
    pub coordinate: f64,

    /// Part on the other side.
    pub neighbor: usize,

    /// Side of the plane this part lies on.
    pub side: Side,
}

/// One committed cut, in the order cuts were made.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(serde::Serialize))]
pub struct CutRecord {
    /// Node in the cut tree that was split (0 is the input mesh).
    pub node: usize,

    /// Cut axis.
    pub axis: Axis,

    /// Coordinate actually used, after any perturbation.
    pub coordinate: f64,

    /// Coordinate chosen before any perturbation.
    pub planned_coordinate: f64,

    /// Boolean attempts made (1, or 2 after a retry).
    pub attempts: u32,

    /// Whether the coordinate was nudged for the retry.
    pub perturbed: bool,

    /// Nodes created below and above the plane.
    pub children: [usize; 2],
}

/// A finished part.
#[derive(Debug, Clone)]
pub struct Part {
    /// Position in the result, starting at 0.
    pub id: usize,

    /// Node in the cut tree this part came from.
    pub node: usize,

    /// Final geometry, including joint features.
    pub mesh: Mesh,

    /// Bounding box of `mesh`.
    pub bounds: BoundingBox,

    /// Seams this part borders.
    pub seams: Vec<SeamRef>,
}

impl Part {
    pub(crate) fn new(id: usize, node: usize, mesh: Mesh) -> Option<Self> {
        let bounds = mesh.bounds()?;
        Some(Self {
            id,
            node,
            mesh,
            bounds,
            seams: Vec::new(),
        })
    }

    /// Recompute the bounding box after the mesh changed.
    pub(crate) fn refresh_bounds(&mut self) {
        if let Some(bounds) = self.mesh.bounds() {
            self.bounds = bounds;
        }
    }

    /// Enclosed volume in mm³.
    pub fn volume(&self) -> f64 {
        self.mesh.volume()
    }

    /// Extents along X, Y and Z in mm.
    pub fn extents(&self) -> [f64; 3] {
        let e = self.bounds.extents();
        [e.x, e.y, e.z]
    }
}

/// How a seam should be carried over when one of its parts is cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SeamUpdate {
    /// Re-point the seam at this child.
    Move(usize),
    /// Both children border the neighbor: keep the first, add a seam for the second.
    Split(usize, usize),
    /// Neither child borders the neighbor any more.
    Drop,
}

/// Decide which children of a cut node still border a seam neighbor.
///
/// A child qualifies when it reaches the seam plane and its flat faces there
/// overlap the neighbor's flat faces.
pub(crate) fn inherit_seam(
    arena: &[PartNode],
    seam: &Seam,
    cut_node: usize,
    children: [usize; 2],
) -> SeamUpdate {
    let Some(side) = seam.side_of(cut_node) else {
        return SeamUpdate::Drop;
    };
    let neighbor = &arena[seam.part_on(side.opposite())];
    // The part on `side` faces across the plane, toward the opposite side.
    let neighbor_section = neighbor.section(seam.axis, seam.coordinate, side);
    let Some(neighbor_rect) = neighbor_section.bounds() else {
        return SeamUpdate::Drop;
    };

    let touching: Vec<usize> = children
        .into_iter()
        .filter(|&child| {
            let node = &arena[child];
            let i = seam.axis.index();
            let reaches = node.bounds.min[i] <= seam.coordinate + PLANE_SLACK
                && node.bounds.max[i] >= seam.coordinate - PLANE_SLACK;
            if !reaches {
                return false;
            }
            let section = node.section(seam.axis, seam.coordinate, side.opposite());
            section
                .bounds()
                .and_then(|rect| rect_intersection(rect, neighbor_rect))
                .is_some_and(|(min, max)| max[0] - min[0] > PLANE_SLACK && max[1] - min[1] > PLANE_SLACK)
        })
        .collect();

    match touching.as_slice() {
        [only] => SeamUpdate::Move(*only),
        [first, second] => SeamUpdate::Split(*first, *second),
        _ => SeamUpdate::Drop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_core::primitives::cuboid;

    fn node(min: [f64; 3], max: [f64; 3]) -> PartNode {
        PartNode::new(cuboid(min, max), Vec::new()).unwrap()
    }

    #[test]
    fn test_cuts_since() {
        let mut n = node([0.0; 3], [1.0; 3]);
        n.cut_history = vec![Axis::X, Axis::Y, Axis::X];
        assert_eq!(n.cuts_since(Axis::X), Some(0));
        assert_eq!(n.cuts_since(Axis::Y), Some(1));
        assert_eq!(n.cuts_since(Axis::Z), None);
    }

    #[test]
    fn test_seam_sides() {
        let seam = Seam {
            id: 0,
            axis: Axis::X,
            coordinate: 200.0,
            below: 1,
            above: 2,
        };
        assert_eq!(seam.side_of(1), Some(Side::Below));
        assert_eq!(seam.neighbor_of(2), Some(1));
        assert_eq!(seam.neighbor_of(7), None);
        assert!(!seam.involves(0));
    }

    #[test]
    fn test_parallel_cut_moves_seam() {
        // Node 1 borders node 0 at x = 100 and is then cut at x = 150.
        let arena = vec![
            node([0.0, 0.0, 0.0], [100.0, 50.0, 50.0]),
            node([100.0, 0.0, 0.0], [200.0, 50.0, 50.0]),
            node([100.0, 0.0, 0.0], [150.0, 50.0, 50.0]),
            node([150.0, 0.0, 0.0], [200.0, 50.0, 50.0]),
        ];
        let seam = Seam {
            id: 0,
            axis: Axis::X,
            coordinate: 100.0,
            below: 0,
            above: 1,
        };
        assert_eq!(inherit_seam(&arena, &seam, 1, [2, 3]), SeamUpdate::Move(2));
    }

    #[test]
    fn test_crossing_cut_splits_seam() {
        // Node 1 borders node 0 at x = 100 and is then cut at y = 25.
        let arena = vec![
            node([0.0, 0.0, 0.0], [100.0, 50.0, 50.0]),
            node([100.0, 0.0, 0.0], [200.0, 50.0, 50.0]),
            node([100.0, 0.0, 0.0], [200.0, 25.0, 50.0]),
            node([100.0, 25.0, 0.0], [200.0, 50.0, 50.0]),
        ];
        let seam = Seam {
            id: 0,
            axis: Axis::X,
            coordinate: 100.0,
            below: 0,
            above: 1,
        };
        assert_eq!(inherit_seam(&arena, &seam, 1, [2, 3]), SeamUpdate::Split(2, 3));
    }

    #[test]
    fn test_part_refresh_bounds() {
        let mut part = Part::new(0, 0, cuboid([0.0; 3], [10.0; 3])).unwrap();
        part.mesh.translate(nalgebra::Vector3::new(5.0, 0.0, 0.0));
        part.refresh_bounds();
        assert_eq!(part.bounds.max.x, 15.0);
        assert_eq!(part.extents(), [10.0, 10.0, 10.0]);
    }
}
