//! Axes, sides and axis-aligned bounding boxes.

use std::fmt;

use nalgebra::{Point3, Vector3};

/// A principal axis of the coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All axes in index order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Component index (0, 1, 2).
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Axis for a component index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Unit vector along this axis.
    pub fn unit(self) -> Vector3<f64> {
        let mut v = Vector3::zeros();
        v[self.index()] = 1.0;
        v
    }

    /// The two in-plane axes of a plane perpendicular to this axis.
    ///
    /// The pair is ordered so that `u x v` points along `self`, which keeps
    /// 2D polygon orientation consistent with the 3D normal.
    #[inline]
    pub fn plane_axes(self) -> (Axis, Axis) {
        match self {
            Axis::X => (Axis::Y, Axis::Z),
            Axis::Y => (Axis::Z, Axis::X),
            Axis::Z => (Axis::X, Axis::Y),
        }
    }

    /// Project a point onto the plane perpendicular to this axis.
    #[inline]
    pub fn project(self, p: &Point3<f64>) -> [f64; 2] {
        let (u, v) = self.plane_axes();
        [p[u.index()], p[v.index()]]
    }

    /// Lift 2D plane coordinates back to 3D at the given offset along this axis.
    #[inline]
    pub fn lift(self, uv: [f64; 2], offset: f64) -> Point3<f64> {
        let (u, v) = self.plane_axes();
        let mut p = Point3::origin();
        p[self.index()] = offset;
        p[u.index()] = uv[0];
        p[v.index()] = uv[1];
        p
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        f.write_str(name)
    }
}

/// One side of an axis-aligned plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Side {
    /// Coordinates less than the plane offset.
    Below,
    /// Coordinates greater than the plane offset.
    Above,
}

impl Side {
    /// The other side.
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Side::Below => Side::Above,
            Side::Above => Side::Below,
        }
    }

    /// `-1.0` for below, `+1.0` for above.
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Side::Below => -1.0,
            Side::Above => 1.0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Below => f.write_str("below"),
            Side::Above => f.write_str("above"),
        }
    }
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl BoundingBox {
    /// Create a box from two corners.
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self { min, max }
    }

    /// Create a box anchored at the origin with the given extents.
    pub fn from_extents(x: f64, y: f64, z: f64) -> Self {
        Self::new(Point3::origin(), Point3::new(x, y, z))
    }

    /// Smallest box containing all points, or `None` when there are none.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point3<f64>>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bb = Self::new(first, first);
        for p in iter {
            bb.include(&p);
        }
        Some(bb)
    }

    /// Bounding box of a mesh's vertices.
    pub fn from_mesh(mesh: &crate::Mesh) -> Option<Self> {
        mesh.bounds()
    }

    /// Grow the box to contain a point.
    pub fn include(&mut self, p: &Point3<f64>) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Extents along each axis.
    #[inline]
    pub fn extents(&self) -> Vector3<f64> {
        self.max - self.min
    }

    /// Extent along one axis.
    #[inline]
    pub fn extent(&self, axis: Axis) -> f64 {
        self.max[axis.index()] - self.min[axis.index()]
    }

    /// Length of the diagonal.
    #[inline]
    pub fn diagonal(&self) -> f64 {
        self.extents().norm()
    }

    /// Enclosed volume.
    pub fn volume(&self) -> f64 {
        let e = self.extents();
        e.x.max(0.0) * e.y.max(0.0) * e.z.max(0.0)
    }

    /// Center point.
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Smallest extent across the three axes.
    pub fn min_extent(&self) -> f64 {
        self.extents().min()
    }

    /// Largest extent across the three axes.
    pub fn max_extent(&self) -> f64 {
        self.extents().max()
    }

    /// Whether the box fits inside `volume` on every axis, within `tolerance`.
    ///
    /// Only extents are compared; position is irrelevant.
    pub fn fits_within(&self, volume: &Vector3<f64>, tolerance: f64) -> bool {
        Axis::ALL
            .iter()
            .all(|&a| self.extent(a) <= volume[a.index()] + tolerance)
    }

    /// Extent divided by the build-volume extent, per axis.
    ///
    /// A ratio above 1 means the box overshoots the volume on that axis.
    pub fn overshoot_ratios(&self, volume: &Vector3<f64>) -> [f64; 3] {
        let e = self.extents();
        [e.x / volume.x, e.y / volume.y, e.z / volume.z]
    }

    /// Whether a point lies inside the box, expanded by `tolerance`.
    pub fn contains(&self, p: &Point3<f64>, tolerance: f64) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] - tolerance && p[i] <= self.max[i] + tolerance)
    }

    /// Whether two boxes overlap, treating touching boxes as overlapping.
    pub fn intersects(&self, other: &BoundingBox, tolerance: f64) -> bool {
        (0..3).all(|i| {
            self.min[i] <= other.max[i] + tolerance && other.min[i] <= self.max[i] + tolerance
        })
    }

    /// Intersection of two boxes, or `None` if they do not overlap.
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        let min = self.min.sup(&other.min);
        let max = self.max.inf(&other.max);
        if (0..3).all(|i| min[i] <= max[i]) {
            Some(BoundingBox::new(min, max))
        } else {
            None
        }
    }

    /// Union of two boxes.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox::new(self.min.inf(&other.min), self.max.sup(&other.max))
    }

    /// Box grown by `margin` on every side.
    pub fn expanded(&self, margin: f64) -> BoundingBox {
        let m = Vector3::repeat(margin);
        BoundingBox::new(self.min - m, self.max + m)
    }

    /// Project onto the plane perpendicular to `axis` as `(min_uv, max_uv)`.
    pub fn project(&self, axis: Axis) -> ([f64; 2], [f64; 2]) {
        (axis.project(&self.min), axis.project(&self.max))
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let e = self.extents();
        write!(f, "{:.2} x {:.2} x {:.2}", e.x, e.y, e.z)
    }
}

/// Overlap of two 2D rectangles given as `(min, max)` corners.
pub fn rect_intersection(
    a: ([f64; 2], [f64; 2]),
    b: ([f64; 2], [f64; 2]),
) -> Option<([f64; 2], [f64; 2])> {
    let min = [a.0[0].max(b.0[0]), a.0[1].max(b.0[1])];
    let max = [a.1[0].min(b.1[0]), a.1[1].min(b.1[1])];
    if min[0] <= max[0] && min[1] <= max[1] {
        Some((min, max))
    } else {
        None
    }
}
