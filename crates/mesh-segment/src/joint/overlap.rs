//! Joint candidate placement inside a seam overlap.
//!
//! Both parts expose a flat section on the seam plane. Joints may only sit
//! where the two sections overlap, and only far enough from either outline
//! that the hole wall is printable. Candidates come from a regular lattice
//! over the overlap rectangle, so placement is deterministic.

use mesh_core::{PlanarSection, rect_intersection};

/// Lattice cells along the longest side of the overlap.
const LATTICE_DIVISIONS: f64 = 200.0;

/// Smallest lattice step in mm.
const MIN_LATTICE_STEP: f64 = 0.2;

/// Cap on lattice points per seam.
const MAX_LATTICE_POINTS: usize = 250_000;

/// A lattice point usable as a joint center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Plane coordinates.
    pub uv: [f64; 2],
    /// Distance to the nearer of the two outlines.
    pub clearance: f64,
}

/// Why no candidate survived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapShortfall {
    /// The sections do not overlap at all.
    Empty,
    /// The overlap is too narrow for the footprint plus edge margin.
    Narrow,
}

/// Overlap rectangle of two sections, or `None` if they are disjoint.
pub fn overlap_rect(a: &PlanarSection, b: &PlanarSection) -> Option<([f64; 2], [f64; 2])> {
    rect_intersection(a.bounds()?, b.bounds()?)
        .filter(|(min, max)| max[0] > min[0] && max[1] > min[1])
}

/// Lattice points inside both sections with at least `clearance` to either outline.
pub fn candidates(
    a: &PlanarSection,
    b: &PlanarSection,
    clearance: f64,
    max_step: f64,
) -> Result<Vec<Candidate>, OverlapShortfall> {
    let (min, max) = overlap_rect(a, b).ok_or(OverlapShortfall::Empty)?;
    let size = [max[0] - min[0], max[1] - min[1]];
    if size[0] < 2.0 * clearance || size[1] < 2.0 * clearance {
        return Err(OverlapShortfall::Narrow);
    }

    let mut step = (size[0].max(size[1]) / LATTICE_DIVISIONS)
        .max(MIN_LATTICE_STEP)
        .min(max_step.max(MIN_LATTICE_STEP));
    let mut counts = lattice_counts(size, step);
    while counts[0] * counts[1] > MAX_LATTICE_POINTS {
        step *= 2.0;
        counts = lattice_counts(size, step);
    }

    let mut found = Vec::new();
    for j in 0..counts[1] {
        let v = min[1] + (j as f64 + 0.5) * step;
        if v - min[1] < clearance || max[1] - v < clearance {
            continue;
        }
        for i in 0..counts[0] {
            let u = min[0] + (i as f64 + 0.5) * step;
            if u - min[0] < clearance || max[0] - u < clearance {
                continue;
            }
            let uv = [u, v];
            if !a.contains(uv) || !b.contains(uv) {
                continue;
            }
            let d = a.distance_to_boundary(uv).min(b.distance_to_boundary(uv));
            if d >= clearance {
                found.push(Candidate { uv, clearance: d });
            }
        }
    }

    if found.is_empty() {
        Err(OverlapShortfall::Narrow)
    } else {
        Ok(found)
    }
}

fn lattice_counts(size: [f64; 2], step: f64) -> [usize; 2] {
    [
        ((size[0] / step).floor() as usize).max(1),
        ((size[1] / step).floor() as usize).max(1),
    ]
}

fn dist(a: [f64; 2], b: [f64; 2]) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
}

/// Pick up to `count` spread-out candidates at least `min_spacing` apart.
///
/// A single joint goes to the candidate nearest the centroid of all
/// candidates. Otherwise the first joint is the candidate farthest from
/// that centroid and each next one maximizes its distance to those already
/// chosen. Ties resolve to the earlier lattice point.
pub fn select(candidates: &[Candidate], count: usize, min_spacing: f64) -> Vec<[f64; 2]> {
    if candidates.is_empty() || count == 0 {
        return Vec::new();
    }

    let n = candidates.len() as f64;
    let centroid = candidates.iter().fold([0.0, 0.0], |acc, c| {
        [acc[0] + c.uv[0] / n, acc[1] + c.uv[1] / n]
    });

    let first = if count == 1 {
        pick_by(candidates, |c| -dist(c.uv, centroid))
    } else {
        pick_by(candidates, |c| dist(c.uv, centroid))
    };
    let mut chosen = vec![candidates[first].uv];

    // Distance from each candidate to the nearest chosen point.
    let mut nearest: Vec<f64> = candidates
        .iter()
        .map(|c| dist(c.uv, chosen[0]))
        .collect();

    while chosen.len() < count {
        let (best, best_d) = nearest
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |(bi, bd), (i, &d)| {
                if d > bd { (i, d) } else { (bi, bd) }
            });
        if best_d < min_spacing {
            break;
        }
        let uv = candidates[best].uv;
        chosen.push(uv);
        for (d, c) in nearest.iter_mut().zip(candidates) {
            *d = d.min(dist(c.uv, uv));
        }
    }

    chosen
}

/// Index of the first candidate maximizing `score`.
fn pick_by(candidates: &[Candidate], score: impl Fn(&Candidate) -> f64) -> usize {
    candidates
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(bi, bs), (i, c)| {
            let s = score(c);
            if s > bs { (i, s) } else { (bi, bs) }
        })
        .0
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_core::primitives::cuboid;
    use mesh_core::{Axis, Side};

    fn cap(min: [f64; 3], max: [f64; 3], facing: Side) -> PlanarSection {
        let mesh = cuboid(min, max);
        let coordinate = match facing {
            Side::Above => max[0],
            Side::Below => min[0],
        };
        PlanarSection::extract(&mesh, Axis::X, coordinate, facing)
    }

    #[test]
    fn test_full_overlap_candidates() {
        let a = cap([0.0, 0.0, 0.0], [50.0, 40.0, 40.0], Side::Above);
        let b = cap([50.0, 0.0, 0.0], [100.0, 40.0, 40.0], Side::Below);
        let found = candidates(&a, &b, 4.6, 1.3).unwrap();
        assert!(!found.is_empty());
        for c in &found {
            assert!(c.clearance >= 4.6);
            assert!(c.uv[0] >= 4.6 && c.uv[0] <= 35.4);
        }
    }

    #[test]
    fn test_disjoint_sections() {
        let a = cap([0.0, 0.0, 0.0], [50.0, 40.0, 40.0], Side::Above);
        let b = cap([50.0, 100.0, 0.0], [100.0, 140.0, 40.0], Side::Below);
        assert_eq!(candidates(&a, &b, 1.0, 1.0), Err(OverlapShortfall::Empty));
    }

    #[test]
    fn test_narrow_overlap() {
        let a = cap([0.0, 0.0, 0.0], [50.0, 6.0, 40.0], Side::Above);
        let b = cap([50.0, 0.0, 0.0], [100.0, 6.0, 40.0], Side::Below);
        assert_eq!(candidates(&a, &b, 4.6, 1.3), Err(OverlapShortfall::Narrow));
    }

    #[test]
    fn test_select_single_near_centroid() {
        let a = cap([0.0, 0.0, 0.0], [50.0, 40.0, 40.0], Side::Above);
        let b = cap([50.0, 0.0, 0.0], [100.0, 40.0, 40.0], Side::Below);
        let found = candidates(&a, &b, 4.6, 1.3).unwrap();
        let picked = select(&found, 1, 10.0);
        assert_eq!(picked.len(), 1);
        assert!(dist(picked[0], [20.0, 20.0]) < 1.0);
    }

    #[test]
    fn test_select_spreads_and_respects_spacing() {
        let a = cap([0.0, 0.0, 0.0], [50.0, 40.0, 40.0], Side::Above);
        let b = cap([50.0, 0.0, 0.0], [100.0, 40.0, 40.0], Side::Below);
        let found = candidates(&a, &b, 4.6, 1.3).unwrap();

        let picked = select(&found, 2, 10.4);
        assert_eq!(picked.len(), 2);
        // Opposite corners of the usable square.
        assert!(dist(picked[0], picked[1]) > 35.0);

        // A huge spacing leaves only the first joint.
        assert_eq!(select(&found, 4, 1000.0).len(), 1);
    }

    #[test]
    fn test_selection_is_deterministic() {
        let a = cap([0.0, 0.0, 0.0], [50.0, 60.0, 30.0], Side::Above);
        let b = cap([50.0, 10.0, 0.0], [100.0, 50.0, 30.0], Side::Below);
        let found = candidates(&a, &b, 4.6, 1.3).unwrap();
        assert_eq!(select(&found, 3, 10.4), select(&found, 3, 10.4));
    }
}
