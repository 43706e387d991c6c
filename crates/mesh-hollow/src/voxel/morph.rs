//! Morphological passes: exterior flood fill, distance transform, shell.
//!
//! Each pass reads one dense buffer and produces the next; callers drop
//! the inputs as soon as the outputs exist.

use std::collections::VecDeque;

use tracing::debug;

/// Result of filling enclosed voids.
#[derive(Debug, Clone)]
pub struct ExteriorFill {
    /// Everything not reachable from the grid border.
    pub filled: Vec<bool>,
    /// Voxels that were empty but enclosed, now filled.
    pub voids_filled: usize,
}

/// Flood-fill empty space from the grid border (6-connected) and return the
/// complement, so enclosed cavities count as solid.
pub fn fill_exterior(occupied: &[bool], dims: [usize; 3]) -> ExteriorFill {
    let [nx, ny, nz] = dims;
    let idx = |x: usize, y: usize, z: usize| x + y * nx + z * nx * ny;

    let mut exterior = vec![false; occupied.len()];
    let mut queue = VecDeque::new();

    let seed = |i: usize, exterior: &mut Vec<bool>, queue: &mut VecDeque<usize>| {
        if !occupied[i] && !exterior[i] {
            exterior[i] = true;
            queue.push_back(i);
        }
    };

    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                let border = x == 0
                    || y == 0
                    || z == 0
                    || x + 1 == nx
                    || y + 1 == ny
                    || z + 1 == nz;
                if border {
                    seed(idx(x, y, z), &mut exterior, &mut queue);
                }
            }
        }
    }

    while let Some(i) = queue.pop_front() {
        let x = i % nx;
        let y = (i / nx) % ny;
        let z = i / (nx * ny);
        if x > 0 {
            seed(i - 1, &mut exterior, &mut queue);
        }
        if x + 1 < nx {
            seed(i + 1, &mut exterior, &mut queue);
        }
        if y > 0 {
            seed(i - nx, &mut exterior, &mut queue);
        }
        if y + 1 < ny {
            seed(i + nx, &mut exterior, &mut queue);
        }
        if z > 0 {
            seed(i - nx * ny, &mut exterior, &mut queue);
        }
        if z + 1 < nz {
            seed(i + nx * ny, &mut exterior, &mut queue);
        }
    }

    let mut voids_filled = 0;
    let filled: Vec<bool> = occupied
        .iter()
        .zip(&exterior)
        .map(|(&occ, &ext)| {
            if !occ && !ext {
                voids_filled += 1;
            }
            !ext
        })
        .collect();

    debug!(voids_filled, "Exterior flood fill complete");

    ExteriorFill {
        filled,
        voids_filled,
    }
}

/// Per-axis voxel extent of the set voxels, or `None` if none are set.
pub fn occupied_extent(mask: &[bool], dims: [usize; 3]) -> Option<[usize; 3]> {
    let [nx, ny, _] = dims;
    let mut lo = [usize::MAX; 3];
    let mut hi = [0usize; 3];
    let mut any = false;
    for (i, _) in mask.iter().enumerate().filter(|(_, set)| **set) {
        any = true;
        let c = [i % nx, (i / nx) % ny, i / (nx * ny)];
        for a in 0..3 {
            lo[a] = lo[a].min(c[a]);
            hi[a] = hi[a].max(c[a]);
        }
    }
    any.then(|| [hi[0] - lo[0] + 1, hi[1] - lo[1] + 1, hi[2] - lo[2] + 1])
}

/// Squared Euclidean distance (mm²) from every voxel center to the nearest
/// voxel center outside `mask`.
///
/// Exact separable transform (Felzenszwalb and Huttenlocher), one pass per
/// axis with that axis's cell size. Voxels outside the mask get zero.
pub fn squared_distance_to_exterior(
    mask: &[bool],
    dims: [usize; 3],
    cell_size: [f64; 3],
) -> Vec<f32> {
    // Larger than any squared distance inside the grid, small enough that
    // adding a squared offset to it stays exact in f64.
    let far = 4.0
        * (0..3)
            .map(|a| (dims[a] as f64 * cell_size[a]).powi(2))
            .sum::<f64>()
        + 1.0;
    let mut dist: Vec<f32> = mask
        .iter()
        .map(|&m| if m { far as f32 } else { 0.0 })
        .collect();

    let strides = [1, dims[0], dims[0] * dims[1]];
    let mut line = Vec::new();
    let mut out = Vec::new();
    let mut scratch = Scratch::default();

    for axis in 0..3 {
        let n = dims[axis];
        let stride = strides[axis];
        let (a, b) = match axis {
            0 => (1, 2),
            1 => (0, 2),
            _ => (0, 1),
        };
        for j in 0..dims[b] {
            for i in 0..dims[a] {
                let start = i * strides[a] + j * strides[b];
                line.clear();
                line.extend((0..n).map(|k| dist[start + k * stride] as f64));
                transform_line(&line, cell_size[axis], &mut out, &mut scratch);
                for (k, &d) in out.iter().enumerate() {
                    dist[start + k * stride] = d.min(far) as f32;
                }
            }
        }
    }

    dist
}

#[derive(Default)]
struct Scratch {
    v: Vec<usize>,
    z: Vec<f64>,
}

/// Lower envelope of parabolas `(x - p)^2 + f[p]` sampled at `q * spacing`.
fn transform_line(f: &[f64], spacing: f64, out: &mut Vec<f64>, s: &mut Scratch) {
    let n = f.len();
    out.clear();
    if n == 0 {
        return;
    }
    s.v.clear();
    s.z.clear();
    s.v.resize(n, 0);
    s.z.resize(n + 1, 0.0);

    let pos = |q: usize| q as f64 * spacing;
    let mut k = 0usize;
    s.v[0] = 0;
    s.z[0] = f64::NEG_INFINITY;
    s.z[1] = f64::INFINITY;

    let sect = |q: usize, p: usize| {
        ((f[q] + pos(q) * pos(q)) - (f[p] + pos(p) * pos(p))) / (2.0 * (pos(q) - pos(p)))
    };
    for q in 1..n {
        // z[0] is -inf, so this stops at k = 0 at the latest.
        let mut x = sect(q, s.v[k]);
        while x <= s.z[k] {
            k -= 1;
            x = sect(q, s.v[k]);
        }
        k += 1;
        s.v[k] = q;
        s.z[k] = x;
        s.z[k + 1] = f64::INFINITY;
    }

    k = 0;
    for q in 0..n {
        while s.z[k + 1] < pos(q) {
            k += 1;
        }
        let d = pos(q) - pos(s.v[k]);
        out.push(d * d + f[s.v[k]]);
    }
}

/// Split the filled set into shell and eroded core.
///
/// A voxel is eroded when every voxel within `radius` (mm) is filled, that
/// is when its distance to the exterior exceeds the radius. Returns the
/// shell mask and the eroded voxel count.
pub fn shell_mask(filled: &[bool], squared_distance: &[f32], radius: f64) -> (Vec<bool>, usize) {
    let limit = radius * radius * (1.0 + 1e-9);
    let mut eroded = 0;
    let shell = filled
        .iter()
        .zip(squared_distance)
        .map(|(&f, &d)| {
            if !f {
                return false;
            }
            let core = d as f64 > limit;
            if core {
                eroded += 1;
            }
            !core
        })
        .collect();
    (shell, eroded)
}
