//! 2D polygon helpers: curve flattening, ring nesting, hole bridging and
//! ear-clipping triangulation.

use glam::Vec2;

/// Deepest subdivision of one cubic.
const MAX_FLATTEN_DEPTH: u32 = 16;

/// Appends points approximating the cubic Bézier `p0 p1 p2 p3` to `out`,
/// excluding `p0`.
///
/// Subdivides at the midpoint until `max(u·u, v·v) < tolerance²` with
/// `u = 3·p1 − 2·p0 − p3` and `v = 3·p2 − p0 − 2·p3`.
pub fn flatten_cubic(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2, tolerance: f32, out: &mut Vec<Vec2>) {
    flatten_rec(p0, p1, p2, p3, tolerance * tolerance, 0, out);
}

fn flatten_rec(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2, tol2: f32, depth: u32, out: &mut Vec<Vec2>) {
    let u = 3.0 * p1 - 2.0 * p0 - p3;
    let v = 3.0 * p2 - p0 - 2.0 * p3;
    if u.length_squared().max(v.length_squared()) < tol2 || depth >= MAX_FLATTEN_DEPTH {
        out.push(p3);
        return;
    }
    // de Casteljau split at t = 0.5.
    let p01 = (p0 + p1) * 0.5;
    let p12 = (p1 + p2) * 0.5;
    let p23 = (p2 + p3) * 0.5;
    let p012 = (p01 + p12) * 0.5;
    let p123 = (p12 + p23) * 0.5;
    let mid = (p012 + p123) * 0.5;
    flatten_rec(p0, p01, p012, mid, tol2, depth + 1, out);
    flatten_rec(mid, p123, p23, p3, tol2, depth + 1, out);
}

/// Twice the signed area; positive for counter-clockwise rings.
pub fn signed_area2(ring: &[Vec2]) -> f32 {
    let n = ring.len();
    (0..n).map(|i| ring[i].perp_dot(ring[(i + 1) % n])).sum()
}

/// Even-odd point-in-polygon test.
pub fn contains(ring: &[Vec2], p: Vec2) -> bool {
    let n = ring.len();
    let mut inside = false;
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let (a, b) = (ring[i], ring[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Drops consecutive duplicates (including last == first).
pub fn clean_ring(ring: &[Vec2]) -> Vec<Vec2> {
    let mut out: Vec<Vec2> = Vec::with_capacity(ring.len());
    for &p in ring {
        if out.last().is_none_or(|q| q.distance_squared(p) > f32::EPSILON) {
            out.push(p);
        }
    }
    while out.len() > 1 && out[0].distance_squared(out[out.len() - 1]) <= f32::EPSILON {
        out.pop();
    }
    out
}

/// Groups rings by even-odd nesting: a ring inside an even number of other
/// rings is a filled outline, one inside an odd number is a hole of the
/// innermost outline around it.
///
/// Returns `(outline, holes)` index groups.
pub fn nest_rings(rings: &[Vec<Vec2>]) -> Vec<(usize, Vec<usize>)> {
    let inside_of = |i: usize| -> Vec<usize> {
        let Some(&probe) = rings[i].first() else { return Vec::new() };
        (0..rings.len()).filter(|&j| j != i && contains(&rings[j], probe)).collect()
    };

    let parents: Vec<Vec<usize>> = (0..rings.len()).map(inside_of).collect();
    let mut groups: Vec<(usize, Vec<usize>)> = Vec::new();

    for (i, containers) in parents.iter().enumerate() {
        if containers.len() % 2 == 0 {
            groups.push((i, Vec::new()));
        }
    }
    for (i, containers) in parents.iter().enumerate() {
        if containers.len() % 2 == 1 {
            // Innermost container = the one nested deepest itself.
            let outline = containers.iter().copied().max_by_key(|&c| parents[c].len());
            if let Some(group) = outline.and_then(|o| groups.iter_mut().find(|(g, _)| *g == o)) {
                group.1.push(i);
            }
        }
    }
    groups
}

fn segments_cross(a: Vec2, b: Vec2, c: Vec2, d: Vec2) -> bool {
    let d1 = (b - a).perp_dot(c - a);
    let d2 = (b - a).perp_dot(d - a);
    let d3 = (d - c).perp_dot(a - c);
    let d4 = (d - c).perp_dot(b - c);
    (d1 * d2 < 0.0) && (d3 * d4 < 0.0)
}

/// Splices `holes` into `outline` with zero-width bridges, producing one
/// simple counter-clockwise ring.
pub fn bridge_holes(outline: &[Vec2], holes: &[Vec<Vec2>]) -> Vec<Vec2> {
    let mut ring = outline.to_vec();
    if signed_area2(&ring) < 0.0 {
        ring.reverse();
    }

    let mut holes: Vec<Vec<Vec2>> = holes
        .iter()
        .filter(|h| h.len() >= 3)
        .map(|h| {
            let mut h = h.clone();
            if signed_area2(&h) > 0.0 {
                h.reverse();
            }
            h
        })
        .collect();
    let max_x = |h: &Vec<Vec2>| h.iter().map(|p| p.x).fold(f32::MIN, f32::max);
    holes.sort_by(|a, b| max_x(b).total_cmp(&max_x(a)));

    for (index, hole) in holes.iter().enumerate() {
        let Some((m, &hp)) = hole.iter().enumerate().max_by(|a, b| a.1.x.total_cmp(&b.1.x)) else {
            continue;
        };

        let blocked = |q: Vec2| {
            let edges_of = |r: &[Vec2]| -> bool {
                (0..r.len()).any(|i| segments_cross(hp, q, r[i], r[(i + 1) % r.len()]))
            };
            edges_of(&ring) || holes[index..].iter().any(|h| edges_of(h))
        };

        let mut candidates: Vec<usize> = (0..ring.len()).collect();
        candidates.sort_by(|&a, &b| ring[a].distance_squared(hp).total_cmp(&ring[b].distance_squared(hp)));
        let Some(k) = candidates.iter().copied().find(|&k| !blocked(ring[k])).or(candidates.first().copied())
        else {
            continue;
        };

        let mut spliced = Vec::with_capacity(ring.len() + hole.len() + 2);
        spliced.extend_from_slice(&ring[..=k]);
        spliced.extend(hole[m..].iter().chain(&hole[..=m]).copied());
        spliced.extend_from_slice(&ring[k..]);
        ring = spliced;
    }
    ring
}

fn in_triangle(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> bool {
    let d1 = (b - a).perp_dot(p - a);
    let d2 = (c - b).perp_dot(p - b);
    let d3 = (a - c).perp_dot(p - c);
    d1 >= 0.0 && d2 >= 0.0 && d3 >= 0.0
}

/// Ear-clips a simple ring into triangles (indices into `ring`), wound
/// counter-clockwise.
pub fn triangulate(ring: &[Vec2]) -> Vec<[usize; 3]> {
    let n = ring.len();
    if n < 3 {
        return Vec::new();
    }
    let mut idx: Vec<usize> = (0..n).collect();
    if signed_area2(ring) < 0.0 {
        idx.reverse();
    }

    let mut out = Vec::with_capacity(n - 2);
    let mut misses = 0;
    let mut i = 0;
    while idx.len() > 3 {
        let len = idx.len();
        let (ia, ib, ic) = (idx[(i + len - 1) % len], idx[i % len], idx[(i + 1) % len]);
        let (a, b, c) = (ring[ia], ring[ib], ring[ic]);

        let convex = (b - a).perp_dot(c - b) > 0.0;
        let is_ear = convex
            && !idx.iter().any(|&j| {
                let p = ring[j];
                j != ia && j != ib && j != ic && p != a && p != b && p != c && in_triangle(p, a, b, c)
            });

        // A full pass without an ear means the ring is degenerate; clip
        // anyway so the loop terminates.
        if is_ear || misses >= len {
            if convex {
                out.push([ia, ib, ic]);
            }
            idx.remove(i % len);
            misses = 0;
        } else {
            i += 1;
            misses += 1;
        }
        i %= idx.len().max(1);
    }
    let (a, b, c) = (ring[idx[0]], ring[idx[1]], ring[idx[2]]);
    if (b - a).perp_dot(c - b) > 0.0 {
        out.push([idx[0], idx[1], idx[2]]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area(ring: &[Vec2], tris: &[[usize; 3]]) -> f32 {
        tris.iter()
            .map(|t| {
                let (a, b, c) = (ring[t[0]], ring[t[1]], ring[t[2]]);
                0.5 * (b - a).perp_dot(c - a)
            })
            .sum()
    }

    fn square(min: f32, max: f32) -> Vec<Vec2> {
        vec![Vec2::new(min, min), Vec2::new(max, min), Vec2::new(max, max), Vec2::new(min, max)]
    }

    #[test]
    fn straight_cubic_flattens_to_its_endpoint() {
        let mut out = Vec::new();
        let (a, b) = (Vec2::ZERO, Vec2::new(3.0, 0.0));
        flatten_cubic(a, Vec2::new(1.0, 0.0), Vec2::new(2.0, 0.0), b, 0.1, &mut out);
        assert_eq!(out, [b]);
    }

    #[test]
    fn tighter_tolerance_yields_more_points() {
        let (p0, p1, p2, p3) = (Vec2::ZERO, Vec2::new(0.0, 10.0), Vec2::new(10.0, 10.0), Vec2::new(10.0, 0.0));
        let (mut coarse, mut fine) = (Vec::new(), Vec::new());
        flatten_cubic(p0, p1, p2, p3, 2.0, &mut coarse);
        flatten_cubic(p0, p1, p2, p3, 0.05, &mut fine);
        assert!(fine.len() > coarse.len());
        assert_eq!(fine.last(), Some(&p3));
    }

    #[test]
    fn square_is_two_triangles() {
        let ring = square(0.0, 1.0);
        let tris = triangulate(&ring);
        assert_eq!(tris.len(), 2);
        assert!((area(&ring, &tris) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn clockwise_rings_triangulate_counter_clockwise() {
        let mut ring = square(0.0, 2.0);
        ring.reverse();
        let tris = triangulate(&ring);
        assert!((area(&ring, &tris) - 4.0).abs() < 1e-5);
    }

    #[test]
    fn concave_ring_keeps_its_area() {
        let ring = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(2.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 2.0),
            Vec2::new(0.0, 2.0),
        ];
        let tris = triangulate(&ring);
        assert_eq!(tris.len(), 4);
        assert!((area(&ring, &tris) - 3.0).abs() < 1e-5);
    }

    #[test]
    fn holes_are_subtracted() {
        let outer = square(0.0, 4.0);
        let hole = square(1.0, 2.0);
        let ring = bridge_holes(&outer, &[hole]);
        let tris = triangulate(&ring);
        assert!((area(&ring, &tris) - 15.0).abs() < 1e-4, "area {}", area(&ring, &tris));
    }

    #[test]
    fn nesting_alternates_outline_and_hole() {
        let rings = vec![square(0.0, 10.0), square(1.0, 9.0), square(2.0, 8.0), square(20.0, 21.0)];
        let groups = nest_rings(&rings);
        assert_eq!(groups, vec![(0, vec![1]), (2, vec![]), (3, vec![])]);
    }

    #[test]
    fn cleaning_drops_closing_duplicates() {
        let mut ring = square(0.0, 1.0);
        ring.push(Vec2::ZERO);
        ring.insert(1, Vec2::ZERO);
        assert_eq!(clean_ring(&ring), square(0.0, 1.0));
    }
}
