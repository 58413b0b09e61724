// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Solidkit Contributors

//! Regularized 2D polygon booleans for polygons with holes.
//!
//! Subject and clip boundaries are split at mutual crossings (and at each
//! other's vertices, which covers collinear overlaps), surviving sub-edges
//! are chosen by midpoint containment, and the result loops are re-chained
//! through tolerance-quantized endpoints. A sub-edge lying on the other
//! region's boundary is resolved by sampling just inside its owning loop:
//! intersection keeps the subject's copy where the clip covers that side,
//! difference keeps it where the clip does not. A clip that merely touches
//! the subject's boundary therefore leaves the subject intact.

use super::polygon::{
    point_in_loops, point_in_polygon, point_segment_distance, segment_intersection, signed_area,
    Containment,
};
use crate::context::quantize;
use ahash::AHashMap;
use nalgebra::Point2;

/// A polygon with holes. Outer winds counter-clockwise, holes clockwise.
#[derive(Debug, Clone)]
pub struct Region {
    pub outer: Vec<Point2<f64>>,
    pub holes: Vec<Vec<Point2<f64>>>,
}

impl Region {
    /// Build a region, normalizing windings
    pub fn new(outer: Vec<Point2<f64>>, holes: Vec<Vec<Point2<f64>>>) -> Self {
        let mut region = Self { outer, holes };
        region.normalize_winding();
        region
    }

    pub fn from_outer(outer: Vec<Point2<f64>>) -> Self {
        Self::new(outer, Vec::new())
    }

    fn normalize_winding(&mut self) {
        if signed_area(&self.outer) < 0.0 {
            self.outer.reverse();
        }
        for hole in &mut self.holes {
            if signed_area(hole) > 0.0 {
                hole.reverse();
            }
        }
    }

    /// Net enclosed area (outer minus holes)
    pub fn area(&self) -> f64 {
        signed_area(&self.outer) + self.holes.iter().map(|h| signed_area(h)).sum::<f64>()
    }

    pub fn contains(&self, p: &Point2<f64>, tolerance: f64) -> Containment {
        point_in_loops(p, &self.outer, &self.holes, tolerance)
    }

    /// All boundary loops with their natural winding, outer first
    fn loops(&self) -> impl Iterator<Item = &[Point2<f64>]> {
        std::iter::once(self.outer.as_slice()).chain(self.holes.iter().map(|h| h.as_slice()))
    }
}

/// Fate of a sub-edge whose midpoint lies on the other region's boundary
#[derive(Clone, Copy)]
enum BoundaryRule {
    /// Shared-boundary sub-edges never survive
    Drop,
    /// Survive when the other region's interior covers this loop's inner side
    KeepCovered,
    /// Survive when the other region's interior stays off the inner side
    KeepExposed,
}

#[derive(Clone, Copy)]
struct EdgeRule {
    keep_inside: bool,
    keep_outside: bool,
    boundary: BoundaryRule,
}

/// Regularized subject ∩ clip
pub fn region_intersection(subject: &Region, clip: &Region, tolerance: f64) -> Vec<Region> {
    region_boolean(
        subject,
        clip,
        EdgeRule {
            keep_inside: true,
            keep_outside: false,
            boundary: BoundaryRule::KeepCovered,
        },
        EdgeRule {
            keep_inside: true,
            keep_outside: false,
            boundary: BoundaryRule::Drop,
        },
        false,
        tolerance,
    )
}

/// Regularized subject − clip
pub fn region_difference(subject: &Region, clip: &Region, tolerance: f64) -> Vec<Region> {
    region_boolean(
        subject,
        clip,
        EdgeRule {
            keep_inside: false,
            keep_outside: true,
            boundary: BoundaryRule::KeepExposed,
        },
        EdgeRule {
            keep_inside: true,
            keep_outside: false,
            boundary: BoundaryRule::Drop,
        },
        true,
        tolerance,
    )
}

fn region_boolean(
    subject: &Region,
    clip: &Region,
    subject_rule: EdgeRule,
    clip_rule: EdgeRule,
    reverse_clip: bool,
    tolerance: f64,
) -> Vec<Region> {
    // Directed sub-edges that survive classification
    let mut kept: Vec<(Point2<f64>, Point2<f64>)> = Vec::new();

    for loop_pts in subject.loops() {
        collect_kept_subedges(loop_pts, clip, subject_rule, false, tolerance, &mut kept);
    }
    for loop_pts in clip.loops() {
        collect_kept_subedges(loop_pts, subject, clip_rule, reverse_clip, tolerance, &mut kept);
    }

    let loops = chain_directed(kept, tolerance);
    assemble_oriented(loops, min_area(tolerance))
}

fn min_area(tolerance: f64) -> f64 {
    let q = tolerance * 10.0;
    q * q
}

fn collect_kept_subedges(
    loop_pts: &[Point2<f64>],
    other: &Region,
    rule: EdgeRule,
    reverse: bool,
    tolerance: f64,
    kept: &mut Vec<(Point2<f64>, Point2<f64>)>,
) {
    let n = loop_pts.len();
    for i in 0..n {
        let a = loop_pts[i];
        let b = loop_pts[(i + 1) % n];
        let len2 = (b - a).norm_squared();
        if len2 < tolerance * tolerance {
            continue;
        }
        let mut params = vec![0.0, 1.0];
        for other_loop in other.loops() {
            let m = other_loop.len();
            for j in 0..m {
                let c = other_loop[j];
                let d = other_loop[(j + 1) % m];
                if let Some((t, _)) = segment_intersection(&a, &b, &c, &d, tolerance) {
                    params.push(t);
                }
                // Collinear overlaps yield no crossing; split at the other
                // loop's vertices that land on this edge instead
                if point_segment_distance(&c, &a, &b) < tolerance {
                    params.push(((c - a).dot(&(b - a)) / len2).clamp(0.0, 1.0));
                }
            }
        }
        params.sort_by(|x, y| x.partial_cmp(y).unwrap());
        params.dedup_by(|x, y| (*x - *y).abs() < 1e-12);

        for w in params.windows(2) {
            let (t0, t1) = (w[0], w[1]);
            let p0 = a + (b - a) * t0;
            let p1 = a + (b - a) * t1;
            if (p1 - p0).norm() < tolerance {
                continue;
            }
            let mid = a + (b - a) * ((t0 + t1) / 2.0);
            let keep = match other.contains(&mid, tolerance) {
                Containment::Inside => rule.keep_inside,
                Containment::Outside => rule.keep_outside,
                Containment::OnBoundary => {
                    boundary_side_keep(rule.boundary, &p0, &p1, &mid, other, tolerance)
                }
            };
            if keep {
                if reverse {
                    kept.push((p1, p0));
                } else {
                    kept.push((p0, p1));
                }
            }
        }
    }
}

/// Resolve a shared-boundary sub-edge. The owning region's interior lies
/// to the left of its directed boundary (outers wind CCW, holes CW), so a
/// sample offset that way tells whether the other region covers the same
/// side.
fn boundary_side_keep(
    rule: BoundaryRule,
    p0: &Point2<f64>,
    p1: &Point2<f64>,
    mid: &Point2<f64>,
    other: &Region,
    tolerance: f64,
) -> bool {
    let dir = (p1 - p0).normalize();
    let offset = tolerance * 10.0;
    let inward = Point2::new(mid.x - dir.y * offset, mid.y + dir.x * offset);
    let covered = matches!(other.contains(&inward, tolerance), Containment::Inside);
    match rule {
        BoundaryRule::Drop => false,
        BoundaryRule::KeepCovered => covered,
        BoundaryRule::KeepExposed => !covered,
    }
}

type Key2 = (i64, i64);

fn key2(p: &Point2<f64>, quantum: f64) -> Key2 {
    (quantize(p.x, quantum), quantize(p.y, quantum))
}

/// Chain directed edges into closed loops by matching quantized endpoints.
/// Open chains are abandoned; the caller treats lost area as absorbed.
fn chain_directed(edges: Vec<(Point2<f64>, Point2<f64>)>, tolerance: f64) -> Vec<Vec<Point2<f64>>> {
    let quantum = tolerance * 10.0;
    let mut by_start: AHashMap<Key2, Vec<usize>> = AHashMap::new();
    for (i, (start, _)) in edges.iter().enumerate() {
        by_start.entry(key2(start, quantum)).or_default().push(i);
    }

    let mut used = vec![false; edges.len()];
    let mut loops = Vec::new();

    for first in 0..edges.len() {
        if used[first] {
            continue;
        }
        let start_key = key2(&edges[first].0, quantum);
        let mut chain = vec![edges[first].0];
        let mut cursor = key2(&edges[first].1, quantum);
        used[first] = true;

        let mut closed = cursor == start_key;
        while !closed {
            let Some(candidates) = by_start.get(&cursor) else {
                break;
            };
            let Some(&next) = candidates.iter().find(|&&i| !used[i]) else {
                break;
            };
            used[next] = true;
            chain.push(edges[next].0);
            cursor = key2(&edges[next].1, quantum);
            closed = cursor == start_key;
            if chain.len() > edges.len() {
                break;
            }
        }
        if closed && chain.len() >= 3 {
            loops.push(chain);
        }
    }
    loops
}

/// Group oriented loops into regions: counter-clockwise loops are outers,
/// clockwise loops are holes of the smallest outer containing them.
fn assemble_oriented(loops: Vec<Vec<Point2<f64>>>, min_area: f64) -> Vec<Region> {
    let mut outers: Vec<(Vec<Point2<f64>>, f64)> = Vec::new();
    let mut holes: Vec<Vec<Point2<f64>>> = Vec::new();

    for l in loops {
        let area = signed_area(&l);
        if area.abs() < min_area {
            continue;
        }
        if area > 0.0 {
            outers.push((l, area));
        } else {
            holes.push(l);
        }
    }

    let mut regions: Vec<Region> = outers
        .iter()
        .map(|(outer, _)| Region {
            outer: outer.clone(),
            holes: Vec::new(),
        })
        .collect();

    for hole in holes {
        let probe = hole[0];
        let mut best: Option<(usize, f64)> = None;
        for (i, (outer, area)) in outers.iter().enumerate() {
            if point_in_polygon(&probe, outer) {
                match best {
                    Some((_, best_area)) if best_area <= *area => {}
                    _ => best = Some((i, *area)),
                }
            }
        }
        if let Some((i, _)) = best {
            regions[i].holes.push(hole);
        }
    }
    regions
}

/// Nest undirected loops (from plane sectioning) into regions using
/// containment parity, normalizing windings.
pub(crate) fn nest_loops(loops: Vec<Vec<Point2<f64>>>, min_area: f64) -> Vec<Region> {
    let mut loops: Vec<Vec<Point2<f64>>> = loops
        .into_iter()
        .filter(|l| l.len() >= 3 && signed_area(l).abs() >= min_area)
        .collect();
    // Largest first so parents precede children
    loops.sort_by(|a, b| {
        signed_area(b)
            .abs()
            .partial_cmp(&signed_area(a).abs())
            .unwrap()
    });

    let depth: Vec<usize> = loops
        .iter()
        .enumerate()
        .map(|(i, l)| {
            loops
                .iter()
                .enumerate()
                .filter(|(j, other)| *j != i && point_in_polygon(&l[0], other))
                .count()
        })
        .collect();

    let mut regions: Vec<Region> = Vec::new();
    let mut region_of: Vec<Option<usize>> = vec![None; loops.len()];

    for i in 0..loops.len() {
        if depth[i] % 2 == 0 {
            region_of[i] = Some(regions.len());
            regions.push(Region::new(loops[i].clone(), Vec::new()));
        }
    }
    for i in 0..loops.len() {
        if depth[i] % 2 == 1 {
            // Attach to the smallest even-depth loop containing it
            let mut best: Option<(usize, f64)> = None;
            for j in 0..loops.len() {
                if depth[j] % 2 == 0 && point_in_polygon(&loops[i][0], &loops[j]) {
                    let area = signed_area(&loops[j]).abs();
                    match best {
                        Some((_, a)) if a <= area => {}
                        _ => best = Some((j, area)),
                    }
                }
            }
            if let Some((j, _)) = best {
                if let Some(r) = region_of[j] {
                    let mut hole = loops[i].clone();
                    if signed_area(&hole) > 0.0 {
                        hole.reverse();
                    }
                    regions[r].holes.push(hole);
                }
            }
        }
    }
    regions
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(cx: f64, cy: f64, half: f64) -> Vec<Point2<f64>> {
        vec![
            Point2::new(cx - half, cy - half),
            Point2::new(cx + half, cy - half),
            Point2::new(cx + half, cy + half),
            Point2::new(cx - half, cy + half),
        ]
    }

    #[test]
    fn test_intersection_of_overlapping_squares() {
        let a = Region::from_outer(square(0.0, 0.0, 1.0));
        let b = Region::from_outer(square(1.0, 0.0, 1.0));
        let result = region_intersection(&a, &b, 1e-6);
        assert_eq!(result.len(), 1);
        assert_relative_eq!(result[0].area(), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_difference_cuts_notch() {
        let a = Region::from_outer(square(0.0, 0.0, 1.0));
        let b = Region::from_outer(square(1.0, 0.0, 1.0));
        let result = region_difference(&a, &b, 1e-6);
        assert_eq!(result.len(), 1);
        assert_relative_eq!(result[0].area(), 2.0, epsilon = 1e-9);
        assert!(result[0].holes.is_empty());
    }

    #[test]
    fn test_difference_with_interior_clip_creates_hole() {
        let a = Region::from_outer(square(0.0, 0.0, 2.0));
        let b = Region::from_outer(square(0.0, 0.0, 1.0));
        let result = region_difference(&a, &b, 1e-6);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].holes.len(), 1);
        assert_relative_eq!(result[0].area(), 16.0 - 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_disjoint_intersection_is_empty() {
        let a = Region::from_outer(square(0.0, 0.0, 1.0));
        let b = Region::from_outer(square(5.0, 0.0, 1.0));
        assert!(region_intersection(&a, &b, 1e-6).is_empty());
    }

    #[test]
    fn test_difference_of_identical_squares_is_empty() {
        let a = Region::from_outer(square(0.0, 0.0, 1.0));
        let b = Region::from_outer(square(0.0, 0.0, 1.0));
        assert!(region_difference(&a, &b, 1e-6).is_empty());
    }

    #[test]
    fn test_intersection_of_identical_squares_is_identity() {
        let a = Region::from_outer(square(0.0, 0.0, 1.0));
        let b = Region::from_outer(square(0.0, 0.0, 1.0));
        let result = region_intersection(&a, &b, 1e-6);
        assert_eq!(result.len(), 1);
        assert_relative_eq!(result[0].area(), 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_difference_with_tangent_clip_is_identity() {
        // Clip shares only the edge y = 1 with the subject; the overlap
        // has zero area, so nothing may be removed
        let a = Region::from_outer(square(0.0, 0.0, 1.0));
        let b = Region::from_outer(square(0.0, 2.0, 1.0));
        let result = region_difference(&a, &b, 1e-6);
        assert_eq!(result.len(), 1);
        assert_relative_eq!(result[0].area(), 4.0, epsilon = 1e-9);
        assert!(result[0].holes.is_empty());
    }

    #[test]
    fn test_intersection_with_tangent_clip_is_empty() {
        let a = Region::from_outer(square(0.0, 0.0, 1.0));
        let b = Region::from_outer(square(0.0, 2.0, 1.0));
        assert!(region_intersection(&a, &b, 1e-6).is_empty());
    }

    #[test]
    fn test_difference_with_flush_clip_keeps_uncovered_half() {
        // Clip covers the subject's top half exactly, sharing three
        // boundary edges with it
        let a = Region::from_outer(square(0.0, 0.0, 2.0));
        let b = Region::from_outer(vec![
            Point2::new(-2.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 2.0),
            Point2::new(-2.0, 2.0),
        ]);
        let result = region_difference(&a, &b, 1e-6);
        assert_eq!(result.len(), 1);
        assert_relative_eq!(result[0].area(), 8.0, epsilon = 1e-9);
        assert!(result[0].holes.is_empty());
    }

    #[test]
    fn test_nest_loops_ring() {
        let outer = square(0.0, 0.0, 2.0);
        let inner = square(0.0, 0.0, 1.0);
        let regions = nest_loops(vec![outer, inner], 1e-10);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].holes.len(), 1);
        assert_relative_eq!(regions[0].area(), 12.0, epsilon = 1e-9);
    }
}
