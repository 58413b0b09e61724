// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Solidkit Contributors

//! Planar cross-sections of a body.
//!
//! For a given plane, every face of the body contributes the segments
//! where its interior meets the plane; chaining those segments through
//! tolerance-quantized endpoints yields the closed 2D outline of the
//! solid's cross-section. Faces coplanar with the section plane are
//! reported separately - they are boundary overlap, not interior.

use crate::context::NumericContext;
use crate::geom::{nest_loops, Plane, Region};
use crate::topo::{BodyId, FaceId, TopologyModel};
use ahash::AHashMap;
use nalgebra::{Point2, Point3};

/// Cross-section of a body on a plane, in that plane's 2D frame
pub struct SectionProfile {
    /// Closed interior cross-section regions
    pub regions: Vec<Region>,
    /// Faces lying on the plane with the same normal direction
    pub coplanar_same: Vec<(FaceId, Region)>,
    /// Faces lying on the plane with the opposite normal direction
    pub coplanar_opposite: Vec<(FaceId, Region)>,
}

pub fn section_body(model: &TopologyModel, body: BodyId, plane: &Plane) -> SectionProfile {
    let ctx = *model.context();
    let mut segments: Vec<(Point2<f64>, Point2<f64>)> = Vec::new();
    let mut coplanar_same = Vec::new();
    let mut coplanar_opposite = Vec::new();

    for face in model.body_faces(body) {
        let face_plane = model.face_plane(face);
        let alignment = face_plane.normal.dot(&plane.normal);

        if alignment.abs() > 1.0 - 1e-9 {
            // Parallel. Coplanar faces are boundary overlap; others are
            // irrelevant to this section.
            let sample = model.face_outer_polygon(face);
            let Some(first) = sample.first() else {
                continue;
            };
            if plane.signed_distance(first).abs() < ctx.weld_quantum() {
                let region = model.face_region_in_plane(face, plane);
                if alignment > 0.0 {
                    coplanar_same.push((face, region));
                } else {
                    coplanar_opposite.push((face, region));
                }
            }
            continue;
        }

        let Some((line_point, line_dir)) = face_plane.intersection_line(plane, ctx.tol.angle)
        else {
            continue;
        };

        let mut params = Vec::new();
        for &lp in model.face_loops(face) {
            let points: Vec<Point3<f64>> = model
                .loop_vertices(lp)
                .into_iter()
                .map(|v| model.vertex_position(v))
                .collect();
            collect_crossings(&points, plane, &line_point, &line_dir, &ctx, &mut params);
        }

        params.sort_by(|a, b| a.partial_cmp(b).unwrap());
        params.dedup_by(|a, b| (*a - *b).abs() < ctx.tol.length);
        // Sorted crossings alternate enter/exit along the trace line
        for pair in params.chunks_exact(2) {
            let p0 = line_point + line_dir * pair[0];
            let p1 = line_point + line_dir * pair[1];
            if (p1 - p0).norm() < ctx.weld_quantum() {
                continue;
            }
            segments.push((plane.project(&p0), plane.project(&p1)));
        }
    }

    let loops = chain_segments(segments, ctx.weld_quantum());
    let regions = nest_loops(loops, ctx.min_face_area());

    SectionProfile {
        regions,
        coplanar_same,
        coplanar_opposite,
    }
}

/// Parameters along the trace line where a closed polygon's boundary
/// crosses the plane
fn collect_crossings(
    points: &[Point3<f64>],
    plane: &Plane,
    line_point: &Point3<f64>,
    line_dir: &nalgebra::Vector3<f64>,
    ctx: &NumericContext,
    params: &mut Vec<f64>,
) {
    let n = points.len();
    if n < 3 {
        return;
    }
    let dist: Vec<f64> = points
        .iter()
        .map(|p| {
            let d = plane.signed_distance(p);
            if d.abs() < ctx.tol.length {
                0.0
            } else {
                d
            }
        })
        .collect();

    let param_of = |p: &Point3<f64>| (p - line_point).dot(line_dir);

    for i in 0..n {
        let j = (i + 1) % n;
        let (di, dj) = (dist[i], dist[j]);

        if di == 0.0 {
            // Vertex on the plane: a crossing only when the nearest
            // off-plane neighbors sit on opposite sides (tangency is not
            // a crossing)
            let before = (1..n)
                .map(|k| dist[(i + n - k % n) % n])
                .find(|d| *d != 0.0);
            let after = (1..n).map(|k| dist[(i + k) % n]).find(|d| *d != 0.0);
            if let (Some(b), Some(a)) = (before, after) {
                if b * a < 0.0 {
                    params.push(param_of(&points[i]));
                }
            }
            continue;
        }
        if dj == 0.0 {
            continue; // Handled when j is visited as a zero vertex
        }
        if di * dj < 0.0 {
            let t = di / (di - dj);
            let p = points[i] + (points[j] - points[i]) * t;
            params.push(param_of(&p));
        }
    }
}

type Key2 = (i64, i64);

fn key2(p: &Point2<f64>, quantum: f64) -> Key2 {
    (
        crate::context::quantize(p.x, quantum),
        crate::context::quantize(p.y, quantum),
    )
}

/// Chain undirected segments into closed loops by endpoint matching.
/// Open chains are dropped; they come from numerically inconsistent faces
/// and are absorbed, not fatal.
fn chain_segments(
    segments: Vec<(Point2<f64>, Point2<f64>)>,
    quantum: f64,
) -> Vec<Vec<Point2<f64>>> {
    let mut by_end: AHashMap<Key2, Vec<usize>> = AHashMap::new();
    for (i, (a, b)) in segments.iter().enumerate() {
        by_end.entry(key2(a, quantum)).or_default().push(i);
        by_end.entry(key2(b, quantum)).or_default().push(i);
    }

    let mut used = vec![false; segments.len()];
    let mut loops = Vec::new();

    for first in 0..segments.len() {
        if used[first] {
            continue;
        }
        used[first] = true;
        let (start, mut tip) = segments[first];
        let start_key = key2(&start, quantum);
        let mut chain = vec![start];

        loop {
            let tip_key = key2(&tip, quantum);
            if tip_key == start_key {
                if chain.len() >= 3 {
                    loops.push(chain);
                }
                break;
            }
            chain.push(tip);

            let next = by_end
                .get(&tip_key)
                .and_then(|c| c.iter().copied().find(|&i| !used[i]));
            let Some(next) = next else {
                break; // Open chain: absorbed
            };
            used[next] = true;
            let (a, b) = segments[next];
            tip = if key2(&a, quantum) == tip_key { b } else { a };

            if chain.len() > segments.len() + 1 {
                break;
            }
        }
    }
    loops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::make_box;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    #[test]
    fn test_section_of_box_midplane() {
        let mut model = TopologyModel::new();
        let body = make_box(&mut model, Point3::origin(), Vector3::new(2.0, 2.0, 2.0));

        let plane = Plane::from_normal(Point3::origin(), Vector3::z());
        let profile = section_body(&model, body, &plane);

        assert_eq!(profile.regions.len(), 1);
        assert_relative_eq!(profile.regions[0].area(), 4.0, epsilon = 1e-9);
        assert!(profile.coplanar_same.is_empty());
        assert!(profile.coplanar_opposite.is_empty());
    }

    #[test]
    fn test_section_on_boundary_plane_is_coplanar_overlap() {
        let mut model = TopologyModel::new();
        let body = make_box(&mut model, Point3::origin(), Vector3::new(2.0, 2.0, 2.0));

        // The box's own top plane: the top face is coplanar overlap, the
        // side faces only graze the plane, so no interior regions chain
        let plane = Plane::from_normal(Point3::new(0.0, 0.0, 1.0), Vector3::z());
        let profile = section_body(&model, body, &plane);

        assert!(profile.regions.is_empty());
        assert_eq!(profile.coplanar_same.len(), 1);
        assert!(profile.coplanar_opposite.is_empty());
    }

    #[test]
    fn test_section_misses_disjoint_plane() {
        let mut model = TopologyModel::new();
        let body = make_box(&mut model, Point3::origin(), Vector3::new(2.0, 2.0, 2.0));

        let plane = Plane::from_normal(Point3::new(0.0, 0.0, 5.0), Vector3::z());
        let profile = section_body(&model, body, &plane);
        assert!(profile.regions.is_empty());
        assert!(profile.coplanar_same.is_empty());
    }
}
