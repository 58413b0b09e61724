// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Solidkit Contributors

//! 2D polygon primitives shared by sectioning and clipping

use nalgebra::Point2;

/// Where a point sits relative to a closed region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    Inside,
    Outside,
    OnBoundary,
}

/// Shoelace signed area; positive for counter-clockwise winding
pub fn signed_area(polygon: &[Point2<f64>]) -> f64 {
    let n = polygon.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let a = &polygon[i];
        let b = &polygon[(i + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }
    sum / 2.0
}

/// Area-weighted centroid; falls back to the vertex average for
/// near-degenerate polygons
pub fn polygon_centroid(polygon: &[Point2<f64>]) -> Point2<f64> {
    let area = signed_area(polygon);
    let n = polygon.len();
    if n == 0 {
        return Point2::origin();
    }
    if area.abs() < 1e-12 {
        let mut cx = 0.0;
        let mut cy = 0.0;
        for p in polygon {
            cx += p.x;
            cy += p.y;
        }
        return Point2::new(cx / n as f64, cy / n as f64);
    }
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..n {
        let a = &polygon[i];
        let b = &polygon[(i + 1) % n];
        let cross = a.x * b.y - b.x * a.y;
        cx += (a.x + b.x) * cross;
        cy += (a.y + b.y) * cross;
    }
    Point2::new(cx / (6.0 * area), cy / (6.0 * area))
}

/// Distance from a point to a segment
pub fn point_segment_distance(p: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 < 1e-24 {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    let closest = a + ab * t;
    (p - closest).norm()
}

/// Even-odd crossing test. Boundary points are not handled specially here;
/// use [`point_in_loops`] when on-boundary must be distinguished.
pub fn point_in_polygon(p: &Point2<f64>, polygon: &[Point2<f64>]) -> bool {
    let n = polygon.len();
    let mut inside = false;
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let pi = &polygon[i];
        let pj = &polygon[j];
        if (pi.y > p.y) != (pj.y > p.y) {
            let x = pi.x + (p.y - pi.y) / (pj.y - pi.y) * (pj.x - pi.x);
            if p.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Classify a point against a polygon-with-holes boundary
pub fn point_in_loops(
    p: &Point2<f64>,
    outer: &[Point2<f64>],
    holes: &[Vec<Point2<f64>>],
    tolerance: f64,
) -> Containment {
    for polygon in std::iter::once(outer).chain(holes.iter().map(|h| h.as_slice())) {
        let n = polygon.len();
        for i in 0..n {
            if point_segment_distance(p, &polygon[i], &polygon[(i + 1) % n]) < tolerance {
                return Containment::OnBoundary;
            }
        }
    }
    if !point_in_polygon(p, outer) {
        return Containment::Outside;
    }
    for hole in holes {
        if point_in_polygon(p, hole) {
            return Containment::Outside;
        }
    }
    Containment::Inside
}

/// Segment-segment intersection. Returns (t on ab, u on cd) for a proper
/// crossing; collinear overlaps return `None` (their endpoints are picked
/// up by quantized chaining instead).
pub fn segment_intersection(
    a: &Point2<f64>,
    b: &Point2<f64>,
    c: &Point2<f64>,
    d: &Point2<f64>,
    tolerance: f64,
) -> Option<(f64, f64)> {
    let r = b - a;
    let s = d - c;
    let denom = r.x * s.y - r.y * s.x;
    if denom.abs() < 1e-12 {
        return None;
    }
    let ac = c - a;
    let t = (ac.x * s.y - ac.y * s.x) / denom;
    let u = (ac.x * r.y - ac.y * r.x) / denom;

    // Allow hits slightly past the endpoints so vertex-coincident
    // crossings are not lost to roundoff
    let slack_t = tolerance / r.norm().max(1e-12);
    let slack_u = tolerance / s.norm().max(1e-12);
    if t < -slack_t || t > 1.0 + slack_t || u < -slack_u || u > 1.0 + slack_u {
        return None;
    }
    Some((t.clamp(0.0, 1.0), u.clamp(0.0, 1.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square() -> Vec<Point2<f64>> {
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ]
    }

    #[test]
    fn test_signed_area_winding() {
        let ccw = unit_square();
        assert_relative_eq!(signed_area(&ccw), 1.0, epsilon = 1e-12);

        let cw: Vec<_> = ccw.iter().rev().cloned().collect();
        assert_relative_eq!(signed_area(&cw), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_centroid_of_square() {
        let c = polygon_centroid(&unit_square());
        assert_relative_eq!(c, Point2::new(0.5, 0.5), epsilon = 1e-12);
    }

    #[test]
    fn test_point_in_polygon() {
        let square = unit_square();
        assert!(point_in_polygon(&Point2::new(0.5, 0.5), &square));
        assert!(!point_in_polygon(&Point2::new(1.5, 0.5), &square));
    }

    #[test]
    fn test_point_in_loops_with_hole() {
        let outer = unit_square();
        let hole = vec![
            Point2::new(0.25, 0.25),
            Point2::new(0.75, 0.25),
            Point2::new(0.75, 0.75),
            Point2::new(0.25, 0.75),
        ];
        let holes = vec![hole];
        assert_eq!(
            point_in_loops(&Point2::new(0.1, 0.1), &outer, &holes, 1e-9),
            Containment::Inside
        );
        assert_eq!(
            point_in_loops(&Point2::new(0.5, 0.5), &outer, &holes, 1e-9),
            Containment::Outside
        );
        assert_eq!(
            point_in_loops(&Point2::new(0.25, 0.5), &outer, &holes, 1e-9),
            Containment::OnBoundary
        );
    }

    #[test]
    fn test_segment_intersection_crossing() {
        let (t, u) = segment_intersection(
            &Point2::new(0.0, 0.0),
            &Point2::new(1.0, 1.0),
            &Point2::new(0.0, 1.0),
            &Point2::new(1.0, 0.0),
            1e-9,
        )
        .unwrap();
        assert_relative_eq!(t, 0.5, epsilon = 1e-12);
        assert_relative_eq!(u, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_segment_intersection_parallel_is_none() {
        assert!(segment_intersection(
            &Point2::new(0.0, 0.0),
            &Point2::new(1.0, 0.0),
            &Point2::new(0.0, 1.0),
            &Point2::new(1.0, 1.0),
            1e-9,
        )
        .is_none());
    }
}
