// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Solidkit Contributors

//! Primitive solid builders.
//!
//! Solids are assembled as face pieces and fed through the boolean
//! stitcher, which handles welding and twin recovery. Outer loops wind
//! counter-clockwise about each face's outward normal.

use crate::boolean::{stitch_pieces, FacePiece, PieceClass, PieceSource};
use crate::geom::{signed_area, Plane, Region};
use crate::topo::{BodyId, FaceId, TopologyModel};
use nalgebra::{Point2, Point3, Vector3};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrimitiveError {
    #[error("profile is degenerate (fewer than 3 distinct points or no area)")]
    DegenerateProfile,
    #[error("extrusion distance {0} is below tolerance")]
    DegenerateDistance(f64),
}

/// Axis-aligned box centered at `center`.
///
/// Panics if any component of `size` is not positive; that is a contract
/// violation, not a modeling failure.
pub fn make_box(model: &mut TopologyModel, center: Point3<f64>, size: Vector3<f64>) -> BodyId {
    assert!(
        size.x > 0.0 && size.y > 0.0 && size.z > 0.0,
        "box size must be positive"
    );
    let h = size / 2.0;
    let corner = |sx: f64, sy: f64, sz: f64| {
        Point3::new(center.x + sx * h.x, center.y + sy * h.y, center.z + sz * h.z)
    };

    // Each face: four corners in cyclic order + outward normal
    let faces: [([Point3<f64>; 4], Vector3<f64>); 6] = [
        (
            [
                corner(1.0, -1.0, -1.0),
                corner(1.0, 1.0, -1.0),
                corner(1.0, 1.0, 1.0),
                corner(1.0, -1.0, 1.0),
            ],
            Vector3::x(),
        ),
        (
            [
                corner(-1.0, -1.0, -1.0),
                corner(-1.0, -1.0, 1.0),
                corner(-1.0, 1.0, 1.0),
                corner(-1.0, 1.0, -1.0),
            ],
            -Vector3::x(),
        ),
        (
            [
                corner(-1.0, 1.0, -1.0),
                corner(-1.0, 1.0, 1.0),
                corner(1.0, 1.0, 1.0),
                corner(1.0, 1.0, -1.0),
            ],
            Vector3::y(),
        ),
        (
            [
                corner(-1.0, -1.0, -1.0),
                corner(1.0, -1.0, -1.0),
                corner(1.0, -1.0, 1.0),
                corner(-1.0, -1.0, 1.0),
            ],
            -Vector3::y(),
        ),
        (
            [
                corner(-1.0, -1.0, 1.0),
                corner(1.0, -1.0, 1.0),
                corner(1.0, 1.0, 1.0),
                corner(-1.0, 1.0, 1.0),
            ],
            Vector3::z(),
        ),
        (
            [
                corner(-1.0, -1.0, -1.0),
                corner(-1.0, 1.0, -1.0),
                corner(1.0, 1.0, -1.0),
                corner(1.0, -1.0, -1.0),
            ],
            -Vector3::z(),
        ),
    ];

    let pieces: Vec<FacePiece> = faces
        .iter()
        .map(|(points, normal)| piece_from_points(points, *normal))
        .collect();

    let outcome = stitch_pieces(model, &pieces);
    match outcome.body {
        Some(body) => body,
        None => unreachable!("box faces cannot degenerate"),
    }
}

/// Extrude a closed 2D profile along `plane`'s normal by `distance`.
///
/// The profile is given in `plane`'s 2D frame; its winding is normalized,
/// the caller need not orient it.
pub fn extrude_polygon(
    model: &mut TopologyModel,
    profile: &[Point2<f64>],
    plane: &Plane,
    distance: f64,
) -> Result<BodyId, PrimitiveError> {
    let ctx = *model.context();
    if distance.abs() <= ctx.tol.length {
        return Err(PrimitiveError::DegenerateDistance(distance));
    }

    let mut profile: Vec<Point2<f64>> = profile.to_vec();
    profile.dedup_by(|a, b| ctx.same_length((*a - *b).norm(), 0.0));
    if profile.len() >= 2 && ctx.same_length((profile[0] - *profile.last().unwrap()).norm(), 0.0) {
        profile.pop();
    }
    if profile.len() < 3 || signed_area(&profile).abs() < ctx.min_face_area() {
        return Err(PrimitiveError::DegenerateProfile);
    }
    // Counter-clockwise about the extrusion direction
    let normal = if distance > 0.0 {
        plane.normal
    } else {
        -plane.normal
    };
    let ccw_about_extrusion = (signed_area(&profile) > 0.0) == (distance > 0.0);
    if !ccw_about_extrusion {
        profile.reverse();
    }

    let shift = plane.normal * distance;

    let base: Vec<Point3<f64>> = profile.iter().map(|uv| plane.unproject(uv)).collect();
    let lid: Vec<Point3<f64>> = base.iter().map(|p| p + shift).collect();

    let mut pieces = Vec::with_capacity(profile.len() + 2);
    pieces.push(piece_from_points(&base, -normal));
    pieces.push(piece_from_points(&lid, normal));

    let n = base.len();
    for i in 0..n {
        let (a, b) = (base[i], base[(i + 1) % n]);
        let edge = b - a;
        let outward = edge.cross(&normal);
        let quad = [a, b, b + shift, a + shift];
        pieces.push(piece_from_points(&quad, outward.normalize()));
    }

    let outcome = stitch_pieces(model, &pieces);
    outcome.body.ok_or(PrimitiveError::DegenerateProfile)
}

/// A face piece from coplanar 3D points in cyclic order; the region
/// normalization orients the loop counter-clockwise about `normal`
fn piece_from_points(points: &[Point3<f64>], normal: Vector3<f64>) -> FacePiece {
    let mut center = Vector3::zeros();
    for p in points {
        center += p.coords;
    }
    center /= points.len() as f64;
    let plane = Plane::from_normal(Point3::from(center), normal);

    let outer: Vec<Point2<f64>> = points.iter().map(|p| plane.project(p)).collect();
    FacePiece {
        source_face: FaceId::NULL,
        source: PieceSource::A,
        plane,
        region: Region::from_outer(outer),
        class: PieceClass::Outside,
        opposed: false,
        flip: false,
    }
}
