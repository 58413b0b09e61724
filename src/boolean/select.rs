// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Solidkit Contributors

//! Operation-specific retention of classified face pieces, plus
//! de-duplication keyed on tolerance-quantized plane and geometry keys.

use super::classify::{FacePiece, PieceClass, PieceSource};
use super::BooleanOp;
use crate::context::{quantize, NumericContext};
use crate::geom::{point_in_polygon, polygon_centroid, segment_intersection, BoundingBox};
use ahash::{AHashMap, AHashSet};
use nalgebra::Vector3;

/// Quantum for normal components in plane/geometry keys
const NORMAL_QUANTUM: f64 = 1e-6;

type Key3 = (i64, i64, i64);

/// Canonicalized plane identity: sign-normalized quantized unit normal +
/// quantized signed distance from the origin. Identifies pieces on the
/// same infinite plane regardless of polygon shape or normal sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaneKey {
    normal: Key3,
    distance: i64,
}

pub fn plane_key(piece: &FacePiece, ctx: &NumericContext) -> PlaneKey {
    let mut n = piece.plane.normal;
    let mut d = piece.plane.origin_distance();
    // Flip so the first non-negligible normal component is positive
    let flip = if n.x.abs() > NORMAL_QUANTUM {
        n.x < 0.0
    } else if n.y.abs() > NORMAL_QUANTUM {
        n.y < 0.0
    } else {
        n.z < 0.0
    };
    if flip {
        n = -n;
        d = -d;
    }
    PlaneKey {
        normal: (
            quantize(n.x, NORMAL_QUANTUM),
            quantize(n.y, NORMAL_QUANTUM),
            quantize(n.z, NORMAL_QUANTUM),
        ),
        distance: quantize(d, ctx.weld_quantum()),
    }
}

/// Order- and direction-independent identity of a piece's exact geometry:
/// sorted quantized vertex multiset + sign-normalized normal
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GeometryKey {
    vertices: Vec<Key3>,
    normal: Key3,
}

pub fn geometry_key(piece: &FacePiece, ctx: &NumericContext) -> GeometryKey {
    let mut vertices: Vec<Key3> = piece
        .outer_points_3d()
        .iter()
        .map(|p| ctx.position_key(p))
        .collect();
    vertices.sort_unstable();
    vertices.dedup();

    let key = plane_key(piece, ctx);
    GeometryKey {
        vertices,
        normal: key.normal,
    }
}

/// Apply the operation's retention rules, then de-duplicate and
/// geometrically filter. Dropped-piece counts land in `warnings`.
pub fn select_pieces(
    op: BooleanOp,
    pieces_a: Vec<FacePiece>,
    pieces_b: Vec<FacePiece>,
    bbox_a: &BoundingBox,
    bbox_b: &BoundingBox,
    ctx: &NumericContext,
    warnings: &mut Vec<String>,
) -> Vec<FacePiece> {
    let mut kept = match op {
        BooleanOp::Union => select_union(pieces_a, pieces_b, ctx),
        BooleanOp::Intersect => select_intersect(pieces_a, pieces_b, bbox_a, bbox_b, ctx, warnings),
        BooleanOp::Subtract => select_subtract(pieces_a, pieces_b, bbox_a, bbox_b, ctx, warnings),
    };
    dedup_exact(&mut kept, ctx);
    kept
}

fn select_union(
    pieces_a: Vec<FacePiece>,
    pieces_b: Vec<FacePiece>,
    ctx: &NumericContext,
) -> Vec<FacePiece> {
    // B's boundary-overlap pieces participate in wall cancellation but
    // are dropped afterwards so the shared boundary is not duplicated
    let mut kept: Vec<FacePiece> = pieces_a
        .into_iter()
        .chain(pieces_b)
        .filter(|p| matches!(p.class, PieceClass::Outside | PieceClass::OnSame))
        .collect();

    // Coplanar opposite-facing overlapping pairs are internal walls of
    // touching solids: remove both sides
    let mut by_plane: AHashMap<PlaneKey, Vec<usize>> = AHashMap::new();
    for (i, piece) in kept.iter().enumerate() {
        by_plane.entry(plane_key(piece, ctx)).or_default().push(i);
    }

    let mut removed = vec![false; kept.len()];
    for indices in by_plane.values() {
        for (x, &i) in indices.iter().enumerate() {
            for &j in &indices[x + 1..] {
                if removed[i] || removed[j] {
                    continue;
                }
                let (a, b) = (&kept[i], &kept[j]);
                if a.source == b.source {
                    continue;
                }
                if a.plane.normal.dot(&b.plane.normal) >= -0.5 {
                    continue;
                }
                if pieces_overlap_2d(a, b, ctx) {
                    removed[i] = true;
                    removed[j] = true;
                }
            }
        }
    }

    let mut idx = 0;
    kept.retain(|p| {
        let keep = !removed[idx]
            && !(p.source == PieceSource::B && p.class == PieceClass::OnSame);
        idx += 1;
        keep
    });
    kept
}

fn select_intersect(
    pieces_a: Vec<FacePiece>,
    pieces_b: Vec<FacePiece>,
    bbox_a: &BoundingBox,
    bbox_b: &BoundingBox,
    ctx: &NumericContext,
    warnings: &mut Vec<String>,
) -> Vec<FacePiece> {
    let common = bbox_a.intersection(bbox_b);
    let mut dropped = 0usize;

    let kept: Vec<FacePiece> = pieces_a
        .into_iter()
        .chain(pieces_b)
        .filter(|p| matches!(p.class, PieceClass::Inside | PieceClass::OnSame))
        .filter_map(|p| match clip_piece_to_box(p, &common, ctx) {
            Some(p) => Some(p),
            None => {
                dropped += 1;
                None
            }
        })
        .collect();

    if dropped > 0 {
        warnings.push(format!(
            "intersect: dropped {dropped} piece(s) outside the common bounding box"
        ));
    }
    kept
}

fn select_subtract(
    pieces_a: Vec<FacePiece>,
    pieces_b: Vec<FacePiece>,
    bbox_a: &BoundingBox,
    bbox_b: &BoundingBox,
    ctx: &NumericContext,
    warnings: &mut Vec<String>,
) -> Vec<FacePiece> {
    let cap_axis = subtract_cap_axis(bbox_a, bbox_b);
    let mut dropped = 0usize;

    // A boundary piece coinciding with a same-facing tool face has tool
    // interior just beneath it; it goes away with the removed material.
    // An opposed overlap means the tool only touches from outside.
    let mut kept: Vec<FacePiece> = pieces_a
        .into_iter()
        .filter(|p| match p.class {
            PieceClass::Outside => true,
            PieceClass::OnSame => p.opposed,
            PieceClass::Inside => false,
        })
        .collect();

    for mut piece in pieces_b {
        if piece.class != PieceClass::Inside {
            continue;
        }
        // The tool's interior walls face into the cavity
        piece.flip = true;

        // Holes only make sense on the cap of the cut, never on its side
        // walls
        if dominant_axis(&piece.plane.normal) != cap_axis {
            piece.region.holes.clear();
        }

        match clamp_piece_to_box(piece, bbox_a, ctx) {
            Some(p) => kept.push(p),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        warnings.push(format!(
            "subtract: dropped {dropped} tool piece(s) collapsing outside the target"
        ));
    }
    kept
}

/// Axis along which the tool's box extends beyond the target's: the cut
/// direction. Z when the tool is fully enclosed.
fn subtract_cap_axis(bbox_target: &BoundingBox, bbox_tool: &BoundingBox) -> usize {
    let overhang = bbox_tool.overhang(bbox_target);
    if overhang.x <= 0.0 && overhang.y <= 0.0 && overhang.z <= 0.0 {
        return 2;
    }
    dominant_axis(&overhang)
}

fn dominant_axis(v: &Vector3<f64>) -> usize {
    let (x, y, z) = (v.x.abs(), v.y.abs(), v.z.abs());
    if x >= y && x >= z {
        0
    } else if y >= z {
        1
    } else {
        2
    }
}

/// Exclude vertices outside the box (guards against residual
/// misclassification); drop the piece if fewer than three survive
fn clip_piece_to_box(
    mut piece: FacePiece,
    bbox: &BoundingBox,
    ctx: &NumericContext,
) -> Option<FacePiece> {
    let tolerance = ctx.weld_quantum();
    let keep_2d = |poly: &[nalgebra::Point2<f64>]| {
        poly.iter()
            .filter(|uv| bbox.contains(&piece.plane.unproject(uv), tolerance))
            .cloned()
            .collect::<Vec<_>>()
    };

    let outer = keep_2d(&piece.region.outer);
    if outer.len() < 3 {
        return None;
    }
    let holes = piece
        .region
        .holes
        .iter()
        .map(|h| keep_2d(h))
        .filter(|h| h.len() >= 3)
        .collect();
    piece.region.outer = outer;
    piece.region.holes = holes;
    Some(piece)
}

/// Clamp every vertex into the target's exact box; drop the piece if the
/// clamped polygon degenerates below the area threshold
fn clamp_piece_to_box(
    mut piece: FacePiece,
    bbox: &BoundingBox,
    ctx: &NumericContext,
) -> Option<FacePiece> {
    let clamp_2d = |poly: &[nalgebra::Point2<f64>]| {
        poly.iter()
            .map(|uv| piece.plane.project(&bbox.clamp(&piece.plane.unproject(uv))))
            .collect::<Vec<_>>()
    };

    let outer = clamp_2d(&piece.region.outer);
    if crate::geom::signed_area(&outer).abs() < ctx.min_face_area() {
        return None;
    }
    let holes = piece.region.holes.iter().map(|h| clamp_2d(h)).collect();
    piece.region.outer = outer;
    piece.region.holes = holes;
    Some(piece)
}

/// Remove exact duplicates (same plane + same polygon, independent of
/// normal sign), preferring pieces sourced from A
fn dedup_exact(pieces: &mut Vec<FacePiece>, ctx: &NumericContext) {
    let mut seen: AHashSet<GeometryKey> = AHashSet::new();
    // A first so its copy wins
    pieces.sort_by_key(|p| match p.source {
        PieceSource::A => 0,
        PieceSource::B => 1,
    });
    pieces.retain(|p| seen.insert(geometry_key(p, ctx)));
}

/// 2D overlap of two coplanar pieces, evaluated in the first piece's frame
fn pieces_overlap_2d(a: &FacePiece, b: &FacePiece, ctx: &NumericContext) -> bool {
    let tolerance = ctx.weld_quantum();
    let b_outer: Vec<nalgebra::Point2<f64>> = b
        .outer_points_3d()
        .iter()
        .map(|p| a.plane.project(p))
        .collect();
    let a_outer = &a.region.outer;

    if point_in_polygon(&polygon_centroid(&b_outer), a_outer)
        || point_in_polygon(&polygon_centroid(a_outer), &b_outer)
    {
        return true;
    }
    if b_outer.iter().any(|p| point_in_polygon(p, a_outer))
        || a_outer.iter().any(|p| point_in_polygon(p, &b_outer))
    {
        return true;
    }
    // Boundary-crossing overlap without vertex containment
    let n = a_outer.len();
    let m = b_outer.len();
    for i in 0..n {
        for j in 0..m {
            if segment_intersection(
                &a_outer[i],
                &a_outer[(i + 1) % n],
                &b_outer[j],
                &b_outer[(j + 1) % m],
                tolerance,
            )
            .is_some()
            {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{Plane, Region};
    use crate::topo::FaceId;
    use nalgebra::{Point2, Point3};

    fn flat_piece(z: f64, normal_z: f64, half: f64, source: PieceSource) -> FacePiece {
        let plane = Plane::from_normal(Point3::new(0.0, 0.0, z), Vector3::new(0.0, 0.0, normal_z));
        let outer = vec![
            Point2::new(-half, -half),
            Point2::new(half, -half),
            Point2::new(half, half),
            Point2::new(-half, half),
        ];
        FacePiece {
            source_face: FaceId(0),
            source,
            plane,
            region: Region::from_outer(outer),
            class: PieceClass::OnSame,
            opposed: false,
            flip: false,
        }
    }

    #[test]
    fn test_plane_key_is_sign_independent() {
        let ctx = NumericContext::default();
        let up = flat_piece(1.0, 1.0, 1.0, PieceSource::A);
        let down = flat_piece(1.0, -1.0, 1.0, PieceSource::B);
        assert_eq!(plane_key(&up, &ctx), plane_key(&down, &ctx));

        let other = flat_piece(2.0, 1.0, 1.0, PieceSource::A);
        assert_ne!(plane_key(&up, &ctx), plane_key(&other, &ctx));
    }

    #[test]
    fn test_geometry_key_ignores_vertex_order() {
        let ctx = NumericContext::default();
        let a = flat_piece(0.0, 1.0, 1.0, PieceSource::A);
        let mut b = flat_piece(0.0, 1.0, 1.0, PieceSource::B);
        b.region.outer.rotate_left(2);
        b.region.outer.reverse();
        assert_eq!(geometry_key(&a, &ctx), geometry_key(&b, &ctx));
    }

    #[test]
    fn test_union_cancels_opposed_coplanar_walls() {
        let ctx = NumericContext::default();
        let mut a = flat_piece(1.0, 1.0, 1.0, PieceSource::A);
        a.class = PieceClass::OnSame;
        let mut b = flat_piece(1.0, -1.0, 1.0, PieceSource::B);
        b.class = PieceClass::Outside;

        let mut warnings = Vec::new();
        let kept = select_pieces(
            BooleanOp::Union,
            vec![a],
            vec![b],
            &BoundingBox::new(Point3::new(-1.0, -1.0, 0.0), Point3::new(1.0, 1.0, 1.0)),
            &BoundingBox::new(Point3::new(-1.0, -1.0, 1.0), Point3::new(1.0, 1.0, 2.0)),
            &ctx,
            &mut warnings,
        );
        assert!(kept.is_empty());
    }

    #[test]
    fn test_dedup_prefers_a() {
        let ctx = NumericContext::default();
        let mut a = flat_piece(0.0, 1.0, 1.0, PieceSource::A);
        a.class = PieceClass::OnSame;
        let mut b = flat_piece(0.0, 1.0, 1.0, PieceSource::B);
        b.class = PieceClass::Outside;

        let mut pieces = vec![b, a];
        dedup_exact(&mut pieces, &ctx);
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].source, PieceSource::A);
    }

    #[test]
    fn test_subtract_keeps_on_same_only_when_opposed() {
        let ctx = NumericContext::default();
        // Flush overlap (same-facing normals): tool interior beneath
        let flush = flat_piece(1.0, 1.0, 1.0, PieceSource::A);
        // Tool touching from outside
        let mut touched = flat_piece(0.0, -1.0, 1.0, PieceSource::A);
        touched.opposed = true;

        let bbox = BoundingBox::new(Point3::new(-1.0, -1.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let mut warnings = Vec::new();
        let kept = select_pieces(
            BooleanOp::Subtract,
            vec![flush, touched],
            Vec::new(),
            &bbox,
            &bbox,
            &ctx,
            &mut warnings,
        );
        assert_eq!(kept.len(), 1);
        assert!(kept[0].opposed);
    }

    #[test]
    fn test_subtract_strips_side_wall_holes() {
        let ctx = NumericContext::default();
        let bbox_a = BoundingBox::new(Point3::new(-2.0, -2.0, 0.0), Point3::new(2.0, 2.0, 4.0));
        // Tool protrudes above the target: cut direction Z
        let bbox_b = BoundingBox::new(Point3::new(-1.0, -1.0, 2.0), Point3::new(1.0, 1.0, 6.0));
        assert_eq!(subtract_cap_axis(&bbox_a, &bbox_b), 2);

        // A side wall of the tool (normal along X) carrying a bogus hole
        let plane = Plane::from_normal(Point3::new(1.0, 0.0, 3.0), Vector3::x());
        let outer = vec![
            Point2::new(-1.0, -1.0),
            Point2::new(1.0, -1.0),
            Point2::new(1.0, 1.0),
            Point2::new(-1.0, 1.0),
        ];
        let hole = vec![
            Point2::new(-0.2, -0.2),
            Point2::new(0.2, -0.2),
            Point2::new(0.2, 0.2),
            Point2::new(-0.2, 0.2),
        ];
        let piece = FacePiece {
            source_face: FaceId(0),
            source: PieceSource::B,
            plane,
            region: Region::new(outer, vec![hole]),
            class: PieceClass::Inside,
            opposed: false,
            flip: false,
        };

        let mut warnings = Vec::new();
        let kept = select_pieces(
            BooleanOp::Subtract,
            Vec::new(),
            vec![piece],
            &bbox_a,
            &bbox_b,
            &ctx,
            &mut warnings,
        );
        assert_eq!(kept.len(), 1);
        assert!(kept[0].flip);
        assert!(kept[0].region.holes.is_empty());
    }
}
