// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Solidkit Contributors

//! Face fragment classification against the other body.
//!
//! Each face is cut, in its own plane's 2D coordinates, by the other
//! body's cross-section on that plane. The fragments are tagged:
//! coplanar overlap is `OnSame`, the part under the section interior is
//! `Inside`, the rest is `Outside`.

use super::section::section_body;
use crate::geom::{region_difference, region_intersection, Plane, Region};
use crate::topo::{BodyId, FaceId, TopologyModel};

/// Classification of a face fragment relative to the other body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PieceClass {
    /// Fragment is inside the other solid
    Inside,
    /// Fragment is outside the other solid
    Outside,
    /// Fragment lies on the other solid's boundary
    OnSame,
}

/// Which input body a piece came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PieceSource {
    A,
    B,
}

/// A face fragment: the pipeline's internal exchange format.
/// Held in memory for the duration of one boolean call only.
#[derive(Debug, Clone)]
pub struct FacePiece {
    pub source_face: FaceId,
    pub source: PieceSource,
    /// Plane the fragment lies on (the source face's effective plane)
    pub plane: Plane,
    /// Outer polygon + holes in `plane`'s 2D frame
    pub region: Region,
    pub class: PieceClass,
    /// `OnSame` only: the coinciding boundary faces have opposed normals
    /// (the other body touches from outside)
    pub opposed: bool,
    /// Subtract-only: stitch this piece with opposite orientation
    pub flip: bool,
}

impl FacePiece {
    pub fn outer_points_3d(&self) -> Vec<nalgebra::Point3<f64>> {
        self.region
            .outer
            .iter()
            .map(|uv| self.plane.unproject(uv))
            .collect()
    }
}

/// Classify every face of `body` against `other`, producing tagged
/// fragments
pub fn classify_body_faces(
    model: &TopologyModel,
    body: BodyId,
    other: BodyId,
    source: PieceSource,
) -> Vec<FacePiece> {
    let tol = model.context().tol.length;
    let mut pieces = Vec::new();

    for face in model.body_faces(body) {
        let plane = model.face_plane(face);
        let face_region = model.face_region_in_plane(face, &plane);
        if face_region.outer.len() < 3 {
            continue;
        }

        let profile = section_body(model, other, &plane);

        let push =
            |out: &mut Vec<FacePiece>, region: Region, class: PieceClass, opposed: bool| {
                out.push(FacePiece {
                    source_face: face,
                    source,
                    plane,
                    region,
                    class,
                    opposed,
                    flip: false,
                });
            };

        // Boundary overlap first: coplanar faces of the other body.
        // Whether the coinciding normals agree or oppose decides the
        // piece's fate in selection.
        let mut remaining = vec![face_region];
        for (overlaps, opposed) in [
            (&profile.coplanar_same, false),
            (&profile.coplanar_opposite, true),
        ] {
            for (_, overlap) in overlaps {
                let mut next = Vec::new();
                for r in &remaining {
                    for shared in region_intersection(r, overlap, tol) {
                        push(&mut pieces, shared, PieceClass::OnSame, opposed);
                    }
                    next.extend(region_difference(r, overlap, tol));
                }
                remaining = next;
            }
        }

        // Interior cross-section: inside fragments
        for section in &profile.regions {
            let mut next = Vec::new();
            for r in &remaining {
                for inner in region_intersection(r, section, tol) {
                    push(&mut pieces, inner, PieceClass::Inside, false);
                }
                next.extend(region_difference(r, section, tol));
            }
            remaining = next;
        }

        // Whatever is left is outside the other body
        for r in remaining {
            push(&mut pieces, r, PieceClass::Outside, false);
        }
    }

    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::make_box;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector3};

    fn piece_area(pieces: &[FacePiece], class: PieceClass) -> f64 {
        pieces
            .iter()
            .filter(|p| p.class == class)
            .map(|p| p.region.area())
            .sum()
    }

    #[test]
    fn test_disjoint_bodies_classify_all_outside() {
        let mut model = TopologyModel::new();
        let a = make_box(
            &mut model,
            Point3::new(-5.0, 0.0, 0.0),
            Vector3::new(2.0, 2.0, 2.0),
        );
        let b = make_box(
            &mut model,
            Point3::new(5.0, 0.0, 0.0),
            Vector3::new(2.0, 2.0, 2.0),
        );

        let pieces = classify_body_faces(&model, a, b, PieceSource::A);
        assert_eq!(pieces.len(), 6);
        assert!(pieces.iter().all(|p| p.class == PieceClass::Outside));
    }

    #[test]
    fn test_half_overlapping_boxes_split_faces() {
        let mut model = TopologyModel::new();
        // B swallows A's +x half (oversized so no planes coincide)
        let a = make_box(&mut model, Point3::origin(), Vector3::new(2.0, 2.0, 2.0));
        let b = make_box(
            &mut model,
            Point3::new(1.0, 0.0, 0.0),
            Vector3::new(2.0, 4.0, 4.0),
        );

        let pieces = classify_body_faces(&model, a, b, PieceSource::A);

        // A's +x face (area 4) is fully inside B; half of each
        // perpendicular face (area 2 each, 4 faces) is inside too
        assert_relative_eq!(piece_area(&pieces, PieceClass::Inside), 12.0, epsilon = 1e-6);
        assert_relative_eq!(
            piece_area(&pieces, PieceClass::Outside),
            12.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_self_classification_is_all_on_same() {
        let mut model = TopologyModel::new();
        let a = make_box(&mut model, Point3::origin(), Vector3::new(2.0, 2.0, 2.0));
        let pieces = classify_body_faces(&model, a, a, PieceSource::A);

        assert_eq!(pieces.len(), 6);
        assert!(pieces
            .iter()
            .all(|p| p.class == PieceClass::OnSame && !p.opposed));
    }

    #[test]
    fn test_touching_boxes_mark_opposed_overlap() {
        let mut model = TopologyModel::new();
        // B sits on top of A; A's top face coincides with B's bottom face
        let a = make_box(&mut model, Point3::origin(), Vector3::new(2.0, 2.0, 2.0));
        let b = make_box(
            &mut model,
            Point3::new(0.0, 0.0, 2.0),
            Vector3::new(2.0, 2.0, 2.0),
        );

        let pieces = classify_body_faces(&model, a, b, PieceSource::A);
        let on_same: Vec<_> = pieces
            .iter()
            .filter(|p| p.class == PieceClass::OnSame)
            .collect();
        assert_eq!(on_same.len(), 1);
        assert!(on_same[0].opposed);
        assert_relative_eq!(on_same[0].region.area(), 4.0, epsilon = 1e-6);
        assert_relative_eq!(piece_area(&pieces, PieceClass::Outside), 20.0, epsilon = 1e-6);
    }
}
