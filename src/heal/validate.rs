// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Solidkit Contributors

//! Structural validation of a body's topology.
//!
//! Errors are broken invariants (open loops, asymmetric twins,
//! discontinuous endpoints). Warnings are conditions a consumer may
//! tolerate (missing twins, non-manifold edge use, under-area faces).

use crate::topo::{BodyId, EdgeId, TopologyModel};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

pub fn validate_model(model: &TopologyModel, body: BodyId) -> ValidationReport {
    let mut report = ValidationReport::default();
    let min_area = model.context().min_face_area();
    let mut edge_use: AHashMap<EdgeId, usize> = AHashMap::new();

    for face in model.body_faces(body) {
        let loops = model.face_loops(face);
        if loops.is_empty() {
            report.errors.push(format!("{face:?} has no loops"));
            continue;
        }

        for &lp in loops {
            let walked: Vec<_> = model.loop_half_edges(lp).collect();

            if walked.len() != model.loop_half_edge_count(lp) {
                report.errors.push(format!(
                    "{lp:?} walk visited {} half-edges, expected {}",
                    walked.len(),
                    model.loop_half_edge_count(lp)
                ));
            }
            let closes = walked
                .last()
                .is_some_and(|&last| model.half_edge(last).next == model.loop_(lp).first);
            if !closes {
                report.errors.push(format!("{lp:?} does not close"));
            }

            for pair in walked.windows(2) {
                if model.half_edge_end(pair[0]) != model.half_edge_start(pair[1]) {
                    report.errors.push(format!(
                        "{lp:?}: endpoint of {:?} does not continue into {:?}",
                        pair[0], pair[1]
                    ));
                }
            }

            for &he in &walked {
                *edge_use.entry(model.half_edge(he).edge).or_insert(0) += 1;

                let twin = model.half_edge(he).twin;
                if twin.is_null() {
                    report.warnings.push(format!("{he:?} has no twin"));
                } else if model.half_edge(twin).twin != he {
                    report
                        .errors
                        .push(format!("{he:?}: twin {twin:?} does not point back"));
                }
            }
        }

        if model.loop_half_edge_count(loops[0]) < 3 {
            report
                .errors
                .push(format!("{face:?} outer loop has fewer than 3 half-edges"));
        } else if model.face_area(face) < min_area {
            report.warnings.push(format!("{face:?} is under-area"));
        }
    }

    for (edge, uses) in &edge_use {
        if *uses != 2 {
            report.warnings.push(format!(
                "{edge:?} is used by {uses} half-edge(s), expected 2"
            ));
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::make_box;
    use crate::topo::HalfEdgeId;
    use nalgebra::{Point3, Vector3};

    #[test]
    fn test_clean_box_validates() {
        let mut model = TopologyModel::new();
        let body = make_box(&mut model, Point3::origin(), Vector3::new(2.0, 2.0, 2.0));

        let report = validate_model(&model, body);
        assert!(report.is_valid(), "errors: {:?}", report.errors);
        assert!(report.warnings.is_empty(), "warnings: {:?}", report.warnings);
    }

    #[test]
    fn test_broken_twin_backref_is_an_error() {
        let mut model = TopologyModel::new();
        let body = make_box(&mut model, Point3::origin(), Vector3::new(2.0, 2.0, 2.0));

        let face = model.body_faces(body)[0];
        let lp = model.face_loops(face)[0];
        let he = model.loop_(lp).first;
        let twin = model.half_edge(he).twin;
        model.half_edge_mut(twin).twin = HalfEdgeId::NULL;

        let report = validate_model(&model, body);
        assert!(!report.is_valid());
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("does not point back")));
    }

    #[test]
    fn test_open_sheet_warns_but_passes() {
        use crate::boolean::stitch_pieces;
        use crate::boolean::{FacePiece, PieceClass, PieceSource};
        use crate::geom::{Plane, Region};
        use crate::topo::FaceId;
        use nalgebra::Point2;

        let mut model = TopologyModel::new();
        let piece = FacePiece {
            source_face: FaceId::NULL,
            source: PieceSource::A,
            plane: Plane::from_normal(Point3::origin(), Vector3::z()),
            region: Region::from_outer(vec![
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(0.0, 1.0),
            ]),
            class: PieceClass::Outside,
            opposed: false,
            flip: false,
        };
        let body = stitch_pieces(&mut model, &[piece]).body.unwrap();

        let report = validate_model(&model, body);
        // A lone sheet face has no twins and single-use edges; that is
        // tolerable, not broken
        assert!(report.is_valid());
        assert!(!report.warnings.is_empty());
    }
}
