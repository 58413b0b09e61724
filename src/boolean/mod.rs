// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Solidkit Contributors

//! Planar boolean operations between closed bodies.
//!
//! The pipeline is pretest (AABB) -> classify (cut each body's faces by
//! the other's cross-section) -> select (operation-specific retention) ->
//! stitch (weld a new manifold body). Input bodies are never mutated;
//! the result is a brand-new body in the same model.

mod classify;
mod section;
mod select;
mod stitch;

pub use classify::{classify_body_faces, FacePiece, PieceClass, PieceSource};
pub use section::{section_body, SectionProfile};
pub use stitch::{stitch_pieces, StitchOutcome};

use crate::topo::{BodyId, TopologyModel};
use thiserror::Error;

/// The supported regularized set operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    Union,
    Subtract,
    Intersect,
}

impl std::fmt::Display for BooleanOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BooleanOp::Union => write!(f, "union"),
            BooleanOp::Subtract => write!(f, "subtract"),
            BooleanOp::Intersect => write!(f, "intersect"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BooleanOptions {
    pub operation: BooleanOp,
}

impl BooleanOptions {
    pub fn new(operation: BooleanOp) -> Self {
        Self { operation }
    }
}

/// A successful boolean: the result body plus any absorbed conditions
#[derive(Debug)]
pub struct BooleanResult {
    pub body: BodyId,
    pub warnings: Vec<String>,
}

#[derive(Debug, Error)]
pub enum BooleanError {
    #[error("bodies do not intersect")]
    DoNotIntersect,
    #[error("{operation} produced an empty result")]
    EmptyResult { operation: BooleanOp },
}

/// Run one boolean operation between two closed bodies of `model`.
///
/// The inputs are left untouched; the result body shares no topology
/// with them (geometry carriers in the arena are shared read-only).
pub fn boolean_operation(
    model: &mut TopologyModel,
    body_a: BodyId,
    body_b: BodyId,
    options: &BooleanOptions,
) -> Result<BooleanResult, BooleanError> {
    let op = options.operation;
    let ctx = *model.context();
    let bbox_a = model.body_bbox(body_a);
    let bbox_b = model.body_bbox(body_b);
    let mut warnings = Vec::new();

    if !bbox_a.overlaps(&bbox_b, ctx.weld_quantum()) {
        match op {
            BooleanOp::Intersect => return Err(BooleanError::DoNotIntersect),
            BooleanOp::Subtract => {
                // Nothing to remove; the target is the answer
                warnings.push("subtract: tool does not touch the target".to_string());
                return Ok(BooleanResult {
                    body: body_a,
                    warnings,
                });
            }
            // A disjoint union is still a body, with two closed
            // components in one shell
            BooleanOp::Union => {}
        }
    }

    let pieces_a = classify_body_faces(model, body_a, body_b, PieceSource::A);
    let pieces_b = classify_body_faces(model, body_b, body_a, PieceSource::B);

    let kept = select::select_pieces(
        op,
        pieces_a,
        pieces_b,
        &bbox_a,
        &bbox_b,
        &ctx,
        &mut warnings,
    );

    let outcome = stitch_pieces(model, &kept);
    if outcome.pieces_dropped > 0 {
        warnings.push(format!(
            "stitch: dropped {} degenerate piece(s)",
            outcome.pieces_dropped
        ));
    }
    if outcome.untwinned_groups > 0 {
        warnings.push(format!(
            "stitch: {} non-manifold edge group(s) left untwinned",
            outcome.untwinned_groups
        ));
    }

    match outcome.body {
        Some(body) => Ok(BooleanResult { body, warnings }),
        None => Err(BooleanError::EmptyResult { operation: op }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::make_box;
    use nalgebra::{Point3, Vector3};

    #[test]
    fn test_disjoint_intersect_is_an_error() {
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

        let err = boolean_operation(&mut model, a, b, &BooleanOptions::new(BooleanOp::Intersect))
            .unwrap_err();
        assert!(err.to_string().contains("do not intersect"));
    }

    #[test]
    fn test_disjoint_subtract_returns_target_unchanged() {
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

        let result = boolean_operation(&mut model, a, b, &BooleanOptions::new(BooleanOp::Subtract))
            .unwrap();
        assert_eq!(result.body, a);
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn test_union_of_overlapping_boxes() {
        let mut model = TopologyModel::new();
        let a = make_box(&mut model, Point3::origin(), Vector3::new(2.0, 2.0, 2.0));
        let b = make_box(
            &mut model,
            Point3::new(1.0, 0.0, 0.0),
            Vector3::new(2.0, 2.0, 2.0),
        );

        let result = boolean_operation(&mut model, a, b, &BooleanOptions::new(BooleanOp::Union))
            .unwrap();
        assert_ne!(result.body, a);
        assert_ne!(result.body, b);

        // 3x2x2 box: the two end caps plus the four long sides, each
        // side split into three coplanar pieces (no coplanar merging)
        let faces = model.body_faces(result.body);
        assert_eq!(faces.len(), 14);

        let bbox = model.body_bbox(result.body);
        assert!((bbox.size().x - 3.0).abs() < 1e-6);
        assert!((bbox.size().y - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_inputs_survive_a_boolean() {
        let mut model = TopologyModel::new();
        let a = make_box(&mut model, Point3::origin(), Vector3::new(2.0, 2.0, 2.0));
        let b = make_box(
            &mut model,
            Point3::new(1.0, 0.0, 0.0),
            Vector3::new(2.0, 2.0, 2.0),
        );
        let faces_before_a = model.body_faces(a).len();

        boolean_operation(&mut model, a, b, &BooleanOptions::new(BooleanOp::Intersect)).unwrap();

        assert_eq!(model.body_faces(a).len(), faces_before_a);
        assert_eq!(model.body_faces(b).len(), 6);
    }
}
