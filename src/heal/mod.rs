// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Solidkit Contributors

//! Post-hoc repair of a body's topology.
//!
//! Healing mutates the model in place, unlike booleans which always
//! produce new bodies. Each iteration merges near-coincident vertices,
//! collapses short edges (shortest first), and removes under-area faces;
//! inside-out shells are reoriented once, on the first iteration.
//! Iteration stops early when a pass changes nothing.

mod validate;

pub use validate::{validate_model, ValidationReport};

use crate::context::NumericContext;
use crate::topo::{BodyId, EdgeId, FaceId, HalfEdgeId, ShellId, TopologyModel, VertexId};
use ahash::AHashMap;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HealOptions {
    pub max_iterations: usize,
    /// Vertices closer than this merge into one (positions averaged)
    pub merge_distance: f64,
    /// Edges shorter than this collapse to their midpoint
    pub collapse_length: f64,
    /// Faces under this area are removed
    pub min_face_area: f64,
}

impl HealOptions {
    pub fn for_context(ctx: &NumericContext) -> Self {
        Self {
            max_iterations: 3,
            merge_distance: ctx.weld_quantum(),
            collapse_length: ctx.weld_quantum(),
            min_face_area: ctx.min_face_area(),
        }
    }
}

impl Default for HealOptions {
    fn default() -> Self {
        Self::for_context(&NumericContext::default())
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct HealingResult {
    pub iterations: usize,
    pub vertices_merged: usize,
    pub edges_collapsed: usize,
    pub faces_removed: usize,
    pub shells_reoriented: usize,
    pub report: ValidationReport,
    pub success: bool,
}

pub fn heal_model(
    model: &mut TopologyModel,
    body: BodyId,
    options: &HealOptions,
) -> HealingResult {
    let mut result = HealingResult::default();

    for iteration in 0..options.max_iterations {
        let merged = merge_close_vertices(model, body, options.merge_distance);
        let (collapsed, collapse_removed) =
            collapse_short_edges(model, body, options.collapse_length);
        let removed = remove_small_faces(model, body, options.min_face_area);

        let mut actions = merged + collapsed + collapse_removed + removed;
        if iteration == 0 {
            let reoriented = reorient_shells(model, body);
            result.shells_reoriented = reoriented;
            actions += reoriented;
        }

        result.vertices_merged += merged;
        result.edges_collapsed += collapsed;
        result.faces_removed += collapse_removed + removed;
        result.iterations = iteration + 1;

        if actions == 0 {
            break;
        }
    }

    result.report = validate_model(model, body);
    result.success = result.report.is_valid();
    result
}

/// Pairwise merge of vertices within `distance`. The survivor takes the
/// averaged position; edges are rewritten to reference it.
fn merge_close_vertices(model: &mut TopologyModel, body: BodyId, distance: f64) -> usize {
    let vertices = model.body_vertices(body);
    let mut target: AHashMap<VertexId, VertexId> = AHashMap::new();
    let mut merged = 0;

    for i in 0..vertices.len() {
        let vi = vertices[i];
        if target.contains_key(&vi) {
            continue;
        }
        for &vj in &vertices[i + 1..] {
            if target.contains_key(&vj) {
                continue;
            }
            let (pi, pj) = (model.vertex_position(vi), model.vertex_position(vj));
            if (pi - pj).norm() < distance {
                model.vertex_mut(vi).point = Point3::from((pi.coords + pj.coords) / 2.0);
                model.delete_vertex(vj);
                target.insert(vj, vi);
                merged += 1;
            }
        }
    }

    if merged > 0 {
        for edge in model.body_edges(body) {
            let start = model.edge(edge).start;
            let end = model.edge(edge).end;
            if let Some(&t) = target.get(&start) {
                model.edge_mut(edge).start = t;
            }
            if let Some(&t) = target.get(&end) {
                model.edge_mut(edge).end = t;
            }
        }
    }
    merged
}

/// Collapse edges under `threshold` to their midpoint, shortest first.
/// Returns (edges collapsed, faces removed by degenerating loops).
fn collapse_short_edges(
    model: &mut TopologyModel,
    body: BodyId,
    threshold: f64,
) -> (usize, usize) {
    let mut candidates: Vec<(f64, EdgeId)> = model
        .body_edges(body)
        .into_iter()
        .filter_map(|e| {
            let len = edge_length(model, e);
            (len < threshold).then_some((len, e))
        })
        .collect();
    candidates.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let mut collapsed = 0;
    let mut faces_removed = 0;
    for (_, edge) in candidates {
        if model.is_edge_deleted(edge) {
            continue;
        }
        // Earlier collapses may have moved the endpoints apart
        if edge_length(model, edge) >= threshold {
            continue;
        }
        faces_removed += collapse_edge(model, body, edge);
        collapsed += 1;
    }
    (collapsed, faces_removed)
}

fn edge_length(model: &TopologyModel, edge: EdgeId) -> f64 {
    let rec = model.edge(edge);
    (model.vertex_position(rec.end) - model.vertex_position(rec.start)).norm()
}

/// Remove one edge: unlink its half-edges from their loops, merge its
/// endpoints at the midpoint. A loop already at 3 half-edges degenerates,
/// taking its whole face with it. Returns the number of faces removed.
fn collapse_edge(model: &mut TopologyModel, body: BodyId, edge: EdgeId) -> usize {
    let mut faces_removed = 0;

    // Half-edges of this body traversing the edge
    let mut users: Vec<HalfEdgeId> = Vec::new();
    for face in model.body_faces(body) {
        for &lp in model.face_loops(face) {
            for he in model.loop_half_edges(lp).collect::<Vec<_>>() {
                if model.half_edge(he).edge == edge && !model.is_half_edge_deleted(he) {
                    users.push(he);
                }
            }
        }
    }

    for he in users {
        if model.is_half_edge_deleted(he) {
            continue;
        }
        let owner = model.half_edge(he).owner;
        if model.is_loop_deleted(owner) {
            model.delete_half_edge(he);
            continue;
        }
        if model.loop_half_edge_count(owner) <= 3 {
            let face = model.loop_(owner).face;
            if !model.is_face_deleted(face) {
                remove_face(model, face);
                faces_removed += 1;
            }
            continue;
        }
        unlink_half_edge(model, he);
    }

    let start = model.edge(edge).start;
    let end = model.edge(edge).end;
    if start != end {
        let mid = Point3::from(
            (model.vertex_position(start).coords + model.vertex_position(end).coords) / 2.0,
        );
        model.vertex_mut(start).point = mid;
        for other in model.body_edges(body) {
            if model.edge(other).start == end {
                model.edge_mut(other).start = start;
            }
            if model.edge(other).end == end {
                model.edge_mut(other).end = start;
            }
        }
        model.delete_vertex(end);
    }
    model.delete_edge(edge);
    faces_removed
}

/// Splice a half-edge out of its loop, clearing its twin's back-reference
fn unlink_half_edge(model: &mut TopologyModel, he: HalfEdgeId) {
    let record = model.half_edge(he);
    let (prev, next, owner, twin) = (record.prev, record.next, record.owner, record.twin);

    model.half_edge_mut(prev).next = next;
    model.half_edge_mut(next).prev = prev;
    let lp = model.loop_mut(owner);
    if lp.first == he {
        lp.first = next;
    }
    lp.count -= 1;

    if !twin.is_null() {
        model.half_edge_mut(twin).twin = HalfEdgeId::NULL;
    }
    model.delete_half_edge(he);
}

/// Delete a face and everything it owns, clearing twin back-references
/// on neighboring faces
fn remove_face(model: &mut TopologyModel, face: FaceId) {
    for lp in model.face_loops(face).to_vec() {
        for he in model.loop_half_edges(lp).collect::<Vec<_>>() {
            let twin = model.half_edge(he).twin;
            if !twin.is_null() {
                model.half_edge_mut(twin).twin = HalfEdgeId::NULL;
            }
            model.delete_half_edge(he);
        }
        model.delete_loop(lp);
    }
    model.delete_face(face);
}

fn remove_small_faces(model: &mut TopologyModel, body: BodyId, min_area: f64) -> usize {
    let small: Vec<FaceId> = model
        .body_faces(body)
        .into_iter()
        .filter(|&f| model.face_area(f).abs() < min_area)
        .collect();
    for &face in &small {
        remove_face(model, face);
    }
    small.len()
}

/// Flip shells whose divergence-theorem signed volume is negative.
/// Returns the number of shells reoriented.
fn reorient_shells(model: &mut TopologyModel, body: BodyId) -> usize {
    let shells: Vec<ShellId> = model.body_shells(body).to_vec();
    let mut reoriented = 0;
    for shell in shells {
        if shell_signed_volume(model, shell) < 0.0 {
            flip_shell(model, shell);
            reoriented += 1;
        }
    }
    reoriented
}

/// Signed volume of a closed shell: fan triangles of every loop, summed
/// with the stored winding
pub(crate) fn shell_signed_volume(model: &TopologyModel, shell: ShellId) -> f64 {
    let mut volume = 0.0;
    for &face in model.shell_faces(shell) {
        if model.is_face_deleted(face) {
            continue;
        }
        for &lp in model.face_loops(face) {
            let points: Vec<Point3<f64>> = model
                .loop_vertices(lp)
                .into_iter()
                .map(|v| model.vertex_position(v))
                .collect();
            for i in 1..points.len().saturating_sub(1) {
                volume += points[0]
                    .coords
                    .dot(&points[i].coords.cross(&points[i + 1].coords));
            }
        }
    }
    volume / 6.0
}

/// Reverse every face of a shell: toggle the REVERSED flag, reverse each
/// loop's traversal and each half-edge's direction. Twins stay paired.
pub(crate) fn flip_shell(model: &mut TopologyModel, shell: ShellId) {
    for face in model.shell_faces(shell).to_vec() {
        if model.is_face_deleted(face) {
            continue;
        }
        let reversed = model.face(face).reversed;
        model.face_mut(face).reversed = !reversed;

        for lp in model.face_loops(face).to_vec() {
            for he in model.loop_half_edges(lp).collect::<Vec<_>>() {
                let record = model.half_edge_mut(he);
                std::mem::swap(&mut record.next, &mut record.prev);
                record.forward = !record.forward;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::make_box;
    use nalgebra::Vector3;

    #[test]
    fn test_heal_on_clean_box_is_a_noop() {
        let mut model = TopologyModel::new();
        let body = make_box(&mut model, Point3::origin(), Vector3::new(2.0, 2.0, 2.0));

        let result = heal_model(&mut model, body, &HealOptions::default());
        assert!(result.success);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.vertices_merged, 0);
        assert_eq!(result.edges_collapsed, 0);
        assert_eq!(result.faces_removed, 0);
        assert_eq!(result.shells_reoriented, 0);
    }

    #[test]
    fn test_near_coincident_vertices_merge_and_self_edge_collapses() {
        use crate::topo::Surface;
        use crate::geom::Plane;

        let mut model = TopologyModel::new();
        // A quad whose fourth corner is split into two vertices 1e-7 apart
        let positions = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1e-7, 1.0, 0.0),
        ];
        let vs: Vec<VertexId> = positions.iter().map(|p| model.add_vertex(*p)).collect();
        let hes: Vec<HalfEdgeId> = (0..5)
            .map(|i| {
                let e = model.add_edge(vs[i], vs[(i + 1) % 5]);
                model.add_half_edge(e, true)
            })
            .collect();
        let lp = model.add_loop(&hes);
        let surface = model.add_surface(Surface::Plane(Plane::from_normal(
            Point3::origin(),
            Vector3::z(),
        )));
        let face = model.add_face(surface, false);
        model.add_loop_to_face(face, lp);
        let shell = model.add_shell(false);
        model.add_face_to_shell(shell, face);
        let body = model.add_body();
        model.add_shell_to_body(body, shell);

        let result = heal_model(&mut model, body, &HealOptions::default());
        assert_eq!(result.vertices_merged, 1);
        assert_eq!(result.edges_collapsed, 1);
        assert_eq!(model.loop_half_edge_count(lp), 4);
        assert!(result.success, "errors: {:?}", result.report.errors);
    }

    #[test]
    fn test_inside_out_shell_is_reoriented() {
        let mut model = TopologyModel::new();
        let body = make_box(&mut model, Point3::origin(), Vector3::new(2.0, 2.0, 2.0));
        let shell = model.body_shells(body)[0];
        assert!(shell_signed_volume(&model, shell) > 0.0);

        flip_shell(&mut model, shell);
        assert!(shell_signed_volume(&model, shell) < 0.0);

        let result = heal_model(&mut model, body, &HealOptions::default());
        assert_eq!(result.shells_reoriented, 1);
        assert!(shell_signed_volume(&model, shell) > 0.0);
        assert!(result.success);
    }

    #[test]
    fn test_heal_stops_early_when_nothing_changes() {
        let mut model = TopologyModel::new();
        let body = make_box(&mut model, Point3::origin(), Vector3::new(2.0, 2.0, 2.0));

        let options = HealOptions {
            max_iterations: 10,
            ..HealOptions::default()
        };
        let result = heal_model(&mut model, body, &options);
        assert_eq!(result.iterations, 1);
    }
}
