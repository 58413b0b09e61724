// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Solidkit Contributors

//! Stitching: rebuild manifold topology from independent face pieces.
//!
//! All pieces of one stitch call share tolerance-quantized welding maps
//! for vertices and edges, so coincident vertices from different source
//! faces unify and the two faces meeting along a seam traverse one Edge
//! record through opposing half-edges. Twins are recovered afterwards by
//! grouping half-edges on the unordered pair of their endpoint position
//! keys, and faces are gathered into shells by twin connectivity.

use super::classify::FacePiece;
use crate::geom::signed_area;
use crate::topo::{
    BodyId, Curve2, Curve3, EdgeId, FaceId, HalfEdgeId, Surface, TopologyModel, VertexId,
};
use ahash::{AHashMap, AHashSet};
use nalgebra::{Point2, Point3};

/// What a stitch call produced. Degenerate pieces are dropped and
/// counted, never fatal.
#[derive(Debug, Default)]
pub struct StitchOutcome {
    pub body: Option<BodyId>,
    pub faces_built: usize,
    pub pieces_dropped: usize,
    pub untwinned_groups: usize,
}

type Key3 = (i64, i64, i64);

/// Weld vertices, rebuild loops/edges/half-edges for every piece into a
/// brand-new body, and recover twin relationships
pub fn stitch_pieces(model: &mut TopologyModel, pieces: &[FacePiece]) -> StitchOutcome {
    let mut outcome = StitchOutcome::default();

    // One set of welding maps per stitch call
    let mut weld = WeldMaps::default();
    let mut faces: Vec<FaceId> = Vec::new();

    for piece in pieces {
        match build_face(model, piece, &mut weld) {
            Some(face) => {
                faces.push(face);
                outcome.faces_built += 1;
            }
            None => outcome.pieces_dropped += 1,
        }
    }

    // A loop that still visits a vertex handle twice slipped through the
    // per-piece snapping; remove the whole face
    faces.retain(|&face| {
        let outer = model.face_loops(face)[0];
        let vertices = model.loop_vertices(outer);
        let unique: AHashSet<VertexId> = vertices.iter().copied().collect();
        if unique.len() == vertices.len() {
            true
        } else {
            delete_face_cascade(model, face);
            outcome.faces_built -= 1;
            outcome.pieces_dropped += 1;
            false
        }
    });

    if faces.is_empty() {
        return outcome;
    }

    outcome.untwinned_groups = assign_twins(model, &faces);

    let body = model.add_body();
    for component in shell_components(model, &faces) {
        let closed = component.iter().all(|&face| {
            model.face_loops(face).iter().all(|&lp| {
                model
                    .loop_half_edges(lp)
                    .all(|he| !model.half_edge(he).twin.is_null())
            })
        });
        let shell = model.add_shell(closed);
        for &face in &component {
            model.add_face_to_shell(shell, face);
        }
        model.add_shell_to_body(body, shell);
    }
    outcome.body = Some(body);
    outcome
}

/// Welding state shared by every piece of one stitch call
#[derive(Default)]
struct WeldMaps {
    vertices: AHashMap<Key3, VertexId>,
    edges: AHashMap<(Key3, Key3), EdgeId>,
}

/// Group faces into connectivity components across twin links. Disjoint
/// inputs that stay disjoint come out as separate shells of the one
/// result body.
fn shell_components(model: &TopologyModel, faces: &[FaceId]) -> Vec<Vec<FaceId>> {
    let index: AHashMap<FaceId, usize> =
        faces.iter().enumerate().map(|(i, &f)| (f, i)).collect();
    let mut seen = vec![false; faces.len()];
    let mut components = Vec::new();

    for start in 0..faces.len() {
        if seen[start] {
            continue;
        }
        seen[start] = true;
        let mut component = Vec::new();
        let mut queue = vec![faces[start]];
        while let Some(face) = queue.pop() {
            component.push(face);
            for &lp in model.face_loops(face) {
                for he in model.loop_half_edges(lp) {
                    let twin = model.half_edge(he).twin;
                    if twin.is_null() {
                        continue;
                    }
                    let neighbor = model.loop_(model.half_edge(twin).owner).face;
                    if let Some(&j) = index.get(&neighbor) {
                        if !seen[j] {
                            seen[j] = true;
                            queue.push(faces[j]);
                        }
                    }
                }
            }
        }
        components.push(component);
    }
    components
}

/// Build one face from a piece. Returns None for degenerate pieces
/// (fewer than 3 distinct welded positions, an under-area outline, or a
/// failed outer loop).
fn build_face(
    model: &mut TopologyModel,
    piece: &FacePiece,
    weld: &mut WeldMaps,
) -> Option<FaceId> {
    // The REVERSED flag orients flipped pieces without mutating the plane
    let surface = model.add_surface(Surface::Plane(piece.plane));
    let effective = if piece.flip {
        piece.plane.flipped()
    } else {
        piece.plane
    };

    let outer = oriented_loop_points(piece, &piece.region.outer, piece.flip);
    let outer_loop = build_loop(model, &outer, &effective, weld)?;

    let face = model.add_face(surface, piece.flip);
    model.add_loop_to_face(face, outer_loop);

    for hole in &piece.region.holes {
        let hole_points = oriented_loop_points(piece, hole, piece.flip);
        // A degenerate hole is absorbed; the face survives without it
        if let Some(hole_loop) = build_loop(model, &hole_points, &effective, weld) {
            model.add_loop_to_face(face, hole_loop);
        }
    }
    Some(face)
}

fn oriented_loop_points(
    piece: &FacePiece,
    polygon: &[Point2<f64>],
    flip: bool,
) -> Vec<Point3<f64>> {
    let unprojected = polygon.iter().map(|uv| piece.plane.unproject(uv));
    if flip {
        let mut points: Vec<_> = unprojected.collect();
        points.reverse();
        points
    } else {
        unprojected.collect()
    }
}

/// Unproject, snap, weld and link one loop. None if it degenerates.
fn build_loop(
    model: &mut TopologyModel,
    points: &[Point3<f64>],
    face_plane: &crate::geom::Plane,
    weld: &mut WeldMaps,
) -> Option<crate::topo::LoopId> {
    let ctx = *model.context();

    // Drop consecutive duplicates and a closing point that repeats the
    // first
    let mut cleaned: Vec<Point3<f64>> = Vec::with_capacity(points.len());
    for p in points {
        if cleaned
            .last()
            .is_some_and(|last| ctx.same_point(last, p))
        {
            continue;
        }
        cleaned.push(*p);
    }
    while cleaned.len() >= 2 && ctx.same_point(&cleaned[0], cleaned.last().unwrap()) {
        cleaned.pop();
    }
    if cleaned.len() < 3 {
        return None;
    }

    // Three distinct points can still be collinear; a sliver under the
    // area threshold degenerates too
    let projected: Vec<Point2<f64>> = cleaned.iter().map(|p| face_plane.project(p)).collect();
    if signed_area(&projected).abs() < ctx.min_face_area() {
        return None;
    }

    let vertices: Vec<VertexId> = cleaned
        .iter()
        .map(|p| {
            *weld
                .vertices
                .entry(ctx.position_key(p))
                .or_insert_with(|| model.add_vertex(*p))
        })
        .collect();

    let mut half_edges: Vec<HalfEdgeId> = Vec::with_capacity(vertices.len());
    let n = vertices.len();
    for i in 0..n {
        let (start, end) = (vertices[i], vertices[(i + 1) % n]);
        if start == end {
            continue; // Both endpoints welded together: no edge
        }
        let ka = ctx.position_key(&model.vertex_position(start));
        let kb = ctx.position_key(&model.vertex_position(end));
        let key = if ka <= kb { (ka, kb) } else { (kb, ka) };
        // One Edge per welded endpoint pair; the opposing face traverses
        // the same record through a reversed half-edge
        let edge = match weld.edges.get(&key) {
            Some(&edge) => edge,
            None => {
                let a = model.vertex_position(start);
                let b = model.vertex_position(end);
                let curve = model.add_curve3(Curve3::Line { a, b });
                let edge = model.add_edge_on_curve(start, end, curve, 0.0, 1.0);
                weld.edges.insert(key, edge);
                edge
            }
        };
        let forward = model.edge(edge).start == start;
        half_edges.push(model.add_half_edge(edge, forward));
    }
    if half_edges.len() < 3 {
        return None;
    }

    let lp = model.add_loop(&half_edges);
    for &he in &half_edges {
        let a = model.vertex_position(model.half_edge_start(he));
        let b = model.vertex_position(model.half_edge_end(he));
        let pcurve = model.add_curve2(Curve2::Line {
            a: face_plane.project(&a),
            b: face_plane.project(&b),
        });
        model.set_half_edge_pcurve(he, pcurve);
    }
    Some(lp)
}

fn delete_face_cascade(model: &mut TopologyModel, face: FaceId) {
    for lp in model.face_loops(face).to_vec() {
        for he in model.loop_half_edges(lp).collect::<Vec<_>>() {
            model.delete_half_edge(he);
        }
        model.delete_loop(lp);
    }
    model.delete_face(face);
}

/// Group half-edges by the unordered pair of their endpoint position
/// keys; pairs become mutual twins, larger (non-manifold) groups are left
/// untwinned for validation to report. Returns the non-manifold group
/// count.
fn assign_twins(model: &mut TopologyModel, faces: &[FaceId]) -> usize {
    let ctx = *model.context();
    let mut groups: AHashMap<(Key3, Key3), Vec<HalfEdgeId>> = AHashMap::new();

    for &face in faces {
        for &lp in model.face_loops(face) {
            for he in model.loop_half_edges(lp).collect::<Vec<_>>() {
                let a = ctx.position_key(&model.vertex_position(model.half_edge_start(he)));
                let b = ctx.position_key(&model.vertex_position(model.half_edge_end(he)));
                let key = if a <= b { (a, b) } else { (b, a) };
                groups.entry(key).or_default().push(he);
            }
        }
    }

    let mut non_manifold = 0;
    for group in groups.values() {
        match group.as_slice() {
            [a, b] => model.set_half_edge_twin(*a, *b),
            [_] => {}
            _ => non_manifold += 1,
        }
    }
    non_manifold
}

/// Winding sanity used by tests: outer loops enclose positive area in
/// their face plane
#[allow(dead_code)]
fn outer_loop_area(model: &TopologyModel, face: FaceId) -> f64 {
    let plane = model.face_plane(face);
    let outer = model.face_loops(face)[0];
    let polygon: Vec<Point2<f64>> = model
        .loop_vertices(outer)
        .into_iter()
        .map(|v| plane.project(&model.vertex_position(v)))
        .collect();
    signed_area(&polygon)
}
