// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Solidkit Contributors

//! The topology arena. Owns every entity; nothing else mutates them.

use super::entities::*;
use super::ids::*;
use crate::context::NumericContext;
use crate::geom::{BoundingBox, Plane, Region};
use ahash::AHashSet;
use nalgebra::Point3;

/// Walk guard for corrupted cyclic structures
pub const MAX_LOOP_WALK: usize = 10_000;

/// Arena of typed entity tables plus auxiliary geometry arrays.
///
/// All handles returned by `add_*` stay valid for the model's lifetime;
/// deleted entities keep their slot but must not be dereferenced by new
/// code. Out-of-range or deleted handles are a caller bug and panic.
#[derive(Debug, Clone)]
pub struct TopologyModel {
    ctx: NumericContext,
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    half_edges: Vec<HalfEdge>,
    loops: Vec<Loop>,
    faces: Vec<Face>,
    shells: Vec<Shell>,
    bodies: Vec<Body>,
    surfaces: Vec<Surface>,
    curves3: Vec<Curve3>,
    curves2: Vec<Curve2>,
    live_vertices: usize,
    live_edges: usize,
    live_half_edges: usize,
    live_loops: usize,
    live_faces: usize,
}

impl TopologyModel {
    pub fn new() -> Self {
        Self::with_context(NumericContext::default())
    }

    pub fn with_context(ctx: NumericContext) -> Self {
        Self {
            ctx,
            vertices: Vec::new(),
            edges: Vec::new(),
            half_edges: Vec::new(),
            loops: Vec::new(),
            faces: Vec::new(),
            shells: Vec::new(),
            bodies: Vec::new(),
            surfaces: Vec::new(),
            curves3: Vec::new(),
            curves2: Vec::new(),
            live_vertices: 0,
            live_edges: 0,
            live_half_edges: 0,
            live_loops: 0,
            live_faces: 0,
        }
    }

    pub fn context(&self) -> &NumericContext {
        &self.ctx
    }

    // --- Builders ---

    pub fn add_vertex(&mut self, point: Point3<f64>) -> VertexId {
        let id = VertexId(self.vertices.len() as u32);
        self.vertices.push(Vertex {
            point,
            deleted: false,
        });
        self.live_vertices += 1;
        id
    }

    pub fn add_edge(&mut self, start: VertexId, end: VertexId) -> EdgeId {
        self.add_edge_on_curve(start, end, Curve3Id::NULL, 0.0, 1.0)
    }

    pub fn add_edge_on_curve(
        &mut self,
        start: VertexId,
        end: VertexId,
        curve: Curve3Id,
        t_start: f64,
        t_end: f64,
    ) -> EdgeId {
        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(Edge {
            start,
            end,
            curve,
            t_start,
            t_end,
            deleted: false,
        });
        self.live_edges += 1;
        id
    }

    pub fn add_half_edge(&mut self, edge: EdgeId, forward: bool) -> HalfEdgeId {
        let id = HalfEdgeId(self.half_edges.len() as u32);
        self.half_edges.push(HalfEdge {
            edge,
            forward,
            twin: HalfEdgeId::NULL,
            next: HalfEdgeId::NULL,
            prev: HalfEdgeId::NULL,
            owner: LoopId::NULL,
            pcurve: Curve2Id::NULL,
            deleted: false,
        });
        self.live_half_edges += 1;
        id
    }

    /// Link the given half-edges into a closed cycle and register the loop
    pub fn add_loop(&mut self, half_edges: &[HalfEdgeId]) -> LoopId {
        assert!(!half_edges.is_empty(), "loop needs at least one half-edge");
        let id = LoopId(self.loops.len() as u32);
        let n = half_edges.len();
        for (i, &he) in half_edges.iter().enumerate() {
            let next = half_edges[(i + 1) % n];
            let prev = half_edges[(i + n - 1) % n];
            let record = &mut self.half_edges[he.index()];
            record.next = next;
            record.prev = prev;
            record.owner = id;
        }
        self.loops.push(Loop {
            first: half_edges[0],
            count: n,
            face: FaceId::NULL,
            deleted: false,
        });
        self.live_loops += 1;
        id
    }

    pub fn add_face(&mut self, surface: SurfaceId, reversed: bool) -> FaceId {
        let id = FaceId(self.faces.len() as u32);
        self.faces.push(Face {
            surface,
            reversed,
            loops: Vec::new(),
            deleted: false,
        });
        self.live_faces += 1;
        id
    }

    /// Register a loop on a face. The first registered loop is the outer
    /// boundary; later loops are holes.
    pub fn add_loop_to_face(&mut self, face: FaceId, lp: LoopId) {
        self.loops[lp.index()].face = face;
        self.faces[face.index()].loops.push(lp);
    }

    pub fn add_shell(&mut self, closed: bool) -> ShellId {
        let id = ShellId(self.shells.len() as u32);
        self.shells.push(Shell {
            faces: Vec::new(),
            closed,
            deleted: false,
        });
        id
    }

    pub fn add_face_to_shell(&mut self, shell: ShellId, face: FaceId) {
        self.shells[shell.index()].faces.push(face);
    }

    pub fn add_body(&mut self) -> BodyId {
        let id = BodyId(self.bodies.len() as u32);
        self.bodies.push(Body {
            shells: Vec::new(),
            deleted: false,
        });
        id
    }

    pub fn add_shell_to_body(&mut self, body: BodyId, shell: ShellId) {
        self.bodies[body.index()].shells.push(shell);
    }

    pub fn add_surface(&mut self, surface: Surface) -> SurfaceId {
        let id = SurfaceId(self.surfaces.len() as u32);
        self.surfaces.push(surface);
        id
    }

    pub fn add_curve3(&mut self, curve: Curve3) -> Curve3Id {
        let id = Curve3Id(self.curves3.len() as u32);
        self.curves3.push(curve);
        id
    }

    pub fn add_curve2(&mut self, curve: Curve2) -> Curve2Id {
        let id = Curve2Id(self.curves2.len() as u32);
        self.curves2.push(curve);
        id
    }

    /// Set mutual twin references. Fails silently if either side already
    /// carries a different twin; avoiding that is the caller's job.
    pub fn set_half_edge_twin(&mut self, a: HalfEdgeId, b: HalfEdgeId) {
        let ta = self.half_edges[a.index()].twin;
        let tb = self.half_edges[b.index()].twin;
        if (!ta.is_null() && ta != b) || (!tb.is_null() && tb != a) {
            return;
        }
        self.half_edges[a.index()].twin = b;
        self.half_edges[b.index()].twin = a;
    }

    pub(crate) fn set_half_edge_pcurve(&mut self, he: HalfEdgeId, pcurve: Curve2Id) {
        self.half_edges[he.index()].pcurve = pcurve;
    }

    // --- Readers ---

    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id.index()]
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.index()]
    }

    pub fn half_edge(&self, id: HalfEdgeId) -> &HalfEdge {
        &self.half_edges[id.index()]
    }

    pub fn loop_(&self, id: LoopId) -> &Loop {
        &self.loops[id.index()]
    }

    pub fn face(&self, id: FaceId) -> &Face {
        &self.faces[id.index()]
    }

    pub fn shell(&self, id: ShellId) -> &Shell {
        &self.shells[id.index()]
    }

    pub fn body(&self, id: BodyId) -> &Body {
        &self.bodies[id.index()]
    }

    pub fn surface(&self, id: SurfaceId) -> &Surface {
        &self.surfaces[id.index()]
    }

    pub fn curve3(&self, id: Curve3Id) -> &Curve3 {
        &self.curves3[id.index()]
    }

    pub fn curve2(&self, id: Curve2Id) -> &Curve2 {
        &self.curves2[id.index()]
    }

    pub fn vertex_position(&self, id: VertexId) -> Point3<f64> {
        self.vertices[id.index()].point
    }

    pub fn is_vertex_deleted(&self, id: VertexId) -> bool {
        self.vertices[id.index()].deleted
    }

    pub fn is_edge_deleted(&self, id: EdgeId) -> bool {
        self.edges[id.index()].deleted
    }

    pub fn is_half_edge_deleted(&self, id: HalfEdgeId) -> bool {
        self.half_edges[id.index()].deleted
    }

    pub fn is_loop_deleted(&self, id: LoopId) -> bool {
        self.loops[id.index()].deleted
    }

    pub fn is_face_deleted(&self, id: FaceId) -> bool {
        self.faces[id.index()].deleted
    }

    pub fn is_face_reversed(&self, id: FaceId) -> bool {
        self.faces[id.index()].reversed
    }

    pub fn face_surface_index(&self, id: FaceId) -> SurfaceId {
        self.faces[id.index()].surface
    }

    pub fn body_shells(&self, id: BodyId) -> &[ShellId] {
        &self.bodies[id.index()].shells
    }

    pub fn shell_faces(&self, id: ShellId) -> &[FaceId] {
        &self.shells[id.index()].faces
    }

    pub fn face_loops(&self, id: FaceId) -> &[LoopId] {
        &self.faces[id.index()].loops
    }

    pub fn loop_half_edge_count(&self, id: LoopId) -> usize {
        self.loops[id.index()].count
    }

    pub fn live_vertex_count(&self) -> usize {
        self.live_vertices
    }

    pub fn live_edge_count(&self) -> usize {
        self.live_edges
    }

    pub fn live_face_count(&self) -> usize {
        self.live_faces
    }

    /// Start vertex of a half-edge along its traversal direction
    pub fn half_edge_start(&self, id: HalfEdgeId) -> VertexId {
        let he = &self.half_edges[id.index()];
        let edge = &self.edges[he.edge.index()];
        if he.forward {
            edge.start
        } else {
            edge.end
        }
    }

    /// End vertex of a half-edge along its traversal direction
    pub fn half_edge_end(&self, id: HalfEdgeId) -> VertexId {
        let he = &self.half_edges[id.index()];
        let edge = &self.edges[he.edge.index()];
        if he.forward {
            edge.end
        } else {
            edge.start
        }
    }

    /// Iterate the half-edges of a loop in order, guarded against
    /// corrupted cycles
    pub fn loop_half_edges(&self, id: LoopId) -> LoopHalfEdges<'_> {
        let first = self.loops[id.index()].first;
        LoopHalfEdges {
            model: self,
            first,
            current: first,
            steps: 0,
        }
    }

    // --- Derived geometry ---

    /// Effective plane of a face, honoring the REVERSED flag
    pub fn face_plane(&self, id: FaceId) -> Plane {
        let face = &self.faces[id.index()];
        let plane = *self.surfaces[face.surface.index()].plane();
        if face.reversed {
            plane.flipped()
        } else {
            plane
        }
    }

    /// Ordered start vertices of a loop
    pub fn loop_vertices(&self, id: LoopId) -> Vec<VertexId> {
        self.loop_half_edges(id)
            .map(|he| self.half_edge_start(he))
            .collect()
    }

    /// Outer boundary of a face as 3D points
    pub fn face_outer_polygon(&self, id: FaceId) -> Vec<Point3<f64>> {
        let face = &self.faces[id.index()];
        let outer = face.loops[0];
        self.loop_vertices(outer)
            .into_iter()
            .map(|v| self.vertex_position(v))
            .collect()
    }

    /// Face boundary as a 2D region in the given plane's frame
    pub fn face_region_in_plane(&self, id: FaceId, plane: &Plane) -> Region {
        let face = &self.faces[id.index()];
        let mut loops = face.loops.iter().map(|&lp| {
            self.loop_vertices(lp)
                .into_iter()
                .map(|v| plane.project(&self.vertex_position(v)))
                .collect::<Vec<_>>()
        });
        let outer = loops.next().unwrap_or_default();
        Region::new(outer, loops.collect())
    }

    /// Face area (outer minus holes) in the face's own plane
    pub fn face_area(&self, id: FaceId) -> f64 {
        let plane = self.face_plane(id);
        self.face_region_in_plane(id, &plane).area()
    }

    /// All live faces of a body across its shells
    pub fn body_faces(&self, id: BodyId) -> Vec<FaceId> {
        let mut result = Vec::new();
        for &shell in self.body_shells(id) {
            for &face in self.shell_faces(shell) {
                if !self.is_face_deleted(face) {
                    result.push(face);
                }
            }
        }
        result
    }

    /// Unique live vertices referenced by a body's face loops
    pub fn body_vertices(&self, id: BodyId) -> Vec<VertexId> {
        let mut seen = AHashSet::new();
        let mut result = Vec::new();
        for face in self.body_faces(id) {
            for &lp in self.face_loops(face) {
                for he in self.loop_half_edges(lp) {
                    let v = self.half_edge_start(he);
                    if !self.is_vertex_deleted(v) && seen.insert(v) {
                        result.push(v);
                    }
                }
            }
        }
        result
    }

    /// Unique edges referenced by a body's face loops
    pub fn body_edges(&self, id: BodyId) -> Vec<EdgeId> {
        let mut seen = AHashSet::new();
        let mut result = Vec::new();
        for face in self.body_faces(id) {
            for &lp in self.face_loops(face) {
                for he in self.loop_half_edges(lp) {
                    let e = self.half_edge(he).edge;
                    if !self.is_edge_deleted(e) && seen.insert(e) {
                        result.push(e);
                    }
                }
            }
        }
        result
    }

    pub fn body_bbox(&self, id: BodyId) -> BoundingBox {
        let mut bbox = BoundingBox::empty();
        for v in self.body_vertices(id) {
            bbox.expand_to_include(&self.vertex_position(v));
        }
        bbox
    }

    // --- Logical deletion (healing support) ---

    pub(crate) fn vertex_mut(&mut self, id: VertexId) -> &mut Vertex {
        &mut self.vertices[id.index()]
    }

    pub(crate) fn edge_mut(&mut self, id: EdgeId) -> &mut Edge {
        &mut self.edges[id.index()]
    }

    pub(crate) fn half_edge_mut(&mut self, id: HalfEdgeId) -> &mut HalfEdge {
        &mut self.half_edges[id.index()]
    }

    pub(crate) fn loop_mut(&mut self, id: LoopId) -> &mut Loop {
        &mut self.loops[id.index()]
    }

    pub(crate) fn face_mut(&mut self, id: FaceId) -> &mut Face {
        &mut self.faces[id.index()]
    }

    pub(crate) fn delete_vertex(&mut self, id: VertexId) {
        let record = &mut self.vertices[id.index()];
        if !record.deleted {
            record.deleted = true;
            self.live_vertices -= 1;
        }
    }

    pub(crate) fn delete_edge(&mut self, id: EdgeId) {
        let record = &mut self.edges[id.index()];
        if !record.deleted {
            record.deleted = true;
            self.live_edges -= 1;
        }
    }

    pub(crate) fn delete_half_edge(&mut self, id: HalfEdgeId) {
        let record = &mut self.half_edges[id.index()];
        if !record.deleted {
            record.deleted = true;
            self.live_half_edges -= 1;
        }
    }

    pub(crate) fn delete_loop(&mut self, id: LoopId) {
        let record = &mut self.loops[id.index()];
        if !record.deleted {
            record.deleted = true;
            self.live_loops -= 1;
        }
    }

    pub(crate) fn delete_face(&mut self, id: FaceId) {
        let record = &mut self.faces[id.index()];
        if !record.deleted {
            record.deleted = true;
            self.live_faces -= 1;
        }
    }
}

impl Default for TopologyModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Ordered traversal of a loop's half-edges, capped at
/// [`MAX_LOOP_WALK`] steps so corrupted cycles terminate
pub struct LoopHalfEdges<'a> {
    model: &'a TopologyModel,
    first: HalfEdgeId,
    current: HalfEdgeId,
    steps: usize,
}

impl<'a> Iterator for LoopHalfEdges<'a> {
    type Item = HalfEdgeId;

    fn next(&mut self) -> Option<HalfEdgeId> {
        if self.current.is_null() || self.steps >= MAX_LOOP_WALK {
            return None;
        }
        if self.steps > 0 && self.current == self.first {
            return None;
        }
        let result = self.current;
        self.current = self.model.half_edge(result).next;
        self.steps += 1;
        Some(result)
    }
}
