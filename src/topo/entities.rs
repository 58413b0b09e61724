// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Solidkit Contributors

//! Topology entity records and auxiliary geometry.
//!
//! Entities are plain records stored in parallel arrays inside the
//! [`TopologyModel`](super::TopologyModel) arena and reference each other
//! only through typed handles. Deletion is logical: a tombstone flag is
//! set and the slot stays in place.

use super::ids::*;
use crate::geom::Plane;
use nalgebra::{Point2, Point3};

/// A topological vertex at a 3D position
#[derive(Debug, Clone)]
pub struct Vertex {
    pub point: Point3<f64>,
    pub(crate) deleted: bool,
}

/// A bounded curve segment between two vertices.
///
/// `curve` is the optional geometric carrier, parameterized over
/// `[t_start, t_end]` (defaults 0..1). Multiple half-edges may reference
/// one edge.
#[derive(Debug, Clone)]
pub struct Edge {
    pub start: VertexId,
    pub end: VertexId,
    pub curve: Curve3Id,
    pub t_start: f64,
    pub t_end: f64,
    pub(crate) deleted: bool,
}

/// One directed traversal of an edge.
///
/// `forward` is true when the half-edge runs start→end along its edge.
/// `twin` is the opposing traversal on the adjacent face, or NULL while
/// unset. `next`/`prev` link the half-edge into its owning loop.
#[derive(Debug, Clone)]
pub struct HalfEdge {
    pub edge: EdgeId,
    pub forward: bool,
    pub twin: HalfEdgeId,
    pub next: HalfEdgeId,
    pub prev: HalfEdgeId,
    pub owner: LoopId,
    /// The edge's trace in the owning face's (u, v) parameter space
    pub pcurve: Curve2Id,
    pub(crate) deleted: bool,
}

/// A closed cycle of half-edges bounding a face or a hole within it
#[derive(Debug, Clone)]
pub struct Loop {
    pub first: HalfEdgeId,
    pub count: usize,
    pub face: FaceId,
    pub(crate) deleted: bool,
}

/// A bounded region of a surface.
///
/// The first registered loop is the outer boundary; later loops are holes
/// with opposite winding. `reversed` trims orientation without mutating
/// the surface.
#[derive(Debug, Clone)]
pub struct Face {
    pub surface: SurfaceId,
    pub reversed: bool,
    pub loops: Vec<LoopId>,
    pub(crate) deleted: bool,
}

/// An ordered set of faces; `closed` marks a shell that bounds a solid
#[derive(Debug, Clone)]
pub struct Shell {
    pub faces: Vec<FaceId>,
    pub closed: bool,
    pub(crate) deleted: bool,
}

/// The unit returned to callers: an ordered set of shells
#[derive(Debug, Clone)]
pub struct Body {
    pub shells: Vec<ShellId>,
    pub(crate) deleted: bool,
}

/// Geometric carrier of a face. Only planes take part in the planar
/// boolean pipeline.
#[derive(Debug, Clone)]
pub enum Surface {
    Plane(Plane),
}

impl Surface {
    pub fn plane(&self) -> &Plane {
        match self {
            Surface::Plane(p) => p,
        }
    }
}

/// Geometric carrier of an edge in 3D
#[derive(Debug, Clone)]
pub enum Curve3 {
    Line { a: Point3<f64>, b: Point3<f64> },
}

impl Curve3 {
    pub fn at(&self, t: f64) -> Point3<f64> {
        match self {
            Curve3::Line { a, b } => a + (b - a) * t,
        }
    }
}

/// Geometric carrier of a half-edge in a face's (u, v) space
#[derive(Debug, Clone)]
pub enum Curve2 {
    Line { a: Point2<f64>, b: Point2<f64> },
}
