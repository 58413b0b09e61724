// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Solidkit Contributors

//! Topology module - the entity arena and its typed handles

mod entities;
mod ids;
mod model;

pub use entities::{Body, Curve2, Curve3, Edge, Face, HalfEdge, Loop, Shell, Surface, Vertex};
pub use ids::{
    BodyId, Curve2Id, Curve3Id, EdgeId, FaceId, HalfEdgeId, LoopId, ShellId, SurfaceId, VertexId,
};
pub use model::{LoopHalfEdges, TopologyModel, MAX_LOOP_WALK};
