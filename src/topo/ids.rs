// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Solidkit Contributors

//! Branded index handles for topology entities.
//!
//! Handles are never reused across entity kinds; a distinguished NULL
//! value marks "no relation". Dereferencing NULL, an out-of-range handle,
//! or a deleted entity is a programming error, not a recoverable result.

use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            pub const NULL: $name = $name(u32::MAX);

            pub fn is_null(self) -> bool {
                self == Self::NULL
            }

            pub(crate) fn index(self) -> usize {
                debug_assert!(!self.is_null(), concat!(stringify!($name), " is NULL"));
                self.0 as usize
            }
        }
    };
}

entity_id!(
    /// Handle to a topological vertex
    VertexId
);
entity_id!(
    /// Handle to a topological edge
    EdgeId
);
entity_id!(
    /// Handle to a directed half-edge
    HalfEdgeId
);
entity_id!(
    /// Handle to a closed loop of half-edges
    LoopId
);
entity_id!(
    /// Handle to a face
    FaceId
);
entity_id!(
    /// Handle to a shell
    ShellId
);
entity_id!(
    /// Handle to a body
    BodyId
);
entity_id!(
    /// Handle into the surface geometry array
    SurfaceId
);
entity_id!(
    /// Handle into the 3D curve geometry array
    Curve3Id
);
entity_id!(
    /// Handle into the 2D curve geometry array
    Curve2Id
);
