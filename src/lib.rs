// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Solidkit Contributors

//! Solidkit - a planar boundary-representation modeling kernel.
//!
//! Solids live in a [`TopologyModel`] arena and are addressed through
//! typed integer handles. The crate provides primitive builders
//! ([`make_box`], [`extrude_polygon`]), regularized boolean operations
//! ([`boolean_operation`]), and a post-hoc repair pass ([`heal_model`])
//! with structural validation ([`validate_model`]).
//!
//! ```no_run
//! use nalgebra::{Point3, Vector3};
//! use solidkit::{boolean_operation, make_box, BooleanOp, BooleanOptions, TopologyModel};
//!
//! let mut model = TopologyModel::new();
//! let block = make_box(&mut model, Point3::origin(), Vector3::new(4.0, 4.0, 4.0));
//! let tool = make_box(&mut model, Point3::new(0.0, 0.0, 2.0), Vector3::new(2.0, 2.0, 2.0));
//! let result = boolean_operation(
//!     &mut model,
//!     block,
//!     tool,
//!     &BooleanOptions::new(BooleanOp::Subtract),
//! )?;
//! println!("result has {} faces", model.body_faces(result.body).len());
//! # Ok::<(), solidkit::BooleanError>(())
//! ```

pub mod boolean;
pub mod context;
pub mod geom;
pub mod heal;
pub mod primitive;
pub mod topo;

pub use boolean::{
    boolean_operation, BooleanError, BooleanOp, BooleanOptions, BooleanResult,
};
pub use context::{NumericContext, Tolerances};
pub use heal::{heal_model, validate_model, HealOptions, HealingResult, ValidationReport};
pub use primitive::{extrude_polygon, make_box, PrimitiveError};
pub use topo::{BodyId, FaceId, TopologyModel};
