// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Solidkit Contributors

//! Geometry module - planes, bounding boxes, and 2D polygon operations

mod bbox;
mod clip2;
mod plane;
mod polygon;

pub use bbox::BoundingBox;
pub use clip2::{region_difference, region_intersection, Region};
pub(crate) use clip2::nest_loops;
pub use plane::Plane;
pub use polygon::{
    point_in_loops, point_in_polygon, point_segment_distance, polygon_centroid,
    segment_intersection, signed_area, Containment,
};
