// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Solidkit Contributors

//! Planar surface with an explicit 2D coordinate frame

use nalgebra::{Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// A plane with an embedded (u, v) frame.
///
/// `normal` and `x_dir` are unit length and perpendicular; `y_dir` is
/// derived so (x_dir, y_dir, normal) is right-handed. The frame makes
/// every face polygon expressible as ordered 2D points.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Plane {
    pub origin: Point3<f64>,
    pub normal: Vector3<f64>,
    pub x_dir: Vector3<f64>,
}

impl Plane {
    pub fn new(origin: Point3<f64>, normal: Vector3<f64>, x_dir: Vector3<f64>) -> Self {
        let normal = normal.normalize();
        // Re-orthogonalize x_dir against the normal
        let x_dir = (x_dir - normal * normal.dot(&x_dir)).normalize();
        Self {
            origin,
            normal,
            x_dir,
        }
    }

    /// Build a frame from origin and normal alone, picking the least
    /// dominant axis to seed x_dir.
    pub fn from_normal(origin: Point3<f64>, normal: Vector3<f64>) -> Self {
        let normal = normal.normalize();
        let seed = if normal.x.abs() <= normal.y.abs() && normal.x.abs() <= normal.z.abs() {
            Vector3::x()
        } else if normal.y.abs() <= normal.z.abs() {
            Vector3::y()
        } else {
            Vector3::z()
        };
        let x_dir = (seed - normal * normal.dot(&seed)).normalize();
        Self {
            origin,
            normal,
            x_dir,
        }
    }

    pub fn y_dir(&self) -> Vector3<f64> {
        self.normal.cross(&self.x_dir)
    }

    /// Signed distance from the plane
    pub fn signed_distance(&self, p: &Point3<f64>) -> f64 {
        self.normal.dot(&(p - self.origin))
    }

    /// Signed distance of the plane itself from the world origin
    pub fn origin_distance(&self) -> f64 {
        self.normal.dot(&self.origin.coords)
    }

    /// Project a 3D point into the plane's (u, v) frame
    pub fn project(&self, p: &Point3<f64>) -> Point2<f64> {
        let d = p - self.origin;
        Point2::new(d.dot(&self.x_dir), d.dot(&self.y_dir()))
    }

    /// Map a (u, v) point back to 3D
    pub fn unproject(&self, uv: &Point2<f64>) -> Point3<f64> {
        self.origin + self.x_dir * uv.x + self.y_dir() * uv.y
    }

    /// A plane with the same frame origin but opposite normal
    pub fn flipped(&self) -> Self {
        Self {
            origin: self.origin,
            normal: -self.normal,
            x_dir: self.x_dir,
        }
    }

    /// Intersection line of two planes, if they are not parallel within `angle_tol`.
    /// Returns a point on the line and the (unit) line direction.
    pub fn intersection_line(
        &self,
        other: &Plane,
        angle_tol: f64,
    ) -> Option<(Point3<f64>, Vector3<f64>)> {
        let n1 = self.normal;
        let n2 = other.normal;
        let dir0 = n1.cross(&n2);
        let len = dir0.norm();
        if len < angle_tol.max(1e-12) {
            return None;
        }

        // Point solving both plane equations, closest to the world origin
        let d1 = self.origin_distance();
        let d2 = other.origin_distance();
        let point = Point3::from((n2.cross(&dir0) * d1 + dir0.cross(&n1) * d2) / dir0.norm_squared());
        Some((point, dir0 / len))
    }
}
