// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Solidkit Contributors

//! Numeric context: the tolerance bundle every downstream comparison uses

use serde::{Deserialize, Serialize};

/// Length and angle tolerances controlling all "same position/direction" decisions
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Tolerances {
    /// Two points closer than this are the same point
    pub length: f64,
    /// Two unit directions within this angle (radians) are the same direction
    pub angle: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            length: 1e-6,
            angle: 1e-9,
        }
    }
}

/// Tolerance bundle supplied at model-creation time
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NumericContext {
    pub tol: Tolerances,
}

impl NumericContext {
    pub fn new(tol: Tolerances) -> Self {
        Self { tol }
    }

    /// Relaxed quantum used for vertex welding and edge matching.
    /// Snapping happens on a grid ten times coarser than the length tolerance
    /// so coincident geometry from different numeric histories still unifies.
    pub fn weld_quantum(&self) -> f64 {
        self.tol.length * 10.0
    }

    /// Faces below this area are degenerate and dropped
    pub fn min_face_area(&self) -> f64 {
        let q = self.weld_quantum();
        q * q
    }

    /// Quantize a coordinate to a fixed-point key at the weld quantum
    pub fn quantize(&self, v: f64) -> i64 {
        quantize(v, self.weld_quantum())
    }

    /// Position key for welding and geometry-key construction
    pub fn position_key(&self, p: &nalgebra::Point3<f64>) -> (i64, i64, i64) {
        (self.quantize(p.x), self.quantize(p.y), self.quantize(p.z))
    }

    /// Check two lengths for equality within the length tolerance
    pub fn same_length(&self, a: f64, b: f64) -> bool {
        (a - b).abs() < self.tol.length
    }

    /// Check two points for coincidence within the length tolerance
    pub fn same_point(&self, a: &nalgebra::Point3<f64>, b: &nalgebra::Point3<f64>) -> bool {
        (a - b).norm() < self.tol.length
    }
}

/// Fixed-point quantization. Hash keys are built from these integers,
/// never from raw floats.
pub fn quantize(v: f64, quantum: f64) -> i64 {
    (v / quantum).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    #[test]
    fn test_default_tolerances() {
        let ctx = NumericContext::default();
        assert_eq!(ctx.tol.length, 1e-6);
        assert_relative_eq!(ctx.weld_quantum(), 1e-5, epsilon = 1e-12);
    }

    #[test]
    fn test_quantize_snaps_nearby_values() {
        let ctx = NumericContext::default();
        let a = ctx.quantize(1.0);
        let b = ctx.quantize(1.0 + 1e-7);
        assert_eq!(a, b);

        let c = ctx.quantize(1.0 + 1e-3);
        assert_ne!(a, c);
    }

    #[test]
    fn test_position_key_groups_coincident_points() {
        let ctx = NumericContext::default();
        let p = Point3::new(1.0, 2.0, 3.0);
        let q = Point3::new(1.0 + 1e-8, 2.0 - 1e-8, 3.0);
        assert_eq!(ctx.position_key(&p), ctx.position_key(&q));
    }
}
