//! Spherical quadric error metric
//!
//! A `SphereQuadric` measures how far a candidate sphere `s = (c, r)` is from
//! a set of envelope tangent planes, as a quadratic form over 4D
//! (center, radius) space:
//!
//! ```text
//! Q(s) = sᵀ A s − 2 bᵀ s + c
//! ```
//!
//! A tangent plane with unit normal `n` through point `p` contributes the
//! squared error `(n·(p − c) − r)²`, which is zero for every sphere touching
//! the plane from its inner side.

use crate::primitives::{Point3d, Sphere, Vector3d};
use nalgebra::{Matrix4, Vector4};
use std::ops::{Add, AddAssign, Mul};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereQuadric {
    a: Matrix4<f64>,
    b: Vector4<f64>,
    c: f64,
}

impl Default for SphereQuadric {
    fn default() -> Self {
        Self::zero()
    }
}

impl SphereQuadric {
    pub fn zero() -> Self {
        Self {
            a: Matrix4::zeros(),
            b: Vector4::zeros(),
            c: 0.0,
        }
    }

    /// Quadric of the linear error `d − m·s`.
    fn from_linear(m: Vector4<f64>, d: f64) -> Self {
        Self {
            a: m * m.transpose(),
            b: m * d,
            c: d * d,
        }
    }

    /// Error of a sphere against a tangent plane (sphere on the side opposite `normal`).
    pub fn from_tangent_plane(normal: &Vector3d, point: &Point3d) -> Self {
        let m = Vector4::new(normal.x, normal.y, normal.z, 1.0);
        Self::from_linear(m, normal.dot(&point.coords))
    }

    /// Squared distance of the center from a plane; the radius is unconstrained.
    pub fn from_constraint_plane(normal: &Vector3d, point: &Point3d) -> Self {
        let m = Vector4::new(normal.x, normal.y, normal.z, 0.0);
        Self::from_linear(m, normal.dot(&point.coords))
    }

    /// `weight · ‖s − s₀‖²` in (center, radius) space.
    pub fn from_ball(sphere: &Sphere, weight: f64) -> Self {
        let s0 = sphere.to_vector4();
        Self {
            a: Matrix4::identity() * weight,
            b: s0 * weight,
            c: s0.norm_squared() * weight,
        }
    }

    /// `‖c − c₀‖²`; anchors a center without constraining the radius.
    pub fn from_center_anchor(center: &Point3d) -> Self {
        let mut a = Matrix4::zeros();
        a[(0, 0)] = 1.0;
        a[(1, 1)] = 1.0;
        a[(2, 2)] = 1.0;
        Self {
            a,
            b: Vector4::new(center.x, center.y, center.z, 0.0),
            c: center.coords.norm_squared(),
        }
    }

    /// Error of `sphere`; clamped at zero against round-off. NaN passes through.
    pub fn evaluate(&self, sphere: &Sphere) -> f64 {
        let s = sphere.to_vector4();
        let value = s.dot(&(self.a * s)) - 2.0 * self.b.dot(&s) + self.c;
        if value < 0.0 {
            0.0
        } else {
            value
        }
    }

    /// The sphere minimizing this quadric, if the system is well-posed.
    pub fn minimizer(&self) -> Option<Sphere> {
        let inv = self.a.try_inverse()?;
        let s = inv * self.b;
        let sphere = Sphere::from_vector4(&s);
        sphere.is_finite().then_some(sphere)
    }
}

impl AddAssign for SphereQuadric {
    fn add_assign(&mut self, other: Self) {
        self.a += other.a;
        self.b += other.b;
        self.c += other.c;
    }
}

impl Add for SphereQuadric {
    type Output = Self;

    fn add(mut self, other: Self) -> Self {
        self += other;
        self
    }
}

impl Mul<f64> for SphereQuadric {
    type Output = Self;

    fn mul(self, weight: f64) -> Self {
        Self {
            a: self.a * weight,
            b: self.b * weight,
            c: self.c * weight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_tangent_sphere_has_zero_error() {
        let n = Vector3d::new(0.0, 0.0, 1.0);
        let q = SphereQuadric::from_tangent_plane(&n, &Point3d::new(0.0, 0.0, 1.0));
        assert_relative_eq!(q.evaluate(&Sphere::from_coords(5.0, -3.0, 0.0, 1.0)), 0.0);
        // Sphere too small by 0.5
        assert_relative_eq!(q.evaluate(&Sphere::from_coords(0.0, 0.0, 0.0, 0.5)), 0.25);
    }

    #[test]
    fn test_ball_term() {
        let s0 = Sphere::from_coords(1.0, 1.0, 1.0, 1.0);
        let q = SphereQuadric::from_ball(&s0, 2.0);
        assert_relative_eq!(q.evaluate(&s0), 0.0, epsilon = 1e-12);
        assert_relative_eq!(q.evaluate(&Sphere::from_coords(1.0, 1.0, 1.0, 2.0)), 2.0, epsilon = 1e-12);
        assert_relative_eq!(q.minimizer().unwrap().radius, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_center_anchor_ignores_radius() {
        let q = SphereQuadric::from_center_anchor(&Point3d::new(1.0, 0.0, 0.0));
        assert_relative_eq!(q.evaluate(&Sphere::from_coords(1.0, 0.0, 0.0, 7.0)), 0.0, epsilon = 1e-12);
        assert_relative_eq!(q.evaluate(&Sphere::from_coords(3.0, 0.0, 0.0, 7.0)), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_minimizer_recovers_inscribed_sphere() {
        // Four tangent planes of the unit-radius sphere at (0, 0, 0), plus a
        // tiny ball term for the remaining degree of freedom.
        let normals = [
            Vector3d::new(1.0, 0.0, 0.0),
            Vector3d::new(-1.0, 0.0, 0.0),
            Vector3d::new(0.0, 1.0, 0.0),
            Vector3d::new(0.0, 0.0, 1.0),
        ];
        let mut q = SphereQuadric::from_ball(&Sphere::from_coords(0.1, 0.1, 0.1, 0.5), 1e-6);
        for n in &normals {
            q += SphereQuadric::from_tangent_plane(n, &Point3d::from(*n));
        }
        let best = q.minimizer().unwrap();
        assert_relative_eq!(best.radius, 1.0, epsilon = 1e-3);
        assert_relative_eq!(best.center.x, 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_singular_quadric_has_no_minimizer() {
        let q = SphereQuadric::from_tangent_plane(&Vector3d::new(0.0, 0.0, 1.0), &Point3d::origin());
        assert!(q.minimizer().is_none());
    }
}
