//! Geometry primitives of the slab envelope: spheres, cones and tangent triangles

use nalgebra::{Point3, Vector3, Vector4};
use serde::{Deserialize, Serialize};

/// A 3D point with double precision coordinates
pub type Point3d = Point3<f64>;

/// A 3D vector with double precision components
pub type Vector3d = Vector3<f64>;

/// Tolerance below which lengths and areas are treated as zero.
pub const GEOMETRY_EPSILON: f64 = 1e-12;

/// A medial sphere: center plus non-negative radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    pub center: Point3d,
    pub radius: f64,
}

impl Sphere {
    pub fn new(center: Point3d, radius: f64) -> Self {
        Self { center, radius }
    }

    pub fn from_coords(x: f64, y: f64, z: f64, radius: f64) -> Self {
        Self::new(Point3d::new(x, y, z), radius)
    }

    /// The sphere as a point of (center, radius) space.
    pub fn to_vector4(&self) -> Vector4<f64> {
        Vector4::new(self.center.x, self.center.y, self.center.z, self.radius)
    }

    pub fn from_vector4(v: &Vector4<f64>) -> Self {
        Self::from_coords(v[0], v[1], v[2], v[3])
    }

    pub fn is_finite(&self) -> bool {
        self.radius.is_finite() && self.center.iter().all(|c| c.is_finite())
    }

    /// Signed distance from `p` to the sphere surface (negative inside).
    pub fn signed_distance(&self, p: &Point3d) -> f64 {
        (p - self.center).norm() - self.radius
    }

    /// Linear interpolation in (center, radius) space.
    pub fn lerp(&self, other: &Sphere, t: f64) -> Sphere {
        Sphere::new(
            self.center + (other.center - self.center) * t,
            self.radius + (other.radius - self.radius) * t,
        )
    }

    /// True if `other` lies entirely inside this sphere.
    pub fn contains(&self, other: &Sphere) -> bool {
        (other.center - self.center).norm() + other.radius <= self.radius
    }
}

/// Shape class of the envelope between two spheres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConeKind {
    /// Truncated cone (radii differ).
    Cone,
    /// Both spheres share a radius.
    Cylinder,
    /// Coincident centers or one sphere swallows the other; no tangent cone.
    Degenerate,
}

/// The tangent cone enveloping two spheres of a slab edge.
///
/// `base` and `top` are the centers of the two circles where the cone touches
/// the first and second sphere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlabCone {
    pub kind: ConeKind,
    pub axis: Vector3d,
    pub base: Point3d,
    pub base_radius: f64,
    pub top: Point3d,
    pub top_radius: f64,
}

impl SlabCone {
    /// Compute the envelope cone between `a` and `b`.
    pub fn between(a: &Sphere, b: &Sphere) -> Self {
        let delta = b.center - a.center;
        let distance = delta.norm();
        let radius_gap = a.radius - b.radius;

        if distance < GEOMETRY_EPSILON || a.contains(b) || b.contains(a) {
            return Self {
                kind: ConeKind::Degenerate,
                axis: Vector3d::zeros(),
                base: a.center,
                base_radius: a.radius,
                top: b.center,
                top_radius: b.radius,
            };
        }

        let axis = delta / distance;
        let sin_alpha = radius_gap / distance;
        let cos_alpha = (1.0 - sin_alpha * sin_alpha).max(0.0).sqrt();
        let kind = if radius_gap.abs() < GEOMETRY_EPSILON {
            ConeKind::Cylinder
        } else {
            ConeKind::Cone
        };

        Self {
            kind,
            axis,
            base: a.center + axis * (a.radius * sin_alpha),
            base_radius: a.radius * cos_alpha,
            top: b.center + axis * (b.radius * sin_alpha),
            top_radius: b.radius * cos_alpha,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.kind == ConeKind::Degenerate
    }
}

/// One of the two triangles cut from the envelope's tangent planes of a slab face.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlabTriangle {
    pub vertices: [Point3d; 3],
    pub normal: Vector3d,
}

/// A plane tangent to all three spheres of a face, touching each at `points[i]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TangentPlane {
    pub normal: Vector3d,
    pub points: [Point3d; 3],
}

impl TangentPlane {
    pub fn to_triangle(&self) -> SlabTriangle {
        SlabTriangle {
            vertices: self.points,
            normal: self.normal,
        }
    }
}

/// Unnormalized normal of the triangle spanned by three centers.
pub fn triangle_cross(a: &Point3d, b: &Point3d, c: &Point3d) -> Vector3d {
    (b - a).cross(&(c - a))
}

/// Area of the triangle spanned by three points.
pub fn triangle_area(a: &Point3d, b: &Point3d, c: &Point3d) -> f64 {
    0.5 * triangle_cross(a, b, c).norm()
}

/// Unit normal of a triangle, `None` when the points are collinear.
pub fn triangle_normal(a: &Point3d, b: &Point3d, c: &Point3d) -> Option<Vector3d> {
    let n = triangle_cross(a, b, c);
    let len = n.norm();
    if len < GEOMETRY_EPSILON || !len.is_finite() {
        None
    } else {
        Some(n / len)
    }
}

/// The two planes tangent to all three spheres, sphere bodies on the inner side.
///
/// Each plane `n·x = h` satisfies `n·c_i + r_i = h`, so `n` splits into an
/// in-plane part fixed by the radius differences plus `±t` along the center
/// triangle's normal. Returns `None` for collinear centers or when the radius
/// differences are too steep for a common tangent plane.
pub fn slab_tangent_planes(spheres: [&Sphere; 3]) -> Option<[TangentPlane; 2]> {
    let [s0, s1, s2] = spheres;
    let e1 = s1.center - s0.center;
    let e2 = s2.center - s0.center;
    let face_normal = triangle_normal(&s0.center, &s1.center, &s2.center)?;

    let g11 = e1.dot(&e1);
    let g12 = e1.dot(&e2);
    let g22 = e2.dot(&e2);
    let det = g11 * g22 - g12 * g12;
    if det.abs() < GEOMETRY_EPSILON {
        return None;
    }

    let rhs1 = s0.radius - s1.radius;
    let rhs2 = s0.radius - s2.radius;
    let alpha = (g22 * rhs1 - g12 * rhs2) / det;
    let beta = (g11 * rhs2 - g12 * rhs1) / det;
    let in_plane = e1 * alpha + e2 * beta;

    let in_plane_sq = in_plane.norm_squared();
    if in_plane_sq >= 1.0 {
        return None;
    }
    let t = (1.0 - in_plane_sq).sqrt();

    let make = |normal: Vector3d| TangentPlane {
        normal,
        points: [
            s0.center + normal * s0.radius,
            s1.center + normal * s1.radius,
            s2.center + normal * s2.radius,
        ],
    };

    Some([
        make(in_plane + face_normal * t),
        make(in_plane - face_normal * t),
    ])
}
