//! Core traits for slabcrate

use crate::{graph::SkeletalGraph, primitives::Point3d, surface::SurfaceMesh};

/// Trait for objects with an axis-aligned extent
pub trait Bounded {
    /// Get the bounding box of the object
    fn bounding_box(&self) -> (Point3d, Point3d);

    /// Get the center point of the object
    fn center(&self) -> Point3d {
        let (min, max) = self.bounding_box();
        Point3d::from((min.coords + max.coords) / 2.0)
    }

    /// Length of the bounding box diagonal
    fn diagonal(&self) -> f64 {
        let (min, max) = self.bounding_box();
        (max - min).norm()
    }
}

fn extend(min: &mut Point3d, max: &mut Point3d, lo: Point3d, hi: Point3d) {
    for i in 0..3 {
        min[i] = min[i].min(lo[i]);
        max[i] = max[i].max(hi[i]);
    }
}

impl Bounded for SurfaceMesh {
    fn bounding_box(&self) -> (Point3d, Point3d) {
        let Some(first) = self.vertices.first() else {
            return (Point3d::origin(), Point3d::origin());
        };

        let mut min = *first;
        let mut max = *first;
        for vertex in &self.vertices {
            extend(&mut min, &mut max, *vertex, *vertex);
        }
        (min, max)
    }
}

/// Box around the spheres themselves, not only their centers.
impl Bounded for SkeletalGraph {
    fn bounding_box(&self) -> (Point3d, Point3d) {
        let mut spheres = self.vertex_ids().map(|v| self.sphere(v));
        let Some(first) = spheres.next() else {
            return (Point3d::origin(), Point3d::origin());
        };

        let reach = |s: &crate::Sphere| {
            let r = nalgebra::Vector3::repeat(s.radius);
            (s.center - r, s.center + r)
        };
        let (mut min, mut max) = reach(first);
        for sphere in spheres {
            let (lo, hi) = reach(sphere);
            extend(&mut min, &mut max, lo, hi);
        }
        (min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sphere;
    use approx::assert_relative_eq;

    #[test]
    fn test_surface_bounds() {
        let mesh = SurfaceMesh::from_vertices_and_faces(
            vec![Point3d::new(-1.0, 0.0, 2.0), Point3d::new(1.0, 4.0, 0.0)],
            vec![],
        );
        let (min, max) = mesh.bounding_box();
        assert_eq!(min, Point3d::new(-1.0, 0.0, 0.0));
        assert_eq!(max, Point3d::new(1.0, 4.0, 2.0));
        assert_relative_eq!(mesh.center(), Point3d::new(0.0, 2.0, 1.0));
    }

    #[test]
    fn test_graph_bounds_include_radius() {
        let mut g = SkeletalGraph::new();
        g.add_vertex(Sphere::from_coords(0.0, 0.0, 0.0, 1.0), false);
        g.add_vertex(Sphere::from_coords(2.0, 0.0, 0.0, 0.5), false);
        let (min, max) = g.bounding_box();
        assert_eq!(min, Point3d::new(-1.0, -1.0, -1.0));
        assert_eq!(max, Point3d::new(2.5, 1.0, 1.0));
        assert_relative_eq!(SkeletalGraph::new().diagonal(), 0.0);
    }
}
