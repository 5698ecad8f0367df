//! Render/export attributes of a final skeleton
//!
//! Computed once after simplification from the graph alone; nothing here
//! feeds back into collapse costs.

use crate::graph::{EdgeId, FaceId, SkeletalGraph, VertexId};
use crate::primitives::{
    slab_tangent_planes, triangle_cross, SlabCone, SlabTriangle, Vector3d, GEOMETRY_EPSILON,
};
use std::collections::BTreeMap;

/// Per-face export data.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceAttributes {
    /// Unit normal of the center triangle; `None` for collinear centers.
    pub normal: Option<Vector3d>,
    /// The two envelope tangent triangles; `None` if no common tangent plane exists.
    pub simple_triangles: Option<[SlabTriangle; 2]>,
}

/// Normals, cones and envelope triangles of every live entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlabAttributes {
    pub faces: BTreeMap<FaceId, FaceAttributes>,
    pub vertex_normals: BTreeMap<VertexId, Vector3d>,
    pub edge_cones: BTreeMap<EdgeId, SlabCone>,
    /// Faces flagged for collinear centers.
    pub degenerate_faces: Vec<FaceId>,
}

impl SlabAttributes {
    pub fn compute(graph: &SkeletalGraph) -> Self {
        let mut attributes = SlabAttributes::default();

        // Area-weighted vertex normals fall out of summing raw cross products.
        let mut accumulated: BTreeMap<VertexId, Vector3d> = BTreeMap::new();

        for f in graph.face_ids() {
            let [a, b, c] = graph.face_spheres(f);
            let cross = triangle_cross(&a.center, &b.center, &c.center);
            let length = cross.norm();

            let normal = if length < GEOMETRY_EPSILON {
                attributes.degenerate_faces.push(f);
                None
            } else {
                for v in graph.face(f).vertices() {
                    *accumulated.entry(v).or_insert_with(Vector3d::zeros) += cross;
                }
                Some(cross / length)
            };

            let simple_triangles = slab_tangent_planes([a, b, c])
                .map(|planes| [planes[0].to_triangle(), planes[1].to_triangle()]);

            attributes.faces.insert(
                f,
                FaceAttributes {
                    normal,
                    simple_triangles,
                },
            );
        }

        for (v, sum) in accumulated {
            let length = sum.norm();
            if length >= GEOMETRY_EPSILON {
                attributes.vertex_normals.insert(v, sum / length);
            }
        }

        for e in graph.edge_ids() {
            let [a, b] = graph.edge(e).vertices();
            attributes
                .edge_cones
                .insert(e, SlabCone::between(graph.sphere(a), graph.sphere(b)));
        }

        attributes
    }

    pub fn face_normal(&self, f: FaceId) -> Option<Vector3d> {
        self.faces.get(&f).and_then(|attr| attr.normal)
    }
}
