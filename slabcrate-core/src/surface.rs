//! Reference surface the skeleton approximates

use crate::primitives::Point3d;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Triangle soup of the input surface, kept only to audit the envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurfaceMesh {
    pub vertices: Vec<Point3d>,
    pub faces: Vec<[usize; 3]>,
}

impl SurfaceMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vertices_and_faces(vertices: Vec<Point3d>, faces: Vec<[usize; 3]>) -> Self {
        Self { vertices, faces }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Fails on the first face referencing a missing vertex.
    pub fn validate(&self) -> Result<()> {
        for (index, face) in self.faces.iter().enumerate() {
            if let Some(&vertex) = face.iter().find(|&&v| v >= self.vertices.len()) {
                return Err(Error::DanglingReference {
                    kind: "surface face",
                    index,
                    vertex,
                });
            }
        }
        Ok(())
    }

    /// Points at which the envelope deviation is measured: every vertex and
    /// every face centroid. Faces with a missing vertex contribute no centroid.
    pub fn sample_points(&self) -> Vec<Point3d> {
        let mut samples = Vec::with_capacity(self.vertices.len() + self.faces.len());
        samples.extend_from_slice(&self.vertices);
        for face in &self.faces {
            let corners = [
                self.vertices.get(face[0]),
                self.vertices.get(face[1]),
                self.vertices.get(face[2]),
            ];
            if let [Some(a), Some(b), Some(c)] = corners {
                samples.push(Point3d::from((a.coords + b.coords + c.coords) / 3.0));
            }
        }
        samples
    }
}
