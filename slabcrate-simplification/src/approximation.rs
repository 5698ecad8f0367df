//! Envelope-to-surface deviation audit
//!
//! The envelope of a slab mesh is the union of its spheres, of the
//! interpolated spheres swept along every edge and of those swept over every
//! face. A surface sample's deviation is the absolute distance from the
//! envelope boundary, measured against the nearest of these primitives.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use slabcrate_core::{Bounded, Point3d, SkeletalGraph, Sphere, SurfaceMesh, GEOMETRY_EPSILON};

/// Deviation of an envelope from the surface it approximates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ApproximationError {
    pub max: f64,
    pub mean: f64,
    /// `max` over the surface's bounding-box diagonal.
    pub relative_max: f64,
    pub samples: usize,
}

/// Envelope primitives copied out of the graph for parallel queries.
struct Envelope {
    spheres: Vec<Sphere>,
    segments: Vec<[Sphere; 2]>,
    patches: Vec<[Sphere; 3]>,
}

impl Envelope {
    fn from_graph(graph: &SkeletalGraph) -> Self {
        Self {
            spheres: graph.vertex_ids().map(|v| *graph.sphere(v)).collect(),
            segments: graph
                .edge_ids()
                .map(|e| graph.edge(e).vertices().map(|v| *graph.sphere(v)))
                .collect(),
            patches: graph
                .face_ids()
                .map(|f| graph.face_spheres(f).map(|s| *s))
                .collect(),
        }
    }

    /// Signed distance from `p` to the envelope boundary (negative inside).
    fn signed_distance(&self, p: &Point3d) -> f64 {
        let spheres = self.spheres.iter().map(|s| s.signed_distance(p));
        let segments = self
            .segments
            .iter()
            .filter_map(|[a, b]| segment_distance(p, a, b));
        let patches = self
            .patches
            .iter()
            .filter_map(|[a, b, c]| patch_distance(p, a, b, c));
        spheres
            .chain(segments)
            .chain(patches)
            .fold(f64::INFINITY, f64::min)
    }
}

fn segment_distance(p: &Point3d, a: &Sphere, b: &Sphere) -> Option<f64> {
    let direction = b.center - a.center;
    let length_sq = direction.norm_squared();
    if length_sq < GEOMETRY_EPSILON {
        return None;
    }
    let t = ((p - a.center).dot(&direction) / length_sq).clamp(0.0, 1.0);
    Some(a.lerp(b, t).signed_distance(p))
}

/// Distance to the sphere interpolated at the projection of `p`, if that
/// projection falls inside the center triangle.
fn patch_distance(p: &Point3d, a: &Sphere, b: &Sphere, c: &Sphere) -> Option<f64> {
    let v0 = b.center - a.center;
    let v1 = c.center - a.center;
    let v2 = p - a.center;
    let d00 = v0.dot(&v0);
    let d01 = v0.dot(&v1);
    let d11 = v1.dot(&v1);
    let denom = d00 * d11 - d01 * d01;
    if denom.abs() < GEOMETRY_EPSILON {
        return None;
    }
    let d20 = v2.dot(&v0);
    let d21 = v2.dot(&v1);
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    let u = 1.0 - v - w;
    if u < 0.0 || v < 0.0 || w < 0.0 {
        return None;
    }
    let center = Point3d::from(a.center.coords * u + b.center.coords * v + c.center.coords * w);
    let radius = a.radius * u + b.radius * v + c.radius * w;
    Some(Sphere::new(center, radius).signed_distance(p))
}

/// Measure how far the envelope of `graph` strays from `surface`.
///
/// Returns `None` when either side is empty.
pub fn measure(graph: &SkeletalGraph, surface: &SurfaceMesh) -> Option<ApproximationError> {
    if graph.is_empty() || surface.is_empty() {
        return None;
    }
    let envelope = Envelope::from_graph(graph);
    let samples = surface.sample_points();

    let deviations: Vec<f64> = samples
        .par_iter()
        .map(|p| envelope.signed_distance(p).abs())
        .collect();

    let max = deviations.iter().copied().fold(0.0, f64::max);
    let mean = deviations.iter().sum::<f64>() / deviations.len() as f64;
    let diagonal = surface.diagonal();
    let relative_max = if diagonal > GEOMETRY_EPSILON {
        max / diagonal
    } else {
        0.0
    };

    Some(ApproximationError {
        max,
        mean,
        relative_max,
        samples: deviations.len(),
    })
}
