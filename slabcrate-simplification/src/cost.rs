//! Collapse cost of slab edges
//!
//! Every sphere carries a quadric summing the squared distances of candidate
//! spheres to the envelope tangent planes of its incident faces. Collapsing
//! an edge merges the two quadrics; the merged sphere is the one minimizing
//! the combined error and its error is the priority of the collapse.

use crate::params::{BoundaryMode, SimplifyConfig, WeightingScheme};
use itertools::Itertools;
use slabcrate_core::{
    slab_tangent_planes, triangle_area, Degeneracy, EdgeId, Point3d,
    SkeletalGraph, Sphere, SphereQuadric, VertexId, GEOMETRY_EPSILON,
};
use std::collections::BTreeMap;

/// Lower bound of `1 − slope²` in the hyperbolic weight.
const MIN_HYPERBOLIC_DENOMINATOR: f64 = 0.01;

/// A priced collapse of one edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub edge: EdgeId,
    pub survivor: VertexId,
    pub removed: VertexId,
    /// Sphere the survivor takes on.
    pub sphere: Sphere,
    pub cost: f64,
}

/// Quadric folding and edge pricing for one configuration.
#[derive(Debug, Clone)]
pub struct CostModel {
    config: SimplifyConfig,
}

impl CostModel {
    pub fn new(config: SimplifyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimplifyConfig {
        &self.config
    }

    /// Weight of a face's tangent planes under the configured scheme.
    pub fn face_weight(&self, spheres: [&Sphere; 3]) -> f64 {
        let area = || triangle_area(&spheres[0].center, &spheres[1].center, &spheres[2].center);
        match self.config.weighting {
            WeightingScheme::Uniform => 1.0,
            WeightingScheme::Area => area(),
            WeightingScheme::Hyperbolic => hyperbolic_weight(spheres),
            WeightingScheme::AreaHyperbolic => area() * hyperbolic_weight(spheres),
        }
    }

    /// Fold face planes, ball terms and boundary constraints into the quadrics
    /// of every live sphere. Replaces whatever quadrics the spheres held.
    pub fn initialize_quadrics(&self, graph: &mut SkeletalGraph) {
        let mut quadrics: BTreeMap<VertexId, SphereQuadric> = BTreeMap::new();
        let mut boundary: BTreeMap<VertexId, SphereQuadric> = BTreeMap::new();
        let mut degeneracies = Vec::new();

        for f in graph.face_ids() {
            let vertices = graph.face(f).vertices();
            let spheres = graph.face_spheres(f);
            let Some(face_normal) = graph.face_normal(f) else {
                degeneracies.push(Degeneracy::CollinearFace(f));
                continue;
            };

            let weight = self.face_weight(spheres);
            let mut contribution = SphereQuadric::zero();
            let mut per_vertex = [SphereQuadric::zero(); 3];
            match slab_tangent_planes(spheres) {
                Some(planes) => {
                    for plane in &planes {
                        contribution +=
                            SphereQuadric::from_tangent_plane(&plane.normal, &plane.points[0]);
                    }
                }
                // No common tangent plane: pin each sphere between the two
                // center-plane offsets of its own radius.
                None => {
                    for (slot, sphere) in per_vertex.iter_mut().zip(spheres) {
                        for normal in [face_normal, -face_normal] {
                            let touch = sphere.center + normal * sphere.radius;
                            *slot += SphereQuadric::from_tangent_plane(&normal, &touch);
                        }
                    }
                }
            }

            for (v, extra) in vertices.into_iter().zip(per_vertex) {
                *quadrics.entry(v).or_default() += (contribution + extra) * weight;
            }
        }

        for e in graph.edge_ids() {
            if graph.is_edge_degenerate(e) {
                degeneracies.push(Degeneracy::CoincidentSpheres(e));
            }

            let edge = graph.edge(e);
            if !edge.is_boundary() {
                continue;
            }
            let Some(&f) = edge.faces().iter().next() else {
                continue;
            };
            let Some(face_normal) = graph.face_normal(f) else {
                continue;
            };

            let [a, b] = edge.vertices();
            let origin = graph.sphere(a).center;
            let across = (graph.sphere(b).center - origin).cross(&face_normal);
            let length = across.norm();
            if length < GEOMETRY_EPSILON {
                continue;
            }
            let plane = SphereQuadric::from_constraint_plane(&(across / length), &origin);
            for v in [a, b] {
                *boundary.entry(v).or_default() += plane;
            }
        }

        let ids: Vec<VertexId> = graph.vertex_ids().collect();
        for v in ids {
            let vertex = graph.vertex(v);
            let mut quadric = quadrics.remove(&v).unwrap_or_default();
            quadric += SphereQuadric::from_ball(&vertex.sphere, self.config.scale_factor);

            let mut boundary_quadric = boundary.remove(&v).unwrap_or_default();
            if vertex.is_marked_boundary() {
                boundary_quadric += SphereQuadric::from_center_anchor(&vertex.sphere.center);
            }
            graph.set_quadrics(v, quadric, boundary_quadric);
        }

        for degeneracy in degeneracies {
            graph.record_degeneracy(degeneracy);
        }
    }

    /// Price the collapse of `edge`, or `None` if it is inadmissible.
    pub fn evaluate(&self, graph: &SkeletalGraph, edge: EdgeId) -> Option<Candidate> {
        if !graph.is_edge_valid(edge) {
            return None;
        }
        let slab_edge = graph.edge(edge);
        let [a, b] = slab_edge.vertices();
        let (va, vb) = (graph.vertex(a), graph.vertex(b));
        let a_boundary = graph.is_boundary_vertex(a);
        let b_boundary = graph.is_boundary_vertex(b);
        let rim = slab_edge.is_boundary();

        let (survivor, removed) = if b_boundary && !a_boundary {
            (b, a)
        } else {
            (a, b)
        };

        let combined = va.quadric
            + vb.quadric
            + (va.boundary_quadric + vb.boundary_quadric) * self.config.boundary_weight;
        let optimum = optimal_sphere(&combined, &va.sphere, &vb.sphere);
        let one_boundary = a_boundary != b_boundary;

        let sphere = match self.config.boundary_mode {
            BoundaryMode::Unconstrained => optimum,
            BoundaryMode::Frozen => {
                if rim || (a_boundary && b_boundary) {
                    return None;
                }
                if one_boundary {
                    *graph.sphere(survivor)
                } else {
                    optimum
                }
            }
            BoundaryMode::Projected => {
                if rim || (a_boundary && b_boundary) {
                    let center = project_onto_segment(&optimum, &va.sphere, &vb.sphere);
                    Sphere::new(center, optimum.radius)
                } else if one_boundary {
                    Sphere::new(graph.sphere(survivor).center, optimum.radius)
                } else {
                    optimum
                }
            }
        };

        let cost = combined.evaluate(&sphere);
        if !cost.is_finite() || !sphere.is_finite() {
            return None;
        }

        Some(Candidate {
            edge,
            survivor,
            removed,
            sphere,
            cost,
        })
    }
}

/// `1 / max(1 − s², 0.01)` with `s` the steepest radius slope of the face.
fn hyperbolic_weight(spheres: [&Sphere; 3]) -> f64 {
    let slope = spheres
        .iter()
        .tuple_combinations()
        .map(|(p, q)| {
            let distance = (p.center - q.center).norm();
            if distance < GEOMETRY_EPSILON {
                1.0
            } else {
                ((p.radius - q.radius).abs() / distance).min(1.0)
            }
        })
        .fold(0.0, f64::max);
    1.0 / (1.0 - slope * slope).max(MIN_HYPERBOLIC_DENOMINATOR)
}

/// Minimizer of `quadric` if admissible, else the cheapest of `a`, `b` and
/// their midpoint. Earlier candidates win ties.
fn optimal_sphere(quadric: &SphereQuadric, a: &Sphere, b: &Sphere) -> Sphere {
    let minimizer = quadric.minimizer().filter(|s| s.radius >= 0.0);
    minimizer
        .into_iter()
        .chain([*a, *b, a.lerp(b, 0.5)])
        .map(|s| (quadric.evaluate(&s), s))
        .min_by(|x, y| x.0.total_cmp(&y.0))
        .map_or(*a, |(_, s)| s)
}

fn project_onto_segment(sphere: &Sphere, a: &Sphere, b: &Sphere) -> Point3d {
    let direction = b.center - a.center;
    let length_sq = direction.norm_squared();
    if length_sq < GEOMETRY_EPSILON {
        return a.center;
    }
    let t = ((sphere.center - a.center).dot(&direction) / length_sq).clamp(0.0, 1.0);
    a.center + direction * t
}
