//! Skeletal graph: the non-manifold slab mesh of a medial axis
//!
//! Spheres (vertices), slab segments (edges) and slab patches (faces) live in
//! growable arenas addressed by stable ids. Removed entities are tombstoned,
//! never physically dropped, so ids held by a priority queue stay meaningful
//! for the whole run. Incidence sets are ordered to keep every traversal, and
//! therefore every simplification, deterministic.

use crate::primitives::{triangle_normal, Sphere, Vector3d, GEOMETRY_EPSILON};
use crate::quadric::SphereQuadric;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

macro_rules! entity_id {
    ($name:ident, $prefix:literal) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub usize);

        impl $name {
            pub fn new(index: usize) -> Self {
                Self(index)
            }

            pub fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

entity_id!(VertexId, "v");
entity_id!(EdgeId, "e");
entity_id!(FaceId, "f");

/// A sphere of the skeleton.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub sphere: Sphere,
    pub quadric: SphereQuadric,
    pub boundary_quadric: SphereQuadric,
    edges: BTreeSet<EdgeId>,
    faces: BTreeSet<FaceId>,
    boundary: bool,
    valid: bool,
}

impl Vertex {
    pub fn edges(&self) -> &BTreeSet<EdgeId> {
        &self.edges
    }

    pub fn faces(&self) -> &BTreeSet<FaceId> {
        &self.faces
    }

    /// Boundary marking inherited from the input surface's feature set.
    pub fn is_marked_boundary(&self) -> bool {
        self.boundary
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn is_isolated(&self) -> bool {
        self.edges.is_empty() && self.faces.is_empty()
    }
}

/// A slab segment between two spheres; `vertices[0] < vertices[1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    vertices: [VertexId; 2],
    faces: BTreeSet<FaceId>,
    valid: bool,
}

impl Edge {
    pub fn vertices(&self) -> [VertexId; 2] {
        self.vertices
    }

    pub fn faces(&self) -> &BTreeSet<FaceId> {
        &self.faces
    }

    /// Rim edge of a sheet: exactly one incident face.
    pub fn is_boundary(&self) -> bool {
        self.faces.len() == 1
    }

    /// More than two sheets meet here.
    pub fn is_junction(&self) -> bool {
        self.faces.len() > 2
    }

    pub fn other(&self, v: VertexId) -> VertexId {
        if self.vertices[0] == v {
            self.vertices[1]
        } else {
            self.vertices[0]
        }
    }

    pub fn contains(&self, v: VertexId) -> bool {
        self.vertices[0] == v || self.vertices[1] == v
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

/// A triangular slab patch.
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    vertices: [VertexId; 3],
    valid: bool,
}

impl Face {
    pub fn vertices(&self) -> [VertexId; 3] {
        self.vertices
    }

    pub fn contains(&self, v: VertexId) -> bool {
        self.vertices.contains(&v)
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

/// Degenerate geometry met and worked around; never fatal.
#[derive(Debug, Clone, PartialEq)]
pub enum Degeneracy {
    /// Input edge whose two indices are equal; skipped.
    SelfLoopEdge { index: usize },
    /// Input face with a repeated index; skipped.
    RepeatedFaceVertex { index: usize },
    /// Input face duplicating an earlier one; merged.
    DuplicateInputFace { index: usize },
    /// Face with collinear centers; contributes no envelope planes.
    CollinearFace(FaceId),
    /// Edge joining two coincident spheres.
    CoincidentSpheres(EdgeId),
    /// Face folded onto an existing one during a collapse; discarded.
    DuplicateFaceDiscarded(FaceId),
}

/// Index convention of an upstream skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IndexBase {
    #[default]
    Zero,
    One,
}

impl IndexBase {
    fn offset(self) -> usize {
        match self {
            IndexBase::Zero => 0,
            IndexBase::One => 1,
        }
    }
}

/// A skeleton as handed over by the axis extraction stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSkeleton {
    pub spheres: Vec<Sphere>,
    pub edges: Vec<[usize; 2]>,
    pub faces: Vec<[usize; 3]>,
    /// Spheres tracing back to the surface's boundary/feature curves.
    pub boundary: Vec<usize>,
    pub index_base: IndexBase,
}

/// Outcome of one atomic edge collapse.
#[derive(Debug, Clone, PartialEq)]
pub struct CollapseRecord {
    pub edge: EdgeId,
    pub survivor: VertexId,
    pub removed: VertexId,
    /// The collapsed edge plus edges merged into a survivor edge.
    pub removed_edges: Vec<EdgeId>,
    /// Faces that degenerated or duplicated an existing face.
    pub removed_faces: Vec<FaceId>,
}

/// The skeletal slab mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkeletalGraph {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    faces: Vec<Face>,
    edge_lookup: HashMap<(VertexId, VertexId), EdgeId>,
    face_lookup: HashMap<[VertexId; 3], FaceId>,
    live_vertices: usize,
    live_edges: usize,
    live_faces: usize,
    degeneracies: Vec<Degeneracy>,
}

fn edge_key(a: VertexId, b: VertexId) -> (VertexId, VertexId) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

fn face_key(mut vertices: [VertexId; 3]) -> [VertexId; 3] {
    vertices.sort();
    vertices
}

impl SkeletalGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from an upstream skeleton, validating every reference.
    pub fn from_raw(raw: &RawSkeleton) -> Result<Self> {
        if raw.spheres.is_empty() {
            return Err(Error::EmptySkeleton);
        }

        let mut graph = Self::new();
        for (index, sphere) in raw.spheres.iter().enumerate() {
            if !sphere.is_finite() {
                return Err(Error::InvalidSphere {
                    index,
                    reason: "non-finite center or radius",
                });
            }
            if sphere.radius < 0.0 {
                return Err(Error::InvalidSphere {
                    index,
                    reason: "negative radius",
                });
            }
            graph.add_vertex(*sphere, false);
        }

        let offset = raw.index_base.offset();
        let count = raw.spheres.len();
        let resolve = |kind: &'static str, index: usize, raw_vertex: usize| {
            raw_vertex
                .checked_sub(offset)
                .filter(|v| *v < count)
                .map(VertexId)
                .ok_or(Error::DanglingReference {
                    kind,
                    index,
                    vertex: raw_vertex,
                })
        };

        for &b in &raw.boundary {
            let v = resolve("boundary marking", b, b)?;
            graph.vertices[v.0].boundary = true;
        }

        for (index, &[i, j]) in raw.edges.iter().enumerate() {
            let a = resolve("edge", index, i)?;
            let b = resolve("edge", index, j)?;
            if a == b {
                graph.degeneracies.push(Degeneracy::SelfLoopEdge { index });
                continue;
            }
            graph.add_edge(a, b)?;
        }

        for (index, &[i, j, k]) in raw.faces.iter().enumerate() {
            let a = resolve("face", index, i)?;
            let b = resolve("face", index, j)?;
            let c = resolve("face", index, k)?;
            if a == b || b == c || a == c {
                graph
                    .degeneracies
                    .push(Degeneracy::RepeatedFaceVertex { index });
                continue;
            }
            if graph.find_face(a, b, c).is_some() {
                graph
                    .degeneracies
                    .push(Degeneracy::DuplicateInputFace { index });
                continue;
            }
            graph.add_face(a, b, c)?;
        }

        Ok(graph)
    }

    // ---- Construction (extraction time) ----

    pub fn add_vertex(&mut self, sphere: Sphere, boundary: bool) -> VertexId {
        let id = VertexId(self.vertices.len());
        self.vertices.push(Vertex {
            sphere,
            quadric: SphereQuadric::zero(),
            boundary_quadric: SphereQuadric::zero(),
            edges: BTreeSet::new(),
            faces: BTreeSet::new(),
            boundary,
            valid: true,
        });
        self.live_vertices += 1;
        id
    }

    /// Add the edge `a–b`, or return the existing one.
    pub fn add_edge(&mut self, a: VertexId, b: VertexId) -> Result<EdgeId> {
        self.require_vertex(a)?;
        self.require_vertex(b)?;
        if a == b {
            return Err(Error::InvalidData(format!("self-loop edge at {}", a)));
        }
        if let Some(existing) = self.find_edge(a, b) {
            return Ok(existing);
        }

        let id = EdgeId(self.edges.len());
        let (lo, hi) = edge_key(a, b);
        self.edges.push(Edge {
            vertices: [lo, hi],
            faces: BTreeSet::new(),
            valid: true,
        });
        self.edge_lookup.insert((lo, hi), id);
        self.vertices[lo.0].edges.insert(id);
        self.vertices[hi.0].edges.insert(id);
        self.live_edges += 1;
        Ok(id)
    }

    /// Add the face `a, b, c`, creating missing edges, or return the existing one.
    pub fn add_face(&mut self, a: VertexId, b: VertexId, c: VertexId) -> Result<FaceId> {
        if a == b || b == c || a == c {
            return Err(Error::InvalidData(format!(
                "face ({}, {}, {}) repeats a vertex",
                a, b, c
            )));
        }
        if let Some(existing) = self.find_face(a, b, c) {
            return Ok(existing);
        }

        let e0 = self.add_edge(a, b)?;
        let e1 = self.add_edge(b, c)?;
        let e2 = self.add_edge(c, a)?;

        let id = FaceId(self.faces.len());
        self.faces.push(Face {
            vertices: [a, b, c],
            valid: true,
        });
        self.face_lookup.insert(face_key([a, b, c]), id);
        for e in [e0, e1, e2] {
            self.edges[e.0].faces.insert(id);
        }
        for v in [a, b, c] {
            self.vertices[v.0].faces.insert(id);
        }
        self.live_faces += 1;
        Ok(id)
    }

    // ---- Queries ----

    pub fn vertex_count(&self) -> usize {
        self.live_vertices
    }

    pub fn edge_count(&self) -> usize {
        self.live_edges
    }

    pub fn face_count(&self) -> usize {
        self.live_faces
    }

    pub fn is_empty(&self) -> bool {
        self.live_vertices == 0
    }

    pub fn is_vertex_valid(&self, v: VertexId) -> bool {
        self.vertices.get(v.0).is_some_and(|vx| vx.valid)
    }

    pub fn is_edge_valid(&self, e: EdgeId) -> bool {
        self.edges.get(e.0).is_some_and(|ed| ed.valid)
    }

    pub fn is_face_valid(&self, f: FaceId) -> bool {
        self.faces.get(f.0).is_some_and(|fc| fc.valid)
    }

    /// Vertex by id, including tombstones.
    pub fn vertex(&self, v: VertexId) -> &Vertex {
        &self.vertices[v.0]
    }

    pub fn edge(&self, e: EdgeId) -> &Edge {
        &self.edges[e.0]
    }

    pub fn face(&self, f: FaceId) -> &Face {
        &self.faces[f.0]
    }

    pub fn sphere(&self, v: VertexId) -> &Sphere {
        &self.vertices[v.0].sphere
    }

    /// Edge ids incident to `v`.
    pub fn neighbors(&self, v: VertexId) -> &BTreeSet<EdgeId> {
        &self.vertices[v.0].edges
    }

    /// Spheres sharing an edge with `v`, in edge id order.
    pub fn adjacent_vertices(&self, v: VertexId) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices[v.0]
            .edges
            .iter()
            .map(move |e| self.edges[e.0].other(v))
    }

    /// Face ids incident to `e`.
    pub fn incident_faces(&self, e: EdgeId) -> &BTreeSet<FaceId> {
        &self.edges[e.0].faces
    }

    pub fn find_edge(&self, a: VertexId, b: VertexId) -> Option<EdgeId> {
        self.edge_lookup.get(&edge_key(a, b)).copied()
    }

    pub fn find_face(&self, a: VertexId, b: VertexId, c: VertexId) -> Option<FaceId> {
        self.face_lookup.get(&face_key([a, b, c])).copied()
    }

    /// A vertex is boundary if marked so, or while it touches a rim edge.
    pub fn is_boundary_vertex(&self, v: VertexId) -> bool {
        let vertex = &self.vertices[v.0];
        vertex.boundary || vertex.edges.iter().any(|e| self.edges[e.0].is_boundary())
    }

    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.valid)
            .map(|(i, _)| VertexId(i))
    }

    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, e)| e.valid)
            .map(|(i, _)| EdgeId(i))
    }

    pub fn face_ids(&self) -> impl Iterator<Item = FaceId> + '_ {
        self.faces
            .iter()
            .enumerate()
            .filter(|(_, f)| f.valid)
            .map(|(i, _)| FaceId(i))
    }

    pub fn face_spheres(&self, f: FaceId) -> [&Sphere; 3] {
        let [a, b, c] = self.faces[f.0].vertices;
        [self.sphere(a), self.sphere(b), self.sphere(c)]
    }

    pub fn degeneracies(&self) -> &[Degeneracy] {
        &self.degeneracies
    }

    pub fn record_degeneracy(&mut self, degeneracy: Degeneracy) {
        self.degeneracies.push(degeneracy);
    }

    /// Dense 0-based indices of live vertices, in id order.
    pub fn compact_vertex_indices(&self) -> HashMap<VertexId, usize> {
        self.vertex_ids().enumerate().map(|(i, v)| (v, i)).collect()
    }

    /// Unit normal of the center triangle; `None` when the centers are collinear.
    pub fn face_normal(&self, f: FaceId) -> Option<Vector3d> {
        let [a, b, c] = self.face_spheres(f);
        triangle_normal(&a.center, &b.center, &c.center)
    }

    /// Edges joining spheres with (nearly) the same center.
    pub fn is_edge_degenerate(&self, e: EdgeId) -> bool {
        let [a, b] = self.edges[e.0].vertices;
        (self.sphere(a).center - self.sphere(b).center).norm() < GEOMETRY_EPSILON
    }

    // ---- Mutation (cleanup and collapse only) ----

    /// Install accumulated quadrics on a sphere; adjacency is untouched.
    pub fn set_quadrics(
        &mut self,
        v: VertexId,
        quadric: SphereQuadric,
        boundary_quadric: SphereQuadric,
    ) {
        let vertex = &mut self.vertices[v.0];
        vertex.quadric = quadric;
        vertex.boundary_quadric = boundary_quadric;
    }

    /// Tombstone `v` if it has no incident edge or face. Returns whether it was removed.
    pub fn remove_isolated_vertex(&mut self, v: VertexId) -> bool {
        match self.vertices.get_mut(v.0) {
            Some(vertex) if vertex.valid && vertex.is_isolated() => {
                vertex.valid = false;
                self.live_vertices -= 1;
                true
            }
            _ => false,
        }
    }

    /// Collapse `edge`, keeping `survivor` with the `merged` sphere.
    ///
    /// Faces spanning the edge are removed, the other endpoint's edges and
    /// faces are re-pointed at the survivor, and re-pointed edges or faces
    /// that duplicate an existing one are merged or discarded. The graph is
    /// consistent again when this returns.
    pub fn collapse_edge(
        &mut self,
        edge: EdgeId,
        survivor: VertexId,
        merged: Sphere,
    ) -> Result<CollapseRecord> {
        if !self.is_edge_valid(edge) {
            return Err(Error::Algorithm(format!("cannot collapse dead edge {}", edge)));
        }
        let ed = &self.edges[edge.0];
        if !ed.contains(survivor) {
            return Err(Error::Algorithm(format!(
                "{} is not an endpoint of {}",
                survivor, edge
            )));
        }
        let removed = ed.other(survivor);
        let mut record = CollapseRecord {
            edge,
            survivor,
            removed,
            removed_edges: vec![edge],
            removed_faces: Vec::new(),
        };

        // Faces spanning the collapsed edge degenerate.
        let spanning: Vec<FaceId> = self.edges[edge.0].faces.iter().copied().collect();
        for f in spanning {
            self.kill_face(f);
            record.removed_faces.push(f);
        }

        self.kill_edge(edge);

        // Re-point or merge the removed vertex's edges.
        let moving_edges: Vec<EdgeId> = self.vertices[removed.0].edges.iter().copied().collect();
        for e in moving_edges {
            let other = self.edges[e.0].other(removed);
            match self.find_edge(survivor, other) {
                Some(target) => {
                    let faces = std::mem::take(&mut self.edges[e.0].faces);
                    self.edges[target.0].faces.extend(faces);
                    self.kill_edge(e);
                    record.removed_edges.push(e);
                }
                None => {
                    self.edge_lookup.remove(&edge_key(removed, other));
                    let (lo, hi) = edge_key(survivor, other);
                    self.edges[e.0].vertices = [lo, hi];
                    self.edge_lookup.insert((lo, hi), e);
                    self.vertices[removed.0].edges.remove(&e);
                    self.vertices[survivor.0].edges.insert(e);
                }
            }
        }

        // Re-point the removed vertex's faces.
        let moving_faces: Vec<FaceId> = self.vertices[removed.0].faces.iter().copied().collect();
        for f in moving_faces {
            let old = self.faces[f.0].vertices;
            self.face_lookup.remove(&face_key(old));
            let new = old.map(|v| if v == removed { survivor } else { v });
            self.vertices[removed.0].faces.remove(&f);

            if self.face_lookup.contains_key(&face_key(new)) {
                // Folded onto an existing face; the edges already carry `f` under `new`.
                self.faces[f.0].vertices = new;
                self.detach_face(f);
                self.faces[f.0].valid = false;
                self.live_faces -= 1;
                self.degeneracies.push(Degeneracy::DuplicateFaceDiscarded(f));
                record.removed_faces.push(f);
            } else {
                self.faces[f.0].vertices = new;
                self.face_lookup.insert(face_key(new), f);
                self.vertices[survivor.0].faces.insert(f);
            }
        }

        // Merge sphere state.
        let (removed_quadric, removed_boundary_quadric, removed_marked) = {
            let r = &mut self.vertices[removed.0];
            r.valid = false;
            r.edges.clear();
            r.faces.clear();
            (r.quadric, r.boundary_quadric, r.boundary)
        };
        self.live_vertices -= 1;

        let s = &mut self.vertices[survivor.0];
        s.sphere = merged;
        s.quadric += removed_quadric;
        s.boundary_quadric += removed_boundary_quadric;
        s.boundary |= removed_marked;

        Ok(record)
    }

    /// Remove a face from every incidence set and tombstone it.
    fn kill_face(&mut self, f: FaceId) {
        self.face_lookup.remove(&face_key(self.faces[f.0].vertices));
        self.detach_face(f);
        self.faces[f.0].valid = false;
        self.live_faces -= 1;
    }

    /// Remove `f` from the face sets of its vertices and of the edges between them.
    fn detach_face(&mut self, f: FaceId) {
        let [a, b, c] = self.faces[f.0].vertices;
        for v in [a, b, c] {
            self.vertices[v.0].faces.remove(&f);
        }
        for (u, w) in [(a, b), (b, c), (c, a)] {
            if let Some(e) = self.find_edge(u, w) {
                self.edges[e.0].faces.remove(&f);
            }
        }
    }

    fn kill_edge(&mut self, e: EdgeId) {
        let [a, b] = self.edges[e.0].vertices;
        self.edge_lookup.remove(&(a, b));
        self.vertices[a.0].edges.remove(&e);
        self.vertices[b.0].edges.remove(&e);
        let edge = &mut self.edges[e.0];
        edge.faces.clear();
        edge.valid = false;
        self.live_edges -= 1;
    }

    fn require_vertex(&self, v: VertexId) -> Result<()> {
        if self.is_vertex_valid(v) {
            Ok(())
        } else {
            Err(Error::InvalidData(format!("unknown or removed sphere {}", v)))
        }
    }

    /// Verify every adjacency invariant of the graph.
    pub fn check_consistency(&self) -> Result<()> {
        let fail = |msg: String| Err(Error::Inconsistent(msg));

        let mut live_edges = 0;
        for (i, edge) in self.edges.iter().enumerate() {
            if !edge.valid {
                continue;
            }
            live_edges += 1;
            let id = EdgeId(i);
            let [a, b] = edge.vertices;
            if a == b || !self.is_vertex_valid(a) || !self.is_vertex_valid(b) {
                return fail(format!("{} has invalid endpoints {} {}", id, a, b));
            }
            if !self.vertices[a.0].edges.contains(&id) || !self.vertices[b.0].edges.contains(&id) {
                return fail(format!("{} missing from its endpoints' edge sets", id));
            }
            if self.find_edge(a, b) != Some(id) {
                return fail(format!("{} missing from edge lookup", id));
            }
            for f in &edge.faces {
                if !self.is_face_valid(*f) {
                    return fail(format!("{} references dead face {}", id, f));
                }
                let face = &self.faces[f.0];
                if !face.contains(a) || !face.contains(b) {
                    return fail(format!("{} lists {} which does not span it", id, f));
                }
            }
        }

        let mut live_faces = 0;
        for (i, face) in self.faces.iter().enumerate() {
            if !face.valid {
                continue;
            }
            live_faces += 1;
            let id = FaceId(i);
            let [a, b, c] = face.vertices;
            if a == b || b == c || a == c {
                return fail(format!("{} repeats a vertex", id));
            }
            for v in [a, b, c] {
                if !self.is_vertex_valid(v) || !self.vertices[v.0].faces.contains(&id) {
                    return fail(format!("{} not registered at vertex {}", id, v));
                }
            }
            for (u, w) in [(a, b), (b, c), (c, a)] {
                match self.find_edge(u, w) {
                    Some(e) if self.edges[e.0].valid && self.edges[e.0].faces.contains(&id) => {}
                    _ => return fail(format!("{} lacks edge {}-{}", id, u, w)),
                }
            }
            if self.find_face(a, b, c) != Some(id) {
                return fail(format!("{} missing from face lookup (duplicate?)", id));
            }
        }

        let mut live_vertices = 0;
        for (i, vertex) in self.vertices.iter().enumerate() {
            let id = VertexId(i);
            if !vertex.valid {
                if !vertex.edges.is_empty() || !vertex.faces.is_empty() {
                    return fail(format!("dead {} still has incidences", id));
                }
                continue;
            }
            live_vertices += 1;
            for e in &vertex.edges {
                if !self.is_edge_valid(*e) || !self.edges[e.0].contains(id) {
                    return fail(format!("{} lists foreign edge {}", id, e));
                }
            }
            for f in &vertex.faces {
                if !self.is_face_valid(*f) || !self.faces[f.0].contains(id) {
                    return fail(format!("{} lists foreign face {}", id, f));
                }
            }
        }

        if live_vertices != self.live_vertices
            || live_edges != self.live_edges
            || live_faces != self.live_faces
        {
            return fail(format!(
                "live counts {}/{}/{} disagree with arenas {}/{}/{}",
                self.live_vertices,
                self.live_edges,
                self.live_faces,
                live_vertices,
                live_edges,
                live_faces
            ));
        }
        if self.edge_lookup.len() != live_edges || self.face_lookup.len() != live_faces {
            return fail("lookup tables hold stale entries".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere(x: f64, y: f64, z: f64) -> Sphere {
        Sphere::from_coords(x, y, z, 0.5)
    }

    /// Two triangles sharing the edge 1-2.
    fn make_quad() -> SkeletalGraph {
        let mut g = SkeletalGraph::new();
        let v0 = g.add_vertex(sphere(0.0, 0.0, 0.0), false);
        let v1 = g.add_vertex(sphere(1.0, 0.0, 0.0), false);
        let v2 = g.add_vertex(sphere(0.0, 1.0, 0.0), false);
        let v3 = g.add_vertex(sphere(1.0, 1.0, 0.0), false);
        g.add_face(v0, v1, v2).unwrap();
        g.add_face(v1, v3, v2).unwrap();
        g
    }

    #[test]
    fn test_add_face_creates_edges() {
        let g = make_quad();
        assert_eq!(g.vertex_count(), 4);
        assert_eq!(g.edge_count(), 5);
        assert_eq!(g.face_count(), 2);
        g.check_consistency().unwrap();

        let shared = g.find_edge(VertexId(2), VertexId(1)).unwrap();
        assert_eq!(g.incident_faces(shared).len(), 2);
        assert!(!g.edge(shared).is_boundary());
        assert!(g.is_boundary_vertex(VertexId(0)));
    }

    #[test]
    fn test_face_normal() {
        let mut g = make_quad();
        assert_eq!(g.face_normal(FaceId(0)), Some(Vector3d::new(0.0, 0.0, 1.0)));
        let v4 = g.add_vertex(sphere(2.0, 0.0, 0.0), false);
        let flat = g.add_face(VertexId(0), VertexId(1), v4).unwrap();
        assert_eq!(g.face_normal(flat), None);
    }

    #[test]
    fn test_duplicates_are_shared() {
        let mut g = make_quad();
        let e = g.add_edge(VertexId(1), VertexId(0)).unwrap();
        assert_eq!(Some(e), g.find_edge(VertexId(0), VertexId(1)));
        let f = g.add_face(VertexId(2), VertexId(0), VertexId(1)).unwrap();
        assert_eq!(f, FaceId(0));
        assert_eq!(g.face_count(), 2);
        assert!(g.add_edge(VertexId(1), VertexId(1)).is_err());
        assert!(g.add_face(VertexId(1), VertexId(2), VertexId(1)).is_err());
    }

    #[test]
    fn test_from_raw_validation() {
        assert!(matches!(
            SkeletalGraph::from_raw(&RawSkeleton::default()),
            Err(Error::EmptySkeleton)
        ));

        let raw = RawSkeleton {
            spheres: vec![sphere(0.0, 0.0, 0.0), sphere(1.0, 0.0, 0.0)],
            edges: vec![[0, 5]],
            ..Default::default()
        };
        assert!(matches!(
            SkeletalGraph::from_raw(&raw),
            Err(Error::DanglingReference { kind: "edge", .. })
        ));

        let raw = RawSkeleton {
            spheres: vec![Sphere::from_coords(0.0, 0.0, 0.0, -1.0)],
            ..Default::default()
        };
        assert!(matches!(
            SkeletalGraph::from_raw(&raw),
            Err(Error::InvalidSphere { index: 0, .. })
        ));
    }

    #[test]
    fn test_from_raw_one_based_with_degenerates() {
        let raw = RawSkeleton {
            spheres: vec![
                sphere(0.0, 0.0, 0.0),
                sphere(1.0, 0.0, 0.0),
                sphere(0.0, 1.0, 0.0),
            ],
            edges: vec![[1, 2], [2, 2]],
            faces: vec![[1, 2, 3], [3, 2, 1], [1, 1, 2]],
            boundary: vec![3],
            index_base: IndexBase::One,
        };
        let g = SkeletalGraph::from_raw(&raw).unwrap();
        assert_eq!(g.vertex_count(), 3);
        assert_eq!(g.edge_count(), 3);
        assert_eq!(g.face_count(), 1);
        assert!(g.vertex(VertexId(2)).is_marked_boundary());
        assert_eq!(g.degeneracies().len(), 3);
        g.check_consistency().unwrap();

        let zero_index = RawSkeleton {
            index_base: IndexBase::One,
            edges: vec![[0, 1]],
            ..raw
        };
        assert!(SkeletalGraph::from_raw(&zero_index).is_err());
    }

    #[test]
    fn test_collapse_interior_edge() {
        let mut g = make_quad();
        let shared = g.find_edge(VertexId(1), VertexId(2)).unwrap();
        let record = g
            .collapse_edge(shared, VertexId(1), sphere(0.5, 0.5, 0.0))
            .unwrap();

        assert_eq!(record.removed, VertexId(2));
        assert_eq!(record.removed_faces.len(), 2);
        // 0-2 merges into 0-1, 3-2 merges into 1-3
        assert_eq!(record.removed_edges.len(), 3);
        assert_eq!(g.vertex_count(), 3);
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.face_count(), 0);
        assert!(!g.is_vertex_valid(VertexId(2)));
        g.check_consistency().unwrap();
    }

    #[test]
    fn test_collapse_rim_edge_repoints_face() {
        let mut g = make_quad();
        let rim = g.find_edge(VertexId(0), VertexId(1)).unwrap();
        let record = g
            .collapse_edge(rim, VertexId(0), sphere(0.5, 0.0, 0.0))
            .unwrap();

        assert_eq!(record.removed_faces, vec![FaceId(0)]);
        assert_eq!(g.face_count(), 1);
        assert_eq!(g.face(FaceId(1)).vertices(), [VertexId(0), VertexId(3), VertexId(2)]);
        assert!(g.find_edge(VertexId(0), VertexId(3)).is_some());
        g.check_consistency().unwrap();
    }

    #[test]
    fn test_collapse_discards_duplicate_face() {
        // Tetrahedron: collapsing any edge folds two faces onto one triple.
        let mut g = SkeletalGraph::new();
        let v: Vec<_> = (0..4)
            .map(|i| g.add_vertex(sphere(i as f64, (i % 2) as f64, (i / 2) as f64), false))
            .collect();
        g.add_face(v[0], v[1], v[2]).unwrap();
        g.add_face(v[0], v[1], v[3]).unwrap();
        g.add_face(v[0], v[2], v[3]).unwrap();
        g.add_face(v[1], v[2], v[3]).unwrap();

        let e = g.find_edge(v[0], v[1]).unwrap();
        let record = g.collapse_edge(e, v[0], sphere(0.5, 0.5, 0.0)).unwrap();
        assert_eq!(record.removed_faces.len(), 3);
        assert_eq!(g.face_count(), 1);
        assert!(g
            .degeneracies()
            .iter()
            .any(|d| matches!(d, Degeneracy::DuplicateFaceDiscarded(_))));
        g.check_consistency().unwrap();
    }

    #[test]
    fn test_remove_isolated_vertex() {
        let mut g = make_quad();
        let lone = g.add_vertex(sphere(5.0, 5.0, 5.0), false);
        assert!(!g.remove_isolated_vertex(VertexId(0)));
        assert!(g.remove_isolated_vertex(lone));
        assert!(!g.remove_isolated_vertex(lone));
        assert_eq!(g.vertex_count(), 4);
        g.check_consistency().unwrap();
    }

    #[test]
    fn test_collapse_rejects_dead_edge() {
        let mut g = make_quad();
        let e = g.find_edge(VertexId(0), VertexId(1)).unwrap();
        g.collapse_edge(e, VertexId(0), sphere(0.0, 0.0, 0.0)).unwrap();
        assert!(g.collapse_edge(e, VertexId(0), sphere(0.0, 0.0, 0.0)).is_err());
    }
}
