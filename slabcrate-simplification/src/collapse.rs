//! Greedy edge-collapse engine
//!
//! Edges wait in a priority queue ordered by collapse cost. Each step pops the
//! cheapest edge, re-prices it if its neighborhood changed since it was queued,
//! checks that the collapse keeps the skeleton well-formed, and applies it.
//! Only edges near the survivor are re-priced after a collapse.

use crate::cost::{Candidate, CostModel};
use crate::params::{BoundaryMode, SimplifyConfig};
use priority_queue::PriorityQueue;
use serde::{Deserialize, Serialize};
use slabcrate_core::{triangle_normal, CollapseRecord, EdgeId, Result, SkeletalGraph, VertexId};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::ops::ControlFlow;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// Normal flips beyond this (negative) dot product count as inversions.
const INVERSION_TOLERANCE: f64 = -1e-6;

/// Lifecycle of one simplification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    /// Built, queue not yet initialized.
    Ready,
    Collapsing,
    /// The live sphere count reached the target.
    Converged,
    /// The queue ran dry above the target.
    Exhausted,
}

impl EngineState {
    pub fn is_finished(self) -> bool {
        matches!(self, EngineState::Converged | EngineState::Exhausted)
    }
}

/// Why a popped candidate was not applied.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyViolation {
    #[error("edge {0} is no longer collapsible")]
    StaleEdge(EdgeId),

    #[error("collapse would move boundary sphere {0}")]
    BoundaryFrozen(VertexId),

    #[error("edge {edge} joins {faces} sheets")]
    JunctionEdge { edge: EdgeId, faces: usize },

    #[error("collapse folds a patch of {removed} onto an existing patch of {survivor}")]
    FaceFold {
        survivor: VertexId,
        removed: VertexId,
    },

    #[error("collapse flips a patch around {0}")]
    Inversion(VertexId),
}

/// Result of a single engine step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Collapsed(CollapseRecord),
    Rejected {
        edge: EdgeId,
        reason: TopologyViolation,
    },
    /// A stale entry was re-priced and re-queued.
    Refreshed { edge: EdgeId },
    Finished(EngineState),
}

/// Counters of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollapseStats {
    pub collapses: usize,
    pub rejected: usize,
    pub refreshed: usize,
    pub junction_rejections: usize,
    pub fold_rejections: usize,
    pub inversion_rejections: usize,
}

impl CollapseStats {
    fn count_rejection(&mut self, reason: &TopologyViolation) {
        self.rejected += 1;
        match reason {
            TopologyViolation::JunctionEdge { .. } => self.junction_rejections += 1,
            TopologyViolation::FaceFold { .. } => self.fold_rejections += 1,
            TopologyViolation::Inversion(_) => self.inversion_rejections += 1,
            TopologyViolation::StaleEdge(_) | TopologyViolation::BoundaryFrozen(_) => {}
        }
    }
}

/// Snapshot handed to progress callbacks between collapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollapseProgress {
    pub collapses: usize,
    pub live_vertices: usize,
    pub target: usize,
    pub queued: usize,
}

/// Queue priority: lower cost first, lower edge id on ties.
#[derive(Debug, Clone, Copy)]
struct CollapsePriority {
    cost: f64,
    edge: EdgeId,
}

impl PartialEq for CollapsePriority {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CollapsePriority {}

impl PartialOrd for CollapsePriority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CollapsePriority {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-queue: smallest cost first
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.edge.cmp(&self.edge))
    }
}

/// Reduces a skeletal graph toward a target sphere count.
///
/// The engine owns the graph for the length of the run; take it back with
/// [`CollapseEngine::into_graph`]. Quadrics and the queue are built lazily on
/// the first step, and only if the graph is above target, so a run that has
/// nothing to do leaves the graph bit-for-bit unchanged.
pub struct CollapseEngine {
    graph: SkeletalGraph,
    cost_model: CostModel,
    target: usize,
    state: EngineState,
    queue: PriorityQueue<EdgeId, CollapsePriority>,
    candidates: HashMap<EdgeId, Candidate>,
    stale: HashSet<EdgeId>,
    stats: CollapseStats,
}

impl CollapseEngine {
    pub fn new(graph: SkeletalGraph, config: SimplifyConfig, target: usize) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            graph,
            cost_model: CostModel::new(config),
            target,
            state: EngineState::Ready,
            queue: PriorityQueue::new(),
            candidates: HashMap::new(),
            stale: HashSet::new(),
            stats: CollapseStats::default(),
        })
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn stats(&self) -> &CollapseStats {
        &self.stats
    }

    pub fn graph(&self) -> &SkeletalGraph {
        &self.graph
    }

    pub fn into_graph(self) -> SkeletalGraph {
        self.graph
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn progress(&self) -> CollapseProgress {
        CollapseProgress {
            collapses: self.stats.collapses,
            live_vertices: self.graph.vertex_count(),
            target: self.target,
            queued: self.queue.len(),
        }
    }

    /// Run to completion.
    pub fn run(&mut self) -> Result<EngineState> {
        self.run_with(|_| ControlFlow::Continue(()))
    }

    /// Run until finished or until `on_progress` breaks after a collapse.
    ///
    /// `on_progress` sees every collapse, including the one that reaches the
    /// target; breaking there is ignored and the run ends `Converged`.
    ///
    /// A cancelled run leaves the engine `Collapsing` with a consistent graph;
    /// calling `run` again resumes it.
    pub fn run_with<F>(&mut self, mut on_progress: F) -> Result<EngineState>
    where
        F: FnMut(&CollapseProgress) -> ControlFlow<()>,
    {
        loop {
            match self.step()? {
                StepOutcome::Finished(state) => return Ok(state),
                StepOutcome::Collapsed(_) => {
                    let progress = self.progress();
                    // A break on the collapse that reaches the target still converges.
                    if on_progress(&progress).is_break() && progress.live_vertices > self.target {
                        info!(
                            collapses = self.stats.collapses,
                            vertices = self.graph.vertex_count(),
                            "simplification cancelled"
                        );
                        return Ok(self.state);
                    }
                }
                StepOutcome::Rejected { .. } | StepOutcome::Refreshed { .. } => {}
            }
        }
    }

    /// Advance by one queue entry.
    pub fn step(&mut self) -> Result<StepOutcome> {
        if self.state.is_finished() {
            return Ok(StepOutcome::Finished(self.state));
        }
        if self.graph.vertex_count() <= self.target {
            return Ok(self.finish(EngineState::Converged));
        }
        if self.state == EngineState::Ready {
            self.initialize();
        }

        let Some((edge, _)) = self.queue.pop() else {
            return Ok(self.finish(EngineState::Exhausted));
        };

        if self.stale.remove(&edge) {
            self.refresh(edge);
            self.stats.refreshed += 1;
            return Ok(StepOutcome::Refreshed { edge });
        }

        let candidate = match self.candidates.remove(&edge) {
            Some(candidate) if self.graph.is_edge_valid(edge) => candidate,
            _ => return Ok(self.reject(edge, TopologyViolation::StaleEdge(edge))),
        };

        if let Err(reason) = self.check(&candidate) {
            return Ok(self.reject(edge, reason));
        }

        let record = self
            .graph
            .collapse_edge(edge, candidate.survivor, candidate.sphere)?;
        self.stats.collapses += 1;
        debug!(
            edge = %edge,
            survivor = %record.survivor,
            removed = %record.removed,
            cost = candidate.cost,
            "collapsed edge"
        );
        self.update_neighborhood(&record);

        Ok(StepOutcome::Collapsed(record))
    }

    /// Fold quadrics and queue every admissible edge.
    fn initialize(&mut self) {
        self.cost_model.initialize_quadrics(&mut self.graph);

        let edges: Vec<EdgeId> = self.graph.edge_ids().collect();
        for edge in edges {
            self.refresh(edge);
        }
        self.state = EngineState::Collapsing;
        info!(
            vertices = self.graph.vertex_count(),
            edges = self.graph.edge_count(),
            faces = self.graph.face_count(),
            queued = self.queue.len(),
            target = self.target,
            "collapse engine initialized"
        );
    }

    /// Re-price `edge` and queue it, or drop it if it became inadmissible.
    fn refresh(&mut self, edge: EdgeId) {
        match self.cost_model.evaluate(&self.graph, edge) {
            Some(candidate) => {
                self.queue.push(
                    edge,
                    CollapsePriority {
                        cost: candidate.cost,
                        edge,
                    },
                );
                self.candidates.insert(edge, candidate);
            }
            None => {
                self.queue.remove(&edge);
                self.candidates.remove(&edge);
            }
        }
    }

    fn update_neighborhood(&mut self, record: &CollapseRecord) {
        for edge in &record.removed_edges {
            self.queue.remove(edge);
            self.candidates.remove(edge);
            self.stale.remove(edge);
        }

        let incident: Vec<EdgeId> = self
            .graph
            .neighbors(record.survivor)
            .iter()
            .copied()
            .collect();
        for &edge in &incident {
            self.stale.remove(&edge);
            self.refresh(edge);
        }

        // Boundary status of the next ring may have changed; re-price lazily.
        let ring: Vec<VertexId> = self.graph.adjacent_vertices(record.survivor).collect();
        for v in ring {
            let around: Vec<EdgeId> = self.graph.neighbors(v).iter().copied().collect();
            for edge in around {
                if incident.contains(&edge) {
                    continue;
                }
                if self.queue.get(&edge).is_some() {
                    self.stale.insert(edge);
                } else {
                    self.refresh(edge);
                }
            }
        }
    }

    fn reject(&mut self, edge: EdgeId, reason: TopologyViolation) -> StepOutcome {
        trace!(edge = %edge, %reason, "rejected collapse");
        self.stats.count_rejection(&reason);
        StepOutcome::Rejected { edge, reason }
    }

    fn finish(&mut self, state: EngineState) -> StepOutcome {
        self.state = state;
        match state {
            EngineState::Exhausted => warn!(
                target = self.target,
                achieved = self.graph.vertex_count(),
                collapses = self.stats.collapses,
                "no collapsible edge left above target"
            ),
            _ => info!(
                vertices = self.graph.vertex_count(),
                collapses = self.stats.collapses,
                rejected = self.stats.rejected,
                "simplification converged"
            ),
        }
        StepOutcome::Finished(state)
    }

    /// Topology and orientation checks on an up-to-date candidate.
    fn check(&self, candidate: &Candidate) -> std::result::Result<(), TopologyViolation> {
        let graph = &self.graph;
        let (survivor, removed) = (candidate.survivor, candidate.removed);

        if self.cost_model.config().boundary_mode == BoundaryMode::Frozen
            && graph.is_boundary_vertex(removed)
        {
            return Err(TopologyViolation::BoundaryFrozen(removed));
        }

        let faces = graph.incident_faces(candidate.edge).len();
        if faces > 2 {
            return Err(TopologyViolation::JunctionEdge {
                edge: candidate.edge,
                faces,
            });
        }

        for &f in graph.vertex(removed).faces() {
            let face = graph.face(f);
            if face.contains(survivor) {
                continue;
            }
            let mut others = face.vertices().into_iter().filter(|v| *v != removed);
            if let (Some(x), Some(y)) = (others.next(), others.next()) {
                if graph.find_face(survivor, x, y).is_some() {
                    return Err(TopologyViolation::FaceFold { survivor, removed });
                }
            }
        }

        if self.cost_model.config().prevent_inversion {
            self.check_inversion(candidate)?;
        }
        Ok(())
    }

    /// Compare normals of the surviving patches before and after the move.
    fn check_inversion(&self, candidate: &Candidate) -> std::result::Result<(), TopologyViolation> {
        let graph = &self.graph;
        let moved = [candidate.survivor, candidate.removed];
        let merged = candidate.sphere.center;

        for endpoint in moved {
            for &f in graph.vertex(endpoint).faces() {
                let vertices = graph.face(f).vertices();
                if moved.iter().all(|v| vertices.contains(v)) {
                    continue;
                }
                let before = vertices.map(|v| graph.sphere(v).center);
                let after = vertices.map(|v| {
                    if moved.contains(&v) {
                        merged
                    } else {
                        graph.sphere(v).center
                    }
                });

                let (Some(n0), Some(n1)) = (
                    triangle_normal(&before[0], &before[1], &before[2]),
                    triangle_normal(&after[0], &after[1], &after[2]),
                ) else {
                    continue;
                };
                if n0.dot(&n1) < INVERSION_TOLERANCE {
                    return Err(TopologyViolation::Inversion(endpoint));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slabcrate_core::{RawSkeleton, Sphere};

    /// A strip of four triangles over six spheres.
    fn make_strip() -> SkeletalGraph {
        let raw = RawSkeleton {
            spheres: vec![
                Sphere::from_coords(0.0, 0.0, 0.0, 0.2),
                Sphere::from_coords(1.0, 0.0, 0.0, 0.25),
                Sphere::from_coords(0.0, 1.0, 0.0, 0.2),
                Sphere::from_coords(1.0, 1.0, 0.1, 0.3),
                Sphere::from_coords(0.0, 2.0, 0.0, 0.2),
                Sphere::from_coords(1.0, 2.0, 0.0, 0.25),
            ],
            faces: vec![[0, 1, 2], [1, 3, 2], [2, 3, 4], [3, 5, 4]],
            ..Default::default()
        };
        SkeletalGraph::from_raw(&raw).unwrap()
    }

    #[test]
    fn test_priority_order() {
        let cheap = CollapsePriority { cost: 0.1, edge: EdgeId(7) };
        let dear = CollapsePriority { cost: 0.5, edge: EdgeId(1) };
        let tie = CollapsePriority { cost: 0.1, edge: EdgeId(3) };
        assert!(cheap > dear);
        assert!(tie > cheap);

        let mut queue = PriorityQueue::new();
        queue.push(EdgeId(7), cheap);
        queue.push(EdgeId(1), dear);
        queue.push(EdgeId(3), tie);
        assert_eq!(queue.pop().map(|(e, _)| e), Some(EdgeId(3)));
        assert_eq!(queue.pop().map(|(e, _)| e), Some(EdgeId(7)));
    }

    #[test]
    fn test_strip_converges() {
        let mut engine = CollapseEngine::new(make_strip(), SimplifyConfig::default(), 3).unwrap();
        assert_eq!(engine.state(), EngineState::Ready);
        let state = engine.run().unwrap();
        assert_eq!(state, EngineState::Converged);
        assert_eq!(engine.stats().collapses, 3);
        assert_eq!(engine.graph().vertex_count(), 3);
        engine.graph().check_consistency().unwrap();
    }

    #[test]
    fn test_each_step_keeps_graph_consistent() {
        let mut engine = CollapseEngine::new(make_strip(), SimplifyConfig::default(), 1).unwrap();
        let mut last = engine.graph().vertex_count();
        loop {
            let outcome = engine.step().unwrap();
            engine.graph().check_consistency().unwrap();
            let now = engine.graph().vertex_count();
            assert!(now <= last);
            last = now;
            if let StepOutcome::Finished(_) = outcome {
                break;
            }
        }
        assert!(engine.state().is_finished());
    }

    #[test]
    fn test_target_at_count_is_noop() {
        let graph = make_strip();
        let mut engine = CollapseEngine::new(graph.clone(), SimplifyConfig::default(), 6).unwrap();
        assert_eq!(engine.run().unwrap(), EngineState::Converged);
        assert_eq!(engine.stats().collapses, 0);
        assert_eq!(engine.into_graph(), graph);
    }

    #[test]
    fn test_cancel_and_resume() {
        let mut engine = CollapseEngine::new(make_strip(), SimplifyConfig::default(), 3).unwrap();
        let state = engine.run_with(|_| ControlFlow::Break(())).unwrap();
        assert_eq!(state, EngineState::Collapsing);
        assert_eq!(engine.stats().collapses, 1);
        engine.graph().check_consistency().unwrap();

        assert_eq!(engine.run().unwrap(), EngineState::Converged);
        assert_eq!(engine.stats().collapses, 3);
    }

    #[test]
    fn test_break_on_final_collapse_converges() {
        let mut engine = CollapseEngine::new(make_strip(), SimplifyConfig::default(), 3).unwrap();
        let mut calls = 0;
        let state = engine
            .run_with(|progress| {
                calls += 1;
                if progress.live_vertices <= progress.target {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .unwrap();
        assert_eq!(state, EngineState::Converged);
        assert_eq!(calls, 3);
        assert_eq!(engine.graph().vertex_count(), 3);
    }

    #[test]
    fn test_junction_edge_is_rejected() {
        // Three sheets hinged on the edge 0-1.
        let raw = RawSkeleton {
            spheres: vec![
                Sphere::from_coords(0.0, 0.0, 0.0, 0.1),
                Sphere::from_coords(0.05, 0.0, 0.0, 0.1),
                Sphere::from_coords(0.0, 1.0, 0.0, 0.1),
                Sphere::from_coords(0.0, -1.0, 0.0, 0.1),
                Sphere::from_coords(0.0, 0.0, 1.0, 0.1),
            ],
            faces: vec![[0, 1, 2], [0, 1, 3], [0, 1, 4]],
            ..Default::default()
        };
        let graph = SkeletalGraph::from_raw(&raw).unwrap();
        let hinge = graph.find_edge(VertexId(0), VertexId(1)).unwrap();
        // Without the rim penalty the short hinge is the cheapest edge.
        let config = SimplifyConfig::default()
            .with_prevent_inversion(true)
            .with_boundary_weight(0.0);
        let mut engine = CollapseEngine::new(graph, config, 4).unwrap();

        loop {
            match engine.step().unwrap() {
                StepOutcome::Collapsed(record) => {
                    assert_ne!(record.edge, hinge, "junction edge collapsed");
                }
                StepOutcome::Finished(_) => break,
                _ => {}
            }
        }
        assert_eq!(engine.graph().vertex_count(), 4);
        assert!(engine.stats().junction_rejections >= 1);
        engine.graph().check_consistency().unwrap();
    }

    #[test]
    fn test_fold_is_rejected() {
        // Closed tetrahedron: every collapse folds two patches together.
        let raw = RawSkeleton {
            spheres: vec![
                Sphere::from_coords(0.0, 0.0, 0.0, 0.1),
                Sphere::from_coords(1.0, 0.0, 0.0, 0.1),
                Sphere::from_coords(0.0, 1.0, 0.0, 0.1),
                Sphere::from_coords(0.0, 0.0, 1.0, 0.1),
            ],
            faces: vec![[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]],
            ..Default::default()
        };
        let graph = SkeletalGraph::from_raw(&raw).unwrap();
        let mut engine = CollapseEngine::new(graph.clone(), SimplifyConfig::default(), 2).unwrap();
        assert_eq!(engine.run().unwrap(), EngineState::Exhausted);
        assert_eq!(engine.stats().collapses, 0);
        assert_eq!(engine.stats().fold_rejections, 6);
        assert_eq!(engine.graph().vertex_count(), 4);
        assert_eq!(engine.queued(), 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SimplifyConfig::default().with_scale_factor(-1.0);
        assert!(CollapseEngine::new(make_strip(), config, 3).is_err());
    }
}
