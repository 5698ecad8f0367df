//! End-to-end simplification pass: cleanup, collapse, post-pass, audit

use crate::approximation::{self, ApproximationError};
use crate::cleanup::clean_isolated_vertices;
use crate::collapse::{CollapseEngine, CollapseProgress, CollapseStats, EngineState};
use crate::params::SimplifyConfig;
use crate::SkeletonSimplifier;
use serde::{Deserialize, Serialize};
use slabcrate_core::{Error, Result, SkeletalGraph, SlabAttributes, SurfaceMesh};
use std::fmt;
use std::ops::ControlFlow;
use std::time::{Duration, Instant};
use tracing::{info, info_span, warn};

/// Why a run did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    ZeroTarget,
    TargetNotBelowCurrent { target: usize, current: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::ZeroTarget => write!(f, "target vertex count is 0"),
            SkipReason::TargetNotBelowCurrent { target, current } => write!(
                f,
                "target vertex count ({}) >= current count ({})",
                target, current
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimplifyOutcome {
    /// The engine ran to `Converged` or `Exhausted`.
    Simplified(EngineState),
    /// The progress callback stopped the engine early.
    Cancelled,
    Skipped(SkipReason),
}

/// Summary of one pipeline run.
#[derive(Debug, Clone)]
pub struct SimplifyReport {
    pub outcome: SimplifyOutcome,
    pub target: usize,
    pub initial_vertices: usize,
    pub initial_edges: usize,
    pub initial_faces: usize,
    pub final_vertices: usize,
    pub final_edges: usize,
    pub final_faces: usize,
    pub isolated_removed: usize,
    pub stats: CollapseStats,
    /// Export attributes of the final skeleton; `None` for skipped runs.
    pub attributes: Option<SlabAttributes>,
    pub approximation: Option<ApproximationError>,
    pub cleanup_time: Duration,
    pub simplify_time: Duration,
    pub postpass_time: Duration,
}

impl SimplifyReport {
    fn skipped(graph: &SkeletalGraph, target: usize, reason: SkipReason) -> Self {
        Self {
            outcome: SimplifyOutcome::Skipped(reason),
            target,
            initial_vertices: graph.vertex_count(),
            initial_edges: graph.edge_count(),
            initial_faces: graph.face_count(),
            final_vertices: graph.vertex_count(),
            final_edges: graph.edge_count(),
            final_faces: graph.face_count(),
            isolated_removed: 0,
            stats: CollapseStats::default(),
            attributes: None,
            approximation: None,
            cleanup_time: Duration::ZERO,
            simplify_time: Duration::ZERO,
            postpass_time: Duration::ZERO,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, SimplifyOutcome::Skipped(_))
    }

    pub fn reached_target(&self) -> bool {
        self.outcome == SimplifyOutcome::Simplified(EngineState::Converged)
    }

    pub fn vertices_removed(&self) -> usize {
        self.initial_vertices.saturating_sub(self.final_vertices)
    }
}

impl fmt::Display for SimplifyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let SimplifyOutcome::Skipped(reason) = self.outcome {
            return write!(f, "Skipped simplification: {}", reason);
        }
        writeln!(
            f,
            "Simplified {} -> {} vertices (target {}), {} -> {} edges, {} -> {} faces",
            self.initial_vertices,
            self.final_vertices,
            self.target,
            self.initial_edges,
            self.final_edges,
            self.initial_faces,
            self.final_faces
        )?;
        writeln!(
            f,
            "  {} collapses, {} rejected, {} isolated spheres removed ({:?})",
            self.stats.collapses, self.stats.rejected, self.isolated_removed, self.outcome
        )?;
        if let Some(error) = &self.approximation {
            writeln!(
                f,
                "  approximation error: max {:.6} ({:.4}% of diagonal), mean {:.6}",
                error.max,
                error.relative_max * 100.0,
                error.mean
            )?;
        }
        write!(
            f,
            "  cleanup {:.1?}, simplification {:.1?}, post-pass {:.1?}",
            self.cleanup_time, self.simplify_time, self.postpass_time
        )
    }
}

/// Slab-mesh simplifier driven by the sphere quadric error metric.
#[derive(Debug, Clone, Default)]
pub struct SlabSimplifier {
    config: SimplifyConfig,
    reference: Option<SurfaceMesh>,
}

impl SlabSimplifier {
    pub fn new(config: SimplifyConfig) -> Self {
        Self {
            config,
            reference: None,
        }
    }

    /// Surface to audit the envelope against when approximation tracking is on.
    #[must_use]
    pub fn with_reference_surface(mut self, surface: SurfaceMesh) -> Self {
        self.reference = Some(surface);
        self
    }

    pub fn config(&self) -> &SimplifyConfig {
        &self.config
    }

    /// Run the full pass, reporting progress between collapses.
    ///
    /// Input errors, including a reference surface with dangling face
    /// indices, are returned before anything is mutated. A target of 0
    /// or one not below the current sphere count is skipped with a warning
    /// and leaves the graph untouched.
    pub fn simplify_with<F>(
        &self,
        graph: &mut SkeletalGraph,
        target: usize,
        on_progress: F,
    ) -> Result<SimplifyReport>
    where
        F: FnMut(&CollapseProgress) -> ControlFlow<()>,
    {
        let _span = info_span!("simplify", target).entered();

        self.config.validate()?;
        if let Some(surface) = &self.reference {
            surface.validate()?;
        }
        if graph.is_empty() {
            return Err(Error::EmptySkeleton);
        }
        graph.check_consistency()?;

        let current = graph.vertex_count();
        let skip = if target == 0 {
            Some(SkipReason::ZeroTarget)
        } else if target >= current {
            Some(SkipReason::TargetNotBelowCurrent { target, current })
        } else {
            None
        };
        if let Some(reason) = skip {
            warn!(%reason, "skipping simplification");
            return Ok(SimplifyReport::skipped(graph, target, reason));
        }

        let (initial_edges, initial_faces) = (graph.edge_count(), graph.face_count());
        info!(
            from = current,
            to = target,
            removing = current - target,
            "simplifying skeleton"
        );

        let started = Instant::now();
        let isolated_removed = clean_isolated_vertices(graph);
        let cleanup_time = started.elapsed();

        let started = Instant::now();
        let mut engine = CollapseEngine::new(std::mem::take(graph), self.config.clone(), target)?;
        let run = engine.run_with(on_progress);
        let stats = engine.stats().clone();
        let state = engine.state();
        *graph = engine.into_graph();
        run?;
        let simplify_time = started.elapsed();

        let outcome = if state.is_finished() {
            SimplifyOutcome::Simplified(state)
        } else {
            SimplifyOutcome::Cancelled
        };

        let started = Instant::now();
        let attributes = SlabAttributes::compute(graph);
        let approximation = if self.config.track_approximation_error {
            match &self.reference {
                Some(surface) => approximation::measure(graph, surface),
                None => {
                    warn!("approximation tracking requested without a reference surface");
                    None
                }
            }
        } else {
            None
        };
        let postpass_time = started.elapsed();

        let report = SimplifyReport {
            outcome,
            target,
            initial_vertices: current,
            initial_edges,
            initial_faces,
            final_vertices: graph.vertex_count(),
            final_edges: graph.edge_count(),
            final_faces: graph.face_count(),
            isolated_removed,
            stats,
            attributes: Some(attributes),
            approximation,
            cleanup_time,
            simplify_time,
            postpass_time,
        };
        info!(
            vertices = report.final_vertices,
            edges = report.final_edges,
            faces = report.final_faces,
            collapses = report.stats.collapses,
            "simplification finished"
        );
        Ok(report)
    }
}

impl SkeletonSimplifier for SlabSimplifier {
    fn simplify(&self, graph: &mut SkeletalGraph, target: usize) -> Result<SimplifyReport> {
        self.simplify_with(graph, target, |_| ControlFlow::Continue(()))
    }
}
