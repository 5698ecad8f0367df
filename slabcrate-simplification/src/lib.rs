//! Slab-mesh simplification
//!
//! This crate reduces a medial-axis skeleton to a target number of spheres
//! while bounding the error of its envelope:
//! - Sphere quadric cost model with configurable face weighting
//! - Greedy edge-collapse engine with topology and orientation checks
//! - Isolated sphere cleanup and an envelope deviation audit

pub mod approximation;
pub mod cleanup;
pub mod collapse;
pub mod cost;
pub mod params;
pub mod pipeline;

pub use approximation::*;
pub use cleanup::*;
pub use collapse::*;
pub use cost::*;
pub use params::*;
pub use pipeline::*;

use slabcrate_core::{Result, SkeletalGraph};

/// Simplify a skeleton in place
pub trait SkeletonSimplifier {
    /// Simplify down to `target` live spheres
    fn simplify(&self, graph: &mut SkeletalGraph, target: usize) -> Result<SimplifyReport>;
}
