//! Core data structures and traits for slabcrate
//!
//! This crate provides the skeletal slab mesh of a medial axis: spheres,
//! the envelope primitives between them, the 4D sphere quadric used to
//! measure approximation error, and the post-pass attributes needed to
//! export a simplified skeleton.

pub mod attributes;
pub mod error;
pub mod graph;
pub mod primitives;
pub mod quadric;
pub mod surface;
pub mod traits;

pub use attributes::*;
pub use error::*;
pub use graph::*;
pub use primitives::*;
pub use quadric::*;
pub use surface::*;
pub use traits::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Matrix4, Point3, Vector3, Vector4};
