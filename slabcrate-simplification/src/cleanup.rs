//! Removal of spheres that no slab touches

use slabcrate_core::{SkeletalGraph, VertexId};
use tracing::info;

/// Tombstone every live sphere with no incident edge or face.
///
/// Returns the number removed; a second call removes nothing.
pub fn clean_isolated_vertices(graph: &mut SkeletalGraph) -> usize {
    let isolated: Vec<VertexId> = graph
        .vertex_ids()
        .filter(|v| graph.vertex(*v).is_isolated())
        .collect();

    let removed = isolated
        .into_iter()
        .filter(|v| graph.remove_isolated_vertex(*v))
        .count();

    if removed > 0 {
        info!(removed, remaining = graph.vertex_count(), "removed isolated spheres");
    }
    removed
}
