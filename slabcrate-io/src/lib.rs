//! I/O operations for medial-axis skeletons
//!
//! This crate reads and writes the `.ma` skeleton interchange format: the
//! raw skeleton handed over by axis extraction and the simplified skeleton
//! with its export attributes.

pub mod error;
pub mod ma;

pub use error::*;
pub use ma::{prefix_from_input, raw_path, simplified_path, MaReader, MaWriter};

use slabcrate_core::{RawSkeleton, SkeletalGraph, SlabAttributes};
use std::path::Path;

/// Trait for reading skeletons from files
pub trait SkeletonReader {
    fn read_skeleton<P: AsRef<Path>>(path: P) -> Result<RawSkeleton>;
}

/// Trait for writing skeletons to files
pub trait SkeletonWriter {
    fn write_skeleton<P: AsRef<Path>>(
        graph: &SkeletalGraph,
        attributes: Option<&SlabAttributes>,
        path: P,
    ) -> Result<()>;
}

fn require_ma(path: &Path) -> Result<()> {
    match path.extension().and_then(|s| s.to_str()) {
        Some("ma") => Ok(()),
        other => Err(IoError::UnsupportedFormat {
            format: format!("{:?}", other),
        }),
    }
}

/// Auto-detect format and read a skeleton
pub fn read_skeleton<P: AsRef<Path>>(path: P) -> Result<RawSkeleton> {
    let path = path.as_ref();
    require_ma(path)?;
    MaReader::read_skeleton(path)
}

/// Read a skeleton and build its graph
pub fn load_graph<P: AsRef<Path>>(path: P) -> Result<SkeletalGraph> {
    let raw = read_skeleton(path)?;
    Ok(SkeletalGraph::from_raw(&raw)?)
}

/// Auto-detect format and write a skeleton
pub fn write_skeleton<P: AsRef<Path>>(
    graph: &SkeletalGraph,
    attributes: Option<&SlabAttributes>,
    path: P,
) -> Result<()> {
    let path = path.as_ref();
    require_ma(path)?;
    MaWriter::write_skeleton(graph, attributes, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use slabcrate_core::Sphere;

    #[test]
    fn test_unsupported_extension() {
        let mut graph = SkeletalGraph::new();
        graph.add_vertex(Sphere::from_coords(0.0, 0.0, 0.0, 1.0), false);
        assert!(matches!(
            write_skeleton(&graph, None, "skeleton.obj"),
            Err(IoError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            read_skeleton("skeleton"),
            Err(IoError::UnsupportedFormat { .. })
        ));
    }
}
