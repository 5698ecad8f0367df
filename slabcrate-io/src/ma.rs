//! `.ma` skeleton format support
//!
//! Whitespace separated text:
//!
//! ```text
//! V E F
//! v x y z r                       (V lines)
//! e i j                           (E lines)
//! f i j k                         (F lines)
//! b i                             (optional boundary marking)
//! vn i x y z                      (optional vertex normals)
//! fn i x y z                      (optional face normals)
//! ec i bx by bz br tx ty tz tr    (optional edge cones)
//! ```
//!
//! Indices are 0-based over live entities in id order. `#` starts a comment.

use crate::{IoError, Result, SkeletonReader, SkeletonWriter};
use slabcrate_core::{IndexBase, RawSkeleton, SkeletalGraph, SlabAttributes, Sphere};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::{FromStr, SplitWhitespace};
use tracing::{debug, info};

pub struct MaReader;
pub struct MaWriter;

/// Path of the raw skeleton export: `{prefix}.ma`.
pub fn raw_path(prefix: &str) -> PathBuf {
    PathBuf::from(format!("{}.ma", prefix))
}

/// Path of a simplified export, named after its live counts.
pub fn simplified_path(prefix: &str, graph: &SkeletalGraph) -> PathBuf {
    PathBuf::from(format!(
        "{}___v_{}___e_{}___f_{}.ma",
        prefix,
        graph.vertex_count(),
        graph.edge_count(),
        graph.face_count()
    ))
}

/// Output prefix for a surface input path: the path with a trailing `.off` removed.
pub fn prefix_from_input<P: AsRef<Path>>(input: P) -> String {
    let input = input.as_ref().to_string_lossy();
    match input.strip_suffix(".off") {
        Some(stem) => stem.to_string(),
        None => input.into_owned(),
    }
}

impl MaWriter {
    /// Write `graph` (and optional attributes) to any sink.
    pub fn write_to<W: Write>(
        graph: &SkeletalGraph,
        attributes: Option<&SlabAttributes>,
        writer: &mut W,
    ) -> Result<()> {
        let vertex_index = graph.compact_vertex_indices();

        writeln!(
            writer,
            "{} {} {}",
            graph.vertex_count(),
            graph.edge_count(),
            graph.face_count()
        )?;

        for v in graph.vertex_ids() {
            let s = graph.sphere(v);
            writeln!(writer, "v {} {} {} {}", s.center.x, s.center.y, s.center.z, s.radius)?;
        }
        for e in graph.edge_ids() {
            let [a, b] = graph.edge(e).vertices();
            writeln!(writer, "e {} {}", vertex_index[&a], vertex_index[&b])?;
        }
        for f in graph.face_ids() {
            let [a, b, c] = graph.face(f).vertices();
            writeln!(
                writer,
                "f {} {} {}",
                vertex_index[&a], vertex_index[&b], vertex_index[&c]
            )?;
        }
        for v in graph.vertex_ids() {
            if graph.vertex(v).is_marked_boundary() {
                writeln!(writer, "b {}", vertex_index[&v])?;
            }
        }

        if let Some(attributes) = attributes {
            for (v, n) in &attributes.vertex_normals {
                if let Some(i) = vertex_index.get(v) {
                    writeln!(writer, "vn {} {} {} {}", i, n.x, n.y, n.z)?;
                }
            }

            for (i, f) in graph.face_ids().enumerate() {
                if let Some(n) = attributes.face_normal(f) {
                    writeln!(writer, "fn {} {} {} {}", i, n.x, n.y, n.z)?;
                }
            }

            for (i, e) in graph.edge_ids().enumerate() {
                let Some(cone) = attributes.edge_cones.get(&e) else {
                    continue;
                };
                if cone.is_degenerate() {
                    continue;
                }
                writeln!(
                    writer,
                    "ec {} {} {} {} {} {} {} {} {}",
                    i,
                    cone.base.x,
                    cone.base.y,
                    cone.base.z,
                    cone.base_radius,
                    cone.top.x,
                    cone.top.y,
                    cone.top.z,
                    cone.top_radius
                )?;
            }
        }

        writer.flush()?;
        Ok(())
    }

    /// Export the unsimplified skeleton to `{prefix}.ma`.
    pub fn export_raw(graph: &SkeletalGraph, prefix: &str) -> Result<PathBuf> {
        let path = raw_path(prefix);
        Self::write_skeleton(graph, None, &path)?;
        info!(path = %path.display(), "exported raw skeleton");
        Ok(path)
    }

    /// Export a simplified skeleton to `{prefix}___v_{V}___e_{E}___f_{F}.ma`.
    pub fn export_simplified(
        graph: &SkeletalGraph,
        attributes: &SlabAttributes,
        prefix: &str,
    ) -> Result<PathBuf> {
        let path = simplified_path(prefix, graph);
        Self::write_skeleton(graph, Some(attributes), &path)?;
        info!(path = %path.display(), "exported simplified skeleton");
        Ok(path)
    }
}

impl SkeletonWriter for MaWriter {
    fn write_skeleton<P: AsRef<Path>>(
        graph: &SkeletalGraph,
        attributes: Option<&SlabAttributes>,
        path: P,
    ) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(graph, attributes, &mut writer)?;
        debug!(
            path = %path.display(),
            vertices = graph.vertex_count(),
            edges = graph.edge_count(),
            faces = graph.face_count(),
            "wrote skeleton"
        );
        Ok(())
    }
}

/// Pulls typed fields off one line.
struct Fields<'a> {
    line: usize,
    tokens: SplitWhitespace<'a>,
}

impl<'a> Fields<'a> {
    fn next<T: FromStr>(&mut self, what: &str) -> Result<T> {
        let token = self
            .tokens
            .next()
            .ok_or_else(|| IoError::parse(self.line, format!("missing {}", what)))?;
        token
            .parse()
            .map_err(|_| IoError::parse(self.line, format!("invalid {} '{}'", what, token)))
    }

    fn finish(mut self) -> Result<()> {
        match self.tokens.next() {
            Some(extra) => Err(IoError::parse(self.line, format!("unexpected '{}'", extra))),
            None => Ok(()),
        }
    }
}

impl MaReader {
    /// Parse a skeleton from any buffered source. Attribute lines are skipped.
    pub fn read_from<R: BufRead>(reader: R) -> Result<RawSkeleton> {
        let mut header: Option<[usize; 3]> = None;
        let mut skeleton = RawSkeleton {
            index_base: IndexBase::Zero,
            ..Default::default()
        };
        let mut last_line = 0;

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let number = index + 1;
            last_line = number;
            let content = line.split('#').next().unwrap_or("").trim();
            if content.is_empty() {
                continue;
            }

            let mut fields = Fields {
                line: number,
                tokens: content.split_whitespace(),
            };

            let Some(counts) = header else {
                let counts = [
                    fields.next("vertex count")?,
                    fields.next("edge count")?,
                    fields.next("face count")?,
                ];
                fields.finish()?;
                header = Some(counts);
                continue;
            };

            let tag: String = fields.next("record tag")?;
            match tag.as_str() {
                "v" => {
                    if skeleton.spheres.len() == counts[0] {
                        return Err(IoError::parse(number, "more vertices than declared"));
                    }
                    let sphere = Sphere::from_coords(
                        fields.next("x")?,
                        fields.next("y")?,
                        fields.next("z")?,
                        fields.next("radius")?,
                    );
                    fields.finish()?;
                    skeleton.spheres.push(sphere);
                }
                "e" => {
                    if skeleton.edges.len() == counts[1] {
                        return Err(IoError::parse(number, "more edges than declared"));
                    }
                    let edge = [fields.next("edge index")?, fields.next("edge index")?];
                    fields.finish()?;
                    skeleton.edges.push(edge);
                }
                "f" => {
                    if skeleton.faces.len() == counts[2] {
                        return Err(IoError::parse(number, "more faces than declared"));
                    }
                    let face = [
                        fields.next("face index")?,
                        fields.next("face index")?,
                        fields.next("face index")?,
                    ];
                    fields.finish()?;
                    skeleton.faces.push(face);
                }
                "b" => {
                    let vertex = fields.next("boundary index")?;
                    fields.finish()?;
                    skeleton.boundary.push(vertex);
                }
                "vn" | "fn" | "ec" => {}
                other => {
                    return Err(IoError::parse(number, format!("unknown record '{}'", other)));
                }
            }
        }

        let Some(counts) = header else {
            return Err(IoError::parse(last_line, "missing header"));
        };
        let found = [
            skeleton.spheres.len(),
            skeleton.edges.len(),
            skeleton.faces.len(),
        ];
        if found != counts {
            return Err(IoError::parse(
                last_line,
                format!(
                    "header declares {} {} {} records, found {} {} {}",
                    counts[0], counts[1], counts[2], found[0], found[1], found[2]
                ),
            ));
        }

        Ok(skeleton)
    }
}

impl SkeletonReader for MaReader {
    fn read_skeleton<P: AsRef<Path>>(path: P) -> Result<RawSkeleton> {
        let file = File::open(path)?;
        Self::read_from(BufReader::new(file))
    }
}
