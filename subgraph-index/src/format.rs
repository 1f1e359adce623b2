//! Text formats exchanged with the tools around the index.
//!
//! Feature list:
//!
//! ```text
//! # SIG: PATH::C-s-O (Supp: 42)
//! t # 0
//! v 0 C
//! v 1 O
//! e 0 1 s
//! ```
//!
//! Vectors: one line per graph with space separated values.
//!
//! Candidates: `q # <query>` followed by `c # <database indices>`.
use atoi::FromRadix10Checked;
use std::{
    borrow::Cow,
    io::{Read, Write},
};

use linereader::LineReader;

use crate::{
    filter::Candidates,
    graph::{decode, GraphBuilder, Line},
    mine::{Feature, FeatureKind},
    signature::path_prototype,
    vectorize::FeatureMatrix,
    Error, Graph,
};

const SIG_PREFIX: &str = "# SIG:";
const SUPPORT_PREFIX: &str = " (Supp:";

pub fn write_features<W: Write>(mut out: W, features: &[Feature]) -> Result<(), Error> {
    for (idx, feature) in features.iter().enumerate() {
        writeln!(out, "{} {}", SIG_PREFIX, feature)?;
        writeln!(out, "t # {}", idx)?;

        let prototype = match (&feature.prototype, feature.kind) {
            (Some(prototype), _) => Cow::Borrowed(prototype),
            (None, FeatureKind::Path) => Cow::Owned(path_prototype(&feature.signature)),
            (None, FeatureKind::Ring) => Cow::Owned(GraphBuilder::new().build()),
        };
        write_graph(&mut out, &prototype)?;
    }
    Ok(())
}

/// Writes `v`/`e` lines with nodes numbered by their position in the graph
/// and edges ordered by their smaller, then larger endpoint.
pub fn write_graph<W: Write>(mut out: W, graph: &Graph) -> Result<(), Error> {
    for node in 0..graph.node_count() {
        writeln!(out, "v {} {}", node, graph.label(node))?;
    }

    let mut edges = graph
        .edges()
        .iter()
        .map(|e| (e.source.min(e.target), e.source.max(e.target), &e.label))
        .collect::<Vec<_>>();
    edges.sort_unstable();

    for (source, target, label) in edges {
        writeln!(out, "e {} {} {}", source, target, label)?;
    }
    Ok(())
}

/// Reads a feature list in file order. Ring features get the graph block
/// following their header as prototype.
pub fn read_features<R: Read>(input: R) -> Result<Vec<Feature>, Error> {
    fn finish(features: &mut Vec<Feature>, pending: Option<(Feature, GraphBuilder)>) {
        if let Some((mut feature, builder)) = pending {
            if feature.kind == FeatureKind::Ring && !builder.is_empty() {
                feature.prototype = Some(builder.build());
            }
            features.push(feature);
        }
    }

    let mut lines = LineReader::new(input);
    let mut features = Vec::new();
    let mut pending: Option<(Feature, GraphBuilder)> = None;

    while let Some(line) = lines.next_line() {
        let line = decode(line?);
        let line = line.trim_start_matches('\u{feff}').trim();

        if let Some(header) = line.strip_prefix(SIG_PREFIX) {
            finish(&mut features, pending.take());
            match parse_signature(header) {
                Some(feature) => pending = Some((feature, GraphBuilder::new())),
                None => log::warn!("Skipping feature header: {}", line),
            }
            continue;
        }

        if let Some((_, builder)) = pending.as_mut() {
            match Line::parse(line) {
                Line::Node(id, label) => {
                    builder.add_node(id, label);
                }
                Line::Edge(source, target, label) => {
                    builder.add_edge(source, target, label);
                }
                Line::Header | Line::Skip => {}
            }
        }
    }

    finish(&mut features, pending);

    Ok(features)
}

/// Parses `<KIND>::<signature> (Supp: <count>)`, the support is optional.
fn parse_signature(header: &str) -> Option<Feature> {
    let header = header.trim();

    let (content, support) = match header.rfind(SUPPORT_PREFIX) {
        Some(pos) => {
            let support = header[pos + SUPPORT_PREFIX.len()..]
                .trim_end_matches(')')
                .trim()
                .parse::<usize>()
                .ok()?;
            (&header[..pos], support)
        }
        None => (header, 0),
    };

    let (kind, signature) = content.split_once("::")?;
    let kind = kind.trim().parse::<FeatureKind>().ok()?;

    Some(Feature::new(kind, signature.trim(), support))
}

pub fn write_vectors<W: Write>(mut out: W, vectors: &FeatureMatrix) -> Result<(), Error> {
    for row in vectors.rows() {
        let values = row.iter().map(u32::to_string).collect::<Vec<_>>();
        writeln!(out, "{}", values.join(" "))?;
    }
    Ok(())
}

/// Reads one row per line. The first non-blank line fixes the width, lines
/// of another width or with non-numeric values are skipped. Blank lines are
/// width-0 rows only if the whole input is blank.
pub fn read_vectors<R: Read>(input: R) -> Result<FeatureMatrix, Error> {
    fn value(token: &str) -> Option<u32> {
        match u32::from_radix_10_checked(token.as_bytes()) {
            (Some(value), used) if used > 0 && used == token.len() => Some(value),
            _ => None,
        }
    }

    let mut lines = LineReader::new(input);
    let mut matrix: Option<FeatureMatrix> = None;
    let mut blank_lines = 0;
    let mut line_number = 0;

    while let Some(line) = lines.next_line() {
        line_number += 1;
        let line = decode(line?);

        let row = match line.split_whitespace().map(value).collect::<Option<Vec<_>>>() {
            Some(row) => row,
            None => {
                log::warn!("Skipping vector line {}: not a number", line_number);
                continue;
            }
        };

        if matrix.is_none() {
            if row.is_empty() {
                blank_lines += 1;
                continue;
            }
            if blank_lines > 0 {
                log::warn!("Skipping {} blank vector lines", blank_lines);
            }
        }

        let matrix = matrix.get_or_insert_with(|| FeatureMatrix::new(row.len()));
        if row.len() == matrix.width() {
            matrix.push(&row);
        } else {
            log::warn!(
                "Skipping vector line {}: expected {} values, got {}",
                line_number,
                matrix.width(),
                row.len()
            );
        }
    }

    Ok(matrix.unwrap_or_else(|| {
        let mut matrix = FeatureMatrix::new(0);
        for _ in 0..blank_lines {
            matrix.push(&[]);
        }
        matrix
    }))
}

pub fn write_candidates<W: Write>(mut out: W, candidates: &Candidates) -> Result<(), Error> {
    for (query, candidates) in candidates.iter() {
        let indices = candidates
            .iter()
            .map(usize::to_string)
            .collect::<Vec<_>>();
        writeln!(out, "q # {}", query)?;
        writeln!(out, "c # {}", indices.join(" "))?;
    }
    Ok(())
}
