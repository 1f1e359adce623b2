//! Canonical identities for paths and rings.
//!
//! Path signatures are exact: a path and its reversal always map to the same
//! string. Ring signatures are a one round Weisfeiler-Lehman hash of the
//! hollow ring, seeded by node labels only. Isomorphic rings always share a
//! hash, non-isomorphic rings may rarely collide.
use std::collections::BTreeMap;

use crate::graph::{Graph, GraphBuilder};

/// Label used for a missing edge between consecutive path nodes.
pub const DEFAULT_EDGE_LABEL: &str = "0";

pub const MIN_RING_SIZE: usize = 3;
pub const MAX_RING_SIZE: usize = 12;

const SEPARATOR: char = '-';

// bytes of the blake3 output kept per hash
const DIGEST_SIZE: usize = 16;

/// Returns the smaller of the forward and backward traversal strings
/// `label(n0)-edge(n0,n1)-label(n1)...` of the given path.
pub fn path_signature(graph: &Graph, nodes: &[usize]) -> String {
    if let [node] = nodes {
        return graph.label(*node).to_string();
    }

    let forward = traverse(graph, nodes.iter().copied());
    let backward = traverse(graph, nodes.iter().rev().copied());

    forward.min(backward)
}

fn traverse(graph: &Graph, nodes: impl Iterator<Item = usize>) -> String {
    let mut signature = String::new();
    let mut previous = None;

    for node in nodes {
        if let Some(previous) = previous {
            signature.push(SEPARATOR);
            signature.push_str(
                graph
                    .edge_label(previous, node)
                    .unwrap_or(DEFAULT_EDGE_LABEL),
            );
            signature.push(SEPARATOR);
        }
        signature.push_str(graph.label(node));
        previous = Some(node);
    }

    signature
}

/// Hash of the hollow ring spanned by `nodes`.
///
/// `nodes` must form a simple cycle of `MIN_RING_SIZE..=MAX_RING_SIZE` nodes
/// in traversal order.
pub fn ring_signature(graph: &Graph, nodes: &[usize]) -> String {
    wl_hash(&hollow_ring(graph, nodes), 1)
}

/// The cycle's nodes and the cycle's own edges, including the closing edge.
/// Chords and attached branches are not part of the ring. Node ids are
/// carried over from `graph`.
pub fn hollow_ring(graph: &Graph, nodes: &[usize]) -> Graph {
    let mut builder = GraphBuilder::new();

    for &node in nodes {
        builder.add_node(graph.id(node), graph.label(node));
    }

    for (i, &source) in nodes.iter().enumerate() {
        let target = nodes[(i + 1) % nodes.len()];
        if let Some(label) = graph.edge_label(source, target) {
            builder.add_edge(graph.id(source), graph.id(target), label);
        }
    }

    builder.build()
}

/// Weisfeiler-Lehman graph hash over node labels.
///
/// Each round replaces a node's label with the digest of its label followed
/// by the sorted labels of its neighbors. The graph hash is the digest of the
/// per round label histograms.
pub fn wl_hash(graph: &Graph, iterations: usize) -> String {
    let mut labels = (0..graph.node_count())
        .map(|node| graph.label(node).to_string())
        .collect::<Vec<_>>();

    let mut histograms = String::new();

    for _ in 0..iterations {
        let next = (0..graph.node_count())
            .map(|node| {
                let mut neighborhood = graph
                    .neighbors(node)
                    .iter()
                    .map(|&neighbor| labels[neighbor].as_str())
                    .collect::<Vec<_>>();
                neighborhood.sort_unstable();

                let mut aggregate = labels[node].clone();
                neighborhood.into_iter().for_each(|l| aggregate.push_str(l));
                digest(&aggregate)
            })
            .collect::<Vec<_>>();
        labels = next;

        let mut histogram = BTreeMap::<&str, usize>::new();
        for label in labels.iter() {
            *histogram.entry(label.as_str()).or_insert(0) += 1;
        }
        for (label, count) in histogram {
            histograms.push_str(&format!("({}, {})", label, count));
        }
    }

    digest(&histograms)
}

fn digest(input: &str) -> String {
    let hash = blake3::hash(input.as_bytes());
    hex::encode(&hash.as_bytes()[..DIGEST_SIZE])
}

/// Rebuilds the path graph described by a path signature.
///
/// Labels containing the separator cannot be told apart from the separator
/// and are split.
pub fn path_prototype(signature: &str) -> Graph {
    let tokens = signature
        .split(SEPARATOR)
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>();

    let mut builder = GraphBuilder::new();

    if let Some((first, rest)) = tokens.split_first() {
        builder.add_node(0, *first);
        for (i, step) in rest.chunks_exact(2).enumerate() {
            builder.add_node(i + 1, step[1]);
            builder.add_edge(i, i + 1, step[0]);
        }
    }

    builder.build()
}
