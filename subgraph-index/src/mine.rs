use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
    fmt::Display,
    str::FromStr,
    time::Instant,
};

use rayon::prelude::*;

use crate::{
    enumerate::{substructures, Substructures},
    signature::hollow_ring,
    Config, Error, Graph,
};

/// A chunk never holds fewer graphs than this.
pub const MIN_CHUNK_SIZE: usize = 10;
/// Chunks per worker, to balance stragglers.
pub const CHUNKS_PER_WORKER: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureKind {
    Ring,
    Path,
}

impl Display for FeatureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureKind::Ring => write!(f, "RING"),
            FeatureKind::Path => write!(f, "PATH"),
        }
    }
}

impl FromStr for FeatureKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "RING" => Ok(FeatureKind::Ring),
            "PATH" => Ok(FeatureKind::Path),
            _ => Err(Error::UnknownFeatureKind(s.to_string())),
        }
    }
}

/// A mined substructure. The position of a feature in the mined list is the
/// column of that feature in every feature vector.
#[derive(Debug, Clone)]
pub struct Feature {
    pub kind: FeatureKind,
    pub signature: String,
    /// number of distinct graphs containing the signature
    pub support: usize,
    /// hollow ring of the first occurrence, rings only
    pub prototype: Option<Graph>,
}

impl Feature {
    pub fn new(kind: FeatureKind, signature: impl Into<String>, support: usize) -> Self {
        Self {
            kind,
            signature: signature.into(),
            support,
            prototype: None,
        }
    }

    /// Support descending, then rings before paths, then signature.
    fn rank(&self, other: &Feature) -> Ordering {
        other
            .support
            .cmp(&self.support)
            .then(self.kind.cmp(&other.kind))
            .then_with(|| self.signature.cmp(&other.signature))
    }
}

impl Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{} (Supp: {})", self.kind, self.signature, self.support)
    }
}

/// Number of graphs per mining task.
pub fn chunk_size(graph_count: usize, workers: usize) -> usize {
    MIN_CHUNK_SIZE.max(graph_count / (workers.max(1) * CHUNKS_PER_WORKER))
}

/// Inclusive support bounds `(floor(min_ratio * n), floor(max_ratio * n))`.
pub fn support_bounds(graph_count: usize, config: &Config) -> (usize, usize) {
    let bound = |ratio: f64| (ratio * graph_count as f64).floor() as usize;
    (
        bound(config.min_support_ratio),
        bound(config.max_support_ratio),
    )
}

/// Per signature graph counts of a contiguous chunk of the database.
///
/// Counts merge by key-wise summation, so chunks can be merged in any order.
/// Prototypes keep the entry of the left operand.
#[derive(Debug, Default)]
pub struct ChunkCounts {
    graphs: usize,
    paths: BTreeMap<usize, HashMap<String, usize>>,
    rings: HashMap<String, usize>,
    prototypes: HashMap<String, Graph>,
}

impl ChunkCounts {
    pub fn from_chunk(graphs: &[Graph], config: &Config) -> Self {
        let mut counts = ChunkCounts::default();
        for graph in graphs {
            counts.add(graph, &substructures(graph, config));
        }
        counts
    }

    pub fn add(&mut self, graph: &Graph, substructures: &Substructures) {
        self.graphs += 1;

        for (&len, signatures) in substructures.paths() {
            let counts = self.paths.entry(len).or_default();
            for signature in signatures {
                *counts.entry(signature.clone()).or_insert(0) += 1;
            }
        }

        for (signature, cycle) in substructures.rings() {
            *self.rings.entry(signature.to_string()).or_insert(0) += 1;
            if !self.prototypes.contains_key(signature) {
                self.prototypes
                    .insert(signature.to_string(), hollow_ring(graph, cycle));
            }
        }
    }

    pub fn merge(mut self, other: ChunkCounts) -> ChunkCounts {
        self.graphs += other.graphs;

        for (len, counts) in other.paths {
            let target = self.paths.entry(len).or_default();
            for (signature, count) in counts {
                *target.entry(signature).or_insert(0) += count;
            }
        }

        for (signature, count) in other.rings {
            *self.rings.entry(signature).or_insert(0) += count;
        }

        for (signature, prototype) in other.prototypes {
            self.prototypes.entry(signature).or_insert(prototype);
        }

        self
    }

    pub fn graph_count(&self) -> usize {
        self.graphs
    }

    pub fn path_counts(&self) -> &BTreeMap<usize, HashMap<String, usize>> {
        &self.paths
    }

    pub fn ring_counts(&self) -> &HashMap<String, usize> {
        &self.rings
    }

    /// Keeps signatures whose support lies within [`support_bounds`], ranks
    /// them and returns the first `config.top_k`.
    pub fn into_features(self, config: &Config) -> Vec<Feature> {
        let (min_count, max_count) = support_bounds(self.graphs, config);
        let retained = |count: usize| min_count <= count && count <= max_count;

        let ChunkCounts {
            paths,
            rings,
            mut prototypes,
            ..
        } = self;

        let mut features = Vec::new();

        for (signature, support) in rings {
            if retained(support) {
                let prototype = prototypes.remove(&signature);
                features.push(Feature {
                    kind: FeatureKind::Ring,
                    signature,
                    support,
                    prototype,
                });
            }
        }

        for (signature, support) in paths.into_iter().flat_map(|(_, counts)| counts) {
            if retained(support) {
                features.push(Feature::new(FeatureKind::Path, signature, support));
            }
        }

        log::debug!(
            "{} features with support in [{}, {}]",
            features.len(),
            min_count,
            max_count
        );

        features.sort_by(Feature::rank);
        features.truncate(config.top_k);
        features
    }
}

/// Mines the `config.top_k` most frequent path and ring features of the
/// database whose support lies within the configured ratios.
pub fn mine(graphs: &[Graph], config: &Config) -> Vec<Feature> {
    let workers = rayon::current_num_threads();
    let chunk_size = chunk_size(graphs.len(), workers);

    log::info!(
        "Mining {} graphs on {} workers in chunks of {}",
        graphs.len(),
        workers,
        chunk_size
    );
    let start = Instant::now();

    let counts = graphs
        .par_chunks(chunk_size)
        .map(|chunk| ChunkCounts::from_chunk(chunk, config))
        .reduce(ChunkCounts::default, ChunkCounts::merge);

    log::info!(
        "Counted {} path and {} ring signatures in {:?}",
        counts.paths.values().map(HashMap::len).sum::<usize>(),
        counts.rings.len(),
        start.elapsed()
    );

    counts.into_features(config)
}
