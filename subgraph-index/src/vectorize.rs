use std::{fmt::Display, time::Instant};

use rayon::prelude::*;

use crate::{enumerate::substructures, mine::Feature, Config, Graph};

/// Graphs handed to a worker at once.
pub const VECTORIZE_BATCH: usize = 50;

/// Row-major matrix with one row per graph and one column per feature.
///
/// Bit vectors hold `0` and `1`, count vectors any non-negative count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureMatrix {
    width: usize,
    rows: usize,
    values: Vec<u32>,
}

impl FeatureMatrix {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            rows: 0,
            values: Vec::new(),
        }
    }

    /// Builds a matrix from equally long rows. The width of an empty input
    /// is zero.
    ///
    /// # Panics
    ///
    /// Panics if the rows differ in length.
    pub fn from_rows<R: AsRef<[u32]>>(rows: &[R]) -> Self {
        let width = rows.first().map_or(0, |row| row.as_ref().len());
        let mut matrix = Self::new(width);
        for row in rows {
            matrix.push(row.as_ref());
        }
        matrix
    }

    /// # Panics
    ///
    /// Panics if `row` does not match the width of the matrix.
    pub fn push(&mut self, row: &[u32]) {
        assert_eq!(row.len(), self.width, "row width");
        self.values.extend_from_slice(row);
        self.rows += 1;
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn row(&self, idx: usize) -> &[u32] {
        &self.values[idx * self.width..(idx + 1) * self.width]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u32]> {
        (0..self.rows).map(move |idx| self.row(idx))
    }
}

impl Display for FeatureMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} x {}", self.rows, self.width)
    }
}

/// Bit vector of a single graph: `1` at column `i` iff the graph contains
/// the signature of `features[i]`.
pub fn bit_vector(graph: &Graph, features: &[Feature], config: &Config) -> Vec<u32> {
    let local = substructures(graph, config);

    features
        .iter()
        .map(|feature| local.contains(feature.kind, &feature.signature) as u32)
        .collect()
}

/// Computes the bit vectors of all graphs in parallel. Row `i` of the result
/// belongs to `graphs[i]`.
pub fn vectorize(graphs: &[Graph], features: &[Feature], config: &Config) -> FeatureMatrix {
    log::info!(
        "Vectorizing {} graphs against {} features",
        graphs.len(),
        features.len()
    );
    let start = Instant::now();

    let mut rows = graphs
        .par_iter()
        .with_min_len(VECTORIZE_BATCH)
        .enumerate()
        .map(|(idx, graph)| (idx, bit_vector(graph, features, config)))
        .collect::<Vec<_>>();

    rows.sort_unstable_by_key(|(idx, _)| *idx);

    let mut matrix = FeatureMatrix::new(features.len());
    for (_, row) in rows {
        matrix.push(&row);
    }

    log::info!("Vectorized {} in {:?}", matrix, start.elapsed());

    matrix
}
