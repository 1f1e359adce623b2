//! Filter-and-refine candidate generation.
//!
//! A database graph that contains a query graph contains every path and ring
//! of the query as well, so its vector dominates the query vector. The
//! predicates below only reject graphs that violate this necessary
//! condition. Surviving candidates may still be false positives, either
//! because the features do not capture the whole query or because two
//! different rings share a hash. Use [`refine`] with an exact [`Verifier`]
//! to confirm them.
use std::{fmt::Display, time::Instant};

use rayon::prelude::*;

use crate::{vectorize::FeatureMatrix, Error, Graph, Predicate};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Candidates {
    /// ascending database indices for each query
    candidates: Box<[Vec<usize>]>,
}

impl Candidates {
    pub fn new(candidates: Vec<Vec<usize>>) -> Self {
        Self {
            candidates: candidates.into_boxed_slice(),
        }
    }

    pub fn candidates(&self, query: usize) -> &[usize] {
        self.candidates[query].as_slice()
    }

    pub fn candidate_count(&self, query: usize) -> usize {
        self.candidates[query].len()
    }

    pub fn query_count(&self) -> usize {
        self.candidates.len()
    }

    /// `(query, candidates)` pairs by ascending query index.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[usize])> {
        self.candidates
            .iter()
            .enumerate()
            .map(|(query, candidates)| (query, candidates.as_slice()))
    }

    pub fn stats(&self) -> CandidateStats {
        let counts = self.candidates.iter().map(Vec::len);
        let total = counts.clone().sum::<usize>();

        CandidateStats {
            min: counts.clone().min().unwrap_or_default(),
            max: counts.max().unwrap_or_default(),
            mean: if self.candidates.is_empty() {
                0.0
            } else {
                total as f64 / self.candidates.len() as f64
            },
        }
    }
}

impl Display for Candidates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts = self
            .candidates
            .iter()
            .enumerate()
            .map(|(n, c)| format!("{}: {}", n, c.len()))
            .collect::<Vec<_>>();

        write!(f, "{{{}}}", counts.join(", "))
    }
}

/// Candidate set sizes over all queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateStats {
    pub min: usize,
    pub max: usize,
    pub mean: f64,
}

impl Display for CandidateStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Min |C_q|: {}, Max |C_q|: {}, Avg |C_q|: {:.2}",
            self.min, self.max, self.mean
        )
    }
}

/// Every feature present in the query is present in the database graph.
pub fn containment(query: &[u32], data: &[u32]) -> bool {
    query.iter().zip(data).all(|(&q, &d)| q == 0 || d != 0)
}

/// Every count of the query is at most the count of the database graph.
pub fn dominance(query: &[u32], data: &[u32]) -> bool {
    query.iter().zip(data).all(|(q, d)| q <= d)
}

impl Predicate {
    pub fn admits(&self, query: &[u32], data: &[u32]) -> bool {
        match self {
            Predicate::Containment => containment(query, data),
            Predicate::Dominance => dominance(query, data),
        }
    }
}

/// Ascending indices of all database rows admitted for `query`.
pub fn candidates_for(database: &FeatureMatrix, query: &[u32], predicate: Predicate) -> Vec<usize> {
    database
        .rows()
        .enumerate()
        .filter(|(_, data)| predicate.admits(query, data))
        .map(|(idx, _)| idx)
        .collect()
}

/// Computes the candidates of every query row in parallel.
pub fn filter_candidates(
    database: &FeatureMatrix,
    queries: &FeatureMatrix,
    predicate: Predicate,
) -> Result<Candidates, Error> {
    if !database.is_empty() && !queries.is_empty() && database.width() != queries.width() {
        return Err(Error::WidthMismatch {
            database: database.width(),
            query: queries.width(),
        });
    }

    log::info!(
        "Filtering {} queries against {} graphs ({})",
        queries.len(),
        database.len(),
        predicate
    );
    let start = Instant::now();

    let mut results = (0..queries.len())
        .into_par_iter()
        .map(|query| (query, candidates_for(database, queries.row(query), predicate)))
        .collect::<Vec<_>>();

    results.sort_unstable_by_key(|(query, _)| *query);

    let candidates = Candidates::new(results.into_iter().map(|(_, c)| c).collect());

    log::info!("Filtered candidates in {:?}", start.elapsed());

    Ok(candidates)
}

/// Exact containment check, e.g. a subgraph isomorphism test.
pub trait Verifier {
    /// Returns `true` iff `query` is a subgraph of `data`.
    fn verify(&self, query: &Graph, data: &Graph) -> bool;
}

impl<F> Verifier for F
where
    F: Fn(&Graph, &Graph) -> bool,
{
    fn verify(&self, query: &Graph, data: &Graph) -> bool {
        self(query, data)
    }
}

/// Keeps only the candidates confirmed by `verifier`.
pub fn refine<V>(
    candidates: &Candidates,
    database: &[Graph],
    queries: &[Graph],
    verifier: &V,
) -> Candidates
where
    V: Verifier + Sync + ?Sized,
{
    let mut results = candidates
        .candidates
        .par_iter()
        .enumerate()
        .map(|(query, candidates)| {
            let confirmed = candidates
                .iter()
                .copied()
                .filter(|&data| verifier.verify(&queries[query], &database[data]))
                .collect::<Vec<_>>();
            (query, confirmed)
        })
        .collect::<Vec<_>>();

    results.sort_unstable_by_key(|(query, _)| *query);

    Candidates::new(results.into_iter().map(|(_, c)| c).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GdlGraph;

    fn matrix(rows: &[&[u32]]) -> FeatureMatrix {
        FeatureMatrix::from_rows(rows)
    }

    #[test]
    fn test_containment_single_query() {
        let database = matrix(&[&[1, 1, 0], &[0, 1, 1]]);
        let queries = matrix(&[&[1, 0, 0]]);

        let candidates = filter_candidates(&database, &queries, Predicate::Containment).unwrap();

        assert_eq!(candidates.query_count(), 1);
        assert_eq!(candidates.candidates(0), &[0]);
    }

    #[test]
    fn test_containment_is_reflexive() {
        let rows: &[&[u32]] = &[&[1, 0, 1, 1], &[0, 0, 0, 0], &[1, 1, 1, 1], &[0, 1, 0, 1]];
        let database = matrix(rows);

        let candidates = filter_candidates(&database, &database, Predicate::Containment).unwrap();

        for (query, candidates) in candidates.iter() {
            assert!(candidates.contains(&query));
        }
        assert_eq!(candidates.candidates(2), &[2]);
        // vacuously admitted everywhere
        assert_eq!(candidates.candidates(1), &[0, 1, 2, 3]);
    }

    #[test]
    fn test_containment_ignores_counts() {
        assert!(containment(&[3, 0], &[1, 0]));
        assert!(!containment(&[1, 1], &[5, 0]));
    }

    #[test]
    fn test_dominance() {
        let database = matrix(&[&[2, 1, 0], &[1, 3, 4], &[0, 0, 0]]);
        let queries = matrix(&[&[1, 1, 0], &[0, 0, 0], &[2, 2, 0]]);

        let candidates = filter_candidates(&database, &queries, Predicate::Dominance).unwrap();

        assert_eq!(candidates.candidates(0), &[0, 1]);
        // all zero queries admit every row
        assert_eq!(candidates.candidates(1), &[0, 1, 2]);
        assert!(candidates.candidates(2).is_empty());
        assert_eq!(candidates.to_string(), "{0: 2, 1: 3, 2: 0}");
    }

    #[test]
    fn test_order_of_many_queries() {
        let database = matrix(&[&[1, 0], &[0, 1], &[1, 1]]);
        let rows = (0..1000)
            .map(|i| vec![(i % 2) as u32, ((i / 2) % 2) as u32])
            .collect::<Vec<_>>();
        let queries = FeatureMatrix::from_rows(&rows);

        let candidates = filter_candidates(&database, &queries, Predicate::Containment).unwrap();

        assert_eq!(candidates.query_count(), 1000);
        for (query, candidates) in candidates.iter() {
            let expected: &[usize] = match query % 4 {
                0 => &[0, 1, 2],
                1 => &[0, 2],
                2 => &[1, 2],
                _ => &[2],
            };
            assert_eq!(candidates, expected);
        }
    }

    #[test]
    fn test_empty_inputs() {
        let empty = FeatureMatrix::new(3);
        let queries = matrix(&[&[1, 0, 0]]);

        let candidates = filter_candidates(&empty, &queries, Predicate::Containment).unwrap();
        assert!(candidates.candidates(0).is_empty());

        let candidates = filter_candidates(&queries, &empty, Predicate::Containment).unwrap();
        assert_eq!(candidates.query_count(), 0);

        // no features: every graph is a candidate
        let database = FeatureMatrix::from_rows(&[Vec::<u32>::new(), Vec::new()]);
        let queries = FeatureMatrix::from_rows(&[Vec::<u32>::new()]);
        let candidates = filter_candidates(&database, &queries, Predicate::Containment).unwrap();
        assert_eq!(candidates.candidates(0), &[0, 1]);
    }

    #[test]
    fn test_width_mismatch() {
        let database = matrix(&[&[1, 0, 0]]);
        let queries = matrix(&[&[1, 0]]);

        assert!(matches!(
            filter_candidates(&database, &queries, Predicate::Containment),
            Err(Error::WidthMismatch {
                database: 3,
                query: 2
            })
        ));
    }

    #[test]
    fn test_stats() {
        let candidates = Candidates::new(vec![vec![0, 1, 2], vec![], vec![4, 5]]);
        let stats = candidates.stats();

        assert_eq!(stats.min, 0);
        assert_eq!(stats.max, 3);
        assert!((stats.mean - 5.0 / 3.0).abs() < 1e-9);
        assert_eq!(
            stats.to_string(),
            "Min |C_q|: 0, Max |C_q|: 3, Avg |C_q|: 1.67"
        );

        assert_eq!(Candidates::default().stats().mean, 0.0);
    }

    #[test]
    fn test_refine() {
        let graph = |gdl: &str| gdl.parse::<GdlGraph>().unwrap().into_inner();
        let database = vec![
            graph("(a:A)-[:x]->(b:B)"),
            graph("(a:A), (b:B)"),
            graph("(a:A)-[:x]->(b:B)-[:x]->(c:C)"),
        ];
        let queries = vec![graph("(a:A)-[:x]->(b:B)")];
        let candidates = Candidates::new(vec![vec![0, 1, 2]]);

        let by_edges = |query: &Graph, data: &Graph| {
            data.relationship_count() >= query.relationship_count()
        };
        let refined = refine(&candidates, &database, &queries, &by_edges);

        assert_eq!(refined.candidates(0), &[0, 2]);
    }
}
