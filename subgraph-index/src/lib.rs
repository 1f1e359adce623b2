/*!
## Subgraph Index

A library for pruning graph databases before subgraph search.

Frequent paths and small rings are mined from a database of labeled graphs,
every graph is turned into a bit vector over the mined features and query
vectors are compared against database vectors with a monotone containment
test. The surviving candidates are a superset of the true matches and are
meant to be verified by an exact matcher afterwards.

### License

MIT
*/
pub mod config;
pub mod enumerate;
pub mod filter;
pub mod format;
pub mod graph;
pub mod mine;
pub mod signature;
pub mod vectorize;

use std::io;

pub use config::{Config, Predicate};
pub use filter::{filter_candidates, refine, Candidates, Verifier};
pub use graph::Graph;
pub use mine::{mine, Feature, FeatureKind};
pub use vectorize::{vectorize, FeatureMatrix};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("error while reading or writing graph data")]
    Io {
        #[from]
        source: io::Error,
    },
    #[error("error while parsing GDL graph")]
    ParseGdlGraph {
        #[from]
        source: gdl::graph::GraphHandlerError,
    },
    #[error("cycle search exceeded its budget of {budget} steps")]
    CycleBudgetExceeded { budget: usize },
    #[error("database vectors have {database} features, query vectors have {query}")]
    WidthMismatch { database: usize, query: usize },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("unknown feature kind {0}")]
    UnknownFeatureKind(String),
}

/// Mines features from `database`, vectorizes database and queries against
/// them and returns the candidates of every query.
pub fn index(database: &[Graph], queries: &[Graph], config: &Config) -> Result<Candidates, Error> {
    config.validate()?;

    let features = mine(database, config);
    let database_vectors = vectorize(database, &features, config);
    let query_vectors = vectorize(queries, &features, config);

    filter_candidates(&database_vectors, &query_vectors, config.predicate)
}

/// Like [`index`], but only keeps candidates confirmed by `verifier`.
pub fn index_with<V>(
    database: &[Graph],
    queries: &[Graph],
    config: &Config,
    verifier: &V,
) -> Result<Candidates, Error>
where
    V: Verifier + Sync,
{
    let candidates = index(database, queries, config)?;
    Ok(refine(&candidates, database, queries, verifier))
}
