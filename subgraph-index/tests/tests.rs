use std::{fs::File, io::BufReader, path::PathBuf};
use subgraph_index::{
    filter_candidates, format,
    graph::{parse, Graph},
    index, index_with, mine, vectorize, Config, FeatureKind, Predicate,
};
use tempfile::TempDir;

const CRATE_ROOT: &str = env!("CARGO_MANIFEST_DIR");
const DATABASE_PATH: &[&str] = &[CRATE_ROOT, "resources", "database.graph"];
const QUERY_PATH: &[&str] = &[CRATE_ROOT, "resources", "queries.graph"];

fn database() -> Vec<Graph> {
    parse(&DATABASE_PATH.iter().collect::<PathBuf>()).unwrap()
}

fn queries() -> Vec<Graph> {
    parse(&QUERY_PATH.iter().collect::<PathBuf>()).unwrap()
}

fn config() -> Config {
    Config {
        min_support_ratio: 0.1,
        max_support_ratio: 0.6,
        ..Config::default()
    }
}

fn triangles() -> Vec<usize> {
    (0..100).filter(|i| i % 5 < 2).collect()
}

fn chains() -> Vec<usize> {
    (0..100).filter(|i| i % 5 >= 2).collect()
}

#[test]
fn load_resources() {
    let database = database();
    assert_eq!(database.len(), 100);
    assert_eq!(database[0].node_count(), 3);
    assert_eq!(database[0].relationship_count(), 3);
    assert_eq!(database[2].node_count(), 2);

    assert_eq!(queries().len(), 3);
}

#[test]
fn mine_triangle_database() {
    let features = mine(&database(), &config());

    let listed = features
        .iter()
        .map(|f| (f.kind, f.signature.as_str(), f.support))
        .collect::<Vec<_>>();

    // "C" occurs in every graph and exceeds the upper bound of 60
    assert_eq!(listed.len(), 8);
    assert_eq!(listed[0], (FeatureKind::Path, "C-s-N", 60));
    assert_eq!(listed[1], (FeatureKind::Path, "N", 60));
    assert_eq!(listed[2].0, FeatureKind::Ring);
    assert_eq!(listed[2].2, 40);
    assert_eq!(
        &listed[3..],
        &[
            (FeatureKind::Path, "C-s-C", 40),
            (FeatureKind::Path, "C-s-C-s-O", 40),
            (FeatureKind::Path, "C-s-O", 40),
            (FeatureKind::Path, "C-s-O-s-C", 40),
            (FeatureKind::Path, "O", 40),
        ]
    );

    let ring = features[2].prototype.as_ref().unwrap();
    assert_eq!(ring.node_count(), 3);
    assert_eq!(ring.relationship_count(), 3);
}

#[test]
fn index_triangle_database() {
    let candidates = index(&database(), &queries(), &config()).unwrap();

    assert_eq!(candidates.query_count(), 3);
    assert_eq!(candidates.candidates(0), triangles().as_slice());
    assert_eq!(candidates.candidates(1), chains().as_slice());
    // unknown labels produce an all zero vector
    assert_eq!(candidates.candidates(2).len(), 100);
}

#[test]
fn index_with_dominance() {
    let config = Config {
        predicate: Predicate::Dominance,
        ..config()
    };

    let candidates = index(&database(), &queries(), &config).unwrap();

    assert_eq!(candidates.candidates(0), triangles().as_slice());
    assert_eq!(candidates.candidates(1), chains().as_slice());
}

#[test]
fn index_with_verifier() {
    let by_size = |query: &Graph, data: &Graph| {
        data.node_count() >= query.node_count()
            && data.relationship_count() >= query.relationship_count()
    };

    let candidates = index_with(&database(), &queries(), &config(), &by_size).unwrap();

    assert_eq!(candidates.candidates(0), triangles().as_slice());
    assert_eq!(candidates.candidates(1), chains().as_slice());
    assert_eq!(candidates.candidates(2).len(), 100);
}

#[test]
fn pipeline_through_files() {
    let database = database();
    let queries = queries();
    let config = config();

    let dir = TempDir::new().unwrap();
    let features_path = dir.path().join("features.txt");
    let database_path = dir.path().join("database.vec");
    let queries_path = dir.path().join("queries.vec");
    let candidates_path = dir.path().join("candidates.txt");

    let mined = mine(&database, &config);
    format::write_features(File::create(&features_path).unwrap(), &mined).unwrap();

    let features =
        format::read_features(BufReader::new(File::open(&features_path).unwrap())).unwrap();
    assert_eq!(features.len(), mined.len());
    for (read, written) in features.iter().zip(mined.iter()) {
        assert_eq!(read.to_string(), written.to_string());
    }

    // a feature list doubles as a graph database of prototypes
    let prototypes = parse(&features_path).unwrap();
    assert_eq!(prototypes.len(), features.len());

    let database_vectors = vectorize(&database, &features, &config);
    let query_vectors = vectorize(&queries, &features, &config);
    assert_eq!(database_vectors, vectorize(&database, &mined, &config));

    format::write_vectors(File::create(&database_path).unwrap(), &database_vectors).unwrap();
    format::write_vectors(File::create(&queries_path).unwrap(), &query_vectors).unwrap();

    let database_vectors =
        format::read_vectors(BufReader::new(File::open(&database_path).unwrap())).unwrap();
    let query_vectors =
        format::read_vectors(BufReader::new(File::open(&queries_path).unwrap())).unwrap();
    assert_eq!(database_vectors.len(), 100);
    assert_eq!(database_vectors.width(), 8);

    let candidates =
        filter_candidates(&database_vectors, &query_vectors, Predicate::Containment).unwrap();
    assert_eq!(candidates, index(&database, &queries, &config).unwrap());

    format::write_candidates(File::create(&candidates_path).unwrap(), &candidates).unwrap();
    let written = std::fs::read_to_string(&candidates_path).unwrap();
    let mut lines = written.lines();
    assert_eq!(lines.next(), Some("q # 0"));
    assert_eq!(lines.next(), Some("c # 0 1 5 6 10 11 15 16 20 21 25 26 30 31 35 36 40 41 45 46 50 51 55 56 60 61 65 66 70 71 75 76 80 81 85 86 90 91 95 96"));
    assert_eq!(lines.next(), Some("q # 1"));
}

#[test]
fn queries_are_contained_in_themselves() {
    let database = database();
    let config = config();

    let features = mine(&database, &config);
    let vectors = vectorize(&database, &features, &config);
    let candidates = filter_candidates(&vectors, &vectors, Predicate::Containment).unwrap();

    for (query, candidates) in candidates.iter() {
        assert!(candidates.contains(&query));
    }
}
