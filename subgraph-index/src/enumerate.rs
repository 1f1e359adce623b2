use std::collections::{BTreeMap, HashMap, HashSet};

use crate::{
    mine::FeatureKind,
    signature::{path_signature, ring_signature, MAX_RING_SIZE, MIN_RING_SIZE},
    Config, Error, Graph,
};

/// The distinct path and ring signatures found in a single graph.
#[derive(Debug, Default)]
pub struct Substructures {
    /// path signatures by path length in edges
    paths: BTreeMap<usize, HashSet<String>>,
    /// ring signature to the first cycle that produced it
    rings: HashMap<String, Box<[usize]>>,
}

impl Substructures {
    pub fn paths(&self) -> &BTreeMap<usize, HashSet<String>> {
        &self.paths
    }

    pub fn rings(&self) -> impl Iterator<Item = (&str, &[usize])> {
        self.rings
            .iter()
            .map(|(signature, cycle)| (signature.as_str(), &cycle[..]))
    }

    pub fn contains_path(&self, signature: &str) -> bool {
        self.paths.values().any(|set| set.contains(signature))
    }

    pub fn contains_ring(&self, signature: &str) -> bool {
        self.rings.contains_key(signature)
    }

    pub fn contains(&self, kind: FeatureKind, signature: &str) -> bool {
        match kind {
            FeatureKind::Path => self.contains_path(signature),
            FeatureKind::Ring => self.contains_ring(signature),
        }
    }

    pub fn path_count(&self) -> usize {
        self.paths.values().map(HashSet::len).sum()
    }

    pub fn ring_count(&self) -> usize {
        self.rings.len()
    }
}

/// Enumerates all path signatures up to `config.max_path_len` edges and all
/// ring signatures of the given graph.
///
/// If the cycle search exceeds `config.cycle_budget`, the graph contributes
/// no rings; its paths are still reported.
pub fn substructures(graph: &Graph, config: &Config) -> Substructures {
    let paths = paths(graph, config.max_path_len);

    let rings = match rings(graph, config.cycle_budget) {
        Ok(rings) => rings,
        Err(e) => {
            log::warn!(
                "Skipping rings of graph with |V|: {}, |E|: {}: {}",
                graph.node_count(),
                graph.relationship_count(),
                e
            );
            HashMap::new()
        }
    };

    Substructures { paths, rings }
}

/// Signatures of all simple paths with at most `max_len` edges, including
/// single nodes, grouped by length.
pub fn paths(graph: &Graph, max_len: usize) -> BTreeMap<usize, HashSet<String>> {
    let mut search = PathSearch {
        graph,
        max_len,
        path: Vec::with_capacity(max_len + 1),
        on_path: vec![false; graph.node_count()],
        found: BTreeMap::new(),
    };

    for start in 0..graph.node_count() {
        search.extend(start);
    }

    search.found
}

struct PathSearch<'a> {
    graph: &'a Graph,
    max_len: usize,
    path: Vec<usize>,
    on_path: Vec<bool>,
    found: BTreeMap<usize, HashSet<String>>,
}

impl PathSearch<'_> {
    fn extend(&mut self, node: usize) {
        self.path.push(node);
        self.on_path[node] = true;

        let len = self.path.len() - 1;
        self.found
            .entry(len)
            .or_default()
            .insert(path_signature(self.graph, &self.path));

        if len < self.max_len {
            let graph = self.graph;
            for &neighbor in graph.neighbors(node) {
                if !self.on_path[neighbor] {
                    self.extend(neighbor);
                }
            }
        }

        self.on_path[node] = false;
        self.path.pop();
    }
}

/// Ring signatures of all simple cycles with `MIN_RING_SIZE..=MAX_RING_SIZE`
/// nodes, each mapped to the first cycle producing it.
pub fn rings(graph: &Graph, budget: usize) -> Result<HashMap<String, Box<[usize]>>, Error> {
    let mut rings = HashMap::new();

    cycles(graph, budget, |cycle| {
        rings
            .entry(ring_signature(graph, cycle))
            .or_insert_with(|| Box::from(cycle));
    })?;

    Ok(rings)
}

/// Calls `action` once for every simple cycle of the undirected graph with
/// `MIN_RING_SIZE..=MAX_RING_SIZE` nodes.
///
/// A cycle is reported starting at its smallest node, in the direction whose
/// second node is smaller than its last one. Fails once more than `budget`
/// search steps were spent.
pub fn cycles<F>(graph: &Graph, budget: usize, mut action: F) -> Result<(), Error>
where
    F: FnMut(&[usize]),
{
    let mut search = CycleSearch {
        graph,
        budget,
        steps: 0,
        path: Vec::with_capacity(MAX_RING_SIZE),
        on_path: vec![false; graph.node_count()],
    };

    for start in 0..graph.node_count() {
        search.path.push(start);
        search.on_path[start] = true;
        search.extend(start, start, &mut action)?;
        search.on_path[start] = false;
        search.path.pop();
    }

    Ok(())
}

struct CycleSearch<'a> {
    graph: &'a Graph,
    budget: usize,
    steps: usize,
    path: Vec<usize>,
    on_path: Vec<bool>,
}

impl CycleSearch<'_> {
    fn extend<F>(&mut self, start: usize, node: usize, action: &mut F) -> Result<(), Error>
    where
        F: FnMut(&[usize]),
    {
        self.steps += 1;
        if self.steps > self.budget {
            return Err(Error::CycleBudgetExceeded {
                budget: self.budget,
            });
        }

        let graph = self.graph;
        for &neighbor in graph.neighbors(node) {
            if neighbor == start {
                if self.path.len() >= MIN_RING_SIZE && self.path[1] < self.path[self.path.len() - 1]
                {
                    action(&self.path);
                }
            } else if neighbor > start && !self.on_path[neighbor] && self.path.len() < MAX_RING_SIZE
            {
                self.path.push(neighbor);
                self.on_path[neighbor] = true;
                self.extend(start, neighbor, action)?;
                self.on_path[neighbor] = false;
                self.path.pop();
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GdlGraph;

    fn graph(gdl: &str) -> Graph {
        gdl.parse::<GdlGraph>().unwrap().into_inner()
    }

    fn sorted(set: &HashSet<String>) -> Vec<&str> {
        let mut values = set.iter().map(String::as_str).collect::<Vec<_>>();
        values.sort_unstable();
        values
    }

    #[test]
    fn test_two_node_paths() {
        let graph = graph("(a:A)-[:x]->(b:B)");
        let found = paths(&graph, 2);

        assert_eq!(found.len(), 2);
        assert_eq!(sorted(&found[&0]), vec!["A", "B"]);
        assert_eq!(sorted(&found[&1]), vec!["A-x-B"]);
    }

    #[test]
    fn test_paths_respect_max_len() {
        let graph = graph("(a:A)-[:x]->(b:A)-[:x]->(c:A)-[:x]->(d:A)-[:x]->(e:A)");

        let found = paths(&graph, 2);
        assert_eq!(found.keys().copied().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(sorted(&found[&2]), vec!["A-x-A-x-A"]);

        let found = paths(&graph, 10);
        assert_eq!(found.keys().copied().max(), Some(4));
    }

    #[test]
    fn test_paths_do_not_revisit_nodes() {
        let graph = graph("(a:A)-[:e]->(b:A)-[:e]->(c:A)-[:e]->(a)");
        let found = paths(&graph, 6);

        assert_eq!(found.keys().copied().max(), Some(2));
        assert_eq!(sorted(&found[&2]), vec!["A-e-A-e-A"]);
    }

    #[test]
    fn test_triangle_has_one_ring() {
        let graph = graph("(a:A)-[:e]->(b:A)-[:e]->(c:A)-[:e]->(a)");
        let substructures = substructures(&graph, &Config::default());

        assert_eq!(substructures.ring_count(), 1);
        let (signature, cycle) = substructures.rings().next().unwrap();
        assert_eq!(cycle.len(), 3);
        assert!(substructures.contains(FeatureKind::Ring, signature));
        assert!(substructures.contains(FeatureKind::Path, "A"));
        assert!(!substructures.contains(FeatureKind::Path, signature));
    }

    #[test]
    fn test_cycles_of_complete_graph() {
        let graph = graph(
            "(a:A)-[:e]->(b:A)-[:e]->(c:A)-[:e]->(d:A)-[:e]->(a), (a)-[:e]->(c), (b)-[:e]->(d)",
        );

        let mut found = Vec::new();
        cycles(&graph, usize::MAX, |cycle| found.push(cycle.to_vec())).unwrap();

        // four triangles and three squares, each reported once
        assert_eq!(found.len(), 7);
        assert_eq!(found.iter().filter(|c| c.len() == 3).count(), 4);
        assert_eq!(found.iter().filter(|c| c.len() == 4).count(), 3);
        assert!(found.iter().all(|c| c[0] == *c.iter().min().unwrap()));

        let rings = rings(&graph, usize::MAX).unwrap();
        assert_eq!(rings.len(), 2);
    }

    #[test]
    fn test_cycles_ignore_trees() {
        let graph = graph("(a:A)-[:e]->(b:A)-[:e]->(c:A), (b)-[:e]->(d:A)");
        let mut count = 0;
        cycles(&graph, usize::MAX, |_| count += 1).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_cycles_longer_than_max_ring_size_are_ignored() {
        let mut gdl = String::from("(n0:A)");
        for i in 1..=MAX_RING_SIZE {
            gdl.push_str(&format!("-[:e]->(n{}:A)", i));
        }
        gdl.push_str("-[:e]->(n0)");
        let graph = graph(&gdl);
        assert_eq!(graph.node_count(), MAX_RING_SIZE + 1);

        let mut count = 0;
        cycles(&graph, usize::MAX, |_| count += 1).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_budget_exceeded_drops_rings_only() {
        let graph = graph("(a:A)-[:e]->(b:A)-[:e]->(c:A)-[:e]->(a)");

        assert!(matches!(
            rings(&graph, 1),
            Err(Error::CycleBudgetExceeded { budget: 1 })
        ));

        let config = Config {
            cycle_budget: 1,
            ..Config::default()
        };
        let substructures = substructures(&graph, &config);
        assert_eq!(substructures.ring_count(), 0);
        assert_eq!(substructures.path_count(), 3);
    }
}
