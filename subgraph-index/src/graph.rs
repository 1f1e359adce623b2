use atoi::FromRadix10Checked;
use std::{
    borrow::Cow,
    collections::{BTreeMap, HashMap, HashSet},
    fmt::Display,
    fs::File,
    io::Read,
    ops::Deref,
    path::Path,
    str::FromStr,
    time::Instant,
};

use crate::Error;

use linereader::LineReader;

/// An undirected edge between two dense node indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub source: usize,
    pub target: usize,
    pub label: String,
}

/// An immutable, labeled, undirected graph without parallel edges.
///
/// Nodes are stored in ascending order of their external id; node `i` of the
/// graph is the `i`-th smallest id that was added. Adjacency lists are sorted.
#[derive(Debug, Clone)]
pub struct Graph {
    ids: Box<[usize]>,
    labels: Box<[String]>,
    edges: Box<[Edge]>,
    offsets: Box<[usize]>,
    neighbors: Box<[usize]>,
    // edge index for each adjacency slot
    neighbor_edges: Box<[usize]>,
    label_count: usize,
    max_degree: usize,
}

impl Graph {
    pub fn node_count(&self) -> usize {
        self.labels.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.edges.len()
    }

    pub fn degree(&self, node: usize) -> usize {
        self.offsets[node + 1] - self.offsets[node]
    }

    pub fn label(&self, node: usize) -> &str {
        &self.labels[node]
    }

    /// The id the node carried in its source record.
    pub fn id(&self, node: usize) -> usize {
        self.ids[node]
    }

    pub fn neighbors(&self, node: usize) -> &[usize] {
        let from = self.offsets[node];
        let to = self.offsets[node + 1];
        &self.neighbors[from..to]
    }

    pub fn exists(&self, source: usize, target: usize) -> bool {
        self.neighbors(source).binary_search(&target).is_ok()
    }

    pub fn edge_label(&self, source: usize, target: usize) -> Option<&str> {
        let pos = self.neighbors(source).binary_search(&target).ok()?;
        let edge = self.neighbor_edges[self.offsets[source] + pos];
        Some(&self.edges[edge].label)
    }

    /// Edges in ingestion order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn label_count(&self) -> usize {
        self.label_count
    }

    pub fn max_degree(&self) -> usize {
        self.max_degree
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl Display for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "|V|: {}, |E|: {}, |Σ|: {}\nMax Degree: {}",
            self.node_count(),
            self.relationship_count(),
            self.label_count,
            self.max_degree,
        )
    }
}

/// Collects nodes and edges of a single graph record.
///
/// Edges are undirected: the first edge seen for a node pair wins, later
/// duplicates and self loops are dropped. Edges referring to node ids that
/// were never added are dropped on [`GraphBuilder::build`].
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: BTreeMap<usize, String>,
    edges: Vec<(usize, usize, String)>,
    seen: HashSet<(usize, usize)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, id: usize, label: impl Into<String>) -> &mut Self {
        self.nodes.insert(id, label.into());
        self
    }

    pub fn add_edge(&mut self, source: usize, target: usize, label: impl Into<String>) -> &mut Self {
        let key = (source.min(target), source.max(target));
        if source != target && self.seen.insert(key) {
            self.edges.push((source, target, label.into()));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn build(self) -> Graph {
        Graph::from(self)
    }
}

impl From<GraphBuilder> for Graph {
    fn from(builder: GraphBuilder) -> Self {
        let node_count = builder.nodes.len();

        let index = builder
            .nodes
            .keys()
            .enumerate()
            .map(|(idx, &id)| (id, idx))
            .collect::<HashMap<_, _>>();

        let edges = builder
            .edges
            .into_iter()
            .filter_map(|(source, target, label)| {
                Some(Edge {
                    source: *index.get(&source)?,
                    target: *index.get(&target)?,
                    label,
                })
            })
            .collect::<Vec<_>>();

        let mut degrees = vec![0_usize; node_count];
        for edge in edges.iter() {
            degrees[edge.source] += 1;
            degrees[edge.target] += 1;
        }

        let mut offsets = Vec::with_capacity(node_count + 1);
        offsets.push(0);
        for degree in degrees.iter() {
            offsets.push(offsets[offsets.len() - 1] + degree);
        }

        // (neighbor, edge) per adjacency slot, undirected
        let mut adjacency = vec![(0_usize, 0_usize); edges.len() * 2];
        let mut next_offset = vec![0; node_count];

        for (idx, edge) in edges.iter().enumerate() {
            adjacency[offsets[edge.source] + next_offset[edge.source]] = (edge.target, idx);
            next_offset[edge.source] += 1;
            adjacency[offsets[edge.target] + next_offset[edge.target]] = (edge.source, idx);
            next_offset[edge.target] += 1;
        }

        for node in 0..node_count {
            adjacency[offsets[node]..offsets[node + 1]].sort_unstable();
        }

        let (neighbors, neighbor_edges): (Vec<_>, Vec<_>) = adjacency.into_iter().unzip();

        let (ids, labels): (Vec<_>, Vec<_>) = builder.nodes.into_iter().unzip();
        let label_count = labels.iter().collect::<HashSet<_>>().len();
        let max_degree = degrees.into_iter().max().unwrap_or_default();

        Self {
            ids: ids.into_boxed_slice(),
            labels: labels.into_boxed_slice(),
            edges: edges.into_boxed_slice(),
            offsets: offsets.into_boxed_slice(),
            neighbors: neighbors.into_boxed_slice(),
            neighbor_edges: neighbor_edges.into_boxed_slice(),
            label_count,
            max_degree,
        }
    }
}

/// Parses the first record of a graph file, an input without any record
/// yields the empty graph.
impl FromStr for Graph {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Error> {
        let graph = read(input.as_bytes())?
            .into_iter()
            .next()
            .unwrap_or_else(|| GraphBuilder::new().build());
        Ok(graph)
    }
}

pub(crate) enum Line<'a> {
    Header,
    Node(usize, &'a str),
    Edge(usize, usize, &'a str),
    Skip,
}

impl<'a> Line<'a> {
    pub(crate) fn parse(line: &'a str) -> Self {
        fn id(token: Option<&str>) -> Option<usize> {
            let token = token?.as_bytes();
            match usize::from_radix_10_checked(token) {
                (Some(id), used) if used > 0 && used == token.len() => Some(id),
                _ => None,
            }
        }

        let mut parts = line.split_whitespace();

        match parts.next() {
            Some("t") | Some("#") => Line::Header,
            Some("v") => match (id(parts.next()), parts.next()) {
                (Some(id), Some(label)) => Line::Node(id, label),
                _ => Line::Skip,
            },
            Some("e") => match (id(parts.next()), id(parts.next()), parts.next()) {
                (Some(source), Some(target), Some(label)) => Line::Edge(source, target, label),
                _ => Line::Skip,
            },
            _ => Line::Skip,
        }
    }
}

/// Reads all graph records from `input`.
///
/// A record starts at a header line (`t # <id>` or `#`). Lines that cannot be
/// interpreted are skipped, records without nodes are dropped.
pub fn read<R: Read>(input: R) -> Result<Vec<Graph>, Error> {
    let mut lines = LineReader::new(input);
    let mut graphs = Vec::new();
    let mut current: Option<GraphBuilder> = None;

    fn finish(graphs: &mut Vec<Graph>, builder: Option<GraphBuilder>) {
        if let Some(builder) = builder.filter(|b| !b.is_empty()) {
            graphs.push(builder.build());
        }
    }

    while let Some(line) = lines.next_line() {
        let line = decode(line?);

        match Line::parse(line.trim_start_matches('\u{feff}')) {
            Line::Header => finish(&mut graphs, current.replace(GraphBuilder::new())),
            Line::Node(id, label) => {
                current
                    .get_or_insert_with(GraphBuilder::new)
                    .add_node(id, label);
            }
            Line::Edge(source, target, label) => {
                if let Some(builder) = current.as_mut() {
                    builder.add_edge(source, target, label);
                }
            }
            Line::Skip => {}
        }
    }

    finish(&mut graphs, current);

    Ok(graphs)
}

pub fn parse(path: &Path) -> Result<Vec<Graph>, Error> {
    log::debug!("Reading from: {:?}", path);
    let start = Instant::now();
    let file = File::open(path)?;
    let graphs = read(file)?;
    log::debug!("Parsing {} graphs: {:?}", graphs.len(), start.elapsed());
    Ok(graphs)
}

// Characters for bytes 0x80..=0x9F in Windows-1252, undefined slots keep
// their Latin-1 control character.
const WINDOWS_1252: [char; 32] = [
    '\u{20AC}', '\u{0081}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{008D}', '\u{017D}', '\u{008F}',
    '\u{0090}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{009D}', '\u{017E}', '\u{0178}',
];

/// Decodes a line as UTF-8, falling back to Windows-1252.
pub(crate) fn decode(line: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(line) {
        Ok(line) => Cow::Borrowed(line),
        Err(_) => Cow::Owned(
            line.iter()
                .map(|&b| match b {
                    0x80..=0x9F => WINDOWS_1252[(b - 0x80) as usize],
                    _ => char::from(b),
                })
                .collect(),
        ),
    }
}

pub struct GdlGraph(Graph);

impl GdlGraph {
    pub fn into_inner(self) -> Graph {
        self.0
    }
}

impl Deref for GdlGraph {
    type Target = Graph;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Builds a graph from GDL, e.g. `(a:C)-[:s]->(b:O)`.
///
/// The first node label becomes the node label, the relationship type
/// becomes the edge label. Direction is ignored.
impl FromStr for GdlGraph {
    type Err = Error;

    fn from_str(gdl: &str) -> Result<Self, Error> {
        let gdl_graph = gdl.parse::<gdl::Graph>()?;

        let mut builder = GraphBuilder::new();

        for node in gdl_graph.nodes() {
            let label = node
                .labels()
                .next()
                .map(|label| label.to_string())
                .unwrap_or_default();
            builder.add_node(node.id(), label);
        }

        let mut sorted_rels = gdl_graph.relationships().collect::<Vec<_>>();
        sorted_rels.sort_by_key(|rel| rel.id());

        for rel in sorted_rels {
            let source = gdl_graph.get_node(rel.source()).map(|n| n.id());
            let target = gdl_graph.get_node(rel.target()).map(|n| n.id());
            if let (Some(source), Some(target)) = (source, target) {
                let label = rel
                    .rel_type()
                    .map(|rel_type| rel_type.to_string())
                    .unwrap_or_default();
                builder.add_edge(source, target, label);
            }
        }

        Ok(GdlGraph(builder.build()))
    }
}
