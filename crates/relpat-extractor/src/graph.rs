//! Dependency graph construction and graph algorithms
//!
//! The sentence graph is a simple undirected graph over token ids: at most
//! one edge per vertex pair and no self-loops. Algorithms work on token ids
//! rather than token references so results are stable across calls.

use std::collections::{BTreeSet, HashMap, VecDeque};

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;

use relpat_core::{EntitySelection, RelpatError, Result, Sentence, TokenId};

/// Sentences need at least this many entity-class tokens to get a graph
pub const MIN_ENTITY_TOKENS: usize = 2;

// ============================================================================
// Edges
// ============================================================================

/// A dependency relation retained in the graph.
///
/// Identity is the (governor, dependent, label) triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyEdge {
    pub governor: TokenId,
    pub dependent: TokenId,
    pub label: String,
}

impl DependencyEdge {
    pub fn new(governor: TokenId, dependent: TokenId, label: impl Into<String>) -> Self {
        Self {
            governor,
            dependent,
            label: label.into(),
        }
    }

    /// Whether the edge touches the given token
    pub fn touches(&self, id: TokenId) -> bool {
        self.governor == id || self.dependent == id
    }
}

// ============================================================================
// Graph Builder
// ============================================================================

/// Builds a [`SentenceGraph`] from a sentence's dependencies
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphBuilder {
    selection: EntitySelection,
}

impl GraphBuilder {
    pub fn new(selection: EntitySelection) -> Self {
        Self { selection }
    }

    pub fn selection(&self) -> EntitySelection {
        self.selection
    }

    /// Build the graph, or report why the sentence has none
    pub fn try_build(&self, sentence: &Sentence) -> Result<SentenceGraph> {
        let found = self.selection.count(sentence);
        if found < MIN_ENTITY_TOKENS {
            return Err(RelpatError::GraphAbsent {
                found,
                required: MIN_ENTITY_TOKENS,
            });
        }

        let mut graph = SentenceGraph::new();
        for dependency in &sentence.dependencies {
            let governor = sentence.endpoint(dependency.governor);
            let dependent = sentence.endpoint(dependency.dependent);

            match (governor, dependent) {
                (Some(governor), Some(dependent)) => {
                    graph.add_dependency(DependencyEdge::new(
                        governor,
                        dependent,
                        dependency.label.as_str(),
                    ));
                }
                // Root attachments carry no governor; anything else is a broken reference
                (None, Some(_)) if dependency.governor.is_none() => {}
                _ => {
                    tracing::warn!(
                        label = %dependency.label,
                        governor = ?dependency.governor,
                        dependent = ?dependency.dependent,
                        tokens = sentence.tokens.len(),
                        "Skipping dependency with missing endpoint"
                    );
                }
            }
        }

        Ok(graph)
    }

    /// Build the graph; `None` when the sentence has too few entity tokens
    pub fn build(&self, sentence: &Sentence) -> Option<SentenceGraph> {
        match self.try_build(sentence) {
            Ok(graph) => Some(graph),
            Err(e) => {
                tracing::debug!(selection = %self.selection, "{}", e);
                None
            }
        }
    }
}

// ============================================================================
// Sentence Graph
// ============================================================================

/// Undirected simple graph of tokens connected by dependencies
#[derive(Debug, Clone, Default)]
pub struct SentenceGraph {
    graph: UnGraph<TokenId, DependencyEdge>,
    nodes: HashMap<TokenId, NodeIndex>,
}

impl SentenceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an edge and its endpoints.
    ///
    /// Returns `false` if the edge is a self-loop or the two tokens are
    /// already connected; the first edge between a pair wins.
    pub fn add_dependency(&mut self, edge: DependencyEdge) -> bool {
        if edge.governor == edge.dependent {
            return false;
        }

        let a = self.ensure_vertex(edge.governor);
        let b = self.ensure_vertex(edge.dependent);
        if self.graph.find_edge(a, b).is_some() {
            return false;
        }

        self.graph.add_edge(a, b, edge);
        true
    }

    fn ensure_vertex(&mut self, id: TokenId) -> NodeIndex {
        if let Some(&node) = self.nodes.get(&id) {
            return node;
        }
        let node = self.graph.add_node(id);
        self.nodes.insert(id, node);
        node
    }

    pub fn contains(&self, id: TokenId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Vertices in ascending token order
    pub fn vertices(&self) -> Vec<TokenId> {
        let mut ids: Vec<TokenId> = self.nodes.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Edges in insertion order
    pub fn edges(&self) -> impl Iterator<Item = &DependencyEdge> {
        self.graph.edge_weights()
    }

    /// The edge connecting two tokens, in either direction
    pub fn edge_between(&self, a: TokenId, b: TokenId) -> Option<&DependencyEdge> {
        let (na, nb) = (*self.nodes.get(&a)?, *self.nodes.get(&b)?);
        self.graph
            .find_edge(na, nb)
            .and_then(|e| self.graph.edge_weight(e))
    }

    /// Neighbors in ascending token order
    pub fn neighbors(&self, id: TokenId) -> Vec<TokenId> {
        let Some(&node) = self.nodes.get(&id) else {
            return Vec::new();
        };
        let mut ids: Vec<TokenId> = self.graph.neighbors(node).map(|n| self.graph[n]).collect();
        ids.sort_unstable();
        ids
    }

    pub fn degree(&self, id: TokenId) -> usize {
        self.nodes
            .get(&id)
            .map(|&node| self.graph.neighbors(node).count())
            .unwrap_or(0)
    }

    /// Edges of the full graph whose endpoints both lie in `members`
    pub fn induced_edges(&self, members: &[TokenId]) -> Vec<&DependencyEdge> {
        self.edges()
            .filter(|e| members.contains(&e.governor) && members.contains(&e.dependent))
            .collect()
    }

    /// Whether the subgraph induced by `members` has exactly one component.
    ///
    /// Members that are not graph vertices are isolated components of
    /// their own.
    pub fn is_connected(&self, members: &[TokenId]) -> bool {
        if members.is_empty() {
            return false;
        }

        let local: HashMap<TokenId, usize> = members
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, i))
            .collect();
        let mut components = UnionFind::<usize>::new(members.len());

        for edge in self.induced_edges(members) {
            components.union(local[&edge.governor], local[&edge.dependent]);
        }

        let root = components.find(0);
        (1..members.len()).all(|i| components.find(i) == root)
    }

    /// Shortest paths between every pair of vertices (unit edge weights)
    pub fn shortest_paths(&self) -> AllPairsShortestPaths {
        AllPairsShortestPaths::compute(self)
    }

    /// All maximal cliques (Bron-Kerbosch with pivoting).
    ///
    /// Each clique is sorted ascending and the cliques are sorted
    /// lexicographically.
    pub fn maximal_cliques(&self) -> Vec<Vec<TokenId>> {
        let adjacency: HashMap<TokenId, BTreeSet<TokenId>> = self
            .vertices()
            .into_iter()
            .map(|id| (id, self.neighbors(id).into_iter().collect()))
            .collect();

        let mut cliques = Vec::new();
        if adjacency.is_empty() {
            return cliques;
        }
        let candidates: BTreeSet<TokenId> = adjacency.keys().copied().collect();
        bron_kerbosch(
            &adjacency,
            &mut Vec::new(),
            candidates,
            BTreeSet::new(),
            &mut cliques,
        );

        cliques.sort();
        cliques
    }

    /// Head token of a multi-token mention spanning `[begin, end)`.
    ///
    /// The head is the covered graph vertex with the highest degree; ties go
    /// to the later token.
    pub fn entity_head(&self, sentence: &Sentence, begin: usize, end: usize) -> Option<TokenId> {
        let mut head = None;
        let mut best = 0;

        for (id, token) in sentence.tokens_with_ids() {
            if token.begin < begin || token.end > end || !self.contains(id) {
                continue;
            }
            let degree = self.degree(id);
            if head.is_none() || degree >= best {
                best = degree;
                head = Some(id);
            }
        }

        head
    }
}

fn bron_kerbosch(
    adjacency: &HashMap<TokenId, BTreeSet<TokenId>>,
    clique: &mut Vec<TokenId>,
    mut candidates: BTreeSet<TokenId>,
    mut excluded: BTreeSet<TokenId>,
    out: &mut Vec<Vec<TokenId>>,
) {
    if candidates.is_empty() && excluded.is_empty() {
        let mut found = clique.clone();
        found.sort_unstable();
        out.push(found);
        return;
    }

    let Some(pivot) = candidates
        .iter()
        .chain(excluded.iter())
        .max_by_key(|v| adjacency[*v].intersection(&candidates).count())
        .copied()
    else {
        return;
    };

    let branches: Vec<TokenId> = candidates.difference(&adjacency[&pivot]).copied().collect();
    for v in branches {
        let neighbors = &adjacency[&v];
        clique.push(v);
        bron_kerbosch(
            adjacency,
            clique,
            candidates.intersection(neighbors).copied().collect(),
            excluded.intersection(neighbors).copied().collect(),
            out,
        );
        clique.pop();

        candidates.remove(&v);
        excluded.insert(v);
    }
}

// ============================================================================
// All-Pairs Shortest Paths
// ============================================================================

/// Predecessor table from one breadth-first search per source vertex.
///
/// Neighbors are visited in ascending token order, so among equally short
/// paths the one through lower token ids is found first.
#[derive(Debug, Clone)]
pub struct AllPairsShortestPaths {
    index: HashMap<TokenId, usize>,
    vertices: Vec<TokenId>,
    /// `predecessors[s][v]`: previous vertex on the path from `s` to `v`
    predecessors: Vec<Vec<Option<usize>>>,
    path_count: usize,
}

impl AllPairsShortestPaths {
    pub fn compute(graph: &SentenceGraph) -> Self {
        let vertices = graph.vertices();
        let index: HashMap<TokenId, usize> =
            vertices.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        let adjacency: Vec<Vec<usize>> = vertices
            .iter()
            .map(|&id| graph.neighbors(id).iter().map(|n| index[n]).collect())
            .collect();

        let n = vertices.len();
        let mut predecessors = Vec::with_capacity(n);
        let mut path_count = 0;

        for source in 0..n {
            let mut pred = vec![None; n];
            let mut seen = vec![false; n];
            let mut queue = VecDeque::from([source]);
            seen[source] = true;

            while let Some(u) = queue.pop_front() {
                for &v in &adjacency[u] {
                    if !seen[v] {
                        seen[v] = true;
                        pred[v] = Some(u);
                        path_count += 1;
                        queue.push_back(v);
                    }
                }
            }
            predecessors.push(pred);
        }

        Self {
            index,
            vertices,
            predecessors,
            path_count,
        }
    }

    /// Number of ordered vertex pairs connected by a path
    pub fn path_count(&self) -> usize {
        self.path_count
    }

    /// Vertex sequence of the shortest path, endpoints included
    pub fn path(&self, from: TokenId, to: TokenId) -> Option<Vec<TokenId>> {
        let source = *self.index.get(&from)?;
        let mut current = *self.index.get(&to)?;
        if source == current {
            return Some(vec![from]);
        }

        let pred = &self.predecessors[source];
        let mut path = vec![self.vertices[current]];
        while current != source {
            current = pred[current]?;
            path.push(self.vertices[current]);
        }
        path.reverse();
        Some(path)
    }

    /// Shortest-path length in edges
    pub fn distance(&self, from: TokenId, to: TokenId) -> Option<usize> {
        self.path(from, to).map(|p| p.len() - 1)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use relpat_core::SentenceBuilder;

    fn chased() -> Sentence {
        SentenceBuilder::new()
            .token("The", "DT", "the")
            .token("cat", "NN", "cat")
            .token("chased", "VBD", "chase")
            .token("the", "DT", "the")
            .token("small", "JJ", "small")
            .token("mouse", "NN", "mouse")
            .token("quickly", "RB", "quickly")
            .token(".", ".", ".")
            .dep(2, 1, "nsubj")
            .dep(2, 5, "dobj")
            .dep(5, 4, "amod")
            .build()
    }

    fn ids(raw: &[usize]) -> Vec<TokenId> {
        raw.iter().map(|&i| TokenId(i)).collect()
    }

    #[test]
    fn test_build_graph() {
        let graph = GraphBuilder::default().build(&chased()).unwrap();
        assert_eq!(graph.vertices(), ids(&[1, 2, 4, 5]));
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.edge_between(TokenId(5), TokenId(2)).unwrap().label, "dobj");
    }

    #[test]
    fn test_graph_absent_with_one_noun() {
        let sentence = SentenceBuilder::new()
            .token("It", "PRP", "it")
            .token("rains", "VBZ", "rain")
            .token("today", "NN", "today")
            .dep(1, 0, "nsubj")
            .dep(1, 2, "tmod")
            .build();

        assert!(GraphBuilder::default().build(&sentence).is_none());
        let err = GraphBuilder::default().try_build(&sentence).unwrap_err();
        assert!(matches!(err, RelpatError::GraphAbsent { found: 1, required: 2 }));
    }

    #[test]
    fn test_simple_graph_semantics() {
        let mut graph = SentenceGraph::new();
        assert!(graph.add_dependency(DependencyEdge::new(TokenId(0), TokenId(1), "nsubj")));
        assert!(!graph.add_dependency(DependencyEdge::new(TokenId(0), TokenId(1), "nsubj")));
        assert!(!graph.add_dependency(DependencyEdge::new(TokenId(1), TokenId(0), "dep")));
        assert!(!graph.add_dependency(DependencyEdge::new(TokenId(2), TokenId(2), "dep")));
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edge_between(TokenId(1), TokenId(0)).unwrap().label, "nsubj");
    }

    #[test]
    fn test_dangling_dependencies_are_skipped() {
        let mut sentence = chased();
        sentence.dependencies.push(relpat_core::Dependency::new(2, 42, "dep"));
        sentence.dependencies.push(relpat_core::Dependency {
            governor: None,
            dependent: Some(TokenId(2)),
            label: "root".into(),
        });

        let graph = GraphBuilder::default().build(&sentence).unwrap();
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn test_connectivity() {
        let graph = GraphBuilder::default().build(&chased()).unwrap();
        assert!(graph.is_connected(&ids(&[1, 2, 5])));
        assert!(graph.is_connected(&ids(&[4, 5])));
        assert!(!graph.is_connected(&ids(&[1, 5])));
        // token 0 is not a graph vertex
        assert!(!graph.is_connected(&ids(&[0, 1, 2])));
        assert!(!graph.is_connected(&[]));
    }

    #[test]
    fn test_shortest_paths() {
        let graph = GraphBuilder::default().build(&chased()).unwrap();
        let paths = graph.shortest_paths();
        assert_eq!(paths.path(TokenId(1), TokenId(4)).unwrap(), ids(&[1, 2, 5, 4]));
        assert_eq!(paths.distance(TokenId(4), TokenId(1)), Some(3));
        assert_eq!(paths.path(TokenId(1), TokenId(0)), None);
        // four connected vertices, every ordered pair reachable
        assert_eq!(paths.path_count(), 12);
    }

    #[test]
    fn test_disconnected_paths() {
        let mut graph = SentenceGraph::new();
        graph.add_dependency(DependencyEdge::new(TokenId(0), TokenId(1), "a"));
        graph.add_dependency(DependencyEdge::new(TokenId(2), TokenId(3), "b"));
        let paths = graph.shortest_paths();
        assert_eq!(paths.path(TokenId(0), TokenId(3)), None);
        assert_eq!(paths.path_count(), 4);
    }

    #[test]
    fn test_maximal_cliques() {
        let mut graph = SentenceGraph::new();
        for (a, b) in [(0, 1), (1, 2), (0, 2), (2, 3)] {
            graph.add_dependency(DependencyEdge::new(TokenId(a), TokenId(b), "dep"));
        }
        assert_eq!(graph.maximal_cliques(), vec![ids(&[0, 1, 2]), ids(&[2, 3])]);

        let tree = GraphBuilder::default().build(&chased()).unwrap();
        assert_eq!(
            tree.maximal_cliques(),
            vec![ids(&[1, 2]), ids(&[2, 5]), ids(&[4, 5])]
        );
    }

    #[test]
    fn test_entity_head() {
        let sentence = chased();
        let graph = GraphBuilder::default().build(&sentence).unwrap();
        // "small mouse": mouse has degree 2, small degree 1
        let small = &sentence.tokens[4];
        let mouse = &sentence.tokens[5];
        assert_eq!(
            graph.entity_head(&sentence, small.begin, mouse.end),
            Some(TokenId(5))
        );
        // "The" is not in the graph
        let the = &sentence.tokens[0];
        assert_eq!(graph.entity_head(&sentence, the.begin, the.end), None);
    }
}
