//! In-memory, literal-free source graph with per-relation indexing.
//!
//! Relations are kept in a `BTreeMap` so that every walk over them is in a
//! stable order; edges of a relation keep their insertion (file) order. Both
//! properties are needed for seeded sampling to reproduce across runs.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use crate::error::GraphResult;

use super::{Fact, Node};

/// Read-only view of a graph used for sampling and negative synthesis.
#[derive(Debug, Default, Clone)]
pub struct SourceGraph {
    /// Relation IRI → (subject, object) pairs in insertion order.
    by_relation: BTreeMap<String, Vec<(Node, Node)>>,
    /// Relation IRI → subject → objects, for membership tests.
    adjacency: HashMap<String, HashMap<Node, HashSet<Node>>>,
    edge_count: usize,
}

impl SourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read an N-Triples file, dropping every triple with a literal object.
    pub fn from_ntriples_file(path: &Path) -> GraphResult<Self> {
        super::ntriples::read_file(path).map(|(graph, _)| graph)
    }

    /// Insert an edge. Returns `false` if the exact edge already exists.
    pub fn insert(&mut self, fact: Fact) -> bool {
        let inserted = self
            .adjacency
            .entry(fact.relation.clone())
            .or_default()
            .entry(fact.subject.clone())
            .or_default()
            .insert(fact.object.clone());
        if inserted {
            self.by_relation
                .entry(fact.relation)
                .or_default()
                .push((fact.subject, fact.object));
            self.edge_count += 1;
        }
        inserted
    }

    /// Whether the exact edge (subject, relation, object) exists.
    pub fn contains(&self, subject: &Node, relation: &str, object: &Node) -> bool {
        self.adjacency
            .get(relation)
            .and_then(|subjects| subjects.get(subject))
            .is_some_and(|objects| objects.contains(object))
    }

    /// Whether the subject has at least one edge with the relation.
    pub fn has_subject_relation(&self, subject: &Node, relation: &str) -> bool {
        self.adjacency
            .get(relation)
            .and_then(|subjects| subjects.get(subject))
            .is_some_and(|objects| !objects.is_empty())
    }

    /// All relation IRIs, in sorted order.
    pub fn relations(&self) -> impl Iterator<Item = &str> {
        self.by_relation.keys().map(String::as_str)
    }

    /// All (subject, object) pairs of a relation, in insertion order.
    pub fn edges_of(&self, relation: &str) -> &[(Node, Node)] {
        self.by_relation
            .get(relation)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of edges carrying the relation.
    pub fn occurrences(&self, relation: &str) -> usize {
        self.edges_of(relation).len()
    }

    /// Distinct objects of a relation, in order of first appearance.
    pub fn objects_of_relation(&self, relation: &str) -> Vec<Node> {
        let mut seen: HashSet<&Node> = HashSet::new();
        let mut objects = Vec::new();
        for (_, object) in self.edges_of(relation) {
            if seen.insert(object) {
                objects.push(object.clone());
            }
        }
        objects
    }

    /// Every edge of the graph as a [`Fact`], grouped by relation.
    pub fn facts(&self) -> impl Iterator<Item = Fact> + '_ {
        self.by_relation.iter().flat_map(|(relation, edges)| {
            edges
                .iter()
                .map(move |(s, o)| Fact::new(s.clone(), relation.clone(), o.clone()))
        })
    }

    /// Relation histogram: (relation, edge count), most frequent first,
    /// ties in relation order.
    pub fn histogram(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = self
            .by_relation
            .iter()
            .map(|(relation, edges)| (relation.clone(), edges.len()))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts
    }

    /// Number of edges.
    pub fn len(&self) -> usize {
        self.edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.edge_count == 0
    }
}

impl FromIterator<Fact> for SourceGraph {
    fn from_iter<I: IntoIterator<Item = Fact>>(iter: I) -> Self {
        let mut graph = Self::new();
        for fact in iter {
            graph.insert(fact);
        }
        graph
    }
}
