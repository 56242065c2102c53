//! Statement sampling: bounded, seeded samples of graph edges per relation.
//!
//! A [`RelationRule`] decides which relations are eligible; [`SamplingLimits`]
//! drop rare relations and cap frequent ones. The result is a
//! [`SampledPool`], drawn from without replacement.
//!
//! ```
//! use glisten::graph::{Fact, Node, SourceGraph};
//! use glisten::sampler::{RelationRule, SampledPool, SamplingLimits};
//!
//! let graph: SourceGraph = (0..5)
//!     .map(|i| Fact::new(Node::iri(format!("http://ex.org/s{i}")), "http://ex.org/p", Node::iri("http://ex.org/o")))
//!     .collect();
//! let rule = RelationRule::AllowList { relations: vec!["http://ex.org/p".into()] };
//! let limits = SamplingLimits { min_occurrence: 1, max_per_relation: 3 };
//! let mut pool = SampledPool::sample(&graph, &rule, limits, 1234);
//! assert_eq!(pool.len(), 3);
//! while pool.has_more() {
//!     pool.draw_one().unwrap();
//! }
//! ```

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{SamplingError, SamplingResult};
use crate::graph::{Fact, SourceGraph};

/// Which relations of a graph are eligible for sampling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RelationRule {
    /// Only the listed relations.
    #[serde(alias = "whitelist")]
    AllowList { relations: Vec<String> },
    /// Every relation of the graph except the listed ones.
    #[serde(alias = "blacklist")]
    BlockList { relations: Vec<String> },
    /// Relations whose IRI starts with one of the namespaces and that occur
    /// at least `min_occurrence` times.
    Namespace { namespaces: Vec<String> },
}

impl RelationRule {
    /// The eligible relations, in evaluation order.
    ///
    /// Allow-lists keep their own order (duplicates removed); the other rules
    /// walk the graph's relations in sorted order.
    pub fn select_relations(&self, graph: &SourceGraph, min_occurrence: usize) -> Vec<String> {
        match self {
            Self::AllowList { relations } => {
                let mut seen: HashSet<&str> = HashSet::new();
                let mut selected = Vec::new();
                for relation in relations {
                    if seen.insert(relation) {
                        selected.push(relation.clone());
                    }
                }
                selected
            }
            Self::BlockList { relations } => {
                let blocked: HashSet<&str> = relations.iter().map(String::as_str).collect();
                graph
                    .relations()
                    .filter(|r| !blocked.contains(r))
                    .map(str::to_owned)
                    .collect()
            }
            Self::Namespace { namespaces } => graph
                .relations()
                .filter(|r| namespaces.iter().any(|ns| r.starts_with(ns.as_str())))
                .filter(|r| graph.occurrences(r) >= min_occurrence)
                .map(str::to_owned)
                .collect(),
        }
    }

    /// Whether the rule names no relations at all where it needs some.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::AllowList { relations } => relations.is_empty(),
            Self::BlockList { .. } => false,
            Self::Namespace { namespaces } => namespaces.is_empty(),
        }
    }
}

/// Per-relation bounds applied while sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingLimits {
    /// Relations with fewer edges than this contribute nothing.
    pub min_occurrence: usize,
    /// Relations with more edges than this are randomly down-sampled.
    pub max_per_relation: usize,
}

impl Default for SamplingLimits {
    fn default() -> Self {
        Self {
            min_occurrence: 1,
            max_per_relation: 30,
        }
    }
}

/// A pool of sampled edges, drawn without replacement.
///
/// Built once from (graph, rule, limits, seed); the same inputs always give
/// the same pool and the same draw sequence. The pool only ever shrinks.
#[derive(Debug, Clone)]
pub struct SampledPool {
    facts: Vec<Fact>,
    rng: StdRng,
}

impl SampledPool {
    /// Sample the graph's edges according to `rule` and `limits`.
    pub fn sample(
        graph: &SourceGraph,
        rule: &RelationRule,
        limits: SamplingLimits,
        seed: u64,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut facts = Vec::new();

        let mut relations = rule.select_relations(graph, limits.min_occurrence);
        // namespace rules visit their relations in a seeded random order
        if matches!(rule, RelationRule::Namespace { .. }) {
            relations.shuffle(&mut rng);
        }

        for relation in relations {
            let edges = graph.edges_of(&relation);
            if edges.len() < limits.min_occurrence {
                tracing::debug!(
                    relation = %relation,
                    occurrences = edges.len(),
                    "relation below minimum occurrence, skipped"
                );
                continue;
            }
            let mut picked: Vec<&_> = edges.iter().collect();
            picked.shuffle(&mut rng);
            picked.truncate(limits.max_per_relation);
            facts.extend(
                picked
                    .into_iter()
                    .map(|(s, o)| Fact::new(s.clone(), relation.clone(), o.clone())),
            );
        }

        tracing::debug!(sampled = facts.len(), "statement pool built");
        Self { facts, rng }
    }

    /// A pool over explicit facts, drawn with the given seed.
    pub fn from_facts(facts: Vec<Fact>, seed: u64) -> Self {
        Self {
            facts,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Remove and return a uniformly chosen fact.
    pub fn draw_one(&mut self) -> SamplingResult<Fact> {
        if self.facts.is_empty() {
            return Err(SamplingError::Exhausted);
        }
        let index = self.rng.gen_range(0..self.facts.len());
        Ok(self.facts.swap_remove(index))
    }

    pub fn has_more(&self) -> bool {
        !self.facts.is_empty()
    }

    /// Number of facts left in the pool.
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// The facts still in the pool (order is not the draw order).
    pub fn remaining(&self) -> &[Fact] {
        &self.facts
    }
}
