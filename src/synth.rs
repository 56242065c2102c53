//! Fact synthesis: true facts drawn from the graph, false facts made by
//! replacing the object of a drawn edge.
//!
//! A false fact (s, r, o') is only emitted when o' occurs as an object of `r`
//! somewhere in the graph and (s, r, o') itself is absent, so negatives stay
//! structurally plausible but are verifiably not in the source.

use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::graph::{Fact, Label, LabeledFact, Node, SourceGraph};
use crate::sampler::SampledPool;

/// A labeled, duplicate-free fact set with all false facts before all true
/// facts.
///
/// Fewer facts than requested is not an error; compare the counts with
/// [`FactSet::requested_true`] / [`FactSet::requested_false`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactSet {
    pub facts: Vec<LabeledFact>,
    pub requested_true: usize,
    pub requested_false: usize,
}

impl FactSet {
    /// Build a set from already labeled facts, keeping their order.
    pub fn from_labeled(facts: Vec<LabeledFact>) -> Self {
        let requested_true = facts.iter().filter(|f| f.label.is_true()).count();
        Self {
            requested_false: facts.len() - requested_true,
            requested_true,
            facts,
        }
    }

    pub fn true_count(&self) -> usize {
        self.facts.iter().filter(|f| f.label.is_true()).count()
    }

    pub fn false_count(&self) -> usize {
        self.facts.len() - self.true_count()
    }

    /// Whether as many facts were generated as requested.
    pub fn is_complete(&self) -> bool {
        self.true_count() == self.requested_true && self.false_count() == self.requested_false
    }

    pub fn iter(&self) -> impl Iterator<Item = &LabeledFact> {
        self.facts.iter()
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

/// Generates labeled facts against one source graph.
pub struct FactSynthesizer<'g> {
    graph: &'g SourceGraph,
    rng: StdRng,
    /// Relation → distinct objects; filled lazily.
    objects: HashMap<String, Vec<Node>>,
}

impl<'g> FactSynthesizer<'g> {
    pub fn new(graph: &'g SourceGraph, seed: u64) -> Self {
        Self {
            graph,
            rng: StdRng::seed_from_u64(seed),
            objects: HashMap::new(),
        }
    }

    /// Draw up to `n` distinct facts from `pool`.
    pub fn true_facts(&mut self, pool: &mut SampledPool, n: usize) -> Vec<Fact> {
        let mut seen = HashSet::new();
        let mut facts = Vec::with_capacity(n);
        while facts.len() < n {
            let Ok(fact) = pool.draw_one() else { break };
            if seen.insert(fact.clone()) {
                facts.push(fact);
            }
        }
        facts
    }

    /// Draw edges from `pool` and mutate their objects until `n` distinct
    /// false facts exist or the pool runs dry.
    pub fn false_facts(&mut self, pool: &mut SampledPool, n: usize) -> Vec<Fact> {
        let mut seen = HashSet::new();
        let mut facts = Vec::with_capacity(n);
        while facts.len() < n {
            let Ok(candidate) = pool.draw_one() else { break };
            match self.mutate(&candidate) {
                Some(fact) => {
                    if seen.insert(fact.clone()) {
                        facts.push(fact);
                    }
                }
                None => tracing::debug!(fact = %candidate, "no replacement object, draw discarded"),
            }
        }
        facts
    }

    /// Replace the object of `fact` with a random object of the same
    /// relation such that the result is not in the graph.
    pub fn mutate(&mut self, fact: &Fact) -> Option<Fact> {
        let graph = self.graph;
        let objects = self
            .objects
            .entry(fact.relation.clone())
            .or_insert_with(|| graph.objects_of_relation(&fact.relation));

        let replacements: Vec<&Node> = objects
            .iter()
            .filter(|o| !graph.contains(&fact.subject, &fact.relation, o))
            .collect();
        if replacements.is_empty() {
            return None;
        }
        let picked = replacements[self.rng.gen_range(0..replacements.len())];
        Some(Fact::new(
            fact.subject.clone(),
            fact.relation.clone(),
            picked.clone(),
        ))
    }

    /// Generate `n_true` true and `n_false` false facts.
    ///
    /// Both sides are deduplicated against each other; the result lists all
    /// false facts first.
    pub fn generate(
        &mut self,
        n_true: usize,
        n_false: usize,
        true_pool: &mut SampledPool,
        false_pool: &mut SampledPool,
    ) -> FactSet {
        let mut negatives = if n_false > 0 {
            self.false_facts(false_pool, n_false)
        } else {
            tracing::info!("no false statements requested");
            Vec::new()
        };
        let positives = self.true_facts(true_pool, n_true);

        let positive_set: HashSet<&Fact> = positives.iter().collect();
        negatives.retain(|f| !positive_set.contains(f));

        tracing::debug!(
            requested = n_false,
            generated = negatives.len(),
            "false statement generation"
        );
        tracing::debug!(
            requested = n_true,
            generated = positives.len(),
            "true statement generation"
        );

        let facts = negatives
            .into_iter()
            .map(|f| LabeledFact::new(f, Label::False))
            .chain(positives.into_iter().map(|f| LabeledFact::new(f, Label::True)))
            .collect();

        FactSet {
            facts,
            requested_true: n_true,
            requested_false: n_false,
        }
    }
}

/// Generate a labeled fact set from two pools over `graph`.
pub fn generate_facts(
    graph: &SourceGraph,
    seed: u64,
    n_true: usize,
    n_false: usize,
    true_pool: &mut SampledPool,
    false_pool: &mut SampledPool,
) -> FactSet {
    FactSynthesizer::new(graph, seed).generate(n_true, n_false, true_pool, false_pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::{RelationRule, SamplingLimits};

    const LIVES_IN: &str = "http://ex.org/livesIn";
    const KNOWS: &str = "http://ex.org/knows";

    fn n(id: &str) -> Node {
        Node::iri(format!("http://ex.org/{id}"))
    }

    fn graph() -> SourceGraph {
        let mut graph = SourceGraph::new();
        for (person, city) in [
            ("alice", "paris"),
            ("bob", "berlin"),
            ("carol", "rome"),
            ("dave", "paris"),
            ("erin", "madrid"),
            ("frank", "berlin"),
        ] {
            graph.insert(Fact::new(n(person), LIVES_IN, n(city)));
        }
        for (a, b) in [("alice", "bob"), ("bob", "carol"), ("carol", "alice")] {
            graph.insert(Fact::new(n(a), KNOWS, n(b)));
        }
        graph
    }

    fn pools(graph: &SourceGraph, seed: u64) -> (SampledPool, SampledPool) {
        let rule = RelationRule::BlockList { relations: vec![] };
        let limits = SamplingLimits::default();
        (
            SampledPool::sample(graph, &rule, limits, seed),
            SampledPool::sample(graph, &rule, limits, seed),
        )
    }

    #[test]
    fn false_facts_are_absent_but_plausible() {
        let graph = graph();
        let (mut t, mut f) = pools(&graph, 1234);
        let set = generate_facts(&graph, 1234, 4, 6, &mut t, &mut f);

        for lf in set.iter().filter(|lf| !lf.label.is_true()) {
            let fact = &lf.fact;
            assert!(!graph.contains(&fact.subject, &fact.relation, &fact.object));
            assert!(graph.has_subject_relation(&fact.subject, &fact.relation));
            assert!(graph.objects_of_relation(&fact.relation).contains(&fact.object));
        }
        for lf in set.iter().filter(|lf| lf.label.is_true()) {
            let fact = &lf.fact;
            assert!(graph.contains(&fact.subject, &fact.relation, &fact.object));
        }
    }

    #[test]
    fn sets_never_intersect_and_false_comes_first() {
        let graph = graph();
        let (mut t, mut f) = pools(&graph, 42);
        let set = generate_facts(&graph, 42, 5, 5, &mut t, &mut f);

        let trues: HashSet<&Fact> = set
            .iter()
            .filter(|lf| lf.label.is_true())
            .map(|lf| &lf.fact)
            .collect();
        assert!(set
            .iter()
            .filter(|lf| !lf.label.is_true())
            .all(|lf| !trues.contains(&lf.fact)));

        let labels: Vec<Label> = set.iter().map(|lf| lf.label).collect();
        let mut sorted = labels.clone();
        sorted.sort();
        assert_eq!(labels, sorted);

        let unique: HashSet<&Fact> = set.iter().map(|lf| &lf.fact).collect();
        assert_eq!(unique.len(), set.len());
    }

    #[test]
    fn exhausted_pools_yield_fewer_facts() {
        let graph = graph();
        let (mut t, mut f) = pools(&graph, 7);
        let set = generate_facts(&graph, 7, 100, 100, &mut t, &mut f);
        assert_eq!(set.true_count(), graph.len());
        assert!(set.false_count() <= graph.len());
        assert!(!set.is_complete());
        assert_eq!(set.requested_true, 100);
    }

    #[test]
    fn subject_with_every_object_is_discarded() {
        // Single subject already linked to every object of the relation.
        let mut graph = SourceGraph::new();
        graph.insert(Fact::new(n("a"), KNOWS, n("b")));
        graph.insert(Fact::new(n("a"), KNOWS, n("c")));

        let mut synth = FactSynthesizer::new(&graph, 1);
        assert!(synth.mutate(&Fact::new(n("a"), KNOWS, n("b"))).is_none());

        let mut pool = SampledPool::from_facts(graph.facts().collect(), 1);
        assert!(synth.false_facts(&mut pool, 3).is_empty());
        assert!(!pool.has_more());
    }

    #[test]
    fn generation_is_reproducible() {
        let graph = graph();
        let (mut t1, mut f1) = pools(&graph, 5);
        let (mut t2, mut f2) = pools(&graph, 5);
        assert_eq!(
            generate_facts(&graph, 5, 3, 3, &mut t1, &mut f1),
            generate_facts(&graph, 5, 3, 3, &mut t2, &mut f2)
        );
    }

    #[test]
    fn zero_false_requested() {
        let graph = graph();
        let (mut t, mut f) = pools(&graph, 5);
        let set = generate_facts(&graph, 5, 2, 0, &mut t, &mut f);
        assert_eq!(set.false_count(), 0);
        assert_eq!(set.true_count(), 2);
        assert!(set.is_complete());
        // the false pool was never touched
        assert_eq!(f.len(), graph.len());
    }
}
