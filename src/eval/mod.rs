//! Evaluation orchestration: baseline, incremental scan, aggregate.
//!
//! 1. The source graph alone is loaded and the fact set scored → baseline.
//! 2. Recommendations are visited best first; each target's linked dataset
//!    is loaded on top of everything loaded before and the fact set is scored
//!    again. A score strictly above the best seen so far is an up step,
//!    anything else a right step.
//! 3. The step sequence is replayed into a [`RocCurve`] whose capacities are
//!    the up and right counts; its area is the result.

pub mod recommend;

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::ScorerSettings;
use crate::endpoint::{DatasetLoader, LocalEndpoint};
use crate::error::{EvalError, EvalResult};
use crate::graph::SourceGraph;
use crate::roc::{Direction, RocCurve, RocPoint};
use crate::sampler::{RelationRule, SampledPool, SamplingLimits};
use crate::scorer::{CheckerScorer, PathEvidenceChecker, Scorer};
use crate::synth::{FactSet, FactSynthesizer};

pub use recommend::Recommendation;

/// Tunables of one evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationParameters {
    /// Seed for every random choice of the run.
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_statements")]
    pub true_statements: usize,
    #[serde(default = "default_statements")]
    pub false_statements: usize,
    /// Relations with fewer edges are not sampled.
    #[serde(default = "default_min_relation_occurrence")]
    pub min_relation_occurrence: usize,
    /// At most this many edges are sampled per relation.
    #[serde(default = "default_max_per_relation")]
    pub max_per_relation: usize,
    /// Top-N recommendations to scan; zero or negative scans all.
    #[serde(default = "default_max_recommendations")]
    pub max_recommendations: i64,
    /// Directory holding the `<source>_<target>` linked datasets.
    #[serde(default = "default_links_dir")]
    pub links_dir: PathBuf,
    /// Script used to load datasets into an external triplestore.
    #[serde(default = "default_loader_script")]
    pub loader_script: PathBuf,
}

fn default_seed() -> u64 {
    1234
}
fn default_statements() -> usize {
    10
}
fn default_min_relation_occurrence() -> usize {
    1
}
fn default_max_per_relation() -> usize {
    30
}
fn default_max_recommendations() -> i64 {
    10
}
fn default_links_dir() -> PathBuf {
    PathBuf::from("./links")
}
fn default_loader_script() -> PathBuf {
    PathBuf::from("./load_triplestore.sh")
}

impl Default for EvaluationParameters {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            true_statements: default_statements(),
            false_statements: default_statements(),
            min_relation_occurrence: default_min_relation_occurrence(),
            max_per_relation: default_max_per_relation(),
            max_recommendations: default_max_recommendations(),
            links_dir: default_links_dir(),
            loader_script: default_loader_script(),
        }
    }
}

impl EvaluationParameters {
    pub fn limits(&self) -> SamplingLimits {
        SamplingLimits {
            min_occurrence: self.min_relation_occurrence,
            max_per_relation: self.max_per_relation,
        }
    }

    /// Number of recommendations to scan, `None` for all of them.
    pub fn recommendation_cap(&self) -> Option<usize> {
        usize::try_from(self.max_recommendations)
            .ok()
            .filter(|&n| n > 0)
    }
}

/// The relation rules used to draw true and false facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactRules {
    pub true_facts: RelationRule,
    pub false_facts: RelationRule,
}

impl Default for FactRules {
    fn default() -> Self {
        let all = RelationRule::BlockList { relations: Vec::new() };
        Self {
            true_facts: all.clone(),
            false_facts: all,
        }
    }
}

/// One visited recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub target: String,
    pub confidence: f64,
    /// `None` when the linked dataset could not be loaded.
    pub score: Option<f64>,
    pub direction: Direction,
}

/// Everything one run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub source: String,
    pub requested_true: usize,
    pub requested_false: usize,
    pub true_facts: usize,
    pub false_facts: usize,
    pub baseline: f64,
    pub steps: Vec<StepRecord>,
    pub curve: Vec<RocPoint>,
    pub auc: f64,
}

impl EvaluationReport {
    pub fn directions(&self) -> Vec<Direction> {
        self.steps.iter().map(|s| s.direction).collect()
    }

    pub fn write_json(&self, path: &Path) -> EvalResult<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| EvalError::Write {
            path: path.display().to_string(),
            source: std::io::Error::other(e),
        })?;
        std::fs::write(path, json).map_err(|e| EvalError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Write only the ROC points, for plotting.
    pub fn write_curve_json(&self, path: &Path) -> EvalResult<()> {
        let json = serde_json::to_string_pretty(&self.curve).map_err(|e| EvalError::Write {
            path: path.display().to_string(),
            source: std::io::Error::other(e),
        })?;
        std::fs::write(path, json).map_err(|e| EvalError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}

/// Runs the protocol against one endpoint.
///
/// The loader and the scorer must talk to the same endpoint: everything
/// loaded stays loaded and every score sees the cumulative state.
pub struct CoreEvaluator<L, S> {
    params: EvaluationParameters,
    rules: FactRules,
    loader: L,
    scorer: S,
}

impl<L: DatasetLoader, S: Scorer> CoreEvaluator<L, S> {
    pub fn new(params: EvaluationParameters, loader: L, scorer: S) -> Self {
        Self {
            params,
            rules: FactRules::default(),
            loader,
            scorer,
        }
    }

    pub fn with_rules(mut self, rules: FactRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn params(&self) -> &EvaluationParameters {
        &self.params
    }

    /// Full run for one source graph.
    pub fn evaluate(
        &mut self,
        source: &Path,
        recommendations: &[Recommendation],
    ) -> EvalResult<EvaluationReport> {
        let graph = SourceGraph::from_ntriples_file(source)?;
        let facts = self.generate_facts(&graph);
        drop(graph);

        tracing::info!(source = %source.display(), "loading source into endpoint");
        self.loader
            .load(source)
            .map_err(|e| EvalError::SourceLoad {
                path: source.display().to_string(),
                source: e,
            })?;

        let baseline = self.scorer.score_all(&facts);
        tracing::info!(baseline, "baseline score");

        let steps = self.scan(baseline, &source.display().to_string(), &facts, recommendations)?;
        let directions: Vec<Direction> = steps.iter().map(|s| s.direction).collect();
        let (curve, auc) = aggregate(&directions);
        tracing::info!(auc, up = curve.true_count(), right = curve.false_count(), "evaluation finished");

        Ok(EvaluationReport {
            source: source.display().to_string(),
            requested_true: facts.requested_true,
            requested_false: facts.requested_false,
            true_facts: facts.true_count(),
            false_facts: facts.false_count(),
            baseline,
            steps,
            curve: curve.points().to_vec(),
            auc,
        })
    }

    /// Sample and synthesize the labeled fact set for a graph.
    pub fn generate_facts(&self, graph: &SourceGraph) -> FactSet {
        fact_set(graph, &self.params, &self.rules)
    }

    /// Visit the recommendations best first and record one step each.
    ///
    /// A dataset that cannot be loaded is a right step; a loader that cannot
    /// run at all ends the run.
    pub fn scan(
        &mut self,
        baseline: f64,
        source: &str,
        facts: &FactSet,
        recommendations: &[Recommendation],
    ) -> EvalResult<Vec<StepRecord>> {
        let cap = self.params.recommendation_cap().unwrap_or(usize::MAX);
        let mut best = baseline;
        let mut steps = Vec::new();

        for rec in rank_recommendations(recommendations).into_iter().take(cap) {
            let link = self.params.links_dir.join(link_file_name(source, &rec.target));
            tracing::info!(candidate = %rec.target, dataset = %link.display(), "adding linked dataset");

            let step = match self.loader.load(&link) {
                Ok(()) => {
                    let score = self.scorer.score_all(facts);
                    let direction = if score > best {
                        best = score;
                        Direction::Up
                    } else {
                        Direction::Right
                    };
                    tracing::info!(candidate = %rec.target, score, %direction, "scored");
                    StepRecord {
                        target: rec.target,
                        confidence: rec.confidence,
                        score: Some(score),
                        direction,
                    }
                }
                Err(e) if e.is_fatal() => {
                    return Err(EvalError::Loader {
                        target: rec.target,
                        source: e,
                    });
                }
                Err(e) => {
                    tracing::warn!(candidate = %rec.target, error = %e, "linked dataset not loaded, counting as no improvement");
                    StepRecord {
                        target: rec.target,
                        confidence: rec.confidence,
                        score: None,
                        direction: Direction::Right,
                    }
                }
            };
            steps.push(step);
        }
        Ok(steps)
    }
}

/// Sample pools with the run seed and synthesize the labeled fact set.
pub fn fact_set(graph: &SourceGraph, params: &EvaluationParameters, rules: &FactRules) -> FactSet {
    let limits = params.limits();
    let mut true_pool = SampledPool::sample(graph, &rules.true_facts, limits, params.seed);
    let mut false_pool = SampledPool::sample(graph, &rules.false_facts, limits, params.seed);
    let facts = FactSynthesizer::new(graph, params.seed).generate(
        params.true_statements,
        params.false_statements,
        &mut true_pool,
        &mut false_pool,
    );
    if facts.is_complete() {
        tracing::info!(facts = facts.len(), "generated facts");
    } else {
        tracing::warn!(
            requested_true = facts.requested_true,
            generated_true = facts.true_count(),
            requested_false = facts.requested_false,
            generated_false = facts.false_count(),
            "fewer facts than requested"
        );
    }
    facts
}

/// Recommendations sorted by confidence, highest first. Equal confidences
/// keep their input order.
pub fn rank_recommendations(recommendations: &[Recommendation]) -> Vec<Recommendation> {
    let mut ranked = recommendations.to_vec();
    ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    ranked
}

/// `{source stem}_{target name}`: the source's file name without its
/// extension and the target's file name, both taken after the last `/`.
pub fn link_file_name(source: &str, target: &str) -> String {
    let source_name = recommend::basename(source);
    let stem = Path::new(source_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| source_name.to_string());
    format!("{stem}_{}", recommend::basename(target))
}

/// Replay steps into a curve sized by their up and right counts.
pub fn aggregate(directions: &[Direction]) -> (RocCurve, f64) {
    let mut curve = RocCurve::from_directions(directions);
    let auc = curve.finalize_and_area();
    (curve, auc)
}

/// Evaluate several sources in parallel, each on its own in-process
/// endpoint scored by path evidence under the oracle settings.
pub fn evaluate_local_batch<F>(
    params: &EvaluationParameters,
    rules: &FactRules,
    oracle: &ScorerSettings,
    sources: &[PathBuf],
    recommendations_for: F,
) -> Vec<(PathBuf, EvalResult<EvaluationReport>)>
where
    F: Fn(&Path) -> Vec<Recommendation> + Sync,
{
    sources
        .par_iter()
        .map(|source| {
            let result = LocalEndpoint::new()
                .map_err(|e| EvalError::SourceLoad {
                    path: source.display().to_string(),
                    source: e,
                })
                .and_then(|endpoint| {
                    let checker = PathEvidenceChecker::new(endpoint.clone())
                        .with_namespaces(oracle.namespaces.clone());
                    let scorer = CheckerScorer::new(checker)
                        .with_retries(oracle.retries)
                        .with_deadline(oracle.deadline());
                    CoreEvaluator::new(params.clone(), endpoint, scorer)
                        .with_rules(rules.clone())
                        .evaluate(source, &recommendations_for(source.as_path()))
                });
            (source.clone(), result)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::endpoint::{LoadError, LoadResult};
    use crate::graph::{Fact, Label, LabeledFact, Node};
    use Direction::{Right, Up};

    /// Records every load; fails for paths containing "missing".
    #[derive(Default)]
    struct RecordingLoader {
        loaded: Vec<PathBuf>,
        fatal: bool,
    }

    impl DatasetLoader for RecordingLoader {
        fn load(&mut self, path: &Path) -> LoadResult<()> {
            if self.fatal {
                return Err(LoadError::ScriptUnavailable { path: "load.sh".into() });
            }
            if path.to_string_lossy().contains("missing") {
                return Err(LoadError::MissingDataset {
                    path: path.display().to_string(),
                });
            }
            self.loaded.push(path.to_path_buf());
            Ok(())
        }
    }

    /// Returns pre-set scores in order.
    struct ScriptedScorer(VecDeque<f64>);

    impl ScriptedScorer {
        fn new(scores: &[f64]) -> Self {
            Self(scores.iter().copied().collect())
        }
    }

    impl Scorer for ScriptedScorer {
        fn veracities(&mut self, facts: &FactSet) -> Vec<f64> {
            vec![0.0; facts.len()]
        }

        fn score_all(&mut self, _facts: &FactSet) -> f64 {
            self.0.pop_front().unwrap_or(0.0)
        }
    }

    fn facts() -> FactSet {
        FactSet::from_labeled(vec![LabeledFact::new(
            Fact::new(Node::iri("http://ex.org/a"), "http://ex.org/p", Node::iri("http://ex.org/b")),
            Label::True,
        )])
    }

    fn recs(n: usize) -> Vec<Recommendation> {
        (0..n)
            .map(|i| Recommendation::new(format!("file:///targets/t{i}.nt"), 1.0 - i as f64 * 0.1))
            .collect()
    }

    fn evaluator(scores: &[f64], max: i64) -> CoreEvaluator<RecordingLoader, ScriptedScorer> {
        let params = EvaluationParameters {
            max_recommendations: max,
            links_dir: PathBuf::from("/links"),
            ..Default::default()
        };
        CoreEvaluator::new(params, RecordingLoader::default(), ScriptedScorer::new(scores))
    }

    fn scan_directions(baseline: f64, scores: &[f64]) -> Vec<Direction> {
        let mut ev = evaluator(scores, 0);
        ev.scan(baseline, "source.nt", &facts(), &recs(scores.len()))
            .unwrap()
            .iter()
            .map(|s| s.direction)
            .collect()
    }

    #[test]
    fn improvements_are_compared_with_best_so_far() {
        let directions = scan_directions(0.1, &[0.2, 0.2, 0.3, 0.3]);
        assert_eq!(directions, vec![Up, Right, Up, Right]);
        assert_eq!(aggregate(&directions).1, 0.75);
    }

    #[test]
    fn lower_score_does_not_lower_the_bar() {
        // 0.15 after 0.3 is a right step, and so is the following 0.2
        assert_eq!(scan_directions(0.1, &[0.3, 0.15, 0.2]), vec![Up, Right, Right]);
    }

    #[test]
    fn aggregate_areas() {
        assert_eq!(aggregate(&scan_directions(0.1, &[0.2, 0.3, 0.3])).1, 1.0);
        assert_eq!(aggregate(&scan_directions(0.1, &[0.1, 0.1, 0.2])).1, 0.0);
        assert_eq!(aggregate(&scan_directions(0.1, &[0.3, 0.3, 0.4])).1, 0.5);
        assert_eq!(aggregate(&[]).1, 0.5);
    }

    #[test]
    fn cap_limits_loaded_candidates() {
        let mut ev = evaluator(&[0.2; 10], 3);
        let steps = ev.scan(0.1, "source.nt", &facts(), &recs(10)).unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(ev.loader.loaded.len(), 3);
    }

    #[test]
    fn candidates_are_visited_by_confidence_with_stable_ties() {
        let recs = vec![
            Recommendation::new("a.nt", 0.1),
            Recommendation::new("b.nt", 0.5),
            Recommendation::new("c.nt", 0.1),
            Recommendation::new("d.nt", 0.9),
        ];
        let mut ev = evaluator(&[0.0; 4], 0);
        ev.scan(0.0, "/data/source.nt", &facts(), &recs).unwrap();
        let loaded: Vec<String> = ev
            .loader
            .loaded
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        assert_eq!(
            loaded,
            vec![
                "/links/source_d.nt",
                "/links/source_b.nt",
                "/links/source_a.nt",
                "/links/source_c.nt"
            ]
        );
    }

    #[test]
    fn missing_dataset_is_a_right_step() {
        let recs = vec![
            Recommendation::new("missing.nt", 0.9),
            Recommendation::new("present.nt", 0.5),
        ];
        let mut ev = evaluator(&[0.5], 0);
        let steps = ev.scan(0.1, "source.nt", &facts(), &recs).unwrap();
        assert_eq!(steps[0].direction, Right);
        assert_eq!(steps[0].score, None);
        assert_eq!(steps[1].direction, Up);
        assert_eq!(steps[1].score, Some(0.5));
    }

    #[test]
    fn unavailable_loader_aborts() {
        let mut ev = evaluator(&[], 0);
        ev.loader.fatal = true;
        let err = ev.scan(0.1, "source.nt", &facts(), &recs(2)).unwrap_err();
        assert!(matches!(err, EvalError::Loader { .. }));
    }

    #[test]
    fn link_names_follow_the_convention() {
        assert_eq!(
            link_file_name("file:///data/sources/dbpedia.nt", "file:///data/targets/wikidata.nt"),
            "dbpedia_wikidata.nt"
        );
        assert_eq!(link_file_name("source", "t"), "source_t");
    }

    #[test]
    fn non_positive_cap_scans_all() {
        let mut params = EvaluationParameters::default();
        assert_eq!(params.recommendation_cap(), Some(10));
        params.max_recommendations = 0;
        assert_eq!(params.recommendation_cap(), None);
        params.max_recommendations = -3;
        assert_eq!(params.recommendation_cap(), None);
    }

    #[test]
    fn parameters_default_when_omitted() {
        let params: EvaluationParameters = toml::from_str("seed = 7").unwrap();
        assert_eq!(params.seed, 7);
        assert_eq!(params.true_statements, 10);
        assert_eq!(params.max_per_relation, 30);
        assert_eq!(params.loader_script, PathBuf::from("./load_triplestore.sh"));
    }
}
