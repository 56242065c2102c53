//! Verification oracle boundary and ranking-quality scoring.
//!
//! A [`FactChecker`] assigns a veracity to a single fact; how it does so is
//! its own business. A [`Scorer`] turns the veracities of a labeled fact set
//! into one ranking-quality number via [`ranking_auc`].

pub mod path;

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

use crate::graph::{Fact, Label};
use crate::roc::RocCurve;
use crate::synth::FactSet;

pub use path::{HttpSparql, PathEvidenceChecker, SparqlBackend};

/// Errors from verification oracles.
#[derive(Debug, Error, Diagnostic)]
pub enum CheckError {
    #[error("SPARQL request failed: {message}")]
    #[diagnostic(
        code(glisten::check::request_failed),
        help("Check that the SPARQL endpoint is running and reachable.")
    )]
    RequestFailed { message: String },

    #[error("oracle call timed out after {timeout:?}")]
    #[diagnostic(
        code(glisten::check::timeout),
        help("Increase `scorer.timeout_secs` or restrict the path namespaces.")
    )]
    Timeout { timeout: Duration },

    #[error("malformed SPARQL response: {message}")]
    #[diagnostic(
        code(glisten::check::malformed_response),
        help("The endpoint must answer SELECT queries with application/sparql-results+json.")
    )]
    MalformedResponse { message: String },

    #[error("cannot verify a fact about blank node {node}")]
    #[diagnostic(
        code(glisten::check::unsupported_node),
        help("Blank nodes are local to their file and cannot be addressed in a query.")
    )]
    UnsupportedNode { node: String },
}

impl CheckError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RequestFailed { .. } | Self::Timeout { .. })
    }
}

pub type CheckResult<T> = std::result::Result<T, CheckError>;

/// Computes the veracity of one fact.
///
/// Higher means more likely true. The range is up to the implementation.
pub trait FactChecker {
    fn check(&self, fact: &Fact) -> CheckResult<f64>;
}

impl<F> FactChecker for F
where
    F: Fn(&Fact) -> CheckResult<f64>,
{
    fn check(&self, fact: &Fact) -> CheckResult<f64> {
        self(fact)
    }
}

/// Runs another checker on a worker thread and gives up after a deadline.
///
/// An overrunning call keeps its thread until it returns; the late answer
/// is dropped.
#[derive(Debug)]
pub struct DeadlineChecker<C> {
    checker: Arc<C>,
    deadline: Duration,
}

impl<C> DeadlineChecker<C> {
    pub fn new(checker: C, deadline: Duration) -> Self {
        Self {
            checker: Arc::new(checker),
            deadline,
        }
    }

    pub fn inner(&self) -> &C {
        &self.checker
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }
}

impl<C> FactChecker for DeadlineChecker<C>
where
    C: FactChecker + Send + Sync + 'static,
{
    fn check(&self, fact: &Fact) -> CheckResult<f64> {
        let (tx, rx) = mpsc::channel();
        let checker = Arc::clone(&self.checker);
        let fact = fact.clone();
        thread::Builder::new()
            .name("glisten-check".into())
            .spawn(move || {
                let _ = tx.send(checker.check(&fact));
            })
            .map_err(|e| CheckError::RequestFailed {
                message: format!("failed to spawn oracle thread: {e}"),
            })?;

        match rx.recv_timeout(self.deadline) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(CheckError::Timeout {
                timeout: self.deadline,
            }),
            Err(RecvTimeoutError::Disconnected) => Err(CheckError::RequestFailed {
                message: "oracle thread ended without an answer".into(),
            }),
        }
    }
}

/// Scores a whole labeled fact set against the current endpoint state.
pub trait Scorer {
    /// One veracity per fact, in fact-set order.
    fn veracities(&mut self, facts: &FactSet) -> Vec<f64>;

    /// Ranking quality of the veracities as an AUC.
    fn score_all(&mut self, facts: &FactSet) -> f64 {
        let veracities = self.veracities(facts);
        let ranked: Vec<(Label, f64)> = facts
            .iter()
            .zip(veracities)
            .map(|(lf, v)| (lf.label, v))
            .collect();
        ranking_auc(&ranked)
    }
}

/// NaN carries no ranking information; treat it as neutral.
pub fn coerce_veracity(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value }
}

/// AUC of a ranking: sort by veracity descending (stable, so ties keep
/// their input order), then step up for every true fact and right for every
/// false one.
pub fn ranking_auc(scored: &[(Label, f64)]) -> f64 {
    let mut order: Vec<(Label, f64)> = scored
        .iter()
        .map(|&(label, v)| (label, coerce_veracity(v)))
        .collect();
    order.sort_by(|a, b| b.1.total_cmp(&a.1));

    let positives = order.iter().filter(|(label, _)| label.is_true()).count();
    let mut curve = RocCurve::new(positives, order.len() - positives);
    for (label, _) in &order {
        if label.is_true() {
            curve.step_up();
        } else {
            curve.step_right();
        }
    }
    curve.finalize_and_area()
}

/// Adapts a [`FactChecker`] into a [`Scorer`].
///
/// Oracle failures never abort a run: after the allowed retries the fact
/// gets the neutral veracity 0 and the failure is logged.
pub struct CheckerScorer<C> {
    checker: C,
    retries: u32,
}

impl<C: FactChecker> CheckerScorer<C> {
    pub fn new(checker: C) -> Self {
        Self { checker, retries: 0 }
    }

    /// Retry transient failures up to `retries` extra times per fact.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn checker(&self) -> &C {
        &self.checker
    }

    pub fn score_fact(&self, fact: &Fact) -> f64 {
        let mut attempt = 0;
        loop {
            match self.checker.check(fact) {
                Ok(v) => return coerce_veracity(v),
                Err(e) if e.is_transient() && attempt < self.retries => {
                    attempt += 1;
                    tracing::debug!(fact = %fact, attempt, error = %e, "retrying oracle call");
                }
                Err(e) => {
                    tracing::warn!(fact = %fact, error = %e, "oracle failed, scoring as 0");
                    return 0.0;
                }
            }
        }
    }
}

impl<C> CheckerScorer<C>
where
    C: FactChecker + Send + Sync + 'static,
{
    /// Bound every oracle call by `deadline`. An overrun is a timeout and
    /// scores 0 like any other.
    pub fn with_deadline(self, deadline: Duration) -> CheckerScorer<DeadlineChecker<C>> {
        CheckerScorer {
            checker: DeadlineChecker::new(self.checker, deadline),
            retries: self.retries,
        }
    }
}

impl<C: FactChecker> Scorer for CheckerScorer<C> {
    fn veracities(&mut self, facts: &FactSet) -> Vec<f64> {
        facts.iter().map(|lf| self.score_fact(&lf.fact)).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::graph::{LabeledFact, Node};

    fn fact(i: usize) -> Fact {
        Fact::new(
            Node::iri(format!("http://ex.org/s{i}")),
            "http://ex.org/p",
            Node::iri("http://ex.org/o"),
        )
    }

    #[test]
    fn perfectly_separated_scores_give_one() {
        let scored = [
            (Label::True, 1.0),
            (Label::True, 0.8),
            (Label::True, 0.0),
            (Label::False, -0.5),
            (Label::False, -0.8),
        ];
        assert_eq!(ranking_auc(&scored), 1.0);
    }

    #[test]
    fn inverted_scores_give_zero() {
        let scored = [
            (Label::True, -0.8),
            (Label::True, -0.5),
            (Label::True, 0.0),
            (Label::False, 0.8),
            (Label::False, 1.0),
        ];
        assert_eq!(ranking_auc(&scored), 0.0);
    }

    #[test]
    fn input_order_does_not_matter_without_ties() {
        let scored = [
            (Label::False, -0.5),
            (Label::True, 0.0),
            (Label::False, -0.8),
            (Label::True, 1.0),
        ];
        assert_eq!(ranking_auc(&scored), 1.0);
    }

    #[test]
    fn ties_keep_input_order() {
        // false first with equal scores: the curve goes right before up
        let scored = [(Label::False, 0.5), (Label::True, 0.5)];
        assert_eq!(ranking_auc(&scored), 0.0);
        let scored = [(Label::True, 0.5), (Label::False, 0.5)];
        assert_eq!(ranking_auc(&scored), 1.0);
    }

    #[test]
    fn nan_is_neutral() {
        assert_eq!(coerce_veracity(f64::NAN), 0.0);
        let scored = [(Label::False, -1.0), (Label::True, f64::NAN)];
        assert_eq!(ranking_auc(&scored), 1.0);
    }

    #[test]
    fn failures_score_zero_after_retries() {
        let calls = Cell::new(0u32);
        let checker = |_: &Fact| -> CheckResult<f64> {
            calls.set(calls.get() + 1);
            Err(CheckError::Timeout {
                timeout: Duration::from_secs(1),
            })
        };
        let scorer = CheckerScorer::new(checker).with_retries(2);
        assert_eq!(scorer.score_fact(&fact(0)), 0.0);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn unsupported_nodes_are_not_retried() {
        let calls = Cell::new(0u32);
        let checker = |_: &Fact| -> CheckResult<f64> {
            calls.set(calls.get() + 1);
            Err(CheckError::UnsupportedNode { node: "_:b".into() })
        };
        let scorer = CheckerScorer::new(checker).with_retries(5);
        assert_eq!(scorer.score_fact(&fact(0)), 0.0);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn transient_failure_then_success() {
        let calls = Cell::new(0u32);
        let checker = |_: &Fact| -> CheckResult<f64> {
            calls.set(calls.get() + 1);
            if calls.get() == 1 {
                Err(CheckError::RequestFailed { message: "reset".into() })
            } else {
                Ok(0.7)
            }
        };
        let scorer = CheckerScorer::new(checker).with_retries(1);
        assert_eq!(scorer.score_fact(&fact(0)), 0.7);
    }

    #[test]
    fn slow_checks_time_out_and_score_zero() {
        let calls = Arc::new(AtomicU32::new(0));
        let counted = Arc::clone(&calls);
        let slow = move |_: &Fact| -> CheckResult<f64> {
            counted.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(500));
            Ok(1.0)
        };
        let scorer = CheckerScorer::new(slow)
            .with_retries(1)
            .with_deadline(Duration::from_millis(20));
        assert_eq!(scorer.score_fact(&fact(0)), 0.0);
        // a timeout is transient, so the retry ran too
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn deadline_checker_passes_fast_answers_through() {
        let checker = DeadlineChecker::new(
            |_: &Fact| -> CheckResult<f64> { Ok(0.25) },
            Duration::from_secs(5),
        );
        assert_eq!(checker.check(&fact(0)).unwrap(), 0.25);

        let slow = DeadlineChecker::new(
            |_: &Fact| -> CheckResult<f64> {
                thread::sleep(Duration::from_millis(500));
                Ok(1.0)
            },
            Duration::from_millis(20),
        );
        assert!(matches!(
            slow.check(&fact(0)),
            Err(CheckError::Timeout { timeout }) if timeout == Duration::from_millis(20)
        ));
    }

    #[test]
    fn checker_scorer_ranks_fact_set() {
        let facts = FactSet::from_labeled(vec![
            LabeledFact::new(fact(0), Label::False),
            LabeledFact::new(fact(1), Label::False),
            LabeledFact::new(fact(2), Label::True),
            LabeledFact::new(fact(3), Label::True),
        ]);
        // true facts have the higher subject index
        let checker = |f: &Fact| -> CheckResult<f64> {
            Ok(if f.subject.as_str().ends_with(['2', '3']) { 0.9 } else { 0.1 })
        };
        let mut scorer = CheckerScorer::new(checker);
        assert_eq!(scorer.veracities(&facts), vec![0.1, 0.1, 0.9, 0.9]);
        assert_eq!(scorer.score_all(&facts), 1.0);
    }
}
