// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # glisten
//!
//! Benchmark for dataset recommendation systems. Given a source knowledge
//! graph and a ranked list of candidate target datasets, glisten measures
//! whether adding the recommended datasets (through pre-computed link files)
//! makes facts about the source easier to verify.
//!
//! ## Architecture
//!
//! - **Graph** (`graph`): literal-free, relation-indexed view of an N-Triples source
//! - **Sampling** (`sampler`): seeded, bounded per-relation statement pools
//! - **Synthesis** (`synth`): true facts from the pool, false facts by object replacement
//! - **Oracle** (`scorer`): fact veracity via SPARQL path evidence, ranking AUC
//! - **Endpoint** (`endpoint`): additive dataset loading (script or in-process oxigraph)
//! - **Evaluation** (`eval`): baseline, incremental scan, ROC aggregation
//! - **Fetch** (`fetch`): download and unpack a benchmark's dataset archives
//!
//! ## Library usage
//!
//! ```no_run
//! use std::path::Path;
//! use glisten::endpoint::LocalEndpoint;
//! use glisten::eval::{CoreEvaluator, EvaluationParameters, Recommendation};
//! use glisten::scorer::{CheckerScorer, PathEvidenceChecker};
//!
//! let endpoint = LocalEndpoint::new().unwrap();
//! let scorer = CheckerScorer::new(PathEvidenceChecker::new(endpoint.clone()));
//! let mut evaluator = CoreEvaluator::new(EvaluationParameters::default(), endpoint, scorer);
//! let recommendations = vec![
//!     Recommendation::new("targets/wikidata.nt", 0.9),
//!     Recommendation::new("targets/geonames.nt", 0.4),
//! ];
//! let report = evaluator.evaluate(Path::new("sources/dbpedia.nt"), &recommendations).unwrap();
//! println!("AUC = {}", report.auc);
//! ```

pub mod config;
pub mod endpoint;
pub mod error;
pub mod eval;
pub mod fetch;
pub mod graph;
pub mod roc;
pub mod sampler;
pub mod scorer;
pub mod synth;
