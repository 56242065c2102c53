//! In-process endpoint backed by an in-memory oxigraph store.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use oxigraph::io::RdfFormat;
use oxigraph::model::Term;
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store;

use crate::scorer::{CheckError, CheckResult, SparqlBackend};

use super::{DatasetLoader, LoadError, LoadResult};

/// An in-memory store that is both the dataset loader and the SPARQL
/// backend. Clones share the same store.
#[derive(Clone)]
pub struct LocalEndpoint {
    store: Store,
}

impl LocalEndpoint {
    pub fn new() -> LoadResult<Self> {
        let store = Store::new().map_err(|e| LoadError::Io {
            path: "<memory>".into(),
            source: std::io::Error::other(e),
        })?;
        Ok(Self { store })
    }

    /// Number of triples loaded so far.
    pub fn len(&self) -> usize {
        self.store.len().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for LocalEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalEndpoint")
            .field("triples", &self.len())
            .finish()
    }
}

impl DatasetLoader for LocalEndpoint {
    fn load(&mut self, path: &Path) -> LoadResult<()> {
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => LoadError::MissingDataset {
                path: path.display().to_string(),
            },
            _ => LoadError::Io {
                path: path.display().to_string(),
                source: e,
            },
        })?;
        let before = self.len();
        self.store
            .load_from_reader(RdfFormat::NTriples, BufReader::new(file))
            .map_err(|e| LoadError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        tracing::info!(
            dataset = %path.display(),
            added = self.len().saturating_sub(before),
            "loaded dataset into local store"
        );
        Ok(())
    }
}

impl SparqlBackend for LocalEndpoint {
    fn select_count(&self, query: &str) -> CheckResult<u64> {
        let results = self.store.query(query).map_err(|e| CheckError::RequestFailed {
            message: format!("SPARQL query failed: {e}"),
        })?;
        let QueryResults::Solutions(mut solutions) = results else {
            return Err(CheckError::MalformedResponse {
                message: "expected solutions from a SELECT query".into(),
            });
        };
        let Some(solution) = solutions.next() else {
            return Ok(0);
        };
        let solution = solution.map_err(|e| CheckError::RequestFailed {
            message: format!("solution error: {e}"),
        })?;
        match solution.get("count") {
            Some(Term::Literal(literal)) => {
                literal
                    .value()
                    .parse()
                    .map_err(|_| CheckError::MalformedResponse {
                        message: format!("count is not an integer: {}", literal.value()),
                    })
            }
            Some(other) => Err(CheckError::MalformedResponse {
                message: format!("count is not a literal: {other}"),
            }),
            None => Ok(0),
        }
    }
}
