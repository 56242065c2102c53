//! Streaming N-Triples reader that keeps only resource-valued edges.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::Term;

use crate::error::{GraphError, GraphResult};

use super::{Fact, Node, SourceGraph};

/// What a read kept and what it dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    pub triples: usize,
    pub literals_skipped: usize,
    pub duplicates: usize,
}

/// Read an N-Triples file into a literal-free [`SourceGraph`].
pub fn read_file(path: &Path) -> GraphResult<(SourceGraph, ReadStats)> {
    let file = File::open(path).map_err(|e| GraphError::Read {
        path: path.display().to_string(),
        source: e,
    })?;
    let (graph, stats) = read(BufReader::new(file))?;
    tracing::info!(
        path = %path.display(),
        edges = graph.len(),
        literals_skipped = stats.literals_skipped,
        "read source graph"
    );
    Ok((graph, stats))
}

/// Read N-Triples from any reader into a literal-free [`SourceGraph`].
pub fn read<R: Read>(reader: R) -> GraphResult<(SourceGraph, ReadStats)> {
    let mut graph = SourceGraph::new();
    let mut stats = ReadStats::default();

    for quad in RdfParser::from_format(RdfFormat::NTriples).for_reader(reader) {
        let quad = quad.map_err(|e| GraphError::Parse {
            message: e.to_string(),
        })?;
        stats.triples += 1;

        let Some(subject) = Node::from_term(Term::from(quad.subject)) else {
            continue;
        };
        let Some(object) = Node::from_term(quad.object) else {
            stats.literals_skipped += 1;
            continue;
        };
        if !graph.insert(Fact::new(subject, quad.predicate.into_string(), object)) {
            stats.duplicates += 1;
        }
        if stats.triples % 100_000 == 0 {
            tracing::debug!(processed = stats.triples, "reading N-Triples");
        }
    }

    Ok((graph, stats))
}
