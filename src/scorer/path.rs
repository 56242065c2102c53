//! Path-evidence oracle over SPARQL.
//!
//! The veracity of (s, r, o) is derived from how strongly s and o are
//! connected *apart from* the edge itself: the number of other relations
//! directly linking them plus the number of distinct intermediate nodes on
//! length-2 paths between them. Evidence `e` maps to `e / (e + 1)`, so no
//! evidence is 0 and the score approaches 1 as evidence grows. Linking a
//! helpful target dataset adds paths, which is what the benchmark measures.

use std::time::Duration;

use crate::graph::{Fact, Node};

use super::{CheckError, CheckResult, FactChecker};

/// Something that can answer a `SELECT (COUNT(..) AS ?count)` query.
pub trait SparqlBackend {
    fn select_count(&self, query: &str) -> CheckResult<u64>;
}

/// A remote SPARQL endpoint reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSparql {
    endpoint: String,
    timeout: Duration,
    agent: ureq::Agent,
}

impl HttpSparql {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        let timeout = Duration::from_secs(timeout_secs);
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            endpoint: endpoint.into(),
            timeout,
            agent,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn map_error(&self, error: ureq::Error) -> CheckError {
        match error {
            ureq::Error::Status(code, resp) => CheckError::RequestFailed {
                message: format!("HTTP {code}: {}", resp.status_text()),
            },
            ureq::Error::Transport(t) => {
                if is_timeout(&t) {
                    CheckError::Timeout {
                        timeout: self.timeout,
                    }
                } else {
                    CheckError::RequestFailed {
                        message: t.to_string(),
                    }
                }
            }
        }
    }
}

/// Whether any I/O error in the transport's source chain is a timeout.
fn is_timeout(transport: &ureq::Transport) -> bool {
    let mut source = std::error::Error::source(transport);
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            ) {
                return true;
            }
        }
        source = err.source();
    }
    false
}

impl SparqlBackend for HttpSparql {
    fn select_count(&self, query: &str) -> CheckResult<u64> {
        let resp = self
            .agent
            .get(&self.endpoint)
            .query("query", query)
            .set("Accept", "application/sparql-results+json")
            .call()
            .map_err(|e| self.map_error(e))?;

        let json: serde_json::Value =
            resp.into_json().map_err(|e| CheckError::MalformedResponse {
                message: e.to_string(),
            })?;
        count_from_results(&json)
    }
}

/// Extract `?count` from the first row of a SPARQL JSON results document.
pub fn count_from_results(json: &serde_json::Value) -> CheckResult<u64> {
    let bindings = json["results"]["bindings"]
        .as_array()
        .ok_or_else(|| CheckError::MalformedResponse {
            message: "missing 'results.bindings'".into(),
        })?;
    let Some(row) = bindings.first() else {
        return Ok(0);
    };
    let value = row["count"]["value"]
        .as_str()
        .ok_or_else(|| CheckError::MalformedResponse {
            message: "missing 'count' binding".into(),
        })?;
    value.parse().map_err(|_| CheckError::MalformedResponse {
        message: format!("count is not an integer: {value}"),
    })
}

/// Scores facts by the connectivity of their endpoints.
#[derive(Debug, Clone)]
pub struct PathEvidenceChecker<B> {
    backend: B,
    /// Allowed path predicate namespaces; empty allows all.
    namespaces: Vec<String>,
}

impl<B: SparqlBackend> PathEvidenceChecker<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            namespaces: Vec::new(),
        }
    }

    pub fn with_namespaces(mut self, namespaces: Vec<String>) -> Self {
        self.namespaces = namespaces;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Raw evidence count for a fact.
    pub fn evidence(&self, fact: &Fact) -> CheckResult<u64> {
        let s = term(&fact.subject)?;
        let o = term(&fact.object)?;
        let direct = self.backend.select_count(&self.direct_query(&s, &fact.relation, &o))?;
        let paths = self.backend.select_count(&self.path_query(&s, &o))?;
        Ok(direct + paths)
    }

    fn direct_query(&self, s: &str, relation: &str, o: &str) -> String {
        format!(
            "SELECT (COUNT(DISTINCT ?p) AS ?count) WHERE {{\n  \
             {{ {s} ?p {o} }} UNION {{ {o} ?p {s} }}\n  \
             FILTER(?p != <{relation}>)\n{}}}",
            namespace_filter("?p", &self.namespaces)
        )
    }

    fn path_query(&self, s: &str, o: &str) -> String {
        format!(
            "SELECT (COUNT(DISTINCT ?x) AS ?count) WHERE {{\n  \
             {{ {s} ?p1 ?x }} UNION {{ ?x ?p1 {s} }}\n  \
             {{ ?x ?p2 {o} }} UNION {{ {o} ?p2 ?x }}\n  \
             FILTER(?x != {s} && ?x != {o})\n{}{}}}",
            namespace_filter("?p1", &self.namespaces),
            namespace_filter("?p2", &self.namespaces)
        )
    }
}

impl<B: SparqlBackend> FactChecker for PathEvidenceChecker<B> {
    fn check(&self, fact: &Fact) -> CheckResult<f64> {
        let e = self.evidence(fact)? as f64;
        Ok(e / (e + 1.0))
    }
}

fn term(node: &Node) -> CheckResult<String> {
    node.sparql_term().ok_or_else(|| CheckError::UnsupportedNode {
        node: node.to_string(),
    })
}

/// `FILTER(strstarts(str(?v), "ns1") || ...)`, or nothing for no namespaces.
pub fn namespace_filter(var: &str, namespaces: &[String]) -> String {
    if namespaces.is_empty() {
        return String::new();
    }
    let alternatives: Vec<String> = namespaces
        .iter()
        .map(|ns| format!("strstarts(str({var}), \"{}\")", ns.replace('"', "\\\"")))
        .collect();
    format!("  FILTER({})\n", alternatives.join(" || "))
}
