//! Graph data model: nodes, facts and labels.
//!
//! The sampling side of glisten works on a literal-free view of the source
//! graph ([`SourceGraph`]): every edge is a [`Fact`] whose subject and object
//! are IRIs or blank nodes. Facts handed to the verification oracle carry a
//! [`Label`] saying whether they were drawn from the graph or synthesized.

pub mod index;
pub mod ntriples;

use std::fmt;

use oxigraph::model::Term;
use serde::{Deserialize, Serialize};

pub use index::SourceGraph;

/// A resource node: an IRI or a blank node. Literals are never nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Node {
    Iri(String),
    Blank(String),
}

impl Node {
    pub fn iri(iri: impl Into<String>) -> Self {
        Self::Iri(iri.into())
    }

    pub fn blank(id: impl Into<String>) -> Self {
        Self::Blank(id.into())
    }

    /// Convert an oxigraph term. Returns `None` for literals (and triple terms).
    pub fn from_term(term: Term) -> Option<Self> {
        match term {
            Term::NamedNode(n) => Some(Self::Iri(n.into_string())),
            Term::BlankNode(b) => Some(Self::Blank(b.as_str().to_owned())),
            _ => None,
        }
    }

    /// The bare identifier (IRI or blank node label) without delimiters.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Iri(s) | Self::Blank(s) => s,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Blank(_))
    }

    /// The node as a SPARQL term. Blank nodes are scoped to the document they
    /// were read from and cannot be addressed in a query.
    pub fn sparql_term(&self) -> Option<String> {
        match self {
            Self::Iri(iri) => Some(format!("<{iri}>")),
            Self::Blank(_) => None,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iri(iri) => write!(f, "<{iri}>"),
            Self::Blank(id) => write!(f, "_:{id}"),
        }
    }
}

/// A (subject, relation, object) edge. Equality is structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fact {
    pub subject: Node,
    /// IRI of the relation (predicate).
    pub relation: String,
    pub object: Node,
}

impl Fact {
    pub fn new(subject: Node, relation: impl Into<String>, object: Node) -> Self {
        Self {
            subject,
            relation: relation.into(),
            object,
        }
    }
}

/// Renders the fact as one N-Triples statement.
impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}> {} .", self.subject, self.relation, self.object)
    }
}

/// Ground-truth label of a fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    // Declared first so that sorting by label puts false facts on top.
    False,
    True,
}

impl Label {
    /// Trueness value: +1.0 for true facts, -1.0 for false ones.
    pub fn value(self) -> f64 {
        match self {
            Self::True => 1.0,
            Self::False => -1.0,
        }
    }

    pub fn is_true(self) -> bool {
        self == Self::True
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => f.write_str("true"),
            Self::False => f.write_str("false"),
        }
    }
}

/// A fact together with its ground-truth label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabeledFact {
    pub fact: Fact,
    pub label: Label,
}

impl LabeledFact {
    pub fn new(fact: Fact, label: Label) -> Self {
        Self { fact, label }
    }
}
