//! Benchmark configuration files.
//!
//! A configuration file (TOML or JSON, chosen by extension) lists named
//! benchmarks plus shared evaluation and oracle settings:
//!
//! ```toml
//! [evaluation]
//! seed = 1234
//! max_recommendations = 10
//!
//! [scorer]
//! endpoint = "http://localhost:8890/sparql"
//!
//! [[benchmarks]]
//! name = "mythology"
//! sources = ["data/sources/source1.nt"]
//! targets_dir = "data/targets"
//! namespaces = ["http://dbpedia.org/ontology/"]
//! true_facts = { type = "allowlist", relations = ["http://dbpedia.org/ontology/mythology"] }
//! false_facts = { type = "allowlist", relations = ["http://dbpedia.org/ontology/mythology"] }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::eval::{EvaluationParameters, FactRules};
use crate::sampler::RelationRule;

/// The whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Configurations {
    #[serde(default)]
    pub benchmarks: Vec<BenchmarkConfig>,
    #[serde(default)]
    pub evaluation: EvaluationParameters,
    #[serde(default)]
    pub scorer: ScorerSettings,
}

/// One named benchmark: which sources to evaluate and how to draw facts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    pub name: String,
    pub sources: Vec<PathBuf>,
    /// Directory with the candidate target datasets.
    #[serde(default)]
    pub targets_dir: Option<PathBuf>,
    /// Overrides `evaluation.links_dir` for this benchmark.
    #[serde(default)]
    pub links_dir: Option<PathBuf>,
    /// Namespaces of relations the oracle may follow.
    #[serde(default)]
    pub namespaces: Vec<String>,
    /// Archive of the linked datasets, unpacked into the links directory by
    /// `glisten init`. `file://` URLs are read from disk.
    #[serde(default)]
    pub links_url: Option<String>,
    /// Archive of the target datasets, unpacked into `targets_dir`.
    #[serde(default)]
    pub targets_url: Option<String>,
    pub true_facts: RelationRule,
    pub false_facts: RelationRule,
}

impl BenchmarkConfig {
    pub fn rules(&self) -> FactRules {
        FactRules {
            true_facts: self.true_facts.clone(),
            false_facts: self.false_facts.clone(),
        }
    }
}

/// Settings of the SPARQL path-evidence oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorerSettings {
    /// SPARQL endpoint queried for evidence.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Per-fact oracle deadline in seconds, for remote and local backends.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Extra attempts for a request that failed or timed out.
    #[serde(default)]
    pub retries: u32,
    /// Used when a benchmark names no namespaces itself.
    #[serde(default)]
    pub namespaces: Vec<String>,
}

fn default_endpoint() -> String {
    "http://localhost:8890/sparql".into()
}
fn default_timeout_secs() -> u64 {
    30
}

impl ScorerSettings {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ScorerSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            retries: 0,
            namespaces: Vec::new(),
        }
    }
}

impl Configurations {
    /// Load and validate a `.toml` or `.json` configuration file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let parse_error = |message: String| ConfigError::Parse {
            path: path.display().to_string(),
            message,
        };
        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&content).map_err(|e| parse_error(e.to_string()))?,
            Some("json") => {
                serde_json::from_str(&content).map_err(|e| parse_error(e.to_string()))?
            }
            _ => {
                return Err(ConfigError::UnknownFormat {
                    path: path.display().to_string(),
                });
            }
        };
        config.validate()?;
        tracing::debug!(path = %path.display(), benchmarks = config.benchmarks.len(), "loaded configuration");
        Ok(config)
    }

    /// Reject benchmarks that cannot produce any facts.
    pub fn validate(&self) -> ConfigResult<()> {
        for bench in &self.benchmarks {
            if bench.sources.is_empty() {
                return Err(ConfigError::Invalid {
                    message: format!("benchmark \"{}\" lists no sources", bench.name),
                });
            }
            for (side, rule) in [("true_facts", &bench.true_facts), ("false_facts", &bench.false_facts)] {
                if rule.is_empty() {
                    return Err(ConfigError::Invalid {
                        message: format!(
                            "benchmark \"{}\": `{side}` rule has an empty list",
                            bench.name
                        ),
                    });
                }
            }
        }
        if self.scorer.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                message: "`scorer.timeout_secs` must be at least 1".into(),
            });
        }
        if self.evaluation.max_per_relation == 0 {
            return Err(ConfigError::Invalid {
                message: "`evaluation.max_per_relation` must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn find(&self, name: &str) -> ConfigResult<&BenchmarkConfig> {
        self.benchmarks
            .iter()
            .find(|b| b.name == name)
            .ok_or_else(|| ConfigError::BenchmarkNotFound { name: name.into() })
    }

    /// Evaluation parameters with the benchmark's overrides applied.
    pub fn parameters_for(&self, bench: &BenchmarkConfig) -> EvaluationParameters {
        let mut params = self.evaluation.clone();
        if let Some(links) = &bench.links_dir {
            params.links_dir = links.clone();
        }
        params
    }

    /// Path namespaces for the oracle on this benchmark.
    pub fn namespaces_for(&self, bench: &BenchmarkConfig) -> Vec<String> {
        if bench.namespaces.is_empty() {
            self.scorer.namespaces.clone()
        } else {
            bench.namespaces.clone()
        }
    }
}
