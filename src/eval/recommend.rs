//! Recommendation input: (target, confidence) pairs from a JSON file, an
//! order file or a seeded shuffle of a targets directory.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// A candidate target dataset with the recommender's confidence in it.
/// Higher is more recommended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub target: String,
    pub confidence: f64,
}

impl Recommendation {
    pub fn new(target: impl Into<String>, confidence: f64) -> Self {
        Self {
            target: target.into(),
            confidence,
        }
    }

    /// The target's file name, i.e. everything after the last `/`.
    pub fn target_name(&self) -> &str {
        basename(&self.target)
    }
}

/// Read a JSON array of `{"target": .., "confidence": ..}` records.
pub fn read_recommendations(path: &Path) -> ConfigResult<Vec<Recommendation>> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        source: e,
    })?;
    serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Target datasets in a directory, sorted by file name.
pub fn list_targets(dir: &Path) -> ConfigResult<Vec<String>> {
    let entries = fs::read_dir(dir).map_err(|e| ConfigError::Read {
        path: dir.display().to_string(),
        source: e,
    })?;
    let mut targets = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::Read {
            path: dir.display().to_string(),
            source: e,
        })?;
        if entry.path().is_file() {
            targets.push(entry.path().display().to_string());
        }
    }
    targets.sort();
    Ok(targets)
}

/// Rank targets by an order file listing one target name per line, best
/// first.
///
/// With `n` targets, the i-th listed name gets confidence `n - i`; targets
/// the file does not mention get 0. Lines are matched by file name, so the
/// file may contain full paths.
pub fn from_order(targets: &[String], order: &str) -> Vec<Recommendation> {
    let n = targets.len() as f64;
    let mut ranks: HashMap<&str, f64> = HashMap::new();
    let listed = order.lines().map(str::trim).filter(|l| !l.is_empty());
    for (index, line) in listed.enumerate() {
        ranks.entry(basename(line)).or_insert(n - index as f64);
    }
    targets
        .iter()
        .map(|t| Recommendation::new(t.clone(), ranks.get(basename(t)).copied().unwrap_or(0.0)))
        .collect()
}

/// Targets in a seeded random order, all at the same confidence.
pub fn shuffled(targets: &[String], seed: u64) -> Vec<Recommendation> {
    let mut targets = targets.to_vec();
    targets.shuffle(&mut StdRng::seed_from_u64(seed));
    targets
        .into_iter()
        .map(|t| Recommendation::new(t, 1.0))
        .collect()
}

pub(crate) fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets() -> Vec<String> {
        ["/data/t/a.nt", "/data/t/b.nt", "/data/t/c.nt"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn order_file_assigns_descending_confidence() {
        let recs = from_order(&targets(), "c.nt\n\nfile:///elsewhere/a.nt\n");
        assert_eq!(
            recs,
            vec![
                Recommendation::new("/data/t/a.nt", 2.0),
                Recommendation::new("/data/t/b.nt", 0.0),
                Recommendation::new("/data/t/c.nt", 3.0),
            ]
        );
    }

    #[test]
    fn shuffle_is_seeded_and_uniform() {
        let a = shuffled(&targets(), 1234);
        let b = shuffled(&targets(), 1234);
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        assert!(a.iter().all(|r| r.confidence == 1.0));
    }

    #[test]
    fn reads_json_records() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("recs.json");
        fs::write(
            &path,
            r#"[{"target": "file:///t/x.nt", "confidence": 0.4}, {"target": "y.nt", "confidence": -1}]"#,
        )
        .unwrap();
        let recs = read_recommendations(&path).unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].target_name(), "x.nt");
        assert_eq!(recs[1].confidence, -1.0);
    }

    #[test]
    fn lists_directory_sorted() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("b.nt"), "").unwrap();
        fs::write(dir.path().join("a.nt"), "").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let listed = list_targets(dir.path()).unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].ends_with("a.nt"));
    }
}
