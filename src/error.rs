//! Diagnostic error types for glisten.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text so a failed benchmark run says exactly
//! which input was wrong. Loader and oracle errors live next to their traits
//! (`endpoint::LoadError`, `scorer::CheckError`) and are re-wrapped here.

use miette::Diagnostic;
use thiserror::Error;

use crate::endpoint::LoadError;
use crate::scorer::CheckError;

/// Top-level error type for glisten.
#[derive(Debug, Error, Diagnostic)]
pub enum GlistenError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Sampling(#[from] SamplingError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Check(#[from] CheckError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Fetch(#[from] FetchError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read {path}")]
    #[diagnostic(
        code(glisten::config::read),
        help("Ensure the file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    #[diagnostic(
        code(glisten::config::parse),
        help(
            "Check the file syntax. Benchmark configurations are TOML or JSON \
             with a `benchmarks` list; recommendation files are JSON arrays of \
             {{\"target\", \"confidence\"}} records."
        )
    )]
    Parse { path: String, message: String },

    #[error("cannot guess the format of {path} from its extension")]
    #[diagnostic(
        code(glisten::config::unknown_format),
        help("Use a `.toml` or `.json` extension for configuration files.")
    )]
    UnknownFormat { path: String },

    #[error("benchmark \"{name}\" not found")]
    #[diagnostic(
        code(glisten::config::benchmark_not_found),
        help("The configuration file has no benchmark with this name. Check the `name` fields.")
    )]
    BenchmarkNotFound { name: String },

    #[error("invalid configuration: {message}")]
    #[diagnostic(code(glisten::config::invalid), help("{message}"))]
    Invalid { message: String },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// ---------------------------------------------------------------------------
// Graph errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("failed to open graph file {path}")]
    #[diagnostic(
        code(glisten::graph::read),
        help("The source graph must be a readable N-Triples file.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("N-Triples parse error: {message}")]
    #[diagnostic(
        code(glisten::graph::parse),
        help(
            "The graph file is not valid N-Triples. Convert it first, \
             e.g. with `riot --output=nt`."
        )
    )]
    Parse { message: String },
}

pub type GraphResult<T> = std::result::Result<T, GraphError>;

// ---------------------------------------------------------------------------
// Sampling errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SamplingError {
    #[error("cannot draw from an exhausted statement pool")]
    #[diagnostic(
        code(glisten::sampling::exhausted),
        help("Check `has_more()` before drawing; pools are never refilled.")
    )]
    Exhausted,
}

pub type SamplingResult<T> = std::result::Result<T, SamplingError>;

// ---------------------------------------------------------------------------
// Evaluation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum EvalError {
    #[error("failed to load source graph {path} into the endpoint")]
    #[diagnostic(
        code(glisten::eval::source_load),
        help(
            "Without the source graph no baseline can be computed. \
             Check the loader script and that the endpoint is running."
        )
    )]
    SourceLoad {
        path: String,
        #[source]
        source: LoadError,
    },

    #[error("loader became unavailable while adding {target}")]
    #[diagnostic(
        code(glisten::eval::loader),
        help("The loader script itself is missing or not executable; the run cannot continue.")
    )]
    Loader {
        target: String,
        #[source]
        source: LoadError,
    },

    #[error("failed to write {path}")]
    #[diagnostic(
        code(glisten::eval::write),
        help("Ensure the output directory exists and is writable.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),
}

pub type EvalResult<T> = std::result::Result<T, EvalError>;

// ---------------------------------------------------------------------------
// Download and unpack errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum FetchError {
    #[error("benchmark \"{benchmark}\" sets no `{field}`")]
    #[diagnostic(
        code(glisten::fetch::missing_setting),
        help("Add the setting to the benchmark, or prepare its directories by hand.")
    )]
    MissingSetting { benchmark: String, field: String },

    #[error("failed to download {url}: {message}")]
    #[diagnostic(
        code(glisten::fetch::download),
        help("Check the URL. Local archives are given as `file:///absolute/path`.")
    )]
    Download { url: String, message: String },

    #[error("I/O error on {path}")]
    #[diagnostic(code(glisten::fetch::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot unpack archive {path}: {message}")]
    #[diagnostic(
        code(glisten::fetch::extract),
        help(
            "Archives are tar files, gzip-compressed unless the name ends in `.tar`. \
             The broken download was deleted."
        )
    )]
    Extract { path: String, message: String },
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Convenience result type for glisten operations.
pub type GlistenResult<T> = std::result::Result<T, GlistenError>;
