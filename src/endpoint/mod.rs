//! Query endpoint side: loading datasets additively into the store the
//! oracle queries.
//!
//! Two loaders exist: [`ScriptLoader`] delegates to an external script that
//! knows how to feed a running triplestore, and [`LocalEndpoint`] is an
//! in-process oxigraph store that is both loader and SPARQL backend.

pub mod local;
pub mod script;

use std::path::Path;

use miette::Diagnostic;
use thiserror::Error;

pub use local::LocalEndpoint;
pub use script::ScriptLoader;

/// Errors while loading a dataset into the endpoint.
#[derive(Debug, Error, Diagnostic)]
pub enum LoadError {
    #[error("loader script {path} does not exist or is not executable")]
    #[diagnostic(
        code(glisten::load::script_unavailable),
        help("Set `evaluation.loader_script` to an executable script taking (directory, file name).")
    )]
    ScriptUnavailable { path: String },

    #[error("loader script exited with {status}: {stderr}")]
    #[diagnostic(
        code(glisten::load::script_failed),
        help("Run the script by hand with the same arguments to see why it failed.")
    )]
    ScriptFailed { status: String, stderr: String },

    #[error("dataset {path} does not exist")]
    #[diagnostic(
        code(glisten::load::missing_dataset),
        help("Linked datasets are expected at `<links>/<source stem>_<target name>`.")
    )]
    MissingDataset { path: String },

    #[error("failed to run loader for {path}")]
    #[diagnostic(code(glisten::load::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse dataset {path}: {message}")]
    #[diagnostic(
        code(glisten::load::parse),
        help("Datasets loaded in-process must be N-Triples.")
    )]
    Parse { path: String, message: String },
}

impl LoadError {
    /// Whether the loader itself is unusable, as opposed to one dataset.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ScriptUnavailable { .. })
    }
}

pub type LoadResult<T> = std::result::Result<T, LoadError>;

/// Adds a dataset file to the endpoint. Loads accumulate; nothing is ever
/// removed.
pub trait DatasetLoader {
    fn load(&mut self, path: &Path) -> LoadResult<()>;
}

impl<L: DatasetLoader + ?Sized> DatasetLoader for &mut L {
    fn load(&mut self, path: &Path) -> LoadResult<()> {
        (**self).load(path)
    }
}
