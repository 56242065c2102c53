//! Benchmark preparation: download dataset archives and unpack them.
//!
//! A benchmark may name a `links_url` (the pre-computed link files) and a
//! `targets_url` (the candidate datasets). Each archive is saved into a
//! download directory under its own file name and unpacked into the
//! directory the evaluation reads from. An archive that cannot be unpacked
//! is deleted again so a rerun downloads it fresh.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use flate2::read::GzDecoder;

use crate::config::BenchmarkConfig;
use crate::error::{FetchError, FetchResult};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Directories filled by [`prepare`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedBenchmark {
    pub links_dir: PathBuf,
    pub targets_dir: Option<PathBuf>,
}

/// Fetch the benchmark's link archive into `links_dir` and, when it has a
/// `targets_url`, its target archive into `targets_dir`.
pub fn prepare(
    bench: &BenchmarkConfig,
    links_dir: &Path,
    download_dir: &Path,
) -> FetchResult<PreparedBenchmark> {
    let links_url = bench
        .links_url
        .as_deref()
        .ok_or_else(|| missing(bench, "links_url"))?;
    fetch_and_unpack(links_url, download_dir, links_dir)?;

    let targets_dir = match &bench.targets_url {
        Some(url) => {
            let dir = bench
                .targets_dir
                .as_deref()
                .ok_or_else(|| missing(bench, "targets_dir"))?;
            fetch_and_unpack(url, download_dir, dir)?;
            Some(dir.to_path_buf())
        }
        None => None,
    };

    Ok(PreparedBenchmark {
        links_dir: links_dir.to_path_buf(),
        targets_dir,
    })
}

pub fn fetch_and_unpack(url: &str, download_dir: &Path, dest: &Path) -> FetchResult<()> {
    let archive = download(url, download_dir)?;
    unpack(&archive, dest)
}

/// Save `url` as `download_dir/<last path segment>` and return that path.
pub fn download(url: &str, download_dir: &Path) -> FetchResult<PathBuf> {
    let download_error = |message: String| FetchError::Download {
        url: url.to_string(),
        message,
    };
    let name = url
        .rsplit('/')
        .next()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| download_error("the URL does not end in a file name".into()))?;
    fs::create_dir_all(download_dir).map_err(|e| io_error(download_dir, e))?;
    let dest = download_dir.join(name);

    if let Some(path) = url.strip_prefix("file://") {
        fs::copy(path, &dest).map_err(|e| download_error(e.to_string()))?;
    } else {
        let agent = ureq::AgentBuilder::new().timeout(DOWNLOAD_TIMEOUT).build();
        let response = agent
            .get(url)
            .call()
            .map_err(|e| download_error(e.to_string()))?;
        let mut file = File::create(&dest).map_err(|e| io_error(&dest, e))?;
        if let Err(e) = io::copy(&mut response.into_reader(), &mut file) {
            let _ = fs::remove_file(&dest);
            return Err(download_error(e.to_string()));
        }
    }

    tracing::info!(url, file = %dest.display(), "downloaded archive");
    Ok(dest)
}

/// Unpack a tar archive into `dest`. Names ending in `.tar` are read as
/// plain tar, everything else as gzip-compressed tar. On failure the archive
/// is removed.
pub fn unpack(archive: &Path, dest: &Path) -> FetchResult<()> {
    fs::create_dir_all(dest).map_err(|e| io_error(dest, e))?;
    let file = File::open(archive).map_err(|e| io_error(archive, e))?;
    let reader: Box<dyn Read> = if is_plain_tar(archive) {
        Box::new(BufReader::new(file))
    } else {
        Box::new(GzDecoder::new(BufReader::new(file)))
    };

    if let Err(e) = tar::Archive::new(reader).unpack(dest) {
        if let Err(remove) = fs::remove_file(archive) {
            tracing::warn!(archive = %archive.display(), error = %remove, "could not delete broken archive");
        }
        tracing::error!(
            archive = %archive.display(),
            error = %e,
            "archive could not be unpacked, deleted it"
        );
        return Err(FetchError::Extract {
            path: archive.display().to_string(),
            message: e.to_string(),
        });
    }

    tracing::info!(archive = %archive.display(), dest = %dest.display(), "unpacked archive");
    Ok(())
}

fn is_plain_tar(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "tar")
}

fn missing(bench: &BenchmarkConfig, field: &str) -> FetchError {
    FetchError::MissingSetting {
        benchmark: bench.name.clone(),
        field: field.into(),
    }
}

fn io_error(path: &Path, source: io::Error) -> FetchError {
    FetchError::Io {
        path: path.display().to_string(),
        source,
    }
}
