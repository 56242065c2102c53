//! glisten CLI: benchmark dataset recommendations against a source graph.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use glisten::config::{BenchmarkConfig, Configurations, ScorerSettings};
use glisten::endpoint::{LocalEndpoint, ScriptLoader};
use glisten::error::{ConfigError, GlistenResult};
use glisten::eval::{self, CoreEvaluator, EvaluationParameters, EvaluationReport, Recommendation};
use glisten::eval::recommend;
use glisten::fetch;
use glisten::graph::SourceGraph;
use glisten::scorer::{CheckerScorer, HttpSparql, PathEvidenceChecker};

#[derive(Parser)]
#[command(name = "glisten", version, about = "Benchmark for dataset recommendation systems")]
struct Cli {
    /// Benchmark configuration file (.toml or .json).
    #[arg(long, global = true, default_value = "glisten.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate recommendations for one source of a benchmark.
    Evaluate {
        /// Benchmark name from the configuration file.
        #[arg(long)]
        benchmark: String,

        /// Source graph (defaults to the benchmark's first source).
        #[arg(long)]
        source: Option<PathBuf>,

        /// JSON file of {"target", "confidence"} records.
        #[arg(long, conflicts_with_all = ["targets", "order_file"])]
        recommendations: Option<PathBuf>,

        /// Directory of target datasets (overrides the benchmark's).
        #[arg(long)]
        targets: Option<PathBuf>,

        /// Order of the targets, one name per line, best first.
        /// Without it targets are shuffled with the run seed.
        #[arg(long)]
        order_file: Option<PathBuf>,

        /// Use an in-process store instead of the SPARQL endpoint and loader script.
        #[arg(long)]
        local: bool,

        /// Override the SPARQL endpoint URL.
        #[arg(long)]
        endpoint: Option<String>,

        /// Write the full report as JSON.
        #[arg(long)]
        report: Option<PathBuf>,

        /// Write the ROC points as JSON.
        #[arg(long)]
        curve: Option<PathBuf>,
    },

    /// Download and unpack a benchmark's link (and target) archives.
    Init {
        #[arg(long)]
        benchmark: String,

        /// Directory the archives are saved into before unpacking.
        #[arg(long, default_value = "downloads")]
        downloads: PathBuf,
    },

    /// Print the labeled fact set generated for a source.
    Facts {
        #[arg(long)]
        benchmark: String,

        #[arg(long)]
        source: Option<PathBuf>,
    },

    /// Print per-relation edge counts of a graph.
    Histogram {
        /// N-Triples file.
        graph: PathBuf,

        /// Only show the most frequent relations.
        #[arg(long)]
        top: Option<usize>,
    },

    /// Evaluate every source of a benchmark in parallel on in-process stores.
    RunAll {
        #[arg(long)]
        benchmark: String,

        #[arg(long)]
        targets: Option<PathBuf>,

        #[arg(long)]
        order_file: Option<PathBuf>,

        /// Directory to write one JSON report per source into.
        #[arg(long)]
        reports: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Evaluate {
            benchmark,
            source,
            recommendations,
            targets,
            order_file,
            local,
            endpoint,
            report,
            curve,
        } => {
            let config = Configurations::load(&cli.config)?;
            let bench = config.find(&benchmark)?;
            let params = config.parameters_for(bench);
            let source = pick_source(bench, source)?;

            let recs = match recommendations {
                Some(path) => recommend::read_recommendations(&path)?,
                None => targets_as_recommendations(
                    bench,
                    &params,
                    targets.as_deref(),
                    order_file.as_deref(),
                )?,
            };

            let namespaces = config.namespaces_for(bench);
            let result = if local {
                let store = LocalEndpoint::new()?;
                let checker = PathEvidenceChecker::new(store.clone()).with_namespaces(namespaces);
                let scorer = CheckerScorer::new(checker)
                    .with_retries(config.scorer.retries)
                    .with_deadline(config.scorer.deadline());
                CoreEvaluator::new(params, store, scorer)
                    .with_rules(bench.rules())
                    .evaluate(&source, &recs)?
            } else {
                let loader = ScriptLoader::new(&params.loader_script)?;
                let url = endpoint.unwrap_or_else(|| config.scorer.endpoint.clone());
                let checker = PathEvidenceChecker::new(HttpSparql::new(url, config.scorer.timeout_secs))
                    .with_namespaces(namespaces);
                let scorer = CheckerScorer::new(checker)
                    .with_retries(config.scorer.retries)
                    .with_deadline(config.scorer.deadline());
                CoreEvaluator::new(params, loader, scorer)
                    .with_rules(bench.rules())
                    .evaluate(&source, &recs)?
            };

            print_report(&result);
            if let Some(path) = report {
                result.write_json(&path)?;
            }
            if let Some(path) = curve {
                result.write_curve_json(&path)?;
            }
        }

        Commands::Init {
            benchmark,
            downloads,
        } => {
            let config = Configurations::load(&cli.config)?;
            let bench = config.find(&benchmark)?;
            let params = config.parameters_for(bench);
            let prepared = fetch::prepare(bench, &params.links_dir, &downloads)?;
            println!("links:   {}", prepared.links_dir.display());
            if let Some(targets) = prepared.targets_dir {
                println!("targets: {}", targets.display());
            }
        }

        Commands::Facts { benchmark, source } => {
            let config = Configurations::load(&cli.config)?;
            let bench = config.find(&benchmark)?;
            let source = pick_source(bench, source)?;
            let graph = SourceGraph::from_ntriples_file(&source)?;
            let facts = eval::fact_set(&graph, &config.parameters_for(bench), &bench.rules());
            for lf in facts.iter() {
                println!("{} # {}", lf.fact, lf.label);
            }
            eprintln!(
                "{} true / {} false (requested {} / {})",
                facts.true_count(),
                facts.false_count(),
                facts.requested_true,
                facts.requested_false
            );
        }

        Commands::Histogram { graph, top } => {
            let graph = SourceGraph::from_ntriples_file(&graph)?;
            let histogram = graph.histogram();
            let shown = top.unwrap_or(histogram.len());
            for (relation, count) in histogram.iter().take(shown) {
                println!("{count:>10}  {relation}");
            }
            println!("{:>10}  total edges in {} relations", graph.len(), histogram.len());
        }

        Commands::RunAll {
            benchmark,
            targets,
            order_file,
            reports,
        } => {
            let config = Configurations::load(&cli.config)?;
            let bench = config.find(&benchmark)?;
            let params = config.parameters_for(bench);
            let recs = targets_as_recommendations(
                bench,
                &params,
                targets.as_deref(),
                order_file.as_deref(),
            )?;
            if let Some(dir) = &reports {
                std::fs::create_dir_all(dir).into_diagnostic()?;
            }

            let oracle = ScorerSettings {
                namespaces: config.namespaces_for(bench),
                ..config.scorer.clone()
            };
            let results = eval::evaluate_local_batch(
                &params,
                &bench.rules(),
                &oracle,
                &bench.sources,
                |_| recs.clone(),
            );

            let mut failed = 0;
            for (source, result) in results {
                match result {
                    Ok(report) => {
                        println!("{:.4}  {}", report.auc, source.display());
                        if let Some(dir) = &reports {
                            let name = source
                                .file_stem()
                                .map(|s| s.to_string_lossy().into_owned())
                                .unwrap_or_else(|| "report".into());
                            report.write_json(&dir.join(format!("{name}.json")))?;
                        }
                    }
                    Err(e) => {
                        failed += 1;
                        tracing::error!(source = %source.display(), error = %e, "evaluation failed");
                    }
                }
            }
            if failed > 0 {
                miette::bail!("{failed} of {} sources failed", bench.sources.len());
            }
        }
    }

    Ok(())
}

fn pick_source(bench: &BenchmarkConfig, source: Option<PathBuf>) -> GlistenResult<PathBuf> {
    match source {
        Some(path) => Ok(path),
        None => bench.sources.first().cloned().ok_or_else(|| {
            ConfigError::Invalid {
                message: format!("benchmark \"{}\" lists no sources", bench.name),
            }
            .into()
        }),
    }
}

/// Recommendations from a targets directory, ordered by the order file or
/// shuffled with the run seed.
fn targets_as_recommendations(
    bench: &BenchmarkConfig,
    params: &EvaluationParameters,
    targets: Option<&Path>,
    order_file: Option<&Path>,
) -> GlistenResult<Vec<Recommendation>> {
    let dir = targets
        .or(bench.targets_dir.as_deref())
        .ok_or_else(|| ConfigError::Invalid {
            message: format!(
                "benchmark \"{}\" has no targets_dir; pass --targets or --recommendations",
                bench.name
            ),
        })?;
    let targets = recommend::list_targets(dir)?;
    match order_file {
        Some(path) => {
            let order = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
                path: path.display().to_string(),
                source: e,
            })?;
            Ok(recommend::from_order(&targets, &order))
        }
        None => Ok(recommend::shuffled(&targets, params.seed)),
    }
}

fn print_report(report: &EvaluationReport) {
    println!("source:   {}", report.source);
    println!(
        "facts:    {} true / {} false (requested {} / {})",
        report.true_facts, report.false_facts, report.requested_true, report.requested_false
    );
    println!("baseline: {:.4}", report.baseline);
    for step in &report.steps {
        let score = step
            .score
            .map(|s| format!("{s:.4}"))
            .unwrap_or_else(|| "n/a".into());
        println!("  {:<5} {score:>8}  {}", step.direction.to_string(), step.target);
    }
    println!("AUC:      {:.4}", report.auc);
}
