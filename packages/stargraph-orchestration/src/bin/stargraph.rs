//! Stargraph CLI
//!
//! Labels every node of an undirected graph with the smallest node id of its
//! connected component.
//!
//! # Usage
//!
//! ```bash
//! # Components of an edge list (one "u v" pair per line)
//! stargraph run data/edges out/components
//!
//! # Replace a previous result and keep the round statistics
//! stargraph run data/edges out/components --overwrite --report report.json
//!
//! # Count input records
//! stargraph count data/edges
//! ```

use clap::{Parser, Subcommand};
use stargraph_dataflow::{with_engine, EngineConfig};
use stargraph_orchestration::{
    count_input_records, JobConfig, Orchestrator, Result,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stargraph")]
#[command(about = "Connected components by large-star / small-star contraction", long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the node → representative mapping
    Run {
        /// Edge list file or directory
        input: PathBuf,

        /// Output directory
        output: PathBuf,

        /// Replace the output directory if it exists
        #[arg(long)]
        overwrite: bool,

        /// YAML job configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Worker threads
        #[arg(long)]
        workers: Option<usize>,

        /// Partitions per dataset
        #[arg(long)]
        partitions: Option<usize>,

        /// Fail if no fixed point is reached within this many rounds
        #[arg(long)]
        max_rounds: Option<usize>,

        /// Write the job report as JSON
        #[arg(long)]
        report: Option<PathBuf>,

        /// Skip the oriented-down check after each small-star
        #[arg(long)]
        no_check_invariants: bool,
    },

    /// Print the number of records in the input
    Count {
        /// Edge list file or directory
        input: PathBuf,

        /// Worker threads
        #[arg(long)]
        workers: Option<usize>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let outcome = match cli.command {
        Commands::Run {
            input,
            output,
            overwrite,
            config,
            workers,
            partitions,
            max_rounds,
            report,
            no_check_invariants,
        } => load_config(config)
            .map(|base| {
                let engine = engine_overrides(base.engine.clone(), workers, partitions);
                let mut job = base
                    .with_input(input)
                    .with_output(output)
                    .with_engine(engine);
                if overwrite {
                    job = job.with_overwrite(true);
                }
                if let Some(max_rounds) = max_rounds {
                    job = job.with_max_rounds(max_rounds);
                }
                if no_check_invariants {
                    job = job.with_invariant_checks(false);
                }
                job
            })
            .and_then(|job| run(job, report)),
        Commands::Count { input, workers } => count(input, workers),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("stargraph: {} failed: {}", e.stage(), e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<JobConfig> {
    match path {
        Some(path) => Ok(JobConfig::from_yaml_file(path)?),
        None => Ok(JobConfig::default()),
    }
}

fn engine_overrides(
    mut engine: EngineConfig,
    workers: Option<usize>,
    partitions: Option<usize>,
) -> EngineConfig {
    if let Some(workers) = workers {
        engine = engine.with_workers(workers);
    }
    if let Some(partitions) = partitions {
        engine = engine.with_partitions(partitions);
    }
    engine
}

fn run(job: JobConfig, report_path: Option<PathBuf>) -> Result<()> {
    job.validate()?;
    let engine_config = job.engine.clone();

    let report = with_engine(engine_config, |engine| {
        Orchestrator::new(engine, job)?.execute()
    })??;

    if let Some(path) = report_path {
        report.write_json(&path)?;
    }

    println!(
        "{} nodes in {} components after {} rounds, written to {}",
        report.nodes,
        report.components,
        report.round_count(),
        report.output_location.display()
    );
    Ok(())
}

fn count(input: PathBuf, workers: Option<usize>) -> Result<()> {
    let engine_config = engine_overrides(EngineConfig::default(), workers, None);
    let records = with_engine(engine_config, |engine| count_input_records(engine, &input))??;

    println!("Count of objects is {}", records);
    Ok(())
}
