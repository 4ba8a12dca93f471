//! glacierflow CLI - run the glacier processing workflow.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glacierflow_core::{GlacierDirectory, Params, RgiEntity, BASE_ARTIFACT};
use glacierflow_execution::{ConsoleInteraction, Stage, TaskSet, Workflow};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "glacierflow")]
#[command(about = "Glacier directory processing workflow", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Parameter file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Working directory, overrides the parameter file
    #[arg(long, global = true)]
    working_dir: Option<PathBuf>,

    /// Fan entity tasks out over a worker pool
    #[arg(long, global = true)]
    parallel: bool,

    /// Worker pool size
    #[arg(long, global = true)]
    processes: Option<usize>,

    /// Answer yes to reset confirmations
    #[arg(short, long, global = true)]
    yes: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the glacier directories
    Init {
        /// Input records (JSON array)
        #[arg(long)]
        records: PathBuf,
        /// Delete existing directory content
        #[arg(long)]
        reset: bool,
        /// Do not ask before deleting
        #[arg(long)]
        force: bool,
    },
    /// Initialize and run every stage with stamp tasks
    Run {
        /// Input records (JSON array)
        #[arg(long)]
        records: PathBuf,
        /// Reference glacier table, overrides the parameter file
        #[arg(long)]
        reference: Option<PathBuf>,
        /// Delete existing directory content
        #[arg(long)]
        reset: bool,
        /// Do not ask before deleting
        #[arg(long)]
        force: bool,
    },
    /// Show the stage definitions
    Plan,
    /// Show which glacier directories exist
    Status {
        /// Input records (JSON array)
        #[arg(long)]
        records: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_params(cli: &Cli) -> Result<Params> {
    let mut params = match &cli.config {
        Some(path) => Params::load(path)?,
        None => Params::default(),
    };
    if let Some(dir) = &cli.working_dir {
        params.working_dir = dir.clone();
    }
    if cli.parallel {
        params.use_multiprocessing = true;
    }
    if let Some(processes) = cli.processes {
        params.mp_processes = processes;
    }
    Ok(params)
}

fn build_workflow(params: Params, assume_yes: bool) -> Result<Workflow> {
    let tasks = TaskSet::stamped(&params.working_dir);
    let interaction = ConsoleInteraction::new().assume_yes(assume_yes);
    Ok(Workflow::new(params, tasks)?.with_interaction(Box::new(interaction)))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut params = load_params(&cli)?;

    match cli.command {
        Commands::Init { records, reset, force } => {
            let entities = RgiEntity::load_all(&records)?;
            let workflow = build_workflow(params, cli.yes)?;
            let gdirs = workflow.init_glacier_regions(&entities, reset, force)?;

            println!("Glacier directories ({})", gdirs.len());
            for gdir in gdirs {
                println!("  {} | {}", gdir, gdir.dir().display());
            }
        }
        Commands::Run { records, reference, reset, force } => {
            if let Some(reference) = reference {
                params.wgms_rgi_links = Some(reference);
            }
            let entities = RgiEntity::load_all(&records)?;
            let workflow = build_workflow(params, cli.yes)?;
            let report = workflow.run_all(&entities, reset, force)?;

            let working_dir = &workflow.params().working_dir;
            std::fs::create_dir_all(working_dir)
                .with_context(|| format!("creating {}", working_dir.display()))?;
            let report_path = working_dir.join("run_report.json");
            std::fs::write(&report_path, serde_json::to_string_pretty(&report)?)
                .with_context(|| format!("writing {}", report_path.display()))?;
            info!(path = %report_path.display(), "Wrote run report");

            println!("Run {} ({} glaciers)", report.run_id, report.glaciers.len());
            for stage in &report.stages {
                println!("  {} ({} ms)", stage.stage, stage.duration().num_milliseconds());
                for step in &stage.steps {
                    println!("    {:<28} {:>5} glaciers", step.task, step.glaciers);
                }
            }
        }
        Commands::Plan => {
            for stage in Stage::all(&TaskSet::stamped(&params.working_dir)) {
                print!("{}", stage);
            }
        }
        Commands::Status { records } => {
            let entities = RgiEntity::load_all(&records)?;
            let base_dir = params.per_glacier_dir();

            println!("Glacier directories under {}", base_dir.display());
            for entity in entities {
                let id = entity.rgi_id.clone();
                let state = match GlacierDirectory::open_existing(entity, &base_dir)? {
                    None => "MISSING",
                    Some(gdir) if gdir.has_file(BASE_ARTIFACT) => "READY",
                    Some(_) => "EMPTY",
                };
                println!("  {} | {}", id, state);
            }
        }
    }

    Ok(())
}
