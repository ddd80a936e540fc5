use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Drive few-shot benchmark sweeps over the `configs/` and `results/` trees.
#[derive(Debug, Parser)]
#[command(name = "fewshot-sweep", version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: SweepCommand,
}

/// Options shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Workspace root holding `configs/` and `results/`.
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Settings YAML (interpreter, programs, queue, dataset roots).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Python interpreter; overrides settings and FEWSHOT_PYTHON.
    #[arg(long, global = true)]
    pub python: Option<String>,

    /// Queue submission program; overrides settings and FEWSHOT_QUEUE.
    #[arg(long, global = true)]
    pub queue: Option<String>,

    /// Log the commands a sweep would run without running them.
    #[arg(long, global = true, default_value_t = false)]
    pub dry_run: bool,

    /// Write the sweep report as JSON to this path.
    #[arg(long, global = true)]
    pub report: Option<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum SweepCommand {
    /// Run the hyperparameter search once per finetune config of MODEL.
    Search {
        model: String,
    },
    /// Queue benchmark evaluations for MODEL at NUM_SHOT shots.
    Bench {
        model: String,
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        num_shot: u32,
    },
    /// Write benchmark configs for every method and dataset.
    GenBench {
        model: String,
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        num_shot: u32,
    },
    /// Write finetune search configs for every dataset.
    GenSearch {
        model: String,
    },
    /// Write the miniImageNet CE pre-training config.
    GenCe,
}
