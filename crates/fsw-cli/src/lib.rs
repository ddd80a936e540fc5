// fewshot-sweep command line front end

pub mod cli;

use anyhow::Context;
use fsw_configgen::ConfigWriter;
use fsw_sweep::{
    BenchmarkSweep, CommandLauncher, Launcher, RecordingLauncher, SearchSweep, SweepReport,
};
use fsw_types::{Layout, SweepSettings};
use tracing::{debug, info, warn};

pub use cli::{Cli, GlobalArgs, SweepCommand};

/// Settings after layering the file, the environment and the CLI flags.
pub fn resolve_settings(global: &GlobalArgs) -> anyhow::Result<SweepSettings> {
    resolve_settings_with(global, |key| std::env::var(key).ok())
}

/// [`resolve_settings`] with the environment read through `lookup`.
pub fn resolve_settings_with<F>(global: &GlobalArgs, lookup: F) -> anyhow::Result<SweepSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = SweepSettings::load_with(global.config.as_deref(), lookup).with_context(|| {
        match &global.config {
            Some(path) => format!("failed to load settings from {}", path.display()),
            None => "failed to load settings".to_string(),
        }
    })?;

    if let Some(python) = &global.python {
        settings.python = python.clone();
    }
    if let Some(queue) = &global.queue {
        settings.queue_program = queue.clone();
    }
    settings.validate().context("invalid settings")?;
    Ok(settings)
}

/// Launcher for a sweep: the real one, or a recorder under `--dry-run`.
fn launcher_for(command: &SweepCommand, dry_run: bool, settings: &SweepSettings) -> Box<dyn Launcher> {
    match (command, dry_run) {
        (SweepCommand::Bench { .. }, true) => {
            Box::new(RecordingLauncher::new().with_label(&settings.queue_program))
        }
        (SweepCommand::Bench { .. }, false) => {
            Box::new(CommandLauncher::queued(&settings.queue_program))
        }
        (_, true) => Box::new(RecordingLauncher::new()),
        (_, false) => Box::new(CommandLauncher::direct()),
    }
}

/// Execute one parsed command line. Returns the sweep report for the two
/// sweep subcommands.
pub async fn run(cli: Cli) -> anyhow::Result<Option<SweepReport>> {
    let settings = resolve_settings(&cli.global)?;
    let layout = Layout::new(&cli.global.root);

    let report = match &cli.command {
        SweepCommand::Search { model } => {
            let launcher = launcher_for(&cli.command, cli.global.dry_run, &settings);
            let report = SearchSweep::new(&layout, &settings, &*launcher)
                .run(model)
                .await
                .with_context(|| format!("search sweep for {} failed", model))?;
            Some(report)
        }
        SweepCommand::Bench { model, num_shot } => {
            let launcher = launcher_for(&cli.command, cli.global.dry_run, &settings);
            let report = BenchmarkSweep::new(&layout, &settings, &*launcher)
                .run(model, *num_shot)
                .await
                .with_context(|| format!("benchmark sweep for {} ({}-shot) failed", model, num_shot))?;
            Some(report)
        }
        SweepCommand::GenBench { model, num_shot } => {
            ConfigWriter::new(&layout, &settings)
                .write_benchmark(model, *num_shot)
                .with_context(|| format!("generating benchmark configs for {}", model))?;
            None
        }
        SweepCommand::GenSearch { model } => {
            ConfigWriter::new(&layout, &settings)
                .write_search(model)
                .with_context(|| format!("generating search configs for {}", model))?;
            None
        }
        SweepCommand::GenCe => {
            ConfigWriter::new(&layout, &settings)
                .write_ce()
                .context("generating the CE training config")?;
            None
        }
    };

    if let Some(report) = &report {
        let summary = report.summary();
        info!(
            "Sweep {} finished: {} launched ({} ok, {} failed), {} missing config, {} already done",
            report.id,
            summary.launched,
            summary.succeeded,
            summary.failed,
            summary.skipped_missing_config,
            summary.skipped_existing_result,
        );
        for command in report.launched_commands() {
            debug!("Launched: {}", command);
        }
        if let Some(path) = &cli.global.report {
            report
                .write_json(path)
                .with_context(|| format!("writing report to {}", path.display()))?;
            info!("Report written to {}", path.display());
        }
    } else if cli.global.report.is_some() {
        warn!("--report only applies to search and bench");
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use fsw_sweep::JobOutcome;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("fewshot-sweep").chain(args.iter().copied())).unwrap()
    }

    #[tokio::test]
    async fn test_generate_then_dry_run_bench() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap();

        run(parse(&["gen-bench", "clip", "5", "--root", root])).await.unwrap();
        let report = run(parse(&["bench", "clip", "5", "--root", root, "--dry-run", "--queue", "tsp"]))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.summary().launched, 36);
        assert_eq!(report.launcher, "dry-run:tsp");
    }

    #[tokio::test]
    async fn test_dry_run_search_over_generated_configs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap();

        run(parse(&["gen-search", "dinov2", "--root", root])).await.unwrap();
        let report = run(parse(&["search", "dinov2", "--root", root, "--dry-run"]))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.jobs.len(), 9);
        assert!(report
            .jobs
            .iter()
            .all(|j| matches!(j.outcome, JobOutcome::Launched(_)) && j.label.ends_with("_dinov2")));
    }

    #[tokio::test]
    async fn test_search_with_missing_directory_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap();

        let report = run(parse(&["search", "clip", "--root", root, "--dry-run"]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.missing_dirs.len(), 1);
        assert!(report.jobs.is_empty());
    }

    #[tokio::test]
    async fn test_report_written_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap();
        let report_path = dir.path().join("out").join("report.json");

        run(parse(&[
            "bench",
            "clip",
            "10",
            "--root",
            root,
            "--dry-run",
            "--report",
            report_path.to_str().unwrap(),
        ]))
        .await
        .unwrap();

        let back: SweepReport =
            serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
        assert_eq!(back.model, "clip");
        assert_eq!(back.shot, Some(10));
        assert_eq!(back.missing_dirs.len(), 4);
    }

    #[tokio::test]
    async fn test_unknown_backbone_fails_generation() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap();

        let err = run(parse(&["gen-search", "resnet12", "--root", root])).await.unwrap_err();
        assert!(format!("{err:#}").contains("model not found"));
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_cli_flags_override_settings() {
        let cli = parse(&["bench", "clip", "1", "--python", "python3", "--queue", "ts"]);
        let settings = resolve_settings_with(&cli.global, |key| match key {
            fsw_types::ENV_PYTHON => Some("/opt/venv/bin/python".to_string()),
            fsw_types::ENV_QUEUE => Some("sbatch".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(settings.python, "python3");
        assert_eq!(settings.queue_program, "ts");
    }

    #[test]
    fn test_environment_overrides_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweep.yaml");
        std::fs::write(&path, "python: python3.10\nqueue_program: ts\n").unwrap();

        let cli = parse(&["bench", "clip", "1", "--config", path.to_str().unwrap()]);
        let settings = resolve_settings_with(&cli.global, |key| match key {
            fsw_types::ENV_PYTHON => Some("/opt/venv/bin/python".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(settings.python, "/opt/venv/bin/python");
        assert_eq!(settings.queue_program, "ts");
    }

    #[test]
    fn test_settings_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweep.yaml");
        std::fs::write(&path, "eval_program: run_eval.py\n").unwrap();

        let cli = parse(&["bench", "clip", "1", "--config", path.to_str().unwrap()]);
        let settings = resolve_settings_with(&cli.global, no_env).unwrap();
        assert_eq!(settings.eval_program, "run_eval.py");
        assert_eq!(settings.python, "python");
    }

    #[tokio::test]
    async fn test_gen_ce_writes_training_config() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap();

        let report = run(parse(&["gen-ce", "--root", root])).await.unwrap();
        assert!(report.is_none());
        assert!(Layout::new(dir.path()).ce_config().is_file());
    }
}
