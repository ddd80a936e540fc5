//! Benchmark evaluation sweep: methods x datasets for one (model, shot).
//!
//! A result file on disk marks an experiment as done. The check and the
//! submission are not atomic, so two concurrent sweeps over the same tree can
//! both submit the same experiment.

use fsw_types::{Dataset, ExperimentId, Layout, LayoutError, Method, SweepResult, SweepSettings};
use tracing::{debug, info, warn};

use crate::launcher::{JobCommand, Launcher};
use crate::report::{JobOutcome, SkipReason, SweepKind, SweepReport};

/// Submits `main.py` evaluations for every experiment that has a config and
/// no result yet.
pub struct BenchmarkSweep<'a> {
    layout: &'a Layout,
    settings: &'a SweepSettings,
    launcher: &'a dyn Launcher,
}

impl<'a> BenchmarkSweep<'a> {
    pub fn new(layout: &'a Layout, settings: &'a SweepSettings, launcher: &'a dyn Launcher) -> Self {
        Self {
            layout,
            settings,
            launcher,
        }
    }

    /// Evaluation command for one experiment. It runs in the layout root, so
    /// both paths are passed relative to it.
    pub fn job_for(&self, id: &ExperimentId) -> JobCommand {
        let config = self.layout.benchmark_config(id);
        let result = self.layout.benchmark_result(id);
        JobCommand::new(self.settings.python.as_str())
            .arg(self.settings.eval_program.as_str())
            .arg("--cfg")
            .arg(self.layout.root_relative(&config).to_string_lossy())
            .arg("--save-stats")
            .arg(self.layout.root_relative(&result).to_string_lossy())
            .in_dir(&self.layout.root)
    }

    pub async fn run(&self, model: &str, shot: u32) -> SweepResult<SweepReport> {
        let mut report =
            SweepReport::new(SweepKind::Benchmark, model, Some(shot), self.launcher.name());

        for method in Method::ALL {
            let method_dir = self.layout.benchmark_config_dir(model, shot, method);
            if !method_dir.is_dir() {
                debug!("No configs for {} at {}", method, method_dir.display());
                report.record_missing_dir(method_dir);
                continue;
            }

            for dataset in Dataset::ALL {
                let id = ExperimentId::new(model, method, dataset, shot);
                self.submit_or_skip(&id, &mut report).await?;
            }
        }

        report.mark_finished();
        Ok(report)
    }

    /// Skip when the config is missing or the result exists; otherwise create
    /// the result directory and hand the job to the launcher.
    pub async fn submit_or_skip(&self, id: &ExperimentId, report: &mut SweepReport) -> SweepResult<()> {
        let config = self.layout.benchmark_config(id);
        let result = self.layout.benchmark_result(id);

        if !config.exists() {
            info!("{} does not exist", config.display());
            report.record(
                id.to_string(),
                config,
                Some(result),
                None,
                JobOutcome::Skipped(SkipReason::ConfigMissing),
            );
            return Ok(());
        }

        if result.exists() {
            info!("{} already exists", result.display());
            if std::fs::metadata(&result).map(|m| m.len() == 0).unwrap_or(false) {
                warn!("{} is empty but still counts as done", result.display());
            }
            report.record(
                id.to_string(),
                config,
                Some(result),
                None,
                JobOutcome::Skipped(SkipReason::ResultExists),
            );
            return Ok(());
        }

        let result_dir = self.layout.benchmark_result_dir(&id.model, id.shot, id.method);
        std::fs::create_dir_all(&result_dir).map_err(|source| LayoutError::CreateDirFailed {
            path: result_dir.clone(),
            source,
        })?;

        let job = self.job_for(id);
        info!("Submitting {}", id);
        let outcome = match self.launcher.launch(&job).await {
            Ok(outcome) => {
                if !outcome.success {
                    warn!("Submission of {} exited with status {:?}", id, outcome.exit_code);
                }
                JobOutcome::Launched(outcome)
            }
            Err(e) => {
                warn!("Submission of {} failed: {}", id, e);
                JobOutcome::LaunchFailed {
                    error: e.to_string(),
                }
            }
        };
        report.record(id.to_string(), config, Some(result), Some(job), outcome);
        Ok(())
    }
}
