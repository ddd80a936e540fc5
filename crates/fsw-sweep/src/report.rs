//! Sweep bookkeeping: one record per visited experiment.

use chrono::{DateTime, Utc};
use fsw_types::SweepResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::launcher::{JobCommand, LaunchOutcome};

/// Unique sweep run identifier.
pub type SweepId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SweepKind {
    /// Hyperparameter search over `configs/search/exps/<model>_wr/finetune/`.
    Search,
    /// Benchmark evaluation over methods x datasets.
    Benchmark,
}

/// Why an experiment was not launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    ConfigMissing,
    ResultExists,
}

/// What happened to one experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JobOutcome {
    /// The launcher ran (direct) or queued (benchmark) the job.
    Launched(LaunchOutcome),
    Skipped(SkipReason),
    /// The launcher could not start the command at all.
    LaunchFailed { error: String },
}

/// A single visited experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// `<shot>-shot/<model>/<method>/<dataset>` or the search tag.
    pub label: String,
    pub config: PathBuf,
    pub result: Option<PathBuf>,
    pub command: Option<JobCommand>,
    pub outcome: JobOutcome,
    pub recorded_at: DateTime<Utc>,
}

/// Aggregate counts over a sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepSummary {
    pub launched: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped_missing_config: usize,
    pub skipped_existing_result: usize,
    pub missing_dirs: usize,
}

/// Full account of one driver invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub id: SweepId,
    pub kind: SweepKind,
    pub model: String,
    pub shot: Option<u32>,
    pub launcher: String,
    /// Directories the sweep expected but did not find.
    pub missing_dirs: Vec<PathBuf>,
    pub jobs: Vec<JobRecord>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SweepReport {
    pub fn new(kind: SweepKind, model: &str, shot: Option<u32>, launcher: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            model: model.to_string(),
            shot,
            launcher: launcher.to_string(),
            missing_dirs: Vec::new(),
            jobs: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn record_missing_dir(&mut self, dir: PathBuf) {
        self.missing_dirs.push(dir);
    }

    pub fn record(
        &mut self,
        label: String,
        config: PathBuf,
        result: Option<PathBuf>,
        command: Option<JobCommand>,
        outcome: JobOutcome,
    ) {
        self.jobs.push(JobRecord {
            label,
            config,
            result,
            command,
            outcome,
            recorded_at: Utc::now(),
        });
    }

    pub fn mark_finished(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Commands that reached the launcher, in order.
    pub fn launched_commands(&self) -> Vec<&JobCommand> {
        self.jobs
            .iter()
            .filter(|j| matches!(j.outcome, JobOutcome::Launched(_)))
            .filter_map(|j| j.command.as_ref())
            .collect()
    }

    pub fn summary(&self) -> SweepSummary {
        let mut summary = SweepSummary {
            missing_dirs: self.missing_dirs.len(),
            ..SweepSummary::default()
        };
        for job in &self.jobs {
            match &job.outcome {
                JobOutcome::Launched(outcome) => {
                    summary.launched += 1;
                    if outcome.success {
                        summary.succeeded += 1;
                    } else {
                        summary.failed += 1;
                    }
                }
                JobOutcome::LaunchFailed { .. } => summary.failed += 1,
                JobOutcome::Skipped(SkipReason::ConfigMissing) => {
                    summary.skipped_missing_config += 1
                }
                JobOutcome::Skipped(SkipReason::ResultExists) => {
                    summary.skipped_existing_result += 1
                }
            }
        }
        summary
    }

    pub fn to_json(&self) -> SweepResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> SweepResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
