//! Hyperparameter-search sweep over the finetune configs of one model.

use fsw_types::{search_tag, Layout, LayoutError, SweepResult, SweepSettings};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::launcher::{JobCommand, Launcher};
use crate::report::{JobOutcome, SweepKind, SweepReport};

/// Runs `search_hyperparameter.py` once per YAML file, sequentially.
pub struct SearchSweep<'a> {
    layout: &'a Layout,
    settings: &'a SweepSettings,
    launcher: &'a dyn Launcher,
}

impl<'a> SearchSweep<'a> {
    pub fn new(layout: &'a Layout, settings: &'a SweepSettings, launcher: &'a dyn Launcher) -> Self {
        Self {
            layout,
            settings,
            launcher,
        }
    }

    /// YAML files in the model's search directory, sorted by name.
    ///
    /// Returns `None` when the directory does not exist.
    pub fn discover(&self, model: &str) -> SweepResult<Option<Vec<PathBuf>>> {
        let dir = self.layout.search_config_dir(model);
        if !dir.is_dir() {
            return Ok(None);
        }

        let entries = std::fs::read_dir(&dir).map_err(|source| LayoutError::ListFailed {
            path: dir.clone(),
            source,
        })?;

        let mut configs = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|source| LayoutError::ListFailed {
                    path: dir.clone(),
                    source,
                })?
                .path();
            let visible = path
                .file_name()
                .and_then(|s| s.to_str())
                .map(|s| !s.starts_with('.'))
                .unwrap_or(false);
            let is_yaml = path.extension().and_then(|s| s.to_str()) == Some("yaml");
            if visible && is_yaml && path.is_file() {
                configs.push(path);
            }
        }
        configs.sort();
        Ok(Some(configs))
    }

    /// Tag and command for one config file. The command runs in the layout
    /// root and receives the config path relative to it.
    pub fn job_for(&self, config: &Path, model: &str) -> SweepResult<(String, JobCommand)> {
        let stem = config
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| LayoutError::NoStem {
                path: config.to_path_buf(),
            })?;
        let tag = search_tag(stem, model);

        let job = JobCommand::new(self.settings.python.as_str())
            .arg(self.settings.search_program.as_str())
            .arg("--cfg")
            .arg(self.layout.root_relative(config).to_string_lossy())
            .arg("--tag")
            .arg(tag.as_str())
            .in_dir(&self.layout.root);
        Ok((tag, job))
    }

    pub async fn run(&self, model: &str) -> SweepResult<SweepReport> {
        let mut report = SweepReport::new(SweepKind::Search, model, None, self.launcher.name());

        let configs = match self.discover(model)? {
            Some(configs) => configs,
            None => {
                let dir = self.layout.search_config_dir(model);
                warn!("Directory {} does not exist", dir.display());
                report.record_missing_dir(dir);
                report.mark_finished();
                return Ok(report);
            }
        };

        if configs.is_empty() {
            info!(
                "No search configs found in {}",
                self.layout.search_config_dir(model).display()
            );
        }

        for config in configs {
            let (tag, job) = self.job_for(&config, model)?;
            info!("Searching hyperparameters for {}", tag);

            let outcome = match self.launcher.launch(&job).await {
                Ok(outcome) => {
                    if !outcome.success {
                        warn!("Search for {} exited with status {:?}", tag, outcome.exit_code);
                    }
                    JobOutcome::Launched(outcome)
                }
                Err(e) => {
                    warn!("Search for {} could not be launched: {}", tag, e);
                    JobOutcome::LaunchFailed {
                        error: e.to_string(),
                    }
                }
            };
            report.record(tag, config, None, Some(job), outcome);
        }

        report.mark_finished();
        Ok(report)
    }
}
