//! Launcher abstraction for running or queueing external jobs.

use async_trait::async_trait;
use fsw_types::{LaunchError, SweepResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

/// One external command line, e.g. `python main.py --cfg ... --save-stats ...`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Directory the command runs in; inherits the caller's when `None`.
    pub working_dir: Option<PathBuf>,
}

impl JobCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Value following `flag`, if present.
    pub fn flag_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }
}

impl fmt::Display for JobCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// What came back from a launch that did start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchOutcome {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub success: bool,
}

impl LaunchOutcome {
    pub fn from_code(code: i32) -> Self {
        Self {
            exit_code: Some(code),
            success: code == 0,
        }
    }
}

/// Core launcher interface.
///
/// A launcher either runs the command to completion or hands it to a queue;
/// in both cases `launch` returns once the local process it started exits.
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(&self, job: &JobCommand) -> SweepResult<LaunchOutcome>;

    /// Human-readable launcher name used in logs.
    fn name(&self) -> &str;
}

/// Runs jobs as child processes, optionally behind a prefix such as `tsp`.
#[derive(Debug, Clone)]
pub struct CommandLauncher {
    prefix: Vec<String>,
    name: String,
}

impl CommandLauncher {
    /// Spawn the job itself and wait for it to exit.
    pub fn direct() -> Self {
        Self {
            prefix: Vec::new(),
            name: "direct".to_string(),
        }
    }

    /// Submit through `queue_program`; returns once the job is queued.
    pub fn queued(queue_program: &str) -> Self {
        Self {
            prefix: vec![queue_program.to_string()],
            name: format!("queue:{}", queue_program),
        }
    }

    /// Full argv handed to the OS.
    pub fn command_line(&self, job: &JobCommand) -> Vec<String> {
        let mut argv = self.prefix.clone();
        argv.push(job.program.clone());
        argv.extend(job.args.iter().cloned());
        argv
    }
}

#[async_trait]
impl Launcher for CommandLauncher {
    async fn launch(&self, job: &JobCommand) -> SweepResult<LaunchOutcome> {
        let argv = self.command_line(job);
        let (program, args) = argv.split_first().ok_or(LaunchError::EmptyCommand)?;
        if program.is_empty() {
            return Err(LaunchError::EmptyCommand.into());
        }

        let mut command = tokio::process::Command::new(program);
        command.args(args);
        if let Some(dir) = &job.working_dir {
            command.current_dir(dir);
        }

        debug!("Spawning {}", argv.join(" "));
        let mut child = command.spawn().map_err(|e| LaunchError::SpawnFailed {
            program: program.clone(),
            message: e.to_string(),
        })?;
        let status = child.wait().await.map_err(|e| LaunchError::WaitFailed {
            program: program.clone(),
            message: e.to_string(),
        })?;

        Ok(LaunchOutcome {
            exit_code: status.code(),
            success: status.success(),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Records jobs instead of running them. Backs `--dry-run` and the tests.
#[derive(Debug)]
pub struct RecordingLauncher {
    label: String,
    exit_code: i32,
    launches: Mutex<Vec<JobCommand>>,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self {
            label: "dry-run".to_string(),
            exit_code: 0,
            launches: Mutex::new(Vec::new()),
        }
    }

    /// Label shown in front of each recorded command, e.g. the queue program.
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = format!("dry-run:{}", label);
        self
    }

    /// Pretend every job exits with `code`.
    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    pub fn launches(&self) -> Vec<JobCommand> {
        self.launches.lock().clone()
    }

    pub fn launch_count(&self) -> usize {
        self.launches.lock().len()
    }
}

impl Default for RecordingLauncher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Launcher for RecordingLauncher {
    async fn launch(&self, job: &JobCommand) -> SweepResult<LaunchOutcome> {
        info!("[{}] {}", self.label, job);
        self.launches.lock().push(job.clone());
        Ok(LaunchOutcome::from_code(self.exit_code))
    }

    fn name(&self) -> &str {
        &self.label
    }
}
