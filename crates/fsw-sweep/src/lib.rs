//! # fsw-sweep
//!
//! Experiment sweeps for the few-shot benchmark: a sequential hyperparameter
//! search over per-dataset configs, and a resumable benchmark sweep that
//! queues one evaluation per missing result.
//!
//! External programs are reached through the [`Launcher`] trait so a sweep
//! can run them directly, hand them to a task spooler, or only record them.

mod bench;
mod launcher;
mod report;
mod search;

pub use bench::BenchmarkSweep;
pub use launcher::{CommandLauncher, JobCommand, LaunchOutcome, Launcher, RecordingLauncher};
pub use report::{JobOutcome, JobRecord, SkipReason, SweepId, SweepKind, SweepReport, SweepSummary};
pub use search::SearchSweep;
