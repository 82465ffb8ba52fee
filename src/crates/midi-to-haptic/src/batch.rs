use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use haptic_core::{HapticExtractor, HapticPattern};
use rayon::prelude::*;
use serde::Serialize;

use crate::catalog::{BatchJob, JobSource};
use crate::error::{ProcessError, Result};
use crate::midi::MidiData;
use crate::output::PatternWriter;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// Nothing survived filtering and deduplication.
    NoEvents,
    MissingInput { expected: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoEvents => write!(f, "no low-register notes"),
            SkipReason::MissingInput { expected } => write!(f, "input not found: {}", expected),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    Written {
        track_id: String,
        path: PathBuf,
        total_events: usize,
    },
    Skipped {
        track_id: String,
        #[serde(flatten)]
        reason: SkipReason,
    },
    Failed {
        track_id: String,
        source: PathBuf,
        error: String,
    },
}

impl JobOutcome {
    pub fn track_id(&self) -> &str {
        match self {
            JobOutcome::Written { track_id, .. }
            | JobOutcome::Skipped { track_id, .. }
            | JobOutcome::Failed { track_id, .. } => track_id,
        }
    }
}

/// Per-job outcomes in job order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub outcomes: Vec<JobOutcome>,
}

impl BatchReport {
    pub fn written(&self) -> usize {
        self.count(|o| matches!(o, JobOutcome::Written { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, JobOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, JobOutcome::Failed { .. }))
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    fn count<F: Fn(&JobOutcome) -> bool>(&self, predicate: F) -> usize {
        self.outcomes.iter().filter(|o| predicate(o)).count()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} written, {} skipped, {} failed ({} total)",
            self.written(),
            self.skipped(),
            self.failed(),
            self.outcomes.len()
        )
    }
}

/// Runs independent jobs on a fixed-size worker pool.
pub struct BatchRunner {
    writer: PatternWriter,
    workers: usize,
}

impl BatchRunner {
    pub fn new(writer: PatternWriter) -> Self {
        let workers = std::thread::available_parallelism().map_or(1, |n| n.get());
        Self { writer, workers }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn run(&self, jobs: &[BatchJob]) -> Result<BatchReport> {
        self.writer.ensure_output_dir()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()?;

        log::info!(
            "processing {} job(s) on {} worker(s) into {}",
            jobs.len(),
            self.workers,
            self.writer.output_dir().display()
        );

        let claimed_by = first_claims(jobs);
        let outcomes = pool.install(|| {
            jobs.par_iter()
                .enumerate()
                .map(|(i, job)| match claimed_by[i] {
                    Some(first) => duplicate_outcome(job, &jobs[first]),
                    None => run_job(job, &self.writer),
                })
                .collect()
        });

        let report = BatchReport { outcomes };
        log::info!("batch finished: {}", report.summary());
        Ok(report)
    }
}

/// For each job, the index of an earlier job with the same track id.
///
/// Both would write the same `<track_id>.json`; only the first one runs.
fn first_claims(jobs: &[BatchJob]) -> Vec<Option<usize>> {
    let mut owners: HashMap<&str, usize> = HashMap::new();
    jobs.iter()
        .enumerate()
        .map(|(i, job)| {
            let first = *owners.entry(job.track_id.as_str()).or_insert(i);
            (first != i).then_some(first)
        })
        .collect()
}

fn source_path(source: &JobSource) -> PathBuf {
    match source {
        JobSource::Found(path) => path.clone(),
        JobSource::Missing { expected } => PathBuf::from(expected),
    }
}

fn duplicate_outcome(job: &BatchJob, first: &BatchJob) -> JobOutcome {
    let source = source_path(&job.source);
    let error = format!(
        "track id already used by {}",
        source_path(&first.source).display()
    );
    log::error!("{}: {} ({})", job.track_id, error, source.display());
    JobOutcome::Failed {
        track_id: job.track_id.clone(),
        source,
        error,
    }
}

/// Process one job; never panics or propagates, every error becomes an outcome.
pub fn run_job(job: &BatchJob, writer: &PatternWriter) -> JobOutcome {
    let path = match &job.source {
        JobSource::Found(path) => path,
        JobSource::Missing { expected } => {
            log::warn!("{}: input not found, expected {}", job.track_id, expected);
            return JobOutcome::Skipped {
                track_id: job.track_id.clone(),
                reason: SkipReason::MissingInput {
                    expected: expected.clone(),
                },
            };
        }
    };

    let result = build_pattern(job, path).and_then(|pattern| match pattern {
        Some(pattern) => writer.write(&pattern).map(|written| (pattern, written)).map(Some),
        None => Ok(None),
    });

    match result {
        Ok(Some((pattern, written))) => {
            log::info!(
                "{}: {} event(s), {} BPM, avg velocity {} -> {}",
                job.track_id,
                pattern.stats().total_events,
                pattern.bpm(),
                pattern.stats().avg_velocity,
                written.display()
            );
            JobOutcome::Written {
                track_id: job.track_id.clone(),
                path: written,
                total_events: pattern.stats().total_events,
            }
        }
        Ok(None) => {
            log::warn!("{}: no low-register notes in {}, skipped", job.track_id, path.display());
            JobOutcome::Skipped {
                track_id: job.track_id.clone(),
                reason: SkipReason::NoEvents,
            }
        }
        Err(e) => {
            log::error!("{}: {}", job.track_id, e);
            JobOutcome::Failed {
                track_id: job.track_id.clone(),
                source: path.clone(),
                error: e.to_string(),
            }
        }
    }
}

/// Decode and extract a single file into a pattern carrying the job's metadata.
pub fn build_pattern(job: &BatchJob, path: &Path) -> Result<Option<HapticPattern>> {
    let data = MidiData::from_file(path)?;
    let extractor = HapticExtractor::new(job.options.clone());
    let pattern = extractor
        .pattern(job.track_id.clone(), &data.sequence)
        .map_err(|source| ProcessError::Haptic {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(pattern.map(|pattern| {
        let pattern = match &job.title {
            Some(title) => pattern.with_title(title.clone()),
            None => pattern,
        };
        match &job.style {
            Some(style) => pattern.with_style(style.clone()),
            None => pattern,
        }
    }))
}
