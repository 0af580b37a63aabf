//! Generation jobs: the contract a generation backend must honor, plus a
//! timed simulator that stands in for real inference.
//!
//! ## Contract
//!
//! [`JobSource`] is what the workflow controller talks to:
//! `start` a job for a request, `poll` it for progress, `cancel` it when the
//! user walks away. A real backend integration implements the same trait,
//! so the controller does not change when the simulator is swapped out.
//!
//! ## Simulated lifecycle
//!
//! A [`GenerationJob`] walks a fixed, ordered list of named steps:
//!
//! ```text
//! Pending(0) → Pending(1) → … → Pending(last) → Finalizing → Complete
//! ```
//!
//! Each tick moves one arrow. A job over `n` steps therefore completes on
//! exactly the `n + 1`th tick, and only then exposes its artifacts.
//!
//! Progress while running is `min(95, 100 * step / n)` where `step` is the
//! index of the step being worked on (Finalizing counts as the last step).
//! It reads `100` only once the job is complete, so a progress bar can
//! never claim "done" before there is anything to show.
//!
//! ## Time
//!
//! [`SimulatedJobSource`] converts elapsed [`Clock`] time into ticks on
//! every poll, one tick per `tick_interval`. Nothing sleeps and nothing
//! runs in the background: a cancelled job is simply never ticked again.
//! Tests drive time with [`ManualClock`] or call [`SimulatedJobSource::tick`]
//! directly.

use crate::config::GenerationConfig;
use crate::style::StyleChoice;
use crate::types::{ArtifactRef, SourceImage};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Progress ceiling for a job that has not completed.
pub const PROGRESS_CAP: u8 = 95;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// The handle belongs to a job that was cancelled or never existed.
    #[error("job {0} is no longer active")]
    StaleJob(JobHandle),
}

/// Opaque identifier of a started job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle(pub u64);

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Everything a backend needs to generate images for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub sources: Vec<SourceImage>,
    pub style: StyleChoice,
}

/// Snapshot returned by [`JobSource::poll`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub handle: JobHandle,
    /// Name of the step being worked on; `None` once complete.
    pub stage: Option<String>,
    pub progress_percent: u8,
    pub complete: bool,
    /// Present only when `complete` is true.
    pub artifacts: Option<Vec<ArtifactRef>>,
}

/// A source of generation jobs.
pub trait JobSource {
    /// Start a job for `request`.
    fn start(&mut self, request: &GenerationRequest) -> JobHandle;

    /// Current status of a job.
    fn poll(&mut self, handle: JobHandle) -> Result<JobStatus, JobError>;

    /// Discard a job. Cancelling an unknown handle is a no-op.
    fn cancel(&mut self, handle: JobHandle);
}

// ============================================================================
// Clocks
// ============================================================================

/// Monotonic time source measured from an arbitrary origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Wall-clock time since construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle and give
/// another to the simulator.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

// ============================================================================
// Simulated job
// ============================================================================

/// Where a job is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobPhase {
    /// Working on the step at this index.
    Pending(usize),
    Finalizing,
    Complete,
}

/// One simulated generation run.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationJob {
    handle: JobHandle,
    stages: Vec<String>,
    phase: JobPhase,
    artifact_count: usize,
    url_template: String,
    produced: Vec<ArtifactRef>,
}

impl GenerationJob {
    pub fn new(handle: JobHandle, config: &GenerationConfig) -> Self {
        Self {
            handle,
            stages: config.stages.clone(),
            phase: JobPhase::Pending(0),
            artifact_count: config.artifact_count,
            url_template: config.artifact_url_template.clone(),
            produced: Vec::new(),
        }
    }

    pub fn phase(&self) -> JobPhase {
        self.phase
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn is_complete(&self) -> bool {
        self.phase == JobPhase::Complete
    }

    /// Artifacts produced by the finished job; empty until complete.
    pub fn produced_artifacts(&self) -> &[ArtifactRef] {
        &self.produced
    }

    /// Name of the step being worked on.
    pub fn current_stage(&self) -> Option<&str> {
        match self.phase {
            JobPhase::Pending(i) => self.stages.get(i).map(String::as_str),
            JobPhase::Finalizing => Some("finalizing"),
            JobPhase::Complete => None,
        }
    }

    pub fn progress_percent(&self) -> u8 {
        let n = self.stages.len().max(1);
        let step = match self.phase {
            JobPhase::Pending(i) => i,
            JobPhase::Finalizing => n - 1,
            JobPhase::Complete => return 100,
        };
        let percent = (100 * step / n).min(usize::from(PROGRESS_CAP));
        percent as u8
    }

    /// Advance by one step. Ticking a complete job does nothing.
    pub fn tick(&mut self) -> JobPhase {
        self.phase = match self.phase {
            JobPhase::Pending(i) if i + 1 < self.stages.len() => JobPhase::Pending(i + 1),
            JobPhase::Pending(_) => JobPhase::Finalizing,
            JobPhase::Finalizing => {
                self.produced = self.build_artifacts();
                JobPhase::Complete
            }
            JobPhase::Complete => JobPhase::Complete,
        };
        self.phase
    }

    pub fn status(&self) -> JobStatus {
        JobStatus {
            handle: self.handle,
            stage: self.current_stage().map(str::to_string),
            progress_percent: self.progress_percent(),
            complete: self.is_complete(),
            artifacts: self.is_complete().then(|| self.produced.clone()),
        }
    }

    fn build_artifacts(&self) -> Vec<ArtifactRef> {
        let job = self.handle.0.to_string();
        (0..self.artifact_count)
            .map(|i| {
                ArtifactRef::new(
                    self.url_template
                        .replace("{job}", &job)
                        .replace("{index}", &i.to_string()),
                )
            })
            .collect()
    }
}

#[derive(Debug)]
struct LiveJob {
    job: GenerationJob,
    /// Clock reading up to which ticks have been applied.
    ticked_until: Duration,
}

/// A [`JobSource`] that fakes generation with timed [`GenerationJob`]s.
#[derive(Debug)]
pub struct SimulatedJobSource<C: Clock> {
    config: GenerationConfig,
    clock: C,
    next_id: u64,
    jobs: HashMap<JobHandle, LiveJob>,
}

impl<C: Clock> SimulatedJobSource<C> {
    pub fn new(config: GenerationConfig, clock: C) -> Self {
        Self {
            config,
            clock,
            next_id: 1,
            jobs: HashMap::new(),
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Number of jobs that have not been cancelled.
    pub fn live_jobs(&self) -> usize {
        self.jobs.len()
    }

    /// Apply one tick to `handle` immediately, regardless of the clock.
    pub fn tick(&mut self, handle: JobHandle) -> Result<JobPhase, JobError> {
        let live = self
            .jobs
            .get_mut(&handle)
            .ok_or(JobError::StaleJob(handle))?;
        let phase = live.job.tick();
        tracing::debug!(job = %handle, ?phase, "tick");
        Ok(phase)
    }

    /// Apply every tick that has come due since the job was last ticked.
    fn pump(&mut self, handle: JobHandle) -> Result<&GenerationJob, JobError> {
        let now = self.clock.now();
        let interval = self.config.tick_interval();
        let live = self
            .jobs
            .get_mut(&handle)
            .ok_or(JobError::StaleJob(handle))?;

        let elapsed = now.saturating_sub(live.ticked_until);
        let due = elapsed.as_nanos() / interval.as_nanos().max(1);
        for _ in 0..due {
            if live.job.is_complete() {
                break;
            }
            let phase = live.job.tick();
            tracing::debug!(job = %handle, ?phase, "tick");
        }
        // Keep the remainder so partial intervals carry over to the next poll.
        live.ticked_until += interval * u32::try_from(due).unwrap_or(u32::MAX);
        Ok(&live.job)
    }
}

impl<C: Clock> JobSource for SimulatedJobSource<C> {
    fn start(&mut self, request: &GenerationRequest) -> JobHandle {
        let handle = JobHandle(self.next_id);
        self.next_id += 1;
        let job = GenerationJob::new(handle, &self.config);
        tracing::info!(
            job = %handle,
            sources = request.sources.len(),
            stages = job.stage_count(),
            "generation started"
        );
        self.jobs.insert(
            handle,
            LiveJob {
                job,
                ticked_until: self.clock.now(),
            },
        );
        handle
    }

    fn poll(&mut self, handle: JobHandle) -> Result<JobStatus, JobError> {
        self.pump(handle).map(GenerationJob::status)
    }

    fn cancel(&mut self, handle: JobHandle) {
        if self.jobs.remove(&handle).is_some() {
            tracing::info!(job = %handle, "generation cancelled");
        }
    }
}
