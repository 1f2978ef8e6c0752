//! Submission and polling state machine
//!
//! `Idle -> Submitting -> Polling -> Done | Failed`. Operations that answer
//! with the artifact directly go `Submitting -> Done` without polling.
//!
//! The tracker does no I/O and keeps no clock. The surface sends requests,
//! feeds the replies in, and follows the returned [`PollStep`].

use std::time::Duration;

use crate::api::{CompressionSummary, Endpoint, ProgressReport, SubmitReply};
use crate::error::DeskError;
use crate::progress::{PollPolicy, ProgressSmoother};

pub const COMPLETION_MESSAGE: &str = "Compression complete";

#[derive(Debug, Clone, PartialEq)]
pub enum TaskPhase {
    Idle,
    Submitting,
    Polling { task_id: String },
    Done { task_id: Option<String> },
    Failed { message: String },
}

impl TaskPhase {
    pub fn name(&self) -> &'static str {
        match self {
            TaskPhase::Idle => "idle",
            TaskPhase::Submitting => "submitting",
            TaskPhase::Polling { .. } => "polling",
            TaskPhase::Done { .. } => "done",
            TaskPhase::Failed { .. } => "failed",
        }
    }
}

/// What the surface should do after feeding a poll result in
#[derive(Debug, Clone, PartialEq)]
pub enum PollStep {
    /// Schedule the next status request
    Continue,
    /// First observation of completion: download from `download_path`
    Complete { download_path: String },
    /// The task failed; stop polling and show the message
    Stop { message: String },
    /// The tracker is not polling (already terminal); do nothing
    Ignored,
}

#[derive(Debug, Clone)]
pub struct TaskTracker {
    phase: TaskPhase,
    policy: PollPolicy,
    progress: ProgressSmoother,
    status: String,
    summary: Option<CompressionSummary>,
    consecutive_errors: u32,
}

impl TaskTracker {
    pub fn new(policy: PollPolicy) -> Self {
        let progress = ProgressSmoother::new(policy.mode);
        Self {
            phase: TaskPhase::Idle,
            policy,
            progress,
            status: String::new(),
            summary: None,
            consecutive_errors: 0,
        }
    }

    pub fn phase(&self) -> &TaskPhase {
        &self.phase
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn summary(&self) -> Option<&CompressionSummary> {
        self.summary.as_ref()
    }

    pub fn percent(&self) -> f32 {
        self.progress.displayed()
    }

    /// Advance the smoothed progress bar one frame
    pub fn tick_progress(&mut self) -> f32 {
        self.progress.tick()
    }

    pub fn task_id(&self) -> Option<&str> {
        match &self.phase {
            TaskPhase::Polling { task_id } => Some(task_id),
            TaskPhase::Done { task_id } => task_id.as_deref(),
            _ => None,
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(
            self.phase,
            TaskPhase::Submitting | TaskPhase::Polling { .. }
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, TaskPhase::Done { .. } | TaskPhase::Failed { .. })
    }

    /// The submit control is enabled unless a submission is in flight or
    /// already succeeded.
    pub fn can_submit(&self) -> bool {
        matches!(self.phase, TaskPhase::Idle | TaskPhase::Failed { .. })
    }

    /// Submission guard
    pub fn begin_submit(&mut self) -> Result<(), DeskError> {
        if !self.can_submit() {
            return Err(DeskError::InvalidState(format!(
                "A submission is already {}",
                self.phase.name()
            )));
        }
        self.progress.reset();
        self.summary = None;
        self.consecutive_errors = 0;
        self.status = "Uploading...".to_string();
        self.transition(TaskPhase::Submitting);
        Ok(())
    }

    /// Feed the reply of a task-creating submission
    pub fn accept_reply(&mut self, reply: SubmitReply) -> Result<String, DeskError> {
        self.expect_submitting()?;
        match reply.into_task_id() {
            Ok(task_id) => {
                self.status = "Processing...".to_string();
                self.transition(TaskPhase::Polling {
                    task_id: task_id.clone(),
                });
                Ok(task_id)
            }
            Err(e) => {
                self.fail(e.to_string());
                Err(e)
            }
        }
    }

    /// A direct-blob operation returned its artifact
    pub fn finish_direct(&mut self, status: impl Into<String>) -> Result<(), DeskError> {
        self.expect_submitting()?;
        self.progress.set_target(100.0);
        self.status = status.into();
        self.transition(TaskPhase::Done { task_id: None });
        Ok(())
    }

    /// Fail the current submission. Idempotent once terminal.
    pub fn fail(&mut self, message: impl Into<String>) {
        if self.is_terminal() {
            return;
        }
        let message = message.into();
        self.status = message.clone();
        self.transition(TaskPhase::Failed { message });
    }

    /// The task being polled, if `task_id` is still it
    fn polling(&self, task_id: &str) -> Option<String> {
        match &self.phase {
            TaskPhase::Polling { task_id: current } if current == task_id => {
                Some(current.clone())
            }
            _ => None,
        }
    }

    /// Feed a successful status response for `task_id`. Reports for any
    /// other task are ignored.
    pub fn observe(&mut self, task_id: &str, report: ProgressReport) -> PollStep {
        let Some(task_id) = self.polling(task_id) else {
            tracing::debug!(task_id, "Ignoring report for a task no longer polled");
            return PollStep::Ignored;
        };
        self.consecutive_errors = 0;

        if let Some(message) = report.failure() {
            self.fail(message.clone());
            return PollStep::Stop { message };
        }

        self.progress.set_target(report.percent as f32);
        if report.summary.is_some() {
            self.summary = report.summary;
        }

        if report.percent >= 100 {
            self.status = COMPLETION_MESSAGE.to_string();
            self.transition(TaskPhase::Done {
                task_id: Some(task_id.clone()),
            });
            return PollStep::Complete {
                download_path: Endpoint::Download(task_id).path(),
            };
        }

        self.status = report.status;
        PollStep::Continue
    }

    /// Feed a failed status request. Transient errors are tolerated up to
    /// the policy's bound; anything else fails the task at once.
    pub fn poll_error(&mut self, task_id: &str, error: &DeskError) -> PollStep {
        if self.polling(task_id).is_none() {
            return PollStep::Ignored;
        }
        self.consecutive_errors += 1;
        if error.is_transient() && self.consecutive_errors < self.policy.max_poll_errors {
            tracing::warn!(
                attempt = self.consecutive_errors,
                max = self.policy.max_poll_errors,
                %error,
                "Progress request failed, retrying"
            );
            return PollStep::Continue;
        }
        let message = format!("Error while checking progress: {}", error);
        self.fail(message.clone());
        PollStep::Stop { message }
    }

    /// Enforce the maximum poll duration
    pub fn check_deadline(&mut self, elapsed: Duration) -> PollStep {
        if !matches!(self.phase, TaskPhase::Polling { .. }) {
            return PollStep::Ignored;
        }
        if elapsed > self.policy.max_duration {
            return self.expire();
        }
        PollStep::Continue
    }

    /// Fail on the poll deadline, e.g. when a status request is still
    /// outstanding as the deadline passes
    pub fn expire(&mut self) -> PollStep {
        if !matches!(self.phase, TaskPhase::Polling { .. }) {
            return PollStep::Ignored;
        }
        let message = format!(
            "Gave up waiting after {}s",
            self.policy.max_duration.as_secs()
        );
        self.fail(message.clone());
        PollStep::Stop { message }
    }

    /// Navigation away or explicit cancel
    pub fn cancel(&mut self) {
        if self.is_busy() {
            self.fail("Cancelled");
        }
    }

    pub fn reset(&mut self) {
        self.progress.reset();
        self.status.clear();
        self.summary = None;
        self.consecutive_errors = 0;
        self.transition(TaskPhase::Idle);
    }

    fn expect_submitting(&self) -> Result<(), DeskError> {
        if self.phase != TaskPhase::Submitting {
            return Err(DeskError::InvalidState(format!(
                "Expected a submission in flight, task is {}",
                self.phase.name()
            )));
        }
        Ok(())
    }

    fn transition(&mut self, next: TaskPhase) {
        tracing::debug!(from = self.phase.name(), to = next.name(), "Task phase");
        self.phase = next;
    }
}

impl Default for TaskTracker {
    fn default() -> Self {
        Self::new(PollPolicy::default())
    }
}
