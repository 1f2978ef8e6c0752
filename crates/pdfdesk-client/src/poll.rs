//! Progress polling
//!
//! One status request per interval tick until the tracker reports a
//! terminal step. Ticks missed while a request is in flight are delayed,
//! not bunched, so at most one request is outstanding at a time. A request
//! still in flight at the deadline is abandoned and the task fails.

use async_trait::async_trait;
use pdfdesk_core::{DeskError, PollStep, ProgressReport, TaskPhase, TaskTracker};
use tokio::time::{interval_at, timeout_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::ClientError;

#[async_trait]
pub trait ProgressSource: Send + Sync {
    async fn progress(&self, task_id: &str) -> Result<ProgressReport, DeskError>;
}

/// Poll until the task completes. Returns the download path.
///
/// `on_update` runs after every observation so callers can redraw the
/// progress bar.
pub async fn poll_until_done<S, U>(
    source: &S,
    tracker: &mut TaskTracker,
    cancel: &CancellationToken,
    mut on_update: U,
) -> Result<String, ClientError>
where
    S: ProgressSource + ?Sized,
    U: FnMut(&TaskTracker),
{
    let task_id = match tracker.phase() {
        TaskPhase::Polling { task_id } => task_id.clone(),
        other => {
            return Err(DeskError::InvalidState(format!(
                "Cannot poll while {}",
                other.name()
            ))
            .into())
        }
    };
    let period = tracker.policy().interval;
    if period.is_zero() {
        return Err(
            DeskError::InvalidState("Poll interval must be greater than 0".to_string()).into(),
        );
    }
    let started = Instant::now();
    let deadline = started + tracker.policy().max_duration;
    let mut ticker = interval_at(started + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(task_id = %task_id, interval_ms = period.as_millis() as u64, "Polling task");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracker.cancel();
                return Err(ClientError::Cancelled);
            }
            _ = ticker.tick() => {}
        }

        if let PollStep::Stop { message } = tracker.check_deadline(started.elapsed()) {
            return Err(ClientError::TaskFailed(message));
        }

        let result = tokio::select! {
            _ = cancel.cancelled() => {
                tracker.cancel();
                return Err(ClientError::Cancelled);
            }
            r = timeout_at(deadline, source.progress(&task_id)) => r,
        };
        let result = match result {
            Ok(result) => result,
            Err(_) => {
                let message = match tracker.expire() {
                    PollStep::Stop { message } => message,
                    _ => "Gave up waiting for the task".to_string(),
                };
                tracing::warn!(task_id = %task_id, %message, "Status request outlived the deadline");
                return Err(ClientError::TaskFailed(message));
            }
        };

        let step = match result {
            Ok(report) => {
                tracing::debug!(task_id = %task_id, percent = report.percent, status = %report.status, "Progress");
                tracker.observe(&task_id, report)
            }
            Err(e) => tracker.poll_error(&task_id, &e),
        };
        on_update(tracker);

        match step {
            PollStep::Continue => continue,
            PollStep::Complete { download_path } => {
                tracing::info!(task_id = %task_id, "Task complete");
                return Ok(download_path);
            }
            PollStep::Stop { message } => {
                tracing::warn!(task_id = %task_id, %message, "Task stopped");
                return Err(ClientError::TaskFailed(message));
            }
            PollStep::Ignored => {
                return Err(DeskError::InvalidState(format!(
                    "Tracker left polling while {}",
                    tracker.phase().name()
                ))
                .into())
            }
        }
    }
}
