use std::fmt;

use research_logging::{research_debug, research_info, research_warn, task_tag};

use crate::normalize::{normalize_result, RawResearchResult, ResearchResult};
use crate::view_model::AppViewModel;
use crate::ExportedReport;

pub type TaskId = String;
pub type SubmissionId = u64;

pub const STOPPED_BY_USER: &str = "Stopped by user";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHandle {
    pub id: TaskId,
    pub query: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPhase {
    #[default]
    Idle,
    Submitting,
    Polling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Creation failed or returned no identifier; the run never started.
    Submission { detail: String },
    /// A status request failed mid-run.
    Poll { detail: String },
    /// The configured poll ceiling was reached without a final result.
    PollTimeout { attempts: u32 },
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Submission { detail } => write!(f, "Failed to start research: {detail}"),
            ErrorKind::Poll { .. } => write!(f, "Failed while polling for results"),
            ErrorKind::PollTimeout { attempts } => {
                write!(f, "Gave up waiting for results after {attempts} polls")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExportState {
    #[default]
    Idle,
    Exporting { task_id: TaskId },
    Exported {
        url: String,
        saved_path: Option<String>,
    },
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum Run {
    #[default]
    Idle,
    Submitting {
        submission: SubmissionId,
        query: String,
    },
    Polling {
        handle: TaskHandle,
        polls: u32,
    },
}

pub(crate) enum PollProgress {
    Continue,
    CeilingReached,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    run: Run,
    last_submission: SubmissionId,
    progress: Vec<String>,
    status_line: Option<String>,
    result: Option<ResearchResult>,
    last_error: Option<ErrorKind>,
    outcome: Option<RunOutcome>,
    export: ExportState,
    max_poll_attempts: Option<u32>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds how many intermediate responses a run may see. `None` or zero
    /// polls forever.
    pub fn with_max_poll_attempts(mut self, max: Option<u32>) -> Self {
        self.max_poll_attempts = max.filter(|&n| n > 0);
        self
    }

    pub fn view(&self) -> AppViewModel {
        let query = match &self.run {
            Run::Idle => self.result.as_ref().map(|r| r.query.clone()),
            Run::Submitting { query, .. } => Some(query.clone()),
            Run::Polling { handle, .. } => Some(handle.query.clone()),
        };
        AppViewModel {
            phase: self.phase(),
            is_busy: self.is_busy(),
            active_task_id: self.active_task_id().map(ToOwned::to_owned),
            query,
            progress: self.progress.clone(),
            status_line: self.status_line.clone(),
            result: self.result.clone(),
            last_error: self.last_error.as_ref().map(ToString::to_string),
            outcome: self.outcome,
            export: self.export.clone(),
            can_cancel: self.is_busy(),
            can_export: self.result.is_some()
                && !matches!(self.export, ExportState::Exporting { .. }),
        }
    }

    pub fn phase(&self) -> RunPhase {
        match self.run {
            Run::Idle => RunPhase::Idle,
            Run::Submitting { .. } => RunPhase::Submitting,
            Run::Polling { .. } => RunPhase::Polling,
        }
    }

    pub fn is_busy(&self) -> bool {
        !matches!(self.run, Run::Idle)
    }

    pub fn active_task_id(&self) -> Option<&str> {
        match &self.run {
            Run::Polling { handle, .. } => Some(handle.id.as_str()),
            _ => None,
        }
    }

    pub fn progress(&self) -> &[String] {
        &self.progress
    }

    pub fn result(&self) -> Option<&ResearchResult> {
        self.result.as_ref()
    }

    pub fn last_error(&self) -> Option<&ErrorKind> {
        self.last_error.as_ref()
    }

    pub fn outcome(&self) -> Option<RunOutcome> {
        self.outcome
    }

    pub fn export(&self) -> &ExportState {
        &self.export
    }

    /// Returns whether the state changed since the last call, clearing the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn is_active(&self, task_id: &str) -> bool {
        self.active_task_id() == Some(task_id)
    }

    /// Starts a new run, returning its submission id and the task id of any
    /// polling cycle it superseded.
    pub(crate) fn begin_submission(&mut self, query: String) -> (SubmissionId, Option<TaskId>) {
        let superseded = match std::mem::take(&mut self.run) {
            Run::Polling { handle, .. } => {
                research_info!("Superseding run task={}", task_tag(&handle.id));
                Some(handle.id)
            }
            Run::Submitting { submission, .. } => {
                research_info!("Superseding pending submission {}", submission);
                None
            }
            Run::Idle => None,
        };

        self.last_submission += 1;
        let submission = self.last_submission;
        research_info!("Submitting query submission={} len={}", submission, query.len());

        self.progress.clear();
        self.status_line = None;
        self.result = None;
        self.last_error = None;
        self.outcome = None;
        self.export = ExportState::Idle;
        self.run = Run::Submitting { submission, query };
        self.dirty = true;
        (submission, superseded)
    }

    /// Binds the run to its task id. Returns false for a stale submission.
    pub(crate) fn accept_created(&mut self, submission: SubmissionId, task_id: &str) -> bool {
        let query = match &self.run {
            Run::Submitting {
                submission: current,
                query,
            } if *current == submission => query.clone(),
            _ => {
                research_warn!(
                    "Discarding stale creation submission={} task={}",
                    submission,
                    task_tag(task_id)
                );
                return false;
            }
        };
        research_info!("Task created task={}", task_tag(task_id));
        self.run = Run::Polling {
            handle: TaskHandle {
                id: task_id.to_string(),
                query,
            },
            polls: 0,
        };
        self.dirty = true;
        true
    }

    pub(crate) fn reject_creation(&mut self, submission: SubmissionId, detail: String) {
        if !matches!(self.run, Run::Submitting { submission: current, .. } if current == submission)
        {
            research_debug!("Ignoring failure of stale submission {}", submission);
            return;
        }
        research_warn!("Task creation failed: {}", detail);
        self.finish_failed(ErrorKind::Submission { detail });
    }

    /// Applies an intermediate status response to the active run.
    pub(crate) fn record_progress(
        &mut self,
        steps: Option<Vec<String>>,
        status_line: Option<String>,
    ) -> PollProgress {
        self.apply_status(steps, status_line);
        let polls = match &mut self.run {
            Run::Polling { polls, .. } => {
                *polls += 1;
                *polls
            }
            _ => return PollProgress::Continue,
        };
        match self.max_poll_attempts {
            Some(max) if polls >= max => {
                research_warn!("Poll ceiling reached after {} polls", polls);
                self.finish_failed(ErrorKind::PollTimeout { attempts: polls });
                PollProgress::CeilingReached
            }
            _ => PollProgress::Continue,
        }
    }

    pub(crate) fn complete(
        &mut self,
        steps: Option<Vec<String>>,
        status_line: Option<String>,
        raw: RawResearchResult,
    ) {
        let handle = match std::mem::take(&mut self.run) {
            Run::Polling { handle, .. } => handle,
            other => {
                self.run = other;
                return;
            }
        };
        self.apply_status(steps, status_line);
        let result = normalize_result(&handle, raw);
        research_info!(
            "Task completed task={} sources={}",
            task_tag(&handle.id),
            result.sources.len()
        );
        self.result = Some(result);
        self.outcome = Some(RunOutcome::Completed);
        self.dirty = true;
    }

    pub(crate) fn fail_poll(&mut self, detail: String) {
        research_warn!("Polling failed: {}", detail);
        self.finish_failed(ErrorKind::Poll { detail });
    }

    /// Ends the current run on user request. Returns the task whose polling
    /// must stop, if the run had one.
    pub(crate) fn cancel_run(&mut self) -> Option<TaskId> {
        let stopped = match std::mem::take(&mut self.run) {
            Run::Idle => return None,
            Run::Submitting { .. } => None,
            Run::Polling { handle, .. } => Some(handle.id),
        };
        research_info!(
            "Run cancelled by user task={}",
            stopped.as_deref().map(task_tag).unwrap_or("-")
        );
        self.progress.push(STOPPED_BY_USER.to_string());
        self.outcome = Some(RunOutcome::Cancelled);
        self.dirty = true;
        stopped
    }

    /// Drops the current run without recording an outcome.
    pub(crate) fn teardown(&mut self) -> Option<TaskId> {
        match std::mem::take(&mut self.run) {
            Run::Polling { handle, .. } => Some(handle.id),
            _ => None,
        }
    }

    pub(crate) fn begin_export(&mut self) -> Option<ResearchResult> {
        if matches!(self.export, ExportState::Exporting { .. }) {
            return None;
        }
        let result = self.result.clone()?;
        self.export = ExportState::Exporting {
            task_id: result.task_id.clone(),
        };
        self.dirty = true;
        Some(result)
    }

    pub(crate) fn finish_export(&mut self, task_id: &str, result: Result<ExportedReport, String>) {
        if !matches!(&self.export, ExportState::Exporting { task_id: current } if current == task_id)
        {
            research_debug!("Ignoring stale export for task={}", task_tag(task_id));
            return;
        }
        self.export = match result {
            Ok(report) => {
                research_info!("Report exported url={}", report.url);
                ExportState::Exported {
                    url: report.url,
                    saved_path: report.saved_path,
                }
            }
            Err(message) => {
                research_warn!("Report export failed: {}", message);
                ExportState::Failed(message)
            }
        };
        self.dirty = true;
    }

    fn apply_status(&mut self, steps: Option<Vec<String>>, status_line: Option<String>) {
        if let Some(steps) = steps {
            if steps != self.progress {
                self.progress = steps;
                self.dirty = true;
            }
        }
        if status_line.is_some() && status_line != self.status_line {
            self.status_line = status_line;
            self.dirty = true;
        }
    }

    fn finish_failed(&mut self, error: ErrorKind) {
        self.run = Run::Idle;
        self.last_error = Some(error);
        self.outcome = Some(RunOutcome::Failed);
        self.dirty = true;
    }
}
