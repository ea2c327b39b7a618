use crate::{RawResearchResult, SubmissionId, TaskId};

/// One status response for a task, already decoded from the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskStatus {
    /// Free-form current status line, e.g. "Summarizing with LLM...".
    pub status: Option<String>,
    /// Full step list so far; `None` leaves the progress log untouched.
    pub steps: Option<Vec<String>>,
    /// Present only once the task has finished.
    pub result: Option<RawResearchResult>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedReport {
    pub url: String,
    pub saved_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User submitted a research query.
    Submit(String),
    /// User clicked Stop.
    CancelClicked,
    /// User asked for a PDF report of the current result.
    ExportClicked,
    /// Remote service answered a creation request.
    TaskCreated {
        submission: SubmissionId,
        result: Result<TaskId, String>,
    },
    /// The inter-poll wait for a task elapsed.
    PollDue { task_id: TaskId },
    /// Remote service answered a status request.
    StatusReceived {
        task_id: TaskId,
        result: Result<TaskStatus, String>,
    },
    /// Report export finished for the result of `task_id`.
    ExportFinished {
        task_id: TaskId,
        result: Result<ExportedReport, String>,
    },
    /// The owning session is ending.
    Teardown,
}
