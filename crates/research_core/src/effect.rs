use crate::{ResearchResult, SubmissionId, TaskId};

/// Side effects requested by `update`; executed by the platform layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Ask the remote service to create a research task.
    CreateTask {
        submission: SubmissionId,
        query: String,
    },
    /// Wait one poll interval, then deliver `Msg::PollDue` for this task.
    SchedulePoll { task_id: TaskId },
    /// Request the current status of this task.
    FetchStatus { task_id: TaskId },
    /// Drop any scheduled poll bound to this task.
    StopPolling { task_id: TaskId },
    /// Send a finished result to the report exporter.
    ExportReport { result: ResearchResult },
    /// The coordinator is going away; stop every timer and worker.
    Shutdown,
}
