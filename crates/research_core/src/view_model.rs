use crate::{ExportState, ResearchResult, RunOutcome, RunPhase, TaskId};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub phase: RunPhase,
    pub is_busy: bool,
    pub active_task_id: Option<TaskId>,
    pub query: Option<String>,
    pub progress: Vec<String>,
    pub status_line: Option<String>,
    pub result: Option<ResearchResult>,
    /// User-facing message for the last failed run.
    pub last_error: Option<String>,
    pub outcome: Option<RunOutcome>,
    pub export: ExportState,
    pub can_cancel: bool,
    pub can_export: bool,
}
