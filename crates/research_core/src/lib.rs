//! Research core: pure task-coordinator state machine, result normalizer and
//! view-model helpers.
mod effect;
mod msg;
mod normalize;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::{ExportedReport, Msg, TaskStatus};
pub use normalize::{
    normalize_result, normalize_source, RawResearchResult, RawSource, ResearchResult,
    SourceSummary, NO_SUMMARY_PLACEHOLDER, SNIPPET_MAX_CHARS,
};
pub use state::{
    AppState, ErrorKind, ExportState, RunOutcome, RunPhase, SubmissionId, TaskHandle, TaskId,
    STOPPED_BY_USER,
};
pub use update::update;
pub use view_model::AppViewModel;
