//! Research engine: remote task service client, poll scheduling and report IO.
mod engine;
mod filename;
mod persist;
mod report;
mod service;
mod types;

pub use engine::{EngineEvents, EngineHandle};
pub use filename::report_filename;
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use report::export_and_save;
pub use service::{HttpTaskService, ServiceSettings, TaskService};
pub use types::{
    EngineEvent, ExportedReport, FailureKind, ReportRequest, ReportSource, ResultPayload,
    ServiceError, SourcePayload, SubmissionId, TaskId, TaskStatus,
};
