use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub type TaskId = String;
pub type SubmissionId = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    TaskCreated {
        submission: SubmissionId,
        result: Result<TaskId, ServiceError>,
    },
    /// The wait scheduled for this task elapsed without being stopped.
    PollDue { task_id: TaskId },
    StatusReceived {
        task_id: TaskId,
        result: Result<TaskStatus, ServiceError>,
    },
    ReportExported {
        task_id: TaskId,
        result: Result<ExportedReport, ServiceError>,
    },
}

/// Body of `GET /research/{task_id}`. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct TaskStatus {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub steps: Option<Vec<String>>,
    #[serde(default)]
    pub result: Option<ResultPayload>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ResultPayload {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub sources: Option<Vec<SourcePayload>>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SourcePayload {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default)]
    pub screenshot: Option<String>,
    #[serde(default, alias = "reliability_score")]
    pub reliability: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateTaskResponse {
    #[serde(default)]
    pub task_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExportResponse {
    #[serde(default)]
    pub url: Option<String>,
}

/// Body of `POST /export_pdf`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRequest {
    pub task_id: TaskId,
    pub query: String,
    pub summary: String,
    pub sources: Vec<ReportSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSource {
    pub url: String,
    pub title: String,
    pub snippet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reliability: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedReport {
    /// Absolute url of the generated report.
    pub url: String,
    /// Local copy, when a report directory is configured.
    pub saved_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} ({kind})")]
pub struct ServiceError {
    pub kind: FailureKind,
    pub message: String,
}

impl ServiceError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    InvalidResponse,
    MissingTaskId,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Persist,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::InvalidResponse => write!(f, "invalid response"),
            FailureKind::MissingTaskId => write!(f, "missing task id"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Persist => write!(f, "persist error"),
        }
    }
}
