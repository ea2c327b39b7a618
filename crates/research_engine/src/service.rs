use std::path::PathBuf;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{Response, Url};
use research_logging::{research_debug, task_tag};
use serde_json::json;

use crate::types::{CreateTaskResponse, ExportResponse};
use crate::{FailureKind, ReportRequest, ServiceError, TaskId, TaskStatus};

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    /// Where downloaded reports are written; `None` skips the download.
    pub report_dir: Option<PathBuf>,
    pub max_report_bytes: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(1200),
            report_dir: None,
            max_report_bytes: 20 * 1024 * 1024,
        }
    }
}

/// The remote research service.
#[async_trait::async_trait]
pub trait TaskService: Send + Sync {
    async fn create_task(&self, query: &str) -> Result<TaskId, ServiceError>;

    async fn task_status(&self, task_id: &str) -> Result<TaskStatus, ServiceError>;

    /// Asks the service to render a report; returns its absolute url.
    async fn export_report(&self, report: &ReportRequest) -> Result<String, ServiceError>;

    async fn download_report(&self, url: &str) -> Result<Vec<u8>, ServiceError>;
}

#[derive(Debug, Clone)]
pub struct HttpTaskService {
    settings: ServiceSettings,
    base: Url,
    client: reqwest::Client,
}

impl HttpTaskService {
    pub fn new(settings: ServiceSettings) -> Result<Self, ServiceError> {
        let base = Url::parse(settings.base_url.trim())
            .map_err(|err| ServiceError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ServiceError::new(
                FailureKind::InvalidUrl,
                format!("{base} cannot be used as a base url"),
            ));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ServiceError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            settings,
            base,
            client,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Resolves a report url the way the backend hands it out: absolute urls
    /// pass through, paths are appended to the base url.
    fn resolve_report_url(&self, raw: &str) -> Result<String, ServiceError> {
        if let Ok(absolute) = Url::parse(raw) {
            return Ok(absolute.to_string());
        }
        if !raw.starts_with('/') {
            return Err(ServiceError::new(
                FailureKind::InvalidResponse,
                format!("unexpected report url {raw:?}"),
            ));
        }
        let base = self.base.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}{raw}"))
            .map(|url| url.to_string())
            .map_err(|err| ServiceError::new(FailureKind::InvalidResponse, err.to_string()))
    }
}

#[async_trait::async_trait]
impl TaskService for HttpTaskService {
    async fn create_task(&self, query: &str) -> Result<TaskId, ServiceError> {
        let response = self
            .client
            .post(self.endpoint(&["research"]))
            .json(&json!({ "query": query }))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = ensure_success(response, "Backend error")?;

        let body: CreateTaskResponse = response.json().await.map_err(map_reqwest_error)?;
        match body.task_id {
            Some(task_id) if !task_id.trim().is_empty() => {
                research_debug!("Created task={}", task_tag(&task_id));
                Ok(task_id)
            }
            _ => Err(ServiceError::new(
                FailureKind::MissingTaskId,
                "No task id returned from backend",
            )),
        }
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskStatus, ServiceError> {
        let response = self
            .client
            .get(self.endpoint(&["research", task_id]))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = ensure_success(response, "Poll error")?;
        response.json().await.map_err(map_reqwest_error)
    }

    async fn export_report(&self, report: &ReportRequest) -> Result<String, ServiceError> {
        let response = self
            .client
            .post(self.endpoint(&["export_pdf"]))
            .json(report)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = ensure_success(response, "Export error")?;

        let body: ExportResponse = response.json().await.map_err(map_reqwest_error)?;
        match body.url {
            Some(url) if !url.trim().is_empty() => self.resolve_report_url(url.trim()),
            _ => Err(ServiceError::new(
                FailureKind::InvalidResponse,
                "No report url returned from backend",
            )),
        }
    }

    async fn download_report(&self, url: &str) -> Result<Vec<u8>, ServiceError> {
        let parsed = Url::parse(url)
            .map_err(|err| ServiceError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = ensure_success(response, "Download error")?;

        let max_bytes = self.settings.max_report_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(ServiceError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(content_len),
                    },
                    "report too large",
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(ServiceError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(next_len),
                    },
                    "report too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }
}

fn ensure_success(response: Response, context: &str) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ServiceError::new(
            FailureKind::HttpStatus(status.as_u16()),
            format!("{context}: {}", status.as_u16()),
        ))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ServiceError {
    if err.is_timeout() {
        return ServiceError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return ServiceError::new(FailureKind::InvalidResponse, err.to_string());
    }
    ServiceError::new(FailureKind::Network, err.to_string())
}
