use std::sync::mpsc;
use std::thread;

use research_core::{
    Effect, ExportedReport, Msg, RawResearchResult, RawSource, ResearchResult, TaskStatus,
};
use research_engine::{
    EngineEvent, EngineEvents, EngineHandle, ReportRequest, ReportSource, ResultPayload,
    SourcePayload,
};
use research_logging::{research_debug, research_error, research_warn, task_tag};

/// Runs core effects on the engine and feeds engine events back as messages.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(mut engine: EngineHandle, msg_tx: mpsc::Sender<Msg>) -> Self {
        match engine.take_events() {
            Some(events) => spawn_event_loop(events, msg_tx),
            None => research_error!("Engine events already taken; results will not arrive"),
        }
        Self { engine }
    }

    pub fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::CreateTask { submission, query } => {
                    research_debug!("CreateTask submission={} len={}", submission, query.len());
                    self.engine.create_task(submission, query);
                }
                Effect::SchedulePoll { task_id } => self.engine.schedule_poll(task_id),
                Effect::FetchStatus { task_id } => self.engine.fetch_status(task_id),
                Effect::StopPolling { task_id } => self.engine.stop_polling(task_id),
                Effect::ExportReport { result } => {
                    self.engine.export_report(report_request(&result));
                }
                Effect::Shutdown => self.engine.shutdown(),
            }
        }
    }
}

fn spawn_event_loop(events: EngineEvents, msg_tx: mpsc::Sender<Msg>) {
    thread::spawn(move || {
        while let Some(event) = events.recv() {
            if msg_tx.send(map_event(event)).is_err() {
                break;
            }
        }
    });
}

pub(crate) fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::TaskCreated { submission, result } => Msg::TaskCreated {
            submission,
            result: result.map_err(|err| err.message),
        },
        EngineEvent::PollDue { task_id } => Msg::PollDue { task_id },
        EngineEvent::StatusReceived { task_id, result } => {
            let result = result.map(map_status).map_err(|err| {
                research_warn!("Status request failed task={}: {}", task_tag(&task_id), err);
                err.to_string()
            });
            Msg::StatusReceived { task_id, result }
        }
        EngineEvent::ReportExported { task_id, result } => Msg::ExportFinished {
            task_id,
            result: result
                .map(|report| ExportedReport {
                    url: report.url,
                    saved_path: report
                        .saved_path
                        .map(|path| path.display().to_string()),
                })
                .map_err(|err| format!("Failed to export PDF: {}", err.message)),
        },
    }
}

fn map_status(status: research_engine::TaskStatus) -> TaskStatus {
    TaskStatus {
        status: status.status,
        steps: status.steps,
        result: status.result.map(map_result),
    }
}

fn map_result(payload: ResultPayload) -> RawResearchResult {
    RawResearchResult {
        summary: payload.summary,
        sources: payload
            .sources
            .map(|sources| sources.into_iter().map(map_source).collect()),
    }
}

fn map_source(source: SourcePayload) -> RawSource {
    RawSource {
        url: source.url,
        title: source.title,
        text: source.text,
        snippet: source.snippet,
        screenshot: source.screenshot,
        reliability: source.reliability.and_then(reliability_score),
    }
}

/// Scores are 0..=100; anything outside is clamped, non-numbers dropped.
fn reliability_score(raw: f64) -> Option<u8> {
    raw.is_finite().then(|| raw.clamp(0.0, 100.0).round() as u8)
}

pub(crate) fn report_request(result: &ResearchResult) -> ReportRequest {
    ReportRequest {
        task_id: result.task_id.clone(),
        query: result.query.clone(),
        summary: result.summary.clone(),
        sources: result
            .sources
            .iter()
            .map(|source| ReportSource {
                url: source.url.clone(),
                title: source.title.clone(),
                snippet: source.snippet.clone(),
                screenshot: source.screenshot.clone(),
                reliability: source.reliability,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;
    use research_core::SourceSummary;
    use research_engine::{FailureKind, ServiceError};

    use super::*;

    fn service_error(kind: FailureKind, message: &str) -> ServiceError {
        ServiceError {
            kind,
            message: message.to_string(),
        }
    }

    #[test]
    fn creation_error_keeps_backend_message() {
        let msg = map_event(EngineEvent::TaskCreated {
            submission: 3,
            result: Err(service_error(
                FailureKind::MissingTaskId,
                "No task id returned from backend",
            )),
        });
        assert_eq!(
            msg,
            Msg::TaskCreated {
                submission: 3,
                result: Err("No task id returned from backend".to_string()),
            }
        );
    }

    #[test]
    fn status_payload_maps_into_raw_result() {
        let msg = map_event(EngineEvent::StatusReceived {
            task_id: "t1".to_string(),
            result: Ok(research_engine::TaskStatus {
                status: Some("Done".to_string()),
                steps: Some(vec!["LLM starting...".to_string()]),
                result: Some(ResultPayload {
                    summary: Some("sum".to_string()),
                    sources: Some(vec![SourcePayload {
                        url: "https://a.example".to_string(),
                        text: Some("text".to_string()),
                        reliability: Some(84.6),
                        ..SourcePayload::default()
                    }]),
                }),
            }),
        });

        assert_eq!(
            msg,
            Msg::StatusReceived {
                task_id: "t1".to_string(),
                result: Ok(TaskStatus {
                    status: Some("Done".to_string()),
                    steps: Some(vec!["LLM starting...".to_string()]),
                    result: Some(RawResearchResult {
                        summary: Some("sum".to_string()),
                        sources: Some(vec![RawSource {
                            url: "https://a.example".to_string(),
                            text: Some("text".to_string()),
                            reliability: Some(85),
                            ..RawSource::default()
                        }]),
                    }),
                }),
            }
        );
    }

    #[test]
    fn reliability_is_clamped() {
        assert_eq!(reliability_score(-3.0), Some(0));
        assert_eq!(reliability_score(140.0), Some(100));
        assert_eq!(reliability_score(f64::NAN), None);
    }

    #[test]
    fn export_result_maps_path_and_error() {
        let ok = map_event(EngineEvent::ReportExported {
            task_id: "t1".to_string(),
            result: Ok(research_engine::ExportedReport {
                url: "http://b/reports/r.pdf".to_string(),
                saved_path: Some(PathBuf::from("reports/r.pdf")),
            }),
        });
        assert_eq!(
            ok,
            Msg::ExportFinished {
                task_id: "t1".to_string(),
                result: Ok(ExportedReport {
                    url: "http://b/reports/r.pdf".to_string(),
                    saved_path: Some(PathBuf::from("reports/r.pdf").display().to_string()),
                }),
            }
        );

        let err = map_event(EngineEvent::ReportExported {
            task_id: "t1".to_string(),
            result: Err(service_error(FailureKind::HttpStatus(500), "Export error: 500")),
        });
        assert_eq!(
            err,
            Msg::ExportFinished {
                task_id: "t1".to_string(),
                result: Err("Failed to export PDF: Export error: 500".to_string()),
            }
        );
    }

    #[test]
    fn report_request_carries_display_sources() {
        let request = report_request(&ResearchResult {
            task_id: "t1".to_string(),
            query: "q".to_string(),
            summary: "s".to_string(),
            sources: vec![SourceSummary {
                url: "https://a.example".to_string(),
                title: "A".to_string(),
                snippet: "a".to_string(),
                screenshot: None,
                reliability: Some(70),
            }],
        });
        assert_eq!(request.task_id, "t1");
        assert_eq!(request.sources.len(), 1);
        assert_eq!(request.sources[0].reliability, Some(70));
    }
}
