use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use research_logging::{research_debug, research_error, research_info, task_tag};
use tokio_util::sync::CancellationToken;

use crate::report::export_and_save;
use crate::service::{HttpTaskService, ServiceSettings, TaskService};
use crate::{EngineEvent, ReportRequest, ServiceError, SubmissionId, TaskId};

enum EngineCommand {
    CreateTask {
        submission: SubmissionId,
        query: String,
    },
    SchedulePoll {
        task_id: TaskId,
    },
    FetchStatus {
        task_id: TaskId,
    },
    StopPolling {
        task_id: TaskId,
    },
    ExportReport {
        report: ReportRequest,
    },
    Shutdown,
}

/// Handle to the IO worker: a background thread driving a tokio runtime.
///
/// Commands are fire-and-forget; results come back as [`EngineEvent`]s on the
/// receiver handed out once by [`EngineHandle::take_events`].
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    events: Option<EngineEvents>,
}

/// Single-owner receiving end of the engine's event channel.
pub struct EngineEvents {
    rx: mpsc::Receiver<EngineEvent>,
}

impl EngineEvents {
    /// Blocks for the next event; `None` once the engine has shut down.
    pub fn recv(&self) -> Option<EngineEvent> {
        self.rx.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.rx.recv_timeout(timeout).ok()
    }
}

impl EngineHandle {
    pub fn new(settings: ServiceSettings) -> Result<Self, ServiceError> {
        let service = HttpTaskService::new(settings.clone())?;
        Ok(Self::with_service(Arc::new(service), settings))
    }

    pub fn with_service(service: Arc<dyn TaskService>, settings: ServiceSettings) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let poll_interval = settings.poll_interval;
        let report_dir = settings.report_dir;

        thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    research_error!("Failed to start engine runtime: {}", err);
                    return;
                }
            };
            let root = CancellationToken::new();
            let mut polls: HashMap<TaskId, CancellationToken> = HashMap::new();

            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::Shutdown => break,
                    EngineCommand::StopPolling { task_id } => {
                        if let Some(token) = polls.remove(&task_id) {
                            research_debug!("Stopping poll cycle task={}", task_tag(&task_id));
                            token.cancel();
                        }
                    }
                    EngineCommand::SchedulePoll { task_id } => {
                        let token = polls
                            .entry(task_id.clone())
                            .or_insert_with(|| root.child_token())
                            .clone();
                        let event_tx = event_tx.clone();
                        runtime.spawn(wait_for_poll(task_id, poll_interval, token, event_tx));
                    }
                    command => {
                        let service = service.clone();
                        let event_tx = event_tx.clone();
                        let report_dir = report_dir.clone();
                        runtime.spawn(async move {
                            handle_command(service.as_ref(), command, report_dir, event_tx).await;
                        });
                    }
                }
            }

            research_info!("Engine shutting down, {} poll cycle(s) stopped", polls.len());
            root.cancel();
            runtime.shutdown_timeout(Duration::from_millis(250));
        });

        Self {
            cmd_tx,
            events: Some(EngineEvents { rx: event_rx }),
        }
    }

    /// Moves the event receiver out of the handle. Later calls return `None`.
    pub fn take_events(&mut self) -> Option<EngineEvents> {
        self.events.take()
    }

    pub fn create_task(&self, submission: SubmissionId, query: impl Into<String>) {
        self.send(EngineCommand::CreateTask {
            submission,
            query: query.into(),
        });
    }

    /// Delivers [`EngineEvent::PollDue`] after one poll interval unless
    /// polling for `task_id` is stopped first.
    pub fn schedule_poll(&self, task_id: impl Into<TaskId>) {
        self.send(EngineCommand::SchedulePoll {
            task_id: task_id.into(),
        });
    }

    pub fn fetch_status(&self, task_id: impl Into<TaskId>) {
        self.send(EngineCommand::FetchStatus {
            task_id: task_id.into(),
        });
    }

    /// Cancels the pending wait for `task_id`. Requests already in flight
    /// still report back.
    pub fn stop_polling(&self, task_id: impl Into<TaskId>) {
        self.send(EngineCommand::StopPolling {
            task_id: task_id.into(),
        });
    }

    pub fn export_report(&self, report: ReportRequest) {
        self.send(EngineCommand::ExportReport { report });
    }

    /// Stops every poll cycle and the worker thread.
    pub fn shutdown(&self) {
        self.send(EngineCommand::Shutdown);
    }

    fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            research_debug!("Engine command dropped: worker has shut down");
        }
    }
}

async fn wait_for_poll(
    task_id: TaskId,
    interval: Duration,
    token: CancellationToken,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    tokio::select! {
        _ = token.cancelled() => {
            research_debug!("Poll wait cancelled task={}", task_tag(&task_id));
        }
        _ = tokio::time::sleep(interval) => {
            let _ = event_tx.send(EngineEvent::PollDue { task_id });
        }
    }
}

async fn handle_command(
    service: &dyn TaskService,
    command: EngineCommand,
    report_dir: Option<PathBuf>,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let event = match command {
        EngineCommand::CreateTask { submission, query } => EngineEvent::TaskCreated {
            submission,
            result: service.create_task(&query).await,
        },
        EngineCommand::FetchStatus { task_id } => {
            let result = service.task_status(&task_id).await;
            EngineEvent::StatusReceived { task_id, result }
        }
        EngineCommand::ExportReport { report } => {
            let result = export_and_save(service, &report, report_dir.as_deref()).await;
            EngineEvent::ReportExported {
                task_id: report.task_id,
                result,
            }
        }
        EngineCommand::SchedulePoll { .. }
        | EngineCommand::StopPolling { .. }
        | EngineCommand::Shutdown => return,
    };
    let _ = event_tx.send(event);
}
