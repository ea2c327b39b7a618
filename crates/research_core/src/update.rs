use research_logging::{research_debug, task_tag};

use crate::state::PollProgress;
use crate::{AppState, Effect, Msg};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::Submit(raw) => {
            let query = raw.trim();
            if query.is_empty() {
                return (state, Vec::new());
            }
            let query = query.to_owned();
            let (submission, superseded) = state.begin_submission(query.clone());
            let mut effects = Vec::with_capacity(2);
            if let Some(task_id) = superseded {
                effects.push(Effect::StopPolling { task_id });
            }
            effects.push(Effect::CreateTask { submission, query });
            effects
        }
        Msg::TaskCreated { submission, result } => match result {
            Ok(task_id) if task_id.trim().is_empty() => {
                state.reject_creation(submission, "No task id returned from backend".to_string());
                Vec::new()
            }
            Ok(task_id) => {
                if state.accept_created(submission, &task_id) {
                    vec![Effect::SchedulePoll { task_id }]
                } else {
                    Vec::new()
                }
            }
            Err(detail) => {
                state.reject_creation(submission, detail);
                Vec::new()
            }
        },
        Msg::PollDue { task_id } => {
            if state.is_active(&task_id) {
                vec![Effect::FetchStatus { task_id }]
            } else {
                research_debug!("Stale poll tick for task={}", task_tag(&task_id));
                vec![Effect::StopPolling { task_id }]
            }
        }
        Msg::StatusReceived { task_id, result } => {
            if !state.is_active(&task_id) {
                research_debug!("Discarding stale status for task={}", task_tag(&task_id));
                return (state, Vec::new());
            }
            match result {
                Err(detail) => {
                    state.fail_poll(detail);
                    vec![Effect::StopPolling { task_id }]
                }
                Ok(status) => match status.result {
                    Some(raw) => {
                        state.complete(status.steps, status.status, raw);
                        vec![Effect::StopPolling { task_id }]
                    }
                    None => match state.record_progress(status.steps, status.status) {
                        PollProgress::Continue => vec![Effect::SchedulePoll { task_id }],
                        PollProgress::CeilingReached => vec![Effect::StopPolling { task_id }],
                    },
                },
            }
        }
        Msg::CancelClicked => {
            if !state.is_busy() {
                return (state, Vec::new());
            }
            match state.cancel_run() {
                Some(task_id) => vec![Effect::StopPolling { task_id }],
                None => Vec::new(),
            }
        }
        Msg::ExportClicked => match state.begin_export() {
            Some(result) => vec![Effect::ExportReport { result }],
            None => Vec::new(),
        },
        Msg::ExportFinished { task_id, result } => {
            state.finish_export(&task_id, result);
            Vec::new()
        }
        Msg::Teardown => {
            let mut effects = Vec::with_capacity(2);
            if let Some(task_id) = state.teardown() {
                effects.push(Effect::StopPolling { task_id });
            }
            effects.push(Effect::Shutdown);
            effects
        }
    };

    (state, effects)
}
