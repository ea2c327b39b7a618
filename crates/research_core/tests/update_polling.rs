use research_core::{
    update, AppState, Effect, ErrorKind, ExportState, ExportedReport, Msg, RawResearchResult,
    RawSource, RunOutcome, TaskStatus,
};

fn run_to_polling(state: AppState, query: &str, submission: u64, task_id: &str) -> AppState {
    let (state, _) = update(state, Msg::Submit(query.to_string()));
    let (state, _) = update(
        state,
        Msg::TaskCreated {
            submission,
            result: Ok(task_id.to_string()),
        },
    );
    state
}

fn status(state: AppState, task_id: &str, status: TaskStatus) -> (AppState, Vec<Effect>) {
    update(
        state,
        Msg::StatusReceived {
            task_id: task_id.to_string(),
            result: Ok(status),
        },
    )
}

fn steps(items: &[&str]) -> TaskStatus {
    TaskStatus {
        steps: Some(items.iter().map(|s| s.to_string()).collect()),
        ..TaskStatus::default()
    }
}

fn finished(summary: &str, urls: &[&str]) -> TaskStatus {
    TaskStatus {
        result: Some(RawResearchResult {
            summary: Some(summary.to_string()),
            sources: Some(
                urls.iter()
                    .map(|url| RawSource {
                        url: url.to_string(),
                        ..RawSource::default()
                    })
                    .collect(),
            ),
        }),
        ..TaskStatus::default()
    }
}

#[test]
fn resubmit_while_polling_stops_old_cycle() {
    let state = run_to_polling(AppState::new(), "first", 1, "old");
    let (state, effects) = update(state, Msg::Submit("second".to_string()));

    assert_eq!(
        effects,
        vec![
            Effect::StopPolling {
                task_id: "old".to_string()
            },
            Effect::CreateTask {
                submission: 2,
                query: "second".to_string(),
            },
        ]
    );
    assert_eq!(state.active_task_id(), None);
    assert!(state.is_busy());
}

#[test]
fn stale_responses_do_not_touch_new_run() {
    let state = run_to_polling(AppState::new(), "first", 1, "old");
    let state = run_to_polling(state, "second", 2, "new");
    let (state, _) = status(state, "new", steps(&["searching"]));
    let snapshot = state.clone();

    let (state, effects) = status(state, "old", steps(&["old step", "another"]));
    assert_eq!(state, snapshot);
    assert!(effects.is_empty());

    let (state, effects) = status(state, "old", finished("old summary", &["https://old"]));
    assert_eq!(state, snapshot);
    assert!(effects.is_empty());

    let (state, effects) = update(
        state,
        Msg::StatusReceived {
            task_id: "old".to_string(),
            result: Err("boom".to_string()),
        },
    );
    assert_eq!(state, snapshot);
    assert!(effects.is_empty());

    assert_eq!(state.progress(), ["searching".to_string()]);
    assert!(state.result().is_none());
    assert!(state.last_error().is_none());
    assert_eq!(state.active_task_id(), Some("new"));
}

#[test]
fn stale_creation_is_discarded_after_resubmit() {
    let (state, _) = update(AppState::new(), Msg::Submit("first".to_string()));
    let (state, _) = update(state, Msg::Submit("second".to_string()));

    let (state, effects) = update(
        state,
        Msg::TaskCreated {
            submission: 1,
            result: Ok("first-task".to_string()),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.active_task_id(), None);

    let (state, effects) = update(
        state,
        Msg::TaskCreated {
            submission: 1,
            result: Err("late failure".to_string()),
        },
    );
    assert!(effects.is_empty());
    assert!(state.last_error().is_none());
    assert!(state.is_busy());

    let (state, effects) = update(
        state,
        Msg::TaskCreated {
            submission: 2,
            result: Ok("second-task".to_string()),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::SchedulePoll {
            task_id: "second-task".to_string()
        }]
    );
    assert_eq!(state.view().query.as_deref(), Some("second"));
}

#[test]
fn stale_poll_tick_stops_its_own_cycle() {
    let state = run_to_polling(AppState::new(), "first", 1, "old");
    let state = run_to_polling(state, "second", 2, "new");
    let snapshot = state.clone();

    let (state, effects) = update(
        state,
        Msg::PollDue {
            task_id: "old".to_string(),
        },
    );
    assert_eq!(state, snapshot);
    assert_eq!(
        effects,
        vec![Effect::StopPolling {
            task_id: "old".to_string()
        }]
    );
}

#[test]
fn missing_steps_leave_progress_unchanged() {
    let state = run_to_polling(AppState::new(), "q", 1, "t1");
    let (state, _) = status(state, "t1", steps(&["a", "b"]));
    let (state, effects) = status(
        state,
        "t1",
        TaskStatus {
            status: Some("Summarizing with LLM...".to_string()),
            ..TaskStatus::default()
        },
    );

    assert_eq!(state.progress(), ["a".to_string(), "b".to_string()]);
    assert_eq!(
        state.view().status_line.as_deref(),
        Some("Summarizing with LLM...")
    );
    assert_eq!(
        effects,
        vec![Effect::SchedulePoll {
            task_id: "t1".to_string()
        }]
    );
}

#[test]
fn steps_replace_rather_than_append() {
    let state = run_to_polling(AppState::new(), "q", 1, "t1");
    let (state, _) = status(state, "t1", steps(&["Found 5 results"]));
    let (state, _) = status(
        state,
        "t1",
        steps(&["Found 5 results", "Visiting page 1/5: https://a"]),
    );
    assert_eq!(
        state.progress(),
        [
            "Found 5 results".to_string(),
            "Visiting page 1/5: https://a".to_string()
        ]
    );
}

#[test]
fn every_run_ends_in_exactly_one_outcome() {
    let terminals: Vec<(Msg, RunOutcome)> = vec![
        (
            Msg::StatusReceived {
                task_id: "t1".to_string(),
                result: Ok(finished("done", &[])),
            },
            RunOutcome::Completed,
        ),
        (
            Msg::StatusReceived {
                task_id: "t1".to_string(),
                result: Err("Poll error: 500".to_string()),
            },
            RunOutcome::Failed,
        ),
        (Msg::CancelClicked, RunOutcome::Cancelled),
    ];

    for (terminal, expected) in terminals {
        let state = run_to_polling(AppState::new(), "q", 1, "t1");
        let (state, _) = update(state, terminal);

        assert_eq!(state.outcome(), Some(expected));
        assert!(!state.is_busy());
        assert_eq!(state.active_task_id(), None);
        let signals = [
            state.result().is_some(),
            state.last_error().is_some(),
            state.outcome() == Some(RunOutcome::Cancelled),
        ];
        assert_eq!(signals.iter().filter(|s| **s).count(), 1, "{expected:?}");

        // Further terminal messages for the same task change nothing.
        let snapshot = state.clone();
        let (state, _) = status(state, "t1", finished("late", &["https://late"]));
        let (state, _) = update(state, Msg::CancelClicked);
        assert_eq!(state, snapshot);
    }
}

#[test]
fn poll_ceiling_fails_run() {
    let state = run_to_polling(AppState::new().with_max_poll_attempts(Some(2)), "q", 1, "t1");
    let (state, effects) = status(state, "t1", steps(&["one"]));
    assert_eq!(
        effects,
        vec![Effect::SchedulePoll {
            task_id: "t1".to_string()
        }]
    );

    let (state, effects) = status(state, "t1", steps(&["one", "two"]));
    assert_eq!(
        effects,
        vec![Effect::StopPolling {
            task_id: "t1".to_string()
        }]
    );
    assert_eq!(
        state.last_error(),
        Some(&ErrorKind::PollTimeout { attempts: 2 })
    );
    assert_eq!(state.outcome(), Some(RunOutcome::Failed));
    assert!(!state.is_busy());
}

#[test]
fn zero_ceiling_means_unbounded() {
    let mut state = run_to_polling(AppState::new().with_max_poll_attempts(Some(0)), "q", 1, "t1");
    for _ in 0..50 {
        let (next, effects) = status(state, "t1", steps(&["still going"]));
        assert_eq!(
            effects,
            vec![Effect::SchedulePoll {
                task_id: "t1".to_string()
            }]
        );
        state = next;
    }
    assert!(state.is_busy());
}

#[test]
fn export_requires_a_result() {
    let state = run_to_polling(AppState::new(), "q", 1, "t1");
    let (state, effects) = update(state, Msg::ExportClicked);
    assert!(effects.is_empty());
    assert_eq!(state.export(), &ExportState::Idle);
}

#[test]
fn export_round_trip_updates_state() {
    let state = run_to_polling(AppState::new(), "q", 1, "t1");
    let (state, _) = status(state, "t1", finished("Summary", &["https://a"]));
    let result = state.result().cloned().expect("result");

    let (state, effects) = update(state, Msg::ExportClicked);
    assert_eq!(effects, vec![Effect::ExportReport { result }]);
    assert!(!state.view().can_export);

    // A second click while exporting does nothing.
    let (state, effects) = update(state, Msg::ExportClicked);
    assert!(effects.is_empty());

    let (state, _) = update(
        state,
        Msg::ExportFinished {
            task_id: "t1".to_string(),
            result: Ok(ExportedReport {
                url: "http://backend/reports/report-t1.pdf".to_string(),
                saved_path: None,
            }),
        },
    );
    assert_eq!(
        state.export(),
        &ExportState::Exported {
            url: "http://backend/reports/report-t1.pdf".to_string(),
            saved_path: None,
        }
    );
    assert!(state.last_error().is_none());
    assert_eq!(state.outcome(), Some(RunOutcome::Completed));
}

#[test]
fn export_failure_does_not_touch_run_error() {
    let state = run_to_polling(AppState::new(), "q", 1, "t1");
    let (state, _) = status(state, "t1", finished("Summary", &[]));
    let (state, _) = update(state, Msg::ExportClicked);
    let (state, _) = update(
        state,
        Msg::ExportFinished {
            task_id: "t1".to_string(),
            result: Err("Failed to export PDF".to_string()),
        },
    );

    assert_eq!(
        state.export(),
        &ExportState::Failed("Failed to export PDF".to_string())
    );
    assert!(state.last_error().is_none());
    assert!(state.result().is_some());
}

#[test]
fn export_finishing_after_resubmit_is_ignored() {
    let state = run_to_polling(AppState::new(), "q", 1, "t1");
    let (state, _) = status(state, "t1", finished("Summary", &[]));
    let (state, _) = update(state, Msg::ExportClicked);
    let (state, _) = update(state, Msg::Submit("next".to_string()));

    let (state, _) = update(
        state,
        Msg::ExportFinished {
            task_id: "t1".to_string(),
            result: Ok(ExportedReport {
                url: "http://backend/reports/report-t1.pdf".to_string(),
                saved_path: None,
            }),
        },
    );
    assert_eq!(state.export(), &ExportState::Idle);
}
