use std::io::{self, BufRead};
use std::sync::mpsc;
use std::thread;

use anyhow::bail;
use clap::Parser;
use research_core::{update, AppState, AppViewModel, ExportState, Msg, RunOutcome};
use research_engine::EngineHandle;
use research_logging::research_info;

use super::cli::Cli;
use super::config::Settings;
use super::effects::EffectRunner;
use super::logging;
use super::render::TerminalRenderer;

pub fn run_app() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::initialize(cli.log.into());

    let settings = Settings::load(cli.config.as_deref())?
        .with_env(|key| std::env::var(key).ok())
        .with_cli(&cli);
    research_info!(
        "Using backend {} (poll every {} ms)",
        settings.api_url,
        settings.poll_interval_ms
    );

    let query = cli.query_text();
    if query.trim().is_empty() {
        bail!("the research query must not be blank");
    }

    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    let mut coordinator = Coordinator::new(&settings, msg_tx.clone())?;
    let mut renderer = TerminalRenderer::new(io::stdout());
    spawn_stdin_commands(msg_tx);

    let mut export_requested = false;
    let mut pending = Some(Msg::Submit(query));
    loop {
        let msg = match pending.take() {
            Some(msg) => msg,
            None => match msg_rx.recv() {
                Ok(msg) => msg,
                Err(_) => break,
            },
        };
        let quit = msg == Msg::Teardown;
        if let Some(view) = coordinator.dispatch(msg) {
            renderer.render(&view)?;
        }
        if quit {
            break;
        }

        let view = coordinator.view();
        if cli.export && !export_requested && view.can_export {
            export_requested = true;
            pending = Some(Msg::ExportClicked);
            continue;
        }
        if session_finished(&view, cli.export) {
            break;
        }
    }

    Ok(())
}

/// The client exits once the run ended and any requested export settled.
fn session_finished(view: &AppViewModel, wants_export: bool) -> bool {
    if view.is_busy || view.outcome.is_none() {
        return false;
    }
    match view.export {
        ExportState::Exporting { .. } => false,
        ExportState::Idle => !(wants_export && view.outcome == Some(RunOutcome::Completed)),
        ExportState::Exported { .. } | ExportState::Failed(_) => true,
    }
}

fn spawn_stdin_commands(msg_tx: mpsc::Sender<Msg>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let msg = match line.trim() {
                "" => continue,
                "stop" => Msg::CancelClicked,
                "export" => Msg::ExportClicked,
                "quit" | "q" => Msg::Teardown,
                query => Msg::Submit(query.to_string()),
            };
            if msg_tx.send(msg).is_err() {
                break;
            }
        }
    });
}

/// Owns the coordinator state and applies messages one at a time.
pub struct Coordinator {
    state: AppState,
    effects: EffectRunner,
}

impl Coordinator {
    pub fn new(settings: &Settings, msg_tx: mpsc::Sender<Msg>) -> anyhow::Result<Self> {
        let engine = EngineHandle::new(settings.service_settings())?;
        Ok(Self::with_engine(engine, settings.max_poll_attempts, msg_tx))
    }

    pub fn with_engine(
        engine: EngineHandle,
        max_poll_attempts: Option<u32>,
        msg_tx: mpsc::Sender<Msg>,
    ) -> Self {
        Self {
            state: AppState::new().with_max_poll_attempts(max_poll_attempts),
            effects: EffectRunner::new(engine, msg_tx),
        }
    }

    /// Applies `msg`, runs the resulting effects and returns the new view if
    /// anything visible changed.
    pub fn dispatch(&mut self, msg: Msg) -> Option<AppViewModel> {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let was_dirty = state.consume_dirty();
        self.state = state;
        self.effects.run(effects);
        was_dirty.then(|| self.state.view())
    }

    pub fn view(&self) -> AppViewModel {
        self.state.view()
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.dispatch(Msg::Teardown);
    }
}
