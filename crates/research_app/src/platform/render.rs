use std::io::{self, Write};

use research_core::{AppViewModel, ExportState, RunOutcome, RunPhase};

/// Line-oriented renderer: prints only what changed since the last view.
pub struct TerminalRenderer<W: Write> {
    out: W,
    shown_phase: RunPhase,
    shown_query: Option<String>,
    shown_progress: Vec<String>,
    shown_status: Option<String>,
    shown_outcome: Option<RunOutcome>,
    shown_export: ExportState,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            shown_phase: RunPhase::Idle,
            shown_query: None,
            shown_progress: Vec::new(),
            shown_status: None,
            shown_outcome: None,
            shown_export: ExportState::Idle,
        }
    }

    pub fn render(&mut self, view: &AppViewModel) -> io::Result<()> {
        let new_run = view.phase == RunPhase::Submitting
            && (self.shown_phase != RunPhase::Submitting || view.query != self.shown_query);
        self.shown_phase = view.phase;
        if new_run {
            self.shown_progress.clear();
            self.shown_status = None;
            self.shown_outcome = None;
            self.shown_export = ExportState::Idle;
            self.shown_query = view.query.clone();
            if let Some(query) = &view.query {
                writeln!(self.out, "Researching: {query}")?;
            }
        }

        let common = self
            .shown_progress
            .iter()
            .zip(&view.progress)
            .take_while(|(a, b)| a == b)
            .count();
        for step in &view.progress[common..] {
            writeln!(self.out, "  - {step}")?;
        }
        self.shown_progress = view.progress.clone();

        if view.status_line.is_some() && view.status_line != self.shown_status {
            if let Some(status) = &view.status_line {
                writeln!(self.out, "  [{status}]")?;
            }
            self.shown_status = view.status_line.clone();
        }

        if view.outcome.is_some() && view.outcome != self.shown_outcome {
            self.render_outcome(view)?;
            self.shown_outcome = view.outcome;
        }

        if view.export != self.shown_export {
            match &view.export {
                ExportState::Idle => {}
                ExportState::Exporting { .. } => writeln!(self.out, "Exporting PDF report...")?,
                ExportState::Exported { url, saved_path } => {
                    writeln!(self.out, "Report: {url}")?;
                    if let Some(path) = saved_path {
                        writeln!(self.out, "Saved to {path}")?;
                    }
                }
                ExportState::Failed(message) => writeln!(self.out, "{message}")?,
            }
            self.shown_export = view.export.clone();
        }

        self.out.flush()
    }

    fn render_outcome(&mut self, view: &AppViewModel) -> io::Result<()> {
        match view.outcome {
            Some(RunOutcome::Completed) => {
                let Some(result) = &view.result else {
                    return Ok(());
                };
                writeln!(self.out, "\n# Summary (task {})\n", result.task_id)?;
                writeln!(self.out, "{}\n", result.summary.trim_end())?;
                if result.sources.is_empty() {
                    writeln!(
                        self.out,
                        "No sources yet. Try widening the query or re-running the search."
                    )?;
                } else {
                    writeln!(self.out, "## Sources ({} links)", result.sources.len())?;
                    for source in &result.sources {
                        writeln!(self.out, "\n* {}\n  {}", source.title, source.url)?;
                        if !source.snippet.is_empty() {
                            writeln!(self.out, "  {}", source.snippet.replace('\n', " "))?;
                        }
                        if let Some(score) = source.reliability {
                            writeln!(self.out, "  Reliability: {score}/100")?;
                        }
                        if let Some(screenshot) = &source.screenshot {
                            writeln!(self.out, "  Screenshot: {screenshot}")?;
                        }
                    }
                }
            }
            Some(RunOutcome::Failed) => {
                if let Some(error) = &view.last_error {
                    writeln!(self.out, "Error: {error}")?;
                }
            }
            Some(RunOutcome::Cancelled) | None => {}
        }
        Ok(())
    }
}
