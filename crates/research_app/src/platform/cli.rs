use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use super::logging::LogDestination;

/// Run a web research task on the research backend and follow its progress.
///
/// While a task runs, type `stop` to cancel it, `export` to request a PDF
/// report, `quit` to leave, or any other text to start a new query.
#[derive(Debug, Parser)]
#[command(name = "research", version)]
pub struct Cli {
    /// What to research.
    #[arg(required = true, num_args = 1..)]
    pub query: Vec<String>,

    /// Base url of the research backend (overrides config and RESEARCH_API_URL).
    #[arg(long)]
    pub api_url: Option<String>,

    /// Settings file in RON format [default: ./research.ron if present].
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Request a PDF report once the research completes.
    #[arg(long)]
    pub export: bool,

    /// Download exported reports into this directory.
    #[arg(long)]
    pub report_dir: Option<PathBuf>,

    /// Give up after this many status polls without a result.
    #[arg(long)]
    pub max_polls: Option<u32>,

    /// Where log output goes.
    #[arg(long, value_enum, default_value_t = LogTarget::File)]
    pub log: LogTarget,
}

impl Cli {
    pub fn query_text(&self) -> String {
        self.query.join(" ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    Terminal,
    File,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File => LogDestination::File,
            LogTarget::Both => LogDestination::Both,
        }
    }
}
