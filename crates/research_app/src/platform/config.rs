use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use research_engine::ServiceSettings;
use research_logging::research_info;
use serde::{Deserialize, Serialize};

use super::cli::Cli;

pub const DEFAULT_CONFIG_FILE: &str = "research.ron";
pub const API_URL_ENV: &str = "RESEARCH_API_URL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_url: String,
    pub poll_interval_ms: u64,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_poll_attempts: Option<u32>,
    pub report_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        let service = ServiceSettings::default();
        Self {
            api_url: service.base_url,
            poll_interval_ms: service.poll_interval.as_millis() as u64,
            connect_timeout_secs: service.connect_timeout.as_secs(),
            request_timeout_secs: service.request_timeout.as_secs(),
            max_poll_attempts: None,
            report_dir: None,
        }
    }
}

impl Settings {
    /// Loads settings from `explicit`, or from `./research.ron` when present.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let text = fs::read_to_string(&path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        let settings = Self::parse(&text)
            .with_context(|| format!("parsing settings in {}", path.display()))?;
        research_info!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    pub fn parse(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }

    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(API_URL_ENV).filter(|url| !url.trim().is_empty()) {
            self.api_url = url;
        }
        self
    }

    pub fn with_cli(mut self, cli: &Cli) -> Self {
        if let Some(url) = &cli.api_url {
            self.api_url = url.clone();
        }
        if let Some(max) = cli.max_polls {
            self.max_poll_attempts = Some(max);
        }
        if let Some(dir) = &cli.report_dir {
            self.report_dir = Some(dir.clone());
        }
        self
    }

    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            base_url: self.api_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            report_dir: self.report_dir.clone(),
            ..ServiceSettings::default()
        }
    }
}
