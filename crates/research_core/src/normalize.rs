use std::collections::HashSet;

use crate::{TaskHandle, TaskId};

pub const NO_SUMMARY_PLACEHOLDER: &str = "_No summary available yet._";
pub const SNIPPET_MAX_CHARS: usize = 300;

/// A source as reported by the backend, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawSource {
    pub url: String,
    pub title: Option<String>,
    /// Full extracted page text, if the backend sent it.
    pub text: Option<String>,
    pub snippet: Option<String>,
    pub screenshot: Option<String>,
    pub reliability: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawResearchResult {
    pub summary: Option<String>,
    pub sources: Option<Vec<RawSource>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSummary {
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub screenshot: Option<String>,
    pub reliability: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchResult {
    pub task_id: TaskId,
    pub query: String,
    pub summary: String,
    pub sources: Vec<SourceSummary>,
}

/// Maps a raw backend result into the display model.
///
/// Sources keep backend order. A url seen twice keeps its first occurrence.
pub fn normalize_result(task: &TaskHandle, raw: RawResearchResult) -> ResearchResult {
    let summary = match raw.summary {
        Some(summary) if !summary.trim().is_empty() => summary,
        _ => NO_SUMMARY_PLACEHOLDER.to_string(),
    };

    let mut seen = HashSet::new();
    let sources = raw
        .sources
        .unwrap_or_default()
        .into_iter()
        .filter(|source| seen.insert(source.url.clone()))
        .map(normalize_source)
        .collect();

    ResearchResult {
        task_id: task.id.clone(),
        query: task.query.clone(),
        summary,
        sources,
    }
}

pub fn normalize_source(raw: RawSource) -> SourceSummary {
    let title = match raw.title {
        Some(title) if !title.trim().is_empty() => title,
        _ => raw.url.clone(),
    };
    let snippet = match (raw.text, raw.snippet) {
        (Some(text), _) => truncate_chars(&text, SNIPPET_MAX_CHARS).to_string(),
        (None, Some(snippet)) => snippet,
        (None, None) => String::new(),
    };

    SourceSummary {
        url: raw.url,
        title,
        snippet,
        screenshot: raw.screenshot,
        reliability: raw.reliability,
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

impl From<&SourceSummary> for RawSource {
    fn from(source: &SourceSummary) -> Self {
        Self {
            url: source.url.clone(),
            title: Some(source.title.clone()),
            text: None,
            snippet: Some(source.snippet.clone()),
            screenshot: source.screenshot.clone(),
            reliability: source.reliability,
        }
    }
}

impl From<&ResearchResult> for RawResearchResult {
    fn from(result: &ResearchResult) -> Self {
        Self {
            summary: Some(result.summary.clone()),
            sources: Some(result.sources.iter().map(RawSource::from).collect()),
        }
    }
}
