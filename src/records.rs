use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cues::CueSet;
use crate::enrich::Analysis;

/// One scanned URL. Cues are flattened next to `url` when present; a failed
/// fetch carries only `url` and `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRecord {
    pub url: String,
    pub title: Option<String>,
    #[serde(flatten)]
    pub cues: Option<CueSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageRecord {
    pub fn failed(url: &str, error: String) -> Self {
        Self {
            url: url.to_string(),
            title: None,
            cues: None,
            error: Some(error),
        }
    }
}

/// Merge a URL with what was detected on it.
pub fn normalize_row(url: &str, title: Option<String>, cues: CueSet) -> PageRecord {
    PageRecord {
        url: url.to_string(),
        title,
        cues: Some(cues),
        error: None,
    }
}

/// Row of the crawl CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleRow {
    pub url: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentRecord {
    pub original_text: String,
    pub analysis: Analysis,
    pub timestamp: DateTime<Utc>,
}

impl EnrichmentRecord {
    pub fn new(original_text: &str, analysis: Analysis) -> Self {
        Self {
            original_text: original_text.to_string(),
            analysis,
            timestamp: Utc::now(),
        }
    }
}

// ── Tests ──
