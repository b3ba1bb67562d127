use std::time::Duration;

use anyhow::{ensure, Result};
use tracing::{debug, warn};

use crate::fetcher::parse_absolute;

pub const DEFAULT_USER_AGENT: &str = "HF-PrivacyScraper/0.1";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-pro";

pub const DEFAULT_POLICY_URLS: &[&str] = &[
    "https://www.mozilla.org/en-US/privacy/",
    "https://www.nist.gov/privacy-framework",
];
pub const DEFAULT_TITLE_URLS: &[&str] = &[
    "https://www.mozilla.org/en-US/privacy/",
    "https://www.nist.gov/privacy-framework",
    "https://www.w3.org/",
];
pub const DEFAULT_CRAWL_BASE: &str = "https://www.mozilla.org";
pub const DEFAULT_KEYWORDS: &[&str] = &["privacy", "legal", "terms", "security"];
pub const DEFAULT_EXCERPTS: &[&str] = &[
    "We collect your email address and browsing history for marketing purposes.",
    "You have the right to request deletion of your data at any time.",
];

/// Everything the orchestrator needs for one run, passed explicitly.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub urls: Vec<String>,
    pub delay: Duration,
    pub user_agent: String,
    pub timeout: Duration,
}

impl PipelineConfig {
    /// Build and validate. An empty URL list is allowed; a malformed URL or a
    /// zero timeout is not.
    pub fn new(
        urls: Vec<String>,
        delay: Duration,
        user_agent: String,
        timeout: Duration,
    ) -> Result<Self> {
        ensure!(!timeout.is_zero(), "timeout must be positive");
        for url in &urls {
            parse_absolute(url)?;
        }
        Ok(Self {
            urls,
            delay,
            user_agent,
            timeout,
        })
    }
}

/// Fall back to `defaults` when the caller supplied nothing.
pub fn or_defaults(given: Vec<String>, defaults: &[&str]) -> Vec<String> {
    if given.is_empty() {
        defaults.iter().map(|s| s.to_string()).collect()
    } else {
        given
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BackendChoice {
    Simulated,
    Gemini,
}

#[derive(Debug, Clone)]
pub struct GeminiCredentials {
    pub api_key: String,
    pub model: String,
}

impl GeminiCredentials {
    /// Read `GEMINI_API_KEY` / `GEMINI_MODEL`, after loading a local `.env`
    /// if one exists.
    pub fn from_env() -> Option<Self> {
        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => warn!("Ignoring unreadable .env file: {}", e),
        }
        Self::from_vars(
            std::env::var("GEMINI_API_KEY").ok(),
            std::env::var("GEMINI_MODEL").ok(),
        )
    }

    fn from_vars(api_key: Option<String>, model: Option<String>) -> Option<Self> {
        let api_key = api_key.filter(|k| !k.trim().is_empty())?;
        Some(Self {
            api_key,
            model: model
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
        })
    }
}

// ── Tests ──
