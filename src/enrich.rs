use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{BackendChoice, GeminiCredentials};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const PROMPT_CHAR_LIMIT: usize = 1000;
const SIMULATED_SUMMARY: &str = "Simulated summary of the text.";
const SIMULATED_RISK: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Data Collection")]
    DataCollection,
    #[serde(rename = "User Rights")]
    UserRights,
    Security,
    Other,
}

impl Category {
    fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "data collection" => Some(Self::DataCollection),
            "user rights" => Some(Self::UserRights),
            "security" => Some(Self::Security),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub summary: String,
    pub category: Category,
    pub risk_score: u8,
    pub is_simulated: bool,
}

#[derive(thiserror::Error, Debug)]
pub enum AnalysisError {
    #[error("Gemini request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Gemini API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("No content in Gemini response")]
    EmptyResponse,

    #[error("Unparseable analysis: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<Analysis, AnalysisError>;

    fn is_simulated(&self) -> bool;
}

/// Deterministic stand-in used when no model is configured.
pub struct SimulatedAnalyzer;

#[async_trait]
impl Analyzer for SimulatedAnalyzer {
    async fn analyze(&self, text: &str) -> Result<Analysis, AnalysisError> {
        Ok(simulate(text))
    }

    fn is_simulated(&self) -> bool {
        true
    }
}

pub fn simulate(text: &str) -> Analysis {
    let category = if text.to_lowercase().contains("collect") {
        Category::DataCollection
    } else {
        Category::Other
    };
    Analysis {
        summary: SIMULATED_SUMMARY.to_string(),
        category,
        risk_score: SIMULATED_RISK,
        is_simulated: true,
    }
}

/// Run the analyzer; a failed live call degrades to the simulated analysis.
pub async fn analyze_or_simulate(analyzer: &dyn Analyzer, text: &str) -> Analysis {
    match analyzer.analyze(text).await {
        Ok(analysis) => analysis,
        Err(e) => {
            warn!("Analysis failed, using simulated result: {}", e);
            simulate(text)
        }
    }
}

/// Pick the backend once at startup. Asking for Gemini without a key is a
/// warning, not an error.
pub fn build_analyzer(
    choice: BackendChoice,
    credentials: Option<GeminiCredentials>,
) -> Result<Box<dyn Analyzer>> {
    match (choice, credentials) {
        (BackendChoice::Simulated, _) => Ok(Box::new(SimulatedAnalyzer)),
        (BackendChoice::Gemini, Some(creds)) => Ok(Box::new(GeminiAnalyzer::new(creds)?)),
        (BackendChoice::Gemini, None) => {
            warn!("Warning: GEMINI_API_KEY not found. Using placeholder mode.");
            Ok(Box::new(SimulatedAnalyzer))
        }
    }
}

pub fn build_prompt(text: &str) -> String {
    let excerpt: String = text.chars().take(PROMPT_CHAR_LIMIT).collect();
    format!(
        "Analyze the following privacy policy excerpt.\n\
         Return a JSON object with:\n\
         1. \"summary\": A 1-sentence summary.\n\
         2. \"category\": One of [\"Data Collection\", \"User Rights\", \"Security\", \"Other\"].\n\
         3. \"risk_score\": 1-5 (5 being high privacy risk).\n\
         \n\
         Text: \"{}\"",
        excerpt
    )
}

// ── Gemini ──

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    response_mime_type: &'static str,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct RawAnalysis {
    summary: String,
    category: String,
    risk_score: i64,
}

pub struct GeminiAnalyzer {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiAnalyzer {
    pub fn new(credentials: GeminiCredentials) -> Result<Self> {
        Self::with_base_url(credentials, GEMINI_BASE_URL)
    }

    pub fn with_base_url(credentials: GeminiCredentials, base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create Gemini HTTP client")?;

        Ok(Self {
            client,
            api_key: credentials.api_key,
            model: credentials.model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Analyzer for GeminiAnalyzer {
    async fn analyze(&self, text: &str) -> Result<Analysis, AnalysisError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: build_prompt(text),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                response_mime_type: "application/json",
                temperature: 0.2,
            },
        };

        debug!("Sending Gemini request to: {}", url);
        let resp = self
            .client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AnalysisError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let response: GeminiResponse = resp.json().await?;
        let reply = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or(AnalysisError::EmptyResponse)?;

        parse_analysis(&reply)
    }

    fn is_simulated(&self) -> bool {
        false
    }
}

/// Parse the model's JSON reply, tolerating a surrounding code fence.
fn parse_analysis(reply: &str) -> Result<Analysis, AnalysisError> {
    let body = reply
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let raw: RawAnalysis =
        serde_json::from_str(body).map_err(|e| AnalysisError::Malformed(e.to_string()))?;

    let category = Category::from_label(&raw.category)
        .ok_or_else(|| AnalysisError::Malformed(format!("unknown category '{}'", raw.category)))?;
    if !(1..=5).contains(&raw.risk_score) {
        return Err(AnalysisError::Malformed(format!(
            "risk_score {} outside 1-5",
            raw.risk_score
        )));
    }

    Ok(Analysis {
        summary: raw.summary.trim().to_string(),
        category,
        risk_score: raw.risk_score as u8,
        is_simulated: false,
    })
}

// ── Tests ──
