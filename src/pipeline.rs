use std::time::Duration;

use indicatif::ProgressBar;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::cues::detect_cues;
use crate::enrich::{analyze_or_simulate, Analyzer};
use crate::extractor::extract;
use crate::fetcher::{fetch_page, PageFetcher};
use crate::records::{normalize_row, EnrichmentRecord, PageRecord, TitleRow};

/// Fetch → extract → detect → normalize for one URL. Failures become an
/// error record.
pub async fn scrape_page(fetcher: &dyn PageFetcher, url: &str) -> PageRecord {
    let fetched = fetch_page(fetcher, url).await;
    match fetched.body {
        Some(body) => {
            debug!(url, status = ?fetched.status_code, "extracting");
            let page = extract(&body);
            normalize_row(url, page.title, detect_cues(&page.text))
        }
        None => PageRecord::failed(
            url,
            fetched.error.unwrap_or_else(|| "empty response".to_string()),
        ),
    }
}

/// Scrape every configured URL in order, pausing `config.delay` between
/// requests. One record per URL.
pub async fn scan_pages(
    fetcher: &dyn PageFetcher,
    config: &PipelineConfig,
    pb: &ProgressBar,
) -> Vec<PageRecord> {
    let mut records = Vec::with_capacity(config.urls.len());

    for (i, url) in config.urls.iter().enumerate() {
        if i > 0 {
            pace(config.delay).await;
        }
        info!("Fetching {}...", url);
        pb.set_message(url.clone());
        records.push(scrape_page(fetcher, url).await);
        pb.inc(1);
    }

    pb.finish_and_clear();
    records
}

/// Titles for the sampled sitemap URLs. Pages that fail are logged and left
/// out of the rows.
pub async fn sample_titles(
    fetcher: &dyn PageFetcher,
    urls: &[String],
    delay: Duration,
    pb: &ProgressBar,
) -> Vec<TitleRow> {
    let mut rows = Vec::new();

    for (i, url) in urls.iter().enumerate() {
        if i > 0 {
            pace(delay).await;
        }
        pb.set_message(url.clone());
        match scrape_page(fetcher, url).await {
            PageRecord {
                error: Some(e), ..
            } => debug!("Skipping {} in sample: {}", url, e),
            record => rows.push(TitleRow {
                url: record.url,
                title: record.title,
            }),
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    rows
}

/// Analyse each excerpt in order. Always one record per excerpt.
pub async fn enrich_excerpts(
    analyzer: &dyn Analyzer,
    excerpts: &[String],
    delay: Duration,
    pb: &ProgressBar,
) -> Vec<EnrichmentRecord> {
    let mut records = Vec::with_capacity(excerpts.len());

    for (i, text) in excerpts.iter().enumerate() {
        if i > 0 {
            pace(delay).await;
        }
        info!("Analyzing: '{}...'", preview(text, 50));
        let analysis = analyze_or_simulate(analyzer, text).await;
        records.push(EnrichmentRecord::new(text, analysis));
        pb.inc(1);
    }

    pb.finish_and_clear();
    records
}

async fn pace(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

pub fn preview(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_USER_AGENT;
    use crate::cues::CueSet;
    use crate::enrich::{Category, SimulatedAnalyzer};
    use crate::fetcher::{FetchError, Fetched};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Serves canned bodies; anything else is a 500. Records every call.
    #[derive(Default)]
    struct StubFetcher {
        pages: HashMap<String, String>,
        calls: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        fn with(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(u, b)| (u.to_string(), b.to_string()))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<Fetched, FetchError> {
            self.calls.lock().unwrap().push(url.to_string());
            match self.pages.get(url) {
                Some(body) => Ok(Fetched {
                    body: body.clone(),
                    status_code: 200,
                }),
                None => Err(FetchError::Status {
                    url: url.to_string(),
                    code: 500,
                }),
            }
        }
    }

    fn config(urls: &[&str], delay: Duration) -> PipelineConfig {
        PipelineConfig::new(
            urls.iter().map(|s| s.to_string()).collect(),
            delay,
            DEFAULT_USER_AGENT.to_string(),
            Duration::from_secs(20),
        )
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn empty_list_does_nothing() {
        let fetcher = StubFetcher::default();
        let start = Instant::now();
        let records = scan_pages(&fetcher, &config(&[], Duration::from_secs(1)), &ProgressBar::hidden()).await;
        assert!(records.is_empty());
        assert!(fetcher.calls().is_empty());
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn scans_in_order_with_delay_between() {
        let fetcher = StubFetcher::with(&[
            (
                "https://a.org/privacy",
                "<title>A</title><p>You can opt out. We retain logs.</p>",
            ),
            ("https://c.org/", "<p>We share with third-party partners.</p>"),
        ]);
        let urls = ["https://a.org/privacy", "https://b.org/down", "https://c.org/"];

        let start = Instant::now();
        let records = scan_pages(&fetcher, &config(&urls, Duration::from_secs(1)), &ProgressBar::hidden()).await;
        assert_eq!(start.elapsed(), Duration::from_secs(2));

        assert_eq!(fetcher.calls(), urls.to_vec());
        let got: Vec<&str> = records.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(got, urls.to_vec());

        assert_eq!(records[0].title.as_deref(), Some("A"));
        assert_eq!(
            records[0].cues,
            Some(CueSet {
                choices_controls: true,
                retention: true,
                third_party: false,
            })
        );

        // a failed fetch does not stop the loop
        assert!(records[1].error.as_deref().unwrap().contains("500"));
        assert_eq!(records[1].title, None);
        assert_eq!(records[1].cues, None);

        assert_eq!(records[2].title, None);
        assert!(records[2].cues.unwrap().third_party);
        assert!(records[2].error.is_none());
    }

    #[tokio::test]
    async fn cue_found_only_in_title() {
        let fetcher = StubFetcher::with(&[(
            "https://x/choices",
            "<html><head><title>Your Choices and Preferences</title></head><body><p>Hello</p></body></html>",
        )]);
        let records = scan_pages(&fetcher, &config(&["https://x/choices"], Duration::ZERO), &ProgressBar::hidden()).await;
        assert_eq!(
            records[0].cues,
            Some(CueSet {
                choices_controls: true,
                retention: false,
                third_party: false,
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn single_url_does_not_wait() {
        let fetcher = StubFetcher::with(&[("https://x/", "<p>x</p>")]);
        let start = Instant::now();
        scan_pages(&fetcher, &config(&["https://x/"], Duration::from_secs(1)), &ProgressBar::hidden()).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn unreachable_url_becomes_error_record() {
        let fetcher = crate::fetcher::HttpFetcher::new(DEFAULT_USER_AGENT, Duration::from_secs(2)).unwrap();
        let record = scrape_page(&fetcher, "http://127.0.0.1:9/privacy").await;
        assert!(record.error.is_some());
        assert!(record.title.is_none());
        assert!(record.cues.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn sample_titles_skips_failures() {
        let fetcher = StubFetcher::with(&[
            ("https://x/privacy", "<title> Privacy </title>"),
            ("https://x/terms", "<p>no title</p>"),
        ]);
        let urls: Vec<String> = ["https://x/privacy", "https://x/broken", "https://x/terms"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let rows = sample_titles(&fetcher, &urls, Duration::from_secs(1), &ProgressBar::hidden()).await;
        assert_eq!(
            rows,
            vec![
                TitleRow {
                    url: "https://x/privacy".into(),
                    title: Some("Privacy".into()),
                },
                TitleRow {
                    url: "https://x/terms".into(),
                    title: None,
                },
            ]
        );
        assert_eq!(fetcher.calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn enrich_keeps_order_and_paces() {
        let excerpts = vec![
            "We collect your email address and browsing history for marketing purposes.".to_string(),
            "You have the right to request deletion of your data at any time.".to_string(),
        ];
        let start = Instant::now();
        let records =
            enrich_excerpts(&SimulatedAnalyzer, &excerpts, Duration::from_millis(500), &ProgressBar::hidden()).await;
        assert_eq!(start.elapsed(), Duration::from_millis(500));

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].original_text, excerpts[0]);
        assert_eq!(records[0].analysis.category, Category::DataCollection);
        assert_eq!(records[1].analysis.category, Category::Other);
        assert!(records.iter().all(|r| r.analysis.is_simulated));
        assert!(records[0].timestamp <= records[1].timestamp);
    }

    #[test]
    fn preview_is_char_safe() {
        assert_eq!(preview("héllo wörld", 4), "héll");
        assert_eq!(preview("ab", 50), "ab");
    }
}
