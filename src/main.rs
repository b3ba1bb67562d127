mod config;
mod cues;
mod enrich;
mod extractor;
mod fetcher;
mod output;
mod pipeline;
mod records;
mod sitemap;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use config::{BackendChoice, GeminiCredentials, PipelineConfig};
use fetcher::HttpFetcher;

#[derive(Parser)]
#[command(name = "privacy_cues", about = "Privacy-policy page scraper and cue detector")]
struct Cli {
    /// User-Agent sent with every request
    #[arg(long, global = true, default_value = config::DEFAULT_USER_AGENT)]
    user_agent: String,

    /// Per-request timeout in seconds
    #[arg(long, global = true, default_value = "20")]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch pages and print their titles
    Titles {
        /// Pages to fetch (default: built-in list)
        urls: Vec<String>,
        /// Pause between requests
        #[arg(long, default_value = "1000")]
        delay_ms: u64,
    },
    /// Fetch pages and detect privacy cues in their text
    Scan {
        /// Pages to fetch (default: built-in list)
        urls: Vec<String>,
        #[arg(long, default_value = "1000")]
        delay_ms: u64,
        /// Also save the records as JSON
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Read a site's sitemap, keep policy-like URLs, sample their titles
    Crawl {
        #[arg(long, default_value = config::DEFAULT_CRAWL_BASE)]
        base: String,
        /// URL substrings to keep (default: privacy, legal, terms, security)
        #[arg(short, long = "keyword")]
        keywords: Vec<String>,
        /// Relevant URLs to print
        #[arg(long, default_value = "10")]
        show: usize,
        /// Relevant URLs to scrape
        #[arg(short = 'n', long, default_value = "3")]
        sample: usize,
        #[arg(long, default_value = "1000")]
        delay_ms: u64,
        #[arg(short, long, default_value = "crawled_sample.csv")]
        out: PathBuf,
    },
    /// Categorise policy excerpts and save them as JSON
    Enrich {
        /// One excerpt per non-empty line (default: built-in samples)
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(long, value_enum, default_value = "simulated")]
        backend: BackendChoice,
        #[arg(long, default_value = "500")]
        delay_ms: u64,
        #[arg(short, long, default_value = "enriched_policies.json")]
        out: PathBuf,
        /// Keep records already present in the output file
        #[arg(long)]
        append: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let timeout = Duration::from_secs(cli.timeout_secs);

    let result = match cli.command {
        Commands::Titles { urls, delay_ms } => {
            let cfg = PipelineConfig::new(
                config::or_defaults(urls, config::DEFAULT_TITLE_URLS),
                Duration::from_millis(delay_ms),
                cli.user_agent,
                timeout,
            )?;
            let fetcher = HttpFetcher::new(&cfg.user_agent, cfg.timeout)?;
            println!("Starting scrape of {} pages...\n", cfg.urls.len());

            let records = pipeline::scan_pages(&fetcher, &cfg, &progress(cfg.urls.len())?).await;

            println!("\nResults:");
            for r in &records {
                match (&r.error, &r.title) {
                    (Some(e), _) => println!("- {}: (error: {})", r.url, e),
                    (None, title) => println!("- {}: {}", r.url, title.as_deref().unwrap_or("No Title")),
                }
            }
            Ok(())
        }
        Commands::Scan { urls, delay_ms, out } => {
            let cfg = PipelineConfig::new(
                config::or_defaults(urls, config::DEFAULT_POLICY_URLS),
                Duration::from_millis(delay_ms),
                cli.user_agent,
                timeout,
            )?;
            let fetcher = HttpFetcher::new(&cfg.user_agent, cfg.timeout)?;
            println!("Running pipeline on {} pages...", cfg.urls.len());

            let records = pipeline::scan_pages(&fetcher, &cfg, &progress(cfg.urls.len())?).await;

            println!("\nResults:");
            for r in &records {
                println!("Result for {}:", r.url);
                match (&r.error, &r.cues) {
                    (Some(e), _) => println!("  Error: {}", e),
                    (None, Some(c)) => {
                        println!("  Title: {}", r.title.as_deref().unwrap_or("No Title"));
                        println!(
                            "  Cues: choices_controls={} retention={} third_party={}",
                            c.choices_controls, c.retention, c.third_party
                        );
                    }
                    (None, None) => println!("  No content"),
                }
                println!("{}", "-".repeat(40));
            }
            let ok = records.iter().filter(|r| r.error.is_none()).count();
            let with_cues = records
                .iter()
                .filter(|r| r.cues.is_some_and(|c| c.any()))
                .count();
            println!(
                "{} pages ({} ok, {} errors), {} with privacy cues.",
                records.len(),
                ok,
                records.len() - ok,
                with_cues
            );

            if let Some(path) = out {
                output::write_json(&path, &records)?;
                println!("Saved to {}", path.display());
            }
            Ok(())
        }
        Commands::Crawl {
            base,
            keywords,
            show,
            sample,
            delay_ms,
            out,
        } => {
            fetcher::parse_absolute(&base)?;
            let fetcher = HttpFetcher::new(&cli.user_agent, timeout)?;

            let all_urls = sitemap::list_sitemap_urls(&fetcher, &base).await;
            let keywords = config::or_defaults(keywords, config::DEFAULT_KEYWORDS);
            let relevant = sitemap::filter_relevant(&all_urls, &keywords);

            println!("\nRelevant URLs ({} found):", relevant.len());
            for u in relevant.iter().take(show) {
                println!("- {}", u);
            }

            let sampled: Vec<String> = relevant.iter().take(sample).cloned().collect();
            println!("\nSampling first {} pages...", sampled.len());
            let rows = pipeline::sample_titles(
                &fetcher,
                &sampled,
                Duration::from_millis(delay_ms),
                &progress(sampled.len())?,
            )
            .await;

            if rows.is_empty() {
                println!("No pages scraped; nothing saved.");
            } else {
                println!("\nDataset:");
                for (i, r) in rows.iter().enumerate() {
                    println!("{:>3}  {}  {}", i, r.url, r.title.as_deref().unwrap_or("No Title"));
                }
                output::write_csv(&out, &rows)?;
                println!("Saved to {}", out.display());
            }
            Ok(())
        }
        Commands::Enrich {
            input,
            backend,
            delay_ms,
            out,
            append,
        } => {
            let excerpts = match input {
                Some(path) => read_excerpts(&path)?,
                None => config::or_defaults(Vec::new(), config::DEFAULT_EXCERPTS),
            };
            let analyzer = enrich::build_analyzer(backend, GeminiCredentials::from_env())?;
            tracing::info!(simulated = analyzer.is_simulated(), "analyzer ready");
            println!("Starting enrichment pipeline...\n");

            let records = pipeline::enrich_excerpts(
                analyzer.as_ref(),
                &excerpts,
                Duration::from_millis(delay_ms),
                &progress(excerpts.len())?,
            )
            .await;

            let records = if append && out.exists() {
                let mut existing = output::read_enrichment(&out)?;
                existing.extend(records);
                existing
            } else {
                records
            };
            output::write_json(&out, &records)?;
            println!(
                "\nEnrichment complete. Saved {} records to {}",
                records.len(),
                out.display()
            );
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn progress(len: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} {wide_msg}")?
            .progress_chars("=> "),
    );
    Ok(pb)
}

fn read_excerpts(path: &std::path::Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read excerpts from {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

// ── Tests ──
