use anyhow::Result;
use quick_xml::events::Event;
use tracing::{info, warn};

use crate::fetcher::PageFetcher;

/// `<base>/sitemap.xml`, with any trailing slashes on the base removed first.
pub fn sitemap_url(base_url: &str) -> String {
    format!("{}/sitemap.xml", base_url.trim_end_matches('/'))
}

/// Fetch the site's sitemap and return every listed URL in document order.
/// Any failure (status, transport, malformed XML) yields an empty list.
pub async fn list_sitemap_urls(fetcher: &dyn PageFetcher, base_url: &str) -> Vec<String> {
    let url = sitemap_url(base_url);
    info!("Checking {}...", url);

    let xml = match fetcher.fetch(&url).await {
        Ok(fetched) => fetched.body,
        Err(e) => {
            warn!("No sitemap found: {}", e);
            return Vec::new();
        }
    };

    match parse_locs(&xml) {
        Ok(urls) => {
            info!("Found {} URLs in sitemap.", urls.len());
            urls
        }
        Err(e) => {
            warn!("Malformed sitemap at {}: {}", url, e);
            Vec::new()
        }
    }
}

/// Keep URLs containing any keyword, case-insensitively. Order and
/// duplicates are preserved.
pub fn filter_relevant(urls: &[String], keywords: &[String]) -> Vec<String> {
    let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
    urls.iter()
        .filter(|u| {
            let lower = u.to_lowercase();
            keywords.iter().any(|k| lower.contains(k.as_str()))
        })
        .cloned()
        .collect()
}

/// Collect the text of every `<loc>` element. Matches on local name so
/// prefixed namespaces and sitemap indexes are read the same way.
fn parse_locs(xml: &str) -> Result<Vec<String>> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut urls = Vec::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"loc" => {
                current = Some(String::new());
            }
            Event::Text(e) => {
                if let Some(buf) = current.as_mut() {
                    buf.push_str(&e.unescape()?);
                }
            }
            Event::CData(e) => {
                if let Some(buf) = current.as_mut() {
                    buf.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"loc" => {
                if let Some(buf) = current.take() {
                    let loc = buf.trim();
                    if !loc.is_empty() {
                        urls.push(loc.to_string());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(urls)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::HttpFetcher;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
    }

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn sitemap_url_strips_trailing_slashes() {
        assert_eq!(sitemap_url("https://x.org"), "https://x.org/sitemap.xml");
        assert_eq!(sitemap_url("https://x.org//"), "https://x.org/sitemap.xml");
    }

    #[test]
    fn urlset_fixture() {
        let urls = parse_locs(&fixture("sitemap.xml")).unwrap();
        assert_eq!(
            urls,
            strings(&[
                "https://example.org/en-US/",
                "https://example.org/en-US/privacy/",
                "https://example.org/en-US/about/legal/terms/",
                "https://example.org/en-US/security/advisories/",
                "https://example.org/search?q=privacy&lang=en",
            ])
        );
    }

    #[test]
    fn sitemap_index_locs_are_listed_not_followed() {
        let urls = parse_locs(&fixture("sitemap_index.xml")).unwrap();
        assert_eq!(
            urls,
            strings(&[
                "https://example.org/sitemap-pages.xml",
                "https://example.org/sitemap-blog.xml",
            ])
        );
    }

    #[test]
    fn malformed_xml_is_an_error() {
        assert!(parse_locs("<urlset><url><loc>x</url></urlset>").is_err());
    }

    #[test]
    fn filter_keeps_order_and_input() {
        let urls = strings(&["https://x/privacy", "https://x/about"]);
        let relevant = filter_relevant(&urls, &strings(&["privacy"]));
        assert_eq!(relevant, strings(&["https://x/privacy"]));
        assert_eq!(urls.len(), 2);
    }

    #[test]
    fn filter_is_case_insensitive_and_keeps_duplicates() {
        let urls = strings(&[
            "https://x/Legal/Terms",
            "https://x/blog",
            "https://x/PRIVACY",
            "https://x/legal/terms",
            "https://x/Legal/Terms",
        ]);
        let relevant = filter_relevant(&urls, &strings(&["privacy", "TERMS"]));
        assert_eq!(
            relevant,
            strings(&[
                "https://x/Legal/Terms",
                "https://x/PRIVACY",
                "https://x/legal/terms",
                "https://x/Legal/Terms",
            ])
        );
    }

    #[test]
    fn filter_with_no_keywords_is_empty() {
        assert!(filter_relevant(&strings(&["https://x/privacy"]), &[]).is_empty());
    }

    #[tokio::test]
    async fn lists_urls_from_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(fixture("sitemap.xml")))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new("HF-PrivacyCrawler/0.1", Duration::from_secs(5)).unwrap();
        let urls = list_sitemap_urls(&fetcher, &format!("{}/", server.uri())).await;
        assert_eq!(urls.len(), 5);
        assert_eq!(urls[1], "https://example.org/en-US/privacy/");
    }

    #[tokio::test]
    async fn missing_sitemap_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new("HF-PrivacyCrawler/0.1", Duration::from_secs(5)).unwrap();
        assert!(list_sitemap_urls(&fetcher, &server.uri()).await.is_empty());
    }

    #[tokio::test]
    async fn garbage_sitemap_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<urlset><loc>a</urlset>"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new("HF-PrivacyCrawler/0.1", Duration::from_secs(5)).unwrap();
        assert!(list_sitemap_urls(&fetcher, &server.uri()).await.is_empty());
    }
}
