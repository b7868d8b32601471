//! Concurrent page fetcher.
//!
//! Every URL is fetched in its own task, bounded by a semaphore. A failure
//! on one URL is recorded and logged; the rest of the batch is unaffected.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use beacon_shared::{BeaconError, CrawlConfig, CrawledPages, Result};
use reqwest::Client;
use reqwest::redirect::Policy;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::clean::clean_text;
use crate::extract::extract_primary_html;

/// User-Agent string for crawl requests.
const USER_AGENT: &str = concat!("Beacon/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects followed per fetch.
const MAX_REDIRECTS: usize = 5;

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

/// Why a single URL produced no document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("refused target: {0}")]
    Refused(&'static str),

    #[error("request failed: {0}")]
    Network(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("body read failed: {0}")]
    Body(String),

    #[error("no extractable text")]
    Empty,

    #[error("task aborted: {0}")]
    Aborted(String),
}

/// A per-URL crawl failure. Logged and reported, never raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlFailure {
    pub url: String,
    pub cause: FetchError,
}

/// Result of crawling a batch of URLs.
#[derive(Debug, Clone, Default)]
pub struct CrawlOutcome {
    /// Cleaned text for every URL that succeeded.
    pub pages: CrawledPages,
    /// URLs that failed, with their cause.
    pub failures: Vec<CrawlFailure>,
    pub duration: Duration,
}

// ---------------------------------------------------------------------------
// Crawler
// ---------------------------------------------------------------------------

/// Concurrent fetch-and-clean crawler.
#[derive(Clone)]
pub struct Crawler {
    config: CrawlConfig,
    client: Client,
}

impl Crawler {
    /// Create a new crawler with the given configuration.
    ///
    /// A concurrency of zero is raised to one.
    pub fn new(mut config: CrawlConfig) -> Result<Self> {
        config.concurrency = config.concurrency.max(1);

        let allow_private = config.allow_private_hosts;
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(Policy::custom(move |attempt| {
                match redirect_refusal(attempt.url(), attempt.previous().len(), allow_private) {
                    Some(reason) => attempt.error(reason),
                    None => attempt.follow(),
                }
            }))
            .timeout(config.timeout)
            .build()
            .map_err(|e| BeaconError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Fetch and clean `urls`, returning text only for the URLs that succeeded.
    pub async fn fetch_and_clean(&self, urls: &[String]) -> CrawledPages {
        self.crawl(urls).await.pages
    }

    /// Fetch and clean `urls`, reporting successes and failures separately.
    #[instrument(skip_all, fields(urls = urls.len(), concurrency = self.config.concurrency))]
    pub async fn crawl(&self, urls: &[String]) -> CrawlOutcome {
        if urls.is_empty() {
            info!("no urls to crawl");
            return CrawlOutcome::default();
        }

        let start_time = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));

        let handles: Vec<(String, JoinHandle<std::result::Result<String, FetchError>>)> = urls
            .iter()
            .map(|url| {
                let client = self.client.clone();
                let sem = semaphore.clone();
                let allow_private = self.config.allow_private_hosts;
                let task_url = url.clone();

                let handle = tokio::spawn(async move {
                    let Ok(_permit) = sem.acquire().await else {
                        return Err(FetchError::Aborted("semaphore closed".into()));
                    };
                    fetch_page(&client, &task_url, allow_private).await
                });
                (url.clone(), handle)
            })
            .collect();

        let mut outcome = CrawlOutcome::default();

        for (url, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(FetchError::Aborted(e.to_string())),
            };

            match result {
                Ok(text) => {
                    info!(%url, chars = text.len(), "crawled");
                    outcome.pages.insert(url, text);
                }
                Err(cause) => {
                    warn!(%url, %cause, "crawl failed");
                    outcome.failures.push(CrawlFailure { url, cause });
                }
            }
        }

        outcome.duration = start_time.elapsed();

        info!(
            fetched = outcome.pages.len(),
            failed = outcome.failures.len(),
            duration_ms = outcome.duration.as_millis(),
            "crawl completed"
        );

        outcome
    }
}

// ---------------------------------------------------------------------------
// Page fetching
// ---------------------------------------------------------------------------

/// Fetch a single page and return its cleaned primary text.
async fn fetch_page(
    client: &Client,
    raw_url: &str,
    allow_private: bool,
) -> std::result::Result<String, FetchError> {
    let url = Url::parse(raw_url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

    if let Some(reason) = refusal_reason(&url, allow_private) {
        return Err(FetchError::Refused(reason));
    }

    debug!(%url, "fetching page");

    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| FetchError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }

    let body = response
        .text()
        .await
        .map_err(|e| FetchError::Body(e.to_string()))?;

    let text = clean_text(&extract_primary_html(&body));
    if text.is_empty() {
        return Err(FetchError::Empty);
    }

    Ok(text)
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Why `url` must not be fetched, if it must not.
fn refusal_reason(url: &Url, allow_private: bool) -> Option<&'static str> {
    match url.scheme() {
        "http" | "https" => {}
        _ => return Some("non-HTTP scheme"),
    }

    if allow_private {
        return None;
    }

    let host = url.host_str()?;
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = bare.parse::<IpAddr>() {
        return is_private_ip(&ip).then_some("private or loopback address");
    }

    if host == "localhost" || host.ends_with(".local") || host.ends_with(".internal") {
        return Some("local hostname");
    }

    None
}

/// Why a redirect to `next` must not be followed, given the `visited` URLs
/// so far (the original request included).
///
/// Every hop gets the same target check as the first request.
fn redirect_refusal(next: &Url, visited: usize, allow_private: bool) -> Option<&'static str> {
    if visited > MAX_REDIRECTS {
        return Some("too many redirects");
    }
    refusal_reason(next, allow_private)
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_v4(v4),
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_private_v4(&mapped);
            }
            v6.is_loopback()
                || v6.is_unspecified()
                // fc00::/7
                || v6.is_unique_local()
                // fe80::/10
                || v6.is_unicast_link_local()
        }
    }
}

fn is_private_v4(v4: &Ipv4Addr) -> bool {
    v4.is_loopback()
        || v4.is_private()
        || v4.is_link_local()
        || v4.is_broadcast()
        || v4.is_unspecified()
        // 100.64.0.0/10 (Carrier-grade NAT)
        || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
}

#[cfg(test)]
mod crawler_tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn local_crawler(timeout: Duration) -> Crawler {
        Crawler::new(CrawlConfig {
            concurrency: 4,
            timeout,
            allow_private_hosts: true,
        })
        .unwrap()
    }

    #[test]
    fn refuses_non_http_schemes() {
        let url = Url::parse("file:///etc/passwd").unwrap();
        assert_eq!(refusal_reason(&url, false), Some("non-HTTP scheme"));
        assert_eq!(refusal_reason(&url, true), Some("non-HTTP scheme"));
    }

    #[test]
    fn refuses_private_targets_by_default() {
        for raw in [
            "http://192.168.1.1/admin",
            "http://10.0.0.1/",
            "http://127.0.0.1:8080/",
            "http://[::1]/",
            "http://localhost:3000/api",
            "http://printer.local/",
        ] {
            let url = Url::parse(raw).unwrap();
            assert!(refusal_reason(&url, false).is_some(), "{raw} should be refused");
            assert!(refusal_reason(&url, true).is_none(), "{raw} should be allowed");
        }
    }

    #[test]
    fn refuses_private_ipv6_forms_by_default() {
        for raw in [
            "http://[::ffff:127.0.0.1]/",
            "http://[::ffff:10.0.0.1]:8080/",
            "http://[::ffff:192.168.0.7]/",
            "http://[fd00::1]/",
            "http://[fc00::abcd]/",
            "http://[fe80::1]/",
            "http://[::]/",
        ] {
            let url = Url::parse(raw).unwrap();
            assert!(refusal_reason(&url, false).is_some(), "{raw} should be refused");
            assert!(refusal_reason(&url, true).is_none(), "{raw} should be allowed");
        }
    }

    #[test]
    fn allows_public_targets() {
        for raw in [
            "https://www.ready.gov/floods",
            "http://[2606:4700::1111]/",
            "http://[::ffff:8.8.8.8]/",
        ] {
            let url = Url::parse(raw).unwrap();
            assert!(refusal_reason(&url, false).is_none(), "{raw} should be allowed");
        }
    }

    #[test]
    fn redirect_hops_get_the_target_check() {
        let public = Url::parse("https://www.ready.gov/floods").unwrap();
        let internal = Url::parse("http://[::ffff:127.0.0.1]:9000/admin").unwrap();
        let metadata = Url::parse("http://169.254.169.254/latest/meta-data").unwrap();

        assert!(redirect_refusal(&public, 1, false).is_none());
        assert!(redirect_refusal(&internal, 1, false).is_some());
        assert!(redirect_refusal(&metadata, 1, false).is_some());
        assert!(redirect_refusal(&internal, 1, true).is_none());
        assert!(redirect_refusal(&public, MAX_REDIRECTS, false).is_none());
        assert_eq!(
            redirect_refusal(&public, MAX_REDIRECTS + 1, false),
            Some("too many redirects")
        );
    }

    #[tokio::test]
    async fn mapped_loopback_is_not_fetched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>internal secret</p>"))
            .expect(0)
            .mount(&server)
            .await;

        let port = server.address().port();
        let target = format!("http://[::ffff:127.0.0.1]:{port}/");
        let crawler = Crawler::new(CrawlConfig {
            concurrency: 2,
            timeout: Duration::from_secs(5),
            allow_private_hosts: false,
        })
        .unwrap();

        let outcome = crawler.crawl(&[target]).await;
        assert!(outcome.pages.is_empty());
        assert_eq!(outcome.failures.len(), 1);
        assert!(matches!(outcome.failures[0].cause, FetchError::Refused(_)));
    }

    #[tokio::test]
    async fn redirect_loop_stops_at_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/loop"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/loop"))
            .mount(&server)
            .await;

        let url = format!("{}/loop", server.uri());
        let outcome = local_crawler(Duration::from_secs(5)).crawl(&[url]).await;

        assert!(outcome.pages.is_empty());
        assert!(matches!(outcome.failures[0].cause, FetchError::Network(_)));
        let requests = server.received_requests().await.unwrap_or_default();
        assert!(requests.len() > 1);
        assert!(requests.len() <= MAX_REDIRECTS + 1);
    }

    #[tokio::test]
    async fn zero_concurrency_still_completes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>Evacuate now.</p>"))
            .mount(&server)
            .await;

        let crawler = Crawler::new(CrawlConfig {
            concurrency: 0,
            timeout: Duration::from_secs(5),
            allow_private_hosts: true,
        })
        .unwrap();

        let urls = vec![format!("{}/a", server.uri()), format!("{}/b", server.uri())];
        let outcome = tokio::time::timeout(Duration::from_secs(10), crawler.crawl(&urls))
            .await
            .expect("crawl finished");
        assert_eq!(outcome.pages.len(), 2);
    }

    #[tokio::test]
    async fn empty_input_makes_no_requests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>x</p>"))
            .expect(0)
            .mount(&server)
            .await;

        let outcome = local_crawler(Duration::from_secs(5)).crawl(&[]).await;
        assert!(outcome.pages.is_empty());
        assert!(outcome.failures.is_empty());
    }

    #[tokio::test]
    async fn slow_url_is_omitted_without_blocking_others() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><body><p>Shelter in place.</p></body></html>"),
            )
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/bad"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<p>too late</p>")
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let ok = format!("{}/ok", server.uri());
        let bad = format!("{}/bad", server.uri());

        let outcome = local_crawler(Duration::from_millis(500))
            .crawl(&[ok.clone(), bad.clone()])
            .await;

        assert_eq!(outcome.pages.len(), 1);
        assert_eq!(outcome.pages.get(&ok).map(String::as_str), Some("Shelter in place."));
        assert!(!outcome.pages.contains_key(&bad));
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].url, bad);
        assert!(matches!(outcome.failures[0].cause, FetchError::Network(_)));
    }

    #[tokio::test]
    async fn status_and_empty_pages_are_failures() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/blank"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><body><header>Logo</header><footer>Links</footer></body></html>",
            ))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/guide"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<main><h1>Heat wave</h1><p>Drink water.</p></main>"),
            )
            .mount(&server)
            .await;

        let urls = vec![
            format!("{}/missing", server.uri()),
            format!("{}/blank", server.uri()),
            format!("{}/guide", server.uri()),
            "not a url".to_string(),
        ];

        let outcome = local_crawler(Duration::from_secs(5)).crawl(&urls).await;

        assert_eq!(outcome.pages.len(), 1);
        assert_eq!(
            outcome.pages.get(&urls[2]).map(String::as_str),
            Some("Heat wave Drink water.")
        );

        let causes: Vec<&FetchError> = outcome.failures.iter().map(|f| &f.cause).collect();
        assert!(causes.contains(&&FetchError::Status(404)));
        assert!(causes.contains(&&FetchError::Empty));
        assert!(causes.iter().any(|c| matches!(c, FetchError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn private_targets_refused_unless_allowed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>internal</p>"))
            .expect(0)
            .mount(&server)
            .await;

        let crawler = Crawler::new(CrawlConfig {
            concurrency: 2,
            timeout: Duration::from_secs(5),
            allow_private_hosts: false,
        })
        .unwrap();

        let pages = crawler.fetch_and_clean(&[server.uri()]).await;
        assert!(pages.is_empty());
    }
}
