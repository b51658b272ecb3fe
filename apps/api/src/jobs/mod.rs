//! Job Posting Fetcher: URL → structured `JobPosting`.
//!
//! Downloads the page with retry and backoff, picks an extraction strategy by
//! domain, and falls back to generic heuristics. A page that cannot be read
//! yields `Parse`, never an empty posting; callers can then accept pasted text
//! through `JobPosting::from_manual`.

pub mod handlers;
pub mod html;
pub mod strategies;

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, StatusCode};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::models::job::JobPosting;
use crate::retry::{retry, Backoff, RetryPolicy, Transient};
use strategies::StrategyTable;

/// Browser-like user agent; several job boards serve bots a stripped page.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Final-URL path fragments that mean the site redirected to a login wall.
const LOGIN_PATH_MARKERS: &[&str] = &["authwall", "login", "signin", "sign-in"];

#[derive(Debug, Error, PartialEq)]
pub enum JobError {
    #[error("Invalid job URL: {0}")]
    InvalidUrl(String),

    #[error("Could not fetch {url}: {message}")]
    Fetch {
        url: String,
        message: String,
        transient: bool,
    },

    #[error("Could not read a job posting from {url}: {reason}")]
    Parse { url: String, reason: String },
}

impl Transient for JobError {
    fn is_transient(&self) -> bool {
        matches!(
            self,
            JobError::Fetch {
                transient: true,
                ..
            }
        )
    }
}

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub timeout: Duration,
    pub max_attempts: u32,
    pub backoff: Backoff,
}

/// Fetches and parses job pages. Cheap to clone.
#[derive(Clone)]
pub struct JobFetcher {
    client: Client,
    table: Arc<StrategyTable>,
    policy: RetryPolicy,
}

impl JobFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            table: Arc::new(StrategyTable::default()),
            policy: settings.backoff.with_attempts(settings.max_attempts),
        })
    }

    /// Fetches `raw_url` and extracts a posting. Transient network failures are
    /// retried; HTTP client errors and unreadable pages are not.
    pub async fn fetch(&self, raw_url: &str) -> Result<JobPosting, JobError> {
        let url = parse_job_url(raw_url)?;
        info!("Fetching job posting from {url}");

        let downloaded = retry(&self.policy, "Job page fetch", |_| self.download(&url))
            .await
            .map_err(|exhausted| {
                warn!(
                    "Job page fetch gave up after {} attempt(s): {}",
                    exhausted.attempts, exhausted.error
                );
                exhausted.error
            })?;

        debug!(
            "Downloaded {} bytes from {url} in {} attempt(s)",
            downloaded.value.len(),
            downloaded.attempts
        );

        // Html is !Send, so parsing stays in this synchronous call after all awaits.
        self.table.extract(&url, &downloaded.value)
    }

    async fn download(&self, url: &Url) -> Result<String, JobError> {
        let fetch_error = |message: String, transient: bool| JobError::Fetch {
            url: url.to_string(),
            message,
            transient,
        };

        let response = self
            .client
            .get(url.clone())
            .header(header::ACCEPT, "text/html,application/xhtml+xml")
            .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9,de;q=0.8")
            .send()
            .await
            .map_err(|e| fetch_error(describe_request_error(&e), true))?;

        let status = response.status();
        let final_url = response.url().clone();

        if status == StatusCode::UNAUTHORIZED
            || status == StatusCode::FORBIDDEN
            || is_login_redirect(&final_url)
        {
            return Err(JobError::Parse {
                url: url.to_string(),
                reason: "the page requires signing in".to_string(),
            });
        }

        if !status.is_success() {
            let transient = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
            return Err(fetch_error(format!("HTTP {status}"), transient));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        if !content_type.is_empty() && !content_type.contains("html") {
            return Err(JobError::Parse {
                url: url.to_string(),
                reason: format!("expected an HTML page, got '{content_type}'"),
            });
        }

        response
            .text()
            .await
            .map_err(|e| fetch_error(format!("failed to read body: {e}"), true))
    }
}

/// Accepts absolute http(s) URLs only.
fn parse_job_url(raw: &str) -> Result<Url, JobError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(JobError::InvalidUrl("URL is empty".to_string()));
    }
    let url = Url::parse(trimmed).map_err(|e| JobError::InvalidUrl(format!("{trimmed}: {e}")))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        scheme => Err(JobError::InvalidUrl(format!(
            "{trimmed}: unsupported scheme '{scheme}'"
        ))),
    }
}

fn is_login_redirect(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    LOGIN_PATH_MARKERS.iter().any(|marker| path.contains(marker))
}

fn describe_request_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        e.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use axum::{
        http::StatusCode as ServerStatus,
        response::{Html, Redirect},
        routing::get,
        Json, Router,
    };

    use super::*;

    const JOB_PAGE: &str = r#"<html><head><title>Data Analyst | Initech</title></head>
<body><h1>Data Analyst</h1><div>
<p>Initech is hiring a Data Analyst to own weekly reporting for the sales team.</p>
<p>You will write SQL against our warehouse and automate reports with Python.</p>
<p>Three years of analytics experience and clear written communication required.</p>
</div></body></html>"#;

    fn quick_fetcher(max_attempts: u32) -> JobFetcher {
        JobFetcher::new(&FetchSettings {
            timeout: Duration::from_secs(2),
            max_attempts,
            backoff: Backoff {
                base_delay: Duration::from_millis(5),
                ..Backoff::default()
            },
        })
        .unwrap()
    }

    /// Serves `app` on an ephemeral localhost port and returns its base URL.
    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    /// A route that always answers `status` and counts its hits.
    fn counted(status: ServerStatus, hits: Arc<AtomicU32>) -> axum::routing::MethodRouter {
        get(move || {
            let hits = hits.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                status
            }
        })
    }

    #[test]
    fn test_parse_job_url_accepts_http_and_https() {
        assert!(parse_job_url("https://www.linkedin.com/jobs/view/1").is_ok());
        assert!(parse_job_url("  http://example.com/job  ").is_ok());
    }

    #[test]
    fn test_parse_job_url_rejects_garbage() {
        assert!(matches!(parse_job_url(""), Err(JobError::InvalidUrl(_))));
        assert!(matches!(
            parse_job_url("not a url"),
            Err(JobError::InvalidUrl(_))
        ));
        assert!(matches!(
            parse_job_url("ftp://example.com/job.html"),
            Err(JobError::InvalidUrl(_))
        ));
        assert!(matches!(
            parse_job_url("file:///etc/passwd"),
            Err(JobError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_login_redirect_detection() {
        assert!(is_login_redirect(
            &Url::parse("https://www.linkedin.com/authwall?trk=x").unwrap()
        ));
        assert!(is_login_redirect(
            &Url::parse("https://secure.indeed.com/account/login").unwrap()
        ));
        assert!(!is_login_redirect(
            &Url::parse("https://www.indeed.com/viewjob?jk=1").unwrap()
        ));
    }

    #[test]
    fn test_only_flagged_fetch_errors_are_transient() {
        let fetch = |transient| JobError::Fetch {
            url: "u".into(),
            message: "m".into(),
            transient,
        };
        assert!(fetch(true).is_transient());
        assert!(!fetch(false).is_transient());
        assert!(!JobError::Parse {
            url: "u".into(),
            reason: "r".into()
        }
        .is_transient());
        assert!(!JobError::InvalidUrl("u".into()).is_transient());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_fetch_error_after_all_attempts() {
        let fetcher = JobFetcher::new(&FetchSettings {
            timeout: Duration::from_millis(500),
            max_attempts: 2,
            backoff: Backoff {
                base_delay: Duration::from_millis(10),
                ..Backoff::default()
            },
        })
        .unwrap();

        // Port 9 on localhost (discard) is closed in test environments.
        let err = fetcher.fetch("http://127.0.0.1:9/job").await.unwrap_err();
        assert!(matches!(err, JobError::Fetch { transient: true, .. }));
    }

    #[tokio::test]
    async fn test_invalid_url_fails_before_network() {
        let fetcher = JobFetcher::new(&FetchSettings {
            timeout: Duration::from_secs(1),
            max_attempts: 3,
            backoff: Backoff::default(),
        })
        .unwrap();
        assert!(matches!(
            fetcher.fetch("mailto:jobs@example.com").await,
            Err(JobError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_html_page_is_parsed_into_posting() {
        let base = serve(Router::new().route("/job", get(|| async { Html(JOB_PAGE) }))).await;

        let posting = quick_fetcher(2).fetch(&format!("{base}/job")).await.unwrap();

        assert_eq!(posting.title, "Data Analyst");
        assert!(posting.description.contains("write SQL"));
    }

    #[tokio::test]
    async fn test_unauthorized_and_forbidden_are_parse_errors_without_retry() {
        let hits = Arc::new(AtomicU32::new(0));
        let base = serve(
            Router::new()
                .route("/401", counted(ServerStatus::UNAUTHORIZED, hits.clone()))
                .route("/403", counted(ServerStatus::FORBIDDEN, hits.clone())),
        )
        .await;
        let fetcher = quick_fetcher(3);

        for path in ["/401", "/403"] {
            let err = fetcher.fetch(&format!("{base}{path}")).await.unwrap_err();
            assert!(matches!(err, JobError::Parse { .. }), "{path}: {err:?}");
        }
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_login_redirect_is_parse_error() {
        let base = serve(
            Router::new()
                .route("/job", get(|| async { Redirect::temporary("/authwall") }))
                .route("/authwall", get(|| async { Html(JOB_PAGE) })),
        )
        .await;

        let err = quick_fetcher(3).fetch(&format!("{base}/job")).await.unwrap_err();
        assert!(matches!(err, JobError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_server_errors_and_rate_limits_use_whole_budget() {
        for status in [ServerStatus::SERVICE_UNAVAILABLE, ServerStatus::TOO_MANY_REQUESTS] {
            let hits = Arc::new(AtomicU32::new(0));
            let base = serve(Router::new().route("/job", counted(status, hits.clone()))).await;

            let err = quick_fetcher(3).fetch(&format!("{base}/job")).await.unwrap_err();

            assert!(
                matches!(err, JobError::Fetch { transient: true, .. }),
                "{status}: {err:?}"
            );
            assert_eq!(hits.load(Ordering::SeqCst), 3, "{status}");
        }
    }

    #[tokio::test]
    async fn test_other_client_errors_are_permanent_fetch_errors() {
        let hits = Arc::new(AtomicU32::new(0));
        let base = serve(
            Router::new().route("/job", counted(ServerStatus::NOT_FOUND, hits.clone())),
        )
        .await;

        let err = quick_fetcher(3).fetch(&format!("{base}/job")).await.unwrap_err();

        assert!(matches!(err, JobError::Fetch { transient: false, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_html_content_type_is_parse_error() {
        let base = serve(Router::new().route(
            "/job",
            get(|| async { Json(serde_json::json!({"title": "Data Analyst"})) }),
        ))
        .await;

        let err = quick_fetcher(3).fetch(&format!("{base}/job")).await.unwrap_err();
        match err {
            JobError::Parse { reason, .. } => assert!(reason.contains("application/json")),
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transient_failure_then_success_returns_posting() {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();
        let base = serve(Router::new().route(
            "/job",
            get(move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(ServerStatus::BAD_GATEWAY)
                    } else {
                        Ok(Html(JOB_PAGE))
                    }
                }
            }),
        ))
        .await;

        let posting = quick_fetcher(2).fetch(&format!("{base}/job")).await.unwrap();

        assert!(posting.description.contains("weekly reporting"));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
