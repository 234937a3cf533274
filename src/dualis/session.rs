//! Cookie-bearing HTTP session shared by every stage of a crawl.

use crate::dualis::CrawlConfig;
use crate::dualis::errors::{CrawlError, Stage};
use crate::utils::{fmt_duration, log_if_slow};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderMap;
use reqwest::{RequestBuilder, StatusCode};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use url::Url;

const USER_AGENT: &str = concat!("dualis-crawler/", env!("CARGO_PKG_VERSION"));

/// Requests slower than this get a warning in the logs.
const SLOW_REQUEST: Duration = Duration::from_secs(2);

/// A fully-read portal response.
#[derive(Debug, Clone)]
pub struct PortalResponse {
    /// Final URL after any HTTP-level redirects.
    pub url: String,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl PortalResponse {
    /// First value of a header, if present. Non-ASCII bytes are decoded lossily.
    pub fn header(&self, name: &str) -> Option<Cow<'_, str>> {
        self.headers
            .get(name)
            .map(|v| String::from_utf8_lossy(v.as_bytes()))
    }
}

/// HTTP client and cookie jar for one crawl.
///
/// Cookies set by any response are replayed on later requests to the same
/// host; [`Session::inject_cookie`] writes to the same jar.
pub struct Session {
    http: reqwest::Client,
    jar: Arc<Jar>,
    base_url: Url,
    max_retries: u32,
    retry_backoff: Duration,
    cancel: CancellationToken,
}

impl Session {
    pub fn new(config: &CrawlConfig, cancel: CancellationToken) -> Result<Self, CrawlError> {
        let jar = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .cookie_provider(jar.clone())
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(CrawlError::Client)?;

        Ok(Self {
            http,
            jar,
            base_url: config.base_url.clone(),
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff,
            cancel,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Resolve a portal-relative path (or absolute URL) against the base origin.
    pub fn resolve(&self, path: &str) -> Result<Url, CrawlError> {
        self.base_url
            .join(path)
            .map_err(|source| CrawlError::InvalidUrl {
                url: path.to_owned(),
                source,
            })
    }

    pub async fn get(&self, stage: Stage, path: &str) -> Result<PortalResponse, CrawlError> {
        let url = self.resolve(path)?;
        self.send(stage, &url, || self.http.get(url.clone())).await
    }

    pub async fn post_form(
        &self,
        stage: Stage,
        path: &str,
        fields: &[(&str, &str)],
    ) -> Result<PortalResponse, CrawlError> {
        let url = self.resolve(path)?;
        self.send(stage, &url, || self.http.post(url.clone()).form(fields))
            .await
    }

    /// Store a cookie for the portal host in the session jar.
    pub fn inject_cookie(&self, cookie: &cookie::Cookie<'_>) {
        self.jar.add_cookie_str(&cookie.to_string(), &self.base_url);
        debug!(name = cookie.name(), "injected cookie into session");
    }

    /// The `Cookie` header the session would send to the portal root.
    pub fn cookie_header(&self) -> Option<String> {
        self.jar
            .cookies(&self.base_url)
            .and_then(|v| v.to_str().ok().map(str::to_owned))
    }

    async fn send<F>(&self, stage: Stage, url: &Url, build: F) -> Result<PortalResponse, CrawlError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0u32;
        loop {
            let start = Instant::now();
            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    return Err(CrawlError::Cancelled {
                        stage,
                        url: url.to_string(),
                    });
                }
                result = read_response(build()) => result,
            };
            log_if_slow(start, SLOW_REQUEST, url.path());

            match result {
                Ok(response) => {
                    trace!(
                        stage = %stage,
                        url = %url,
                        status = response.status.as_u16(),
                        bytes = response.body.len(),
                        duration = fmt_duration(start.elapsed()),
                        "portal response"
                    );
                    return Ok(response);
                }
                Err(source) if attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.retry_backoff * attempt;
                    warn!(
                        stage = %stage,
                        url = %url,
                        attempt,
                        max_retries = self.max_retries,
                        delay = fmt_duration(delay),
                        error = %source,
                        "request failed, retrying"
                    );
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => {
                            return Err(CrawlError::Cancelled {
                                stage,
                                url: url.to_string(),
                            });
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(source) => {
                    return Err(CrawlError::Transport {
                        stage,
                        url: url.to_string(),
                        source,
                    });
                }
            }
        }
    }
}

async fn read_response(request: RequestBuilder) -> Result<PortalResponse, reqwest::Error> {
    let response = request.send().await?;
    let url = response.url().to_string();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.text().await?;
    Ok(PortalResponse {
        url,
        status,
        headers,
        body,
    })
}
