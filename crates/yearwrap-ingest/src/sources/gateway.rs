//! HTTP client for the scraper gateway that fronts the social provider.
//!
//! Endpoints used:
//!
//! | Call      | Request                                                     |
//! |-----------|-------------------------------------------------------------|
//! | login     | `POST /auth/login` `{"username","password"}` → `{"token"}`  |
//! | profile   | `GET /users/{subject}` → profile, `404` when unknown        |
//! | timeline  | `GET /users/{subject}/tweets?count=N&cursor=C`              |
//! | search    | `GET /search?q=from:{subject} since:{date}&mode=latest&...` |
//!
//! Both post endpoints answer `{"tweets": [...], "next_cursor": "..."}` and
//! return posts newest first. A missing or empty cursor ends pagination.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::{StreamExt, TryStreamExt};
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use yearwrap_core::{AppConfig, QueryStrategy, RawPost};

use super::retry::retry_with_backoff;
use super::{PostSource, PostStream, Profile};
use crate::error::SourceError;

/// Maximum number of pages to request for one subject before giving up.
/// Guards against a gateway that keeps handing out cursors.
const MAX_PAGES: usize = 200;

/// Posts requested per page.
const DEFAULT_PAGE_SIZE: u32 = 100;

/// Connection settings for [`GatewaySource`].
#[derive(Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub strategy: QueryStrategy,
    pub page_size: u32,
}

impl GatewayConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            base_url: config.gateway_url.clone(),
            username: config.gateway_username.clone(),
            password: config.gateway_password.clone(),
            timeout_secs: config.gateway_timeout_secs,
            user_agent: config.gateway_user_agent.clone(),
            max_retries: config.gateway_max_retries,
            backoff_base_ms: config.gateway_retry_backoff_ms,
            strategy: config.query_strategy,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .field("timeout_secs", &self.timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_retries", &self.max_retries)
            .field("backoff_base_ms", &self.backoff_base_ms)
            .field("strategy", &self.strategy)
            .field("page_size", &self.page_size)
            .finish()
    }
}

/// Bearer token returned by `/auth/login`.
#[derive(Debug, Clone)]
pub struct GatewaySession {
    token: String,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct TweetPage {
    #[serde(default)]
    tweets: Vec<RawPost>,
    #[serde(default, alias = "nextCursor")]
    next_cursor: Option<String>,
}

/// [`PostSource`] backed by the scraper gateway's JSON API.
///
/// Transient failures (network errors, 429, 5xx) are retried with
/// exponential back-off. Pagination is lazy: the next page is only requested
/// once the consumer has drained the current one.
#[derive(Debug)]
pub struct GatewaySource {
    client: Client,
    base: Url,
    config: GatewayConfig,
}

impl GatewaySource {
    /// # Errors
    ///
    /// - [`SourceError::InvalidBaseUrl`] if `config.base_url` is not an
    ///   absolute `http(s)` URL.
    /// - [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn new(config: GatewayConfig) -> Result<Self, SourceError> {
        let base = Url::parse(&config.base_url).map_err(|e| SourceError::InvalidBaseUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(SourceError::InvalidBaseUrl {
                url: config.base_url.clone(),
                reason: "expected an http or https URL".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            client,
            base,
            config,
        })
    }

    #[must_use]
    pub fn strategy(&self) -> QueryStrategy {
        self.config.strategy
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, SourceError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| SourceError::InvalidBaseUrl {
                url: self.base.to_string(),
                reason: "URL cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub(crate) fn page_url(
        &self,
        subject: &str,
        since: NaiveDate,
        cursor: Option<&str>,
    ) -> Result<Url, SourceError> {
        let count = self.config.page_size.to_string();
        let mut url = match self.config.strategy {
            QueryStrategy::Timeline => {
                let mut url = self.endpoint(&["users", subject, "tweets"])?;
                url.query_pairs_mut().append_pair("count", &count);
                url
            }
            QueryStrategy::Search => {
                let query = format!("from:{subject} since:{}", since.format("%Y-%m-%d"));
                let mut url = self.endpoint(&["search"])?;
                url.query_pairs_mut()
                    .append_pair("q", &query)
                    .append_pair("mode", "latest")
                    .append_pair("count", &count);
                url
            }
        };
        if let Some(cursor) = cursor {
            url.query_pairs_mut().append_pair("cursor", cursor);
        }
        Ok(url)
    }

    async fn fetch_page(
        &self,
        session: &GatewaySession,
        url: &Url,
    ) -> Result<TweetPage, SourceError> {
        retry_with_backoff(self.config.max_retries, self.config.backoff_base_ms, move || async move {
            let response = self
                .client
                .get(url.clone())
                .bearer_auth(&session.token)
                .send()
                .await?;
            let response = check_status(response, url)?;
            let body = response.text().await?;
            serde_json::from_str::<TweetPage>(&body).map_err(|e| SourceError::Deserialize {
                context: format!("post page from {url}"),
                source: e,
            })
        })
        .await
    }
}

/// Map provider status codes onto [`SourceError`]s. Success passes through.
fn check_status(
    response: reqwest::Response,
    url: &Url,
) -> Result<reqwest::Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(60);
        return Err(SourceError::RateLimited { retry_after_secs });
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(SourceError::Auth(format!(
            "gateway answered {} for {url}",
            status.as_u16()
        )));
    }

    Err(SourceError::UnexpectedStatus {
        status: status.as_u16(),
        url: url.to_string(),
    })
}

/// `true` once the oldest post on a page predates `since`; newer pages cannot
/// hold anything older, so there is no point asking for the next one.
fn reached_boundary(page: &[RawPost], since: NaiveDate) -> bool {
    page.last()
        .and_then(RawPost::posted_on)
        .is_some_and(|day| day < since)
}

#[async_trait]
impl PostSource for GatewaySource {
    type Session = GatewaySession;

    async fn authenticate(&self) -> Result<GatewaySession, SourceError> {
        let url = self.endpoint(&["auth", "login"])?;
        let body = LoginRequest {
            username: &self.config.username,
            password: &self.config.password,
        };

        let token = retry_with_backoff(self.config.max_retries, self.config.backoff_base_ms, || {
            let url = url.clone();
            let body = &body;
            async move {
                let response = self.client.post(url.clone()).json(body).send().await?;
                let response = check_status(response, &url)?;
                let text = response.text().await?;
                let parsed = serde_json::from_str::<LoginResponse>(&text).map_err(|e| {
                    SourceError::Deserialize {
                        context: "login response".to_string(),
                        source: e,
                    }
                })?;
                Ok(parsed.token)
            }
        })
        .await?;

        if token.is_empty() {
            return Err(SourceError::Auth("gateway returned an empty token".to_string()));
        }

        tracing::debug!(username = %self.config.username, "gateway login succeeded");
        Ok(GatewaySession { token })
    }

    async fn profile(
        &self,
        session: &GatewaySession,
        subject: &str,
    ) -> Result<Option<Profile>, SourceError> {
        let url = self.endpoint(&["users", subject])?;

        retry_with_backoff(self.config.max_retries, self.config.backoff_base_ms, || {
            let url = url.clone();
            async move {
                let response = self
                    .client
                    .get(url.clone())
                    .bearer_auth(&session.token)
                    .send()
                    .await?;
                if response.status() == StatusCode::NOT_FOUND {
                    return Ok(None);
                }
                let response = check_status(response, &url)?;
                let text = response.text().await?;
                let profile = serde_json::from_str::<Profile>(&text).map_err(|e| {
                    SourceError::Deserialize {
                        context: format!("profile for {subject}"),
                        source: e,
                    }
                })?;
                Ok(Some(profile))
            }
        })
        .await
    }

    fn posts<'a>(
        &'a self,
        session: &'a GatewaySession,
        subject: &'a str,
        since: NaiveDate,
    ) -> PostStream<'a> {
        // State: `Some((cursor, pages_fetched))` while more pages may exist.
        let pages = futures::stream::try_unfold(
            Some((None::<String>, 0usize)),
            move |state| async move {
                let Some((cursor, fetched)) = state else {
                    return Ok(None);
                };
                if fetched >= MAX_PAGES {
                    return Err(SourceError::PaginationLimit {
                        subject: subject.to_string(),
                        max_pages: MAX_PAGES,
                    });
                }

                let url = self.page_url(subject, since, cursor.as_deref())?;
                let page = self.fetch_page(session, &url).await?;
                tracing::debug!(
                    subject,
                    page = fetched + 1,
                    count = page.tweets.len(),
                    "fetched post page"
                );

                let next = match page.next_cursor {
                    Some(c) if !c.is_empty()
                        && !page.tweets.is_empty()
                        && !reached_boundary(&page.tweets, since) =>
                    {
                        Some((Some(c), fetched + 1))
                    }
                    _ => None,
                };
                Ok(Some((page.tweets, next)))
            },
        );

        pages
            .map_ok(|tweets| futures::stream::iter(tweets.into_iter().map(Ok)))
            .try_flatten()
            .boxed()
    }
}
