//! Fetch orchestration.
//!
//! One fetch walks `CheckCache → Authenticating → Streaming → Aggregating →
//! Persisting → Done`, publishing progress as it goes. Any failure jumps to
//! `Failed`. Whatever the exit path, the subject's progress ends on a terminal
//! value so observers always learn how the fetch finished.

use std::pin::pin;

use chrono::{Datelike, NaiveDate, Utc};
use futures::StreamExt;
use yearwrap_core::{AggregateResult, Progress, RawPost};

use crate::aggregate::aggregate;
use crate::error::FetchError;
use crate::filter::{filter_posts, year_start};
use crate::progress::ProgressStore;
use crate::sources::PostSource;
use crate::store::ResultStore;

/// Progress reserved for streaming: the first accepted post moves past
/// `STREAM_START`, the cap-th lands on `STREAM_END`.
const STREAM_START: u32 = 30;
const STREAM_END: u32 = 80;

/// How a successful fetch produced its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Already stored; the provider was not contacted.
    Cached(AggregateResult),
    /// Freshly fetched, aggregated and stored.
    Fetched(AggregateResult),
    /// The subject exists but no post qualified. The empty result is stored.
    Empty(AggregateResult),
}

impl FetchOutcome {
    #[must_use]
    pub fn result(&self) -> &AggregateResult {
        match self {
            FetchOutcome::Cached(r) | FetchOutcome::Fetched(r) | FetchOutcome::Empty(r) => r,
        }
    }

    #[must_use]
    pub fn into_result(self) -> AggregateResult {
        match self {
            FetchOutcome::Cached(r) | FetchOutcome::Fetched(r) | FetchOutcome::Empty(r) => r,
        }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            FetchOutcome::Cached(_) => "cached",
            FetchOutcome::Fetched(_) => "fetched",
            FetchOutcome::Empty(_) => "empty",
        }
    }
}

/// Lower-case and trim a user-supplied handle.
#[must_use]
pub fn normalize_subject(raw: &str) -> String {
    raw.trim().trim_start_matches('@').to_lowercase()
}

/// Progress after `accepted` posts out of at most `cap`.
fn streaming_progress(accepted: usize, cap: usize) -> Progress {
    let span = STREAM_END - STREAM_START;
    let step = if cap == 0 {
        span
    } else {
        let scaled = accepted.saturating_mul(span as usize) / cap;
        u32::try_from(scaled).unwrap_or(span).min(span)
    };
    Progress::running(STREAM_START + step)
}

/// Ties a [`PostSource`], a [`ResultStore`] and a [`ProgressStore`] together.
pub struct FetchPipeline<S, R> {
    source: S,
    store: R,
    progress: ProgressStore,
    post_cap: usize,
}

impl<S, R> FetchPipeline<S, R>
where
    S: PostSource,
    R: ResultStore,
{
    pub fn new(source: S, store: R, progress: ProgressStore, post_cap: usize) -> Self {
        Self {
            source,
            store,
            progress,
            post_cap,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn store(&self) -> &R {
        &self.store
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    pub fn post_cap(&self) -> usize {
        self.post_cap
    }

    /// Fetch this year's stats for `subject`.
    ///
    /// # Errors
    ///
    /// See [`FetchPipeline::fetch_as_of`].
    pub async fn fetch(&self, subject: &str) -> Result<FetchOutcome, FetchError> {
        self.fetch_as_of(subject, Utc::now().date_naive()).await
    }

    /// Fetch stats for the year containing `today`, with the histogram
    /// running up to `today`.
    ///
    /// Returns the stored result untouched when one exists for the key. On
    /// every exit path the subject's progress ends on `Succeeded` or `Failed`.
    ///
    /// # Errors
    ///
    /// - [`FetchError::InvalidSubject`] for a blank subject.
    /// - [`FetchError::Store`] if the cache lookup fails.
    /// - [`FetchError::Auth`] if the provider rejects the login.
    /// - [`FetchError::SubjectNotFound`] if the account does not exist.
    /// - [`FetchError::Stream`] if reading posts fails; posts accepted so far
    ///   are discarded and nothing is stored.
    /// - [`FetchError::Persistence`] if storing the result fails.
    pub async fn fetch_as_of(
        &self,
        subject: &str,
        today: NaiveDate,
    ) -> Result<FetchOutcome, FetchError> {
        let subject = normalize_subject(subject);
        let year = today.year();

        let outcome = if subject.is_empty() {
            Err(FetchError::InvalidSubject)
        } else {
            self.run(&subject, year, today).await
        };

        match &outcome {
            Ok(outcome) => {
                tracing::info!(
                    subject = %subject,
                    year,
                    outcome = outcome.kind(),
                    total_posts = outcome.result().total_posts,
                    "fetch complete"
                );
                self.progress
                    .publish(&subject, Progress::Succeeded, Some("Complete!".to_string()));
            }
            Err(e) => {
                tracing::warn!(subject = %subject, year, error = %e, "fetch failed");
                self.progress
                    .publish(&subject, Progress::Failed, Some(e.status_text()));
            }
        }

        outcome
    }

    fn report(&self, subject: &str, progress: Progress, status: impl Into<String>) {
        self.progress.publish(subject, progress, Some(status.into()));
    }

    async fn run(
        &self,
        subject: &str,
        year: i32,
        today: NaiveDate,
    ) -> Result<FetchOutcome, FetchError> {
        self.report(subject, Progress::running(0), "Starting...");

        // CheckCache
        if let Some(cached) = self
            .store
            .find(subject, year)
            .await
            .map_err(FetchError::Store)?
        {
            tracing::debug!(subject, year, "stats already stored, skipping provider");
            return Ok(FetchOutcome::Cached(cached));
        }

        // Authenticating
        self.report(subject, Progress::running(10), "Connecting...");
        let session = self
            .source
            .authenticate()
            .await
            .map_err(FetchError::Auth)?;

        self.report(subject, Progress::running(20), "Verifying user...");
        let profile = self
            .source
            .profile(&session, subject)
            .await
            .map_err(|source| FetchError::Stream {
                accepted: 0,
                source,
            })?;
        if profile.is_none() {
            return Err(FetchError::SubjectNotFound {
                subject: subject.to_string(),
            });
        }

        // Streaming
        self.report(subject, Progress::running(STREAM_START), "Fetching posts...");
        let posts = self.collect_posts(&session, subject, year).await?;

        // Aggregating
        self.report(subject, Progress::running(90), "Calculating stats...");
        let result = aggregate(subject, year, &posts, today);

        // Persisting
        self.report(subject, Progress::running(95), "Saving stats...");
        let stored = self
            .store
            .upsert(&result)
            .await
            .map_err(FetchError::Persistence)?;

        Ok(if stored.is_empty() {
            FetchOutcome::Empty(stored)
        } else {
            FetchOutcome::Fetched(stored)
        })
    }

    async fn collect_posts(
        &self,
        session: &S::Session,
        subject: &str,
        year: i32,
    ) -> Result<Vec<RawPost>, FetchError> {
        let raw = self.source.posts(session, subject, year_start(year));
        let mut accepted = pin!(filter_posts(raw, year, self.post_cap));
        let mut posts = Vec::new();

        while let Some(item) = accepted.next().await {
            match item {
                Ok(post) => {
                    posts.push(post);
                    let count = posts.len();
                    self.report(
                        subject,
                        streaming_progress(count, self.post_cap),
                        format!("Fetched {count} posts..."),
                    );
                }
                Err(source) => {
                    return Err(FetchError::Stream {
                        accepted: posts.len(),
                        source,
                    });
                }
            }
        }

        tracing::debug!(subject, year, accepted = posts.len(), "post stream drained");
        Ok(posts)
    }
}
