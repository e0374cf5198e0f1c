//! Per-subject progress channels with timed self-cleanup.
//!
//! Each subject gets a `watch` channel holding its latest [`ProgressRecord`].
//! Publishers overwrite it, pollers read it, subscribers get a stream that
//! starts with the current value. A terminal value (success or failure)
//! schedules removal of the channel after a grace period so a lagging
//! observer still gets one last read. A running value that nobody updates
//! for the idle TTL is removed too, so an abandoned fetch or a stray external
//! publish cannot pin a channel forever.
//!
//! ```text
//! publish(30) ─┐
//! publish(55) ─┼─► watch::Sender ──► ProgressSubscription (SSE)
//! publish(100)─┘        │        └─► latest() (poll)
//!                       └── grace timer ──► remove
//! ```

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use yearwrap_core::{Progress, ProgressRecord};

/// How long a terminal record stays readable before it is removed.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(2);

/// How long a running record may go without a publish before it is removed.
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(10 * 60);

struct Channel {
    tx: watch::Sender<Option<ProgressRecord>>,
    /// Bumped on every publish; a cleanup timer only fires for its own epoch.
    epoch: u64,
    cleanup: Option<JoinHandle<()>>,
}

impl Channel {
    fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            tx,
            epoch: 0,
            cleanup: None,
        }
    }

    fn cancel_cleanup(&mut self) {
        if let Some(handle) = self.cleanup.take() {
            handle.abort();
        }
    }

    fn current(&self) -> Option<ProgressRecord> {
        self.tx.borrow().clone()
    }
}

struct Inner {
    grace: Duration,
    idle_ttl: Duration,
    channels: Mutex<HashMap<String, Channel>>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Channel>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn expire(&self, subject: &str, epoch: u64) {
        let mut channels = self.lock();
        if channels.get(subject).is_some_and(|c| c.epoch == epoch) {
            channels.remove(subject);
            tracing::debug!(subject, "progress record expired");
        }
    }

    /// Called when a subscription goes away. Drops the channel once nobody
    /// is listening and there is nothing left to report.
    fn release(&self, subject: &str) {
        let mut channels = self.lock();
        let idle = channels.get(subject).is_some_and(|c| {
            c.tx.receiver_count() == 0
                && c.tx
                    .borrow()
                    .as_ref()
                    .is_none_or(|r| r.progress.is_terminal())
        });
        if idle {
            if let Some(mut channel) = channels.remove(subject) {
                channel.cancel_cleanup();
            }
        }
    }
}

/// Registry of live progress, keyed by subject.
///
/// Cheap to clone; clones share the same registry. Call [`shutdown`] when the
/// owning service stops to cancel pending cleanup timers.
///
/// [`shutdown`]: ProgressStore::shutdown
#[derive(Clone)]
pub struct ProgressStore {
    inner: Arc<Inner>,
}

impl ProgressStore {
    #[must_use]
    pub fn new(grace: Duration) -> Self {
        Self::with_idle_ttl(grace, DEFAULT_IDLE_TTL)
    }

    #[must_use]
    pub fn with_idle_ttl(grace: Duration, idle_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                grace,
                idle_ttl,
                channels: Mutex::new(HashMap::new()),
            }),
        }
    }

    #[must_use]
    pub fn grace(&self) -> Duration {
        self.inner.grace
    }

    /// Overwrite the record for `subject` and return what was stored.
    ///
    /// A running value never lowers a running value already stored, so two
    /// fetches for the same subject cannot make observers go backwards. A
    /// terminal value schedules removal after the grace period; any later
    /// publish cancels that removal and starts a fresh record. A running
    /// value schedules removal after the idle TTL, pushed back by every
    /// publish.
    ///
    /// Must be called from within a Tokio runtime for cleanup to be scheduled.
    pub fn publish(
        &self,
        subject: &str,
        progress: Progress,
        status: Option<String>,
    ) -> ProgressRecord {
        let mut channels = self.inner.lock();
        let channel = channels
            .entry(subject.to_string())
            .or_insert_with(Channel::new);

        let previous = channel.tx.borrow().as_ref().map(|r| r.progress);
        let progress = match (previous, progress) {
            (Some(Progress::Running(prev)), Progress::Running(next)) if next < prev => {
                Progress::Running(prev)
            }
            _ => progress,
        };

        channel.cancel_cleanup();
        channel.epoch += 1;

        let record = ProgressRecord {
            subject: subject.to_string(),
            progress,
            status,
        };
        channel.tx.send_replace(Some(record.clone()));

        let delay = if progress.is_terminal() {
            self.inner.grace
        } else {
            self.inner.idle_ttl
        };
        channel.cleanup = self.schedule_cleanup(subject, channel.epoch, delay);

        record
    }

    fn schedule_cleanup(
        &self,
        subject: &str,
        epoch: u64,
        delay: Duration,
    ) -> Option<JoinHandle<()>> {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(subject, "no runtime available; progress record will not expire");
            return None;
        };

        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        let subject = subject.to_string();
        Some(handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = inner.upgrade() {
                inner.expire(&subject, epoch);
            }
        }))
    }

    /// Latest record for `subject`, or `None` if nothing was published (or
    /// the record already expired).
    #[must_use]
    pub fn latest(&self, subject: &str) -> Option<ProgressRecord> {
        self.inner.lock().get(subject).and_then(Channel::current)
    }

    /// Live stream of records for `subject`.
    ///
    /// Emits the current record first (if any), then every later publish.
    /// A slow subscriber may skip intermediate values but never sees them out
    /// of order. The stream ends when the record is removed. Dropping the
    /// subscription only affects this subscriber.
    #[must_use]
    pub fn subscribe(&self, subject: &str) -> ProgressSubscription {
        let rx = self
            .inner
            .lock()
            .entry(subject.to_string())
            .or_insert_with(Channel::new)
            .tx
            .subscribe();

        ProgressSubscription {
            subject: subject.to_string(),
            stream: Some(WatchStream::new(rx)),
            store: Arc::downgrade(&self.inner),
        }
    }

    /// Remove the record for `subject` now. Safe to call repeatedly.
    pub fn remove(&self, subject: &str) {
        if let Some(mut channel) = self.inner.lock().remove(subject) {
            channel.cancel_cleanup();
        }
    }

    /// Drop every record and cancel all pending cleanup timers.
    pub fn shutdown(&self) {
        let mut channels = self.inner.lock();
        for (_, mut channel) in channels.drain() {
            channel.cancel_cleanup();
        }
    }
}

impl Default for ProgressStore {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE)
    }
}

/// A cancellable live view of one subject's progress. See
/// [`ProgressStore::subscribe`].
pub struct ProgressSubscription {
    subject: String,
    stream: Option<WatchStream<Option<ProgressRecord>>>,
    store: Weak<Inner>,
}

impl ProgressSubscription {
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Yield records up to and including the first terminal one, then end.
    pub fn until_terminal(self) -> impl Stream<Item = ProgressRecord> + Send {
        futures::stream::unfold((self, false), |(mut sub, finished)| async move {
            if finished {
                return None;
            }
            let record = sub.next().await?;
            let terminal = record.progress.is_terminal();
            Some((record, (sub, terminal)))
        })
    }
}

impl Stream for ProgressSubscription {
    type Item = ProgressRecord;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let Some(stream) = this.stream.as_mut() else {
            return Poll::Ready(None);
        };

        loop {
            match stream.poll_next_unpin(cx) {
                Poll::Ready(Some(Some(record))) => return Poll::Ready(Some(record)),
                // Channel exists but nothing has been published yet.
                Poll::Ready(Some(None)) => {}
                Poll::Ready(None) => {
                    this.stream = None;
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl Drop for ProgressSubscription {
    fn drop(&mut self) {
        // The receiver must be gone before `release` counts receivers.
        self.stream.take();
        if let Some(inner) = self.store.upgrade() {
            inner.release(&self.subject);
        }
    }
}
