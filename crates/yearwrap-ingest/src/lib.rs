//! Post ingestion, aggregation and live progress for yearwrap.
//!
//! Streams a subject's posts from a [`PostSource`], keeps the qualifying ones
//! (this year's originals, capped), aggregates them into an
//! [`AggregateResult`](yearwrap_core::AggregateResult) and stores it through a
//! [`ResultStore`]. Every step is reported to a shared [`ProgressStore`] that
//! pollers and live subscribers read from.

pub mod aggregate;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod progress;
pub mod sources;
pub mod store;

pub use aggregate::{aggregate, daily_activity, intensity};
pub use error::{FetchError, SourceError, StoreError};
pub use filter::{filter_posts, qualifies};
pub use pipeline::{normalize_subject, FetchOutcome, FetchPipeline};
pub use progress::{ProgressStore, ProgressSubscription, DEFAULT_GRACE, DEFAULT_IDLE_TTL};
pub use sources::{
    GatewayConfig, GatewaySession, GatewaySource, PostSource, PostStream, Profile,
};
pub use store::{MemoryResultStore, ResultStore};
