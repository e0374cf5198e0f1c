//! Post source abstractions.
//!
//! A [`PostSource`] is anything that can log in to a social provider, look up
//! an account and stream its posts newest-first. The production source is
//! [`GatewaySource`]; tests plug in in-memory fakes.

mod gateway;
pub(crate) mod retry;

pub use gateway::{GatewayConfig, GatewaySession, GatewaySource};

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use yearwrap_core::RawPost;

use crate::error::SourceError;

/// Public profile of an account, as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Lazily-read stream of posts, newest first. Ends normally when the provider
/// has nothing more to give; an `Err` item ends it abnormally.
pub type PostStream<'a> = BoxStream<'a, Result<RawPost, SourceError>>;

#[async_trait]
pub trait PostSource: Send + Sync {
    /// Authenticated handle passed to the other calls.
    type Session: Send + Sync;

    /// Log in with the source's configured credentials.
    ///
    /// # Errors
    ///
    /// [`SourceError::Auth`] when the provider rejects the credentials, or any
    /// transport error.
    async fn authenticate(&self) -> Result<Self::Session, SourceError>;

    /// Look up `subject`. `Ok(None)` means the account does not exist.
    ///
    /// # Errors
    ///
    /// Transport or decoding failures.
    async fn profile(
        &self,
        session: &Self::Session,
        subject: &str,
    ) -> Result<Option<Profile>, SourceError>;

    /// Stream `subject`'s posts, newest first, reading no further back than
    /// needed to cover `since`. Pages are only requested as the stream is
    /// polled, so dropping it stops all further provider calls.
    fn posts<'a>(
        &'a self,
        session: &'a Self::Session,
        subject: &'a str,
        since: NaiveDate,
    ) -> PostStream<'a>;
}
