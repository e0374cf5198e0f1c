//! Live fetch progress: publish, poll and server-sent events.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Extension, Json,
};
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use yearwrap_core::{Progress, ProgressRecord};
use yearwrap_ingest::normalize_subject;

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct PublishProgressRequest {
    pub subject: String,
    /// Percentage; `>= 100` means success, negative means failure.
    pub progress: f64,
    #[serde(default)]
    pub status: Option<String>,
}

/// What observers see for a subject nobody has published for yet.
fn not_started(subject: &str) -> ProgressRecord {
    ProgressRecord {
        subject: subject.to_string(),
        progress: Progress::Running(0),
        status: None,
    }
}

/// `POST /api/v1/progress`
pub(super) async fn publish_progress(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<PublishProgressRequest>,
) -> Result<Json<ApiResponse<ProgressRecord>>, ApiError> {
    let subject = normalize_subject(&body.subject);
    if subject.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "subject must not be empty",
        ));
    }

    let record = state.progress().publish(
        &subject,
        Progress::from_percent(body.progress),
        body.status,
    );
    Ok(Json(ApiResponse::new(record, req_id.0)))
}

/// `GET /api/v1/progress/{subject}`: latest value, or 0 if none.
pub(super) async fn latest_progress(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(subject): Path<String>,
) -> Json<ApiResponse<ProgressRecord>> {
    let subject = normalize_subject(&subject);
    let record = state
        .progress()
        .latest(&subject)
        .unwrap_or_else(|| not_started(&subject));
    Json(ApiResponse::new(record, req_id.0))
}

/// `GET /api/v1/progress/{subject}/stream`
///
/// Sends the current value first (0 if nothing was published yet), then one
/// `progress` event per update, and closes after a terminal value.
pub(super) async fn stream_progress(
    State(state): State<AppState>,
    Path(subject): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subject = normalize_subject(&subject);
    tracing::debug!(subject = %subject, "progress stream opened");

    let placeholder = state
        .progress()
        .latest(&subject)
        .is_none()
        .then(|| not_started(&subject));
    let live = state.progress().subscribe(&subject).until_terminal();

    let events = stream::iter(placeholder)
        .chain(live)
        .filter_map(|record| async move {
            match Event::default().event("progress").json_data(&record) {
                Ok(event) => Some(Ok(event)),
                Err(e) => {
                    tracing::warn!(subject = %record.subject, error = %e, "failed to encode progress event");
                    None
                }
            }
        });

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
