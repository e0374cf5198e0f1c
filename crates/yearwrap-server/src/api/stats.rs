//! Yearly stats: read, existence check and on-demand fetch.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{Datelike, Utc};
use serde::Serialize;
use yearwrap_core::{AggregateResult, Progress};
use yearwrap_ingest::{normalize_subject, ResultStore};

use crate::middleware::RequestId;

use super::{map_db_error, map_fetch_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct ExistsData {
    pub subject: String,
    pub year: i32,
    pub exists: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct FetchData {
    pub outcome: &'static str,
    pub stats: AggregateResult,
}

fn current_year() -> i32 {
    Utc::now().year()
}

fn require_subject(raw: &str, request_id: &str) -> Result<String, ApiError> {
    let subject = normalize_subject(raw);
    if subject.is_empty() {
        return Err(ApiError::new(
            request_id,
            "validation_error",
            "subject must not be empty",
        ));
    }
    Ok(subject)
}

/// `GET /api/v1/stats/{subject}`: this year's stored stats.
pub(super) async fn get_stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(subject): Path<String>,
) -> Result<Json<ApiResponse<AggregateResult>>, ApiError> {
    let subject = require_subject(&subject, &req_id.0)?;
    let year = current_year();

    let found = state
        .pipeline
        .store()
        .find(&subject, year)
        .await
        .map_err(|e| {
            tracing::error!(subject = %subject, error = %e, "stats lookup failed");
            ApiError::new(req_id.0.clone(), "internal_error", "stats lookup failed")
        })?;

    match found {
        Some(stats) => Ok(Json(ApiResponse::new(stats, req_id.0))),
        None => Err(ApiError::new(
            req_id.0,
            "not_found",
            format!("no stats for {subject} in {year}"),
        )),
    }
}

/// `GET /api/v1/stats/{subject}/exists`
pub(super) async fn stats_exist(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(subject): Path<String>,
) -> Result<Json<ApiResponse<ExistsData>>, ApiError> {
    let subject = require_subject(&subject, &req_id.0)?;
    let year = current_year();

    let exists = yearwrap_db::stats_exist(&state.pool, &subject, year)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        ExistsData {
            subject,
            year,
            exists,
        },
        req_id.0,
    )))
}

/// `POST /api/v1/stats/{subject}/fetch`: fetch (or return cached) stats.
///
/// The fetch runs on its own task: if the client goes away the fetch still
/// completes, stores its result and finalizes progress.
pub(super) async fn fetch_stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(subject): Path<String>,
) -> Result<Json<ApiResponse<FetchData>>, ApiError> {
    let key = normalize_subject(&subject);
    let pipeline = Arc::clone(&state.pipeline);
    let task = tokio::spawn(async move { pipeline.fetch(&subject).await });

    let outcome = match task.await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => return Err(map_fetch_error(req_id.0, &e)),
        Err(e) => {
            tracing::error!(subject = %key, error = %e, "fetch task did not complete");
            // The task never reached its own terminal publish.
            state
                .progress()
                .publish(&key, Progress::Failed, Some("Fetch aborted".to_string()));
            return Err(ApiError::new(req_id.0, "internal_error", "fetch aborted"));
        }
    };

    Ok(Json(ApiResponse::new(
        FetchData {
            outcome: outcome.kind(),
            stats: outcome.into_result(),
        },
        req_id.0,
    )))
}
