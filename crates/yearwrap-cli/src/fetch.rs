//! `fetch` command: run the pipeline once and render its progress.

use std::time::Duration;

use futures::StreamExt;
use yearwrap_core::{AppConfig, Progress, ProgressRecord};
use yearwrap_ingest::{
    normalize_subject, FetchPipeline, GatewayConfig, GatewaySource, MemoryResultStore, PostSource,
    ProgressStore, ResultStore,
};

use crate::show::render_summary;

/// Fetch this year's stats for `subject`, printing one line per progress
/// update and a summary at the end.
///
/// With `dry_run` the result is kept in memory and the database is never
/// opened.
///
/// # Errors
///
/// Returns an error if the gateway client cannot be built, the database is
/// unreachable, or the fetch itself fails.
pub(crate) async fn run_fetch(
    config: &AppConfig,
    subject: &str,
    dry_run: bool,
) -> anyhow::Result<()> {
    let source = GatewaySource::new(GatewayConfig::from_app_config(config))?;
    let progress = ProgressStore::new(Duration::from_millis(config.progress_grace_ms));

    if dry_run {
        println!("dry-run: stats will not be written to the database");
        let pipeline = FetchPipeline::new(
            source,
            MemoryResultStore::new(),
            progress,
            config.post_cap,
        );
        drive(&pipeline, subject).await
    } else {
        let pool = crate::connect(config).await?;
        let pipeline = FetchPipeline::new(
            source,
            yearwrap_db::PgResultStore::new(pool),
            progress,
            config.post_cap,
        );
        drive(&pipeline, subject).await
    }
}

async fn drive<S, R>(pipeline: &FetchPipeline<S, R>, subject: &str) -> anyhow::Result<()>
where
    S: PostSource,
    R: ResultStore,
{
    let key = normalize_subject(subject);
    let updates = pipeline.progress().subscribe(&key).until_terminal();
    let reporter = updates.for_each(|record| async move {
        println!("{}", render_progress(&record));
    });

    let (outcome, ()) = tokio::join!(pipeline.fetch(subject), reporter);
    let outcome = outcome?;

    println!();
    println!("{} ({})", key, outcome.kind());
    print!("{}", render_summary(outcome.result()));
    Ok(())
}

/// One progress line, e.g. `[ 30%] Fetching posts...`.
pub(crate) fn render_progress(record: &ProgressRecord) -> String {
    let status = record.status.as_deref().unwrap_or("");
    match record.progress {
        Progress::Running(pct) => format!("[{pct:>3}%] {status}"),
        Progress::Succeeded => format!("[100%] {status}"),
        Progress::Failed => format!("[fail] {status}"),
    }
}
