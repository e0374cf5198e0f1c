//! `show` command and plain-text rendering of stored stats.

use std::fmt::Write as _;

use chrono::{Datelike, Utc};
use yearwrap_core::AggregateResult;
use yearwrap_ingest::{normalize_subject, ResultStore};

/// Print the stored stats for `subject` in `year` (default: this year).
///
/// # Errors
///
/// Returns an error if the subject is blank, nothing is stored for it, or
/// the lookup fails.
pub(crate) async fn run_show(
    pool: &sqlx::PgPool,
    subject: &str,
    year: Option<i32>,
) -> anyhow::Result<()> {
    let subject = normalize_subject(subject);
    if subject.is_empty() {
        anyhow::bail!("subject must not be empty");
    }
    let year = year.unwrap_or_else(|| Utc::now().year());

    let store = yearwrap_db::PgResultStore::new(pool.clone());
    let stats = store.find(&subject, year).await?.ok_or_else(|| {
        anyhow::anyhow!("no stats stored for '{subject}' in {year}; run `fetch {subject}` first")
    })?;

    println!("{subject}");
    print!("{}", render_summary(&stats));
    Ok(())
}

/// Multi-line summary of one year's stats.
pub(crate) fn render_summary(stats: &AggregateResult) -> String {
    let mut out = String::new();
    let active_days = stats.daily_activity.iter().filter(|d| d.count > 0).count();
    // First day wins on ties, matching the histogram order.
    let busiest = stats
        .daily_activity
        .iter()
        .filter(|d| d.count > 0)
        .fold(None, |best: Option<&yearwrap_core::DailyActivity>, day| match best {
            Some(b) if b.count >= day.count => Some(b),
            _ => Some(day),
        });

    let _ = writeln!(out, "{:<13}{}", "year", stats.year);
    let _ = writeln!(out, "{:<13}{}", "posts", stats.total_posts);
    let _ = writeln!(out, "{:<13}{}", "likes", stats.total_likes);
    let _ = writeln!(out, "{:<13}{}", "reposts", stats.total_reposts);
    let _ = writeln!(out, "{:<13}{}", "replies", stats.total_replies);
    let _ = writeln!(
        out,
        "{:<13}{} of {}",
        "active days",
        active_days,
        stats.daily_activity.len()
    );
    if let Some(day) = busiest {
        let _ = writeln!(
            out,
            "{:<13}{} ({} posts)",
            "busiest day",
            day.date.format("%Y-%m-%d"),
            day.count
        );
    }

    let top = &stats.top_post;
    let _ = writeln!(out, "{:<13}{} ({} likes)", "top post", top.text, top.likes);
    if !top.url.is_empty() {
        let _ = writeln!(out, "{:<13}{}", "", top.url);
    }
    out
}
