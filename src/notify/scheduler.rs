// src/notify/scheduler.rs
use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::email::DigestDispatcher;

/// Wall-clock time that actually exists in `tz`. Inside a DST gap the
/// time moves forward by whole hours until it exists; in a fold the
/// earlier instant is used.
fn resolve_local(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    for shift in 0..4 {
        match tz.from_local_datetime(&(naive + Duration::hours(shift))) {
            LocalResult::Single(dt) => return Some(dt.with_timezone(&Utc)),
            LocalResult::Ambiguous(early, _) => return Some(early.with_timezone(&Utc)),
            LocalResult::None => continue,
        }
    }
    None
}

/// First instant strictly after `now` whose local time in `tz` is `at`.
pub fn next_run_after(now: DateTime<Utc>, at: NaiveTime, tz: Tz) -> DateTime<Utc> {
    let today = now.with_timezone(&tz).date_naive();
    (0..3)
        .filter_map(|d| today.checked_add_signed(Duration::days(d)))
        .filter_map(|date| resolve_local(&tz, date.and_time(at)))
        .find(|run| *run > now)
        .unwrap_or(now + Duration::days(1))
}

/// One background task, one timer: sleeps until the next run, dispatches,
/// repeats. Dispatch never fails, so the loop never exits.
pub fn spawn_digest_scheduler(
    dispatcher: Arc<DigestDispatcher>,
    at: NaiveTime,
    tz: Tz,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Utc::now();
            let next = next_run_after(now, at, tz);
            tracing::info!(target: "digest", next_run = %next.with_timezone(&tz), "digest scheduled");
            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;
            let outcome = dispatcher.dispatch().await;
            tracing::info!(target: "digest", ?outcome, "scheduled digest finished");
        }
    })
}
