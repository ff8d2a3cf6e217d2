// src/ingest/recency.rs
use chrono::{DateTime, Duration, Utc};

use super::types::NormalizedItem;

/// Lookback used to admit an item into the merged list.
pub const RECENCY_WINDOW_SECS: i64 = 24 * 3600;

pub fn recency_window() -> Duration {
    Duration::seconds(RECENCY_WINDOW_SECS)
}

/// `now - published_at < window`; an item exactly `window` old is stale.
pub fn is_recent(published_at: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    now.signed_duration_since(published_at) < window
}

pub fn is_recent_item(item: &NormalizedItem, now: DateTime<Utc>) -> bool {
    is_recent(item.published_at, now, recency_window())
}

/// Keep only the items inside the default window, order preserved.
pub fn retain_recent(items: Vec<NormalizedItem>, now: DateTime<Utc>) -> Vec<NormalizedItem> {
    items
        .into_iter()
        .filter(|it| is_recent_item(it, now))
        .collect()
}
