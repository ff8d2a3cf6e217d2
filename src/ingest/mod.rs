// src/ingest/mod.rs
pub mod aggregate;
pub mod cache;
pub mod classify;
pub mod feed;
pub mod fetch;
pub mod providers;
pub mod recency;
pub mod types;

use chrono::{DateTime, Utc};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

pub use aggregate::Aggregator;
pub use types::{NormalizedItem, SourceProvider, GENERAL_TOPIC};

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "ingest_items_total",
            "Items produced by the feed normalizer."
        );
        describe_counter!(
            "ingest_source_errors_total",
            "Per-source fetch/parse errors (source contributes nothing)."
        );
        describe_counter!(
            "news_api_cache_hits_total",
            "News API requests answered from the cache."
        );
        describe_counter!(
            "news_api_cache_misses_total",
            "News API requests that went upstream."
        );
        describe_histogram!("feed_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!(
            "aggregate_last_run_ts",
            "Unix ts when the merged news list was last built."
        );
        describe_counter!("digest_sent_total", "Digest emails handed to SMTP.");
        describe_counter!(
            "digest_failures_total",
            "Digest emails that failed to build or send."
        );
    });
}

/// Normalize feed text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    if let Some(re_tags) = RE_TAGS
        .get_or_try_init(|| regex::Regex::new(r"(?is)</?[a-z][^>]*>"))
        .ok()
    {
        out = re_tags.replace_all(&out, "").to_string();
    }

    // 3) Collapse whitespace
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Publish timestamps seen in the wild: RFC 822/2822 first (including
/// `GMT`-style zone names), then ISO 8601 with an offset.
pub fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc2822(s)
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z"))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
