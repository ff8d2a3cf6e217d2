// src/ingest/types.rs
use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// Topic label for items that match none of the configured topics.
pub const GENERAL_TOPIC: &str = "General";

/// Fixed-width UTC form used on the wire and in the digest.
pub const PUB_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One news item after normalization, whatever upstream it came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedItem {
    pub title: String,
    pub link: String,
    #[serde(rename = "pub_date", with = "pub_date")]
    pub published_at: DateTime<Utc>,
    #[serde(rename = "source")]
    pub source_name: String,
    #[serde(default = "general_topic")]
    pub topic: String,
}

fn general_topic() -> String {
    GENERAL_TOPIC.to_string()
}

impl NormalizedItem {
    /// Validates the required fields; `None` when title or link is blank.
    /// The timestamp is truncated to whole seconds so that instant order and
    /// `PUB_DATE_FORMAT` string order agree.
    pub fn new(
        title: &str,
        link: &str,
        published_at: DateTime<Utc>,
        source_name: &str,
    ) -> Option<Self> {
        let title = title.trim();
        let link = link.trim();
        if title.is_empty() || link.is_empty() {
            return None;
        }
        Some(Self {
            title: title.to_string(),
            link: link.to_string(),
            published_at: published_at.with_nanosecond(0).unwrap_or(published_at),
            source_name: source_name.to_string(),
            topic: general_topic(),
        })
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn pub_date(&self) -> String {
        self.published_at.format(PUB_DATE_FORMAT).to_string()
    }
}

mod pub_date {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    use super::PUB_DATE_FORMAT;

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&dt.format(PUB_DATE_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw.trim(), PUB_DATE_FORMAT) {
            return Ok(naive.and_utc());
        }
        crate::ingest::parse_published(&raw)
            .ok_or_else(|| D::Error::custom(format!("unrecognized pub_date: {raw}")))
    }
}

/// Anything that can contribute items to the merged news list.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Items already recency-filtered against `now` and tagged with a topic.
    async fn fetch_latest(&self, now: DateTime<Utc>) -> Result<Vec<NormalizedItem>, IngestError>;
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn blank_title_or_link_is_rejected() {
        let now = Utc::now();
        assert!(NormalizedItem::new("  ", "http://x", now, "S").is_none());
        assert!(NormalizedItem::new("T", "", now, "S").is_none());
        let it = NormalizedItem::new(" T ", " http://x ", now, "S").unwrap();
        assert_eq!(it.title, "T");
        assert_eq!(it.link, "http://x");
        assert_eq!(it.topic, GENERAL_TOPIC);
    }

    #[test]
    fn wire_form_uses_fixed_width_pub_date() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let it = NormalizedItem::new("T", "L", ts, "S").unwrap();
        let v = serde_json::to_value(&it).unwrap();
        assert_eq!(v["pub_date"], "2024-01-01 00:00:00");
        assert_eq!(v["source"], "S");
        assert_eq!(v["topic"], "General");
    }

    #[test]
    fn reads_legacy_iso_pub_date_and_missing_topic() {
        let raw = r#"{"title":"T","link":"L","pub_date":"2024-03-05T10:20:30Z","source":"NewsAPI"}"#;
        let it: NormalizedItem = serde_json::from_str(raw).unwrap();
        assert_eq!(it.pub_date(), "2024-03-05 10:20:30");
        assert_eq!(it.topic, GENERAL_TOPIC);
    }
}
