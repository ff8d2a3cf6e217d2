// src/ingest/cache.rs
//! Single-slot TTL cache in front of the rate-limited news API.
//!
//! - A record younger than or equal to the TTL is served without a network call.
//! - An expired record is never served; a failed refresh yields no items.
//! - Refreshes overwrite the slot as a whole. Two racing refreshes both write
//!   a complete record and the last one wins.

use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::IngestError;
use crate::ingest::providers::news_api::{NewsQuery, NewsSearch};
use crate::ingest::recency::retain_recent;
use crate::ingest::types::NormalizedItem;
use crate::store::DocumentStore;

pub const CACHE_TTL_SECS: i64 = 3600;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheRecord {
    #[serde(with = "last_fetched")]
    pub last_fetched: DateTime<Utc>,
    #[serde(default)]
    pub articles: Vec<NormalizedItem>,
}

impl CacheRecord {
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.signed_duration_since(self.last_fetched) <= ttl
    }
}

mod last_fetched {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    /// RFC 3339, or a zone-less ISO/`%Y-%m-%d %H:%M:%S` stamp read as UTC.
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        let s = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .map(|naive| naive.and_utc())
            .ok_or_else(|| D::Error::custom(format!("unrecognized last_fetched: {raw}")))
    }
}

pub struct ApiCacheGate {
    store: Arc<dyn DocumentStore<CacheRecord>>,
    search: Arc<dyn NewsSearch>,
    ttl: Duration,
}

impl ApiCacheGate {
    pub fn new(store: Arc<dyn DocumentStore<CacheRecord>>, search: Arc<dyn NewsSearch>) -> Self {
        Self {
            store,
            search,
            ttl: Duration::seconds(CACHE_TTL_SECS),
        }
    }

    /// Cached items while the record is fresh, otherwise one upstream call.
    /// Never fails: every error is logged and yields an empty list.
    pub async fn get_articles(&self, topics: &[String], now: DateTime<Utc>) -> Vec<NormalizedItem> {
        if let Some(rec) = self.fresh_record(now) {
            counter!("news_api_cache_hits_total").increment(1);
            tracing::info!(target: "ingest", articles = rec.articles.len(), "using cached news API data");
            return retain_recent(rec.articles, now);
        }
        counter!("news_api_cache_misses_total").increment(1);

        match self.refresh(topics, now).await {
            Ok(items) => items,
            Err(e) if e.is_configuration() => {
                tracing::warn!(target: "ingest", error = %e, "news API query skipped");
                Vec::new()
            }
            Err(e) => {
                tracing::error!(target: "ingest", error = %e, "news API fetch failed");
                counter!("ingest_source_errors_total", "source" => "NewsAPI").increment(1);
                Vec::new()
            }
        }
    }

    fn fresh_record(&self, now: DateTime<Utc>) -> Option<CacheRecord> {
        match self.store.load() {
            Ok(Some(rec)) if rec.is_fresh(now, self.ttl) => Some(rec),
            Ok(_) => None,
            Err(e) => {
                tracing::error!(target: "ingest", error = ?e, "cache unreadable, treating as empty");
                None
            }
        }
    }

    async fn refresh(
        &self,
        topics: &[String],
        now: DateTime<Utc>,
    ) -> Result<Vec<NormalizedItem>, IngestError> {
        if topics.iter().all(|t| t.trim().is_empty()) {
            return Err(IngestError::MissingConfig("no topics configured".to_string()));
        }
        tracing::info!(target: "ingest", "fetching new data from news API");
        let query = NewsQuery::for_topics(topics, now);
        let resp = self.search.search(&query).await?;
        if !resp.is_ok() {
            return Err(IngestError::UnexpectedStatus(format!(
                "{} {}",
                resp.status,
                resp.message.as_deref().unwrap_or_default()
            )));
        }

        let articles = resp.into_items(topics, now);
        let record = CacheRecord {
            last_fetched: now,
            articles: articles.clone(),
        };
        if let Err(e) = self.store.save(&record) {
            tracing::error!(target: "ingest", error = ?e, "could not persist news API cache");
        }
        tracing::info!(target: "ingest", count = articles.len(), "fetched articles from news API");
        Ok(articles)
    }
}
