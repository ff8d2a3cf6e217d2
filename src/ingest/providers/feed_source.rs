// src/ingest/providers/feed_source.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::IngestError;
use crate::ingest::classify::classify;
use crate::ingest::feed::parse_feed;
use crate::ingest::fetch::FeedFetcher;
use crate::ingest::recency::retain_recent;
use crate::ingest::types::{NormalizedItem, SourceProvider};

/// One configured syndication feed.
pub struct FeedSourceProvider {
    name: String,
    url: String,
    topics: Arc<[String]>,
    fetcher: Arc<dyn FeedFetcher>,
}

impl FeedSourceProvider {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        topics: Arc<[String]>,
        fetcher: Arc<dyn FeedFetcher>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            topics,
            fetcher,
        }
    }
}

#[async_trait]
impl SourceProvider for FeedSourceProvider {
    async fn fetch_latest(&self, now: DateTime<Utc>) -> Result<Vec<NormalizedItem>, IngestError> {
        tracing::info!(target: "ingest", source = %self.name, url = %self.url, "fetching feed");
        let body = self.fetcher.fetch(&self.url).await?;
        let parsed = parse_feed(&body, &self.name, now);
        let found = parsed.len();
        let out: Vec<NormalizedItem> = retain_recent(parsed, now)
            .into_iter()
            .map(|it| {
                let topic = classify(&it.title, &self.topics[..]);
                it.with_topic(topic)
            })
            .collect();
        tracing::info!(
            target: "ingest",
            source = %self.name,
            found,
            recent = out.len(),
            "feed parsed"
        );
        Ok(out)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
