// src/ingest/aggregate.rs
//! Builds the merged news list from the registry snapshot:
//! feeds (grouped by source, then topic), then the cached news API result,
//! then one topic search per topic; newest first.

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use serde::Serialize;
use std::sync::Arc;

use crate::ingest::cache::ApiCacheGate;
use crate::ingest::ensure_metrics_described;
use crate::ingest::fetch::FeedFetcher;
use crate::ingest::providers::{FeedSourceProvider, NewsApiSource, TopicSearchProvider};
use crate::ingest::types::{NormalizedItem, SourceProvider};
use crate::registry::Registry;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TopicGroup {
    pub topic: String,
    pub items: Vec<NormalizedItem>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SourceGroup {
    pub source: String,
    pub topics: Vec<TopicGroup>,
}

/// Groups by source, then by topic, both in first-seen order.
pub fn group_by_source_topic(items: Vec<NormalizedItem>) -> Vec<SourceGroup> {
    let mut groups: Vec<SourceGroup> = Vec::new();
    for it in items {
        let si = match groups.iter().position(|g| g.source == it.source_name) {
            Some(i) => i,
            None => {
                groups.push(SourceGroup {
                    source: it.source_name.clone(),
                    topics: Vec::new(),
                });
                groups.len() - 1
            }
        };
        let topics = &mut groups[si].topics;
        match topics.iter_mut().find(|t| t.topic == it.topic) {
            Some(t) => t.items.push(it),
            None => topics.push(TopicGroup {
                topic: it.topic.clone(),
                items: vec![it],
            }),
        }
    }
    groups
}

pub fn flatten_groups(groups: Vec<SourceGroup>) -> Vec<NormalizedItem> {
    groups
        .into_iter()
        .flat_map(|g| g.topics)
        .flat_map(|t| t.items)
        .collect()
}

/// Stable, newest first; equal timestamps keep their input order.
pub fn sort_newest_first(items: &mut [NormalizedItem]) {
    items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
}

/// Runs one provider; a failure is logged and counted and contributes nothing.
pub async fn collect_from(provider: &dyn SourceProvider, now: DateTime<Utc>) -> Vec<NormalizedItem> {
    match provider.fetch_latest(now).await {
        Ok(items) => items,
        Err(e) => {
            if e.is_configuration() {
                tracing::warn!(target: "ingest", error = %e, source = provider.name(), "source skipped");
            } else {
                tracing::error!(target: "ingest", error = %e, source = provider.name(), "source failed");
            }
            counter!("ingest_source_errors_total", "source" => provider.name().to_string())
                .increment(1);
            Vec::new()
        }
    }
}

pub struct Aggregator {
    registry: Arc<Registry>,
    fetcher: Arc<dyn FeedFetcher>,
    gate: Arc<ApiCacheGate>,
    topic_search_url: String,
}

impl Aggregator {
    pub fn new(
        registry: Arc<Registry>,
        fetcher: Arc<dyn FeedFetcher>,
        gate: Arc<ApiCacheGate>,
        topic_search_url: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            fetcher,
            gate,
            topic_search_url: topic_search_url.into(),
        }
    }

    pub async fn get_merged_news(&self) -> Vec<NormalizedItem> {
        self.merged_news(Utc::now()).await
    }

    pub async fn merged_news(&self, now: DateTime<Utc>) -> Vec<NormalizedItem> {
        ensure_metrics_described();
        let topics: Arc<[String]> = self.registry.topic_names().into();

        let mut feed_items = Vec::new();
        for src in self.registry.sources() {
            let provider =
                FeedSourceProvider::new(src.name, src.url, topics.clone(), self.fetcher.clone());
            feed_items.extend(collect_from(&provider, now).await);
        }
        let mut merged = flatten_groups(group_by_source_topic(feed_items));

        let api = NewsApiSource::new(self.gate.clone(), topics.clone());
        merged.extend(collect_from(&api, now).await);

        for (_, items) in self.search_topics(&topics, now).await {
            merged.extend(items);
        }

        sort_newest_first(&mut merged);
        gauge!("aggregate_last_run_ts").set(now.timestamp() as f64);
        tracing::info!(target: "ingest", total = merged.len(), "merged news built");
        merged
    }

    /// Topic search results per topic, in topic order, newest first within
    /// each topic.
    pub async fn topic_search_by_topic(&self, now: DateTime<Utc>) -> Vec<(String, Vec<NormalizedItem>)> {
        let topics = self.registry.topic_names();
        let mut out = self.search_topics(&topics, now).await;
        for (_, items) in out.iter_mut() {
            sort_newest_first(items);
        }
        out
    }

    async fn search_topics(
        &self,
        topics: &[String],
        now: DateTime<Utc>,
    ) -> Vec<(String, Vec<NormalizedItem>)> {
        let mut out = Vec::with_capacity(topics.len());
        for topic in topics.iter().filter(|t| !t.trim().is_empty()) {
            let provider =
                TopicSearchProvider::new(topic.as_str(), &self.topic_search_url, self.fetcher.clone());
            let items = collect_from(&provider, now).await;
            out.push((topic.clone(), items));
        }
        out
    }
}
