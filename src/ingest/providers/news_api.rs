// src/ingest/providers/news_api.rs
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::IngestError;
use crate::ingest::cache::ApiCacheGate;
use crate::ingest::classify::classify;
use crate::ingest::recency::is_recent_item;
use crate::ingest::types::{NormalizedItem, SourceProvider};
use crate::ingest::{normalize_text, parse_published};

pub const NEWS_API_SOURCE: &str = "NewsAPI";
pub const DEFAULT_NEWS_API_URL: &str = "https://newsapi.org/v2/everything";

/// One combined search over every configured topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsQuery {
    pub q: String,
    /// `YYYY-MM-DD`, one recency window before `now`.
    pub from: String,
    pub language: String,
    pub sort_by: String,
}

impl NewsQuery {
    pub fn for_topics<S: AsRef<str>>(topics: &[S], now: DateTime<Utc>) -> Self {
        let q = topics
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(" OR ");
        Self {
            q,
            from: (now - Duration::days(1)).format("%Y-%m-%d").to_string(),
            language: "en".to_string(),
            sort_by: "publishedAt".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewsApiResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub articles: Vec<ApiArticle>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiArticle {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "publishedAt")]
    pub published_at: Option<String>,
}

impl NewsApiResponse {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    /// Articles with title, url and a parseable `publishedAt` inside the
    /// recency window, classified against `topics`.
    pub fn into_items<S: AsRef<str>>(self, topics: &[S], now: DateTime<Utc>) -> Vec<NormalizedItem> {
        self.articles
            .into_iter()
            .filter_map(|a| {
                let published_at = parse_published(a.published_at.as_deref()?)?;
                let title = normalize_text(a.title.as_deref()?);
                NormalizedItem::new(&title, a.url.as_deref()?, published_at, NEWS_API_SOURCE)
            })
            .filter(|it| is_recent_item(it, now))
            .map(|it| {
                let topic = classify(&it.title, topics);
                it.with_topic(topic)
            })
            .collect()
    }
}

/// The keyed search call behind the cache gate.
#[async_trait]
pub trait NewsSearch: Send + Sync {
    async fn search(&self, query: &NewsQuery) -> Result<NewsApiResponse, IngestError>;
}

pub struct NewsApiClient {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl NewsApiClient {
    pub fn new(client: Client, url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            url: url.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }
}

#[async_trait]
impl NewsSearch for NewsApiClient {
    async fn search(&self, query: &NewsQuery) -> Result<NewsApiResponse, IngestError> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(IngestError::MissingConfig("NEWSAPI_KEY".to_string()));
        };
        let resp = self
            .client
            .get(&self.url)
            .query(&[
                ("apiKey", key),
                ("q", query.q.as_str()),
                ("from", query.from.as_str()),
                ("language", query.language.as_str()),
                ("sortBy", query.sort_by.as_str()),
            ])
            .send()
            .await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        match serde_json::from_slice::<NewsApiResponse>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(e) if status.is_success() => Err(IngestError::Malformed(e.to_string())),
            Err(_) => Err(IngestError::Unavailable(format!("news API HTTP {status}"))),
        }
    }
}

/// Adapts the cache gate to the provider list for one aggregation run.
pub struct NewsApiSource {
    gate: Arc<ApiCacheGate>,
    topics: Arc<[String]>,
}

impl NewsApiSource {
    pub fn new(gate: Arc<ApiCacheGate>, topics: Arc<[String]>) -> Self {
        Self { gate, topics }
    }
}

#[async_trait]
impl SourceProvider for NewsApiSource {
    async fn fetch_latest(&self, now: DateTime<Utc>) -> Result<Vec<NormalizedItem>, IngestError> {
        Ok(self.gate.get_articles(&self.topics, now).await)
    }

    fn name(&self) -> &str {
        NEWS_API_SOURCE
    }
}

// --- Test helper ---

/// Fixed answer plus a call counter, for exercising the cache gate.
pub struct StaticNewsSearch {
    answer: Result<NewsApiResponse, String>,
    calls: AtomicUsize,
    last_query: Mutex<Option<NewsQuery>>,
}

impl StaticNewsSearch {
    pub fn ok(articles: Vec<ApiArticle>) -> Self {
        Self::answering(Ok(NewsApiResponse {
            status: "ok".to_string(),
            message: None,
            articles,
        }))
    }

    pub fn answering(answer: Result<NewsApiResponse, String>) -> Self {
        Self {
            answer,
            calls: AtomicUsize::new(0),
            last_query: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> Option<NewsQuery> {
        self.last_query
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl NewsSearch for StaticNewsSearch {
    async fn search(&self, query: &NewsQuery) -> Result<NewsApiResponse, IngestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .last_query
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(query.clone());
        self.answer
            .clone()
            .map_err(IngestError::Unavailable)
    }
}
