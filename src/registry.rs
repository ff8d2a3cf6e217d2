// src/registry.rs
//! User-editable topic and source lists.
//!
//! Both lists are stored as whole documents and rewritten on every mutation.
//! Index arguments are positions in the list as last returned by
//! `topics()`/`sources()`.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{RegistryError, RegistryResult};
use crate::ingest::feed::is_feed_document;
use crate::ingest::fetch::FeedFetcher;
use crate::store::DocumentStore;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TopicRecord {
    pub topic: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceRecord {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alerts_enabled: Option<bool>,
}

impl SourceRecord {
    pub fn alerts_enabled(&self) -> bool {
        self.alerts_enabled.unwrap_or(false)
    }
}

pub struct Registry {
    topics: Arc<dyn DocumentStore<Vec<TopicRecord>>>,
    sources: Arc<dyn DocumentStore<Vec<SourceRecord>>>,
    validator: Arc<dyn FeedFetcher>,
    writer: Mutex<()>,
}

fn required(value: &str, what: &'static str) -> RegistryResult<String> {
    let v = value.trim();
    if v.is_empty() {
        return Err(RegistryError::EmptyValue(what));
    }
    Ok(v.to_string())
}

fn check_index(index: usize, len: usize) -> RegistryResult<()> {
    if index >= len {
        return Err(RegistryError::InvalidIndex { index, len });
    }
    Ok(())
}

fn load_or_empty<T>(store: &dyn DocumentStore<Vec<T>>, what: &str) -> Vec<T> {
    match store.load() {
        Ok(doc) => doc.unwrap_or_default(),
        Err(e) => {
            tracing::error!(target: "registry", document = what, error = ?e, "unreadable, using empty list");
            Vec::new()
        }
    }
}

impl Registry {
    /// `validator` is used by `add_source` only and should carry the short
    /// validity-check timeout.
    pub fn new(
        topics: Arc<dyn DocumentStore<Vec<TopicRecord>>>,
        sources: Arc<dyn DocumentStore<Vec<SourceRecord>>>,
        validator: Arc<dyn FeedFetcher>,
    ) -> Self {
        Self {
            topics,
            sources,
            validator,
            writer: Mutex::new(()),
        }
    }

    pub fn topics(&self) -> Vec<TopicRecord> {
        load_or_empty(self.topics.as_ref(), "topics")
    }

    pub fn topic_names(&self) -> Vec<String> {
        self.topics().into_iter().map(|t| t.topic).collect()
    }

    pub fn sources(&self) -> Vec<SourceRecord> {
        load_or_empty(self.sources.as_ref(), "sources")
    }

    pub async fn add_topic(&self, topic: &str) -> RegistryResult<()> {
        let topic = required(topic, "topic")?;
        let _w = self.writer.lock().await;
        let mut list = self.topics();
        if list.iter().any(|t| t.topic == topic) {
            return Err(RegistryError::Duplicate(topic));
        }
        list.push(TopicRecord { topic: topic.clone() });
        self.topics.save(&list)?;
        tracing::info!(target: "registry", %topic, "topic added");
        Ok(())
    }

    pub async fn edit_topic(&self, index: usize, topic: &str) -> RegistryResult<()> {
        let _w = self.writer.lock().await;
        let mut list = self.topics();
        check_index(index, list.len())?;
        let topic = required(topic, "topic")?;
        if list
            .iter()
            .enumerate()
            .any(|(i, t)| i != index && t.topic == topic)
        {
            return Err(RegistryError::Duplicate(topic));
        }
        list[index].topic = topic;
        self.topics.save(&list)?;
        tracing::info!(target: "registry", index, "topic edited");
        Ok(())
    }

    pub async fn delete_topic(&self, index: usize) -> RegistryResult<TopicRecord> {
        let _w = self.writer.lock().await;
        let mut list = self.topics();
        check_index(index, list.len())?;
        let removed = list.remove(index);
        self.topics.save(&list)?;
        tracing::info!(target: "registry", topic = %removed.topic, "topic deleted");
        Ok(removed)
    }

    /// Validates the url by fetching it and checking for an RSS/Atom root.
    pub async fn add_source(&self, name: &str, url: &str) -> RegistryResult<()> {
        let name = required(name, "name")?;
        let url = required(url, "url")?;
        if self.sources().iter().any(|s| s.url == url) {
            return Err(RegistryError::Duplicate(url));
        }

        let body = self
            .validator
            .fetch(&url)
            .await
            .map_err(|e| RegistryError::InvalidFeed(format!("{url}: {e}")))?;
        if !is_feed_document(&body) {
            return Err(RegistryError::InvalidFeed(url));
        }

        let _w = self.writer.lock().await;
        let mut list = self.sources();
        if list.iter().any(|s| s.url == url) {
            return Err(RegistryError::Duplicate(url));
        }
        list.push(SourceRecord {
            name: name.clone(),
            url: url.clone(),
            alerts_enabled: None,
        });
        self.sources.save(&list)?;
        tracing::info!(target: "registry", %name, %url, "source added");
        Ok(())
    }

    /// Replaces name and url; the feed is not re-validated.
    pub async fn edit_source(&self, index: usize, name: &str, url: &str) -> RegistryResult<()> {
        let _w = self.writer.lock().await;
        let mut list = self.sources();
        check_index(index, list.len())?;
        let name = required(name, "name")?;
        let url = required(url, "url")?;
        if list
            .iter()
            .enumerate()
            .any(|(i, s)| i != index && s.url == url)
        {
            return Err(RegistryError::Duplicate(url));
        }
        list[index].name = name;
        list[index].url = url;
        self.sources.save(&list)?;
        tracing::info!(target: "registry", index, "source edited");
        Ok(())
    }

    pub async fn delete_source(&self, index: usize) -> RegistryResult<SourceRecord> {
        let _w = self.writer.lock().await;
        let mut list = self.sources();
        check_index(index, list.len())?;
        let removed = list.remove(index);
        self.sources.save(&list)?;
        tracing::info!(target: "registry", name = %removed.name, "source deleted");
        Ok(removed)
    }

    /// Flips the flag and returns the new value (absent counts as off).
    pub async fn toggle_alerts(&self, index: usize) -> RegistryResult<bool> {
        let _w = self.writer.lock().await;
        let mut list = self.sources();
        check_index(index, list.len())?;
        let enabled = !list[index].alerts_enabled();
        list[index].alerts_enabled = Some(enabled);
        self.sources.save(&list)?;
        tracing::info!(target: "registry", index, enabled, "alerts toggled");
        Ok(enabled)
    }
}
