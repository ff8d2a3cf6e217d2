// src/ingest/fetch.rs
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::IngestError;

pub const USER_AGENT: &str = concat!("cyber-briefing/", env!("CARGO_PKG_VERSION"));

/// Raw body download for feeds and feed searches.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, IngestError>;
}

/// reqwest-backed fetcher; every request is bounded by the client timeout.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(timeout.min(Duration::from_secs(4)))
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "http client builder failed, using defaults");
                Client::new()
            });
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl FeedFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, IngestError> {
        let resp = self.client.get(url).send().await?.error_for_status()?;
        let body = resp.bytes().await?;
        Ok(body.to_vec())
    }
}

// --- Test helper ---

/// Canned responses keyed by URL; unknown URLs fail as unavailable.
#[derive(Default)]
pub struct StaticFetcher {
    bodies: HashMap<String, Result<Vec<u8>, String>>,
    calls: AtomicUsize,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.to_string(), Ok(body.into()));
        self
    }

    pub fn with_failure(mut self, url: &str, reason: &str) -> Self {
        self.bodies.insert(url.to_string(), Err(reason.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, IngestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.bodies.get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(reason)) => Err(IngestError::Unavailable(reason.clone())),
            None => Err(IngestError::Unavailable(format!("no canned body for {url}"))),
        }
    }
}
