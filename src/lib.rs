// src/lib.rs
// Public library surface for the service binary, the one-shot digest
// binary and the integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod registry;
pub mod store;

use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::api::AppState;
use crate::config::Settings;
use crate::ingest::cache::{ApiCacheGate, CacheRecord};
use crate::ingest::fetch::HttpFetcher;
use crate::ingest::providers::NewsApiClient;
use crate::ingest::Aggregator;
use crate::notify::{DigestDispatcher, SmtpMailer};
use crate::registry::{Registry, SourceRecord, TopicRecord};
use crate::store::JsonFileStore;

pub use crate::api::router;
pub use crate::error::{IngestError, RegistryError};
pub use crate::ingest::NormalizedItem;

/// Installs the tracing subscriber (`RUST_LOG`, default `info`; JSON lines
/// when `LOG_FORMAT=json`). A subscriber installed by the host runtime wins.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Wires file-backed stores, HTTP clients and SMTP from `settings`.
pub fn build_state(settings: &Settings) -> AppState {
    let fetcher = Arc::new(HttpFetcher::new(settings.fetch.timeout()));
    let validator = Arc::new(HttpFetcher::new(settings.fetch.validate_timeout()));

    let registry = Arc::new(Registry::new(
        Arc::new(JsonFileStore::<Vec<TopicRecord>>::new(&settings.storage.topics_path)),
        Arc::new(JsonFileStore::<Vec<SourceRecord>>::new(&settings.storage.sources_path)),
        validator,
    ));

    let news_api = NewsApiClient::new(
        fetcher.client().clone(),
        settings.fetch.news_api_url.clone(),
        settings.fetch.news_api_key.clone(),
    );
    let gate = Arc::new(ApiCacheGate::new(
        Arc::new(JsonFileStore::<CacheRecord>::new(&settings.storage.cache_path)),
        Arc::new(news_api),
    ));

    let aggregator = Arc::new(Aggregator::new(
        registry.clone(),
        fetcher,
        gate,
        settings.fetch.topic_search_url.clone(),
    ));

    let dispatcher = Arc::new(DigestDispatcher::new(
        aggregator.clone(),
        Arc::new(SmtpMailer::new(&settings.email)),
        settings.email.credentials(),
    ));

    AppState {
        aggregator,
        registry,
        dispatcher,
    }
}
