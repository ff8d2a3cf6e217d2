// src/ingest/providers/mod.rs
pub mod feed_source;
pub mod news_api;
pub mod topic_search;

pub use feed_source::FeedSourceProvider;
pub use news_api::{NewsApiClient, NewsApiSource, NewsSearch};
pub use topic_search::TopicSearchProvider;
